// ============================================================
// Layer 4 — ASVspoof 2019 Protocol Loader
// ============================================================
// Reads one split of the ASVspoof 2019 corpus from disk.
//
// Expected layout under the data root:
//
//   ASVspoof2019_LA_cm_protocols/
//     ASVspoof2019.LA.cm.train.trn.txt
//     ASVspoof2019.LA.cm.dev.trl.txt
//     ASVspoof2019.LA.cm.eval.trl.txt
//   ASVspoof2019_LA_train/flac/LA_T_1000137.flac
//   ASVspoof2019_LA_dev/flac/...
//   ASVspoof2019_LA_eval/flac/...
//   ASVspoof2019_LA_<split>/cqcc/<file>.json   (precomputed CQCC)
//
// (PA is identical with "PA" in place of "LA".)
//
// Protocol lines:
//   SPEAKER FILE - SYSID KEY        e.g. "LA_0079 LA_T_1138215 - - bonafide"
// Blind evaluation lists may carry fewer columns; those rows
// get system id "-" and key 0.
//
// Reference: symphonia docs (probe → decode → SampleBuffer)

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ndarray::Array2;
use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::domain::error::SpoofError;
use crate::domain::kinds::{FeatureKind, Track};
use crate::domain::sample::{Label, Sample, SampleInput, SampleMeta, SampleSet, SAMPLE_RATE};
use crate::domain::traits::SampleSource;

/// Which protocol list to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Dev,
    Eval,
}

impl Split {
    fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Dev   => "dev",
            Split::Eval  => "eval",
        }
    }

    fn protocol_suffix(self) -> &'static str {
        match self {
            Split::Train => "train.trn",
            Split::Dev   => "dev.trl",
            Split::Eval  => "eval.trl",
        }
    }
}

/// System-id table: index → name. Index 0 is always "-" (bona-fide).
pub fn sysid_table(track: Track) -> Vec<String> {
    let mut names = vec!["-".to_string()];
    match track {
        Track::Logical => names.extend((1..=19).map(|i| format!("A{i:02}"))),
        Track::Physical => {
            for a in ['A', 'B', 'C'] {
                for b in ['A', 'B', 'C'] {
                    names.push(format!("{a}{b}"));
                }
            }
        }
    }
    names
}

pub struct ProtocolLoader {
    root:           PathBuf,
    track:          Track,
    split:          Split,
    features:       FeatureKind,
    /// Zero means "whole split".
    eval_part_size: usize,
    eval_part:      usize,
}

impl ProtocolLoader {
    pub fn new(root: impl Into<PathBuf>, track: Track, split: Split, features: FeatureKind) -> Self {
        Self {
            root: root.into(),
            track,
            split,
            features,
            eval_part_size: 0,
            eval_part: 0,
        }
    }

    /// Restrict loading to the `part`-th chunk of `size` protocol entries.
    pub fn with_part(mut self, part: usize, size: usize) -> Self {
        self.eval_part = part;
        self.eval_part_size = size;
        self
    }

    pub fn protocol_path(&self) -> PathBuf {
        let code = self.track.code();
        self.root
            .join(format!("ASVspoof2019_{code}_cm_protocols"))
            .join(format!("ASVspoof2019.{code}.cm.{}.txt", self.split.protocol_suffix()))
    }

    fn split_dir(&self) -> PathBuf {
        self.root.join(format!(
            "ASVspoof2019_{}_{}",
            self.track.code(),
            self.split.dir_name()
        ))
    }

    fn is_eval(&self) -> bool {
        self.split == Split::Eval
    }

    fn input_path(&self, file_name: &str) -> PathBuf {
        if self.features.from_waveform() {
            self.split_dir().join("flac").join(format!("{file_name}.flac"))
        } else {
            self.split_dir().join("cqcc").join(format!("{file_name}.json"))
        }
    }

    fn load_input(&self, path: &Path) -> Result<SampleInput> {
        if self.features.from_waveform() {
            let (samples, rate) = decode_audio(path)?;
            if rate != SAMPLE_RATE {
                return Err(SpoofError::dataset(format!(
                    "'{}' is sampled at {rate} Hz, expected {SAMPLE_RATE} Hz",
                    path.display()
                ))
                .into());
            }
            Ok(SampleInput::Waveform(samples))
        } else {
            Ok(SampleInput::Precomputed(read_feature_map(path)?))
        }
    }
}

impl SampleSource for ProtocolLoader {
    fn load(&self) -> Result<SampleSet> {
        let protocol = self.protocol_path();
        let text = fs::read_to_string(&protocol)
            .with_context(|| format!("Cannot read protocol '{}'", protocol.display()))?;

        let sysid_names = sysid_table(self.track);
        let mut entries = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = parse_protocol_line(line, &sysid_names, self.is_eval())
                .with_context(|| format!("{}:{}", protocol.display(), line_no + 1))?;
            entries.push(entry);
        }

        if self.eval_part_size > 0 {
            let start = (self.eval_part * self.eval_part_size).min(entries.len());
            let end = (start + self.eval_part_size).min(entries.len());
            entries.truncate(end);
            entries.drain(..start);
            tracing::info!("Using part {} ({} entries)", self.eval_part, entries.len());
        }

        let mut samples = Vec::with_capacity(entries.len());
        for mut meta in entries {
            let path = self.input_path(&meta.file_name);
            let input = self
                .load_input(&path)
                .with_context(|| format!("Cannot load '{}'", path.display()))?;
            meta.path = path.display().to_string();
            samples.push(Sample::new(input, meta.key, meta));
        }

        tracing::info!(
            "Loaded {} {:?} samples for track {}",
            samples.len(),
            self.split,
            self.track
        );

        Ok(SampleSet {
            samples,
            sysid_names,
            is_eval: self.is_eval(),
        })
    }
}

/// Parse one protocol row into metadata (path filled in later).
pub fn parse_protocol_line(line: &str, sysid_names: &[String], is_eval: bool) -> Result<SampleMeta, SpoofError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    if tokens.len() < 5 {
        let malformed = || SpoofError::dataset(format!("malformed protocol line '{line}'"));
        if !is_eval {
            return Err(malformed());
        }
        let (speaker_id, file_name) = match tokens.as_slice() {
            [file] => ("", *file),
            [speaker, file, ..] => (*speaker, *file),
            [] => return Err(malformed()),
        };
        return Ok(SampleMeta {
            speaker_id: speaker_id.to_string(),
            file_name:  file_name.to_string(),
            path:       String::new(),
            sys_id:     0,
            key:        Label::Spoof,
        });
    }

    let sys_id = sysid_names
        .iter()
        .position(|name| name == tokens[3])
        .ok_or_else(|| SpoofError::dataset(format!("unknown system id '{}'", tokens[3])))?;

    let key = if tokens[4] == "bonafide" { Label::Bonafide } else { Label::Spoof };

    Ok(SampleMeta {
        speaker_id: tokens[0].to_string(),
        file_name:  tokens[1].to_string(),
        path:       String::new(),
        sys_id,
        key,
    })
}

/// Read a precomputed feature map stored as a JSON array of rows.
pub fn read_feature_map(path: &Path) -> Result<Array2<f32>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read feature map '{}'", path.display()))?;
    let rows: Vec<Vec<f32>> = serde_json::from_str(&json)
        .with_context(|| format!("Malformed feature map '{}'", path.display()))?;

    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(SpoofError::dataset(format!("ragged feature map '{}'", path.display())).into());
    }
    let flat: Vec<f32> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n_rows, n_cols), flat)?)
}

/// Decode an audio file to mono f32 samples and its sample rate.
pub fn decode_audio(path: &Path) -> Result<(Vec<f32>, u32)> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open audio file: {}", path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe audio format")?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio tracks found in file")?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate not specified in audio file")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err).context("Failed to read packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).context("Failed to decode audio packet")?;
        let channels = decoded.spec().channels.count().max(1);
        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);

        // Average interleaved channels down to mono
        mono.extend(
            buf.samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    Ok((mono, sample_rate))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sysid_tables() {
        let la = sysid_table(Track::Logical);
        assert_eq!(la.len(), 20);
        assert_eq!(la[0], "-");
        assert_eq!(la[19], "A19");

        let pa = sysid_table(Track::Physical);
        assert_eq!(pa, vec!["-", "AA", "AB", "AC", "BA", "BB", "BC", "CA", "CB", "CC"]);
    }

    #[test]
    fn test_parse_labelled_line() {
        let names = sysid_table(Track::Logical);
        let meta = parse_protocol_line("LA_0079 LA_T_1138215 - A04 spoof", &names, false).unwrap();
        assert_eq!(meta.file_name, "LA_T_1138215");
        assert_eq!(meta.sys_id, 4);
        assert_eq!(meta.key, Label::Spoof);

        let meta = parse_protocol_line("LA_0079 LA_T_1000137 - - bonafide", &names, false).unwrap();
        assert_eq!(meta.sys_id, 0);
        assert_eq!(meta.key, Label::Bonafide);
    }

    #[test]
    fn test_parse_blind_line() {
        let names = sysid_table(Track::Logical);
        let meta = parse_protocol_line("LA_E_5932896", &names, true).unwrap();
        assert_eq!(meta.file_name, "LA_E_5932896");
        assert_eq!(meta.sys_id, 0);
        assert!(parse_protocol_line("LA_E_5932896", &names, false).is_err());
    }

    #[test]
    fn test_unknown_sysid_is_rejected() {
        let names = sysid_table(Track::Physical);
        assert!(parse_protocol_line("PA_0079 PA_T_1 aaa A04 spoof", &names, false).is_err());
    }

    #[test]
    fn test_load_precomputed_split_with_parts() {
        let dir = tempfile::tempdir().unwrap();
        let proto_dir = dir.path().join("ASVspoof2019_PA_cm_protocols");
        let cqcc_dir = dir.path().join("ASVspoof2019_PA_dev").join("cqcc");
        fs::create_dir_all(&proto_dir).unwrap();
        fs::create_dir_all(&cqcc_dir).unwrap();

        let lines = [
            "PA_0001 PA_D_1 aaa - bonafide",
            "PA_0001 PA_D_2 aaa AB spoof",
            "PA_0002 PA_D_3 aaa CC spoof",
        ];
        fs::write(proto_dir.join("ASVspoof2019.PA.cm.dev.trl.txt"), lines.join("\n")).unwrap();
        for i in 1..=3 {
            fs::write(cqcc_dir.join(format!("PA_D_{i}.json")), "[[1.0, 2.0], [3.0, 4.0]]").unwrap();
        }

        let loader = ProtocolLoader::new(dir.path(), Track::Physical, Split::Dev, FeatureKind::Cqcc);
        let set = loader.load().unwrap();
        assert_eq!(set.samples.len(), 3);
        assert!(!set.is_eval);
        assert_eq!(set.samples[0].label, Label::Bonafide);
        assert_eq!(set.sysid_name(set.samples[2].meta.sys_id), Some("CC"));

        let part = ProtocolLoader::new(dir.path(), Track::Physical, Split::Dev, FeatureKind::Cqcc)
            .with_part(1, 2)
            .load()
            .unwrap();
        assert_eq!(part.samples.len(), 1);
        assert_eq!(part.samples[0].meta.file_name, "PA_D_3");
    }

    #[test]
    fn test_ragged_feature_map_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[[1.0, 2.0], [3.0]]").unwrap();
        assert!(read_feature_map(&path).is_err());
    }
}
