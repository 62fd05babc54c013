// MFCC + delta + delta-delta features.
//
//   power STFT → 128 Slaney mel bands → dB (ref 1.0) → DCT-II (ortho)
//   → first 24 coefficients → stack [mfcc; Δ; Δ²] = 72 rows
//
// Mel basis and DCT matrix are built once in `new()` and only read
// afterwards, so one extractor is shared by every loader worker.

use ndarray::{s, Array2};

use crate::data::features::stft::{power_to_db, PowerStft, N_FFT};
use crate::domain::sample::{FeatureMap, SAMPLE_RATE};
use crate::domain::traits::FeatureExtractor;

pub const N_MFCC: usize = 24;
pub const N_MELS: usize = 128;
pub const MFCC_ROWS: usize = 3 * N_MFCC;

/// Savitzky–Golay window for the derivatives (frames on each side of centre).
const DELTA_HALF_WIDTH: usize = 4;

pub struct MfccExtractor {
    stft:      PowerStft,
    mel_basis: Array2<f32>, // [N_MELS, N_FFT / 2 + 1]
    dct:       Array2<f32>, // [N_MFCC, N_MELS]
}

impl MfccExtractor {
    pub fn new() -> Self {
        let stft = PowerStft::default();
        let mel_basis = slaney_mel_basis(SAMPLE_RATE as f32, N_FFT, N_MELS);
        let dct = dct_ortho(N_MFCC, N_MELS);
        Self { stft, mel_basis, dct }
    }

    /// The 24 static coefficients, `[N_MFCC, frames]`.
    pub fn coefficients(&self, waveform: &[f32]) -> Array2<f32> {
        let power = self.stft.power(waveform);
        let mel = self.mel_basis.dot(&power);
        let log_mel = power_to_db(&mel, 1.0);
        self.dct.dot(&log_mel)
    }
}

impl Default for MfccExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for MfccExtractor {
    fn extract(&self, waveform: &[f32]) -> FeatureMap {
        let mfcc = self.coefficients(waveform);
        let d1 = delta(&mfcc);
        let d2 = delta(&d1);

        let mut feats = Array2::<f32>::zeros((MFCC_ROWS, mfcc.ncols()));
        feats.slice_mut(s![..N_MFCC, ..]).assign(&mfcc);
        feats.slice_mut(s![N_MFCC..2 * N_MFCC, ..]).assign(&d1);
        feats.slice_mut(s![2 * N_MFCC.., ..]).assign(&d2);
        feats
    }
}

// ─── Mel filter bank ──────────────────────────────────────────────────────────

const F_SP: f32 = 200.0 / 3.0;
const MIN_LOG_HZ: f32 = 1000.0;
const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;

fn log_step() -> f32 {
    6.4f32.ln() / 27.0
}

fn hz_to_mel(hz: f32) -> f32 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular Slaney-normalised filters spanning 0 Hz to Nyquist.
fn slaney_mel_basis(sample_rate: f32, n_fft: usize, n_mels: usize) -> Array2<f32> {
    let n_freq = n_fft / 2 + 1;
    let fft_freqs: Vec<f32> = (0..n_freq)
        .map(|k| k as f32 * sample_rate / n_fft as f32)
        .collect();

    let mel_max = hz_to_mel(sample_rate / 2.0);
    let mel_f: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f32 / (n_mels + 1) as f32))
        .collect();

    Array2::from_shape_fn((n_mels, n_freq), |(m, k)| {
        let lower = (fft_freqs[k] - mel_f[m]) / (mel_f[m + 1] - mel_f[m]);
        let upper = (mel_f[m + 2] - fft_freqs[k]) / (mel_f[m + 2] - mel_f[m + 1]);
        let enorm = 2.0 / (mel_f[m + 2] - mel_f[m]);
        lower.min(upper).max(0.0) * enorm
    })
}

/// Orthonormal DCT-II, keeping the first `n_out` basis vectors.
fn dct_ortho(n_out: usize, n_in: usize) -> Array2<f32> {
    let n = n_in as f32;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (std::f32::consts::PI * k as f32 * (2.0 * i as f32 + 1.0) / (2.0 * n)).cos()
    })
}

// ─── Deltas ───────────────────────────────────────────────────────────────────

/// First time-derivative along the frame axis.
///
/// Interior frames use the 9-frame regression `Σ n·x[t+n] / Σ n²`. The first
/// and last four frames take the slope of the nearest full window, which is
/// what a first-order polynomial fit over the edge window gives.
pub fn delta(x: &Array2<f32>) -> Array2<f32> {
    let frames = x.ncols();
    let half = DELTA_HALF_WIDTH as isize;
    let denom: f32 = (1..=half).map(|n| 2.0 * (n * n) as f32).sum();
    let mut out = Array2::<f32>::zeros(x.dim());

    for t in 0..frames {
        let full_window = frames > 2 * DELTA_HALF_WIDTH;
        let centre = if full_window {
            t.clamp(DELTA_HALF_WIDTH, frames - 1 - DELTA_HALF_WIDTH) as isize
        } else {
            t as isize
        };
        for n in -half..=half {
            // Short inputs fall back to edge replication.
            let idx = (centre + n).clamp(0, frames as isize - 1) as usize;
            let weight = n as f32 / denom;
            for r in 0..x.nrows() {
                out[[r, t]] += weight * x[[r, idx]];
            }
        }
    }
    out
}
