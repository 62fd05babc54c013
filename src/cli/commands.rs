// ============================================================
// Layer 1 — CLI Arguments
// ============================================================
// One flat set of flags drives both modes:
//   - training (default)
//   - eval-only scoring (--eval)
//
// Flag names keep their underscores (--model_name, --num_epochs)
// so existing experiment scripts keep working.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::Args;

use crate::application::run_config::RunConfig;
use crate::data::{padding::DEFAULT_MAX_LEN, pipeline::DEFAULT_CQCC_FRAMES};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Score a checkpoint instead of training
    #[arg(long)]
    pub eval: bool,

    /// spect, mfcc, cqcc, resnet18 or senet20
    #[arg(long = "model_name", default_value = "resnet18")]
    pub model_name: String,

    /// Checkpoint to score (--eval) or to warm-start training from
    #[arg(long = "model_path")]
    pub model_path: Option<String>,

    /// Score file written in eval mode
    #[arg(long = "eval_output")]
    pub eval_output: Option<String>,

    #[arg(long = "batch_size", default_value_t = 30)]
    pub batch_size: usize,

    #[arg(long = "num_epochs", default_value_t = 100)]
    pub num_epochs: usize,

    #[arg(long, default_value_t = 0.0001)]
    pub lr: f64,

    /// Appended to the run id
    #[arg(long)]
    pub comment: Option<String>,

    /// logical (LA) or physical (PA)
    #[arg(long, default_value = "physical")]
    pub track: String,

    /// mfcc, spect or cqcc
    #[arg(long, default_value = "spect")]
    pub features: String,

    /// Use the blind evaluation split instead of dev
    #[arg(long = "is_eval")]
    pub is_eval: bool,

    /// Which chunk of the held-out split to load (see --eval_part_size)
    #[arg(long = "eval_part", default_value_t = 0)]
    pub eval_part: usize,

    /// Protocol entries per chunk; 0 loads the whole split
    #[arg(long = "eval_part_size", default_value_t = 0)]
    pub eval_part_size: usize,

    /// Directory holding the ASVspoof2019_* folders
    #[arg(long = "data_root", default_value = ".")]
    pub data_root: String,

    /// Directory under which models/ and logs/ are created
    #[arg(long = "output_root", default_value = ".")]
    pub output_root: String,

    /// Waveform length in samples after padding / truncation
    #[arg(long = "max_len", default_value_t = DEFAULT_MAX_LEN)]
    pub max_len: usize,

    /// Frame count precomputed CQCC maps are fitted to
    #[arg(long = "cqcc_frames", default_value_t = DEFAULT_CQCC_FRAMES)]
    pub cqcc_frames: usize,

    /// Data loader worker threads; 0 loads on the training thread
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Re-create Adam at every epoch instead of keeping its state
    #[arg(long = "reset_optimizer")]
    pub reset_optimizer: bool,
}

/// Convert CLI RunArgs into the application-layer RunConfig.
/// The application layer never sees clap types.
impl From<RunArgs> for RunConfig {
    fn from(a: RunArgs) -> Self {
        RunConfig {
            eval:            a.eval,
            model_name:      a.model_name,
            model_path:      a.model_path,
            eval_output:     a.eval_output,
            batch_size:      a.batch_size,
            num_epochs:      a.num_epochs,
            lr:              a.lr,
            comment:         a.comment,
            track:           a.track,
            features:        a.features,
            is_eval:         a.is_eval,
            eval_part:       a.eval_part,
            eval_part_size:  a.eval_part_size,
            data_root:       a.data_root,
            output_root:     a.output_root,
            max_len:         a.max_len,
            cqcc_frames:     a.cqcc_frames,
            workers:         a.workers,
            reset_optimizer: a.reset_optimizer,
        }
    }
}
