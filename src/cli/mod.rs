// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses flags with clap, sets up logging and hands off to one
// of the two use cases:
//   1. training (default) — models/<run_id>, logs/<run_id>
//   2. --eval             — score file only
//
// Training runs on Autodiff<Wgpu>; eval-only mode loads the
// checkpoint into the same backend and scores with .valid().
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::RunArgs;

use crate::application::{
    run_config::RunConfig,
    score_use_case::ScoreUseCase,
    train_use_case::TrainUseCase,
};
use crate::infra::{logging, run_dirs::RunGuard};

type RunBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

#[derive(Parser, Debug)]
#[command(
    name = "asv-spoof-cm",
    version = "0.1.0",
    about = "Train and score ASVspoof 2019 countermeasure classifiers."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: RunArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config: RunConfig = self.args.into();
        // Bad flags fail here, before anything is written.
        config.validate()?;

        if config.eval {
            Self::run_score(config)
        } else {
            Self::run_train(config)
        }
    }

    fn run_train(config: RunConfig) -> Result<()> {
        // Any error below drops the guard, which removes both directories.
        let guard = RunGuard::acquire(config.layout())?;
        logging::init(Some(&guard.layout().log_file()))?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        TrainUseCase::<RunBackend>::new(config, device).execute_in(guard)?;
        Ok(())
    }

    fn run_score(config: RunConfig) -> Result<()> {
        logging::init(None)?;

        let device = burn::backend::wgpu::WgpuDevice::default();
        ScoreUseCase::<RunBackend>::new(config, device).execute()?;
        Ok(())
    }
}
