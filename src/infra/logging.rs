// ============================================================
// Layer 6 — Logging
// ============================================================
// tracing subscriber for the binary: env-filtered fmt output to
// stdout, plus an ANSI-free copy in logs/<run_id>/logger.log for
// training runs.

use anyhow::{Context, Result};
use std::{fs::File, path::Path, sync::Mutex};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_DIRECTIVE: &str = "asv_spoof_cm=info";

pub fn init(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(DEFAULT_DIRECTIVE.parse()?);

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create log file '{}'", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("Cannot install the tracing subscriber")?;
    Ok(())
}
