use anyhow::{ensure, Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use tracing_subscriber::EnvFilter;

use fx_video::{Config, VideoGenerator};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    tracing::info!(?config, "started");

    ensure!(
        config.dataset_path.is_file(),
        "Dataset file does not exist: {}",
        config.dataset_path.display()
    );
    ensure!(
        config.model_snapshots_path.is_dir(),
        "Model snapshots directory does not exist: {}",
        config.model_snapshots_path.display()
    );

    ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()
        .context("Failed to configure the rendering thread pool")?;

    let summary = VideoGenerator::with_onnx_models(config)
        .run()
        .context("Failed to generate the animated gif")?;

    tracing::info!(
        path = %summary.output.display(),
        frames = summary.frames,
        width = summary.width,
        height = summary.height,
        "terminated"
    );
    Ok(())
}
