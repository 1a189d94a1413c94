//! `scene-migrate`: replace unset scene object positions with a fallback coordinate

use anyhow::Context;
use scene_migrator::{cli, logging, ConsoleReporter, Migrator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let matches = cli::command().get_matches();
    let config = cli::resolve_config(&matches).context("invalid configuration")?;
    let migrator = Migrator::connect(config)?;

    let mut reporter = ConsoleReporter::stdout();
    let report = migrator.run(&mut reporter).await?;

    if !report.is_clean() {
        tracing::warn!("{} updates failed", report.failed.len());
    }

    Ok(())
}
