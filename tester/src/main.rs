mod challenge;
mod challenge_log;
mod config;
mod console;
mod error;
mod metric;
mod receiver;
mod roster;
mod session;
mod settings;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use challenge_log::ChallengeLog;
use config::ChallengeConfig;
use session::Session;
use settings::{Args, TesterSettings};

// ─── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whistle_tester=info".into()),
        )
        .init();

    let args = Args::parse();
    let settings = TesterSettings::load(&args)
        .with_context(|| format!("loading settings from {}", args.settings.display()))?;
    let config = ChallengeConfig::load(&settings.config_dir)
        .with_context(|| format!("loading challenge config from {}", settings.config_dir.display()))?;

    let mut log = ChallengeLog::open(&settings.log_dir)
        .await
        .with_context(|| format!("opening challenge log in {}", settings.log_dir.display()))?;
    info!("Writing challenge log to {}", log.path().display());
    log.line("Started DirectionWhistleTester").await;

    let (commands_tx, commands_rx) = mpsc::channel(16);
    console::spawn_stdin_reader(commands_tx);

    Session::new(config, settings, log).run(commands_rx).await;

    info!("Whistle tester stopped");
    Ok(())
}
