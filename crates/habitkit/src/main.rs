// crates/habitkit/src/main.rs
// habitkit - local-first habit tracking engine

use anyhow::{Context, Result};
use clap::Parser;
use habitkit::calendar::{Clock, FixedClock, SystemClock};
use habitkit::cli::{Cli, run_command};
use habitkit::config::Settings;
use habitkit::tracker::{HabitTracker, StoreLocation};
use std::sync::Arc;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.db.clone(), cli.verbose);

    // Logs on stderr so stdout stays pure JSON
    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let clock: Arc<dyn Clock> = match cli.today.as_deref() {
        Some(day) => Arc::new(
            FixedClock::on(day).with_context(|| format!("invalid --today value '{day}'"))?,
        ),
        None => Arc::new(SystemClock),
    };

    let tracker = HabitTracker::new(StoreLocation::File(settings.db_path.clone()), clock);
    tracker
        .open()
        .await
        .with_context(|| format!("failed to open {}", settings.db_path.display()))?;

    let outcome = run_command(&tracker, cli.command).await;
    tracker.close().await;

    match outcome {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
