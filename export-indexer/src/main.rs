use std::env;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use export_indexer::{Dependencies, IndexingError, Settings, ShutdownSignals};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    init_tracing();

    if let Err(e) = run().await {
        error!(error = %e, "Export indexer failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run() -> Result<(), IndexingError> {
    let settings = Settings::from_env()?;
    let Dependencies { mut orchestrator } = Dependencies::new(&settings).await?;

    let mut signals = ShutdownSignals::new()?;
    let shutdown = orchestrator.shutdown_handle();
    tokio::spawn(async move {
        let signal = signals.recv().await;
        info!(signal, "Received shutdown signal");
        shutdown.shutdown();
    });

    let summary = orchestrator.run().await?;
    info!(
        swept = summary.sweep.indexed,
        watched = summary.watch.indexed,
        left_in_place = summary.sweep.failed + summary.sweep.rejected,
        "Export indexer stopped"
    );
    Ok(())
}
