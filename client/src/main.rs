//! Quotesync - keeps a local quote collection in sync with a remote feed.
//!
//! Usage:
//!   quotesync [run]              poll the remote until Ctrl-C
//!   quotesync sync               run a single sync cycle
//!   quotesync export             print all quotes as JSON
//!   quotesync import <file>      merge quotes from a JSON file
//!   quotesync random [category]  print a random quote

use quotesync_client::{
    now_millis, Config, FileStorage, HttpTransport, LogNotifier, RemoteFetcher, SyncOrchestrator,
    SyncScheduler,
};
use quotesync_engine::{LoadSource, RecordStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Orchestrator = SyncOrchestrator<FileStorage, HttpTransport, LogNotifier>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quotesync=info,quotesync_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let storage = FileStorage::new(&config.data_dir)?;
    let (store, source) = RecordStore::open(storage)?;
    match source {
        LoadSource::Persisted => tracing::info!(count = store.len(), "Loaded quotes"),
        LoadSource::Seeded => tracing::info!(count = store.len(), "No saved quotes, seeded defaults"),
        LoadSource::Recovered(e) => {
            tracing::warn!(error = %e, "Saved quotes unreadable, reset to defaults")
        }
    }

    let transport = HttpTransport::new(config.http_timeout)?;
    let fetcher = RemoteFetcher::new(transport, &config.remote_url, &config.default_category);
    let orchestrator = Arc::new(SyncOrchestrator::new(
        store,
        fetcher,
        LogNotifier,
        config.policy,
    ));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("run") => run(orchestrator, &config).await?,
        Some("sync") => {
            if let Some(outcome) = orchestrator.sync_now().await {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
        }
        Some("export") => println!("{}", orchestrator.export_json().await?),
        Some("import") => {
            let path = args.get(1).ok_or("import needs a file path")?;
            let bytes = tokio::fs::read(path).await?;
            let summary = orchestrator.import_json(&bytes).await?;
            println!(
                "Imported {} quotes, skipped {}",
                summary.imported, summary.skipped
            );
        }
        Some("random") => {
            let mut store = orchestrator.store().await;
            let category = args.get(1).map(String::as_str).or(store.last_category());
            let category = category.map(str::to_string);
            match store.pick(category.as_deref(), now_millis()) {
                Some(quote) => println!("{quote}"),
                None => println!("No quotes in this category."),
            }
            store.set_last_category(category.as_deref())?;
        }
        Some(other) => return Err(format!("unknown command: {other}").into()),
    }

    Ok(())
}

async fn run(orchestrator: Arc<Orchestrator>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        url = %config.remote_url,
        policy = ?orchestrator.policy(),
        data_dir = %config.data_dir.display(),
        "Starting quotesync"
    );

    let scheduler = SyncScheduler::spawn(orchestrator, config.sync_interval);

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    scheduler.shutdown().await;

    Ok(())
}
