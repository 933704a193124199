use anyhow::Result;
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info};

mod config;
mod error;
mod models;
mod notify;
mod parsers;
mod scrape;
mod storage;
mod sync;

use crate::config::Config;
use crate::models::Category;
use crate::scrape::HttpSession;
use crate::storage::JsonCatalogStore;
use crate::sync::{SyncOrchestrator, SyncRun};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bike_catalog_sync=info".parse()?),
        )
        .init();

    info!("Starting Bike Catalog Sync");

    // Load configuration
    let config = Arc::new(Config::load()?);

    // Initialize the catalog store and the scraping session
    let store = Arc::new(JsonCatalogStore::new(&config.data_dir));
    let session = Arc::new(HttpSession::new(&config)?);

    let orchestrator = SyncOrchestrator::new(config.clone(), store, session);

    let args: Vec<String> = std::env::args().collect();
    let full_reload = args.iter().any(|arg| arg == "--full");
    let run_once = args.iter().any(|arg| arg == "--once");
    let prune = args.iter().any(|arg| arg == "--prune");

    // `--resume <tag>` continues one category's interrupted walk and exits.
    if let Some(position) = args.iter().position(|arg| arg == "--resume") {
        let Some(tag) = args.get(position + 1).and_then(|key| Category::from_key(key)) else {
            anyhow::bail!("--resume requires a known category tag, e.g. --resume city");
        };
        match orchestrator.resume_category(tag).await? {
            SyncRun::Completed(report) => info!(
                "Resume finished: {} new products in {}",
                report.categories.first().map(|c| c.new_records).unwrap_or(0),
                tag
            ),
            SyncRun::AlreadyRunning => {}
        }
        return Ok(());
    }

    if run_once {
        run_sync(&orchestrator, full_reload, prune).await;
        return Ok(());
    }

    // Scheduled loop; the first run fires immediately on startup.
    let mut interval = interval(Duration::from_secs(config.sync_interval_secs));

    loop {
        interval.tick().await;

        info!(
            "--- Starting sync cycle at {} ---",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );

        run_sync(&orchestrator, full_reload, prune).await;

        info!(
            "Sync cycle completed, next run in {} seconds",
            config.sync_interval_secs
        );
    }
}

async fn run_sync(orchestrator: &SyncOrchestrator, full_reload: bool, prune: bool) {
    let result = if full_reload {
        orchestrator.full_reload().await
    } else {
        orchestrator.sync_incremental().await
    };

    match result {
        Ok(SyncRun::Completed(report)) => {
            info!(
                "Sync finished: {} added, {} removed, {} updated",
                report.added_count(),
                report.removed_count(),
                report.updated_count()
            );
            // Deletion is opt-in; a routine sync only reports removals.
            if prune {
                match orchestrator.remove_obsolete(&report).await {
                    Ok(dropped) => info!("Pruned {} obsolete products", dropped),
                    Err(e) => error!("Pruning obsolete products failed: {e:#}"),
                }
            }
        }
        Ok(SyncRun::AlreadyRunning) => {}
        Err(e) => error!("Sync run failed: {e:#}"),
    }
}
