use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{Category, ProductCard, ProductRecord};
use crate::notify::{self, RunSummary};
use crate::scrape::{CategoryWalker, DetailFetcher, Pacer, PageSource, WalkMode};
use crate::storage::{CatalogStore, ChangeLog, ChangeLogEntry};


/// Per-category reconciliation of what the listing showed against what the
/// store held before the walk. All sets are keyed by product URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub updated: Vec<String>,
}

/// `removed = stored − found`, `added = found − stored`; products present in
/// both count as updated when their title or raw prices changed. Duplicate
/// cards collapse to their first appearance.
pub fn reconcile(stored: &[ProductRecord], seen: &[ProductCard]) -> CategoryDiff {
    let stored_by_url: HashMap<&str, &ProductRecord> =
        stored.iter().map(|record| (record.url.as_str(), record)).collect();

    let mut found: HashSet<&str> = HashSet::new();
    let mut added = Vec::new();
    let mut updated = Vec::new();

    for card in seen {
        if !found.insert(card.url.as_str()) {
            continue;
        }
        match stored_by_url.get(card.url.as_str()) {
            None => added.push(card.url.clone()),
            Some(record) => {
                let changed = record.title != card.title
                    || record.current_price_raw != card.current_price_raw
                    || record.original_price_raw != card.original_price_raw;
                if changed {
                    updated.push(card.url.clone());
                }
            }
        }
    }

    let removed = stored
        .iter()
        .filter(|record| !found.contains(record.url.as_str()))
        .map(|record| record.url.clone())
        .collect();

    CategoryDiff {
        added,
        removed,
        updated,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub category: Category,
    pub pages: u32,
    pub seen: usize,
    pub new_records: usize,
    pub diff: CategoryDiff,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub action: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub categories: Vec<CategorySummary>,
}

impl SyncReport {
    pub fn added_count(&self) -> usize {
        self.categories.iter().map(|c| c.diff.added.len()).sum()
    }

    pub fn removed_count(&self) -> usize {
        self.categories.iter().map(|c| c.diff.removed.len()).sum()
    }

    pub fn updated_count(&self) -> usize {
        self.categories.iter().map(|c| c.diff.updated.len()).sum()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            action: self.action.clone(),
            added_count: self.added_count(),
            removed_count: self.removed_count(),
            updated_count: self.updated_count(),
            timestamp: self.finished_at,
        }
    }

    fn changelog_entry(&self) -> ChangeLogEntry {
        ChangeLogEntry {
            timestamp: self.finished_at,
            action: self.action.clone(),
            added: self.added_count(),
            removed: self.removed_count(),
            updated: self.updated_count(),
            categories: self.categories.iter().map(|c| c.category.key().to_string()).collect(),
        }
    }
}

/// Outcome of requesting a run.
#[derive(Debug)]
pub enum SyncRun {
    Completed(SyncReport),
    /// Another run holds the guard; the request was dropped, not queued.
    AlreadyRunning,
}

#[derive(Clone, Copy)]
enum RunKind {
    Incremental,
    FullReload,
}

impl RunKind {
    fn action(self) -> &'static str {
        match self {
            RunKind::Incremental => "incremental_sync",
            RunKind::FullReload => "full_reload",
        }
    }
}

/// Drives a whole sync pass over the fixed category list: walks each
/// category in order, paces between them, reconciles the results, appends
/// the change log entry and emits the run summary. Reentrant requests
/// no-op while a run is in flight.
pub struct SyncOrchestrator {
    config: Arc<Config>,
    store: Arc<dyn CatalogStore>,
    source: Arc<dyn PageSource>,
    fetcher: DetailFetcher,
    pacer: Pacer,
    changelog: ChangeLog,
    running: AtomicBool,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncOrchestrator {
    pub fn new(config: Arc<Config>, store: Arc<dyn CatalogStore>, source: Arc<dyn PageSource>) -> Self {
        let fetcher = DetailFetcher::new(
            config.detail_retry_attempts,
            Duration::from_secs(config.detail_backoff_secs),
        );
        let pacer = Pacer::new(&config);
        let changelog = ChangeLog::new(config.data_dir.join("changes.json"));
        Self {
            config,
            store,
            source,
            fetcher,
            pacer,
            changelog,
            running: AtomicBool::new(false),
        }
    }

    /// Default run mode: only genuinely new products are fetched and
    /// appended; known URLs are skipped.
    pub async fn sync_incremental(&self) -> Result<SyncRun> {
        self.run(RunKind::Incremental).await
    }

    /// Re-scrapes every category from page 1 with no skip logic and
    /// replaces each category's store.
    pub async fn full_reload(&self) -> Result<SyncRun> {
        self.run(RunKind::FullReload).await
    }

    async fn run(&self, kind: RunKind) -> Result<SyncRun> {
        if self.try_begin(kind.action()).is_none() {
            return Ok(SyncRun::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);
        let report = self.execute(kind).await?;
        Ok(SyncRun::Completed(report))
    }

    fn try_begin(&self, action: &str) -> Option<()> {
        match self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Some(()),
            Err(_) => {
                info!(action, "sync already running, ignoring request");
                None
            }
        }
    }

    async fn execute(&self, kind: RunKind) -> Result<SyncReport> {
        let started_at = Utc::now();
        info!(action = kind.action(), categories = self.config.categories.len(), "starting sync run");

        let mut summaries = Vec::new();
        for (index, category) in self.config.categories.iter().enumerate() {
            if index > 0 {
                self.pacer.category_break().await;
            }

            let stored_before = match self.store.load(category.tag).await {
                Ok(records) => records,
                Err(e) => {
                    error!("skipping category {}: cannot read store: {e:#}", category.tag);
                    continue;
                }
            };

            let mode = match kind {
                RunKind::Incremental => WalkMode::Incremental { resume_from: None },
                RunKind::FullReload => WalkMode::FullReload,
            };

            match self.walker().walk(category, mode).await {
                Ok(outcome) => {
                    let diff = reconcile(&stored_before, &outcome.seen);
                    summaries.push(CategorySummary {
                        category: outcome.category,
                        pages: outcome.pages,
                        seen: outcome.seen.len(),
                        new_records: outcome.new_records,
                        diff,
                    });
                }
                // One bad category must not abort the whole sync.
                Err(e) => error!("category {} failed: {e:#}", category.tag),
            }
        }

        let report = SyncReport {
            action: kind.action().to_string(),
            started_at,
            finished_at: Utc::now(),
            categories: summaries,
        };

        if let Err(e) = self.changelog.append(report.changelog_entry()).await {
            error!("failed to append change log entry: {e:#}");
        }

        if let Some(webhook_url) = &self.config.webhook_url {
            if let Err(e) = notify::send_summary(webhook_url, &report.summary()).await {
                error!("failed to deliver run summary: {e:#}");
            }
        }

        info!(
            action = kind.action(),
            added = report.added_count(),
            removed = report.removed_count(),
            updated = report.updated_count(),
            "sync run finished"
        );
        Ok(report)
    }

    fn walker(&self) -> CategoryWalker<'_> {
        CategoryWalker {
            source: self.source.as_ref(),
            store: self.store.as_ref(),
            fetcher: &self.fetcher,
            pacer: &self.pacer,
            page_ceiling: self.config.page_ceiling,
        }
    }

    /// Continues an interrupted walk for one category: the last stored
    /// record marks where the previous run stopped, and page 1's card list
    /// is re-scanned up to that point without any detail fetches.
    pub async fn resume_category(&self, tag: Category) -> Result<SyncRun> {
        let Some(category) = self.config.categories.iter().find(|c| c.tag == tag).cloned() else {
            anyhow::bail!("category {tag} is not a configured crawl target");
        };

        if self.try_begin("resume_sync").is_none() {
            return Ok(SyncRun::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        let started_at = Utc::now();
        let stored_before = self.store.load(tag).await?;
        let resume_from = stored_before.last().map(|record| record.url.clone());
        info!(category = %tag, resume_from = resume_from.as_deref().unwrap_or("<none>"), "resuming category walk");

        let outcome = self
            .walker()
            .walk(&category, WalkMode::Incremental { resume_from })
            .await?;
        let diff = reconcile(&stored_before, &outcome.seen);

        let report = SyncReport {
            action: "resume_sync".to_string(),
            started_at,
            finished_at: Utc::now(),
            categories: vec![CategorySummary {
                category: outcome.category,
                pages: outcome.pages,
                seen: outcome.seen.len(),
                new_records: outcome.new_records,
                diff,
            }],
        };
        Ok(SyncRun::Completed(report))
    }

    /// Explicit opt-in cleanup: drops stored products a run reported as no
    /// longer listed. Never called implicitly by a sync. Returns the number
    /// of records dropped.
    pub async fn remove_obsolete(&self, report: &SyncReport) -> Result<usize> {
        if self.try_begin("remove_obsolete").is_none() {
            return Ok(0);
        }
        let _guard = RunGuard(&self.running);

        let mut dropped_total = 0usize;
        for summary in &report.categories {
            if summary.diff.removed.is_empty() {
                continue;
            }
            let obsolete: HashSet<&str> = summary.diff.removed.iter().map(String::as_str).collect();
            let records = self.store.load(summary.category).await?;
            let before = records.len();
            let retained: Vec<ProductRecord> = records
                .into_iter()
                .filter(|record| !obsolete.contains(record.url.as_str()))
                .collect();
            let dropped = before - retained.len();
            if dropped > 0 {
                self.store.overwrite(summary.category, &retained).await?;
                warn!(category = %summary.category, dropped, "removed obsolete products");
                dropped_total += dropped;
            }
        }
        Ok(dropped_total)
    }
}
