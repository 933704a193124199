use anyhow::{Context, Result};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::config::CategoryConfig;
use crate::models::{Category, ProductCard, ProductRecord};
use crate::scrape::{page_url, DetailFetcher, Pacer, PageSource};
use crate::storage::CatalogStore;

/// How a category is walked.
#[derive(Debug, Clone)]
pub enum WalkMode {
    /// Skip products whose URL is already stored; append genuinely new ones
    /// page by page. `resume_from` fast-forwards past all cards until the
    /// given URL is encountered, for continuing an interrupted run.
    Incremental { resume_from: Option<String> },
    /// Ignore existing storage, fetch details for every card, and replace
    /// the category's store at the end of the walk.
    FullReload,
}

/// Result of one category walk. `seen` carries every card observed on the
/// listing pages, known and new alike, because reconciliation needs the
/// full found-this-run set, not just the additions.
#[derive(Debug)]
pub struct CategoryWalkOutcome {
    pub category: Category,
    pub seen: Vec<ProductCard>,
    pub new_records: usize,
    pub pages: u32,
}

/// Walks one category's listing pages in order, driving the detail fetcher
/// for each new product and persisting after every page so an interrupted
/// walk can resume without losing completed pages.
pub struct CategoryWalker<'a> {
    pub source: &'a dyn PageSource,
    pub store: &'a dyn CatalogStore,
    pub fetcher: &'a DetailFetcher,
    pub pacer: &'a Pacer,
    pub page_ceiling: u32,
}

impl CategoryWalker<'_> {
    pub async fn walk(&self, category: &CategoryConfig, mode: WalkMode) -> Result<CategoryWalkOutcome> {
        let tag = category.tag;

        // Reference snapshot, loaded once per walk. Urls fetched during this
        // walk are added so duplicate cards within a run are not re-fetched.
        let mut known: HashSet<String> = match mode {
            WalkMode::Incremental { .. } => self
                .store
                .load(tag)
                .await
                .with_context(|| format!("loading reference snapshot for {tag}"))?
                .into_iter()
                .map(|record| record.url)
                .collect(),
            WalkMode::FullReload => HashSet::new(),
        };

        let mut resume_until = match &mode {
            WalkMode::Incremental { resume_from } => resume_from.clone(),
            WalkMode::FullReload => None,
        };

        let mut seen = Vec::new();
        let mut reload_records = Vec::new();
        let mut new_records = 0usize;
        let mut page_no = 1u32;

        info!(category = %tag, known = known.len(), "walking category");

        loop {
            let url = page_url(&category.url, page_no);
            let page = self
                .source
                .listing_page(&url, tag, page_no)
                .await
                .with_context(|| format!("loading listing page {page_no} for {tag}"))?;

            if page.cards.is_empty() {
                info!(category = %tag, page_no, "no cards on page, stopping pagination");
                break;
            }

            let mut page_batch = Vec::new();
            for card in &page.cards {
                seen.push(card.clone());

                if let Some(marker) = &resume_until {
                    if card.url == *marker {
                        info!(category = %tag, "resume marker found, continuing normally");
                        resume_until = None;
                    }
                    continue;
                }

                if known.contains(&card.url) {
                    continue;
                }
                known.insert(card.url.clone());

                let detail = self.fetcher.fetch(self.source, &card.url).await;
                if detail.degraded {
                    warn!(category = %tag, "stored degraded details for {}", card.url);
                }
                page_batch.push(ProductRecord::from_parts(card.clone(), detail));
                self.pacer.detail_break().await;
            }

            match mode {
                WalkMode::Incremental { .. } => {
                    if !page_batch.is_empty() {
                        new_records += page_batch.len();
                        // Durability point: a crash after this append keeps
                        // every completed page's results.
                        self.store
                            .append_incremental(tag, &page_batch)
                            .await
                            .with_context(|| format!("persisting page {page_no} for {tag}"))?;
                    }
                }
                WalkMode::FullReload => reload_records.append(&mut page_batch),
            }

            if !page.has_next {
                break;
            }
            if page_no >= self.page_ceiling {
                warn!(category = %tag, "page ceiling {} reached, stopping pagination", self.page_ceiling);
                break;
            }
            page_no += 1;
            self.pacer.page_break().await;
        }

        if matches!(mode, WalkMode::FullReload) {
            new_records = reload_records.len();
            self.store
                .overwrite(tag, &reload_records)
                .await
                .with_context(|| format!("replacing catalog for {tag}"))?;
        }

        info!(category = %tag, pages = page_no, new_records, seen = seen.len(), "category walk done");

        Ok(CategoryWalkOutcome {
            category: tag,
            seen,
            new_records,
            pages: page_no,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::scrape::fixture::FixtureSite;
    use crate::storage::JsonCatalogStore;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::tempdir;

    const A: &str = "https://rebike.example/de/bike-a?id=1";
    const B: &str = "https://rebike.example/de/bike-b?id=2";
    const C: &str = "https://rebike.example/de/bike-c?id=3";
    const D: &str = "https://rebike.example/de/bike-d?id=4";

    fn city() -> CategoryConfig {
        CategoryConfig {
            url: "https://rebike.example/de/city-e-bikes".to_string(),
            tag: Category::City,
        }
    }

    fn quiet_pacer() -> Pacer {
        let mut config = Config::default();
        config.detail_delay_ms = 0;
        config.page_delay_ms = 0;
        config.category_delay_ms = 0;
        config.long_pause_every_secs = 0;
        Pacer::new(&config)
    }

    fn incremental() -> WalkMode {
        WalkMode::Incremental { resume_from: None }
    }

    async fn walk(
        site: &FixtureSite,
        store: &dyn CatalogStore,
        mode: WalkMode,
    ) -> Result<CategoryWalkOutcome> {
        let fetcher = DetailFetcher::new(3, Duration::ZERO);
        let pacer = quiet_pacer();
        let walker = CategoryWalker {
            source: site,
            store,
            fetcher: &fetcher,
            pacer: &pacer,
            page_ceiling: 200,
        };
        walker.walk(&city(), mode).await
    }

    fn two_card_site() -> FixtureSite {
        let site = FixtureSite::new();
        site.add_page(
            Category::City,
            1,
            vec![
                FixtureSite::card("Bike A", A, Category::City),
                FixtureSite::card("Bike B", B, Category::City),
            ],
            false,
        );
        site.add_detail(A, FixtureSite::detail_with_description("Rad A"));
        site.add_detail(B, FixtureSite::detail_with_description("Rad B"));
        site
    }

    #[tokio::test]
    async fn empty_store_single_page_walk_persists_both_cards_in_order() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());
        let site = two_card_site();

        let outcome = walk(&site, &store, incremental()).await.unwrap();

        assert_eq!(outcome.new_records, 2);
        assert_eq!(outcome.seen.len(), 2);
        let records = store.load(Category::City).await.unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, ["Bike A", "Bike B"]);
        assert_eq!(records[0].current_base_price, Some(1939.50));
        assert_eq!(records[0].original_base_price, Some(2499.0));
        assert_eq!(records[0].discount_percent, 22);
        assert_eq!(records[0].description, "Rad A");
    }

    #[tokio::test]
    async fn known_products_are_never_refetched() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());

        // First walk sees only A.
        let site = FixtureSite::new();
        site.add_page(
            Category::City,
            1,
            vec![FixtureSite::card("Bike A", A, Category::City)],
            false,
        );
        site.add_detail(A, FixtureSite::detail_with_description("Rad A"));
        walk(&site, &store, incremental()).await.unwrap();

        // Second walk: the listing now shows A and B.
        let site = two_card_site();
        let outcome = walk(&site, &store, incremental()).await.unwrap();

        assert_eq!(outcome.new_records, 1);
        assert_eq!(site.detail_fetches(), vec![B.to_string()]);
        let titles: Vec<_> = store
            .load(Category::City)
            .await
            .unwrap()
            .iter()
            .map(|r| r.title.clone())
            .collect();
        assert_eq!(titles, ["Bike A", "Bike B"]);
    }

    #[tokio::test]
    async fn rerun_against_unchanged_listing_appends_nothing() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());

        let site = two_card_site();
        walk(&site, &store, incremental()).await.unwrap();

        let site = two_card_site();
        let outcome = walk(&site, &store, incremental()).await.unwrap();

        assert_eq!(outcome.new_records, 0);
        assert!(site.detail_fetches().is_empty());
        assert_eq!(store.load(Category::City).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn interrupted_walk_resumes_without_refetching_persisted_pages() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());

        let paged_site = || {
            let site = FixtureSite::new();
            site.add_page(
                Category::City,
                1,
                vec![
                    FixtureSite::card("Bike A", A, Category::City),
                    FixtureSite::card("Bike B", B, Category::City),
                ],
                true,
            );
            site.add_page(
                Category::City,
                2,
                vec![
                    FixtureSite::card("Bike C", C, Category::City),
                    FixtureSite::card("Bike D", D, Category::City),
                ],
                false,
            );
            for (url, desc) in [(A, "Rad A"), (B, "Rad B"), (C, "Rad C"), (D, "Rad D")] {
                site.add_detail(url, FixtureSite::detail_with_description(desc));
            }
            site
        };

        // First run dies after page 1 was persisted: simulate by failing
        // page 2's load.
        let site = paged_site();
        site.fail_listing(Category::City, 2, u32::MAX);
        assert!(walk(&site, &store, incremental()).await.is_err());
        assert_eq!(store.load(Category::City).await.unwrap().len(), 2);

        // Restarted run: nothing already stored is re-fetched, the walk
        // completes pages 1 and 2.
        let site = paged_site();
        let outcome = walk(&site, &store, incremental()).await.unwrap();

        assert_eq!(outcome.new_records, 2);
        assert_eq!(site.detail_fetches(), vec![C.to_string(), D.to_string()]);
        let titles: Vec<_> = store
            .load(Category::City)
            .await
            .unwrap()
            .iter()
            .map(|r| r.title.clone())
            .collect();
        assert_eq!(titles, ["Bike A", "Bike B", "Bike C", "Bike D"]);
    }

    #[tokio::test]
    async fn resume_marker_fast_forwards_past_processed_cards() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());

        let site = FixtureSite::new();
        site.add_page(
            Category::City,
            1,
            vec![
                FixtureSite::card("Bike A", A, Category::City),
                FixtureSite::card("Bike B", B, Category::City),
                FixtureSite::card("Bike C", C, Category::City),
            ],
            false,
        );
        for (url, desc) in [(A, "Rad A"), (B, "Rad B"), (C, "Rad C")] {
            site.add_detail(url, FixtureSite::detail_with_description(desc));
        }

        let mode = WalkMode::Incremental {
            resume_from: Some(B.to_string()),
        };
        let outcome = walk(&site, &store, mode).await.unwrap();

        // A and B are fast-forwarded without detail fetches; C resumes
        // normal processing. All three still count as seen.
        assert_eq!(site.detail_fetches(), vec![C.to_string()]);
        assert_eq!(outcome.seen.len(), 3);
        let titles: Vec<_> = store
            .load(Category::City)
            .await
            .unwrap()
            .iter()
            .map(|r| r.title.clone())
            .collect();
        assert_eq!(titles, ["Bike C"]);
    }

    #[tokio::test]
    async fn duplicate_cards_within_a_page_are_fetched_once() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());

        let site = FixtureSite::new();
        site.add_page(
            Category::City,
            1,
            vec![
                FixtureSite::card("Bike A", A, Category::City),
                FixtureSite::card("Bike A", A, Category::City),
            ],
            false,
        );
        site.add_detail(A, FixtureSite::detail_with_description("Rad A"));

        let outcome = walk(&site, &store, incremental()).await.unwrap();

        assert_eq!(outcome.new_records, 1);
        assert_eq!(site.detail_fetches(), vec![A.to_string()]);
    }

    #[tokio::test]
    async fn page_ceiling_stops_a_runaway_pagination() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());

        let site = FixtureSite::new();
        for page_no in 1..=10 {
            let url = format!("https://rebike.example/de/bike-p{page_no}?id={page_no}");
            site.add_page(
                Category::City,
                page_no,
                vec![FixtureSite::card(&format!("Bike {page_no}"), &url, Category::City)],
                true,
            );
        }

        let fetcher = DetailFetcher::new(1, Duration::ZERO);
        let pacer = quiet_pacer();
        let walker = CategoryWalker {
            source: &site,
            store: &store,
            fetcher: &fetcher,
            pacer: &pacer,
            page_ceiling: 3,
        };
        let outcome = walker.walk(&city(), incremental()).await.unwrap();

        assert_eq!(outcome.pages, 3);
        assert_eq!(outcome.new_records, 3);
    }

    #[tokio::test]
    async fn full_reload_refetches_everything_and_overwrites() {
        let dir = tempdir().unwrap();
        let store = JsonCatalogStore::new(dir.path());

        let site = two_card_site();
        walk(&site, &store, incremental()).await.unwrap();

        // The site dropped B and now lists only A.
        let site = FixtureSite::new();
        site.add_page(
            Category::City,
            1,
            vec![FixtureSite::card("Bike A", A, Category::City)],
            false,
        );
        site.add_detail(A, FixtureSite::detail_with_description("Rad A neu"));

        let outcome = walk(&site, &store, WalkMode::FullReload).await.unwrap();

        assert_eq!(outcome.new_records, 1);
        assert_eq!(site.detail_fetches(), vec![A.to_string()]);
        let records = store.load(Category::City).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Rad A neu");
    }

    struct BrokenStore;

    #[async_trait]
    impl CatalogStore for BrokenStore {
        async fn load(&self, _category: Category) -> Result<Vec<ProductRecord>> {
            Ok(Vec::new())
        }
        async fn append_incremental(&self, _category: Category, _new: &[ProductRecord]) -> Result<()> {
            Err(anyhow!("disk full"))
        }
        async fn overwrite(&self, _category: Category, _records: &[ProductRecord]) -> Result<()> {
            Err(anyhow!("disk full"))
        }
        async fn contains_url(&self, _category: Category, _url: &str) -> Result<bool> {
            Ok(false)
        }
        async fn load_all(&self, _categories: &[Category]) -> Result<Vec<ProductRecord>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn persistence_failure_stops_the_walk() {
        let site = two_card_site();
        let err = walk(&site, &BrokenStore, incremental()).await.unwrap_err();
        assert!(err.to_string().contains("persisting page 1"));
    }
}
