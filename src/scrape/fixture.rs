//! Scripted [`PageSource`] used by the state-machine tests: listing pages
//! and detail results are registered up front, failures can be injected per
//! URL, and every detail fetch is logged so tests can assert the skip
//! logic's cost-saving property.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::ScrapeError;
use crate::models::{Category, DetailResult, ProductCard};
use crate::parsers::listing::ListingPage;
use crate::scrape::PageSource;

#[derive(Default)]
pub(crate) struct FixtureSite {
    pages: Mutex<HashMap<(Category, u32), ListingPage>>,
    details: Mutex<HashMap<String, DetailResult>>,
    detail_failures: Mutex<HashMap<String, u32>>,
    listing_failures: Mutex<HashMap<(Category, u32), u32>>,
    detail_log: Mutex<Vec<String>>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, category: Category, page_no: u32, cards: Vec<ProductCard>, has_next: bool) {
        self.pages
            .lock()
            .unwrap()
            .insert((category, page_no), ListingPage { cards, has_next });
    }

    pub fn add_detail(&self, url: &str, detail: DetailResult) {
        self.details.lock().unwrap().insert(url.to_string(), detail);
    }

    /// The next `times` fetches of `url` fail with a 503 before the
    /// registered detail (if any) becomes reachable.
    pub fn fail_detail(&self, url: &str, times: u32) {
        self.detail_failures
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
    }

    /// The next `times` loads of the given listing page fail with a 503.
    pub fn fail_listing(&self, category: Category, page_no: u32, times: u32) {
        self.listing_failures
            .lock()
            .unwrap()
            .insert((category, page_no), times);
    }

    /// URLs whose details were fetched, in fetch order.
    pub fn detail_fetches(&self) -> Vec<String> {
        self.detail_log.lock().unwrap().clone()
    }

    pub fn card(title: &str, url: &str, category: Category) -> ProductCard {
        ProductCard {
            title: title.to_string(),
            url: url.to_string(),
            image_url: format!("{url}/thumb.jpg"),
            current_price_raw: Some("1.939,50 €".to_string()),
            original_price_raw: Some("2.499 €".to_string()),
            category,
        }
    }

    pub fn detail_with_description(description: &str) -> DetailResult {
        DetailResult {
            images: vec!["https://rebike-photo-nas.example.com/1.jpg".to_string()],
            description: description.to_string(),
            specifications: vec![("Motor".to_string(), "Bosch".to_string())],
            degraded: false,
        }
    }
}

#[async_trait]
impl PageSource for FixtureSite {
    async fn listing_page(
        &self,
        page_url: &str,
        category: Category,
        page_no: u32,
    ) -> Result<ListingPage, ScrapeError> {
        {
            let mut failures = self.listing_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(&(category, page_no)) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(ScrapeError::Status {
                        status: 503,
                        url: page_url.to_string(),
                    });
                }
            }
        }
        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&(category, page_no))
            .cloned()
            .unwrap_or_default())
    }

    async fn product_detail(&self, url: &str) -> Result<DetailResult, ScrapeError> {
        self.detail_log.lock().unwrap().push(url.to_string());
        {
            let mut failures = self.detail_failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(url) {
                if *remaining > 0 {
                    *remaining = remaining.saturating_sub(1);
                    return Err(ScrapeError::Status {
                        status: 503,
                        url: url.to_string(),
                    });
                }
            }
        }
        Ok(self
            .details
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default())
    }
}
