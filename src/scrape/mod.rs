use async_trait::async_trait;

use crate::error::ScrapeError;
use crate::models::{Category, DetailResult};
use crate::parsers::listing::ListingPage;

mod fetcher;
mod pacer;
mod session;
mod walker;

#[cfg(test)]
pub(crate) mod fixture;

pub use fetcher::DetailFetcher;
pub use pacer::Pacer;
pub use session::HttpSession;
pub use walker::{CategoryWalkOutcome, CategoryWalker, WalkMode};

/// Source of storefront pages. The production implementation navigates the
/// live site through the HTTP session; tests script pages through a fixture,
/// which keeps the walker's state machine testable without network access.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// One navigation attempt to a category listing page. The page URL is
    /// the category URL with the page number appended as a query parameter.
    async fn listing_page(
        &self,
        page_url: &str,
        category: Category,
        page_no: u32,
    ) -> Result<ListingPage, ScrapeError>;

    /// One navigation attempt to a product detail page. Retry policy lives
    /// in [`DetailFetcher`], not here.
    async fn product_detail(&self, url: &str) -> Result<DetailResult, ScrapeError>;
}

/// Appends the page number to a category URL, matching the storefront's
/// `?page=N` pagination scheme.
pub fn page_url(category_url: &str, page_no: u32) -> String {
    let separator = if category_url.contains('?') { '&' } else { '?' };
    format!("{category_url}{separator}page={page_no}")
}
