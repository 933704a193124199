use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::ScrapeError;
use crate::models::{Category, DetailResult};
use crate::parsers::detail::parse_detail_page;
use crate::parsers::listing::{parse_listing_page, ListingPage};
use crate::scrape::PageSource;

/// Owns the lifecycle of the scraping session: one configured HTTP client
/// (user agent, page-load timeout, cookie jar, small connection pool) shared
/// by the walker and the detail fetcher. Strictly one navigation in flight
/// at a time; the pipeline is sequential on purpose.
pub struct HttpSession {
    client: Client,
}

impl HttpSession {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.page_load_timeout_secs))
            .cookie_store(true)
            .pool_max_idle_per_host(2)
            .build()?;
        Ok(Self { client })
    }

    async fn navigate(&self, url: &str) -> Result<String, ScrapeError> {
        debug!("navigating to {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageSource for HttpSession {
    async fn listing_page(
        &self,
        page_url: &str,
        category: Category,
        page_no: u32,
    ) -> Result<ListingPage, ScrapeError> {
        debug!(category = %category, page_no, "loading listing page");
        let html = self.navigate(page_url).await?;
        Ok(parse_listing_page(&html, page_url, category))
    }

    async fn product_detail(&self, url: &str) -> Result<DetailResult, ScrapeError> {
        let html = self.navigate(url).await?;
        Ok(parse_detail_page(&html))
    }
}
