use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::models::DetailResult;
use crate::scrape::PageSource;

/// Retrieves a product's detail page with bounded retries. Detail-fetch
/// failure must never abort a category walk, so exhausting the retries
/// degrades to a placeholder result instead of an error.
pub struct DetailFetcher {
    attempts: u32,
    backoff: Duration,
}

impl DetailFetcher {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff,
        }
    }

    /// The pause grows with the attempt number: with the default 4s base,
    /// retries wait 4s then 8s.
    pub async fn fetch(&self, source: &dyn PageSource, url: &str) -> DetailResult {
        for attempt in 1..=self.attempts {
            match source.product_detail(url).await {
                Ok(detail) => return detail,
                Err(e) => {
                    warn!(attempt, max = self.attempts, "detail fetch failed for {url}: {e}");
                    if attempt < self.attempts {
                        sleep(self.backoff * attempt).await;
                    }
                }
            }
        }
        warn!("giving up on {url} after {} attempts, storing placeholder details", self.attempts);
        DetailResult::placeholder()
    }
}
