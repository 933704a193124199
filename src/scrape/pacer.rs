use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::info;

use crate::config::Config;

/// Centralized pacing between navigations. Short fixed delays separate
/// detail fetches, pages and categories; on top of that, a long randomized
/// pause fires whenever enough wall-clock run time has elapsed, independent
/// of which category is being processed. The long pause keeps the crawl
/// under the target site's anti-scraping radar.
pub struct Pacer {
    detail_delay: Duration,
    page_delay: Duration,
    category_delay: Duration,
    long_pause_every: Duration,
    long_pause_min: Duration,
    long_pause_max: Duration,
    last_long_pause: Mutex<Instant>,
}

impl Pacer {
    pub fn new(config: &Config) -> Self {
        Self {
            detail_delay: Duration::from_millis(config.detail_delay_ms),
            page_delay: Duration::from_millis(config.page_delay_ms),
            category_delay: Duration::from_millis(config.category_delay_ms),
            long_pause_every: Duration::from_secs(config.long_pause_every_secs),
            long_pause_min: Duration::from_secs(config.long_pause_min_secs),
            long_pause_max: Duration::from_secs(config.long_pause_max_secs),
            last_long_pause: Mutex::new(Instant::now()),
        }
    }

    pub async fn detail_break(&self) {
        sleep(self.detail_delay).await;
    }

    pub async fn page_break(&self) {
        self.maybe_long_pause().await;
        sleep(self.page_delay).await;
    }

    pub async fn category_break(&self) {
        self.maybe_long_pause().await;
        sleep(self.category_delay).await;
    }

    /// Whether the long pause is due, resetting the timer when it is.
    fn take_long_pause_due(&self) -> bool {
        let mut last = self.last_long_pause.lock().unwrap();
        if self.long_pause_every > Duration::ZERO && last.elapsed() >= self.long_pause_every {
            *last = Instant::now();
            true
        } else {
            false
        }
    }

    async fn maybe_long_pause(&self) {
        if !self.take_long_pause_due() {
            return;
        }
        let span = self.long_pause_max.saturating_sub(self.long_pause_min);
        let extra_secs = if span.is_zero() {
            0
        } else {
            rand::rng().random_range(0..=span.as_secs())
        };
        let pause = self.long_pause_min + Duration::from_secs(extra_secs);
        info!("pausing for {}s to stay under the rate-limit radar", pause.as_secs());
        sleep(pause).await;
        *self.last_long_pause.lock().unwrap() = Instant::now();
    }
}
