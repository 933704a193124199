use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::Category;

/// One target of the crawl: a listing URL and the catalog tag its products
/// are filed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub url: String,
    pub tag: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Crawl targets, processed strictly in this order.
    pub categories: Vec<CategoryConfig>,
    pub user_agent: String,
    /// Directory holding the per-category catalog files and the change log.
    pub data_dir: PathBuf,
    pub page_load_timeout_secs: u64,
    pub detail_retry_attempts: u32,
    pub detail_backoff_secs: u64,
    pub detail_delay_ms: u64,
    pub page_delay_ms: u64,
    pub category_delay_ms: u64,
    pub long_pause_every_secs: u64,
    pub long_pause_min_secs: u64,
    pub long_pause_max_secs: u64,
    /// Runaway-loop guard for pagination, far above any real category size.
    pub page_ceiling: u32,
    pub sync_interval_secs: u64,
    /// Optional webhook receiving the run summary after each sync.
    pub webhook_url: Option<String>,
}

impl Config {
    /// Layered load: built-in defaults, then an optional `config` file
    /// (json/toml/yaml), then `BIKE_SYNC__*` environment overrides.
    pub fn load() -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())?;
        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("BIKE_SYNC").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        let categories = [
            ("https://rebike.com/de/rebike1-sales-e-bike-angebote", Category::Sales),
            ("https://rebike.com/de/gebrauchte-e-bikes-und-pedelecs-kaufen", Category::Gebraucht),
            ("https://rebike.com/de/e-bike-kaufen/trekking-city", Category::TrekkingCity),
            ("https://rebike.com/de/trekkingrad-touren-e-bike-kaufen", Category::Trekking),
            ("https://rebike.com/de/city-e-bikes", Category::City),
            ("https://rebike.com/de/urban-e-bikes", Category::Urban),
            ("https://rebike.com/de/e-mountainbikes", Category::Mountain),
            ("https://rebike.com/de/e-mountainbikes/e-bike-hardtail", Category::Hardtail),
            ("https://rebike.com/de/e-mountainbikes/e-bike-fully", Category::Fully),
            ("https://rebike.com/de/e-lastenrad-e-bike-kaufen", Category::Cargo),
            ("https://rebike.com/de/s-pedelecs", Category::Speed),
            ("https://rebike.com/de/e-gravel-rennraeder", Category::Gravel),
            ("https://rebike.com/de/kinder-e-bikes", Category::Kids),
            ("https://rebike.com/de/fahrraeder", Category::Classic),
        ]
        .into_iter()
        .map(|(url, tag)| CategoryConfig {
            url: url.to_string(),
            tag,
        })
        .collect();

        Config {
            categories,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36".to_string(),
            data_dir: PathBuf::from("data"),
            page_load_timeout_secs: 45,
            detail_retry_attempts: 3,
            detail_backoff_secs: 4,
            detail_delay_ms: 1000,
            page_delay_ms: 1500,
            category_delay_ms: 3000,
            long_pause_every_secs: 20 * 60,
            long_pause_min_secs: 60,
            long_pause_max_secs: 7 * 60,
            page_ceiling: 200,
            sync_interval_secs: 6 * 60 * 60,
            webhook_url: None,
        }
    }
}
