use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use super::Category;
use crate::parsers::price::{discount_percent, parse_price};

/// Placeholder shown by the storefront while a product description is
/// missing, also used when detail enrichment fails permanently.
pub const DESCRIPTION_PLACEHOLDER: &str = "Beschreibung wird geladen...";

/// Lightweight per-product data extracted from a category listing page,
/// before detail enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductCard {
    pub title: String,
    pub url: String,
    pub image_url: String,
    pub current_price_raw: Option<String>,
    pub original_price_raw: Option<String>,
    pub category: Category,
}

/// Extended fields collected from a product's own detail page.
#[derive(Debug, Clone, Default)]
pub struct DetailResult {
    pub images: Vec<String>,
    pub description: String,
    pub specifications: Vec<(String, String)>,
    /// Set when the fetcher exhausted its retries and substituted
    /// placeholder content.
    pub degraded: bool,
}

impl DetailResult {
    pub fn placeholder() -> Self {
        Self {
            images: Vec::new(),
            description: DESCRIPTION_PLACEHOLDER.to_string(),
            specifications: Vec::new(),
            degraded: true,
        }
    }
}

/// One fully-enriched catalog item, as persisted per category. Field names
/// serialize in camelCase to stay readable by the storefront application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub image_url: String,
    pub category: Category,
    #[serde(default)]
    pub current_price_raw: Option<String>,
    #[serde(default)]
    pub original_price_raw: Option<String>,
    #[serde(default)]
    pub current_base_price: Option<f64>,
    #[serde(default)]
    pub original_base_price: Option<f64>,
    #[serde(default)]
    pub discount_percent: u8,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub specifications: Vec<(String, String)>,
    pub parsed_at: DateTime<Utc>,
}

impl ProductRecord {
    /// Builds the persisted record from a listing card and its detail page
    /// data. Prices are normalized here; a discount is only recorded when
    /// both base prices parsed and the original is genuinely higher.
    pub fn from_parts(card: ProductCard, detail: DetailResult) -> Self {
        let current_base_price = card
            .current_price_raw
            .as_deref()
            .and_then(parse_price);
        let original_base_price = card
            .original_price_raw
            .as_deref()
            .and_then(parse_price);
        let discount = discount_percent(original_base_price, current_base_price);

        let images = if detail.images.is_empty() && !card.image_url.is_empty() {
            vec![card.image_url.clone()]
        } else {
            detail.images
        };

        ProductRecord {
            id: product_id_from_url(&card.url),
            title: card.title,
            url: card.url,
            image_url: card.image_url,
            category: card.category,
            current_price_raw: card.current_price_raw,
            original_price_raw: card.original_price_raw,
            current_base_price,
            original_base_price,
            discount_percent: discount,
            images,
            description: detail.description,
            specifications: detail.specifications,
            parsed_at: Utc::now(),
        }
    }
}

/// Derives a stable product id from its URL. An all-numeric `id` query
/// parameter wins; otherwise the last path segment is percent-decoded and
/// sanitized to `[A-Za-z0-9-]`.
pub fn product_id_from_url(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        for (key, value) in parsed.query_pairs() {
            if key == "id" && !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
                return value.into_owned();
            }
        }
        if let Some(segment) = parsed
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        {
            let decoded = percent_decode_str(segment).decode_utf8_lossy();
            let sanitized = sanitize_id(&decoded);
            if !sanitized.is_empty() {
                return sanitized;
            }
        }
    }
    sanitize_id(url)
}

fn sanitize_id(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_dash = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
            last_dash = c == '-';
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_matches('-').to_string()
}
