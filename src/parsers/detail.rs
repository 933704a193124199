use scraper::{Html, Selector};

use crate::models::{DetailResult, DESCRIPTION_PLACEHOLDER};
use crate::parsers::clean_text;

const MAX_IMAGES: usize = 8;
const MAX_SPEC_KEY_LEN: usize = 50;
const MAX_SPEC_VALUE_LEN: usize = 100;

/// Substrings identifying the specification table among the page's tables.
const SPEC_TABLE_MARKERS: [&str; 3] = ["Artikel-Nr", "Motor", "Akku"];

/// Phrases marking the usage paragraph that is appended to the description.
const USAGE_MARKERS: [&str; 3] = ["Für den Alltag", "eignet sich für", "Körpergröße"];

/// Extracts the extended product fields from a detail page. Total: any
/// missing structure degrades to empty fields or the placeholder
/// description, never an error.
pub fn parse_detail_page(html: &str) -> DetailResult {
    let document = Html::parse_document(html);

    DetailResult {
        images: extract_images(&document),
        description: extract_description(&document),
        specifications: extract_specifications(&document),
        degraded: false,
    }
}

fn extract_images(document: &Html) -> Vec<String> {
    let selector = match Selector::parse(r#"img[src*="rebike-photo-nas"]"#) {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };

    let mut images = Vec::new();
    for img in document.select(&selector) {
        if let Some(src) = img.value().attr("src") {
            if !src.is_empty() && !images.iter().any(|existing| existing == src) {
                images.push(src.to_string());
                if images.len() == MAX_IMAGES {
                    break;
                }
            }
        }
    }
    images
}

/// Page heading first, meta description as fallback, optionally appended
/// with the usage paragraph ("Für den Alltag geeignet…").
fn extract_description(document: &Html) -> String {
    let mut description = String::new();

    if let Ok(h1_selector) = Selector::parse("h1") {
        if let Some(heading) = document.select(&h1_selector).next() {
            let text = clean_text(&heading.text().collect::<String>());
            if text.chars().count() > 20 {
                description = text;
            }
        }
    }

    if description.is_empty() {
        if let Ok(meta_selector) = Selector::parse(r#"meta[name="description"]"#) {
            if let Some(meta) = document.select(&meta_selector).next() {
                if let Some(content) = meta.value().attr("content") {
                    description = clean_text(content);
                }
            }
        }
    }

    if !description.is_empty() {
        if let Some(usage) = extract_usage_paragraph(document) {
            description.push_str(". ");
            description.push_str(&usage);
        }
    }

    if description.is_empty() {
        description = DESCRIPTION_PLACEHOLDER.to_string();
    }
    description
}

fn extract_usage_paragraph(document: &Html) -> Option<String> {
    let p_selector = Selector::parse("p").ok()?;
    for paragraph in document.select(&p_selector) {
        let text = clean_text(&paragraph.text().collect::<String>());
        if USAGE_MARKERS.iter().any(|marker| text.contains(marker)) {
            return Some(text);
        }
    }
    None
}

/// Finds the table carrying the spec markers and reads its header/value
/// cell pairs in row order. Pairs with oversized keys or values are noise
/// from layout tables and get filtered out.
fn extract_specifications(document: &Html) -> Vec<(String, String)> {
    let table_selector = match Selector::parse("table") {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };

    let spec_table = document.select(&table_selector).find(|table| {
        let text = table.text().collect::<String>();
        SPEC_TABLE_MARKERS.iter().any(|marker| text.contains(marker))
    });

    let Some(table) = spec_table else {
        return Vec::new();
    };

    let (Ok(row_selector), Ok(th_selector), Ok(td_selector)) = (
        Selector::parse("tr"),
        Selector::parse("th"),
        Selector::parse("td"),
    ) else {
        return Vec::new();
    };

    let mut specs = Vec::new();
    for row in table.select(&row_selector) {
        let th = row.select(&th_selector).next();
        let td = row.select(&td_selector).next();
        if let (Some(th), Some(td)) = (th, td) {
            let key = clean_text(&th.text().collect::<String>());
            let value = clean_text(&td.text().collect::<String>());
            if !key.is_empty()
                && !value.is_empty()
                && key.chars().count() < MAX_SPEC_KEY_LEN
                && value.chars().count() < MAX_SPEC_VALUE_LEN
            {
                specs.push((key, value));
            }
        }
    }
    specs
}
