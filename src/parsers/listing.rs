use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::models::{Category, ProductCard};
use crate::parsers::clean_text;

/// Everything the walker needs from one category listing page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub cards: Vec<ProductCard>,
    pub has_next: bool,
}

/// Extracts card data and the pagination state from a listing page.
/// Cards without a title or product link are dropped here, so downstream
/// code only ever sees usable cards. An empty `cards` list is the signal
/// that this category has no further pages.
pub fn parse_listing_page(html: &str, page_url: &str, category: Category) -> ListingPage {
    let document = Html::parse_document(html);

    let card_selector = match Selector::parse("div.bike-card, li.bike-card, article.bike-card") {
        Ok(sel) => sel,
        Err(_) => return ListingPage::default(),
    };

    let mut cards = Vec::new();
    for element in document.select(&card_selector) {
        if let Some(card) = extract_card(element, page_url, category) {
            cards.push(card);
        }
    }

    let has_next = has_next_page(&document);
    debug!(
        cards = cards.len(),
        has_next, "extracted listing page {}", page_url
    );

    ListingPage { cards, has_next }
}

fn extract_card(element: ElementRef<'_>, page_url: &str, category: Category) -> Option<ProductCard> {
    let link_selector = Selector::parse(r#"a[href*="/de/"]"#).ok()?;
    let link = element.select(&link_selector).next()?;

    let title = clean_text(&link.text().collect::<String>());
    if title.is_empty() {
        return None;
    }

    let href = link.value().attr("href")?;
    let url = resolve_url(page_url, href)?;

    let mut card = ProductCard {
        title,
        url,
        image_url: String::new(),
        current_price_raw: None,
        original_price_raw: None,
        category,
    };

    if let Ok(price_selector) = Selector::parse("p.css-1bw9inq") {
        if let Some(price_elem) = element.select(&price_selector).next() {
            let text = clean_text(&price_elem.text().collect::<String>());
            if !text.is_empty() {
                card.current_price_raw = Some(text);
            }
        }
    }

    if let Ok(original_selector) = Selector::parse("p.css-1rh6qqp") {
        if let Some(original_elem) = element.select(&original_selector).next() {
            let text = clean_text(&original_elem.text().collect::<String>());
            if !text.is_empty() {
                card.original_price_raw = Some(text);
            }
        }
    }

    if let Ok(img_selector) = Selector::parse("img") {
        if let Some(img) = element.select(&img_selector).next() {
            if let Some(src) = img.value().attr("src") {
                if let Some(resolved) = resolve_url(page_url, src) {
                    card.image_url = resolved;
                }
            }
        }
    }

    Some(card)
}

/// A next page exists when the pagination control is present and not
/// disabled. A missing control ends the category's walk normally.
fn has_next_page(document: &Html) -> bool {
    let selector = match Selector::parse(r#"[aria-label="Next page"], .pagination-next, [class*="next"]"#) {
        Ok(sel) => sel,
        Err(_) => return false,
    };

    document.select(&selector).any(|control| {
        let value = control.value();
        if value.attr("disabled").is_some() {
            return false;
        }
        if value.attr("aria-disabled") == Some("true") {
            return false;
        }
        if value
            .attr("class")
            .map(|c| c.contains("disabled"))
            .unwrap_or(false)
        {
            return false;
        }
        true
    })
}

fn resolve_url(base: &str, href: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}
