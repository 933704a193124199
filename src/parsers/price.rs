use once_cell::sync::Lazy;
use regex::Regex;

static PRICE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:[.,]\d{3})*(?:[.,]\d{2})?")
        .expect("Invalid price regex")
});

/// Parses a locale-formatted price string ("1.939,50 €") into a numeric
/// amount. The first price-shaped token is extracted, then disambiguated:
/// a comma, when present, is the decimal separator and dots in the integer
/// part are thousands separators; without a comma every dot is a thousands
/// separator. Returns `None` on input with no price token; never panics.
pub fn parse_price(raw: &str) -> Option<f64> {
    let token = PRICE_TOKEN.find(raw)?.as_str();

    let normalized = match token.split_once(',') {
        Some((whole, decimal)) => format!("{}.{}", whole.replace('.', ""), decimal),
        None => token.replace('.', ""),
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Discount in whole percent between an original and a current price.
/// Only a real markdown counts: both prices present and `original > current > 0`.
pub fn discount_percent(original: Option<f64>, current: Option<f64>) -> u8 {
    match (original, current) {
        (Some(original), Some(current)) if original > current && current > 0.0 => {
            ((1.0 - current / original) * 100.0).round() as u8
        }
        _ => 0,
    }
}
