use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog partition tags mirroring the sections of the scraped storefront.
/// `Gebraucht` is the catch-all feed of all used bikes; the rest are the
/// curated category listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Sales,
    Gebraucht,
    TrekkingCity,
    Trekking,
    City,
    Urban,
    Mountain,
    Hardtail,
    Fully,
    Cargo,
    Speed,
    Gravel,
    Kids,
    Classic,
}

impl Category {
    pub fn key(&self) -> &'static str {
        match self {
            Category::Sales => "sales",
            Category::Gebraucht => "gebraucht",
            Category::TrekkingCity => "trekking-city",
            Category::Trekking => "trekking",
            Category::City => "city",
            Category::Urban => "urban",
            Category::Mountain => "mountain",
            Category::Hardtail => "hardtail",
            Category::Fully => "fully",
            Category::Cargo => "cargo",
            Category::Speed => "speed",
            Category::Gravel => "gravel",
            Category::Kids => "kids",
            Category::Classic => "classic",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "sales" => Some(Category::Sales),
            "gebraucht" => Some(Category::Gebraucht),
            "trekking-city" => Some(Category::TrekkingCity),
            "trekking" => Some(Category::Trekking),
            "city" => Some(Category::City),
            "urban" => Some(Category::Urban),
            "mountain" => Some(Category::Mountain),
            "hardtail" => Some(Category::Hardtail),
            "fully" => Some(Category::Fully),
            "cargo" => Some(Category::Cargo),
            "speed" => Some(Category::Speed),
            "gravel" => Some(Category::Gravel),
            "kids" => Some(Category::Kids),
            "classic" => Some(Category::Classic),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips() {
        for category in [
            Category::Sales,
            Category::Gebraucht,
            Category::TrekkingCity,
            Category::Classic,
        ] {
            assert_eq!(Category::from_key(category.key()), Some(category));
        }
        assert_eq!(Category::from_key("mopeds"), None);
    }

    #[test]
    fn serializes_as_kebab_case_tag() {
        let json = serde_json::to_string(&Category::TrekkingCity).unwrap();
        assert_eq!(json, "\"trekking-city\"");
        let back: Category = serde_json::from_str("\"gebraucht\"").unwrap();
        assert_eq!(back, Category::Gebraucht);
    }
}
