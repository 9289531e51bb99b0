//! Grouped item catalog: `{group: {item name: definition}}`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::pricing::{
    resolve_item_value, resolve_price_token, ItemDefinition, PriceTable, ValuationPolicy,
    ValueResult,
};
use crate::ValueError;

/// Category group an item belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "items")]
    Standard,
    #[serde(rename = "event_items")]
    Event,
    #[serde(rename = "miscellaneous_items")]
    Miscellaneous,
    #[serde(rename = "kukri_items")]
    Special,
}

impl Category {
    /// Lookup order; the first group holding a name wins.
    pub const ALL: [Category; 4] = [
        Category::Standard,
        Category::Event,
        Category::Miscellaneous,
        Category::Special,
    ];

    /// Key of the group in the values document.
    pub fn group_key(self) -> &'static str {
        match self {
            Category::Standard => "items",
            Category::Event => "event_items",
            Category::Miscellaneous => "miscellaneous_items",
            Category::Special => "kukri_items",
        }
    }

    /// Whether items of this group are told apart by serial.
    pub fn takes_serial(self) -> bool {
        matches!(self, Category::Standard | Category::Special)
    }
}

/// Read-only item catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "items", default)]
    pub standard: IndexMap<String, ItemDefinition>,
    #[serde(rename = "event_items", default)]
    pub event: IndexMap<String, ItemDefinition>,
    #[serde(rename = "miscellaneous_items", default)]
    pub miscellaneous: IndexMap<String, ItemDefinition>,
    #[serde(rename = "kukri_items", default)]
    pub special: IndexMap<String, ItemDefinition>,
}

impl Catalog {
    pub fn from_json_str(text: &str) -> Result<Self, ValueError> {
        serde_json::from_str(text).map_err(|e| ValueError::InvalidCatalog(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ValueError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| ValueError::InvalidCatalog(format!("{}: {e}", path.display())))?;
        let catalog = Self::from_json_str(&text)?;
        debug!(path = %path.display(), items = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn group(&self, category: Category) -> &IndexMap<String, ItemDefinition> {
        match category {
            Category::Standard => &self.standard,
            Category::Event => &self.event,
            Category::Miscellaneous => &self.miscellaneous,
            Category::Special => &self.special,
        }
    }

    /// Case-sensitive lookup returning the item and its group.
    pub fn find(&self, name: &str) -> Option<(Category, &ItemDefinition)> {
        Category::ALL
            .into_iter()
            .find_map(|c| self.group(c).get(name).map(|item| (c, item)))
    }

    pub fn find_item(&self, name: &str) -> Option<&ItemDefinition> {
        self.find(name).map(|(_, item)| item)
    }

    pub fn category_of(&self, name: &str) -> Option<Category> {
        self.find(name).map(|(c, _)| c)
    }

    /// Every item name in group order, then document order within a group.
    pub fn all_item_names(&self) -> impl Iterator<Item = &str> + '_ {
        Category::ALL
            .into_iter()
            .flat_map(move |c| self.group(c).keys().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|&c| self.group(c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names containing `query`, ignoring case, capped at `limit`.
    pub fn suggest(&self, query: &str, limit: usize) -> Vec<&str> {
        let needle = query.to_lowercase();
        self.all_item_names()
            .filter(|name| name.to_lowercase().contains(&needle))
            .take(limit)
            .collect()
    }

    /// Value an item by name under `policy`.
    pub fn appraise(
        &self,
        name: &str,
        serial: Option<u64>,
        policy: ValuationPolicy,
    ) -> Result<ValueResult, ValueError> {
        let item = self
            .find_item(name)
            .ok_or_else(|| ValueError::ItemNotFound(name.to_string()))?;
        resolve_item_value(name, item, serial, policy)
    }

    /// Amount only; see [`Catalog::appraise`].
    pub fn value_of(
        &self,
        name: &str,
        serial: Option<u64>,
        policy: ValuationPolicy,
    ) -> Result<u64, ValueError> {
        self.appraise(name, serial, policy).map(|v| v.amount)
    }
}

/// Check that every item carries exactly one kind of price information and
/// that all of its price tokens resolve.
pub fn validate_catalog(catalog: &Catalog) -> Result<(), ValueError> {
    for category in Category::ALL {
        for (name, item) in catalog.group(category) {
            let has_bands = item.prices.as_ref().is_some_and(|b| !b.is_empty());
            if has_bands && item.price.is_some() {
                return Err(ValueError::AmbiguousPrice(name.clone()));
            }
            match item.price_table() {
                None => return Err(ValueError::ItemNotFound(name.clone())),
                Some(PriceTable::Flat(token)) => {
                    resolve_price_token(token)?;
                }
                Some(PriceTable::Bands(bands)) => {
                    for band in bands {
                        resolve_price_token(&band.price)?;
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::MissingBand;

    const DOC: &str = r#"{
        "items": {
            "Gold Kukri": {
                "prices": [
                    {"range": [1, 100], "price": "500k"},
                    {"range": [1000, 101], "price": "150-200k"}
                ],
                "demand": "High",
                "stability": "Rising"
            },
            "Iron Sword": {"price": "60k", "demand": "Low", "stability": "Stable"}
        },
        "event_items": {
            "Pumpkin Hat": {"price": "2M"}
        },
        "miscellaneous_items": {
            "Golden Sword Skin": {"price": "25k"}
        },
        "kukri_items": {
            "Blood Kukri": {"prices": [{"range": [1, 50000], "price": "1.5M"}]}
        }
    }"#;

    fn catalog() -> Catalog {
        Catalog::from_json_str(DOC).unwrap()
    }

    #[test]
    fn lookup_finds_group() {
        let c = catalog();
        assert_eq!(c.len(), 5);
        assert_eq!(c.category_of("Gold Kukri"), Some(Category::Standard));
        assert_eq!(c.category_of("Pumpkin Hat"), Some(Category::Event));
        assert_eq!(c.category_of("Blood Kukri"), Some(Category::Special));
        assert_eq!(c.category_of("gold kukri"), None);
        assert!(c.find_item("Iron Sword").is_some());
    }

    #[test]
    fn first_group_wins_on_duplicates() {
        let mut c = catalog();
        let dup = c.event["Pumpkin Hat"].clone();
        c.standard.insert("Pumpkin Hat".to_string(), dup);
        assert_eq!(c.category_of("Pumpkin Hat"), Some(Category::Standard));
    }

    #[test]
    fn suggestions_are_case_insensitive_and_capped() {
        let c = catalog();
        assert_eq!(c.suggest("KUKRI", 25), vec!["Gold Kukri", "Blood Kukri"]);
        assert_eq!(c.suggest("sword", 1), vec!["Iron Sword"]);
        assert_eq!(c.suggest("", 25).len(), 5);
    }

    #[test]
    fn suggestions_keep_document_order() {
        let c = Catalog::from_json_str(
            r#"{"event_items": {"Zebra Hat": {"price": "1k"}, "Apple Hat": {"price": "2k"}}}"#,
        )
        .unwrap();
        assert_eq!(c.suggest("hat", 25), vec!["Zebra Hat", "Apple Hat"]);
    }

    #[test]
    fn appraise_uses_bands() {
        let c = catalog();
        let v = c.appraise("Gold Kukri", Some(500), ValuationPolicy::LOOKUP).unwrap();
        assert_eq!(v.amount, 175_000);
        assert_eq!(v.stability, "Rising");
        let v = c.appraise("Gold Kukri", None, ValuationPolicy::LOOKUP).unwrap();
        assert_eq!(v.amount, 500_000);
        assert!(v.is_high_serial_default);
        let strict_tail = ValuationPolicy {
            missing_band: MissingBand::Fail,
            ..ValuationPolicy::SETTLEMENT
        };
        assert!(c.appraise("Gold Kukri", Some(5000), strict_tail).is_err());
    }

    #[test]
    fn unknown_item() {
        assert_eq!(
            catalog().value_of("Nope", None, ValuationPolicy::LOOKUP),
            Err(ValueError::ItemNotFound("Nope".to_string()))
        );
    }

    #[test]
    fn validation() {
        let mut c = catalog();
        validate_catalog(&c).unwrap();
        c.event.get_mut("Pumpkin Hat").unwrap().price = Some("2x".to_string());
        assert!(matches!(
            validate_catalog(&c),
            Err(ValueError::InvalidAmountFormat(_))
        ));
        let mut c = catalog();
        c.standard.get_mut("Gold Kukri").unwrap().price = Some("1k".to_string());
        assert_eq!(
            validate_catalog(&c),
            Err(ValueError::AmbiguousPrice("Gold Kukri".to_string()))
        );
    }

    #[test]
    fn malformed_document() {
        assert!(matches!(
            Catalog::from_json_str("{\"items\": []}"),
            Err(ValueError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn bundled_values_document_is_valid() {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../assets/values.json");
        let c = Catalog::load(path).unwrap();
        validate_catalog(&c).unwrap();
        assert!(!c.is_empty());
    }
}
