//! Material options as delivered by the catalog service

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a selectable material (e.g. `"platinum"`, `"18k-rose"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(String);

impl MaterialId {
    /// Create a material id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MaterialId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MaterialId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Material family, authored explicitly on each option.
///
/// Presentation logic switches on this tag rather than on display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MaterialCategory {
    Platinum,
    WhiteGold,
    YellowGold,
    RoseGold,
    Silver,
    Palladium,
    #[default]
    #[serde(other)]
    Other,
}

impl MaterialCategory {
    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            MaterialCategory::Platinum => "Platinum",
            MaterialCategory::WhiteGold => "White Gold",
            MaterialCategory::YellowGold => "Yellow Gold",
            MaterialCategory::RoseGold => "Rose Gold",
            MaterialCategory::Silver => "Silver",
            MaterialCategory::Palladium => "Palladium",
            MaterialCategory::Other => "Other",
        }
    }

    /// Whether this is one of the gold families
    pub fn is_gold(&self) -> bool {
        matches!(
            self,
            MaterialCategory::WhiteGold | MaterialCategory::YellowGold | MaterialCategory::RoseGold
        )
    }
}

fn default_compliant() -> bool {
    true
}

/// A selectable finish for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialOption {
    /// Unique id within the catalog
    pub id: MaterialId,

    /// Human-readable name
    #[serde(rename = "displayName")]
    pub display_name: String,

    /// Additive price modifier (source of truth when present)
    #[serde(rename = "priceModifier", default)]
    pub price_modifier: Option<f64>,

    /// Multiplicative price factor, only consulted when no modifier is given
    #[serde(rename = "priceMultiplier", default)]
    pub price_multiplier: Option<f64>,

    /// Whether this record may be presented at all
    #[serde(default = "default_compliant")]
    pub compliant: bool,

    /// Material family
    #[serde(default)]
    pub category: MaterialCategory,
}

impl MaterialOption {
    /// Create an option with an additive modifier
    pub fn new(
        id: impl Into<MaterialId>,
        display_name: impl Into<String>,
        price_modifier: f64,
        category: MaterialCategory,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            price_modifier: Some(price_modifier),
            price_multiplier: None,
            compliant: true,
            category,
        }
    }

    /// Additive modifier against `base_price`.
    ///
    /// A multiplier-only record is converted to its additive equivalent.
    pub fn modifier_for(&self, base_price: f64) -> f64 {
        match (self.price_modifier, self.price_multiplier) {
            (Some(modifier), _) => modifier,
            (None, Some(multiplier)) => base_price * (multiplier - 1.0),
            (None, None) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_deserializes_kebab_case() {
        let category: MaterialCategory = serde_json::from_str("\"rose-gold\"").unwrap();
        assert_eq!(category, MaterialCategory::RoseGold);
        assert!(category.is_gold());

        let unknown: MaterialCategory = serde_json::from_str("\"titanium\"").unwrap();
        assert_eq!(unknown, MaterialCategory::Other);
    }

    #[test]
    fn test_modifier_prefers_additive() {
        let mut option = MaterialOption::new("pt", "Platinum", 200.0, MaterialCategory::Platinum);
        option.price_multiplier = Some(3.0);
        assert_eq!(option.modifier_for(1000.0), 200.0);

        option.price_modifier = None;
        assert!((option.modifier_for(1000.0) - 2000.0).abs() < 1e-9);

        option.price_multiplier = None;
        assert_eq!(option.modifier_for(1000.0), 0.0);
    }

    #[test]
    fn test_option_defaults_from_json() {
        let option: MaterialOption =
            serde_json::from_str(r#"{"id":"yg","displayName":"Yellow Gold"}"#).unwrap();
        assert!(option.compliant);
        assert_eq!(option.category, MaterialCategory::Other);
        assert_eq!(option.price_modifier, None);
    }
}
