//! Price computation and the optional server-side validation hook

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::catalog::{MaterialId, MaterialOption};
use crate::error::EngineError;

/// Where the displayed price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Computed locally from the catalog record
    #[default]
    Local,
    /// Confirmed by the price-validation endpoint
    Validated,
}

/// Price of a product in one material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceInfo {
    /// Product price before the material
    pub base_price: f64,
    /// Additive material modifier (canonical)
    pub modifier: f64,
    /// `1 + modifier / base_price`, derived for display only
    pub multiplier: f64,
    /// Price shown to the shopper
    pub total: f64,
    pub source: PriceSource,
}

impl PriceInfo {
    /// Compute the local price of `option` on a product costing `base_price`
    pub fn compute(base_price: f64, option: &MaterialOption) -> Self {
        let modifier = round_cents(option.modifier_for(base_price));
        let multiplier = if base_price.abs() > f64::EPSILON {
            1.0 + modifier / base_price
        } else {
            1.0
        };

        Self {
            base_price,
            modifier,
            multiplier,
            total: round_cents(base_price + modifier),
            source: PriceSource::Local,
        }
    }

    /// Replace the total with a server-confirmed figure
    pub fn with_validated_total(mut self, total: f64) -> Self {
        self.total = round_cents(total);
        self.source = PriceSource::Validated;
        self
    }
}

/// Round to whole cents
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Request body for the price-validation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRequest {
    pub product_id: String,
    pub material_id: MaterialId,
}

/// Response body of the price-validation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub validated_price: f64,
}

/// Server-side price check.
///
/// The engine never waits on this before showing a price: the local figure
/// is displayed first and replaced when (and if) validation succeeds.
pub trait PriceValidator: Send + Sync {
    fn validate(&self, request: PriceRequest) -> BoxFuture<'static, Result<PriceResponse, EngineError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MaterialCategory;

    #[test]
    fn test_additive_price() {
        let option = MaterialOption::new("pt", "Platinum", 200.0, MaterialCategory::Platinum);
        let price = PriceInfo::compute(1000.0, &option);
        assert_eq!(price.total, 1200.0);
        assert_eq!(price.modifier, 200.0);
        assert!((price.multiplier - 1.2).abs() < 1e-9);
        assert_eq!(price.source, PriceSource::Local);
    }

    #[test]
    fn test_multiplier_only_record() {
        let mut option = MaterialOption::new("rg", "Rose Gold", 0.0, MaterialCategory::RoseGold);
        option.price_modifier = None;
        option.price_multiplier = Some(1.15);

        let price = PriceInfo::compute(999.99, &option);
        assert_eq!(price.modifier, 150.0);
        assert_eq!(price.total, 1149.99);
    }

    #[test]
    fn test_zero_base_price_multiplier() {
        let option = MaterialOption::new("ag", "Silver", 35.0, MaterialCategory::Silver);
        let price = PriceInfo::compute(0.0, &option);
        assert_eq!(price.total, 35.0);
        assert_eq!(price.multiplier, 1.0);
    }

    #[test]
    fn test_validated_total() {
        let option = MaterialOption::new("pt", "Platinum", 200.0, MaterialCategory::Platinum);
        let price = PriceInfo::compute(1000.0, &option).with_validated_total(1189.994);
        assert_eq!(price.total, 1189.99);
        assert_eq!(price.source, PriceSource::Validated);
    }

    #[test]
    fn test_request_wire_format() {
        let request = PriceRequest {
            product_id: "ring-1".to_string(),
            material_id: MaterialId::from("pt"),
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"productId":"ring-1","materialId":"pt"}"#
        );
        let response: PriceResponse = serde_json::from_str(r#"{"validatedPrice": 10.5}"#).unwrap();
        assert_eq!(response.validated_price, 10.5);
    }
}
