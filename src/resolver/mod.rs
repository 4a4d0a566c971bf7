//! Material resolver
//!
//! Maps a (product, material) pair to a validated frame-sequence descriptor
//! and a price. A material must be offered by the product, flagged compliant
//! in its record, and present on the global compliance allow-list.

mod price;

pub use price::{round_cents, PriceInfo, PriceRequest, PriceResponse, PriceSource, PriceValidator};

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{ComplianceList, FrameSequenceDescriptor, MaterialId, MaterialOption, Product};
use crate::error::ValidationError;

/// Validated output of a resolve
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub material: MaterialId,
    pub descriptor: Arc<FrameSequenceDescriptor>,
    pub price: PriceInfo,
}

/// Resolves materials for product views.
///
/// Descriptors are memoized per (product, material) since they never change
/// after a product loads.
#[derive(Debug, Default)]
pub struct MaterialResolver {
    compliance: ComplianceList,
    descriptors: HashMap<(String, MaterialId), Arc<FrameSequenceDescriptor>>,
}

impl MaterialResolver {
    pub fn new(compliance: ComplianceList) -> Self {
        Self {
            compliance,
            descriptors: HashMap::new(),
        }
    }

    /// The global allow-list in force
    pub fn compliance(&self) -> &ComplianceList {
        &self.compliance
    }

    /// Check that `material` may be shown for `product`
    pub fn validate<'p>(
        &self,
        product: &'p Product,
        material: &MaterialId,
    ) -> Result<&'p MaterialOption, ValidationError> {
        let option = product.material(material).ok_or_else(|| ValidationError::NotOffered {
            product: product.id.clone(),
            material: material.clone(),
        })?;

        if !self.compliance.allows(material) {
            return Err(ValidationError::NotCompliant(material.clone()));
        }
        if !option.compliant {
            return Err(ValidationError::FlaggedNonCompliant(material.clone()));
        }
        Ok(option)
    }

    /// Resolve `material` to its descriptor and price
    pub fn resolve(&mut self, product: &Product, material: &MaterialId) -> Result<Resolution, ValidationError> {
        let option = self.validate(product, material)?;
        let price = PriceInfo::compute(product.base_price, option);

        let key = (product.id.clone(), material.clone());
        let descriptor = match self.descriptors.get(&key) {
            Some(descriptor) => Arc::clone(descriptor),
            None => {
                let descriptor = product
                    .sequence(material)
                    .ok_or_else(|| ValidationError::MissingSequence(material.clone()))?;
                descriptor.validate()?;

                let descriptor = Arc::new(descriptor.clone());
                self.descriptors.insert(key, Arc::clone(&descriptor));
                tracing::debug!(
                    target: "immersive_turntable::resolver",
                    product = %product.id,
                    material = %material,
                    frames = descriptor.frame_count,
                    "Resolved frame sequence"
                );
                descriptor
            }
        };

        Ok(Resolution {
            material: material.clone(),
            descriptor,
            price,
        })
    }

    /// Drop memoized descriptors (e.g. when the product view closes)
    pub fn clear(&mut self) {
        self.descriptors.clear();
    }
}
