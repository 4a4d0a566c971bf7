//! Global compliance allow-list
//!
//! The authoritative set of materials that may be presented or sold at all,
//! checked independently of any single product's configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::MaterialId;

/// Materials permitted to be displayed/sold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplianceList {
    allowed: BTreeSet<MaterialId>,
}

impl ComplianceList {
    /// Create an empty list (nothing allowed)
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` may be presented
    pub fn allows(&self, id: &MaterialId) -> bool {
        self.allowed.contains(id)
    }

    /// Add a material to the list
    pub fn allow(&mut self, id: impl Into<MaterialId>) {
        self.allowed.insert(id.into());
    }

    /// Remove a material from the list
    pub fn revoke(&mut self, id: &MaterialId) -> bool {
        self.allowed.remove(id)
    }

    /// Number of allowed materials
    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    /// Check if nothing is allowed
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Iterate allowed ids in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &MaterialId> {
        self.allowed.iter()
    }
}

impl<T: Into<MaterialId>> FromIterator<T> for ComplianceList {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            allowed: iter.into_iter().map(Into::into).collect(),
        }
    }
}
