//! Product records consumed from the catalog service

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::{ComplianceList, FrameSequenceDescriptor, MaterialId, MaterialOption};
use crate::error::{EngineError, EngineResult};

/// A product as loaded once per product view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Catalog id
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Price before any material modifier
    #[serde(rename = "basePrice")]
    pub base_price: f64,

    /// Materials offered for this product
    pub materials: Vec<MaterialOption>,

    /// One frame sequence per renderable material
    #[serde(default)]
    pub sequences: Vec<FrameSequenceDescriptor>,

    /// Material shown when the view opens
    #[serde(rename = "defaultMaterial", default)]
    pub default_material: Option<MaterialId>,
}

impl Product {
    /// Parse a product record from JSON
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Config(format!("invalid product record: {}", e)))
    }

    /// Load a product record from a JSON file
    pub fn load(path: &Path) -> EngineResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Look up an offered material
    pub fn material(&self, id: &MaterialId) -> Option<&MaterialOption> {
        self.materials.iter().find(|m| &m.id == id)
    }

    /// Look up the frame sequence of a material
    pub fn sequence(&self, id: &MaterialId) -> Option<&FrameSequenceDescriptor> {
        self.sequences.iter().find(|s| &s.material == id)
    }

    /// Materials that pass both the record flag and the global allow-list
    pub fn compliant_materials<'a>(
        &'a self,
        compliance: &'a ComplianceList,
    ) -> impl Iterator<Item = &'a MaterialOption> + 'a {
        self.materials
            .iter()
            .filter(move |m| m.compliant && compliance.allows(&m.id))
    }

    /// The material to open the view with.
    ///
    /// Uses the declared default when it is compliant, otherwise the first
    /// compliant material.
    pub fn initial_material(&self, compliance: &ComplianceList) -> Option<MaterialId> {
        let declared = self
            .default_material
            .as_ref()
            .and_then(|id| self.material(id))
            .filter(|m| m.compliant && compliance.allows(&m.id));

        declared
            .or_else(|| self.compliant_materials(compliance).next())
            .map(|m| m.id.clone())
    }
}
