//! Catalog records consumed by the engine
//!
//! Products, their material options and frame sequences, plus the global
//! compliance allow-list. All of it is read-only input fetched once per
//! product view.

mod compliance;
mod material;
mod product;
mod sequence;

pub use compliance::ComplianceList;
pub use material::{MaterialCategory, MaterialId, MaterialOption};
pub use product::Product;
pub use sequence::{Encoding, FrameSequenceDescriptor};
