//! Immersive Turntable Library
//!
//! Interactive rotation and material-switching engine for product views built
//! from pre-rendered frame sequences.

pub mod cache;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod gesture;
pub mod resolver;
pub mod rotation;
pub mod settings;
pub mod telemetry;

// Re-export commonly used types
pub use cache::{AssetCache, AssetFetcher, FrameOutcome, FrameResource, FsFetcher};
pub use catalog::{ComplianceList, Encoding, FrameSequenceDescriptor, MaterialCategory, MaterialId, MaterialOption, Product};
pub use engine::{DisplayedResource, Engine, ViewSnapshot};
pub use error::{EngineError, EngineResult, ValidationError};
pub use gesture::{GestureInterpreter, InputEvent, Intent};
pub use resolver::{MaterialResolver, PriceInfo, PriceValidator};
pub use rotation::{Mode, RotationMachine, RotationState};
pub use settings::EngineSettings;
