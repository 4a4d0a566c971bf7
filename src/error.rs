//! Error taxonomy for the turntable engine
//!
//! Validation failures surface synchronously to the caller. Asset and network
//! failures are handled inside the cache and only ever reach the host as a
//! fallback resource plus a logged/recorded error.

use thiserror::Error;

use crate::catalog::MaterialId;

/// Errors produced by the engine and its components.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Material not permitted for this product, not on the compliance
    /// allow-list, or a malformed sequence/frame request.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Every supported encoding failed to load for one frame.
    #[error("asset unavailable: material {material} frame {frame} ({detail})")]
    AssetUnavailable {
        material: MaterialId,
        frame: usize,
        detail: String,
    },

    /// Transient fetch failure, distinct from permanent unavailability.
    #[error("network error: {0}")]
    Network(String),

    /// Soft signal that cache size or latency crossed a threshold.
    #[error("performance degraded: {0}")]
    PerformanceDegradation(String),

    /// Settings or catalog data could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The engine was used outside of a tokio runtime.
    #[error("no async runtime available: {0}")]
    Runtime(String),
}

/// Reasons a material or frame request is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("material {material} is not offered for product {product}")]
    NotOffered { product: String, material: MaterialId },

    #[error("material {0} is not on the compliance allow-list")]
    NotCompliant(MaterialId),

    #[error("material {0} is flagged non-compliant in the product record")]
    FlaggedNonCompliant(MaterialId),

    #[error("no frame sequence for material {0}")]
    MissingSequence(MaterialId),

    #[error("invalid frame sequence for material {material}: {reason}")]
    InvalidSequence { material: MaterialId, reason: String },

    #[error("frame {frame} out of range for sequence of {count} frames")]
    FrameOutOfRange { frame: usize, count: usize },
}

/// Convenience result alias used across the crate.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_converts_into_engine_error() {
        let err: EngineError = ValidationError::NotCompliant(MaterialId::from("silver")).into();
        assert!(matches!(err, EngineError::Validation(ValidationError::NotCompliant(_))));
        assert_eq!(
            err.to_string(),
            "validation failed: material silver is not on the compliance allow-list"
        );
    }
}
