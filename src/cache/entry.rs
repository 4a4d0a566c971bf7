//! Cache keys, resources and fetch outcomes

use bytes::Bytes;
use std::sync::Arc;

use crate::catalog::{Encoding, FrameSequenceDescriptor, MaterialId};

/// Identity of one cached image
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub material: MaterialId,
    pub frame: usize,
    pub encoding: Encoding,
}

impl CacheKey {
    pub fn new(material: MaterialId, frame: usize, encoding: Encoding) -> Self {
        Self {
            material,
            frame,
            encoding,
        }
    }
}

/// A loaded frame image ready to hand to the render surface.
///
/// Cloning is cheap: the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameResource {
    pub key: CacheKey,
    pub bytes: Bytes,
    /// Serial of the network fetch that produced this payload
    pub fetch_serial: u64,
}

impl FrameResource {
    /// Payload size in bytes
    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// MIME type of the payload
    pub fn mime_type(&self) -> &'static str {
        self.key.encoding.mime_type()
    }
}

/// A material's frame sequence together with the product it belongs to.
///
/// Everything the cache needs to render fetch paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRef {
    pub product: Arc<str>,
    pub descriptor: Arc<FrameSequenceDescriptor>,
}

impl SequenceRef {
    pub fn new(product: impl Into<Arc<str>>, descriptor: Arc<FrameSequenceDescriptor>) -> Self {
        Self {
            product: product.into(),
            descriptor,
        }
    }

    pub fn material(&self) -> &MaterialId {
        &self.descriptor.material
    }

    pub fn frame_count(&self) -> usize {
        self.descriptor.frame_count
    }

    /// Rendered path of one frame in one encoding
    pub fn path(&self, frame: usize, encoding: Encoding) -> String {
        self.descriptor.frame_path(&self.product, frame, encoding)
    }
}

/// Which caller a fetch is serving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// The frame on screen; never retried, never cancelled by prefetch
    Interactive,
    /// Speculative prefetch; retried with backoff, cancellable
    Background,
}

/// Why `get` could not produce the requested frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Every encoding failed permanently; frame is marked unavailable
    Unavailable,
    /// A transient failure; a later attempt may succeed
    Network(String),
    /// The request was cancelled (superseded prefetch or engine teardown)
    Cancelled,
    /// Frame index outside the sequence
    OutOfRange,
}

/// Result of a cache lookup; never an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Ready(FrameResource),
    Fallback(FallbackReason),
}

impl FrameOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, FrameOutcome::Ready(_))
    }

    pub fn resource(&self) -> Option<&FrameResource> {
        match self {
            FrameOutcome::Ready(resource) => Some(resource),
            FrameOutcome::Fallback(_) => None,
        }
    }
}

/// Circular distance between two frame indices of an `n`-frame rotation
pub fn circular_distance(a: usize, b: usize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let d = a.abs_diff(b) % n;
    d.min(n - d)
}
