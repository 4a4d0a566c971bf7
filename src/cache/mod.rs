//! Frame asset caching
//!
//! - [`AssetCache`]: deduplicated, bounded frame loading with fallbacks
//! - [`FrameStore`]: the LRU behind it
//! - [`Preloader`]: nearest-first background prefetch
//! - [`AssetFetcher`]: storage seam, with [`FsFetcher`] for local trees

mod asset_cache;
mod entry;
mod fetcher;
mod prefetch;
mod store;

#[cfg(test)]
pub(crate) mod mock;

pub use asset_cache::{AssetCache, CacheStats, HealthReport, HealthStatus};
pub use entry::{circular_distance, CacheKey, FallbackReason, FrameOutcome, FrameResource, Priority, SequenceRef};
pub use fetcher::{sniff, AssetFetcher, FetchError, FetchRequest, FsFetcher};
pub use prefetch::{prefetch_order, PrefetchJob, PrefetchSummary, Preloader};
pub use store::FrameStore;
