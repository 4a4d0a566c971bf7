//! Background prefetch of a frame sequence
//!
//! Frames are requested nearest-first around the frame on screen, at most
//! `max_concurrent` at a time. The semaphore is shared across jobs so a
//! superseded material can never add to the load of the current one.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use super::{AssetCache, FrameOutcome, Priority, SequenceRef};
use crate::catalog::MaterialId;
use crate::settings::PrefetchSettings;

/// Totals of a finished prefetch job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchSummary {
    pub loaded: usize,
    pub failed: usize,
}

/// Frame indices of an `n`-frame rotation ordered by circular distance from
/// `center`: center, +1, -1, +2, -2, ...
pub fn prefetch_order(center: usize, frame_count: usize) -> Vec<usize> {
    if frame_count == 0 {
        return Vec::new();
    }
    let center = center % frame_count;
    let mut order = Vec::with_capacity(frame_count);
    order.push(center);
    for step in 1..=frame_count / 2 {
        order.push((center + step) % frame_count);
        let back = (center + frame_count - step) % frame_count;
        if back != (center + step) % frame_count {
            order.push(back);
        }
    }
    order
}

/// Spawns prefetch jobs bounded by a shared concurrency limit
#[derive(Debug, Clone)]
pub struct Preloader {
    permits: Arc<Semaphore>,
}

impl Preloader {
    pub fn new(settings: &PrefetchSettings) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
        }
    }

    /// Start loading every frame of `sequence` except `skip`, nearest to
    /// `center` first
    pub fn start(&self, cache: AssetCache, sequence: SequenceRef, center: usize, skip: Option<usize>) -> PrefetchJob {
        let material = sequence.material().clone();
        let permits = Arc::clone(&self.permits);

        let driver = tokio::spawn(async move {
            let order = prefetch_order(center, sequence.frame_count());
            let mut tasks = JoinSet::new();

            for frame in order {
                if Some(frame) == skip || cache.ready(sequence.material(), frame, &sequence.descriptor.encodings).is_some()
                {
                    continue;
                }
                let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                    break;
                };
                let cache = cache.clone();
                let sequence = sequence.clone();
                tasks.spawn(async move {
                    let _permit = permit;
                    cache.get(&sequence, frame, Priority::Background).await
                });
            }

            let mut summary = PrefetchSummary::default();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(FrameOutcome::Ready(_)) => summary.loaded += 1,
                    Ok(FrameOutcome::Fallback(_)) | Err(_) => summary.failed += 1,
                }
            }
            tracing::debug!(
                target: "immersive_turntable::prefetch",
                material = %sequence.material(),
                loaded = summary.loaded,
                failed = summary.failed,
                "Prefetch finished"
            );
            summary
        });

        PrefetchJob { material, driver }
    }
}

/// A running prefetch of one material
#[derive(Debug)]
pub struct PrefetchJob {
    material: MaterialId,
    driver: JoinHandle<PrefetchSummary>,
}

impl PrefetchJob {
    pub fn material(&self) -> &MaterialId {
        &self.material
    }

    pub fn is_finished(&self) -> bool {
        self.driver.is_finished()
    }

    /// Stop the job and abort its outstanding background fetches
    pub fn cancel(self, cache: &AssetCache) {
        self.driver.abort();
        let cancelled = cache.cancel_background(&self.material);
        tracing::debug!(
            target: "immersive_turntable::prefetch",
            material = %self.material,
            cancelled,
            "Prefetch cancelled"
        );
    }

    /// Wait for the job to finish; `None` if it was aborted
    pub async fn finish(self) -> Option<PrefetchSummary> {
        self.driver.await.ok()
    }
}
