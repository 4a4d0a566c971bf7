//! Scriptable in-memory fetcher for tests

use bytes::Bytes;
use futures_util::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::fetcher::fake_payload;
use super::{AssetFetcher, FetchError, FetchRequest};
use crate::catalog::{Encoding, MaterialId};

#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    delay: Duration,
    /// Per-material delay overrides
    material_delay: Mutex<HashMap<MaterialId, Duration>>,
    /// (material, frame) pairs missing in every encoding
    missing_frames: Mutex<HashSet<(MaterialId, usize)>>,
    missing_encodings: Mutex<HashSet<Encoding>>,
    /// Remaining calls that fail transiently before succeeding
    transient_failures: AtomicUsize,
    /// Per-frame transient failures, all encodings
    transient_frames: Mutex<HashMap<(MaterialId, usize), usize>>,
    calls: Mutex<Vec<String>>,
    started: AtomicUsize,
    completed: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn set_material_delay(&self, material: &str, delay: Duration) {
        self.material_delay.lock().insert(MaterialId::from(material), delay);
    }

    pub fn remove_frame(&self, material: &str, frame: usize) {
        self.missing_frames.lock().insert((MaterialId::from(material), frame));
    }

    pub fn remove_encoding(&self, encoding: Encoding) {
        self.missing_encodings.lock().insert(encoding);
    }

    pub fn fail_transiently(&self, times: usize) {
        self.transient_failures.store(times, Ordering::SeqCst);
    }

    pub fn fail_frame_transiently(&self, material: &str, frame: usize, times: usize) {
        self.transient_frames.lock().insert((MaterialId::from(material), frame), times);
    }

    /// Paths requested so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    /// Paths whose futures ran to completion
    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().clone()
    }
}

impl MockFetcher {
    fn take_frame_failure(&self, material: &MaterialId, frame: usize) -> bool {
        let mut frames = self.transient_frames.lock();
        match frames.get_mut(&(material.clone(), frame)) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl AssetFetcher for MockFetcher {
    fn fetch(&self, request: &FetchRequest) -> BoxFuture<'static, Result<Bytes, FetchError>> {
        self.calls.lock().push(request.path.clone());
        self.started.fetch_add(1, Ordering::SeqCst);

        let key = request.key.clone();
        let path = request.path.clone();
        let delay = self
            .material_delay
            .lock()
            .get(&key.material)
            .copied()
            .unwrap_or(self.delay);

        let result = if self.missing_frames.lock().contains(&(key.material.clone(), key.frame))
            || self.missing_encodings.lock().contains(&key.encoding)
        {
            Err(FetchError::NotFound(path.clone()))
        } else if self.take_frame_failure(&key.material, key.frame)
            || self
                .transient_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            Err(FetchError::Transient(format!("{}: connection reset", path)))
        } else {
            Ok(fake_payload(key.encoding, key.frame as u8))
        };

        // Aborted fetches never reach the push below
        let completed = Arc::clone(&self.completed);
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            completed.lock().push(path);
            result
        }
        .boxed()
    }
}

