//! Per-session turntable engine

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{DisplayedResource, ViewSnapshot};
use crate::cache::{
    AssetCache, AssetFetcher, FallbackReason, FrameOutcome, FrameResource, HealthReport, PrefetchJob, Preloader,
    Priority, SequenceRef,
};
use crate::catalog::{MaterialId, Product};
use crate::error::{EngineError, EngineResult};
use crate::gesture::{GestureInterpreter, InputEvent, Intent};
use crate::resolver::{MaterialResolver, PriceInfo, PriceRequest, PriceResponse, PriceValidator, Resolution};
use crate::rotation::{rescale_frame, RotationMachine, RotationState};
use crate::settings::EngineSettings;
use crate::telemetry::{FetchOutcome, OperationKind};

/// Results reported back by engine-owned tasks
#[derive(Debug)]
enum Completion {
    /// Priority frame of a pending material switch settled
    PriorityFrame { generation: u64, outcome: FrameOutcome },
    /// Fetch of the frame on screen settled
    DisplayFrame {
        material: MaterialId,
        frame: usize,
        priority: Priority,
        outcome: FrameOutcome,
    },
    Price {
        generation: u64,
        material: MaterialId,
        result: Result<PriceResponse, EngineError>,
        elapsed: Duration,
    },
}

/// A material switch waiting on its priority frame
#[derive(Debug)]
struct PendingSwitch {
    generation: u64,
    resolution: Resolution,
    sequence: SequenceRef,
    /// Frame of the new sequence being fetched first
    frame: usize,
    task: JoinHandle<()>,
}

#[derive(Debug)]
enum DisplayState {
    Loading(JoinHandle<()>),
    Loaded(FrameResource),
    Failed,
}

/// The interactive fetch for the frame on screen
#[derive(Debug)]
struct DisplayRequest {
    material: MaterialId,
    frame: usize,
    state: DisplayState,
}

/// One shopper's turntable view of one product.
///
/// Input handling and state transitions are synchronous. Fetches run on the
/// tokio runtime the engine was created on and report back through a channel
/// drained by [`Engine::poll`]. Every material selection bumps a generation
/// counter; results stamped with an older generation are dropped.
pub struct Engine {
    id: Uuid,
    product: Arc<Product>,
    resolver: MaterialResolver,
    cache: AssetCache,
    preloader: Preloader,
    machine: RotationMachine,
    interpreter: GestureInterpreter,
    /// Sequence of the committed material
    sequence: SequenceRef,
    price: PriceInfo,
    generation: u64,
    pending: Option<PendingSwitch>,
    prefetch: Option<PrefetchJob>,
    display: Option<DisplayRequest>,
    price_validator: Option<Arc<dyn PriceValidator>>,
    price_task: Option<JoinHandle<()>>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    snapshot_tx: watch::Sender<ViewSnapshot>,
    runtime: Handle,
}

impl Engine {
    /// Open a view of `product` on its initial material.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(product: Product, fetcher: Arc<dyn AssetFetcher>, settings: EngineSettings) -> EngineResult<Self> {
        let runtime = Handle::try_current().map_err(|e| EngineError::Runtime(e.to_string()))?;
        let settings = settings.validated();
        let product = Arc::new(product);

        let mut resolver = MaterialResolver::new(settings.compliance.clone());
        let initial = product
            .initial_material(resolver.compliance())
            .ok_or_else(|| EngineError::Config(format!("product {} has no compliant material", product.id)))?;
        let resolution = resolver.resolve(&product, &initial)?;

        let now = Instant::now();
        let frame_count = resolution.descriptor.frame_count;
        let cache = AssetCache::with_runtime(fetcher, &settings, runtime.clone());
        let machine = RotationMachine::new(
            initial.clone(),
            frame_count,
            settings.zoom.clone(),
            &settings.auto_rotate,
            now,
        );
        let sequence = SequenceRef::new(product.id.as_str(), Arc::clone(&resolution.descriptor));

        let snapshot = ViewSnapshot {
            resource: DisplayedResource::Placeholder,
            frame_index: machine.state().frame,
            frame_count,
            zoom: machine.state().zoom,
            is_auto_rotating: machine.state().auto_rotate,
            material: initial.clone(),
            price: resolution.price,
            mode: machine.state().mode,
            pending_material: None,
            generation: 0,
        };
        let (snapshot_tx, _) = watch::channel(snapshot);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let id = Uuid::new_v4();
        tracing::info!(
            target: "immersive_turntable::engine",
            session = %id,
            product = %product.id,
            material = %initial,
            frames = frame_count,
            "Opened turntable view"
        );

        let mut engine = Self {
            id,
            product,
            resolver,
            cache,
            preloader: Preloader::new(&settings.prefetch),
            machine,
            interpreter: GestureInterpreter::new(settings.gesture.clone(), frame_count),
            sequence,
            price: resolution.price,
            generation: 0,
            pending: None,
            prefetch: None,
            display: None,
            price_validator: None,
            price_task: None,
            completions_tx,
            completions_rx,
            snapshot_tx,
            runtime,
        };
        engine.start_prefetch();
        engine.sync_view();
        Ok(engine)
    }

    /// Attach a server-side price check; the current material is validated
    /// right away
    pub fn with_price_validator(mut self, validator: Arc<dyn PriceValidator>) -> Self {
        self.price_validator = Some(validator);
        self.request_price_validation();
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn state(&self) -> &RotationState {
        self.machine.state()
    }

    pub fn material(&self) -> &MaterialId {
        &self.machine.state().material
    }

    pub fn price(&self) -> PriceInfo {
        self.price
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Material whose priority frame is still loading
    pub fn pending_material(&self) -> Option<&MaterialId> {
        self.pending.as_ref().map(|p| &p.resolution.material)
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn health(&self) -> HealthReport {
        self.cache.health()
    }

    pub fn recent_errors(&self) -> Vec<EngineError> {
        self.cache.recent_errors()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Receive a snapshot on every view change
    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Feed one raw input event through the gesture interpreter
    pub fn handle_input(&mut self, event: InputEvent) {
        let at = event.at();
        for intent in self.interpreter.handle(&event) {
            if let Err(e) = self.machine.apply(intent, at) {
                tracing::debug!(target: "immersive_turntable::engine", ?intent, error = %e, "Intent rejected");
            }
        }
        self.sync_view();
    }

    /// Apply an intent directly (accessibility controls)
    pub fn apply_intent(&mut self, intent: Intent) -> EngineResult<()> {
        let now = Instant::now();
        if matches!(intent, Intent::ResetView | Intent::JumpToFrame(_)) {
            self.interpreter.cancel_inertia();
        }
        self.machine.apply(intent, now)?;
        self.sync_view();
        Ok(())
    }

    /// Switch to another material.
    ///
    /// Validation happens synchronously; on error nothing changes. The switch
    /// commits once the priority frame settles (immediately if it is cached),
    /// keeping the viewing angle. A newer selection supersedes a pending one.
    pub fn select_material(&mut self, material: &MaterialId) -> EngineResult<()> {
        let resolution = self.resolver.resolve(&self.product, material)?;

        if self.pending.is_none() && material == self.material() {
            return Ok(());
        }

        self.generation += 1;
        let generation = self.generation;
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
            self.cache.cancel_background(&pending.resolution.material);
            tracing::debug!(
                target: "immersive_turntable::engine",
                material = %pending.resolution.material,
                generation = pending.generation,
                "Superseded pending material switch"
            );
        }
        self.stop_prefetch();

        if material == self.material() {
            // Back to the committed material before the pending one landed
            self.start_prefetch();
            self.request_price_validation();
            self.sync_view();
            return Ok(());
        }

        let sequence = SequenceRef::new(self.product.id.as_str(), Arc::clone(&resolution.descriptor));
        let state = self.machine.state();
        let frame = rescale_frame(state.frame, state.frame_count, sequence.frame_count());

        if self
            .cache
            .ready(material, frame, &sequence.descriptor.encodings)
            .is_some()
        {
            self.commit(resolution, sequence);
        } else {
            let task = self.spawn_priority_fetch(generation, sequence.clone(), frame);
            self.pending = Some(PendingSwitch {
                generation,
                resolution,
                sequence,
                frame,
                task,
            });
        }
        self.sync_view();
        Ok(())
    }

    /// Advance time-driven behavior (inertia, auto-rotate) and apply
    /// finished fetches. Returns whether a new snapshot was published.
    pub fn poll(&mut self, now: Instant) -> bool {
        for intent in self.interpreter.tick(now) {
            if let Err(e) = self.machine.apply(intent, now) {
                tracing::debug!(target: "immersive_turntable::engine", ?intent, error = %e, "Intent rejected");
            }
        }
        self.machine.tick(now);

        while let Ok(completion) = self.completions_rx.try_recv() {
            self.on_completion(completion);
        }
        self.sync_view()
    }

    /// Wait until the pending switch, the on-screen frame and any price
    /// validation have reported back
    pub async fn settle(&mut self) {
        while self.is_busy() {
            match self.completions_rx.recv().await {
                Some(completion) => {
                    self.on_completion(completion);
                    self.sync_view();
                }
                None => break,
            }
        }
    }

    /// Wait for the next reported completion and apply it
    pub async fn next_update(&mut self) -> bool {
        match self.completions_rx.recv().await {
            Some(completion) => {
                self.on_completion(completion);
                self.sync_view()
            }
            None => false,
        }
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
            || self.price_task.is_some()
            || matches!(
                self.display,
                Some(DisplayRequest {
                    state: DisplayState::Loading(_),
                    ..
                })
            )
    }

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::PriorityFrame { generation, outcome } => {
                let is_current = self.pending.as_ref().is_some_and(|p| p.generation == generation);
                if !is_current {
                    tracing::debug!(target: "immersive_turntable::engine", generation, "Discarding stale priority frame");
                    return;
                }
                if let Some(mut pending) = self.pending.take() {
                    // The view may have rotated while the switch was pending
                    let state = self.machine.state();
                    let target = rescale_frame(state.frame, state.frame_count, pending.sequence.frame_count());
                    let target_ready = self
                        .cache
                        .ready(&pending.resolution.material, target, &pending.sequence.descriptor.encodings)
                        .is_some();
                    if target != pending.frame && !target_ready {
                        tracing::debug!(
                            target: "immersive_turntable::engine",
                            material = %pending.resolution.material,
                            from = pending.frame,
                            to = target,
                            "View moved during switch, fetching new priority frame"
                        );
                        pending.frame = target;
                        pending.task = self.spawn_priority_fetch(pending.generation, pending.sequence.clone(), target);
                        self.pending = Some(pending);
                        return;
                    }

                    if let FrameOutcome::Fallback(reason) = &outcome {
                        tracing::debug!(
                            target: "immersive_turntable::engine",
                            material = %pending.resolution.material,
                            ?reason,
                            "Priority frame not available, committing with fallback"
                        );
                    }
                    self.commit(pending.resolution, pending.sequence);
                }
            }
            Completion::DisplayFrame {
                material,
                frame,
                priority,
                outcome,
            } => {
                let is_current = self
                    .display
                    .as_ref()
                    .is_some_and(|d| d.material == material && d.frame == frame);
                if !is_current {
                    return;
                }
                match outcome {
                    FrameOutcome::Ready(resource) => self.set_display_state(DisplayState::Loaded(resource)),
                    // Interactive fetches never retry; hand the frame on screen to a background retry
                    FrameOutcome::Fallback(FallbackReason::Network(_)) if priority == Priority::Interactive => {
                        tracing::debug!(
                            target: "immersive_turntable::engine",
                            material = %material,
                            frame,
                            "Retrying on-screen frame in the background"
                        );
                        self.request_display_frame(material, frame, Priority::Background);
                    }
                    // Retry aborted by prefetch cancellation; request again on the next sync
                    FrameOutcome::Fallback(FallbackReason::Cancelled) => self.display = None,
                    FrameOutcome::Fallback(_) => self.set_display_state(DisplayState::Failed),
                }
            }
            Completion::Price {
                generation,
                material,
                result,
                elapsed,
            } => {
                let outcome = if result.is_ok() {
                    FetchOutcome::Loaded
                } else {
                    FetchOutcome::Failed
                };
                self.cache.record_operation(OperationKind::PriceValidation, outcome, elapsed);

                if generation != self.generation || &material != self.material() {
                    tracing::debug!(target: "immersive_turntable::engine", generation, "Discarding stale price");
                    return;
                }
                self.price_task = None;
                match result {
                    Ok(response) => {
                        self.price = self.price.with_validated_total(response.validated_price);
                        tracing::debug!(
                            target: "immersive_turntable::engine",
                            material = %material,
                            total = self.price.total,
                            "Price validated"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            target: "immersive_turntable::engine",
                            material = %material,
                            error = %e,
                            "Price validation failed, keeping local price"
                        );
                        self.cache.record_error(e);
                    }
                }
            }
        }
    }

    fn commit(&mut self, resolution: Resolution, sequence: SequenceRef) {
        let frame_count = sequence.frame_count();
        self.machine.switch_material(resolution.material.clone(), frame_count);
        self.interpreter.set_frame_count(frame_count);
        self.sequence = sequence;
        self.price = resolution.price;
        if let Some(DisplayRequest {
            state: DisplayState::Loading(task),
            ..
        }) = self.display.take()
        {
            task.abort();
        }

        tracing::info!(
            target: "immersive_turntable::engine",
            session = %self.id,
            material = %resolution.material,
            frame = self.machine.state().frame,
            generation = self.generation,
            "Material switched"
        );
        self.start_prefetch();
        self.request_price_validation();
    }

    fn spawn_priority_fetch(&self, generation: u64, sequence: SequenceRef, frame: usize) -> JoinHandle<()> {
        let cache = self.cache.clone();
        let tx = self.completions_tx.clone();
        self.runtime.spawn(async move {
            let outcome = cache.get(&sequence, frame, Priority::Interactive).await;
            let _ = tx.send(Completion::PriorityFrame { generation, outcome });
        })
    }

    fn start_prefetch(&mut self) {
        let frame = self.machine.state().frame;
        let _runtime = self.runtime.enter();
        self.prefetch = Some(
            self.preloader
                .start(self.cache.clone(), self.sequence.clone(), frame, Some(frame)),
        );
    }

    fn stop_prefetch(&mut self) {
        if let Some(job) = self.prefetch.take() {
            job.cancel(&self.cache);
        }
    }

    fn request_price_validation(&mut self) {
        if let Some(task) = self.price_task.take() {
            task.abort();
        }
        let Some(validator) = self.price_validator.clone() else {
            return;
        };

        let generation = self.generation;
        let material = self.material().clone();
        let request = PriceRequest {
            product_id: self.product.id.clone(),
            material_id: material.clone(),
        };
        let tx = self.completions_tx.clone();
        self.price_task = Some(self.runtime.spawn(async move {
            let started = Instant::now();
            let result = validator.validate(request).await;
            let _ = tx.send(Completion::Price {
                generation,
                material,
                result,
                elapsed: started.elapsed(),
            });
        }));
    }

    /// Work out what to show for the current frame, start an interactive
    /// fetch if it is missing, and publish the snapshot if anything changed
    fn sync_view(&mut self) -> bool {
        let state = self.machine.state();
        let material = state.material.clone();
        let frame = state.frame;
        let encodings = &self.sequence.descriptor.encodings;

        let resource = if let Some(resource) = self.cache.ready(&material, frame, encodings) {
            DisplayedResource::Exact(resource)
        } else {
            let loaded = match &self.display {
                Some(display) if display.material == material && display.frame == frame => match &display.state {
                    DisplayState::Loaded(resource) => Some(Some(resource.clone())),
                    DisplayState::Loading(_) | DisplayState::Failed => Some(None),
                },
                _ => None,
            };
            match loaded {
                Some(Some(resource)) => DisplayedResource::Exact(resource),
                Some(None) => self.nearest(&material, frame),
                None => {
                    self.request_display_frame(material.clone(), frame, Priority::Interactive);
                    self.nearest(&material, frame)
                }
            }
        };

        let state = self.machine.state();
        let snapshot = ViewSnapshot {
            resource,
            frame_index: state.frame,
            frame_count: state.frame_count,
            zoom: state.zoom,
            is_auto_rotating: state.auto_rotate,
            material: state.material.clone(),
            price: self.price,
            mode: state.mode,
            pending_material: self.pending_material().cloned(),
            generation: self.generation,
        };
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        })
    }

    fn nearest(&self, material: &MaterialId, frame: usize) -> DisplayedResource {
        match self.cache.fallback_for(material, frame, self.sequence.frame_count()) {
            Some(resource) => DisplayedResource::Nearest(resource),
            None => DisplayedResource::Placeholder,
        }
    }

    fn set_display_state(&mut self, state: DisplayState) {
        if let Some(display) = self.display.as_mut() {
            display.state = state;
        }
    }

    fn request_display_frame(&mut self, material: MaterialId, frame: usize, priority: Priority) {
        if let Some(DisplayRequest {
            state: DisplayState::Loading(task),
            ..
        }) = self.display.take()
        {
            task.abort();
        }

        let cache = self.cache.clone();
        let sequence = self.sequence.clone();
        let tx = self.completions_tx.clone();
        let task_material = material.clone();
        let task = self.runtime.spawn(async move {
            let outcome = cache.get(&sequence, frame, priority).await;
            let _ = tx.send(Completion::DisplayFrame {
                material: task_material,
                frame,
                priority,
                outcome,
            });
        });
        self.display = Some(DisplayRequest {
            material,
            frame,
            state: DisplayState::Loading(task),
        });
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.id)
            .field("product", &self.product.id)
            .field("state", self.machine.state())
            .field("generation", &self.generation)
            .field("pending", &self.pending_material())
            .finish()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
        if let Some(job) = self.prefetch.take() {
            job.cancel(&self.cache);
        }
        if let Some(DisplayRequest {
            state: DisplayState::Loading(task),
            ..
        }) = self.display.take()
        {
            task.abort();
        }
        if let Some(task) = self.price_task.take() {
            task.abort();
        }
        let cancelled = self.cache.cancel_all();
        tracing::debug!(
            target: "immersive_turntable::engine",
            session = %self.id,
            cancelled,
            "Closed turntable view"
        );
    }
}
