//! Staged ingestion pipeline and its lifecycle.

use crate::defaults;
use crate::error::{ChunkflowError, Result};
use crate::pipeline::cancel::CancelSource;
use crate::pipeline::clock::{Clock, SystemClock};
use crate::pipeline::error::{ErrorReporter, LogReporter, SubmitError};
use crate::pipeline::gate::SubmissionGate;
use crate::pipeline::metadata_station::{MetadataStation, PlaceholderTranscriber, Transcriber};
use crate::pipeline::sink::SinkStation;
use crate::pipeline::station::{StationPool, WorkerContext};
use crate::pipeline::stats::PipelineStats;
use crate::pipeline::transform_station::{ContentHasher, PlaceholderHasher, TransformStation};
use crate::pipeline::types::{ChunkRecord, Phase};
use crate::pipeline::validate_station::{IngestStation, ValidateStation};
use crate::storage::{ChunkStore, IndexedStore};
use crossbeam_channel::{Receiver, Sender, bounded};
use serde::Serialize;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of every hand-off queue, including the ingress queue
    pub queue_capacity: usize,
    /// Workers for each pooled stage (validate, transform, extract-metadata)
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: defaults::QUEUE_CAPACITY,
            workers: defaults::WORKERS_PER_STAGE,
        }
    }
}

/// Records waiting in each hand-off queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepths {
    pub ingest: usize,
    pub validate: usize,
    pub transform: usize,
    pub metadata: usize,
    pub sink: usize,
}

struct Queue {
    tx: Sender<ChunkRecord>,
    rx: Receiver<ChunkRecord>,
}

impl Queue {
    fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }
}

/// The queues live as long as the pipeline. `stop` empties the inter-stage
/// queues; the ingress queue keeps what the gate already accepted until the
/// next start.
struct Queues {
    ingest: Queue,
    validate: Queue,
    transform: Queue,
    metadata: Queue,
    sink: Queue,
}

impl Queues {
    /// Empties every queue between stages and returns how many records were dropped.
    fn discard_in_flight(&self) -> usize {
        [&self.validate, &self.transform, &self.metadata, &self.sink]
            .into_iter()
            .map(|queue| queue.rx.try_iter().count())
            .sum()
    }
}

struct Lifecycle {
    phase: Phase,
    cancel: Option<CancelSource>,
    pools: Vec<StationPool>,
}

/// Ingestion pipeline: gate → ingest → validate → transform → extract-metadata → sink.
///
/// Validate, transform and extract-metadata each run a pool of workers
/// racing on one shared queue, so records can overtake each other between
/// stages. `stop` cancels every worker at once and waits for them; whatever
/// is still between stages or in a worker's hands at that moment is
/// discarded and never reaches the sink, not even after a restart.
pub struct Pipeline {
    config: PipelineConfig,
    queues: Queues,
    gate: SubmissionGate,
    store: Arc<IndexedStore>,
    log: Arc<dyn ChunkStore>,
    stats: Arc<PipelineStats>,
    error_reporter: Arc<dyn ErrorReporter>,
    hasher: Arc<dyn ContentHasher>,
    transcriber: Arc<dyn Transcriber>,
    clock: Arc<dyn Clock>,
    lifecycle: Mutex<Lifecycle>,
    phase_changed: Condvar,
}

impl Pipeline {
    /// Creates a stopped pipeline that commits to `store` and then `log`.
    pub fn new(config: PipelineConfig, store: Arc<IndexedStore>, log: Arc<dyn ChunkStore>) -> Self {
        let queues = Queues {
            ingest: Queue::bounded(config.queue_capacity),
            validate: Queue::bounded(config.queue_capacity),
            transform: Queue::bounded(config.queue_capacity),
            metadata: Queue::bounded(config.queue_capacity),
            sink: Queue::bounded(config.queue_capacity),
        };
        let stats = Arc::new(PipelineStats::new());
        let gate = SubmissionGate::new(queues.ingest.tx.clone(), stats.clone());

        Self {
            config,
            queues,
            gate,
            store,
            log,
            stats,
            error_reporter: Arc::new(LogReporter),
            hasher: Arc::new(PlaceholderHasher),
            transcriber: Arc::new(PlaceholderTranscriber),
            clock: Arc::new(SystemClock),
            lifecycle: Mutex::new(Lifecycle {
                phase: Phase::Stopped,
                cancel: None,
                pools: Vec::new(),
            }),
            phase_changed: Condvar::new(),
        }
    }

    /// Sets a custom error reporter.
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.error_reporter = reporter;
        self
    }

    /// Sets the checksum implementation used by the transform stage.
    pub fn with_hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Sets the transcriber used by the extract-metadata stage.
    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = transcriber;
        self
    }

    /// Sets a custom clock (for deterministic testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launches every worker pool.
    ///
    /// Fails with [`ChunkflowError::PipelineNotStopped`] unless the pipeline
    /// is stopped. A pipeline can be started again after `stop`.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lock();
        if lifecycle.phase != Phase::Stopped {
            return Err(ChunkflowError::PipelineNotStopped {
                phase: lifecycle.phase.to_string(),
            });
        }

        let cancel = CancelSource::new();
        let ctx = WorkerContext {
            cancel: cancel.token(),
            reporter: self.error_reporter.clone(),
            stats: self.stats.clone(),
        };

        let pools = match self.spawn_pools(&ctx) {
            Ok(pools) => pools,
            Err((e, started)) => {
                cancel.cancel();
                for pool in started {
                    pool.join();
                }
                return Err(e);
            }
        };

        lifecycle.cancel = Some(cancel);
        lifecycle.pools = pools;
        lifecycle.phase = Phase::Running;
        self.phase_changed.notify_all();

        tracing::info!(
            queue_capacity = self.config.queue_capacity,
            workers = self.config.workers,
            "pipeline started"
        );
        Ok(())
    }

    /// Spawns the pools in pipeline order, handing back any already started on failure.
    fn spawn_pools(
        &self,
        ctx: &WorkerContext,
    ) -> std::result::Result<Vec<StationPool>, (ChunkflowError, Vec<StationPool>)> {
        let q = &self.queues;
        let workers = self.config.workers;
        let mut pools = Vec::with_capacity(5);

        macro_rules! spawn_or_bail {
            ($spawned:expr) => {
                match $spawned {
                    Ok(pool) => pools.push(pool),
                    Err(e) => return Err((e, pools)),
                }
            };
        }

        spawn_or_bail!(StationPool::spawn(
            IngestStation,
            1,
            q.ingest.rx.clone(),
            Some(q.validate.tx.clone()),
            ctx.clone(),
        ));
        spawn_or_bail!(StationPool::spawn(
            ValidateStation::new(self.stats.clone()),
            workers,
            q.validate.rx.clone(),
            Some(q.transform.tx.clone()),
            ctx.clone(),
        ));
        spawn_or_bail!(StationPool::spawn(
            TransformStation::with_clock(self.hasher.clone(), self.clock.clone()),
            workers,
            q.transform.rx.clone(),
            Some(q.metadata.tx.clone()),
            ctx.clone(),
        ));
        spawn_or_bail!(StationPool::spawn(
            MetadataStation::with_clock(self.transcriber.clone(), self.clock.clone()),
            workers,
            q.metadata.rx.clone(),
            Some(q.sink.tx.clone()),
            ctx.clone(),
        ));
        let store: Arc<dyn ChunkStore> = self.store.clone();
        spawn_or_bail!(StationPool::spawn(
            SinkStation::new(store, self.log.clone(), self.stats.clone()),
            1,
            q.sink.rx.clone(),
            None,
            ctx.clone(),
        ));

        Ok(pools)
    }

    /// Cancels every worker and blocks until all of them have exited.
    ///
    /// Records between stages or inside a worker are discarded and counted as
    /// abandoned. Records still in the ingress queue were never picked up and
    /// wait for the next start. Calling `stop` on a stopped pipeline does
    /// nothing; a concurrent second call waits for the first to finish.
    pub fn stop(&self) {
        let (cancel, pools) = {
            let mut lifecycle = self.lock();
            let phase = lifecycle.phase;
            match phase {
                Phase::Stopped => return,
                Phase::Stopping => {
                    let _stopped = self
                        .phase_changed
                        .wait_while(lifecycle, |l| l.phase == Phase::Stopping)
                        .unwrap_or_else(PoisonError::into_inner);
                    return;
                }
                Phase::Running => {}
            }
            lifecycle.phase = Phase::Stopping;
            self.phase_changed.notify_all();
            (
                lifecycle.cancel.take(),
                std::mem::take(&mut lifecycle.pools),
            )
        };

        tracing::info!("pipeline stopping");
        if let Some(cancel) = cancel {
            cancel.cancel();
        }

        let panicked: usize = pools.into_iter().map(StationPool::join).sum();
        if panicked > 0 {
            tracing::error!(panicked, "pipeline workers panicked");
        }

        // Workers are gone, so nothing refills the queues while they are emptied
        let discarded = self.queues.discard_in_flight();
        for _ in 0..discarded {
            self.stats.record_abandoned();
        }
        if discarded > 0 {
            tracing::debug!(discarded, "discarded records between stages");
        }

        let mut lifecycle = self.lock();
        lifecycle.phase = Phase::Stopped;
        self.phase_changed.notify_all();
        drop(lifecycle);

        tracing::info!(stats = ?self.stats.snapshot(), "pipeline stopped");
    }

    /// Hands a record to the ingress queue without blocking.
    pub fn submit(&self, record: ChunkRecord) -> std::result::Result<(), SubmitError> {
        self.gate.submit(record)
    }

    /// Cloneable entry point for transports.
    pub fn gate(&self) -> SubmissionGate {
        self.gate.clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    pub fn store(&self) -> &Arc<IndexedStore> {
        &self.store
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn queue_depths(&self) -> QueueDepths {
        let q = &self.queues;
        QueueDepths {
            ingest: q.ingest.rx.len(),
            validate: q.validate.rx.len(),
            transform: q.transform.rx.len(),
            metadata: q.metadata.rx.len(),
            sink: q.sink.rx.len(),
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.stop();
    }
}
