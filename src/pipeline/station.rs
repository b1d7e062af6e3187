//! Core station abstraction and the worker pool that runs it.

use crate::error::{ChunkflowError, Result};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::error::{ErrorReporter, StationError};
use crate::pipeline::stats::PipelineStats;
use crossbeam_channel::{Receiver, Sender, select};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A processing station in the pipeline.
///
/// Each worker of a pool owns its own clone of the station, so `process`
/// can take `&mut self` without any locking between workers.
pub trait Station: Send + 'static {
    /// The input type this station receives.
    type Input: Send + 'static;
    /// The output type this station produces.
    type Output: Send + 'static;

    /// Processes a single input item.
    ///
    /// Returns:
    /// - `Ok(Some(output))` - Successfully processed and produced output
    /// - `Ok(None)` - Successfully processed but no output (e.g., filtered)
    /// - `Err(StationError)` - Processing failed
    fn process(&mut self, input: Self::Input) -> std::result::Result<Option<Self::Output>, StationError>;

    /// Returns the name of this station for logging and error reporting.
    fn name(&self) -> &'static str;
}

/// Everything a worker needs besides its station and its queues.
#[derive(Clone)]
pub struct WorkerContext {
    pub cancel: CancelToken,
    pub reporter: Arc<dyn ErrorReporter>,
    pub stats: Arc<PipelineStats>,
}

/// A fixed group of threads running clones of one station against a shared input queue.
pub struct StationPool {
    station_name: &'static str,
    handles: Vec<JoinHandle<()>>,
}

impl StationPool {
    /// Spawns `workers` threads, each draining `input_rx` with its own clone of `station`.
    ///
    /// `output_tx` is `None` for terminal stations. Every worker exits as soon as
    /// cancellation fires, whether it is waiting for input or blocked on a full
    /// downstream queue. A record received or produced after cancellation is
    /// dropped instead of being processed or handed on.
    pub fn spawn<S>(
        station: S,
        workers: usize,
        input_rx: Receiver<S::Input>,
        output_tx: Option<Sender<S::Output>>,
        ctx: WorkerContext,
    ) -> Result<Self>
    where
        S: Station + Clone,
    {
        let station_name = station.name();
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let mut worker_station = station.clone();
            let input_rx = input_rx.clone();
            let output_tx = output_tx.clone();
            let ctx = ctx.clone();

            let spawned = thread::Builder::new()
                .name(format!("{station_name}-{index}"))
                .spawn(move || {
                    run_worker(&mut worker_station, input_rx, output_tx, ctx);
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    return Err(ChunkflowError::WorkerSpawn {
                        stage: station_name.to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::debug!(station = station_name, workers, "station pool started");

        Ok(Self {
            station_name,
            handles,
        })
    }

    /// Waits for every worker to exit.
    ///
    /// Returns the number of workers that panicked.
    pub fn join(self) -> usize {
        let mut panicked = 0;
        for handle in self.handles {
            if handle.join().is_err() {
                tracing::error!(station = self.station_name, "worker thread panicked");
                panicked += 1;
            }
        }
        panicked
    }

    /// Returns the name of the station.
    pub fn name(&self) -> &'static str {
        self.station_name
    }

    /// Returns the number of workers in the pool.
    pub fn workers(&self) -> usize {
        self.handles.len()
    }
}

/// Main processing loop for one worker.
fn run_worker<S: Station>(
    station: &mut S,
    input_rx: Receiver<S::Input>,
    output_tx: Option<Sender<S::Output>>,
    ctx: WorkerContext,
) {
    let station_name = station.name();

    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }

        // None on cancellation, or when every sender is gone
        let input = select! {
            recv(ctx.cancel.receiver()) -> _ => None,
            recv(input_rx) -> msg => msg.ok(),
        };
        let Some(input) = input else {
            break;
        };
        // select! picks at random when both are ready
        if ctx.cancel.is_cancelled() {
            ctx.stats.record_abandoned();
            break;
        }

        match station.process(input) {
            Ok(Some(output)) => {
                let Some(tx) = output_tx.as_ref() else {
                    continue;
                };
                if ctx.cancel.is_cancelled() {
                    ctx.stats.record_abandoned();
                    break;
                }
                let delivered = select! {
                    send(tx, output) -> res => res.is_ok(),
                    recv(ctx.cancel.receiver()) -> _ => {
                        ctx.stats.record_abandoned();
                        false
                    }
                };
                if !delivered {
                    break;
                }
            }
            Ok(None) => {}
            Err(StationError::Recoverable(msg)) => {
                ctx.reporter
                    .report(station_name, &StationError::Recoverable(msg));
            }
            Err(StationError::Fatal(msg)) => {
                ctx.reporter.report(station_name, &StationError::Fatal(msg));
                break;
            }
        }
    }

    tracing::trace!(station = station_name, "worker exited");
}
