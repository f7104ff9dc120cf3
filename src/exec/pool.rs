// src/exec/pool.rs

//! Fixed-size worker pool that runs scheduled units.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dag::ScheduledUnit;
use crate::engine::{OutputCache, RuntimeEvent, UnitOutcome};
use crate::exec::UnitInvoker;
use crate::retry::RetryExecutor;

/// Handles to a running worker pool.
///
/// Dropping `work_tx` (via [`WorkerPool::close`]) lets the workers drain and
/// exit; [`WorkerPool::join`] waits for them.
pub struct WorkerPool {
    work_tx: Option<mpsc::Sender<ScheduledUnit>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers sharing one work queue.
    ///
    /// Each worker runs a unit through the retry executor, caches stdout on
    /// success, and reports a `UnitCompleted` event on `runtime_tx`.
    pub fn spawn<I>(
        size: usize,
        invoker: Arc<I>,
        retry: RetryExecutor,
        cache: Arc<OutputCache>,
        runtime_tx: mpsc::Sender<RuntimeEvent>,
    ) -> Self
    where
        I: UnitInvoker + ?Sized + 'static,
    {
        let size = size.max(1);
        let (work_tx, work_rx) = mpsc::channel::<ScheduledUnit>(size.max(32));
        let work_rx = Arc::new(Mutex::new(work_rx));

        let workers = (0..size)
            .map(|id| {
                let work_rx = Arc::clone(&work_rx);
                let invoker = Arc::clone(&invoker);
                let retry = retry.clone();
                let cache = Arc::clone(&cache);
                let runtime_tx = runtime_tx.clone();

                tokio::spawn(async move {
                    debug!(worker = id, "worker started");
                    loop {
                        // Hold the lock only while waiting for the next item.
                        let next = work_rx.lock().await.recv().await;
                        let Some(unit) = next else {
                            break;
                        };

                        let outcome = run_unit(&retry, &invoker, &unit).await;
                        if outcome.is_success() {
                            if let Some(output) = &outcome.output {
                                cache.insert(&unit.name, output.clone());
                            }
                        }

                        let event = RuntimeEvent::UnitCompleted {
                            unit: unit.name.clone(),
                            outcome,
                        };
                        if runtime_tx.send(event).await.is_err() {
                            warn!(worker = id, unit = %unit.name, "runtime gone; dropping completion");
                            break;
                        }
                    }
                    debug!(worker = id, "worker finished (queue closed)");
                })
            })
            .collect();

        info!(size, "worker pool started");

        Self {
            work_tx: Some(work_tx),
            workers,
        }
    }

    /// Queue a unit for the next free worker.
    pub async fn dispatch(&self, unit: ScheduledUnit) -> anyhow::Result<()> {
        let tx = self
            .work_tx
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("worker pool is closed"))?;
        tx.send(unit)
            .await
            .map_err(|e| anyhow::anyhow!("failed to dispatch unit '{}': worker pool closed", e.0.name))
    }

    /// Stop accepting work.
    pub fn close(&mut self) {
        self.work_tx = None;
    }

    /// Close the queue and wait for every worker to exit.
    pub async fn join(mut self) {
        self.close();
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
    }
}

/// Run one unit in its own task so a panicking invoker still yields a
/// completion and the worker survives.
async fn run_unit<I>(retry: &RetryExecutor, invoker: &Arc<I>, unit: &ScheduledUnit) -> UnitOutcome
where
    I: UnitInvoker + ?Sized + 'static,
{
    let retry = retry.clone();
    let invoker = Arc::clone(invoker);
    let name = unit.name.clone();
    let action = unit.action;

    let handle =
        tokio::spawn(async move { retry.execute(invoker.as_ref(), &name, action).await });

    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => {
            let cause = if e.is_panic() {
                "unit execution panicked"
            } else {
                "unit execution was cancelled"
            };
            warn!(unit = %unit.name, error = %e, cause, "unit task ended abnormally");
            UnitOutcome::failed(cause.to_string())
        }
    }
}
