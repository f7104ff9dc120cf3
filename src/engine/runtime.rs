// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::dag::{ScheduledUnit, Scheduler};
use crate::errors::Result;
use crate::exec::UnitInvoker;
use crate::exec::pool::WorkerPool;
use crate::report::Report;
use crate::retry::RetryExecutor;

use super::core::CoreRuntime;
use super::{CoreCommand, OutputCache, RuntimeEvent};

/// Drives the scheduler in response to `RuntimeEvent`s, and delegates unit
/// execution to a fixed worker pool.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// runtime semantics. This struct handles async IO: reading events from
/// channels and dispatching units to workers.
pub struct Runtime<I: UnitInvoker + ?Sized + 'static> {
    core: CoreRuntime,
    invoker: Arc<I>,
    retry: RetryExecutor,
    cache: Arc<OutputCache>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
}

impl<I: UnitInvoker + ?Sized + 'static> fmt::Debug for Runtime<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl<I: UnitInvoker + ?Sized + 'static> Runtime<I> {
    pub fn new(
        scheduler: Scheduler,
        invoker: Arc<I>,
        retry: RetryExecutor,
        cache: Arc<OutputCache>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(64);
        Self {
            core: CoreRuntime::new(scheduler),
            invoker,
            retry,
            cache,
            event_tx,
            event_rx,
        }
    }

    /// Sender for out-of-band events such as `ShutdownRequested`.
    pub fn event_sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.event_tx.clone()
    }

    pub fn cache(&self) -> Arc<OutputCache> {
        Arc::clone(&self.cache)
    }

    /// Main event loop.
    ///
    /// - Admits the first ready units.
    /// - Consumes `RuntimeEvent`s until every unit is terminal.
    /// - Executes commands returned by the core (dispatch units, exit).
    pub async fn run(self) -> Result<Report> {
        let Runtime {
            mut core,
            invoker,
            retry,
            cache,
            event_tx,
            mut event_rx,
        } = self;

        let parallelism = core.scheduler().parallelism();
        info!(
            action = %core.scheduler().action(),
            parallelism,
            "rundag runtime started"
        );

        let pool = WorkerPool::spawn(parallelism, invoker, retry, cache, event_tx);

        let mut step = core.start();
        loop {
            let mut exit_requested = !step.keep_running;
            for command in step.commands {
                match command {
                    CoreCommand::DispatchUnits(units) => dispatch(&pool, units).await?,
                    CoreCommand::RequestExit => {
                        debug!("core issued RequestExit command");
                        exit_requested = true;
                    }
                }
            }

            if exit_requested {
                break;
            }

            if core.scheduler().running_count() == 0 {
                // Nothing is running and nothing became ready: the run can
                // not make progress on its own.
                warn!("scheduler stalled with no running units; stopping");
                break;
            }

            let Some(event) = event_rx.recv().await else {
                info!("runtime event channel closed; exiting");
                break;
            };
            debug!(?event, "runtime received event");
            step = core.step(event);
        }

        pool.join().await;
        info!("runtime exiting");
        Ok(core.into_report())
    }
}

async fn dispatch(pool: &WorkerPool, units: Vec<ScheduledUnit>) -> Result<()> {
    let names: Vec<_> = units.iter().map(|u| u.name.as_str()).collect();
    debug!(?names, "dispatching ready units");
    for unit in units {
        pool.dispatch(unit).await?;
    }
    Ok(())
}
