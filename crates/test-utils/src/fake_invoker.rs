use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rundag::exec::{InvokeError, InvokeOutput, InvokeResult, UnitInvoker};
use rundag::retry::Sleeper;
use rundag::types::Action;

/// A fake invoker that:
/// - returns scripted results per unit (the last entry repeats)
/// - succeeds with empty output for unscripted units
/// - records every call in order, and the peak number of concurrent calls.
#[derive(Default)]
pub struct FakeInvoker {
    scripts: Mutex<BTreeMap<String, VecDeque<InvokeResult>>>,
    calls: Mutex<Vec<(String, Action)>>,
    delay: Option<Duration>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the results of successive attempts for `unit`.
    pub fn script(self, unit: &str, results: Vec<InvokeResult>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(unit.to_string(), results.into());
        self
    }

    /// Every attempt for `unit` fails with `detail`.
    pub fn failing(self, unit: &str, detail: &str) -> Self {
        self.script(unit, vec![Err(InvokeError::new(detail))])
    }

    /// Every attempt for `unit` succeeds with `stdout`.
    pub fn with_output(self, unit: &str, stdout: &str) -> Self {
        self.script(
            unit,
            vec![Ok(InvokeOutput {
                stdout: stdout.to_string(),
            })],
        )
    }

    /// Make each invocation take `delay` (real time).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, Action)> {
        self.calls.lock().unwrap().clone()
    }

    /// Units in invocation order (one entry per attempt).
    pub fn invoked_units(&self) -> Vec<String> {
        self.calls().into_iter().map(|(u, _)| u).collect()
    }

    pub fn call_count(&self, unit: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(u, _)| u == unit).count()
    }

    /// Highest number of invocations in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_result(&self, unit: &str) -> InvokeResult {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(unit) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(InvokeOutput::default())),
            None => Ok(InvokeOutput::default()),
        }
    }
}

impl UnitInvoker for FakeInvoker {
    fn invoke<'a>(
        &'a self,
        unit: &'a str,
        action: Action,
    ) -> Pin<Box<dyn Future<Output = InvokeResult> + Send + 'a>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push((unit.to_string(), action));
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let result = self.next_result(unit);

            self.running.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}

/// Sleeper that returns immediately and records requested durations.
#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.sleeps.lock().unwrap().len()
    }

    pub fn durations(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        self.sleeps.lock().unwrap().push(duration);
        Box::pin(async {})
    }
}
