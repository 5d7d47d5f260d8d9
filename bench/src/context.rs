//! Shared run state handed to every worker
//!
//! The context owns the only two pieces of mutable state shared between
//! threads during a run: the cancellation flag and the append-only result
//! sink behind its mutex.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use log::{error, info};

use crate::types::{BenchmarkError, BenchmarkResult, LookupOutcome};

#[derive(Debug)]
pub struct RunContext {
    running: AtomicBool,
    sink: Mutex<Vec<LookupOutcome>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            sink: Mutex::new(Vec::new()),
        }
    }

    /// False once a stop has been requested
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Asks workers to stop before their next lookup
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Appends a worker's buffered outcomes, draining `batch`
    pub fn append(&self, batch: &mut Vec<LookupOutcome>) {
        if batch.is_empty() {
            return;
        }
        // A poisoned sink still holds every earlier append intact.
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        sink.append(batch);
    }

    /// Number of outcomes appended so far
    #[must_use]
    pub fn completed(&self) -> usize {
        self.sink.lock().map_or_else(|e| e.into_inner().len(), |s| s.len())
    }

    /// Copies the sink as it is now
    pub fn snapshot(&self) -> BenchmarkResult<Vec<LookupOutcome>> {
        self.sink
            .lock()
            .map(|s| s.clone())
            .map_err(|e| BenchmarkError::Internal(format!("Mutex poisoned: {e}")))
    }
}

/// Routes Ctrl-C (SIGINT) to `ctx.stop()` instead of terminating the process
///
/// Only one handler can be installed per process.
pub fn install_interrupt_handler(ctx: &Arc<RunContext>) -> BenchmarkResult<()> {
    let ctx = Arc::clone(ctx);
    ctrlc::set_handler(move || {
        if ctx.is_running() {
            info!("Interrupt received, stopping workers after their current lookup");
            ctx.stop();
        } else {
            error!("Second interrupt received while already stopping");
        }
    })
    .map_err(|e| BenchmarkError::Initialization(format!("Failed to set interrupt handler: {e}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_stop_flag() {
        let ctx = RunContext::new();
        assert!(ctx.is_running());
        ctx.stop();
        assert!(!ctx.is_running());
    }

    #[test]
    fn test_append_drains_buffer() {
        let ctx = RunContext::new();
        let mut buffer = vec![
            LookupOutcome::miss("a", Duration::from_micros(5), 0),
            LookupOutcome::miss("b", Duration::from_micros(5), 0),
        ];
        ctx.append(&mut buffer);
        assert!(buffer.is_empty());
        assert_eq!(ctx.completed(), 2);

        ctx.append(&mut buffer);
        assert_eq!(ctx.completed(), 2);

        let snapshot = ctx.snapshot().unwrap();
        assert_eq!(snapshot[0].identifier, "a");
        assert_eq!(snapshot[1].identifier, "b");
    }
}
