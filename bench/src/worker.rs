//! Benchmark worker
//!
//! A worker performs its share of lookups sequentially on its own thread.
//! Outcomes are buffered locally and appended to the shared sink every
//! `FLUSH_EVERY` lookups and once more at the end, so the sink lock is taken
//! rarely while progress stays visible to the coordinator. The cancellation
//! flag is checked between lookups (between batches when pipelining); a
//! lookup already in flight is always allowed to finish.

use std::sync::Arc;

use log::{debug, info};

use crate::{context::RunContext, resolver::VersionedResolver, universe::KeyUniverse};

/// Lookups between progress lines and sink flushes
pub const FLUSH_EVERY: u64 = 1000;

#[derive(Clone)]
pub struct Worker {
    universe: KeyUniverse,
    resolver: Arc<VersionedResolver>,
    ctx: Arc<RunContext>,
    batch_size: usize,
}

impl Worker {
    pub fn new(
        universe: KeyUniverse,
        resolver: Arc<VersionedResolver>,
        ctx: Arc<RunContext>,
        batch_size: usize,
    ) -> Self {
        Self {
            universe,
            resolver,
            ctx,
            batch_size: batch_size.max(1),
        }
    }

    /// Performs up to `operation_count` lookups, fewer if the run is stopped
    pub fn run(&self, worker_id: usize, operation_count: u64) {
        let mut rng = rand::rng();
        let mut buffer = Vec::with_capacity(operation_count.min(FLUSH_EVERY) as usize);
        let mut done = 0u64;

        while done < operation_count {
            if !self.ctx.is_running() {
                debug!("Worker {worker_id}: stop requested after {done} lookups");
                break;
            }

            let n = (self.batch_size as u64).min(operation_count - done);
            if self.batch_size == 1 {
                let id = self.universe.sample_with(&mut rng);
                buffer.push(self.resolver.resolve(id));
            } else {
                let ids: Vec<&str> = (0..n)
                    .map(|_| self.universe.sample_with(&mut rng))
                    .collect();
                buffer.extend(self.resolver.resolve_batch(&ids));
            }

            let before = done;
            done += n;
            if done / FLUSH_EVERY > before / FLUSH_EVERY {
                debug!("Worker {worker_id}: {done}/{operation_count} lookups completed");
                self.ctx.append(&mut buffer);
            }
        }

        self.ctx.append(&mut buffer);
        info!("Worker {worker_id} completed: {done} lookups");
    }
}

#[cfg(test)]
mod tests {
    use store::MemoryStore;

    use super::*;

    fn worker_for(store: MemoryStore, ctx: &Arc<RunContext>, batch_size: usize) -> Worker {
        let universe =
            KeyUniverse::new(vec!["1.1.1.1".to_string(), "2.2.2.2".to_string()]).unwrap();
        let resolver = Arc::new(VersionedResolver::new(Arc::new(store), "v23", "v22"));
        Worker::new(universe, resolver, Arc::clone(ctx), batch_size)
    }

    #[test]
    fn test_runs_exact_count() {
        let ctx = Arc::new(RunContext::new());
        let store = MemoryStore::new();
        store.insert("ip:v23:1.1.1.1", "a");
        worker_for(store, &ctx, 1).run(1, 2500);
        assert_eq!(ctx.completed(), 2500);
    }

    #[test]
    fn test_pre_stopped_context_does_nothing() {
        let ctx = Arc::new(RunContext::new());
        ctx.stop();
        worker_for(MemoryStore::new(), &ctx, 1).run(1, 100);
        assert_eq!(ctx.completed(), 0);
    }

    #[test]
    fn test_store_errors_do_not_abort_worker() {
        let ctx = Arc::new(RunContext::new());
        let store = MemoryStore::new();
        for key in ["ip:v23:1.1.1.1", "ip:v22:1.1.1.1", "ip:v23:2.2.2.2", "ip:v22:2.2.2.2"] {
            store.fail_key(key);
        }
        worker_for(store, &ctx, 1).run(1, 50);

        let outcomes = ctx.snapshot().unwrap();
        assert_eq!(outcomes.len(), 50);
        assert!(outcomes
            .iter()
            .all(|o| !o.succeeded && o.attempts == 2 && o.transient_errors == 2));
    }

    #[test]
    fn test_batched_run_counts_partial_last_batch() {
        let ctx = Arc::new(RunContext::new());
        let store = MemoryStore::new();
        store.insert("ip:v22:1.1.1.1", "a");
        store.insert("ip:v22:2.2.2.2", "b");
        worker_for(store, &ctx, 16).run(1, 100);

        let outcomes = ctx.snapshot().unwrap();
        assert_eq!(outcomes.len(), 100);
        assert!(outcomes
            .iter()
            .all(|o| o.resolved_version.as_deref() == Some("v22")));
    }
}
