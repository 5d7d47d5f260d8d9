//! Versioned lookup resolver
//!
//! Every identifier is looked up under the primary generation first and,
//! only if that yields nothing, under the fallback generation. This models
//! a store mid-migration: entries of the newest generation may be evicted or
//! not yet imported, and reads should still be served from the previous one.
//!
//! A transient store error on either attempt is treated exactly like an
//! absent key. It is counted on the outcome (`transient_errors`) but never
//! returned to the caller, so a flaky network degrades the hit rate instead
//! of aborting the worker.

use std::{sync::Arc, time::Instant};

use log::{debug, trace};
use store::{versioned_key, GetOutcome, StoreClient};

use crate::types::{LookupOutcome, RunConfig};

pub struct VersionedResolver {
    store: Arc<dyn StoreClient>,
    primary_version: String,
    fallback_version: String,
}

impl VersionedResolver {
    pub fn new(
        store: Arc<dyn StoreClient>,
        primary_version: impl Into<String>,
        fallback_version: impl Into<String>,
    ) -> Self {
        Self {
            store,
            primary_version: primary_version.into(),
            fallback_version: fallback_version.into(),
        }
    }

    pub fn from_config(store: Arc<dyn StoreClient>, config: &RunConfig) -> Self {
        Self::new(
            store,
            config.primary_version.clone(),
            config.fallback_version.clone(),
        )
    }

    #[must_use]
    pub fn primary_version(&self) -> &str {
        &self.primary_version
    }

    #[must_use]
    pub fn fallback_version(&self) -> &str {
        &self.fallback_version
    }

    /// Size of the value found, or `None`; bumps `errors` on a transient failure
    fn accept(key: &str, outcome: &GetOutcome, errors: &mut u8) -> Option<usize> {
        if let GetOutcome::TransientError(e) = outcome {
            trace!("Transient error reading {key}: {e}");
            *errors += 1;
        }
        outcome.value().map(str::len)
    }

    fn attempt(&self, version: &str, id: &str, errors: &mut u8) -> Option<usize> {
        let key = versioned_key(version, id);
        let outcome = self.store.get(&key);
        Self::accept(&key, &outcome, errors)
    }

    /// Resolves one identifier: primary wins, fallback second, else a miss
    pub fn resolve(&self, id: &str) -> LookupOutcome {
        let start = Instant::now();
        let mut errors = 0;

        if let Some(size) = self.attempt(&self.primary_version, id, &mut errors) {
            return LookupOutcome::hit(id, &self.primary_version, size, start.elapsed(), 1, errors);
        }

        if let Some(size) = self.attempt(&self.fallback_version, id, &mut errors) {
            return LookupOutcome::hit(id, &self.fallback_version, size, start.elapsed(), 2, errors);
        }

        LookupOutcome::miss(id, start.elapsed(), errors)
    }

    /// Resolves several identifiers with a single pipelined round-trip
    ///
    /// Both generations are requested up front for every identifier; the
    /// same primary-wins precedence is then applied per identifier. Every
    /// outcome carries the batch round-trip time as its latency. If the
    /// round-trip fails as a whole, each identifier is resolved on its own.
    pub fn resolve_batch(&self, ids: &[&str]) -> Vec<LookupOutcome> {
        if ids.is_empty() {
            return Vec::new();
        }

        let keys: Vec<String> = ids
            .iter()
            .flat_map(|id| {
                [
                    versioned_key(&self.primary_version, id),
                    versioned_key(&self.fallback_version, id),
                ]
            })
            .collect();

        let start = Instant::now();
        let replies = self.store.get_many(&keys);
        let elapsed = start.elapsed();

        let failed = replies.len() != keys.len()
            || replies.iter().all(GetOutcome::is_transient_error);
        if failed {
            debug!(
                "Pipelined lookup of {} identifiers failed, resolving one by one",
                ids.len()
            );
            return ids.iter().map(|id| self.resolve(id)).collect();
        }

        let missing = GetOutcome::TransientError("no reply for key".to_string());
        let reply = |i: usize| replies.get(i).unwrap_or(&missing);

        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                let mut errors = 0;
                if let Some(size) = Self::accept(&keys[2 * i], reply(2 * i), &mut errors) {
                    return LookupOutcome::hit(*id, &self.primary_version, size, elapsed, 1, errors);
                }
                if let Some(size) = Self::accept(&keys[2 * i + 1], reply(2 * i + 1), &mut errors) {
                    return LookupOutcome::hit(*id, &self.fallback_version, size, elapsed, 2, errors);
                }
                LookupOutcome::miss(*id, elapsed, errors)
            })
            .collect()
    }
}
