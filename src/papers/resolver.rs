//! Cache-first DOI resolver
//!
//! For each corpus id:
//! 1. Cache hit (including cached "no DOI") -> done
//! 2. Lookup, retrying only on rate limits with exponential backoff
//! 3. Record the result, DOI or not, so it is never fetched again
//!
//! The cache is written once per batch, not per lookup.

use super::{DoiLookup, ResolutionStats, Sleeper, ThreadSleeper};
use crate::cache::DoiCache;
use crate::error::LookupError;
use crate::report::Section;
use crate::settings::Settings;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Wait after the first 429, doubled for each further one
    pub backoff_base: Duration,
    /// Pause between lookups of two different ids
    pub request_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: Duration::from_secs(3),
            request_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_retries: settings.max_retries,
            backoff_base: settings.backoff_base(),
            request_delay: settings.request_delay(),
        }
    }

    /// 3s, 6s, 12s, 24s, 48s with the defaults
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

pub struct DoiResolver<L, S = ThreadSleeper> {
    pub stats: ResolutionStats,
    cache: DoiCache,
    lookup: L,
    sleeper: S,
    policy: RetryPolicy,
}

impl<L: DoiLookup> DoiResolver<L, ThreadSleeper> {
    pub fn new(cache: DoiCache, lookup: L, policy: RetryPolicy) -> Self {
        Self::with_sleeper(cache, lookup, policy, ThreadSleeper)
    }
}

impl<L: DoiLookup, S: Sleeper> DoiResolver<L, S> {
    pub fn with_sleeper(cache: DoiCache, lookup: L, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            stats: ResolutionStats::new(),
            cache,
            lookup,
            sleeper,
            policy,
        }
    }

    pub fn cache(&self) -> &DoiCache {
        &self.cache
    }

    pub fn doi_for(&self, corpus_id: &str) -> Option<&str> {
        self.cache.doi(corpus_id)
    }

    /// Backfill the cache from a legacy `{display label -> doi}` map.
    ///
    /// Only fills ids that are not cached yet. Saves the cache when anything
    /// was imported. Returns the number of imported entries.
    pub fn import_legacy(
        &mut self,
        sections: &[Section],
        legacy: &HashMap<String, Option<String>>,
    ) -> usize {
        if legacy.is_empty() {
            return 0;
        }

        let mut imported = 0;
        for citation in sections.iter().flat_map(|s| s.citations.iter()) {
            if let Some(doi) = legacy.get(&citation.display) {
                if self.cache.fill_gap(&citation.corpus_id, doi.clone()) {
                    imported += 1;
                }
            }
        }

        if imported > 0 {
            info!("Imported {} DOIs from legacy file into cache", imported);
            self.persist();
        }
        self.stats.imported += imported;
        imported
    }

    /// Make sure every id is in the cache, fetching the missing ones.
    ///
    /// Saves the cache once at the end if anything was fetched. A failed
    /// save is counted in the stats; the DOIs stay available in memory.
    pub fn resolve_all<I>(&mut self, corpus_ids: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut to_fetch = Vec::new();
        let mut cached = 0;

        for id in corpus_ids {
            let id = id.as_ref();
            if !seen.insert(id.to_string()) {
                continue;
            }
            if self.cache.contains(id) {
                cached += 1;
            } else {
                to_fetch.push(id.to_string());
            }
        }
        self.stats.unique_ids += seen.len();
        self.stats.cached += cached;

        println!("Found {} papers in cache", cached);
        println!("Need to fetch {} new papers\n", to_fetch.len());

        let total = to_fetch.len();
        for (i, corpus_id) in to_fetch.iter().enumerate() {
            println!("[{}/{}] Fetching CorpusID {}...", i + 1, total, corpus_id);

            let doi = self.fetch_with_retry(corpus_id);
            match &doi {
                Some(d) => {
                    println!("[{}/{}] ✓ {}", i + 1, total, d);
                    self.stats.found += 1;
                }
                None => println!("[{}/{}] ✗ No DOI", i + 1, total),
            }
            self.cache.insert(corpus_id.as_str(), doi);
            self.stats.fetched += 1;

            if i + 1 < total {
                self.sleeper.sleep(self.policy.request_delay);
            }
        }

        if total > 0 {
            info!("Saving {} new entries to {}", total, self.cache.path().display());
            self.persist();
        }
    }

    fn persist(&mut self) {
        if let Err(e) = self.cache.save() {
            warn!("Cache not saved, continuing with in-memory results: {}", e);
            self.stats.save_failures += 1;
        }
    }

    /// One id, retried only while rate limited. Any other failure gives up
    /// immediately; both cases resolve to no DOI.
    fn fetch_with_retry(&mut self, corpus_id: &str) -> Option<String> {
        for attempt in 0..self.policy.max_retries {
            match self.lookup.lookup_doi(corpus_id) {
                Ok(doi) => return doi,
                Err(LookupError::RateLimited) => {
                    let wait = self.policy.backoff_delay(attempt);
                    warn!(
                        corpus_id,
                        attempt = attempt + 1,
                        "Rate limited, waiting {}s",
                        wait.as_secs()
                    );
                    self.sleeper.sleep(wait);
                }
                Err(e) => {
                    warn!(corpus_id, "Lookup failed: {}", e);
                    self.stats.failed += 1;
                    return None;
                }
            }
        }

        warn!(
            corpus_id,
            "Rate limited after {} attempts, giving up", self.policy.max_retries
        );
        self.stats.rate_limited += 1;
        None
    }
}
