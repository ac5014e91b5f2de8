//! DOI resolution for cited papers
//!
//! Lookups go through the [`DoiLookup`] trait so the resolver can run
//! against Semantic Scholar in production and a scripted fake in tests.
//! Waiting goes through [`Sleeper`] for the same reason.

pub mod resolver;
pub mod semantic_scholar;

use crate::error::LookupError;
use std::time::Duration;

/// A service that maps a corpus id to its DOI
pub trait DoiLookup {
    /// `Ok(None)` means the paper exists but has no DOI
    fn lookup_doi(&self, corpus_id: &str) -> Result<Option<String>, LookupError>;
}

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the current thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Counters for one resolution run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionStats {
    pub unique_ids: usize,
    pub cached: usize,
    pub imported: usize,
    pub fetched: usize,
    pub found: usize,
    pub rate_limited: usize,
    pub failed: usize,
    pub save_failures: usize,
}

impl ResolutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_summary(&self) {
        println!("\nDOI Resolution Results:");
        println!("  {:16} {}", "Unique ids:", self.unique_ids);
        println!("  {:16} {}", "From cache:", self.cached);
        if self.imported > 0 {
            println!("  {:16} {}", "Imported:", self.imported);
        }
        println!("  {:16} {}", "Newly fetched:", self.fetched);
        if self.fetched > 0 {
            let rate = (self.found as f64 / self.fetched as f64) * 100.0;
            println!("  {:16} {}/{} ({:.0}%)", "DOIs found:", self.found, self.fetched, rate);
        }
        if self.rate_limited > 0 {
            println!("  {:16} {}", "Rate limited:", self.rate_limited);
        }
        if self.failed > 0 {
            println!("  {:16} {}", "Failed:", self.failed);
        }
        if self.save_failures > 0 {
            println!("  {:16} {}", "Cache not saved:", self.save_failures);
        }
    }
}
