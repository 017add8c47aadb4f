//! Build instrumentation

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::types::Domain;

/// Counters updated by extraction runs; shared by every node of a build.
#[derive(Debug, Default)]
pub struct ExtractStats {
    init_calls: AtomicUsize,
    finish_calls: AtomicUsize,
    element_calls: [AtomicUsize; 4],
    threaded_runs: AtomicUsize,
    single_threaded_runs: AtomicUsize,
    extractors: Mutex<Vec<&'static str>>,
}

impl ExtractStats {
    pub fn record_init(&self, name: &'static str) {
        self.init_calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut names) = self.extractors.lock() {
            names.push(name);
        }
    }

    pub fn record_finish(&self) {
        self.finish_calls.fetch_add(1, Ordering::Relaxed);
    }

    /// `calls` callbacks were made over `domain`.
    pub fn record_elements(&self, domain: Domain, calls: usize) {
        self.element_calls[domain.index()].fetch_add(calls, Ordering::Relaxed);
    }

    pub fn record_run(&self, threaded: bool) {
        if threaded {
            self.threaded_runs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.single_threaded_runs.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::Relaxed)
    }

    pub fn finish_calls(&self) -> usize {
        self.finish_calls.load(Ordering::Relaxed)
    }

    pub fn element_calls(&self, domain: Domain) -> usize {
        self.element_calls[domain.index()].load(Ordering::Relaxed)
    }

    pub fn threaded_runs(&self) -> usize {
        self.threaded_runs.load(Ordering::Relaxed)
    }

    pub fn single_threaded_runs(&self) -> usize {
        self.single_threaded_runs.load(Ordering::Relaxed)
    }

    /// Names of every extractor initialised, in init order per run
    pub fn extractors(&self) -> Vec<&'static str> {
        self.extractors.lock().map(|names| names.clone()).unwrap_or_default()
    }

    /// Copy of the current counter values
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            init_calls: self.init_calls(),
            finish_calls: self.finish_calls(),
            element_calls: Domain::ORDER.map(|d| self.element_calls(d)),
            threaded_runs: self.threaded_runs(),
            single_threaded_runs: self.single_threaded_runs(),
            extractors: self.extractors(),
        }
    }

    pub fn reset(&self) {
        self.init_calls.store(0, Ordering::Relaxed);
        self.finish_calls.store(0, Ordering::Relaxed);
        for c in &self.element_calls {
            c.store(0, Ordering::Relaxed);
        }
        self.threaded_runs.store(0, Ordering::Relaxed);
        self.single_threaded_runs.store(0, Ordering::Relaxed);
        if let Ok(mut names) = self.extractors.lock() {
            names.clear();
        }
    }
}

/// Plain copy of [`ExtractStats`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub init_calls: usize,
    pub finish_calls: usize,
    /// Indexed by [`Domain::index`]
    pub element_calls: [usize; 4],
    pub threaded_runs: usize,
    pub single_threaded_runs: usize,
    pub extractors: Vec<&'static str>,
}

/// Result of one `build_requested` / `finish_requested`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Batches that became ready
    pub batches_built: usize,
    /// Buffers filled by this build
    pub buffers_extracted: usize,
    /// Counters accumulated by this build only
    pub stats: StatsSnapshot,
}

impl BuildReport {
    /// Nothing was extracted
    pub fn is_noop(&self) -> bool {
        self.buffers_extracted == 0 && self.stats.init_calls == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_and_reset() {
        let stats = ExtractStats::default();
        stats.record_init("pos_nor");
        stats.record_init("tris");
        stats.record_finish();
        stats.record_elements(Domain::Poly, 12);
        stats.record_run(true);
        stats.record_run(false);

        let snap = stats.snapshot();
        assert_eq!(snap.init_calls, 2);
        assert_eq!(snap.finish_calls, 1);
        assert_eq!(snap.element_calls, [0, 12, 0, 0]);
        assert_eq!(snap.threaded_runs, 1);
        assert_eq!(snap.single_threaded_runs, 1);
        assert_eq!(snap.extractors, vec!["pos_nor", "tris"]);

        stats.reset();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }
}
