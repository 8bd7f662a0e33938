//! In-memory directory lister for tests and offline demos
//!
//! Listings are keyed by path and can be loaded from a JSON file mapping each
//! path to an array of entries. Artificial delays simulate a slow storage
//! server, individual paths can be scripted to fail, and every call is counted
//! so tests can assert how many requests the tree issued.

use super::backend::{DirectoryLister, FileEntry};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Delay configuration for the fixture lister
#[derive(Debug, Clone, Default)]
pub struct FixtureConfig {
    /// Delay applied to every listing
    pub list_delay: Duration,
    /// Per-path overrides of `list_delay`
    pub path_delays: HashMap<String, Duration>,
}

impl FixtureConfig {
    /// Same delay for every path
    pub fn uniform(delay: Duration) -> Self {
        Self {
            list_delay: delay,
            path_delays: HashMap::new(),
        }
    }

    /// No delays at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Roughly what a busy storage gateway feels like
    pub fn slow_network() -> Self {
        Self::uniform(Duration::from_millis(400))
    }

    pub fn with_path_delay(mut self, path: impl Into<String>, delay: Duration) -> Self {
        self.path_delays.insert(path.into(), delay);
        self
    }

    fn delay_for(&self, path: &str) -> Duration {
        self.path_delays
            .get(path)
            .copied()
            .unwrap_or(self.list_delay)
    }
}

/// Call counters of a fixture lister
#[derive(Debug, Clone, Default)]
pub struct ListingMetrics {
    /// Number of list_directory calls
    pub list_calls: usize,
    /// Calls per requested path
    pub calls_by_path: HashMap<String, usize>,
    /// Number of calls answered with an error
    pub failed_calls: usize,
    /// Total time spent in artificial delays
    pub total_delay_time: Duration,
}

impl ListingMetrics {
    pub fn calls_for(&self, path: &str) -> usize {
        self.calls_by_path.get(path).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Default)]
struct FixtureState {
    listings: HashMap<String, Vec<FileEntry>>,
    failures: HashSet<String>,
    metrics: ListingMetrics,
}

#[derive(Debug, Default)]
pub struct FixtureLister {
    state: Arc<Mutex<FixtureState>>,
    config: FixtureConfig,
}

impl FixtureLister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load listings from a JSON object of `{"path": [entries...]}`
    pub fn from_json(json: &str) -> io::Result<Self> {
        let listings: HashMap<String, Vec<FileEntry>> = serde_json::from_str(json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        let lister = Self::new();
        lister.state().listings = listings
            .into_iter()
            .map(|(path, entries)| (normalize(&path).to_string(), entries))
            .collect();
        Ok(lister)
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn with_config(mut self, config: FixtureConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_listing(self, path: &str, entries: Vec<FileEntry>) -> Self {
        self.set_listing(path, entries);
        self
    }

    pub fn with_failure(self, path: &str) -> Self {
        self.fail_path(path);
        self
    }

    /// Replace the listing served for `path`
    pub fn set_listing(&self, path: &str, entries: Vec<FileEntry>) {
        self.state()
            .listings
            .insert(normalize(path).to_string(), entries);
    }

    /// Make every subsequent listing of `path` fail
    pub fn fail_path(&self, path: &str) {
        self.state().failures.insert(normalize(path).to_string());
    }

    pub fn clear_failure(&self, path: &str) {
        self.state().failures.remove(normalize(path));
    }

    /// Get a snapshot of current metrics
    pub fn metrics(&self) -> ListingMetrics {
        self.state().metrics.clone()
    }

    pub fn reset_metrics(&self) {
        self.state().metrics.reset();
    }

    fn state(&self) -> MutexGuard<'_, FixtureState> {
        // A panic while holding the lock only happens inside a failing test
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}

#[async_trait]
impl DirectoryLister for FixtureLister {
    async fn list_directory(&self, path: &str) -> io::Result<Vec<FileEntry>> {
        let path = normalize(path);
        let delay = self.config.delay_for(path);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        state.metrics.list_calls += 1;
        *state
            .metrics
            .calls_by_path
            .entry(path.to_string())
            .or_insert(0) += 1;
        state.metrics.total_delay_time += delay;

        if state.failures.contains(path) {
            state.metrics.failed_calls += 1;
            return Err(io::Error::other(format!(
                "simulated failure listing {path:?}"
            )));
        }

        match state.listings.get(path) {
            Some(entries) => Ok(entries.clone()),
            None => {
                state.metrics.failed_calls += 1;
                Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no such directory: {path:?}"),
                ))
            }
        }
    }
}
