use std::thread;
use std::time::Duration;

use crate::consts::{ MAX_BOUNCE_DEPTH, ENERGY_THRESHOLD, PREVIEW_INTERVAL_MS };

/// Render settings shared by every worker.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// A task stops after this many bounces.
    pub max_depth: u32,

    /// A task stops once its remaining energy drops below this.
    pub energy_threshold: f64,

    /// Number of worker threads. `None` (or zero) picks one less than the
    /// number of hardware threads, but at least one.
    pub threads: Option<usize>,

    /// How often the live preview is refreshed while rendering.
    pub preview_interval: Duration,
}

impl Default for RenderConfig {
    fn default() -> RenderConfig {
        RenderConfig {
            max_depth: MAX_BOUNCE_DEPTH,
            energy_threshold: ENERGY_THRESHOLD,
            threads: None,
            preview_interval: Duration::from_millis(PREVIEW_INTERVAL_MS),
        }
    }
}

impl RenderConfig {
    /// The number of worker threads to spawn.
    pub fn worker_count(&self) -> usize {
        match self.threads {
            Some(n) if n > 0 => n,
            _ => default_worker_count(),
        }
    }
}

/// One less than the available hardware threads, leaving one for the
/// preview, but never less than one.
pub fn default_worker_count() -> usize {
    let hardware = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    hardware.saturating_sub(1).max(1)
}

#[test]
fn worker_count_is_at_least_one() {
    let config = RenderConfig { threads: Some(0), ..Default::default() };
    assert!(config.worker_count() >= 1);
    assert_eq!(config.worker_count(), default_worker_count());
}

#[test]
fn explicit_worker_count_wins() {
    let config = RenderConfig { threads: Some(3), ..Default::default() };
    assert_eq!(config.worker_count(), 3);
}
