//! Telemetry for analysis runs
//!
//! Collects stage timings and every locally recovered failure, so degraded
//! runs stay observable even though they still report success.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::category::Provenance;
use crate::pipeline::Stage;

/// Telemetry event types
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    // Pipeline events
    StageStarted {
        stage: Stage,
        timestamp: Instant,
    },
    StageCompleted {
        stage: Stage,
        duration_ms: u64,
        success: bool,
        timestamp: Instant,
    },

    // Degradation events
    SourceDegraded {
        source: String,
        item: String,
        reason: String,
        timestamp: Instant,
    },
    ProfileFallback {
        index: usize,
        reason: String,
        timestamp: Instant,
    },
    AlternativesFallback {
        category: String,
        reason: String,
        timestamp: Instant,
    },

    // Resolution events
    CategoryResolved {
        category: String,
        provenance: Provenance,
        timestamp: Instant,
    },
    ParallelDispatch {
        task_count: usize,
        timestamp: Instant,
    },
}

/// Telemetry statistics
#[derive(Debug, Clone, Default)]
pub struct TelemetryStats {
    pub stages_started: usize,
    pub stages_succeeded: usize,
    pub stages_degraded: usize,
    pub degraded_sources: usize,
    pub profile_fallbacks: usize,
    pub alternatives_fallbacks: usize,
    pub categories_resolved: usize,
    pub parallel_dispatches: usize,
}

/// Telemetry collector, shared by every component of a pipeline.
///
/// Holds one run at a time: `reset` clears it for every clone.
#[derive(Debug, Clone)]
pub struct TelemetryCollector {
    events: Arc<Mutex<Vec<TelemetryEvent>>>,
    stats: Arc<Mutex<TelemetryStats>>,
    start_time: Arc<Mutex<Instant>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicked recorder leaves plain counters behind; keep using them.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelemetryCollector {
    /// Create a new telemetry collector
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            stats: Arc::new(Mutex::new(TelemetryStats::default())),
            start_time: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Drop everything recorded so far and restart the clock
    pub fn reset(&self) {
        lock(&self.events).clear();
        *lock(&self.stats) = TelemetryStats::default();
        *lock(&self.start_time) = Instant::now();
    }

    /// Record an event
    pub fn record(&self, event: TelemetryEvent) {
        {
            let mut stats = lock(&self.stats);
            match &event {
                TelemetryEvent::StageStarted { .. } => {
                    stats.stages_started += 1;
                }
                TelemetryEvent::StageCompleted { success, .. } => {
                    if *success {
                        stats.stages_succeeded += 1;
                    } else {
                        stats.stages_degraded += 1;
                    }
                }
                TelemetryEvent::SourceDegraded { .. } => {
                    stats.degraded_sources += 1;
                }
                TelemetryEvent::ProfileFallback { .. } => {
                    stats.profile_fallbacks += 1;
                }
                TelemetryEvent::AlternativesFallback { .. } => {
                    stats.alternatives_fallbacks += 1;
                }
                TelemetryEvent::CategoryResolved { .. } => {
                    stats.categories_resolved += 1;
                }
                TelemetryEvent::ParallelDispatch { .. } => {
                    stats.parallel_dispatches += 1;
                }
            }
        }

        lock(&self.events).push(event);
    }

    /// Record a degraded external source
    pub fn source_degraded(&self, source: &str, item: &str, reason: impl Into<String>) {
        self.record(TelemetryEvent::SourceDegraded {
            source: source.to_string(),
            item: item.to_string(),
            reason: reason.into(),
            timestamp: Instant::now(),
        });
    }

    /// Get current statistics
    pub fn get_stats(&self) -> TelemetryStats {
        lock(&self.stats).clone()
    }

    /// Get elapsed time since start or the last reset
    pub fn elapsed(&self) -> Duration {
        lock(&self.start_time).elapsed()
    }

    /// Get event count
    pub fn event_count(&self) -> usize {
        lock(&self.events).len()
    }

    /// Get recent events (last n)
    pub fn recent_events(&self, n: usize) -> Vec<TelemetryEvent> {
        let events = lock(&self.events);
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    /// All events recorded so far
    pub fn events(&self) -> Vec<TelemetryEvent> {
        lock(&self.events).clone()
    }

    /// Duration and outcome of every finished stage, in run order
    pub fn stage_timings(&self) -> Vec<(Stage, u64, bool)> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                TelemetryEvent::StageCompleted {
                    stage,
                    duration_ms,
                    success,
                    ..
                } => Some((*stage, *duration_ms, *success)),
                _ => None,
            })
            .collect()
    }

    /// Whether anything had to be recovered during the run
    pub fn was_degraded(&self) -> bool {
        let stats = lock(&self.stats);
        stats.stages_degraded
            + stats.degraded_sources
            + stats.profile_fallbacks
            + stats.alternatives_fallbacks
            > 0
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Simple telemetry display
pub struct TelemetryDisplay {
    collector: TelemetryCollector,
    verbosity: crate::cli::Verbosity,
}

impl TelemetryDisplay {
    pub fn new(collector: TelemetryCollector, verbosity: crate::cli::Verbosity) -> Self {
        Self {
            collector,
            verbosity,
        }
    }

    /// Display summary statistics
    pub fn display_summary(&self) {
        let stats = self.collector.get_stats();
        let elapsed = self.collector.elapsed();

        eprintln!("\n📊 Run Summary");
        eprintln!("─────────────────────────────────────");
        eprintln!("Duration:           {:?}", elapsed);
        eprintln!("Stages completed:   {}", stats.stages_succeeded);
        eprintln!("Stages degraded:    {}", stats.stages_degraded);
        eprintln!("Degraded sources:   {}", stats.degraded_sources);
        eprintln!("Profile fallbacks:  {}", stats.profile_fallbacks);
        eprintln!("Curated fallbacks:  {}", stats.alternatives_fallbacks);

        for (stage, duration_ms, success) in self.collector.stage_timings() {
            let outcome = if success { "ok" } else { "degraded" };
            eprintln!("  {:<26}{:>6} ms  {}", stage.display_name(), duration_ms, outcome);
        }
        eprintln!();
    }

    /// Check if should show detailed output
    pub fn should_show_details(&self) -> bool {
        self.verbosity.show_events()
    }
}
