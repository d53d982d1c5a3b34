//! Metrics for generation calls and composite turns

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Metrics collector
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total backend calls made by personas
    pub generation_calls: AtomicU64,
    /// Backend calls that failed
    pub generation_errors: AtomicU64,
    /// Turns appended to a history
    pub turns_recorded: AtomicU64,
    /// Turns discarded because a persona failed
    pub turns_failed: AtomicU64,
    /// Referee calls (turns and sweeps)
    pub referee_calls: AtomicU64,
    /// Referee sweeps run
    pub sweeps: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a backend call
    pub fn record_generation(&self, error: bool) {
        self.generation_calls.fetch_add(1, Ordering::Relaxed);
        if error {
            self.generation_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a turn outcome
    pub fn record_turn(&self, recorded: bool) {
        if recorded {
            self.turns_recorded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.turns_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_referee_call(&self) {
        self.referee_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sweep(&self) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            generation_calls: self.generation_calls.load(Ordering::Relaxed),
            generation_errors: self.generation_errors.load(Ordering::Relaxed),
            turns_recorded: self.turns_recorded.load(Ordering::Relaxed),
            turns_failed: self.turns_failed.load(Ordering::Relaxed),
            referee_calls: self.referee_calls.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
        }
    }

    /// Get generation error rate
    pub fn generation_error_rate(&self) -> f64 {
        let total = self.generation_calls.load(Ordering::Relaxed);
        let errors = self.generation_errors.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            errors as f64 / total as f64
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub generation_calls: u64,
    pub generation_errors: u64,
    pub turns_recorded: u64,
    pub turns_failed: u64,
    pub referee_calls: u64,
    pub sweeps: u64,
}

impl MetricsSnapshot {
    /// Export metrics in Prometheus text format
    pub fn to_prometheus(&self) -> String {
        let counters = [
            (
                "personality_generation_calls_total",
                "Total backend generation calls",
                self.generation_calls,
            ),
            (
                "personality_generation_errors_total",
                "Total failed backend generation calls",
                self.generation_errors,
            ),
            (
                "personality_turns_recorded_total",
                "Turns appended to a history",
                self.turns_recorded,
            ),
            (
                "personality_turns_failed_total",
                "Turns discarded after a persona failure",
                self.turns_failed,
            ),
            (
                "personality_referee_calls_total",
                "Total referee calls",
                self.referee_calls,
            ),
            ("personality_sweeps_total", "Total referee sweeps", self.sweeps),
        ];

        let mut output = String::new();
        for (name, help, value) in counters {
            output.push_str(&format!("# HELP {} {}\n", name, help));
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{} {}\n", name, value));
        }

        let error_rate = if self.generation_calls > 0 {
            self.generation_errors as f64 / self.generation_calls as f64
        } else {
            0.0
        };
        output.push_str("# HELP personality_generation_error_rate Current generation error rate\n");
        output.push_str("# TYPE personality_generation_error_rate gauge\n");
        output.push_str(&format!("personality_generation_error_rate {:.4}\n", error_rate));

        output
    }
}

/// Global metrics instance
static GLOBAL_METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize global metrics
pub fn global_metrics() -> Arc<Metrics> {
    GLOBAL_METRICS
        .get_or_init(|| Arc::new(Metrics::new()))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let metrics = Metrics::new();

        metrics.record_generation(false);
        metrics.record_generation(true);
        metrics.record_turn(true);
        metrics.record_turn(false);
        metrics.record_referee_call();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.generation_calls, 2);
        assert_eq!(snapshot.generation_errors, 1);
        assert_eq!(snapshot.turns_recorded, 1);
        assert_eq!(snapshot.turns_failed, 1);
        assert_eq!(snapshot.referee_calls, 1);
        assert_eq!(metrics.generation_error_rate(), 0.5);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.record_sweep();
        let text = metrics.snapshot().to_prometheus();
        assert!(text.contains("personality_sweeps_total 1"));
        assert!(text.contains("# TYPE personality_generation_error_rate gauge"));
    }
}
