use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Final classification of one monitored query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    Resolved,
    Escalated,
    Error,
}

impl QueryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Escalated => "escalated",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Default)]
struct MetricsInner {
    total: u64,
    resolved: u64,
    escalated: u64,
    errored: u64,
    latencies: Vec<Duration>,
}

/// Running performance aggregate for the monitored wrapper. Cloning hands
/// out another handle to the same aggregate; all mutation goes through one
/// mutex so `total == resolved + escalated + errored` holds after every
/// update, concurrent callers included. Constructed at process start and
/// passed to whoever records or reports.
#[derive(Clone, Default)]
pub struct MetricsRecorder {
    inner: Arc<Mutex<MetricsInner>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one completed invocation into the aggregate: bumps the total,
    /// exactly one outcome counter, and the latency series, all under the
    /// same lock acquisition.
    pub fn record(&self, outcome: QueryOutcome, elapsed: Duration) {
        let mut inner = self.lock();
        inner.total += 1;
        match outcome {
            QueryOutcome::Resolved => inner.resolved += 1,
            QueryOutcome::Escalated => inner.escalated += 1,
            QueryOutcome::Error => inner.errored += 1,
        }
        inner.latencies.push(elapsed);
    }

    /// Clears every counter and the latency series. The only way the
    /// aggregate ever shrinks.
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = MetricsInner::default();
    }

    /// Point-in-time view of the aggregate. Read-only; a snapshot taken
    /// while another query records may lag by one entry but never shows a
    /// torn update.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();
        let total = inner.total;
        let rate = |count: u64| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            }
        };
        let average_response_time_seconds = if inner.latencies.is_empty() {
            0.0
        } else {
            let sum: f64 = inner.latencies.iter().map(Duration::as_secs_f64).sum();
            round2(sum / inner.latencies.len() as f64)
        };

        MetricsSnapshot {
            total_queries: total,
            resolved: inner.resolved,
            escalated: inner.escalated,
            errored: inner.errored,
            resolution_rate_pct: rate(inner.resolved),
            escalation_rate_pct: rate(inner.escalated),
            error_rate_pct: rate(inner.errored),
            average_response_time_seconds,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsInner> {
        match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Reporter output: counters plus derived rates. All rates and the average
/// are 0 when nothing has been recorded yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_queries: u64,
    pub resolved: u64,
    pub escalated: u64,
    pub errored: u64,
    pub resolution_rate_pct: f64,
    pub escalation_rate_pct: f64,
    pub error_rate_pct: f64,
    pub average_response_time_seconds: f64,
}

impl MetricsSnapshot {
    pub fn invariant_holds(&self) -> bool {
        self.total_queries == self.resolved + self.escalated + self.errored
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Agent Performance Dashboard")?;
        writeln!(f, "Total Queries Processed: {}", self.total_queries)?;
        writeln!(f, "Resolution Rate: {:.1}%", self.resolution_rate_pct)?;
        writeln!(f, "Escalation Rate: {:.1}%", self.escalation_rate_pct)?;
        writeln!(f, "Error Rate: {:.1}%", self.error_rate_pct)?;
        write!(f, "Average Response Time: {:.2}s", self.average_response_time_seconds)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use super::{MetricsRecorder, QueryOutcome};

    #[test]
    fn fresh_recorder_reports_all_zeros() {
        let snapshot = MetricsRecorder::new().snapshot();
        assert_eq!(snapshot.total_queries, 0);
        assert_eq!(snapshot.resolution_rate_pct, 0.0);
        assert_eq!(snapshot.escalation_rate_pct, 0.0);
        assert_eq!(snapshot.error_rate_pct, 0.0);
        assert_eq!(snapshot.average_response_time_seconds, 0.0);
    }

    #[test]
    fn invariant_holds_after_every_record() {
        let metrics = MetricsRecorder::new();
        let outcomes = [
            QueryOutcome::Resolved,
            QueryOutcome::Escalated,
            QueryOutcome::Error,
            QueryOutcome::Resolved,
            QueryOutcome::Resolved,
        ];
        for (index, outcome) in outcomes.into_iter().enumerate() {
            metrics.record(outcome, Duration::from_millis(50));
            let snapshot = metrics.snapshot();
            assert!(snapshot.invariant_holds(), "invariant broken after record {index}");
            assert_eq!(snapshot.total_queries, index as u64 + 1);
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.resolved, 3);
        assert_eq!(snapshot.escalated, 1);
        assert_eq!(snapshot.errored, 1);
        assert_eq!(snapshot.resolution_rate_pct, 60.0);
        assert_eq!(snapshot.escalation_rate_pct, 20.0);
        assert_eq!(snapshot.error_rate_pct, 20.0);
    }

    #[test]
    fn average_is_the_mean_of_recorded_latencies() {
        let metrics = MetricsRecorder::new();
        for secs in [1.0, 2.0, 3.0] {
            metrics.record(QueryOutcome::Resolved, Duration::from_secs_f64(secs));
        }
        assert_eq!(metrics.snapshot().average_response_time_seconds, 2.0);
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let metrics = MetricsRecorder::new();
        for secs in [1.0, 2.0] {
            metrics.record(QueryOutcome::Resolved, Duration::from_secs_f64(secs));
        }
        metrics.record(QueryOutcome::Resolved, Duration::from_secs_f64(0.335));
        assert_eq!(metrics.snapshot().average_response_time_seconds, 1.11);
    }

    #[test]
    fn reset_empties_the_aggregate() {
        let metrics = MetricsRecorder::new();
        metrics.record(QueryOutcome::Escalated, Duration::from_secs(1));
        metrics.reset();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_queries, 0);
        assert_eq!(snapshot.average_response_time_seconds, 0.0);
    }

    #[test]
    fn concurrent_records_never_tear_the_invariant() {
        let metrics = MetricsRecorder::new();
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let outcome = match (worker + i) % 3 {
                            0 => QueryOutcome::Resolved,
                            1 => QueryOutcome::Escalated,
                            _ => QueryOutcome::Error,
                        };
                        metrics.record(outcome, Duration::from_millis(10));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("recorder thread");
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_queries, 200);
        assert!(snapshot.invariant_holds());
    }

    #[test]
    fn snapshots_share_one_aggregate_across_clones() {
        let metrics = MetricsRecorder::new();
        let other_handle = metrics.clone();
        metrics.record(QueryOutcome::Resolved, Duration::from_secs(1));
        assert_eq!(other_handle.snapshot().total_queries, 1);
    }

    #[test]
    fn dashboard_rendering_lists_every_rate() {
        let metrics = MetricsRecorder::new();
        metrics.record(QueryOutcome::Resolved, Duration::from_secs(2));
        metrics.record(QueryOutcome::Escalated, Duration::from_secs(4));
        let rendered = metrics.snapshot().to_string();
        assert!(rendered.contains("Total Queries Processed: 2"));
        assert!(rendered.contains("Resolution Rate: 50.0%"));
        assert!(rendered.contains("Escalation Rate: 50.0%"));
        assert!(rendered.contains("Error Rate: 0.0%"));
        assert!(rendered.contains("Average Response Time: 3.00s"));
    }

    #[test]
    fn snapshot_serializes_for_polling_surfaces() {
        let metrics = MetricsRecorder::new();
        metrics.record(QueryOutcome::Resolved, Duration::from_secs(1));
        let value = serde_json::to_value(metrics.snapshot()).expect("serialize snapshot");
        assert_eq!(value["total_queries"], 1);
        assert_eq!(value["resolution_rate_pct"], 100.0);
    }
}
