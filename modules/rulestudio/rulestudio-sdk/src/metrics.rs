//! Rule throughput polling.
//!
//! The engine status endpoint reports cumulative counters and, on some
//! versions, an instantaneous speed. [`RateTracker`] turns successive
//! counter readings into a rate per rule; [`MetricsPoller`] polls a set of
//! rules on a fixed interval and keeps the last samples in a
//! [`ThroughputWindow`].

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::client::EngineClient;

/// Default number of samples kept for charting.
pub const DEFAULT_WINDOW_CAPACITY: usize = 20;

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Shortest accepted polling interval; shorter values are raised to it.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Throughput figures extracted from one status response.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RuleThroughput {
    /// Instantaneous records per second, when the engine reports one
    pub speed: Option<f64>,
    /// Cumulative records received by the rule's sources
    pub records_in_total: Option<f64>,
}

impl RuleThroughput {
    /// Extract figures from a `GET /rules/{id}/status` body.
    ///
    /// Speed is the `speed` key, or the sum of all `*_speed` keys. The
    /// counter is the sum of `source_*_records_in_total`, falling back to
    /// `records_in_total`. Numeric strings are accepted.
    #[must_use]
    pub fn from_status(status: &Value) -> Self {
        let Some(map) = status.as_object() else {
            return Self::default();
        };

        let speed = map.get("speed").and_then(number).or_else(|| {
            sum(map
                .iter()
                .filter(|(k, _)| k.ends_with("_speed"))
                .filter_map(|(_, v)| number(v)))
        });

        let records_in_total = sum(map
            .iter()
            .filter(|(k, _)| k.starts_with("source_") && k.ends_with("_records_in_total"))
            .filter_map(|(_, v)| number(v)))
        .or_else(|| map.get("records_in_total").and_then(number));

        Self {
            speed,
            records_in_total,
        }
    }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn sum(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

#[derive(Debug, Clone, Copy)]
struct CounterReading {
    value: f64,
    at: DateTime<Utc>,
}

/// Per-rule rate state: rule id → previous counter reading.
#[derive(Debug, Default)]
pub struct RateTracker {
    previous: HashMap<String, CounterReading>,
}

impl RateTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records per second for `rule_id` at `at`.
    ///
    /// A reported speed is used as is. Otherwise the rate is derived from
    /// the counter delta since the previous reading. The first reading, a
    /// counter that went backwards, and a reading not newer than the
    /// previous one all yield 0. The result is always finite and ≥ 0.
    pub fn observe(&mut self, rule_id: &str, figures: &RuleThroughput, at: DateTime<Utc>) -> f64 {
        let derived = figures
            .records_in_total
            .map_or(0.0, |value| self.derive(rule_id, value, at));

        let rate = figures.speed.unwrap_or(derived);
        if rate.is_finite() { rate.max(0.0) } else { 0.0 }
    }

    fn derive(&mut self, rule_id: &str, value: f64, at: DateTime<Utc>) -> f64 {
        let current = CounterReading { value, at };
        let Some(prev) = self.previous.get(rule_id).copied() else {
            self.previous.insert(rule_id.to_string(), current);
            return 0.0;
        };

        // Out-of-order reading: keep the newer state.
        if at < prev.at {
            return 0.0;
        }
        self.previous.insert(rule_id.to_string(), current);

        let elapsed = (at - prev.at).num_milliseconds() as f64 / 1000.0;
        if elapsed <= 0.0 {
            return 0.0;
        }
        ((value - prev.value) / elapsed).max(0.0)
    }

    /// Drop state for one rule.
    pub fn forget(&mut self, rule_id: &str) {
        self.previous.remove(rule_id);
    }

    /// Number of rules with a stored reading.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.previous.len()
    }
}

/// Aggregate throughput at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputSample {
    pub at: DateTime<Utc>,
    /// Sum of per-rule rates, records per second
    pub total: f64,
    pub per_rule: BTreeMap<String, f64>,
}

/// Bounded window of samples, oldest dropped first.
#[derive(Debug, Clone)]
pub struct ThroughputWindow {
    capacity: usize,
    samples: VecDeque<ThroughputSample>,
}

impl Default for ThroughputWindow {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_WINDOW_CAPACITY)
    }
}

impl ThroughputWindow {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a sample.
    ///
    /// Returns `false` and keeps the window unchanged when the sample is
    /// older than the newest one held.
    pub fn push(&mut self, sample: ThroughputSample) -> bool {
        if self.samples.back().is_some_and(|last| sample.at < last.at) {
            return false;
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        true
    }

    #[must_use]
    pub fn latest(&self) -> Option<&ThroughputSample> {
        self.samples.back()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<ThroughputSample> {
        self.samples.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Polls rule status for a fixed set of rules.
pub struct MetricsPoller {
    client: EngineClient,
    rule_ids: Vec<String>,
    interval: Duration,
    capacity: usize,
    tracker: RateTracker,
}

impl MetricsPoller {
    #[must_use]
    pub fn new(client: EngineClient, rule_ids: Vec<String>) -> Self {
        Self {
            client,
            rule_ids,
            interval: DEFAULT_POLL_INTERVAL,
            capacity: DEFAULT_WINDOW_CAPACITY,
            tracker: RateTracker::new(),
        }
    }

    /// Pause between polls, at least [`MIN_POLL_INTERVAL`].
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Fetch the status of every monitored rule once.
    ///
    /// Rules whose status cannot be fetched are skipped.
    pub async fn poll_once(&mut self) -> ThroughputSample {
        let mut per_rule = BTreeMap::new();
        for rule_id in &self.rule_ids {
            match self.client.rules().status_raw(rule_id).await {
                Ok(status) => {
                    let figures = RuleThroughput::from_status(&status);
                    let rate = self.tracker.observe(rule_id, &figures, Utc::now());
                    per_rule.insert(rule_id.clone(), rate);
                }
                Err(e) => {
                    warn!(rule_id = %rule_id, error = %e, "Failed to fetch rule status");
                }
            }
        }
        ThroughputSample {
            at: Utc::now(),
            total: per_rule.values().sum(),
            per_rule,
        }
    }

    /// Start polling in a background task.
    ///
    /// Polling runs until [`PollerHandle::stop`] is called or the handle is
    /// dropped.
    #[must_use]
    pub fn start(mut self) -> PollerHandle {
        let window = Arc::new(Mutex::new(ThroughputWindow::with_capacity(self.capacity)));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let shared = Arc::clone(&window);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            debug!(rules = self.rule_ids.len(), interval = ?self.interval, "Metrics poller started");
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let sample = self.poll_once().await;
                        if !shared.lock().push(sample) {
                            debug!("Discarded stale throughput sample");
                        }
                    }
                }
            }
            debug!("Metrics poller stopped");
        });

        PollerHandle {
            window,
            stop: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// Running poller. Stops the task when dropped.
pub struct PollerHandle {
    window: Arc<Mutex<ThroughputWindow>>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Samples collected so far, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ThroughputSample> {
        self.window.lock().snapshot()
    }

    #[must_use]
    pub fn latest(&self) -> Option<ThroughputSample> {
        self.window.lock().latest().cloned()
    }

    /// Stop polling and wait for the task to finish.
    ///
    /// Returns the samples collected; the window is discarded afterwards.
    pub async fn stop(mut self) -> Vec<ThroughputSample> {
        if let Some(tx) = self.stop.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        self.snapshot()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use serde_json::json;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn counter(v: f64) -> RuleThroughput {
        RuleThroughput {
            speed: None,
            records_in_total: Some(v),
        }
    }

    #[test]
    fn extracts_counters_from_status() {
        let figures = RuleThroughput::from_status(&json!({
            "status": "running",
            "source_demo_0_records_in_total": 100,
            "source_other_0_records_in_total": "50",
            "sink_log_0_records_in_total": 999
        }));
        assert_eq!(figures.records_in_total, Some(150.0));
        assert_eq!(figures.speed, None);

        let figures = RuleThroughput::from_status(&json!({"records_in_total": 7}));
        assert_eq!(figures.records_in_total, Some(7.0));
    }

    #[test]
    fn extracts_speed_keys() {
        assert_eq!(
            RuleThroughput::from_status(&json!({"speed": "12.5"})).speed,
            Some(12.5)
        );
        assert_eq!(
            RuleThroughput::from_status(&json!({"a_speed": 1, "b_speed": 2.5, "c": 3})).speed,
            Some(3.5)
        );
        assert_eq!(
            RuleThroughput::from_status(&json!({"speed": "fast"})).speed,
            None
        );
    }

    #[test]
    fn first_sample_is_zero() {
        let mut tracker = RateTracker::new();
        let rate = tracker.observe("r1", &counter(500.0), t0());
        assert!(rate.abs() < f64::EPSILON);
        assert_eq!(tracker.tracked(), 1);
    }

    #[test]
    fn rate_from_counter_delta() {
        let mut tracker = RateTracker::new();
        tracker.observe("r1", &counter(100.0), t0());
        let rate = tracker.observe("r1", &counter(150.0), t0() + TimeDelta::seconds(5));
        assert!((rate - 10.0).abs() < 1e-9);
    }

    #[test]
    fn counter_reset_clamps_to_zero() {
        let mut tracker = RateTracker::new();
        tracker.observe("r1", &counter(1000.0), t0());
        let rate = tracker.observe("r1", &counter(3.0), t0() + TimeDelta::seconds(2));
        assert!(rate.abs() < f64::EPSILON);
        // The reset reading becomes the new baseline.
        let rate = tracker.observe("r1", &counter(13.0), t0() + TimeDelta::seconds(4));
        assert!((rate - 5.0).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_and_stale_readings_are_zero() {
        let mut tracker = RateTracker::new();
        tracker.observe("r1", &counter(10.0), t0());
        let same = tracker.observe("r1", &counter(20.0), t0());
        assert!(same.abs() < f64::EPSILON && same.is_finite());
        let stale = tracker.observe("r1", &counter(30.0), t0() - TimeDelta::seconds(1));
        assert!(stale.abs() < f64::EPSILON);
    }

    #[test]
    fn speed_is_used_directly() {
        let mut tracker = RateTracker::new();
        let figures = RuleThroughput {
            speed: Some(42.0),
            records_in_total: Some(1.0),
        };
        assert!((tracker.observe("r1", &figures, t0()) - 42.0).abs() < f64::EPSILON);
        let negative = RuleThroughput {
            speed: Some(-3.0),
            records_in_total: None,
        };
        assert!(tracker.observe("r2", &negative, t0()).abs() < f64::EPSILON);
    }

    #[test]
    fn rules_are_tracked_independently() {
        let mut tracker = RateTracker::new();
        tracker.observe("a", &counter(0.0), t0());
        tracker.observe("b", &counter(0.0), t0());
        let a = tracker.observe("a", &counter(10.0), t0() + TimeDelta::seconds(1));
        let b = tracker.observe("b", &counter(40.0), t0() + TimeDelta::seconds(1));
        assert!((a - 10.0).abs() < 1e-9);
        assert!((b - 40.0).abs() < 1e-9);
        tracker.forget("a");
        assert_eq!(tracker.tracked(), 1);
    }

    fn sample(secs: i64, total: f64) -> ThroughputSample {
        ThroughputSample {
            at: t0() + TimeDelta::seconds(secs),
            total,
            per_rule: BTreeMap::new(),
        }
    }

    #[test]
    fn window_drops_oldest() {
        let mut window = ThroughputWindow::with_capacity(3);
        for i in 0..5 {
            assert!(window.push(sample(i, i as f64)));
        }
        let totals: Vec<f64> = window.snapshot().iter().map(|s| s.total).collect();
        assert_eq!(totals, [2.0, 3.0, 4.0]);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn window_rejects_older_samples() {
        let mut window = ThroughputWindow::default();
        assert_eq!(window.capacity(), 20);
        assert!(window.push(sample(10, 1.0)));
        assert!(!window.push(sample(5, 2.0)));
        assert!(window.push(sample(10, 3.0)));
        assert_eq!(window.latest().map(|s| s.total), Some(3.0));
        assert_eq!(window.len(), 2);
    }
}
