//! Bounded trace capture for a rule.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::client::EngineClient;
use crate::error::Result;
use crate::types::TraceSpan;

/// Default number of polling iterations.
pub const DEFAULT_ITERATIONS: u32 = 10;

/// Default pause between iterations.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Summary of one capture run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureReport {
    pub iterations: u32,
    pub traces: usize,
    pub spans: usize,
    /// Polls that failed; the capture carries on after them
    pub failed_polls: u32,
}

/// Spans held for one rule, with the trace ids already fetched.
#[derive(Debug, Default)]
struct RuleCapture {
    spans: Vec<TraceSpan>,
    seen: HashSet<String>,
}

/// Captures trace spans for rules into an in-memory buffer.
///
/// A trace is fetched at most once per rule until [`TraceCapture::clear`].
///
/// Tracing is switched on for the duration of [`TraceCapture::run`] and
/// switched off again when it returns, whatever happened while polling.
pub struct TraceCapture {
    client: EngineClient,
    iterations: u32,
    interval: Duration,
    buffer: Mutex<HashMap<String, RuleCapture>>,
}

impl TraceCapture {
    #[must_use]
    pub fn new(client: EngineClient) -> Self {
        Self {
            client,
            iterations: DEFAULT_ITERATIONS,
            interval: DEFAULT_INTERVAL,
            buffer: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Enable tracing, poll for new traces, then disable tracing.
    ///
    /// # Errors
    /// Fails if tracing cannot be enabled. Failures while polling are
    /// counted in the report; a failure to disable tracing is logged.
    pub async fn run(&self, rule_id: &str) -> Result<CaptureReport> {
        let trace = self.client.trace();
        trace.start(rule_id, "always").await?;
        debug!(rule_id = %rule_id, iterations = self.iterations, "Trace capture started");

        let report = self.poll(rule_id).await;

        if let Err(e) = trace.stop(rule_id).await {
            warn!(rule_id = %rule_id, error = %e, "Failed to disable tracing after capture");
        }
        debug!(rule_id = %rule_id, traces = report.traces, spans = report.spans, "Trace capture finished");
        Ok(report)
    }

    async fn poll(&self, rule_id: &str) -> CaptureReport {
        let trace = self.client.trace();
        let mut report = CaptureReport::default();

        for i in 0..self.iterations {
            if i > 0 {
                tokio::time::sleep(self.interval).await;
            }
            report.iterations += 1;

            let ids = match trace.list_for_rule(rule_id).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(rule_id = %rule_id, error = %e, "Failed to list traces");
                    report.failed_polls += 1;
                    continue;
                }
            };

            for id in ids {
                if self.is_captured(rule_id, &id) {
                    continue;
                }
                match trace.get(&id).await {
                    Ok(roots) => {
                        let spans: Vec<TraceSpan> =
                            roots.into_iter().flat_map(TraceSpan::flatten).collect();
                        report.traces += 1;
                        report.spans += spans.len();
                        let mut buffer = self.buffer.lock();
                        let capture = buffer.entry(rule_id.to_string()).or_default();
                        capture.spans.extend(spans);
                        capture.seen.insert(id);
                    }
                    Err(e) => {
                        warn!(trace_id = %id, error = %e, "Failed to fetch trace");
                        report.failed_polls += 1;
                    }
                }
            }
        }
        report
    }

    fn is_captured(&self, rule_id: &str, trace_id: &str) -> bool {
        self.buffer
            .lock()
            .get(rule_id)
            .is_some_and(|c| c.seen.contains(trace_id))
    }

    /// Spans captured for a rule so far.
    #[must_use]
    pub fn spans(&self, rule_id: &str) -> Vec<TraceSpan> {
        self.buffer
            .lock()
            .get(rule_id)
            .map(|c| c.spans.clone())
            .unwrap_or_default()
    }

    /// Rules with captured spans.
    #[must_use]
    pub fn rules(&self) -> Vec<String> {
        self.buffer.lock().keys().cloned().collect()
    }

    /// Discard the spans captured for a rule.
    pub fn clear(&self, rule_id: &str) {
        self.buffer.lock().remove(rule_id);
    }
}
