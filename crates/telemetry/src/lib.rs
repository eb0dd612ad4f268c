//! Logging and request metrics for pixmill front ends
//!
//! - `tracing` subscriber setup, writing to stderr
//! - Counters and latency samples per metric name
//! - A serializable snapshot for `--stats`

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

static METRICS: Lazy<Metrics> = Lazy::new(Metrics::new);

static SESSION_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `config.log_level` when set. Logs go to stderr so
/// they never mix with image bytes or JSON written to stdout.
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number)
            .compact(),
    );

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))?;

    tracing::debug!(
        session_id = %session_id(),
        version = env!("CARGO_PKG_VERSION"),
        "Logging ready"
    );
    Ok(())
}

/// Identifier shared by every log line and snapshot of this process
pub fn session_id() -> &'static str {
    &SESSION_ID
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive
    pub log_level: String,
    /// Include event targets
    pub show_target: bool,
    /// Include source file names
    pub show_file: bool,
    /// Include source line numbers
    pub show_line_number: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            show_target: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

/// Process-wide counters and latency samples
pub struct Metrics {
    counters: Mutex<BTreeMap<String, u64>>,
    latencies: Mutex<BTreeMap<String, Vec<Duration>>>,
    started: Instant,
}

impl Metrics {
    fn new() -> Self {
        Self {
            counters: Mutex::new(BTreeMap::new()),
            latencies: Mutex::new(BTreeMap::new()),
            started: Instant::now(),
        }
    }

    /// Add one to a counter
    pub fn increment(&self, name: &str) {
        self.increment_by(name, 1);
    }

    /// Add `value` to a counter
    pub fn increment_by(&self, name: &str, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(name.to_string()).or_default() += value;
    }

    /// Current value of a counter, zero if never touched
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    /// Record one latency sample
    pub fn record(&self, name: &str, elapsed: Duration) {
        self.latencies
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push(elapsed);
    }

    /// Everything collected so far
    pub fn snapshot(&self) -> Snapshot {
        let counters = self.counters.lock().unwrap().clone();
        let latencies = self
            .latencies
            .lock()
            .unwrap()
            .iter()
            .map(|(name, samples)| (name.clone(), LatencySummary::from_samples(samples)))
            .collect();

        Snapshot {
            session_id: session_id().to_string(),
            uptime_secs: self.started.elapsed().as_secs(),
            counters,
            latencies,
        }
    }
}

/// Serializable view of [`Metrics`]
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub session_id: String,
    pub uptime_secs: u64,
    pub counters: BTreeMap<String, u64>,
    pub latencies: BTreeMap<String, LatencySummary>,
}

/// Latency distribution in milliseconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySummary {
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
}

impl LatencySummary {
    fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }

        let mut ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        ms.sort_by(f64::total_cmp);
        let nearest_rank = |p: f64| ms[((p / 100.0) * (ms.len() - 1) as f64).round() as usize];

        Self {
            count: ms.len(),
            min_ms: ms[0],
            max_ms: ms[ms.len() - 1],
            mean_ms: ms.iter().sum::<f64>() / ms.len() as f64,
            p50_ms: nearest_rank(50.0),
            p95_ms: nearest_rank(95.0),
        }
    }
}

/// The global metrics
pub fn metrics() -> &'static Metrics {
    &METRICS
}

/// Measures a span of work and records it under `name`
///
/// Records exactly once: on `stop`, or on drop if never stopped.
pub struct Timer {
    name: &'static str,
    start: Instant,
    recorded: bool,
}

impl Timer {
    /// Start timing
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
            recorded: false,
        }
    }

    /// Stop timing and return the elapsed time
    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let elapsed = self.start.elapsed();
        if !self.recorded {
            self.recorded = true;
            metrics().record(self.name, elapsed);
            tracing::debug!(metric = self.name, elapsed_ms = elapsed.as_millis() as u64, "timed");
        }
        elapsed
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.finish();
    }
}

/// A named, timestamped record logged at info level
#[derive(Debug, Serialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub kind: &'static str,
    pub data: serde_json::Value,
}

impl Event {
    pub fn new(kind: &'static str, data: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            session_id: session_id().to_string(),
            kind,
            data,
        }
    }

    pub fn log(&self) {
        tracing::info!(kind = self.kind, data = %self.data, "event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.increment("images.ok");
        metrics.increment("images.ok");
        metrics.increment_by("images.ok", 3);

        assert_eq!(metrics.counter("images.ok"), 5);
        assert_eq!(metrics.counter("images.failed"), 0);
    }

    #[test]
    fn test_latency_summary() {
        let samples: Vec<Duration> = (1..=10).map(Duration::from_millis).collect();
        let summary = LatencySummary::from_samples(&samples);

        assert_eq!(summary.count, 10);
        assert_eq!(summary.min_ms, 1.0);
        assert_eq!(summary.max_ms, 10.0);
        assert_eq!(summary.mean_ms, 5.5);
        assert_eq!(LatencySummary::from_samples(&[]).count, 0);
    }

    #[test]
    fn test_timer_records_once() {
        let name = "test.timer_records_once";
        let timer = Timer::start(name);
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.stop().as_millis() >= 10);

        let snapshot = metrics().snapshot();
        assert_eq!(snapshot.latencies[name].count, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = Metrics::new();
        metrics.increment("images.ok");
        metrics.record("transform", Duration::from_millis(12));

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["counters"]["images.ok"], 1);
        assert_eq!(json["latencies"]["transform"]["count"], 1);
    }

    #[test]
    fn test_session_id_is_uuid() {
        assert!(Uuid::parse_str(session_id()).is_ok());
    }
}
