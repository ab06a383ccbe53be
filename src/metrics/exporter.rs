use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::metrics::traits::{CacheMetricsSnapshot, MetricsExporter};
use crate::stats::StatsSnapshot;

/// Prometheus text exporter for pattern cache snapshots.
///
/// Writes the Prometheus text exposition format so the output can be scraped
/// directly or forwarded to an OpenTelemetry collector.
///
/// # Example
///
/// ```
/// use regexkit::metrics::{MetricsExporter, MetricsSnapshotProvider, PrometheusTextExporter};
/// use regexkit::prelude::*;
///
/// let mut cache = PatternCache::new(AutomataEngine::new());
/// cache.matches(b"a+", CaseMode::Sensitive, b"aaa").unwrap();
///
/// let exporter = PrometheusTextExporter::new("regexp", Vec::new());
/// exporter.export(&cache.snapshot());
/// let text = String::from_utf8(exporter.into_inner()).unwrap();
/// assert!(text.contains("regexp_compilations_total 1"));
/// assert!(text.contains("regexp_cache_len 1"));
/// ```
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send + Sync> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send + Sync> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consumes the exporter and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_counter(&self, name: &str, value: u64) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(writer, "# TYPE {} counter", name);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_gauge(&self, name: &str, value: u64) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(writer, "# TYPE {} gauge", name);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send + Sync> MetricsExporter<StatsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &StatsSnapshot) {
        self.write_counter(
            &self.metric_name("compilations_total"),
            snapshot.compilations,
        );
        self.write_counter(&self.metric_name("hits_total"), snapshot.hits);
        self.write_counter(&self.metric_name("misses_total"), snapshot.misses);
        self.write_counter(&self.metric_name("evictions_total"), snapshot.evictions);
    }
}

impl<W: Write + Send + Sync> MetricsExporter<CacheMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &CacheMetricsSnapshot) {
        MetricsExporter::<StatsSnapshot>::export(self, &snapshot.stats);
        self.write_gauge(&self.metric_name("cache_len"), snapshot.cache_len as u64);
        self.write_gauge(&self.metric_name("capacity"), snapshot.capacity as u64);
        self.write_gauge(
            &self.metric_name("jit_initialized"),
            u64::from(snapshot.jit_initialized),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CacheBuilder;
    use crate::engine::scripted::ScriptedEngine;
    use crate::metrics::traits::{MetricsReset, MetricsSnapshotProvider};
    use crate::pattern::CaseMode;

    #[test]
    fn exports_counters_and_gauges() {
        let mut cache = CacheBuilder::new(1)
            .try_build(ScriptedEngine::default())
            .unwrap();
        for p in ["a", "a", "b"] {
            cache
                .matches(p.as_bytes(), CaseMode::Sensitive, b"ab")
                .unwrap();
        }

        let exporter = PrometheusTextExporter::new("", Vec::new());
        exporter.export(&cache.snapshot());
        let text = String::from_utf8(exporter.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "# TYPE compilations_total counter",
                "compilations_total 2",
                "# TYPE hits_total counter",
                "hits_total 1",
                "# TYPE misses_total counter",
                "misses_total 2",
                "# TYPE evictions_total counter",
                "evictions_total 1",
                "# TYPE cache_len gauge",
                "cache_len 1",
                "# TYPE capacity gauge",
                "capacity 1",
                "# TYPE jit_initialized gauge",
                "jit_initialized 1",
            ]
        );
    }

    #[test]
    fn reset_clears_counters_but_not_occupancy() {
        let mut cache = CacheBuilder::new(2)
            .try_build(ScriptedEngine::default())
            .unwrap();
        cache.matches(b"a", CaseMode::Sensitive, b"a").unwrap();
        cache.reset_metrics();
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.stats, StatsSnapshot::default());
        assert_eq!(snapshot.cache_len, 1);
    }
}
