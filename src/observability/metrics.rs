/// Prometheusメトリクス定義。
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Registry, TextEncoder,
    register_counter_vec_with_registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

/// 生成呼び出しは数分かかることがあるので上限側を広めに取る。
const LONG_RUN_BUCKETS: &[f64] = &[1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0];

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // カウンター
    pub runs_started: Counter,
    pub runs_succeeded: Counter,
    pub runs_failed: Counter,
    pub runs_skipped: Counter,
    pub posts_created: CounterVec,
    pub theme_corrections: CounterVec,
    pub ledger_write_failures: Counter,

    // ヒストグラム
    pub generation_duration: Histogram,
    pub run_duration: Histogram,

    // ゲージ
    pub run_executing: Gauge,
    pub scheduler_enabled: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            runs_started: register_counter_with_registry!(
                "autoblog_runs_started_total",
                "Total number of generation runs started",
                registry
            )?,
            runs_succeeded: register_counter_with_registry!(
                "autoblog_runs_succeeded_total",
                "Total number of generation runs that produced a post",
                registry
            )?,
            runs_failed: register_counter_with_registry!(
                "autoblog_runs_failed_total",
                "Total number of generation runs recorded as failed",
                registry
            )?,
            runs_skipped: register_counter_with_registry!(
                "autoblog_runs_skipped_total",
                "Scheduled ticks skipped because a run was already executing",
                registry
            )?,
            posts_created: register_counter_vec_with_registry!(
                "autoblog_posts_created_total",
                "Posts persisted, by effective theme",
                &["theme"],
                registry
            )?,
            theme_corrections: register_counter_vec_with_registry!(
                "autoblog_theme_corrections_total",
                "Runs whose detected theme overrode the requested theme",
                &["requested", "detected"],
                registry
            )?,
            ledger_write_failures: register_counter_with_registry!(
                "autoblog_ledger_write_failures_total",
                "Run ledger terminal writes that failed",
                registry
            )?,
            generation_duration: register_histogram_with_registry!(
                HistogramOpts::new(
                    "autoblog_generation_duration_seconds",
                    "Duration of calls to the writer service"
                )
                .buckets(LONG_RUN_BUCKETS.to_vec()),
                registry
            )?,
            run_duration: register_histogram_with_registry!(
                HistogramOpts::new(
                    "autoblog_run_duration_seconds",
                    "Duration of entire generation runs"
                )
                .buckets(LONG_RUN_BUCKETS.to_vec()),
                registry
            )?,
            run_executing: register_gauge_with_registry!(
                "autoblog_run_executing",
                "1 while a generation run is executing",
                registry
            )?,
            scheduler_enabled: register_gauge_with_registry!(
                "autoblog_scheduler_enabled",
                "1 while the interval scheduler is enabled",
                registry
            )?,
            registry,
        })
    }

    /// 独立したレジストリで作る。テストやコンポーネント単体の利用向け。
    pub fn standalone() -> Result<Self, prometheus::Error> {
        Self::new(Arc::new(Registry::new()))
    }

    /// Prometheusテキスト形式でレンダリングする。
    #[must_use]
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %err, "failed to encode prometheus metrics");
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_all_collectors_once() {
        let metrics = Metrics::standalone().expect("metrics");
        metrics.runs_skipped.inc();
        metrics
            .theme_corrections
            .with_label_values(&["genai", "blockchain"])
            .inc();
        let rendered = metrics.render();
        assert!(rendered.contains("autoblog_runs_skipped_total 1"));
        assert!(rendered.contains(
            "autoblog_theme_corrections_total{detected=\"blockchain\",requested=\"genai\"} 1"
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let registry = Arc::new(Registry::new());
        let _first = Metrics::new(Arc::clone(&registry)).expect("first");
        assert!(Metrics::new(registry).is_err());
    }
}
