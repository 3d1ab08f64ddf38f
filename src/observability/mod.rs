pub(crate) mod metrics;
pub(crate) mod tracing;

use std::sync::Arc;

use anyhow::Result;
use prometheus::Registry;

pub use self::metrics::Metrics;

/// Telemetry（メトリクスとトレーシング）を管理する構造体。
#[derive(Debug, Clone)]
pub struct Telemetry {
    metrics: Arc<Metrics>,
}

impl Telemetry {
    /// 新しいTelemetryインスタンスを作成し、トレーシングとメトリクスを初期化する。
    pub fn new() -> Result<Self> {
        tracing::init()?;
        let registry = Arc::new(Registry::new());
        let metrics = Arc::new(Metrics::new(registry)?);
        Ok(Self { metrics })
    }

    /// トレーシングを初期化せずにメトリクスだけ用意する（テスト用）。
    pub fn without_tracing() -> Result<Self> {
        Ok(Self {
            metrics: Arc::new(Metrics::standalone()?),
        })
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// 準備完了プローブを記録する。
    pub fn record_ready_probe(&self, ready: bool) {
        ::tracing::debug!(ready, "service ready probe");
    }

    /// ライブプローブを記録する。
    pub fn record_live_probe(&self) {
        ::tracing::debug!("service live probe");
    }

    /// 手動生成呼び出しを記録する。
    pub fn record_manual_generate_invocation(&self) {
        ::tracing::info!("manual generation invoked");
    }

    /// Prometheusメトリクスをレンダリングする。
    pub fn render_prometheus(&self) -> String {
        self.metrics.render()
    }

    /// 終了時にスパンをフラッシュする。
    pub fn shutdown(&self) {
        tracing::shutdown();
    }
}
