use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use tracing::info;

use crate::events::PipelineStage;

struct PipelineMetrics {
    runs: Counter<u64>,
    stage_duration_ms: Histogram<f64>,
}

static METRICS: OnceCell<PipelineMetrics> = OnceCell::new();

fn handles() -> &'static PipelineMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("insightchain.pipeline");
        PipelineMetrics {
            runs: meter
                .u64_counter("pipeline_runs_total")
                .with_description("Total research pipeline runs by status")
                .init(),
            stage_duration_ms: meter
                .f64_histogram("stage_duration_ms")
                .with_description("Per-stage agent latency in milliseconds")
                .init(),
        }
    })
}

/// Hint to operators that OTEL metrics export can be configured externally.
pub fn init_metrics_from_env(service_name: &str) {
    if std::env::var("INSIGHTCHAIN_OTEL_METRICS_ENDPOINT").is_ok() {
        info!(
            target = "telemetry",
            "INSIGHTCHAIN_OTEL_METRICS_ENDPOINT detected for {service_name}. Configure an OTLP meter provider in your deployment to export pipeline metrics."
        );
    }
}

/// Record one stage's latency (no-op if no provider installed).
pub fn record_stage_duration(stage: PipelineStage, duration_ms: u64) {
    handles().stage_duration_ms.record(
        duration_ms as f64,
        &[KeyValue::new("stage", stage.as_str())],
    );
}

/// Record the outcome of a whole pipeline run.
pub fn record_pipeline_run(status: &'static str, failed_stage: Option<PipelineStage>) {
    let mut attrs = vec![KeyValue::new("status", status)];
    if let Some(stage) = failed_stage {
        attrs.push(KeyValue::new("stage", stage.as_str()));
    }
    handles().runs.add(1, &attrs);
}
