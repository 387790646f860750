use std::sync::OnceLock;
use std::time::Duration;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    Ok(())
}

pub fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

pub(crate) fn record_request(operation: &'static str, success: bool, elapsed: Duration) {
    let outcome = if success { "success" } else { "error" };
    metrics::counter!(
        "exam_client_http_requests_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("exam_client_http_request_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

pub(crate) fn record_save(success: bool) {
    let outcome = if success { "success" } else { "error" };
    metrics::counter!("exam_client_answer_saves_total", "outcome" => outcome).increment(1);
}

pub(crate) fn record_submission(mode: &'static str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    metrics::counter!("exam_client_submissions_total", "mode" => mode, "outcome" => outcome)
        .increment(1);
}
