use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // Datastore Metrics
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Generative provider
    pub static ref AI_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "ai_calls_total",
        "Generative provider attempts by outcome",
        &["task", "outcome"]
    )
    .unwrap();

    pub static ref AI_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "ai_call_duration_seconds",
        "Generative provider attempt duration in seconds",
        &["task"],
        vec![0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 12.0, 20.0, 30.0]
    )
    .unwrap();

    // Arbitration
    pub static ref ANALYSIS_RESULTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "analysis_results_total",
        "Arbitrated results by task and provenance",
        &["task", "provenance"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track database operation with metrics
pub async fn track_db_operation<F, T>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(duration);

    result
}

/// One provider attempt; `outcome` is `success` or a failure kind.
pub fn record_ai_call(task: &str, outcome: &str, duration_secs: f64) {
    AI_CALLS_TOTAL.with_label_values(&[task, outcome]).inc();
    if duration_secs > 0.0 {
        AI_CALL_DURATION_SECONDS
            .with_label_values(&[task])
            .observe(duration_secs);
    }
}

pub fn record_analysis_result(task: &str, provenance: &str) {
    ANALYSIS_RESULTS_TOTAL
        .with_label_values(&[task, provenance])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
    }

    #[test]
    fn test_render_metrics() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();
        record_ai_call("adaptive_difficulty", "timeout", 1.5);
        record_analysis_result("adaptive_difficulty", "fallback");

        let output = render_metrics().unwrap();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("ai_calls_total"));
        assert!(output.contains("analysis_results_total"));
    }
}
