//! Prometheus metrics endpoint and the counter names the pipeline stages
//! increment.

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const MESSAGES_RECEIVED_TOTAL: &str = "waterline_messages_received_total";
pub const MESSAGES_PROCESSED_TOTAL: &str = "waterline_messages_processed_total";
pub const MESSAGES_FAILED_TOTAL: &str = "waterline_messages_failed_total";
pub const MESSAGES_POISON_TOTAL: &str = "waterline_messages_poison_total";
pub const RECORDS_WRITTEN_TOTAL: &str = "waterline_records_written_total";
pub const EVENTS_PUBLISHED_TOTAL: &str = "waterline_events_published_total";
pub const EVENTS_PUBLISH_FAILED_TOTAL: &str = "waterline_events_publish_failed_total";

pub fn setup_metrics_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

async fn index() -> &'static str {
    "waterline enrichment service"
}

/// Router with `/` liveness and the Prometheus scrape endpoint.
pub fn metrics_router() -> Router {
    let recorder_handle = setup_metrics_recorder();

    Router::new().route("/", get(index)).route(
        "/metrics",
        get(move || std::future::ready(recorder_handle.render())),
    )
}

/// Bind a `TcpListener` on the provided address and serve the router on it.
pub async fn serve(router: Router, bind: &str) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;

    axum::serve(listener, router).await?;

    Ok(())
}
