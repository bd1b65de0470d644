use axum::{routing::get, Router};
use axum_prometheus::PrometheusMetricLayer;

/// Prometheus layer plus the `/metrics` exposition route. Installed once
/// from `main`; the router built by `routes::create_router` stays free of
/// global recorder state so tests can construct it repeatedly.
pub fn setup_metrics() -> (PrometheusMetricLayer<'static>, Router) {
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
    let app = Router::new().route("/metrics", get(|| async move { metric_handle.render() }));
    (prometheus_layer, app)
}
