//! Prometheus metrics: HTTP traffic plus booking, webhook and rate limit counters.

use std::sync::OnceLock;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder, core::Collector,
};
use salvo::{
    Request, Response, handler,
    http::{
        StatusCode,
        header::{CONTENT_TYPE, HeaderValue},
    },
};
use tracing::error;

const DURATION_BUCKETS: [f64; 13] = [
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

#[derive(Debug)]
struct ApiMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    requests_in_flight: IntGauge,
    bookings_created_total: IntCounter,
    gateway_webhooks_total: IntCounterVec,
    rate_limited_total: IntCounter,
}

static API_METRICS: OnceLock<Option<ApiMetrics>> = OnceLock::new();

#[derive(Debug)]
pub(super) struct InFlightRequestGuard {
    tracked: bool,
}

impl InFlightRequestGuard {
    pub(super) fn track() -> Self {
        let Some(metrics) = metrics() else {
            return Self { tracked: false };
        };

        metrics.requests_in_flight.inc();

        Self { tracked: true }
    }
}

impl Drop for InFlightRequestGuard {
    fn drop(&mut self) {
        if self.tracked
            && let Some(metrics) = metrics()
        {
            metrics.requests_in_flight.dec();
        }
    }
}

pub(super) fn observe_request(method: &str, route: &str, status_code: u16, duration_seconds: f64) {
    let Some(metrics) = metrics() else {
        return;
    };

    let status_code_label = status_code.to_string();

    metrics
        .requests_total
        .with_label_values(&[method, route, status_class(status_code), &status_code_label])
        .inc();

    metrics
        .request_duration_seconds
        .with_label_values(&[method, route])
        .observe(duration_seconds);
}

/// Count a booking that reached `PendingPayment`.
pub(crate) fn record_booking_created() {
    if let Some(metrics) = metrics() {
        metrics.bookings_created_total.inc();
    }
}

/// Count a gateway webhook by how it was answered.
pub(crate) fn record_gateway_webhook(outcome: &str) {
    if let Some(metrics) = metrics() {
        metrics
            .gateway_webhooks_total
            .with_label_values(&[outcome])
            .inc();
    }
}

/// Count a request turned away by the rate limiter.
pub(crate) fn record_rate_limited() {
    if let Some(metrics) = metrics() {
        metrics.rate_limited_total.inc();
    }
}

#[handler]
pub(crate) async fn metrics_handler(_req: &mut Request, res: &mut Response) {
    let Some(metrics) = metrics() else {
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        return;
    };

    let encoder = TextEncoder::new();
    let mut encoded = Vec::new();

    if let Err(source) = encoder.encode(&metrics.registry.gather(), &mut encoded) {
        error!("failed to encode metrics response: {source}");
        res.status_code(StatusCode::INTERNAL_SERVER_ERROR);

        return;
    }

    match HeaderValue::from_str(encoder.format_type()) {
        Ok(content_type) => {
            res.headers_mut().insert(CONTENT_TYPE, content_type);
            res.render(String::from_utf8_lossy(&encoded).into_owned());
        }
        Err(source) => {
            error!("failed to encode metrics content type header: {source}");
            res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

fn metrics() -> Option<&'static ApiMetrics> {
    API_METRICS.get_or_init(build_metrics).as_ref()
}

fn register<M>(registry: &Registry, name: &str, metric: Result<M, prometheus::Error>) -> Option<M>
where
    M: Collector + Clone + 'static,
{
    let metric = metric
        .inspect_err(|source| error!("failed to create {name} metric: {source}"))
        .ok()?;

    registry
        .register(Box::new(metric.clone()))
        .inspect_err(|source| error!("failed to register {name} metric: {source}"))
        .ok()?;

    Some(metric)
}

fn build_metrics() -> Option<ApiMetrics> {
    let registry = Registry::new();

    let requests_total = register(
        &registry,
        "requests_total",
        IntCounterVec::new(
            Opts::new(
                "atelier_json_http_requests_total",
                "Total HTTP requests partitioned by method, route, status class, and status code.",
            ),
            &["method", "route", "status_class", "status_code"],
        ),
    )?;

    let request_duration_seconds = register(
        &registry,
        "request_duration",
        HistogramVec::new(
            HistogramOpts::new(
                "atelier_json_http_request_duration_seconds",
                "HTTP request duration in seconds partitioned by method and route.",
            )
            .buckets(DURATION_BUCKETS.to_vec()),
            &["method", "route"],
        ),
    )?;

    let requests_in_flight = register(
        &registry,
        "requests_in_flight",
        IntGauge::with_opts(Opts::new(
            "atelier_json_http_requests_in_flight",
            "Current number of in-flight HTTP requests.",
        )),
    )?;

    let bookings_created_total = register(
        &registry,
        "bookings_created",
        IntCounter::with_opts(Opts::new(
            "atelier_json_bookings_created_total",
            "Bookings created in PendingPayment.",
        )),
    )?;

    let gateway_webhooks_total = register(
        &registry,
        "gateway_webhooks",
        IntCounterVec::new(
            Opts::new(
                "atelier_json_gateway_webhooks_total",
                "Gateway webhook deliveries partitioned by outcome.",
            ),
            &["outcome"],
        ),
    )?;

    let rate_limited_total = register(
        &registry,
        "rate_limited",
        IntCounter::with_opts(Opts::new(
            "atelier_json_rate_limited_total",
            "Requests rejected with 429 by the booking rate limiter.",
        )),
    )?;

    Some(ApiMetrics {
        registry,
        requests_total,
        request_duration_seconds,
        requests_in_flight,
        bookings_created_total,
        gateway_webhooks_total,
        rate_limited_total,
    })
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}

#[cfg(test)]
mod tests {
    use salvo::{
        Router, Service,
        test::{ResponseExt, TestClient},
    };

    use super::*;

    async fn scrape() -> String {
        let service =
            Service::new(Router::new().push(Router::with_path("metrics").get(metrics_handler)));

        TestClient::get("http://example.com/metrics")
            .send(&service)
            .await
            .take_string()
            .await
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_http_metrics() {
        observe_request("GET", "/bookings/{uuid}", 200, 0.042);
        observe_request("POST", "/bookings", 409, 0.123);

        let response = scrape().await;

        assert!(
            response.contains("atelier_json_http_requests_total"),
            "expected requests_total metric in response"
        );
        assert!(
            response.contains("atelier_json_http_request_duration_seconds"),
            "expected request_duration metric in response"
        );
        assert!(
            response.contains("atelier_json_http_requests_in_flight"),
            "expected in-flight metric in response"
        );
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_domain_counters() {
        record_booking_created();
        record_gateway_webhook("already_processed");
        record_rate_limited();

        let response = scrape().await;

        assert!(
            response.contains("atelier_json_bookings_created_total"),
            "expected bookings counter in response"
        );
        assert!(
            response.contains(r#"atelier_json_gateway_webhooks_total{outcome="already_processed"}"#),
            "expected labelled webhook counter in response"
        );
        assert!(
            response.contains("atelier_json_rate_limited_total"),
            "expected rate limit counter in response"
        );
    }

    #[test]
    fn status_codes_fall_into_classes() {
        assert_eq!(status_class(201), "2xx", "created is a success");
        assert_eq!(status_class(429), "4xx", "rate limited is a client error");
        assert_eq!(status_class(502), "5xx", "bad gateway is a server error");
        assert_eq!(status_class(42), "other", "non-HTTP codes are grouped");
    }
}
