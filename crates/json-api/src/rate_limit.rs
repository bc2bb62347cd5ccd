//! Per-client rate limiting for public write endpoints.

use std::sync::Arc;

use salvo::{http::header::RETRY_AFTER, prelude::*};
use tracing::warn;

use crate::{extensions::*, observability::record_rate_limited, state::State};

const REMAINING_HEADER: &str = "x-ratelimit-remaining";

#[salvo::handler]
pub(crate) async fn handler(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) {
    let state = match depot.obtain::<Arc<State>>() {
        Ok(state) => state,
        Err(_error) => {
            res.render(StatusError::internal_server_error());
            ctrl.skip_rest();

            return;
        }
    };

    let client = req.client_key(state.trusted_proxy_hops);
    let decision = state.rate_limiter.check(&client);

    if let Err(source) = res.add_header(REMAINING_HEADER, decision.remaining, true) {
        warn!("failed to set rate limit header: {source}");
    }

    if !decision.allowed {
        let retry_after = decision
            .retry_after
            .as_secs()
            .saturating_add(u64::from(decision.retry_after.subsec_nanos() > 0))
            .max(1);

        warn!(%client, retry_after, "rate limit exceeded");
        record_rate_limited();

        if let Err(source) = res.add_header(RETRY_AFTER, retry_after, true) {
            warn!("failed to set Retry-After header: {source}");
        }

        res.render(StatusError::too_many_requests().brief("Too many requests, try again later"));
        ctrl.skip_rest();

        return;
    }

    ctrl.call_next(req, depot, res).await;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use atelier_app::rate_limit::RateLimitConfig;
    use salvo::{
        affix_state::inject,
        test::{ResponseExt, TestClient},
    };
    use testresult::TestResult;

    use crate::test_helpers::{Mocks, state_behind_proxies};

    use super::*;

    #[salvo::handler]
    async fn accepted(res: &mut Response) {
        res.render("ok");
    }

    fn make_service(max_requests: u32) -> Service {
        make_proxied_service(max_requests, 0)
    }

    fn make_proxied_service(max_requests: u32, trusted_proxy_hops: usize) -> Service {
        let state = state_behind_proxies(
            Mocks::default(),
            RateLimitConfig {
                max_requests,
                window: Duration::from_secs(60),
            },
            trusted_proxy_hops,
        );

        Service::new(
            Router::new()
                .hoop(inject(state))
                .hoop(handler)
                .push(Router::new().post(accepted)),
        )
    }

    #[tokio::test]
    async fn test_requests_within_limit_pass() -> TestResult {
        let service = make_service(2);

        let mut res = TestClient::post("http://example.com")
            .add_header("x-forwarded-for", "203.0.113.7", true)
            .send(&service)
            .await;

        assert_eq!(res.status_code, Some(StatusCode::OK));
        assert_eq!(res.take_string().await?, "ok");
        assert_eq!(
            res.headers()
                .get(REMAINING_HEADER)
                .and_then(|value| value.to_str().ok()),
            Some("1")
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_request_over_limit_returns_429_with_retry_after() {
        let service = make_service(1);

        let first = TestClient::post("http://example.com")
            .add_header("x-forwarded-for", "203.0.113.7", true)
            .send(&service)
            .await;

        let second = TestClient::post("http://example.com")
            .add_header("x-forwarded-for", "203.0.113.7", true)
            .send(&service)
            .await;

        assert_eq!(first.status_code, Some(StatusCode::OK));
        assert_eq!(second.status_code, Some(StatusCode::TOO_MANY_REQUESTS));

        let retry_after = second
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());

        assert!(
            retry_after.is_some_and(|seconds| (1..=60).contains(&seconds)),
            "Retry-After should be within the window, got {retry_after:?}"
        );
    }

    #[tokio::test]
    async fn test_spoofed_forwarded_for_shares_the_socket_window() {
        let service = make_service(1);

        let first = TestClient::post("http://example.com")
            .add_header("x-forwarded-for", "203.0.113.7", true)
            .send(&service)
            .await;

        let second = TestClient::post("http://example.com")
            .add_header("x-forwarded-for", "198.51.100.9", true)
            .send(&service)
            .await;

        assert_eq!(first.status_code, Some(StatusCode::OK));
        assert_eq!(
            second.status_code,
            Some(StatusCode::TOO_MANY_REQUESTS),
            "a new header value must not reset the limit"
        );
    }

    #[tokio::test]
    async fn test_clients_behind_a_trusted_proxy_are_counted_separately() {
        let service = make_proxied_service(1, 1);

        for client in ["203.0.113.7", "198.51.100.9"] {
            let res = TestClient::post("http://example.com")
                .add_header("x-forwarded-for", format!("192.0.2.1, {client}"), true)
                .send(&service)
                .await;

            assert_eq!(res.status_code, Some(StatusCode::OK), "{client} should pass");
        }
    }
}
