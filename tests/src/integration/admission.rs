//! # Admission Scenarios
//!
//! Per-client daily request counters enforced ahead of every route.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use axum::http::StatusCode;
    use blocks_api::domain::config::RateLimitConfig;
    use blocks_api::ports::CounterStore;
    use blocks_api::ApiConfig;
    use std::time::Duration;

    fn limited_app(limit: u64) -> TestApp {
        TestApp::with_config(ApiConfig {
            rate_limit: RateLimitConfig {
                limit,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn from(uri: &str, peer: &str) -> axum::http::Request<axum::body::Body> {
        let mut req = get(uri);
        from_peer(&mut req, peer);
        req
    }

    #[tokio::test]
    async fn test_301st_request_is_throttled() {
        let app = TestApp::new();

        for i in 1..=300 {
            let resp = app.get("/block?block_number=123").await;
            assert_eq!(resp.status, StatusCode::OK, "request {}", i);
        }

        let resp = app.get("/block?block_number=123").await;
        assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.message(), "Rate limit exceeded");
        assert_eq!(resp.header("retry-after"), Some("300"));
    }

    #[tokio::test]
    async fn test_throttled_requests_are_counted() {
        let app = limited_app(2);
        for _ in 0..5 {
            app.get("/health").await;
        }

        let entry = app
            .counters
            .get("198.51.100.10_20240517")
            .await
            .unwrap();
        assert_eq!(entry.count, Some(5));
    }

    #[tokio::test]
    async fn test_clients_are_counted_separately() {
        let app = limited_app(1);

        assert_eq!(app.get("/health").await.status, StatusCode::OK);
        assert_eq!(
            app.get("/health").await.status,
            StatusCode::TOO_MANY_REQUESTS
        );

        let other = app.send(from("/health", "203.0.113.9:5000")).await;
        assert_eq!(other.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_window_is_not_extended() {
        let app = limited_app(2);

        app.get("/health").await;
        app.clock.advance(Duration::from_secs(200));
        app.get("/health").await;

        let resp = app.get("/health").await;
        assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.header("retry-after"), Some("100"));

        app.clock.advance(Duration::from_secs(100));
        assert_eq!(app.get("/health").await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_throttled_before_body_is_read() {
        let app = limited_app(1);
        app.get("/health").await;

        let resp = app.post("/block", "not json at all").await;
        assert_eq!(resp.status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_forwarded_client_behind_local_proxy() {
        let app = limited_app(1);

        let mut req = from("/health", "127.0.0.1:51000");
        req.headers_mut()
            .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
        assert_eq!(app.send(req).await.status, StatusCode::OK);

        let entry = app.counters.get("203.0.113.7_20240517").await.unwrap();
        assert_eq!(entry.count, Some(1));
    }

    #[tokio::test]
    async fn test_forwarded_header_from_untrusted_peer_is_ignored() {
        let app = limited_app(1);

        let mut req = get("/health");
        req.headers_mut()
            .insert("x-forwarded-for", "203.0.113.7".parse().unwrap());
        app.send(req).await;

        assert_eq!(
            app.counters.get("203.0.113.7_20240517").await.unwrap().count,
            None
        );
        assert_eq!(
            app.counters
                .get("198.51.100.10_20240517")
                .await
                .unwrap()
                .count,
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_exempt_client_is_never_throttled() {
        let app = TestApp::with_config(ApiConfig {
            rate_limit: RateLimitConfig {
                limit: 1,
                exempt: vec!["198.51.100.10".parse().unwrap()],
                ..Default::default()
            },
            ..Default::default()
        });

        for _ in 0..10 {
            assert_eq!(app.get("/health").await.status, StatusCode::OK);
        }
        assert!(app.counters.is_empty());
    }
}
