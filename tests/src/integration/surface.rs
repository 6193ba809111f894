//! # HTTP Surface Scenarios
//!
//! Gas-price aggregates, health, body handling, CORS and store failures.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use blocks_api::adapters::MemoryLedgerStore;
    use blocks_api::domain::config::{HttpConfig, RateLimitConfig};
    use blocks_api::ApiConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_gas_price_defaults_to_average() {
        let app = TestApp::new();
        let resp = app.get("/gas-price").await;

        assert_eq!(resp.status, StatusCode::OK);
        let results = &resp.body["results"];
        assert_eq!(results["kind"], "average");
        assert_eq!(results["blocks"], 100);
        assert_eq!(results["gas_price"].to_string(), "10000000150");
    }

    #[tokio::test]
    async fn test_gas_price_kinds() {
        let app = TestApp::new();
        let cases = [
            ("median", "10000000150"),
            ("min", "10000000100"),
            ("max", "10000000199"),
        ];
        for (kind, expected) in cases {
            let resp = app.get(&format!("/gas-price?kind={}", kind)).await;
            assert_eq!(resp.status, StatusCode::OK, "kind={}", kind);
            assert_eq!(resp.body["results"]["gas_price"].to_string(), expected, "kind={}", kind);
        }
    }

    #[tokio::test]
    async fn test_gas_price_window() {
        let app = TestApp::new();
        let resp = app.post("/gas-price", r#"{"kind": "min", "blocks": 10}"#).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["results"]["blocks"], 10);
        assert_eq!(resp.body["results"]["gas_price"].to_string(), "10000000190");
    }

    #[tokio::test]
    async fn test_gas_price_rejects_bad_input() {
        let app = TestApp::new();
        for uri in ["/gas-price?kind=mode", "/gas-price?blocks=0", "/gas-price?blocks=10001"] {
            let resp = app.get(uri).await;
            assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_gas_price_without_data() {
        let app = TestApp::with_ledger(ApiConfig::default(), Arc::new(MemoryLedgerStore::new()));
        let resp = app.get("/gas-price").await;

        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert!(resp.body["results"].is_null());
    }

    #[tokio::test]
    async fn test_health_reports_latest_block() {
        let app = TestApp::new();
        let resp = app.get("/health").await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["results"]["message"], "ok");
        assert_eq!(resp.body["results"]["block_number"], 199);
    }

    #[tokio::test]
    async fn test_health_on_empty_ledger() {
        let app = TestApp::with_ledger(ApiConfig::default(), Arc::new(MemoryLedgerStore::new()));
        let resp = app.get("/health").await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["results"]["block_number"], 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_service_unavailable() {
        let app = TestApp::new();
        app.ledger.set_offline(true);

        for uri in ["/block?block_number=123", "/transaction?block_number=150", "/health"] {
            let resp = app.get(uri).await;
            assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
            assert!(!resp.message().is_empty());
            assert!(!resp.message().contains("offline"), "{}", uri);
        }

        app.ledger.set_offline(false);
        assert_eq!(app.get("/health").await.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_object_body_is_a_parse_error() {
        let app = TestApp::new();
        for body in ["[1, 2]", "42", "\"block_number\"", "{\"block_number\": "] {
            let resp = app.post("/block", body).await;
            assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(resp.message(), "Unable to parse JSON.", "{}", body);
        }
    }

    #[tokio::test]
    async fn test_empty_body_uses_query_string() {
        let app = TestApp::new();
        let resp = app.post("/block?block_number=123", "").await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results()[0]["block_number"], 123);
    }

    #[tokio::test]
    async fn test_oversized_body() {
        let app = TestApp::with_config(ApiConfig {
            http: HttpConfig {
                max_body_size: 64,
                ..Default::default()
            },
            ..Default::default()
        });
        let body = format!(r#"{{"block_number": 123, "padding": "{}"}}"#, "x".repeat(100));
        let resp = app.post("/block", &body).await;

        assert_eq!(resp.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_oversized_get_body_without_content_length() {
        let app = TestApp::with_config(ApiConfig {
            http: HttpConfig {
                max_body_size: 64,
                ..Default::default()
            },
            ..Default::default()
        });
        let body = format!(r#"{{"block_number": 123, "padding": "{}"}}"#, "x".repeat(5000));
        let mut req = request(Method::GET, "/block", Body::from(body));
        req.headers_mut().remove("content-length");

        let resp = app.send(req).await;
        assert_eq!(resp.status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_get_with_json_body() {
        let app = TestApp::new();
        let req = request(Method::GET, "/block", Body::from(r#"{"block_number": 123}"#));
        let resp = app.send(req).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results()[0]["block_number"], 123);
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let app = TestApp::new();
        let resp = app
            .send(request(Method::DELETE, "/block?block_number=123", Body::empty()))
            .await;
        assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.message(), "Invalid HTTP method.");
        assert_eq!(resp.header("content-type"), Some("application/json"));

        let resp = app.post("/health", "{}").await;
        assert_eq!(resp.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.message(), "Invalid HTTP method.");
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let app = TestApp::new();
        let resp = app.get("/blocks").await;

        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.message(), "Not found");
    }

    #[tokio::test]
    async fn test_cors_preflight_is_not_counted() {
        let app = TestApp::with_config(ApiConfig {
            rate_limit: RateLimitConfig {
                limit: 1,
                ..Default::default()
            },
            ..Default::default()
        });

        for _ in 0..3 {
            let mut req = request(Method::OPTIONS, "/block", Body::empty());
            let headers = req.headers_mut();
            headers.insert("origin", "https://explorer.example".parse().unwrap());
            headers.insert("access-control-request-method", "POST".parse().unwrap());

            let resp = app.send(req).await;
            assert_eq!(resp.status, StatusCode::OK);
            assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
        }

        assert!(app.counters.is_empty());
        assert_eq!(app.get("/health").await.status, StatusCode::OK);
    }
}
