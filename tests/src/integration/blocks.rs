//! # Block Resource Scenarios
//!
//! `/block` by number, by number range and by timestamp range, including
//! paging and the 400/404 paths.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use axum::http::StatusCode;
    use blocks_api::domain::config::PaginationConfig;
    use blocks_api::ApiConfig;

    fn paged_app(page_size: u64) -> TestApp {
        TestApp::with_config(ApiConfig {
            pagination: PaginationConfig { page_size },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_block_by_number() {
        let app = TestApp::new();
        let resp = app.get("/block?block_number=123").await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["page"], 1);
        assert_eq!(resp.body["pages"], 1);

        let results = resp.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["block_number"], 123);
        assert_eq!(
            results[0]["hash"].as_str().unwrap(),
            block_hash(123).to_lowercase()
        );
        assert_eq!(results[0]["miner"].as_str().unwrap(), CAROL);
        assert_eq!(results[0]["block_timestamp"], "2024-05-17T00:04:36");
    }

    #[tokio::test]
    async fn test_block_by_number_in_json_body() {
        let app = TestApp::new();
        let resp = app.post("/block", r#"{"block_number": 123}"#).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results()[0]["block_number"], 123);
    }

    #[tokio::test]
    async fn test_body_wins_over_query_string() {
        let app = TestApp::new();
        let resp = app
            .post("/block?block_number=150", r#"{"block_number": "151"}"#)
            .await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results()[0]["block_number"], 151);
    }

    #[tokio::test]
    async fn test_unknown_block_is_not_found() {
        let app = TestApp::new();
        let resp = app.get("/block?block_number=999999999").await;

        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert!(resp.results().is_empty());
    }

    #[tokio::test]
    async fn test_block_number_range() {
        let app = TestApp::new();
        let resp = app.get("/block?start=123&end=132").await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["page"], 1);
        assert_eq!(resp.body["pages"], 1);

        let numbers: Vec<i64> = resp
            .results()
            .iter()
            .map(|row| row["block_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, (123..=132).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_single_block_range() {
        let app = TestApp::new();
        let resp = app.get("/block?start=150&end=150").await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results().len(), 1);
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let app = TestApp::new();
        let resp = app.get("/block?start=132&end=123").await;

        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.message().contains("start"));
    }

    #[tokio::test]
    async fn test_empty_range_is_not_found() {
        let app = TestApp::new();
        let resp = app.get("/block?start=5000&end=6000").await;

        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.body["pages"], 0);
        assert!(resp.results().is_empty());
    }

    #[tokio::test]
    async fn test_range_paging() {
        let app = paged_app(25);

        let first = app.get("/block?start=100&end=199").await;
        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.body["pages"], 4);
        assert_eq!(first.results().len(), 25);
        assert_eq!(first.results()[0]["block_number"], 100);

        let last = app.get("/block?start=100&end=199&page=4").await;
        assert_eq!(last.status, StatusCode::OK);
        assert_eq!(last.body["page"], 4);
        assert_eq!(last.results()[0]["block_number"], 175);
        assert_eq!(last.results()[24]["block_number"], 199);

        let beyond = app.get("/block?start=100&end=199&page=5").await;
        assert_eq!(beyond.status, StatusCode::NOT_FOUND);
        assert_eq!(beyond.body["page"], 5);
        assert_eq!(beyond.body["pages"], 4);
    }

    #[tokio::test]
    async fn test_page_must_be_positive() {
        let app = TestApp::new();
        for page in ["0", "-1", "two"] {
            let resp = app
                .get(&format!("/block?start=100&end=110&page={}", page))
                .await;
            assert_eq!(resp.status, StatusCode::BAD_REQUEST, "page={}", page);
            assert!(resp.message().contains("page"), "page={}", page);
        }
    }

    #[tokio::test]
    async fn test_timestamp_range() {
        let app = TestApp::new();
        let resp = app
            .get("/block?start_time=2024-05-17T00:00:00Z&end_time=2024-05-17T00:01:00Z")
            .await;

        assert_eq!(resp.status, StatusCode::OK);
        let numbers: Vec<i64> = resp
            .results()
            .iter()
            .map(|row| row["block_number"].as_i64().unwrap())
            .collect();
        assert_eq!(numbers, (100..=105).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_timestamp_range_as_unix_seconds() {
        let app = TestApp::new();
        let start = block_time(110).timestamp();
        let end = block_time(119).timestamp();
        let resp = app
            .post(
                "/block",
                &format!(r#"{{"start_time": {}, "end_time": {}}}"#, start, end),
            )
            .await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results().len(), 10);
    }

    #[tokio::test]
    async fn test_bad_timestamp_names_field() {
        let app = TestApp::new();
        let resp = app
            .get("/block?start_time=yesterday&end_time=2024-05-17T00:01:00Z")
            .await;

        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.message().contains("start_time"));
    }

    #[tokio::test]
    async fn test_number_wins_over_range() {
        let app = TestApp::new();
        let resp = app.get("/block?block_number=150&start=100&end=199").await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results().len(), 1);
        assert_eq!(resp.results()[0]["block_number"], 150);
    }

    #[tokio::test]
    async fn test_non_integer_block_number() {
        let app = TestApp::new();
        let resp = app.get("/block?block_number=abc").await;

        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.message().contains("block_number"));
    }

    #[tokio::test]
    async fn test_integral_float_block_number() {
        let app = TestApp::new();
        let resp = app.post("/block", r#"{"block_number": 123.0}"#).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results()[0]["block_number"], 123);
    }

    #[tokio::test]
    async fn test_no_selecting_fields() {
        let app = TestApp::new();
        for uri in ["/block", "/block?start=100", "/block?page=2", "/block?block_number="] {
            let resp = app.get(uri).await;
            assert_eq!(resp.status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(resp.message(), "Invalid request", "{}", uri);
        }
    }
}
