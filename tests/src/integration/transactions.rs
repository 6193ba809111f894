//! # Transaction Resource Scenarios
//!
//! `/transaction` by hash, by block and by address, newest block first.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use axum::http::StatusCode;
    use serde_json::Value;

    fn block_numbers(rows: &[Value]) -> Vec<i64> {
        rows.iter()
            .map(|row| row["block_number"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_transaction_by_hash_any_case() {
        let app = TestApp::new();
        let hash = tx_hash(150, 0);

        for query in [hash.clone(), hash.to_lowercase(), hash[2..].to_string()] {
            let resp = app.get(&format!("/transaction?hash={}", query)).await;
            assert_eq!(resp.status, StatusCode::OK, "hash={}", query);

            let row = &resp.results()[0];
            assert_eq!(row["hash"].as_str().unwrap(), hash.to_lowercase());
            assert_eq!(row["from_address"].as_str().unwrap(), ALICE);
            assert_eq!(row["to_address"].as_str().unwrap(), BOB);
            assert_eq!(row["input"], "0x");
            assert_eq!(row["block_number"], 150);
        }
    }

    #[tokio::test]
    async fn test_short_hash_is_rejected() {
        let app = TestApp::new();
        let resp = app.get("/transaction?hash=0xDeadBEEF").await;

        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.message().contains("hash"));
    }

    #[tokio::test]
    async fn test_unknown_hash_is_not_found() {
        let app = TestApp::new();
        let resp = app
            .get(&format!("/transaction?hash=0x{}", "f".repeat(64)))
            .await;

        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert!(resp.results().is_empty());
    }

    #[tokio::test]
    async fn test_transactions_in_block() {
        let app = TestApp::new();
        let resp = app.get("/transaction?block_number=150").await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["pages"], 1);
        assert_eq!(block_numbers(resp.results()), vec![150, 150]);
    }

    #[tokio::test]
    async fn test_from_address_newest_first() {
        let app = TestApp::new();
        let resp = app.get(&format!("/transaction?from_address={}", ALICE)).await;

        assert_eq!(resp.status, StatusCode::OK);
        let numbers = block_numbers(resp.results());
        assert_eq!(numbers.len(), 100);
        assert_eq!(numbers[0], 199);
        assert_eq!(numbers[99], 100);
        assert!(resp
            .results()
            .iter()
            .all(|row| row["from_address"].as_str() == Some(ALICE)));
    }

    #[tokio::test]
    async fn test_address_match_ignores_case() {
        let app = TestApp::new();
        let shouted = format!("0x{}", ALICE[2..].to_uppercase());
        let resp = app.get(&format!("/transaction?to_address={}", shouted)).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results().len(), 100);
        assert!(resp
            .results()
            .iter()
            .all(|row| row["from_address"].as_str() == Some(CAROL)));
    }

    #[tokio::test]
    async fn test_either_address() {
        let app = TestApp::new();
        let resp = app.post("/transaction", &format!(r#"{{"address": "{}"}}"#, ALICE)).await;

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results().len(), 200);
    }

    #[tokio::test]
    async fn test_from_wins_over_to() {
        let app = TestApp::new();
        let resp = app
            .get(&format!(
                "/transaction?from_address={}&to_address={}",
                CAROL, BOB
            ))
            .await;

        // Carol never pays Bob; the to_address filter is not applied
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.results().len(), 100);
    }

    #[tokio::test]
    async fn test_address_without_transactions() {
        let app = TestApp::new();
        let resp = app
            .get(&format!("/transaction?from_address=0x{}", "1".repeat(40)))
            .await;

        assert_eq!(resp.status, StatusCode::NOT_FOUND);
        assert_eq!(resp.body["pages"], 0);
    }

    #[tokio::test]
    async fn test_malformed_address() {
        let app = TestApp::new();
        let resp = app.get("/transaction?to_address=0x1234").await;

        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert!(resp.message().contains("to_address"));
    }

    #[tokio::test]
    async fn test_no_selecting_fields() {
        let app = TestApp::new();
        let resp = app.post("/transaction", r#"{"page": 1}"#).await;

        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.message(), "Invalid request");
    }
}
