//! Last traded price requests against a mock quote API

use auth::TokenStore;
use market_connector::quotes::{QuoteService, UNKNOWN_API_ERROR};
use market_connector::{Instrument, MarketConnectorConfig, QuoteError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LTP_PATH: &str = "/v3/market-quote/ltp";

struct Harness {
    server: MockServer,
    service: QuoteService,
    _dir: TempDir,
}

async fn harness(token: Option<&str>) -> Harness {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("temp dir");
    let tokens = TokenStore::new(dir.path().join(".env"));
    if let Some(token) = token {
        tokens.save(token).await.expect("save token");
    }

    let config = MarketConnectorConfig {
        api_base_url: server.uri(),
        ..MarketConnectorConfig::default()
    };
    let service = QuoteService::new(&config, tokens).expect("quote service");

    Harness {
        server,
        service,
        _dir: dir,
    }
}

fn hdfc() -> Instrument {
    Instrument::new("NSE_EQ|HDFCBANK", "NSE_EQ|INE040A01034")
}

fn ltp_body(key: &str, price: f64) -> serde_json::Value {
    json!({
        "status": "success",
        "data": {
            "NSE_EQ:X": {
                "last_price": price,
                "instrument_token": key,
                "ltq": 5,
                "volume": 1000,
                "cp": price - 10.0
            }
        }
    })
}

#[tokio::test]
async fn test_quote_success_sends_bearer_token() {
    let h = harness(Some("token-123")).await;
    Mock::given(method("GET"))
        .and(path(LTP_PATH))
        .and(query_param("instrument_key", "NSE_EQ|INE040A01034"))
        .and(header("authorization", "Bearer token-123"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ltp_body("NSE_EQ|INE040A01034", 1650.5)))
        .expect(1)
        .mount(&h.server)
        .await;

    let quote = h.service.fetch_last_traded_price(&hdfc()).await.expect("quote");

    assert_eq!(quote.instrument_token, "NSE_EQ|INE040A01034");
    assert_eq!(quote.last_price, 1650.5);
    assert_eq!(quote.previous_day_closing_price, 1640.5);
    assert_eq!(quote.ltq, 5);
}

#[tokio::test]
async fn test_api_error_uses_body_message() {
    let h = harness(Some("expired")).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "status": "error",
            "errors": [{"errorCode": "UDAPI100050", "message": "Invalid token used to access API"}]
        })))
        .mount(&h.server)
        .await;

    let err = h.service.fetch_last_traded_price(&hdfc()).await.expect_err("401");

    assert_eq!(
        err.to_string(),
        "API Error (401): Invalid token used to access API for NSE_EQ|HDFCBANK"
    );
}

#[tokio::test]
async fn test_api_error_without_json_body() {
    let h = harness(Some("token")).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&h.server)
        .await;

    let err = h.service.fetch_last_traded_price(&hdfc()).await.expect_err("502");

    assert_eq!(
        err,
        QuoteError::Api {
            status: 502,
            message: UNKNOWN_API_ERROR.to_string(),
            symbol: "NSE_EQ|HDFCBANK".to_string(),
        }
    );
}

#[tokio::test]
async fn test_empty_data_is_no_data() {
    let h = harness(Some("token")).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": {}})))
        .mount(&h.server)
        .await;

    let err = h.service.fetch_last_traded_price(&hdfc()).await.expect_err("no data");

    assert_eq!(err.to_string(), "No data found for NSE_EQ|HDFCBANK");
}

#[tokio::test]
async fn test_missing_token_skips_request() {
    let h = harness(None).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.service.fetch_last_traded_price(&hdfc()).await.expect_err("no token");

    assert!(matches!(err, QuoteError::MissingToken { .. }));
}

#[tokio::test]
async fn test_batch_captures_errors_per_symbol() {
    let h = harness(Some("token")).await;
    for (key, price) in [("NSE_EQ|INE040A01034", 1650.5), ("NSE_EQ|INE090A01021", 1010.0)] {
        Mock::given(method("GET"))
            .and(query_param("instrument_key", key))
            .respond_with(ResponseTemplate::new(200).set_body_json(ltp_body(key, price)))
            .mount(&h.server)
            .await;
    }
    Mock::given(method("GET"))
        .and(query_param("instrument_key", "NSE_EQ|NOTIED"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid Instrument key"})))
        .mount(&h.server)
        .await;

    let results = h
        .service
        .fetch_last_traded_prices(&[
            hdfc(),
            Instrument::new("NSE_EQ|ICICIBANK", "NSE_EQ|INE090A01021"),
            Instrument::new("NSE_EQ|NOT", "NSE_EQ|NOTIED"),
        ])
        .await;

    assert_eq!(results.len(), 3);
    assert_eq!(
        results["NSE_EQ|HDFCBANK"].as_ref().expect("hdfc").last_price,
        1650.5
    );
    assert_eq!(
        results["NSE_EQ|ICICIBANK"].as_ref().expect("icici").last_price,
        1010.0
    );
    assert_eq!(
        results["NSE_EQ|NOT"].as_ref().expect_err("invalid").to_string(),
        "API Error (400): Invalid Instrument key for NSE_EQ|NOT"
    );
}
