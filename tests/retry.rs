mod common;

use common::{MockTransport, Reply};
use mpesa_sdk::services::http_client::{execute_with_retry, HttpRequest, RetryPolicy};
use mpesa_sdk::MpesaError;
use serde_json::json;

const URL: &str = "https://apisandbox.safaricom.et/mpesa/stkpush/v3/processrequest";

fn policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        retry_delay_ms: 1000,
    }
}

fn request() -> HttpRequest {
    HttpRequest::post(URL, json!({"Amount": 10}))
}

#[tokio::test(start_paused = true)]
async fn persistent_server_errors_use_every_attempt() {
    let transport = MockTransport::new();
    transport.always_api(Reply::status(500, r#"{"errorMessage":"Internal error"}"#));

    let err = execute_with_retry(transport.as_ref(), &request(), policy(3))
        .await
        .unwrap_err();

    assert_eq!(transport.api_requests().len(), 4);
    match err {
        MpesaError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 4);
            assert_eq!(last.status(), Some(500));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn zero_retries_means_single_attempt() {
    let transport = MockTransport::new();
    transport.always_api(Reply::status(503, ""));

    let err = execute_with_retry(transport.as_ref(), &request(), policy(0))
        .await
        .unwrap_err();

    assert_eq!(transport.api_requests().len(), 1);
    assert!(matches!(err, MpesaError::RetriesExhausted { attempts: 1, .. }));
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_not_retried() {
    for status in [400u16, 401, 404] {
        let transport = MockTransport::new();
        transport.always_api(Reply::status(
            status,
            r#"{"errorCode":"400.002.02","errorMessage":"Bad Request"}"#,
        ));

        let err = execute_with_retry(transport.as_ref(), &request(), policy(3))
            .await
            .unwrap_err();

        assert_eq!(transport.api_requests().len(), 1, "status {status}");
        assert_eq!(err.status(), Some(status));
        assert_eq!(err.response_code(), Some("400.002.02"));
        assert!(err.response().is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn throttling_is_retried_until_success() {
    let transport = MockTransport::new();
    transport.push_api(Reply::status(429, r#"{"errorMessage":"Too many requests"}"#));
    transport.push_api(Reply::NetworkDown);
    transport.push_api(Reply::ok(r#"{"ResponseCode":"0"}"#));

    let body = execute_with_retry(transport.as_ref(), &request(), policy(3))
        .await
        .unwrap();

    assert_eq!(body, json!({"ResponseCode": "0"}));
    assert_eq!(transport.api_requests().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn backoff_waits_between_attempts() {
    let transport = MockTransport::new();
    transport.always_api(Reply::status(502, "bad gateway"));

    let started = tokio::time::Instant::now();
    let _ = execute_with_retry(transport.as_ref(), &request(), policy(2)).await;
    let waited = started.elapsed();

    // 1000ms + 2000ms of backoff, plus up to one second of jitter per retry.
    assert!(waited >= std::time::Duration::from_millis(3000));
    assert!(waited <= std::time::Duration::from_millis(5000));
}

#[tokio::test]
async fn invalid_json_is_a_decode_error() {
    let transport = MockTransport::new();
    transport.always_api(Reply::ok("<html>not json</html>"));

    let err = execute_with_retry(transport.as_ref(), &request(), policy(3))
        .await
        .unwrap_err();

    assert_eq!(transport.api_requests().len(), 1);
    match err {
        MpesaError::Decode { body, .. } => assert_eq!(body, "<html>not json</html>"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_success_body_is_an_empty_object() {
    let transport = MockTransport::new();
    transport.always_api(Reply::ok(""));

    let body = execute_with_retry(transport.as_ref(), &request(), policy(3))
        .await
        .unwrap();

    assert_eq!(body, json!({}));
}
