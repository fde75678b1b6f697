mod common;

use common::{test_config, MockTransport, Reply};
use mpesa_sdk::services::{
    generate_password, AccountBalanceRequest, B2cRequest, C2bSimulationRequest,
    RegisterUrlRequest, StkPushRequest, TransactionStatusRequest, TransactionStatusService,
};
use mpesa_sdk::{Config, Mpesa, MpesaError};
use serde_json::json;

const SANDBOX: &str = "https://apisandbox.safaricom.et";

fn client(transport: &std::sync::Arc<MockTransport>) -> Mpesa {
    Mpesa::with_transport(test_config(), transport.clone()).unwrap()
}

fn b2c_request() -> B2cRequest {
    B2cRequest::new()
        .initiator_name("testapi")
        .security_credential("encrypted-credential")
        .amount(150.0)
        .unwrap()
        .party_a("600000")
        .party_b("251712345678")
        .unwrap()
        .remarks("Refund")
        .occasion("Order 42")
        .result_url("https://example.com/b2c/result")
        .unwrap()
        .queue_timeout_url("https://example.com/b2c/timeout")
        .unwrap()
}

fn stk_request() -> StkPushRequest {
    StkPushRequest::new()
        .phone_number("251712345678")
        .unwrap()
        .amount(10.0)
        .unwrap()
        .callback_url("https://example.com/callback")
        .unwrap()
}

fn c2b_simulation() -> C2bSimulationRequest {
    C2bSimulationRequest::new()
        .amount(25.0)
        .unwrap()
        .msisdn("251712345678")
        .unwrap()
        .bill_ref_number("INV-7")
}

#[tokio::test]
async fn invalid_phone_number_never_reaches_the_network() {
    for phone in ["0712345678", "254712345678", "25171234567", "2517123456789"] {
        let transport = MockTransport::new();
        let mpesa = client(&transport);

        let stk = StkPushRequest {
            phone_number: phone.to_string(),
            ..stk_request()
        };
        let b2c = B2cRequest {
            party_b: phone.to_string(),
            ..b2c_request()
        };
        let c2b = C2bSimulationRequest {
            msisdn: phone.to_string(),
            ..c2b_simulation()
        };

        let results = [
            ("stk push", mpesa.stk_push().push(stk).await.map(|_| ())),
            ("b2c", mpesa.b2c().send(b2c).await.map(|_| ())),
            ("c2b simulate", mpesa.c2b().simulate(c2b).await.map(|_| ())),
        ];
        for (operation, result) in results {
            assert!(
                matches!(result, Err(MpesaError::Validation(_))),
                "{operation} accepted {phone}"
            );
        }
        assert!(transport.requests().is_empty(), "{phone} reached the transport");
    }

    let transport = MockTransport::new();
    let err = client(&transport)
        .stk_push()
        .push_with("0712345678", 10.0, "https://example.com/callback")
        .await
        .unwrap_err();
    assert!(matches!(err, MpesaError::Validation(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn stk_push_sends_the_gateway_payload() {
    let transport = MockTransport::new();
    transport.push_api(Reply::ok(
        r#"{"MerchantRequestID":"m-1","CheckoutRequestID":"ws_CO_1","ResponseCode":"0","ResponseDescription":"Success. Request accepted for processing","CustomerMessage":"Success"}"#,
    ));
    let mpesa = client(&transport);

    let request = StkPushRequest::new()
        .phone_number("251712345678")
        .unwrap()
        .amount(10.0)
        .unwrap()
        .callback_url("https://example.com/callback")
        .unwrap()
        .timestamp("20240101000000");
    let response = mpesa.stk_push().push(request).await.unwrap();

    assert_eq!(response.checkout_request_id().as_deref(), Some("ws_CO_1"));
    assert!(response.is_successful());

    let sent = transport.api_requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, format!("{SANDBOX}/mpesa/stkpush/v3/processrequest"));
    assert_eq!(sent[0].method.as_str(), "POST");
    assert_eq!(sent[0].header_value("Content-Type"), Some("application/json"));

    let body = transport.last_api_body();
    assert_eq!(body["BusinessShortCode"], json!("174379"));
    assert_eq!(body["PartyB"], json!("174379"));
    assert_eq!(body["PartyA"], json!("251712345678"));
    assert_eq!(body["PhoneNumber"], json!("251712345678"));
    assert_eq!(body["TransactionType"], json!("CustomerPayBillOnline"));
    assert_eq!(body["Timestamp"], json!("20240101000000"));
    assert_eq!(body["Password"], json!("MTc0Mzc5cGFzczIwMjQwMTAxMDAwMDAw"));
    assert_eq!(body["AccountReference"], json!("123456"));
    assert_eq!(body["TransactionDesc"], json!("Payment"));
    assert_eq!(body["CallBackURL"], json!("https://example.com/callback"));
    assert_eq!(body["ReferenceData"][0]["Key"], json!("ThirdPartyReference"));
    assert!(body["MerchantRequestID"].as_str().unwrap().starts_with("Partner name-"));
}

#[tokio::test]
async fn stk_query_reports_payment_state() {
    let transport = MockTransport::new();
    transport.push_api(Reply::ok(
        r#"{"ResponseCode":"0","ResultCode":"1032","ResultDesc":"Request cancelled by user"}"#,
    ));
    let mpesa = client(&transport);

    let response = mpesa
        .stk_push()
        .query("ws_CO_1", Some("20240101000000"))
        .await
        .unwrap();

    assert_eq!(response.result_code().as_deref(), Some("1032"));
    assert!(!response.is_paid());
    let body = transport.last_api_body();
    assert_eq!(body["CheckoutRequestID"], json!("ws_CO_1"));
    assert_eq!(
        body["Password"],
        json!(generate_password("174379", "pass", "20240101000000"))
    );
    assert!(transport.api_requests()[0]
        .url
        .ends_with("/mpesa/stkpushquery/v1/query"));
}

#[tokio::test]
async fn non_zero_response_code_is_an_api_error() {
    let transport = MockTransport::new();
    transport.push_api(Reply::ok(
        r#"{"ResponseCode":"1","ResponseDescription":"The balance is insufficient"}"#,
    ));
    let mpesa = client(&transport);

    let err = mpesa
        .stk_push()
        .push_with("251712345678", 10.0, "https://example.com/callback")
        .await
        .unwrap_err();

    assert!(err.is_insufficient_funds());
    assert_eq!(
        err.to_string(),
        "The balance is insufficient (Response Code 1: Insufficient Funds)"
    );
    assert_eq!(err.response().unwrap()["ResponseCode"], json!("1"));
}

#[tokio::test]
async fn test_password_is_refused_in_production() {
    let transport = MockTransport::new();
    let mut config = test_config();
    config.set_environment("production").unwrap();
    let mpesa = Mpesa::with_transport(config, transport.clone()).unwrap();

    let request = StkPushRequest::new()
        .phone_number("251712345678")
        .unwrap()
        .amount(10.0)
        .unwrap()
        .callback_url("https://example.com/callback")
        .unwrap()
        .test_password("sandbox-only");
    let err = mpesa.stk_push().push(request).await.unwrap_err();

    assert!(matches!(err, MpesaError::Validation(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_password_is_used_verbatim_in_sandbox() {
    let transport = MockTransport::new();
    let mpesa = client(&transport);

    let request = StkPushRequest::new()
        .phone_number("251712345678")
        .unwrap()
        .amount(10.0)
        .unwrap()
        .callback_url("https://example.com/callback")
        .unwrap()
        .test_password("sandbox-only");
    mpesa.stk_push().push(request).await.unwrap();

    assert_eq!(transport.last_api_body()["Password"], json!("sandbox-only"));
}

#[tokio::test]
async fn production_environment_targets_production_host() {
    let transport = MockTransport::new();
    let mut config = test_config();
    config.set_environment("PRODUCTION").unwrap();
    let mpesa = Mpesa::with_transport(config, transport.clone()).unwrap();

    mpesa.authenticate().await.unwrap();
    mpesa.b2c().send(b2c_request()).await.unwrap();

    let requests = transport.requests();
    assert!(requests
        .iter()
        .all(|r| r.url.starts_with("https://apis.safaricom.et/")));
}

#[tokio::test]
async fn incomplete_config_is_rejected_at_construction() {
    let transport = MockTransport::new();
    let config = Config::new("", "secret", "pass", "174379");

    let err = Mpesa::with_transport(config, transport.clone()).err().unwrap();
    assert!(matches!(err, MpesaError::Validation(_)));
}

#[tokio::test]
async fn b2c_sends_the_payment_request() {
    let transport = MockTransport::new();
    transport.push_api(Reply::ok(
        r#"{"ConversationID":"AG_1","OriginatorConversationID":"o-1","ResponseCode":"0","ResponseDescription":"Accept the service request successfully."}"#,
    ));
    let mpesa = client(&transport);

    let response = mpesa.b2c().send(b2c_request()).await.unwrap();
    assert_eq!(response.conversation_id().as_deref(), Some("AG_1"));

    assert!(transport.api_requests()[0]
        .url
        .ends_with("/mpesa/b2c/v2/paymentrequest"));
    let body = transport.last_api_body();
    assert_eq!(body["InitiatorName"], json!("testapi"));
    assert_eq!(body["SecurityCredential"], json!("encrypted-credential"));
    assert_eq!(body["CommandID"], json!("BusinessPayment"));
    assert_eq!(body["Amount"], json!(150.0));
    assert_eq!(body["PartyA"], json!("600000"));
    assert_eq!(body["PartyB"], json!("251712345678"));
    assert_eq!(body["Occassion"], json!("Order 42"));
    assert!(body["OriginatorConversationID"]
        .as_str()
        .unwrap()
        .starts_with("MPESA-B2C-"));
}

#[tokio::test]
async fn b2c_rejects_incomplete_requests() {
    let transport = MockTransport::new();
    let mpesa = client(&transport);

    let mut request = b2c_request();
    request.remarks.clear();
    let err = mpesa.b2c().send(request).await.unwrap_err();

    assert!(err.to_string().contains("Remarks"));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn register_url_carries_api_key_and_bearer() {
    let transport = MockTransport::new();
    let mpesa = client(&transport);

    let request = RegisterUrlRequest::new(
        "600000",
        "Completed",
        "https://example.com/c2b/confirmation",
        "https://example.com/c2b/validation",
    );
    mpesa.c2b().register_url(request).await.unwrap();

    let sent = &transport.api_requests()[0];
    assert_eq!(
        sent.url,
        format!("{SANDBOX}/v1/c2b-register-url/register?apikey=consumer-key")
    );
    assert_eq!(sent.header_value("Authorization"), Some("Bearer test-token"));

    let body = transport.last_api_body();
    assert_eq!(body["ShortCode"], json!("600000"));
    assert_eq!(body["ResponseType"], json!("Completed"));
    assert_eq!(body["CommandID"], json!("RegisterURL"));
    assert!(body.get("api_key").is_none());
}

#[tokio::test]
async fn c2b_simulation_defaults_to_configured_shortcode() {
    let transport = MockTransport::new();
    let mpesa = client(&transport);

    mpesa
        .c2b()
        .simulate_with(25.0, "251712345678", "INV-7")
        .await
        .unwrap();

    let body = transport.last_api_body();
    assert_eq!(body["ShortCode"], json!("174379"));
    assert_eq!(body["CommandID"], json!("CustomerPayBillOnline"));
    assert_eq!(body["Amount"], json!("25"));
    assert_eq!(body["Msisdn"], json!("251712345678"));
    assert_eq!(body["BillRefNumber"], json!("INV-7"));
}

#[tokio::test]
async fn transaction_status_query_and_result() {
    let transport = MockTransport::new();
    let mpesa = client(&transport);

    let request = TransactionStatusRequest::new("apiop", "cred")
        .transaction_id("RBK1234567")
        .result_url("https://example.com/status/result")
        .unwrap()
        .queue_timeout_url("https://example.com/status/timeout")
        .unwrap();
    let response = mpesa.transaction_status().query(request).await.unwrap();
    assert_eq!(response.response_code().as_deref(), Some("0"));

    let body = transport.last_api_body();
    assert_eq!(body["CommandID"], json!("TransactionStatusQuery"));
    assert_eq!(body["TransactionID"], json!("RBK1234567"));
    assert_eq!(body["PartyA"], json!("174379"));
    assert_eq!(body["IdentifierType"], json!("4"));
    assert_eq!(body["Remarks"], json!("Transaction Status Query"));

    let result = TransactionStatusService::parse_callback(json!({
        "Result": {
            "ResultType": 0,
            "ResultCode": 0,
            "ResultDesc": "The service request is processed successfully.",
            "ResultParameters": {
                "ResultParameter": [
                    {"Key": "ReceiptNo", "Value": "RBK1234567"},
                    {"Key": "Amount", "Value": 100},
                    {"Key": "TransactionStatus", "Value": "Completed"}
                ]
            }
        }
    }))
    .unwrap();
    assert!(result.is_completed());
    assert_eq!(result.amount(), Some(100.0));
    assert_eq!(result.receipt_number().as_deref(), Some("RBK1234567"));

    assert!(TransactionStatusService::parse_callback(json!({"foo": 1})).is_err());
}

#[tokio::test]
async fn transaction_status_needs_an_identifier() {
    let transport = MockTransport::new();
    let mpesa = client(&transport);

    let request = TransactionStatusRequest::new("apiop", "cred")
        .result_url("https://example.com/status/result")
        .unwrap()
        .queue_timeout_url("https://example.com/status/timeout")
        .unwrap();
    let err = mpesa.transaction_status().query(request).await.unwrap_err();

    assert!(matches!(err, MpesaError::Validation(_)));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn account_balance_query_and_result() {
    let transport = MockTransport::new();
    let mpesa = client(&transport);

    let request = AccountBalanceRequest::new("apiop", "600000", "cred")
        .result_url("https://example.com/balance/result")
        .unwrap()
        .queue_timeout_url("https://example.com/balance/timeout")
        .unwrap();
    mpesa.account_balance().query(request).await.unwrap();

    assert!(transport.api_requests()[0]
        .url
        .ends_with("/mpesa/accountbalance/v2/query"));
    let body = transport.last_api_body();
    assert_eq!(body["CommandID"], json!("AccountBalance"));
    assert_eq!(body["PartyA"], json!("600000"));
    assert_eq!(body["Remarks"], json!("Balance check"));
    assert!(body["OriginatorConversationID"]
        .as_str()
        .unwrap()
        .starts_with("Partner-"));

    let balances = mpesa_sdk::services::AccountBalanceService::parse_balance_result(&json!({
        "Result": {
            "ResultParameters": {
                "ResultParameter": [
                    {"Key": "AccountBalance", "Value": "Working Account|ETB|4600.00&Utility Account|ETB|200.50"}
                ]
            }
        }
    }))
    .unwrap();
    assert_eq!(balances.len(), 2);
    assert_eq!(balances[0].account, "Working Account");
    assert_eq!(balances[1].amount, "200.50");
}

#[tokio::test(start_paused = true)]
async fn retries_apply_to_operations() {
    let transport = MockTransport::new();
    transport.push_api(Reply::status(503, "Service Unavailable"));
    transport.push_api(Reply::status(500, "{}"));
    let mpesa = client(&transport);

    mpesa
        .stk_push()
        .push_with("251712345678", 10.0, "https://example.com/callback")
        .await
        .unwrap();

    assert_eq!(transport.api_requests().len(), 3);
    assert_eq!(transport.token_requests().len(), 1);
}
