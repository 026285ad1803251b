//! HttpPosBackend against a wiremock POS API

use pos_checkout::backend::{BackendError, HttpPosBackend, PosBackend};
use pos_checkout::checkout::{CustomerDraft, DeviceDraft, DeviceType};
use pos_checkout::config::ApiConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer, token: Option<&str>) -> HttpPosBackend {
    let settings = ApiConfig {
        base_url: format!("{}/api", server.uri()),
        token: token.map(str::to_string),
        timeout_seconds: 5,
        requests_per_second: 100,
        burst_capacity: 100,
        search_cache_ttl_seconds: 30,
    };
    HttpPosBackend::new(&settings).unwrap()
}

#[tokio::test]
async fn test_search_sends_phone_limit_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/customers/search"))
        .and(query_param("phone", "+94771234567"))
        .and(query_param("limit", "10"))
        .and(header("authorization", "Bearer till-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "customers": [{"_id": "c-1", "name": "Nimal Perera", "phone": "+94771234567"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, Some("till-token"));
    let payload = backend.search_customers("+94771234567", 10).await.unwrap();
    assert_eq!(payload["customers"][0]["_id"], "c-1");
}

#[tokio::test]
async fn test_search_results_are_cached_until_a_customer_is_created() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/customers/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/customers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "data": {"_id": "c-2", "name": "Kamala", "phone": "+94771234568"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);
    backend.search_customers("+94771234568", 10).await.unwrap();
    backend.search_customers("+94771234568", 10).await.unwrap();

    let created = backend
        .create_customer(&CustomerDraft {
            name: "Kamala".to_string(),
            phone: "+94771234568".to_string(),
            email: None,
        })
        .await
        .unwrap();
    assert_eq!(created.id, "c-2");

    backend.search_customers("+94771234568", 10).await.unwrap();
}

#[tokio::test]
async fn test_error_status_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/customers"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({"message": "Phone already registered"})),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);
    let err = backend
        .create_customer(&CustomerDraft {
            name: "Kamala".to_string(),
            phone: "+94771234568".to_string(),
            email: None,
        })
        .await
        .unwrap_err();

    match err {
        BackendError::Status { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "Phone already registered");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_reported_as_such() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/customers/c-1/devices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Some("expired"));
    let err = backend.get_customer_devices("c-1").await.unwrap_err();
    assert!(matches!(err, BackendError::Unauthorized { status: 401 }));
    assert!(err.hint().contains("POS_API_TOKEN"));
}

#[tokio::test]
async fn test_devices_accept_wrapped_lists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/customers/c-1/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"devices": [
                {"_id": "d-1", "deviceType": "MOBILE", "brand": "Apple", "model": "iPhone 13"}
            ]}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);
    let devices = backend.get_customer_devices("c-1").await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].id, "d-1");
    assert_eq!(devices[0].device_type, DeviceType::Mobile);
}

#[tokio::test]
async fn test_create_device_posts_camel_case_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/devices"))
        .and(body_partial_json(json!({
            "customerId": "c-1",
            "deviceType": "LAPTOP",
            "serialNumber": "SN-42"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "d-9", "deviceType": "LAPTOP", "brand": "Dell", "model": "XPS 13",
            "serialNumber": "SN-42", "customerId": "c-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);
    let device = backend
        .create_device(&DeviceDraft {
            customer_id: "c-1".to_string(),
            device_type: DeviceType::Laptop,
            brand: "Dell".to_string(),
            model: "XPS 13".to_string(),
            serial_number: Some("SN-42".to_string()),
            imei: None,
        })
        .await
        .unwrap();
    assert_eq!(device.id, "d-9");
    assert_eq!(device.customer_id.as_deref(), Some("c-1"));
}

#[tokio::test]
async fn test_download_invoice_returns_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sales/sale-7/invoice"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 invoice".to_vec()))
        .mount(&server)
        .await;

    let backend = backend_for(&server, None);
    let invoice = backend.download_invoice("sale-7").await.unwrap();
    assert!(invoice.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_unreachable_api_is_a_network_error() {
    let settings = ApiConfig {
        base_url: "http://127.0.0.1:9/api".to_string(),
        timeout_seconds: 2,
        ..ApiConfig::default()
    };
    let backend = HttpPosBackend::new(&settings).unwrap();
    let err = backend.search_customers("+94771234567", 10).await.unwrap_err();
    assert!(matches!(
        err,
        BackendError::Network { .. } | BackendError::Timeout { .. }
    ));
}
