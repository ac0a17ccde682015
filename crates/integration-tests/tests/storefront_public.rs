//! Integration tests for public storefront endpoints.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (am-cli migrate)
//! - The storefront running (cargo run -p ahmed-mart-storefront)

use ahmed_mart_integration_tests::{session_client, storefront_base_url};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_endpoints() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach health endpoint");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to reach readiness endpoint");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_serviceability_rejects_bad_coordinates() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/api/serviceability?lat=123&lng=73.8"))
        .send()
        .await
        .expect("Failed to query serviceability");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_delivery_fee_free_above_threshold() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!(
            "{base_url}/api/delivery-fee?lat=18.52&lng=73.85&subtotal=250"
        ))
        .send()
        .await
        .expect("Failed to query delivery fee");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["delivery_fee"], "0");
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_login_page_lists_roles() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/auth/login?role=vendor"))
        .send()
        .await
        .expect("Failed to load login page");
    assert_eq!(resp.status(), StatusCode::OK);

    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Delivery Partner"));
    assert!(body.contains(r#"value="vendor" selected"#));
}
