//! Integration tests for the signed-out cart.
//!
//! A signed-out cart lives in the session only; mutations report no remote
//! sync error.

use ahmed_mart_integration_tests::{session_client, storefront_base_url, test_product_id};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_empty_cart_totals() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/api/cart"))
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["total_items"], 0);
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
#[ignore = "Requires running storefront server and TEST_PRODUCT_ID"]
async fn test_cart_add_increment_remove() {
    let Some(product_id) = test_product_id() else {
        return;
    };
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/api/cart/items"))
        .json(&json!({ "product_id": product_id }))
        .send()
        .await
        .expect("Failed to add item");
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["total_items"], 1);
    assert_eq!(body["synced"], true);

    let resp = client
        .post(format!("{base_url}/api/cart/items/{product_id}/increment"))
        .send()
        .await
        .expect("Failed to increment");
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert!(body["total_items"].as_u64().unwrap_or_default() >= 1);

    let resp = client
        .put(format!("{base_url}/api/cart/items/{product_id}"))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .expect("Failed to set quantity");
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["total_items"], 0);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_is_404() {
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/api/cart/items"))
        .json(&json!({ "product_id": uuid::Uuid::new_v4() }))
        .send()
        .await
        .expect("Failed to add item");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and TEST_PRODUCT_ID"]
async fn test_logout_drops_cart_snapshot() {
    let Some(product_id) = test_product_id() else {
        return;
    };
    let client = session_client();
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/api/cart/items"))
        .json(&json!({ "product_id": product_id }))
        .send()
        .await
        .expect("Failed to add item");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base_url}/auth/logout"))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .get(format!("{base_url}/api/cart"))
        .send()
        .await
        .expect("Failed to get cart");
    let body: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(body["total_items"], 0);
}
