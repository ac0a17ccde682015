//! Integration tests for placing and cancelling orders.
//!
//! Only a pending order can be cancelled; a later cancel is refused and the
//! status stays where it was.

use ahmed_mart_integration_tests::{
    address_payload, signed_in_client, storefront_base_url, test_product_id,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server, TEST_PRODUCT_ID and a test customer"]
async fn test_cancel_only_from_pending() {
    let Some(product_id) = test_product_id() else {
        return;
    };
    let Some(client) = signed_in_client().await else {
        return;
    };
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/api/addresses"))
        .json(&address_payload("22 Park Street", false))
        .send()
        .await
        .expect("Failed to create address");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let address: Value = resp.json().await.expect("Invalid JSON");
    let address_id = address["id"].as_str().expect("Address has no id");

    let resp = client
        .post(format!("{base_url}/api/cart/items"))
        .json(&json!({ "product_id": product_id }))
        .send()
        .await
        .expect("Failed to add item");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base_url}/api/orders"))
        .json(&json!({ "address_id": address_id, "payment_method": "cod" }))
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(order["status"], "pending");
    let order_id = order["id"].as_str().expect("Order has no id");

    let resp = client
        .get(format!("{base_url}/api/cart"))
        .send()
        .await
        .expect("Failed to get cart");
    let cart: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(cart["total_items"], 0);

    let resp = client
        .post(format!("{base_url}/api/orders/{order_id}/cancel"))
        .send()
        .await
        .expect("Failed to cancel order");
    assert_eq!(resp.status(), StatusCode::OK);
    let cancelled: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(cancelled["status"], "cancelled");

    let resp = client
        .post(format!("{base_url}/api/orders/{order_id}/cancel"))
        .send()
        .await
        .expect("Failed to cancel order");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = client
        .get(format!("{base_url}/api/orders/{order_id}"))
        .send()
        .await
        .expect("Failed to fetch order");
    assert_eq!(resp.status(), StatusCode::OK);
    let current: Value = resp.json().await.expect("Invalid JSON");
    assert_eq!(current["status"], "cancelled");
    assert_eq!(current["total_amount"], order["total_amount"]);

    let resp = client
        .delete(format!("{base_url}/api/addresses/{address_id}"))
        .send()
        .await
        .expect("Failed to delete address");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running storefront server and TEST_CUSTOMER_EMAIL/PASSWORD"]
async fn test_cancel_unknown_order_is_404() {
    let Some(client) = signed_in_client().await else {
        return;
    };

    let resp = client
        .post(format!(
            "{}/api/orders/{}/cancel",
            storefront_base_url(),
            uuid::Uuid::new_v4()
        ))
        .send()
        .await
        .expect("Failed to cancel order");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
