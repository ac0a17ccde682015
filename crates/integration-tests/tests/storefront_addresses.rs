//! Integration tests for the address book.
//!
//! Whatever sequence of creates, updates and default switches runs, a
//! customer ends up with exactly one default address.

use ahmed_mart_integration_tests::{address_payload, signed_in_client, storefront_base_url};
use reqwest::{Client, StatusCode};
use serde_json::Value;

async fn create_address(client: &Client, line1: &str, is_default: bool) -> String {
    let resp = client
        .post(format!("{}/api/addresses", storefront_base_url()))
        .json(&address_payload(line1, is_default))
        .send()
        .await
        .expect("Failed to create address");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("Invalid JSON");
    body["id"].as_str().expect("Address has no id").to_string()
}

async fn default_ids(client: &Client) -> Vec<String> {
    let resp = client
        .get(format!("{}/api/addresses", storefront_base_url()))
        .send()
        .await
        .expect("Failed to list addresses");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("Invalid JSON");
    body.as_array()
        .expect("Address list is not an array")
        .iter()
        .filter(|a| a["is_default"] == true)
        .filter_map(|a| a["id"].as_str().map(str::to_string))
        .collect()
}

async fn delete_address(client: &Client, id: &str) {
    let resp = client
        .delete(format!("{}/api/addresses/{id}", storefront_base_url()))
        .send()
        .await
        .expect("Failed to delete address");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running storefront server and TEST_CUSTOMER_EMAIL/PASSWORD"]
async fn test_exactly_one_default_address() {
    let Some(client) = signed_in_client().await else {
        return;
    };
    let base_url = storefront_base_url();

    let home = create_address(&client, "4-1-12 Abids Road", true).await;
    assert_eq!(default_ids(&client).await, vec![home.clone()]);

    let office = create_address(&client, "Plot 7, HITEC City", false).await;
    assert_eq!(default_ids(&client).await, vec![home.clone()]);

    let resp = client
        .post(format!("{base_url}/api/addresses/{office}/default"))
        .send()
        .await
        .expect("Failed to set default");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(default_ids(&client).await, vec![office.clone()]);

    let resp = client
        .put(format!("{base_url}/api/addresses/{home}"))
        .json(&address_payload("4-1-12 Abids Road, 2nd floor", true))
        .send()
        .await
        .expect("Failed to update address");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(default_ids(&client).await, vec![home.clone()]);

    delete_address(&client, &office).await;
    delete_address(&client, &home).await;
}

#[tokio::test]
#[ignore = "Requires running storefront server and TEST_CUSTOMER_EMAIL/PASSWORD"]
async fn test_invalid_pincode_is_rejected() {
    let Some(client) = signed_in_client().await else {
        return;
    };

    let mut payload = address_payload("12 MG Road", false);
    payload["pincode"] = Value::from("5000");

    let resp = client
        .post(format!("{}/api/addresses", storefront_base_url()))
        .json(&payload)
        .send()
        .await
        .expect("Failed to create address");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and TEST_CUSTOMER_EMAIL/PASSWORD"]
async fn test_concurrent_default_creates_keep_one_default() {
    let Some(client) = signed_in_client().await else {
        return;
    };

    let (first, second) = tokio::join!(
        create_address(&client, "1 Charminar Road", true),
        create_address(&client, "2 Charminar Road", true),
    );

    let defaults = default_ids(&client).await;
    assert_eq!(defaults.len(), 1);
    assert!(defaults.contains(&first) || defaults.contains(&second));

    delete_address(&client, &first).await;
    delete_address(&client, &second).await;
}
