//! Integration tests for Ahmed Mart.
//!
//! The tests drive a running storefront over HTTP and are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p ahmed-mart-cli -- migrate
//! cargo run -p ahmed-mart-storefront &
//! cargo test -p ahmed-mart-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - Server under test (default `http://localhost:3000`)
//! - `TEST_PRODUCT_ID` - An available product, for cart and order tests
//! - `TEST_CUSTOMER_EMAIL` / `TEST_CUSTOMER_PASSWORD` - A customer account on
//!   the auth provider, for address and order tests

use reqwest::Client;

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A client that keeps the session cookie between requests and does not
/// follow redirects, so guards can be observed.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Product ID to exercise cart endpoints with, if configured.
#[must_use]
pub fn test_product_id() -> Option<String> {
    std::env::var("TEST_PRODUCT_ID").ok()
}

/// Test customer credentials, if configured.
#[must_use]
pub fn test_customer() -> Option<(String, String)> {
    let email = std::env::var("TEST_CUSTOMER_EMAIL").ok()?;
    let password = std::env::var("TEST_CUSTOMER_PASSWORD").ok()?;
    Some((email, password))
}

/// A session client signed in as the test customer, if configured.
///
/// # Panics
///
/// Panics if the sign-in request fails or is rejected.
pub async fn signed_in_client() -> Option<Client> {
    let (email, password) = test_customer()?;
    let client = session_client();

    let resp = client
        .post(format!("{}/auth/login", storefront_base_url()))
        .form(&[
            ("email", email.as_str()),
            ("password", password.as_str()),
            ("role", "customer"),
        ])
        .send()
        .await
        .expect("Failed to sign in");
    assert_eq!(
        resp.status(),
        reqwest::StatusCode::SEE_OTHER,
        "Test customer sign-in was rejected"
    );

    Some(client)
}

/// A minimal address payload without coordinates.
#[must_use]
pub fn address_payload(line1: &str, is_default: bool) -> serde_json::Value {
    serde_json::json!({
        "address_type": "home",
        "address_line1": line1,
        "city": "Hyderabad",
        "state": "Telangana",
        "pincode": "500001",
        "is_default": is_default,
    })
}
