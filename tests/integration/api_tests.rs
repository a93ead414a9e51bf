//! API integration tests
//!
//! These run against a live server with a migrated database:
//! `cargo test --test api_tests -- --ignored`. Admin scenarios expect the
//! bootstrap administrator from `CAMPUS_AUTH__BOOTSTRAP_ADMIN_LOGIN` /
//! `CAMPUS_AUTH__BOOTSTRAP_ADMIN_PASSWORD`.

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Unique login for each run so tests can be repeated on the same database
fn unique_login(prefix: &str) -> String {
    format!("{}_{}", prefix, chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

/// Register a student and return (user id, token)
async fn register_and_login(client: &Client, prefix: &str) -> (i64, String) {
    let login = unique_login(prefix);
    let response = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({ "login": login, "password": "password123" }))
        .send()
        .await
        .expect("Failed to send register request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let token = login_as(client, &login, "password123").await;
    let me: Value = client
        .get(format!("{}/auth/me", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send me request")
        .json()
        .await
        .expect("Failed to parse me response");
    (me["id"].as_i64().expect("No id"), token)
}

async fn login_as(client: &Client, login: &str, password: &str) -> String {
    let body: Value = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": login, "password": password }))
        .send()
        .await
        .expect("Failed to send login request")
        .json()
        .await
        .expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

async fn admin_token(client: &Client) -> String {
    let login = std::env::var("CAMPUS_AUTH__BOOTSTRAP_ADMIN_LOGIN").unwrap_or_else(|_| "admin".into());
    let password =
        std::env::var("CAMPUS_AUTH__BOOTSTRAP_ADMIN_PASSWORD").unwrap_or_else(|_| "change-me-please".into());
    login_as(client, &login, &password).await
}

async fn create_lend_item(client: &Client, token: &str) -> i64 {
    let response = client
        .post(format!("{}/items", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": "Calculus textbook",
            "availability_mode": "lend",
            "lending_duration_days": 7
        }))
        .send()
        .await
        .expect("Failed to create item");
    assert_eq!(response.status(), StatusCode::CREATED);
    let item: Value = response.json().await.expect("Failed to parse item");
    item["id"].as_i64().expect("No item id")
}

async fn request_item(client: &Client, token: &str, item_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/items/{}/request", BASE_URL, item_id))
        .bearer_auth(token)
        .json(&json!({ "type": "lend" }))
        .send()
        .await
        .expect("Failed to request item")
}

async fn act(client: &Client, token: &str, tx_id: i64, action: &str) -> reqwest::Response {
    client
        .patch(format!("{}/transactions/{}", BASE_URL, tx_id))
        .bearer_auth(token)
        .json(&json!({ "action": action }))
        .send()
        .await
        .expect("Failed to update transaction")
}

async fn item_status(client: &Client, token: &str, item_id: i64) -> String {
    let item: Value = client
        .get(format!("{}/items/{}", BASE_URL, item_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to get item")
        .json()
        .await
        .expect("Failed to parse item");
    item["status"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login_invalid_credentials() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "login": "nobody_here", "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .get(format!("{}/items", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_cannot_request_own_item() {
    let client = Client::new();
    let (_, owner) = register_and_login(&client, "owner").await;
    let item_id = create_lend_item(&client, &owner).await;

    let response = request_item(&client, &owner, item_id).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore]
async fn test_lend_flow_and_single_rating() {
    let client = Client::new();
    let (owner_id, owner) = register_and_login(&client, "owner").await;
    let (_, borrower) = register_and_login(&client, "borrower").await;
    let item_id = create_lend_item(&client, &owner).await;

    let response = request_item(&client, &borrower, item_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let tx: Value = response.json().await.expect("Failed to parse transaction");
    let tx_id = tx["id"].as_i64().expect("No transaction id");
    assert_eq!(tx["status"], "pending");
    assert_eq!(item_status(&client, &owner, item_id).await, "reserved");

    // Only the owner approves
    let response = act(&client, &borrower, tx_id, "approve").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = act(&client, &owner, tx_id, "approve").await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: Value = response.json().await.expect("Failed to parse outcome");
    assert_eq!(outcome["transaction"]["status"], "active");
    assert!(outcome["transaction"]["due_date"].is_string());
    assert_eq!(item_status(&client, &owner, item_id).await, "borrowed");

    // On-time return
    let response = act(&client, &borrower, tx_id, "mark_returned").await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: Value = response.json().await.expect("Failed to parse outcome");
    assert_eq!(outcome["transaction"]["status"], "completed");
    assert!(outcome["penalty"].is_null());
    assert_eq!(item_status(&client, &owner, item_id).await, "available");

    let rate = |token: String| {
        let client = client.clone();
        async move {
            client
                .post(format!("{}/transactions/{}/ratings", BASE_URL, tx_id))
                .bearer_auth(token)
                .json(&json!({ "rating": 5, "comment": "Smooth exchange" }))
                .send()
                .await
                .expect("Failed to rate")
        }
    };

    let response = rate(borrower.clone()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let rating: Value = response.json().await.expect("Failed to parse rating");
    assert_eq!(rating["rated_user_id"].as_i64(), Some(owner_id));
    assert_eq!(rating["rater_role"], "borrower");

    let response = rate(borrower.clone()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let summary: Value = client
        .get(format!("{}/users/{}/ratings", BASE_URL, owner_id))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("Failed to get ratings")
        .json()
        .await
        .expect("Failed to parse ratings");
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["average"], 5.0);
}

#[tokio::test]
#[ignore]
async fn test_reject_releases_item() {
    let client = Client::new();
    let (_, owner) = register_and_login(&client, "owner").await;
    let (_, borrower) = register_and_login(&client, "borrower").await;
    let item_id = create_lend_item(&client, &owner).await;

    let tx: Value = request_item(&client, &borrower, item_id)
        .await
        .json()
        .await
        .expect("Failed to parse transaction");
    let tx_id = tx["id"].as_i64().expect("No transaction id");

    // A second request on a reserved item conflicts
    let (_, other) = register_and_login(&client, "other").await;
    let response = request_item(&client, &other, item_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = act(&client, &owner, tx_id, "reject").await;
    assert_eq!(response.status(), StatusCode::OK);
    let outcome: Value = response.json().await.expect("Failed to parse outcome");
    assert_eq!(outcome["transaction"]["status"], "cancelled");
    assert_eq!(item_status(&client, &owner, item_id).await, "available");

    // Cancelled transactions cannot be rated
    let response = client
        .post(format!("{}/transactions/{}/ratings", BASE_URL, tx_id))
        .bearer_auth(&borrower)
        .json(&json!({ "rating": 4 }))
        .send()
        .await
        .expect("Failed to rate");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_pending_penalty_blocks_requests_and_listings() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (_, owner) = register_and_login(&client, "owner").await;
    let (_, borrower) = register_and_login(&client, "borrower").await;
    let item_id = create_lend_item(&client, &owner).await;

    let tx: Value = request_item(&client, &borrower, item_id)
        .await
        .json()
        .await
        .expect("Failed to parse transaction");
    let tx_id = tx["id"].as_i64().expect("No transaction id");

    let penalize = |days: i64| {
        let client = client.clone();
        let admin = admin.clone();
        async move {
            client
                .post(format!("{}/admin/transactions/{}/penalties", BASE_URL, tx_id))
                .bearer_auth(admin)
                .json(&json!({ "days_late": days, "reason": "Damaged cover" }))
                .send()
                .await
                .expect("Failed to create penalty")
        }
    };

    // Nothing went out yet
    let response = penalize(2).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    act(&client, &owner, tx_id, "approve").await;
    let response = penalize(2).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let penalty: Value = response.json().await.expect("Failed to parse penalty");
    let amount: f64 = penalty["amount"].as_str().and_then(|a| a.parse().ok()).unwrap_or_default();
    assert_eq!(amount, 100.0);
    let penalty_id = penalty["id"].as_i64().expect("No penalty id");

    let response = act(&client, &borrower, tx_id, "mark_returned").await;
    assert_eq!(response.status(), StatusCode::OK);

    let other_item = create_lend_item(&client, &owner).await;
    let response = request_item(&client, &borrower, other_item).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Listing is blocked too
    let response = client
        .post(format!("{}/items", BASE_URL))
        .bearer_auth(&borrower)
        .json(&json!({ "title": "Desk lamp", "availability_mode": "lend", "lending_duration_days": 3 }))
        .send()
        .await
        .expect("Failed to create item");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Short reasons are refused
    let response = client
        .post(format!("{}/admin/penalties/{}/waive", BASE_URL, penalty_id))
        .bearer_auth(&admin)
        .json(&json!({ "reason": "ok" }))
        .send()
        .await
        .expect("Failed to waive");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .post(format!("{}/admin/penalties/{}/waive", BASE_URL, penalty_id))
        .bearer_auth(&admin)
        .json(&json!({ "reason": "Cover was already damaged" }))
        .send()
        .await
        .expect("Failed to waive");
    assert_eq!(response.status(), StatusCode::OK);

    let response = request_item(&client, &borrower, other_item).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    // The returned item keeps its history
    let response = client
        .delete(format!("{}/items/{}", BASE_URL, item_id))
        .bearer_auth(&owner)
        .send()
        .await
        .expect("Failed to delete item");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_admin_endpoints_refuse_students() {
    let client = Client::new();
    let (_, student) = register_and_login(&client, "student").await;

    for path in ["admin/stats", "admin/transactions", "admin/export/items"] {
        let response = client
            .get(format!("{}/{}", BASE_URL, path))
            .bearer_auth(&student)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", path);
    }
}

#[tokio::test]
#[ignore]
async fn test_export_csv_headers() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let response = client
        .get(format!("{}/admin/export/penalties", BASE_URL))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to export");
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("Failed to read body");
    assert!(body.starts_with("id,transaction_id,days_late,amount,status"));
}
