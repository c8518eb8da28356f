use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use engine::Engine;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use rust_decimal::Decimal;
use sea_orm::Database;
use serde_json::{Value, json};
use server::{ServerOptions, router};
use tower::ServiceExt;

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    router(
        engine,
        ServerOptions {
            jwt_secret: "test-secret".to_string(),
            token_ttl: chrono::Duration::hours(1),
            request_timeout: Duration::from_secs(30),
        },
    )
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn signup(app: &Router, email: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({"email": email, "password": "password123", "firstName": "Test"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_login_and_profile() {
    let app = app().await;
    signup(&app, "alice@example.com").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert_eq!(body["user"]["email"], "alice@example.com");

    let (status, me) = call(&app, Method::GET, "/users/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["firstName"], "Test");

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({"email": "alice@example.com", "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = app().await;

    let (status, _) = call(&app, Method::GET, "/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&app, Method::GET, "/accounts", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn accounts_are_private_to_their_owner() {
    let app = app().await;
    let alice = signup(&app, "alice@example.com").await;
    let bob = signup(&app, "bob@example.com").await;

    let (status, account) = call(
        &app,
        Method::POST,
        "/accounts",
        Some(&alice),
        Some(json!({"name": "Main", "type": "BANK_ACCOUNT", "balance": "100", "currency": "eur"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account["currency"], "EUR");
    let id = account["id"].as_str().unwrap();

    let uri = format!("/accounts/{id}");
    let (status, _) = call(&app, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/accounts/{id}/balance"),
        Some(&alice),
        Some(json!({"delta": "-150"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Insufficient"));

    let (status, _) = call(&app, Method::GET, "/accounts/not-a-uuid", Some(&alice), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = call(&app, Method::GET, "/accounts", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);

    let (status, _) = call(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_account_type_is_a_validation_error() {
    let app = app().await;
    let token = signup(&app, "alice@example.com").await;
    let (status, _) = call(
        &app,
        Method::POST,
        "/accounts",
        Some(&token),
        Some(json!({"name": "Main", "type": "PIGGY_BANK", "currency": "EUR"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_abbreviation_conflicts() {
    let app = app().await;
    let token = signup(&app, "alice@example.com").await;
    let btc = json!({"name": "Bitcoin", "abbreviation": "BTC", "suffix": "BTC"});

    let (status, _) = call(&app, Method::POST, "/definitions", Some(&token), Some(btc)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/definitions",
        Some(&token),
        Some(json!({"name": "Other", "abbreviation": "btc"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, found) = call(
        &app,
        Method::GET,
        "/definitions/search?q=bt&limit=abc",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["limit"], 50);
    assert_eq!(found["definitions"][0]["abbreviation"], "BTC");
}

#[tokio::test]
async fn type_listings_are_served() {
    let app = app().await;
    let token = signup(&app, "alice@example.com").await;

    let (_, accounts) = call(&app, Method::GET, "/accounts/types", Some(&token), None).await;
    assert_eq!(accounts["types"].as_array().unwrap().len(), 13);
    let (_, assets) = call(&app, Method::GET, "/assets/types", Some(&token), None).await;
    assert_eq!(assets["types"].as_array().unwrap().len(), 17);
    let (_, txs) = call(&app, Method::GET, "/transactions/types", Some(&token), None).await;
    assert_eq!(txs["types"].as_array().unwrap().len(), 20);
    assert!(
        txs["types"]
            .as_array()
            .unwrap()
            .contains(&json!("BORROWING"))
    );
}

#[tokio::test]
async fn transaction_listing_clamps_pagination() {
    let app = app().await;
    let token = signup(&app, "alice@example.com").await;
    let (_, account) = call(
        &app,
        Method::POST,
        "/accounts",
        Some(&token),
        Some(json!({"name": "Main", "type": "BANK_ACCOUNT", "currency": "EUR"})),
    )
    .await;

    let (status, tx) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(&token),
        Some(json!({
            "accountId": account["id"],
            "type": "EXPENSE",
            "amount": "12.50",
            "fee": "0.50",
            "currency": "eur",
            "category": "food",
            "date": "2024-05-02T10:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let total: Decimal = tx["totalAmount"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, Decimal::new(13, 0));

    let (status, list) = call(
        &app,
        Method::GET,
        "/transactions?limit=1000&offset=-3",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["limit"], 100);
    assert_eq!(list["offset"], 0);
    assert_eq!(list["count"], 1);

    let (status, totals) = call(
        &app,
        Method::GET,
        "/transactions/totals?from=2024-05-01&to=2024-05-31",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(totals[0]["key"], "food");

    let (status, _) = call(
        &app,
        Method::GET,
        "/transactions/monthly?from=2024-06-01&to=2024-05-01",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bare_end_date_covers_the_whole_day() {
    let app = app().await;
    let token = signup(&app, "alice@example.com").await;
    let (_, account) = call(
        &app,
        Method::POST,
        "/accounts",
        Some(&token),
        Some(json!({"name": "Main", "type": "BANK_ACCOUNT", "currency": "EUR"})),
    )
    .await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/transactions",
        Some(&token),
        Some(json!({
            "accountId": account["id"],
            "type": "INCOME",
            "amount": "5",
            "currency": "EUR",
            "category": "salary",
            "date": "2024-05-31T23:59:59.500Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = call(
        &app,
        Method::GET,
        "/transactions?from=2024-05-31&to=2024-05-31",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["count"], 1);
}
