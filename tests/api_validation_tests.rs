//! Input validation tests.
//!
//! Invalid bodies are rejected with 400 before any query runs.

use axum::http::{StatusCode, header};
use serde_json::json;
use tower::ServiceExt;

mod common;

fn registration() -> serde_json::Value {
    json!({
        "fname": "Ada",
        "lname": "Lovelace",
        "email": "ada@example.com",
        "password": "correct horse",
        "address": "12 Vinyl Lane",
        "postal_code": "5611 AB",
        "country": "Netherlands",
        "city": "Eindhoven",
        "phone_number": "+31612345678"
    })
}

async fn expect_bad_request(request: axum::http::Request<axum::body::Body>) -> serde_json::Value {
    let (app, _) = common::create_test_app();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    common::body_json(response).await
}

#[tokio::test]
async fn test_registration_rejects_bad_email() {
    let mut body = registration();
    body["email"] = json!("not-an-email");

    let body = expect_bad_request(common::json_request("POST", "/user", body)).await;
    assert_eq!(body["error"]["code"], "invalid_request");
    assert_eq!(body["error"]["message"], "Invalid email format");
}

#[tokio::test]
async fn test_registration_rejects_short_names_and_phone() {
    let mut short_name = registration();
    short_name["fname"] = json!("A");
    expect_bad_request(common::json_request("POST", "/user", short_name)).await;

    let mut short_phone = registration();
    short_phone["phone_number"] = json!("123");
    expect_bad_request(common::json_request("POST", "/user", short_phone)).await;
}

#[tokio::test]
async fn test_subscriber_email_is_validated() {
    expect_bad_request(common::json_request(
        "POST",
        "/subscriber",
        json!({ "email": "nobody" }),
    ))
    .await;
}

#[tokio::test]
async fn test_guest_order_details_are_validated() {
    let body = json!({
        "purchase_history_id": 1,
        "fname": "R2D2",
        "lname": "Droid",
        "email": "r2@example.com",
        "address": "Hangar 3",
        "postal_code": "5611 AB",
        "country": "Netherlands",
        "city": "Eindhoven",
        "region": "Noord-Brabant",
        "phone_number": "+31612345678"
    });

    let body = expect_bad_request(common::json_request("POST", "/guest-orders", body)).await;
    assert_eq!(body["error"]["message"], "Invalid first name");
}

#[tokio::test]
async fn test_review_rating_must_be_in_range() {
    let mut request = common::json_request(
        "POST",
        "/reviews",
        json!({ "user_id": 7, "record_id": 1, "rating": 6 }),
    );
    request.headers_mut().insert(
        header::COOKIE,
        common::session_cookie(7, false).parse().unwrap(),
    );

    expect_bad_request(request).await;
}

#[tokio::test]
async fn test_basket_quantity_must_be_positive() {
    let mut request = common::json_request(
        "POST",
        "/basket/add",
        json!({ "user_id": 7, "record_id": 1, "quantity": 0 }),
    );
    request.headers_mut().insert(
        header::COOKIE,
        common::session_cookie(7, false).parse().unwrap(),
    );

    expect_bad_request(request).await;
}

#[tokio::test]
async fn test_admin_purchase_requires_positive_price() {
    let mut request = common::json_request(
        "POST",
        "/purchase-history",
        json!({ "user_id": 7, "record_id": 1, "quantity": 1, "price_cents": 0 }),
    );
    request.headers_mut().insert(
        header::COOKIE,
        common::session_cookie(1, true).parse().unwrap(),
    );

    expect_bad_request(request).await;
}

#[tokio::test]
async fn test_blank_search_returns_empty_list() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/search?searchTerm=%20%20")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_missing_search_term_returns_empty_list() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            axum::http::Request::builder()
                .uri("/search")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await, json!([]));
}
