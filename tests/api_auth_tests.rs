//! Session and role checks at the HTTP boundary.
//!
//! Every request here is rejected (or answered) before any query runs, so
//! the lazily connected pool never opens a connection.

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;

mod common;

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_protected_route_requires_session() {
    let (app, _) = common::create_test_app();

    let response = app.oneshot(get("/users", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = common::body_json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(get("/users", Some("spinning_token=not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let (app, _) = common::create_test_app();

    let mut config = spinning_motion::config::Config::test_default();
    config.jwt_secret = "a_completely_different_secret!!!".to_string();
    let forged =
        spinning_motion::middleware::auth::issue_token(&common::test_user(1, true), &config)
            .unwrap();

    let response = app
        .oneshot(get("/users", Some(&format!("spinning_token={forged}"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_forbid_customers() {
    let cookie = common::session_cookie(7, false);

    for uri in [
        "/users",
        "/purchase-history/all",
        "/purchase-history/recent",
        "/purchase-history/stats",
        "/purchase-history/admin/dashboard",
        "/search/orders?searchTerm=ORD",
        "/guest-orders/1",
        "/guest-orders/by-order/1",
    ] {
        let (app, _) = common::create_test_app();
        let response = app.oneshot(get(uri, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn test_bearer_header_is_accepted() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/users")
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", common::token_for(7, false)),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Authenticated, but not an admin
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_other_users_data_is_forbidden() {
    let cookie = common::session_cookie(7, false);

    for uri in [
        "/basket/8",
        "/basket/8/total",
        "/purchase-history/8",
        "/coupons/user/8",
    ] {
        let (app, _) = common::create_test_app();
        let response = app.oneshot(get(uri, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn test_basket_add_for_other_user_is_forbidden() {
    let (app, _) = common::create_test_app();

    let mut request = common::json_request(
        "POST",
        "/basket/add",
        serde_json::json!({ "user_id": 8, "record_id": 1, "quantity": 1 }),
    );
    request.headers_mut().insert(
        header::COOKIE,
        common::session_cookie(7, false).parse().unwrap(),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_genre_creation_requires_admin() {
    let (app, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/genres/hip-hop")
                .header(header::COOKIE, common::session_cookie(7, false))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_active_users_counts_websocket_sessions() {
    let (app, state) = common::create_test_app();
    state.hub.session_connected("session-a");
    state.hub.session_connected("session-b");

    let response = app
        .oneshot(get("/active-users", Some(&common::session_cookie(7, false))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_json(response).await, serde_json::json!(2));
}
