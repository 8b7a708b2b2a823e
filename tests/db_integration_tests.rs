//! Database-backed service tests.
//!
//! These tests need a disposable PostgreSQL database.
//! Run with: TEST_DATABASE_URL=postgres://localhost/spinning_motion_test cargo test
//!
//! Every test creates its own users, records and events with unique names, so
//! the tests can share one database and run in parallel.

use chrono::{Duration, Utc};
use serde_json::json;
use spinning_motion::{
    db::DbPool,
    error::AppError,
    models::{
        guest::GuestDetails,
        purchase::CreatePurchaseRequest,
        record::{RecordRequest, RecordResponse},
        user::{CreateUserRequest, User},
    },
    services::{
        basket_service,
        checkout_service::{self, WebhookOutcome},
        coupon_service, genre_service, guest_service, purchase_service, record_service,
        search_service, stripe_service::sign_payload,
        user_service,
    },
};
use uuid::Uuid;

mod common;

const WEBHOOK_SECRET: &str = "whsec_test_secret";

fn unique(prefix: &str) -> String {
    format!("{prefix} {}", Uuid::new_v4().simple())
}

async fn seed_record(pool: &DbPool, stock: i32) -> RecordResponse {
    let jazz = genre_service::find_by_name(pool, "Jazz")
        .await
        .unwrap()
        .expect("Jazz is seeded");
    record_service::create_record(
        pool,
        RecordRequest {
            title: unique("Blue Train"),
            artist: "John Coltrane".to_string(),
            genre_id: jazz.id,
            price_cents: 2499,
            year: 1957,
            condition: "Mint".to_string(),
            quantity: stock,
            images_to_delete: Vec::new(),
        },
        Vec::new(),
    )
    .await
    .unwrap()
}

async fn seed_user(pool: &DbPool) -> User {
    user_service::create_user(
        pool,
        CreateUserRequest {
            fname: "Ada".to_string(),
            lname: "Lovelace".to_string(),
            email: format!("{}@example.com", Uuid::new_v4().simple()),
            password: "correct horse".to_string(),
            address: "12 Vinyl Lane".to_string(),
            postal_code: "5611 AB".to_string(),
            country: "Netherlands".to_string(),
            city: "Eindhoven".to_string(),
            region: None,
            phone_number: "+31612345678".to_string(),
        },
    )
    .await
    .unwrap()
}

async fn seed_coupon(pool: &DbPool, user_id: i64, valid_for: Duration) -> String {
    let code = coupon_service::generate_coupon_code();
    sqlx::query(
        "INSERT INTO coupons (user_id, coupon_code, discount_percentage, valid_until) VALUES ($1, $2, 30, $3)",
    )
    .bind(user_id)
    .bind(&code)
    .bind(Utc::now() + valid_for)
    .execute(pool)
    .await
    .unwrap();
    code
}

fn purchase(record_id: i64, user_id: Option<i64>, quantity: i32) -> CreatePurchaseRequest {
    CreatePurchaseRequest {
        user_id,
        is_guest: user_id.is_none(),
        record_id,
        quantity,
        price_cents: 2499,
        order_number: None,
        discount_percentage: None,
    }
}

async fn stock_of(pool: &DbPool, record_id: i64) -> i32 {
    record_service::find_record(pool, record_id)
        .await
        .unwrap()
        .quantity
}

fn guest() -> GuestDetails {
    GuestDetails {
        fname: "Ada".to_string(),
        lname: "Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        address: "1 Analytical Way".to_string(),
        postal_code: "N1 9GU".to_string(),
        country: "UK".to_string(),
        city: "London".to_string(),
        region: "Greater London".to_string(),
        phone_number: "+44 20 7946".to_string(),
    }
}

/// Signed `checkout.session.completed` delivery carrying `metadata`.
fn completed_event(event_id: &str, metadata: serde_json::Value) -> (Vec<u8>, String) {
    let payload = json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_test_123", "status": "complete", "metadata": metadata } }
    })
    .to_string()
    .into_bytes();
    let signature = sign_payload(&payload, WEBHOOK_SECRET, Utc::now().timestamp()).unwrap();
    (payload, signature)
}

// ═══════════════════════════════════════════════════════════════════════════
// PURCHASES AND STOCK
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_purchase_takes_stock_and_refuses_to_oversell() {
    let pool = require_database!();
    let record = seed_record(&pool, 3).await;

    let (row, updated) = purchase_service::create_purchase(&pool, purchase(record.id, None, 2))
        .await
        .unwrap();
    assert_eq!(updated.quantity, 1);
    assert_eq!(row.total_cents, 4998);

    let err = purchase_service::create_purchase(&pool, purchase(record.id, None, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfStock { requested: 2, available: 1, .. }));
    assert_eq!(stock_of(&pool, record.id).await, 1);
}

#[tokio::test]
async fn test_concurrent_purchases_never_drive_stock_negative() {
    let pool = require_database!();
    let record_id = seed_record(&pool, 3).await.id;

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                purchase_service::create_purchase(&pool, purchase(record_id, None, 1)).await
            })
        })
        .collect();

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(AppError::OutOfStock { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(sold, 3);
    assert_eq!(stock_of(&pool, record_id).await, 0);
}

#[tokio::test]
async fn test_sold_record_can_be_deleted_and_history_survives() {
    let pool = require_database!();
    let record = seed_record(&pool, 2).await;
    let (row, _) = purchase_service::create_purchase(&pool, purchase(record.id, None, 1))
        .await
        .unwrap();

    record_service::delete_record(&pool, record.id).await.unwrap();

    assert!(matches!(
        record_service::find_record(&pool, record.id).await,
        Err(AppError::RecordNotFound)
    ));
    let kept = purchase_service::get_purchase(&pool, row.id).await.unwrap();
    assert_eq!(kept.record_id, record.id);
}

// ═══════════════════════════════════════════════════════════════════════════
// COUPONS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_coupon_redeems_only_once() {
    let pool = require_database!();
    let user = seed_user(&pool).await;
    let code = seed_coupon(&pool, user.id, Duration::days(30)).await;

    let mut first = pool.begin().await.unwrap();
    assert!(coupon_service::redeem(&mut first, &code).await.unwrap());
    first.commit().await.unwrap();

    let mut second = pool.begin().await.unwrap();
    assert!(!coupon_service::redeem(&mut second, &code).await.unwrap());
    second.rollback().await.unwrap();

    assert!(!coupon_service::validate(&pool, &code).await.unwrap());
}

#[tokio::test]
async fn test_expired_coupon_cannot_be_redeemed() {
    let pool = require_database!();
    let user = seed_user(&pool).await;
    let code = seed_coupon(&pool, user.id, Duration::days(-1)).await;

    let mut conn = pool.acquire().await.unwrap();
    assert!(!coupon_service::redeem(&mut conn, &code).await.unwrap());
}

#[tokio::test]
async fn test_every_third_purchase_earns_one_coupon() {
    let pool = require_database!();
    let user = seed_user(&pool).await;
    let record = seed_record(&pool, 10).await;

    for _ in 0..2 {
        purchase_service::create_purchase(&pool, purchase(record.id, Some(user.id), 1))
            .await
            .unwrap();
    }
    assert!(!coupon_service::generate_frequent_shopper_coupon(&pool, user.id).await.unwrap());

    purchase_service::create_purchase(&pool, purchase(record.id, Some(user.id), 1))
        .await
        .unwrap();
    assert!(coupon_service::generate_frequent_shopper_coupon(&pool, user.id).await.unwrap());
    // Still holding that one
    assert!(!coupon_service::generate_frequent_shopper_coupon(&pool, user.id).await.unwrap());

    let coupons = coupon_service::coupons_for_user(&pool, user.id).await.unwrap();
    assert_eq!(coupons.len(), 1);
    assert_eq!(coupons[0].discount_percentage, 30);
}

// ═══════════════════════════════════════════════════════════════════════════
// WEBHOOK FULFILMENT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_redelivered_event_is_applied_once() {
    let pool = require_database!();
    let state = common::state_with_pool(pool.clone());
    let record = seed_record(&pool, 5).await;

    let event_id = format!("evt_{}", Uuid::new_v4().simple());
    let (payload, signature) = completed_event(
        &event_id,
        json!({
            "items": json!([{ "r": record.id, "p": 2499, "q": 2 }]).to_string(),
            "isGuest": "true",
            "guestDetails": serde_json::to_string(&guest()).unwrap(),
        }),
    );

    let first = checkout_service::handle_webhook(&state, &payload, Some(&signature))
        .await
        .unwrap();
    let order_number = match first {
        WebhookOutcome::Fulfilled { order_number } => order_number,
        other => panic!("first delivery should fulfil, got {other:?}"),
    };

    let again = checkout_service::handle_webhook(&state, &payload, Some(&signature))
        .await
        .unwrap();
    assert_eq!(again, WebhookOutcome::Duplicate);

    assert_eq!(stock_of(&pool, record.id).await, 3);
    let rows = search_service::search_orders(&pool, &order_number).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_guest);
    let details = guest_service::guest_orders_for_purchase(&pool, rows[0].id)
        .await
        .unwrap();
    assert_eq!(details.len(), 1);
}

#[tokio::test]
async fn test_coupon_discounts_one_order_and_rejects_the_next() {
    let pool = require_database!();
    let state = common::state_with_pool(pool.clone());
    let user = seed_user(&pool).await;
    let record = seed_record(&pool, 5).await;
    let code = seed_coupon(&pool, user.id, Duration::days(30)).await;

    let metadata = json!({
        "items": json!([{ "r": record.id, "p": 2499, "q": 1 }]).to_string(),
        "isGuest": "false",
        "userId": user.id.to_string(),
        "couponCode": code,
        "couponDiscount": "30",
    });

    let (payload, signature) =
        completed_event(&format!("evt_{}", Uuid::new_v4().simple()), metadata.clone());
    let outcome = checkout_service::handle_webhook(&state, &payload, Some(&signature))
        .await
        .unwrap();
    assert!(matches!(outcome, WebhookOutcome::Fulfilled { .. }));

    let bought = purchase_service::purchases_for_user(&pool, user.id).await.unwrap();
    assert_eq!(bought.len(), 1);
    assert_eq!(bought[0].price_cents, 1750);
    assert_eq!(bought[0].discount_percentage, Some(30));

    let (payload, signature) =
        completed_event(&format!("evt_{}", Uuid::new_v4().simple()), metadata);
    let err = checkout_service::handle_webhook(&state, &payload, Some(&signature))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    assert_eq!(stock_of(&pool, record.id).await, 4);
    assert_eq!(
        purchase_service::purchases_for_user(&pool, user.id).await.unwrap().len(),
        1
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// BASKET
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_basket_merge_is_capped_at_stock() {
    let pool = require_database!();
    let user = seed_user(&pool).await;
    let record = seed_record(&pool, 3).await;

    basket_service::add_item(&pool, user.id, record.id, 2).await.unwrap();
    let err = basket_service::add_item(&pool, user.id, record.id, 2)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::OutOfStock { requested: 4, available: 3, .. }));

    let basket = basket_service::get_basket(&pool, user.id).await.unwrap();
    assert_eq!(basket.items.len(), 1);
    assert_eq!(basket.items[0].quantity, 2);
}

#[tokio::test]
async fn test_concurrent_basket_adds_do_not_lose_updates() {
    let pool = require_database!();
    let user_id = seed_user(&pool).await.id;
    let record_id = seed_record(&pool, 10).await.id;

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move { basket_service::add_item(&pool, user_id, record_id, 1).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let basket = basket_service::get_basket(&pool, user_id).await.unwrap();
    assert_eq!(basket.items[0].quantity, 5);
}
