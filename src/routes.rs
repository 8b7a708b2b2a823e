//! Router assembly: public and session-protected routes plus shared layers.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header, request::Parts},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    AppState,
    handlers::{
        auth, basket, coupons, genres, guest_orders, health, payments, purchases, records,
        reviews, search, subscribers, users,
    },
    middleware::auth::require_auth,
    realtime::ws,
};

/// Multipart record uploads carry up to four images.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

fn cors_layer(frontend_origin: String) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &Parts| {
                origin.to_str().is_ok_and(|origin| origin == frontend_origin)
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-requested-with"),
            header::ORIGIN,
            HeaderName::from_static("stripe-signature"),
        ])
        .expose_headers([header::AUTHORIZATION])
}

/// Routes reachable without a session.
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/ws", get(ws::ws_handler))
        // Session
        .route("/tokens", post(auth::login))
        .route("/tokens/logout", post(auth::logout))
        .route("/tokens/validate", get(auth::validate))
        // Registration and public profiles
        .route("/user", post(users::create_user))
        .route("/user/{id}", get(users::get_user))
        // Catalogue
        .route("/genres", get(genres::list_genres))
        .route("/genres/{genre}", get(genres::get_genre))
        .route("/records", get(records::list_records))
        .route("/records/{id}", get(records::get_record))
        .route("/records/{id}/images", get(records::list_images))
        .route("/records/images/{image_id}", get(records::get_image))
        .route("/records/genre/{genre}", get(records::records_by_genre))
        .route("/records/artist/{artist}", get(records::records_by_artist))
        .route("/records/new-releases", get(records::new_releases))
        .route(
            "/records/new-releases/{genre}",
            get(records::new_releases_by_genre),
        )
        .route("/records/top-artists", get(records::top_artists))
        .route("/reviews/{id}", get(reviews::get_review))
        .route("/reviews/record/{record_id}", get(reviews::reviews_for_record))
        .route("/search", get(search::search_records))
        // Checkout
        .route("/coupons/validate/{code}", get(coupons::validate_coupon))
        .route("/guest-orders", post(guest_orders::create_guest_order))
        .route("/subscriber", post(subscribers::subscribe))
        .route(
            "/api/payment/create-checkout-session",
            post(payments::create_checkout_session),
        )
        .route("/api/payment/webhook", post(payments::webhook))
        .route(
            "/api/payment/verify-session/{session_id}",
            post(payments::verify_session),
        )
        .route("/api/payment/config", get(payments::payment_config))
}

/// Routes that need a session; role checks happen in the handlers.
fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/active-users", get(users::active_users))
        .route("/users", get(users::list_users))
        .route(
            "/user/{id}",
            put(users::update_user).delete(users::delete_user),
        )
        .route("/genres/{genre}", post(genres::create_genre))
        .route("/records", post(records::create_record))
        .route(
            "/records/{id}",
            put(records::update_record).delete(records::delete_record),
        )
        .route("/records/images/{image_id}", delete(records::delete_image))
        // Basket
        .route("/basket/add", post(basket::add_item))
        .route("/basket/update", put(basket::update_item))
        .route("/basket/{user_id}", get(basket::get_basket))
        .route("/basket/{user_id}/total", get(basket::basket_total))
        .route("/basket/{user_id}/clear", delete(basket::clear_basket))
        .route("/basket/{user_id}/{record_id}", delete(basket::remove_item))
        // Reviews
        .route("/reviews", post(reviews::create_review))
        .route(
            "/reviews/{id}",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        // Purchases
        .route("/purchase-history", post(purchases::create_purchase))
        .route("/purchase-history/all", get(purchases::all_purchases))
        .route("/purchase-history/recent", get(purchases::recent_purchases))
        .route("/purchase-history/stats", get(purchases::stats))
        .route(
            "/purchase-history/admin/dashboard",
            get(purchases::dashboard),
        )
        .route("/purchase-history/history/{id}", get(purchases::get_purchase))
        .route(
            "/purchase-history/related/{id}",
            get(purchases::related_purchases),
        )
        .route(
            "/purchase-history/{id}",
            get(purchases::purchases_for_user).delete(purchases::delete_purchase),
        )
        // Coupons
        .route("/coupons/generate", post(coupons::generate_coupon))
        .route("/coupons/user/{user_id}", get(coupons::coupons_for_user))
        .route("/coupons/{code}/use", post(coupons::use_coupon))
        // Guest orders
        .route(
            "/guest-orders/{purchase_id}",
            get(guest_orders::get_guest_order),
        )
        .route(
            "/guest-orders/by-order/{purchase_id}",
            get(guest_orders::guest_orders_for_purchase),
        )
        .route("/search/orders", get(search::search_orders))
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = protected_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes())
        .merge(protected)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(state.config.frontend_origin.clone()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
