//! Checkout sessions and webhook fulfilment.
//!
//! Session creation prices the storefront's items, applies a still-valid
//! coupon and stashes everything the webhook needs in the session metadata.
//! When the provider reports `checkout.session.completed` the order is
//! rebuilt from that metadata and written in a single transaction.
//!
//! # Idempotency
//!
//! The event id is inserted into `processed_stripe_events` inside the same
//! transaction as the purchase rows, so a redelivered event either finds the
//! id already present or rolls back together with the order.

use std::{collections::HashMap, time::Duration};

use chrono::Utc;

use crate::{
    AppState,
    error::AppError,
    models::{
        checkout::{
            CHECKOUT_COMPLETED, CheckoutItem, CheckoutRequest, CheckoutSessionResponse,
            CouponInfo, MAX_CHECKOUT_ITEMS, MetadataItem, StripeCheckoutSession, StripeEvent,
        },
        guest::GuestDetails,
        purchase::CreatePurchaseRequest,
        record::{InventoryUpdate, InventoryUpdateType, Record},
    },
    services::{
        coupon_service, email_templates,
        email_templates::OrderLine,
        guest_service,
        mailer::OutgoingEmail,
        purchase_service,
        stripe_service::{self, SessionLineItem, SessionParams},
        user_service, validation,
    },
};

const EMAIL_ATTEMPTS: u32 = 3;
const EMAIL_RETRY_DELAY: Duration = Duration::from_secs(1);

pub const META_ITEMS: &str = "items";
pub const META_IS_GUEST: &str = "isGuest";
pub const META_USER_ID: &str = "userId";
pub const META_COUPON_CODE: &str = "couponCode";
pub const META_COUPON_DISCOUNT: &str = "couponDiscount";
pub const META_GUEST_DETAILS: &str = "guestDetails";

/// Unit price after a percentage discount, in whole cents.
pub fn discounted_unit(unit_cents: i64, discount_percentage: i32) -> Result<i64, AppError> {
    unit_cents
        .checked_mul(i64::from(discount_percentage))
        .map(|off| unit_cents - off / 100)
        .ok_or_else(|| AppError::InvalidRequest("Price is too large to discount".to_string()))
}

fn charged_unit(unit_cents: i64, discount_percentage: Option<i32>) -> Result<i64, AppError> {
    discount_percentage.map_or(Ok(unit_cents), |pct| discounted_unit(unit_cents, pct))
}

/// `isGuest` is true unless it says `false`, `0` or `no`.
fn flag_is_guest(raw: Option<&str>) -> bool {
    !matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("false" | "0" | "no")
    )
}

pub fn validate_checkout_request(request: &CheckoutRequest) -> Result<(), AppError> {
    if request.items.is_empty() {
        return Err(AppError::InvalidRequest(
            "At least one item is required".to_string(),
        ));
    }
    if request.items.len() > MAX_CHECKOUT_ITEMS {
        return Err(AppError::InvalidRequest(format!(
            "At most {MAX_CHECKOUT_ITEMS} items per checkout"
        )));
    }

    for item in &request.items {
        validation::require_non_blank("title", &item.title)?;
        validation::require_price("price", item.price_cents)?;
        validation::require_positive("quantity", i64::from(item.quantity))?;
    }

    if let Some(coupon) = &request.coupon {
        validation::require_non_blank("coupon code", &coupon.code)?;
        if !(0..=100).contains(&coupon.discount_percentage) {
            return Err(AppError::InvalidRequest(
                "Discount must be between 0 and 100".to_string(),
            ));
        }
    }

    Ok(())
}

/// Provider line items, with `applied_discount` taken off every unit price.
pub fn build_line_items(
    items: &[CheckoutItem],
    applied_discount: Option<i32>,
) -> Result<Vec<SessionLineItem>, AppError> {
    items
        .iter()
        .map(|item| {
            let description = match (item.artist.trim(), item.condition.trim()) {
                ("", "") => None,
                (artist, "") => Some(artist.to_string()),
                ("", condition) => Some(condition.to_string()),
                (artist, condition) => Some(format!("{artist} - {condition}")),
            };
            Ok(SessionLineItem {
                name: item.title.trim().to_string(),
                description,
                unit_amount_cents: charged_unit(item.price_cents, applied_discount)?,
                quantity: item.quantity,
            })
        })
        .collect()
}

/// Session metadata the webhook rebuilds the order from.
pub fn build_metadata(
    request: &CheckoutRequest,
    applied_coupon: Option<&CouponInfo>,
) -> Result<Vec<(String, String)>, AppError> {
    let items: Vec<MetadataItem> = request.items.iter().map(MetadataItem::from).collect();
    let mut metadata = vec![(
        META_ITEMS.to_string(),
        serde_json::to_string(&items).map_err(anyhow::Error::from)?,
    )];

    let user_id = request
        .metadata
        .get(META_USER_ID)
        .map(|id| id.trim())
        .filter(|id| !id.is_empty());
    let is_guest = flag_is_guest(request.metadata.get(META_IS_GUEST).map(String::as_str));

    match user_id {
        Some(user_id) if !is_guest => {
            metadata.push((META_IS_GUEST.to_string(), "false".to_string()));
            metadata.push((META_USER_ID.to_string(), user_id.to_string()));
        }
        _ => metadata.push((META_IS_GUEST.to_string(), "true".to_string())),
    }

    if let Some(coupon) = applied_coupon {
        metadata.push((META_COUPON_CODE.to_string(), coupon.code.trim().to_string()));
        metadata.push((
            META_COUPON_DISCOUNT.to_string(),
            coupon.discount_percentage.to_string(),
        ));
    }

    if let Some(details) = &request.guest_details {
        metadata.push((
            META_GUEST_DETAILS.to_string(),
            serde_json::to_string(details).map_err(anyhow::Error::from)?,
        ));
    }

    if let Some((key, _)) = metadata
        .iter()
        .find(|(_, value)| value.chars().count() > stripe_service::MAX_METADATA_VALUE_CHARS)
    {
        return Err(AppError::InvalidRequest(format!(
            "Checkout {key} are too long for the payment provider"
        )));
    }

    Ok(metadata)
}

/// Create an embedded checkout session returning to `origin`.
///
/// # Errors
///
/// - `InvalidRequest`: missing or malformed origin, or invalid items/coupon
/// - `PaymentProvider`: the provider call failed
pub async fn create_checkout_session(
    state: &AppState,
    origin: Option<&str>,
    request: CheckoutRequest,
) -> Result<CheckoutSessionResponse, AppError> {
    let origin = origin
        .ok_or_else(|| AppError::InvalidRequest("Origin header is required".to_string()))?;
    let origin = stripe_service::validate_return_origin(origin)?;
    validate_checkout_request(&request)?;

    let applied_coupon = match &request.coupon {
        Some(coupon) => {
            if coupon_service::validate(&state.pool, &coupon.code).await? {
                Some(coupon)
            } else {
                tracing::warn!(code = %coupon.code, "Ignoring invalid or expired coupon at checkout");
                None
            }
        }
        None => None,
    };

    let params = SessionParams {
        line_items: build_line_items(
            &request.items,
            applied_coupon.map(|c| c.discount_percentage),
        )?,
        return_url: format!("{origin}/success?session_id={{CHECKOUT_SESSION_ID}}"),
        metadata: build_metadata(&request, applied_coupon)?,
    };

    let session = state.payments.create_checkout_session(&params).await?;
    tracing::info!(
        session_id = %session.session_id,
        items = request.items.len(),
        coupon = applied_coupon.is_some(),
        "Checkout session ready"
    );
    Ok(session)
}

/// An order rebuilt from session metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Fulfilment {
    /// `None` for guest checkouts.
    pub user_id: Option<i64>,
    pub items: Vec<MetadataItem>,
    pub guest_details: Option<GuestDetails>,
    pub coupon: Option<CouponInfo>,
}

impl Fulfilment {
    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }

    fn discount(&self) -> Option<i32> {
        self.coupon.as_ref().map(|c| c.discount_percentage)
    }
}

fn metadata_error(detail: &str) -> AppError {
    AppError::InvalidRequest(format!("Invalid session metadata: {detail}"))
}

/// Parse and check the metadata written by [`build_metadata`].
pub fn parse_metadata(metadata: &HashMap<String, String>) -> Result<Fulfilment, AppError> {
    let is_guest = flag_is_guest(metadata.get(META_IS_GUEST).map(String::as_str));

    let user_id = if is_guest {
        None
    } else {
        let id = metadata
            .get(META_USER_ID)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .ok_or_else(|| metadata_error("registered checkout without a valid userId"))?;
        Some(id)
    };

    let items: Vec<MetadataItem> = metadata
        .get(META_ITEMS)
        .map(|raw| serde_json::from_str(raw))
        .transpose()
        .map_err(|_| metadata_error("items are not valid JSON"))?
        .unwrap_or_default();
    if items.is_empty() {
        return Err(metadata_error("no items"));
    }
    for item in &items {
        if item.record_id <= 0 {
            return Err(metadata_error("item without a record id"));
        }
        if validation::require_price("price", item.price_cents).is_err() || item.quantity <= 0 {
            return Err(metadata_error("item price and quantity must be positive"));
        }
    }

    let guest_details: Option<GuestDetails> = metadata
        .get(META_GUEST_DETAILS)
        .map(|raw| serde_json::from_str(raw))
        .transpose()
        .map_err(|_| metadata_error("guest details are not valid JSON"))?;
    if is_guest
        && guest_details
            .as_ref()
            .is_none_or(|details| details.email.trim().is_empty())
    {
        return Err(metadata_error("guest checkout without an email"));
    }

    let coupon = match metadata.get(META_COUPON_CODE).map(|c| c.trim()) {
        Some(code) if !code.is_empty() => {
            let discount_percentage = metadata
                .get(META_COUPON_DISCOUNT)
                .and_then(|raw| raw.trim().parse::<i32>().ok())
                .filter(|pct| (0..=100).contains(pct))
                .ok_or_else(|| metadata_error("coupon discount must be between 0 and 100"))?;
            Some(CouponInfo {
                code: code.to_string(),
                discount_percentage,
            })
        }
        _ => None,
    };

    Ok(Fulfilment {
        user_id,
        items,
        guest_details,
        coupon,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// Not an event this service acts on.
    Ignored,
    /// Event id seen before; nothing was written.
    Duplicate,
    Fulfilled { order_number: String },
}

/// Verify, parse and apply a webhook delivery.
///
/// # Errors
///
/// - `InvalidWebhookSignature`: missing, stale or wrong signature (400)
/// - `InvalidRequest`: body is not an event envelope (400)
/// - `Internal`: fulfilment failed; the provider will redeliver (500)
pub async fn handle_webhook(
    state: &AppState,
    payload: &[u8],
    signature: Option<&str>,
) -> Result<WebhookOutcome, AppError> {
    let signature = signature.ok_or(AppError::InvalidWebhookSignature)?;
    stripe_service::verify_signature(
        payload,
        signature,
        &state.config.stripe_webhook_secret,
        Utc::now().timestamp(),
    )?;

    let event: StripeEvent = serde_json::from_slice(payload)
        .map_err(|_| AppError::InvalidRequest("Malformed webhook event".to_string()))?;

    if event.event_type != CHECKOUT_COMPLETED {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Webhook event ignored");
        return Ok(WebhookOutcome::Ignored);
    }

    fulfil(state, &event).await.map_err(|e| {
        tracing::error!(event_id = %event.id, error = %e, "Checkout fulfilment failed");
        AppError::Internal(anyhow::anyhow!("Checkout fulfilment failed: {e}"))
    })
}

async fn fulfil(state: &AppState, event: &StripeEvent) -> Result<WebhookOutcome, AppError> {
    let session: StripeCheckoutSession = serde_json::from_value(event.data.object.clone())
        .map_err(|e| metadata_error(&e.to_string()))?;
    let order = parse_metadata(&session.metadata)?;

    if let Some(user_id) = order.user_id {
        if !user_service::user_exists(&state.pool, user_id).await? {
            return Err(AppError::UserNotFound);
        }
    }

    let order_number = purchase_service::generate_order_number();
    let mut tx = state.pool.begin().await?;

    let first_delivery = sqlx::query(
        r#"
        INSERT INTO processed_stripe_events (stripe_event_id, stripe_event_type)
        VALUES ($1, $2)
        ON CONFLICT (stripe_event_id) DO NOTHING
        "#,
    )
    .bind(&event.id)
    .bind(&event.event_type)
    .execute(&mut *tx)
    .await?
    .rows_affected()
        > 0;
    if !first_delivery {
        tx.rollback().await?;
        tracing::info!(event_id = %event.id, "Webhook event already processed");
        return Ok(WebhookOutcome::Duplicate);
    }

    if let Some(coupon) = &order.coupon {
        if !coupon_service::redeem(&mut tx, &coupon.code).await? {
            tx.rollback().await?;
            tracing::warn!(event_id = %event.id, code = %coupon.code, "Coupon already redeemed or expired");
            return Err(AppError::CouponNotFound);
        }
    }

    let mut records: Vec<Record> = Vec::with_capacity(order.items.len());
    let mut lines: Vec<OrderLine> = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let request = CreatePurchaseRequest {
            user_id: order.user_id,
            is_guest: order.is_guest(),
            record_id: item.record_id,
            quantity: item.quantity,
            price_cents: charged_unit(item.price_cents, order.discount())?,
            order_number: Some(order_number.clone()),
            discount_percentage: order.discount(),
        };
        let (purchase, record) =
            purchase_service::insert_purchase(&mut tx, &request, &order_number).await?;

        if let Some(details) = &order.guest_details {
            guest_service::insert_guest_order(&mut tx, purchase.id, details).await?;
        }

        lines.push(OrderLine {
            title: record.title.clone(),
            artist: record.artist.clone(),
            condition: record.condition.clone(),
            unit_price_cents: purchase.price_cents,
            quantity: purchase.quantity,
        });
        records.push(record);
    }

    tx.commit().await?;
    tracing::info!(
        event_id = %event.id,
        order_number = %order_number,
        lines = lines.len(),
        guest = order.is_guest(),
        "Order fulfilled"
    );

    for record in &records {
        state
            .hub
            .publish_inventory_update(&InventoryUpdate::for_record(record, InventoryUpdateType::Purchased));
    }

    send_confirmation(state, &order, &session, &order_number, &lines).await;

    if let Some(user_id) = order.user_id {
        if let Err(e) = coupon_service::generate_frequent_shopper_coupon(&state.pool, user_id).await {
            tracing::warn!(user_id, error = %e, "Frequent shopper coupon check failed");
        }
    }

    Ok(WebhookOutcome::Fulfilled { order_number })
}

/// Registered user's email, else the guest's, else the one the provider collected.
async fn confirmation_recipient(
    state: &AppState,
    order: &Fulfilment,
    session: &StripeCheckoutSession,
) -> Option<String> {
    if let Some(user_id) = order.user_id {
        match user_service::get_user(&state.pool, user_id).await {
            Ok(user) => return Some(user.email),
            Err(e) => tracing::warn!(user_id, error = %e, "Could not load user for confirmation"),
        }
    }

    order
        .guest_details
        .as_ref()
        .map(|details| details.email.trim().to_string())
        .filter(|email| !email.is_empty())
        .or_else(|| {
            session
                .customer_details
                .as_ref()
                .and_then(|customer| customer.email.clone())
        })
}

async fn send_confirmation(
    state: &AppState,
    order: &Fulfilment,
    session: &StripeCheckoutSession,
    order_number: &str,
    lines: &[OrderLine],
) {
    let Some(to) = confirmation_recipient(state, order, session).await else {
        tracing::warn!(order_number, "No recipient for order confirmation");
        return;
    };

    let email = OutgoingEmail {
        to,
        subject: email_templates::order_confirmation_subject(order_number),
        html_body: email_templates::order_confirmation_body(order_number, lines),
    };

    if let Err(e) = state
        .mailer
        .send_with_retry(&email, EMAIL_ATTEMPTS, EMAIL_RETRY_DELAY)
        .await
    {
        tracing::error!(order_number, error = %e, "Order confirmation not delivered");
    }
}
