//! Newsletter subscribers and new-release mailings.

use crate::{
    db::DbPool,
    error::AppError,
    models::{record::RecordResponse, subscriber::Subscriber},
    services::{
        email_templates,
        mailer::{Mailer, OutgoingEmail},
        validation,
    },
};

/// Subscribe `email`; an existing subscription is returned unchanged.
pub async fn subscribe(pool: &DbPool, email: &str) -> Result<Subscriber, AppError> {
    validation::require_email(email)?;
    let email = email.trim();

    sqlx::query("INSERT INTO subscribers (email) VALUES ($1) ON CONFLICT (email) DO NOTHING")
        .bind(email)
        .execute(pool)
        .await?;

    let subscriber = sqlx::query_as::<_, Subscriber>("SELECT * FROM subscribers WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(subscriber)
}

pub async fn list_subscribers(pool: &DbPool) -> Result<Vec<Subscriber>, AppError> {
    let subscribers = sqlx::query_as::<_, Subscriber>("SELECT * FROM subscribers ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(subscribers)
}

/// Email every subscriber about `records`. Per-recipient failures are logged.
///
/// Returns the number of messages sent.
pub async fn notify_new_release(
    pool: &DbPool,
    mailer: &Mailer,
    records: &[RecordResponse],
) -> Result<usize, AppError> {
    if records.is_empty() {
        return Ok(0);
    }

    let subscribers = list_subscribers(pool).await?;
    let html_body = email_templates::new_release_body(records);

    let mut sent = 0;
    for subscriber in subscribers {
        let email = OutgoingEmail {
            to: subscriber.email,
            subject: email_templates::NEW_RELEASE_SUBJECT.to_string(),
            html_body: html_body.clone(),
        };
        match mailer.send(&email).await {
            Ok(()) => sent += 1,
            Err(e) => tracing::warn!(subscriber_id = subscriber.id, error = %e, "New release email failed"),
        }
    }

    tracing::info!(sent, records = records.len(), "New release notification sent");
    Ok(sent)
}
