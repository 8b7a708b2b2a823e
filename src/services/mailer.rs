//! Outbound email delivery.
//!
//! Uses an SMTP relay (STARTTLS) when `SMTP_HOST` is configured; otherwise
//! messages are only logged, which keeps local development and tests offline.

use std::time::Duration;

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::{config::Config, error::AppError};

/// A rendered message ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

pub enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    Log {
        from: String,
    },
}

impl Mailer {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let Some(host) = config.smtp_host.as_deref().filter(|h| !h.trim().is_empty()) else {
            tracing::warn!("SMTP_HOST not set, outgoing email will only be logged");
            return Ok(Mailer::Log {
                from: config.mail_from.clone(),
            });
        };

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
            .port(config.smtp_port);
        if !config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ));
        }

        tracing::info!(host, port = config.smtp_port, "SMTP mailer configured");
        Ok(Mailer::Smtp {
            transport: builder.build(),
            from: config.mail_from.parse()?,
        })
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        match self {
            Mailer::Smtp { transport, from } => {
                let to: Mailbox = email
                    .to
                    .parse()
                    .map_err(|e| AppError::Email(format!("invalid recipient: {e}")))?;

                let message = Message::builder()
                    .from(from.clone())
                    .to(to)
                    .subject(email.subject.clone())
                    .header(ContentType::TEXT_HTML)
                    .body(email.html_body.clone())
                    .map_err(|e| AppError::Email(e.to_string()))?;

                transport
                    .send(message)
                    .await
                    .map_err(|e| AppError::Email(e.to_string()))?;
            }
            Mailer::Log { from } => {
                tracing::info!(
                    from = %from,
                    to = %email.to,
                    subject = %email.subject,
                    "Email (log-only mailer)"
                );
            }
        }
        Ok(())
    }

    /// Send, retrying failed attempts after `delay`. Returns the last error.
    pub async fn send_with_retry(
        &self,
        email: &OutgoingEmail,
        attempts: u32,
        delay: Duration,
    ) -> Result<(), AppError> {
        let mut attempt = 1;
        loop {
            match self.send(email).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < attempts => {
                    tracing::warn!(attempt, to = %email.to, error = %e, "Email send failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        let mailer = Mailer::from_config(&Config::test_default()).unwrap();
        assert!(matches!(mailer, Mailer::Log { .. }));

        let email = OutgoingEmail {
            to: "ada@example.com".to_string(),
            subject: "Hi".to_string(),
            html_body: "<p>Hi</p>".to_string(),
        };
        mailer
            .send_with_retry(&email, 3, Duration::from_millis(1))
            .await
            .unwrap();
    }
}
