//! Email dispatch over SMTP.
//!
//! Thin wrapper around lettre's async transport. Each send renders a named
//! template with a `{name, link}` context and delivers a multipart
//! HTML + plain-text message. Sends are bounded by a timeout and retried
//! once, so a stalled SMTP server cannot hang a request indefinitely.

pub mod templates;

pub use templates::TemplateContext;

use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::EmailConfig;

/// Attempts per dispatch; the second one runs after a short backoff.
const SEND_ATTEMPTS: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("unknown email template: {0}")]
    UnknownTemplate(String),
    #[error("invalid address: {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("smtp transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error("email dispatch timed out")]
    Timeout,
}

/// Service for sending transactional emails
pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Check if email sending is configured and enabled
    pub fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    /// Render a named template and deliver it.
    ///
    /// The sender address and display name come from configuration; callers
    /// provide subject, recipient, reply-to, template name, and context.
    pub async fn send(
        &self,
        subject: &str,
        to: &str,
        reply_to: &str,
        template: &str,
        ctx: &TemplateContext,
    ) -> Result<(), DispatchError> {
        let rendered = templates::render(template, ctx)
            .ok_or_else(|| DispatchError::UnknownTemplate(template.to_string()))?;

        if !self.is_enabled() {
            warn!(to = %to, template = %template, "Email not configured, skipping send");
            return Ok(());
        }

        let email = self.build_message(subject, to, reply_to, &rendered)?;
        let mailer = self.build_transport()?;
        let timeout = Duration::from_secs(self.config.dispatch_timeout_secs);

        let mut last_err = DispatchError::Timeout;
        for attempt in 1..=SEND_ATTEMPTS {
            match tokio::time::timeout(timeout, mailer.send(email.clone())).await {
                Ok(Ok(_)) => {
                    info!(to = %to, subject = %subject, template = %template, "Email sent");
                    return Ok(());
                }
                Ok(Err(err)) => {
                    warn!(to = %to, attempt, error = %err, "Email send failed");
                    last_err = DispatchError::Transport(err);
                }
                Err(_) => {
                    warn!(to = %to, attempt, "Email send timed out");
                    last_err = DispatchError::Timeout;
                }
            }
            if attempt < SEND_ATTEMPTS {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }
        }

        Err(last_err)
    }

    fn build_message(
        &self,
        subject: &str,
        to: &str,
        reply_to: &str,
        rendered: &templates::Rendered,
    ) -> Result<Message, DispatchError> {
        // is_enabled() guarantees these are present
        let from_address = self.config.from_address.as_deref().unwrap_or_default();
        let from: Mailbox = format!("{} <{}>", self.config.from_name, from_address)
            .parse()
            .map_err(|_| DispatchError::Address(from_address.to_string()))?;
        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|_| DispatchError::Address(to.to_string()))?;

        let mut builder = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject);

        if let Ok(reply_to) = reply_to.parse::<Mailbox>() {
            builder = builder.reply_to(reply_to);
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(rendered.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(rendered.html.clone()),
                ),
        )?;

        Ok(message)
    }

    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, DispatchError> {
        let smtp_host = self.config.smtp_host.as_deref().unwrap_or_default();

        let mailer = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        Ok(mailer.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        TemplateContext {
            name: "Test".to_string(),
            link: "https://example.com/x".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_skips_send() {
        let mailer = Mailer::new(EmailConfig::default());
        assert!(!mailer.is_enabled());
        // Unknown templates still fail even when sending is disabled
        assert!(mailer
            .send("Hello", "a@example.com", "noreply", "verifyEmail", &ctx())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_template_is_rejected() {
        let mailer = Mailer::new(EmailConfig::default());
        let err = mailer
            .send("Hello", "a@example.com", "noreply", "nope", &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::UnknownTemplate(_)));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let mut config = EmailConfig::default();
        config.smtp_host = Some("smtp.example.com".to_string());
        config.from_address = Some("noreply@example.com".to_string());
        let mailer = Mailer::new(config);

        let rendered = templates::render("verifyEmail", &ctx()).unwrap();
        let err = mailer
            .build_message("Hello", "not an address", "noreply", &rendered)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Address(_)));
    }
}
