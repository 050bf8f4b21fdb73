/// Email sending functionality
///
/// Outgoing mail goes through the [`Mailer`] trait so handlers never depend on
/// a transport. [`smtp::SmtpMailer`] delivers through lettre; [`LogMailer`]
/// only logs, for development.
pub mod smtp;
pub mod templates;

use async_trait::async_trait;
use std::sync::Arc;

/// Email sending result
pub type EmailResult<T> = Result<T, EmailError>;

/// Email errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP configuration error
    #[error("Email config error: {0}")]
    ConfigError(String),
    /// Email building error
    #[error("Email build error: {0}")]
    BuildError(#[from] lettre::error::Error),
    /// Email sending error
    #[error("Email send error: {0}")]
    SendError(#[from] lettre::transport::smtp::Error),
}

/// A plain-text message ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> EmailResult<()>;
}

/// Shared handle stored in app data.
pub type SharedMailer = Arc<dyn Mailer>;

/// Mock mode: just log the email
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> EmailResult<()> {
        log::info!("MOCK EMAIL:");
        log::info!("  To: {}", mail.to);
        log::info!("  Subject: {}", mail.subject);
        log::info!("  Body: {}", mail.body);
        Ok(())
    }
}

/// Picks the transport described by the `email` config section.
pub fn from_config(config: &crate::app_config::EmailConfig) -> EmailResult<SharedMailer> {
    if config.mock {
        log::info!("Email is in mock mode; messages will be logged, not sent");
        return Ok(Arc::new(LogMailer));
    }
    Ok(Arc::new(smtp::SmtpMailer::new(config)?))
}
