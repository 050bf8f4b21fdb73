/// SMTP email sending implementation
use super::{EmailError, EmailResult, Mailer, OutgoingMail};
use crate::app_config::EmailConfig;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> EmailResult<Self> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
            .parse()
            .map_err(|e| EmailError::ConfigError(format!("Invalid from address: {}", e)))?;

        let builder = if config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
        };

        let builder = if config.smtp_username.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.smtp_username.clone(),
                config.smtp_password.clone(),
            ))
        };

        Ok(Self {
            from,
            transport: builder.port(config.smtp_port).build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> EmailResult<()> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(|e| EmailError::ConfigError(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())?;

        self.transport.send(email).await?;

        log::info!("Email sent successfully to: {}", mail.to);

        Ok(())
    }
}
