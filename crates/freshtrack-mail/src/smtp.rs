use std::time::Duration;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, info};

use crate::{Email, MailError, MailTransport, Result};

/// Connection details for the SMTP relay
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    /// Well-known provider name (`gmail`, `outlook`, ...) or a relay host
    pub service: String,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

/// Map a provider name to its submission host
///
/// Anything unrecognised is assumed to already be a host name.
pub fn relay_host(service: &str) -> String {
    match service.trim().to_ascii_lowercase().as_str() {
        "gmail" | "googlemail" => "smtp.gmail.com".to_string(),
        "outlook" | "outlook365" | "hotmail" => "smtp-mail.outlook.com".to_string(),
        "yahoo" => "smtp.mail.yahoo.com".to_string(),
        "icloud" => "smtp.mail.me.com".to_string(),
        _ => service.trim().to_string(),
    }
}

/// Sends mail through an authenticated SMTP relay
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self> {
        if settings.user.is_empty() || settings.password.is_empty() {
            return Err(MailError::NotConfigured(
                "mail user and password are required".into(),
            ));
        }

        let host = relay_host(&settings.service);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&host)?
            .credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        debug!("SMTP relay configured for {}", host);
        Ok(Self { transport, host })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        let message = email.to_message()?;
        let response = self.transport.send(message).await?;
        info!(
            "Mail to {} accepted by {} ({})",
            email.to,
            self.host,
            response.code()
        );
        Ok(())
    }
}
