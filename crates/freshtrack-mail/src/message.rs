use lettre::message::{Mailbox, MultiPart};
use lettre::Message;

use crate::{MailError, Result};

/// One outgoing email with an HTML body and a plain-text fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl Email {
    /// Convert into a lettre message, validating both addresses
    pub fn to_message(&self) -> Result<Message> {
        let message = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .to(parse_mailbox(&self.to)?)
            .subject(self.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                self.text.clone(),
                self.html.clone(),
            ))?;
        Ok(message)
    }
}

/// Parse `user@example.com` or `Name <user@example.com>`
pub fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .trim()
        .parse::<Mailbox>()
        .map_err(|e| MailError::Address {
            address: address.to_string(),
            reason: e.to_string(),
        })
}
