//! Outgoing mail
//!
//! [`MailSender`] is the seam used by the delivery runner and the birthday
//! aggregator; [`SmtpMailSender`] delivers through an SMTP relay with lettre.

pub mod smtp;

pub use smtp::SmtpMailSender;

use crate::domain::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// One message to send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    /// Plain text body; the sender appends the configured footer
    pub body: String,
    pub attachment: Option<PathBuf>,
}

impl OutgoingMail {
    pub fn new(to: Vec<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to,
            subject: subject.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_bcc(mut self, bcc: Vec<String>) -> Self {
        self.bcc = bcc;
        self
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachment = Some(path.into());
        self
    }
}

#[async_trait]
pub trait MailSender: Send + Sync {
    /// # Errors
    ///
    /// Returns `MdError::Mail` when the message cannot be built or sent
    async fn send(&self, mail: &OutgoingMail) -> Result<()>;
}
