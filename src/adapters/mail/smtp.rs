//! SMTP mail sender

use super::{MailSender, OutgoingMail};
use crate::config::MailConfig;
use crate::domain::{MdError, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MessageBuilder, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use std::path::Path;
use std::time::Duration;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SmtpMailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    footer: String,
}

impl SmtpMailSender {
    /// # Errors
    ///
    /// Returns `MdError::Configuration` when the sender address does not
    /// parse or the relay cannot be configured
    pub fn new(config: &MailConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| MdError::Configuration(format!("Invalid mail.from: {e}")))?;

        let mut builder = if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| MdError::Configuration(format!("Invalid mail.host: {e}")))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        builder = builder.port(config.port).timeout(Some(SMTP_TIMEOUT));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().as_ref().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
            footer: config.footer.clone(),
        })
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, mail: &OutgoingMail) -> Result<()> {
        let message = build_message(&self.from, &self.footer, mail).await?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MdError::Mail(format!("SMTP send failed: {e}")))?;

        tracing::info!(
            to = ?mail.to,
            bcc = mail.bcc.len(),
            subject = %mail.subject,
            "Mail sent"
        );
        Ok(())
    }
}

fn parse_mailboxes(addresses: &[String]) -> Result<Vec<Mailbox>> {
    addresses
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(|a| {
            a.parse::<Mailbox>()
                .map_err(|e| MdError::Mail(format!("invalid address '{a}': {e}")))
        })
        .collect()
}

async fn build_message(from: &Mailbox, footer: &str, mail: &OutgoingMail) -> Result<Message> {
    let to = parse_mailboxes(&mail.to)?;
    if to.is_empty() {
        return Err(MdError::Mail("message has no recipients".to_string()));
    }

    let mut builder: MessageBuilder = Message::builder().from(from.clone()).subject(&mail.subject);
    for mailbox in to {
        builder = builder.to(mailbox);
    }
    for mailbox in parse_mailboxes(&mail.bcc)? {
        builder = builder.bcc(mailbox);
    }

    let body = format!("{}{}", mail.body, footer);
    let message = match &mail.attachment {
        None => builder.header(ContentType::TEXT_PLAIN).body(body),
        Some(path) => {
            let content = tokio::fs::read(path).await?;
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body))
                    .singlepart(
                        Attachment::new(attachment_name(path)).body(content, ContentType::TEXT_PLAIN),
                    ),
            )
        }
    };
    message.map_err(|e| MdError::Mail(format!("failed to build message: {e}")))
}

fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment.txt".to_string())
}
