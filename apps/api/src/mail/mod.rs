//! Mail delivery for filled exit interview documents.
//!
//! Every submission produces one message, sent from the HR mailbox to itself
//! with the document attached. `AppState` carries the delivery backend as an
//! `Arc<dyn Mailer>` so the pipeline never depends on SMTP directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::{ContentType, ContentTypeErr};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::document::DOCX_MIME;

pub const SUBJECT: &str = "Exit Interview Feedback Form Submission";
pub const BODY: &str = "Please find the attached filled exit interview feedback form.";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Attachment not found: {}", .0.display())]
    MissingAttachment(PathBuf),

    #[error("Failed to read attachment: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Invalid attachment content type: {0}")]
    ContentType(#[from] ContentTypeErr),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Mail delivery timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Delivers a filled document to the HR mailbox.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_document(&self, path: &Path) -> Result<(), MailError>;
}

/// SMTP delivery over STARTTLS with an enforced deadline per message.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    mailbox: Mailbox,
    timeout: Duration,
}

impl SmtpMailer {
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let mailbox: Mailbox = config.sender_email.parse()?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.sender_email.clone(),
                config.sender_password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            mailbox,
            timeout: config.mail_timeout,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_document(&self, path: &Path) -> Result<(), MailError> {
        let attachment = read_attachment(path).await?;
        let message = build_message(&self.mailbox, file_name(path), attachment)?;

        // Bounds the whole exchange; lettre's own timeout is per socket operation.
        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(Ok(response)) => {
                info!(
                    "Sent {} to {} ({:?})",
                    path.display(),
                    self.mailbox.email,
                    response.code()
                );
                Ok(())
            }
            Ok(Err(e)) => Err(MailError::Smtp(e)),
            Err(_) => Err(MailError::Timeout(self.timeout)),
        }
    }
}

async fn read_attachment(path: &Path) -> Result<Vec<u8>, MailError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("File not found: {}. Skipping email sending.", path.display());
            Err(MailError::MissingAttachment(path.to_path_buf()))
        }
        Err(e) => Err(MailError::Io(e)),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "exit_interview.docx".to_string())
}

/// Builds the HR notification: plain-text body plus the document attached
/// under its own file name.
pub fn build_message(
    mailbox: &Mailbox,
    file_name: String,
    attachment: Vec<u8>,
) -> Result<Message, MailError> {
    let content_type = ContentType::parse(DOCX_MIME)?;
    let message = Message::builder()
        .from(mailbox.clone())
        .to(mailbox.clone())
        .subject(SUBJECT)
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(BODY.to_string()))
                .singlepart(Attachment::new(file_name).body(attachment, content_type)),
        )?;
    Ok(message)
}
