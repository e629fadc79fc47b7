//! Outbound mail relay over SMTP.
//!
//! Port 465 speaks TLS from the first byte; any other port starts in plain
//! text and upgrades with STARTTLS when `use_tls` is set. Attachments arrive
//! base64-encoded in the request and are decoded before composition.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Deserialize;

use crate::error::{SyncError, SyncResult};

const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub use_tls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailAttachment {
    pub filename: String,
    pub content_base64: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailData {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub html: bool,
    #[serde(default)]
    pub attachments: Vec<MailAttachment>,
}

#[derive(Clone, Deserialize)]
pub struct SendMailRequest {
    pub smtp: SmtpConfig,
    pub mail: MailData,
}

/// How the SMTP session is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    Implicit,
    StartTls,
    Plain,
}

impl TlsMode {
    pub fn for_config(smtp: &SmtpConfig) -> Self {
        if smtp.port == IMPLICIT_TLS_PORT {
            TlsMode::Implicit
        } else if smtp.use_tls {
            TlsMode::StartTls
        } else {
            TlsMode::Plain
        }
    }
}

impl MailAttachment {
    pub fn mime(&self) -> &str {
        self.content_type.as_deref().unwrap_or("application/octet-stream")
    }

    /// Decoded bytes and MIME type (`application/octet-stream` when unset).
    pub fn decode(&self) -> SyncResult<(Vec<u8>, ContentType)> {
        let compact: String =
            self.content_base64.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD.decode(compact.as_bytes()).map_err(|e| {
            SyncError::Mail(format!("attachment {} is not valid base64: {}", self.filename, e))
        })?;
        let mime = self.mime();
        let ct = ContentType::parse(mime).map_err(|e| {
            let reason = format!("bad content type {}: {}", mime, e);
            SyncError::Mail(format!("attachment {} has {}", self.filename, reason))
        })?;
        Ok((bytes, ct))
    }
}

fn mailbox(raw: &str, role: &str) -> SyncResult<Mailbox> {
    raw.parse::<Mailbox>()
        .map_err(|e| SyncError::Mail(format!("invalid {} '{}': {}", role, raw, e)))
}

/// Compose the message: a plain or HTML body, wrapped in multipart/mixed when
/// there are attachments.
pub fn build_message(mail: &MailData) -> SyncResult<Message> {
    let builder = Message::builder()
        .from(mailbox(&mail.sender, "sender")?)
        .to(mailbox(&mail.recipient, "recipient")?)
        .subject(mail.subject.clone());
    let body = if mail.html {
        SinglePart::html(mail.body.clone())
    } else {
        SinglePart::plain(mail.body.clone())
    };
    let composed = if mail.attachments.is_empty() {
        builder.singlepart(body)
    } else {
        let mut parts = MultiPart::mixed().singlepart(body);
        for att in &mail.attachments {
            let (bytes, ct) = att.decode()?;
            parts = parts.singlepart(Attachment::new(att.filename.clone()).body(bytes, ct));
        }
        builder.multipart(parts)
    };
    composed.map_err(|e| SyncError::Mail(format!("cannot build message: {}", e)))
}

fn transport(smtp: &SmtpConfig, timeout: Duration) -> SyncResult<SmtpTransport> {
    let relay_err = |e: lettre::transport::smtp::Error| {
        SyncError::Mail(format!("cannot set up relay {}: {}", smtp.host, e))
    };
    let builder = match TlsMode::for_config(smtp) {
        TlsMode::Implicit => SmtpTransport::relay(&smtp.host).map_err(relay_err)?,
        TlsMode::StartTls => SmtpTransport::starttls_relay(&smtp.host).map_err(relay_err)?,
        TlsMode::Plain => SmtpTransport::builder_dangerous(&smtp.host),
    };
    Ok(builder
        .port(smtp.port)
        .credentials(Credentials::new(smtp.user.clone(), smtp.password.clone()))
        .timeout(Some(timeout))
        .build())
}

/// Log in and send one message.
pub fn send(req: &SendMailRequest, timeout: Duration) -> SyncResult<()> {
    let message = build_message(&req.mail)?;
    let mode = TlsMode::for_config(&req.smtp);
    tracing::debug!("sending mail via {}:{} ({:?})", req.smtp.host, req.smtp.port, mode);
    let mailer = transport(&req.smtp, timeout)?;
    mailer.send(&message).map_err(|e| {
        let relay = format!("{}:{}", req.smtp.host, req.smtp.port);
        SyncError::Mail(format!("relay {} rejected the message: {}", relay, e))
    })?;
    tracing::info!("mail to {} sent via {}", req.mail.recipient, req.smtp.host);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp(port: u16, use_tls: bool) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".into(),
            port,
            user: "u".into(),
            password: "p".into(),
            use_tls,
        }
    }

    fn mail() -> MailData {
        MailData {
            sender: "Reports <reports@example.com>".into(),
            recipient: "ops@example.com".into(),
            subject: "Daily files".into(),
            body: "See attached.".into(),
            html: false,
            attachments: vec![],
        }
    }

    #[test]
    fn tls_mode_follows_port_then_flag() {
        assert_eq!(TlsMode::for_config(&smtp(465, false)), TlsMode::Implicit);
        assert_eq!(TlsMode::for_config(&smtp(465, true)), TlsMode::Implicit);
        assert_eq!(TlsMode::for_config(&smtp(587, true)), TlsMode::StartTls);
        assert_eq!(TlsMode::for_config(&smtp(25, false)), TlsMode::Plain);
    }

    #[test]
    fn plain_message_has_headers() {
        let msg = build_message(&mail()).unwrap();
        let text = String::from_utf8(msg.formatted()).unwrap();
        assert!(text.contains("Subject: Daily files"));
        assert!(text.contains("To: ops@example.com"));
        assert!(text.contains("See attached."));
    }

    #[test]
    fn attachment_makes_multipart() {
        let mut m = mail();
        m.attachments.push(MailAttachment {
            filename: "a.csv".into(),
            content_base64: STANDARD.encode(b"x,y\n1,2\n"),
            content_type: Some("text/csv".into()),
        });
        let text = String::from_utf8(build_message(&m).unwrap().formatted()).unwrap();
        assert!(text.contains("multipart/mixed"));
        assert!(text.contains("a.csv"));
    }

    #[test]
    fn bad_base64_names_the_attachment() {
        let att = MailAttachment {
            filename: "broken.bin".into(),
            content_base64: "***".into(),
            content_type: None,
        };
        let err = att.decode().unwrap_err();
        assert!(err.to_string().contains("broken.bin"));
    }

    #[test]
    fn decode_defaults_content_type() {
        let att = MailAttachment {
            filename: "f".into(),
            content_base64: "aGVs\nbG8=".into(),
            content_type: None,
        };
        assert_eq!(att.mime(), "application/octet-stream");
        let (bytes, _) = att.decode().unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn bad_recipient_is_a_mail_error() {
        let mut m = mail();
        m.recipient = "not an address".into();
        assert!(matches!(build_message(&m), Err(SyncError::Mail(_))));
    }
}
