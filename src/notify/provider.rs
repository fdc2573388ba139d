//! Transactional email APIs.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

use super::channel::{Channel, ensure_accepted};
use super::message::{Attachment, OutgoingMessage};
use crate::fetch::{ApiKey, HttpClient, post_json};

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const BREVO_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// SendGrid v3 mail API, the primary provider.
pub struct SendGridChannel {
    client: ApiKey<Arc<dyn HttpClient>>,
    endpoint: String,
}

impl SendGridChannel {
    pub fn new(client: Arc<dyn HttpClient>, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: ApiKey::bearer(client, api_key)?,
            endpoint: SENDGRID_URL.to_string(),
        })
    }

    fn payload(message: &OutgoingMessage, attachment: Option<&Attachment>) -> Value {
        let mut payload = json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": message.from },
            "subject": message.subject,
            "content": [
                { "type": "text/plain", "value": message.body },
                { "type": "text/html", "value": message.html_body() },
            ],
        });
        if let Some(attachment) = attachment {
            payload["attachments"] = json!([{
                "content": attachment.base64(),
                "filename": attachment.filename,
                "type": attachment.content_type,
                "disposition": "attachment",
            }]);
        }
        payload
    }
}

#[async_trait]
impl Channel for SendGridChannel {
    fn name(&self) -> &'static str {
        "sendgrid"
    }

    async fn send(&self, message: &OutgoingMessage, attachment: Option<&Attachment>) -> Result<()> {
        debug!(recipient = %message.to, "Sending through SendGrid");
        let payload = Self::payload(message, attachment);
        let resp = post_json(&self.client, &self.endpoint, &payload, None).await?;
        ensure_accepted(self.name(), resp).await
    }
}

/// Brevo (formerly Sendinblue) transactional API, the secondary provider.
pub struct BrevoChannel {
    client: ApiKey<Arc<dyn HttpClient>>,
    endpoint: String,
}

impl BrevoChannel {
    pub fn new(client: Arc<dyn HttpClient>, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: ApiKey::new(client, "api-key", api_key)?,
            endpoint: BREVO_URL.to_string(),
        })
    }

    fn payload(message: &OutgoingMessage, attachment: Option<&Attachment>) -> Value {
        let mut to = json!({ "email": message.to });
        if !message.recipient_name.is_empty() {
            to["name"] = json!(message.recipient_name);
        }
        let mut payload = json!({
            "sender": { "email": message.from },
            "to": [to],
            "subject": message.subject,
            "textContent": message.body,
            "htmlContent": message.html_body(),
        });
        if let Some(attachment) = attachment {
            payload["attachment"] = json!([{
                "content": attachment.base64(),
                "name": attachment.filename,
            }]);
        }
        payload
    }
}

#[async_trait]
impl Channel for BrevoChannel {
    fn name(&self) -> &'static str {
        "brevo"
    }

    async fn send(&self, message: &OutgoingMessage, attachment: Option<&Attachment>) -> Result<()> {
        debug!(recipient = %message.to, "Sending through Brevo");
        let payload = Self::payload(message, attachment);
        let resp = post_json(&self.client, &self.endpoint, &payload, None).await?;
        ensure_accepted(self.name(), resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            to: "maria@example.com".to_string(),
            from: "school@example.com".to_string(),
            subject: "Grade report - Ana".to_string(),
            body: "Hello".to_string(),
            recipient_name: "Maria".to_string(),
            ..Default::default()
        }
    }

    fn attachment() -> Attachment {
        Attachment {
            filename: "report.pdf".to_string(),
            content_type: "application/pdf",
            content: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_sendgrid_payload() {
        let payload = SendGridChannel::payload(&message(), Some(&attachment()));
        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "maria@example.com");
        assert_eq!(payload["content"][0]["value"], "Hello");
        assert_eq!(payload["attachments"][0]["filename"], "report.pdf");
        assert_eq!(payload["attachments"][0]["content"], "AQID");
    }

    #[test]
    fn test_brevo_payload() {
        let payload = BrevoChannel::payload(&message(), None);
        assert_eq!(payload["to"][0]["name"], "Maria");
        assert_eq!(payload["textContent"], "Hello");
        assert!(payload.get("attachment").is_none());
    }
}
