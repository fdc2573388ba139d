use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::channel::{Channel, ensure_accepted};
use super::message::{Attachment, OutgoingMessage};
use crate::fetch::{HttpClient, post_json};

/// Posts the message as JSON to a user-provided endpoint (Zapier, Make,
/// a relay of their own).
pub struct WebhookChannel {
    client: Arc<dyn HttpClient>,
    url: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    subject: &'a str,
    body: String,
    from: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment_type: Option<&'a str>,
}

impl WebhookChannel {
    pub fn new(client: Arc<dyn HttpClient>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &OutgoingMessage, attachment: Option<&Attachment>) -> Result<()> {
        let payload = WebhookPayload {
            to: &message.to,
            subject: &message.subject,
            body: message.html_body(),
            from: &message.from,
            attachment_name: attachment.map(|a| a.filename.as_str()),
            attachment_content: attachment.map(Attachment::base64),
            attachment_type: attachment.map(|a| a.content_type),
        };
        debug!(url = %self.url, attachment = attachment.is_some(), "Posting to webhook");

        let resp = post_json(self.client.as_ref(), &self.url, &payload, Some(self.timeout)).await?;
        ensure_accepted(self.name(), resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Answers with a fixed status and keeps the JSON bodies it saw.
    struct Recorder {
        status: u16,
        bodies: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl HttpClient for Recorder {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            assert_eq!(req.timeout(), Some(&Duration::from_secs(10)));
            let bytes = req.body().and_then(|b| b.as_bytes()).unwrap_or_default();
            self.bodies
                .lock()
                .unwrap()
                .push(serde_json::from_slice(bytes).unwrap());
            let resp = http::Response::builder()
                .status(self.status)
                .body(String::new())
                .unwrap();
            Ok(resp.into())
        }
    }

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            to: "maria@example.com".to_string(),
            from: "school@example.com".to_string(),
            subject: "Grade report - Ana".to_string(),
            body: "Dear parent\nMath: 9".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_payload_shape() {
        let recorder = Arc::new(Recorder {
            status: 201,
            bodies: Mutex::new(Vec::new()),
        });
        let channel = WebhookChannel::new(recorder.clone(), "http://hook.local/", Duration::from_secs(10));
        let attachment = Attachment {
            filename: "a.pdf".to_string(),
            content_type: "application/pdf",
            content: b"%PDF".to_vec(),
        };

        channel.send(&message(), Some(&attachment)).await.unwrap();

        let bodies = recorder.bodies.lock().unwrap();
        let sent = &bodies[0];
        assert_eq!(sent["to"], "maria@example.com");
        assert_eq!(sent["body"], "Dear parent<br>Math: 9");
        assert_eq!(sent["attachment_name"], "a.pdf");
        assert_eq!(sent["attachment_content"], "JVBERg==");
        assert_eq!(sent["attachment_type"], "application/pdf");
    }

    #[tokio::test]
    async fn test_non_accepted_status_is_error() {
        let recorder = Arc::new(Recorder {
            status: 500,
            bodies: Mutex::new(Vec::new()),
        });
        let channel = WebhookChannel::new(recorder, "http://hook.local/", Duration::from_secs(10));
        let err = channel.send(&message(), None).await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
