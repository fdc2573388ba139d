//! Notification dispatch.
//!
//! Every message is first recorded locally and rendered as a printable
//! artifact; then the configured channels are tried in order until one
//! accepts it. Channel failures are logged and never surface as errors.

mod artifact;
mod batch;
mod channel;
mod local;
mod message;
mod provider;
mod webhook;

pub use artifact::ArtifactRenderer;
pub use batch::{BatchSummary, RecipientOutcome, notify_guardians};
pub use channel::Channel;
pub use local::LocalRecordStore;
pub use message::{Attachment, OutgoingMessage};
pub use provider::{BrevoChannel, SendGridChannel};
pub use webhook::WebhookChannel;

pub(crate) use artifact::safe_name;
pub(crate) use message::{escape_html, fill_template};

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::DispatchConfig;
use crate::fetch::{BasicClient, HttpClient};

/// What happened to one message.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub recipient: String,
    pub local_saved: bool,
    /// PDF, or HTML when PDF conversion was unavailable.
    pub artifact: Option<PathBuf>,
    /// Name of the channel that accepted the message.
    pub delivered_via: Option<&'static str>,
}

impl DispatchReport {
    pub fn email_delivered(&self) -> bool {
        self.delivered_via.is_some()
    }

    /// Delivered, or at least kept somewhere a person can forward it from.
    pub fn is_handled(&self) -> bool {
        self.email_delivered() || self.local_saved || self.artifact.is_some()
    }
}

pub struct Dispatcher {
    sender: String,
    local: LocalRecordStore,
    artifacts: ArtifactRenderer,
    channels: Vec<Box<dyn Channel>>,
}

impl Dispatcher {
    /// A dispatcher with no channels: messages are only kept locally.
    pub fn new(sender: impl Into<String>, local: LocalRecordStore, artifacts: ArtifactRenderer) -> Self {
        Self {
            sender: sender.into(),
            local,
            artifacts,
            channels: Vec::new(),
        }
    }

    /// Appends a channel to the end of the chain.
    pub fn with_channel(mut self, channel: impl Channel + 'static) -> Self {
        self.channels.push(Box::new(channel));
        self
    }

    pub fn from_config(config: &DispatchConfig) -> Result<Self> {
        Self::from_config_with_client(config, Arc::new(BasicClient::new()))
    }

    /// Builds the chain webhook, primary provider, secondary provider from
    /// whatever `config` has credentials for.
    pub fn from_config_with_client(config: &DispatchConfig, client: Arc<dyn HttpClient>) -> Result<Self> {
        let mut dispatcher = Self::new(
            config.sender.clone(),
            LocalRecordStore::new(&config.data_dir),
            ArtifactRenderer::new(
                config.data_dir.join("notifications_pdf"),
                config.pdf_converter.clone(),
            ),
        );

        if let Some(url) = &config.webhook_url {
            dispatcher = dispatcher.with_channel(WebhookChannel::new(
                client.clone(),
                url.clone(),
                config.webhook_timeout(),
            ));
        }
        if let Some(key) = &config.primary_api_key {
            dispatcher = dispatcher.with_channel(SendGridChannel::new(client.clone(), key)?);
        }
        if let Some(key) = &config.secondary_api_key {
            dispatcher = dispatcher.with_channel(BrevoChannel::new(client, key)?);
        }

        info!(channels = ?dispatcher.channel_names(), "Dispatcher ready");
        Ok(dispatcher)
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn artifacts(&self) -> &ArtifactRenderer {
        &self.artifacts
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    #[tracing::instrument(skip_all, fields(recipient = %message.to))]
    pub async fn dispatch(&self, message: &OutgoingMessage) -> DispatchReport {
        let mut report = DispatchReport {
            recipient: message.to.clone(),
            ..Default::default()
        };

        match self.local.record(message) {
            Ok(()) => report.local_saved = true,
            Err(e) => error!(error = %e, "Could not record notification locally"),
        }

        match self.artifacts.render_message(message).await {
            Ok(path) => report.artifact = Some(path),
            Err(e) => error!(error = %e, "Could not render notification artifact"),
        }

        let attachment = match &report.artifact {
            Some(path) => match Attachment::from_path(path).await {
                Ok(attachment) => Some(attachment),
                Err(e) => {
                    warn!(error = %e, "Sending without attachment");
                    None
                }
            },
            None => None,
        };

        for channel in &self.channels {
            match channel.send(message, attachment.as_ref()).await {
                Ok(()) => {
                    info!(channel = channel.name(), "Notification delivered");
                    report.delivered_via = Some(channel.name());
                    if let Err(e) = self.local.log_delivery(message, channel.name()) {
                        warn!(error = %e, "Could not log delivery");
                    }
                    break;
                }
                Err(e) => warn!(channel = channel.name(), error = %e, "Channel failed, trying next"),
            }
        }

        if !report.email_delivered() {
            warn!(
                artifact = ?report.artifact,
                "Email not delivered; notification kept for manual distribution"
            );
        }
        report
    }
}
