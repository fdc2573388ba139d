use anyhow::{Result, bail};
use async_trait::async_trait;

use super::message::{Attachment, OutgoingMessage};

/// One delivery mechanism of the fallback chain.
///
/// A channel gets exactly one attempt per message; any error means "try the
/// next one".
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &OutgoingMessage, attachment: Option<&Attachment>) -> Result<()>;
}

/// Accepts 200, 201 and 202; anything else becomes an error carrying the
/// response text.
pub(crate) async fn ensure_accepted(channel: &str, resp: reqwest::Response) -> Result<()> {
    let status = resp.status();
    if matches!(status.as_u16(), 200..=202) {
        return Ok(());
    }
    let text = resp.text().await.unwrap_or_default();
    bail!("{channel} answered {status}: {text}")
}
