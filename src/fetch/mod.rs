//! Outbound HTTP used by the notification channels.

mod api_key;
mod basic;
mod client;

pub use api_key::ApiKey;
pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use std::time::Duration;

/// POSTs `body` as JSON and returns the response without checking its status.
pub async fn post_json<C, B>(
    client: &C,
    url: &str,
    body: &B,
    timeout: Option<Duration>,
) -> Result<reqwest::Response>
where
    C: HttpClient + ?Sized,
    B: Serialize + ?Sized,
{
    let mut req = reqwest::Request::new(
        reqwest::Method::POST,
        url.parse().with_context(|| format!("invalid URL {url}"))?,
    );
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    *req.timeout_mut() = timeout;

    Ok(client.execute(req).await?)
}
