use super::client::HttpClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// SendGrid expects `Authorization: Bearer <key>`, Brevo a bare `api-key`
/// header. The header is parsed once at construction.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    value: HeaderValue,
}

impl<C> ApiKey<C> {
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes())
            .with_context(|| format!("invalid header name {header_name}"))?;
        let mut value = HeaderValue::from_str(key).context("API key is not a valid header value")?;
        value.set_sensitive(true);
        Ok(Self {
            inner,
            header_name,
            value,
        })
    }

    /// Uses `Authorization: Bearer <key>`.
    pub fn bearer(inner: C, key: &str) -> Result<Self> {
        Self::new(inner, "Authorization", &format!("Bearer {key}"))
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.value.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Capture(Mutex<Vec<(String, String)>>);

    #[async_trait]
    impl HttpClient for Capture {
        async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect::<Vec<_>>();
            self.0.lock().unwrap().extend(headers);
            Ok(http::Response::new(String::new()).into())
        }
    }

    #[tokio::test]
    async fn test_header_injected() {
        let capture = Arc::new(Capture::default());
        let client = ApiKey::bearer(capture.clone(), "secret").unwrap();
        let req = reqwest::Request::new(
            reqwest::Method::GET,
            "http://localhost/".parse().unwrap(),
        );
        client.execute(req).await.unwrap();

        let seen = capture.0.lock().unwrap();
        assert!(seen.contains(&("authorization".to_string(), "Bearer secret".to_string())));
    }

    #[test]
    fn test_rejects_bad_header() {
        assert!(ApiKey::new((), "bad header", "k").is_err());
        assert!(ApiKey::new((), "api-key", "line\nbreak").is_err());
    }
}
