use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// A message addressed to one guardian.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    /// Plain-text body, stored verbatim in the local log.
    pub body: String,
    /// A complete HTML document to send and print instead of the
    /// plain-text body (consent forms).
    pub document: Option<String>,
    pub recipient_name: String,
    pub student_name: String,
}

impl OutgoingMessage {
    /// Body as HTML: the document when one is set, otherwise the escaped text
    /// with line breaks.
    pub fn html_body(&self) -> String {
        match &self.document {
            Some(document) => document.clone(),
            None => escape_html(&self.body).replace('\n', "<br>"),
        }
    }
}

/// A file sent along with a message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

impl Attachment {
    pub async fn from_path(path: &Path) -> Result<Self> {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("cannot read attachment {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let content_type = match path.extension().and_then(|e| e.to_str()) {
            Some("pdf") => "application/pdf",
            Some("html") => "text/html",
            _ => "application/octet-stream",
        };
        Ok(Self {
            filename,
            content_type,
            content,
        })
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.content)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Substitutes `{{key}}` placeholders in one pass, so values are never
/// scanned for further placeholders. Unknown keys are left as they are.
pub(crate) fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };
        let key = &after[..end];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
