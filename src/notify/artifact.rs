//! Printable copies of notifications.
//!
//! HTML is converted to PDF with headless Chrome/Chromium. When no browser is
//! available or the conversion fails, the HTML file itself is kept as the
//! artifact.

use anyhow::{Context, Result, bail};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::message::{OutgoingMessage, escape_html, fill_template};

const DOCUMENT_TEMPLATE: &str = include_str!("templates/notification_document.html");

const CHROME_CANDIDATES: [&str; 8] = [
    "google-chrome",
    "chrome",
    "chromium",
    "chromium-browser",
    "google-chrome-stable",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "C:\\Program Files\\Google\\Chrome\\Application\\chrome.exe",
    "C:\\Program Files (x86)\\Google\\Chrome\\Application\\chrome.exe",
];

#[derive(Debug, Clone)]
pub struct ArtifactRenderer {
    output_dir: PathBuf,
    converter: Option<String>,
    /// Numbers artifacts so messages rendered within one second stay apart.
    sequence: Arc<AtomicU32>,
}

impl ArtifactRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, converter: Option<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            converter,
            sequence: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Renders the printable copy of `message` and returns its path.
    pub async fn render_message(&self, message: &OutgoingMessage) -> Result<PathBuf> {
        let document = match &message.document {
            Some(document) => document.clone(),
            None => notification_document(message),
        };
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let stem = format!(
            "{}_{sequence:03}_{}_{}",
            Local::now().format("%Y%m%d_%H%M%S"),
            safe_name(&message.student_name),
            safe_name(&message.to)
        );
        self.render(&document, &stem).await
    }

    /// Writes `html` as `<stem>.pdf`, falling back to `<stem>.html`.
    pub async fn render(&self, html: &str, stem: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("cannot create {}", self.output_dir.display()))?;

        let html_path = self.output_dir.join(format!("{stem}.html"));
        tokio::fs::write(&html_path, html)
            .await
            .with_context(|| format!("cannot write {}", html_path.display()))?;

        let pdf_path = self.output_dir.join(format!("{stem}.pdf"));
        match self.convert(&html_path, &pdf_path).await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&html_path).await;
                info!(path = %pdf_path.display(), "PDF artifact written");
                Ok(pdf_path)
            }
            Err(e) => {
                warn!(error = %e, path = %html_path.display(), "PDF conversion failed, keeping HTML");
                Ok(html_path)
            }
        }
    }

    /// Like [`Self::render`] but fails instead of falling back to HTML.
    pub async fn render_pdf(&self, html: &str, stem: &str) -> Result<PathBuf> {
        let path = self.render(html, stem).await?;
        if path.extension().is_some_and(|e| e == "pdf") {
            Ok(path)
        } else {
            bail!("no PDF converter available")
        }
    }

    async fn convert(&self, html_path: &Path, pdf_path: &Path) -> Result<()> {
        let chrome = match &self.converter {
            Some(converter) => converter.clone(),
            None => detect_chrome().await.context("Chrome/Chromium not found")?,
        };
        debug!(converter = %chrome, "Converting HTML to PDF");

        let status = Command::new(&chrome)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--run-all-compositor-stages-before-draw")
            .arg(format!("--print-to-pdf={}", pdf_path.display()))
            .arg(format!("file://{}", html_path.canonicalize()?.display()))
            .stderr(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .await
            .with_context(|| format!("cannot run {chrome}"))?;

        if !status.success() || !pdf_path.exists() {
            bail!("{chrome} exited with {status}");
        }
        Ok(())
    }
}

async fn detect_chrome() -> Option<String> {
    for candidate in CHROME_CANDIDATES {
        let found = Command::new(candidate)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|s| s.success());
        if found {
            return Some(candidate.to_string());
        }
    }
    None
}

fn notification_document(message: &OutgoingMessage) -> String {
    fill_template(
        DOCUMENT_TEMPLATE,
        &[
            ("subject", escape_html(&message.subject).as_str()),
            ("recipient_name", escape_html(&message.recipient_name).as_str()),
            ("student_name", escape_html(&message.student_name).as_str()),
            ("content", message.html_body().as_str()),
            ("generated_at", Local::now().format("%d.%m.%Y, %H:%M").to_string().as_str()),
        ],
    )
}

/// Keeps file names portable: anything but ASCII alphanumerics becomes `_`.
pub(crate) fn safe_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_safe_name() {
        assert_eq!(safe_name("maria.pop@example.com"), "maria_pop_example_com");
        assert_eq!(safe_name("Ana-Maria Ionescu"), "Ana_Maria_Ionescu");
        assert_eq!(safe_name("  "), "unnamed");
    }

    #[tokio::test]
    async fn test_falls_back_to_html() {
        let dir = tempdir().unwrap();
        let renderer = ArtifactRenderer::new(
            dir.path(),
            Some("/nonexistent/chrome-for-tests".to_string()),
        );
        let message = OutgoingMessage {
            to: "maria@example.com".to_string(),
            subject: "Grade report - Ana".to_string(),
            body: "Math: 9".to_string(),
            recipient_name: "Maria".to_string(),
            student_name: "Ana".to_string(),
            ..Default::default()
        };

        let path = renderer.render_message(&message).await.unwrap();
        assert_eq!(path.extension().unwrap(), "html");
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains("Regarding student: <strong>Ana</strong>"));
        assert!(html.contains("Math: 9"));

        assert!(renderer.render_pdf("<p>x</p>", "form").await.is_err());
    }

    #[tokio::test]
    async fn test_same_student_and_recipient_get_separate_files() {
        let dir = tempdir().unwrap();
        let renderer = ArtifactRenderer::new(
            dir.path(),
            Some("/nonexistent/chrome-for-tests".to_string()),
        );
        let message = |body: &str| OutgoingMessage {
            to: "maria@example.com".to_string(),
            body: body.to_string(),
            student_name: "Ana".to_string(),
            ..Default::default()
        };

        let first = renderer.render_message(&message("first")).await.unwrap();
        let second = renderer.render_message(&message("second")).await.unwrap();

        assert_ne!(first, second);
        assert!(std::fs::read_to_string(&first).unwrap().contains("first"));
        assert!(std::fs::read_to_string(&second).unwrap().contains("second"));
    }
}
