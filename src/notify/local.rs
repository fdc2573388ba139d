//! Local copies of every notification.
//!
//! The index page only lists timestamps and subjects; full content goes to a
//! per-recipient page whose name is the SHA-256 of the recipient address.

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::message::{OutgoingMessage, escape_html, fill_template};
use crate::output::append_record;

const PAGE_TEMPLATE: &str = include_str!("templates/record_page.html");
const ENTRY_TEMPLATE: &str = include_str!("templates/record_entry.html");

const INDEX_INTRO: &str = "<p class=\"notice\">This register only lists when notifications were sent. \
Their content is confidential and stored separately for each recipient.</p>";

#[derive(Serialize)]
struct LogRow<'a> {
    timestamp: String,
    status: &'a str,
    channel: &'a str,
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

#[derive(Debug, Clone)]
pub struct LocalRecordStore {
    root: PathBuf,
}

impl LocalRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("notifications.html")
    }

    pub fn recipient_path(&self, email: &str) -> PathBuf {
        let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
        self.root
            .join("notifications")
            .join(format!("{}.html", hex::encode(digest)))
    }

    pub fn log_path(&self) -> PathBuf {
        self.root.join("sent_emails.csv")
    }

    /// Appends the message to the index and the recipient page, which form
    /// the record. The CSV log is best effort.
    pub fn record(&self, message: &OutgoingMessage) -> Result<()> {
        let timestamp = Local::now().format("%d-%m-%Y %H:%M:%S").to_string();

        let index_entry = fill_entry(
            &timestamp,
            "",
            &message.subject,
            "<p><em>Notification sent. Its content is available to the recipient only.</em></p>",
        );
        append_page(&self.index_path(), "Notification register", INDEX_INTRO, &index_entry)?;

        let addressing = format!(
            "<strong>From:</strong> {}<br><strong>To:</strong> {}<br>",
            escape_html(&message.from),
            escape_html(&message.to)
        );
        let full_entry = fill_entry(&timestamp, &addressing, &message.subject, &message.html_body());
        let title = format!("Notifications for {}", escape_html(&message.to));
        append_page(&self.recipient_path(&message.to), &title, "", &full_entry)?;

        if let Err(e) = self.log(message, "queued", "") {
            warn!(error = %e, path = %self.log_path().display(), "Could not append to the notification log");
        }
        debug!(recipient = %message.to, "Notification recorded locally");
        Ok(())
    }

    /// Notes which channel delivered the message.
    pub fn log_delivery(&self, message: &OutgoingMessage, channel: &str) -> Result<()> {
        self.log(message, "delivered", channel)
    }

    fn log(&self, message: &OutgoingMessage, status: &str, channel: &str) -> Result<()> {
        let row = LogRow {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            status,
            channel,
            from: &message.from,
            to: &message.to,
            subject: &message.subject,
            body: if status == "queued" { message.body.as_str() } else { "" },
        };
        append_record(&self.log_path(), &row)
    }
}

fn fill_entry(timestamp: &str, addressing: &str, subject: &str, content: &str) -> String {
    fill_template(
        ENTRY_TEMPLATE,
        &[
            ("timestamp", timestamp),
            ("addressing", addressing),
            ("subject", escape_html(subject).as_str()),
            ("content", content),
        ],
    )
}

/// Appends `entry` to the page at `path`, writing the page header first if
/// the file is new.
fn append_page(path: &Path, title: &str, intro: &str, entry: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let exists = path.exists();
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;

    if !exists {
        let header = fill_template(PAGE_TEMPLATE, &[("title", title), ("intro", intro)]);
        file.write_all(header.as_bytes())?;
    }
    file.write_all(entry.as_bytes())?;
    Ok(())
}
