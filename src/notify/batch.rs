use std::time::Duration;
use tracing::{info, warn};

use super::{DispatchReport, Dispatcher, OutgoingMessage};
use crate::report::{NotificationOptions, guardian_digests};
use crate::store::GradeBook;

#[derive(Debug, Clone)]
pub struct RecipientOutcome {
    pub email: String,
    pub status: String,
}

/// Totals of a notification batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Guardians considered, including skipped ones.
    pub total: usize,
    /// Delivered by one of the channels.
    pub delivered: usize,
    /// Delivered or kept locally.
    pub handled: usize,
    pub failed: usize,
    /// Guardians whose students have no grades.
    pub skipped: usize,
    pub details: Vec<RecipientOutcome>,
}

impl BatchSummary {
    pub fn record(&mut self, report: &DispatchReport) {
        if report.email_delivered() {
            self.delivered += 1;
        }
        if report.is_handled() {
            self.handled += 1;
        } else {
            self.failed += 1;
        }
        self.details.push(RecipientOutcome {
            email: report.recipient.clone(),
            status: describe(report),
        });
    }
}

fn describe(report: &DispatchReport) -> String {
    let mut parts = Vec::new();
    if report.local_saved {
        parts.push("Notification saved".to_string());
    }
    if let Some(path) = &report.artifact {
        parts.push(format!("Artifact {}", path.display()));
    }
    match report.delivered_via {
        Some(channel) => parts.push(format!("Email sent via {channel}")),
        None => parts.push("Email unavailable".to_string()),
    }
    parts.join(", ")
}

/// Sends every guardian of the selected students (all when empty) one
/// message, sequentially, pausing `throttle` between recipients.
#[tracing::instrument(skip(dispatcher, book, options))]
pub async fn notify_guardians(
    dispatcher: &Dispatcher,
    book: &GradeBook,
    student_ids: &[u32],
    options: &NotificationOptions,
    throttle: Duration,
) -> BatchSummary {
    let digests = guardian_digests(book, student_ids);
    let mut summary = BatchSummary {
        total: digests.len(),
        ..Default::default()
    };

    let sendable: Vec<_> = digests.into_iter().filter(|d| d.has_grades()).collect();
    summary.skipped = summary.total - sendable.len();

    for (i, digest) in sendable.iter().enumerate() {
        if i > 0 && !throttle.is_zero() {
            tokio::time::sleep(throttle).await;
        }

        let message = OutgoingMessage {
            to: digest.email.clone(),
            from: dispatcher.sender().to_string(),
            subject: digest.subject_line(),
            body: digest.compose_body(options),
            document: None,
            recipient_name: digest.guardian_name.clone(),
            student_name: digest.first_student().to_string(),
        };
        let report = dispatcher.dispatch(&message).await;
        if !report.is_handled() {
            warn!(recipient = %digest.email, "Notification could not be handled");
        }
        summary.record(&report);
    }

    info!(
        total = summary.total,
        delivered = summary.delivered,
        handled = summary.handled,
        failed = summary.failed,
        skipped = summary.skipped,
        "Notification batch finished"
    );
    summary
}
