//! Consent forms sent to guardians.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::Student;
use crate::notify::{
    ArtifactRenderer, BatchSummary, Dispatcher, OutgoingMessage, escape_html, fill_template, safe_name,
};
use crate::store::GradeBook;

const FORM_TEMPLATE_FILE: &str = "gdpr_form_template.json";
const FORM_HTML: &str = include_str!("templates/consent_form.html");

const SIGNATURE_BLOCK: &str = r#"        <div class="signature-area">
            <div>
                <p><strong>Parent/guardian name:</strong></p>
                <p class="signature-field">{{guardian_name}}</p>
                <p><strong>Date:</strong></p>
                <p class="signature-field">{{date}}</p>
            </div>
            <div>
                <p><strong>Signature:</strong></p>
                <p class="signature-field">&nbsp;</p>
            </div>
        </div>"#;

/// Editable texts of the consent form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormTemplate {
    pub title: String,
    pub intro: String,
    pub data_collected: String,
    pub purpose: String,
    pub rights: String,
    pub contact: String,
    pub updated_at: Option<String>,
}

impl Default for FormTemplate {
    fn default() -> Self {
        Self {
            title: "GDPR consent form".to_string(),
            intro: "Under Regulation (EU) 2016/679 on the protection of natural persons with regard \
                    to the processing of personal data and on the free movement of such data (GDPR), \
                    we inform you about how your data and your child's data are processed in the grade book."
                .to_string(),
            data_collected: "The grade book stores the following personal data: the student's name and \
                             class, the parent/guardian's name and email address, and the grades obtained \
                             in each subject."
                .to_string(),
            purpose: "The data is used only to manage the student's school records, to send academic \
                      results to parents, and to produce anonymised class and school statistics."
                .to_string(),
            rights: "Under the GDPR you have the right of access, rectification, erasure, restriction of \
                     processing and data portability, and the right to withdraw your consent."
                .to_string(),
            contact: "For any question or request about data protection please contact the school's data \
                      protection officer by email or phone."
                .to_string(),
            updated_at: None,
        }
    }
}

impl FormTemplate {
    /// The saved template, or the built-in texts when none was saved.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(FORM_TEMPLATE_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("invalid {}", path.display()))
    }

    pub fn save(&mut self, data_dir: &Path) -> Result<()> {
        self.updated_at = Some(Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S").to_string());
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(FORM_TEMPLATE_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), "Consent form template saved");
        Ok(())
    }
}

/// The form personalised for one student's guardian.
pub fn render_form_html(
    student: &Student,
    template: &FormTemplate,
    include_signature: bool,
    date: NaiveDate,
) -> String {
    let date = date.format("%d.%m.%Y").to_string();
    let guardian_name = escape_html(&student.guardian_name);
    let signature = if include_signature { SIGNATURE_BLOCK } else { "" };
    let html = FORM_HTML.replace("{{signature_block}}", signature);
    fill_template(
        &html,
        &[
            ("title", escape_html(&template.title).as_str()),
            ("date", date.as_str()),
            ("guardian_name", guardian_name.as_str()),
            ("student_name", escape_html(&student.name).as_str()),
            ("class_name", escape_html(&student.class_name).as_str()),
            ("intro", escape_html(&template.intro).as_str()),
            ("data_collected", escape_html(&template.data_collected).as_str()),
            ("purpose", escape_html(&template.purpose).as_str()),
            ("rights", escape_html(&template.rights).as_str()),
            ("contact", escape_html(&template.contact).as_str()),
        ],
    )
}

fn form_stem(student: &Student, date: NaiveDate) -> String {
    format!(
        "gdpr_form_{}_{}_{}",
        student.id,
        safe_name(&student.name),
        date.format("%Y%m%d")
    )
}

/// Renders the form of one student as PDF. Fails when no converter is
/// available.
pub async fn render_form_pdf(
    renderer: &ArtifactRenderer,
    student: &Student,
    template: &FormTemplate,
    include_signature: bool,
) -> Result<PathBuf> {
    let today = Local::now().date_naive();
    let html = render_form_html(student, template, include_signature, today);
    renderer.render_pdf(&html, &form_stem(student, today)).await
}

/// Zips the printable forms of every student. Each form is a PDF, or HTML
/// when PDF conversion is unavailable.
pub async fn forms_archive(
    renderer: &ArtifactRenderer,
    book: &GradeBook,
    template: &FormTemplate,
    include_signature: bool,
) -> Result<Vec<u8>> {
    let today = Local::now().date_naive();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for student in book.students_sorted() {
        let html = render_form_html(student, template, include_signature, today);
        let path = match renderer.render(&html, &form_stem(student, today)).await {
            Ok(path) => path,
            Err(e) => {
                warn!(student_id = student.id, error = %e, "Skipping consent form");
                continue;
            }
        };
        let content = tokio::fs::read(&path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.html", form_stem(student, today)));
        zip.start_file(name, options)?;
        zip.write_all(&content)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn form_email_text(student: &Student) -> String {
    format!(
        "DATA PROTECTION NOTICE (GDPR)\n\n\
         Dear parent/guardian of {},\n\n\
         Under Regulation (EU) 2016/679 (GDPR) we inform you that your personal data and your \
         child's are processed in the grade book.\n\n\
         Please read the attached document for the full notice and to give your consent.\n\n\
         Kind regards,\n\
         School management",
        student.name
    )
}

/// Emails every guardian their personalised consent form.
#[tracing::instrument(skip_all)]
pub async fn send_forms(
    dispatcher: &Dispatcher,
    book: &GradeBook,
    template: &FormTemplate,
    throttle: Duration,
) -> BatchSummary {
    let today = Local::now().date_naive();
    let students: Vec<&Student> = book
        .students_sorted()
        .into_iter()
        .filter(|s| !s.guardian_email.trim().is_empty())
        .collect();

    let mut summary = BatchSummary {
        total: students.len(),
        ..Default::default()
    };
    for (i, student) in students.into_iter().enumerate() {
        if i > 0 && !throttle.is_zero() {
            tokio::time::sleep(throttle).await;
        }
        let message = OutgoingMessage {
            to: student.guardian_email.trim().to_string(),
            from: dispatcher.sender().to_string(),
            subject: format!("GDPR notice - {}", student.name),
            body: form_email_text(student),
            document: Some(render_form_html(student, template, true, today)),
            recipient_name: student.guardian_name.clone(),
            student_name: student.name.clone(),
        };
        let report = dispatcher.dispatch(&message).await;
        summary.record(&report);
    }

    info!(
        total = summary.total,
        delivered = summary.delivered,
        failed = summary.failed,
        "Consent forms sent"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewStudent;
    use crate::notify::LocalRecordStore;
    use tempfile::tempdir;

    fn book() -> GradeBook {
        let mut book = GradeBook::new();
        book.add_student(NewStudent::new("Ana <Pop>", "5A", "Maria", "maria@example.com"))
            .unwrap();
        book.add_student(NewStudent::new("Ion", "5B", "Dan", "dan@example.com"))
            .unwrap();
        book
    }

    #[test]
    fn test_template_defaults_and_save() {
        let dir = tempdir().unwrap();
        let mut template = FormTemplate::load(dir.path()).unwrap();
        assert_eq!(template, FormTemplate::default());

        template.title = "Consent".to_string();
        template.save(dir.path()).unwrap();
        let loaded = FormTemplate::load(dir.path()).unwrap();
        assert_eq!(loaded.title, "Consent");
        assert!(loaded.updated_at.is_some());
    }

    #[test]
    fn test_form_html() {
        let book = book();
        let student = &book.students()[0];
        let date = NaiveDate::from_ymd_opt(2024, 9, 15).unwrap();

        let html = render_form_html(student, &FormTemplate::default(), true, date);
        assert!(html.contains("Ana &lt;Pop&gt;, Class 5A"));
        assert!(html.contains("15.09.2024"));
        assert!(html.contains("signature-area"));

        let unsigned = render_form_html(student, &FormTemplate::default(), false, date);
        assert!(!unsigned.contains("class=\"signature-area\""));
        assert!(!unsigned.contains("{{"));
    }

    #[tokio::test]
    async fn test_archive_contains_every_form() {
        let dir = tempdir().unwrap();
        let renderer = ArtifactRenderer::new(dir.path(), Some("/nonexistent/chrome".to_string()));
        let bytes = forms_archive(&renderer, &book(), &FormTemplate::default(), true)
            .await
            .unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert!(archive.file_names().all(|n| n.starts_with("gdpr_form_")));
    }

    #[tokio::test]
    async fn test_pdf_requires_converter() {
        let dir = tempdir().unwrap();
        let renderer = ArtifactRenderer::new(dir.path(), Some("/nonexistent/chrome".to_string()));
        let book = book();
        let result = render_form_pdf(&renderer, &book.students()[0], &FormTemplate::default(), true).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_send_forms_without_channels() {
        let dir = tempdir().unwrap();
        let dispatcher = Dispatcher::new(
            "school@example.com",
            LocalRecordStore::new(dir.path()),
            ArtifactRenderer::new(dir.path().join("pdf"), Some("/nonexistent/chrome".to_string())),
        );
        let summary = send_forms(&dispatcher, &book(), &FormTemplate::default(), Duration::ZERO).await;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.handled, 2);
        assert_eq!(summary.delivered, 0);
    }

    #[test]
    fn test_names_are_not_expanded_as_placeholders() {
        let mut book = GradeBook::new();
        let id = book
            .add_student(NewStudent::new("{{intro}}", "5A", "{{contact}}", "x@example.com"))
            .unwrap();
        let template = FormTemplate {
            intro: "INTRO TEXT".to_string(),
            contact: "CONTACT TEXT".to_string(),
            ..Default::default()
        };
        let date = NaiveDate::from_ymd_opt(2024, 9, 15).unwrap();

        let html = render_form_html(book.student(id).unwrap(), &template, true, date);

        assert!(html.contains("{{intro}}, Class 5A"));
        assert!(html.contains("<strong>To:</strong> {{contact}}"));
        assert_eq!(html.matches("INTRO TEXT").count(), 1);
        assert_eq!(html.matches("CONTACT TEXT").count(), 1);
    }
}
