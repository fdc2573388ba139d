use chrono::NaiveDate;
use gradebook::aggregate::{Band, aggregate_student};
use gradebook::config::{AppConfig, DispatchConfig};
use gradebook::error::GradebookError;
use gradebook::gdpr::{self, ErasureScope, ExportScope};
use gradebook::models::{GradeValue, NewStudent};
use gradebook::notify::{Dispatcher, notify_guardians};
use gradebook::report::{NotificationOptions, build_overview, render_workbook, student_profile};
use gradebook::store::GradeBook;
use std::time::Duration;
use tempfile::tempdir;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
}

/// Two students in 5A sharing a guardian, one in 6B without grades.
fn sample_book() -> (GradeBook, u32, u32) {
    let mut book = GradeBook::new();
    let math = book.add_subject("Math").unwrap();
    let history = book.add_subject("History").unwrap();

    let ana = book
        .add_student(NewStudent::new("Ana", "5A", "Maria", "maria@example.com"))
        .unwrap();
    let ion = book
        .add_student(NewStudent::new("Ion", "5A", "Maria", " maria@example.com "))
        .unwrap();
    book.add_student(NewStudent::new("Dan", "6B", "Elena", "elena@example.com"))
        .unwrap();

    // Ana: Math 10, 6 (mean 8); History 5 (mean 5) -> overall 6.5
    for (value, day) in [(10.0, 1), (6.0, 2)] {
        book.add_grade(ana, math, GradeValue::new(value).unwrap(), date(day))
            .unwrap();
    }
    book.add_grade(ana, history, GradeValue::new(5.0).unwrap(), date(3))
        .unwrap();
    book.add_grade(ion, math, GradeValue::new(9.5).unwrap(), date(4))
        .unwrap();

    (book, ana, ion)
}

#[test]
fn test_overall_is_mean_of_subject_means() {
    let (book, ana, _) = sample_book();
    let student = book.student(ana).unwrap();
    let aggregate = aggregate_student(&book, student);

    assert_eq!(aggregate.grade_count(), 3);
    assert!((aggregate.overall - 6.5).abs() < 1e-9);
    assert_eq!(Band::from_average(aggregate.overall), Band::Average);

    let profile = student_profile(&book, ana).unwrap();
    assert!((profile.average - aggregate.overall).abs() < 1e-9);
}

#[test]
fn test_overview_and_workbook() {
    let (book, _, _) = sample_book();
    let overview = build_overview(&book);

    assert_eq!(overview.rows.len(), 3);
    assert_eq!(overview.classes.len(), 2);
    let class_5a = overview
        .classes
        .iter()
        .find(|c| c.class_name == "5A")
        .unwrap();
    let stats = class_5a.stats.unwrap();
    assert_eq!(stats.students, 2);
    assert!((stats.mean - 8.0).abs() < 1e-9);

    let class_6b = overview
        .classes
        .iter()
        .find(|c| c.class_name == "6B")
        .unwrap();
    assert!(class_6b.stats.is_none());

    let bytes = render_workbook(&overview).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn test_book_survives_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gradebook.json");
    let (book, ana, _) = sample_book();
    book.save(&path).unwrap();

    let mut loaded = GradeBook::load(&path).unwrap();
    assert_eq!(loaded.students().len(), 3);
    assert_eq!(loaded.grades().len(), 4);

    // Ids keep counting after a reload.
    let id = loaded
        .add_student(NewStudent::new("Eva", "6B", "Paul", "paul@example.com"))
        .unwrap();
    assert!(id > ana);
    assert_eq!(
        loaded.add_subject(" Math "),
        Err(GradebookError::DuplicateSubject("Math".to_string()))
    );
}

#[tokio::test]
async fn test_notify_without_channels_keeps_local_copies() {
    let dir = tempdir().unwrap();
    let config = DispatchConfig {
        data_dir: dir.path().to_path_buf(),
        pdf_converter: Some("/nonexistent/chrome-for-tests".to_string()),
        ..Default::default()
    };
    let dispatcher = Dispatcher::from_config(&config).unwrap();
    let (book, _, _) = sample_book();

    let summary = notify_guardians(
        &dispatcher,
        &book,
        &[],
        &NotificationOptions::default(),
        Duration::ZERO,
    )
    .await;

    // Maria gets one digest for both children; Elena has nothing to report.
    assert_eq!(summary.total, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.handled, 1);
    assert_eq!(summary.delivered, 0);

    let index = std::fs::read_to_string(dir.path().join("notifications.html")).unwrap();
    assert!(index.contains("Grade report - 2 students"));
    let log = std::fs::read_to_string(dir.path().join("sent_emails.csv")).unwrap();
    assert!(log.contains("Overall average: 6.50"));

    let artifacts: Vec<_> = std::fs::read_dir(dir.path().join("notifications_pdf"))
        .unwrap()
        .collect();
    assert_eq!(artifacts.len(), 1);
}

#[test]
fn test_export_then_erase() {
    let (mut book, ana, _) = sample_book();

    let data = gdpr::build_export(&book, ana, ExportScope::All).unwrap();
    assert_eq!(data["grades"].as_array().unwrap().len(), 3);
    let file = gdpr::export_as_json(&gdpr::anonymize(&data)).unwrap();
    let text = String::from_utf8(file.content).unwrap();
    assert!(!text.contains("maria@example.com"));

    let outcome = gdpr::erase(&mut book, ana, ErasureScope::StudentComplete, false, "DELETE").unwrap();
    assert!(outcome.student_deleted);
    assert_eq!(outcome.grades_removed, 3);
    assert_eq!(book.grades().len(), 1);
}

#[test]
fn test_config_env_overrides() {
    let config = AppConfig::default().with_overrides(|key| match key {
        "SENDGRID_API_KEY" => Some("SG.key".to_string()),
        "NOTIFY_THROTTLE_MS" => Some("0".to_string()),
        _ => None,
    });
    assert_eq!(config.dispatch.primary_api_key.as_deref(), Some("SG.key"));
    assert!(config.dispatch.throttle().is_zero());
}
