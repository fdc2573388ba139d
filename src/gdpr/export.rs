//! Data portability exports.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::store::GradeBook;

/// Keys holding directly identifying data.
const PERSONAL_KEYS: [&str; 6] = ["name", "email", "guardian_name", "guardian_email", "phone", "address"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportScope {
    /// Student, guardian and grades.
    Student,
    /// Student and guardian only.
    Guardian,
    All,
}

impl ExportScope {
    fn includes_grades(self) -> bool {
        matches!(self, Self::Student | Self::All)
    }
}

#[derive(Serialize)]
struct StudentRecord<'a> {
    id: u32,
    name: &'a str,
    class_name: &'a str,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct GuardianRecord<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Serialize)]
struct SubjectRef<'a> {
    id: u32,
    name: &'a str,
}

#[derive(Serialize)]
struct GradeRecord<'a> {
    id: u32,
    value: f64,
    date: NaiveDate,
    subject: Option<SubjectRef<'a>>,
    created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ExportData<'a> {
    student: StudentRecord<'a>,
    guardian: GuardianRecord<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grades: Option<Vec<GradeRecord<'a>>>,
}

/// Collects everything held about one student.
pub fn build_export(
    book: &GradeBook,
    student_id: u32,
    scope: ExportScope,
) -> Result<Value> {
    let student = book.student(student_id)?;
    let grades = scope.includes_grades().then(|| {
        book.grades_for_student(student_id)
            .map(|g| GradeRecord {
                id: g.id,
                value: g.value.get(),
                date: g.date,
                subject: book
                    .subject(g.subject_id)
                    .ok()
                    .map(|s| SubjectRef { id: s.id, name: &s.name }),
                created_at: g.created_at,
            })
            .collect()
    });

    let data = ExportData {
        student: StudentRecord {
            id: student.id,
            name: &student.name,
            class_name: &student.class_name,
            created_at: student.created_at,
            updated_at: student.updated_at,
        },
        guardian: GuardianRecord {
            name: &student.guardian_name,
            email: &student.guardian_email,
        },
        grades,
    };
    Ok(serde_json::to_value(data)?)
}

/// `ANONYMIZED_<8 hex>` derived from `value`.
pub fn anonymized_label(value: &str) -> String {
    format!("ANONYMIZED_{}", short_hash(value))
}

/// `anonymized_<8 hex>@example.com` derived from `email`.
pub fn anonymized_email(email: &str) -> String {
    format!("anonymized_{}@example.com", short_hash(email))
}

fn short_hash(value: &str) -> String {
    let digest = hex::encode(Sha256::digest(value.as_bytes()));
    digest[..8].to_string()
}

/// Replaces personal values with anonymised labels, leaving ids, dates,
/// grades and subject names intact.
pub fn anonymize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let out: Map<String, Value> = map
                .iter()
                .map(|(key, v)| {
                    let v = if key == "subject" {
                        v.clone()
                    } else if PERSONAL_KEYS.contains(&key.to_lowercase().as_str()) {
                        match v {
                            Value::String(s) if !s.is_empty() => {
                                if key.contains("email") || s.contains('@') {
                                    Value::String(anonymized_email(s))
                                } else {
                                    Value::String(anonymized_label(s))
                                }
                            }
                            _ => Value::String("ANONYMIZED".to_string()),
                        }
                    } else {
                        anonymize(v)
                    };
                    (key.clone(), v)
                })
                .collect();
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(anonymize).collect()),
        other => other.clone(),
    }
}

/// A generated download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub content: Vec<u8>,
}

fn export_filename(extension: &str) -> String {
    format!("gdpr_export_{}.{extension}", Local::now().format("%Y%m%d_%H%M%S"))
}

pub fn export_as_json(data: &Value) -> Result<ExportFile> {
    let wrapped = json!({
        "export_date": Local::now().naive_local(),
        "export_type": "gdpr_data_portability",
        "data": data,
    });
    Ok(ExportFile {
        filename: export_filename("json"),
        content_type: "application/json",
        content: serde_json::to_vec_pretty(&wrapped)?,
    })
}

/// Flattened `Field,Value` rows; nested keys are joined with `.` and list
/// items indexed as `key[i]`.
pub fn export_as_csv(data: &Value) -> Result<ExportFile> {
    let mut rows = Vec::new();
    flatten("", data, &mut rows);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Field", "Value"])?;
    for (field, value) in &rows {
        writer.write_record([field, value])?;
    }
    let content = writer.into_inner().map_err(|e| e.into_error())?;

    Ok(ExportFile {
        filename: export_filename("csv"),
        content_type: "text/csv",
        content,
    })
}

fn flatten(prefix: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                let field = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&field, v, rows);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{i}]"), item, rows);
            }
        }
        Value::Null => rows.push((prefix.to_string(), String::new())),
        Value::String(s) => rows.push((prefix.to_string(), s.clone())),
        other => rows.push((prefix.to_string(), other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GradebookError;
    use crate::models::{GradeValue, NewStudent};

    fn book() -> (GradeBook, u32) {
        let mut book = GradeBook::new();
        let math = book.add_subject("Math").unwrap();
        let id = book
            .add_student(NewStudent::new("Ana Pop", "5A", "Maria Pop", "maria@example.com"))
            .unwrap();
        book.add_grade(
            id,
            math,
            GradeValue::new(9.5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        )
        .unwrap();
        (book, id)
    }

    #[test]
    fn test_scope_controls_grades() {
        let (book, id) = book();
        let full = build_export(&book, id, ExportScope::Student).unwrap();
        assert_eq!(full["grades"][0]["value"], 9.5);
        assert_eq!(full["grades"][0]["subject"]["name"], "Math");

        let guardian = build_export(&book, id, ExportScope::Guardian).unwrap();
        assert!(guardian.get("grades").is_none());
        assert_eq!(guardian["guardian"]["email"], "maria@example.com");

        let err = build_export(&book, 99, ExportScope::All).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GradebookError>(),
            Some(&GradebookError::StudentNotFound(99))
        );
    }

    #[test]
    fn test_json_wrapper() {
        let (book, id) = book();
        let data = build_export(&book, id, ExportScope::All).unwrap();
        let file = export_as_json(&data).unwrap();
        assert!(file.filename.starts_with("gdpr_export_"));
        assert!(file.filename.ends_with(".json"));

        let parsed: Value = serde_json::from_slice(&file.content).unwrap();
        assert_eq!(parsed["export_type"], "gdpr_data_portability");
        assert_eq!(parsed["data"]["student"]["name"], "Ana Pop");
    }

    #[test]
    fn test_csv_flattening() {
        let (book, id) = book();
        let data = build_export(&book, id, ExportScope::All).unwrap();
        let file = export_as_csv(&data).unwrap();
        let text = String::from_utf8(file.content).unwrap();

        assert!(text.starts_with("Field,Value\n"));
        assert!(text.contains("student.class_name,5A\n"));
        assert!(text.contains("grades[0].subject.name,Math\n"));
        assert!(text.contains("grades[0].value,9.5\n"));
    }

    #[test]
    fn test_anonymize_keeps_non_personal_data() {
        let (book, id) = book();
        let data = anonymize(&build_export(&book, id, ExportScope::All).unwrap());

        assert_eq!(data["student"]["name"], anonymized_label("Ana Pop"));
        assert_eq!(data["guardian"]["email"], anonymized_email("maria@example.com"));
        assert_eq!(data["student"]["class_name"], "5A");
        assert_eq!(data["grades"][0]["subject"]["name"], "Math");
        assert!(anonymized_label("x").len() == "ANONYMIZED_".len() + 8);
    }
}
