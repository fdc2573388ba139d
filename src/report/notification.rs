//! Guardian notification bodies.
//!
//! Students are grouped by guardian email; every guardian receives one
//! message covering all of their students.

use std::collections::BTreeMap;

use crate::aggregate::aggregate_student;
use crate::models::Student;
use crate::store::GradeBook;

const GREETING: &str = "Dear parent";

const GDPR_BLOCK: &str = "\n\n---------------------------------------------\
\nDATA PROTECTION NOTICE (GDPR):\
\nPersonal data is processed under Regulation (EU) 2016/679 on the protection of natural persons.\
\nYou have the right of access, rectification, erasure, restriction and portability of your data.\
\nContact the school for more information or to exercise these rights.\
\n---------------------------------------------";

const FOOTER: &str = "\n\nThis notification was generated automatically by the grade book.\
\nPlease do not reply to this email.\
\n\nKind regards,\
\nSchool management";

/// What goes into a notification body.
#[derive(Debug, Clone)]
pub struct NotificationOptions {
    /// Free text written by the teacher. A leading "Dear parent" is
    /// personalised with the guardian's name.
    pub content: String,
    pub include_grades: bool,
    pub include_gdpr: bool,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            content: format!("{GREETING},\n\nPlease find below the latest grades."),
            include_grades: true,
            include_gdpr: false,
        }
    }
}

/// Everything one guardian is told about their students.
#[derive(Debug, Clone, Default)]
pub struct GuardianDigest {
    pub email: String,
    pub guardian_name: String,
    /// Names of the guardian's students, in class/name order.
    pub students: Vec<String>,
    pub grade_lines: Vec<String>,
    pub average_lines: Vec<String>,
}

impl GuardianDigest {
    pub fn has_grades(&self) -> bool {
        !self.grade_lines.is_empty()
    }

    pub fn subject_line(&self) -> String {
        match self.students.as_slice() {
            [only] => format!("Grade report - {only}"),
            many => format!("Grade report - {} students", many.len()),
        }
    }

    /// First student's name, used to label printed artifacts.
    pub fn first_student(&self) -> &str {
        self.students.first().map(String::as_str).unwrap_or("Student")
    }

    pub fn compose_body(&self, options: &NotificationOptions) -> String {
        let mut body = options.content.replacen(
            GREETING,
            &format!("{GREETING} {}", self.guardian_name),
            1,
        );

        if options.include_grades && self.has_grades() {
            body.push_str("\n\nNEW AND RECENT GRADES:\n");
            body.push_str(&self.grade_lines.join("\n"));
            if !self.average_lines.is_empty() {
                body.push_str("\n\nAverages:\n");
                body.push_str(&self.average_lines.join("\n"));
            }
        }

        if options.include_gdpr {
            body.push_str(GDPR_BLOCK);
        }
        body.push_str(FOOTER);
        body
    }
}

/// Builds one digest per guardian email for the selected students (all
/// students when `student_ids` is empty).
///
/// Students without a guardian email are skipped.
pub fn guardian_digests(book: &GradeBook, student_ids: &[u32]) -> Vec<GuardianDigest> {
    let selected: Vec<&Student> = book
        .students_sorted()
        .into_iter()
        .filter(|s| student_ids.is_empty() || student_ids.contains(&s.id))
        .collect();

    let mut digests: BTreeMap<String, GuardianDigest> = BTreeMap::new();
    for student in selected {
        let email = student.guardian_email.trim();
        if email.is_empty() {
            continue;
        }
        let digest = digests
            .entry(email.to_string())
            .or_insert_with(|| GuardianDigest {
                email: email.to_string(),
                guardian_name: student.guardian_name.clone(),
                ..Default::default()
            });
        digest.students.push(student.name.clone());

        let label = format!("{} (Class {})", student.name, student.class_name);
        for grade in book.grades_for_student(student.id) {
            let subject = book
                .subject(grade.subject_id)
                .map(|s| s.name.as_str())
                .unwrap_or("Unknown subject");
            digest.grade_lines.push(format!(
                "{label} - {subject}: {} on {}",
                grade.value.get(),
                grade.date.format("%d-%m-%Y")
            ));
        }

        let aggregate = aggregate_student(book, student);
        if aggregate.has_grades() {
            for subject in &aggregate.subjects {
                digest.average_lines.push(format!(
                    "{label} - {} average: {:.2}",
                    subject.subject, subject.average
                ));
            }
            digest
                .average_lines
                .push(format!("{label} - Overall average: {:.2}", aggregate.overall));
        }
    }

    digests.into_values().collect()
}
