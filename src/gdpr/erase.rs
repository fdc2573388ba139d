//! Right-to-erasure requests.

use chrono::Utc;
use tracing::info;

use super::export::{anonymized_email, anonymized_label};
use crate::error::GradebookError;
use crate::store::GradeBook;

/// Token the operator must type to confirm an erasure.
pub const CONFIRMATION: &str = "DELETE";

pub const ERASED_GUARDIAN_NAME: &str = "Erased (GDPR)";
pub const ERASED_GUARDIAN_EMAIL: &str = "gdpr@example.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErasureScope {
    /// The student record.
    Student,
    /// The student record and all of its grades.
    StudentComplete,
    /// Only the guardian's details.
    Guardian,
    /// Everything above.
    All,
}

impl ErasureScope {
    fn removes_grades(self) -> bool {
        matches!(self, Self::StudentComplete | Self::All)
    }

    fn touches_student(self) -> bool {
        !matches!(self, Self::Guardian)
    }

    fn touches_guardian(self) -> bool {
        matches!(self, Self::Guardian | Self::All)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErasureOutcome {
    pub grades_removed: usize,
    pub student_deleted: bool,
    pub student_anonymized: bool,
    pub guardian_anonymized: bool,
    pub guardian_replaced: bool,
}

/// Erases or anonymises a student's data.
///
/// With `anonymize` set, names and emails are replaced by hashed labels and
/// the records are kept (class labels stay for statistics). Without it, the
/// student is deleted (together with its grades), while a guardian-only
/// request swaps in placeholder details.
pub fn erase(
    book: &mut GradeBook,
    student_id: u32,
    scope: ErasureScope,
    anonymize: bool,
    confirmation: &str,
) -> Result<ErasureOutcome, GradebookError> {
    if confirmation.trim() != CONFIRMATION {
        return Err(GradebookError::ConfirmationMismatch);
    }
    book.student(student_id)?;

    let mut outcome = ErasureOutcome::default();
    if scope.removes_grades() {
        outcome.grades_removed = book.delete_grades_of_student(student_id);
    }

    if scope.touches_student() {
        if anonymize {
            let student = book.student_mut(student_id)?;
            student.name = anonymized_label(&student.name);
            student.updated_at = Utc::now();
            outcome.student_anonymized = true;
        } else {
            outcome.grades_removed += book.delete_student(student_id)?;
            outcome.student_deleted = true;
        }
    }

    if scope.touches_guardian() && !outcome.student_deleted {
        let student = book.student_mut(student_id)?;
        if anonymize {
            student.guardian_name = anonymized_label(&student.guardian_name);
            student.guardian_email = anonymized_email(&student.guardian_email);
            outcome.guardian_anonymized = true;
        } else {
            student.guardian_name = ERASED_GUARDIAN_NAME.to_string();
            student.guardian_email = ERASED_GUARDIAN_EMAIL.to_string();
            outcome.guardian_replaced = true;
        }
        student.updated_at = Utc::now();
    }

    info!(student_id, ?scope, anonymize, ?outcome, "GDPR erasure processed");
    Ok(outcome)
}
