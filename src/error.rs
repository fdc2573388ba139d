//! Domain error types for the grade book.

use thiserror::Error;

/// Errors raised by validation and integrity rules of the grade book.
///
/// These are recovered at the command boundary and shown to the user as-is;
/// nothing is committed when one is returned.
#[derive(Debug, Error, PartialEq)]
pub enum GradebookError {
    /// A grade value outside the accepted `[1, 10]` range.
    #[error("Grade must be between 1 and 10, got {0}")]
    InvalidGrade(f64),

    /// A grade value that could not be parsed as a number.
    #[error("Not a numeric grade: '{0}'")]
    InvalidNumber(String),

    /// A date that is not in `YYYY-MM-DD` form.
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A required field was blank.
    #[error("Field '{0}' is required")]
    MissingField(&'static str),

    /// A field that is present but malformed, e.g. a weekday outside 0..=6.
    #[error("Field '{0}' has an invalid value")]
    InvalidField(&'static str),

    #[error("Student {0} not found")]
    StudentNotFound(u32),

    #[error("Subject {0} not found")]
    SubjectNotFound(u32),

    #[error("Grade {0} not found")]
    GradeNotFound(u32),

    #[error("Reminder {0} not found")]
    ReminderNotFound(u32),

    /// Subject names are unique across the book.
    #[error("Subject '{0}' already exists")]
    DuplicateSubject(String),

    #[error("Maximum number of subjects ({0}) reached")]
    SubjectLimitReached(usize),

    /// A subject cannot be removed while grades still reference it.
    #[error("Cannot delete subject '{name}': {grades} grade(s) still reference it")]
    SubjectInUse { name: String, grades: usize },

    /// Destructive GDPR operations require the exact confirmation token.
    #[error("Confirmation text does not match, type DELETE to confirm")]
    ConfirmationMismatch,
}
