//! Persisted records of the grade book and their validated constructors.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GradebookError;

/// Lowest accepted grade.
pub const MIN_GRADE: f64 = 1.0;
/// Highest accepted grade.
pub const MAX_GRADE: f64 = 10.0;

/// A grade value guaranteed to lie in `[MIN_GRADE, MAX_GRADE]`.
///
/// The range is enforced here, at input time; aggregation code trusts it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct GradeValue(f64);

impl TryFrom<f64> for GradeValue {
    type Error = GradebookError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GradeValue> for f64 {
    fn from(value: GradeValue) -> Self {
        value.0
    }
}

impl GradeValue {
    pub fn new(value: f64) -> Result<Self, GradebookError> {
        if !(MIN_GRADE..=MAX_GRADE).contains(&value) {
            return Err(GradebookError::InvalidGrade(value));
        }
        Ok(Self(value))
    }

    /// Parses a raw form value such as `"9.5"`.
    pub fn parse(raw: &str) -> Result<Self, GradebookError> {
        let trimmed = raw.trim();
        let value: f64 = trimmed
            .parse()
            .map_err(|_| GradebookError::InvalidNumber(trimmed.to_string()))?;
        if value.is_nan() {
            return Err(GradebookError::InvalidNumber(trimmed.to_string()));
        }
        Self::new(value)
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

/// Parses a grade date in `YYYY-MM-DD` form.
pub fn parse_grade_date(raw: &str) -> Result<NaiveDate, GradebookError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| GradebookError::InvalidDate(raw.to_string()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: u32,
    pub name: String,
    pub class_name: String,
    pub guardian_name: String,
    pub guardian_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub id: u32,
    pub value: GradeValue,
    pub date: NaiveDate,
    pub student_id: u32,
    pub subject_id: u32,
    pub created_at: DateTime<Utc>,
}

/// The editable fields of a [`Student`], all required.
#[derive(Debug, Clone, Default)]
pub struct NewStudent {
    pub name: String,
    pub class_name: String,
    pub guardian_name: String,
    pub guardian_email: String,
}

impl NewStudent {
    pub fn new(
        name: impl Into<String>,
        class_name: impl Into<String>,
        guardian_name: impl Into<String>,
        guardian_email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            class_name: class_name.into(),
            guardian_name: guardian_name.into(),
            guardian_email: guardian_email.into(),
        }
    }

    /// Trims every field and rejects blanks.
    pub fn validated(self) -> Result<Self, GradebookError> {
        fn required(value: String, field: &'static str) -> Result<String, GradebookError> {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(GradebookError::MissingField(field));
            }
            Ok(trimmed.to_string())
        }

        Ok(Self {
            name: required(self.name, "name")?,
            class_name: required(self.class_name, "class_name")?,
            guardian_name: required(self.guardian_name, "guardian_name")?,
            guardian_email: required(self.guardian_email, "guardian_email")?,
        })
    }
}
