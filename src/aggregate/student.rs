use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::utility::{average, overall_average};
use crate::models::Student;
use crate::store::GradeBook;

const UNKNOWN_SUBJECT: &str = "Unknown subject";

/// One recorded grade as seen by the reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradePoint {
    pub grade_id: u32,
    pub value: f64,
    pub date: NaiveDate,
}

/// Grades of one student in one subject and their mean.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectAggregate {
    pub subject_id: u32,
    pub subject: String,
    /// In entry order.
    pub grades: Vec<GradePoint>,
    pub average: f64,
}

impl SubjectAggregate {
    pub fn values(&self) -> Vec<f64> {
        self.grades.iter().map(|g| g.value).collect()
    }

    /// Grades ordered newest first.
    pub fn newest_first(&self) -> Vec<&GradePoint> {
        let mut grades: Vec<&GradePoint> = self.grades.iter().collect();
        grades.sort_by(|a, b| b.date.cmp(&a.date));
        grades
    }
}

/// Everything the reports need about one student's grades.
#[derive(Debug, Clone, Serialize)]
pub struct StudentAggregate {
    pub student_id: u32,
    /// Only subjects with at least one grade, ordered by subject name.
    pub subjects: Vec<SubjectAggregate>,
    /// Mean of the per-subject averages, 0.0 without grades.
    pub overall: f64,
}

impl StudentAggregate {
    pub fn has_grades(&self) -> bool {
        !self.subjects.is_empty()
    }

    /// `None` when the student has no grades, so reports can print a placeholder.
    pub fn overall_if_graded(&self) -> Option<f64> {
        self.has_grades().then_some(self.overall)
    }

    pub fn subject(&self, subject_id: u32) -> Option<&SubjectAggregate> {
        self.subjects.iter().find(|s| s.subject_id == subject_id)
    }

    pub fn subject_average(&self, subject_id: u32) -> Option<f64> {
        self.subject(subject_id).map(|s| s.average)
    }

    pub fn grade_count(&self) -> usize {
        self.subjects.iter().map(|s| s.grades.len()).sum()
    }
}

/// Groups a student's grades by subject and computes the averages.
pub fn aggregate_student(book: &GradeBook, student: &Student) -> StudentAggregate {
    let mut by_subject: BTreeMap<u32, Vec<GradePoint>> = BTreeMap::new();
    for grade in book.grades_for_student(student.id) {
        by_subject
            .entry(grade.subject_id)
            .or_default()
            .push(GradePoint {
                grade_id: grade.id,
                value: grade.value.get(),
                date: grade.date,
            });
    }

    let mut subjects: Vec<SubjectAggregate> = by_subject
        .into_iter()
        .map(|(subject_id, grades)| {
            let values: Vec<f64> = grades.iter().map(|g| g.value).collect();
            let subject = book
                .subject(subject_id)
                .map(|s| s.name.clone())
                .unwrap_or_else(|_| UNKNOWN_SUBJECT.to_string());
            SubjectAggregate {
                subject_id,
                subject,
                average: average(&values),
                grades,
            }
        })
        .collect();
    subjects.sort_by(|a, b| a.subject.cmp(&b.subject));

    let subject_averages: Vec<f64> = subjects.iter().map(|s| s.average).collect();

    StudentAggregate {
        student_id: student.id,
        overall: overall_average(&subject_averages),
        subjects,
    }
}
