//! On-screen grade listings.

use serde::Serialize;

use crate::aggregate::utility::round2;
use crate::aggregate::{GradePoint, SubjectAggregate, aggregate_student, overall_average};
use crate::error::GradebookError;
use crate::models::Student;
use crate::store::GradeBook;

#[derive(Debug, Clone, Serialize)]
pub struct SubjectView {
    pub subject_id: u32,
    pub name: String,
    /// Newest first.
    pub grades: Vec<GradePoint>,
    /// Rounded to two decimals, `None` without grades.
    pub average: Option<f64>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    pub id: u32,
    pub name: String,
    pub class_name: String,
    pub subjects: Vec<SubjectView>,
    /// Mean of the listed subject averages, rounded; 0.0 without grades.
    pub overall_average: f64,
}

/// Lists students with their grades, optionally filtered to one student
/// and/or one subject.
///
/// Without a subject filter only subjects with grades are listed. With one,
/// that subject is listed for every student even when empty.
pub fn grades_view(
    book: &GradeBook,
    student_filter: Option<u32>,
    subject_filter: Option<u32>,
) -> Vec<StudentView> {
    let mut views: Vec<StudentView> = book
        .students_sorted()
        .into_iter()
        .filter(|s| student_filter.is_none_or(|id| s.id == id))
        .filter_map(|student| student_view(book, student, subject_filter))
        .collect();

    views.sort_by(|a, b| {
        a.class_name
            .cmp(&b.class_name)
            .then_with(|| a.name.cmp(&b.name))
    });
    views
}

fn student_view(
    book: &GradeBook,
    student: &Student,
    subject_filter: Option<u32>,
) -> Option<StudentView> {
    let aggregate = aggregate_student(book, student);

    let mut subjects = Vec::new();
    for subject in book.subjects_sorted() {
        if subject_filter.is_some_and(|id| id != subject.id) {
            continue;
        }
        match aggregate.subject(subject.id) {
            Some(agg) => subjects.push(SubjectView {
                subject_id: subject.id,
                name: subject.name.clone(),
                grades: agg.newest_first().into_iter().cloned().collect(),
                average: Some(round2(agg.average)),
                count: agg.grades.len(),
            }),
            None if subject_filter.is_some() => subjects.push(SubjectView {
                subject_id: subject.id,
                name: subject.name.clone(),
                grades: Vec::new(),
                average: None,
                count: 0,
            }),
            None => {}
        }
    }

    if subjects.is_empty() && subject_filter.is_some() {
        return None;
    }

    let averages: Vec<f64> = subjects.iter().filter_map(|s| s.average).collect();
    Some(StudentView {
        id: student.id,
        name: student.name.clone(),
        class_name: student.class_name.clone(),
        overall_average: round2(overall_average(&averages)),
        subjects,
    })
}

/// A single student's page: grades grouped by subject plus the overall average.
#[derive(Debug, Clone, Serialize)]
pub struct StudentProfile {
    pub student: Student,
    pub subjects: Vec<SubjectAggregate>,
    pub average: f64,
}

pub fn student_profile(book: &GradeBook, student_id: u32) -> Result<StudentProfile, GradebookError> {
    let student = book.student(student_id)?;
    let aggregate = aggregate_student(book, student);
    Ok(StudentProfile {
        student: student.clone(),
        average: aggregate.overall,
        subjects: aggregate.subjects,
    })
}
