//! Tabular data behind the spreadsheet export.
//!
//! Built once from the grade book, then rendered by [`super::workbook`].

use serde::Serialize;

use crate::aggregate::{ClassStats, StudentAggregate, aggregate_student};
use crate::models::Student;
use crate::store::GradeBook;

/// Placeholder printed where a student has no grade.
pub const NO_GRADE: &str = "-";

/// A subject column.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectColumn {
    pub id: u32,
    pub name: String,
}

/// One line of the overview sheet.
#[derive(Debug, Clone, Serialize)]
pub struct OverviewRow {
    pub ordinal: usize,
    pub name: String,
    pub class_name: String,
    pub guardian_name: String,
    pub guardian_email: String,
    pub overall: Option<f64>,
    /// One entry per [`Overview::subjects`] column.
    pub subject_averages: Vec<Option<f64>>,
}

/// One line of a class sheet.
#[derive(Debug, Clone, Serialize)]
pub struct ClassRow {
    pub ordinal: usize,
    pub name: String,
    pub overall: Option<f64>,
    pub subject_averages: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSheet {
    pub class_name: String,
    pub rows: Vec<ClassRow>,
    /// Absent when no student of the class has an average.
    pub stats: Option<ClassStats>,
}

/// Detail sheet of a student that has grades.
#[derive(Debug, Clone, Serialize)]
pub struct StudentSheet {
    pub name: String,
    pub class_name: String,
    pub guardian_name: String,
    pub guardian_email: String,
    pub aggregate: StudentAggregate,
}

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub subjects: Vec<SubjectColumn>,
    pub rows: Vec<OverviewRow>,
    pub classes: Vec<ClassSheet>,
    pub students: Vec<StudentSheet>,
}

pub fn build_overview(book: &GradeBook) -> Overview {
    let subjects: Vec<SubjectColumn> = book
        .subjects_sorted()
        .into_iter()
        .map(|s| SubjectColumn {
            id: s.id,
            name: s.name.clone(),
        })
        .collect();

    let students = book.students_sorted();
    let aggregates: Vec<(&Student, StudentAggregate)> = students
        .iter()
        .map(|s| (*s, aggregate_student(book, s)))
        .collect();

    let per_subject = |agg: &StudentAggregate| -> Vec<Option<f64>> {
        subjects
            .iter()
            .map(|col| agg.subject_average(col.id))
            .collect()
    };

    let rows = aggregates
        .iter()
        .enumerate()
        .map(|(i, (student, agg))| OverviewRow {
            ordinal: i + 1,
            name: student.name.clone(),
            class_name: student.class_name.clone(),
            guardian_name: student.guardian_name.clone(),
            guardian_email: student.guardian_email.clone(),
            overall: agg.overall_if_graded(),
            subject_averages: per_subject(agg),
        })
        .collect();

    let mut classes: Vec<ClassSheet> = Vec::new();
    for (student, agg) in &aggregates {
        let position = match classes
            .iter()
            .position(|c| c.class_name == student.class_name)
        {
            Some(position) => position,
            None => {
                classes.push(ClassSheet {
                    class_name: student.class_name.clone(),
                    rows: Vec::new(),
                    stats: None,
                });
                classes.len() - 1
            }
        };
        let sheet = &mut classes[position];
        sheet.rows.push(ClassRow {
            ordinal: sheet.rows.len() + 1,
            name: student.name.clone(),
            overall: agg.overall_if_graded(),
            subject_averages: per_subject(agg),
        });
    }
    for sheet in &mut classes {
        let averages: Vec<f64> = sheet.rows.iter().filter_map(|r| r.overall).collect();
        sheet.stats = ClassStats::from_averages(&averages);
    }

    let student_sheets = aggregates
        .into_iter()
        .filter(|(_, agg)| agg.has_grades())
        .map(|(student, aggregate)| StudentSheet {
            name: student.name.clone(),
            class_name: student.class_name.clone(),
            guardian_name: student.guardian_name.clone(),
            guardian_email: student.guardian_email.clone(),
            aggregate,
        })
        .collect();

    Overview {
        subjects,
        rows,
        classes,
        students: student_sheets,
    }
}
