//! Spreadsheet rendering of an [`Overview`].

use anyhow::Result;
use chrono::Datelike;
use rust_xlsxwriter::{
    Color, ExcelDateTime, Format, FormatAlign, FormatBorder, Workbook, Worksheet,
};
use std::collections::HashSet;
use tracing::debug;

use super::overview::{NO_GRADE, Overview, StudentSheet};
use crate::aggregate::Band;

const MAX_SHEET_NAME: usize = 31;

struct Formats {
    header: Format,
    date: Format,
    stats_mean: Format,
    plain_number: Format,
    good: Format,
    average: Format,
    poor: Format,
}

impl Formats {
    fn new() -> Self {
        let banded = |band: Band| {
            Format::new()
                .set_num_format("0.00")
                .set_align(FormatAlign::Center)
                .set_background_color(Color::RGB(band.background()))
                .set_font_color(Color::RGB(band.foreground()))
        };

        Self {
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0x4F81BD))
                .set_font_color(Color::White)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin),
            date: Format::new()
                .set_num_format("dd/mm/yyyy")
                .set_align(FormatAlign::Center),
            stats_mean: banded(Band::Good),
            plain_number: Format::new().set_num_format("0.00"),
            good: banded(Band::Good),
            average: banded(Band::Average),
            poor: banded(Band::Poor),
        }
    }

    fn banded(&self, value: f64) -> &Format {
        match Band::from_average(value) {
            Band::Good => &self.good,
            Band::Average => &self.average,
            Band::Poor => &self.poor,
        }
    }
}

/// Renders the overview sheet, one sheet per class and one per student with
/// grades, and returns the `.xlsx` bytes.
pub fn render_workbook(overview: &Overview) -> Result<Vec<u8>> {
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let mut used_names = HashSet::new();

    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name("Overview", &mut used_names))?;
    write_overview(sheet, overview, &formats)?;

    for class in &overview.classes {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(
            &format!("Class {}", class.class_name),
            &mut used_names,
        ))?;
        write_class(sheet, overview, class, &formats)?;
    }

    for student in &overview.students {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(
            &format!("{} ({})", student.name, student.class_name),
            &mut used_names,
        ))?;
        write_student(sheet, student, &formats)?;
    }

    debug!(
        classes = overview.classes.len(),
        students = overview.students.len(),
        "Workbook rendered"
    );
    Ok(workbook.save_to_buffer()?)
}

fn write_header(sheet: &mut Worksheet, row: u32, headers: &[String], formats: &Formats) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, header.as_str(), &formats.header)?;
    }
    Ok(())
}

fn write_optional_average(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
    formats: &Formats,
) -> Result<()> {
    match value {
        Some(v) => sheet.write_number_with_format(row, col, v, formats.banded(v))?,
        None => sheet.write_string(row, col, NO_GRADE)?,
    };
    Ok(())
}

fn write_overview(sheet: &mut Worksheet, overview: &Overview, formats: &Formats) -> Result<()> {
    let mut headers: Vec<String> = ["No.", "Student", "Class", "Guardian", "Email", "Overall average"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend(overview.subjects.iter().map(|s| s.name.clone()));
    write_header(sheet, 0, &headers, formats)?;

    sheet.set_column_width(0, 5)?;
    sheet.set_column_width(1, 25)?;
    sheet.set_column_width(2, 10)?;
    sheet.set_column_width(3, 25)?;
    sheet.set_column_width(4, 30)?;
    sheet.set_column_width(5, 15)?;
    for col in 6..headers.len() {
        sheet.set_column_width(col as u16, 15)?;
    }

    for (i, row) in overview.rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_number(r, 0, row.ordinal as f64)?;
        sheet.write_string(r, 1, row.name.as_str())?;
        sheet.write_string(r, 2, row.class_name.as_str())?;
        sheet.write_string(r, 3, row.guardian_name.as_str())?;
        sheet.write_string(r, 4, row.guardian_email.as_str())?;
        write_optional_average(sheet, r, 5, row.overall, formats)?;
        for (j, value) in row.subject_averages.iter().enumerate() {
            write_optional_average(sheet, r, 6 + j as u16, *value, formats)?;
        }
    }
    Ok(())
}

fn write_class(
    sheet: &mut Worksheet,
    overview: &Overview,
    class: &super::overview::ClassSheet,
    formats: &Formats,
) -> Result<()> {
    let mut headers: Vec<String> = ["No.", "Student", "Overall average"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    headers.extend(overview.subjects.iter().map(|s| s.name.clone()));
    write_header(sheet, 0, &headers, formats)?;

    sheet.set_column_width(0, 5)?;
    sheet.set_column_width(1, 30)?;
    sheet.set_column_width(2, 15)?;
    for col in 3..headers.len() {
        sheet.set_column_width(col as u16, 15)?;
    }

    for (i, row) in class.rows.iter().enumerate() {
        let r = i as u32 + 1;
        sheet.write_number(r, 0, row.ordinal as f64)?;
        sheet.write_string(r, 1, row.name.as_str())?;
        write_optional_average(sheet, r, 2, row.overall, formats)?;
        for (j, value) in row.subject_averages.iter().enumerate() {
            write_optional_average(sheet, r, 3 + j as u16, *value, formats)?;
        }
    }

    if let Some(stats) = class.stats {
        let r = class.rows.len() as u32 + 3;
        sheet.write_string_with_format(r, 0, "Class statistics:", &formats.header)?;
        sheet.write_string(r, 1, "Class mean:")?;
        sheet.write_number_with_format(r, 2, stats.mean, &formats.stats_mean)?;
        sheet.write_string(r + 1, 1, "Mean absolute deviation:")?;
        sheet.write_number_with_format(r + 1, 2, stats.mean_abs_deviation, &formats.plain_number)?;
        sheet.write_string(r + 2, 1, "Standard deviation:")?;
        sheet.write_number_with_format(r + 2, 2, stats.std_deviation, &formats.plain_number)?;
    }
    Ok(())
}

fn write_student(sheet: &mut Worksheet, student: &StudentSheet, formats: &Formats) -> Result<()> {
    sheet.write_string(0, 0, format!("Student: {}", student.name))?;
    sheet.write_string(1, 0, format!("Class: {}", student.class_name))?;
    sheet.write_string(2, 0, format!("Guardian: {}", student.guardian_name))?;
    sheet.write_string(3, 0, format!("Email: {}", student.guardian_email))?;

    sheet.set_column_width(0, 5)?;
    sheet.set_column_width(1, 25)?;
    sheet.set_column_width(2, 15)?;
    sheet.set_column_width(3, 15)?;

    let headers: Vec<String> = ["No.", "Subject", "Grade", "Date"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    write_header(sheet, 5, &headers, formats)?;

    let mut row = 6u32;
    let mut count = 1usize;
    for subject in &student.aggregate.subjects {
        for grade in subject.newest_first() {
            sheet.write_number(row, 0, count as f64)?;
            sheet.write_string(row, 1, subject.subject.as_str())?;
            sheet.write_number_with_format(row, 2, grade.value, formats.banded(grade.value))?;
            let date = ExcelDateTime::from_ymd(
                grade.date.year() as u16,
                grade.date.month() as u8,
                grade.date.day() as u8,
            )?;
            sheet.write_datetime_with_format(row, 3, &date, &formats.date)?;
            row += 1;
            count += 1;
        }

        sheet.write_string(row, 1, format!("{} average:", subject.subject))?;
        sheet.write_number_with_format(row, 2, subject.average, formats.banded(subject.average))?;
        // blank line between subjects
        row += 2;
    }

    let overall = student.aggregate.overall;
    sheet.write_string(row, 0, "OVERALL AVERAGE:")?;
    sheet.write_number_with_format(row, 2, overall, formats.banded(overall))?;
    Ok(())
}

/// Makes `raw` a valid, unique worksheet name.
///
/// Excel limits names to 31 characters, forbids `[]:*?/\` and compares names
/// case-insensitively.
fn sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('\'').trim();
    let base: String = if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned.chars().take(MAX_SHEET_NAME).collect()
    };

    let mut candidate = base.clone();
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}
