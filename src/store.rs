//! The grade book: students, subjects, grades and reminders, persisted as a
//! single JSON document.
//!
//! Every mutating operation validates its input first and either applies the
//! whole change or returns a [`GradebookError`] without touching the book.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::GradebookError;
use crate::models::{Grade, GradeValue, NewStudent, Student, Subject, parse_grade_date};
use crate::reminders::{NewReminder, Reminder};

/// Upper bound on the number of subjects in one book.
pub const MAX_SUBJECTS: usize = 20;

/// Subjects added to an empty book by [`GradeBook::seed_default_subjects`].
pub const DEFAULT_SUBJECTS: [&str; MAX_SUBJECTS] = [
    "Mathematics",
    "Romanian",
    "History",
    "Geography",
    "Physics",
    "Chemistry",
    "Biology",
    "Computer Science",
    "English",
    "French",
    "Physical Education",
    "Music",
    "Art",
    "Civic Education",
    "Psychology",
    "Economics",
    "Philosophy",
    "Technology",
    "Religion",
    "Logic",
];

/// One row of a bulk grade entry form.
#[derive(Debug, Clone, Default)]
pub struct GradeEntry {
    pub value: String,
    pub date: Option<String>,
}

impl GradeEntry {
    pub fn new(value: impl Into<String>, date: Option<&str>) -> Self {
        Self {
            value: value.into(),
            date: date.map(str::to_string),
        }
    }
}

/// What to do with a bulk entry whose date is missing or malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingDatePolicy {
    /// Drop the entry.
    Skip,
    /// Use today's date.
    Today,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct IdCounters {
    student: u32,
    subject: u32,
    grade: u32,
    reminder: u32,
}

fn next(counter: &mut u32) -> u32 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GradeBook {
    #[serde(default)]
    students: Vec<Student>,
    #[serde(default)]
    subjects: Vec<Subject>,
    #[serde(default)]
    grades: Vec<Grade>,
    #[serde(default)]
    reminders: Vec<Reminder>,
    #[serde(default)]
    next_id: IdCounters,
}

impl GradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a book from `path`. A missing file yields an empty book.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No grade book on disk, starting empty");
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read grade book '{}'", path.display()))?;
        let mut book: Self = serde_json::from_str(&content)
            .with_context(|| format!("Grade book '{}' is not valid JSON", path.display()))?;
        book.check_references()
            .with_context(|| format!("Grade book '{}' is inconsistent", path.display()))?;
        book.sync_id_counters();
        Ok(book)
    }

    /// Every grade must point at a stored student and subject.
    fn check_references(&self) -> Result<(), GradebookError> {
        for grade in &self.grades {
            self.student(grade.student_id)?;
            self.subject(grade.subject_id)?;
        }
        Ok(())
    }

    /// Raises each id counter to at least the highest stored id, so a file
    /// with a missing or stale `next_id` never hands out a used id.
    fn sync_id_counters(&mut self) {
        fn highest(ids: impl Iterator<Item = u32>) -> u32 {
            ids.max().unwrap_or(0)
        }
        let counters = &mut self.next_id;
        counters.student = counters.student.max(highest(self.students.iter().map(|s| s.id)));
        counters.subject = counters.subject.max(highest(self.subjects.iter().map(|s| s.id)));
        counters.grade = counters.grade.max(highest(self.grades.iter().map(|g| g.id)));
        counters.reminder = counters.reminder.max(highest(self.reminders.iter().map(|r| r.id)));
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(self)?;
        fs::write(path, body)
            .with_context(|| format!("Failed to write grade book '{}'", path.display()))?;
        Ok(())
    }

    // ---- students -------------------------------------------------------

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn student(&self, id: u32) -> Result<&Student, GradebookError> {
        self.students
            .iter()
            .find(|s| s.id == id)
            .ok_or(GradebookError::StudentNotFound(id))
    }

    pub(crate) fn student_mut(&mut self, id: u32) -> Result<&mut Student, GradebookError> {
        self.students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(GradebookError::StudentNotFound(id))
    }

    /// All students ordered by class, then name.
    pub fn students_sorted(&self) -> Vec<&Student> {
        let mut students: Vec<&Student> = self.students.iter().collect();
        students.sort_by(|a, b| {
            a.class_name
                .cmp(&b.class_name)
                .then_with(|| a.name.cmp(&b.name))
        });
        students
    }

    /// Students grouped by class label, each group ordered by name.
    pub fn students_by_class(&self) -> BTreeMap<String, Vec<&Student>> {
        let mut classes: BTreeMap<String, Vec<&Student>> = BTreeMap::new();
        for student in self.students_sorted() {
            classes
                .entry(student.class_name.clone())
                .or_default()
                .push(student);
        }
        classes
    }

    pub fn add_student(&mut self, new: NewStudent) -> Result<u32, GradebookError> {
        let new = new.validated()?;
        let now = Utc::now();
        let id = next(&mut self.next_id.student);
        info!(student_id = id, name = %new.name, class = %new.class_name, "Student added");
        self.students.push(Student {
            id,
            name: new.name,
            class_name: new.class_name,
            guardian_name: new.guardian_name,
            guardian_email: new.guardian_email,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    pub fn update_student(&mut self, id: u32, new: NewStudent) -> Result<(), GradebookError> {
        let new = new.validated()?;
        let student = self.student_mut(id)?;
        student.name = new.name;
        student.class_name = new.class_name;
        student.guardian_name = new.guardian_name;
        student.guardian_email = new.guardian_email;
        student.updated_at = Utc::now();
        Ok(())
    }

    /// Deletes a student together with all of its grades.
    ///
    /// Returns the number of grades removed.
    pub fn delete_student(&mut self, id: u32) -> Result<usize, GradebookError> {
        self.student(id)?;
        let removed = self.delete_grades_of_student(id);
        self.students.retain(|s| s.id != id);
        info!(student_id = id, grades_removed = removed, "Student deleted");
        Ok(removed)
    }

    pub(crate) fn delete_grades_of_student(&mut self, student_id: u32) -> usize {
        let before = self.grades.len();
        self.grades.retain(|g| g.student_id != student_id);
        before - self.grades.len()
    }

    // ---- subjects -------------------------------------------------------

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    /// All subjects ordered by name.
    pub fn subjects_sorted(&self) -> Vec<&Subject> {
        let mut subjects: Vec<&Subject> = self.subjects.iter().collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        subjects
    }

    pub fn subject(&self, id: u32) -> Result<&Subject, GradebookError> {
        self.subjects
            .iter()
            .find(|s| s.id == id)
            .ok_or(GradebookError::SubjectNotFound(id))
    }

    pub fn subject_by_name(&self, name: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.name == name.trim())
    }

    pub fn add_subject(&mut self, name: &str) -> Result<u32, GradebookError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GradebookError::MissingField("name"));
        }
        if self.subject_by_name(name).is_some() {
            return Err(GradebookError::DuplicateSubject(name.to_string()));
        }
        if self.subjects.len() >= MAX_SUBJECTS {
            return Err(GradebookError::SubjectLimitReached(MAX_SUBJECTS));
        }
        let id = next(&mut self.next_id.subject);
        self.subjects.push(Subject {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    pub fn rename_subject(&mut self, id: u32, name: &str) -> Result<(), GradebookError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GradebookError::MissingField("name"));
        }
        if self.subjects.iter().any(|s| s.name == name && s.id != id) {
            return Err(GradebookError::DuplicateSubject(name.to_string()));
        }
        let subject = self
            .subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(GradebookError::SubjectNotFound(id))?;
        subject.name = name.to_string();
        Ok(())
    }

    /// Deletes a subject; refused while any grade references it.
    pub fn delete_subject(&mut self, id: u32) -> Result<(), GradebookError> {
        let subject = self.subject(id)?;
        let grades = self.grades.iter().filter(|g| g.subject_id == id).count();
        if grades > 0 {
            return Err(GradebookError::SubjectInUse {
                name: subject.name.clone(),
                grades,
            });
        }
        self.subjects.retain(|s| s.id != id);
        Ok(())
    }

    /// Fills an empty book with [`DEFAULT_SUBJECTS`]. Returns how many were added.
    pub fn seed_default_subjects(&mut self) -> usize {
        if !self.subjects.is_empty() {
            return 0;
        }
        for name in DEFAULT_SUBJECTS {
            let id = next(&mut self.next_id.subject);
            self.subjects.push(Subject {
                id,
                name: name.to_string(),
            });
        }
        info!(count = DEFAULT_SUBJECTS.len(), "Added default subjects");
        DEFAULT_SUBJECTS.len()
    }

    // ---- grades ---------------------------------------------------------

    pub fn grades(&self) -> &[Grade] {
        &self.grades
    }

    pub fn grades_for_student(&self, student_id: u32) -> impl Iterator<Item = &Grade> {
        self.grades.iter().filter(move |g| g.student_id == student_id)
    }

    pub fn grade(&self, id: u32) -> Result<&Grade, GradebookError> {
        self.grades
            .iter()
            .find(|g| g.id == id)
            .ok_or(GradebookError::GradeNotFound(id))
    }

    pub fn add_grade(
        &mut self,
        student_id: u32,
        subject_id: u32,
        value: GradeValue,
        date: NaiveDate,
    ) -> Result<u32, GradebookError> {
        self.student(student_id)?;
        self.subject(subject_id)?;
        Ok(self.push_grade(student_id, subject_id, value, date))
    }

    fn push_grade(
        &mut self,
        student_id: u32,
        subject_id: u32,
        value: GradeValue,
        date: NaiveDate,
    ) -> u32 {
        let id = next(&mut self.next_id.grade);
        self.grades.push(Grade {
            id,
            value,
            date,
            student_id,
            subject_id,
            created_at: Utc::now(),
        });
        id
    }

    /// Adds every valid entry for one student and subject.
    ///
    /// Blank, non-numeric and out-of-range values are skipped, as are entries
    /// with a bad date under [`MissingDatePolicy::Skip`]. Returns how many
    /// grades were added.
    pub fn add_grades(
        &mut self,
        student_id: u32,
        subject_id: u32,
        entries: &[GradeEntry],
        policy: MissingDatePolicy,
    ) -> Result<usize, GradebookError> {
        self.student(student_id)?;
        self.subject(subject_id)?;

        let today = Utc::now().date_naive();
        let mut accepted = Vec::new();
        for entry in entries {
            if entry.value.trim().is_empty() {
                continue;
            }
            let value = match GradeValue::parse(&entry.value) {
                Ok(value) => value,
                Err(e) => {
                    debug!(error = %e, "Skipping grade entry");
                    continue;
                }
            };
            let date = match entry.date.as_deref().map(parse_grade_date) {
                Some(Ok(date)) => date,
                _ if policy == MissingDatePolicy::Today => today,
                _ => {
                    debug!(date = ?entry.date, "Skipping grade entry without a valid date");
                    continue;
                }
            };
            accepted.push((value, date));
        }

        for (value, date) in &accepted {
            self.push_grade(student_id, subject_id, *value, *date);
        }
        info!(student_id, subject_id, added = accepted.len(), "Grades added");
        Ok(accepted.len())
    }

    /// Replaces value, date and subject of an existing grade.
    pub fn update_grade(
        &mut self,
        id: u32,
        value: &str,
        date: &str,
        subject_id: u32,
    ) -> Result<(), GradebookError> {
        if value.trim().is_empty() {
            return Err(GradebookError::MissingField("value"));
        }
        if date.trim().is_empty() {
            return Err(GradebookError::MissingField("date"));
        }
        let value = GradeValue::parse(value)?;
        let date = parse_grade_date(date)?;
        self.subject(subject_id)?;

        let grade = self
            .grades
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(GradebookError::GradeNotFound(id))?;
        grade.value = value;
        grade.date = date;
        grade.subject_id = subject_id;
        Ok(())
    }

    pub fn delete_grade(&mut self, id: u32) -> Result<(), GradebookError> {
        self.grade(id)?;
        self.grades.retain(|g| g.id != id);
        Ok(())
    }

    // ---- reminders ------------------------------------------------------

    /// Reminders ordered by weekday, then time.
    pub fn reminders_sorted(&self) -> Vec<&Reminder> {
        let mut reminders: Vec<&Reminder> = self.reminders.iter().collect();
        reminders.sort_by(|a, b| {
            a.day_of_week
                .cmp(&b.day_of_week)
                .then_with(|| a.time_of_day.cmp(&b.time_of_day))
        });
        reminders
    }

    pub fn add_reminder(&mut self, new: NewReminder) -> Result<u32, GradebookError> {
        let new = new.validated()?;
        let now = Utc::now();
        let id = next(&mut self.next_id.reminder);
        self.reminders.push(Reminder {
            id,
            title: new.title,
            description: new.description,
            day_of_week: new.day_of_week,
            time_of_day: new.time_of_day,
            active: true,
            school_time_only: true,
            school_start_date: None,
            school_end_date: None,
            last_triggered: None,
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    fn reminder_mut(&mut self, id: u32) -> Result<&mut Reminder, GradebookError> {
        self.reminders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(GradebookError::ReminderNotFound(id))
    }

    pub fn update_reminder(
        &mut self,
        id: u32,
        new: NewReminder,
        active: bool,
    ) -> Result<(), GradebookError> {
        let new = new.validated()?;
        let reminder = self.reminder_mut(id)?;
        reminder.title = new.title;
        reminder.description = new.description;
        reminder.day_of_week = new.day_of_week;
        reminder.time_of_day = new.time_of_day;
        reminder.active = active;
        reminder.updated_at = Utc::now();
        Ok(())
    }

    /// Sets the school-year window used by school-time-only reminders.
    pub fn set_reminder_school_year(
        &mut self,
        id: u32,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<(), GradebookError> {
        let reminder = self.reminder_mut(id)?;
        reminder.school_start_date = start;
        reminder.school_end_date = end;
        reminder.updated_at = Utc::now();
        Ok(())
    }

    /// Flips the active flag and returns the new state.
    pub fn toggle_reminder(&mut self, id: u32) -> Result<bool, GradebookError> {
        let reminder = self.reminder_mut(id)?;
        reminder.active = !reminder.active;
        reminder.updated_at = Utc::now();
        Ok(reminder.active)
    }

    pub fn delete_reminder(&mut self, id: u32) -> Result<(), GradebookError> {
        self.reminder_mut(id)?;
        self.reminders.retain(|r| r.id != id);
        Ok(())
    }

    /// Returns the reminders due at `now` and marks them as triggered.
    pub fn check_due_reminders(&mut self, now: NaiveDateTime) -> Vec<Reminder> {
        let mut due = Vec::new();
        for reminder in &mut self.reminders {
            if reminder.is_due(now) {
                reminder.last_triggered = Some(now);
                due.push(reminder.clone());
            }
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn book_with_student() -> (GradeBook, u32, u32) {
        let mut book = GradeBook::new();
        let student = book
            .add_student(NewStudent::new("Ana Pop", "5A", "Maria Pop", "maria@example.com"))
            .unwrap();
        let subject = book.add_subject("Mathematics").unwrap();
        (book, student, subject)
    }

    #[test]
    fn test_delete_subject_with_grades_is_rejected() {
        let (mut book, student, subject) = book_with_student();
        book.add_grade(student, subject, GradeValue::new(9.0).unwrap(), date(2024, 3, 1))
            .unwrap();

        let err = book.delete_subject(subject).unwrap_err();
        assert_eq!(
            err,
            GradebookError::SubjectInUse {
                name: "Mathematics".into(),
                grades: 1
            }
        );
        assert!(book.subject(subject).is_ok());
    }

    #[test]
    fn test_delete_subject_without_grades_succeeds() {
        let (mut book, _, subject) = book_with_student();
        book.delete_subject(subject).unwrap();
        assert!(book.subjects().is_empty());
    }

    #[test]
    fn test_delete_student_cascades_to_grades() {
        let (mut book, student, subject) = book_with_student();
        let other = book
            .add_student(NewStudent::new("Ion", "5A", "Dan", "dan@example.com"))
            .unwrap();
        for v in [5.0, 6.0, 7.0] {
            book.add_grade(student, subject, GradeValue::new(v).unwrap(), date(2024, 3, 1))
                .unwrap();
        }
        book.add_grade(other, subject, GradeValue::new(8.0).unwrap(), date(2024, 3, 1))
            .unwrap();

        assert_eq!(book.delete_student(student).unwrap(), 3);
        assert!(book.grades().iter().all(|g| g.student_id == other));
        assert_eq!(book.grades().len(), 1);
        assert!(book.student(student).is_err());
    }

    #[test]
    fn test_subject_names_are_unique_and_capped() {
        let mut book = GradeBook::new();
        book.add_subject("History").unwrap();
        assert_eq!(
            book.add_subject(" History "),
            Err(GradebookError::DuplicateSubject("History".into()))
        );

        let mut full = GradeBook::new();
        assert_eq!(full.seed_default_subjects(), MAX_SUBJECTS);
        assert_eq!(full.seed_default_subjects(), 0);
        assert_eq!(
            full.add_subject("Astronomy"),
            Err(GradebookError::SubjectLimitReached(MAX_SUBJECTS))
        );
    }

    #[test]
    fn test_rename_subject_rejects_existing_name() {
        let mut book = GradeBook::new();
        let a = book.add_subject("Art").unwrap();
        book.add_subject("Music").unwrap();
        assert!(book.rename_subject(a, "Music").is_err());
        book.rename_subject(a, "Fine Art").unwrap();
        assert_eq!(book.subject(a).unwrap().name, "Fine Art");
    }

    #[test]
    fn test_add_grades_skips_invalid_entries() {
        let (mut book, student, subject) = book_with_student();
        let entries = vec![
            GradeEntry::new("9", Some("2024-03-01")),
            GradeEntry::new("", Some("2024-03-01")),
            GradeEntry::new("11", Some("2024-03-01")),
            GradeEntry::new("abc", Some("2024-03-01")),
            GradeEntry::new("7", Some("not-a-date")),
            GradeEntry::new("6", None),
        ];

        let added = book
            .add_grades(student, subject, &entries, MissingDatePolicy::Skip)
            .unwrap();
        assert_eq!(added, 1);

        let added = book
            .add_grades(student, subject, &entries, MissingDatePolicy::Today)
            .unwrap();
        assert_eq!(added, 3);
        assert_eq!(book.grades().len(), 4);
    }

    #[test]
    fn test_add_grades_requires_existing_student_and_subject() {
        let (mut book, student, _) = book_with_student();
        let entries = vec![GradeEntry::new("9", Some("2024-03-01"))];
        assert_eq!(
            book.add_grades(student, 99, &entries, MissingDatePolicy::Skip),
            Err(GradebookError::SubjectNotFound(99))
        );
        assert!(book.grades().is_empty());
    }

    #[test]
    fn test_update_grade_validates() {
        let (mut book, student, subject) = book_with_student();
        let id = book
            .add_grade(student, subject, GradeValue::new(4.0).unwrap(), date(2024, 3, 1))
            .unwrap();

        assert_eq!(
            book.update_grade(id, "12", "2024-03-02", subject),
            Err(GradebookError::InvalidGrade(12.0))
        );
        book.update_grade(id, "8.5", "2024-03-02", subject).unwrap();
        let grade = book.grade(id).unwrap();
        assert_eq!(grade.value.get(), 8.5);
        assert_eq!(grade.date, date(2024, 3, 2));
    }

    #[test]
    fn test_save_and_load_round_trip_keeps_ids_increasing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        let (mut book, _, _) = book_with_student();
        book.save(&path).unwrap();

        let mut loaded = GradeBook::load(&path).unwrap();
        assert_eq!(loaded.students().len(), 1);
        let id = loaded
            .add_student(NewStudent::new("B", "6B", "C", "c@example.com"))
            .unwrap();
        assert_eq!(id, 2);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let book = GradeBook::load(&dir.path().join("absent.json")).unwrap();
        assert!(book.students().is_empty());
    }

    #[test]
    fn test_check_due_reminders_marks_triggered() {
        let mut book = GradeBook::new();
        let id = book
            .add_reminder(NewReminder {
                title: "Report".into(),
                ..Default::default()
            })
            .unwrap();
        book.update_reminder(
            id,
            NewReminder {
                title: "Report".into(),
                ..Default::default()
            },
            true,
        )
        .unwrap();
        // Friday 17:05
        let now = date(2024, 3, 15).and_hms_opt(17, 5, 0).unwrap();
        assert_eq!(book.check_due_reminders(now).len(), 1);
        assert!(book.check_due_reminders(now).is_empty());
        assert!(!book.toggle_reminder(id).unwrap());
    }

    fn write_book(dir: &Path, grades: &str, with_counters: bool) -> std::path::PathBuf {
        let counters = if with_counters {
            r#","next_id":{"student":1,"subject":1,"grade":1,"reminder":0}"#
        } else {
            ""
        };
        let body = format!(
            r#"{{"students":[{{"id":1,"name":"Ana","class_name":"5A","guardian_name":"Maria",
                "guardian_email":"maria@example.com","created_at":"2024-01-01T00:00:00Z",
                "updated_at":"2024-01-01T00:00:00Z"}}],
              "subjects":[{{"id":3,"name":"Math"}}],
              "grades":{grades}{counters}}}"#
        );
        let path = dir.join("gradebook.json");
        fs::write(&path, body).unwrap();
        path
    }

    fn grade_json(id: u32, value: f64, student: u32, subject: u32) -> String {
        format!(
            r#"{{"id":{id},"value":{value},"date":"2024-03-01","student_id":{student},
                "subject_id":{subject},"created_at":"2024-03-01T00:00:00Z"}}"#
        )
    }

    #[test]
    fn test_load_rejects_out_of_range_grade() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_book(dir.path(), &format!("[{}]", grade_json(1, 42.0, 1, 3)), true);
        let err = GradeBook::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("between 1 and 10"));
    }

    #[test]
    fn test_load_rejects_dangling_references() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_book(dir.path(), &format!("[{}]", grade_json(1, 8.0, 99, 3)), true);
        let err = GradeBook::load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GradebookError>(),
            Some(&GradebookError::StudentNotFound(99))
        );

        let path = write_book(dir.path(), &format!("[{}]", grade_json(1, 8.0, 1, 7)), true);
        let err = GradeBook::load(&path).unwrap_err();
        assert_eq!(
            err.downcast_ref::<GradebookError>(),
            Some(&GradebookError::SubjectNotFound(7))
        );
    }

    #[test]
    fn test_load_without_counters_continues_after_stored_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_book(dir.path(), &format!("[{}]", grade_json(5, 8.0, 1, 3)), false);
        let mut book = GradeBook::load(&path).unwrap();

        let student = book
            .add_student(NewStudent::new("Ion", "5A", "Dan", "dan@example.com"))
            .unwrap();
        assert_eq!(student, 2);
        assert_eq!(book.add_subject("History").unwrap(), 4);
        let grade = book
            .add_grade(student, 4, GradeValue::new(7.0).unwrap(), date(2024, 3, 2))
            .unwrap();
        assert_eq!(grade, 6);
    }
}
