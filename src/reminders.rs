//! Weekly reminders shown to the teacher, e.g. "send the Friday grade report".

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GradebookError;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: u32,
    pub title: String,
    pub description: Option<String>,
    /// 0 = Monday .. 6 = Sunday.
    pub day_of_week: u8,
    /// 24h `HH:MM`.
    pub time_of_day: String,
    pub active: bool,
    pub school_time_only: bool,
    pub school_start_date: Option<NaiveDate>,
    pub school_end_date: Option<NaiveDate>,
    pub last_triggered: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User-supplied reminder fields.
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub day_of_week: u8,
    pub time_of_day: String,
}

impl Default for NewReminder {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: None,
            day_of_week: 4,
            time_of_day: "17:00".to_string(),
        }
    }
}

impl NewReminder {
    pub fn validated(self) -> Result<Self, GradebookError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(GradebookError::MissingField("title"));
        }
        if self.day_of_week > 6 {
            return Err(GradebookError::InvalidField("day_of_week"));
        }
        parse_time_of_day(&self.time_of_day)?;
        Ok(Self { title, ..self })
    }
}

fn parse_time_of_day(raw: &str) -> Result<NaiveTime, GradebookError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| GradebookError::InvalidField("time_of_day"))
}

impl Reminder {
    pub fn day_name(&self) -> &'static str {
        DAY_NAMES[usize::from(self.day_of_week.min(6))]
    }

    /// Whether the reminder should fire at `now`.
    ///
    /// Fires once per day, during the configured hour from the configured
    /// minute onwards.
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        if !self.active {
            return false;
        }

        if now.weekday().num_days_from_monday() != u32::from(self.day_of_week) {
            return false;
        }

        let Ok(at) = parse_time_of_day(&self.time_of_day) else {
            return false;
        };
        if now.hour() != at.hour() || now.minute() < at.minute() {
            return false;
        }

        if let Some(last) = self.last_triggered {
            if last.date() == now.date() {
                return false;
            }
        }

        if self.school_time_only {
            let today = now.date();
            if let (Some(start), Some(end)) = (self.school_start_date, self.school_end_date) {
                if today < start || today > end {
                    return false;
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn friday_at(hour: u32, minute: u32) -> NaiveDateTime {
        // 2024-03-15 is a Friday.
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn reminder() -> Reminder {
        Reminder {
            id: 1,
            title: "Weekly report".into(),
            description: None,
            day_of_week: 4,
            time_of_day: "17:00".into(),
            active: true,
            school_time_only: true,
            school_start_date: None,
            school_end_date: None,
            last_triggered: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_due_within_configured_hour() {
        let r = reminder();
        assert!(r.is_due(friday_at(17, 0)));
        assert!(r.is_due(friday_at(17, 45)));
        assert!(!r.is_due(friday_at(16, 59)));
        assert!(!r.is_due(friday_at(18, 0)));
    }

    #[test]
    fn test_not_due_on_other_days_or_when_inactive() {
        let mut r = reminder();
        r.day_of_week = 0;
        assert!(!r.is_due(friday_at(17, 10)));

        let mut r = reminder();
        r.active = false;
        assert!(!r.is_due(friday_at(17, 10)));
    }

    #[test]
    fn test_fires_once_per_day() {
        let mut r = reminder();
        r.last_triggered = Some(friday_at(17, 1));
        assert!(!r.is_due(friday_at(17, 30)));
    }

    #[test]
    fn test_school_year_bounds() {
        let mut r = reminder();
        r.school_start_date = NaiveDate::from_ymd_opt(2024, 9, 1);
        r.school_end_date = NaiveDate::from_ymd_opt(2025, 6, 20);
        assert!(!r.is_due(friday_at(17, 10)));

        r.school_time_only = false;
        assert!(r.is_due(friday_at(17, 10)));
    }

    #[test]
    fn test_new_reminder_validation() {
        let bad = NewReminder {
            title: "  ".into(),
            ..Default::default()
        };
        assert_eq!(
            bad.validated().unwrap_err(),
            GradebookError::MissingField("title")
        );

        let bad_time = NewReminder {
            title: "x".into(),
            time_of_day: "25:00".into(),
            ..Default::default()
        };
        assert!(bad_time.validated().is_err());
        assert_eq!(reminder().day_name(), "Friday");
    }
}
