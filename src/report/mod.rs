//! Report Builder: turns aggregated grades into views, spreadsheet data and
//! guardian notification texts.

pub mod notification;
pub mod overview;
pub mod view;
pub mod workbook;

pub use notification::{GuardianDigest, NotificationOptions, guardian_digests};
pub use overview::{ClassSheet, NO_GRADE, Overview, OverviewRow, StudentSheet, build_overview};
pub use view::{StudentProfile, StudentView, SubjectView, grades_view, student_profile};
pub use workbook::render_workbook;
