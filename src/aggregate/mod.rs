//! Average computation over grade collections.
//!
//! Per-subject averages are plain arithmetic means. A student's overall
//! average is the mean of those per-subject means, never the mean of all raw
//! grades, and every report surface goes through [`overall_average`] so the
//! policy stays consistent.

pub mod band;
pub mod class;
pub mod student;
pub mod utility;

pub use band::Band;
pub use class::ClassStats;
pub use student::{GradePoint, StudentAggregate, SubjectAggregate, aggregate_student};
pub use utility::{average, mean_abs_deviation, overall_average, stddev};
