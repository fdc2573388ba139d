use serde::Serialize;

use super::utility::{average, mean_abs_deviation, stddev};

/// Dispersion of the overall averages of one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassStats {
    pub students: usize,
    pub mean: f64,
    pub mean_abs_deviation: f64,
    pub std_deviation: f64,
}

impl ClassStats {
    /// Computes statistics over the overall averages of the students that
    /// have any grade. Returns `None` when there are none.
    pub fn from_averages(overall_averages: &[f64]) -> Option<Self> {
        if overall_averages.is_empty() {
            return None;
        }
        let mean = average(overall_averages);
        Some(Self {
            students: overall_averages.len(),
            mean,
            mean_abs_deviation: mean_abs_deviation(overall_averages, mean),
            std_deviation: stddev(overall_averages, mean),
        })
    }
}
