use serde::Serialize;

/// Display classification of an average.
///
/// | Range        | Band    |
/// |--------------|---------|
/// | >= 8.0       | Good    |
/// | >= 5.0       | Average |
/// | < 5.0        | Poor    |
///
/// Lower bounds are inclusive: 8.0 is good and 5.0 is average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Good,
    Average,
    Poor,
}

impl Band {
    pub fn from_average(value: f64) -> Self {
        match value {
            v if v >= 8.0 => Self::Good,
            v if v >= 5.0 => Self::Average,
            _ => Self::Poor,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Average => "average",
            Self::Poor => "poor",
        }
    }

    /// Cell background colour as `0xRRGGBB`.
    pub fn background(self) -> u32 {
        match self {
            Self::Good => 0xC6EFCE,
            Self::Average => 0xFFEB9C,
            Self::Poor => 0xFFC7CE,
        }
    }

    /// Cell font colour as `0xRRGGBB`.
    pub fn foreground(self) -> u32 {
        match self {
            Self::Good => 0x006100,
            Self::Average => 0x9C6500,
            Self::Poor => 0x9C0006,
        }
    }
}
