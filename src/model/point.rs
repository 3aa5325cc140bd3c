//! Categorized point data model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One user annotation: a label and a position in data (array) space.
///
/// Serialized as the 3-element array `[label, x, y]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "(String, f64, f64)", from = "(String, f64, f64)")]
pub struct CategorizedPoint {
    /// Label active when the point was placed
    pub label: String,
    /// Column coordinate
    pub x: f64,
    /// Row coordinate
    pub y: f64,
}

impl CategorizedPoint {
    pub fn new(label: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            label: label.into(),
            x,
            y,
        }
    }
}

impl From<CategorizedPoint> for (String, f64, f64) {
    fn from(point: CategorizedPoint) -> Self {
        (point.label, point.x, point.y)
    }
}

impl From<(String, f64, f64)> for CategorizedPoint {
    fn from((label, x, y): (String, f64, f64)) -> Self {
        Self { label, x, y }
    }
}

impl fmt::Display for CategorizedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.label, self.x, self.y)
    }
}
