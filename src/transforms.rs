//! Pluggable pre- and postprocessing transforms.
//!
//! A preprocess transform maps the raw item array to the array shown on the
//! canvas. A postprocess transform maps the ordered point list of a finished
//! session to whatever gets persisted. Both are plain closures; the ones here
//! are the bundled defaults selectable from the config file.

use std::collections::BTreeMap;
use std::rc::Rc;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::model::CategorizedPoint;

/// Raw array to display array. Must not depend on anything but its input.
pub type Preprocess = Rc<dyn Fn(ArrayView2<'_, f64>) -> Array2<f64>>;

/// Ordered points to result.
pub type Postprocess<R> = Rc<dyn Fn(&[CategorizedPoint]) -> R>;

/// Points grouped by label, each group in placement order.
pub type GroupedPoints = BTreeMap<String, Vec<[f64; 2]>>;

/// Show the array as-is.
pub fn identity_preprocess(data: ArrayView2<'_, f64>) -> Array2<f64> {
    data.to_owned()
}

/// Persist the points as-is.
pub fn identity_postprocess(points: &[CategorizedPoint]) -> Vec<CategorizedPoint> {
    points.to_vec()
}

/// Median of the array values, NumPy style (mean of the middle pair for even
/// counts). `None` for an empty array.
pub fn median(data: ArrayView2<'_, f64>) -> Option<f64> {
    let mut values: Vec<f64> = data.iter().copied().collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Background-subtracted log display.
///
/// Subtracts the median, clamps everything below 1 up to 1 and takes log2,
/// so the background sits at 0 and faint features above it stand out.
pub fn log_norm(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let Some(median) = median(data) else {
        return data.to_owned();
    };
    data.mapv(|v| {
        let shifted = v - median;
        if shifted < 1.0 { 0.0 } else { shifted.log2() }
    })
}

/// Group points by label.
pub fn gather_categories(points: &[CategorizedPoint]) -> GroupedPoints {
    let mut groups = GroupedPoints::new();
    for point in points {
        groups
            .entry(point.label.clone())
            .or_default()
            .push([point.x, point.y]);
    }
    groups
}

/// Named preprocess transforms for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreprocessKind {
    #[default]
    Identity,
    LogNorm,
}

impl PreprocessKind {
    pub fn transform(self) -> Preprocess {
        match self {
            PreprocessKind::Identity => Rc::new(identity_preprocess),
            PreprocessKind::LogNorm => Rc::new(log_norm),
        }
    }
}

/// Named postprocess transforms for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostprocessKind {
    #[default]
    Identity,
    GatherCategories,
}
