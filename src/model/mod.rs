//! Data models for pointtag.

mod category;
mod data_unit;
mod point;

pub use category::{Category, LabelSet};
pub use data_unit::DataUnit;
pub use point::CategorizedPoint;
