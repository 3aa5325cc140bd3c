//! Loading items from disk into 2D arrays.
//!
//! This module provides:
//! - `ItemLoader`: trait implemented by each on-disk format
//! - `LoaderRegistry`: format detection and a unified loading interface
//! - Built-in loaders for NumPy (.npy), delimited text and standard images
//!
//! ## Adding New Formats
//!
//! 1. Create a new loader in `loaders/` implementing `ItemLoader`
//! 2. Register it in `LoaderRegistry::new()`
//!
//! ```rust,ignore
//! use pointtag::data::{ItemLoader, LoaderError};
//!
//! pub struct FitsLoader;
//!
//! impl ItemLoader for FitsLoader {
//!     fn id(&self) -> &'static str { "fits" }
//!     fn extensions(&self) -> &'static [&'static str] { &["fits"] }
//!     fn can_load(&self, data: &[u8]) -> bool { data.starts_with(b"SIMPLE") }
//!     fn load(&self, data: &[u8]) -> Result<Array2<f64>, LoaderError> { /* ... */ }
//! }
//! ```

mod loader;
pub mod loaders;

pub use loader::{ItemLoader, LoaderError, LoaderRegistry};
