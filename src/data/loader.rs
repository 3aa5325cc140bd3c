//! Trait-based item loading.
//!
//! ## Supported Formats
//!
//! - **NumPy Arrays**: 2-D `.npy` files of any common numeric dtype
//! - **Delimited Text**: whitespace or comma separated numbers, one row per line
//! - **Standard Images**: PNG, JPEG, BMP, TIFF, WebP, converted to luma
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pointtag::data::LoaderRegistry;
//!
//! let registry = LoaderRegistry::new();
//! let array = registry.load(&bytes, Some("scan.npy"))?;
//! ```

use ndarray::Array2;

/// Error type for loader operations.
#[derive(Debug, Clone)]
pub struct LoaderError {
    /// Human-readable error message.
    pub message: String,
    /// The loader that produced this error (if known).
    pub loader_id: Option<&'static str>,
}

impl LoaderError {
    /// Create a new loader error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            loader_id: None,
        }
    }

    /// Create an error with loader context.
    pub fn with_loader(mut self, loader_id: &'static str) -> Self {
        self.loader_id = Some(loader_id);
        self
    }
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(loader) = self.loader_id {
            write!(f, "[{}] {}", loader, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for LoaderError {}

impl From<String> for LoaderError {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for LoaderError {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Trait for item format loaders.
pub trait ItemLoader {
    /// Unique identifier for this loader (e.g., "npy", "text", "image").
    fn id(&self) -> &'static str;

    /// File extensions this loader handles (lowercase, without dots).
    fn extensions(&self) -> &'static [&'static str];

    /// Check magic bytes or headers to see whether this loader can
    /// likely handle the data. Used when the extension is unknown.
    fn can_load(&self, data: &[u8]) -> bool;

    /// Load a 2D array from raw file bytes.
    fn load(&self, data: &[u8]) -> Result<Array2<f64>, LoaderError>;

    /// Priority for format detection (higher = checked first).
    fn priority(&self) -> i32 {
        0
    }
}

/// Registry of available item loaders.
pub struct LoaderRegistry {
    loaders: Vec<Box<dyn ItemLoader>>,
}

impl LoaderRegistry {
    /// Create a new registry with all built-in loaders.
    pub fn new() -> Self {
        let mut registry = Self {
            loaders: Vec::new(),
        };

        registry.register(Box::new(super::loaders::NpyLoader));
        registry.register(Box::new(super::loaders::ImageLoader));
        registry.register(Box::new(super::loaders::TextLoader));

        registry
    }

    /// Register a new loader.
    pub fn register(&mut self, loader: Box<dyn ItemLoader>) {
        self.loaders.push(loader);
        self.loaders.sort_by(|a, b| b.priority().cmp(&a.priority()));
    }

    /// Get all supported file extensions.
    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<&'static str> = self
            .loaders
            .iter()
            .flat_map(|l| l.extensions().iter().copied())
            .collect();
        extensions.sort();
        extensions.dedup();
        extensions
    }

    fn loaders_for_extension(&self, ext: &str) -> impl Iterator<Item = &dyn ItemLoader> {
        let ext_lower = ext.to_lowercase();
        self.loaders
            .iter()
            .filter(move |l| l.extensions().iter().any(|e| *e == ext_lower))
            .map(|l| l.as_ref())
    }

    fn detect_loader(&self, data: &[u8]) -> Option<&dyn ItemLoader> {
        self.loaders
            .iter()
            .find(|l| l.can_load(data))
            .map(|l| l.as_ref())
    }

    /// Load an array, auto-detecting the format.
    ///
    /// Tries loaders in this order:
    /// 1. By file extension (if filename provided)
    /// 2. By magic byte detection
    /// 3. All loaders as fallback
    ///
    /// When an extension match exists but fails, its error is returned so the
    /// caller sees why a `.npy` file was rejected rather than a generic message.
    pub fn load(&self, data: &[u8], filename: Option<&str>) -> Result<Array2<f64>, LoaderError> {
        let extension = filename
            .and_then(|f| f.rsplit_once('.'))
            .map(|(_, e)| e.to_lowercase());

        let mut first_error = None;

        if let Some(ref ext) = extension {
            for loader in self.loaders_for_extension(ext) {
                match loader.load(data) {
                    Ok(array) => {
                        log::debug!("Loaded with {} loader (by extension)", loader.id());
                        return Ok(array);
                    }
                    Err(e) => {
                        log::trace!("Loader {} failed: {}", loader.id(), e);
                        first_error.get_or_insert(e.with_loader(loader.id()));
                    }
                }
            }
        }

        if let Some(loader) = self.detect_loader(data) {
            match loader.load(data) {
                Ok(array) => {
                    log::debug!("Loaded with {} loader (by detection)", loader.id());
                    return Ok(array);
                }
                Err(e) => {
                    log::trace!("Detected loader {} failed: {}", loader.id(), e);
                    first_error.get_or_insert(e.with_loader(loader.id()));
                }
            }
        }

        for loader in &self.loaders {
            if let Ok(array) = loader.load(data) {
                log::debug!("Loaded with {} loader (fallback)", loader.id());
                return Ok(array);
            }
        }

        Err(first_error.unwrap_or_else(|| {
            LoaderError::new(format!(
                "No loader could handle the data{}",
                filename
                    .map(|f| format!(" (file: {})", f))
                    .unwrap_or_default()
            ))
        }))
    }

    /// Check if a filename has a supported extension.
    pub fn is_supported_file(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.supported_extensions()
            .iter()
            .any(|ext| lower.ends_with(&format!(".{}", ext)))
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
