//! Data unit: one item of a batch.

use std::path::Path;

use ndarray::Array2;

use crate::data::LoaderRegistry;
use crate::error::AnnotateError;

/// One item to annotate, plus its result once annotation is complete.
///
/// `annotation` is `None` until the owning session completes and is then set
/// exactly once.
#[derive(Debug, Clone)]
pub struct DataUnit<R> {
    /// Identifier used as the persistence key
    pub name: String,
    /// Raw array to annotate
    pub data: Array2<f64>,
    annotation: Option<R>,
}

impl<R> DataUnit<R> {
    /// Create a unit from an array.
    pub fn new(name: impl Into<String>, data: Array2<f64>) -> Self {
        Self {
            name: name.into(),
            data,
            annotation: None,
        }
    }

    /// Load a unit from disk, named after the file stem.
    pub fn load(path: &Path, registry: &LoaderRegistry) -> Result<Self, AnnotateError> {
        let bytes = std::fs::read(path)?;
        let filename = path.file_name().and_then(|f| f.to_str());
        let data = registry
            .load(&bytes, filename)
            .map_err(|e| AnnotateError::load(path, e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        log::debug!("Loaded item '{}' with shape {:?}", name, data.dim());
        Ok(Self::new(name, data))
    }

    /// The completed annotation, if any.
    pub fn annotation(&self) -> Option<&R> {
        self.annotation.as_ref()
    }

    pub fn is_annotated(&self) -> bool {
        self.annotation.is_some()
    }

    /// Record the completed annotation. A unit is only ever annotated once.
    pub(crate) fn set_annotation(&mut self, result: R) {
        if self.annotation.is_some() {
            log::warn!("Item '{}' already annotated, keeping first result", self.name);
            return;
        }
        self.annotation = Some(result);
    }
}
