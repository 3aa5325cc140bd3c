//! Append-only text sink for completed annotations.
//!
//! One line per completed item:
//!
//! ```text
//! <name>: <result as compact JSON>
//! ```
//!
//! The file is opened, appended to and closed for every item, so each
//! completed line is on disk before the next item starts.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::constants::SINK_SEPARATOR;
use crate::error::AnnotateError;

/// One parsed sink line.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkRecord {
    pub name: String,
    pub result: serde_json::Value,
}

/// Render a result the way it is written to the sink.
pub fn render<R: Serialize>(result: &R) -> Result<String, serde_json::Error> {
    serde_json::to_string(result)
}

/// Whether `path` is an existing regular file, empty or not.
fn is_existing_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file())
}

/// Append-only output file.
#[derive(Debug, Clone)]
pub struct AnnotationSink {
    path: PathBuf,
}

impl AnnotationSink {
    /// Bind to `path`.
    ///
    /// Without `append`, an existing sink file is refused, even an empty
    /// one, so prior work is never mixed with a new run by accident. Nothing is created or
    /// written here; the file appears with the first completed item.
    pub fn open(path: impl Into<PathBuf>, append: bool) -> Result<Self, AnnotateError> {
        let path = path.into();
        if !append && is_existing_file(&path) {
            return Err(AnnotateError::configuration(path));
        }
        log::debug!(
            "Sink {:?} ready ({})",
            path,
            if append { "append" } else { "fresh" }
        );
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one `name: rendered` line.
    pub fn append(&self, name: &str, rendered: &str) -> Result<(), AnnotateError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AnnotateError::persistence(&self.path, e))?;

        writeln!(file, "{}{}{}", name, SINK_SEPARATOR, rendered)
            .and_then(|()| file.flush())
            .map_err(|e| AnnotateError::persistence(&self.path, e))?;

        log::info!("💾 Saved '{}' to {:?}", name, self.path);
        Ok(())
    }

    /// Parse every well-formed line of the sink. A missing file has no records.
    pub fn read_records(&self) -> Result<Vec<SinkRecord>, AnnotateError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some(record) => records.push(record),
                None => log::warn!("{:?} line {}: not a 'name: json' record", self.path, i + 1),
            }
        }
        Ok(records)
    }

    /// Names of every item already recorded in the sink.
    pub fn completed_names(&self) -> Result<HashSet<String>, AnnotateError> {
        Ok(self
            .read_records()?
            .into_iter()
            .map(|record| record.name)
            .collect())
    }
}

/// Split at the first separator whose right-hand side is valid JSON, so
/// names that contain the separator themselves still parse.
fn parse_line(line: &str) -> Option<SinkRecord> {
    line.match_indices(SINK_SEPARATOR).find_map(|(at, sep)| {
        let result = serde_json::from_str(&line[at + sep.len()..]).ok()?;
        Some(SinkRecord {
            name: line[..at].to_string(),
            result,
        })
    })
}
