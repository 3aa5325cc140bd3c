//! Configuration file support for pointtag.
//!
//! A run is described by one JSON file: the label set, the finish key, the
//! items to annotate, where results go and which bundled transforms to use.
//! Every field has a default, so `{}` plus a list of items is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::canvas::{Color, Key};
use crate::constants::{DEFAULT_FINISH_KEY, DEFAULT_LABELS};
use crate::keybindings::KeyBindings;
use crate::model::{Category, LabelSet};
use crate::transforms::{PostprocessKind, PreprocessKind};

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Errors in configuration files and label/key setup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config version {found} (expected {expected})")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Label set is empty")]
    EmptyLabelSet,

    #[error("Key '{0}' is bound to more than one label")]
    DuplicateKey(Key),

    #[error("Finish key '{0}' is also a label key")]
    FinishKeyConflict(Key),

    #[error("No items to annotate")]
    NoItems,

    #[error("Item name {0:?} contains a line break")]
    InvalidItemName(String),
}

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// One label: its key (also its name) and marker color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelConfig {
    pub key: Key,
    pub color: Color,
}

/// What to annotate and where results go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Item files, annotated in this order
    #[serde(default)]
    pub items: Vec<PathBuf>,

    /// Append-only output file
    #[serde(default = "default_sink")]
    pub sink: PathBuf,

    /// Allow adding to a sink that already has content
    #[serde(default)]
    pub append: bool,

    /// Skip items whose name already appears in the sink (needs `append`)
    #[serde(default)]
    pub skip_completed: bool,

    #[serde(default)]
    pub preprocess: PreprocessKind,

    #[serde(default)]
    pub postprocess: PostprocessKind,
}

fn default_sink() -> PathBuf {
    PathBuf::from("annotations.out")
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            sink: default_sink(),
            append: false,
            skip_completed: false,
            preprocess: PreprocessKind::default(),
            postprocess: PostprocessKind::default(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Label set, in mode order. The first label is active at session start.
    #[serde(default = "default_labels")]
    pub labels: Vec<LabelConfig>,

    /// Key that completes the current item
    #[serde(default = "default_finish_key")]
    pub finish_key: Key,

    #[serde(default)]
    pub batch: BatchConfig,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_labels() -> Vec<LabelConfig> {
    DEFAULT_LABELS
        .iter()
        .map(|&(c, color)| LabelConfig {
            key: Key::Char(c),
            color,
        })
        .collect()
}

fn default_finish_key() -> Key {
    DEFAULT_FINISH_KEY
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            labels: default_labels(),
            finish_key: default_finish_key(),
            batch: BatchConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse a config from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.version != CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch {
                expected: CONFIG_VERSION,
                found: config.version,
            });
        }
        Ok(config)
    }

    /// Load a config file. Relative item and sink paths are resolved
    /// against the directory containing the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Write this config as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &PathBuf| {
            if p.is_relative() {
                base.join(p)
            } else {
                p.clone()
            }
        };
        self.batch.items = self.batch.items.iter().map(resolve).collect();
        self.batch.sink = resolve(&self.batch.sink);
    }

    /// Build the label set.
    pub fn label_set(&self) -> Result<LabelSet, ConfigError> {
        LabelSet::new(
            self.labels
                .iter()
                .map(|l| Category::new(l.key, l.color))
                .collect(),
        )
    }

    /// Build the key dispatch table.
    pub fn key_bindings(&self) -> Result<KeyBindings, ConfigError> {
        KeyBindings::new(&self.label_set()?, self.finish_key)
    }

    /// Check everything a run needs before any item is loaded.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.key_bindings()?;
        if self.batch.items.is_empty() {
            return Err(ConfigError::NoItems);
        }
        if self.batch.skip_completed && !self.batch.append {
            log::warn!("skip_completed has no effect without append");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gets_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.labels.len(), 8);
        assert_eq!(config.finish_key, Key::Char('q'));
        assert!(!config.batch.append);
    }

    #[test]
    fn test_full_config() {
        let json = r#"{
            "version": 1,
            "log_level": "debug",
            "labels": [
                { "key": "s", "color": [255, 255, 0] },
                { "key": "n", "color": [0, 255, 255] }
            ],
            "finish_key": "enter",
            "batch": {
                "items": ["a.npy", "b.csv"],
                "sink": "out.txt",
                "append": true,
                "skip_completed": true,
                "preprocess": "log-norm",
                "postprocess": "gather-categories"
            }
        }"#;
        let config = AppConfig::from_json(json).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.finish_key, Key::Enter);
        assert_eq!(config.batch.preprocess, PreprocessKind::LogNorm);
        assert_eq!(config.batch.postprocess, PostprocessKind::GatherCategories);
        config.validate().unwrap();

        let labels = config.label_set().unwrap();
        assert_eq!(labels.first().name, "s");
    }

    #[test]
    fn test_version_mismatch() {
        let result = AppConfig::from_json(r#"{ "version": 99 }"#);
        assert!(matches!(
            result,
            Err(ConfigError::VersionMismatch { found: 99, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_setups() {
        let mut config = AppConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::NoItems)));

        config.batch.items.push(PathBuf::from("a.npy"));
        config.finish_key = Key::Char('b');
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FinishKeyConflict(_))
        ));

        config.finish_key = Key::Char('q');
        config.labels.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyLabelSet)));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(
            &path,
            r#"{ "batch": { "items": ["scans/a.npy", "/abs/b.npy"], "sink": "out.txt" } }"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.batch.items[0], dir.path().join("scans/a.npy"));
        assert_eq!(config.batch.items[1], PathBuf::from("/abs/b.npy"));
        assert_eq!(config.batch.sink, dir.path().join("out.txt"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");
        let mut config = AppConfig::default();
        config.batch.items.push(dir.path().join("x.csv"));
        config.batch.sink = dir.path().join("out.txt");
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }
}
