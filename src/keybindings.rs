//! Key dispatch for annotation sessions.
//!
//! Every label key selects its mode; one extra key finishes the item. The
//! table is built once from the label set and looked up per key press.

use std::collections::HashMap;

use crate::canvas::Key;
use crate::config::ConfigError;
use crate::constants::DEFAULT_FINISH_KEY;
use crate::model::LabelSet;

/// What a bound key does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Switch the active mode to this label
    SelectMode(String),
    /// Complete the current item
    Finish,
}

/// Keybinding table for a session.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    table: HashMap<Key, KeyAction>,
    /// Label keys in label-set order, then the finish key
    ordered: Vec<Key>,
    finish_key: Key,
}

impl KeyBindings {
    /// Build the table. The finish key must not also be a label key.
    pub fn new(labels: &LabelSet, finish_key: Key) -> Result<Self, ConfigError> {
        if labels.by_key(finish_key).is_some() {
            return Err(ConfigError::FinishKeyConflict(finish_key));
        }
        Ok(Self::build(labels, finish_key))
    }

    fn build(labels: &LabelSet, finish_key: Key) -> Self {
        let mut table = HashMap::with_capacity(labels.len() + 1);
        let mut ordered = Vec::with_capacity(labels.len() + 1);
        for category in labels.iter() {
            table.insert(category.key, KeyAction::SelectMode(category.name.clone()));
            ordered.push(category.key);
        }
        table.insert(finish_key, KeyAction::Finish);
        ordered.push(finish_key);

        Self {
            table,
            ordered,
            finish_key,
        }
    }

    /// The action bound to `key`, if any.
    pub fn action_for_key(&self, key: Key) -> Option<&KeyAction> {
        self.table.get(&key)
    }

    pub fn finish_key(&self) -> Key {
        self.finish_key
    }

    /// Every bound key, for the canvas to keep free of its own shortcuts.
    pub fn reserved_keys(&self) -> Vec<Key> {
        self.ordered.clone()
    }

    /// One line per binding, for on-screen help.
    pub fn help_lines(&self) -> Vec<String> {
        self.ordered
            .iter()
            .map(|key| match &self.table[key] {
                KeyAction::SelectMode(label) => format!("{:>6}  mode '{}'", key.name(), label),
                KeyAction::Finish => format!("{:>6}  finish item", key.name()),
            })
            .collect()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        // The default finish key is not one of the default labels
        Self::build(&LabelSet::default(), DEFAULT_FINISH_KEY)
    }
}
