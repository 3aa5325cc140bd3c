//! Label categories and the fixed label set of a session.

use crate::canvas::{Color, Key};
use crate::config::ConfigError;
use crate::constants::DEFAULT_LABELS;

/// An annotation category: the key that selects it, its name and marker color.
///
/// The name is always the key's name, so the key pressed to select a mode is
/// also the label recorded on every point placed in that mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// Key that selects this category
    pub key: Key,
    /// Label recorded on placed points
    pub name: String,
    /// RGB color for markers
    pub color: Color,
}

impl Category {
    /// Create a new category bound to `key`.
    pub fn new(key: Key, color: Color) -> Self {
        Self {
            key,
            name: key.name(),
            color,
        }
    }
}

/// Ordered, non-empty set of categories with unique keys.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSet {
    categories: Vec<Category>,
}

impl LabelSet {
    /// Build a label set. Fails on an empty list or duplicate keys.
    pub fn new(categories: Vec<Category>) -> Result<Self, ConfigError> {
        if categories.is_empty() {
            return Err(ConfigError::EmptyLabelSet);
        }
        for (i, category) in categories.iter().enumerate() {
            if categories[..i].iter().any(|c| c.key == category.key) {
                return Err(ConfigError::DuplicateKey(category.key));
            }
        }
        Ok(Self { categories })
    }

    /// The category a session starts in.
    pub fn first(&self) -> &Category {
        // Non-empty by construction
        &self.categories[0]
    }

    /// Category selected by `key`, if any.
    pub fn by_key(&self, key: Key) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Category with the given label, if any.
    pub fn by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            categories: DEFAULT_LABELS
                .iter()
                .map(|&(c, color)| Category::new(Key::Char(c), color))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_starts_with_blue() {
        let labels = LabelSet::default();
        assert_eq!(labels.len(), 8);
        assert_eq!(labels.first().name, "b");
        assert_eq!(labels.first().color, [0, 0, 255]);
    }

    #[test]
    fn test_lookup() {
        let labels = LabelSet::default();
        assert_eq!(labels.by_key(Key::Char('r')).map(|c| c.color), Some([255, 0, 0]));
        assert!(labels.by_key(Key::Char('x')).is_none());
        assert!(labels.contains("w"));
        assert!(!labels.contains("q"));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(LabelSet::new(Vec::new()), Err(ConfigError::EmptyLabelSet)));
    }

    #[test]
    fn test_rejects_duplicate_keys() {
        let result = LabelSet::new(vec![
            Category::new(Key::Char('a'), [1, 2, 3]),
            Category::new(Key::Char('a'), [4, 5, 6]),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateKey(Key::Char('a')))));
    }
}
