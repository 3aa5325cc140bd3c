//! Global constants for pointtag

use crate::canvas::{Color, Key};

/// Key that completes the current item.
pub const DEFAULT_FINISH_KEY: Key = Key::Char('q');

/// Default label keys and their marker colors, in mode order.
pub const DEFAULT_LABELS: [(char, Color); 8] = [
    ('b', [0, 0, 255]),
    ('g', [0, 128, 0]),
    ('r', [255, 0, 0]),
    ('c', [0, 191, 191]),
    ('m', [191, 0, 191]),
    ('y', [191, 191, 0]),
    ('k', [0, 0, 0]),
    ('w', [255, 255, 255]),
];

/// Separator between item name and rendered result in the sink.
pub const SINK_SEPARATOR: &str = ": ";
