//! Rendering surface the annotation session draws on.
//!
//! The session never talks to a windowing system directly. It renders through
//! the [`Canvas`] trait and receives input as [`CanvasEvent`]s pulled from the
//! same canvas. A [`CanvasFactory`] opens one canvas per session.
//!
//! Two implementations ship with the crate:
//! - [`HeadlessCanvas`]: records every call and replays queued events (tests, dry runs)
//! - [`ScriptCanvas`]: reads events as text commands from any `BufRead`

mod headless;
mod script;

pub use headless::{CanvasRecord, HeadlessCanvas, HeadlessFactory};
pub use script::{ScriptCanvas, ScriptFactory, parse_event};

use std::fmt;
use std::str::FromStr;

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// RGB marker color.
pub type Color = [u8; 3];

/// Errors reported by a canvas backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    /// The canvas was already closed.
    #[error("canvas is closed")]
    Closed,

    /// A marker id that was never drawn (or was already removed).
    #[error("unknown marker #{0}")]
    UnknownMarker(MarkerId),

    /// The image to render has no pixels.
    #[error("cannot render an empty {rows}x{cols} array")]
    EmptyImage {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// Backend-specific failure.
    #[error("{0}")]
    Backend(String),
}

/// Identifier shared by a placed point and the marker drawn for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point marker in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub x: f64,
    pub y: f64,
    pub color: Color,
}

/// Position of a pointer event in data (array) space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
}

impl DataPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

impl FromStr for MouseButton {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "1" => Ok(MouseButton::Left),
            "middle" | "2" => Ok(MouseButton::Middle),
            "right" | "3" => Ok(MouseButton::Right),
            other => other
                .parse::<u16>()
                .map(MouseButton::Other)
                .map_err(|_| format!("unknown mouse button '{}'", s)),
        }
    }
}

/// Keyboard keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Delete,
    Tab,
    Space,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Name used for this key in config files, scripts and labels.
    pub fn name(&self) -> String {
        match self {
            Key::Char(c) => c.to_string(),
            Key::Enter => "enter".to_string(),
            Key::Escape => "escape".to_string(),
            Key::Backspace => "backspace".to_string(),
            Key::Delete => "delete".to_string(),
            Key::Tab => "tab".to_string(),
            Key::Space => "space".to_string(),
            Key::Up => "up".to_string(),
            Key::Down => "down".to_string(),
            Key::Left => "left".to_string(),
            Key::Right => "right".to_string(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(if c == ' ' { Key::Space } else { Key::Char(c) });
        }

        match s.to_ascii_lowercase().as_str() {
            "enter" | "return" => Ok(Key::Enter),
            "escape" | "esc" => Ok(Key::Escape),
            "backspace" => Ok(Key::Backspace),
            "delete" | "del" => Ok(Key::Delete),
            "tab" => Ok(Key::Tab),
            "space" => Ok(Key::Space),
            "up" => Ok(Key::Up),
            "down" => Ok(Key::Down),
            "left" => Ok(Key::Left),
            "right" => Ok(Key::Right),
            _ => Err(format!("unknown key '{}'", s)),
        }
    }
}

impl TryFrom<String> for Key {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name()
    }
}

/// Input delivered by a canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// Mouse button pressed. `position` is `None` when the click landed
    /// outside the rendered array.
    MousePressed {
        button: MouseButton,
        position: Option<DataPoint>,
    },
    /// Keyboard key pressed.
    KeyPressed { key: Key },
}

impl CanvasEvent {
    /// Shorthand for a click inside the image.
    pub fn click(button: MouseButton, x: f64, y: f64) -> Self {
        CanvasEvent::MousePressed {
            button,
            position: Some(DataPoint::new(x, y)),
        }
    }

    /// Shorthand for a key press.
    pub fn key(key: Key) -> Self {
        CanvasEvent::KeyPressed { key }
    }
}

/// Per-session settings handed to the canvas when it is opened.
///
/// `reserved_keys` are the keys the session claims; a backend must not run
/// its own shortcuts for them while this canvas is open.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanvasConfig {
    /// Window or surface title
    pub title: String,
    /// Keys bound by the session
    pub reserved_keys: Vec<Key>,
}

/// A rendering surface bound to one session.
pub trait Canvas {
    /// Render a 2D array as an image.
    fn show_image(&mut self, image: ArrayView2<'_, f64>) -> Result<(), CanvasError>;

    /// Draw a point marker.
    fn draw_marker(&mut self, marker: Marker) -> Result<(), CanvasError>;

    /// Remove a previously drawn marker.
    fn remove_marker(&mut self, id: MarkerId) -> Result<(), CanvasError>;

    /// Wait for the next input event. `None` means the event source is gone.
    fn next_event(&mut self) -> Option<CanvasEvent>;

    /// Tear the surface down. Calling this twice is harmless.
    fn close(&mut self);
}

/// Opens a fresh canvas for each session.
pub trait CanvasFactory {
    fn open(&mut self, config: &CanvasConfig) -> Result<Box<dyn Canvas>, CanvasError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parse_single_char() {
        assert_eq!("b".parse::<Key>(), Ok(Key::Char('b')));
        assert_eq!("Q".parse::<Key>(), Ok(Key::Char('Q')));
        assert_eq!(" ".parse::<Key>(), Ok(Key::Space));
    }

    #[test]
    fn test_key_parse_named() {
        assert_eq!("Enter".parse::<Key>(), Ok(Key::Enter));
        assert_eq!("esc".parse::<Key>(), Ok(Key::Escape));
        assert!("hyper".parse::<Key>().is_err());
    }

    #[test]
    fn test_key_serde_as_string() {
        let json = serde_json::to_string(&vec![Key::Char('r'), Key::Enter]).unwrap();
        assert_eq!(json, r#"["r","enter"]"#);
        let keys: Vec<Key> = serde_json::from_str(&json).unwrap();
        assert_eq!(keys, vec![Key::Char('r'), Key::Enter]);
    }

    #[test]
    fn test_mouse_button_parse() {
        assert_eq!("left".parse::<MouseButton>(), Ok(MouseButton::Left));
        assert_eq!("3".parse::<MouseButton>(), Ok(MouseButton::Right));
        assert_eq!("8".parse::<MouseButton>(), Ok(MouseButton::Other(8)));
        assert!("thumb".parse::<MouseButton>().is_err());
    }
}
