//! pointtag - interactive point annotation for 2-D arrays
//!
//! A batch of arrays is shown one at a time on a canvas. The user switches
//! between labels with single key presses, drops labelled points with the
//! left mouse button, removes the most recent one with the right button and
//! finishes the item with a dedicated key. Each finished item is appended to
//! a text sink as `name: <json>` before the next one opens.

pub mod batch;
pub mod canvas;
pub mod config;
pub mod constants;
pub mod data;
pub mod error;
pub mod keybindings;
pub mod model;
pub mod session;
pub mod sink;
pub mod transforms;

pub use batch::{Advance, BatchBuilder, BatchController, RunSummary};
pub use canvas::{Canvas, CanvasConfig, CanvasEvent, CanvasFactory, Key, MouseButton};
pub use config::{AppConfig, ConfigError};
pub use error::AnnotateError;
pub use keybindings::{KeyAction, KeyBindings};
pub use model::{CategorizedPoint, Category, DataUnit, LabelSet};
pub use session::{AnnotationSession, ResultHandler, Transition};
pub use sink::AnnotationSink;
