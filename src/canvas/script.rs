//! Text-driven canvas.
//!
//! Reads one event per line:
//!
//! ```text
//! # comment
//! key r
//! click left 12.5 40
//! click right -
//! ```
//!
//! A `-` in place of coordinates is a click outside the image.

use std::cell::RefCell;
use std::io::BufRead;
use std::rc::Rc;

use ndarray::ArrayView2;

use super::{
    Canvas, CanvasConfig, CanvasError, CanvasEvent, CanvasFactory, DataPoint, Key, Marker,
    MarkerId, MouseButton,
};

/// Parse a single script line.
///
/// Returns `Ok(None)` for blank lines and comments.
pub fn parse_event(line: &str) -> Result<Option<CanvasEvent>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("key") => {
            let key = parts.next().ok_or("missing key name")?.parse::<Key>()?;
            Ok(Some(CanvasEvent::key(key)))
        }
        Some("click") => {
            let button = parts.next().ok_or("missing mouse button")?.parse()?;
            let position = match (parts.next(), parts.next()) {
                (Some("-"), None) | (None, None) => None,
                (Some(x), Some(y)) => Some(DataPoint::new(parse_coord(x)?, parse_coord(y)?)),
                _ => return Err("expected 'click <button> <x> <y>'".to_string()),
            };
            Ok(Some(CanvasEvent::MousePressed { button, position }))
        }
        Some(other) => Err(format!("unknown command '{}'", other)),
        None => Ok(None),
    }
}

/// Coordinates must be finite; JSON has no NaN or infinity.
fn parse_coord(s: &str) -> Result<f64, String> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("invalid coordinate '{}': {}", s, e))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("coordinate '{}' is not finite", s))
    }
}

/// Canvas whose input comes from a shared line reader.
///
/// Rendering is reported through the log only.
pub struct ScriptCanvas<R: BufRead> {
    reader: Rc<RefCell<R>>,
    title: String,
    markers: Vec<MarkerId>,
    closed: bool,
}

impl<R: BufRead> ScriptCanvas<R> {
    fn ensure_open(&self) -> Result<(), CanvasError> {
        if self.closed {
            Err(CanvasError::Closed)
        } else {
            Ok(())
        }
    }
}

impl<R: BufRead> Canvas for ScriptCanvas<R> {
    fn show_image(&mut self, image: ArrayView2<'_, f64>) -> Result<(), CanvasError> {
        self.ensure_open()?;
        let (rows, cols) = image.dim();
        if rows == 0 || cols == 0 {
            return Err(CanvasError::EmptyImage { rows, cols });
        }
        let (min, max) = image
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        log::info!(
            "🖼️  {}: showing {}x{} array, range [{:.3}, {:.3}]",
            self.title,
            rows,
            cols,
            min,
            max
        );
        Ok(())
    }

    fn draw_marker(&mut self, marker: Marker) -> Result<(), CanvasError> {
        self.ensure_open()?;
        log::debug!(
            "Marker #{} at ({:.2}, {:.2}) color {:?}",
            marker.id,
            marker.x,
            marker.y,
            marker.color
        );
        self.markers.push(marker.id);
        Ok(())
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), CanvasError> {
        self.ensure_open()?;
        let index = self
            .markers
            .iter()
            .position(|m| *m == id)
            .ok_or(CanvasError::UnknownMarker(id))?;
        self.markers.remove(index);
        log::debug!("Marker #{} removed", id);
        Ok(())
    }

    fn next_event(&mut self) -> Option<CanvasEvent> {
        if self.closed {
            return None;
        }
        let mut reader = self.reader.borrow_mut();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => match parse_event(&line) {
                    Ok(Some(event)) => return Some(event),
                    Ok(None) => continue,
                    Err(e) => log::warn!("Ignoring script line {:?}: {}", line.trim(), e),
                },
                Err(e) => {
                    log::error!("Failed to read event script: {}", e);
                    return None;
                }
            }
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            log::debug!("{}: closed", self.title);
        }
    }
}

/// Opens [`ScriptCanvas`]es that all read from the same input.
pub struct ScriptFactory<R: BufRead> {
    reader: Rc<RefCell<R>>,
}

impl<R: BufRead> ScriptFactory<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Rc::new(RefCell::new(reader)),
        }
    }
}

impl<R: BufRead + 'static> CanvasFactory for ScriptFactory<R> {
    fn open(&mut self, config: &CanvasConfig) -> Result<Box<dyn Canvas>, CanvasError> {
        let keys: Vec<String> = config.reserved_keys.iter().map(Key::name).collect();
        log::info!("{} (keys: {})", config.title, keys.join(" "));
        Ok(Box::new(ScriptCanvas {
            reader: Rc::clone(&self.reader),
            title: config.title.clone(),
            markers: Vec::new(),
            closed: false,
        }))
    }
}
