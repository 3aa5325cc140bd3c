//! Canvas that draws nothing and records everything.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use ndarray::ArrayView2;

use super::{Canvas, CanvasConfig, CanvasError, CanvasEvent, CanvasFactory, Marker, MarkerId};

/// Everything the headless canvases opened by one factory have seen.
#[derive(Debug, Default)]
pub struct CanvasRecord {
    /// Number of canvases opened
    pub opened: usize,
    /// Number of canvases closed
    pub closed: usize,
    /// Config of every opened canvas, in order
    pub configs: Vec<CanvasConfig>,
    /// Shape of every rendered image, in order
    pub images: Vec<(usize, usize)>,
    /// Markers currently visible on the most recent canvas
    pub markers: Vec<Marker>,
    /// Fail every marker draw (for exercising error paths)
    pub fail_draws: bool,
}

/// Canvas without a display.
///
/// Events are served from a queue shared with the [`HeadlessFactory`] that
/// opened it, so a test can script a whole batch up front.
pub struct HeadlessCanvas {
    record: Rc<RefCell<CanvasRecord>>,
    events: Rc<RefCell<VecDeque<CanvasEvent>>>,
    closed: bool,
}

impl HeadlessCanvas {
    fn ensure_open(&self) -> Result<(), CanvasError> {
        if self.closed {
            Err(CanvasError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Canvas for HeadlessCanvas {
    fn show_image(&mut self, image: ArrayView2<'_, f64>) -> Result<(), CanvasError> {
        self.ensure_open()?;
        let (rows, cols) = image.dim();
        if rows == 0 || cols == 0 {
            return Err(CanvasError::EmptyImage { rows, cols });
        }
        self.record.borrow_mut().images.push((rows, cols));
        Ok(())
    }

    fn draw_marker(&mut self, marker: Marker) -> Result<(), CanvasError> {
        self.ensure_open()?;
        let mut record = self.record.borrow_mut();
        if record.fail_draws {
            return Err(CanvasError::Backend("draw rejected".to_string()));
        }
        record.markers.push(marker);
        Ok(())
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<(), CanvasError> {
        self.ensure_open()?;
        let mut record = self.record.borrow_mut();
        let index = record
            .markers
            .iter()
            .position(|m| m.id == id)
            .ok_or(CanvasError::UnknownMarker(id))?;
        record.markers.remove(index);
        Ok(())
    }

    fn next_event(&mut self) -> Option<CanvasEvent> {
        if self.closed {
            return None;
        }
        self.events.borrow_mut().pop_front()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.record.borrow_mut().closed += 1;
        }
    }
}

/// Opens [`HeadlessCanvas`]es that share one event queue and one record.
#[derive(Default, Clone)]
pub struct HeadlessFactory {
    record: Rc<RefCell<CanvasRecord>>,
    events: Rc<RefCell<VecDeque<CanvasEvent>>>,
}

impl HeadlessFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event for whichever canvas asks next.
    pub fn push_event(&self, event: CanvasEvent) {
        self.events.borrow_mut().push_back(event);
    }

    /// Queue several events.
    pub fn push_events(&self, events: impl IntoIterator<Item = CanvasEvent>) {
        self.events.borrow_mut().extend(events);
    }

    /// Number of queued events not yet delivered.
    pub fn pending_events(&self) -> usize {
        self.events.borrow().len()
    }

    /// Shared record of all canvases opened by this factory.
    pub fn record(&self) -> Rc<RefCell<CanvasRecord>> {
        Rc::clone(&self.record)
    }

    /// Make every subsequent marker draw fail.
    pub fn set_fail_draws(&self, fail: bool) {
        self.record.borrow_mut().fail_draws = fail;
    }
}

impl CanvasFactory for HeadlessFactory {
    fn open(&mut self, config: &CanvasConfig) -> Result<Box<dyn Canvas>, CanvasError> {
        {
            let mut record = self.record.borrow_mut();
            record.opened += 1;
            record.configs.push(config.clone());
            record.markers.clear();
        }
        Ok(Box::new(HeadlessCanvas {
            record: Rc::clone(&self.record),
            events: Rc::clone(&self.events),
            closed: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Key, MouseButton};
    use ndarray::Array2;

    fn marker(id: u64) -> Marker {
        Marker {
            id: MarkerId(id),
            x: 1.0,
            y: 2.0,
            color: [0, 0, 255],
        }
    }

    #[test]
    fn test_remove_by_id_not_position() {
        let mut factory = HeadlessFactory::new();
        let mut canvas = factory.open(&CanvasConfig::default()).unwrap();
        canvas.draw_marker(marker(1)).unwrap();
        canvas.draw_marker(marker(2)).unwrap();
        canvas.draw_marker(marker(3)).unwrap();

        canvas.remove_marker(MarkerId(2)).unwrap();

        let ids: Vec<u64> = factory
            .record()
            .borrow()
            .markers
            .iter()
            .map(|m| m.id.0)
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(
            canvas.remove_marker(MarkerId(2)),
            Err(CanvasError::UnknownMarker(MarkerId(2)))
        );
    }

    #[test]
    fn test_events_shared_across_canvases() {
        let mut factory = HeadlessFactory::new();
        factory.push_event(CanvasEvent::key(Key::Char('r')));
        factory.push_event(CanvasEvent::click(MouseButton::Left, 1.0, 1.0));

        let mut first = factory.open(&CanvasConfig::default()).unwrap();
        assert_eq!(first.next_event(), Some(CanvasEvent::key(Key::Char('r'))));
        first.close();
        assert_eq!(first.next_event(), None);

        let mut second = factory.open(&CanvasConfig::default()).unwrap();
        assert!(matches!(
            second.next_event(),
            Some(CanvasEvent::MousePressed { .. })
        ));
        assert_eq!(factory.record().borrow().opened, 2);
        assert_eq!(factory.record().borrow().closed, 1);
    }

    #[test]
    fn test_rejects_empty_image() {
        let mut factory = HeadlessFactory::new();
        let mut canvas = factory.open(&CanvasConfig::default()).unwrap();
        let empty = Array2::<f64>::zeros((0, 4));
        assert_eq!(
            canvas.show_image(empty.view()),
            Err(CanvasError::EmptyImage { rows: 0, cols: 4 })
        );
    }

    #[test]
    fn test_closed_canvas_rejects_draws() {
        let mut factory = HeadlessFactory::new();
        let mut canvas = factory.open(&CanvasConfig::default()).unwrap();
        canvas.close();
        canvas.close();
        assert_eq!(canvas.draw_marker(marker(1)), Err(CanvasError::Closed));
        assert_eq!(factory.record().borrow().closed, 1);
    }
}
