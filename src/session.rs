//! Interactive annotation of a single item.
//!
//! A session renders one preprocessed array and turns canvas events into
//! point edits:
//!
//! - a label key selects the active mode
//! - a left click places a point in the active mode
//! - a right click removes the most recent point
//! - the finish key completes the item
//!
//! Completion runs the postprocess transform, closes the canvas and hands the
//! result to a [`ResultHandler`]. A completed session ignores further events.

use std::rc::Rc;

use ndarray::ArrayView2;

use crate::canvas::{Canvas, CanvasEvent, DataPoint, Marker, MarkerId, MouseButton};
use crate::error::AnnotateError;
use crate::keybindings::{KeyAction, KeyBindings};
use crate::model::{CategorizedPoint, LabelSet};
use crate::transforms::{Postprocess, Preprocess};

/// Receives the result of a completed session.
pub trait ResultHandler<R> {
    fn receive_result(&mut self, result: R) -> Result<(), AnnotateError>;
}

/// Everything a session needs besides its item and canvas. Shared by all
/// sessions of a batch.
pub struct SessionSetup<R> {
    pub labels: Rc<LabelSet>,
    pub bindings: Rc<KeyBindings>,
    pub preprocess: Preprocess,
    pub postprocess: Postprocess<R>,
}

impl<R> Clone for SessionSetup<R> {
    fn clone(&self) -> Self {
        Self {
            labels: Rc::clone(&self.labels),
            bindings: Rc::clone(&self.bindings),
            preprocess: Rc::clone(&self.preprocess),
            postprocess: Rc::clone(&self.postprocess),
        }
    }
}

/// Outcome of one event or operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Active mode is now this label
    ModeSelected(String),
    /// A point was appended
    PointPlaced(CategorizedPoint),
    /// The most recent point was removed
    PointRemoved(CategorizedPoint),
    /// Remove requested with no points placed
    NothingToRemove,
    /// The result was handed off and the session is closed
    Completed,
    /// The event has no meaning here
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    Closed,
}

/// A placed point and the marker drawn for it.
#[derive(Debug, Clone)]
struct PlacedPoint {
    marker: MarkerId,
    point: CategorizedPoint,
}

/// State machine for one item.
pub struct AnnotationSession<R> {
    name: String,
    canvas: Box<dyn Canvas>,
    labels: Rc<LabelSet>,
    bindings: Rc<KeyBindings>,
    postprocess: Postprocess<R>,
    mode: String,
    points: Vec<PlacedPoint>,
    next_marker: u64,
    state: SessionState,
}

impl<R> AnnotationSession<R> {
    /// Preprocess `data`, render it on `canvas` and start in the first mode.
    ///
    /// The canvas is closed again if rendering fails.
    pub fn new(
        name: impl Into<String>,
        data: ArrayView2<'_, f64>,
        setup: &SessionSetup<R>,
        mut canvas: Box<dyn Canvas>,
    ) -> Result<Self, AnnotateError> {
        let name = name.into();
        let shown = (setup.preprocess)(data);
        if let Err(e) = canvas.show_image(shown.view()) {
            canvas.close();
            return Err(e.into());
        }

        let mode = setup.labels.first().name.clone();
        log::debug!("▶️  Session '{}' started in mode '{}'", name, mode);

        Ok(Self {
            name,
            canvas,
            labels: Rc::clone(&setup.labels),
            bindings: Rc::clone(&setup.bindings),
            postprocess: Rc::clone(&setup.postprocess),
            mode,
            points: Vec::new(),
            next_marker: 0,
            state: SessionState::Active,
        })
    }

    /// Name of the item being annotated.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Currently active label.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Placed points, oldest first.
    pub fn points(&self) -> impl ExactSizeIterator<Item = &CategorizedPoint> {
        self.points.iter().map(|p| &p.point)
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Next input from the canvas. `None` once closed or when input ends.
    pub fn next_event(&mut self) -> Option<CanvasEvent> {
        if !self.is_active() {
            return None;
        }
        self.canvas.next_event()
    }

    /// Route one canvas event.
    pub fn handle_event(
        &mut self,
        event: CanvasEvent,
        handler: &mut dyn ResultHandler<R>,
    ) -> Result<Transition, AnnotateError> {
        if !self.is_active() {
            log::warn!("Session '{}' is closed, dropping {:?}", self.name, event);
            return Ok(Transition::Ignored);
        }

        let bindings = Rc::clone(&self.bindings);
        match event {
            CanvasEvent::KeyPressed { key } => match bindings.action_for_key(key) {
                Some(KeyAction::SelectMode(label)) => {
                    let label = label.clone();
                    Ok(self.select_mode(&label))
                }
                Some(KeyAction::Finish) => self.complete(handler),
                None => {
                    log::debug!("Key '{}' is not bound", key);
                    Ok(Transition::Ignored)
                }
            },
            CanvasEvent::MousePressed {
                button: MouseButton::Left,
                position: Some(DataPoint { x, y }),
            } => self.place_point(x, y),
            CanvasEvent::MousePressed {
                button: MouseButton::Left,
                position: None,
            } => {
                log::debug!("Click outside the image ignored");
                Ok(Transition::Ignored)
            }
            CanvasEvent::MousePressed {
                button: MouseButton::Right,
                ..
            } => self.remove_last_point(),
            CanvasEvent::MousePressed { button, .. } => {
                log::debug!("{:?} button is not bound", button);
                Ok(Transition::Ignored)
            }
        }
    }

    /// Make `label` the active mode. Unknown labels leave the mode unchanged.
    pub fn select_mode(&mut self, label: &str) -> Transition {
        if !self.is_active() || !self.labels.contains(label) {
            log::debug!("Mode '{}' not available", label);
            return Transition::Ignored;
        }
        if self.mode != label {
            self.mode = label.to_string();
        }
        log::debug!("Mode: {}", self.mode);
        Transition::ModeSelected(self.mode.clone())
    }

    /// Append a point in the active mode and draw its marker.
    ///
    /// If the canvas refuses the marker, no point is added.
    pub fn place_point(&mut self, x: f64, y: f64) -> Result<Transition, AnnotateError> {
        if !self.is_active() {
            return Ok(Transition::Ignored);
        }

        let color = self
            .labels
            .by_name(&self.mode)
            .map(|c| c.color)
            .unwrap_or_else(|| self.labels.first().color);
        let marker = MarkerId(self.next_marker);
        self.canvas.draw_marker(Marker {
            id: marker,
            x,
            y,
            color,
        })?;
        self.next_marker += 1;

        let point = CategorizedPoint::new(self.mode.clone(), x, y);
        log::debug!("➕ Adding: {}", point);
        self.points.push(PlacedPoint {
            marker,
            point: point.clone(),
        });
        Ok(Transition::PointPlaced(point))
    }

    /// Remove the most recent point and its marker. With no points this is
    /// a no-op that reports [`Transition::NothingToRemove`].
    pub fn remove_last_point(&mut self) -> Result<Transition, AnnotateError> {
        if !self.is_active() {
            return Ok(Transition::Ignored);
        }
        let Some(last) = self.points.last() else {
            log::debug!("Nothing to remove");
            return Ok(Transition::NothingToRemove);
        };

        self.canvas.remove_marker(last.marker)?;
        let removed = self.points.pop().map(|p| p.point);
        match removed {
            Some(point) => {
                log::debug!("➖ Removed: {}", point);
                Ok(Transition::PointRemoved(point))
            }
            None => Ok(Transition::NothingToRemove),
        }
    }

    /// Postprocess the points, close the canvas and hand the result off.
    pub fn complete(
        &mut self,
        handler: &mut dyn ResultHandler<R>,
    ) -> Result<Transition, AnnotateError> {
        if !self.is_active() {
            return Ok(Transition::Ignored);
        }

        let points: Vec<CategorizedPoint> = self.points.iter().map(|p| p.point.clone()).collect();
        let result = (self.postprocess)(&points);

        self.canvas.close();
        self.state = SessionState::Closed;
        log::debug!(
            "✅ Session '{}' completed with {} points",
            self.name,
            points.len()
        );

        handler.receive_result(result)?;
        Ok(Transition::Completed)
    }
}

impl<R> Drop for AnnotationSession<R> {
    fn drop(&mut self) {
        if self.is_active() {
            log::debug!("Session '{}' dropped before completion", self.name);
        }
        self.canvas.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasConfig, CanvasFactory, HeadlessFactory, Key};
    use crate::model::Category;
    use crate::transforms::{identity_postprocess, identity_preprocess};
    use ndarray::{Array2, ArrayView2, array};

    type Points = Vec<CategorizedPoint>;

    /// Collects handed-off results.
    struct Collector<R> {
        results: Vec<R>,
    }

    fn collector() -> Collector<Points> {
        Collector {
            results: Vec::new(),
        }
    }

    impl<R> ResultHandler<R> for Collector<R> {
        fn receive_result(&mut self, result: R) -> Result<(), AnnotateError> {
            self.results.push(result);
            Ok(())
        }
    }

    fn setup_with(labels: &[char]) -> SessionSetup<Vec<CategorizedPoint>> {
        let labels = LabelSet::new(
            labels
                .iter()
                .map(|&c| Category::new(Key::Char(c), [10, 20, 30]))
                .collect(),
        )
        .unwrap();
        let bindings = KeyBindings::new(&labels, Key::Char('q')).unwrap();
        SessionSetup {
            labels: Rc::new(labels),
            bindings: Rc::new(bindings),
            preprocess: Rc::new(identity_preprocess),
            postprocess: Rc::new(identity_postprocess),
        }
    }

    fn open(
        setup: &SessionSetup<Vec<CategorizedPoint>>,
    ) -> (AnnotationSession<Vec<CategorizedPoint>>, HeadlessFactory) {
        let mut factory = HeadlessFactory::new();
        let canvas = factory.open(&CanvasConfig::default()).unwrap();
        let data = array![[1.0, 2.0], [3.0, 4.0]];
        let session = AnnotationSession::new("item", data.view(), setup, canvas).unwrap();
        (session, factory)
    }

    fn labels_of(session: &AnnotationSession<Vec<CategorizedPoint>>) -> Vec<String> {
        session.points().map(|p| p.label.clone()).collect()
    }

    #[test]
    fn test_starts_in_first_mode_with_no_points() {
        let (session, factory) = open(&setup_with(&['A', 'B']));
        assert_eq!(session.mode(), "A");
        assert_eq!(session.point_count(), 0);
        assert_eq!(factory.record().borrow().images, vec![(2, 2)]);
    }

    #[test]
    fn test_preprocess_output_is_rendered() {
        let mut setup = setup_with(&['A']);
        setup.preprocess = Rc::new(|_: ArrayView2<'_, f64>| Array2::<f64>::zeros((5, 7)));
        let (_session, factory) = open(&setup);
        assert_eq!(factory.record().borrow().images, vec![(5, 7)]);
    }

    #[test]
    fn test_select_mode_is_idempotent() {
        let (mut session, _factory) = open(&setup_with(&['A', 'B']));
        let mut sink = collector();
        let b = CanvasEvent::key(Key::Char('B'));
        assert_eq!(
            session.handle_event(b.clone(), &mut sink).unwrap(),
            Transition::ModeSelected("B".to_string())
        );
        assert_eq!(
            session.handle_event(b, &mut sink).unwrap(),
            Transition::ModeSelected("B".to_string())
        );
        assert_eq!(session.mode(), "B");
        assert_eq!(session.point_count(), 0);
    }

    #[test]
    fn test_mode_change_does_not_relabel() {
        let (mut session, _factory) = open(&setup_with(&['A', 'B']));
        let mut sink = collector();
        session
            .handle_event(CanvasEvent::click(MouseButton::Left, 1.0, 1.0), &mut sink)
            .unwrap();
        session
            .handle_event(CanvasEvent::key(Key::Char('B')), &mut sink)
            .unwrap();
        session
            .handle_event(CanvasEvent::click(MouseButton::Left, 2.0, 2.0), &mut sink)
            .unwrap();
        assert_eq!(labels_of(&session), vec!["A", "B"]);
    }

    #[test]
    fn test_markers_track_points() {
        let (mut session, factory) = open(&setup_with(&['A']));
        session.place_point(1.0, 2.0).unwrap();
        session.place_point(3.0, 4.0).unwrap();
        {
            let record = factory.record();
            let record = record.borrow();
            assert_eq!(record.markers.len(), 2);
            assert_eq!(record.markers[1].x, 3.0);
            assert_eq!(record.markers[1].color, [10, 20, 30]);
        }

        session.remove_last_point().unwrap();
        let record = factory.record();
        let record = record.borrow();
        assert_eq!(record.markers.len(), 1);
        assert_eq!(record.markers[0].x, 1.0);
    }

    #[test]
    fn test_place_three_remove_two() {
        let (mut session, _factory) = open(&setup_with(&['A']));
        session.place_point(1.0, 1.0).unwrap();
        session.place_point(2.0, 2.0).unwrap();
        session.place_point(3.0, 3.0).unwrap();
        session.remove_last_point().unwrap();
        session.remove_last_point().unwrap();

        let remaining: Vec<_> = session.points().cloned().collect();
        assert_eq!(remaining, vec![CategorizedPoint::new("A", 1.0, 1.0)]);
    }

    #[test]
    fn test_remove_on_empty_is_noop() {
        let (mut session, _factory) = open(&setup_with(&['A']));
        let mut sink = collector();
        let right = CanvasEvent::click(MouseButton::Right, 0.0, 0.0);
        assert_eq!(
            session.handle_event(right.clone(), &mut sink).unwrap(),
            Transition::NothingToRemove
        );
        assert_eq!(
            session.handle_event(right, &mut sink).unwrap(),
            Transition::NothingToRemove
        );
        assert_eq!(session.point_count(), 0);
    }

    #[test]
    fn test_replay_matches_stack() {
        let (mut session, _factory) = open(&setup_with(&['A', 'B']));
        let mut sink = collector();
        let mut expected: Vec<CategorizedPoint> = Vec::new();
        let mut mode = "A";

        // place, remove and mode switches interleaved
        let script = [
            "p", "p", "r", "B", "p", "r", "r", "r", "p", "A", "p", "p", "r", "p",
        ];
        for (i, step) in script.iter().enumerate() {
            let x = i as f64;
            match *step {
                "p" => {
                    session
                        .handle_event(CanvasEvent::click(MouseButton::Left, x, -x), &mut sink)
                        .unwrap();
                    expected.push(CategorizedPoint::new(mode, x, -x));
                }
                "r" => {
                    session
                        .handle_event(CanvasEvent::click(MouseButton::Right, x, x), &mut sink)
                        .unwrap();
                    expected.pop();
                }
                label => {
                    let key = label.parse::<Key>().unwrap();
                    session
                        .handle_event(CanvasEvent::key(key), &mut sink)
                        .unwrap();
                    mode = label;
                }
            }
        }

        let actual: Vec<_> = session.points().cloned().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_complete_hands_off_identity_result() {
        let (mut session, factory) = open(&setup_with(&['A', 'B']));
        let mut sink = collector();
        session.place_point(1.0, 2.0).unwrap();
        session.select_mode("B");
        session.place_point(3.0, 4.0).unwrap();

        let transition = session
            .handle_event(CanvasEvent::key(Key::Char('q')), &mut sink)
            .unwrap();

        assert_eq!(transition, Transition::Completed);
        assert_eq!(
            sink.results,
            vec![vec![
                CategorizedPoint::new("A", 1.0, 2.0),
                CategorizedPoint::new("B", 3.0, 4.0),
            ]]
        );
        assert!(!session.is_active());
        assert_eq!(factory.record().borrow().closed, 1);
    }

    #[test]
    fn test_events_after_complete_are_ignored() {
        let (mut session, _factory) = open(&setup_with(&['A']));
        let mut sink = collector();
        session.complete(&mut sink).unwrap();

        let events = [
            CanvasEvent::click(MouseButton::Left, 1.0, 1.0),
            CanvasEvent::click(MouseButton::Right, 1.0, 1.0),
            CanvasEvent::key(Key::Char('q')),
        ];
        for event in events {
            assert_eq!(
                session.handle_event(event, &mut sink).unwrap(),
                Transition::Ignored
            );
        }
        assert_eq!(sink.results.len(), 1);
        assert!(session.next_event().is_none());
    }

    #[test]
    fn test_unbound_input_is_ignored() {
        let (mut session, _factory) = open(&setup_with(&['A']));
        let mut sink = collector();
        let events = [
            CanvasEvent::key(Key::Char('z')),
            CanvasEvent::key(Key::Escape),
            CanvasEvent::click(MouseButton::Middle, 1.0, 1.0),
            CanvasEvent::MousePressed {
                button: MouseButton::Left,
                position: None,
            },
        ];
        for event in events {
            assert_eq!(
                session.handle_event(event, &mut sink).unwrap(),
                Transition::Ignored
            );
        }
        assert_eq!(session.point_count(), 0);
        assert!(session.is_active());
    }

    #[test]
    fn test_draw_failure_keeps_lockstep() {
        let (mut session, factory) = open(&setup_with(&['A']));
        session.place_point(1.0, 1.0).unwrap();
        factory.set_fail_draws(true);

        assert!(session.place_point(2.0, 2.0).is_err());
        assert_eq!(session.point_count(), 1);
        assert_eq!(factory.record().borrow().markers.len(), 1);
    }

    #[test]
    fn test_render_failure_closes_canvas() {
        let mut setup = setup_with(&['A']);
        setup.preprocess = Rc::new(|_: ArrayView2<'_, f64>| Array2::<f64>::zeros((0, 0)));
        let mut factory = HeadlessFactory::new();
        let canvas = factory.open(&CanvasConfig::default()).unwrap();
        let data = array![[1.0]];

        let result = AnnotationSession::new("empty", data.view(), &setup, canvas);
        assert!(matches!(result, Err(AnnotateError::Canvas(_))));
        assert_eq!(factory.record().borrow().closed, 1);
    }

    #[test]
    fn test_drop_closes_canvas() {
        let (session, factory) = open(&setup_with(&['A']));
        drop(session);
        assert_eq!(factory.record().borrow().closed, 1);
    }
}
