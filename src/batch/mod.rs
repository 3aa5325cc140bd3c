//! Sequencing a queue of items through annotation sessions.
//!
//! The controller owns the items, the sink and the cursor. It opens one
//! session at a time; when that session completes, the result is stored on
//! the item, appended to the sink, and only then does the next session open.

use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use serde::Serialize;

use crate::canvas::{CanvasConfig, CanvasEvent, CanvasFactory, Key};
use crate::config::ConfigError;
use crate::constants::DEFAULT_FINISH_KEY;
use crate::error::AnnotateError;
use crate::keybindings::KeyBindings;
use crate::model::{CategorizedPoint, DataUnit, LabelSet};
use crate::session::{AnnotationSession, ResultHandler, SessionSetup, Transition};
use crate::sink::{AnnotationSink, render};
use crate::transforms::{Postprocess, Preprocess, identity_postprocess, identity_preprocess};


/// Result of trying to move to the next item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// A session is now open on this item
    Started { index: usize, name: String },
    /// The cursor is on the last item; nothing left to open
    Exhausted,
}

/// Counts reported at the end of [`BatchController::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Items completed and persisted in this run
    pub completed: usize,
    /// Items skipped because the sink already had them
    pub skipped: usize,
    /// Whether every item was visited
    pub finished: bool,
}

/// Builder for [`BatchController`].
///
/// The result type follows the postprocess transform, so the default builder
/// produces `Vec<CategorizedPoint>` and `postprocess` can change it.
pub struct BatchBuilder<R> {
    sink: PathBuf,
    append: bool,
    skip_completed: bool,
    labels: LabelSet,
    finish_key: Key,
    preprocess: Preprocess,
    postprocess: Postprocess<R>,
}

impl BatchBuilder<Vec<CategorizedPoint>> {
    fn new(sink: impl Into<PathBuf>) -> Self {
        Self {
            sink: sink.into(),
            append: false,
            skip_completed: false,
            labels: LabelSet::default(),
            finish_key: DEFAULT_FINISH_KEY,
            preprocess: Rc::new(identity_preprocess),
            postprocess: Rc::new(identity_postprocess),
        }
    }
}

impl<R: Serialize> BatchBuilder<R> {
    /// Allow a sink file that already exists.
    pub fn append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    /// Skip items already recorded in the sink. Only applies with `append`.
    pub fn skip_completed(mut self, skip: bool) -> Self {
        self.skip_completed = skip;
        self
    }

    pub fn labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    pub fn finish_key(mut self, key: Key) -> Self {
        self.finish_key = key;
        self
    }

    pub fn preprocess(mut self, preprocess: Preprocess) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Replace the postprocess transform, changing the result type.
    pub fn postprocess<R2: Serialize>(self, postprocess: Postprocess<R2>) -> BatchBuilder<R2> {
        BatchBuilder {
            sink: self.sink,
            append: self.append,
            skip_completed: self.skip_completed,
            labels: self.labels,
            finish_key: self.finish_key,
            preprocess: self.preprocess,
            postprocess,
        }
    }

    /// Validate everything and create the controller. No session is opened
    /// until the first [`BatchController::advance`].
    pub fn build(
        self,
        items: Vec<DataUnit<R>>,
        factory: Box<dyn CanvasFactory>,
    ) -> Result<BatchController<R>, AnnotateError> {
        if items.is_empty() {
            return Err(ConfigError::NoItems.into());
        }
        // One sink line per item
        if let Some(unit) = items.iter().find(|u| u.name.contains(['\n', '\r'])) {
            return Err(ConfigError::InvalidItemName(unit.name.clone()).into());
        }
        let bindings = KeyBindings::new(&self.labels, self.finish_key)?;
        let sink = AnnotationSink::open(self.sink, self.append)?;

        let skip = if self.append && self.skip_completed {
            let done = sink.completed_names()?;
            log::info!("{} item(s) already recorded in {:?}", done.len(), sink.path());
            done
        } else {
            HashSet::new()
        };

        log::info!("Batch of {} item(s) -> {:?}", items.len(), sink.path());
        Ok(BatchController {
            items,
            current: None,
            sink,
            setup: SessionSetup {
                labels: Rc::new(self.labels),
                bindings: Rc::new(bindings),
                preprocess: self.preprocess,
                postprocess: self.postprocess,
            },
            factory,
            session: None,
            skip,
            completed: 0,
            skipped: 0,
        })
    }
}

/// Owns the item queue, the sink and the one live session.
pub struct BatchController<R> {
    items: Vec<DataUnit<R>>,
    /// `None` before the first item
    current: Option<usize>,
    sink: AnnotationSink,
    setup: SessionSetup<R>,
    factory: Box<dyn CanvasFactory>,
    session: Option<AnnotationSession<R>>,
    skip: HashSet<String>,
    completed: usize,
    skipped: usize,
}

impl BatchController<Vec<CategorizedPoint>> {
    /// Start configuring a batch that writes to `sink`.
    pub fn builder(sink: impl Into<PathBuf>) -> BatchBuilder<Vec<CategorizedPoint>> {
        BatchBuilder::new(sink)
    }
}

impl<R: Serialize> BatchController<R> {
    /// Index of the current item, `None` before the first advance.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn items(&self) -> &[DataUnit<R>] {
        &self.items
    }

    /// Give the items back, with whatever annotations were completed.
    /// An open session is dropped, closing its canvas.
    pub fn into_items(self) -> Vec<DataUnit<R>> {
        self.items
    }

    pub fn sink(&self) -> &AnnotationSink {
        &self.sink
    }

    /// The live session, if any.
    pub fn session(&self) -> Option<&AnnotationSession<R>> {
        self.session.as_ref()
    }

    /// True once the cursor is on the last item and no session is open.
    pub fn is_exhausted(&self) -> bool {
        self.session.is_none() && self.current == Some(self.items.len() - 1)
    }

    /// Move to the next item and open a session on it.
    ///
    /// On the last item this reports [`Advance::Exhausted`] and changes
    /// nothing. A still-open session is abandoned without a result. Items
    /// already in the sink are stepped over when resuming.
    pub fn advance(&mut self) -> Result<Advance, AnnotateError> {
        loop {
            let next = self.current.map_or(0, |c| c + 1);
            if next >= self.items.len() {
                log::info!("No more items");
                return Ok(Advance::Exhausted);
            }

            if let Some(abandoned) = self.session.take() {
                log::warn!("Abandoning '{}' without a result", abandoned.name());
            }

            let name = self.items[next].name.clone();
            if self.skip.contains(&name) {
                log::info!("⏭️  Skipping '{}' (already in sink)", name);
                self.current = Some(next);
                self.skipped += 1;
                continue;
            }

            let config = CanvasConfig {
                title: format!("{} ({}/{})", name, next + 1, self.items.len()),
                reserved_keys: self.setup.bindings.reserved_keys(),
            };
            let canvas = self.factory.open(&config)?;
            let data = self.items[next].data.view();
            let session = AnnotationSession::new(name.clone(), data, &self.setup, canvas)?;

            self.current = Some(next);
            self.session = Some(session);
            log::info!("📷 Item {}/{}: '{}'", next + 1, self.items.len(), name);
            return Ok(Advance::Started { index: next, name });
        }
    }

    /// Append the current item's annotation to the sink.
    ///
    /// Exposed so a caller can retry after a [`AnnotateError::Persistence`]
    /// and then call [`advance`](Self::advance) itself.
    pub fn persist_current(&self) -> Result<(), AnnotateError> {
        let Some(unit) = self.current.map(|i| &self.items[i]) else {
            return Ok(());
        };
        let Some(result) = unit.annotation() else {
            log::warn!("'{}' has no annotation to persist", unit.name);
            return Ok(());
        };
        let rendered = render(result)?;
        self.sink.append(&unit.name, &rendered)
    }

    /// Send one event to the live session.
    pub fn dispatch(&mut self, event: CanvasEvent) -> Result<Transition, AnnotateError> {
        let Some(mut session) = self.session.take() else {
            log::debug!("No open session, dropping {:?}", event);
            return Ok(Transition::Ignored);
        };

        let outcome = session.handle_event(event, self);
        if session.is_active() {
            self.session = Some(session);
        }
        outcome
    }

    /// Drive the batch from canvas input until every item is done or the
    /// input runs out.
    pub fn run(&mut self) -> Result<RunSummary, AnnotateError> {
        if self.current.is_none() && self.session.is_none() {
            self.advance()?;
        }

        while let Some(event) = self.session.as_mut().and_then(|s| s.next_event()) {
            self.dispatch(event)?;
        }

        if let Some(session) = &self.session {
            log::warn!(
                "Input ended while '{}' was open ({} point(s) not saved)",
                session.name(),
                session.point_count()
            );
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            completed: self.completed,
            skipped: self.skipped,
            finished: self.is_exhausted(),
        }
    }
}

impl<R: Serialize> ResultHandler<R> for BatchController<R> {
    /// Store, persist, then advance.
    fn receive_result(&mut self, result: R) -> Result<(), AnnotateError> {
        let Some(index) = self.current else {
            log::warn!("Result received before any item was started");
            return Ok(());
        };

        self.items[index].set_annotation(result);
        self.persist_current()?;
        self.completed += 1;

        self.advance()?;
        Ok(())
    }
}
