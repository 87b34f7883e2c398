//! Span recorder.
//!
//! Spans form a tree mirroring run -> phase -> task. The recorder is shared by
//! every task of a phase, so all bookkeeping happens behind one mutex and
//! exporters are called after the lock is released.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use phaserun_core::{Span, SpanId};
use tracing::{debug, trace};

use super::exporter::SpanExporter;
use crate::error::SpanError;

#[derive(Default)]
struct RecorderState {
    /// Spans started but not yet ended.
    open: HashMap<SpanId, Span>,
    /// Ids of spans already ended.
    ended: HashSet<SpanId>,
    /// Open spans that no longer accept children.
    sealed: HashSet<SpanId>,
}

/// Records nested spans and forwards completed ones to exporters.
#[derive(Default)]
pub struct SpanRecorder {
    state: Mutex<RecorderState>,
    exporters: Vec<Arc<dyn SpanExporter>>,
}

impl SpanRecorder {
    /// Create a recorder with no exporters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add an exporter.
    pub fn with_exporter(mut self, exporter: Arc<dyn SpanExporter>) -> Self {
        self.exporters.push(exporter);
        self
    }

    fn state(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a span. Root spans pass `None` as parent.
    ///
    /// Fails if the parent is unknown, already ended, or sealed.
    pub fn start_span(
        &self,
        name: impl Into<String>,
        parent: Option<&SpanId>,
    ) -> Result<SpanId, SpanError> {
        let mut state = self.state();

        if let Some(parent) = parent {
            if !state.open.contains_key(parent) || state.sealed.contains(parent) {
                return Err(SpanError::ParentNotOpen(parent.clone()));
            }
        }

        let span = Span::new(name, parent.cloned());
        let id = span.id.clone();
        trace!(span_id = %id, name = %span.name, "Span started");
        state.open.insert(id.clone(), span);
        Ok(id)
    }

    /// Set an attribute on an open span.
    pub fn set_attribute(
        &self,
        id: &SpanId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), SpanError> {
        let mut state = self.state();
        if state.ended.contains(id) {
            return Err(SpanError::AlreadyEnded(id.clone()));
        }
        let span = state
            .open
            .get_mut(id)
            .ok_or_else(|| SpanError::NotFound(id.clone()))?;
        span.set_attribute(key, value);
        Ok(())
    }

    /// End a span, adding the given attributes and optional error.
    ///
    /// Returns the completed span after it has been exported.
    pub fn end_span<I, K, V>(
        &self,
        id: &SpanId,
        attributes: I,
        error: Option<String>,
    ) -> Result<Span, SpanError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let span = {
            let mut state = self.state();
            let mut span = match state.open.remove(id) {
                Some(span) => span,
                None if state.ended.contains(id) => {
                    return Err(SpanError::AlreadyEnded(id.clone()))
                }
                None => return Err(SpanError::NotFound(id.clone())),
            };
            for (key, value) in attributes {
                span.set_attribute(key, value);
            }
            span.end(error);
            state.sealed.remove(id);
            state.ended.insert(id.clone());
            span
        };

        self.export(&span);
        Ok(span)
    }

    /// Force-end every open descendant of `parent` with `error` and refuse
    /// any further children under it.
    ///
    /// Descendants are ended deepest first. Returns the number of spans ended.
    pub fn seal(&self, parent: &SpanId, error: &str) -> usize {
        let closed = {
            let mut state = self.state();
            state.sealed.insert(parent.clone());

            let mut frontier = vec![parent.clone()];
            let mut descendants = Vec::new();
            while let Some(current) = frontier.pop() {
                let children: Vec<SpanId> = state
                    .open
                    .values()
                    .filter(|s| s.parent_id.as_ref() == Some(&current))
                    .map(|s| s.id.clone())
                    .collect();
                frontier.extend(children.iter().cloned());
                descendants.extend(children);
            }

            let mut closed = Vec::with_capacity(descendants.len());
            for id in descendants.into_iter().rev() {
                if let Some(mut span) = state.open.remove(&id) {
                    span.end(Some(error.to_string()));
                    state.ended.insert(id);
                    closed.push(span);
                }
            }
            closed
        };

        if !closed.is_empty() {
            debug!(parent = %parent, count = closed.len(), "Force-ended open child spans");
        }
        for span in &closed {
            self.export(span);
        }
        closed.len()
    }

    /// Number of spans started but not yet ended.
    pub fn open_count(&self) -> usize {
        self.state().open.len()
    }

    fn export(&self, span: &Span) {
        for exporter in &self.exporters {
            exporter.export(span);
        }
    }
}
