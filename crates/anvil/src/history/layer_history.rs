//! Undo and redo stacks for one backend

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::{HistoryBackend, HistoryError, HistoryExport, HistoryTarget, RawSnapshot, Snapshot};
use crate::layer::LayerError;
use crate::types::Bounds;

/// Capacity-bounded undo/redo history
///
/// Pushing a new entry drops the redo stack. When the undo stack is full the
/// oldest entry is disposed to make room.
pub struct LayerHistory<B: HistoryBackend> {
    backend: B,
    max_items: usize,
    undo_stack: VecDeque<Snapshot<B::Payload>>,
    redo_stack: Vec<Snapshot<B::Payload>>,
}

impl<B: HistoryBackend> std::fmt::Debug for LayerHistory<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerHistory")
            .field("backend", &self.backend.name())
            .field("max_items", &self.max_items)
            .field("undo", &self.undo_stack.len())
            .field("redo", &self.redo_stack.len())
            .finish()
    }
}

/// Region touched by applying a snapshot
fn affected(snapshot: &Snapshot<impl Sized>, target: &dyn HistoryTarget) -> Bounds {
    if snapshot.full_layer {
        Bounds::full(target.size())
    } else {
        snapshot.bounds
    }
}

impl<B: HistoryBackend> LayerHistory<B> {
    /// `max_items` is at least one
    pub fn new(backend: B, max_items: usize) -> Self {
        Self {
            backend,
            max_items: max_items.max(1),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn capture(
        &self,
        target: &dyn HistoryTarget,
        bounds: Option<Bounds>,
    ) -> Result<Snapshot<B::Payload>, LayerError> {
        self.backend.capture(target, bounds)
    }

    /// Record a snapshot taken before a mutation
    pub fn push(&mut self, snapshot: Snapshot<B::Payload>) -> Bounds {
        let bounds = snapshot.bounds;
        for stale in self.redo_stack.drain(..) {
            self.backend.dispose_snapshot(stale);
        }
        self.undo_stack.push_back(snapshot);
        while self.undo_stack.len() > self.max_items {
            if let Some(oldest) = self.undo_stack.pop_front() {
                trace!("{} history: evicting {:?}", self.backend.name(), oldest.bounds);
                self.backend.dispose_snapshot(oldest);
            }
        }
        debug!(
            "{} history: pushed {:?} ({} undo)",
            self.backend.name(),
            bounds,
            self.undo_stack.len()
        );
        bounds
    }

    /// Capture the current state and push it
    pub fn commit(&mut self, target: &dyn HistoryTarget, bounds: Option<Bounds>) -> Result<Bounds, LayerError> {
        let snapshot = self.backend.capture(target, bounds)?;
        Ok(self.push(snapshot))
    }

    /// Import a raw snapshot and push it
    pub fn push_raw(&mut self, raw: &RawSnapshot) -> Result<Bounds, LayerError> {
        let snapshot = self.import_entry(raw)?;
        Ok(self.push(snapshot))
    }

    /// Decode one raw entry; entries covering no pixels are rejected
    fn import_entry(&self, raw: &RawSnapshot) -> Result<Snapshot<B::Payload>, LayerError> {
        if raw.bounds.is_empty() {
            return Err(HistoryError::EmptySnapshot(raw.bounds).into());
        }
        self.backend.import_raw(raw)
    }

    /// Revert the newest entry; `None` when there is nothing to undo
    pub fn undo(&mut self, target: &mut dyn HistoryTarget) -> Result<Option<Bounds>, LayerError> {
        let Some(mut snapshot) = self.undo_stack.pop_back() else {
            return Ok(None);
        };
        if let Err(err) = self.backend.apply(target, &mut snapshot) {
            self.undo_stack.push_back(snapshot);
            return Err(err);
        }
        let bounds = affected(&snapshot, target);
        self.redo_stack.push(snapshot);
        debug!("{} history: undo {:?}", self.backend.name(), bounds);
        Ok(Some(bounds))
    }

    /// Reapply the newest undone entry; `None` when there is nothing to redo
    pub fn redo(&mut self, target: &mut dyn HistoryTarget) -> Result<Option<Bounds>, LayerError> {
        let Some(mut snapshot) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(err) = self.backend.apply(target, &mut snapshot) {
            self.redo_stack.push(snapshot);
            return Err(err);
        }
        let bounds = affected(&snapshot, target);
        self.undo_stack.push_back(snapshot);
        debug!("{} history: redo {:?}", self.backend.name(), bounds);
        Ok(Some(bounds))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Dispose every entry on both stacks
    pub fn clear(&mut self) {
        for snapshot in self.undo_stack.drain(..) {
            self.backend.dispose_snapshot(snapshot);
        }
        for snapshot in self.redo_stack.drain(..) {
            self.backend.dispose_snapshot(snapshot);
        }
    }

    pub fn export_raw(&self) -> Result<HistoryExport, LayerError> {
        Ok(HistoryExport {
            undo_stack: self
                .undo_stack
                .iter()
                .map(|s| self.backend.export_raw(s))
                .collect::<Result<_, _>>()?,
            redo_stack: self
                .redo_stack
                .iter()
                .map(|s| self.backend.export_raw(s))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Replace both stacks with imported entries
    ///
    /// Entries beyond capacity are dropped from the oldest end.
    pub fn import_raw(&mut self, export: &HistoryExport) -> Result<(), LayerError> {
        let undo = export
            .undo_stack
            .iter()
            .map(|raw| self.import_entry(raw))
            .collect::<Result<Vec<_>, _>>()?;
        let redo = export
            .redo_stack
            .iter()
            .map(|raw| self.import_entry(raw))
            .collect::<Result<Vec<_>, _>>()?;

        self.clear();
        self.undo_stack.extend(undo);
        self.redo_stack = redo;
        while self.undo_stack.len() > self.max_items {
            if let Some(oldest) = self.undo_stack.pop_front() {
                self.backend.dispose_snapshot(oldest);
            }
        }
        debug!(
            "{} history: imported {} undo, {} redo",
            self.backend.name(),
            self.undo_stack.len(),
            self.redo_stack.len()
        );
        Ok(())
    }
}

impl<B: HistoryBackend> Drop for LayerHistory<B> {
    fn drop(&mut self) {
        self.clear();
    }
}
