//! Backend-erased history interface

use std::any::Any;

use super::{HistoryBackend, HistoryError, HistoryExport, HistoryTarget, LayerHistory, RawSnapshot, Snapshot};
use crate::gpu::TextureHandle;
use crate::layer::LayerError;
use crate::types::Bounds;

/// A captured snapshot whose payload type is known only to its backend
pub struct HistorySnapshot {
    bounds: Bounds,
    full_layer: bool,
    backend: &'static str,
    inner: Box<dyn Any + Send>,
}

impl HistorySnapshot {
    fn wrap<P: Send + 'static>(backend: &'static str, snapshot: Snapshot<P>) -> Self {
        Self {
            bounds: snapshot.bounds,
            full_layer: snapshot.full_layer,
            backend,
            inner: Box::new(snapshot),
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn full_layer(&self) -> bool {
        self.full_layer
    }

    /// Name of the backend that captured it
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

impl std::fmt::Debug for HistorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistorySnapshot")
            .field("bounds", &self.bounds)
            .field("full_layer", &self.full_layer)
            .field("backend", &self.backend)
            .finish()
    }
}

/// History as held by a layer
pub trait HistoryController: Send {
    fn backend_name(&self) -> &'static str;

    fn max_items(&self) -> usize;

    fn capture(&self, target: &dyn HistoryTarget, bounds: Option<Bounds>) -> Result<HistorySnapshot, LayerError>;

    fn capture_texture(
        &self,
        target: &dyn HistoryTarget,
        texture: &TextureHandle<'_>,
        bounds: Bounds,
    ) -> Result<HistorySnapshot, LayerError>;

    /// Push a snapshot captured by this controller's backend
    fn push(&mut self, snapshot: HistorySnapshot) -> Result<Bounds, LayerError>;

    fn push_raw(&mut self, raw: &RawSnapshot) -> Result<Bounds, LayerError>;

    fn undo(&mut self, target: &mut dyn HistoryTarget) -> Result<Option<Bounds>, LayerError>;

    fn redo(&mut self, target: &mut dyn HistoryTarget) -> Result<Option<Bounds>, LayerError>;

    fn can_undo(&self) -> bool;

    fn can_redo(&self) -> bool;

    fn undo_len(&self) -> usize;

    fn redo_len(&self) -> usize;

    fn clear(&mut self);

    fn export_raw(&self) -> Result<HistoryExport, LayerError>;

    fn import_raw(&mut self, export: &HistoryExport) -> Result<(), LayerError>;
}

impl<B: HistoryBackend> HistoryController for LayerHistory<B> {
    fn backend_name(&self) -> &'static str {
        self.backend().name()
    }

    fn max_items(&self) -> usize {
        LayerHistory::max_items(self)
    }

    fn capture(&self, target: &dyn HistoryTarget, bounds: Option<Bounds>) -> Result<HistorySnapshot, LayerError> {
        let snapshot = LayerHistory::capture(self, target, bounds)?;
        Ok(HistorySnapshot::wrap(self.backend().name(), snapshot))
    }

    fn capture_texture(
        &self,
        target: &dyn HistoryTarget,
        texture: &TextureHandle<'_>,
        bounds: Bounds,
    ) -> Result<HistorySnapshot, LayerError> {
        let snapshot = self.backend().capture_texture(target, texture, bounds)?;
        Ok(HistorySnapshot::wrap(self.backend().name(), snapshot))
    }

    fn push(&mut self, snapshot: HistorySnapshot) -> Result<Bounds, LayerError> {
        let expected = self.backend().name();
        let actual = snapshot.backend;
        let inner = snapshot
            .inner
            .downcast::<Snapshot<B::Payload>>()
            .map_err(|_| HistoryError::SnapshotMismatch { expected, actual })?;
        Ok(LayerHistory::push(self, *inner))
    }

    fn push_raw(&mut self, raw: &RawSnapshot) -> Result<Bounds, LayerError> {
        LayerHistory::push_raw(self, raw)
    }

    fn undo(&mut self, target: &mut dyn HistoryTarget) -> Result<Option<Bounds>, LayerError> {
        LayerHistory::undo(self, target)
    }

    fn redo(&mut self, target: &mut dyn HistoryTarget) -> Result<Option<Bounds>, LayerError> {
        LayerHistory::redo(self, target)
    }

    fn can_undo(&self) -> bool {
        LayerHistory::can_undo(self)
    }

    fn can_redo(&self) -> bool {
        LayerHistory::can_redo(self)
    }

    fn undo_len(&self) -> usize {
        LayerHistory::undo_len(self)
    }

    fn redo_len(&self) -> usize {
        LayerHistory::redo_len(self)
    }

    fn clear(&mut self) {
        LayerHistory::clear(self)
    }

    fn export_raw(&self) -> Result<HistoryExport, LayerError> {
        LayerHistory::export_raw(self)
    }

    fn import_raw(&mut self, export: &HistoryExport) -> Result<(), LayerError> {
        LayerHistory::import_raw(self, export)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;
    use crate::history::{CompressedBackend, LossyBackend};
    use crate::layer::{Layer, LayerInit};

    #[test]
    fn test_push_rejects_foreign_snapshot() {
        let ctx = GpuContext::new();
        let layer = Layer::new(&ctx, LayerInit::new(2, 2)).unwrap();
        let lossy: Box<dyn HistoryController> = Box::new(LayerHistory::new(LossyBackend::default(), 4));
        let mut compressed: Box<dyn HistoryController> = Box::new(LayerHistory::new(CompressedBackend, 4));

        let snapshot = lossy.capture(&layer, None).unwrap();
        assert_eq!(snapshot.backend(), "lossy");
        assert!(snapshot.full_layer());
        assert!(matches!(
            compressed.push(snapshot),
            Err(LayerError::History(HistoryError::SnapshotMismatch {
                expected: "compressed",
                actual: "lossy"
            }))
        ));
        assert_eq!(compressed.undo_len(), 0);
    }

    #[test]
    fn test_erased_round_trip() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(3, 3)).unwrap();
        let mut history: Box<dyn HistoryController> = Box::new(LayerHistory::new(CompressedBackend, 4));

        let snapshot = history.capture(&layer, Some(Bounds::new(0, 0, 1, 1))).unwrap();
        layer.write_pixels(Bounds::new(0, 0, 1, 1), &[1, 2, 3, 4]).unwrap();
        assert_eq!(history.push(snapshot).unwrap(), Bounds::new(0, 0, 1, 1));

        assert_eq!(history.undo(&mut layer).unwrap(), Some(Bounds::new(0, 0, 1, 1)));
        assert_eq!(layer.read_pixels(Some(Bounds::new(0, 0, 1, 1))).unwrap(), vec![0, 0, 0, 0]);
        assert!(history.can_redo());
        history.clear();
        assert!(!history.can_undo() && !history.can_redo());
    }
}
