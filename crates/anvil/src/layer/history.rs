//! History passthrough
//!
//! Every call is a no-op returning `None`/`false` when no backend is
//! configured.

use anvil_config::{HistoryBackendKind, HistoryConfig};
use tracing::debug;

use crate::gpu::{TextureHandle, TextureSet};
use crate::history::{
    HistoryController, HistoryExport, HistorySnapshot, HistoryTarget, PushOptions, RawSnapshot, create_history,
};
use crate::types::{Bounds, Size};

use super::events::{HistoryDirection, LayerEvent};
use super::{Layer, LayerError};

impl Layer {
    /// Install a fresh history with the given backend
    pub fn set_history_backend(&mut self, backend: HistoryBackendKind, max_items: usize) -> Result<(), LayerError> {
        let config = HistoryConfig {
            max_items,
            ..HistoryConfig::with_backend(backend)
        };
        self.set_history_from_config(&config)
    }

    pub fn set_history_from_config(&mut self, config: &HistoryConfig) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let history = create_history(config, &self.ctx, self.grid.tile_size());
        self.set_history(history)
    }

    /// Install a caller-built history, dropping any previous one
    pub fn set_history(&mut self, history: Box<dyn HistoryController>) -> Result<(), LayerError> {
        self.ensure_alive()?;
        debug!(
            "Layer {} history: {} (max {})",
            self.id.get(),
            history.backend_name(),
            history.max_items()
        );
        if let Some(mut previous) = self.history.replace(history) {
            previous.clear();
        }
        Ok(())
    }

    pub fn clear_history_backend(&mut self) {
        if let Some(mut history) = self.history.take() {
            history.clear();
        }
    }

    #[inline]
    pub fn has_history(&self) -> bool {
        self.history.is_some()
    }

    pub fn history(&self) -> Option<&dyn HistoryController> {
        self.history.as_deref()
    }

    /// Capture a region before mutating it; `None` bounds capture everything
    ///
    /// An empty region captures nothing and returns `None`.
    pub fn capture_history(&self, bounds: Option<Bounds>) -> Result<Option<HistorySnapshot>, LayerError> {
        self.ensure_alive()?;
        let Some(history) = self.history.as_deref() else {
            return Ok(None);
        };
        if bounds.is_some_and(|b| b.is_empty()) {
            return Ok(None);
        }
        history.capture(self, bounds).map(Some)
    }

    /// Register a previously captured snapshot
    pub fn push_history(&mut self, snapshot: HistorySnapshot, options: &PushOptions) -> Result<bool, LayerError> {
        self.ensure_alive()?;
        let Some(history) = self.history.as_deref_mut() else {
            return Ok(false);
        };
        let bounds = history.push(snapshot)?;
        self.registered(bounds, options);
        Ok(true)
    }

    /// Capture the current state of a region and register it
    pub fn commit_history(&mut self, bounds: Option<Bounds>, options: &PushOptions) -> Result<bool, LayerError> {
        let Some(snapshot) = self.capture_history(bounds)? else {
            return Ok(false);
        };
        self.push_history(snapshot, options)
    }

    /// Register a region of a layer-sized texture holding the pre-edit pixels
    pub fn commit_history_from_texture(
        &mut self,
        texture: &TextureHandle<'_>,
        bounds: Bounds,
        options: &PushOptions,
    ) -> Result<bool, LayerError> {
        self.ensure_alive()?;
        let Some(history) = self.history.as_deref() else {
            return Ok(false);
        };
        if bounds.is_empty() {
            return Ok(false);
        }
        let snapshot = history.capture_texture(self, texture, bounds)?;
        self.push_history(snapshot, options)
    }

    pub fn push_history_raw(&mut self, raw: &RawSnapshot, options: &PushOptions) -> Result<bool, LayerError> {
        self.ensure_alive()?;
        let Some(history) = self.history.as_deref_mut() else {
            return Ok(false);
        };
        let bounds = history.push_raw(raw)?;
        self.registered(bounds, options);
        Ok(true)
    }

    /// Revert the newest entry, returning the region that changed
    pub fn undo(&mut self) -> Result<Option<Bounds>, LayerError> {
        self.step_history(HistoryDirection::Undo)
    }

    /// Reapply the newest undone entry, returning the region that changed
    pub fn redo(&mut self) -> Result<Option<Bounds>, LayerError> {
        self.step_history(HistoryDirection::Redo)
    }

    pub fn can_undo(&self) -> bool {
        self.history.as_ref().is_some_and(|h| h.can_undo())
    }

    pub fn can_redo(&self) -> bool {
        self.history.as_ref().is_some_and(|h| h.can_redo())
    }

    /// Drop every entry but keep the backend
    pub fn clear_history(&mut self) {
        if let Some(history) = self.history.as_deref_mut() {
            history.clear();
        }
    }

    pub fn export_history_raw(&self) -> Result<Option<HistoryExport>, LayerError> {
        self.ensure_alive()?;
        self.history.as_deref().map(|h| h.export_raw()).transpose()
    }

    pub fn import_history_raw(&mut self, export: &HistoryExport) -> Result<bool, LayerError> {
        self.ensure_alive()?;
        let Some(history) = self.history.as_deref_mut() else {
            return Ok(false);
        };
        history.import_raw(export)?;
        Ok(true)
    }

    fn registered(&mut self, bounds: Bounds, options: &PushOptions) {
        if options.silent {
            return;
        }
        let event = LayerEvent::HistoryRegistered {
            bounds,
            context: options.context.clone(),
        };
        self.emit(&event);
    }

    fn step_history(&mut self, direction: HistoryDirection) -> Result<Option<Bounds>, LayerError> {
        self.ensure_alive()?;
        // the history applies itself to this layer
        let Some(mut history) = self.history.take() else {
            return Ok(None);
        };
        let result = match direction {
            HistoryDirection::Undo => history.undo(self),
            HistoryDirection::Redo => history.redo(self),
        };
        self.history = Some(history);

        let bounds = result?;
        if let Some(bounds) = bounds {
            debug!("Layer {} {:?} -> {:?}", self.id.get(), direction, bounds);
            self.emit(&LayerEvent::HistoryApplied { bounds, direction });
        }
        Ok(bounds)
    }
}

impl HistoryTarget for Layer {
    fn size(&self) -> Size {
        self.size
    }

    fn read_pixels(&self, bounds: Bounds) -> Result<Vec<u8>, LayerError> {
        Layer::read_pixels(self, Some(bounds))
    }

    fn write_pixels(&mut self, bounds: Bounds, buffer: &[u8]) -> Result<(), LayerError> {
        Layer::write_pixels(self, bounds, buffer)
    }

    fn resize_clear(&mut self, size: Size) -> Result<(), LayerError> {
        Layer::resize_clear(self, size.width, size.height)
    }

    fn copy_texture(&self, bounds: Bounds) -> Result<TextureSet, LayerError> {
        Layer::copy_texture(self, bounds)
    }

    fn draw_texture(&mut self, bounds: Bounds, texture: &TextureHandle<'_>) -> Result<(), LayerError> {
        Layer::draw_texture(self, bounds, texture)
    }

    fn create_texture_from_raw(&self, buffer: &[u8], size: Size) -> Result<TextureSet, LayerError> {
        Layer::create_texture_from_raw(self, buffer, size)
    }

    fn read_texture_region(&self, texture: &TextureHandle<'_>, bounds: Bounds) -> Result<Vec<u8>, LayerError> {
        self.read_texture_pixels_from(texture, bounds)
    }
}
