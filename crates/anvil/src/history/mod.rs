//! Pluggable undo/redo history
//!
//! A [`HistoryBackend`] decides how a region of pixels is stored: PNG
//! compressed, JPEG with a lossless alpha plane, or as device textures.
//! [`LayerHistory`] keeps the undo and redo stacks for one backend, and
//! [`HistoryController`] erases the backend type so a [`Layer`] can hold any
//! of them.
//!
//! Applying a snapshot writes its pixels into the target and rewrites the
//! snapshot in place to hold the pixels it replaced. Applying twice restores
//! the original state, so one record serves both undo and redo.
//!
//! [`Layer`]: crate::layer::Layer

mod compressed;
mod controller;
mod layer_history;
mod lossy;
mod texture;

use anvil_config::{HistoryBackendKind, HistoryConfig};
use serde::{Deserialize, Serialize};

use crate::constants::RGBA_CHANNELS;
use crate::gpu::{GpuContext, TextureHandle, TextureSet};
use crate::layer::LayerError;
use crate::types::{Bounds, Size};

pub use compressed::CompressedBackend;
pub use controller::{HistoryController, HistorySnapshot};
pub use layer_history::LayerHistory;
pub use lossy::{LossyBackend, LossyPayload};
pub use texture::TextureBackend;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Snapshot codec failed: {0}")]
    Codec(#[from] image::ImageError),
    #[error("Snapshot from backend '{actual}' pushed into '{expected}' history")]
    SnapshotMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Raw snapshot buffer is {actual} bytes, expected {expected}")]
    RawBufferLength { expected: usize, actual: usize },
    #[error("Raw snapshot covers an empty region {0:?}")]
    EmptySnapshot(Bounds),
}

/// Options for registering a history entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// Skip the `HistoryRegistered` event
    pub silent: bool,
    /// Caller tag carried on the event
    pub context: Option<String>,
}

impl PushOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            context: None,
        }
    }

    pub fn with_context(context: impl Into<String>) -> Self {
        Self {
            silent: false,
            context: Some(context.into()),
        }
    }
}

/// Portable RGBA8 form of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSnapshot {
    pub bounds: Bounds,
    /// Layer size when the snapshot was taken
    pub size: Size,
    pub buffer: Vec<u8>,
    #[serde(default)]
    pub full_layer: bool,
}

impl RawSnapshot {
    pub(crate) fn validate(&self) -> Result<(), HistoryError> {
        let expected = self.bounds.size().byte_len(RGBA_CHANNELS);
        if self.buffer.len() != expected {
            return Err(HistoryError::RawBufferLength {
                expected,
                actual: self.buffer.len(),
            });
        }
        Ok(())
    }
}

/// Both history stacks in portable form, oldest entry first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryExport {
    pub undo_stack: Vec<RawSnapshot>,
    pub redo_stack: Vec<RawSnapshot>,
}

/// A stored region of a layer
#[derive(Debug)]
pub struct Snapshot<P> {
    pub bounds: Bounds,
    /// Layer size when the snapshot was taken
    pub size: Size,
    /// Captured without bounds; applying it also restores the layer size
    pub full_layer: bool,
    pub payload: P,
}

/// Surface a history backend reads from and writes into
pub trait HistoryTarget {
    fn size(&self) -> Size;

    fn read_pixels(&self, bounds: Bounds) -> Result<Vec<u8>, LayerError>;

    fn write_pixels(&mut self, bounds: Bounds, buffer: &[u8]) -> Result<(), LayerError>;

    /// Reallocate at `size`, discarding content
    fn resize_clear(&mut self, size: Size) -> Result<(), LayerError>;

    /// Copy a region into new region-sized textures
    fn copy_texture(&self, bounds: Bounds) -> Result<TextureSet, LayerError>;

    /// Draw a region-sized texture at `bounds`
    fn draw_texture(&mut self, bounds: Bounds, texture: &TextureHandle<'_>) -> Result<(), LayerError>;

    fn create_texture_from_raw(&self, buffer: &[u8], size: Size) -> Result<TextureSet, LayerError>;

    fn read_texture_region(&self, texture: &TextureHandle<'_>, bounds: Bounds) -> Result<Vec<u8>, LayerError>;
}

/// Storage strategy for history snapshots
pub trait HistoryBackend: Send + 'static {
    type Payload: Send + 'static;

    /// Key used in logs and mismatch errors
    fn name(&self) -> &'static str;

    /// Store a region of the target; `None` stores the whole layer
    fn capture(
        &self,
        target: &dyn HistoryTarget,
        bounds: Option<Bounds>,
    ) -> Result<Snapshot<Self::Payload>, LayerError>;

    /// Store a region of a layer-sized texture instead of the target itself
    fn capture_texture(
        &self,
        target: &dyn HistoryTarget,
        texture: &TextureHandle<'_>,
        bounds: Bounds,
    ) -> Result<Snapshot<Self::Payload>, LayerError>;

    /// Write the snapshot into the target and swap in the replaced content
    fn apply(
        &self,
        target: &mut dyn HistoryTarget,
        snapshot: &mut Snapshot<Self::Payload>,
    ) -> Result<(), LayerError>;

    fn export_raw(&self, snapshot: &Snapshot<Self::Payload>) -> Result<RawSnapshot, LayerError>;

    fn import_raw(&self, raw: &RawSnapshot) -> Result<Snapshot<Self::Payload>, LayerError>;

    /// Release a snapshot that leaves the history
    fn dispose_snapshot(&self, snapshot: Snapshot<Self::Payload>) {
        drop(snapshot);
    }
}

/// Resolve optional capture bounds against the target
pub(crate) fn capture_region(target: &dyn HistoryTarget, bounds: Option<Bounds>) -> (Bounds, bool) {
    match bounds {
        Some(bounds) => (bounds, false),
        None => (Bounds::full(target.size()), true),
    }
}

/// Swap pixel-encoded snapshot content with the target
///
/// `incoming` is the decoded snapshot content. The replaced region is read
/// and encoded before anything is written, so a failure leaves both the
/// target and the snapshot unchanged.
pub(crate) fn swap_pixels<P>(
    target: &mut dyn HistoryTarget,
    snapshot: &mut Snapshot<P>,
    incoming: &[u8],
    encode: impl FnOnce(&[u8], Size) -> Result<P, HistoryError>,
) -> Result<(), LayerError> {
    let expected = snapshot.bounds.size().byte_len(RGBA_CHANNELS);
    if incoming.len() != expected {
        return Err(HistoryError::RawBufferLength {
            expected,
            actual: incoming.len(),
        }
        .into());
    }

    let current_size = target.size();
    let replaced = if snapshot.full_layer {
        Bounds::full(current_size)
    } else {
        snapshot.bounds
    };
    let current = target.read_pixels(replaced)?;
    let payload = encode(&current, replaced.size())?;

    if snapshot.full_layer && snapshot.size != current_size {
        target.resize_clear(snapshot.size)?;
    }
    target.write_pixels(snapshot.bounds, incoming)?;

    snapshot.bounds = replaced;
    snapshot.size = current_size;
    snapshot.payload = payload;
    Ok(())
}

/// Build the history configured by `config`
pub fn create_history(config: &HistoryConfig, ctx: &GpuContext, tile_size: u32) -> Box<dyn HistoryController> {
    let max_items = config.max_items;
    match config.backend {
        HistoryBackendKind::Compressed => Box::new(LayerHistory::new(CompressedBackend, max_items)),
        HistoryBackendKind::Lossy => Box::new(LayerHistory::new(
            LossyBackend::new(config.clamped_quality()),
            max_items,
        )),
        HistoryBackendKind::Texture => Box::new(LayerHistory::new(
            TextureBackend::new(ctx, tile_size),
            max_items,
        )),
    }
}
