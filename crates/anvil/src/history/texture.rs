//! Device-resident snapshots

use tracing::trace;

use super::{HistoryBackend, HistoryTarget, RawSnapshot, Snapshot, capture_region};
use crate::gpu::{GpuContext, TextureFormat, TextureHandle, TextureSet};
use crate::layer::LayerError;
use crate::types::{Bounds, Size};

/// Keeps snapshots as textures
///
/// Capture and apply are device copies with no encoding. Snapshots hold GPU
/// memory until they are evicted or the history is cleared.
#[derive(Debug, Clone)]
pub struct TextureBackend {
    ctx: GpuContext,
    tile_size: u32,
}

impl TextureBackend {
    /// Snapshot textures are split into tiles of `tile_size`
    pub fn new(ctx: &GpuContext, tile_size: u32) -> Self {
        Self {
            ctx: ctx.clone(),
            tile_size,
        }
    }
}

impl HistoryBackend for TextureBackend {
    type Payload = TextureSet;

    fn name(&self) -> &'static str {
        "texture"
    }

    fn capture(&self, target: &dyn HistoryTarget, bounds: Option<Bounds>) -> Result<Snapshot<TextureSet>, LayerError> {
        let (bounds, full_layer) = capture_region(target, bounds);
        let payload = target.copy_texture(bounds)?;
        trace!("texture: captured {:?} ({} bytes)", bounds, payload.byte_size());
        Ok(Snapshot {
            bounds,
            size: target.size(),
            full_layer,
            payload,
        })
    }

    fn capture_texture(
        &self,
        target: &dyn HistoryTarget,
        texture: &TextureHandle<'_>,
        bounds: Bounds,
    ) -> Result<Snapshot<TextureSet>, LayerError> {
        if !bounds.fits_within(texture.size()) {
            return Err(LayerError::OutOfBounds {
                bounds,
                size: texture.size(),
            });
        }
        let mut payload = TextureSet::new(
            &self.ctx,
            TextureFormat::Rgba8Unorm,
            bounds.size(),
            self.tile_size,
            None,
        )?;
        payload.copy_region_from(texture, bounds, glam::UVec2::ZERO);
        Ok(Snapshot {
            bounds,
            size: target.size(),
            full_layer: false,
            payload,
        })
    }

    fn apply(&self, target: &mut dyn HistoryTarget, snapshot: &mut Snapshot<TextureSet>) -> Result<(), LayerError> {
        if snapshot.payload.size() != snapshot.bounds.size() {
            return Err(LayerError::SizeMismatch {
                expected: snapshot.bounds.size(),
                actual: snapshot.payload.size(),
            });
        }
        let current_size = target.size();
        let replaced = if snapshot.full_layer {
            Bounds::full(current_size)
        } else {
            snapshot.bounds
        };
        let current = target.copy_texture(replaced)?;

        if snapshot.full_layer && snapshot.size != current_size {
            target.resize_clear(snapshot.size)?;
        }
        target.draw_texture(snapshot.bounds, &snapshot.payload.handle())?;

        snapshot.bounds = replaced;
        snapshot.size = current_size;
        snapshot.payload = current;
        Ok(())
    }

    fn export_raw(&self, snapshot: &Snapshot<TextureSet>) -> Result<RawSnapshot, LayerError> {
        Ok(RawSnapshot {
            bounds: snapshot.bounds,
            size: snapshot.size,
            buffer: snapshot.payload.read_region(Bounds::full(snapshot.payload.size())),
            full_layer: snapshot.full_layer,
        })
    }

    fn import_raw(&self, raw: &RawSnapshot) -> Result<Snapshot<TextureSet>, LayerError> {
        raw.validate()?;
        let size: Size = raw.bounds.size();
        let payload = TextureSet::new(
            &self.ctx,
            TextureFormat::Rgba8Unorm,
            size,
            self.tile_size,
            Some(&raw.buffer),
        )?;
        Ok(Snapshot {
            bounds: raw.bounds,
            size: raw.size,
            full_layer: raw.full_layer,
            payload,
        })
    }
}
