//! JPEG snapshots with a lossless alpha plane

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use tracing::trace;

use super::compressed::encode_png;
use super::{HistoryBackend, HistoryError, HistoryTarget, RawSnapshot, Snapshot, capture_region, swap_pixels};
use crate::gpu::TextureHandle;
use crate::layer::LayerError;
use crate::types::{Bounds, Size};

/// Encoded color and alpha planes of one snapshot
#[derive(Debug, Clone)]
pub struct LossyPayload {
    /// JPEG encoded RGB
    pub color: Vec<u8>,
    /// PNG encoded 8-bit alpha
    pub alpha: Vec<u8>,
}

impl LossyPayload {
    pub fn byte_len(&self) -> usize {
        self.color.len() + self.alpha.len()
    }
}

/// Stores color as JPEG and alpha as PNG
///
/// Every apply re-encodes only the content it replaces, so a region loses at
/// most one JPEG generation per undo or redo step.
#[derive(Debug, Clone, Copy)]
pub struct LossyBackend {
    quality: u8,
}

impl LossyBackend {
    /// `quality` is clamped to 1..=100
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    fn encode(&self, pixels: &[u8], size: Size) -> Result<LossyPayload, HistoryError> {
        let texels = pixels.len() / 4;
        let mut rgb = Vec::with_capacity(texels * 3);
        let mut alpha = Vec::with_capacity(texels);
        for texel in pixels.chunks_exact(4) {
            rgb.extend_from_slice(&texel[..3]);
            alpha.push(texel[3]);
        }

        let mut color = Vec::new();
        JpegEncoder::new_with_quality(&mut color, self.quality).write_image(
            &rgb,
            size.width,
            size.height,
            ExtendedColorType::Rgb8,
        )?;
        let alpha = encode_png(&alpha, size, ExtendedColorType::L8)?;
        let payload = LossyPayload { color, alpha };
        trace!(
            "lossy q{}: {}x{} -> {} bytes ({} raw)",
            self.quality,
            size.width,
            size.height,
            payload.byte_len(),
            pixels.len()
        );
        Ok(payload)
    }

    fn decode(&self, payload: &LossyPayload) -> Result<Vec<u8>, HistoryError> {
        let rgb = image::load_from_memory_with_format(&payload.color, ImageFormat::Jpeg)?.into_rgb8();
        let alpha = image::load_from_memory_with_format(&payload.alpha, ImageFormat::Png)?.into_luma8();
        Ok(rgb
            .pixels()
            .zip(alpha.pixels())
            .flat_map(|(c, a)| [c.0[0], c.0[1], c.0[2], a.0[0]])
            .collect())
    }
}

impl Default for LossyBackend {
    fn default() -> Self {
        Self::new(anvil_config::DEFAULT_LOSSY_QUALITY)
    }
}

impl HistoryBackend for LossyBackend {
    type Payload = LossyPayload;

    fn name(&self) -> &'static str {
        "lossy"
    }

    fn capture(
        &self,
        target: &dyn HistoryTarget,
        bounds: Option<Bounds>,
    ) -> Result<Snapshot<LossyPayload>, LayerError> {
        let (bounds, full_layer) = capture_region(target, bounds);
        let pixels = target.read_pixels(bounds)?;
        Ok(Snapshot {
            bounds,
            size: target.size(),
            full_layer,
            payload: self.encode(&pixels, bounds.size())?,
        })
    }

    fn capture_texture(
        &self,
        target: &dyn HistoryTarget,
        texture: &TextureHandle<'_>,
        bounds: Bounds,
    ) -> Result<Snapshot<LossyPayload>, LayerError> {
        let pixels = target.read_texture_region(texture, bounds)?;
        Ok(Snapshot {
            bounds,
            size: target.size(),
            full_layer: false,
            payload: self.encode(&pixels, bounds.size())?,
        })
    }

    fn apply(
        &self,
        target: &mut dyn HistoryTarget,
        snapshot: &mut Snapshot<LossyPayload>,
    ) -> Result<(), LayerError> {
        let incoming = self.decode(&snapshot.payload)?;
        swap_pixels(target, snapshot, &incoming, |pixels, size| self.encode(pixels, size))
    }

    fn export_raw(&self, snapshot: &Snapshot<LossyPayload>) -> Result<RawSnapshot, LayerError> {
        Ok(RawSnapshot {
            bounds: snapshot.bounds,
            size: snapshot.size,
            buffer: self.decode(&snapshot.payload)?,
            full_layer: snapshot.full_layer,
        })
    }

    fn import_raw(&self, raw: &RawSnapshot) -> Result<Snapshot<LossyPayload>, LayerError> {
        raw.validate()?;
        Ok(Snapshot {
            bounds: raw.bounds,
            size: raw.size,
            full_layer: raw.full_layer,
            payload: self.encode(&raw.buffer, raw.bounds.size())?,
        })
    }
}
