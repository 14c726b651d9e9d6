//! Lossless PNG snapshots

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use tracing::trace;

use super::{HistoryBackend, HistoryError, HistoryTarget, RawSnapshot, Snapshot, capture_region, swap_pixels};
use crate::gpu::TextureHandle;
use crate::layer::LayerError;
use crate::types::{Bounds, Size};

/// Stores snapshots as PNG bytes in CPU memory
#[derive(Debug, Clone, Copy, Default)]
pub struct CompressedBackend;

pub(crate) fn encode_png(pixels: &[u8], size: Size, color: ExtendedColorType) -> Result<Vec<u8>, HistoryError> {
    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, CompressionType::Best, FilterType::Adaptive).write_image(
        pixels,
        size.width,
        size.height,
        color,
    )?;
    Ok(out)
}

fn decode_png(bytes: &[u8]) -> Result<Vec<u8>, HistoryError> {
    Ok(image::load_from_memory_with_format(bytes, ImageFormat::Png)?
        .into_rgba8()
        .into_raw())
}

fn encode_rgba(pixels: &[u8], size: Size) -> Result<Vec<u8>, HistoryError> {
    let encoded = encode_png(pixels, size, ExtendedColorType::Rgba8)?;
    trace!(
        "compressed: {}x{} -> {} bytes ({} raw)",
        size.width,
        size.height,
        encoded.len(),
        pixels.len()
    );
    Ok(encoded)
}

impl HistoryBackend for CompressedBackend {
    type Payload = Vec<u8>;

    fn name(&self) -> &'static str {
        "compressed"
    }

    fn capture(&self, target: &dyn HistoryTarget, bounds: Option<Bounds>) -> Result<Snapshot<Vec<u8>>, LayerError> {
        let (bounds, full_layer) = capture_region(target, bounds);
        let pixels = target.read_pixels(bounds)?;
        Ok(Snapshot {
            bounds,
            size: target.size(),
            full_layer,
            payload: encode_rgba(&pixels, bounds.size())?,
        })
    }

    fn capture_texture(
        &self,
        target: &dyn HistoryTarget,
        texture: &TextureHandle<'_>,
        bounds: Bounds,
    ) -> Result<Snapshot<Vec<u8>>, LayerError> {
        let pixels = target.read_texture_region(texture, bounds)?;
        Ok(Snapshot {
            bounds,
            size: target.size(),
            full_layer: false,
            payload: encode_rgba(&pixels, bounds.size())?,
        })
    }

    fn apply(&self, target: &mut dyn HistoryTarget, snapshot: &mut Snapshot<Vec<u8>>) -> Result<(), LayerError> {
        let incoming = decode_png(&snapshot.payload)?;
        swap_pixels(target, snapshot, &incoming, encode_rgba)
    }

    fn export_raw(&self, snapshot: &Snapshot<Vec<u8>>) -> Result<RawSnapshot, LayerError> {
        Ok(RawSnapshot {
            bounds: snapshot.bounds,
            size: snapshot.size,
            buffer: decode_png(&snapshot.payload)?,
            full_layer: snapshot.full_layer,
        })
    }

    fn import_raw(&self, raw: &RawSnapshot) -> Result<Snapshot<Vec<u8>>, LayerError> {
        raw.validate()?;
        Ok(Snapshot {
            bounds: raw.bounds,
            size: raw.size,
            full_layer: raw.full_layer,
            payload: encode_rgba(&raw.buffer, raw.bounds.size())?,
        })
    }
}
