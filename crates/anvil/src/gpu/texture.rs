//! Device textures

use std::sync::Arc;

use glam::{UVec2, Vec4};
use tracing::warn;

use super::DeviceState;
use crate::pixels::{copy_rect, extract_region};
use crate::types::{Bounds, Size};

/// Storage format of a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Four 8-bit normalized channels
    Rgba8Unorm,
    /// One 8-bit normalized channel
    R8Unorm,
}

impl TextureFormat {
    /// Bytes per texel
    #[inline]
    pub fn channels(&self) -> usize {
        match self {
            TextureFormat::Rgba8Unorm => 4,
            TextureFormat::R8Unorm => 1,
        }
    }
}

/// Convert a normalized float to a unorm8 value
#[inline]
pub(crate) fn quantize(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// An owned device texture
///
/// Dropping the texture returns its memory to the device.
pub struct Texture {
    state: Arc<DeviceState>,
    format: TextureFormat,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.state.release(self.data.len() as u64);
    }
}

impl Texture {
    pub(crate) fn from_parts(
        state: Arc<DeviceState>,
        format: TextureFormat,
        width: u32,
        height: u32,
        data: Vec<u8>,
    ) -> Self {
        Self {
            state,
            format,
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn format(&self) -> TextureFormat {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Raw texel bytes in row-major order
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.format.channels()
    }

    /// Read one texel as normalized floats
    ///
    /// R8 textures sample as `(r, 0, 0, 1)`.
    pub fn texel(&self, x: u32, y: u32) -> Vec4 {
        let i = self.offset(x, y);
        match self.format {
            TextureFormat::Rgba8Unorm => {
                let t = &self.data[i..i + 4];
                Vec4::new(t[0] as f32, t[1] as f32, t[2] as f32, t[3] as f32) / 255.0
            }
            TextureFormat::R8Unorm => Vec4::new(self.data[i] as f32 / 255.0, 0.0, 0.0, 1.0),
        }
    }

    /// Read one texel with clamp-to-edge addressing
    pub fn texel_clamped(&self, x: i64, y: i64) -> Vec4 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.texel(x, y)
    }

    /// Write one texel, quantizing to the texture format
    pub(crate) fn store(&mut self, x: u32, y: u32, value: Vec4) {
        let i = self.offset(x, y);
        match self.format {
            TextureFormat::Rgba8Unorm => {
                self.data[i] = quantize(value.x);
                self.data[i + 1] = quantize(value.y);
                self.data[i + 2] = quantize(value.z);
                self.data[i + 3] = quantize(value.w);
            }
            TextureFormat::R8Unorm => self.data[i] = quantize(value.x),
        }
    }

    /// Fill every texel with raw channel bytes
    ///
    /// For R8 textures only the first byte of `texel` is used.
    pub fn fill(&mut self, texel: [u8; 4]) {
        match self.format {
            TextureFormat::Rgba8Unorm => {
                bytemuck::cast_slice_mut::<u8, [u8; 4]>(&mut self.data).fill(texel);
            }
            TextureFormat::R8Unorm => self.data.fill(texel[0]),
        }
    }

    /// Read a region into a tightly packed buffer
    pub fn read_region(&self, region: Bounds) -> Vec<u8> {
        extract_region(&self.data, self.width, region, self.format.channels())
    }

    /// Overwrite a region from a tightly packed buffer
    pub(crate) fn write_region(&mut self, region: Bounds, data: &[u8]) {
        copy_rect(
            data,
            region.width,
            UVec2::ZERO,
            &mut self.data,
            self.width,
            region.origin(),
            region.size(),
            self.format.channels(),
        );
    }

    /// Overwrite a region from a larger packed buffer, starting at `src_origin`
    pub(crate) fn write_region_from(
        &mut self,
        region: Bounds,
        src: &[u8],
        src_width: u32,
        src_origin: UVec2,
    ) {
        copy_rect(
            src,
            src_width,
            src_origin,
            &mut self.data,
            self.width,
            region.origin(),
            region.size(),
            self.format.channels(),
        );
    }

    /// Device-side copy of `src_region` of `src` to `dst_origin` in this texture
    ///
    /// Both textures must share a format; mismatched copies are skipped.
    pub fn copy_from(&mut self, src: &Texture, src_region: Bounds, dst_origin: UVec2) {
        debug_assert_eq!(src.format, self.format, "texture copy across formats");
        if src.format != self.format {
            warn!("Skipping texture copy from {:?} to {:?}", src.format, self.format);
            return;
        }
        if src_region.is_empty() {
            return;
        }
        copy_rect(
            &src.data,
            src.width,
            src_region.origin(),
            &mut self.data,
            self.width,
            dst_origin,
            src_region.size(),
            self.format.channels(),
        );
        self.state.record_copy();
    }

    #[inline]
    pub(crate) fn device(&self) -> &Arc<DeviceState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;

    #[test]
    fn test_quantize_rounds_to_nearest() {
        assert_eq!(quantize(0.5), 128);
        assert_eq!(quantize(-1.0), 0);
        assert_eq!(quantize(2.0), 255);
        assert_eq!(quantize(1.0 / 255.0), 1);
    }

    #[test]
    fn test_store_and_texel() {
        let ctx = GpuContext::new();
        let mut tex = ctx.create_texture(TextureFormat::Rgba8Unorm, 2, 2, None).unwrap();
        tex.store(1, 1, Vec4::new(1.0, 0.0, 0.5, 1.0));
        assert_eq!(tex.read_region(Bounds::new(1, 1, 1, 1)), vec![255, 0, 128, 255]);
        assert_eq!(tex.texel(1, 1).x, 1.0);

        let mut mask = ctx.create_texture(TextureFormat::R8Unorm, 2, 2, None).unwrap();
        mask.store(0, 0, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(mask.texel(0, 0), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(mask.texel_clamped(-5, 9), Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_fill_and_copy() {
        let ctx = GpuContext::new();
        let mut a = ctx.create_texture(TextureFormat::Rgba8Unorm, 3, 3, None).unwrap();
        a.fill([10, 20, 30, 40]);
        let mut b = ctx.create_texture(TextureFormat::Rgba8Unorm, 3, 3, None).unwrap();
        b.copy_from(&a, Bounds::new(0, 0, 1, 2), UVec2::new(2, 1));
        assert_eq!(b.read_region(Bounds::new(2, 1, 1, 2)), vec![10, 20, 30, 40, 10, 20, 30, 40]);
        assert_eq!(b.read_region(Bounds::new(0, 0, 1, 1)), vec![0, 0, 0, 0]);
        assert_eq!(ctx.stats().copies, 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "texture copy across formats")]
    fn test_copy_across_formats_is_rejected() {
        let ctx = GpuContext::new();
        let mask = ctx.create_texture(TextureFormat::R8Unorm, 2, 2, None).unwrap();
        let mut color = ctx.create_texture(TextureFormat::Rgba8Unorm, 2, 2, None).unwrap();
        color.copy_from(&mask, Bounds::new(0, 0, 2, 2), UVec2::ZERO);
    }
}
