//! Software render device
//!
//! The device models the subset of a GPU the engine relies on: RGBA8 and R8
//! textures, full-frame or scissored fragment passes with a single source
//! texture plus named extra bindings, and texture-to-texture copies. Passes
//! run to completion before returning, so every write is visible to the next
//! read. Output is quantized to unorm8 with round-to-nearest, exactly like a
//! fixed-function blend-free write to an 8-bit render target.

mod handle;
mod pass;
mod shader;
mod texture;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use anvil_config::DeviceConfig;

pub use handle::{TextureBindings, TextureHandle, TextureSet, blit};
pub(crate) use handle::upload;
pub use pass::RenderPass;
pub use shader::{FnShader, Fragment, FragmentShader, UniformValue, Uniforms, from_fn, mix};
pub use texture::{Texture, TextureFormat};

/// Errors raised by the render device
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GpuError {
    #[error("Invalid texture size {width}x{height}")]
    InvalidTextureSize { width: u32, height: u32 },
    #[error("Texture size {width}x{height} exceeds device limit {max}")]
    TextureTooLarge { width: u32, height: u32, max: u32 },
    #[error("Out of texture memory: {requested} bytes requested, {live} of {budget} in use")]
    OutOfMemory { requested: u64, live: u64, budget: u64 },
    #[error("Texture data length mismatch: expected {expected}, got {actual}")]
    DataLength { expected: usize, actual: usize },
    #[error("Unsupported uniform length {0} (expected 1 to 4 components)")]
    UnsupportedUniformLength(usize),
}

/// Snapshot of device resource counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuStats {
    /// Textures currently alive
    pub live_textures: usize,
    /// Bytes held by live textures
    pub live_bytes: u64,
    /// Render passes executed since creation
    pub passes: u64,
    /// Fragments shaded since creation
    pub fragments: u64,
    /// Texture-to-texture copies since creation
    pub copies: u64,
}

pub(crate) struct DeviceState {
    max_texture_dimension: u32,
    memory_budget: Option<u64>,
    live_textures: AtomicUsize,
    live_bytes: AtomicU64,
    passes: AtomicU64,
    fragments: AtomicU64,
    copies: AtomicU64,
}

impl DeviceState {
    fn reserve(&self, bytes: u64) -> Result<(), GpuError> {
        let live = self.live_bytes.load(Ordering::Relaxed);
        if let Some(budget) = self.memory_budget {
            if live + bytes > budget {
                return Err(GpuError::OutOfMemory {
                    requested: bytes,
                    live,
                    budget,
                });
            }
        }
        self.live_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.live_textures.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn release(&self, bytes: u64) {
        self.live_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.live_textures.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_copy(&self) {
        self.copies.fetch_add(1, Ordering::Relaxed);
    }
}

/// Handle to the render device
///
/// Cloning is cheap; all clones share limits and resource accounting.
#[derive(Clone)]
pub struct GpuContext {
    pub(crate) state: Arc<DeviceState>,
}

impl Default for GpuContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("max_texture_dimension", &self.state.max_texture_dimension)
            .field("memory_budget", &self.state.memory_budget)
            .field("stats", &self.stats())
            .finish()
    }
}

impl GpuContext {
    /// Create a device with default limits
    pub fn new() -> Self {
        Self::from_config(&DeviceConfig::default())
    }

    /// Create a device with the limits from `config`
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            state: Arc::new(DeviceState {
                max_texture_dimension: config.max_texture_dimension.max(1),
                memory_budget: config.memory_budget,
                live_textures: AtomicUsize::new(0),
                live_bytes: AtomicU64::new(0),
                passes: AtomicU64::new(0),
                fragments: AtomicU64::new(0),
                copies: AtomicU64::new(0),
            }),
        }
    }

    /// Largest width or height a single texture may have
    #[inline]
    pub fn max_texture_dimension(&self) -> u32 {
        self.state.max_texture_dimension
    }

    /// Current resource counters
    pub fn stats(&self) -> GpuStats {
        let s = &self.state;
        GpuStats {
            live_textures: s.live_textures.load(Ordering::Relaxed),
            live_bytes: s.live_bytes.load(Ordering::Relaxed),
            passes: s.passes.load(Ordering::Relaxed),
            fragments: s.fragments.load(Ordering::Relaxed),
            copies: s.copies.load(Ordering::Relaxed),
        }
    }

    /// Allocate a texture, optionally initialized from tightly packed data
    ///
    /// Without data the texture starts zeroed (transparent black).
    pub fn create_texture(
        &self,
        format: TextureFormat,
        width: u32,
        height: u32,
        data: Option<&[u8]>,
    ) -> Result<Texture, GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidTextureSize { width, height });
        }
        let max = self.state.max_texture_dimension;
        if width > max || height > max {
            return Err(GpuError::TextureTooLarge { width, height, max });
        }
        let len = width as usize * height as usize * format.channels();
        let pixels = match data {
            Some(data) if data.len() != len => {
                return Err(GpuError::DataLength {
                    expected: len,
                    actual: data.len(),
                });
            }
            Some(data) => data.to_vec(),
            None => vec![0u8; len],
        };
        self.state.reserve(len as u64)?;
        Ok(Texture::from_parts(
            Arc::clone(&self.state),
            format,
            width,
            height,
            pixels,
        ))
    }

    /// Allocate a texture with the same format, size and contents as `source`
    pub fn duplicate_texture(&self, source: &Texture) -> Result<Texture, GpuError> {
        self.create_texture(source.format(), source.width(), source.height(), Some(source.data()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_texture_accounting() {
        let ctx = GpuContext::new();
        let a = ctx.create_texture(TextureFormat::Rgba8Unorm, 4, 4, None).unwrap();
        let b = ctx.create_texture(TextureFormat::R8Unorm, 4, 4, None).unwrap();
        let stats = ctx.stats();
        assert_eq!(stats.live_textures, 2);
        assert_eq!(stats.live_bytes, 64 + 16);

        drop(a);
        drop(b);
        let stats = ctx.stats();
        assert_eq!(stats.live_textures, 0);
        assert_eq!(stats.live_bytes, 0);
    }

    #[test]
    fn test_invalid_allocations() {
        let ctx = GpuContext::from_config(&DeviceConfig {
            max_texture_dimension: 16,
            memory_budget: Some(1024),
        });
        assert!(matches!(
            ctx.create_texture(TextureFormat::Rgba8Unorm, 0, 4, None),
            Err(GpuError::InvalidTextureSize { .. })
        ));
        assert!(matches!(
            ctx.create_texture(TextureFormat::Rgba8Unorm, 17, 4, None),
            Err(GpuError::TextureTooLarge { .. })
        ));
        assert!(matches!(
            ctx.create_texture(TextureFormat::Rgba8Unorm, 2, 2, Some(&[0u8; 3])),
            Err(GpuError::DataLength { expected: 16, actual: 3 })
        ));

        // 16x16 RGBA = 1024 bytes fills the budget exactly
        let _full = ctx.create_texture(TextureFormat::Rgba8Unorm, 16, 16, None).unwrap();
        assert!(matches!(
            ctx.create_texture(TextureFormat::R8Unorm, 1, 1, None),
            Err(GpuError::OutOfMemory { .. })
        ));
    }

    #[test]
    fn test_duplicate_texture() {
        let ctx = GpuContext::new();
        let src = ctx
            .create_texture(TextureFormat::R8Unorm, 2, 1, Some(&[7, 9]))
            .unwrap();
        let copy = ctx.duplicate_texture(&src).unwrap();
        assert_eq!(copy.data(), &[7, 9]);
        assert_eq!(ctx.stats().live_textures, 2);
    }
}
