//! Single-channel coverage surface
//!
//! A [`MaskSurface`] mirrors a layer's tiling with R8 textures. Kernels stamp
//! coverage into it and instruments merge it onto the layer in one pass.

use tracing::{debug, trace};

use crate::constants::MASK_CHANNELS;
use crate::gpu::{FragmentShader, GpuContext, TextureBindings, TextureFormat, TextureHandle, Uniforms, upload};
use crate::grid::TileGrid;
use crate::layer::{LayerError, tile_grid_for};
use crate::tile::{Tile, allocate_tiles, front_handle, front_targets, run_tiled_pass};
use crate::types::{Bounds, Size};

pub struct MaskSurface {
    ctx: GpuContext,
    size: Size,
    tile_size: Option<u32>,
    grid: TileGrid,
    tiles: Vec<Tile>,
    disposed: bool,
}

impl std::fmt::Debug for MaskSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskSurface")
            .field("size", &self.size)
            .field("tiles", &self.tiles.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl MaskSurface {
    /// Allocate a zeroed mask of `size`
    pub fn new(ctx: &GpuContext, size: Size, tile_size: Option<u32>) -> Result<Self, LayerError> {
        if !size.is_valid() {
            return Err(LayerError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }
        let grid = tile_grid_for(ctx, size, tile_size);
        let tiles = allocate_tiles(ctx, &grid, TextureFormat::R8Unorm, None)?;
        debug!("MaskSurface created: {}x{} in {} tiles", size.width, size.height, tiles.len());
        Ok(Self {
            ctx: ctx.clone(),
            size,
            tile_size,
            grid,
            tiles,
            disposed: false,
        })
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.size.height
    }

    #[inline]
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_alive(&self) -> Result<(), LayerError> {
        if self.disposed {
            return Err(LayerError::Disposed);
        }
        Ok(())
    }

    /// Set every texel to `value`
    pub fn clear(&mut self, value: u8) -> Result<(), LayerError> {
        self.ensure_alive()?;
        for tile in &mut self.tiles {
            tile.front_mut().fill([value, 0, 0, 0]);
        }
        Ok(())
    }

    /// Run a shader over the mask, optionally scoped to a region
    ///
    /// Scoped passes leave every texel outside the clamped bounds untouched.
    /// Only the red channel of the shader output is stored.
    pub fn apply_effect(
        &mut self,
        shader: &dyn FragmentShader,
        uniforms: &Uniforms,
        bounds: Option<Bounds>,
    ) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let scope = match bounds {
            Some(bounds) => {
                let clamped = bounds.clamp_to(self.size);
                if clamped.is_empty() {
                    return Ok(());
                }
                Some(clamped)
            }
            None => None,
        };
        let shaded = run_tiled_pass(
            &mut self.tiles,
            &self.grid,
            shader,
            uniforms,
            &TextureBindings::new(),
            scope,
        );
        trace!("MaskSurface apply_effect '{}': {:?} -> {} fragments", shader.label(), scope, shaded);
        Ok(())
    }

    /// Read the whole mask, one byte per texel
    pub fn read_pixels(&self) -> Result<Vec<u8>, LayerError> {
        self.read_region(Bounds::full(self.size))
    }

    pub fn read_region(&self, bounds: Bounds) -> Result<Vec<u8>, LayerError> {
        self.ensure_alive()?;
        if !bounds.fits_within(self.size) {
            return Err(LayerError::OutOfBounds {
                bounds,
                size: self.size,
            });
        }
        Ok(front_handle(&self.tiles, &self.grid).read_region(bounds))
    }

    /// Overwrite the whole mask, resizing first when `size` differs
    pub fn replace_buffer(&mut self, buffer: &[u8], size: Option<Size>) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let size = size.unwrap_or(self.size);
        let expected = size.byte_len(MASK_CHANNELS);
        if buffer.len() != expected {
            return Err(LayerError::BufferSizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        if size != self.size {
            if !size.is_valid() {
                return Err(LayerError::InvalidSize {
                    width: size.width,
                    height: size.height,
                });
            }
            self.grid = tile_grid_for(&self.ctx, size, self.tile_size);
            self.tiles = allocate_tiles(&self.ctx, &self.grid, TextureFormat::R8Unorm, None)?;
            self.size = size;
        }
        upload(&mut front_targets(&mut self.tiles), &self.grid, Bounds::full(size), buffer);
        Ok(())
    }

    /// Borrow the mask for binding into a merge shader
    pub fn texture_handle(&self) -> Result<TextureHandle<'_>, LayerError> {
        self.ensure_alive()?;
        Ok(front_handle(&self.tiles, &self.grid))
    }

    /// Release the textures; later calls fail
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.tiles.clear();
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::gpu::from_fn;

    fn coverage(value: f32) -> impl FragmentShader {
        from_fn("coverage", move |f| Vec4::new(f.src().x.max(value), 0.0, 0.0, 1.0))
    }

    #[test]
    fn test_clear_and_read() {
        let ctx = GpuContext::new();
        let mut mask = MaskSurface::new(&ctx, Size::new(5, 4), Some(2)).unwrap();
        assert_eq!(mask.read_pixels().unwrap(), vec![0; 20]);
        mask.clear(7).unwrap();
        assert_eq!(mask.read_pixels().unwrap(), vec![7; 20]);
    }

    #[test]
    fn test_scoped_effect_touches_only_bounds() {
        let ctx = GpuContext::new();
        let mut mask = MaskSurface::new(&ctx, Size::new(6, 6), Some(4)).unwrap();
        mask.apply_effect(&coverage(1.0), &Uniforms::new(), Some(Bounds::new(3, 3, 2, 2)))
            .unwrap();
        let pixels = mask.read_pixels().unwrap();
        assert_eq!(pixels.iter().filter(|&&v| v == 255).count(), 4);
        assert_eq!(mask.read_region(Bounds::new(3, 3, 2, 2)).unwrap(), vec![255; 4]);
    }

    #[test]
    fn test_max_combine_is_idempotent() {
        let ctx = GpuContext::new();
        let mut mask = MaskSurface::new(&ctx, Size::new(4, 4), None).unwrap();
        let half = coverage(0.5);
        mask.apply_effect(&half, &Uniforms::new(), None).unwrap();
        let once = mask.read_pixels().unwrap();
        mask.apply_effect(&half, &Uniforms::new(), None).unwrap();
        assert_eq!(mask.read_pixels().unwrap(), once);
        assert_eq!(once[0], 128);
    }

    #[test]
    fn test_replace_buffer() {
        let ctx = GpuContext::new();
        let mut mask = MaskSurface::new(&ctx, Size::new(2, 2), Some(1)).unwrap();
        mask.replace_buffer(&[1, 2, 3, 4], None).unwrap();
        assert_eq!(mask.read_pixels().unwrap(), vec![1, 2, 3, 4]);
        mask.replace_buffer(&[9; 6], Some(Size::new(3, 2))).unwrap();
        assert_eq!(mask.size(), Size::new(3, 2));
        assert_eq!(mask.read_pixels().unwrap(), vec![9; 6]);
        assert!(matches!(
            mask.replace_buffer(&[0; 5], None),
            Err(LayerError::BufferSizeMismatch { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_dispose() {
        let ctx = GpuContext::new();
        let mut mask = MaskSurface::new(&ctx, Size::new(2, 2), None).unwrap();
        mask.dispose();
        mask.dispose();
        assert!(mask.is_disposed());
        assert!(matches!(mask.clear(0), Err(LayerError::Disposed)));
        assert!(mask.texture_handle().is_err());
        assert_eq!(ctx.stats().live_textures, 0);
    }
}
