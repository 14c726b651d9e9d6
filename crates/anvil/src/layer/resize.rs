//! Layer resizing

use glam::UVec2;

use crate::gpu::{TextureFormat, blit};
use crate::tile::{allocate_tiles, front_targets};
use crate::types::{Bounds, Size};

use super::{Layer, LayerError, tile_grid_for};

impl Layer {
    /// Reallocate at a new size, discarding all content
    ///
    /// An unchanged size is a no-op.
    pub fn resize_clear(&mut self, width: u32, height: u32) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let size = Size::new(width, height);
        if !size.is_valid() {
            return Err(LayerError::InvalidSize { width, height });
        }
        if size == self.size {
            return Ok(());
        }
        let grid = tile_grid_for(&self.ctx, size, self.tile_size);
        let tiles = allocate_tiles(&self.ctx, &grid, TextureFormat::Rgba8Unorm, None)?;
        self.replace_tiles(size, grid, tiles);
        Ok(())
    }

    /// Reallocate at a new size, keeping the overlapping content
    ///
    /// The rectangle starting at `src_origin` in the old content is placed at
    /// `dest_origin` in the new content, clipped by both extents. Everything
    /// else is transparent.
    pub fn resize_preserve(
        &mut self,
        width: u32,
        height: u32,
        src_origin: UVec2,
        dest_origin: UVec2,
    ) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let size = Size::new(width, height);
        if !size.is_valid() {
            return Err(LayerError::InvalidSize { width, height });
        }
        let grid = tile_grid_for(&self.ctx, size, self.tile_size);
        let mut tiles = allocate_tiles(&self.ctx, &grid, TextureFormat::Rgba8Unorm, None)?;

        let old = self.size;
        if src_origin.x < old.width && src_origin.y < old.height && dest_origin.x < width && dest_origin.y < height {
            let overlap = Bounds::new(
                src_origin.x,
                src_origin.y,
                (old.width - src_origin.x).min(width - dest_origin.x),
                (old.height - src_origin.y).min(height - dest_origin.y),
            );
            blit(
                &self.front_handle(),
                overlap,
                &mut front_targets(&mut tiles),
                &grid,
                dest_origin,
            );
        }

        self.replace_tiles(size, grid, tiles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;
    use crate::layer::LayerInit;

    fn filled(ctx: &GpuContext, width: u32, height: u32, tile: Option<u32>) -> Layer {
        let data: Vec<u8> = (0..width * height)
            .flat_map(|i| [(i % width) as u8, (i / width) as u8, 100, 255])
            .collect();
        let mut init = LayerInit::new(width, height).with_data(&data);
        init.tile_size = tile;
        Layer::new(ctx, init).unwrap()
    }

    fn pixel(layer: &Layer, x: u32, y: u32) -> Vec<u8> {
        layer.read_pixels(Some(Bounds::new(x, y, 1, 1))).unwrap()
    }

    #[test]
    fn test_resize_clear() {
        let ctx = GpuContext::new();
        let mut layer = filled(&ctx, 4, 4, None);
        layer.resize_clear(6, 3).unwrap();
        assert_eq!(layer.size(), Size::new(6, 3));
        assert!(layer.read_pixels(None).unwrap().iter().all(|&b| b == 0));
        assert!(matches!(layer.resize_clear(0, 3), Err(LayerError::InvalidSize { .. })));
        assert_eq!(layer.size(), Size::new(6, 3));
    }

    #[test]
    fn test_resize_clear_same_size_keeps_content() {
        let ctx = GpuContext::new();
        let mut layer = filled(&ctx, 3, 3, None);
        let before = layer.read_pixels(None).unwrap();
        layer.resize_clear(3, 3).unwrap();
        assert_eq!(layer.read_pixels(None).unwrap(), before);
    }

    #[test]
    fn test_resize_preserve_overlap() {
        for tile in [None, Some(3)] {
            let ctx = GpuContext::new();
            let mut layer = filled(&ctx, 6, 5, tile);
            layer
                .resize_preserve(4, 6, UVec2::new(2, 1), UVec2::new(1, 2))
                .unwrap();
            assert_eq!(layer.size(), Size::new(4, 6));

            // overlap is min(6-2, 4-1) x min(5-1, 6-2) = 3x4 at dest (1, 2)
            assert_eq!(pixel(&layer, 1, 2), vec![2, 1, 100, 255]);
            assert_eq!(pixel(&layer, 3, 5), vec![4, 4, 100, 255]);
            assert_eq!(pixel(&layer, 0, 2), vec![0, 0, 0, 0]);
            assert_eq!(pixel(&layer, 1, 1), vec![0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_resize_preserve_empty_overlap() {
        let ctx = GpuContext::new();
        let mut layer = filled(&ctx, 4, 4, None);
        layer
            .resize_preserve(4, 4, UVec2::new(4, 0), UVec2::ZERO)
            .unwrap();
        assert!(layer.read_pixels(None).unwrap().iter().all(|&b| b == 0));
    }
}
