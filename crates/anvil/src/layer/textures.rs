//! Texture copy and patch helpers
//!
//! These dispatch over single and tiled layouts through [`TextureHandle`] so
//! history backends and instruments never care how a layer is split.

use crate::constants::RGBA_CHANNELS;
use crate::gpu::{TextureFormat, TextureHandle, TextureSet, blit};
use crate::mask::MaskSurface;
use crate::tile::front_targets;
use crate::types::{Bounds, Size};

use super::{Layer, LayerError};

impl Layer {
    /// Borrow the current front textures
    pub fn texture_handle(&self) -> Result<TextureHandle<'_>, LayerError> {
        self.ensure_alive()?;
        Ok(self.front_handle())
    }

    /// Borrow the front texture of one tile
    pub fn tile_texture_handle(&self, index: usize) -> Result<TextureHandle<'_>, LayerError> {
        self.ensure_alive()?;
        self.tiles
            .get(index)
            .map(|tile| TextureHandle::Single(tile.front()))
            .ok_or(LayerError::NoSuchTile(index))
    }

    /// Copy a region into new textures sized to the region
    pub fn copy_texture(&self, bounds: Bounds) -> Result<TextureSet, LayerError> {
        self.ensure_alive()?;
        let bounds = self.checked_bounds(Some(bounds))?;
        let mut set = TextureSet::new(
            &self.ctx,
            TextureFormat::Rgba8Unorm,
            bounds.size(),
            self.grid.tile_size(),
            None,
        )?;
        set.copy_region_from(&self.front_handle(), bounds, glam::UVec2::ZERO);
        Ok(set)
    }

    /// Copy a region into the same coordinates of a layer-sized texture set
    ///
    /// Bounds are clamped to the layer.
    pub fn copy_texture_region(&self, target: &mut TextureSet, bounds: Bounds) -> Result<(), LayerError> {
        self.ensure_alive()?;
        if target.size() != self.size {
            return Err(LayerError::SizeMismatch {
                expected: self.size,
                actual: target.size(),
            });
        }
        let bounds = bounds.clamp_to(self.size);
        if bounds.is_empty() {
            return Ok(());
        }
        target.copy_region_from(&self.front_handle(), bounds, bounds.origin());
        Ok(())
    }

    /// Draw a region-sized texture into the layer at `bounds`
    pub fn draw_texture(&mut self, bounds: Bounds, texture: &TextureHandle<'_>) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let bounds = self.checked_bounds(Some(bounds))?;
        if texture.size() != bounds.size() {
            return Err(LayerError::SizeMismatch {
                expected: bounds.size(),
                actual: texture.size(),
            });
        }
        blit(
            texture,
            Bounds::full(texture.size()),
            &mut front_targets(&mut self.tiles),
            &self.grid,
            bounds.origin(),
        );
        Ok(())
    }

    /// Upload RGBA8 data into new textures using this layer's tiling
    pub fn create_texture_from_raw(&self, buffer: &[u8], size: Size) -> Result<TextureSet, LayerError> {
        self.ensure_alive()?;
        let expected = size.byte_len(RGBA_CHANNELS);
        if buffer.len() != expected {
            return Err(LayerError::BufferSizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(TextureSet::new(
            &self.ctx,
            TextureFormat::Rgba8Unorm,
            size,
            self.grid.tile_size(),
            Some(buffer),
        )?)
    }

    /// Allocate transparent layer-sized textures with the layer's tiling
    pub fn create_empty_texture(&self) -> Result<TextureSet, LayerError> {
        self.ensure_alive()?;
        Ok(TextureSet::new(
            &self.ctx,
            TextureFormat::Rgba8Unorm,
            self.size,
            self.grid.tile_size(),
            None,
        )?)
    }

    /// Copy the whole layer into new textures
    pub fn create_texture_copy(&self) -> Result<TextureSet, LayerError> {
        self.copy_texture(Bounds::full(self.size))
    }

    /// Read the top-left `size` pixels of a texture
    pub fn read_texture_pixels(&self, texture: &TextureHandle<'_>, size: Size) -> Result<Vec<u8>, LayerError> {
        self.read_texture_pixels_from(texture, Bounds::full(size))
    }

    /// Read a region of a texture
    pub fn read_texture_pixels_from(&self, texture: &TextureHandle<'_>, bounds: Bounds) -> Result<Vec<u8>, LayerError> {
        self.ensure_alive()?;
        if !bounds.fits_within(texture.size()) {
            return Err(LayerError::OutOfBounds {
                bounds,
                size: texture.size(),
            });
        }
        Ok(texture.read_region(bounds))
    }

    /// Create a mask surface with this layer's tiling, layer-sized by default
    pub fn create_mask_surface(&self, size: Option<Size>) -> Result<MaskSurface, LayerError> {
        self.ensure_alive()?;
        MaskSurface::new(&self.ctx, size.unwrap_or(self.size), self.tile_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;
    use crate::layer::LayerInit;

    fn numbered(size: Size) -> Vec<u8> {
        (0..size.pixel_count())
            .flat_map(|i| [i as u8, 0, 0, 255])
            .collect()
    }

    #[test]
    fn test_copy_and_draw_texture() {
        let ctx = GpuContext::new();
        let size = Size::new(8, 8);
        let data = numbered(size);
        let mut layer = Layer::new(&ctx, LayerInit::new(8, 8).with_data(&data).with_tile_size(3)).unwrap();

        let region = Bounds::new(2, 1, 4, 5);
        let copy = layer.copy_texture(region).unwrap();
        assert_eq!(copy.size(), region.size());
        assert_eq!(copy.read_region(Bounds::full(region.size())), layer.read_pixels(Some(region)).unwrap());

        layer.clear([0, 0, 0, 0]).unwrap();
        layer.draw_texture(region, &copy.handle()).unwrap();
        assert_eq!(layer.read_pixels(Some(region)).unwrap(), copy.read_region(Bounds::full(region.size())));
        assert_eq!(layer.read_pixels(Some(Bounds::new(0, 0, 1, 1))).unwrap(), vec![0, 0, 0, 0]);

        assert!(matches!(
            layer.draw_texture(Bounds::new(0, 0, 2, 2), &copy.handle()),
            Err(LayerError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_copy_texture_region_same_coordinates() {
        let ctx = GpuContext::new();
        let size = Size::new(6, 6);
        let data = numbered(size);
        let layer = Layer::new(&ctx, LayerInit::new(6, 6).with_data(&data).with_tile_size(4)).unwrap();
        let mut base = layer.create_empty_texture().unwrap();
        layer.copy_texture_region(&mut base, Bounds::new(3, 2, 2, 2)).unwrap();

        let region = Bounds::new(3, 2, 2, 2);
        assert_eq!(base.read_region(region), layer.read_pixels(Some(region)).unwrap());
        assert_eq!(base.read_region(Bounds::new(0, 0, 1, 1)), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_texture_from_raw_and_readback() {
        let ctx = GpuContext::new();
        let layer = Layer::new(&ctx, LayerInit::new(4, 4).with_tile_size(2)).unwrap();
        let raw = numbered(Size::new(3, 3));
        let set = layer.create_texture_from_raw(&raw, Size::new(3, 3)).unwrap();
        assert!(set.handle().is_tiled());
        assert_eq!(layer.read_texture_pixels(&set.handle(), Size::new(3, 3)).unwrap(), raw);
        assert_eq!(
            layer
                .read_texture_pixels_from(&set.handle(), Bounds::new(1, 1, 1, 1))
                .unwrap(),
            vec![4, 0, 0, 255]
        );
        assert!(layer.create_texture_from_raw(&raw, Size::new(2, 2)).is_err());
        assert!(layer.read_texture_pixels(&set.handle(), Size::new(4, 4)).is_err());
    }

    #[test]
    fn test_texture_copy_and_tile_handles() {
        let ctx = GpuContext::new();
        let data = numbered(Size::new(4, 2));
        let layer = Layer::new(&ctx, LayerInit::new(4, 2).with_data(&data).with_tile_size(2)).unwrap();
        let copy = layer.create_texture_copy().unwrap();
        assert_eq!(copy.read_region(Bounds::full(layer.size())), data);

        let tile = layer.tile_texture_handle(1).unwrap();
        assert_eq!(tile.size(), Size::new(2, 2));
        assert_eq!(tile.read_region(Bounds::new(0, 0, 1, 1)), vec![2, 0, 0, 255]);
        assert!(matches!(layer.tile_texture_handle(2), Err(LayerError::NoSuchTile(2))));
    }

    #[test]
    fn test_create_mask_surface() {
        let ctx = GpuContext::new();
        let layer = Layer::new(&ctx, LayerInit::new(5, 3)).unwrap();
        let mask = layer.create_mask_surface(None).unwrap();
        assert_eq!(mask.size(), Size::new(5, 3));
    }
}
