//! CPU pixel access for layers

use glam::UVec2;
use tracing::debug;

use crate::constants::RGBA_CHANNELS;
use crate::gpu::{blit, upload};
use crate::pixels::flip_rows;
use crate::tile::front_targets;
use crate::types::{Bounds, Size};

use super::{Layer, LayerError};

impl Layer {
    /// Read RGBA8 pixels, top row first
    ///
    /// `None` reads the whole layer. Bounds outside the layer are an error.
    pub fn read_pixels(&self, bounds: Option<Bounds>) -> Result<Vec<u8>, LayerError> {
        self.read_pixels_with(bounds, false)
    }

    /// Read RGBA8 pixels, optionally with the row order reversed
    pub fn read_pixels_with(&self, bounds: Option<Bounds>, flip_y: bool) -> Result<Vec<u8>, LayerError> {
        self.ensure_alive()?;
        let bounds = self.checked_bounds(bounds)?;
        if bounds.is_empty() {
            return Ok(Vec::new());
        }
        let pixels = self.front_handle().read_region(bounds);
        if flip_y {
            return Ok(flip_rows(&pixels, bounds.size(), RGBA_CHANNELS));
        }
        Ok(pixels)
    }

    /// Read the whole layer
    pub fn export_raw(&self, flip_y: bool) -> Result<Vec<u8>, LayerError> {
        self.read_pixels_with(None, flip_y)
    }

    /// Overwrite a region with tightly packed RGBA8 data
    ///
    /// The buffer must hold exactly `width * height * 4` bytes and the region
    /// must lie inside the layer. An empty region with an empty buffer is a
    /// no-op.
    pub fn write_pixels(&mut self, bounds: Bounds, buffer: &[u8]) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let bounds = self.checked_bounds(Some(bounds))?;
        let expected = bounds.pixel_count() * RGBA_CHANNELS;
        if buffer.len() != expected {
            return Err(LayerError::BufferSizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        if bounds.is_empty() {
            return Ok(());
        }
        upload(&mut front_targets(&mut self.tiles), &self.grid, bounds, buffer);
        Ok(())
    }

    /// Replace the whole content, resizing first when `size` differs
    pub fn replace_buffer(&mut self, buffer: &[u8], size: Option<Size>) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let size = size.unwrap_or(self.size);
        let expected = size.byte_len(RGBA_CHANNELS);
        if buffer.len() != expected {
            return Err(LayerError::BufferSizeMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        if size != self.size {
            self.resize_clear(size.width, size.height)?;
        }
        self.write_pixels(Bounds::full(size), buffer)
    }

    /// Fill every pixel with one RGBA8 color
    pub fn clear(&mut self, color: [u8; 4]) -> Result<(), LayerError> {
        self.ensure_alive()?;
        for tile in &mut self.tiles {
            tile.front_mut().fill(color);
        }
        debug!("Layer {} cleared to {:?}", self.id.get(), color);
        Ok(())
    }

    /// Copy the content of another layer of the same size
    pub fn copy_from(&mut self, other: &Layer) -> Result<(), LayerError> {
        self.ensure_alive()?;
        other.ensure_alive()?;
        if other.size != self.size {
            return Err(LayerError::SizeMismatch {
                expected: self.size,
                actual: other.size,
            });
        }
        let source = other.front_handle();
        blit(
            &source,
            Bounds::full(other.size),
            &mut front_targets(&mut self.tiles),
            &self.grid,
            UVec2::ZERO,
        );
        Ok(())
    }
}
