//! Shader effects over layer tiles

use tracing::{debug, trace};

use crate::gpu::{FragmentShader, TextureBindings, Uniforms};
use crate::tile::run_tiled_pass;
use crate::types::{Bounds, Size};

use super::events::LayerEvent;
use super::{Layer, LayerError, tile_grid_for};

impl Layer {
    /// Run a full-frame pass over every tile
    ///
    /// Each tile sees `u_origin`, `u_tile_size` and `u_layer_size`, so effects
    /// that look at neighbours or global position stay seamless across tiles.
    pub fn apply_effect(&mut self, shader: &dyn FragmentShader, uniforms: &Uniforms) -> Result<(), LayerError> {
        self.apply_effect_with_textures(shader, uniforms, &TextureBindings::new(), None)
    }

    /// Run a pass with extra bound textures, optionally scoped to a region
    ///
    /// With bounds only the tiles the region touches run, each restricted to
    /// its part of the region; pixels outside it keep their values. Bounds are
    /// clamped to the layer and an empty result skips the pass.
    pub fn apply_effect_with_textures(
        &mut self,
        shader: &dyn FragmentShader,
        uniforms: &Uniforms,
        bindings: &TextureBindings<'_>,
        bounds: Option<Bounds>,
    ) -> Result<(), LayerError> {
        self.ensure_alive()?;
        let scope = match bounds {
            Some(bounds) => {
                let clamped = bounds.clamp_to(self.size);
                if clamped.is_empty() {
                    trace!("apply_effect '{}': empty bounds, skipped", shader.label());
                    return Ok(());
                }
                Some(clamped)
            }
            None => None,
        };

        let shaded = run_tiled_pass(&mut self.tiles, &self.grid, shader, uniforms, bindings, scope);
        debug!(
            "Layer {} apply_effect '{}': {:?} -> {} fragments",
            self.id.get(),
            shader.label(),
            scope,
            shaded
        );
        Ok(())
    }

    /// Run a pass that produces a layer of a different size
    ///
    /// Used for 90 degree rotations. The current content is bound as the
    /// source with `u_src_size` set. Only single-tile layers whose new size
    /// still fits one tile are supported.
    pub fn apply_effect_resized(
        &mut self,
        shader: &dyn FragmentShader,
        uniforms: &Uniforms,
        new_size: Size,
    ) -> Result<(), LayerError> {
        self.ensure_alive()?;
        if !new_size.is_valid() {
            return Err(LayerError::InvalidSize {
                width: new_size.width,
                height: new_size.height,
            });
        }
        let grid = tile_grid_for(&self.ctx, new_size, self.tile_size);
        if self.tiles.len() != 1 || !grid.is_single() {
            return Err(LayerError::TiledResizeUnsupported {
                tiles: self.tiles.len().max(grid.tile_count()),
            });
        }
        let Some(tile) = self.tiles.first_mut() else {
            return Err(LayerError::NoSuchTile(0));
        };
        tile.run_resized_pass(&self.ctx, shader, uniforms, &TextureBindings::new(), new_size)?;

        self.size = new_size;
        self.grid = grid;
        debug!(
            "Layer {} apply_effect_resized '{}': {}x{}",
            self.id.get(),
            shader.label(),
            new_size.width,
            new_size.height
        );
        let event = LayerEvent::Resized {
            size: new_size,
            tiles: self.tiles(),
        };
        self.emit(&event);
        Ok(())
    }
}
