//! Double-buffered tiles
//!
//! A tile owns a front/back texture pair. The front texture is authoritative
//! outside a pass; passes read front and write back. A full-frame pass ends
//! with a swap, a scoped pass copies its region back into front instead.

use glam::{UVec2, Vec2};
use tracing::debug;

use crate::constants::{U_LAYER_SIZE, U_ORIGIN, U_SRC_SIZE, U_TILE_SIZE};
use crate::gpu::{
    FragmentShader, GpuContext, GpuError, RenderPass, Texture, TextureBindings, TextureFormat,
    TextureHandle, Uniforms,
};
use crate::grid::{TileGrid, TileInfo};
use crate::pixels::extract_region;
use crate::types::{Bounds, Size};

/// One fixed-size region of a tiled surface
#[derive(Debug)]
pub struct Tile {
    info: TileInfo,
    textures: [Texture; 2],
    front: usize,
}

impl Tile {
    /// Allocate a tile, initializing the front texture from `data` if given
    pub(crate) fn new(
        ctx: &GpuContext,
        info: TileInfo,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) -> Result<Self, GpuError> {
        let front = ctx.create_texture(format, info.width, info.height, data)?;
        let back = ctx.create_texture(format, info.width, info.height, None)?;
        Ok(Self {
            info,
            textures: [front, back],
            front: 0,
        })
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.info.index
    }

    #[inline]
    pub fn info(&self) -> TileInfo {
        self.info
    }

    /// Surface-space position of the tile's top-left texel
    #[inline]
    pub fn origin(&self) -> UVec2 {
        UVec2::new(self.info.x, self.info.y)
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.info.width, self.info.height)
    }

    /// Tile rectangle in surface space
    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.info.bounds()
    }

    /// Authoritative texture
    #[inline]
    pub fn front(&self) -> &Texture {
        &self.textures[self.front]
    }

    /// Ping-pong write target
    #[inline]
    pub fn back(&self) -> &Texture {
        &self.textures[1 - self.front]
    }

    #[inline]
    pub(crate) fn front_mut(&mut self) -> &mut Texture {
        &mut self.textures[self.front]
    }

    /// Exchange front and back
    #[inline]
    pub(crate) fn swap(&mut self) {
        self.front = 1 - self.front;
    }

    fn split_mut(&mut self) -> (&mut Texture, &mut Texture) {
        let (first, second) = self.textures.split_at_mut(1);
        if self.front == 0 {
            (&mut first[0], &mut second[0])
        } else {
            (&mut second[0], &mut first[0])
        }
    }

    fn pass_uniforms(&self, uniforms: &Uniforms, surface: Size) -> Uniforms {
        let mut uniforms = uniforms.clone();
        uniforms.set(U_ORIGIN, self.origin().as_vec2());
        uniforms.set(U_TILE_SIZE, self.size().as_vec2());
        uniforms.set(U_LAYER_SIZE, surface.as_vec2());
        uniforms
    }

    /// Run `shader` over the tile
    ///
    /// `scope` is a tile-local region. Without it the whole tile is shaded
    /// into back and the pair swapped. With it, front is copied into back over
    /// the region, only the region is shaded, and the result is copied back
    /// into front, so pixels outside the region are never touched.
    pub(crate) fn run_pass(
        &mut self,
        shader: &dyn FragmentShader,
        uniforms: &Uniforms,
        bindings: &TextureBindings<'_>,
        surface: Size,
        scope: Option<Bounds>,
    ) -> u64 {
        let uniforms = self.pass_uniforms(uniforms, surface);
        let origin = self.origin();
        let (front, back) = self.split_mut();
        match scope {
            None => {
                let shaded = RenderPass {
                    shader,
                    uniforms: &uniforms,
                    bindings,
                    source: Some(&*front),
                    origin,
                    scissor: None,
                }
                .execute(back);
                self.swap();
                shaded
            }
            Some(local) => {
                let local = local.clamp_to(front.size());
                if local.is_empty() {
                    return 0;
                }
                back.copy_from(front, local, local.origin());
                let shaded = RenderPass {
                    shader,
                    uniforms: &uniforms,
                    bindings,
                    source: Some(&*front),
                    origin,
                    scissor: Some(local),
                }
                .execute(back);
                front.copy_from(back, local, local.origin());
                shaded
            }
        }
    }

    /// Run `shader` into freshly allocated textures of `new_size`
    ///
    /// The current front is bound as the source and `u_src_size` holds its
    /// size. The tile then covers `(0, 0, new_size)`.
    pub(crate) fn run_resized_pass(
        &mut self,
        ctx: &GpuContext,
        shader: &dyn FragmentShader,
        uniforms: &Uniforms,
        bindings: &TextureBindings<'_>,
        new_size: Size,
    ) -> Result<u64, GpuError> {
        let format = self.front().format();
        let mut target = ctx.create_texture(format, new_size.width, new_size.height, None)?;
        let spare = ctx.create_texture(format, new_size.width, new_size.height, None)?;

        let mut uniforms = self.pass_uniforms(uniforms, new_size);
        uniforms.set(U_SRC_SIZE, self.size().as_vec2());
        uniforms.set(U_TILE_SIZE, Vec2::new(new_size.width as f32, new_size.height as f32));

        let shaded = RenderPass {
            shader,
            uniforms: &uniforms,
            bindings,
            source: Some(self.front()),
            origin: UVec2::ZERO,
            scissor: None,
        }
        .execute(&mut target);

        self.textures = [target, spare];
        self.front = 0;
        self.info = TileInfo {
            index: self.info.index,
            x: 0,
            y: 0,
            width: new_size.width,
            height: new_size.height,
        };
        Ok(shaded)
    }
}

/// Allocate every tile of `grid`, splitting optional whole-surface data
pub(crate) fn allocate_tiles(
    ctx: &GpuContext,
    grid: &TileGrid,
    format: TextureFormat,
    data: Option<&[u8]>,
) -> Result<Vec<Tile>, GpuError> {
    let size = grid.size();
    let mut tiles = Vec::with_capacity(grid.tile_count());
    for info in grid.tiles() {
        let tile = match data {
            Some(data) if grid.is_single() => Tile::new(ctx, info, format, Some(data))?,
            Some(data) => {
                let tile_data = extract_region(data, size.width, info.bounds(), format.channels());
                Tile::new(ctx, info, format, Some(&tile_data))?
            }
            None => Tile::new(ctx, info, format, None)?,
        };
        tiles.push(tile);
    }
    debug!(
        "allocate_tiles: {}x{} {:?} -> {} tiles of {}",
        size.width,
        size.height,
        format,
        tiles.len(),
        grid.tile_size()
    );
    Ok(tiles)
}

/// Borrow the front textures of a tile set as one handle
pub(crate) fn front_handle<'a>(tiles: &'a [Tile], grid: &TileGrid) -> TextureHandle<'a> {
    if let [tile] = tiles {
        return TextureHandle::Single(tile.front());
    }
    TextureHandle::Tiled {
        textures: tiles.iter().map(Tile::front).collect(),
        grid: *grid,
    }
}

/// Mutable front textures in tile order
pub(crate) fn front_targets(tiles: &mut [Tile]) -> Vec<&mut Texture> {
    tiles.iter_mut().map(Tile::front_mut).collect()
}

/// Run a pass over every tile, or only over the tiles a region touches
pub(crate) fn run_tiled_pass(
    tiles: &mut [Tile],
    grid: &TileGrid,
    shader: &dyn FragmentShader,
    uniforms: &Uniforms,
    bindings: &TextureBindings<'_>,
    bounds: Option<Bounds>,
) -> u64 {
    let surface = grid.size();
    match bounds {
        None => tiles
            .iter_mut()
            .map(|tile| tile.run_pass(shader, uniforms, bindings, surface, None))
            .sum(),
        Some(bounds) => grid
            .intersect(bounds)
            .into_iter()
            .filter_map(|region| {
                tiles
                    .get_mut(region.index)
                    .map(|tile| tile.run_pass(shader, uniforms, bindings, surface, Some(region.local)))
            })
            .sum(),
    }
}
