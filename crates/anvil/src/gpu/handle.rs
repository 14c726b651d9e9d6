//! Single/tiled texture dispatch
//!
//! Every consumer that needs "the texture behind a surface" goes through
//! [`TextureHandle`] (borrowed) or [`TextureSet`] (owned). Both carry either
//! one texture or a tile grid of textures, and [`TextureHandle::texture`] is
//! the one place that maps a tile index to its texture.

use std::collections::BTreeMap;

use glam::{UVec2, Vec2, Vec4};

use super::texture::{Texture, TextureFormat};
use super::{GpuContext, GpuError};
use crate::grid::{TileGrid, TileRegion};
use crate::pixels::{copy_rect, extract_region};
use crate::types::{Bounds, Size};

/// Borrowed view of a single or tiled texture
#[derive(Debug, Clone)]
pub enum TextureHandle<'a> {
    Single(&'a Texture),
    Tiled {
        textures: Vec<&'a Texture>,
        grid: TileGrid,
    },
}

impl<'a> TextureHandle<'a> {
    /// Tile layout of the handle (a single texture is a one-tile grid)
    pub fn grid(&self) -> TileGrid {
        match self {
            TextureHandle::Single(texture) => TileGrid::single(texture.size()),
            TextureHandle::Tiled { grid, .. } => *grid,
        }
    }

    pub fn size(&self) -> Size {
        self.grid().size()
    }

    pub fn format(&self) -> TextureFormat {
        match self {
            TextureHandle::Single(texture) => texture.format(),
            TextureHandle::Tiled { textures, .. } => textures
                .first()
                .map(|t| t.format())
                .unwrap_or(TextureFormat::Rgba8Unorm),
        }
    }

    pub fn is_tiled(&self) -> bool {
        matches!(self, TextureHandle::Tiled { .. })
    }

    /// Texture backing tile `index`
    pub fn texture(&self, index: usize) -> Option<&'a Texture> {
        match self {
            TextureHandle::Single(texture) => (index == 0).then_some(*texture),
            TextureHandle::Tiled { textures, .. } => textures.get(index).copied(),
        }
    }

    /// Map a surface pixel to its texture and texel coordinates
    pub fn resolve(&self, x: u32, y: u32) -> Option<(&'a Texture, UVec2)> {
        let grid = self.grid();
        let index = grid.index_at(x, y)?;
        let info = grid.tile_info(index)?;
        let texture = self.texture(index)?;
        Some((texture, UVec2::new(x - info.x, y - info.y)))
    }

    /// Per-texture pieces of a surface region
    pub fn regions(&self, bounds: Bounds) -> Vec<(&'a Texture, TileRegion)> {
        self.grid()
            .intersect(bounds)
            .into_iter()
            .filter_map(|region| self.texture(region.index).map(|t| (t, region)))
            .collect()
    }

    /// Texel at a surface pixel with clamp-to-edge addressing
    pub fn texel(&self, x: i64, y: i64) -> Vec4 {
        let size = self.size();
        let x = x.clamp(0, size.width as i64 - 1) as u32;
        let y = y.clamp(0, size.height as i64 - 1) as u32;
        self.resolve(x, y)
            .map(|(texture, local)| texture.texel(local.x, local.y))
            .unwrap_or(Vec4::ZERO)
    }

    /// Nearest-filtered sample at a surface-space position
    pub fn sample(&self, position: Vec2) -> Vec4 {
        let p = position.floor();
        self.texel(p.x as i64, p.y as i64)
    }

    /// Read a region into a tightly packed buffer
    pub fn read_region(&self, bounds: Bounds) -> Vec<u8> {
        let channels = self.format().channels();
        if let TextureHandle::Single(texture) = self {
            if bounds.fits_within(texture.size()) {
                return texture.read_region(bounds);
            }
        }
        let mut out = vec![0u8; bounds.pixel_count() * channels];
        for (texture, region) in self.regions(bounds) {
            copy_rect(
                texture.data(),
                texture.width(),
                region.local.origin(),
                &mut out,
                bounds.width,
                region.global.origin() - bounds.origin(),
                region.global.size(),
                channels,
            );
        }
        out
    }
}

/// Owned single or tiled texture
#[derive(Debug)]
pub enum TextureSet {
    Single(Texture),
    Tiled {
        textures: Vec<Texture>,
        grid: TileGrid,
    },
}

impl TextureSet {
    /// Allocate a texture set of `size`, split into tiles of `tile_size`
    ///
    /// Data, when given, is a tightly packed buffer for the whole set.
    pub fn new(
        ctx: &GpuContext,
        format: TextureFormat,
        size: Size,
        tile_size: u32,
        data: Option<&[u8]>,
    ) -> Result<Self, GpuError> {
        if !size.is_valid() {
            return Err(GpuError::InvalidTextureSize {
                width: size.width,
                height: size.height,
            });
        }
        if let Some(data) = data {
            let expected = size.byte_len(format.channels());
            if data.len() != expected {
                return Err(GpuError::DataLength {
                    expected,
                    actual: data.len(),
                });
            }
        }

        let grid = TileGrid::new(size, tile_size);
        if grid.is_single() {
            let texture = ctx.create_texture(format, size.width, size.height, data)?;
            return Ok(TextureSet::Single(texture));
        }

        let mut textures = Vec::with_capacity(grid.tile_count());
        for info in grid.tiles() {
            let tile_data = data.map(|d| extract_region(d, size.width, info.bounds(), format.channels()));
            textures.push(ctx.create_texture(format, info.width, info.height, tile_data.as_deref())?);
        }
        Ok(TextureSet::Tiled { textures, grid })
    }

    pub fn handle(&self) -> TextureHandle<'_> {
        match self {
            TextureSet::Single(texture) => TextureHandle::Single(texture),
            TextureSet::Tiled { textures, grid } => TextureHandle::Tiled {
                textures: textures.iter().collect(),
                grid: *grid,
            },
        }
    }

    pub fn grid(&self) -> TileGrid {
        self.handle().grid()
    }

    pub fn size(&self) -> Size {
        self.grid().size()
    }

    pub fn format(&self) -> TextureFormat {
        self.handle().format()
    }

    /// Device memory held by the set
    pub fn byte_size(&self) -> usize {
        match self {
            TextureSet::Single(texture) => texture.data().len(),
            TextureSet::Tiled { textures, .. } => textures.iter().map(|t| t.data().len()).sum(),
        }
    }

    pub fn read_region(&self, bounds: Bounds) -> Vec<u8> {
        self.handle().read_region(bounds)
    }

    /// Overwrite a region from a tightly packed buffer
    pub fn write_region(&mut self, bounds: Bounds, data: &[u8]) {
        let grid = self.grid();
        upload(&mut self.targets_mut(), &grid, bounds, data);
    }

    /// Device-side copy of `src_bounds` of `src` to `dst_origin` in this set
    pub fn copy_region_from(&mut self, src: &TextureHandle<'_>, src_bounds: Bounds, dst_origin: UVec2) {
        let grid = self.grid();
        blit(src, src_bounds, &mut self.targets_mut(), &grid, dst_origin);
    }

    pub(crate) fn targets_mut(&mut self) -> Vec<&mut Texture> {
        match self {
            TextureSet::Single(texture) => vec![texture],
            TextureSet::Tiled { textures, .. } => textures.iter_mut().collect(),
        }
    }
}

/// Named extra textures visible to a shader through [`super::Fragment::sample`]
#[derive(Debug, Clone, Default)]
pub struct TextureBindings<'a> {
    entries: BTreeMap<String, TextureHandle<'a>>,
}

impl<'a> TextureBindings<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, handle: TextureHandle<'a>) -> Self {
        self.bind(name, handle);
        self
    }

    pub fn bind(&mut self, name: &str, handle: TextureHandle<'a>) {
        self.entries.insert(name.to_string(), handle);
    }

    pub fn get(&self, name: &str) -> Option<&TextureHandle<'a>> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Copy `src_bounds` of a handle into tiled destination textures at `dst_origin`
///
/// `targets` are the destination tile textures in `dst_grid` order. Pieces
/// falling outside the destination are dropped.
pub fn blit(
    src: &TextureHandle<'_>,
    src_bounds: Bounds,
    targets: &mut [&mut Texture],
    dst_grid: &TileGrid,
    dst_origin: UVec2,
) {
    for (texture, piece) in src.regions(src_bounds) {
        let placed = Bounds::new(
            dst_origin.x + (piece.global.x - src_bounds.x),
            dst_origin.y + (piece.global.y - src_bounds.y),
            piece.global.width,
            piece.global.height,
        );
        for dst in dst_grid.intersect(placed) {
            let Some(target) = targets.get_mut(dst.index) else {
                continue;
            };
            let src_region = Bounds::new(
                piece.local.x + (dst.global.x - placed.x),
                piece.local.y + (dst.global.y - placed.y),
                dst.global.width,
                dst.global.height,
            );
            target.copy_from(texture, src_region, dst.local.origin());
        }
    }
}

/// Write a tightly packed buffer covering `bounds` into tiled textures
pub(crate) fn upload(targets: &mut [&mut Texture], grid: &TileGrid, bounds: Bounds, data: &[u8]) {
    for region in grid.intersect(bounds) {
        if let Some(target) = targets.get_mut(region.index) {
            target.write_region_from(region.local, data, bounds.width, region.global.origin() - bounds.origin());
        }
    }
}
