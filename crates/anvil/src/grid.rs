//! Tiling arithmetic shared by layers, mask surfaces and tiled texture sets

use serde::{Deserialize, Serialize};

use crate::types::{Bounds, Size};

/// Public description of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    pub index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TileInfo {
    /// Tile rectangle in surface space
    #[inline]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, self.width, self.height)
    }
}

/// Part of a surface-space region that falls inside one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    /// Tile index in row-major order
    pub index: usize,
    /// Region relative to the tile origin
    pub local: Bounds,
    /// Same region in surface space
    pub global: Bounds,
}

/// Row-major grid of fixed-size tiles covering a surface
///
/// Edge tiles are cropped to the surface. A tile size at least as large as
/// the surface degenerates to a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    size: Size,
    tile_size: u32,
    columns: u32,
    rows: u32,
}

impl TileGrid {
    pub fn new(size: Size, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        Self {
            size,
            tile_size,
            columns: size.width.div_ceil(tile_size),
            rows: size.height.div_ceil(tile_size),
        }
    }

    /// Grid holding the whole surface in one tile
    pub fn single(size: Size) -> Self {
        Self::new(size, size.max_dimension())
    }

    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    #[inline]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    #[inline]
    pub fn is_single(&self) -> bool {
        self.tile_count() == 1
    }

    pub fn tile_info(&self, index: usize) -> Option<TileInfo> {
        if index >= self.tile_count() {
            return None;
        }
        let column = index as u32 % self.columns;
        let row = index as u32 / self.columns;
        let x = column * self.tile_size;
        let y = row * self.tile_size;
        Some(TileInfo {
            index,
            x,
            y,
            width: self.tile_size.min(self.size.width - x),
            height: self.tile_size.min(self.size.height - y),
        })
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileInfo> + '_ {
        (0..self.tile_count()).filter_map(|i| self.tile_info(i))
    }

    /// Index of the tile containing a surface pixel
    pub fn index_at(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let column = x / self.tile_size;
        let row = y / self.tile_size;
        Some((row * self.columns + column) as usize)
    }

    /// Split a region into per-tile pieces
    ///
    /// The region is clipped to the surface first; empty input yields no pieces.
    pub fn intersect(&self, bounds: Bounds) -> Vec<TileRegion> {
        let clipped = bounds.clamp_to(self.size);
        if clipped.is_empty() {
            return Vec::new();
        }

        let col_start = clipped.x / self.tile_size;
        let col_end = (clipped.right() - 1) / self.tile_size;
        let row_start = clipped.y / self.tile_size;
        let row_end = (clipped.bottom() - 1) / self.tile_size;

        let mut regions = Vec::new();
        for row in row_start..=row_end {
            for column in col_start..=col_end {
                let index = (row * self.columns + column) as usize;
                let Some(info) = self.tile_info(index) else {
                    continue;
                };
                let global = info.bounds().intersect(&clipped);
                if global.is_empty() {
                    continue;
                }
                regions.push(TileRegion {
                    index,
                    local: Bounds::new(global.x - info.x, global.y - info.y, global.width, global.height),
                    global,
                });
            }
        }
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = TileGrid::new(Size::new(300, 300), 128);
        assert_eq!(grid.columns(), 3);
        assert_eq!(grid.rows(), 3);
        assert_eq!(grid.tile_count(), 9);
        assert!(!grid.is_single());

        let single = TileGrid::single(Size::new(300, 40));
        assert!(single.is_single());
        assert_eq!(single.tile_info(0).unwrap().bounds(), Bounds::new(0, 0, 300, 40));
    }

    #[test]
    fn test_edge_tile_info() {
        let grid = TileGrid::new(Size::new(150, 150), 128);
        let info = grid.tile_info(3).unwrap();
        assert_eq!(info.bounds(), Bounds::new(128, 128, 22, 22));
        assert!(grid.tile_info(4).is_none());
    }

    #[test]
    fn test_index_at() {
        let grid = TileGrid::new(Size::new(256, 256), 128);
        assert_eq!(grid.index_at(0, 0), Some(0));
        assert_eq!(grid.index_at(130, 5), Some(1));
        assert_eq!(grid.index_at(5, 130), Some(2));
        assert_eq!(grid.index_at(256, 0), None);
    }

    #[test]
    fn test_intersect_spans_tiles() {
        let grid = TileGrid::new(Size::new(256, 256), 128);
        let regions = grid.intersect(Bounds::new(100, 100, 56, 56));
        assert_eq!(regions.len(), 4);
        assert_eq!(regions[0].local, Bounds::new(100, 100, 28, 28));
        assert_eq!(regions[3].index, 3);
        assert_eq!(regions[3].local, Bounds::new(0, 0, 28, 28));
        assert_eq!(regions[3].global, Bounds::new(128, 128, 28, 28));

        let total: usize = regions.iter().map(|r| r.global.pixel_count()).sum();
        assert_eq!(total, 56 * 56);
    }

    #[test]
    fn test_intersect_clips_to_surface() {
        let grid = TileGrid::new(Size::new(10, 10), 4);
        assert!(grid.intersect(Bounds::new(20, 20, 5, 5)).is_empty());
        let regions = grid.intersect(Bounds::new(8, 8, 10, 10));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].global, Bounds::new(8, 8, 2, 2));
    }
}
