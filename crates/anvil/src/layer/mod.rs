//! Tiled RGBA8 layer
//!
//! A [`Layer`] is a grid of double-buffered [`Tile`]s under one logical size.
//! It provides pixel IO, scoped shader effects, texture copy/patch helpers,
//! resizing, an event channel and an optional undo history.

mod effects;
mod events;
mod history;
mod pixels;
mod resize;
mod textures;

use std::sync::atomic::{AtomicU64, Ordering};

use anvil_config::LayerConfig;
use tracing::debug;

use crate::gpu::{GpuContext, GpuError, TextureFormat, TextureHandle};
use crate::grid::{TileGrid, TileInfo};
use crate::history::{HistoryController, HistoryError};
use crate::tile::{Tile, allocate_tiles, front_handle};
use crate::types::{Bounds, Size};

pub use events::{HistoryDirection, LayerEvent, LayerEventKind, LayerListener, ListenerId};

use events::EventBus;

/// Error type for layer and surface operations
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("Surface has been disposed")]
    Disposed,
    #[error("Invalid size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },
    #[error("Bounds {bounds:?} exceed surface size {size:?}")]
    OutOfBounds { bounds: Bounds, size: Size },
    #[error("Size mismatch: expected {expected:?}, got {actual:?}")]
    SizeMismatch { expected: Size, actual: Size },
    #[error("Resizing effects need a single-tile layer before and after ({tiles} tiles)")]
    TiledResizeUnsupported { tiles: usize },
    #[error("No tile at index {0}")]
    NoSuchTile(usize),
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    #[error("History error: {0}")]
    History(#[from] HistoryError),
}

/// Process-unique layer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u64);

impl LayerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Construction parameters for a [`Layer`]
#[derive(Debug, Clone, Copy)]
pub struct LayerInit<'a> {
    pub width: u32,
    pub height: u32,
    /// Initial RGBA8 contents, row-major, `width * height * 4` bytes
    pub data: Option<&'a [u8]>,
    /// Tile edge length; `None` keeps one tile whenever the device allows it
    pub tile_size: Option<u32>,
}

impl<'a> LayerInit<'a> {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: None,
            tile_size: None,
        }
    }

    pub fn with_data(mut self, data: &'a [u8]) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = Some(tile_size);
        self
    }
}

/// Tile grid for a surface, capped by the device's maximum texture size
pub(crate) fn tile_grid_for(ctx: &GpuContext, size: Size, tile_size: Option<u32>) -> TileGrid {
    let tile_size = tile_size
        .unwrap_or(size.max_dimension())
        .min(ctx.max_texture_dimension());
    TileGrid::new(size, tile_size)
}

/// GPU-backed RGBA8 pixel buffer split into tiles
pub struct Layer {
    id: LayerId,
    ctx: GpuContext,
    size: Size,
    tile_size: Option<u32>,
    grid: TileGrid,
    tiles: Vec<Tile>,
    history: Option<Box<dyn HistoryController>>,
    events: EventBus,
    disposed: bool,
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("size", &self.size)
            .field("tiles", &self.tiles.len())
            .field("history", &self.history.as_ref().map(|h| h.backend_name()))
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Layer {
    /// Create a layer, optionally initialized from RGBA8 data
    pub fn new(ctx: &GpuContext, init: LayerInit<'_>) -> Result<Self, LayerError> {
        let size = Size::new(init.width, init.height);
        if !size.is_valid() {
            return Err(LayerError::InvalidSize {
                width: size.width,
                height: size.height,
            });
        }
        if let Some(data) = init.data {
            let expected = size.byte_len(crate::RGBA_CHANNELS);
            if data.len() != expected {
                return Err(LayerError::BufferSizeMismatch {
                    expected,
                    actual: data.len(),
                });
            }
        }

        let grid = tile_grid_for(ctx, size, init.tile_size);
        let tiles = allocate_tiles(ctx, &grid, TextureFormat::Rgba8Unorm, init.data)?;
        let id = LayerId::next();
        debug!(
            "Layer {} created: {}x{} in {} tiles",
            id.get(),
            size.width,
            size.height,
            tiles.len()
        );

        Ok(Self {
            id,
            ctx: ctx.clone(),
            size,
            tile_size: init.tile_size,
            grid,
            tiles,
            history: None,
            events: EventBus::default(),
            disposed: false,
        })
    }

    /// Create an empty layer using the tiling from `config`
    pub fn from_config(
        ctx: &GpuContext,
        width: u32,
        height: u32,
        config: &LayerConfig,
    ) -> Result<Self, LayerError> {
        Self::new(
            ctx,
            LayerInit {
                width,
                height,
                data: None,
                tile_size: config.tile_size,
            },
        )
    }

    #[inline]
    pub fn id(&self) -> LayerId {
        self.id
    }

    #[inline]
    pub fn context(&self) -> &GpuContext {
        &self.ctx
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
    pub fn size(&self) -> Size {
        self.size
    }

    #[inline]
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Effective tile edge length
    #[inline]
    pub fn tile_size(&self) -> u32 {
        self.grid.tile_size()
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_tiled(&self) -> bool {
        self.tiles.len() > 1
    }

    /// Description of every tile in row-major order
    pub fn tiles(&self) -> Vec<TileInfo> {
        self.tiles.iter().map(Tile::info).collect()
    }

    pub fn tile(&self, index: usize) -> Option<&Tile> {
        self.tiles.get(index)
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Release every texture, the history and all listeners
    ///
    /// Disposing twice is a no-op; every other call fails afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.tiles.clear();
        if let Some(mut history) = self.history.take() {
            history.clear();
        }
        self.events.clear();
        self.disposed = true;
        debug!("Layer {} disposed", self.id.get());
    }

    #[inline]
    pub(crate) fn ensure_alive(&self) -> Result<(), LayerError> {
        if self.disposed {
            return Err(LayerError::Disposed);
        }
        Ok(())
    }

    /// Resolve optional bounds to a region that must lie inside the layer
    pub(crate) fn checked_bounds(&self, bounds: Option<Bounds>) -> Result<Bounds, LayerError> {
        let bounds = bounds.unwrap_or(Bounds::full(self.size));
        if !bounds.fits_within(self.size) {
            return Err(LayerError::OutOfBounds {
                bounds,
                size: self.size,
            });
        }
        Ok(bounds)
    }

    pub(crate) fn front_handle(&self) -> TextureHandle<'_> {
        front_handle(&self.tiles, &self.grid)
    }

    /// Swap in freshly allocated tiles and announce the new geometry
    pub(crate) fn replace_tiles(&mut self, size: Size, grid: TileGrid, tiles: Vec<Tile>) {
        self.size = size;
        self.grid = grid;
        self.tiles = tiles;
        debug!(
            "Layer {} resized: {}x{} in {} tiles",
            self.id.get(),
            size.width,
            size.height,
            self.tiles.len()
        );
        let event = LayerEvent::Resized {
            size,
            tiles: self.tiles(),
        };
        self.emit(&event);
    }
}

impl Drop for Layer {
    fn drop(&mut self) {
        self.dispose();
    }
}
