//! Shared configuration for anvil
//!
//! This crate provides the single source of truth for device limits, layer
//! tiling, undo history and stroke input settings. Every struct is
//! serde-serializable so hosts can load it from whatever format they use.

use serde::{Deserialize, Serialize};

/// Default maximum texture dimension supported by the device
pub const DEFAULT_MAX_TEXTURE_DIMENSION: u32 = 8192;

/// Default number of undo entries kept per layer
pub const DEFAULT_HISTORY_MAX_ITEMS: usize = 50;

/// Default JPEG quality for the lossy history backend (1..=100)
pub const DEFAULT_LOSSY_QUALITY: u8 = 90;

/// Limits of the rendering device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Largest width or height a single texture may have
    pub max_texture_dimension: u32,
    /// Optional cap on live texture memory in bytes
    pub memory_budget: Option<u64>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            max_texture_dimension: DEFAULT_MAX_TEXTURE_DIMENSION,
            memory_budget: None,
        }
    }
}

/// Tiling configuration for layers and mask surfaces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// Edge length of a tile. `None` keeps the whole canvas in one tile
    /// whenever the device allows it.
    pub tile_size: Option<u32>,
}

/// Storage strategy used for undo snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackendKind {
    /// Lossless PNG compressed buffers in CPU memory
    #[default]
    Compressed,
    /// JPEG color plus lossless alpha plane in CPU memory
    Lossy,
    /// Snapshot kept as textures on the device
    Texture,
}

/// Undo history configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub backend: HistoryBackendKind,
    /// Maximum number of undo entries (values below 1 behave as 1)
    pub max_items: usize,
    /// JPEG quality for [`HistoryBackendKind::Lossy`]
    pub lossy_quality: u8,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackendKind::default(),
            max_items: DEFAULT_HISTORY_MAX_ITEMS,
            lossy_quality: DEFAULT_LOSSY_QUALITY,
        }
    }
}

impl HistoryConfig {
    /// Create a history config for the given backend with default limits
    pub fn with_backend(backend: HistoryBackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Quality clamped into the range accepted by the JPEG encoder
    pub fn clamped_quality(&self) -> u8 {
        self.lossy_quality.clamp(1, 100)
    }
}

/// Coordinate space of incoming pointer samples
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSpace {
    /// Samples are already in layer pixel space (y grows with rows)
    #[default]
    Layer,
    /// Samples are in canvas space with y pointing up
    Canvas,
}

/// Stroke input configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GripConfig {
    pub input_space: InputSpace,
}

/// Aggregate configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnvilConfig {
    pub device: DeviceConfig,
    pub layer: LayerConfig,
    pub history: HistoryConfig,
    pub grip: GripConfig,
}
