//! Anvil raster paint engine
//!
//! This crate provides the core of a raster paint surface:
//! - [`gpu`] - Software render device: textures, fragment shaders and passes
//! - [`grid`] - Tiling arithmetic shared by every tiled surface
//! - [`tile`] - Double-buffered tile textures
//! - [`layer`] - Tiled RGBA layer with pixel IO, scoped effects, resize and events
//! - [`mask`] - Single-channel coverage surface used while stroking
//! - [`history`] - Pluggable undo/redo with compressed, lossy and texture backends
//! - [`grip`] - Stroke input: kernels, instruments and the session orchestrator

pub mod constants;
pub mod gpu;
pub mod grid;
pub mod grip;
pub mod history;
pub mod layer;
pub mod mask;
pub mod pixels;
pub mod tile;
pub mod types;

pub use constants::*;
pub use gpu::{GpuContext, GpuError, Texture, TextureFormat, TextureHandle, TextureSet, Uniforms};
pub use grid::*;
pub use grip::*;
pub use history::*;
pub use layer::*;
pub use mask::*;
pub use types::*;

pub use anvil_config as config;
