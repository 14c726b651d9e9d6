/// Bytes per RGBA8 texel.
pub const RGBA_CHANNELS: usize = 4;

/// Bytes per R8 texel.
pub const MASK_CHANNELS: usize = 1;

/// Threshold below which a slab test treats a segment axis as degenerate.
pub const SEGMENT_AXIS_EPSILON: f32 = 1e-6;

/// Uniform holding the global origin of the tile being shaded.
pub const U_ORIGIN: &str = "u_origin";

/// Uniform holding the size of the tile being shaded.
pub const U_TILE_SIZE: &str = "u_tile_size";

/// Uniform holding the logical size of the whole layer.
pub const U_LAYER_SIZE: &str = "u_layer_size";

/// Uniform holding the source size for passes that change texture size.
pub const U_SRC_SIZE: &str = "u_src_size";
