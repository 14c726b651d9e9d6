//! Helpers for tightly packed row-major pixel buffers

use glam::UVec2;

use crate::types::{Bounds, Size};

/// Copy a `size` rectangle from one packed buffer into another
///
/// Both buffers use `channels` bytes per texel and are addressed in their own
/// row strides. Callers guarantee both rectangles are in range.
#[allow(clippy::too_many_arguments)]
pub fn copy_rect(
    src: &[u8],
    src_width: u32,
    src_origin: UVec2,
    dst: &mut [u8],
    dst_width: u32,
    dst_origin: UVec2,
    size: Size,
    channels: usize,
) {
    let row_len = size.width as usize * channels;
    if row_len == 0 {
        return;
    }
    for row in 0..size.height {
        let s = ((src_origin.y + row) as usize * src_width as usize + src_origin.x as usize) * channels;
        let d = ((dst_origin.y + row) as usize * dst_width as usize + dst_origin.x as usize) * channels;
        dst[d..d + row_len].copy_from_slice(&src[s..s + row_len]);
    }
}

/// Extract a region of a packed buffer into a new tightly packed buffer
pub fn extract_region(src: &[u8], src_width: u32, region: Bounds, channels: usize) -> Vec<u8> {
    let mut out = vec![0u8; region.pixel_count() * channels];
    copy_rect(
        src,
        src_width,
        region.origin(),
        &mut out,
        region.width,
        UVec2::ZERO,
        region.size(),
        channels,
    );
    out
}

/// Return a copy of the buffer with its row order reversed
pub fn flip_rows(buffer: &[u8], size: Size, channels: usize) -> Vec<u8> {
    let row_len = size.width as usize * channels;
    if row_len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(buffer.len());
    for row in buffer.chunks_exact(row_len).rev() {
        out.extend_from_slice(row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_region() {
        // 3x2 single channel
        let src = [0, 1, 2, 3, 4, 5];
        let out = extract_region(&src, 3, Bounds::new(1, 0, 2, 2), 1);
        assert_eq!(out, vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_copy_rect_offsets() {
        let src = [9u8; 4];
        let mut dst = [0u8; 9];
        copy_rect(&src, 2, UVec2::ZERO, &mut dst, 3, UVec2::new(1, 1), Size::new(2, 2), 1);
        assert_eq!(dst, [0, 0, 0, 0, 9, 9, 0, 9, 9]);
    }

    #[test]
    fn test_flip_rows() {
        let src = [1, 1, 2, 2, 3, 3];
        assert_eq!(flip_rows(&src, Size::new(2, 3), 1), vec![3, 3, 2, 2, 1, 1]);
    }
}
