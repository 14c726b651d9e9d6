//! Stroke fragment programs
//!
//! Coverage is a hard in/out test evaluated at pixel centers in layer space,
//! so tiles and masks agree on which pixels a stamp touches.

use glam::Vec4;

use super::kernel::GripKernel;
use crate::gpu::{Fragment, FragmentShader, mix};

pub const U_CENTER: &str = "u_center";
pub const U_FROM: &str = "u_from";
pub const U_TO: &str = "u_to";
/// Kernel reach from the center line (disc radius, square half side)
pub const U_EXTENT: &str = "u_extent";
pub const U_COLOR: &str = "u_color";
pub const U_OPACITY: &str = "u_opacity";
pub const U_BASE: &str = "u_base";
pub const U_MASK: &str = "u_mask";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stamp {
    Point,
    Segment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Output {
    /// `mix(src, u_color, u_opacity * inside)`
    Layer,
    /// `max(src.r, inside)`
    Mask,
}

/// Kernel coverage drawn into a layer or a mask
pub(crate) struct CoverageShader<'a, K: ?Sized> {
    kernel: &'a K,
    stamp: Stamp,
    output: Output,
}

impl<'a, K: GripKernel + ?Sized> CoverageShader<'a, K> {
    pub(crate) fn new(kernel: &'a K, stamp: Stamp, output: Output) -> Self {
        Self { kernel, stamp, output }
    }
}

impl<K: GripKernel + ?Sized> FragmentShader for CoverageShader<'_, K> {
    fn label(&self) -> &str {
        match (self.stamp, self.output) {
            (Stamp::Point, Output::Layer) => "grip_point",
            (Stamp::Segment, Output::Layer) => "grip_segment",
            (Stamp::Point, Output::Mask) => "grip_mask_point",
            (Stamp::Segment, Output::Mask) => "grip_mask_segment",
        }
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let p = frag.position();
        let extent = frag.float(U_EXTENT);
        let covered = match self.stamp {
            Stamp::Point => self.kernel.point_coverage(p, frag.vec2(U_CENTER), extent),
            Stamp::Segment => self
                .kernel
                .segment_coverage(p, frag.vec2(U_FROM), frag.vec2(U_TO), extent),
        };
        let inside = if covered { 1.0 } else { 0.0 };
        let src = frag.src();
        match self.output {
            Output::Layer => mix(src, frag.vec4(U_COLOR), frag.float(U_OPACITY).clamp(0.0, 1.0) * inside),
            Output::Mask => Vec4::new(src.x.max(inside), 0.0, 0.0, 1.0),
        }
    }
}

/// `dest = mix(base, u_color, u_opacity * mask.r)`
///
/// Always reads the frozen pre-stroke base, never the layer itself, so
/// re-merging the same mask gives the same pixels.
pub(crate) struct MergeShader;

impl FragmentShader for MergeShader {
    fn label(&self) -> &str {
        "grip_merge"
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        let p = frag.position();
        let base = frag.sample(U_BASE, p);
        let coverage = frag.sample(U_MASK, p).x;
        mix(base, frag.vec4(U_COLOR), frag.float(U_OPACITY) * coverage)
    }
}

/// Zero coverage
pub(crate) struct ClearMaskShader;

impl FragmentShader for ClearMaskShader {
    fn label(&self) -> &str {
        "grip_clear_mask"
    }

    fn shade(&self, _frag: &Fragment<'_>) -> Vec4 {
        Vec4::new(0.0, 0.0, 0.0, 1.0)
    }
}
