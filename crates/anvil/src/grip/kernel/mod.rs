//! Stamp shapes
//!
//! A [`GripKernel`] describes one brush shape by its coverage test. The
//! provided methods snap centers, compute clamped bounds, and run the
//! coverage shaders over a layer or mask restricted to those bounds.

mod disc;
mod square;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::shaders::{CoverageShader, Output, Stamp, U_CENTER, U_COLOR, U_EXTENT, U_FROM, U_OPACITY, U_TO};
use super::types::{GripPoint, GripStrokeStyle};
use crate::gpu::{TextureBindings, Uniforms};
use crate::layer::{Layer, LayerError};
use crate::mask::MaskSurface;
use crate::types::{Bounds, Size};

pub use disc::DiscKernel;
pub use square::SquareKernel;

/// Snap a stamp center to the pixel grid
///
/// Even diameters land on grid lines, odd diameters on pixel centers.
/// Halves round up.
pub fn snap_center(position: Vec2, size: f32) -> Vec2 {
    if size % 2.0 == 0.0 {
        (position + Vec2::splat(0.5)).floor()
    } else {
        position.floor() + Vec2::splat(0.5)
    }
}

/// Integer pixel range covering `[min, max]`, clamped to `size`
///
/// Both ends are inclusive. `None` when nothing of the range is inside.
pub fn clamped_bounds(size: Size, min: Vec2, max: Vec2) -> Option<Bounds> {
    let last_x = size.width as f32 - 1.0;
    let last_y = size.height as f32 - 1.0;
    let x0 = min.x.floor().max(0.0);
    let y0 = min.y.floor().max(0.0);
    let x1 = max.x.ceil().min(last_x);
    let y1 = max.y.ceil().min(last_y);
    if x1 < 0.0 || y1 < 0.0 || x0 > last_x || y0 > last_y || x1 < x0 || y1 < y0 {
        return None;
    }
    Some(Bounds::new(
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32 + 1,
        (y1 - y0) as u32 + 1,
    ))
}

pub trait GripKernel: Send + Sync {
    fn id(&self) -> &'static str;

    /// Reach of the shape from its center line, `None` when it draws nothing
    fn extent(&self, size: f32) -> Option<f32>;

    /// Whether the pixel center `p` lies in a stamp at `center`
    fn point_coverage(&self, p: Vec2, center: Vec2, extent: f32) -> bool;

    /// Whether the pixel center `p` lies in the swept shape from `from` to `to`
    fn segment_coverage(&self, p: Vec2, from: Vec2, to: Vec2, extent: f32) -> bool;

    /// Center passed to the shaders
    fn pre_position_transform(&self, point: &GripPoint) -> Vec2 {
        snap_center(point.position(), point.style.size)
    }

    /// Unclipped footprint of a stamp, anchored at the origin
    fn point_bounds(&self, style: &GripStrokeStyle) -> Bounds {
        let side = (style.size + 2.0).max(0.0).ceil() as u32;
        Bounds::new(0, 0, side, side)
    }

    fn computed_point_bounds(&self, size: Size, point: &GripPoint) -> Option<Bounds> {
        let extent = self.extent(point.style.size)?;
        let center = self.pre_position_transform(point);
        clamped_bounds(size, center - extent, center + extent)
    }

    /// Segments take the style of `to` for both ends
    fn computed_segment_bounds(&self, size: Size, from: &GripPoint, to: &GripPoint) -> Option<Bounds> {
        let extent = self.extent(to.style.size)?;
        let a = self.pre_position_transform(&from.restyled(to.style));
        let b = self.pre_position_transform(to);
        clamped_bounds(size, a.min(b) - extent, a.max(b) + extent)
    }

    /// Paint a stamp straight into the layer
    fn draw_point(&self, layer: &mut Layer, point: &GripPoint) -> Result<Option<Bounds>, LayerError> {
        let Some(extent) = self.extent(point.style.size) else {
            return Ok(None);
        };
        let Some(bounds) = self.computed_point_bounds(layer.size(), point) else {
            return Ok(None);
        };
        let uniforms = Uniforms::new()
            .with(U_CENTER, self.pre_position_transform(point))
            .with(U_EXTENT, extent)
            .with(U_COLOR, point.style.color.rgba())
            .with(U_OPACITY, point.style.clamped_opacity());
        let shader = CoverageShader::new(self, Stamp::Point, Output::Layer);
        layer.apply_effect_with_textures(&shader, &uniforms, &TextureBindings::new(), Some(bounds))?;
        Ok(Some(bounds))
    }

    /// Paint the swept shape straight into the layer
    fn draw_segment(&self, layer: &mut Layer, from: &GripPoint, to: &GripPoint) -> Result<Option<Bounds>, LayerError> {
        let Some(extent) = self.extent(to.style.size) else {
            return Ok(None);
        };
        let Some(bounds) = self.computed_segment_bounds(layer.size(), from, to) else {
            return Ok(None);
        };
        let uniforms = Uniforms::new()
            .with(U_FROM, self.pre_position_transform(&from.restyled(to.style)))
            .with(U_TO, self.pre_position_transform(to))
            .with(U_EXTENT, extent)
            .with(U_COLOR, to.style.color.rgba())
            .with(U_OPACITY, to.style.clamped_opacity());
        let shader = CoverageShader::new(self, Stamp::Segment, Output::Layer);
        layer.apply_effect_with_textures(&shader, &uniforms, &TextureBindings::new(), Some(bounds))?;
        Ok(Some(bounds))
    }

    /// Max-combine a stamp into the mask, returning the pixels it touched
    fn stamp_mask_point(
        &self,
        mask: &mut MaskSurface,
        layer_size: Size,
        point: &GripPoint,
    ) -> Result<Option<Bounds>, LayerError> {
        let Some(extent) = self.extent(point.style.size) else {
            return Ok(None);
        };
        let Some(bounds) = self.computed_point_bounds(layer_size, point) else {
            return Ok(None);
        };
        let uniforms = Uniforms::new()
            .with(U_CENTER, self.pre_position_transform(point))
            .with(U_EXTENT, extent);
        let shader = CoverageShader::new(self, Stamp::Point, Output::Mask);
        mask.apply_effect(&shader, &uniforms, Some(bounds))?;
        Ok(Some(bounds))
    }

    /// Max-combine the swept shape into the mask, returning the pixels it touched
    fn stamp_mask_segment(
        &self,
        mask: &mut MaskSurface,
        layer_size: Size,
        from: &GripPoint,
        to: &GripPoint,
    ) -> Result<Option<Bounds>, LayerError> {
        let Some(extent) = self.extent(to.style.size) else {
            return Ok(None);
        };
        let Some(bounds) = self.computed_segment_bounds(layer_size, from, to) else {
            return Ok(None);
        };
        let uniforms = Uniforms::new()
            .with(U_FROM, self.pre_position_transform(&from.restyled(to.style)))
            .with(U_TO, self.pre_position_transform(to))
            .with(U_EXTENT, extent);
        let shader = CoverageShader::new(self, Stamp::Segment, Output::Mask);
        mask.apply_effect(&shader, &uniforms, Some(bounds))?;
        Ok(Some(bounds))
    }
}

/// Built-in kernels by key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    #[default]
    Disc,
    Square,
}

impl KernelKind {
    pub fn create(self) -> Box<dyn GripKernel> {
        match self {
            KernelKind::Disc => Box::new(DiscKernel),
            KernelKind::Square => Box::new(SquareKernel),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grip::types::GripColor;

    #[test]
    fn test_snap_parity() {
        let p = Vec2::new(10.3, 7.9);
        assert_eq!(snap_center(p, 4.0), Vec2::new(10.0, 8.0));
        assert_eq!(snap_center(p, 5.0), Vec2::new(10.5, 7.5));
        // halves round up
        assert_eq!(snap_center(Vec2::new(2.5, -1.5), 2.0), Vec2::new(3.0, -1.0));
    }

    #[test]
    fn test_clamped_bounds_inclusive() {
        let size = Size::new(10, 10);
        assert_eq!(
            clamped_bounds(size, Vec2::new(2.5, 3.0), Vec2::new(4.5, 5.0)),
            Some(Bounds::new(2, 3, 4, 3))
        );
        assert_eq!(
            clamped_bounds(size, Vec2::new(-3.0, -3.0), Vec2::new(1.0, 1.0)),
            Some(Bounds::new(0, 0, 2, 2))
        );
        assert_eq!(
            clamped_bounds(size, Vec2::new(8.0, 8.0), Vec2::new(20.0, 20.0)),
            Some(Bounds::new(8, 8, 2, 2))
        );
        assert_eq!(clamped_bounds(size, Vec2::new(11.0, 0.0), Vec2::new(12.0, 1.0)), None);
        assert_eq!(clamped_bounds(size, Vec2::new(-5.0, 0.0), Vec2::new(-1.5, 1.0)), None);
    }

    #[test]
    fn test_point_bounds_unclipped() {
        let style = GripStrokeStyle::new(GripColor::BLACK, 5.0);
        assert_eq!(DiscKernel.point_bounds(&style), Bounds::new(0, 0, 7, 7));
    }

    #[test]
    fn test_kernel_factory() {
        assert_eq!(KernelKind::Disc.create().id(), "disc");
        assert_eq!(KernelKind::Square.create().id(), "square");
        let kind: KernelKind = serde_json::from_str("\"square\"").unwrap();
        assert_eq!(kind, KernelKind::Square);
    }
}
