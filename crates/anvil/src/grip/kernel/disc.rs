use glam::Vec2;

use super::GripKernel;

/// Solid disc of radius `size / 2`
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscKernel;

impl GripKernel for DiscKernel {
    fn id(&self) -> &'static str {
        "disc"
    }

    fn extent(&self, size: f32) -> Option<f32> {
        let radius = size / 2.0;
        (radius > 0.0).then_some(radius)
    }

    fn point_coverage(&self, p: Vec2, center: Vec2, extent: f32) -> bool {
        p.distance(center) <= extent
    }

    /// Capsule around the segment
    fn segment_coverage(&self, p: Vec2, from: Vec2, to: Vec2, extent: f32) -> bool {
        let ab = to - from;
        let denom = ab.dot(ab);
        let t = if denom > 0.0 {
            ((p - from).dot(ab) / denom).clamp(0.0, 1.0)
        } else {
            0.0
        };
        p.distance(from + ab * t) <= extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;
    use crate::grip::types::{GripColor, GripPoint, GripStrokeStyle};
    use crate::layer::{Layer, LayerInit};
    use crate::mask::MaskSurface;
    use crate::types::{Bounds, Size};

    fn style(size: f32) -> GripStrokeStyle {
        GripStrokeStyle::new(GripColor::new(255.0, 0.0, 0.0, 255.0), size)
    }

    #[test]
    fn test_extent() {
        assert_eq!(DiscKernel.extent(5.0), Some(2.5));
        assert_eq!(DiscKernel.extent(0.0), None);
        assert_eq!(DiscKernel.extent(-2.0), None);
    }

    #[test]
    fn test_coverage() {
        let center = Vec2::new(5.0, 5.0);
        assert!(DiscKernel.point_coverage(Vec2::new(6.5, 5.5), center, 2.0));
        assert!(!DiscKernel.point_coverage(Vec2::new(6.5, 6.5), center, 2.0));

        let (a, b) = (Vec2::new(2.0, 2.0), Vec2::new(10.0, 2.0));
        assert!(DiscKernel.segment_coverage(Vec2::new(6.5, 3.5), a, b, 2.0));
        assert!(!DiscKernel.segment_coverage(Vec2::new(11.5, 3.5), a, b, 2.0));
        // zero-length segments fall back to the disc around `from`
        assert!(DiscKernel.segment_coverage(Vec2::new(2.5, 2.5), a, a, 1.0));
    }

    #[test]
    fn test_draw_point_scoped() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(16, 16)).unwrap();
        let point = GripPoint::new(8.0, 8.0, style(4.0));

        let bounds = DiscKernel.draw_point(&mut layer, &point).unwrap();
        assert_eq!(bounds, Some(Bounds::new(6, 6, 5, 5)));

        let pixels = layer.read_pixels(None).unwrap();
        let at = |x: usize, y: usize| &pixels[(y * 16 + x) * 4..(y * 16 + x) * 4 + 4];
        assert_eq!(at(7, 7), &[255, 0, 0, 255]);
        assert_eq!(at(9, 9), &[0, 0, 0, 0]);
        assert_eq!(at(0, 0), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_out_of_layer_draws_nothing() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(8, 8)).unwrap();
        let point = GripPoint::new(-20.0, 3.0, style(4.0));
        assert_eq!(DiscKernel.draw_point(&mut layer, &point).unwrap(), None);
        assert!(layer.read_pixels(None).unwrap().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_mask_segment_matches_bounds() {
        let ctx = GpuContext::new();
        let mut mask = MaskSurface::new(&ctx, Size::new(20, 10), None).unwrap();
        let from = GripPoint::new(3.0, 5.0, style(2.0));
        let to = GripPoint::new(15.0, 5.0, style(2.0));

        let bounds = DiscKernel
            .stamp_mask_segment(&mut mask, Size::new(20, 10), &from, &to)
            .unwrap()
            .unwrap();
        assert_eq!(bounds, Bounds::new(2, 4, 15, 3));

        let pixels = mask.read_pixels().unwrap();
        for y in 0..10u32 {
            for x in 0..20u32 {
                let covered = pixels[(y * 20 + x) as usize] == 255;
                if covered {
                    assert!(x >= bounds.x && x < bounds.right() && y >= bounds.y && y < bounds.bottom());
                }
            }
        }
        assert_eq!(pixels[(4 * 20 + 9) as usize], 255);
        assert_eq!(pixels[(2 * 20 + 9) as usize], 0);
    }
}
