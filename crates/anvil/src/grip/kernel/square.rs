use glam::Vec2;

use super::GripKernel;
use crate::constants::SEGMENT_AXIS_EPSILON;

/// Axis-aligned square of side `size`
///
/// The half side is `(size - 1) / 2`, so a size 1 square covers exactly the
/// pixel it is centered on.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareKernel;

impl GripKernel for SquareKernel {
    fn id(&self) -> &'static str {
        "square"
    }

    fn extent(&self, size: f32) -> Option<f32> {
        let half = (size - 1.0) / 2.0;
        (half >= 0.0).then_some(half)
    }

    fn point_coverage(&self, p: Vec2, center: Vec2, extent: f32) -> bool {
        (p - center).abs().max_element() <= extent
    }

    /// Slab test of the square swept along the segment
    fn segment_coverage(&self, p: Vec2, from: Vec2, to: Vec2, extent: f32) -> bool {
        let d = to - from;
        if d.length() <= 0.0 {
            return self.point_coverage(p, from, extent);
        }

        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;
        for axis in 0..2 {
            let (pa, fa, da) = (p[axis], from[axis], d[axis]);
            if da.abs() < SEGMENT_AXIS_EPSILON {
                if (pa - fa).abs() > extent {
                    return false;
                }
                continue;
            }
            let mut t0 = (pa - extent - fa) / da;
            let mut t1 = (pa + extent - fa) / da;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
        }
        t_min <= t_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::GpuContext;
    use crate::grip::types::{GripColor, GripPoint, GripStrokeStyle};
    use crate::layer::{Layer, LayerInit};
    use crate::types::Bounds;

    #[test]
    fn test_extent() {
        assert_eq!(SquareKernel.extent(5.0), Some(2.0));
        assert_eq!(SquareKernel.extent(1.0), Some(0.0));
        assert_eq!(SquareKernel.extent(0.5), None);
    }

    #[test]
    fn test_point_coverage() {
        let center = Vec2::new(4.5, 4.5);
        assert!(SquareKernel.point_coverage(Vec2::new(6.5, 2.5), center, 2.0));
        assert!(!SquareKernel.point_coverage(Vec2::new(7.5, 4.5), center, 2.0));
    }

    #[test]
    fn test_segment_slabs() {
        let from = Vec2::new(2.5, 2.5);
        let to = Vec2::new(8.5, 2.5);
        // horizontal stroke: the y axis is degenerate
        assert!(SquareKernel.segment_coverage(Vec2::new(5.5, 3.5), from, to, 1.0));
        assert!(!SquareKernel.segment_coverage(Vec2::new(5.5, 4.5), from, to, 1.0));
        assert!(SquareKernel.segment_coverage(Vec2::new(9.5, 2.5), from, to, 1.0));
        assert!(!SquareKernel.segment_coverage(Vec2::new(10.5, 2.5), from, to, 1.0));

        // diagonal stroke sweeps the corners
        let to = Vec2::new(8.5, 8.5);
        assert!(SquareKernel.segment_coverage(Vec2::new(5.5, 4.5), from, to, 1.0));
        assert!(!SquareKernel.segment_coverage(Vec2::new(8.5, 2.5), from, to, 1.0));

        // zero length
        assert!(SquareKernel.segment_coverage(Vec2::new(3.5, 3.5), from, from, 1.0));
        assert!(!SquareKernel.segment_coverage(Vec2::new(4.5, 3.5), from, from, 1.0));
    }

    #[test]
    fn test_size_one_covers_single_pixel() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(4, 4)).unwrap();
        let point = GripPoint::new(1.2, 2.7, GripStrokeStyle::new(GripColor::BLACK, 1.0));

        SquareKernel.draw_point(&mut layer, &point).unwrap();
        let pixels = layer.read_pixels(None).unwrap();
        let covered: Vec<usize> = pixels
            .chunks_exact(4)
            .enumerate()
            .filter(|(_, px)| px[3] == 255)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(covered, vec![2 * 4 + 1]);
    }

    #[test]
    fn test_segment_bounds_use_snapped_ends() {
        let ctx = GpuContext::new();
        let layer = Layer::new(&ctx, LayerInit::new(32, 32)).unwrap();
        let style = GripStrokeStyle::new(GripColor::BLACK, 3.0);
        let from = GripPoint::new(4.2, 4.2, style);
        let to = GripPoint::new(10.9, 6.1, style);
        // centers snap to (4.5, 4.5) and (10.5, 6.5), extent 1, ends rounded outward
        assert_eq!(
            SquareKernel.computed_segment_bounds(layer.size(), &from, &to),
            Some(Bounds::new(3, 3, 10, 6))
        );
    }
}
