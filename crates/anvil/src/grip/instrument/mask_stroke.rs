use tracing::{debug, trace};

use super::{GripInstrument, IncrementalBase, merge, prepare_mask};
use crate::grip::kernel::GripKernel;
use crate::grip::types::GripPoint;
use crate::history::PushOptions;
use crate::layer::{Layer, LayerError};
use crate::mask::MaskSurface;
use crate::types::Bounds;

/// Accumulates coverage in a mask so a stroke never darkens itself
///
/// Every sample max-combines into the mask, then the union of everything
/// stamped so far is re-merged over the frozen pre-stroke base. The mask is
/// kept between strokes while the layer size stays the same.
#[derive(Default)]
pub struct MaskStrokeInstrument {
    mask: Option<MaskSurface>,
    base: Option<IncrementalBase>,
    stroke_bounds: Option<Bounds>,
}

impl MaskStrokeInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scratch mask, if one has been allocated
    pub fn mask(&self) -> Option<&MaskSurface> {
        self.mask.as_ref()
    }

    /// Cumulative bounds of the stroke in progress
    pub fn stroke_bounds(&self) -> Option<Bounds> {
        self.stroke_bounds
    }

    fn begin(&mut self, layer: &Layer) -> Result<(), LayerError> {
        prepare_mask(layer, &mut self.mask)?;
        self.base = Some(IncrementalBase::new(layer)?);
        self.stroke_bounds = None;
        Ok(())
    }

    fn stamp(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        prev: Option<&GripPoint>,
    ) -> Result<(), LayerError> {
        if self.base.is_none() {
            self.begin(layer)?;
        }
        let (Some(mask), Some(base)) = (self.mask.as_mut(), self.base.as_mut()) else {
            return Ok(());
        };

        let size = layer.size();
        let mut touched = None;
        if let Some(prev) = prev {
            touched = kernel.stamp_mask_segment(mask, size, prev, point)?;
        }
        touched = Bounds::union_opt(touched, kernel.stamp_mask_point(mask, size, point)?);
        self.stroke_bounds = Bounds::union_opt(self.stroke_bounds, touched);

        let Some(bounds) = self.stroke_bounds else {
            return Ok(());
        };
        base.ensure(layer, bounds)?;
        merge(layer, base, mask, &point.style, bounds)?;
        trace!("mask stroke merged {:?}", bounds);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), LayerError> {
        self.base = None;
        self.stroke_bounds = None;
        if let Some(mask) = self.mask.as_mut() {
            mask.clear(0)?;
        }
        Ok(())
    }
}

impl GripInstrument for MaskStrokeInstrument {
    fn id(&self) -> &'static str {
        "mask-stroke"
    }

    fn start(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        _options: &PushOptions,
    ) -> Result<(), LayerError> {
        self.begin(layer)?;
        self.stamp(layer, kernel, point, None)
    }

    fn add_point(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        prev: &GripPoint,
        _options: &PushOptions,
    ) -> Result<(), LayerError> {
        self.stamp(layer, kernel, point, Some(prev))
    }

    fn end(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        prev: &GripPoint,
        options: &PushOptions,
    ) -> Result<(), LayerError> {
        self.stamp(layer, kernel, point, Some(prev))?;
        if let (Some(base), Some(bounds)) = (self.base.as_ref(), self.stroke_bounds) {
            let committed = layer.commit_history_from_texture(&base.texture().handle(), bounds, options)?;
            debug!("mask stroke on layer {} ended: {:?} (history: {})", layer.id().get(), bounds, committed);
        }
        self.finish()
    }

    fn cancel(&mut self) {
        self.base = None;
        self.stroke_bounds = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistoryBackendKind;
    use crate::gpu::GpuContext;
    use crate::grip::kernel::DiscKernel;
    use crate::grip::types::{GripColor, GripStrokeStyle};
    use crate::layer::LayerInit;

    fn style(opacity: f32) -> GripStrokeStyle {
        GripStrokeStyle::new(GripColor::BLACK, 4.0).with_opacity(opacity)
    }

    #[test]
    fn test_overlap_does_not_accumulate() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(16, 16)).unwrap();
        let options = PushOptions::default();
        let a = GripPoint::new(6.0, 6.0, style(0.5));
        let b = GripPoint::new(8.0, 6.0, style(0.5));
        let c = GripPoint::new(6.0, 6.0, style(0.5));

        let mut instrument = MaskStrokeInstrument::new();
        instrument.start(&mut layer, &DiscKernel, &a, &options).unwrap();
        instrument.add_point(&mut layer, &DiscKernel, &b, &a, &options).unwrap();
        instrument.end(&mut layer, &DiscKernel, &c, &b, &options).unwrap();

        let pixels = layer.read_pixels(None).unwrap();
        assert!(pixels.chunks_exact(4).all(|px| px[3] == 0 || px[3] == 128));
        assert_eq!(pixels[(6 * 16 + 6) * 4 + 3], 128);
        assert!(instrument.stroke_bounds().is_none());
        assert!(instrument.mask().unwrap().read_pixels().unwrap().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_stroke_is_one_history_entry() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(16, 16).with_tile_size(8)).unwrap();
        layer.clear([255, 255, 255, 255]).unwrap();
        layer.set_history_backend(HistoryBackendKind::Compressed, 8).unwrap();
        let before = layer.read_pixels(None).unwrap();

        let options = PushOptions::default();
        let a = GripPoint::new(3.0, 3.0, style(1.0));
        let b = GripPoint::new(12.0, 9.0, style(1.0));
        let mut instrument = MaskStrokeInstrument::new();
        instrument.start(&mut layer, &DiscKernel, &a, &options).unwrap();
        instrument.end(&mut layer, &DiscKernel, &b, &a, &options).unwrap();

        assert_ne!(layer.read_pixels(None).unwrap(), before);
        assert_eq!(layer.history().unwrap().undo_len(), 1);
        layer.undo().unwrap();
        assert_eq!(layer.read_pixels(None).unwrap(), before);
    }

    #[test]
    fn test_mask_reused_for_same_size() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(8, 8)).unwrap();
        let options = PushOptions::silent();
        let point = GripPoint::new(4.0, 4.0, style(1.0));
        let mut instrument = MaskStrokeInstrument::new();

        instrument.start(&mut layer, &DiscKernel, &point, &options).unwrap();
        instrument.end(&mut layer, &DiscKernel, &point, &point, &options).unwrap();
        let live = ctx.stats().live_textures;

        instrument.start(&mut layer, &DiscKernel, &point, &options).unwrap();
        instrument.end(&mut layer, &DiscKernel, &point, &point, &options).unwrap();
        assert_eq!(ctx.stats().live_textures, live);
    }

    #[test]
    fn test_add_point_without_start_begins() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(8, 8)).unwrap();
        let options = PushOptions::default();
        let a = GripPoint::new(2.0, 2.0, style(1.0));
        let b = GripPoint::new(5.0, 2.0, style(1.0));

        let mut instrument = MaskStrokeInstrument::new();
        instrument.add_point(&mut layer, &DiscKernel, &b, &a, &options).unwrap();
        assert!(instrument.stroke_bounds().is_some());
        assert_eq!(layer.read_pixels(Some(Bounds::new(3, 2, 1, 1))).unwrap()[3], 255);
    }
}
