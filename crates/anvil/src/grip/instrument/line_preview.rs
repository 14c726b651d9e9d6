use tracing::{debug, trace};

use super::{GripInstrument, IncrementalBase, merge, prepare_mask};
use crate::gpu::Uniforms;
use crate::grip::kernel::GripKernel;
use crate::grip::shaders::ClearMaskShader;
use crate::grip::types::GripPoint;
use crate::history::PushOptions;
use crate::layer::{Layer, LayerError};
use crate::mask::MaskSurface;
use crate::types::Bounds;

/// Live straight line from the first sample to the latest one
///
/// Each update wipes the previous segment from the mask, stamps the new one
/// and re-merges the union of both regions, so pixels the line no longer
/// covers fall back to the base.
#[derive(Default)]
pub struct LinePreviewInstrument {
    mask: Option<MaskSurface>,
    base: Option<IncrementalBase>,
    start_point: Option<GripPoint>,
    last_bounds: Option<Bounds>,
}

impl LinePreviewInstrument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds of the segment currently shown
    pub fn last_bounds(&self) -> Option<Bounds> {
        self.last_bounds
    }

    fn begin(&mut self, layer: &Layer, point: &GripPoint) -> Result<(), LayerError> {
        prepare_mask(layer, &mut self.mask)?;
        self.base = Some(IncrementalBase::new(layer)?);
        self.start_point = Some(*point);
        self.last_bounds = None;
        Ok(())
    }

    fn redraw(&mut self, layer: &mut Layer, kernel: &dyn GripKernel, point: &GripPoint) -> Result<(), LayerError> {
        let (Some(start), Some(mask), Some(base)) = (self.start_point, self.mask.as_mut(), self.base.as_mut()) else {
            return Ok(());
        };
        let size = layer.size();
        let next = kernel.computed_segment_bounds(size, &start, point);
        let prev = self.last_bounds;

        match prev {
            Some(prev) => {
                let stale = prev.union(&next.unwrap_or(prev));
                mask.apply_effect(&ClearMaskShader, &Uniforms::new(), Some(stale))?;
            }
            None => mask.clear(0)?,
        }
        let drawn = kernel.stamp_mask_segment(mask, size, &start, point)?;
        self.last_bounds = drawn.or(next);

        let Some(region) = Bounds::union_opt(prev, next) else {
            return Ok(());
        };
        base.ensure(layer, region)?;
        merge(layer, base, mask, &point.style, region)?;
        trace!("line preview merged {:?}", region);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), LayerError> {
        self.base = None;
        self.start_point = None;
        self.last_bounds = None;
        if let Some(mask) = self.mask.as_mut() {
            mask.clear(0)?;
        }
        Ok(())
    }
}

impl GripInstrument for LinePreviewInstrument {
    fn id(&self) -> &'static str {
        "line-preview"
    }

    fn start(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        _options: &PushOptions,
    ) -> Result<(), LayerError> {
        self.begin(layer, point)?;
        self.redraw(layer, kernel, point)
    }

    /// Ignored unless a preview is in progress
    fn add_point(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        _prev: &GripPoint,
        _options: &PushOptions,
    ) -> Result<(), LayerError> {
        self.redraw(layer, kernel, point)
    }

    fn end(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        _prev: &GripPoint,
        options: &PushOptions,
    ) -> Result<(), LayerError> {
        self.redraw(layer, kernel, point)?;
        if let (Some(base), Some(bounds)) = (self.base.as_ref(), self.last_bounds) {
            let committed = layer.commit_history_from_texture(&base.texture().handle(), bounds, options)?;
            debug!("line preview on layer {} ended: {:?} (history: {})", layer.id().get(), bounds, committed);
        }
        self.finish()
    }

    fn cancel(&mut self) {
        self.base = None;
        self.start_point = None;
        self.last_bounds = None;
    }
}
