use super::GripInstrument;
use crate::grip::kernel::GripKernel;
use crate::grip::types::GripPoint;
use crate::history::PushOptions;
use crate::layer::{Layer, LayerError};

/// Stamps straight into the layer
///
/// Overlapping stamps of one stroke compound their opacity. Records no
/// history; callers that want undo commit around the stroke themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStrokeInstrument;

impl DirectStrokeInstrument {
    fn stroke_to(
        &self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        prev: &GripPoint,
    ) -> Result<(), LayerError> {
        kernel.draw_segment(layer, prev, point)?;
        kernel.draw_point(layer, point)?;
        Ok(())
    }
}

impl GripInstrument for DirectStrokeInstrument {
    fn id(&self) -> &'static str {
        "direct-stroke"
    }

    fn start(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        _options: &PushOptions,
    ) -> Result<(), LayerError> {
        kernel.draw_point(layer, point)?;
        Ok(())
    }

    fn add_point(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        prev: &GripPoint,
        _options: &PushOptions,
    ) -> Result<(), LayerError> {
        self.stroke_to(layer, kernel, point, prev)
    }

    fn end(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        prev: &GripPoint,
        _options: &PushOptions,
    ) -> Result<(), LayerError> {
        self.stroke_to(layer, kernel, point, prev)
    }
}
