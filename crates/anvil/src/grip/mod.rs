//! Stroke input
//!
//! [`Grip`] turns pointer samples into strokes on a [`Layer`]. A stroke
//! pairs a [`GripKernel`] (the stamp shape) with a [`GripInstrument`] (how
//! stamps reach the layer and whether history is recorded).
//!
//! ```ignore
//! let mut grip = Grip::new(GripOptions::default());
//! grip.start(&mut layer, KernelKind::Disc.create(), InstrumentKind::MaskStroke.create(), first, PushOptions::default())?;
//! grip.add_point(&mut layer, next)?;
//! grip.end(&mut layer, last)?;
//! ```

mod instrument;
mod kernel;
mod shaders;
mod types;

use anvil_config::{GripConfig, InputSpace};
use tracing::{debug, trace, warn};

use crate::history::PushOptions;
use crate::layer::{Layer, LayerError, LayerId};

pub use instrument::{DirectStrokeInstrument, GripInstrument, InstrumentKind, LinePreviewInstrument, MaskStrokeInstrument};
pub use kernel::{DiscKernel, GripKernel, KernelKind, SquareKernel, clamped_bounds, snap_center};
pub use shaders::{U_BASE, U_CENTER, U_COLOR, U_EXTENT, U_FROM, U_MASK, U_OPACITY, U_TO};
pub use types::{GripColor, GripPoint, GripStrokeStyle};

/// Error type for stroke sessions
#[derive(Debug, thiserror::Error)]
pub enum GripError {
    #[error("Grip::{method} called outside a stroke")]
    NotInStroke { method: &'static str },
    #[error("Stroke belongs to layer {expected:?}, got layer {actual:?}")]
    LayerMismatch { expected: LayerId, actual: LayerId },
    #[error("Layer error: {0}")]
    Layer(#[from] LayerError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GripOptions {
    pub input_space: InputSpace,
}

impl GripOptions {
    pub fn from_config(config: &GripConfig) -> Self {
        Self {
            input_space: config.input_space,
        }
    }
}

struct StrokeSession {
    layer: LayerId,
    kernel: Box<dyn GripKernel>,
    instrument: Box<dyn GripInstrument>,
    last_point: GripPoint,
    push: PushOptions,
}

/// Stroke session orchestrator
///
/// Holds at most one stroke at a time. Samples are converted from canvas
/// space (`y' = height - y`) when configured, and each new sample is handed
/// to the instrument together with the previous one.
#[derive(Default)]
pub struct Grip {
    options: GripOptions,
    session: Option<StrokeSession>,
}

impl Grip {
    pub fn new(options: GripOptions) -> Self {
        Self { options, session: None }
    }

    pub fn options(&self) -> GripOptions {
        self.options
    }

    pub fn is_in_stroke(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a stroke, replacing any stroke already in progress
    ///
    /// When the instrument fails to start, the previous session (if any)
    /// stays in place.
    pub fn start(
        &mut self,
        layer: &mut Layer,
        kernel: Box<dyn GripKernel>,
        mut instrument: Box<dyn GripInstrument>,
        point: GripPoint,
        push: PushOptions,
    ) -> Result<(), GripError> {
        let next = self.to_layer_point(layer, point);
        instrument.start(layer, kernel.as_ref(), &next, &push)?;

        if let Some(mut previous) = self.session.take() {
            warn!("Grip: stroke on layer {} replaced by a new one", previous.layer.get());
            previous.instrument.cancel();
        }
        debug!(
            "Grip: stroke started on layer {} ({} / {})",
            layer.id().get(),
            kernel.id(),
            instrument.id()
        );
        self.session = Some(StrokeSession {
            layer: layer.id(),
            kernel,
            instrument,
            last_point: next,
            push,
        });
        Ok(())
    }

    pub fn add_point(&mut self, layer: &mut Layer, point: GripPoint) -> Result<(), GripError> {
        let next = self.to_layer_point(layer, point);
        let session = Self::session_for(&mut self.session, layer, "add_point")?;
        session
            .instrument
            .add_point(layer, session.kernel.as_ref(), &next, &session.last_point, &session.push)?;
        trace!("Grip: add_point ({}, {})", next.x, next.y);
        session.last_point = next;
        Ok(())
    }

    /// Finish the stroke
    ///
    /// On failure the session is kept so the caller can [`cancel`](Self::cancel) it.
    pub fn end(&mut self, layer: &mut Layer, point: GripPoint) -> Result<(), GripError> {
        let next = self.to_layer_point(layer, point);
        let session = Self::session_for(&mut self.session, layer, "end")?;
        session
            .instrument
            .end(layer, session.kernel.as_ref(), &next, &session.last_point, &session.push)?;
        self.session = None;
        debug!("Grip: stroke ended on layer {}", layer.id().get());
        Ok(())
    }

    /// Drop the current stroke without recording history
    ///
    /// Returns whether a stroke was in progress.
    pub fn cancel(&mut self) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        session.instrument.cancel();
        debug!("Grip: stroke on layer {} cancelled", session.layer.get());
        true
    }

    fn session_for<'a>(
        session: &'a mut Option<StrokeSession>,
        layer: &Layer,
        method: &'static str,
    ) -> Result<&'a mut StrokeSession, GripError> {
        let session = session.as_mut().ok_or(GripError::NotInStroke { method })?;
        if session.layer != layer.id() {
            return Err(GripError::LayerMismatch {
                expected: session.layer,
                actual: layer.id(),
            });
        }
        Ok(session)
    }

    fn to_layer_point(&self, layer: &Layer, point: GripPoint) -> GripPoint {
        match self.options.input_space {
            InputSpace::Layer => point,
            InputSpace::Canvas => GripPoint {
                y: layer.height() as f32 - point.y,
                ..point
            },
        }
    }
}

impl std::fmt::Debug for Grip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grip")
            .field("options", &self.options)
            .field("layer", &self.session.as_ref().map(|s| s.layer))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistoryBackendKind;
    use crate::gpu::GpuContext;
    use crate::layer::LayerInit;
    use crate::types::Bounds;

    fn point(x: f32, y: f32) -> GripPoint {
        GripPoint::new(x, y, GripStrokeStyle::new(GripColor::BLACK, 1.0))
    }

    fn alpha_at(layer: &Layer, x: u32, y: u32) -> u8 {
        layer.read_pixels(Some(Bounds::new(x, y, 1, 1))).unwrap()[3]
    }

    #[test]
    fn test_not_in_stroke() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(4, 4)).unwrap();
        let mut grip = Grip::default();

        assert!(matches!(
            grip.add_point(&mut layer, point(1.0, 1.0)),
            Err(GripError::NotInStroke { method: "add_point" })
        ));
        assert!(matches!(
            grip.end(&mut layer, point(1.0, 1.0)),
            Err(GripError::NotInStroke { method: "end" })
        ));
        assert!(!grip.cancel());
    }

    #[test]
    fn test_layer_mismatch_keeps_session() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(4, 4)).unwrap();
        let mut other = Layer::new(&ctx, LayerInit::new(4, 4)).unwrap();
        let mut grip = Grip::default();

        grip.start(
            &mut layer,
            KernelKind::Square.create(),
            InstrumentKind::Direct.create(),
            point(1.0, 1.0),
            PushOptions::default(),
        )
        .unwrap();
        let err = grip.end(&mut other, point(2.0, 2.0)).unwrap_err();
        assert!(matches!(err, GripError::LayerMismatch { expected, actual } if expected == layer.id() && actual == other.id()));
        assert!(grip.is_in_stroke());
        assert!(grip.cancel());
        assert!(!grip.is_in_stroke());
    }

    #[test]
    fn test_canvas_space_flips_y() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(8, 8)).unwrap();
        let mut grip = Grip::new(GripOptions {
            input_space: InputSpace::Canvas,
        });

        // canvas y 6.2 is layer y 1.8, snapped to the center of row 1
        grip.start(
            &mut layer,
            KernelKind::Square.create(),
            InstrumentKind::Direct.create(),
            point(3.2, 6.2),
            PushOptions::default(),
        )
        .unwrap();
        grip.end(&mut layer, point(3.2, 6.2)).unwrap();
        assert_eq!(alpha_at(&layer, 3, 1), 255);
        assert_eq!(alpha_at(&layer, 3, 6), 0);
    }

    #[test]
    fn test_start_replaces_session() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(8, 8)).unwrap();
        layer.set_history_backend(HistoryBackendKind::Compressed, 8).unwrap();
        let mut grip = Grip::default();

        grip.start(
            &mut layer,
            KernelKind::Disc.create(),
            InstrumentKind::MaskStroke.create(),
            point(1.0, 1.0),
            PushOptions::default(),
        )
        .unwrap();
        grip.start(
            &mut layer,
            KernelKind::Square.create(),
            InstrumentKind::MaskStroke.create(),
            point(5.0, 5.0),
            PushOptions::with_context("second"),
        )
        .unwrap();
        grip.add_point(&mut layer, point(6.0, 5.0)).unwrap();
        grip.end(&mut layer, point(6.0, 6.0)).unwrap();

        assert!(!grip.is_in_stroke());
        assert_eq!(layer.history().unwrap().undo_len(), 1);
        assert_eq!(alpha_at(&layer, 6, 5), 255);
    }

    #[test]
    fn test_cancel_records_no_history() {
        let ctx = GpuContext::new();
        let mut layer = Layer::new(&ctx, LayerInit::new(8, 8)).unwrap();
        layer.set_history_backend(HistoryBackendKind::Compressed, 8).unwrap();
        let mut grip = Grip::default();

        grip.start(
            &mut layer,
            KernelKind::Disc.create(),
            InstrumentKind::MaskStroke.create(),
            point(2.0, 2.0),
            PushOptions::default(),
        )
        .unwrap();
        grip.add_point(&mut layer, point(5.0, 2.0)).unwrap();
        assert!(grip.cancel());
        assert!(!layer.can_undo());
    }
}
