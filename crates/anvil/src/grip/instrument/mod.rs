//! Stroke policies
//!
//! A [`GripInstrument`] decides how the samples of one stroke reach the
//! layer: stamped directly, accumulated in a coverage mask and merged over a
//! frozen base, or redrawn as a single straight segment. Kernels do the
//! rasterizing, instruments own the flow and the history commit.

mod direct;
mod line_preview;
mod mask_stroke;

use serde::{Deserialize, Serialize};

use super::kernel::GripKernel;
use super::shaders::{MergeShader, U_BASE, U_COLOR, U_MASK, U_OPACITY};
use super::types::{GripPoint, GripStrokeStyle};
use crate::gpu::{TextureBindings, TextureSet, Uniforms};
use crate::history::PushOptions;
use crate::layer::{Layer, LayerError};
use crate::mask::MaskSurface;
use crate::types::Bounds;

pub use direct::DirectStrokeInstrument;
pub use line_preview::LinePreviewInstrument;
pub use mask_stroke::MaskStrokeInstrument;

pub trait GripInstrument: Send {
    fn id(&self) -> &'static str;

    /// First sample of a stroke
    fn start(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        options: &PushOptions,
    ) -> Result<(), LayerError>;

    /// Continue the stroke from `prev` to `point`
    fn add_point(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        prev: &GripPoint,
        options: &PushOptions,
    ) -> Result<(), LayerError>;

    /// Last sample; commits history when the instrument records any
    fn end(
        &mut self,
        layer: &mut Layer,
        kernel: &dyn GripKernel,
        point: &GripPoint,
        prev: &GripPoint,
        options: &PushOptions,
    ) -> Result<(), LayerError>;

    /// Release per-stroke state without committing
    ///
    /// Pixels already merged into the layer stay as they are.
    fn cancel(&mut self) {}
}

/// Built-in instruments by key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstrumentKind {
    Direct,
    #[default]
    MaskStroke,
    LinePreview,
}

impl InstrumentKind {
    pub fn create(self) -> Box<dyn GripInstrument> {
        match self {
            InstrumentKind::Direct => Box::new(DirectStrokeInstrument),
            InstrumentKind::MaskStroke => Box::new(MaskStrokeInstrument::new()),
            InstrumentKind::LinePreview => Box::new(LinePreviewInstrument::new()),
        }
    }
}

/// Layer-sized copy of the pre-stroke pixels, filled in as the stroke grows
///
/// `copied` is always a rectangle whose every pixel holds pre-stroke
/// content. Pixels outside it have not been merged yet, so growing it only
/// needs the strips between the old and new rectangle.
pub(crate) struct IncrementalBase {
    texture: TextureSet,
    copied: Option<Bounds>,
}

impl IncrementalBase {
    pub(crate) fn new(layer: &Layer) -> Result<Self, LayerError> {
        Ok(Self {
            texture: layer.create_empty_texture()?,
            copied: None,
        })
    }

    pub(crate) fn texture(&self) -> &TextureSet {
        &self.texture
    }

    /// Make sure `bounds` is covered, copying only newly exposed strips
    pub(crate) fn ensure(&mut self, layer: &Layer, bounds: Bounds) -> Result<(), LayerError> {
        let bounds = bounds.clamp_to(layer.size());
        if bounds.is_empty() {
            return Ok(());
        }
        let Some(prev) = self.copied else {
            layer.copy_texture_region(&mut self.texture, bounds)?;
            self.copied = Some(bounds);
            return Ok(());
        };

        let next = prev.union(&bounds);
        for strip in exposed_strips(prev, next) {
            layer.copy_texture_region(&mut self.texture, strip)?;
        }
        self.copied = Some(next);
        Ok(())
    }
}

/// `next` minus `prev`, where `prev` lies inside `next`, as up to four strips
fn exposed_strips(prev: Bounds, next: Bounds) -> Vec<Bounds> {
    let mut strips = Vec::with_capacity(4);
    if prev.y > next.y {
        strips.push(Bounds::new(next.x, next.y, next.width, prev.y - next.y));
    }
    if next.bottom() > prev.bottom() {
        strips.push(Bounds::new(next.x, prev.bottom(), next.width, next.bottom() - prev.bottom()));
    }
    if prev.x > next.x {
        strips.push(Bounds::new(next.x, prev.y, prev.x - next.x, prev.height));
    }
    if next.right() > prev.right() {
        strips.push(Bounds::new(prev.right(), prev.y, next.right() - prev.right(), prev.height));
    }
    strips
}

/// `dest = mix(base, color, opacity * mask)` over `bounds`
pub(crate) fn merge(
    layer: &mut Layer,
    base: &IncrementalBase,
    mask: &MaskSurface,
    style: &GripStrokeStyle,
    bounds: Bounds,
) -> Result<(), LayerError> {
    let bindings = TextureBindings::new()
        .with(U_BASE, base.texture().handle())
        .with(U_MASK, mask.texture_handle()?);
    let uniforms = Uniforms::new()
        .with(U_COLOR, style.color.rgba())
        .with(U_OPACITY, style.clamped_opacity());
    layer.apply_effect_with_textures(&MergeShader, &uniforms, &bindings, Some(bounds))
}

/// Reuse `mask` when it still matches the layer, otherwise allocate a new one
pub(crate) fn prepare_mask(layer: &Layer, mask: &mut Option<MaskSurface>) -> Result<(), LayerError> {
    if let Some(existing) = mask.as_mut() {
        if existing.size() == layer.size() && !existing.is_disposed() {
            return existing.clear(0);
        }
    }
    *mask = Some(layer.create_mask_surface(None)?);
    Ok(())
}
