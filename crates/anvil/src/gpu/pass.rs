//! Fragment pass execution

use std::sync::atomic::Ordering;

use glam::UVec2;
use tracing::trace;

use super::handle::TextureBindings;
use super::shader::{Fragment, FragmentShader, Uniforms};
use super::texture::Texture;
use crate::types::Bounds;

/// One draw over a destination texture
///
/// `source` is bound as `u_src`. `origin` is the surface-space position of
/// the destination's top-left texel, added to fragment coordinates by
/// [`Fragment::position`]. With a scissor only fragments inside it run; the
/// rest of the destination is left untouched.
pub struct RenderPass<'a> {
    pub shader: &'a dyn FragmentShader,
    pub uniforms: &'a Uniforms,
    pub bindings: &'a TextureBindings<'a>,
    pub source: Option<&'a Texture>,
    pub origin: UVec2,
    pub scissor: Option<Bounds>,
}

impl RenderPass<'_> {
    /// Shade every covered fragment of `target`
    ///
    /// Returns the number of fragments shaded.
    pub fn execute(&self, target: &mut Texture) -> u64 {
        let size = target.size();
        let area = match self.scissor {
            Some(scissor) => scissor.clamp_to(size),
            None => Bounds::full(size),
        };

        let mut shaded = 0u64;
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let frag = Fragment {
                    pixel: UVec2::new(x, y),
                    origin: self.origin,
                    size,
                    source: self.source,
                    uniforms: self.uniforms,
                    bindings: self.bindings,
                };
                let value = self.shader.shade(&frag);
                target.store(x, y, value);
                shaded += 1;
            }
        }

        let device = target.device();
        device.passes.fetch_add(1, Ordering::Relaxed);
        device.fragments.fetch_add(shaded, Ordering::Relaxed);
        trace!(
            "pass '{}': origin ({}, {}) area ({}, {}) {}x{} -> {} fragments",
            self.shader.label(),
            self.origin.x,
            self.origin.y,
            area.x,
            area.y,
            area.width,
            area.height,
            shaded
        );
        shaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{GpuContext, TextureFormat, from_fn};
    use glam::Vec4;

    #[test]
    fn test_full_pass_reads_source() {
        let ctx = GpuContext::new();
        let src = ctx
            .create_texture(TextureFormat::Rgba8Unorm, 2, 1, Some(&[10, 20, 30, 40, 50, 60, 70, 80]))
            .unwrap();
        let mut dst = ctx.create_texture(TextureFormat::Rgba8Unorm, 2, 1, None).unwrap();
        let invert = from_fn("invert", |f| {
            let s = f.src();
            Vec4::new(1.0 - s.x, 1.0 - s.y, 1.0 - s.z, s.w)
        });
        let uniforms = Uniforms::new();
        let bindings = TextureBindings::new();
        let shaded = RenderPass {
            shader: &invert,
            uniforms: &uniforms,
            bindings: &bindings,
            source: Some(&src),
            origin: UVec2::ZERO,
            scissor: None,
        }
        .execute(&mut dst);

        assert_eq!(shaded, 2);
        assert_eq!(dst.data(), &[245, 235, 225, 40, 205, 195, 185, 80]);
        assert_eq!(ctx.stats().passes, 1);
    }

    #[test]
    fn test_scissor_limits_fragments() {
        let ctx = GpuContext::new();
        let mut dst = ctx.create_texture(TextureFormat::R8Unorm, 4, 4, None).unwrap();
        let white = from_fn("white", |_| Vec4::ONE);
        let uniforms = Uniforms::new();
        let bindings = TextureBindings::new();
        let shaded = RenderPass {
            shader: &white,
            uniforms: &uniforms,
            bindings: &bindings,
            source: None,
            origin: UVec2::ZERO,
            scissor: Some(Bounds::new(1, 1, 2, 5)),
        }
        .execute(&mut dst);

        assert_eq!(shaded, 6);
        assert_eq!(dst.data().iter().filter(|&&v| v == 255).count(), 6);
        assert_eq!(dst.data()[0], 0);
    }

    #[test]
    fn test_position_includes_origin() {
        let ctx = GpuContext::new();
        let mut dst = ctx.create_texture(TextureFormat::R8Unorm, 2, 2, None).unwrap();
        // Light only the fragment whose surface position is (10.5, 20.5)
        let probe = from_fn("probe", |f| {
            let hit = f.position() == glam::Vec2::new(10.5, 20.5);
            Vec4::splat(if hit { 1.0 } else { 0.0 })
        });
        let uniforms = Uniforms::new();
        let bindings = TextureBindings::new();
        RenderPass {
            shader: &probe,
            uniforms: &uniforms,
            bindings: &bindings,
            source: None,
            origin: UVec2::new(10, 20),
            scissor: None,
        }
        .execute(&mut dst);
        assert_eq!(dst.data(), &[255, 0, 0, 0]);
    }
}
