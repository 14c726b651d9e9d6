//! Fragment shaders and uniforms

use std::collections::BTreeMap;

use glam::{UVec2, Vec2, Vec3, Vec4};

use super::GpuError;
use super::handle::TextureBindings;
use super::texture::Texture;
use crate::types::Size;

/// A uniform value as declared by a shader
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl UniformValue {
    /// Build a value from 1 to 4 components
    pub fn from_slice(values: &[f32]) -> Result<Self, GpuError> {
        match *values {
            [x] => Ok(UniformValue::Float(x)),
            [x, y] => Ok(UniformValue::Vec2(Vec2::new(x, y))),
            [x, y, z] => Ok(UniformValue::Vec3(Vec3::new(x, y, z))),
            [x, y, z, w] => Ok(UniformValue::Vec4(Vec4::new(x, y, z, w))),
            _ => Err(GpuError::UnsupportedUniformLength(values.len())),
        }
    }

    /// Widen to four components, filling missing ones with zero
    pub fn as_vec4(&self) -> Vec4 {
        match *self {
            UniformValue::Float(x) => Vec4::new(x, 0.0, 0.0, 0.0),
            UniformValue::Vec2(v) => v.extend(0.0).extend(0.0),
            UniformValue::Vec3(v) => v.extend(0.0),
            UniformValue::Vec4(v) => v,
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        UniformValue::Vec2(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        UniformValue::Vec4(value)
    }
}

/// Named uniform values for one pass
///
/// Reading a uniform that was never set yields zero, matching an unset GLSL
/// uniform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uniforms {
    values: BTreeMap<String, UniformValue>,
}

impl Uniforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Uniforms::set`]
    pub fn with(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Set a uniform from a slice of 1 to 4 components
    pub fn set_slice(&mut self, name: &str, values: &[f32]) -> Result<(), GpuError> {
        let value = UniformValue::from_slice(values)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<UniformValue> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn vec4(&self, name: &str) -> Vec4 {
        self.get(name).map(|v| v.as_vec4()).unwrap_or(Vec4::ZERO)
    }

    pub fn vec3(&self, name: &str) -> Vec3 {
        self.vec4(name).truncate()
    }

    pub fn vec2(&self, name: &str) -> Vec2 {
        self.vec4(name).truncate().truncate()
    }

    pub fn float(&self, name: &str) -> f32 {
        self.vec4(name).x
    }
}

/// Per-fragment inputs visible to a shader
pub struct Fragment<'a> {
    pub(crate) pixel: UVec2,
    pub(crate) origin: UVec2,
    pub(crate) size: Size,
    pub(crate) source: Option<&'a Texture>,
    pub(crate) uniforms: &'a Uniforms,
    pub(crate) bindings: &'a TextureBindings<'a>,
}

impl<'a> Fragment<'a> {
    /// Integer pixel being shaded, relative to the destination texture
    #[inline]
    pub fn pixel(&self) -> UVec2 {
        self.pixel
    }

    /// Pixel center in destination texture space (`gl_FragCoord.xy`)
    #[inline]
    pub fn frag_coord(&self) -> Vec2 {
        self.pixel.as_vec2() + Vec2::splat(0.5)
    }

    /// Pixel center in layer space (`gl_FragCoord.xy + u_origin`)
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.frag_coord() + self.origin.as_vec2()
    }

    /// Destination texture size
    #[inline]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Source texture size (zero when the pass has no source)
    pub fn src_size(&self) -> Size {
        self.source.map(|s| s.size()).unwrap_or(Size::new(0, 0))
    }

    /// Source texel under this fragment (`texture(u_src, v_uv)`)
    ///
    /// When source and destination differ in size the lookup goes through
    /// normalized coordinates with nearest filtering.
    pub fn src(&self) -> Vec4 {
        let Some(source) = self.source else {
            return Vec4::ZERO;
        };
        if source.size() == self.size {
            return source.texel(self.pixel.x, self.pixel.y);
        }
        let uv = self.frag_coord() / self.size.as_vec2();
        let texel = (uv * source.size().as_vec2()).floor();
        source.texel_clamped(texel.x as i64, texel.y as i64)
    }

    /// Source texel at integer coordinates with clamp-to-edge addressing
    pub fn src_texel(&self, x: i64, y: i64) -> Vec4 {
        self.source
            .map(|s| s.texel_clamped(x, y))
            .unwrap_or(Vec4::ZERO)
    }

    /// Sample a named bound texture at a layer-space position
    ///
    /// Unbound names sample as zero.
    pub fn sample(&self, name: &str, position: Vec2) -> Vec4 {
        self.bindings
            .get(name)
            .map(|handle| handle.sample(position))
            .unwrap_or(Vec4::ZERO)
    }

    pub fn float(&self, name: &str) -> f32 {
        self.uniforms.float(name)
    }

    pub fn vec2(&self, name: &str) -> Vec2 {
        self.uniforms.vec2(name)
    }

    pub fn vec3(&self, name: &str) -> Vec3 {
        self.uniforms.vec3(name)
    }

    pub fn vec4(&self, name: &str) -> Vec4 {
        self.uniforms.vec4(name)
    }
}

/// A fragment program
pub trait FragmentShader {
    /// Name used in logs
    fn label(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Compute the output color of one fragment
    fn shade(&self, frag: &Fragment<'_>) -> Vec4;
}

/// Shader backed by a closure
pub struct FnShader<F> {
    label: &'static str,
    f: F,
}

impl<F> FragmentShader for FnShader<F>
where
    F: Fn(&Fragment<'_>) -> Vec4,
{
    fn label(&self) -> &str {
        self.label
    }

    fn shade(&self, frag: &Fragment<'_>) -> Vec4 {
        (self.f)(frag)
    }
}

/// Wrap a closure as a [`FragmentShader`]
pub fn from_fn<F>(label: &'static str, f: F) -> FnShader<F>
where
    F: Fn(&Fragment<'_>) -> Vec4,
{
    FnShader { label, f }
}

/// GLSL `mix`, written so `t == 1` returns `b` exactly
#[inline]
pub fn mix(a: Vec4, b: Vec4, t: f32) -> Vec4 {
    a * (1.0 - t) + b * t
}
