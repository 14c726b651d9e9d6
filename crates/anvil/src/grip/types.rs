//! Stroke input types

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

/// Stroke color, stored as normalized RGBA
///
/// Constructed from either 0..=255 or 0..=1 channels: when any channel is
/// above 1 all four are divided by 255.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct GripColor(Vec4);

impl GripColor {
    pub const BLACK: GripColor = GripColor(Vec4::new(0.0, 0.0, 0.0, 1.0));

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        let peak = r.max(g).max(b).max(a);
        let rgba = Vec4::new(r, g, b, a);
        if peak > 1.0 {
            return Self(rgba / 255.0);
        }
        Self(rgba)
    }

    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self(Vec4::new(rgba[0] as f32, rgba[1] as f32, rgba[2] as f32, rgba[3] as f32) / 255.0)
    }

    #[inline]
    pub fn rgba(&self) -> Vec4 {
        self.0
    }
}

impl From<[f32; 4]> for GripColor {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<GripColor> for [f32; 4] {
    fn from(color: GripColor) -> Self {
        color.0.to_array()
    }
}

/// Appearance of one stroke sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GripStrokeStyle {
    pub color: GripColor,
    /// Diameter in pixels
    pub size: f32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
}

fn default_opacity() -> f32 {
    1.0
}

impl GripStrokeStyle {
    pub fn new(color: GripColor, size: f32) -> Self {
        Self {
            color,
            size,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Opacity limited to 0..=1
    #[inline]
    pub fn clamped_opacity(&self) -> f32 {
        self.opacity.clamp(0.0, 1.0)
    }
}

/// One pointer sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GripPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub pressure: Option<f32>,
    #[serde(default)]
    pub time: Option<f64>,
    pub style: GripStrokeStyle,
}

impl GripPoint {
    pub fn new(x: f32, y: f32, style: GripStrokeStyle) -> Self {
        Self {
            x,
            y,
            pressure: None,
            time: None,
            style,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Same position with another point's style
    pub fn restyled(&self, style: GripStrokeStyle) -> Self {
        Self { style, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_normalization() {
        assert_eq!(GripColor::new(255.0, 0.0, 0.0, 255.0).rgba(), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(GripColor::new(0.5, 0.25, 0.0, 1.0).rgba(), Vec4::new(0.5, 0.25, 0.0, 1.0));
        // a single channel above 1 switches all four to 0..=255
        assert_eq!(GripColor::new(2.0, 0.0, 0.0, 1.0).rgba(), Vec4::new(2.0 / 255.0, 0.0, 0.0, 1.0 / 255.0));
        assert_eq!(GripColor::from_rgba8([0, 0, 255, 255]).rgba(), Vec4::new(0.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn test_point_json() {
        let json = r#"{"x":1.5,"y":2.0,"style":{"color":[255,128,0,255],"size":4}}"#;
        let point: GripPoint = serde_json::from_str(json).unwrap();
        assert_eq!(point.style.opacity, 1.0);
        assert_eq!(point.style.color.rgba().x, 1.0);
        assert!(point.pressure.is_none());
    }

    #[test]
    fn test_clamped_opacity() {
        let style = GripStrokeStyle::new(GripColor::BLACK, 3.0).with_opacity(1.7);
        assert_eq!(style.clamped_opacity(), 1.0);
        assert_eq!(style.with_opacity(-0.2).clamped_opacity(), 0.0);
    }
}
