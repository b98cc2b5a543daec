//! RGBA color values produced by the color pipeline.

use serde::{Deserialize, Serialize};

/// Color value in RGBA format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    /// CSS `rgba(...)` form for DOM collaborators.
    pub fn to_css(&self) -> String {
        let alpha = self.a as f32 / 255.0;
        format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, trim_alpha(alpha))
    }

    pub fn to_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

fn trim_alpha(alpha: f32) -> String {
    let s = format!("{:.3}", alpha);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}
