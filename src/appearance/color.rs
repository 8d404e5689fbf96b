use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// An opaque sRGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

/// Default splash background (`#00538F`).
pub const DEFAULT_BACKGROUND: Color = Color::rgb(0x00, 0x53, 0x8F);

/// Default splash text color (`white`).
pub const DEFAULT_FOREGROUND: Color = Color::rgb(0xFF, 0xFF, 0xFF);

impl Color {
    /// Build a color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a strict `#RRGGBB` string (hex digits in either case).
    pub fn from_hex(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('#')?;
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Look up a named color such as `white` or `steelblue`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() || name.starts_with('#') {
            return None;
        }
        colornames::Color::try_from(name.as_str())
            .ok()
            .map(|c| {
                let (r, g, b) = c.rgb();
                Self::rgb(r, g, b)
            })
    }

    /// Canonical `#RRGGBB` form.
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Move every channel towards white by `factor` (0.0 leaves the color
    /// unchanged, 1.0 yields white).
    pub fn lighten(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        let lift = |c: u8| {
            let c = f32::from(c);
            (c + (255.0 - c) * factor).min(255.0) as u8
        };
        Self::rgb(lift(self.r), lift(self.g), lift(self.b))
    }

    /// Pack into the `0x00BBGGRR` layout used by GDI `COLORREF`.
    pub fn to_colorref(self) -> u32 {
        u32::from(self.r) | (u32::from(self.g) << 8) | (u32::from(self.b) << 16)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// A color as supplied by the caller, before validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    /// A color name or a `#RRGGBB` string.
    Text(String),
    /// An `(r, g, b)` triple; each channel must be in `0..=255`.
    Rgb(i32, i32, i32),
}

impl ColorSpec {
    /// Validate the spec, returning `fallback` for anything malformed.
    pub fn resolve(&self, fallback: Color) -> Color {
        match self.parse() {
            Some(color) => color,
            None => {
                warn!(spec = ?self, %fallback, "invalid color; using fallback");
                fallback
            }
        }
    }

    /// Strict parse without a fallback.
    pub fn parse(&self) -> Option<Color> {
        match self {
            Self::Text(s) => {
                let s = s.trim();
                if s.starts_with('#') {
                    Color::from_hex(s)
                } else {
                    Color::from_name(s)
                }
            }
            Self::Rgb(r, g, b) => {
                let channel = |c: i32| u8::try_from(c).ok();
                Some(Color::rgb(channel(*r)?, channel(*g)?, channel(*b)?))
            }
        }
    }
}

impl From<&str> for ColorSpec {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ColorSpec {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<(i32, i32, i32)> for ColorSpec {
    fn from((r, g, b): (i32, i32, i32)) -> Self {
        Self::Rgb(r, g, b)
    }
}

impl From<Color> for ColorSpec {
    fn from(c: Color) -> Self {
        Self::Rgb(c.r.into(), c.g.into(), c.b.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triple_converts_to_hex() {
        let c = ColorSpec::from((255, 87, 51)).resolve(DEFAULT_BACKGROUND);
        assert_eq!(c.hex(), "#FF5733");
    }

    #[test]
    fn out_of_range_triple_falls_back() {
        let fallback = Color::rgb(1, 2, 3);
        assert_eq!(ColorSpec::from((300, 0, 0)).resolve(fallback), fallback);
        assert_eq!(ColorSpec::from((0, -1, 0)).resolve(fallback), fallback);
    }

    #[test]
    fn hex_strings() {
        assert_eq!(
            ColorSpec::from("#00538f").parse(),
            Some(DEFAULT_BACKGROUND)
        );
        assert_eq!(ColorSpec::from("#00538").parse(), None);
        assert_eq!(ColorSpec::from("#00538G").parse(), None);
        assert_eq!(ColorSpec::from("00538F").parse(), None);
    }

    #[test]
    fn named_colors() {
        assert_eq!(ColorSpec::from("white").parse(), Some(DEFAULT_FOREGROUND));
        assert_eq!(ColorSpec::from("Red").parse(), Some(Color::rgb(255, 0, 0)));
        let fallback = Color::rgb(9, 9, 9);
        assert_eq!(ColorSpec::from("notacolor").resolve(fallback), fallback);
        assert_eq!(ColorSpec::from("").resolve(fallback), fallback);
    }

    #[test]
    fn lighten_moves_towards_white() {
        let c = Color::rgb(0, 100, 255).lighten(0.5);
        assert_eq!(c, Color::rgb(127, 177, 255));
        assert_eq!(DEFAULT_BACKGROUND.lighten(0.0), DEFAULT_BACKGROUND);
        assert_eq!(DEFAULT_BACKGROUND.lighten(1.0), DEFAULT_FOREGROUND);
    }

    #[test]
    fn colorref_layout() {
        assert_eq!(Color::rgb(0x11, 0x22, 0x33).to_colorref(), 0x0033_2211);
    }
}
