use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Weight/slant combination of a splash font.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontStyle {
    /// Regular weight, upright.
    #[default]
    Normal,
    /// Bold weight, upright.
    Bold,
    /// Regular weight, italic.
    Italic,
    /// Bold weight, italic.
    BoldItalic,
}

impl FontStyle {
    /// Whether the style uses a bold weight.
    pub fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldItalic)
    }

    /// Whether the style is slanted.
    pub fn is_italic(self) -> bool {
        matches!(self, Self::Italic | Self::BoldItalic)
    }
}

impl FromStr for FontStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<String> = s
            .split(|c: char| c.is_whitespace() || c == '-')
            .filter(|w| !w.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        match words.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["normal"] | ["regular"] => Ok(Self::Normal),
            ["bold"] => Ok(Self::Bold),
            ["italic"] => Ok(Self::Italic),
            ["bold", "italic"] | ["italic", "bold"] | ["bolditalic"] => Ok(Self::BoldItalic),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FontStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::BoldItalic => "bold italic",
        })
    }
}

/// Largest accepted point size; bigger sizes fall back to the default font.
pub const MAX_FONT_SIZE: u32 = 1000;

/// A fully resolved font.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Font {
    /// Family name, e.g. `Calibri`.
    pub family: String,
    /// Point size, in `1..=MAX_FONT_SIZE`.
    pub size: u32,
    /// Weight and slant.
    pub style: FontStyle,
}

impl Default for Font {
    /// `Calibri, 18, bold`.
    fn default() -> Self {
        Self {
            family: "Calibri".to_string(),
            size: 18,
            style: FontStyle::Bold,
        }
    }
}

impl fmt::Display for Font {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.family, self.size, self.style)
    }
}

/// A font as supplied by the caller, before validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontSpec {
    /// `"family, size, style"`.
    Text(String),
    /// `(family, size, style)`.
    Parts(String, i64, String),
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::Text(Font::default().to_string())
    }
}

impl FontSpec {
    /// Validate the spec, returning the default font for anything malformed.
    pub fn resolve(&self) -> Font {
        match self.parse() {
            Some(font) => font,
            None => {
                let font = Font::default();
                warn!(spec = ?self, default = %font, "invalid font; using default");
                font
            }
        }
    }

    /// Strict parse without a fallback.
    pub fn parse(&self) -> Option<Font> {
        match self {
            Self::Text(s) => {
                let parts: Vec<&str> = s.split(',').map(str::trim).collect();
                let [family, size, style] = parts.as_slice() else {
                    return None;
                };
                build(family, size.parse().ok()?, style)
            }
            Self::Parts(family, size, style) => build(family.trim(), *size, style),
        }
    }
}

fn build(family: &str, size: i64, style: &str) -> Option<Font> {
    if family.is_empty() {
        return None;
    }
    let size = u32::try_from(size)
        .ok()
        .filter(|s| (1..=MAX_FONT_SIZE).contains(s))?;
    Some(Font {
        family: family.to_string(),
        size,
        style: style.parse().ok()?,
    })
}

impl From<&str> for FontSpec {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FontSpec {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<(&str, u32, FontStyle)> for FontSpec {
    fn from((family, size, style): (&str, u32, FontStyle)) -> Self {
        Self::Parts(family.to_string(), i64::from(size), style.to_string())
    }
}

impl From<Font> for FontSpec {
    fn from(font: Font) -> Self {
        Self::Parts(font.family, i64::from(font.size), font.style.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_form() {
        let font = FontSpec::from("Arial, 24, bold").resolve();
        assert_eq!(
            font,
            Font {
                family: "Arial".into(),
                size: 24,
                style: FontStyle::Bold
            }
        );
    }

    #[test]
    fn bad_size_falls_back() {
        assert_eq!(FontSpec::from("Arial, notanumber, bold").resolve(), Font::default());
        assert_eq!(FontSpec::from("Arial, 0, bold").resolve(), Font::default());
        assert_eq!(FontSpec::from("Arial, -4, bold").resolve(), Font::default());
    }

    #[test]
    fn oversized_falls_back() {
        assert_eq!(FontSpec::from("Arial, 100000000, bold").resolve(), Font::default());
        assert_eq!(
            FontSpec::Parts("Arial".into(), i64::MAX, "bold".into()).resolve(),
            Font::default()
        );
        let biggest = FontSpec::from(format!("Arial, {MAX_FONT_SIZE}, bold").as_str());
        assert_eq!(biggest.resolve().size, MAX_FONT_SIZE);
    }

    #[test]
    fn partial_specs_fall_back() {
        assert_eq!(FontSpec::from("Arial").resolve(), Font::default());
        assert_eq!(FontSpec::from("Arial, 12").resolve(), Font::default());
        assert_eq!(FontSpec::from(", 12, bold").resolve(), Font::default());
        assert_eq!(FontSpec::from("Arial, 12, heavy").resolve(), Font::default());
    }

    #[test]
    fn styles() {
        assert_eq!("bold italic".parse(), Ok(FontStyle::BoldItalic));
        assert_eq!("Italic-Bold".parse(), Ok(FontStyle::BoldItalic));
        assert_eq!("NORMAL".parse(), Ok(FontStyle::Normal));
        assert_eq!("oblique".parse::<FontStyle>(), Err(()));
        assert!(FontStyle::BoldItalic.is_bold() && FontStyle::BoldItalic.is_italic());
    }

    #[test]
    fn parts_form() {
        let spec = FontSpec::from(("Segoe UI", 11, FontStyle::Italic));
        assert_eq!(spec.resolve().to_string(), "Segoe UI, 11, italic");
        assert_eq!(
            FontSpec::Parts("Segoe UI".into(), 0, "bold".into()).resolve(),
            Font::default()
        );
    }

    #[test]
    fn default_round_trips_through_text() {
        assert_eq!(FontSpec::default().parse(), Some(Font::default()));
    }
}
