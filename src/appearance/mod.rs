//! Parsing of caller-supplied colors and fonts.
//!
//! Every parser here is forgiving: malformed input is logged and replaced by
//! a documented default instead of being reported as an error.

pub mod color;
pub mod font;

pub use color::{Color, ColorSpec, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
pub use font::{Font, FontSpec, FontStyle, MAX_FONT_SIZE};
