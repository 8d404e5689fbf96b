use std::{fmt, str::FromStr};

use thiserror::Error;
use tracing::warn;

use super::types::{Point, Size};

/// Gap kept between the splash and the left, right and top screen edges.
pub const EDGE_MARGIN: i32 = 10;

/// Gap kept above the bottom screen edge, leaving room for a taskbar.
pub const BOTTOM_MARGIN: i32 = 50;

/// One cell of the 3×3 screen grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// `TL`
    TopLeft,
    /// `TC`
    TopCenter,
    /// `TR`
    TopRight,
    /// `CL`
    CenterLeft,
    /// `C`
    Center,
    /// `CR`
    CenterRight,
    /// `BL`
    BottomLeft,
    /// `BC`
    BottomCenter,
    /// `BR`
    #[default]
    BottomRight,
}

#[derive(Clone, Copy)]
enum Band {
    Start,
    Middle,
    End,
}

impl Anchor {
    /// Every anchor, in reading order.
    pub const ALL: [Anchor; 9] = [
        Self::TopLeft,
        Self::TopCenter,
        Self::TopRight,
        Self::CenterLeft,
        Self::Center,
        Self::CenterRight,
        Self::BottomLeft,
        Self::BottomCenter,
        Self::BottomRight,
    ];

    /// The symbolic code for this anchor.
    pub fn code(self) -> &'static str {
        match self {
            Self::TopLeft => "TL",
            Self::TopCenter => "TC",
            Self::TopRight => "TR",
            Self::CenterLeft => "CL",
            Self::Center => "C",
            Self::CenterRight => "CR",
            Self::BottomLeft => "BL",
            Self::BottomCenter => "BC",
            Self::BottomRight => "BR",
        }
    }

    fn bands(self) -> (Band, Band) {
        use Band::*;
        match self {
            Self::TopLeft => (Start, Start),
            Self::TopCenter => (Middle, Start),
            Self::TopRight => (End, Start),
            Self::CenterLeft => (Start, Middle),
            Self::Center => (Middle, Middle),
            Self::CenterRight => (End, Middle),
            Self::BottomLeft => (Start, End),
            Self::BottomCenter => (Middle, End),
            Self::BottomRight => (End, End),
        }
    }

    /// Unclamped top-left corner for a window of `window` size.
    fn origin(self, window: Size, screen: Size) -> Point {
        let (column, row) = self.bands();
        let x = match column {
            Band::Start => EDGE_MARGIN,
            Band::Middle => (screen.width - window.width) / 2,
            Band::End => screen.width - window.width - EDGE_MARGIN,
        };
        let y = match row {
            Band::Start => EDGE_MARGIN,
            Band::Middle => (screen.height - window.height) / 2,
            Band::End => screen.height - window.height - BOTTOM_MARGIN,
        };
        Point::new(x, y)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A placement code that is not one of the nine grid cells.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown placement code {0:?}")]
pub struct UnknownAnchor(pub String);

impl FromStr for Anchor {
    type Err = UnknownAnchor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|a| a.code() == code)
            .ok_or_else(|| UnknownAnchor(s.to_string()))
    }
}

/// Where the splash goes on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Aligned to one cell of the 3×3 grid.
    Anchor(Anchor),
    /// An explicit top-left coordinate.
    At(Point),
}

impl Default for Placement {
    fn default() -> Self {
        Self::Anchor(Anchor::default())
    }
}

impl Placement {
    /// Placement from a symbolic code. Unknown codes degrade to `BR`.
    pub fn code(code: &str) -> Self {
        match code.parse() {
            Ok(anchor) => Self::Anchor(anchor),
            Err(e) => {
                warn!(error = %e, "invalid placement; defaulting to BR");
                Self::Anchor(Anchor::BottomRight)
            }
        }
    }

    /// Placement at an explicit coordinate.
    pub fn at(x: i32, y: i32) -> Self {
        Self::At(Point::new(x, y))
    }

    /// Top-left corner for a `window` sized frame on a `screen` sized display,
    /// clamped so the whole frame stays visible.
    pub fn resolve(&self, window: Size, screen: Size) -> Point {
        let raw = match self {
            Self::Anchor(anchor) => anchor.origin(window, screen),
            Self::At(p) => *p,
        };
        let clamped = clamp(raw, window, screen);
        if clamped != raw {
            warn!(?raw, ?clamped, "splash would leave the screen; moving inside");
        }
        clamped
    }
}

impl From<Anchor> for Placement {
    fn from(a: Anchor) -> Self {
        Self::Anchor(a)
    }
}

impl From<Point> for Placement {
    fn from(p: Point) -> Self {
        Self::At(p)
    }
}

/// Clamp `p` into `[0, screen - window]` on both axes, never going negative.
pub fn clamp(p: Point, window: Size, screen: Size) -> Point {
    let max_x = (screen.width - window.width).max(0);
    let max_y = (screen.height - window.height).max(0);
    Point::new(p.x.clamp(0, max_x), p.y.clamp(0, max_y))
}
