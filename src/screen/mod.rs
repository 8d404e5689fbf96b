//! Screen geometry: frame sizing and placement of the splash on screen.

pub mod layout;
pub mod placement;
pub mod types;

pub use placement::{Anchor, Placement, UnknownAnchor};
pub use types::{Point, Rect, Size};
