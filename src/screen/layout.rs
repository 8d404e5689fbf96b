//! Frame metrics shared by every toolkit so measured sizes and painted
//! regions agree.

use super::types::{Point, Rect, Size};

/// Inner padding around the text blocks.
pub const PADDING: i32 = 20;
/// Vertical gap between the title and the message.
pub const TITLE_GAP: i32 = 5;
/// Side length of the square close button.
pub const CLOSE_BUTTON_SIZE: i32 = 24;
/// Gap between the close button and the top/right frame edges.
pub const CLOSE_BUTTON_MARGIN: i32 = 5;
/// Height of the progress bar track.
pub const PROGRESS_HEIGHT: i32 = 18;
/// Gap between the message and the progress bar.
pub const PROGRESS_GAP: i32 = 10;

/// Smallest frame width.
pub const MIN_WIDTH: i32 = 200;
/// Smallest frame height without a title or progress bar.
pub const MIN_HEIGHT: i32 = 100;
/// Smallest frame height when a title is shown.
pub const MIN_HEIGHT_TITLED: i32 = 120;
/// Smallest frame height when a progress bar is shown.
pub const MIN_HEIGHT_PROGRESS: i32 = 150;

/// Width at which the message wraps for a font of `font_size` points.
pub fn wrap_width(font_size: u32, screen: Size) -> i32 {
    let size = i32::try_from(font_size).unwrap_or(i32::MAX / 22);
    let wrap = size.saturating_mul(22).clamp(240, 700);
    wrap.min(screen.width * 3 / 5)
}

/// Measured content of a splash frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Blocks {
    /// Size of the rendered title, when there is one.
    pub title: Option<Size>,
    /// Size of the wrapped message text.
    pub message: Size,
    /// Whether a close button is drawn.
    pub close_button: bool,
    /// Whether a progress bar is drawn.
    pub progress: bool,
}

impl Blocks {
    /// Natural frame size of the content, before minimums are applied.
    pub fn natural_size(&self) -> Size {
        let text_width = self
            .title
            .map_or(self.message.width, |t| t.width.max(self.message.width));
        let mut width = text_width.saturating_add(2 * PADDING);
        if self.close_button {
            width = width.saturating_add(CLOSE_BUTTON_SIZE + 2 * CLOSE_BUTTON_MARGIN);
        }
        let mut height = self.message.height.saturating_add(2 * PADDING);
        if let Some(title) = self.title {
            height = height.saturating_add(title.height.saturating_add(TITLE_GAP));
        }
        if self.progress {
            height = height.saturating_add(PROGRESS_HEIGHT + PROGRESS_GAP);
        }
        Size::new(width, height)
    }

    /// Final frame size: the natural size grown to the minimums.
    pub fn frame_size(&self) -> Size {
        let natural = self.natural_size();
        let mut min_height = MIN_HEIGHT;
        if self.title.is_some() {
            min_height = min_height.max(MIN_HEIGHT_TITLED);
        }
        if self.progress {
            min_height = min_height.max(MIN_HEIGHT_PROGRESS);
        }
        Size::new(natural.width.max(MIN_WIDTH), natural.height.max(min_height))
    }

    /// Client-area regions for a frame of `frame` size.
    pub fn regions(&self, frame: Size) -> Regions {
        let mut y = PADDING;
        let title = self.title.map(|t| {
            let r = Rect::new(Point::new(PADDING, y), t);
            y = y.saturating_add(t.height).saturating_add(TITLE_GAP);
            r
        });
        let message = Rect::new(Point::new(PADDING, y), self.message);
        y = y.saturating_add(self.message.height);
        let progress = self.progress.then(|| {
            let width = (frame.width - 2 * PADDING).max(0);
            Rect::new(
                Point::new(PADDING, y.saturating_add(PROGRESS_GAP)),
                Size::new(width, PROGRESS_HEIGHT),
            )
        });
        let close_button = self.close_button.then(|| {
            Rect::new(
                Point::new(
                    frame.width - CLOSE_BUTTON_SIZE - CLOSE_BUTTON_MARGIN,
                    CLOSE_BUTTON_MARGIN,
                ),
                Size::new(CLOSE_BUTTON_SIZE, CLOSE_BUTTON_SIZE),
            )
        });
        Regions {
            title,
            message,
            progress,
            close_button,
        }
    }
}

/// Where each element is painted inside the client area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Regions {
    /// Title text block.
    pub title: Option<Rect>,
    /// Message text block.
    pub message: Rect,
    /// Progress bar track.
    pub progress: Option<Rect>,
    /// Close button square.
    pub close_button: Option<Rect>,
}
