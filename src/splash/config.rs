use std::time::Duration;

use tracing::warn;

use super::progress::ProgressSpec;
use crate::{
    appearance::{ColorSpec, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND, FontSpec},
    error::{Result, SplashError},
    screen::Placement,
    toolkit::MainWindow,
};

/// Everything needed to open a splash.
///
/// Fields are public; the chainable setters below are a convenience for the
/// common `SplashConfig::new("Loading…").close_after_secs(3.0)` style.
#[derive(Clone, Debug)]
pub struct SplashConfig {
    /// Message shown in the frame. Must not be empty.
    pub message: String,
    /// Close automatically once this much time has passed.
    pub close_after: Option<Duration>,
    /// Where the frame goes on screen.
    pub placement: Placement,
    /// Font for the title and message.
    pub font: FontSpec,
    /// Frame background.
    pub background: ColorSpec,
    /// Text color.
    pub foreground: ColorSpec,
    /// Caller-owned window to attach to. Selects attached mode.
    pub main_window: Option<MainWindow>,
    /// Draw a close button.
    pub close_button: bool,
    /// Title shown above the message.
    pub title: Option<String>,
    /// Progress bar under the message.
    pub progress: Option<ProgressSpec>,
    /// In standalone mode, whether [`Splash::launch`](super::Splash::launch)
    /// blocks until the splash closes.
    pub standalone_blocking: bool,
    /// In attached mode, disable the main window while the splash is open.
    pub block_main: bool,
}

impl SplashConfig {
    /// A configuration with every option at its default.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            close_after: None,
            placement: Placement::default(),
            font: FontSpec::default(),
            background: DEFAULT_BACKGROUND.into(),
            foreground: DEFAULT_FOREGROUND.into(),
            main_window: None,
            close_button: false,
            title: None,
            progress: None,
            standalone_blocking: true,
            block_main: false,
        }
    }

    /// Close automatically after `after`.
    pub fn close_after(mut self, after: Duration) -> Self {
        self.close_after = (!after.is_zero()).then_some(after);
        self
    }

    /// Close automatically after `secs` seconds. Non-positive or non-finite
    /// values disable auto-close.
    pub fn close_after_secs(mut self, secs: f64) -> Self {
        self.close_after = if secs.is_finite() && secs > 0.0 {
            Some(Duration::from_secs_f64(secs))
        } else {
            warn!(secs, "ignoring non-positive close_after");
            None
        };
        self
    }

    /// Placement on screen.
    pub fn placement(mut self, placement: impl Into<Placement>) -> Self {
        self.placement = placement.into();
        self
    }

    /// Placement from a symbolic code such as `"TL"`; unknown codes mean `BR`.
    pub fn placement_code(self, code: &str) -> Self {
        self.placement(Placement::code(code))
    }

    /// Place the top-left corner at an explicit coordinate.
    pub fn at(self, x: i32, y: i32) -> Self {
        self.placement(Placement::at(x, y))
    }

    /// Font, as a `"family, size, style"` string or a triple.
    pub fn font(mut self, font: impl Into<FontSpec>) -> Self {
        self.font = font.into();
        self
    }

    /// Background color.
    pub fn background(mut self, color: impl Into<ColorSpec>) -> Self {
        self.background = color.into();
        self
    }

    /// Text color.
    pub fn foreground(mut self, color: impl Into<ColorSpec>) -> Self {
        self.foreground = color.into();
        self
    }

    /// Attach to a caller-owned window.
    pub fn main_window(mut self, main: MainWindow) -> Self {
        self.main_window = Some(main);
        self
    }

    /// Show or hide the close button.
    pub fn close_button(mut self, show: bool) -> Self {
        self.close_button = show;
        self
    }

    /// Title above the message. An empty title shows none.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.title = (!title.is_empty()).then_some(title);
        self
    }

    /// Add a progress bar.
    pub fn progress(mut self, progress: ProgressSpec) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Whether `launch` blocks in standalone mode.
    pub fn standalone_blocking(mut self, blocking: bool) -> Self {
        self.standalone_blocking = blocking;
        self
    }

    /// Whether to disable the main window while the splash is open.
    pub fn block_main(mut self, block: bool) -> Self {
        self.block_main = block;
        self
    }

    /// Check the parts of the configuration that are not silently corrected.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.message.is_empty() {
            return Err(SplashError::EmptyMessage);
        }
        if self.block_main && self.main_window.is_none() {
            warn!("block_main has no effect without a main window");
        }
        Ok(())
    }
}
