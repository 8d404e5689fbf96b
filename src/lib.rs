//! Auto-positioned, auto-closing splash windows.
//!
//! A splash is a small borderless, always-on-top frame showing a message
//! (optionally a title, a close button and a progress bar). It is placed on
//! one of nine screen anchors or at an explicit coordinate, can close itself
//! after a delay, and can be updated or closed from any thread.
//!
//! ```no_run
//! use std::time::Duration;
//! use splashscreen::{HeadlessToolkit, Splash, SplashConfig};
//!
//! # fn main() -> splashscreen::Result<()> {
//! let config = SplashConfig::new("Loading…")
//!     .placement_code("BR")
//!     .close_after(Duration::from_secs(3))
//!     .standalone_blocking(false);
//! let splash = Splash::open(config, HeadlessToolkit::new())?;
//! splash.update_message(" done", true)?;
//! splash.wait()?;
//! # Ok(())
//! # }
//! ```
//!
//! Windowing goes through the [`Toolkit`] trait: [`Win32Toolkit`] on Windows,
//! and [`HeadlessToolkit`] everywhere for tests and display-less runs.

pub mod appearance;
pub mod error;
pub mod screen;
pub mod settings;
pub mod splash;
pub mod toolkit;

pub use appearance::{Color, ColorSpec, Font, FontSpec, FontStyle};
pub use error::{Result, SplashError};
pub use screen::{Anchor, Placement, Point, Rect, Size};
pub use settings::{PlacementSpec, SettingsError, SplashSettings};
pub use splash::{
    CloseGuard, CloseReason, Launched, Mode, ProgressMode, ProgressSpec, Splash, SplashConfig,
    SplashState,
};
pub use toolkit::{HeadlessToolkit, MainWindow, Toolkit};
#[cfg(windows)]
pub use toolkit::Win32Toolkit;
