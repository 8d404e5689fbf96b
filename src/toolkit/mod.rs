//! The seam between the splash state machine and a windowing toolkit.
//!
//! A toolkit supplies a top-level window primitive, a way to measure and
//! place it, timers, a cross-thread wakeup and an event pump. Everything a
//! [`SplashWindow`] does happens on the thread that created it (its host
//! thread); only its [`Waker`] may be used from elsewhere.

use std::{sync::Arc, time::Duration};

use raw_window_handle::{HasWindowHandle, RawWindowHandle};

use crate::{
    appearance::{Color, Font},
    error::{Result, SplashError},
    screen::{Rect, Size},
    splash::progress::ProgressView,
};

pub mod headless;
#[cfg(windows)]
pub mod win32;

pub use headless::HeadlessToolkit;
#[cfg(windows)]
pub use win32::Win32Toolkit;

/// Something the toolkit reports to a live splash on its host thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// Commands may be waiting in the splash's queue.
    Wake,
    /// A timer started with [`SplashWindow::start_timer`] elapsed.
    Timer(TimerId),
    /// The user clicked the close button or used the platform close gesture.
    CloseClicked,
    /// The window was torn down from outside, for example with its owner.
    Destroyed,
}

/// Timers a splash runs on its host loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerId {
    /// The configured `close_after` elapsed.
    AutoClose,
    /// A `close_after(delay)` request elapsed.
    DelayedClose,
    /// Advance the indeterminate progress marquee.
    ProgressTick,
}

impl TimerId {
    /// Non-zero numeric id, usable as a native timer id.
    pub fn raw(self) -> usize {
        match self {
            Self::AutoClose => 1,
            Self::DelayedClose => 2,
            Self::ProgressTick => 3,
        }
    }

    /// Inverse of [`TimerId::raw`].
    pub fn from_raw(raw: usize) -> Option<Self> {
        match raw {
            1 => Some(Self::AutoClose),
            2 => Some(Self::DelayedClose),
            3 => Some(Self::ProgressTick),
            _ => None,
        }
    }
}

/// Callback the toolkit invokes on the host thread.
pub type EventHandler = Box<dyn FnMut(HostEvent)>;

/// Nudges a host loop from any thread so it delivers [`HostEvent::Wake`].
pub trait Waker: Send + Sync {
    /// Request a wake. Wakes on a window that is already gone are dropped.
    fn wake(&self);
}

/// Everything needed to build and paint a splash frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Look {
    /// Optional title above the message.
    pub title: Option<String>,
    /// Message text.
    pub message: String,
    /// Font for both title and message.
    pub font: Font,
    /// Frame background.
    pub background: Color,
    /// Text and glyph color.
    pub foreground: Color,
    /// Draw a close button in the top-right corner.
    pub close_button: bool,
    /// Width at which the message wraps.
    pub wrap_width: i32,
    /// Initial progress bar state, when a bar is shown.
    pub progress: Option<ProgressView>,
    /// Take focus when shown instead of staying inactive.
    pub activate: bool,
}

/// A live splash window, confined to its host thread.
pub trait SplashWindow {
    /// Install the callback that receives this window's [`HostEvent`]s.
    fn set_event_handler(&mut self, handler: EventHandler);

    /// Force a layout pass and return the frame size the content needs,
    /// minimums included.
    fn measure(&mut self) -> Size;

    /// Move and resize the frame, showing it if it is still hidden.
    fn place(&mut self, frame: Rect);

    /// Replace the message text.
    fn set_message(&mut self, text: &str);

    /// Repaint with a new background.
    fn set_background(&mut self, color: Color);

    /// Repaint the progress bar.
    fn set_progress(&mut self, view: ProgressView);

    /// Start (or restart) `timer` to fire once after `after`; the progress
    /// ticker repeats until stopped.
    fn start_timer(&mut self, timer: TimerId, after: Duration);

    /// Cancel `timer` if it is pending.
    fn stop_timer(&mut self, timer: TimerId);

    /// A thread-safe way to deliver [`HostEvent::Wake`] to this window.
    fn waker(&self) -> Arc<dyn Waker>;

    /// Tear the window down. Further calls are ignored.
    fn destroy(&mut self);
}

/// A windowing toolkit able to host splash windows.
pub trait Toolkit: Clone + Send + 'static {
    /// The toolkit's window type.
    type Window: SplashWindow + 'static;

    /// Size of the screen the splash is placed on.
    fn screen_size(&self) -> Size;

    /// Create a hidden splash window on the current thread, owned by `owner`
    /// when one is given.
    fn create_window(&self, look: &Look, owner: Option<MainWindow>)
    -> anyhow::Result<Self::Window>;

    /// Whether the current thread is the one that runs `main`'s event loop.
    fn is_host_thread(&self, main: MainWindow) -> bool;

    /// Enable or disable input to the caller's main window.
    fn set_main_enabled(&self, main: MainWindow, enabled: bool);

    /// Pump the current thread's event loop until `done` returns true.
    fn run_until(&self, done: &dyn Fn() -> bool);
}

/// Non-owning handle to a caller-owned top-level window.
///
/// The value is the toolkit's native handle (an `HWND` on Windows). The
/// splash never destroys it; it only enables/disables it and uses it as the
/// owner of the splash frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MainWindow(isize);

impl MainWindow {
    /// Wrap a raw native handle.
    pub const fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    /// The raw native handle.
    pub const fn raw(self) -> isize {
        self.0
    }

    /// Extract the native handle of a window created by another library
    /// (for example `winit`).
    pub fn from_window(window: &impl HasWindowHandle) -> Result<Self> {
        match window.window_handle()?.as_raw() {
            RawWindowHandle::Win32(h) => Ok(Self(h.hwnd.get())),
            _ => Err(SplashError::UnsupportedWindow),
        }
    }
}

