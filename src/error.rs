use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the splash crate.
pub type Result<T> = StdResult<T, SplashError>;

/// Errors surfaced to callers of the splash API.
///
/// Malformed appearance or placement input never shows up here: it is
/// corrected to a default and logged instead.
#[derive(Debug, Error)]
pub enum SplashError {
    /// The configuration carried an empty message.
    #[error("splash message cannot be empty")]
    EmptyMessage,

    /// The splash has been closed (or an immediate close was requested) and
    /// can no longer be updated.
    #[error("splash window has been closed")]
    Disposed,

    /// Attached mode was requested from a thread that does not own the main window.
    #[error("an attached splash must be opened on the main window's thread")]
    WrongThread,

    /// Blocking display was requested for a splash configured with a main window.
    #[error("blocking display is only available in standalone mode")]
    BlockingAttached,

    /// The dedicated host thread exited before reporting an open window.
    #[error("splash host thread exited before the window opened")]
    HostGone,

    /// The supplied main window is not a kind of window this toolkit can attach to.
    #[error("unsupported main window handle")]
    UnsupportedWindow,

    /// The main window could not hand out a raw handle.
    #[error("main window handle unavailable: {0}")]
    WindowHandle(#[from] raw_window_handle::HandleError),

    /// Failure reported by the windowing toolkit.
    #[error("toolkit error: {0}")]
    Toolkit(#[from] anyhow::Error),
}
