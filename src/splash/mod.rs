//! The splash lifecycle: configuration, the host-thread controller and the
//! thread-safe handle callers hold.

pub mod config;
pub(crate) mod controller;
mod handle;
pub mod progress;

pub use config::SplashConfig;
pub use controller::CloseReason;
pub use handle::{CloseGuard, Launched, Mode, Splash, SplashState};
pub use progress::{ProgressMode, ProgressSpec, ProgressView};
