use std::{
    ops::Deref,
    sync::{
        Arc, Mutex, PoisonError,
        mpsc::{self, Sender},
    },
    thread::{self, JoinHandle, ThreadId},
    time::Duration,
};

use tracing::{debug, warn};

use super::{
    config::SplashConfig,
    controller::{CloseReason, Command, Controller, Shared},
};
use crate::{
    appearance::{Color, ColorSpec},
    error::{Result, SplashError},
    screen::Point,
    toolkit::{MainWindow, Toolkit, Waker},
};

/// How often [`Splash::wait`] checks on a standalone host thread.
const WORKER_POLL: Duration = Duration::from_millis(100);

/// Where a splash's event loop runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// On the caller's main window thread, driven by the caller's loop.
    Attached,
    /// On a loop the splash runs itself.
    Standalone,
}

/// Lifecycle state of a splash. Only ever moves from `Open` to `Closed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplashState {
    /// The window is up.
    Open,
    /// The window is gone; a new [`Splash`] is needed to show another.
    Closed,
}

/// Outcome of [`Splash::launch`].
#[derive(Debug)]
pub enum Launched {
    /// The splash is open and the caller got a handle.
    Running(Splash),
    /// `launch` blocked until the splash closed.
    Finished(CloseReason),
}

/// Handle to a splash window.
///
/// Every method may be called from any thread. Updates are queued and applied
/// on the host thread in call order. Dropping the handle leaves the window up;
/// use [`Splash::close_on_drop`] to tie the window to a scope.
pub struct Splash {
    commands: Sender<Command>,
    waker: Arc<dyn Waker>,
    shared: Arc<Shared>,
    host: ThreadId,
    mode: Mode,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Splash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Splash")
            .field("mode", &self.mode)
            .field("host", &self.host)
            .field("state", &self.state())
            .finish()
    }
}

impl Splash {
    /// Open a splash without blocking.
    ///
    /// With a main window configured the splash is attached: it is created on
    /// the calling thread, which must be the main window's thread, and is
    /// driven by the caller's event loop. Otherwise a dedicated host thread is
    /// spawned and this returns once the window is on screen.
    pub fn open<T: Toolkit>(config: SplashConfig, toolkit: T) -> Result<Self> {
        config.validate()?;
        match config.main_window {
            Some(main) => Self::attach(config, toolkit, main),
            None => Self::spawn(config, toolkit),
        }
    }

    /// Show a standalone splash and run its loop on the calling thread until
    /// it closes.
    pub fn show_blocking<T: Toolkit>(config: SplashConfig, toolkit: T) -> Result<CloseReason> {
        Self::show_blocking_with(config, toolkit, drop)
    }

    /// Like [`Splash::show_blocking`], handing `setup` a handle before the
    /// loop starts so other threads can update or close the splash.
    pub fn show_blocking_with<T: Toolkit>(
        config: SplashConfig,
        toolkit: T,
        setup: impl FnOnce(Splash),
    ) -> Result<CloseReason> {
        config.validate()?;
        if config.main_window.is_some() {
            return Err(SplashError::BlockingAttached);
        }
        let (commands, inbox) = mpsc::channel();
        let shared = Arc::new(Shared::new(&config));
        let _exit = HostExit(Arc::clone(&shared));
        let (controller, waker) =
            Controller::open(toolkit.clone(), &config, inbox, Arc::clone(&shared))?;
        setup(Self {
            commands,
            waker,
            shared: Arc::clone(&shared),
            host: thread::current().id(),
            mode: Mode::Standalone,
            worker: Mutex::new(None),
        });
        run_host(&toolkit, &controller, &shared);
        Ok(shared.wait(Some(Duration::ZERO)).unwrap_or(CloseReason::HostExited))
    }

    /// Open according to the configuration: attached when a main window is
    /// set, otherwise blocking or not per `standalone_blocking`.
    pub fn launch<T: Toolkit>(config: SplashConfig, toolkit: T) -> Result<Launched> {
        if config.main_window.is_none() && config.standalone_blocking {
            Self::show_blocking(config, toolkit).map(Launched::Finished)
        } else {
            Self::open(config, toolkit).map(Launched::Running)
        }
    }

    fn attach<T: Toolkit>(config: SplashConfig, toolkit: T, main: MainWindow) -> Result<Self> {
        if !toolkit.is_host_thread(main) {
            return Err(SplashError::WrongThread);
        }
        let (commands, inbox) = mpsc::channel();
        let shared = Arc::new(Shared::new(&config));
        // The window's event handler keeps the controller alive from here on.
        let (_controller, waker) = Controller::open(toolkit, &config, inbox, Arc::clone(&shared))?;
        Ok(Self {
            commands,
            waker,
            shared,
            host: thread::current().id(),
            mode: Mode::Attached,
            worker: Mutex::new(None),
        })
    }

    fn spawn<T: Toolkit>(config: SplashConfig, toolkit: T) -> Result<Self> {
        let (commands, inbox) = mpsc::channel();
        let shared = Arc::new(Shared::new(&config));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<Arc<dyn Waker>>>();
        let host_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("splash-host".into())
            .spawn(move || {
                let _exit = HostExit(Arc::clone(&host_shared));
                match Controller::open(toolkit.clone(), &config, inbox, Arc::clone(&host_shared)) {
                    Ok((controller, waker)) => {
                        let _ = ready_tx.send(Ok(waker));
                        run_host(&toolkit, &controller, &host_shared);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(anyhow::Error::from)?;
        let host = worker.thread().id();
        let waker = match ready_rx.recv() {
            Ok(Ok(waker)) => waker,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => return Err(SplashError::HostGone),
        };
        Ok(Self {
            commands,
            waker,
            shared,
            host,
            mode: Mode::Standalone,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Replace the message, or append to it (no separator is added).
    pub fn update_message(&self, text: impl Into<String>, append: bool) -> Result<()> {
        self.send(Command::Message {
            text: text.into(),
            append,
        })
    }

    /// Change the background. Invalid colors keep the current background.
    pub fn update_color(&self, color: impl Into<ColorSpec>) -> Result<()> {
        self.send(Command::Background(color.into()))
    }

    /// Advance the progress bar by `amount`.
    pub fn step_progress(&self, amount: f64) -> Result<()> {
        self.send(Command::StepProgress(amount))
    }

    /// Set the progress bar to `value`.
    pub fn set_progress(&self, value: f64) -> Result<()> {
        self.send(Command::SetProgress(value))
    }

    /// Close on the host's next turn. Updates are refused from now on.
    /// Closing a closed splash does nothing.
    pub fn close(&self) {
        self.close_after(Duration::ZERO);
    }

    /// Close once `delay` has passed, replacing any pending auto-close. A zero
    /// delay behaves like [`Splash::close`].
    pub fn close_after(&self, delay: Duration) {
        let accepted = if delay.is_zero() {
            self.shared.request_close()
        } else {
            self.shared.is_accepting()
        };
        if accepted {
            let _ = self.post(Command::Close { delay });
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        if !self.shared.is_accepting() {
            return Err(SplashError::Disposed);
        }
        self.post(command)
    }

    fn post(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SplashError::Disposed)?;
        self.waker.wake();
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SplashState {
        if self.shared.is_closed() {
            SplashState::Closed
        } else {
            SplashState::Open
        }
    }

    /// Whether the window is still up.
    pub fn is_open(&self) -> bool {
        self.state() == SplashState::Open
    }

    /// Message as last applied on the host thread.
    pub fn message(&self) -> String {
        self.shared.lock().message.clone()
    }

    /// Background as last applied on the host thread.
    pub fn background(&self) -> Color {
        self.shared.lock().background
    }

    /// Top-left corner of the frame on screen.
    pub fn position(&self) -> Point {
        self.shared.lock().position
    }

    /// Progress value as last applied, when a bar is shown.
    pub fn progress(&self) -> Option<f64> {
        self.shared.lock().progress
    }

    /// Why the splash closed, once it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.shared.lock().closed
    }

    /// The thread that owns the live window.
    pub fn host_thread(&self) -> ThreadId {
        self.host
    }

    /// Attached or standalone.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Block until the splash closes and its host thread (if any) has exited.
    ///
    /// Fails with [`SplashError::WrongThread`] on the host thread of an
    /// attached splash, whose loop could not run while waiting.
    pub fn wait(&self) -> Result<CloseReason> {
        if self.mode == Mode::Attached && thread::current().id() == self.host {
            return Err(SplashError::WrongThread);
        }
        let reason = loop {
            if let Some(reason) = self.shared.wait(Some(WORKER_POLL)) {
                break reason;
            }
            if self.worker_finished() {
                break self.shared.wait(Some(Duration::ZERO)).unwrap_or(CloseReason::HostExited);
            }
        };
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
        Ok(reason)
    }

    fn worker_finished(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(JoinHandle::is_finished)
    }

    /// Block until the splash closes or `timeout` passes.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CloseReason> {
        self.shared.wait(Some(timeout))
    }

    /// Close the splash when the returned guard is dropped.
    pub fn close_on_drop(self) -> CloseGuard {
        CloseGuard(self)
    }
}

/// Marks the splash closed when the host thread leaves, including by unwinding.
struct HostExit(Arc<Shared>);

impl Drop for HostExit {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("splash host panicked");
        }
        self.0.mark_closed(CloseReason::HostExited);
    }
}

/// Pump the host loop until the splash closes, then make sure it is closed.
fn run_host<T: Toolkit>(
    toolkit: &T,
    controller: &std::rc::Rc<std::cell::RefCell<Controller<T>>>,
    shared: &Shared,
) {
    toolkit.run_until(&|| shared.is_closed());
    if let Ok(mut c) = controller.try_borrow_mut() {
        c.finish(CloseReason::HostExited);
    }
    debug!("splash host loop finished");
}

/// Closes its splash when dropped.
#[derive(Debug)]
pub struct CloseGuard(Splash);

impl Deref for CloseGuard {
    type Target = Splash;

    fn deref(&self) -> &Splash {
        &self.0
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}
