//! The host-thread half of a splash: owns the live window, applies queued
//! commands in order and drives the open → closed transition.

use std::{
    cell::RefCell,
    rc::Rc,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, mpsc::Receiver},
    time::{Duration, Instant},
};

use tracing::{debug, trace, warn};

use super::{config::SplashConfig, progress::Progress};
use crate::{
    appearance::{Color, ColorSpec, DEFAULT_BACKGROUND, DEFAULT_FOREGROUND},
    error::Result,
    screen::{Placement, Point, Rect, Size, layout},
    toolkit::{HostEvent, Look, MainWindow, SplashWindow, TimerId, Toolkit, Waker},
};

/// First delay of the indeterminate progress ticker.
const TICK_INTERVAL: Duration = Duration::from_millis(30);

/// Why a splash closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CloseReason {
    /// `close()` or `close_after(..)` was called.
    Requested,
    /// The configured `close_after` elapsed.
    AutoClose,
    /// The user clicked the close button.
    CloseButton,
    /// The host loop stopped, or the window was destroyed from outside,
    /// before anything else closed the splash.
    HostExited,
}

/// Work marshaled from a [`Splash`](super::Splash) handle onto the host thread.
#[derive(Debug)]
pub(crate) enum Command {
    Message { text: String, append: bool },
    Background(ColorSpec),
    StepProgress(f64),
    SetProgress(f64),
    Close { delay: Duration },
}

/// State visible from every thread.
#[derive(Debug, Clone)]
pub(crate) struct Status {
    /// An immediate close was requested; updates are refused from now on.
    pub closing: bool,
    /// Set once the window is gone.
    pub closed: Option<CloseReason>,
    pub message: String,
    pub background: Color,
    pub position: Point,
    pub progress: Option<f64>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    status: Mutex<Status>,
    changed: Condvar,
}

impl Shared {
    pub(crate) fn new(config: &SplashConfig) -> Self {
        Self {
            status: Mutex::new(Status {
                closing: false,
                closed: None,
                message: config.message.clone(),
                background: DEFAULT_BACKGROUND,
                position: Point::default(),
                progress: None,
            }),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }

    /// Whether updates are still accepted.
    pub(crate) fn is_accepting(&self) -> bool {
        let s = self.lock();
        !s.closing && s.closed.is_none()
    }

    /// Mark an immediate close as requested. False when one already was, or
    /// when the splash is already closed.
    pub(crate) fn request_close(&self) -> bool {
        let mut s = self.lock();
        if s.closing || s.closed.is_some() {
            return false;
        }
        s.closing = true;
        true
    }

    pub(crate) fn mark_closed(&self, reason: CloseReason) {
        let mut s = self.lock();
        s.closing = true;
        s.closed.get_or_insert(reason);
        self.changed.notify_all();
    }

    /// Block until closed, or until `timeout` passes.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> Option<CloseReason> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut s = self.lock();
        loop {
            if let Some(reason) = s.closed {
                return Some(reason);
            }
            s = match deadline {
                None => self.changed.wait(s).unwrap_or_else(PoisonError::into_inner),
                Some(at) => {
                    let left = at.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return None;
                    }
                    self.changed
                        .wait_timeout(s, left)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }
}

/// Owns the live window on the host thread.
pub(crate) struct Controller<T: Toolkit> {
    toolkit: T,
    window: Option<T::Window>,
    inbox: Receiver<Command>,
    shared: Arc<Shared>,
    placement: Placement,
    screen: Size,
    message: String,
    background: Color,
    progress: Option<Progress>,
    /// Main window disabled while the splash is open.
    blocked: Option<MainWindow>,
}

impl<T: Toolkit> Controller<T> {
    /// Build, measure, place and show the window on the current thread.
    ///
    /// The returned controller is also kept alive by the window's event
    /// handler until the window is destroyed.
    pub(crate) fn open(
        toolkit: T,
        config: &SplashConfig,
        inbox: Receiver<Command>,
        shared: Arc<Shared>,
    ) -> Result<(Rc<RefCell<Self>>, Arc<dyn Waker>)> {
        let font = config.font.resolve();
        let background = config.background.resolve(DEFAULT_BACKGROUND);
        let foreground = config.foreground.resolve(DEFAULT_FOREGROUND);
        let screen = toolkit.screen_size();
        let progress = config.progress.map(Progress::new);
        let blocked = config.main_window.filter(|_| config.block_main);

        let look = Look {
            title: config.title.clone(),
            message: config.message.clone(),
            wrap_width: layout::wrap_width(font.size, screen),
            font,
            background,
            foreground,
            close_button: config.close_button,
            progress: progress.as_ref().map(Progress::view),
            activate: blocked.is_some(),
        };
        let mut window = toolkit.create_window(&look, config.main_window)?;
        let size = window.measure();
        let origin = config.placement.resolve(size, screen);
        window.place(Rect::new(origin, size));

        if let Some(main) = blocked {
            toolkit.set_main_enabled(main, false);
        }
        if let Some(after) = config.close_after {
            window.start_timer(TimerId::AutoClose, after);
        }
        if progress.as_ref().is_some_and(Progress::is_indeterminate) {
            window.start_timer(TimerId::ProgressTick, TICK_INTERVAL);
        }
        let waker = window.waker();

        {
            let mut s = shared.lock();
            s.background = background;
            s.position = origin;
            s.progress = progress.as_ref().map(Progress::value);
        }
        debug!(?origin, ?size, attached = config.main_window.is_some(), "splash opened");

        let controller = Rc::new(RefCell::new(Self {
            toolkit,
            window: None,
            inbox,
            shared,
            placement: config.placement,
            screen,
            message: config.message.clone(),
            background,
            progress,
            blocked,
        }));
        let hook = Rc::clone(&controller);
        window.set_event_handler(Box::new(move |event| match hook.try_borrow_mut() {
            Ok(mut c) => c.on_event(event),
            Err(_) => warn!(?event, "re-entrant splash event dropped"),
        }));
        controller.borrow_mut().window = Some(window);
        Ok((controller, waker))
    }

    fn on_event(&mut self, event: HostEvent) {
        trace!(?event, "splash event");
        match event {
            HostEvent::Wake => self.drain(),
            HostEvent::Timer(TimerId::AutoClose) => self.finish(CloseReason::AutoClose),
            HostEvent::Timer(TimerId::DelayedClose) => self.finish(CloseReason::Requested),
            HostEvent::Timer(TimerId::ProgressTick) => self.tick(),
            HostEvent::CloseClicked => self.finish(CloseReason::CloseButton),
            HostEvent::Destroyed => self.finish(CloseReason::HostExited),
        }
    }

    /// Apply every queued command in arrival order.
    fn drain(&mut self) {
        while self.window.is_some() {
            match self.inbox.try_recv() {
                Ok(command) => self.apply(command),
                Err(_) => break,
            }
        }
    }

    fn apply(&mut self, command: Command) {
        trace!(?command, "applying");
        let Some(window) = self.window.as_mut() else {
            return;
        };
        match command {
            Command::Message { text, append } => {
                if append {
                    self.message.push_str(&text);
                } else {
                    self.message = text;
                }
                window.set_message(&self.message);
                self.shared.lock().message = self.message.clone();
                self.relayout();
            }
            Command::Background(spec) => {
                self.background = spec.resolve(self.background);
                window.set_background(self.background);
                self.shared.lock().background = self.background;
            }
            Command::StepProgress(amount) => self.update_progress(|p| p.step(amount)),
            Command::SetProgress(value) => self.update_progress(|p| p.set(value)),
            Command::Close { delay } if delay.is_zero() => self.finish(CloseReason::Requested),
            Command::Close { delay } => {
                window.stop_timer(TimerId::AutoClose);
                window.start_timer(TimerId::DelayedClose, delay);
                debug!(?delay, "splash close scheduled");
            }
        }
    }

    /// Re-measure after a content change and keep the frame on screen.
    fn relayout(&mut self) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        let size = window.measure();
        let origin = self.placement.resolve(size, self.screen);
        window.place(Rect::new(origin, size));
        self.shared.lock().position = origin;
    }

    fn update_progress(&mut self, f: impl FnOnce(&mut Progress)) {
        let (Some(window), Some(progress)) = (self.window.as_mut(), self.progress.as_mut()) else {
            warn!("no progress bar configured");
            return;
        };
        f(progress);
        window.set_progress(progress.view());
        self.shared.lock().progress = Some(progress.value());
    }

    fn tick(&mut self) {
        if let (Some(window), Some(progress)) = (self.window.as_mut(), self.progress.as_mut()) {
            progress.tick();
            window.set_progress(progress.view());
        }
    }

    /// Open → Closed. Idempotent.
    pub(crate) fn finish(&mut self, reason: CloseReason) {
        let Some(mut window) = self.window.take() else {
            return;
        };
        for timer in [TimerId::AutoClose, TimerId::DelayedClose, TimerId::ProgressTick] {
            window.stop_timer(timer);
        }
        window.destroy();
        if let Some(main) = self.blocked.take() {
            self.toolkit.set_main_enabled(main, true);
        }
        self.shared.mark_closed(reason);
        debug!(?reason, "splash closed");
    }
}
