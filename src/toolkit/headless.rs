//! A display-less toolkit.
//!
//! Each thread that hosts headless windows gets its own event queue and timer
//! heap, mirroring the per-thread message queues of native toolkits. Text is
//! measured with fixed per-point metrics, so layout is deterministic. Every
//! window publishes a [`WindowSnapshot`] of what it would currently show,
//! which the test suite and the demo binary read back.

use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, ThreadId},
    time::{Duration, Instant},
};

use tracing::{debug, trace};

use super::{EventHandler, HostEvent, Look, MainWindow, SplashWindow, TimerId, Toolkit, Waker};
use crate::{
    appearance::{Color, Font},
    screen::{Rect, Size, layout::Blocks},
    splash::progress::ProgressView,
};

/// Average glyph advance as a share of the point size.
const CHAR_WIDTH_RATIO: f64 = 0.6;
/// Line height as a share of the point size.
const LINE_HEIGHT_RATIO: f64 = 1.5;
/// Screen used when none is given.
const DEFAULT_SCREEN: Size = Size::new(1920, 1080);
/// Repeat interval of the progress ticker.
const TICK_INTERVAL: Duration = Duration::from_millis(30);

/// Identifier of a headless splash window.
pub type WindowId = u64;

/// What a headless window currently shows.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowSnapshot {
    /// Window id.
    pub id: WindowId,
    /// Title text, when shown.
    pub title: Option<String>,
    /// Message text.
    pub message: String,
    /// Font in use.
    pub font: Font,
    /// Background color.
    pub background: Color,
    /// Text color.
    pub foreground: Color,
    /// Whether a close button is drawn.
    pub close_button: bool,
    /// Progress bar state, when shown.
    pub progress: Option<ProgressView>,
    /// Frame on screen; `None` until first placed.
    pub frame: Option<Rect>,
    /// Owning main window.
    pub owner: Option<MainWindow>,
    /// Thread that created the window.
    pub host: ThreadId,
    /// Number of layout passes performed.
    pub layout_passes: usize,
    /// Whether the window has been torn down.
    pub destroyed: bool,
}

struct Record {
    snapshot: WindowSnapshot,
    events: Sender<Posted>,
}

struct MainRecord {
    thread: ThreadId,
    enabled: bool,
}

struct Display {
    screen: Size,
    next_id: AtomicU64,
    windows: Mutex<BTreeMap<WindowId, Record>>,
    mains: Mutex<HashMap<MainWindow, MainRecord>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Headless toolkit handle. Clones share one virtual display.
#[derive(Clone)]
pub struct HeadlessToolkit {
    display: Arc<Display>,
}

impl Default for HeadlessToolkit {
    fn default() -> Self {
        Self::with_screen(DEFAULT_SCREEN)
    }
}

impl HeadlessToolkit {
    /// A toolkit with a 1920×1080 screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// A toolkit with a screen of the given size.
    pub fn with_screen(screen: Size) -> Self {
        Self {
            display: Arc::new(Display {
                screen,
                next_id: AtomicU64::new(1),
                windows: Mutex::new(BTreeMap::new()),
                mains: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a main window whose event loop is the current thread.
    pub fn create_main_window(&self) -> MainWindow {
        let raw = self.display.next_id.fetch_add(1, Ordering::Relaxed);
        let main = MainWindow::from_raw(raw as isize);
        lock(&self.display.mains).insert(
            main,
            MainRecord {
                thread: thread::current().id(),
                enabled: true,
            },
        );
        main
    }

    /// Whether `main` currently accepts input; `None` for unknown windows.
    pub fn is_main_enabled(&self, main: MainWindow) -> Option<bool> {
        lock(&self.display.mains).get(&main).map(|m| m.enabled)
    }

    /// Snapshots of every window ever created, oldest first.
    pub fn windows(&self) -> Vec<WindowSnapshot> {
        lock(&self.display.windows)
            .values()
            .map(|r| r.snapshot.clone())
            .collect()
    }

    /// Snapshot of one window.
    pub fn window(&self, id: WindowId) -> Option<WindowSnapshot> {
        lock(&self.display.windows)
            .get(&id)
            .map(|r| r.snapshot.clone())
    }

    /// Snapshot of the most recently created window.
    pub fn latest(&self) -> Option<WindowSnapshot> {
        lock(&self.display.windows)
            .values()
            .next_back()
            .map(|r| r.snapshot.clone())
    }

    /// Simulate a click on a window's close button. Returns false when the
    /// window is unknown, already destroyed, or has no button.
    pub fn click_close(&self, id: WindowId) -> bool {
        let windows = lock(&self.display.windows);
        match windows.get(&id) {
            Some(r) if !r.snapshot.destroyed && r.snapshot.close_button => {
                r.events.send((id, HostEvent::CloseClicked)).is_ok()
            }
            _ => false,
        }
    }

    /// Dispatch queued events and due timers on the current thread without
    /// waiting. Returns how many were dispatched.
    pub fn drain(&self) -> usize {
        let mut n = 0;
        while step(Some(Instant::now())) {
            n += 1;
        }
        n
    }

    /// Run the current thread's loop for `duration`.
    pub fn run_for(&self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut n = 0;
        while Instant::now() < deadline {
            if step(Some(deadline)) {
                n += 1;
            }
        }
        n
    }

    /// Run the current thread's loop until `cond` holds or `timeout` passes.
    /// Returns whether `cond` held.
    pub fn run_until_timeout(&self, timeout: Duration, cond: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if cond() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            step(Some(deadline));
        }
    }

    fn update(&self, id: WindowId, f: impl FnOnce(&mut WindowSnapshot)) {
        if let Some(r) = lock(&self.display.windows).get_mut(&id) {
            f(&mut r.snapshot);
        }
    }
}

impl Toolkit for HeadlessToolkit {
    type Window = HeadlessWindow;

    fn screen_size(&self) -> Size {
        self.display.screen
    }

    fn create_window(
        &self,
        look: &Look,
        owner: Option<MainWindow>,
    ) -> anyhow::Result<HeadlessWindow> {
        let id = self.display.next_id.fetch_add(1, Ordering::Relaxed);
        let events = HOST.with(|h| h.borrow().tx.clone());
        let snapshot = WindowSnapshot {
            id,
            title: look.title.clone(),
            message: look.message.clone(),
            font: look.font.clone(),
            background: look.background,
            foreground: look.foreground,
            close_button: look.close_button,
            progress: look.progress,
            frame: None,
            owner,
            host: thread::current().id(),
            layout_passes: 0,
            destroyed: false,
        };
        lock(&self.display.windows).insert(
            id,
            Record {
                snapshot,
                events: events.clone(),
            },
        );
        debug!(id, "headless window created");
        Ok(HeadlessWindow {
            id,
            toolkit: self.clone(),
            look: look.clone(),
            events,
            destroyed: false,
        })
    }

    fn is_host_thread(&self, main: MainWindow) -> bool {
        lock(&self.display.mains)
            .get(&main)
            .is_some_and(|m| m.thread == thread::current().id())
    }

    fn set_main_enabled(&self, main: MainWindow, enabled: bool) {
        if let Some(m) = lock(&self.display.mains).get_mut(&main) {
            m.enabled = enabled;
        }
    }

    fn run_until(&self, done: &dyn Fn() -> bool) {
        while !done() {
            step(None);
        }
    }
}

/// A headless splash window.
pub struct HeadlessWindow {
    id: WindowId,
    toolkit: HeadlessToolkit,
    look: Look,
    events: Sender<Posted>,
    destroyed: bool,
}

impl HeadlessWindow {
    /// This window's id.
    pub fn id(&self) -> WindowId {
        self.id
    }

    fn blocks(&self) -> Blocks {
        Blocks {
            title: self
                .look
                .title
                .as_deref()
                .map(|t| text_block(t, &self.look.font, None)),
            message: text_block(&self.look.message, &self.look.font, Some(self.look.wrap_width)),
            close_button: self.look.close_button,
            progress: self.look.progress.is_some(),
        }
    }
}

impl SplashWindow for HeadlessWindow {
    fn set_event_handler(&mut self, handler: EventHandler) {
        let id = self.id;
        let previous = HOST.with(|h| h.borrow_mut().handlers.insert(id, Some(handler)));
        drop(previous);
    }

    fn measure(&mut self) -> Size {
        self.toolkit.update(self.id, |s| s.layout_passes += 1);
        self.blocks().frame_size()
    }

    fn place(&mut self, frame: Rect) {
        self.toolkit.update(self.id, |s| s.frame = Some(frame));
    }

    fn set_message(&mut self, text: &str) {
        self.look.message = text.to_string();
        self.toolkit.update(self.id, |s| s.message = text.to_string());
    }

    fn set_background(&mut self, color: Color) {
        self.look.background = color;
        self.toolkit.update(self.id, |s| s.background = color);
    }

    fn set_progress(&mut self, view: ProgressView) {
        self.look.progress = Some(view);
        self.toolkit.update(self.id, |s| s.progress = Some(view));
    }

    fn start_timer(&mut self, timer: TimerId, after: Duration) {
        let repeat = (timer == TimerId::ProgressTick).then_some(TICK_INTERVAL);
        let id = self.id;
        HOST.with(|h| h.borrow_mut().schedule(id, timer, after, repeat));
    }

    fn stop_timer(&mut self, timer: TimerId) {
        let id = self.id;
        HOST.with(|h| h.borrow_mut().cancel(id, Some(timer)));
    }

    fn waker(&self) -> Arc<dyn Waker> {
        Arc::new(HeadlessWaker {
            id: self.id,
            events: self.events.clone(),
        })
    }

    fn destroy(&mut self) {
        if std::mem::replace(&mut self.destroyed, true) {
            return;
        }
        let id = self.id;
        // The handler may own the controller that owns this window; drop it
        // only after the loop state is released.
        let handler = HOST
            .try_with(|h| {
                let mut h = h.borrow_mut();
                h.cancel(id, None);
                h.handlers.remove(&id)
            })
            .ok()
            .flatten();
        drop(handler);
        self.toolkit.update(id, |s| s.destroyed = true);
        debug!(id, "headless window destroyed");
    }
}

impl Drop for HeadlessWindow {
    fn drop(&mut self) {
        self.destroy();
    }
}

struct HeadlessWaker {
    id: WindowId,
    events: Sender<Posted>,
}

impl Waker for HeadlessWaker {
    fn wake(&self) {
        let _ = self.events.send((self.id, HostEvent::Wake));
    }
}

fn text_block(text: &str, font: &Font, wrap: Option<i32>) -> Size {
    let size = f64::from(font.size);
    let char_width = ((size * CHAR_WIDTH_RATIO).ceil() as i32).max(1);
    let line_height = ((size * LINE_HEIGHT_RATIO).ceil() as i32).max(1);
    let per_line = wrap.map(|w| (w / char_width).max(1) as usize);
    let mut lines = 0;
    let mut widest = 0;
    for line in text.split('\n') {
        let chars = line.chars().count();
        match per_line {
            Some(per) => {
                lines += chars.div_ceil(per).max(1);
                widest = widest.max(chars.min(per));
            }
            None => {
                lines += 1;
                widest = widest.max(chars);
            }
        }
    }
    let extent = |count: usize, unit: i32| {
        i32::try_from(count).map_or(i32::MAX, |n| n.saturating_mul(unit))
    };
    Size::new(extent(widest, char_width), extent(lines, line_height))
}

// ─── Per-thread event loop ──────────────────────────────────────────────────

type Posted = (WindowId, HostEvent);

struct Pending {
    window: WindowId,
    timer: TimerId,
    repeat: Option<Duration>,
}

struct HostLoop {
    tx: Sender<Posted>,
    rx: Receiver<Posted>,
    timers: BTreeMap<(Instant, u64), Pending>,
    seq: u64,
    handlers: HashMap<WindowId, Option<EventHandler>>,
}

impl HostLoop {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            timers: BTreeMap::new(),
            seq: 0,
            handlers: HashMap::new(),
        }
    }

    fn schedule(&mut self, window: WindowId, timer: TimerId, after: Duration, repeat: Option<Duration>) {
        self.cancel(window, Some(timer));
        self.seq += 1;
        self.timers.insert(
            (Instant::now() + after, self.seq),
            Pending {
                window,
                timer,
                repeat,
            },
        );
    }

    fn cancel(&mut self, window: WindowId, timer: Option<TimerId>) {
        self.timers
            .retain(|_, p| p.window != window || timer.is_some_and(|t| t != p.timer));
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.timers.keys().next().map(|(at, _)| *at)
    }

    fn pop_due(&mut self, now: Instant) -> Option<Posted> {
        let key = *self.timers.keys().next().filter(|(at, _)| *at <= now)?;
        let pending = self.timers.remove(&key)?;
        let posted = (pending.window, HostEvent::Timer(pending.timer));
        if let Some(every) = pending.repeat {
            self.seq += 1;
            self.timers.insert((now + every, self.seq), pending);
        }
        Some(posted)
    }
}

thread_local! {
    static HOST: RefCell<HostLoop> = RefCell::new(HostLoop::new());
}

/// Dispatch one due timer or posted event, waiting at most until `deadline`
/// (forever when `None`). Returns whether something was dispatched.
fn step(deadline: Option<Instant>) -> bool {
    let now = Instant::now();
    if let Some((id, event)) = HOST.with(|h| h.borrow_mut().pop_due(now)) {
        dispatch(id, event);
        return true;
    }
    let posted = HOST.with(|h| {
        let h = h.borrow();
        let wake_at = match (h.next_deadline(), deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match wake_at {
            Some(at) => h.rx.recv_timeout(at.saturating_duration_since(now)).ok(),
            None => h.rx.recv().ok(),
        }
    });
    match posted {
        Some((id, event)) => {
            dispatch(id, event);
            true
        }
        None => false,
    }
}

fn dispatch(id: WindowId, event: HostEvent) {
    let handler = HOST.with(|h| h.borrow_mut().handlers.get_mut(&id).and_then(Option::take));
    let Some(mut handler) = handler else {
        trace!(id, ?event, "event for a window without a handler");
        return;
    };
    handler(event);
    let leftover = HOST.with(|h| {
        let mut h = h.borrow_mut();
        match h.handlers.get_mut(&id) {
            Some(slot) if slot.is_none() => {
                *slot = Some(handler);
                None
            }
            _ => Some(handler),
        }
    });
    drop(leftover);
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::appearance::{DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};

    fn look(message: &str) -> Look {
        Look {
            title: None,
            message: message.to_string(),
            font: Font::default(),
            background: DEFAULT_BACKGROUND,
            foreground: DEFAULT_FOREGROUND,
            close_button: false,
            wrap_width: 396,
            progress: None,
            activate: false,
        }
    }

    #[test]
    fn text_wraps_at_wrap_width() {
        let font = Font::default();
        // 18pt: 11px per char, 27px per line; 396px fits 36 chars.
        assert_eq!(text_block("hello", &font, Some(396)), Size::new(55, 27));
        let long = "x".repeat(80);
        assert_eq!(text_block(&long, &font, Some(396)), Size::new(396, 81));
        assert_eq!(text_block("a\nbb", &font, None), Size::new(22, 54));
    }

    #[test]
    fn timers_fire_in_order_and_cancel() {
        let tk = HeadlessToolkit::new();
        let mut w = tk.create_window(&look("hi"), None).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        w.set_event_handler(Box::new(move |e| sink.borrow_mut().push(e)));
        w.start_timer(TimerId::DelayedClose, Duration::from_millis(40));
        w.start_timer(TimerId::AutoClose, Duration::from_millis(10));
        w.start_timer(TimerId::ProgressTick, Duration::from_millis(5));
        w.stop_timer(TimerId::ProgressTick);
        tk.run_for(Duration::from_millis(80));
        assert_eq!(
            *seen.borrow(),
            vec![
                HostEvent::Timer(TimerId::AutoClose),
                HostEvent::Timer(TimerId::DelayedClose)
            ]
        );
        w.destroy();
    }

    #[test]
    fn waker_crosses_threads() {
        let tk = HeadlessToolkit::new();
        let mut w = tk.create_window(&look("hi"), None).unwrap();
        let wakes = Rc::new(Cell::new(0));
        let sink = Rc::clone(&wakes);
        w.set_event_handler(Box::new(move |_| sink.set(sink.get() + 1)));
        let waker = w.waker();
        thread::spawn(move || waker.wake()).join().unwrap();
        assert!(tk.run_until_timeout(Duration::from_secs(2), || wakes.get() == 1));
        w.destroy();
        assert!(tk.latest().unwrap().destroyed);
    }

    #[test]
    fn main_windows_track_their_thread() {
        let tk = HeadlessToolkit::new();
        let main = tk.create_main_window();
        assert!(tk.is_host_thread(main));
        let other = tk.clone();
        assert!(!thread::spawn(move || other.is_host_thread(main)).join().unwrap());
        tk.set_main_enabled(main, false);
        assert_eq!(tk.is_main_enabled(main), Some(false));
    }
}
