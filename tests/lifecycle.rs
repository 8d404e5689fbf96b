//! Splash lifecycle driven through the headless toolkit.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use splashscreen::{
    CloseReason, Color, Font, HeadlessToolkit, Mode, Point, ProgressMode, ProgressSpec, Size,
    Splash, SplashConfig, SplashError, SplashState,
    toolkit::{Look, MainWindow, Toolkit},
};

const PATIENCE: Duration = Duration::from_secs(3);

/// Poll `cond` until it holds or `PATIENCE` runs out.
fn eventually(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + PATIENCE;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn standalone(message: &str) -> SplashConfig {
    SplashConfig::new(message).standalone_blocking(false)
}

#[test]
fn append_concatenates_without_separator() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(standalone("a"), tk.clone()).unwrap();
    assert_eq!(splash.mode(), Mode::Standalone);
    assert_ne!(splash.host_thread(), thread::current().id());

    splash.update_message("b", true).unwrap();
    assert!(eventually(|| splash.message() == "ab"));
    assert_eq!(tk.latest().unwrap().message, "ab");

    splash.update_message("replaced", false).unwrap();
    assert!(eventually(|| splash.message() == "replaced"));

    splash.close();
    assert_eq!(splash.wait().unwrap(), CloseReason::Requested);
}

#[test]
fn updates_after_close_are_refused() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(standalone("hello"), tk.clone()).unwrap();
    splash.close();
    // Refused as soon as the close is requested, before the host gets to it.
    assert!(matches!(
        splash.update_message("late", true),
        Err(SplashError::Disposed)
    ));
    assert_eq!(splash.wait().unwrap(), CloseReason::Requested);
    assert_eq!(splash.state(), SplashState::Closed);
    assert!(matches!(
        splash.update_message("later", false),
        Err(SplashError::Disposed)
    ));
    assert!(matches!(
        splash.update_color("red"),
        Err(SplashError::Disposed)
    ));
    assert!(matches!(splash.step_progress(1.0), Err(SplashError::Disposed)));
    assert!(tk.latest().unwrap().destroyed);
}

#[test]
fn closing_twice_is_a_no_op() {
    let splash = Splash::open(standalone("twice"), HeadlessToolkit::new()).unwrap();
    splash.close();
    splash.close();
    assert_eq!(splash.wait().unwrap(), CloseReason::Requested);
    splash.close();
    splash.close_after(Duration::from_millis(10));
    assert_eq!(splash.close_reason(), Some(CloseReason::Requested));
}

#[test]
fn auto_close_fires_after_its_delay() {
    let started = Instant::now();
    let splash = Splash::open(
        standalone("auto").close_after(Duration::from_secs(1)),
        HeadlessToolkit::new(),
    )
    .unwrap();
    assert!(splash.is_open());
    assert_eq!(splash.wait().unwrap(), CloseReason::AutoClose);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(950), "closed after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(1800), "closed after {elapsed:?}");
}

#[test]
fn early_close_cancels_auto_close() {
    let started = Instant::now();
    let splash = Splash::open(
        standalone("early").close_after(Duration::from_secs(1)),
        HeadlessToolkit::new(),
    )
    .unwrap();
    thread::sleep(Duration::from_millis(500));
    splash.close();
    assert_eq!(splash.wait().unwrap(), CloseReason::Requested);
    assert!(started.elapsed() < Duration::from_millis(950));
    thread::sleep(Duration::from_millis(700));
    assert_eq!(splash.close_reason(), Some(CloseReason::Requested));
}

#[test]
fn delayed_close_replaces_auto_close() {
    let started = Instant::now();
    let splash = Splash::open(
        standalone("delayed").close_after(Duration::from_millis(300)),
        HeadlessToolkit::new(),
    )
    .unwrap();
    splash.close_after(Duration::from_millis(700));
    // Still accepting updates until the delay runs out.
    splash.update_message("still here", false).unwrap();
    assert_eq!(splash.wait().unwrap(), CloseReason::Requested);
    assert!(started.elapsed() >= Duration::from_millis(650));
    assert_eq!(splash.message(), "still here");
}

#[test]
fn default_placement_is_bottom_right() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(standalone("a"), tk.clone()).unwrap();
    // A one-letter message is well under the 200×100 minimum frame.
    assert_eq!(splash.position(), Point::new(1920 - 200 - 10, 1080 - 100 - 50));
    let frame = tk.latest().unwrap().frame.unwrap();
    assert_eq!(frame.size, Size::new(200, 100));
    splash.close();
    splash.wait().unwrap();
}

#[test]
fn placement_code_and_coordinates() {
    let tk = HeadlessToolkit::new();
    let top_left = Splash::open(standalone("tl").placement_code("tl"), tk.clone()).unwrap();
    assert_eq!(top_left.position(), Point::new(10, 10));
    top_left.close();

    let bogus = Splash::open(standalone("zz").placement_code("ZZ"), tk.clone()).unwrap();
    assert_eq!(bogus.position(), Point::new(1710, 930));
    bogus.close();

    let off_screen = Splash::open(standalone("far").at(-50, 5000), tk.clone()).unwrap();
    assert_eq!(off_screen.position(), Point::new(0, 1080 - 100));
    off_screen.close();

    for s in [top_left, bogus, off_screen] {
        s.wait().unwrap();
    }
}

#[test]
fn message_change_re_lays_out_on_screen() {
    let tk = HeadlessToolkit::with_screen(Size::new(1024, 768));
    let splash = Splash::open(standalone("short"), tk.clone()).unwrap();
    let before = tk.latest().unwrap();
    splash
        .update_message("a much longer message ".repeat(20), false)
        .unwrap();
    assert!(eventually(|| tk.latest().unwrap().layout_passes == 2));

    let after = tk.latest().unwrap();
    let frame = after.frame.unwrap();
    assert!(frame.size.height > before.frame.unwrap().size.height);
    assert!(frame.origin.x >= 0 && frame.right() <= 1024);
    assert!(frame.origin.y >= 0 && frame.bottom() <= 768);
    assert_eq!(splash.position(), frame.origin);
    splash.close();
    splash.wait().unwrap();
}

#[test]
fn background_updates_and_invalid_colors() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(standalone("colors").background("#102030"), tk.clone()).unwrap();
    assert_eq!(splash.background(), Color::rgb(0x10, 0x20, 0x30));

    splash.update_color((255, 87, 51)).unwrap();
    assert!(eventually(|| splash.background() == Color::rgb(255, 87, 51)));

    // Invalid input keeps the current color rather than failing.
    splash.update_color("not-a-color").unwrap();
    splash.update_message("sync", false).unwrap();
    assert!(eventually(|| splash.message() == "sync"));
    assert_eq!(splash.background(), Color::rgb(255, 87, 51));
    assert_eq!(tk.latest().unwrap().background, Color::rgb(255, 87, 51));

    splash.close();
    splash.wait().unwrap();
}

#[test]
fn invalid_appearance_falls_back_to_defaults() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(
        standalone("fallbacks")
            .background((300, 0, 0))
            .font("Arial, notanumber, bold"),
        tk.clone(),
    )
    .unwrap();
    let snapshot = tk.latest().unwrap();
    assert_eq!(snapshot.background.hex(), "#00538F");
    assert_eq!(snapshot.font.family, "Calibri");
    assert_eq!(snapshot.font.size, 18);
    splash.close();
    splash.wait().unwrap();
}

#[test]
fn progress_steps_stop_short_of_max() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(
        standalone("working").progress(ProgressSpec {
            max: 10.0,
            mode: ProgressMode::Determinate,
        }),
        tk.clone(),
    )
    .unwrap();
    assert_eq!(splash.progress(), Some(0.0));
    assert_eq!(tk.latest().unwrap().frame.unwrap().size.height, 150);

    splash.step_progress(3.0).unwrap();
    splash.step_progress(3.0).unwrap();
    assert!(eventually(|| splash.progress() == Some(6.0)));
    splash.step_progress(20.0).unwrap();
    assert!(eventually(|| splash.progress().is_some_and(|v| v > 9.9)));
    assert!(splash.progress().unwrap() < 10.0);
    assert!(tk.latest().unwrap().progress.unwrap().fraction < 1.0);

    splash.set_progress(2.5).unwrap();
    assert!(eventually(|| splash.progress() == Some(2.5)));
    splash.close();
    splash.wait().unwrap();
}

#[test]
fn indeterminate_progress_animates() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(
        standalone("spinning").progress(ProgressSpec {
            mode: ProgressMode::Indeterminate,
            ..Default::default()
        }),
        tk.clone(),
    )
    .unwrap();
    assert!(eventually(|| {
        tk.latest()
            .and_then(|s| s.progress)
            .is_some_and(|p| p.phase > 0.0)
    }));
    splash.close();
    splash.wait().unwrap();
}

#[test]
fn tiny_progress_max_keeps_the_host_alive() {
    let splash = Splash::open(
        standalone("tiny").progress(ProgressSpec {
            max: 0.0005,
            mode: ProgressMode::Determinate,
        }),
        HeadlessToolkit::new(),
    )
    .unwrap();
    splash.set_progress(0.0002).unwrap();
    assert!(eventually(|| splash.progress() == Some(0.0002)));
    splash.step_progress(1.0).unwrap();
    assert!(eventually(|| splash.progress().is_some_and(|v| v > 0.0002)));
    assert!(splash.progress().unwrap() < 0.0005);
    assert!(splash.is_open());
    splash.close();
    assert_eq!(splash.wait().unwrap(), CloseReason::Requested);
}

#[test]
fn oversized_font_uses_the_default() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(standalone("huge").font("Arial, 100000000, bold"), tk.clone()).unwrap();
    assert_eq!(tk.latest().unwrap().font, Font::default());
    splash.close();
    splash.wait().unwrap();
}

/// Headless toolkit whose event loop dies on its first turn.
#[derive(Clone)]
struct CrashingLoop(HeadlessToolkit);

impl Toolkit for CrashingLoop {
    type Window = <HeadlessToolkit as Toolkit>::Window;

    fn screen_size(&self) -> Size {
        self.0.screen_size()
    }

    fn create_window(&self, look: &Look, owner: Option<MainWindow>) -> anyhow::Result<Self::Window> {
        self.0.create_window(look, owner)
    }

    fn is_host_thread(&self, main: MainWindow) -> bool {
        self.0.is_host_thread(main)
    }

    fn set_main_enabled(&self, main: MainWindow, enabled: bool) {
        self.0.set_main_enabled(main, enabled)
    }

    fn run_until(&self, _done: &dyn Fn() -> bool) {
        panic!("event loop failed");
    }
}

#[test]
fn host_panic_closes_the_splash() {
    let splash = Splash::open(standalone("doomed"), CrashingLoop(HeadlessToolkit::new())).unwrap();
    assert_eq!(splash.wait().unwrap(), CloseReason::HostExited);
    assert_eq!(splash.state(), SplashState::Closed);
    assert!(matches!(
        splash.update_message("late", false),
        Err(SplashError::Disposed)
    ));
    assert_eq!(
        splash.wait_timeout(Duration::ZERO),
        Some(CloseReason::HostExited)
    );
}

#[test]
fn progress_without_a_bar_is_ignored() {
    let splash = Splash::open(standalone("no bar"), HeadlessToolkit::new()).unwrap();
    splash.step_progress(5.0).unwrap();
    splash.update_message("after", false).unwrap();
    assert!(eventually(|| splash.message() == "after"));
    assert_eq!(splash.progress(), None);
    splash.close();
    splash.wait().unwrap();
}

#[test]
fn close_button_closes() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(standalone("click me").close_button(true), tk.clone()).unwrap();
    let id = tk.latest().unwrap().id;
    assert!(tk.click_close(id));
    assert_eq!(splash.wait().unwrap(), CloseReason::CloseButton);
    assert!(tk.window(id).unwrap().destroyed);
    assert!(!tk.click_close(id));
}

#[test]
fn no_close_button_ignores_clicks() {
    let tk = HeadlessToolkit::new();
    let splash = Splash::open(standalone("no button"), tk.clone()).unwrap();
    assert!(!tk.click_close(tk.latest().unwrap().id));
    splash.close();
    splash.wait().unwrap();
}

#[test]
fn empty_message_is_rejected() {
    let result = Splash::open(standalone(""), HeadlessToolkit::new());
    assert!(matches!(result, Err(SplashError::EmptyMessage)));
}

#[test]
fn show_blocking_runs_until_closed() {
    let tk = HeadlessToolkit::new();
    let started = Instant::now();
    let reason = Splash::show_blocking(
        SplashConfig::new("blocking").close_after(Duration::from_millis(150)),
        tk.clone(),
    )
    .unwrap();
    assert_eq!(reason, CloseReason::AutoClose);
    assert!(started.elapsed() >= Duration::from_millis(140));
    let snapshot = tk.latest().unwrap();
    assert!(snapshot.destroyed);
    assert_eq!(snapshot.host, thread::current().id());
}

#[test]
fn show_blocking_hands_out_a_handle() {
    let tk = HeadlessToolkit::new();
    let reason = Splash::show_blocking_with(SplashConfig::new("one"), tk.clone(), |splash| {
        thread::spawn(move || {
            splash.update_message(", two", true).unwrap();
            splash.close_after(Duration::from_millis(50));
        });
    })
    .unwrap();
    assert_eq!(reason, CloseReason::Requested);
    assert_eq!(tk.latest().unwrap().message, "one, two");
}

#[test]
fn launch_follows_blocking_flag() {
    let blocked = Splash::launch(
        SplashConfig::new("b").close_after(Duration::from_millis(50)),
        HeadlessToolkit::new(),
    )
    .unwrap();
    assert!(matches!(
        blocked,
        splashscreen::Launched::Finished(CloseReason::AutoClose)
    ));

    let running = Splash::launch(standalone("r"), HeadlessToolkit::new()).unwrap();
    let splashscreen::Launched::Running(splash) = running else {
        panic!("expected a running splash");
    };
    assert!(splash.is_open());
    splash.close();
    splash.wait().unwrap();
}

#[test]
fn close_guard_closes_on_drop() {
    let tk = HeadlessToolkit::new();
    {
        let guard = Splash::open(standalone("scoped"), tk.clone())
            .unwrap()
            .close_on_drop();
        guard.update_message("inside", false).unwrap();
    }
    assert!(eventually(|| tk.latest().unwrap().destroyed));
}

#[test]
fn wait_timeout_reports_open_splash() {
    let splash = Splash::open(standalone("waiting"), HeadlessToolkit::new()).unwrap();
    assert_eq!(splash.wait_timeout(Duration::from_millis(50)), None);
    splash.close();
    assert_eq!(
        splash.wait_timeout(PATIENCE),
        Some(CloseReason::Requested)
    );
}

#[test]
fn handles_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Splash>();

    let splash = Arc::new(Splash::open(standalone("0"), HeadlessToolkit::new()).unwrap());
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let splash = Arc::clone(&splash);
            thread::spawn(move || {
                for _ in 0..25 {
                    splash.update_message("+", true).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert!(eventually(|| splash.message().len() == 101));
    splash.close();
    splash.wait().unwrap();
}
