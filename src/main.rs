//! Demo binary: show a splash from the command line.

use std::{path::PathBuf, sync::Arc, thread, time::Duration};

use anyhow::Context;
use clap::Parser;
use splashscreen::{
    Launched, Point, ProgressSpec, Splash, SplashConfig, SplashSettings, Toolkit,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Used when nothing else would ever close the splash.
const FALLBACK_CLOSE_AFTER: Duration = Duration::from_secs(3);
/// Progress steps fed by `--progress`.
const PROGRESS_STEPS: u32 = 20;

#[derive(Parser, Debug)]
#[command(name = "splashscreen", about = "Show an auto-positioned splash window", version)]
struct Cli {
    /// Message text
    #[arg(long, short)]
    message: Option<String>,

    /// Title above the message
    #[arg(long)]
    title: Option<String>,

    /// Placement code: TL, TC, TR, CL, C, CR, BL, BC or BR
    #[arg(long, value_name = "CODE")]
    placement: Option<String>,

    /// Explicit top-left corner, overriding --placement
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    at: Option<Point>,

    /// Font as "family, size, style"
    #[arg(long)]
    font: Option<String>,

    /// Background color name or #RRGGBB
    #[arg(long)]
    bg: Option<String>,

    /// Text color name or #RRGGBB
    #[arg(long)]
    fg: Option<String>,

    /// Close after this many seconds
    #[arg(long, value_name = "SECS")]
    close_after: Option<f64>,

    /// Show a close button
    #[arg(long)]
    close_button: bool,

    /// Show a progress bar and fill it from a worker thread
    #[arg(long)]
    progress: bool,

    /// Settings file (RON); flags override its values
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Run the splash on a background thread instead of blocking
    #[arg(long)]
    no_block: bool,

    /// Attach the splash to a demo main window
    #[cfg(windows)]
    #[arg(long)]
    attached: bool,
}

fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {s:?}"))?;
    let coord = |v: &str| v.trim().parse::<i32>().map_err(|e| format!("{v:?}: {e}"));
    Ok(Point::new(coord(x)?, coord(y)?))
}

impl Cli {
    fn config(&self) -> anyhow::Result<SplashConfig> {
        let mut config = match &self.config {
            Some(path) => SplashSettings::load(path)
                .with_context(|| format!("loading {}", path.display()))?
                .apply(SplashConfig::new("Loading…")),
            None => SplashConfig::new("Loading…"),
        };
        if let Some(message) = &self.message {
            config.message = message.clone();
        }
        if let Some(title) = &self.title {
            config = config.title(title.as_str());
        }
        if let Some(code) = &self.placement {
            config = config.placement_code(code);
        }
        if let Some(at) = self.at {
            config = config.placement(at);
        }
        if let Some(font) = &self.font {
            config = config.font(font.as_str());
        }
        if let Some(bg) = &self.bg {
            config = config.background(bg.as_str());
        }
        if let Some(fg) = &self.fg {
            config = config.foreground(fg.as_str());
        }
        if let Some(secs) = self.close_after {
            config = config.close_after_secs(secs);
        }
        if self.close_button {
            config = config.close_button(true);
        }
        if self.progress {
            config = config.progress(ProgressSpec {
                max: f64::from(PROGRESS_STEPS),
                ..Default::default()
            });
        }
        if self.no_block {
            config = config.standalone_blocking(false);
        }
        if config.close_after.is_none() && !config.close_button && !self.progress {
            info!(after = ?FALLBACK_CLOSE_AFTER, "nothing closes the splash; adding an auto-close");
            config = config.close_after(FALLBACK_CLOSE_AFTER);
        }
        Ok(config)
    }
}

/// Step the bar from another thread, then close.
fn feed_progress(splash: Arc<Splash>) {
    for step in 1..=PROGRESS_STEPS {
        thread::sleep(Duration::from_millis(150));
        let stepped = splash
            .step_progress(1.0)
            .and_then(|()| splash.update_message(format!("Step {step} of {PROGRESS_STEPS}"), false));
        if let Err(e) = stepped {
            warn!(error = %e, "splash went away");
            return;
        }
    }
    splash.close();
}

fn run<T: Toolkit>(config: SplashConfig, toolkit: T, progress: bool) -> anyhow::Result<()> {
    if progress && config.standalone_blocking {
        let reason = Splash::show_blocking_with(config, toolkit, |splash| {
            let splash = Arc::new(splash);
            thread::spawn(move || feed_progress(splash));
        })?;
        info!(?reason, "splash closed");
        return Ok(());
    }
    match Splash::launch(config, toolkit)? {
        Launched::Finished(reason) => info!(?reason, "splash closed"),
        Launched::Running(splash) => {
            info!(host = ?splash.host_thread(), at = ?splash.position(), "splash running");
            let splash = Arc::new(splash);
            if progress {
                let feeder = Arc::clone(&splash);
                thread::spawn(move || feed_progress(feeder));
            }
            let reason = splash.wait()?;
            info!(?reason, "splash closed");
        }
    }
    Ok(())
}

#[cfg(windows)]
mod attached {
    use std::sync::Arc;

    use splashscreen::{MainWindow, Splash, SplashConfig, Win32Toolkit};
    use tracing::{error, info};
    use winit::{
        application::ApplicationHandler,
        event::WindowEvent,
        event_loop::{ActiveEventLoop, EventLoop},
        window::{Window, WindowId},
    };

    struct App {
        config: Option<SplashConfig>,
        progress: bool,
        window: Option<Window>,
        splash: Option<Arc<Splash>>,
    }

    impl App {
        fn open(&mut self, window: &Window) -> splashscreen::Result<()> {
            let Some(config) = self.config.take() else {
                return Ok(());
            };
            let main = MainWindow::from_window(window)?;
            let splash = Arc::new(Splash::open(
                config.main_window(main).block_main(true),
                Win32Toolkit,
            )?);
            if self.progress {
                let feeder = Arc::clone(&splash);
                std::thread::spawn(move || super::feed_progress(feeder));
            }
            self.splash = Some(splash);
            Ok(())
        }
    }

    impl ApplicationHandler for App {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            if self.window.is_some() {
                return;
            }
            let attrs = Window::default_attributes().with_title("splashscreen demo");
            let window = match event_loop.create_window(attrs) {
                Ok(window) => window,
                Err(e) => {
                    error!(error = %e, "failed to create main window");
                    event_loop.exit();
                    return;
                }
            };
            if let Err(e) = self.open(&window) {
                error!(error = %e, "failed to open attached splash");
            }
            self.window = Some(window);
        }

        fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
            if let WindowEvent::CloseRequested = event {
                if let Some(splash) = &self.splash {
                    info!(state = ?splash.state(), "main window closing");
                    splash.close();
                }
                event_loop.exit();
            }
        }
    }

    pub fn run(config: SplashConfig, progress: bool) -> anyhow::Result<()> {
        let event_loop = EventLoop::new()?;
        let mut app = App {
            config: Some(config),
            progress,
            window: None,
            splash: None,
        };
        event_loop.run_app(&mut app)?;
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().without_time())
        .try_init()
        .ok();

    let config = cli.config()?;

    #[cfg(windows)]
    {
        if cli.attached {
            return attached::run(config, cli.progress);
        }
        run(config, splashscreen::Win32Toolkit, cli.progress)
    }

    #[cfg(not(windows))]
    {
        let toolkit = splashscreen::HeadlessToolkit::new();
        run(config, toolkit.clone(), cli.progress)?;
        if let Some(snapshot) = toolkit.latest() {
            info!(?snapshot, "final headless frame");
        }
        Ok(())
    }
}
