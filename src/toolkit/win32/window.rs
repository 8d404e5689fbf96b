use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{debug, trace, warn};
use windows::Win32::Foundation::{
    COLORREF, ERROR_CLASS_ALREADY_EXISTS, GetLastError, HINSTANCE, HWND, LPARAM, LRESULT, RECT,
    WPARAM,
};
use windows::Win32::Graphics::Dwm::{DWMWINDOWATTRIBUTE, DwmSetWindowAttribute};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CLIP_DEFAULT_PRECIS, CreateFontW, CreateSolidBrush, DEFAULT_CHARSET,
    DEFAULT_QUALITY, DRAW_TEXT_FORMAT, DT_CALCRECT, DT_CENTER, DT_EDITCONTROL, DT_NOPREFIX,
    DT_SINGLELINE, DT_VCENTER, DT_WORDBREAK, DeleteObject, DrawTextW, EndPaint, FF_DONTCARE,
    FW_BOLD, FW_NORMAL, FillRect, GetDC, GetDeviceCaps, HDC, HFONT, InvalidateRect, LOGPIXELSY,
    OUT_DEFAULT_PRECIS, PAINTSTRUCT, ReleaseDC, SelectObject, SetBkMode, SetTextColor,
    TRANSPARENT, UpdateWindow,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{TME_LEAVE, TRACKMOUSEEVENT, TrackMouseEvent};
use windows::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CreateWindowExW, DefWindowProcW, DestroyWindow, GWLP_USERDATA,
    GetWindowLongPtrW, HWND_TOPMOST, IDC_ARROW, KillTimer, LoadCursorW, PostMessageW,
    RegisterClassW, SW_SHOW, SW_SHOWNOACTIVATE, SWP_NOACTIVATE,
    SWP_SHOWWINDOW, SetTimer, SetWindowLongPtrW, SetWindowPos, ShowWindow, WM_CLOSE, WM_DESTROY,
    WM_ERASEBKGND, WM_LBUTTONUP, WM_MOUSELEAVE, WM_MOUSEMOVE, WM_NCDESTROY, WM_PAINT, WM_TIMER,
    WM_USER, WNDCLASSW, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_POPUP,
};
use windows::core::{HSTRING, PCWSTR, w};

use crate::appearance::{Color, Font};
use crate::screen::layout::Blocks;
use crate::screen::{Point, Rect, Size};
use crate::splash::progress::{ProgressMode, ProgressView};
use crate::toolkit::{EventHandler, HostEvent, Look, MainWindow, SplashWindow, TimerId, Waker};

/// Posted by a [`Win32Waker`] to deliver [`HostEvent::Wake`].
pub const WM_SPLASH_WAKE: u32 = WM_USER + 1;

const CLASS_NAME: PCWSTR = w!("SplashScreenFrame");

/// Registered once per process, reused by every splash window.
static CLASS_ATOM: AtomicU16 = AtomicU16::new(0);

const DWMWA_WINDOW_CORNER_PREFERENCE: DWMWINDOWATTRIBUTE = DWMWINDOWATTRIBUTE(33);
const DWMWCP_ROUND: i32 = 2;

/// How far the close button background lightens under the pointer.
const HOVER_LIGHTEN: f32 = 0.3;
/// How far the progress track lightens relative to the frame.
const TRACK_LIGHTEN: f32 = 0.25;
/// Width of the indeterminate marquee block, as a share of the track.
const MARQUEE_WIDTH: f64 = 0.25;

// ─── Per-window state ───────────────────────────────────────────────────────

/// Everything the window procedure needs, reachable through `GWLP_USERDATA`.
struct WindowData {
    paint: RefCell<Paint>,
    handler: RefCell<Option<EventHandler>>,
    /// Set once teardown has started, from either side.
    destroying: Cell<bool>,
    /// Cleared on teardown so late wakes are not posted to a reused handle.
    alive: Arc<AtomicBool>,
}

struct Paint {
    look: Look,
    font: HFONT,
    blocks: Blocks,
    size: Size,
    hover_close: bool,
    tracking: bool,
}

impl Drop for Paint {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.font.into());
        }
    }
}

/// Borrow the data attached to `hwnd`, keeping it alive for the caller even
/// if the window is destroyed meanwhile.
unsafe fn window_data(hwnd: HWND) -> Option<Rc<WindowData>> {
    let ptr = unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) } as *const WindowData;
    if ptr.is_null() {
        return None;
    }
    // SAFETY: the pointer came from `Rc::into_raw` and is only released on WM_NCDESTROY.
    unsafe {
        Rc::increment_strong_count(ptr);
        Some(Rc::from_raw(ptr))
    }
}

/// Run the window's handler. The handler may destroy the window; it is put
/// back only if the window is still alive.
fn dispatch(data: &WindowData, event: HostEvent) {
    let handler = data.handler.borrow_mut().take();
    let Some(mut handler) = handler else {
        trace!(?event, "event for a window without a handler");
        return;
    };
    handler(event);
    let leftover = {
        let mut slot = data.handler.borrow_mut();
        if slot.is_none() && !data.destroying.get() {
            *slot = Some(handler);
            None
        } else {
            Some(handler)
        }
    };
    drop(leftover);
}

fn point_from_lparam(lparam: LPARAM) -> Point {
    let x = (lparam.0 & 0xFFFF) as u16 as i16;
    let y = ((lparam.0 >> 16) & 0xFFFF) as u16 as i16;
    Point::new(i32::from(x), i32::from(y))
}

// ─── Window procedure ───────────────────────────────────────────────────────

unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let Some(data) = (unsafe { window_data(hwnd) }) else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };
    match msg {
        WM_SPLASH_WAKE => {
            dispatch(&data, HostEvent::Wake);
            LRESULT(0)
        }
        WM_TIMER => {
            if let Some(timer) = TimerId::from_raw(wparam.0) {
                // Native timers repeat; only the progress ticker should.
                if timer != TimerId::ProgressTick {
                    let _ = unsafe { KillTimer(Some(hwnd), wparam.0) };
                }
                dispatch(&data, HostEvent::Timer(timer));
            }
            LRESULT(0)
        }
        WM_ERASEBKGND => LRESULT(1),
        WM_PAINT => {
            match data.paint.try_borrow() {
                Ok(paint) => paint.paint(hwnd),
                Err(_) => trace!("paint skipped while state is updating"),
            }
            LRESULT(0)
        }
        WM_MOUSEMOVE => {
            let changed = data
                .paint
                .try_borrow_mut()
                .map(|mut paint| paint.track_hover(hwnd, point_from_lparam(lparam)))
                .unwrap_or(false);
            if changed {
                let _ = unsafe { InvalidateRect(Some(hwnd), None, false) };
            }
            LRESULT(0)
        }
        WM_MOUSELEAVE => {
            if let Ok(mut paint) = data.paint.try_borrow_mut() {
                paint.tracking = false;
                if std::mem::replace(&mut paint.hover_close, false) {
                    drop(paint);
                    let _ = unsafe { InvalidateRect(Some(hwnd), None, false) };
                }
            }
            LRESULT(0)
        }
        WM_LBUTTONUP => {
            let hit = data
                .paint
                .try_borrow()
                .is_ok_and(|paint| paint.hits_close(point_from_lparam(lparam)));
            if hit {
                dispatch(&data, HostEvent::CloseClicked);
            }
            LRESULT(0)
        }
        WM_CLOSE => {
            let has_button = data.paint.try_borrow().is_ok_and(|p| p.look.close_button);
            if has_button {
                dispatch(&data, HostEvent::CloseClicked);
            } else {
                trace!("close gesture ignored without a close button");
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            data.alive.store(false, Ordering::Release);
            if !data.destroying.replace(true) {
                debug!("splash window destroyed from outside");
                dispatch(&data, HostEvent::Destroyed);
            }
            LRESULT(0)
        }
        WM_NCDESTROY => {
            let handler = data.handler.borrow_mut().take();
            let ptr = unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) } as *const WindowData;
            if !ptr.is_null() {
                // SAFETY: releases the reference stored at creation.
                drop(unsafe { Rc::from_raw(ptr) });
            }
            drop(handler);
            unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) }
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

// ─── Class registration ─────────────────────────────────────────────────────

/// Register the splash window class. Only the first call does any work.
fn register_class() -> anyhow::Result<()> {
    if CLASS_ATOM.load(Ordering::Acquire) != 0 {
        return Ok(());
    }
    let wc = WNDCLASSW {
        lpfnWndProc: Some(wnd_proc),
        hInstance: HINSTANCE(std::ptr::null_mut()),
        lpszClassName: CLASS_NAME,
        style: CS_HREDRAW | CS_VREDRAW,
        hCursor: unsafe { LoadCursorW(None, IDC_ARROW) }.unwrap_or_default(),
        ..Default::default()
    };
    let atom = unsafe { RegisterClassW(&wc) };
    if atom == 0 {
        let error = unsafe { GetLastError() };
        if error != ERROR_CLASS_ALREADY_EXISTS {
            bail!("failed to register splash window class: {error:?}");
        }
    }
    CLASS_ATOM.store(atom.max(1), Ordering::Release);
    Ok(())
}

// ─── Fonts and text ─────────────────────────────────────────────────────────

fn create_font(font: &Font) -> anyhow::Result<HFONT> {
    let points = i32::try_from(font.size).unwrap_or(i32::MAX / 96);
    let screen = unsafe { GetDC(None) };
    let dpi = if screen.is_invalid() {
        96
    } else {
        let dpi = unsafe { GetDeviceCaps(Some(screen), LOGPIXELSY) };
        unsafe { ReleaseDC(None, screen) };
        dpi
    };
    let weight = if font.style.is_bold() { FW_BOLD } else { FW_NORMAL };
    let face = HSTRING::from(font.family.as_str());
    let handle = unsafe {
        CreateFontW(
            -(points.saturating_mul(dpi) / 72),
            0,
            0,
            0,
            weight.0 as i32,
            u32::from(font.style.is_italic()),
            0,
            0,
            DEFAULT_CHARSET,
            OUT_DEFAULT_PRECIS,
            CLIP_DEFAULT_PRECIS,
            DEFAULT_QUALITY,
            FF_DONTCARE.0 as u32,
            &face,
        )
    };
    if handle.is_invalid() {
        bail!("failed to create font {font}");
    }
    Ok(handle)
}

/// Size of `text` drawn in the font selected into `hdc`, wrapping at `wrap`.
fn text_extent(hdc: HDC, text: &str, wrap: Option<i32>) -> Size {
    let mut buf: Vec<u16> = text.encode_utf16().collect();
    if buf.is_empty() {
        return Size::default();
    }
    let mut rc = RECT {
        right: wrap.unwrap_or(0),
        ..Default::default()
    };
    let layout = match wrap {
        Some(_) => DT_WORDBREAK | DT_EDITCONTROL,
        None => DT_SINGLELINE,
    };
    unsafe { DrawTextW(hdc, &mut buf, &mut rc, DT_CALCRECT | DT_NOPREFIX | layout) };
    Size::new(rc.right - rc.left, rc.bottom - rc.top)
}

fn draw_text(hdc: HDC, text: &str, area: Rect, format: DRAW_TEXT_FORMAT) {
    let mut buf: Vec<u16> = text.encode_utf16().collect();
    let mut rc = to_rect(area);
    unsafe { DrawTextW(hdc, &mut buf, &mut rc, format | DT_NOPREFIX) };
}

fn fill(hdc: HDC, area: Rect, color: Color) {
    unsafe {
        let brush = CreateSolidBrush(COLORREF(color.to_colorref()));
        if !brush.is_invalid() {
            FillRect(hdc, &to_rect(area), brush);
            let _ = DeleteObject(brush.into());
        }
    }
}

fn to_rect(r: Rect) -> RECT {
    RECT {
        left: r.origin.x,
        top: r.origin.y,
        right: r.right(),
        bottom: r.bottom(),
    }
}

// ─── Painting ───────────────────────────────────────────────────────────────

impl Paint {
    fn measure(&self, hwnd: HWND) -> Blocks {
        let hdc = unsafe { GetDC(Some(hwnd)) };
        if hdc.is_invalid() {
            warn!("no device context to measure the splash with");
            return self.blocks;
        }
        let old = unsafe { SelectObject(hdc, self.font.into()) };
        let blocks = Blocks {
            title: self.look.title.as_deref().map(|t| text_extent(hdc, t, None)),
            message: text_extent(hdc, &self.look.message, Some(self.look.wrap_width)),
            close_button: self.look.close_button,
            progress: self.look.progress.is_some(),
        };
        unsafe {
            let _ = SelectObject(hdc, old);
            let _ = ReleaseDC(Some(hwnd), hdc);
        }
        blocks
    }

    fn paint(&self, hwnd: HWND) {
        let mut ps = PAINTSTRUCT::default();
        let hdc = unsafe { BeginPaint(hwnd, &mut ps) };
        if hdc.is_invalid() {
            return;
        }
        let look = &self.look;
        let regions = self.blocks.regions(self.size);
        fill(hdc, Rect::new(Point::default(), self.size), look.background);

        let old = unsafe {
            SetBkMode(hdc, TRANSPARENT);
            SetTextColor(hdc, COLORREF(look.foreground.to_colorref()));
            SelectObject(hdc, self.font.into())
        };
        if let (Some(title), Some(area)) = (look.title.as_deref(), regions.title) {
            draw_text(hdc, title, area, DT_SINGLELINE);
        }
        draw_text(hdc, &look.message, regions.message, DT_WORDBREAK | DT_EDITCONTROL);
        if let (Some(view), Some(track)) = (look.progress, regions.progress) {
            paint_progress(hdc, view, track, look);
        }
        if let Some(button) = regions.close_button {
            if self.hover_close {
                fill(hdc, button, look.background.lighten(HOVER_LIGHTEN));
            }
            draw_text(hdc, "\u{00D7}", button, DT_CENTER | DT_VCENTER | DT_SINGLELINE);
        }
        unsafe {
            let _ = SelectObject(hdc, old);
            let _ = EndPaint(hwnd, &ps);
        }
    }

    fn hits_close(&self, p: Point) -> bool {
        self.blocks
            .regions(self.size)
            .close_button
            .is_some_and(|r| r.contains(p))
    }

    /// Update the hover state; returns whether a repaint is needed.
    fn track_hover(&mut self, hwnd: HWND, p: Point) -> bool {
        if !self.tracking {
            let mut tme = TRACKMOUSEEVENT {
                cbSize: std::mem::size_of::<TRACKMOUSEEVENT>() as u32,
                dwFlags: TME_LEAVE,
                hwndTrack: hwnd,
                dwHoverTime: 0,
            };
            self.tracking = unsafe { TrackMouseEvent(&mut tme) }.is_ok();
        }
        let hover = self.hits_close(p);
        std::mem::replace(&mut self.hover_close, hover) != hover
    }
}

fn paint_progress(hdc: HDC, view: ProgressView, track: Rect, look: &Look) {
    fill(hdc, track, look.background.lighten(TRACK_LIGHTEN));
    let width = f64::from(track.size.width);
    let (start, len) = match view.mode {
        ProgressMode::Determinate => (0.0, width * view.fraction),
        ProgressMode::Indeterminate => {
            let len = width * MARQUEE_WIDTH;
            let start = (width + len) * view.phase - len;
            (start.max(0.0), (start + len).min(width) - start.max(0.0))
        }
    };
    if len >= 1.0 {
        let bar = Rect::new(
            Point::new(track.origin.x + start as i32, track.origin.y),
            Size::new(len as i32, track.size.height),
        );
        fill(hdc, bar, look.foreground);
    }
}

// ─── Window ─────────────────────────────────────────────────────────────────

/// A native splash frame living on the thread that created it.
pub struct Win32Window {
    hwnd: HWND,
    data: Rc<WindowData>,
    shown: bool,
}

impl Win32Window {
    /// Create the hidden popup. Showing happens on the first [`SplashWindow::place`].
    pub(super) fn create(look: &Look, owner: Option<MainWindow>) -> anyhow::Result<Self> {
        register_class()?;
        let font = create_font(&look.font)?;
        let data = Rc::new(WindowData {
            paint: RefCell::new(Paint {
                look: look.clone(),
                font,
                blocks: Blocks::default(),
                size: Size::default(),
                hover_close: false,
                tracking: false,
            }),
            handler: RefCell::new(None),
            destroying: Cell::new(false),
            alive: Arc::new(AtomicBool::new(true)),
        });

        let mut ex_style = WS_EX_TOPMOST | WS_EX_TOOLWINDOW;
        if !look.activate {
            ex_style |= WS_EX_NOACTIVATE;
        }
        let title = HSTRING::from(look.title.as_deref().unwrap_or(""));
        let owner = owner.map(|m| HWND(m.raw() as *mut c_void));
        let hwnd = unsafe {
            CreateWindowExW(
                ex_style,
                CLASS_NAME,
                &title,
                WS_POPUP,
                0,
                0,
                0,
                0,
                owner,
                None,
                Some(HINSTANCE(std::ptr::null_mut())),
                None,
            )
        }
        .context("failed to create splash window")?;

        unsafe {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, Rc::into_raw(Rc::clone(&data)) as isize);
            let corner = DWMWCP_ROUND;
            let _ = DwmSetWindowAttribute(
                hwnd,
                DWMWA_WINDOW_CORNER_PREFERENCE,
                &corner as *const i32 as *const c_void,
                std::mem::size_of::<i32>() as u32,
            );
        }
        debug!(hwnd = ?hwnd.0, "splash window created");
        Ok(Self {
            hwnd,
            data,
            shown: false,
        })
    }

    fn invalidate(&self) {
        let _ = unsafe { InvalidateRect(Some(self.hwnd), None, false) };
    }
}

impl SplashWindow for Win32Window {
    fn set_event_handler(&mut self, handler: EventHandler) {
        let previous = self.data.handler.borrow_mut().replace(handler);
        drop(previous);
    }

    fn measure(&mut self) -> Size {
        let blocks = self.data.paint.borrow().measure(self.hwnd);
        self.data.paint.borrow_mut().blocks = blocks;
        blocks.frame_size()
    }

    fn place(&mut self, frame: Rect) {
        let activate = {
            let mut paint = self.data.paint.borrow_mut();
            paint.size = frame.size;
            paint.look.activate
        };
        if !self.shown {
            self.shown = true;
            let cmd = if activate { SW_SHOW } else { SW_SHOWNOACTIVATE };
            let _ = unsafe { ShowWindow(self.hwnd, cmd) };
        }
        let flags = if activate {
            SWP_SHOWWINDOW
        } else {
            SWP_SHOWWINDOW | SWP_NOACTIVATE
        };
        let placed = unsafe {
            SetWindowPos(
                self.hwnd,
                Some(HWND_TOPMOST),
                frame.origin.x,
                frame.origin.y,
                frame.size.width,
                frame.size.height,
                flags,
            )
        };
        if let Err(e) = placed {
            warn!(error = %e, "failed to place splash window");
        }
        self.invalidate();
        let _ = unsafe { UpdateWindow(self.hwnd) };
    }

    fn set_message(&mut self, text: &str) {
        self.data.paint.borrow_mut().look.message = text.to_string();
        self.invalidate();
    }

    fn set_background(&mut self, color: Color) {
        self.data.paint.borrow_mut().look.background = color;
        self.invalidate();
    }

    fn set_progress(&mut self, view: ProgressView) {
        self.data.paint.borrow_mut().look.progress = Some(view);
        self.invalidate();
    }

    fn start_timer(&mut self, timer: TimerId, after: Duration) {
        let ms = u32::try_from(after.as_millis()).unwrap_or(u32::MAX).max(1);
        if unsafe { SetTimer(Some(self.hwnd), timer.raw(), ms, None) } == 0 {
            warn!(?timer, "failed to start splash timer");
        }
    }

    fn stop_timer(&mut self, timer: TimerId) {
        let _ = unsafe { KillTimer(Some(self.hwnd), timer.raw()) };
    }

    fn waker(&self) -> Arc<dyn Waker> {
        Arc::new(Win32Waker {
            hwnd: self.hwnd.0 as usize,
            alive: Arc::clone(&self.data.alive),
        })
    }

    fn destroy(&mut self) {
        if !self.data.destroying.replace(true) {
            self.data.alive.store(false, Ordering::Release);
            if let Err(e) = unsafe { DestroyWindow(self.hwnd) } {
                warn!(error = %e, "failed to destroy splash window");
            }
        }
        let handler = self.data.handler.borrow_mut().take();
        drop(handler);
    }
}

impl Drop for Win32Window {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Posts [`WM_SPLASH_WAKE`] to a splash window from any thread.
struct Win32Waker {
    hwnd: usize,
    alive: Arc<AtomicBool>,
}

impl Waker for Win32Waker {
    fn wake(&self) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        let hwnd = HWND(self.hwnd as *mut c_void);
        if let Err(e) = unsafe { PostMessageW(Some(hwnd), WM_SPLASH_WAKE, WPARAM(0), LPARAM(0)) } {
            trace!(error = %e, "splash wake not delivered");
        }
    }
}
