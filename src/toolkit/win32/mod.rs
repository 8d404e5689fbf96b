//! Native Windows backend: GDI-painted popup frames driven by the calling
//! thread's message queue.

mod window;

use std::ffi::c_void;

use windows::Win32::Foundation::HWND;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::EnableWindow;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, GetSystemMetrics, GetWindowThreadProcessId, MSG, SM_CXSCREEN,
    SM_CYSCREEN, TranslateMessage,
};

pub use window::{WM_SPLASH_WAKE, Win32Window};

use super::{Look, MainWindow, Toolkit};
use crate::screen::Size;

/// The Win32 toolkit. Stateless; windows belong to the thread that creates them.
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32Toolkit;

fn hwnd(main: MainWindow) -> HWND {
    HWND(main.raw() as *mut c_void)
}

impl Toolkit for Win32Toolkit {
    type Window = Win32Window;

    fn screen_size(&self) -> Size {
        unsafe { Size::new(GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
    }

    fn create_window(&self, look: &Look, owner: Option<MainWindow>) -> anyhow::Result<Win32Window> {
        Win32Window::create(look, owner)
    }

    fn is_host_thread(&self, main: MainWindow) -> bool {
        let owner = unsafe { GetWindowThreadProcessId(hwnd(main), None) };
        owner != 0 && owner == unsafe { GetCurrentThreadId() }
    }

    fn set_main_enabled(&self, main: MainWindow, enabled: bool) {
        let _ = unsafe { EnableWindow(hwnd(main), enabled) };
    }

    fn run_until(&self, done: &dyn Fn() -> bool) {
        let mut msg = MSG::default();
        while !done() {
            // 0 is WM_QUIT, -1 an invalid call; either way the loop is over.
            if unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 <= 0 {
                break;
            }
            unsafe {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}
