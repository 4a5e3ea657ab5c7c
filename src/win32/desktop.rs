//! [`Desktop`](crate::traits::Desktop) implementation backed by the Windows
//! shell.
//!
//! Host windows are layered, fully transparent tool windows of the
//! `AerialSpacer` class; they never take focus and never show up in the
//! taskbar.  Protocol messages go straight to `SHAppBarMessage`.

use super::{from_wide, Win32Error};
use crate::appbar::{AppBarData, AppBarMessage};
use crate::geometry::{Monitor, MonitorId, Rect};
use crate::traits::{Displays, HostHandle, ReservationService, ServiceError, WindowHost};
use log::{debug, info};
use std::ffi::c_void;
use std::mem::size_of;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{BOOL, COLORREF, HINSTANCE, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOEXW,
    MONITORINFOF_PRIMARY,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::HiDpi::{SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_SYSTEM_AWARE};
use windows::Win32::UI::Shell::{SHAppBarMessage, APPBARDATA};
use windows::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW,
    PostQuitMessage, RegisterClassW, SetLayeredWindowAttributes, SetWindowPos, ShowWindow,
    TranslateMessage, HMENU, LWA_ALPHA, MSG, PM_REMOVE, SWP_NOACTIVATE, SWP_NOZORDER,
    SWP_SHOWWINDOW, SW_SHOWNOACTIVATE, WM_QUIT, WNDCLASSW, WS_EX_LAYERED, WS_EX_NOACTIVATE,
    WS_EX_TOOLWINDOW, WS_POPUP,
};

const HOST_CLASS: PCWSTR = w!("AerialSpacer");

const _: () = assert!(size_of::<APPBARDATA>() == size_of::<AppBarData>());

/// The Windows desktop: host windows, the AppBar service and monitors.
pub struct Win32Desktop {
    instance: HINSTANCE,
}

impl Win32Desktop {
    /// Opt into system DPI awareness and register the host window class.
    pub fn new() -> Result<Self, Win32Error> {
        unsafe {
            if let Err(e) = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_SYSTEM_AWARE) {
                debug!("DPI awareness already set: {}", e);
            }
            let module =
                GetModuleHandleW(PCWSTR::null()).map_err(|e| Win32Error::new("GetModuleHandleW", e))?;
            let instance: HINSTANCE = module.into();

            let class = WNDCLASSW {
                hInstance: instance,
                lpszClassName: HOST_CLASS,
                lpfnWndProc: Some(host_wndproc),
                ..Default::default()
            };
            if RegisterClassW(&class) == 0 {
                return Err(Win32Error::last("RegisterClassW"));
            }
            Ok(Self { instance })
        }
    }

    /// Module instance, needed to register further window classes.
    pub fn instance(&self) -> HINSTANCE {
        self.instance
    }
}

unsafe extern "system" fn host_wndproc(hwnd: HWND, msg: u32, wp: WPARAM, lp: LPARAM) -> LRESULT {
    DefWindowProcW(hwnd, msg, wp, lp)
}

fn hwnd(handle: HostHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

fn to_rect(rc: RECT) -> Rect {
    Rect::new(rc.left, rc.top, rc.right, rc.bottom)
}

fn to_native(rect: Rect) -> RECT {
    RECT {
        left: rect.left,
        top: rect.top,
        right: rect.right,
        bottom: rect.bottom,
    }
}

impl WindowHost for Win32Desktop {
    type Error = Win32Error;

    fn create(&self) -> Result<HostHandle, Win32Error> {
        unsafe {
            let window = CreateWindowExW(
                WS_EX_LAYERED | WS_EX_TOOLWINDOW | WS_EX_NOACTIVATE,
                HOST_CLASS,
                w!("AerialSpacer"),
                WS_POPUP,
                0,
                0,
                0,
                0,
                HWND::default(),
                HMENU::default(),
                self.instance,
                None,
            )
            .map_err(|e| Win32Error::new("CreateWindowExW", e))?;

            if let Err(e) = SetLayeredWindowAttributes(window, COLORREF(0), 0, LWA_ALPHA) {
                let _ = DestroyWindow(window);
                return Err(Win32Error::new("SetLayeredWindowAttributes", e));
            }
            let _ = ShowWindow(window, SW_SHOWNOACTIVATE);
            Ok(HostHandle(window.0 as isize))
        }
    }

    fn destroy(&self, handle: HostHandle) -> Result<(), Win32Error> {
        unsafe { DestroyWindow(hwnd(handle)) }.map_err(|e| Win32Error::new("DestroyWindow", e))
    }

    fn move_to(&self, handle: HostHandle, rect: Rect) -> Result<(), Win32Error> {
        unsafe {
            SetWindowPos(
                hwnd(handle),
                HWND::default(),
                rect.left,
                rect.top,
                rect.width(),
                rect.height(),
                SWP_NOACTIVATE | SWP_NOZORDER | SWP_SHOWWINDOW,
            )
        }
        .map_err(|e| Win32Error::new("SetWindowPos", e))
    }

    fn pump_events(&self) {
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).as_bool() {
                if msg.message == WM_QUIT {
                    // Leave the quit request for the main loop.
                    PostQuitMessage(msg.wParam.0 as i32);
                    break;
                }
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
    }
}

impl ReservationService for Win32Desktop {
    fn send(&self, message: AppBarMessage, data: &mut AppBarData) -> Result<usize, ServiceError> {
        let mut native = APPBARDATA {
            cbSize: size_of::<APPBARDATA>() as u32,
            hWnd: HWND(data.owner as *mut c_void),
            uCallbackMessage: data.callback_message,
            uEdge: data.edge,
            rc: to_native(data.rect),
            lParam: LPARAM(data.param),
        };
        let result = unsafe { SHAppBarMessage(message.code(), &mut native) };
        data.rect = to_rect(native.rc);

        // Only NEW reports failure; the other messages always return TRUE.
        if message == AppBarMessage::New && result == 0 {
            return Err(ServiceError::Rejected(message));
        }
        Ok(result)
    }
}

unsafe extern "system" fn collect_monitor(
    monitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    data: LPARAM,
) -> BOOL {
    let monitors = &mut *(data.0 as *mut Vec<Monitor>);
    if let Some(m) = describe(monitor) {
        monitors.push(m);
    }
    BOOL(1)
}

unsafe fn describe(monitor: HMONITOR) -> Option<Monitor> {
    let mut info = MONITORINFOEXW::default();
    info.monitorInfo.cbSize = size_of::<MONITORINFOEXW>() as u32;
    if !GetMonitorInfoW(monitor, &mut info.monitorInfo as *mut MONITORINFO).as_bool() {
        return None;
    }
    Some(Monitor {
        id: MonitorId(monitor.0 as isize),
        name: from_wide(&info.szDevice),
        primary: info.monitorInfo.dwFlags & MONITORINFOF_PRIMARY != 0,
        work_area: to_rect(info.monitorInfo.rcWork),
    })
}

impl Displays for Win32Desktop {
    type Error = Win32Error;

    fn monitors(&self) -> Result<Vec<Monitor>, Win32Error> {
        let mut monitors: Vec<Monitor> = Vec::new();
        let ok = unsafe {
            EnumDisplayMonitors(
                HDC::default(),
                None,
                Some(collect_monitor),
                LPARAM(&mut monitors as *mut Vec<Monitor> as isize),
            )
        };
        if !ok.as_bool() {
            return Err(Win32Error::last("EnumDisplayMonitors"));
        }
        for m in &monitors {
            info!(
                "monitor {} ({}){}: work area {}",
                m.name,
                m.id,
                if m.primary { " primary" } else { "" },
                m.work_area
            );
        }
        Ok(monitors)
    }

    fn work_area(&self, monitor: MonitorId) -> Option<Rect> {
        unsafe { describe(HMONITOR(monitor.0 as *mut c_void)) }.map(|m| m.work_area)
    }
}
