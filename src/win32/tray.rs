//! Notification-area icon and the main message loop.
//!
//! [`run`] blocks until the user picks "quit" from the tray menu, the tray
//! window is closed, or the user session ends.  The end-of-session handler
//! runs inside the window procedure, before the shell tears the process
//! down, so it is the last chance to hand reserved space back.

use super::Win32Error;
use log::{debug, info, warn};
use std::cell::RefCell;
use std::mem::size_of;
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::UI::Shell::{
    Shell_NotifyIconW, NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NOTIFYICONDATAW,
};
use windows::Win32::UI::WindowsAndMessaging::{
    AppendMenuW, CreatePopupMenu, CreateWindowExW, DefWindowProcW, DestroyMenu, DestroyWindow,
    DispatchMessageW, GetCursorPos, GetMessageW, LoadIconW, PostQuitMessage, RegisterClassW,
    SetForegroundWindow, TrackPopupMenu, TranslateMessage, HMENU, IDI_APPLICATION, MF_STRING,
    MSG, TPM_BOTTOMALIGN, TPM_LEFTALIGN, WINDOW_EX_STYLE, WM_APP, WM_CLOSE, WM_COMMAND,
    WM_DESTROY, WM_ENDSESSION, WM_RBUTTONUP, WNDCLASSW, WS_OVERLAPPED,
};

const TRAY_CLASS: PCWSTR = w!("AerialTray");
const WM_TRAYICON: u32 = WM_APP + 2;
const TRAY_ID: u32 = 1;
const IDM_QUIT: u16 = 1001;
const TOOLTIP: &str = "Aerial";

thread_local! {
    static ON_END_SESSION: RefCell<Option<Box<dyn FnMut()>>> = RefCell::new(None);
}

/// Show the tray icon and run the message loop until quit.
///
/// `on_end_session` is called at most once, when Windows reports that the
/// user session is ending.
pub fn run<F: FnMut() + 'static>(instance: HINSTANCE, on_end_session: F) -> Result<(), Win32Error> {
    ON_END_SESSION.with(|slot| *slot.borrow_mut() = Some(Box::new(on_end_session)));

    let window = unsafe { create_window(instance)? };
    unsafe { add_icon(window)? };
    info!("running; use the tray icon to quit");

    unsafe {
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, HWND::default(), 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }

    ON_END_SESSION.with(|slot| slot.borrow_mut().take());
    debug!("message loop finished");
    Ok(())
}

unsafe fn create_window(instance: HINSTANCE) -> Result<HWND, Win32Error> {
    let class = WNDCLASSW {
        hInstance: instance,
        lpszClassName: TRAY_CLASS,
        lpfnWndProc: Some(tray_wndproc),
        ..Default::default()
    };
    if RegisterClassW(&class) == 0 {
        return Err(Win32Error::last("RegisterClassW"));
    }
    // A hidden top-level window; message-only windows miss WM_ENDSESSION.
    CreateWindowExW(
        WINDOW_EX_STYLE::default(),
        TRAY_CLASS,
        w!("Aerial"),
        WS_OVERLAPPED,
        0,
        0,
        0,
        0,
        HWND::default(),
        HMENU::default(),
        instance,
        None,
    )
    .map_err(|e| Win32Error::new("CreateWindowExW", e))
}

fn icon_data(window: HWND) -> NOTIFYICONDATAW {
    NOTIFYICONDATAW {
        cbSize: size_of::<NOTIFYICONDATAW>() as u32,
        hWnd: window,
        uID: TRAY_ID,
        ..Default::default()
    }
}

unsafe fn add_icon(window: HWND) -> Result<(), Win32Error> {
    let mut nid = icon_data(window);
    nid.uFlags = NIF_MESSAGE | NIF_ICON | NIF_TIP;
    nid.uCallbackMessage = WM_TRAYICON;
    nid.hIcon = LoadIconW(HINSTANCE::default(), IDI_APPLICATION).unwrap_or_default();
    let tip: Vec<u16> = TOOLTIP.encode_utf16().collect();
    let len = tip.len().min(nid.szTip.len() - 1);
    nid.szTip[..len].copy_from_slice(&tip[..len]);

    if !Shell_NotifyIconW(NIM_ADD, &nid).as_bool() {
        return Err(Win32Error::last("Shell_NotifyIconW"));
    }
    Ok(())
}

unsafe fn remove_icon(window: HWND) {
    let nid = icon_data(window);
    let _ = Shell_NotifyIconW(NIM_DELETE, &nid);
}

unsafe fn show_menu(window: HWND) {
    let menu = match CreatePopupMenu() {
        Ok(m) => m,
        Err(e) => {
            warn!("cannot create tray menu: {}", e);
            return;
        }
    };
    let _ = AppendMenuW(menu, MF_STRING, IDM_QUIT as usize, w!("quit"));

    // The menu only dismisses properly if our window is in the foreground.
    let _ = SetForegroundWindow(window);
    let mut pt = POINT::default();
    let _ = GetCursorPos(&mut pt);
    let _ = TrackPopupMenu(menu, TPM_LEFTALIGN | TPM_BOTTOMALIGN, pt.x, pt.y, 0, window, None);
    let _ = DestroyMenu(menu);
}

unsafe extern "system" fn tray_wndproc(hwnd: HWND, msg: u32, wp: WPARAM, lp: LPARAM) -> LRESULT {
    match msg {
        WM_TRAYICON => {
            if (lp.0 & 0xFFFF) as u32 == WM_RBUTTONUP {
                show_menu(hwnd);
            }
            LRESULT(0)
        }
        WM_COMMAND if (wp.0 & 0xFFFF) as u16 == IDM_QUIT => {
            info!("quit requested from tray");
            let _ = DestroyWindow(hwnd);
            LRESULT(0)
        }
        WM_CLOSE => {
            let _ = DestroyWindow(hwnd);
            LRESULT(0)
        }
        WM_ENDSESSION => {
            if wp.0 != 0 {
                info!("user session ending");
                let handler = ON_END_SESSION.with(|slot| slot.borrow_mut().take());
                if let Some(mut handler) = handler {
                    handler();
                }
            }
            LRESULT(0)
        }
        WM_DESTROY => {
            remove_icon(hwnd);
            PostQuitMessage(0);
            LRESULT(0)
        }
        _ => DefWindowProcW(hwnd, msg, wp, lp),
    }
}
