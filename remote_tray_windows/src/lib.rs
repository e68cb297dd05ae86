#![cfg(target_os = "windows")]

mod msg;
mod util;

use std::cell::Cell;
use std::ptr;

use anyhow::{Context, Result, anyhow, bail};
use dpi::PhysicalPosition;
use remote_tray_core::{
    TrayAttributes, TrayBackend, TrayEvent, TrayGeometry, TrayProxy, tray_id::TrayId,
};
use tracing::{debug, trace, warn};
use windows_sys::Win32::Foundation::{HWND, LPARAM, LRESULT, POINT, RECT, WPARAM};
use windows_sys::Win32::UI::Shell::{
    NIF_ICON, NIF_MESSAGE, NIF_TIP, NIM_ADD, NIM_DELETE, NIM_MODIFY, NOTIFYICONDATAW,
    NOTIFYICONIDENTIFIER, Shell_NotifyIconGetRect, Shell_NotifyIconW,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyIcon, DestroyWindow, GWL_USERDATA, GetCursorPos,
    GetMessageTime, HICON, RegisterClassExW, WM_CLOSE, WM_ENDSESSION, WM_LBUTTONDOWN,
    WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEMOVE, WM_RBUTTONDOWN, WM_RBUTTONUP,
    WNDCLASSEXW, WS_EX_TOOLWINDOW, WS_OVERLAPPED,
};
use winit_core::event::{ElementState, MouseButton};

use crate::msg::{TASKBAR_CREATED_MSG_ID, TRAY_CALLBACK_MSG_ID};

pub const BACKEND_NAME: &str = "win32-notify-icon";

const WINDOW_CLASS: &str = "RemoteTrayNotifyIcon";
const TRAY_ICON_UID: u32 = 1;

/// The shell notification area is part of every desktop session.
pub fn is_available() -> bool {
    true
}

/// Tray event for a notify-icon callback whose LPARAM carried `mouse_msg`.
fn notify_event(mouse_msg: u32, position: PhysicalPosition<f64>, time: u32) -> Option<TrayEvent> {
    let click = |button: MouseButton, state: ElementState| {
        Some(TrayEvent::Click {
            button,
            state,
            time,
        })
    };
    match mouse_msg {
        WM_LBUTTONDOWN => click(MouseButton::Left, ElementState::Pressed),
        WM_LBUTTONUP => click(MouseButton::Left, ElementState::Released),
        WM_RBUTTONDOWN => click(MouseButton::Right, ElementState::Pressed),
        WM_RBUTTONUP => click(MouseButton::Right, ElementState::Released),
        WM_MBUTTONDOWN => click(MouseButton::Middle, ElementState::Pressed),
        WM_MBUTTONUP => click(MouseButton::Middle, ElementState::Released),
        WM_MOUSEMOVE => Some(TrayEvent::MouseOver {
            position: Some(position),
        }),
        _ => None,
    }
}

/// Per-window state reached from the window procedure through `GWL_USERDATA`.
struct TrayWindowData {
    tray_id: TrayId,
    proxy: TrayProxy,
    callback_msg: u32,
    taskbar_created_msg: u32,
    nid: Cell<NOTIFYICONDATAW>,
}

impl TrayWindowData {
    fn send(&self, event: TrayEvent) {
        trace!(?event, "notify icon event");
        (self.proxy)(self.tray_id, event);
    }

    fn add_icon(&self) -> bool {
        let nid = self.nid.get();
        unsafe { Shell_NotifyIconW(NIM_ADD, &nid) != 0 }
    }
}

/// Windows notification-area icon, owned by a hidden tool window on the event-loop thread.
pub struct Tray {
    tray_id: TrayId,
    window: HWND,
    hicon: Option<HICON>,
    data: Box<TrayWindowData>,
}

impl std::fmt::Debug for Tray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tray")
            .field("tray_id", &self.tray_id)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl Tray {
    /// Must be called on the thread running the event loop, which pumps the window's messages.
    pub fn new(proxy: TrayProxy, attr: &TrayAttributes) -> Result<Self> {
        let tray_id = TrayId::next();
        debug!(?tray_id, title = %attr.title, "Creating notify icon");

        let callback_msg = TRAY_CALLBACK_MSG_ID
            .get()
            .context("Failed to register the notify-icon callback message")?;
        let taskbar_created_msg = TASKBAR_CREATED_MSG_ID
            .get()
            .context("Failed to register the TaskbarCreated message")?;

        let class_name = util::encode_wide(WINDOW_CLASS);
        let class = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            style: 0,
            lpfnWndProc: Some(tray_window_callback),
            cbClsExtra: 0,
            cbWndExtra: 0,
            hInstance: util::get_instance_handle(),
            hIcon: ptr::null_mut(),
            hCursor: ptr::null_mut(),
            hbrBackground: ptr::null_mut(),
            lpszMenuName: ptr::null(),
            lpszClassName: class_name.as_ptr(),
            hIconSm: ptr::null_mut(),
        };
        // Registering the class again for a second tray fails harmlessly.
        unsafe { RegisterClassExW(&class) };

        // A hidden top-level window, not a message-only one: those miss the TaskbarCreated
        // broadcast.
        let window = unsafe {
            CreateWindowExW(
                WS_EX_TOOLWINDOW,
                class_name.as_ptr(),
                ptr::null(),
                WS_OVERLAPPED,
                0,
                0,
                0,
                0,
                ptr::null_mut(),
                ptr::null_mut(),
                util::get_instance_handle(),
                ptr::null(),
            )
        };
        if window.is_null() {
            return Err(anyhow::Error::new(std::io::Error::last_os_error())
                .context("Failed to create notify-icon window"));
        }

        let hicon = attr.icon.as_ref().and_then(util::icon_to_hicon);
        if attr.icon.is_some() && hicon.is_none() {
            warn!("Tray icon could not be converted, showing an empty icon");
        }

        let mut nid: NOTIFYICONDATAW = unsafe { std::mem::zeroed() };
        nid.cbSize = std::mem::size_of::<NOTIFYICONDATAW>() as u32;
        nid.hWnd = window;
        nid.uID = TRAY_ICON_UID;
        nid.uFlags = NIF_MESSAGE | NIF_TIP | if hicon.is_some() { NIF_ICON } else { 0 };
        nid.uCallbackMessage = callback_msg;
        nid.hIcon = hicon.unwrap_or(ptr::null_mut());
        util::copy_wide(attr.tooltip_or_title(), &mut nid.szTip);

        let data = Box::new(TrayWindowData {
            tray_id,
            proxy,
            callback_msg,
            taskbar_created_msg,
            nid: Cell::new(nid),
        });
        unsafe {
            util::set_window_long(window, GWL_USERDATA, &*data as *const TrayWindowData as isize)
        };

        let tray = Tray {
            tray_id,
            window,
            hicon,
            data,
        };
        // On failure `tray` is dropped here, which destroys the window again.
        if !tray.data.add_icon() {
            bail!(
                "Shell_NotifyIconW(NIM_ADD) failed: {}",
                std::io::Error::last_os_error()
            );
        }
        debug!("Added notify icon");
        Ok(tray)
    }
}

impl TrayBackend for Tray {
    fn id(&self) -> TrayId {
        self.tray_id
    }

    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn set_tooltip(&mut self, tooltip: &str) -> Result<()> {
        let mut nid = self.data.nid.get();
        util::copy_wide(tooltip, &mut nid.szTip);
        self.data.nid.set(nid);

        let mut modify = nid;
        modify.uFlags = NIF_TIP;
        if unsafe { Shell_NotifyIconW(NIM_MODIFY, &modify) } == 0 {
            return Err(anyhow!(
                "Failed to update notify-icon tooltip: {}",
                std::io::Error::last_os_error()
            ));
        }
        Ok(())
    }

    fn geometry(&self) -> Result<TrayGeometry> {
        let mut identifier: NOTIFYICONIDENTIFIER = unsafe { std::mem::zeroed() };
        identifier.cbSize = std::mem::size_of::<NOTIFYICONIDENTIFIER>() as u32;
        identifier.hWnd = self.window;
        identifier.uID = TRAY_ICON_UID;

        let mut rect = RECT {
            left: 0,
            top: 0,
            right: 0,
            bottom: 0,
        };
        let hr = unsafe { Shell_NotifyIconGetRect(&identifier, &mut rect) };
        if hr != 0 {
            bail!("Shell_NotifyIconGetRect failed: HRESULT {hr:#010x}");
        }
        Ok(TrayGeometry::new(
            rect.left,
            rect.top,
            (rect.right - rect.left).max(0) as u32,
            (rect.bottom - rect.top).max(0) as u32,
        ))
    }
}

impl Drop for Tray {
    fn drop(&mut self) {
        debug!(tray_id = ?self.tray_id, "Removing notify icon");
        unsafe {
            util::set_window_long(self.window, GWL_USERDATA, 0);
            let nid = self.data.nid.get();
            Shell_NotifyIconW(NIM_DELETE, &nid);
            DestroyWindow(self.window);
            if let Some(hicon) = self.hicon {
                DestroyIcon(hicon);
            }
        }
    }
}

unsafe extern "system" fn tray_window_callback(
    window: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let userdata =
        unsafe { util::get_window_long(window, GWL_USERDATA) } as *const TrayWindowData;
    if userdata.is_null() {
        return unsafe { DefWindowProcW(window, msg, wparam, lparam) };
    }
    // SAFETY: set from the owning `Tray`, which clears it before the data is freed.
    let data = unsafe { &*userdata };

    if msg == data.callback_msg {
        let mut point = POINT { x: 0, y: 0 };
        unsafe { GetCursorPos(&mut point) };
        let position = PhysicalPosition::new(point.x as f64, point.y as f64);
        let time = unsafe { GetMessageTime() } as u32;
        if let Some(event) = notify_event((lparam & 0xFFFF) as u32, position, time) {
            data.send(event);
        }
        return 0;
    }

    if msg == data.taskbar_created_msg {
        debug!("Taskbar recreated, adding notify icon again");
        if !data.add_icon() {
            warn!("Failed to add notify icon after taskbar restart");
        }
        data.send(TrayEvent::GeometryQuery);
        return 0;
    }

    match msg {
        WM_ENDSESSION if wparam != 0 => {
            data.send(TrayEvent::ExitRequested);
            0
        }
        WM_CLOSE => {
            data.send(TrayEvent::ExitRequested);
            0
        }
        _ => unsafe { DefWindowProcW(window, msg, wparam, lparam) },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> PhysicalPosition<f64> {
        PhysicalPosition::new(10.0, 20.0)
    }

    #[test]
    fn buttons_map_to_clicks() {
        assert_eq!(
            notify_event(WM_LBUTTONDOWN, at(), 100),
            Some(TrayEvent::Click {
                button: MouseButton::Left,
                state: ElementState::Pressed,
                time: 100,
            })
        );
        assert_eq!(
            notify_event(WM_RBUTTONUP, at(), 200),
            Some(TrayEvent::Click {
                button: MouseButton::Right,
                state: ElementState::Released,
                time: 200,
            })
        );
    }

    #[test]
    fn mouse_move_is_mouseover() {
        assert_eq!(
            notify_event(WM_MOUSEMOVE, at(), 0),
            Some(TrayEvent::MouseOver {
                position: Some(at())
            })
        );
    }

    #[test]
    fn other_messages_are_dropped() {
        assert_eq!(notify_event(WM_CLOSE, at(), 0), None);
    }
}
