use std::sync::atomic::{AtomicU32, Ordering};

use windows_sys::Win32::UI::WindowsAndMessaging::RegisterWindowMessageA;

/// A lazily registered window message ID.
pub struct LazyMessageId {
    id: AtomicU32,
    /// NUL-terminated message name.
    name: &'static str,
}

const INVALID_ID: u32 = 0x0;

impl LazyMessageId {
    const fn new(name: &'static str) -> Self {
        Self {
            id: AtomicU32::new(INVALID_ID),
            name,
        }
    }

    pub fn get(&self) -> std::io::Result<u32> {
        let id = self.id.load(Ordering::Relaxed);
        if id != INVALID_ID {
            return Ok(id);
        }

        debug_assert!(self.name.ends_with('\0'));
        // SAFETY: `name` is a NUL-terminated string with static lifetime.
        let new_id = unsafe { RegisterWindowMessageA(self.name.as_ptr()) };
        if new_id == INVALID_ID {
            return Err(std::io::Error::last_os_error());
        }

        // `RegisterWindowMessageA` returns the same value for a given name, so racing stores agree.
        self.id.store(new_id, Ordering::Relaxed);
        Ok(new_id)
    }
}

/// Sent by the shell for notify-icon interaction. LPARAM carries the mouse message.
pub(crate) static TRAY_CALLBACK_MSG_ID: LazyMessageId =
    LazyMessageId::new("RemoteTray::NotifyIconCallback\0");

/// Broadcast by Explorer when the taskbar is (re)created; icons must be added again.
pub(crate) static TASKBAR_CREATED_MSG_ID: LazyMessageId = LazyMessageId::new("TaskbarCreated\0");
