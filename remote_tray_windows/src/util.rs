use std::ffi::OsStr;
use std::iter::once;
use std::os::windows::ffi::OsStrExt as _;

use windows_sys::Win32::Foundation::{HMODULE, HWND};
use windows_sys::Win32::System::SystemServices::IMAGE_DOS_HEADER;
use windows_sys::Win32::UI::WindowsAndMessaging::{CreateIcon, HICON, WINDOW_LONG_PTR_INDEX};
use winit_core::icon::{Icon, RgbaIcon};

pub fn get_instance_handle() -> HMODULE {
    // Gets the instance handle by taking the address of the
    // pseudo-variable created by the microsoft linker:
    // https://devblogs.microsoft.com/oldnewthing/20041025-00/?p=37483
    unsafe extern "C" {
        static __ImageBase: IMAGE_DOS_HEADER;
    }

    unsafe { &__ImageBase as *const _ as _ }
}

#[inline(always)]
pub(crate) unsafe fn get_window_long(hwnd: HWND, nindex: WINDOW_LONG_PTR_INDEX) -> isize {
    #[cfg(target_pointer_width = "64")]
    return unsafe { windows_sys::Win32::UI::WindowsAndMessaging::GetWindowLongPtrW(hwnd, nindex) };
    #[cfg(target_pointer_width = "32")]
    return unsafe {
        windows_sys::Win32::UI::WindowsAndMessaging::GetWindowLongW(hwnd, nindex) as isize
    };
}

#[inline(always)]
pub(crate) unsafe fn set_window_long(
    hwnd: HWND,
    nindex: WINDOW_LONG_PTR_INDEX,
    dwnewlong: isize,
) -> isize {
    #[cfg(target_pointer_width = "64")]
    return unsafe {
        windows_sys::Win32::UI::WindowsAndMessaging::SetWindowLongPtrW(hwnd, nindex, dwnewlong)
    };
    #[cfg(target_pointer_width = "32")]
    return unsafe {
        windows_sys::Win32::UI::WindowsAndMessaging::SetWindowLongW(hwnd, nindex, dwnewlong as i32)
            as isize
    };
}

pub fn encode_wide(string: impl AsRef<OsStr>) -> Vec<u16> {
    string.as_ref().encode_wide().chain(once(0)).collect()
}

/// Copy `text` into a fixed-size, NUL-terminated UTF-16 buffer, truncating as needed.
pub(crate) fn copy_wide<const N: usize>(text: &str, buffer: &mut [u16; N]) {
    buffer.fill(0);
    for (slot, unit) in buffer[..N - 1].iter_mut().zip(text.encode_utf16()) {
        *slot = unit;
    }
}

/// RGBA rows to the BGRA layout `CreateIcon` expects for 32-bit colour.
pub(crate) fn rgba_to_bgra(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| [px[2], px[1], px[0], px[3]])
        .collect()
}

/// Build an icon handle from a winit icon. The caller owns the handle.
pub(crate) fn icon_to_hicon(icon: &Icon) -> Option<HICON> {
    let rgba = icon.0.cast_ref::<RgbaIcon>()?;
    let (width, height) = (rgba.width(), rgba.height());
    let bgra = rgba_to_bgra(rgba.buffer());
    // Colour carries alpha, so the AND mask is fully transparent.
    let mask = vec![0u8; (width as usize).div_ceil(8) * height as usize];

    let hicon = unsafe {
        CreateIcon(
            get_instance_handle(),
            width as i32,
            height as i32,
            1,
            32,
            mask.as_ptr(),
            bgra.as_ptr(),
        )
    };
    (!hicon.is_null()).then_some(hicon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tooltip_is_truncated_and_terminated() {
        let mut buffer = [0xffffu16; 4];
        copy_wide("hello", &mut buffer);
        assert_eq!(buffer, [b'h' as u16, b'e' as u16, b'l' as u16, 0]);

        copy_wide("", &mut buffer);
        assert_eq!(buffer, [0; 4]);
    }

    #[test]
    fn channels_are_swapped() {
        assert_eq!(rgba_to_bgra(&[1, 2, 3, 4, 5, 6, 7, 8]), vec![3, 2, 1, 4, 7, 6, 5, 8]);
    }

    #[test]
    fn wide_strings_are_nul_terminated() {
        assert_eq!(encode_wide("ab"), vec![b'a' as u16, b'b' as u16, 0]);
    }
}
