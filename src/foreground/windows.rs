//! Windows foreground window query using the Win32 API.

use super::{ForegroundWindow, LookupError, WindowSnapshot, UNKNOWN_APP};
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, HWND};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Foreground;

impl ForegroundWindow for Win32Foreground {
    fn query(&self) -> Result<WindowSnapshot, LookupError> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            return Err(LookupError::NoForegroundWindow);
        }

        let title = window_title(hwnd);
        // The owning process may have exited between the two calls.
        let app = process_name(hwnd).unwrap_or_else(|| UNKNOWN_APP.to_string());

        Ok(WindowSnapshot { app, title })
    }
}

fn window_title(hwnd: HWND) -> String {
    let len = unsafe { GetWindowTextLengthW(hwnd) };
    if len <= 0 {
        return String::new();
    }

    let mut buf = vec![0u16; len as usize + 1];
    let copied = unsafe { GetWindowTextW(hwnd, &mut buf) };
    String::from_utf16_lossy(&buf[..copied.max(0) as usize])
}

fn process_name(hwnd: HWND) -> Option<String> {
    let mut pid = 0u32;
    unsafe { GetWindowThreadProcessId(hwnd, Some(&mut pid)) };
    if pid == 0 {
        return None;
    }

    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.ok()?;

    let mut buf = [0u16; 1024];
    let mut size = buf.len() as u32;
    let result = unsafe {
        QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            PWSTR(buf.as_mut_ptr()),
            &mut size,
        )
    };
    unsafe {
        let _ = CloseHandle(handle);
    }
    result.ok()?;

    let path = String::from_utf16_lossy(&buf[..size as usize]);
    path.rsplit(|c| c == '\\' || c == '/')
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
