// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Windows wait event: an unnamed kernel event object.

use std::io;
use std::ptr;

use windows_sys::Win32::Foundation::HANDLE;

pub struct PlatformEvent {
    handle: HANDLE,
}

unsafe impl Send for PlatformEvent {}
unsafe impl Sync for PlatformEvent {}

impl PlatformEvent {
    pub fn new(manual: bool) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::{FALSE, TRUE};
        use windows_sys::Win32::System::Threading::CreateEventW;

        let manual = if manual { TRUE } else { FALSE };
        let h = unsafe { CreateEventW(ptr::null(), manual, FALSE, ptr::null()) };
        if h.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { handle: h })
    }

    pub fn set(&self) -> io::Result<()> {
        use windows_sys::Win32::System::Threading::SetEvent;

        if unsafe { SetEvent(self.handle) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn reset(&self) -> io::Result<()> {
        use windows_sys::Win32::System::Threading::ResetEvent;

        if unsafe { ResetEvent(self.handle) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        use windows_sys::Win32::Foundation::*;
        use windows_sys::Win32::System::Threading::*;

        // INFINITE is u32::MAX; clamp finite waits just below it.
        let ms = match timeout_ms {
            None => INFINITE,
            Some(ms) => ms.min(u64::from(INFINITE - 1)) as u32,
        };
        let ret = unsafe { WaitForSingleObject(self.handle, ms) };
        match ret {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(io::Error::last_os_error()),
        }
    }
}

impl Drop for PlatformEvent {
    fn drop(&mut self) {
        use windows_sys::Win32::Foundation::CloseHandle;
        if !self.handle.is_null() {
            unsafe { CloseHandle(self.handle) };
        }
    }
}
