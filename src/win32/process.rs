//! [`ProcessTable`] implementation backed by the ToolHelp snapshot API.

use super::{from_wide, Win32Error};
use crate::traits::{ProcessInfo, ProcessTable};
use std::mem::size_of;
use std::time::Duration;
use windows::Win32::Foundation::{CloseHandle, FALSE, HANDLE, WAIT_OBJECT_0};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    OpenProcess, TerminateProcess, WaitForSingleObject, PROCESS_SYNCHRONIZE, PROCESS_TERMINATE,
};

/// The processes of the local machine.
#[derive(Debug, Default)]
pub struct Win32Processes;

/// Closes the wrapped handle when dropped.
struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

impl ProcessTable for Win32Processes {
    type Error = Win32Error;

    fn current_pid(&self) -> u32 {
        std::process::id()
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>, Win32Error> {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
            .map(OwnedHandle)
            .map_err(|e| Win32Error::new("CreateToolhelp32Snapshot", e))?;

        let mut entry = PROCESSENTRY32W {
            dwSize: size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        let mut processes = Vec::new();
        let mut next = unsafe { Process32FirstW(snapshot.0, &mut entry) };
        while next.is_ok() {
            processes.push(ProcessInfo {
                pid: entry.th32ProcessID,
                name: from_wide(&entry.szExeFile),
            });
            next = unsafe { Process32NextW(snapshot.0, &mut entry) };
        }
        Ok(processes)
    }

    fn terminate(&self, pid: u32) -> Result<(), Win32Error> {
        let process = unsafe { OpenProcess(PROCESS_TERMINATE, FALSE, pid) }
            .map(OwnedHandle)
            .map_err(|e| Win32Error::new("OpenProcess", e))?;
        unsafe { TerminateProcess(process.0, 1) }.map_err(|e| Win32Error::new("TerminateProcess", e))
    }

    fn wait_for_exit(&self, pid: u32, timeout: Duration) -> Result<bool, Win32Error> {
        // A pid that can no longer be opened has already exited.
        let Ok(process) = unsafe { OpenProcess(PROCESS_SYNCHRONIZE, FALSE, pid) }.map(OwnedHandle)
        else {
            return Ok(true);
        };
        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX - 1);
        let status = unsafe { WaitForSingleObject(process.0, millis) };
        Ok(status == WAIT_OBJECT_0)
    }
}
