//! Live process access via the Win32 debug API.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use tracing::{debug, warn};

use windows::Win32::Foundation::{CloseHandle, HANDLE, HMODULE};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::ProcessStatus::{
    EnumProcessModulesEx, GetModuleInformation, LIST_MODULES_32BIT, MODULEINFO,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ,
    PROCESS_VM_WRITE,
};

use crate::error::{Error, Result};
use crate::memory::GameMemory;

/// An opened handle to the game process plus its main-module base.
pub struct ProcessHandle {
    handle: HANDLE,
    pid: u32,
    base_address: u32,
}

// The raw HANDLE is only used through synchronized Win32 calls.
unsafe impl Send for ProcessHandle {}
unsafe impl Sync for ProcessHandle {}

impl ProcessHandle {
    pub fn open(pid: u32) -> Result<Self> {
        // SAFETY: OpenProcess with a valid access mask and a PID from the
        // ToolHelp snapshot; the handle is closed in Drop.
        let handle = unsafe {
            OpenProcess(
                PROCESS_QUERY_INFORMATION
                    | PROCESS_VM_READ
                    | PROCESS_VM_WRITE
                    | PROCESS_VM_OPERATION,
                false,
                pid,
            )
            .map_err(|e| Error::ProcessOpenFailed(format!("pid {pid}: {e}")))?
        };

        let base_address = main_module_base(handle)?;
        debug!("Opened process {pid}, base {base_address:#010x}");

        Ok(Self {
            handle,
            pid,
            base_address,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.handle.is_invalid() {
            // SAFETY: the handle came from OpenProcess and is closed once.
            if let Err(e) = unsafe { CloseHandle(self.handle) } {
                warn!("Failed to close process handle: {}", e);
            }
        }
    }
}

fn main_module_base(handle: HANDLE) -> Result<u32> {
    let mut modules = [HMODULE::default(); 1];
    let mut needed: u32 = 0;

    // SAFETY: valid process handle; the one-element array receives the
    // main executable module, which is all this needs.
    unsafe {
        EnumProcessModulesEx(
            handle,
            modules.as_mut_ptr(),
            std::mem::size_of_val(&modules) as u32,
            &mut needed,
            LIST_MODULES_32BIT,
        )
        .map_err(|e| Error::ProcessOpenFailed(format!("module enumeration failed: {e}")))?;
    }

    if needed == 0 {
        return Err(Error::ProcessOpenFailed("no modules in process".into()));
    }

    let mut info = MODULEINFO::default();
    // SAFETY: valid handle, module, and an out-struct of the right size.
    unsafe {
        GetModuleInformation(
            handle,
            modules[0],
            &mut info,
            std::mem::size_of::<MODULEINFO>() as u32,
        )
        .map_err(|e| Error::ProcessOpenFailed(format!("module info failed: {e}")))?;
    }

    Ok(info.lpBaseOfDll as u32)
}

/// Find the game process by executable name (case-insensitive).
pub fn find_game_process(exe_name: &str) -> Result<u32> {
    // SAFETY: snapshot handle is closed before returning on every path.
    let snapshot = unsafe {
        CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| Error::ProcessNotFound(format!("snapshot failed: {e}")))?
    };

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    // SAFETY: entry.dwSize is initialized as the iteration API requires;
    // szExeFile is null-terminated by the API.
    let result = unsafe {
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let name = OsString::from_wide(&entry.szExeFile[..len]);
                if name.to_string_lossy().eq_ignore_ascii_case(exe_name) {
                    let _ = CloseHandle(snapshot);
                    return Ok(entry.th32ProcessID);
                }
                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        Err(Error::ProcessNotFound(exe_name.to_string()))
    };

    // SAFETY: snapshot is a valid handle from CreateToolhelp32Snapshot.
    let _ = unsafe { CloseHandle(snapshot) };
    result
}

/// [`GameMemory`] over a live [`ProcessHandle`].
pub struct ProcessMemory {
    process: ProcessHandle,
}

impl ProcessMemory {
    pub fn new(process: ProcessHandle) -> Self {
        Self { process }
    }
}

impl GameMemory for ProcessMemory {
    fn read_bytes(&self, address: u32, buf: &mut [u8]) -> Result<()> {
        let mut bytes_read = 0usize;
        // SAFETY: valid process handle, caller-owned buffer of the
        // requested size, out-param for the transfer count. Failures
        // surface as Err.
        unsafe {
            ReadProcessMemory(
                self.process.handle,
                address as usize as *const _,
                buf.as_mut_ptr() as *mut _,
                buf.len(),
                Some(&mut bytes_read),
            )
            .map_err(|e| Error::MemoryRead {
                address,
                message: e.to_string(),
            })?;
        }

        // Partial reads are treated as failures: game structures are only
        // meaningful when read whole.
        if bytes_read != buf.len() {
            return Err(Error::MemoryRead {
                address,
                message: format!("expected {} bytes, read {}", buf.len(), bytes_read),
            });
        }
        Ok(())
    }

    fn write_bytes(&self, address: u32, bytes: &[u8]) -> Result<()> {
        let mut bytes_written = 0usize;
        // SAFETY: valid process handle and a caller-owned source buffer.
        unsafe {
            WriteProcessMemory(
                self.process.handle,
                address as usize as *const _,
                bytes.as_ptr() as *const _,
                bytes.len(),
                Some(&mut bytes_written),
            )
            .map_err(|e| Error::MemoryWrite {
                address,
                message: e.to_string(),
            })?;
        }

        if bytes_written != bytes.len() {
            return Err(Error::MemoryWrite {
                address,
                message: format!("expected {} bytes, wrote {}", bytes.len(), bytes_written),
            });
        }
        Ok(())
    }

    fn base_address(&self) -> u32 {
        self.process.base_address
    }
}
