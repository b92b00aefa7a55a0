//! Platform-specific process management.
//!
//! `terminate_process_tree` is the only place where the termination strategy
//! is chosen per platform.

use crate::error::{DoctorinoError, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Check if a process with the given PID is alive.
///
/// # Platform Behavior
/// - **Linux/macOS**: `kill(pid, 0)`; `EPERM` still means the process exists
/// - **Windows**: `OpenProcess` with `PROCESS_QUERY_LIMITED_INFORMATION`
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        match kill(Pid::from_raw(raw), None) {
            Ok(()) => true,
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }

    #[cfg(windows)]
    {
        is_process_alive_windows(pid)
    }

    #[cfg(not(any(unix, windows)))]
    {
        warn!("Process alive check not implemented for this platform");
        true
    }
}

#[cfg(windows)]
#[allow(unsafe_code)]
fn is_process_alive_windows(pid: u32) -> bool {
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION};

    // SAFETY: OpenProcess has no preconditions on its arguments; the returned
    // handle is closed before leaving the block.
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, 0, pid);
        if !handle.is_null() {
            CloseHandle(handle);
            true
        } else {
            false
        }
    }
}

/// Terminate a process and everything it spawned.
///
/// # Platform Behavior
/// - **Windows**: `taskkill /PID {pid} /T /F` (forceful, whole tree)
/// - **Linux/macOS**: `SIGTERM` to the process group led by `pid` (falling
///   back to the process itself), then `SIGKILL` if it is still alive after
///   `grace`
///
/// Returns `true` if the process is gone (or was never running).
pub async fn terminate_process_tree(pid: u32, grace: Duration) -> Result<bool> {
    if !is_process_alive(pid) {
        debug!("Process {} is not running", pid);
        return Ok(true);
    }

    #[cfg(unix)]
    {
        terminate_unix(pid, grace).await
    }

    #[cfg(windows)]
    {
        let _ = grace;
        terminate_windows(pid).await
    }

    #[cfg(not(any(unix, windows)))]
    {
        let _ = grace;
        Err(DoctorinoError::TerminateFailed {
            pid,
            message: "process termination not implemented for this platform".into(),
        })
    }
}

#[cfg(unix)]
async fn terminate_unix(pid: u32, grace: Duration) -> Result<bool> {
    use nix::sys::signal::Signal;

    send_unix_signal(pid, Signal::SIGTERM)?;

    let poll = Duration::from_millis(100);
    let iterations = (grace.as_millis() / poll.as_millis()).max(1);
    for _ in 0..iterations {
        tokio::time::sleep(poll).await;
        if !is_process_alive(pid) {
            debug!("Process {} terminated gracefully", pid);
            return Ok(true);
        }
    }

    debug!("Process {} still running after {:?}, sending SIGKILL", pid, grace);
    send_unix_signal(pid, Signal::SIGKILL)?;
    tokio::time::sleep(poll).await;

    Ok(!is_process_alive(pid))
}

#[cfg(unix)]
fn send_unix_signal(pid: u32, signal: nix::sys::signal::Signal) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|_| DoctorinoError::TerminateFailed {
        pid,
        message: "pid out of range".into(),
    })?;
    let target = Pid::from_raw(raw);

    // The backend is spawned as its own group leader, so the group id equals the pid.
    debug!("Sending {:?} to process group {}", signal, pid);
    match killpg(target, signal) {
        Ok(()) => return Ok(()),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!("killpg({}, {:?}) failed: {}", pid, signal, e),
    }

    match kill(target, signal) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(DoctorinoError::TerminateFailed {
            pid,
            message: format!("{:?}: {}", signal, e),
        }),
    }
}

#[cfg(windows)]
async fn terminate_windows(pid: u32) -> Result<bool> {
    debug!("Terminating process tree {} with taskkill", pid);

    let output = tokio::process::Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .output()
        .await
        .map_err(|e| DoctorinoError::TerminateFailed {
            pid,
            message: format!("failed to run taskkill: {}", e),
        })?;

    if output.status.success() {
        return Ok(true);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("not found") || stderr.contains("not running") {
        Ok(true)
    } else {
        warn!("taskkill failed for {}: {}", pid, stderr.trim());
        Ok(false)
    }
}
