//! Fork, exec, and signal primitives the watchdog stack is built from.

use std::env;
use std::ffi::CString;
use std::path::{Path, PathBuf};

use crate::error::{WdError, WdResult};

pub const WD_ENV_VAR: &str = "WD_PID";

fn to_cstring(s: String) -> WdResult<CString> {
    CString::new(s).map_err(|e| WdError::Other(format!("argument contains a NUL byte: {e}")))
}

fn path_to_cstring(path: &Path) -> WdResult<CString> {
    to_cstring(path.to_string_lossy().into_owned())
}

/// Build the argv handed to the watchdog binary: itself, the interval and
/// threshold as decimal strings, then the original program's own argv.
///
/// Grounded on the source's `InitParams` argv layout.
pub fn build_watchdog_argv(
    watchdog_binary: &Path,
    interval_secs: u64,
    threshold: u32,
    original_argv: &[String],
) -> WdResult<Vec<CString>> {
    let mut argv = Vec::with_capacity(original_argv.len() + 3);
    argv.push(path_to_cstring(watchdog_binary)?);
    argv.push(to_cstring(interval_secs.to_string())?);
    argv.push(to_cstring(threshold.to_string())?);
    for arg in original_argv {
        argv.push(to_cstring(arg.clone())?);
    }
    Ok(argv)
}

/// The original program's own argv, unprefixed. Grounded on `ResetUser`,
/// which shifts `argv_wd` left by its three prepended slots; here the
/// untouched `Vec<String>` is still around, so there is nothing to shift.
pub fn user_argv(original_argv: &[String]) -> WdResult<Vec<CString>> {
    original_argv.iter().cloned().map(to_cstring).collect()
}

/// Directory that holds the running binary, used to locate the sibling
/// `wd-exec` binary instead of the source's hardcoded `./wd_exec.out`.
pub fn watchdog_binary_path() -> WdResult<PathBuf> {
    let exe = env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| WdError::Other("current executable has no parent directory".to_string()))?;
    Ok(dir.join("wd-exec"))
}

/// Fork the process. Returns `Some(child_pid)` in the parent, `None` in the
/// child.
pub fn fork() -> WdResult<Option<libc::pid_t>> {
    let pid = unsafe { libc::fork() };
    match pid {
        -1 => Err(WdError::Fork(std::io::Error::last_os_error())),
        0 => Ok(None),
        child => Ok(Some(child)),
    }
}

/// Replace the current process image with `argv[0]`, searched on `PATH`.
/// Never returns on success; the returned error describes why it didn't
/// happen.
pub fn exec(argv: &[CString]) -> WdError {
    let mut raw: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
    raw.push(std::ptr::null());

    unsafe {
        libc::execvp(argv[0].as_ptr(), raw.as_ptr());
    }

    WdError::Exec {
        path: PathBuf::from(argv[0].to_string_lossy().into_owned()),
        source: std::io::Error::last_os_error(),
    }
}

pub fn send_signal(pid: libc::pid_t, signum: libc::c_int) -> WdResult<()> {
    if unsafe { libc::kill(pid, signum) } == -1 {
        return Err(WdError::Io(std::io::Error::last_os_error()));
    }
    Ok(())
}

/// Block until `pid` exits, discarding its exit status.
pub fn reap(pid: libc::pid_t) -> WdResult<()> {
    let mut status: libc::c_int = 0;
    let result = unsafe { libc::waitpid(pid, &mut status, 0) };
    if result == -1 {
        return Err(WdError::Wait {
            pid,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}
