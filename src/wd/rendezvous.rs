//! Named POSIX semaphore used to rendezvous between the guarded program,
//! its forked `wd-exec` child, and the monitoring thread the guarded
//! program spawns on itself.

use std::ffi::CString;

use crate::error::{WdError, WdResult};

const SEM_NAME: &str = "/wd_sem";

/// A handle on the shared named semaphore. Every participant opens its own
/// handle by name; the kernel keeps one counter shared across all of them.
pub struct Rendezvous {
    sem: *mut libc::sem_t,
}

unsafe impl Send for Rendezvous {}
unsafe impl Sync for Rendezvous {}

impl Rendezvous {
    /// Open (creating if absent) the shared semaphore, initial count 0.
    pub fn open() -> WdResult<Self> {
        let name = CString::new(SEM_NAME).expect("constant contains no NUL");
        let sem = unsafe {
            libc::sem_open(
                name.as_ptr(),
                libc::O_CREAT,
                (libc::S_IRUSR | libc::S_IWUSR) as libc::c_uint,
                0u32,
            )
        };

        if sem == libc::SEM_FAILED {
            return Err(WdError::Rendezvous(format!(
                "sem_open({SEM_NAME}) failed: {}",
                std::io::Error::last_os_error()
            )));
        }

        Ok(Self { sem })
    }

    /// Block until another participant posts.
    pub fn wait(&self) -> WdResult<()> {
        if unsafe { libc::sem_wait(self.sem) } == -1 {
            return Err(WdError::Rendezvous(format!(
                "sem_wait failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    /// Wake one waiter.
    pub fn post(&self) -> WdResult<()> {
        if unsafe { libc::sem_post(self.sem) } == -1 {
            return Err(WdError::Rendezvous(format!(
                "sem_post failed: {}",
                std::io::Error::last_os_error()
            )));
        }
        Ok(())
    }

    /// Remove the name from the system so a later `open` starts fresh.
    /// Only the side tearing down the whole supervision setup should call
    /// this (mirrors the source's `FreeAllocatedResources`).
    pub fn unlink() {
        if let Ok(name) = CString::new(SEM_NAME) {
            unsafe {
                libc::sem_unlink(name.as_ptr());
            }
        }
    }
}

impl Drop for Rendezvous {
    fn drop(&mut self) {
        if !self.sem.is_null() && self.sem != libc::SEM_FAILED {
            unsafe {
                libc::sem_close(self.sem);
            }
        }
    }
}
