//! The Linux `Os` facade: `/proc`-backed thread enumeration and state,
//! `tgkill`-based directed signal delivery, and `CLOCK_MONOTONIC` time.

use std::fs;
use std::time::Duration;

use crate::wallclock::traits::{Os, OsThreadState, ThreadList};

pub struct LinuxOs;

impl LinuxOs {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinuxOs {
    fn default() -> Self {
        Self::new()
    }
}

impl Os for LinuxOs {
    fn now_ns(&self) -> i64 {
        let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
        unsafe {
            libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
        }
        ts.tv_sec as i64 * 1_000_000_000 + ts.tv_nsec as i64
    }

    fn sleep(&self, dur: Duration) {
        let mut req = libc::timespec {
            tv_sec: dur.as_secs() as libc::time_t,
            tv_nsec: dur.subsec_nanos() as libc::c_long,
        };
        let mut rem = libc::timespec { tv_sec: 0, tv_nsec: 0 };

        loop {
            let rc = unsafe { libc::nanosleep(&req, &mut rem) };
            if rc == 0 {
                break;
            }
            if unsafe { *libc::__errno_location() } != libc::EINTR {
                break;
            }
            req = rem;
        }
    }

    fn thread_id(&self) -> i32 {
        unsafe { libc::syscall(libc::SYS_gettid) as i32 }
    }

    fn list_threads(&self) -> Box<dyn ThreadList> {
        Box::new(ProcTaskThreadList::new())
    }

    fn thread_state(&self, tid: i32) -> Option<OsThreadState> {
        let status = fs::read_to_string(format!("/proc/self/task/{tid}/status")).ok()?;
        let state_line = status.lines().find(|l| l.starts_with("State:"))?;
        // e.g. "State:\tR (running)"
        let code = state_line.split_whitespace().nth(1)?;
        Some(if code == "R" {
            OsThreadState::Running
        } else {
            OsThreadState::Other
        })
    }

    fn send_signal(&self, tid: i32, signo: i32) -> bool {
        let pid = unsafe { libc::getpid() };
        let rc = unsafe { libc::syscall(libc::SYS_tgkill, pid, tid, signo) };
        rc == 0
    }

    unsafe fn install_signal_handler(
        &self,
        signo: i32,
        handler: extern "C" fn(i32, *mut libc::siginfo_t, *mut libc::c_void),
    ) {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = handler as usize;
        sa.sa_flags = libc::SA_SIGINFO | libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(signo, &sa, std::ptr::null_mut());
    }
}

/// A cursor over `/proc/self/task`, refreshed on `rewind()`.
pub struct ProcTaskThreadList {
    tids: Vec<i32>,
    pos: usize,
}

impl ProcTaskThreadList {
    pub fn new() -> Self {
        let mut list = Self { tids: Vec::new(), pos: 0 };
        list.refresh();
        list
    }

    fn refresh(&mut self) {
        let mut tids: Vec<i32> = fs::read_dir("/proc/self/task")
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str()?.parse::<i32>().ok())
            .collect();
        tids.sort_unstable();
        self.tids = tids;
        self.pos = 0;
    }
}

impl Default for ProcTaskThreadList {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadList for ProcTaskThreadList {
    fn next(&mut self) -> Option<i32> {
        let tid = self.tids.get(self.pos).copied();
        if tid.is_some() {
            self.pos += 1;
        }
        tid
    }

    fn rewind(&mut self) {
        self.refresh();
    }

    fn size(&self) -> usize {
        self.tids.len()
    }
}
