//! A minimal, concrete [`RuntimeAccessor`]. The real managed runtime this
//! engine samples is out of scope; this stand-in hands back the
//! calling thread's own OS tid, reinterpreted as an opaque handle, so the
//! demo binary and the integration tests have something real to pass
//! through to the recorder.

use std::ptr;

use super::traits::{RuntimeAccessor, RuntimeEnv};

pub struct TidAsRuntimeEnv;

impl RuntimeAccessor for TidAsRuntimeEnv {
    fn current_runtime_env(&self) -> RuntimeEnv {
        let tid = unsafe { libc::syscall(libc::SYS_gettid) as usize };
        if tid == 0 {
            ptr::null_mut()
        } else {
            tid as RuntimeEnv
        }
    }
}
