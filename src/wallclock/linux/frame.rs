//! A [`FrameInspector`] built from the `ucontext_t` delivered to the
//! signal handler on `x86_64-unknown-linux-gnu`.

use crate::wallclock::traits::FrameInspector;

/// `x86_64`'s two-byte `syscall` opcode.
const SYSCALL_OPCODE: [u8; 2] = [0x0f, 0x05];

pub struct UcontextFrame {
    pc: usize,
    rax: i64,
}

impl UcontextFrame {
    /// # Safety
    /// `ucontext` must be a valid, non-null pointer to the `ucontext_t`
    /// delivered by the kernel to a `SA_SIGINFO` handler for the duration
    /// of this call.
    pub unsafe fn from_raw(ucontext: *const libc::c_void) -> Self {
        let uc = ucontext as *const libc::ucontext_t;
        let gregs = &(*uc).uc_mcontext.gregs;
        let pc = gregs[libc::REG_RIP as usize] as usize;
        let rax = gregs[libc::REG_RAX as usize];
        Self { pc, rax }
    }
}

impl FrameInspector for UcontextFrame {
    fn pc(&self) -> usize {
        self.pc
    }

    fn is_syscall(&self, addr: usize) -> bool {
        // SAFETY: callers of `classify` only probe addresses they've
        // already established are safe to read (same page as the
        // interrupted PC, or confirmed mapped by the library oracle).
        let bytes = unsafe { std::slice::from_raw_parts(addr as *const u8, 2) };
        bytes == SYSCALL_OPCODE
    }

    fn check_interrupted_syscall(&self) -> bool {
        // the kernel leaves the syscall return value register holding
        // -EINTR when a syscall was interrupted by signal delivery before
        // it restarted or returned to userspace.
        self.rax == -(libc::EINTR as i64)
    }
}
