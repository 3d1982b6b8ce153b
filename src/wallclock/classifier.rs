//! Decides whether an interrupted thread was executing or blocked inside a
//! syscall. Used only when `sample_idle` is enabled; otherwise threads are
//! pre-filtered to OS-reported running ones and recorded as
//! [`ThreadState::Unknown`](super::traits::ThreadState).

use super::traits::{FrameInspector, LibraryOracle, ThreadState};

/// Architecture-specific facts the classifier needs. Keeping these behind a
/// trait means the classification algorithm itself doesn't change when a
/// new architecture is added -- only this impl does.
pub trait Arch: Send + Sync {
    /// Byte length of this architecture's syscall instruction.
    fn syscall_insn_len(&self) -> usize;
}

/// `x86_64`: the two-byte `syscall` opcode (`0F 05`).
pub struct X86_64;

impl Arch for X86_64 {
    fn syscall_insn_len(&self) -> usize {
        2
    }
}

/// Classifies a sampled thread from its captured frame.
///
/// Reads one instruction behind the interrupted PC only when doing so
/// cannot fault: either the PC is far enough from the start of its memory
/// page that the read can't cross into an unmapped page, or the library
/// oracle confirms the address belongs to a mapped library.
pub fn classify(
    arch: &dyn Arch,
    frame: &dyn FrameInspector,
    oracle: &dyn LibraryOracle,
) -> ThreadState {
    let pc = frame.pc();
    let insn_len = arch.syscall_insn_len();

    if frame.is_syscall(pc) {
        return ThreadState::Sleeping;
    }

    if pc < insn_len {
        return ThreadState::Running;
    }

    let prev_pc = pc - insn_len;

    let page_offset = pc & 0xfff;
    let safe_to_read = page_offset >= insn_len || oracle.find_library(prev_pc).is_some();

    if !safe_to_read {
        return ThreadState::Running;
    }

    if frame.is_syscall(prev_pc) && frame.check_interrupted_syscall() {
        return ThreadState::Sleeping;
    }

    ThreadState::Running
}
