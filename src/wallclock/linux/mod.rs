//! Concrete Linux implementations of the external interfaces defined in
//! [`super::traits`]. Gated to `target_os = "linux"`, consistent with how
//! other OS-specific samplers in this codebase are gated.

mod frame;
mod oracle;
mod os;

pub use frame::UcontextFrame;
pub use oracle::ProcMapsOracle;
pub use os::LinuxOs;
