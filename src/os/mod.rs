//! operating systems support module

// drivers
pub mod drivers;

// Linux Operating System support
#[cfg(target_os = "linux")]
pub mod linux;
