//! Linux signals module
//! Delivers signals through a descriptor the event loop can poll.

// std
use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

// libc
use libc::{c_int, c_void, sigset_t, signalfd_siginfo, SFD_CLOEXEC, SIGINT, SIGQUIT, SIGTERM, SIG_BLOCK};

/// signals ending the probe
pub const TERMINATION_SIGNALS: [c_int; 3] = [SIGINT, SIGQUIT, SIGTERM];

// is_termination() function
pub fn is_termination(signo: u32) -> bool {
    TERMINATION_SIGNALS.iter().any(|s| *s as u32 == signo)
}

/// Signal Channel Structure
#[derive(Debug)]
pub struct SignalChannel {
    fd: OwnedFd,
}

impl SignalChannel {
    // open() method
    /// Block `signals` for the calling thread and route them to a signalfd.
    pub fn open(signals: &[c_int]) -> io::Result<SignalChannel> {
        let mut mask: sigset_t = unsafe { mem::zeroed() };
        unsafe {
            libc::sigemptyset(&mut mask);
            for signo in signals {
                if libc::sigaddset(&mut mask, *signo) == -1 {
                    return Err(io::Error::last_os_error());
                }
            }
            if libc::sigprocmask(SIG_BLOCK, &mask, std::ptr::null_mut()) == -1 {
                return Err(io::Error::last_os_error());
            }
        }
        match unsafe { libc::signalfd(-1, &mask, SFD_CLOEXEC) } {
            -1 => Err(io::Error::last_os_error()),
            fd => Ok(SignalChannel {
                fd: unsafe { OwnedFd::from_raw_fd(fd) },
            }),
        }
    }

    // read() method
    /// number of the next pending signal
    pub fn read(&self) -> io::Result<u32> {
        let mut info: signalfd_siginfo = unsafe { mem::zeroed() };
        let size = mem::size_of::<signalfd_siginfo>();
        let res = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &mut info as *mut signalfd_siginfo as *mut c_void,
                size,
            )
        };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        if res as usize != size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "short read on signalfd",
            ));
        }
        Ok(info.ssi_signo)
    }
}

impl AsRawFd for SignalChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
