//! Timers related functions module
//! This module implements the probe interval timer on a timerfd.
use crate::constants::*;
use crate::debug::{print_debug, Verbose};

// std
use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

// libc
use libc::{c_long, c_void, itimerspec, time_t, timespec, CLOCK_MONOTONIC, TFD_CLOEXEC, TFD_TIMER_ABSTIME};

// to_timespec() function
fn to_timespec(d: Duration) -> timespec {
    timespec {
        tv_sec: d.as_secs() as time_t,
        tv_nsec: d.subsec_nanos() as c_long,
    }
}

// add_timespec() function
fn add_timespec(a: timespec, b: timespec) -> timespec {
    let mut sum = timespec {
        tv_sec: a.tv_sec + b.tv_sec,
        tv_nsec: a.tv_nsec + b.tv_nsec,
    };
    if sum.tv_nsec >= 1_000_000_000 {
        sum.tv_sec += 1;
        sum.tv_nsec -= 1_000_000_000;
    }
    sum
}

/// Interval Timer Structure
#[derive(Debug)]
pub struct IntervalTimer {
    fd: OwnedFd,
}

impl IntervalTimer {
    // start() method
    /// Arm a periodic timer whose first expiry is one interval from now.
    pub fn start(interval: Duration, debug: &Verbose) -> io::Result<IntervalTimer> {
        let fd = match unsafe { libc::timerfd_create(CLOCK_MONOTONIC, TFD_CLOEXEC) } {
            -1 => return Err(io::Error::last_os_error()),
            fd => unsafe { OwnedFd::from_raw_fd(fd) },
        };

        let mut now: timespec = unsafe { mem::zeroed() };
        if unsafe { libc::clock_gettime(CLOCK_MONOTONIC, &mut now) } == -1 {
            return Err(io::Error::last_os_error());
        }
        let period = to_timespec(interval);
        let spec = itimerspec {
            it_interval: period,
            it_value: add_timespec(now, period),
        };
        let res = unsafe {
            libc::timerfd_settime(fd.as_raw_fd(), TFD_TIMER_ABSTIME, &spec, std::ptr::null_mut())
        };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }

        print_debug(
            debug,
            DEBUG_LEVEL_HIGH,
            DEBUG_SRC_TIMER,
            format!("interval timer armed every {:?}", interval),
        );
        Ok(IntervalTimer { fd })
    }

    // read() method
    /// number of expirations since the last read
    pub fn read(&self) -> io::Result<u64> {
        let mut expirations: u64 = 0;
        let size = mem::size_of::<u64>();
        let res = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &mut expirations as *mut u64 as *mut c_void,
                size,
            )
        };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        if res as usize != size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "short read on timerfd",
            ));
        }
        Ok(expirations)
    }
}

impl AsRawFd for IntervalTimer {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}
