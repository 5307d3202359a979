//! linux privileges module
//! POSIX capabilities through capget(2)/capset(2), and a user id fallback.
use crate::error::Error;
use crate::privs::PrivilegeBracket;

// libc
use libc::{c_int, pid_t, uid_t, PR_SET_KEEPCAPS};

// std
use std::io;

// linux/capability.h
const LINUX_CAPABILITY_VERSION_3: u32 = 0x2008_0522;
const CAP_NET_RAW: u32 = 13;

/// cap_user_header Structure
#[allow(non_camel_case_types)]
#[repr(C)]
struct cap_user_header {
    version: u32,
    pid: c_int,
}

/// cap_user_data Structure
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct cap_user_data {
    effective: u32,
    permitted: u32,
    inheritable: u32,
}

type CapSets = [cap_user_data; 2];

// capget() function
fn capget() -> io::Result<CapSets> {
    let mut hdr = cap_user_header {
        version: LINUX_CAPABILITY_VERSION_3,
        pid: 0,
    };
    let mut data = CapSets::default();
    let res = unsafe {
        libc::syscall(
            libc::SYS_capget,
            &mut hdr as *mut cap_user_header,
            data.as_mut_ptr(),
        )
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(data)
}

// capset() function
fn capset(data: &CapSets) -> io::Result<()> {
    let mut hdr = cap_user_header {
        version: LINUX_CAPABILITY_VERSION_3,
        pid: 0 as pid_t,
    };
    let res = unsafe {
        libc::syscall(
            libc::SYS_capset,
            &mut hdr as *mut cap_user_header,
            data.as_ptr(),
        )
    };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// raw_bit() function
fn raw_bit() -> u32 {
    1 << (CAP_NET_RAW % 32)
}

// raw_permitted() function
fn raw_permitted(data: &CapSets) -> bool {
    data[(CAP_NET_RAW / 32) as usize].permitted & raw_bit() != 0
}

// only_raw_permitted() function
/// every set cleared but CAP_NET_RAW in the permitted set
fn only_raw_permitted() -> CapSets {
    let mut data = CapSets::default();
    data[(CAP_NET_RAW / 32) as usize].permitted = raw_bit();
    data
}

// with_raw_effective() function
fn with_raw_effective(mut data: CapSets, on: bool) -> CapSets {
    let set = &mut data[(CAP_NET_RAW / 32) as usize];
    if on {
        set.effective |= raw_bit();
    } else {
        set.effective &= !raw_bit();
    }
    data
}

// c_prctl_keepcaps() function
fn c_prctl_keepcaps(on: bool) -> io::Result<()> {
    let res = unsafe { libc::prctl(PR_SET_KEEPCAPS, on as libc::c_ulong, 0, 0, 0) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// c_setuid() function
fn c_setuid(uid: uid_t) -> io::Result<()> {
    if unsafe { libc::setuid(uid) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// c_seteuid() function
fn c_seteuid(uid: uid_t) -> io::Result<()> {
    if unsafe { libc::seteuid(uid) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Capability Bracket Structure
#[derive(Debug)]
pub struct CapabilityBracket {
    raw_permitted: bool,
}

impl CapabilityBracket {
    // limit() method
    /// Keep CAP_NET_RAW alone in the permitted set and return to the real uid.
    pub fn limit() -> Result<CapabilityBracket, Error> {
        let data = capget().map_err(|e| Error::Privilege("capget", e))?;
        let raw = raw_permitted(&data);
        if raw {
            if let Err(e) = capset(&only_raw_permitted()) {
                if e.raw_os_error() != Some(libc::EPERM) {
                    return Err(Error::Privilege("capset", e));
                }
            }
        }
        c_prctl_keepcaps(true).map_err(|e| Error::Privilege("prctl", e))?;
        c_setuid(unsafe { libc::getuid() }).map_err(|e| Error::Privilege("setuid", e))?;
        c_prctl_keepcaps(false).map_err(|e| Error::Privilege("prctl", e))?;
        Ok(CapabilityBracket { raw_permitted: raw })
    }

    // modify_raw() method
    fn modify_raw(&self, on: bool) -> io::Result<()> {
        if !self.raw_permitted {
            return if on {
                Err(io::Error::from_raw_os_error(libc::EPERM))
            } else {
                Ok(())
            };
        }
        let data = capget()?;
        capset(&with_raw_effective(data, on))
    }
}

impl PrivilegeBracket for CapabilityBracket {
    fn acquire(&mut self) -> io::Result<()> {
        self.modify_raw(true)
    }
    fn release(&mut self) -> io::Result<()> {
        self.modify_raw(false)
    }
    fn drop_permanently(&mut self) -> io::Result<()> {
        capset(&CapSets::default())
    }
}

/// User Id Bracket Structure
#[derive(Debug)]
pub struct UidBracket {
    ruid: uid_t,
    euid: uid_t,
}

impl UidBracket {
    // limit() method
    /// Run with the real user id until privileges are acquired.
    pub fn limit() -> Result<UidBracket, Error> {
        let bracket = UidBracket {
            ruid: unsafe { libc::getuid() },
            euid: unsafe { libc::geteuid() },
        };
        if bracket.ruid != bracket.euid {
            c_seteuid(bracket.ruid).map_err(|e| Error::Privilege("seteuid", e))?;
        }
        Ok(bracket)
    }
}

impl PrivilegeBracket for UidBracket {
    fn acquire(&mut self) -> io::Result<()> {
        c_seteuid(self.euid)
    }
    fn release(&mut self) -> io::Result<()> {
        c_seteuid(self.ruid)
    }
    fn drop_permanently(&mut self) -> io::Result<()> {
        if unsafe { libc::setresuid(self.ruid, self.ruid, self.ruid) } < 0 {
            return Err(io::Error::last_os_error());
        }
        if self.ruid != self.euid && unsafe { libc::seteuid(self.euid) } == 0 {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "elevated user id can be regained",
            ));
        }
        Ok(())
    }
}

// limit_privileges() function
/// Limit the process privileges, using capabilities when the kernel has them.
pub fn limit_privileges() -> Result<Box<dyn PrivilegeBracket>, Error> {
    match capget() {
        Ok(_) => Ok(Box::new(CapabilityBracket::limit()?)),
        Err(_) => Ok(Box::new(UidBracket::limit()?)),
    }
}
