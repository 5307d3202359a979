//! linux specific network device functions module
//! This module interfaces with the linux netdevice kernel API, it is the last
//! resort discovery method.
use crate::device::{check_ifflags, select, Discovery, Interface, Outcome};
use crate::error::Error;
use crate::os::drivers::DiscoveryMethod;

// std, libc, ffi
use libc::{
    c_char, c_int, c_short, c_uchar, c_ulong, c_ushort, ioctl, sockaddr, socket, AF_INET,
    IF_NAMESIZE, SOCK_CLOEXEC, SOCK_DGRAM,
};
use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};

// interfaces enumeration upper bound
const IFCONF_MAX_ENTRIES: usize = 1 << 16;

/// ioctl_ifmap Structure
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Clone, Copy)]
struct ioctl_ifmap {
    mem_start: c_ulong,
    mem_end: c_ulong,
    base_addr: c_ushort,
    irq: c_uchar,
    dma: c_uchar,
    port: c_uchar,
}

/// ioctl_ifru Union
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Clone, Copy)]
union ioctl_ifru {
    ifr_flags: c_short,
    ifr_ifindex: c_int,
    ifr_addr: sockaddr,
    ifr_map: ioctl_ifmap, // largest member, sets the size
}

/// ioctl_ifreq Structure
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Clone, Copy)]
struct ioctl_ifreq {
    ifr_name: [c_char; IF_NAMESIZE],
    ifr_ifru: ioctl_ifru,
}

/// ioctl_ifconf Structure
#[allow(non_camel_case_types)]
#[repr(C)]
struct ioctl_ifconf {
    ifc_len: c_int,
    ifc_buf: *mut c_char,
}

impl ioctl_ifreq {
    // zeroed() method
    fn zeroed() -> ioctl_ifreq {
        // all-zero bytes are a valid ifreq
        unsafe { mem::zeroed() }
    }

    // named() method
    fn named(ifname: &str) -> io::Result<ioctl_ifreq> {
        // check interface name size
        if ifname.len() >= IF_NAMESIZE || ifname.as_bytes().contains(&0) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid interface name {:?}", ifname),
            ));
        }
        let mut ifr = ioctl_ifreq::zeroed();
        for (i, b) in ifname.as_bytes().iter().enumerate() {
            ifr.ifr_name[i] = *b as c_char;
        }
        Ok(ifr)
    }

    // name() method
    fn name(&self) -> Option<String> {
        let bytes: Vec<u8> = self
            .ifr_name
            .iter()
            .take_while(|c| **c != 0)
            .map(|c| *c as u8)
            .collect();
        if bytes.is_empty() {
            return None;
        }
        String::from_utf8(bytes).ok()
    }
}

// open_ctl_socket() function
/// datagram socket used as a handle for the netdevice ioctls
fn open_ctl_socket() -> io::Result<OwnedFd> {
    match unsafe { socket(AF_INET, SOCK_DGRAM | SOCK_CLOEXEC, 0) } {
        -1 => Err(io::Error::last_os_error()),
        fd => Ok(unsafe { OwnedFd::from_raw_fd(fd) }),
    }
}

// get_if_flags() function
/// see 'man 7 netdevice', SIOCGIFFLAGS
fn get_if_flags(sockfd: &OwnedFd, ifr: &mut ioctl_ifreq) -> io::Result<u32> {
    let res = unsafe { ioctl(sockfd.as_raw_fd(), libc::SIOCGIFFLAGS, ifr as *mut ioctl_ifreq) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { ifr.ifr_ifru.ifr_flags } as u16 as u32)
}

// get_if_index() function
/// see 'man 7 netdevice', SIOCGIFINDEX
fn get_if_index(sockfd: &OwnedFd, ifr: &mut ioctl_ifreq) -> io::Result<i32> {
    let res = unsafe { ioctl(sockfd.as_raw_fd(), libc::SIOCGIFINDEX, ifr as *mut ioctl_ifreq) };
    if res < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { ifr.ifr_ifru.ifr_ifindex })
}

// list_if_names() function
/// Enumerate the configured interfaces with SIOCGIFCONF.
///
/// The buffer is doubled until the kernel leaves room to spare. Interfaces
/// carrying several addresses appear once.
fn list_if_names(sockfd: &OwnedFd) -> io::Result<Vec<String>> {
    let ifrsize = mem::size_of::<ioctl_ifreq>();
    let mut entries = 1;
    loop {
        let mut buf = vec![ioctl_ifreq::zeroed(); entries];
        let mut ifc = ioctl_ifconf {
            ifc_len: (entries * ifrsize) as c_int,
            ifc_buf: buf.as_mut_ptr() as *mut c_char,
        };
        let res = unsafe { ioctl(sockfd.as_raw_fd(), libc::SIOCGIFCONF, &mut ifc as *mut ioctl_ifconf) };
        if res < 0 {
            return Err(io::Error::last_os_error());
        }
        let used = ifc.ifc_len as usize;
        if used < entries * ifrsize {
            let mut names: Vec<String> = Vec::new();
            for ifr in buf.iter().take(used / ifrsize) {
                if let Some(name) = ifr.name() {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
            return Ok(names);
        }
        entries *= 2;
        if entries > IFCONF_MAX_ENTRIES {
            return Err(io::Error::new(io::ErrorKind::Other, "too many interfaces"));
        }
    }
}

/// netdevice ioctls based discovery
pub struct IoctlDiscovery;

impl IoctlDiscovery {
    // named() method
    fn named(&self, sockfd: &OwnedFd, name: &str, dad: bool) -> Outcome {
        let mut ifr = match ioctl_ifreq::named(name) {
            Ok(ifr) => ifr,
            Err(_) => return Outcome::NotFound,
        };
        let flags = match get_if_flags(sockfd, &mut ifr) {
            Ok(f) => f,
            Err(ref e) if e.raw_os_error() == Some(libc::ENODEV) => return Outcome::NotFound,
            Err(e) => return Outcome::Fatal(Error::Discovery(format!("SIOCGIFFLAGS: {}", e))),
        };
        if let Err(e) = check_ifflags(Some(name), flags, dad) {
            return Outcome::Fatal(e);
        }
        match get_if_index(sockfd, &mut ifr) {
            Ok(index) => Outcome::Found(Interface {
                name: name.to_string(),
                index,
                hw_len: 0,
                broadcast: None,
                flags,
            }),
            Err(e) => Outcome::Fatal(Error::Discovery(format!("SIOCGIFINDEX: {}", e))),
        }
    }

    // enumerate() method
    fn enumerate(&self, sockfd: &OwnedFd, dad: bool) -> Outcome {
        let names = match list_if_names(sockfd) {
            Ok(n) => n,
            Err(e) => return Outcome::Fatal(Error::Discovery(format!("SIOCGIFCONF: {}", e))),
        };
        let mut candidates = Vec::new();
        for name in names {
            let mut ifr = match ioctl_ifreq::named(&name) {
                Ok(ifr) => ifr,
                Err(_) => continue,
            };
            let flags = match get_if_flags(sockfd, &mut ifr) {
                Ok(f) => f,
                Err(_) => continue,
            };
            match check_ifflags(None, flags, dad) {
                Ok(true) => (),
                _ => continue,
            }
            let index = match get_if_index(sockfd, &mut ifr) {
                Ok(i) => i,
                Err(_) => continue,
            };
            candidates.push(Interface {
                name,
                index,
                hw_len: 0,
                broadcast: None,
                flags,
            });
            if candidates.len() > 1 {
                break;
            }
        }
        select(candidates)
    }
}

impl Discovery for IoctlDiscovery {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Ioctl
    }

    fn resolve(&self, hint: Option<&str>, dad: bool) -> Outcome {
        let sockfd = match open_ctl_socket() {
            Ok(fd) => fd,
            Err(e) => return Outcome::NotApplicable(format!("socket: {}", e)),
        };
        match hint {
            Some(name) => self.named(&sockfd, name, dad),
            None => self.enumerate(&sockfd, dad),
        }
    }
}

// Tests
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ifreq_layout() {
        // struct ifreq is a name followed by a 24 bytes union on 64-bit targets
        assert_eq!(
            mem::size_of::<ioctl_ifreq>(),
            IF_NAMESIZE + mem::size_of::<ioctl_ifmap>()
        );
        assert!(mem::size_of::<ioctl_ifru>() >= mem::size_of::<sockaddr>());
    }

    #[test]
    fn ifreq_names() {
        let ifr = ioctl_ifreq::named("eth0").unwrap();
        assert_eq!(ifr.name(), Some("eth0".to_string()));
        assert!(ioctl_ifreq::named("a-very-long-ifname").is_err());
        assert!(ioctl_ifreq::named("bad\0").is_err());
    }

    #[test]
    fn unknown_named_interface() {
        match IoctlDiscovery.resolve(Some("rarping-none0"), false) {
            Outcome::NotFound | Outcome::NotApplicable(_) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
