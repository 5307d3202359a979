//! linux standard c library compatibility
use crate::device::{check_ifflags, select, Discovery, Interface, Outcome};
use crate::os::drivers::DiscoveryMethod;

// std, libc, ffi
use libc::{sockaddr, sockaddr_ll, AF_PACKET};
use std::ffi::{CStr, CString};
use std::io;
use std::ptr;

// foreign_types
use foreign_types::{ForeignType, ForeignTypeRef};

// libc-like getifaddrs() function implementation
// Credit sfackler: https://gist.github.com/sfackler/d614e6c130f3462f443e6c0c6255383a
foreign_type! {
    #[derive(Debug)]
    pub type IfAddrs: Sync + Send {
        type CType = libc::ifaddrs;
        fn drop = libc::freeifaddrs;
    }
}

impl IfAddrs {
    pub fn get() -> io::Result<IfAddrs> {
        unsafe {
            let mut ifaddrs = ptr::null_mut();
            let r = libc::getifaddrs(&mut ifaddrs);
            if r == 0 {
                Ok(IfAddrs::from_ptr(ifaddrs))
            } else {
                Err(io::Error::last_os_error())
            }
        }
    }
}

// link_addr() function
/// link-layer address held by a packet family socket address
unsafe fn link_addr(addr: *const sockaddr) -> Option<Vec<u8>> {
    if addr.is_null() || (*addr).sa_family as i32 != AF_PACKET {
        return None;
    }
    let sll = &*(addr as *const sockaddr_ll);
    let len = (sll.sll_halen as usize).min(sll.sll_addr.len());
    Some(sll.sll_addr[..len].to_vec())
}

impl IfAddrsRef {
    // next() method
    pub fn next(&self) -> Option<&IfAddrsRef> {
        unsafe {
            let next = (*self.as_ptr()).ifa_next;
            if next.is_null() {
                None
            } else {
                Some(IfAddrsRef::from_ptr(next))
            }
        }
    }

    // name() method
    pub fn name(&self) -> Option<&str> {
        unsafe {
            let name = (*self.as_ptr()).ifa_name;
            if name.is_null() {
                return None;
            }
            CStr::from_ptr(name).to_str().ok()
        }
    }

    // flags() method
    pub fn flags(&self) -> u32 {
        unsafe { (*self.as_ptr()).ifa_flags as u32 }
    }

    // link() method
    /// link-layer address, for the packet family entries only
    pub fn link(&self) -> Option<Vec<u8>> {
        unsafe { link_addr((*self.as_ptr()).ifa_addr) }
    }

    // broadcast_link() method
    pub fn broadcast_link(&self) -> Option<Vec<u8>> {
        unsafe { link_addr((*self.as_ptr()).ifa_ifu) }
    }

    pub fn iter<'a>(&'a self) -> Iter<'a> {
        Iter(Some(self))
    }
}

impl<'a> IntoIterator for &'a IfAddrs {
    type Item = &'a IfAddrsRef;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a IfAddrsRef {
    type Item = &'a IfAddrsRef;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

pub struct Iter<'a>(Option<&'a IfAddrsRef>);

impl<'a> Iterator for Iter<'a> {
    type Item = &'a IfAddrsRef;

    fn next(&mut self) -> Option<&'a IfAddrsRef> {
        let cur = match self.0 {
            Some(cur) => cur,
            None => return None,
        };

        self.0 = cur.next();
        Some(cur)
    }
}

// c_ifnametoindex() function
/// see 'man 3 if_nametoindex'
pub fn c_ifnametoindex(ifname: &str) -> io::Result<i32> {
    let c_ifname =
        CString::new(ifname).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let r = unsafe { libc::if_nametoindex(c_ifname.as_ptr()) };
    if r == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(r as i32)
    }
}

/// getifaddrs(3) based discovery
pub struct IfAddrsDiscovery;

impl Discovery for IfAddrsDiscovery {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Ifaddrs
    }

    fn resolve(&self, hint: Option<&str>, dad: bool) -> Outcome {
        let addrs = match IfAddrs::get() {
            Ok(a) => a,
            Err(e) => return Outcome::NotApplicable(format!("getifaddrs: {}", e)),
        };

        let mut candidates = Vec::new();
        for ifa in addrs.iter() {
            let link = match ifa.link() {
                Some(l) => l,
                None => continue,
            };
            let name = match ifa.name() {
                Some(n) => n,
                None => continue,
            };
            if let Some(h) = hint {
                if h != name {
                    continue;
                }
            }
            match check_ifflags(hint, ifa.flags(), dad) {
                Ok(true) => (),
                Ok(false) => continue,
                Err(e) => return Outcome::Fatal(e),
            }
            if link.is_empty() {
                continue;
            }
            let broadcast = match ifa.broadcast_link() {
                Some(b) => b,
                None => continue,
            };
            let index = match c_ifnametoindex(name) {
                Ok(i) => i,
                Err(e) => return Outcome::NotApplicable(format!("if_nametoindex: {}", e)),
            };
            candidates.push(Interface {
                name: name.to_string(),
                index,
                hw_len: link.len(),
                broadcast: Some(broadcast),
                flags: ifa.flags(),
            });
            if candidates.len() > 1 {
                break;
            }
        }
        select(candidates)
    }
}
