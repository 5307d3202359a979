//! Linux UDP socket module
//! Datagram socket used to let the routing table pick a source address.

// std
use std::io;
use std::mem;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd};

// libc
use libc::{
    bind, c_int, c_void, connect, getsockname, setsockopt, sockaddr, sockaddr_in, socket,
    socklen_t, AF_INET, SOCK_CLOEXEC, SOCK_DGRAM, SOL_SOCKET, SO_BINDTODEVICE, SO_DONTROUTE,
};

// to_sockaddr_in() function
fn to_sockaddr_in(addr: SocketAddrV4) -> sockaddr_in {
    let mut sa: sockaddr_in = unsafe { mem::zeroed() };
    sa.sin_family = AF_INET as libc::sa_family_t;
    sa.sin_port = addr.port().to_be();
    sa.sin_addr.s_addr = u32::from(*addr.ip()).to_be();
    sa
}

/// Probe Socket Structure
#[derive(Debug)]
pub struct ProbeSocket {
    fd: OwnedFd,
}

impl ProbeSocket {
    // open() method
    pub fn open() -> io::Result<ProbeSocket> {
        match unsafe { socket(AF_INET, SOCK_DGRAM | SOCK_CLOEXEC, 0) } {
            -1 => Err(io::Error::last_os_error()),
            fd => Ok(ProbeSocket {
                fd: unsafe { OwnedFd::from_raw_fd(fd) },
            }),
        }
    }

    // setsockopt_raw() method
    fn setsockopt_raw(&self, opt: c_int, val: *const c_void, len: usize) -> io::Result<()> {
        let res = unsafe { setsockopt(self.fd.as_raw_fd(), SOL_SOCKET, opt, val, len as socklen_t) };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    // bind_to_device() method
    /// SO_BINDTODEVICE, requires CAP_NET_RAW
    pub fn bind_to_device(&self, ifname: &str) -> io::Result<()> {
        let mut name = ifname.as_bytes().to_vec();
        name.push(0);
        self.setsockopt_raw(SO_BINDTODEVICE, name.as_ptr() as *const c_void, name.len())
    }

    // set_dont_route() method
    pub fn set_dont_route(&self) -> io::Result<()> {
        let on: c_int = 1;
        self.setsockopt_raw(
            SO_DONTROUTE,
            &on as *const c_int as *const c_void,
            mem::size_of::<c_int>(),
        )
    }

    // bind() method
    pub fn bind(&self, addr: Ipv4Addr) -> io::Result<()> {
        let sa = to_sockaddr_in(SocketAddrV4::new(addr, 0));
        let res = unsafe {
            bind(
                self.fd.as_raw_fd(),
                &sa as *const sockaddr_in as *const sockaddr,
                mem::size_of::<sockaddr_in>() as socklen_t,
            )
        };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    // connect() method
    pub fn connect(&self, addr: SocketAddrV4) -> io::Result<()> {
        let sa = to_sockaddr_in(addr);
        let res = unsafe {
            connect(
                self.fd.as_raw_fd(),
                &sa as *const sockaddr_in as *const sockaddr,
                mem::size_of::<sockaddr_in>() as socklen_t,
            )
        };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    // local_addr() method
    pub fn local_addr(&self) -> io::Result<Ipv4Addr> {
        let mut sa: sockaddr_in = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<sockaddr_in>() as socklen_t;
        let res = unsafe {
            getsockname(
                self.fd.as_raw_fd(),
                &mut sa as *mut sockaddr_in as *mut sockaddr,
                &mut len,
            )
        };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Ipv4Addr::from(u32::from_be(sa.sin_addr.s_addr)))
    }
}
