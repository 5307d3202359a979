//! Linux Address Resolution Protocol (ARP) module
//! This module provides the packet socket the probes travel on.

// constants
use crate::constants::*;

// packets
use crate::packets::LinkInfo;

// std
use std::io;
use std::mem;
use std::os::unix::io::{AsRawFd, FromRawFd, OwnedFd, RawFd};

// libc
use libc::{
    bind, c_void, getsockname, recvfrom, sendto, sockaddr, sockaddr_ll, sockaddr_storage, socket,
    socklen_t, AF_PACKET, SOCK_CLOEXEC, SOCK_DGRAM,
};

/// Link Trait
///
/// What the event loop needs from the socket: send a frame to a link-layer
/// destination and receive one with its link information.
pub trait Link: AsRawFd {
    fn send(&self, frame: &[u8], dest: &[u8]) -> io::Result<usize>;
    fn recv(&self, buf: &mut [u8]) -> io::Result<(usize, LinkInfo)>;
}

// link_sockaddr() function
/// sockaddr_ll (man 7 packet) for the ARP protocol on `ifindex`
pub fn link_sockaddr(ifindex: i32, addr: &[u8]) -> sockaddr_ll {
    let mut sa: sockaddr_ll = unsafe { mem::zeroed() };
    sa.sll_family = AF_PACKET as u16;
    sa.sll_protocol = ETHER_P_ARP.to_be();
    sa.sll_ifindex = ifindex;
    let len = addr.len().min(sa.sll_addr.len());
    sa.sll_addr[..len].copy_from_slice(&addr[..len]);
    sa.sll_halen = len as u8;
    sa
}

// link_addr() function
/// address bytes of a sockaddr_ll, bounded by its storage
pub fn link_addr(sa: &sockaddr_ll) -> Vec<u8> {
    let len = (sa.sll_halen as usize).min(sa.sll_addr.len());
    sa.sll_addr[..len].to_vec()
}

/// ARP Socket Structure
#[derive(Debug)]
pub struct ArpSocket {
    fd: OwnedFd,
    ifindex: i32,
}

impl ArpSocket {
    // open() method
    /// Open the packet socket, the kernel builds the link header.
    pub fn open() -> io::Result<ArpSocket> {
        // man 2 socket
        // returns a file descriptor or -1 if error.
        match unsafe { socket(AF_PACKET, SOCK_DGRAM | SOCK_CLOEXEC, 0) } {
            -1 => Err(io::Error::last_os_error()),
            fd => Ok(ArpSocket {
                fd: unsafe { OwnedFd::from_raw_fd(fd) },
                ifindex: 0,
            }),
        }
    }

    // bind() method
    pub fn bind(&mut self, ifindex: i32) -> io::Result<()> {
        let sa = link_sockaddr(ifindex, &[]);
        let res = unsafe {
            bind(
                self.fd.as_raw_fd(),
                &sa as *const sockaddr_ll as *const sockaddr,
                mem::size_of::<sockaddr_ll>() as socklen_t,
            )
        };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        self.ifindex = ifindex;
        Ok(())
    }

    // local_link() method
    /// Hardware type and address the socket is bound to.
    pub fn local_link(&self) -> io::Result<(u16, Vec<u8>)> {
        let mut ss: sockaddr_storage = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;
        let res = unsafe {
            getsockname(
                self.fd.as_raw_fd(),
                &mut ss as *mut sockaddr_storage as *mut sockaddr,
                &mut len,
            )
        };
        if res == -1 {
            return Err(io::Error::last_os_error());
        }
        let sll = unsafe { &*(&ss as *const sockaddr_storage as *const sockaddr_ll) };
        Ok((sll.sll_hatype, link_addr(sll)))
    }
}

impl AsRawFd for ArpSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Link for ArpSocket {
    // send() method
    fn send(&self, frame: &[u8], dest: &[u8]) -> io::Result<usize> {
        let sa = link_sockaddr(self.ifindex, dest);
        match unsafe {
            sendto(
                self.fd.as_raw_fd(),
                frame.as_ptr() as *const c_void,
                frame.len(),
                0,
                &sa as *const sockaddr_ll as *const sockaddr,
                mem::size_of::<sockaddr_ll>() as socklen_t,
            )
        } {
            -1 => Err(io::Error::last_os_error()),
            n => Ok(n as usize),
        }
    }

    // recv() method
    fn recv(&self, buf: &mut [u8]) -> io::Result<(usize, LinkInfo)> {
        let mut ss: sockaddr_storage = unsafe { mem::zeroed() };
        let mut len = mem::size_of::<sockaddr_storage>() as socklen_t;
        match unsafe {
            recvfrom(
                self.fd.as_raw_fd(),
                buf.as_mut_ptr() as *mut c_void,
                buf.len(),
                0,
                &mut ss as *mut sockaddr_storage as *mut sockaddr,
                &mut len,
            )
        } {
            -1 => Err(io::Error::last_os_error()),
            n => {
                let sll = unsafe { &*(&ss as *const sockaddr_storage as *const sockaddr_ll) };
                Ok((
                    n as usize,
                    LinkInfo {
                        class: sll.sll_pkttype.into(),
                        hatype: sll.sll_hatype,
                    },
                ))
            }
        }
    }
}
