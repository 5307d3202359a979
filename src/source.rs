//! source address module
//! Picks the protocol address our probes are sent from.
use crate::constants::*;
use crate::debug::{print_debug, Verbose};
use crate::error::Error;
use crate::os::linux::udp::ProbeSocket;
use crate::privs::{bracketed, PrivilegeBracket};
use crate::Modes;

// std
use std::net::{Ipv4Addr, SocketAddrV4};

// discover_source() function
/// Determine the source address for `target` on interface `ifname`.
///
/// An explicit source is only checked to be local. Without one, the routing
/// table is asked through a connected datagram socket, except in DAD mode
/// where the unspecified address is used.
pub fn discover_source(
    target: Ipv4Addr,
    source: Option<Ipv4Addr>,
    ifname: &str,
    modes: &Modes,
    bracket: &mut dyn PrivilegeBracket,
    debug: &Verbose,
) -> Result<Ipv4Addr, Error> {
    let mut gsrc = source.unwrap_or(Ipv4Addr::UNSPECIFIED);
    if !modes.dad && modes.unsolicited && source.is_none() {
        gsrc = target;
    }

    if !modes.dad || source.is_some() {
        let sock = ProbeSocket::open().map_err(|e| Error::Source("socket", e))?;
        if !ifname.is_empty() {
            if let Err(e) = bracketed(bracket, debug, || sock.bind_to_device(ifname))? {
                eprintln!("WARNING: interface is ignored: {}", e);
            }
        }

        if source.is_some() || !gsrc.is_unspecified() {
            sock.bind(gsrc).map_err(|e| Error::Source("bind", e))?;
        } else if !modes.dad {
            if let Err(e) = sock.set_dont_route() {
                eprintln!("WARNING: setsockopt(SO_DONTROUTE): {}", e);
            }
            sock.connect(SocketAddrV4::new(target, PROBE_UDP_PORT))
                .map_err(|e| Error::Source("connect", e))?;
            gsrc = sock.local_addr().map_err(|e| Error::Source("getsockname", e))?;
        }
        print_debug(
            debug,
            DEBUG_LEVEL_MEDIUM,
            DEBUG_SRC_SOCKET,
            format!("source address {} for target {}", gsrc, target),
        );
    }

    if !modes.dad && gsrc.is_unspecified() {
        return Err(Error::NoSourceAddress);
    }
    Ok(gsrc)
}

// Tests
#[cfg(test)]
mod test {
    use super::*;
    use std::io;

    struct Unprivileged;

    impl PrivilegeBracket for Unprivileged {
        fn acquire(&mut self) -> io::Result<()> {
            Err(io::Error::from_raw_os_error(libc::EPERM))
        }
        fn release(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn drop_permanently(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn discover(target: Ipv4Addr, source: Option<Ipv4Addr>, modes: Modes) -> Result<Ipv4Addr, Error> {
        discover_source(target, source, "", &modes, &mut Unprivileged, &Verbose::quiet())
    }

    #[test]
    fn routed_source() {
        let src = discover(Ipv4Addr::LOCALHOST, None, Modes::default()).unwrap();
        assert_eq!(src, Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn unsolicited_source_is_target() {
        let modes = Modes {
            unsolicited: true,
            ..Modes::default()
        };
        let src = discover(Ipv4Addr::LOCALHOST, None, modes).unwrap();
        assert_eq!(src, Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn dad_without_source() {
        let modes = Modes {
            dad: true,
            ..Modes::default()
        };
        let src = discover(Ipv4Addr::new(192, 0, 2, 5), None, modes).unwrap();
        assert!(src.is_unspecified());
    }

    #[test]
    fn foreign_source_cannot_bind() {
        match discover(Ipv4Addr::LOCALHOST, Some(Ipv4Addr::new(192, 0, 2, 77)), Modes::default()) {
            Err(Error::Source(op, _)) => assert_eq!(op, "bind"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
