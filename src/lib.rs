//! # rArping library
//!
//! Sends ARP requests to a neighbour on a local network and reports the
//! answers, the way `arping(8)` does.
#![allow(non_snake_case)]

// libc
extern crate libc;

// foreign-types
#[macro_use]
extern crate foreign_types;

// chrono
extern crate chrono;

// generic constants
pub mod constants;
use constants::*;

// configuration file
pub mod config;

// debug
pub mod debug;
use debug::{print_debug, Verbose};

// errors
pub mod error;
use error::Error;

// ARP frames
pub mod packets;
use packets::Query;

// probe session
pub mod fsm;
use fsm::{LinkEndpoint, ProbeSession};

// network device resolution
pub mod device;
use device::Resolver;

// operating systems support
pub mod os;
use os::drivers::DiscoveryMethod;
use os::linux::arp::ArpSocket;
use os::linux::privs::limit_privileges;

// privileges
pub mod privs;
use privs::{bracketed, drop_privileges};

// source address
mod source;
use source::discover_source;

// timers
mod timers;

// event loop
mod event_loop;
use event_loop::Prober;

// std
use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// Operating Modes Structure
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Modes {
    /// duplicate address detection, probes carry a zero source address
    pub dad: bool,
    /// gratuitous ARP announcing the target address
    pub unsolicited: bool,
    /// announce with replies instead of requests
    pub advert: bool,
    /// never switch to the responder's link address
    pub broadcast_only: bool,
    pub quiet: bool,
    pub quit_on_reply: bool,
}

/// Library Config Structure
///
/// Fully resolved probe parameters.
#[derive(Debug, Clone)]
pub struct Config {
    pub target: String,
    pub source: Option<String>,
    pub iface: Option<String>,
    pub modes: Modes,
    pub count: i32,
    pub timeout: i32,
    pub interval: u64,
    pub debug: Verbose,
    pub discovery: Vec<DiscoveryMethod>,
}

// Config Implementation
impl Config {
    // new() method
    pub fn new(target: String) -> Config {
        Config {
            target,
            source: None,
            iface: None,
            modes: Modes::default(),
            count: RARPING_DFLT_COUNT,
            timeout: 0,
            interval: RARPING_DFLT_INTERVAL,
            debug: Verbose::quiet(),
            discovery: DiscoveryMethod::defaults(),
        }
    }
    // iface() getter
    pub fn iface(&self) -> Option<&str> {
        match &self.iface {
            Some(s) if !s.is_empty() => Some(&s[..]),
            _ => None,
        }
    }
}

// resolve_target() function
/// Parse the target as a dotted quad, otherwise look its name up.
pub fn resolve_target(target: &str) -> Result<Ipv4Addr, Error> {
    if let Ok(addr) = target.parse::<Ipv4Addr>() {
        return Ok(addr);
    }
    let resolve_err = |reason: String| Error::Resolve {
        target: target.to_string(),
        reason,
    };
    let addrs = (target, 0)
        .to_socket_addrs()
        .map_err(|e| resolve_err(e.to_string()))?;
    for addr in addrs {
        if let SocketAddr::V4(v4) = addr {
            return Ok(*v4.ip());
        }
    }
    Err(resolve_err("no IPv4 address".to_string()))
}

// parse_source() function
pub fn parse_source(source: Option<&str>) -> Result<Option<Ipv4Addr>, Error> {
    match source {
        Some(s) => match s.parse::<Ipv4Addr>() {
            Ok(addr) => Ok(Some(addr)),
            Err(_) => Err(Error::InvalidSource(s.to_string())),
        },
        None => Ok(None),
    }
}

// run() function
/// Set the probe up on the resolved interface and run it to completion.
///
/// Returns the process exit status.
pub fn run(cfg: &Config) -> Result<i32, Error> {
    let debug = &cfg.debug;
    let modes = cfg.modes;

    let mut bracket = limit_privileges()?;
    let socket = bracketed(bracket.as_mut(), debug, ArpSocket::open)?;

    // creation errors are reported once the configuration is known
    let mut socket = socket.map_err(Error::Socket)?;

    // network device
    let iface = Resolver::new(&cfg.discovery).resolve(cfg.iface(), modes.dad, debug)?;
    print_debug(
        debug,
        DEBUG_LEVEL_MEDIUM,
        DEBUG_SRC_DEVICE,
        format!("using interface {} (index {})", iface.name, iface.index),
    );

    // protocol addresses
    let target = resolve_target(&cfg.target)?;
    let source = parse_source(cfg.source.as_ref().map(|s| &s[..]))?;
    let source = discover_source(target, source, &iface.name, &modes, bracket.as_mut(), debug)?;

    // link-layer addresses
    socket.bind(iface.index).map_err(Error::Bind)?;
    let (hatype, me) = socket.local_link().map_err(Error::Bind)?;
    if me.is_empty() {
        return Err(Error::NoLinkAddress {
            name: iface.name,
            dad: modes.dad,
        });
    }
    if !iface.agrees_with(me.len()) {
        print_debug(
            debug,
            DEBUG_LEVEL_LOW,
            DEBUG_SRC_DEVICE,
            format!(
                "{} reports {} bytes addresses, socket bound with {}",
                iface.name,
                iface.hw_len,
                me.len()
            ),
        );
    }
    let he = match iface.broadcast_for(me.len()) {
        Some(b) => b.to_vec(),
        None => {
            if !modes.quiet {
                eprintln!("WARNING: using default broadcast address.");
            }
            vec![0xff; me.len()]
        }
    };
    print_debug(
        debug,
        DEBUG_LEVEL_HIGH,
        DEBUG_SRC_SOCKET,
        format!("bound to hardware type {}, {} bytes address", hatype, me.len()),
    );

    if !modes.quiet {
        println!("ARPING {} from {} {}", target, source, iface.name);
    }

    drop_privileges(bracket.as_mut(), debug)?;

    let endpoint = LinkEndpoint::new(hatype, me, he);
    let session = ProbeSession::new(modes, cfg.count, cfg.timeout, endpoint);
    let query = Query {
        target,
        source,
        dad: modes.dad,
    };
    let prober = Prober::new(&socket, session, query, io::stdout(), io::stderr(), debug);
    event_loop::run(prober, Duration::from_secs(cfg.interval))
}
