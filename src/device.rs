//! network device resolution module
//! This module picks the single interface the probe runs on, trying the
//! configured discovery methods in order.
use crate::constants::*;
use crate::debug::{print_debug, Verbose};
use crate::error::Error;
use crate::os::drivers::DiscoveryMethod;
use crate::os::linux::libc::IfAddrsDiscovery;
use crate::os::linux::netdev::IoctlDiscovery;
use crate::os::linux::sysfs::SysfsDiscovery;

// libc
use libc::{IFF_LOOPBACK, IFF_NOARP, IFF_UP};

/// Interface Structure
#[derive(Debug, Clone, PartialEq)]
pub struct Interface {
    pub name: String,
    pub index: i32,
    /// link-layer address length, 0 when the method cannot tell
    pub hw_len: usize,
    pub broadcast: Option<Vec<u8>>,
    pub flags: u32,
}

impl Interface {
    // broadcast_for() method
    /// broadcast address to seed the destination with, if it fits `hw_len`
    pub fn broadcast_for(&self, hw_len: usize) -> Option<&[u8]> {
        match &self.broadcast {
            Some(b) if b.len() == hw_len => Some(&b[..]),
            _ => None,
        }
    }
    // agrees_with() method
    /// false when the discovered address length contradicts the bound one
    pub fn agrees_with(&self, bound_len: usize) -> bool {
        self.hw_len == 0 || self.hw_len == bound_len
    }
}

/// Discovery Outcome Enumerator
#[derive(Debug)]
pub enum Outcome {
    Found(Interface),
    /// the method's data source is unavailable here, try the next one
    NotApplicable(String),
    NotFound,
    Ambiguous,
    Fatal(Error),
}

/// Discovery Trait
///
/// One way of enumerating the network interfaces.
pub trait Discovery {
    fn method(&self) -> DiscoveryMethod;
    fn resolve(&self, hint: Option<&str>, dad: bool) -> Outcome;
}

// check_ifflags() function
/// Filter on interface flags common to every discovery method.
///
/// Returns `Ok(false)` when the interface must be skipped. A named interface
/// that fails a check is reported instead of being skipped.
pub fn check_ifflags(hint: Option<&str>, flags: u32, dad: bool) -> Result<bool, Error> {
    if flags & IFF_UP as u32 == 0 {
        return match hint {
            Some(name) => Err(Error::DeviceDown(name.to_string())),
            None => Ok(false),
        };
    }
    if flags & (IFF_NOARP | IFF_LOOPBACK) as u32 != 0 {
        return match hint {
            Some(name) => Err(Error::NotArpable {
                name: name.to_string(),
                dad,
            }),
            None => Ok(false),
        };
    }
    Ok(true)
}

// select() function
/// uniqueness rule shared by the discovery methods
pub fn select(mut candidates: Vec<Interface>) -> Outcome {
    match candidates.len() {
        0 => Outcome::NotFound,
        1 => Outcome::Found(candidates.remove(0)),
        _ => Outcome::Ambiguous,
    }
}

/// Resolver Structure
pub struct Resolver {
    strategies: Vec<Box<dyn Discovery>>,
}

impl Resolver {
    // new() method
    /// build the chain from discovery method names, in order
    pub fn new(methods: &[DiscoveryMethod]) -> Resolver {
        let strategies = methods
            .iter()
            .map(|m| -> Box<dyn Discovery> {
                match m {
                    DiscoveryMethod::Ifaddrs => Box::new(IfAddrsDiscovery),
                    DiscoveryMethod::Sysfs => Box::new(SysfsDiscovery::new(RARPING_SYSFS_NET_DIR)),
                    DiscoveryMethod::Ioctl => Box::new(IoctlDiscovery),
                }
            })
            .collect();
        Resolver { strategies }
    }

    // with_strategies() method
    pub fn with_strategies(strategies: Vec<Box<dyn Discovery>>) -> Resolver {
        Resolver { strategies }
    }

    // resolve() method
    /// Run the chain, stopping at the first definitive answer.
    pub fn resolve(&self, hint: Option<&str>, dad: bool, debug: &Verbose) -> Result<Interface, Error> {
        let mut skipped = Vec::new();
        for strategy in &self.strategies {
            print_debug(
                debug,
                DEBUG_LEVEL_HIGH,
                DEBUG_SRC_DEVICE,
                format!("looking up interface {:?} using {}", hint, strategy.method()),
            );
            match strategy.resolve(hint, dad) {
                Outcome::Found(iface) => {
                    print_debug(
                        debug,
                        DEBUG_LEVEL_MEDIUM,
                        DEBUG_SRC_DEVICE,
                        format!(
                            "found interface {} (index {}) using {}",
                            iface.name,
                            iface.index,
                            strategy.method()
                        ),
                    );
                    return Ok(iface);
                }
                Outcome::NotApplicable(reason) => {
                    print_debug(
                        debug,
                        DEBUG_LEVEL_LOW,
                        DEBUG_SRC_DEVICE,
                        format!("{} unavailable: {}", strategy.method(), reason),
                    );
                    skipped.push(format!("{}: {}", strategy.method(), reason));
                }
                Outcome::NotFound => {
                    return Err(match hint {
                        Some(name) => Error::DeviceNotAvailable(name.to_string()),
                        None => Error::NoSuitableDevice,
                    });
                }
                Outcome::Ambiguous => return Err(Error::NoSuitableDevice),
                Outcome::Fatal(e) => return Err(e),
            }
        }
        Err(Error::Discovery(skipped.join(", ")))
    }
}
