//! error module
//! Fatal conditions raised before or while setting up the probe.
use std::fmt;
use std::io;

/// Error Type
///
/// Every variant terminates the process, `exit_code()` gives the status.
#[derive(Debug)]
pub enum Error {
    /// configuration file cannot be read or decoded
    Config(String),
    /// target is neither an IPv4 address nor a resolvable name
    Resolve { target: String, reason: String },
    /// source is not an IPv4 address
    InvalidSource(String),
    /// the requested interface is down
    DeviceDown(String),
    /// the requested interface is loopback or flagged NOARP
    NotArpable { name: String, dad: bool },
    /// the bound interface reports no link-layer address
    NoLinkAddress { name: String, dad: bool },
    /// the requested interface was not found by the discovery methods
    DeviceNotAvailable(String),
    /// zero or several candidates and no interface name given
    NoSuitableDevice,
    /// no discovery method could enumerate the interfaces
    Discovery(String),
    /// raw socket creation failed
    Socket(io::Error),
    /// raw socket bind or address read-back failed
    Bind(io::Error),
    /// source address selection failed
    Source(&'static str, io::Error),
    /// no source address could be determined outside DAD mode
    NoSourceAddress,
    /// privileges could not be limited, released or dropped
    Privilege(&'static str, io::Error),
    /// signal or timer descriptor setup failed
    EventLoop(&'static str, io::Error),
}

impl Error {
    // exit_code() method
    /// process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // no address can ever be in use on a non-ARPable link
            Error::NotArpable { dad, .. } | Error::NoLinkAddress { dad, .. } => {
                if *dad {
                    0
                } else {
                    2
                }
            }
            Error::EventLoop(..) => 1,
            _ => 2,
        }
    }
    // interface_state() method
    /// true for the interface state reports that quiet mode silences
    pub fn interface_state(&self) -> bool {
        match self {
            Error::DeviceDown(_) | Error::NotArpable { .. } | Error::NoLinkAddress { .. } => true,
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Config(s) => write!(f, "configuration: {}", s),
            Error::Resolve { target, reason } => write!(f, "{}: {}", target, reason),
            Error::InvalidSource(s) => write!(f, "invalid source {}", s),
            Error::DeviceDown(name) => write!(f, "Interface \"{}\" is down", name),
            Error::NotArpable { name, .. } => write!(f, "Interface \"{}\" is not ARPable", name),
            Error::NoLinkAddress { name, .. } => {
                write!(f, "Interface \"{}\" is not ARPable (no ll address)", name)
            }
            Error::DeviceNotAvailable(name) => write!(f, "Device {} not available.", name),
            Error::NoSuitableDevice => write!(
                f,
                "Suitable device could not be determined. Please, use option -I."
            ),
            Error::Discovery(s) => write!(f, "interface discovery failed: {}", s),
            Error::Socket(e) => write!(f, "socket: {}", e),
            Error::Bind(e) => write!(f, "bind: {}", e),
            Error::Source(op, e) => write!(f, "{}: {}", op, e),
            Error::NoSourceAddress => write!(f, "no source address in not-DAD mode"),
            Error::Privilege(op, e) => write!(f, "{}: {}", op, e),
            Error::EventLoop(op, e) => write!(f, "{}: {}", op, e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Socket(e)
            | Error::Bind(e)
            | Error::Source(_, e)
            | Error::Privilege(_, e)
            | Error::EventLoop(_, e) => Some(e),
            _ => None,
        }
    }
}

// Tests
#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn non_arpable_exit_codes() {
        let dad = Error::NotArpable {
            name: "lo".to_string(),
            dad: true,
        };
        let probe = Error::NotArpable {
            name: "lo".to_string(),
            dad: false,
        };
        assert_eq!(dad.exit_code(), 0);
        assert_eq!(probe.exit_code(), 2);
        assert_eq!(dad.to_string(), "Interface \"lo\" is not ARPable");
    }

    #[test]
    fn fatal_exit_codes() {
        let e = Error::Resolve {
            target: "nowhere.invalid".to_string(),
            reason: "Name or service not known".to_string(),
        };
        assert_eq!(e.exit_code(), 2);
        assert_eq!(Error::NoSuitableDevice.exit_code(), 2);
        assert_eq!(
            Error::Privilege("setuid", io::Error::from_raw_os_error(libc::EPERM)).exit_code(),
            2
        );
        assert_eq!(
            Error::EventLoop("signalfd", io::Error::from_raw_os_error(libc::EMFILE)).exit_code(),
            1
        );
    }
}
