//! generic drivers module
use std::fmt;
use std::str::FromStr;

/// interface discovery methods enumerator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiscoveryMethod {
    Ifaddrs, // getifaddrs(3)
    Sysfs,   // /sys/class/net attributes
    Ioctl,   // netdevice ioctls
}

impl DiscoveryMethod {
    // defaults() function
    /// default discovery order
    pub fn defaults() -> Vec<DiscoveryMethod> {
        vec![
            DiscoveryMethod::Ifaddrs,
            DiscoveryMethod::Sysfs,
            DiscoveryMethod::Ioctl,
        ]
    }
}

impl FromStr for DiscoveryMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ifaddrs" => Ok(DiscoveryMethod::Ifaddrs),
            "sysfs" => Ok(DiscoveryMethod::Sysfs),
            "ioctl" => Ok(DiscoveryMethod::Ioctl),
            _ => Err(format!("unknown discovery method {:?}", s)),
        }
    }
}

impl fmt::Display for DiscoveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DiscoveryMethod::Ifaddrs => "ifaddrs",
            DiscoveryMethod::Sysfs => "sysfs",
            DiscoveryMethod::Ioctl => "ioctl",
        };
        write!(f, "{}", name)
    }
}
