//! sysfs network attributes module
//! Reads the interface attributes exported under /sys/class/net.
use crate::device::{check_ifflags, select, Discovery, Interface, Outcome};
use crate::os::drivers::DiscoveryMethod;

// std
use std::convert::TryFrom;
use std::fs;
use std::path::{Path, PathBuf};

// parse_dec() function
pub fn parse_dec(s: &str) -> Option<u64> {
    s.parse::<u64>().ok()
}

// parse_hex() function
/// hexadecimal value with an optional 0x prefix
pub fn parse_hex(s: &str) -> Option<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u64::from_str_radix(digits, 16).ok()
}

// parse_mac() function
/// colon separated hexadecimal octets, exactly `len` of them
pub fn parse_mac(s: &str, len: usize) -> Option<Vec<u8>> {
    let octets = s
        .split(':')
        .map(|o| {
            if o.is_empty() || o.len() > 2 {
                None
            } else {
                u8::from_str_radix(o, 16).ok()
            }
        })
        .collect::<Option<Vec<u8>>>()?;
    if octets.len() == len {
        Some(octets)
    } else {
        None
    }
}

/// sysfs based discovery
pub struct SysfsDiscovery {
    root: PathBuf,
}

impl SysfsDiscovery {
    // new() method
    pub fn new<P: AsRef<Path>>(root: P) -> SysfsDiscovery {
        SysfsDiscovery {
            root: root.as_ref().to_path_buf(),
        }
    }

    // attr() method
    /// first token of an attribute file
    fn attr(&self, ifname: &str, name: &str) -> Option<String> {
        let content = fs::read_to_string(self.root.join(ifname).join(name)).ok()?;
        content.split_whitespace().next().map(|s| s.to_string())
    }

    // read_interface() method
    /// None when an attribute is missing or malformed
    fn read_interface(&self, ifname: &str) -> Option<Interface> {
        let index = parse_dec(&self.attr(ifname, "ifindex")?)?;
        let flags = parse_hex(&self.attr(ifname, "flags")?)?;
        let hw_len = parse_dec(&self.attr(ifname, "addr_len")?)? as usize;
        let broadcast = parse_mac(&self.attr(ifname, "broadcast")?, hw_len)?;
        Some(Interface {
            name: ifname.to_string(),
            index: i32::try_from(index).ok()?,
            hw_len,
            broadcast: Some(broadcast),
            flags: u32::try_from(flags).ok()?,
        })
    }
}

impl Discovery for SysfsDiscovery {
    fn method(&self) -> DiscoveryMethod {
        DiscoveryMethod::Sysfs
    }

    fn resolve(&self, hint: Option<&str>, dad: bool) -> Outcome {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) => return Outcome::NotApplicable(format!("{}: {}", self.root.display(), e)),
        };

        let mut candidates = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let name = match entry.file_name().into_string() {
                Ok(n) => n,
                Err(_) => continue,
            };
            if let Some(h) = hint {
                if h != name {
                    continue;
                }
            }
            let iface = match self.read_interface(&name) {
                Some(i) => i,
                None => continue,
            };
            match check_ifflags(hint, iface.flags, dad) {
                Ok(true) => (),
                Ok(false) => continue,
                Err(e) => return Outcome::Fatal(e),
            }
            if iface.hw_len == 0 {
                continue;
            }
            candidates.push(iface);
            if candidates.len() > 1 {
                break;
            }
        }
        select(candidates)
    }
}
