//! Linux Operating System support

// standard C library compatibility
pub mod libc;
// netdev support
pub mod netdev;
// sysfs attributes support
pub mod sysfs;
// Linux ARP support
pub mod arp;
// source address discovery socket
pub mod udp;
// capabilities and user ids
pub mod privs;
// signalfd support
pub mod signal;
