//! Constants module
//! This module regroups all the program's and protocols constants.

// Program Constants
pub const RARPING_DFLT_CFG_FILE: &str = "/etc/rarping/rarping.conf";
pub const RARPING_DFLT_DATE_FORMAT: &str = "%b %e %Y %T";
pub const RARPING_DFLT_INTERVAL: u64 = 1;
pub const RARPING_DFLT_COUNT: i32 = -1;
pub const RARPING_SYSFS_NET_DIR: &str = "/sys/class/net";
pub const RARPING_PROG: &str = "rarping";
pub const RARPING_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const RARPING_HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");

// Debug Constants
pub const DEBUG_LEVEL_INFO: u8 = 0;
pub const DEBUG_LEVEL_LOW: u8 = 1;
pub const DEBUG_LEVEL_MEDIUM: u8 = 2;
pub const DEBUG_LEVEL_HIGH: u8 = 3;
pub const DEBUG_LEVEL_EXTENSIVE: u8 = 5;
pub const DEBUG_SRC_MAIN: &str = "main";
pub const DEBUG_SRC_CONFIG: &str = "config";
pub const DEBUG_SRC_DEVICE: &str = "device";
pub const DEBUG_SRC_PRIVS: &str = "privs";
pub const DEBUG_SRC_SOCKET: &str = "socket";
pub const DEBUG_SRC_PACKET: &str = "packet";
pub const DEBUG_SRC_SESSION: &str = "session";
pub const DEBUG_SRC_TIMER: &str = "timer";
pub const DEBUG_SRC_SIGNAL: &str = "signal";

// Ethernet Constants
pub const ETHER_P_IP: u16 = 0x0800; // IPv4 (/usr/include/linux/if_ether.h)
pub const ETHER_P_ARP: u16 = 0x0806;

// ARP Constants (/usr/include/net/if_arp.h)
pub const ARP_HDR_LEN: usize = 8; // fixed part of the ARP header
pub const ARP_PROTO_ADDR_LEN: u8 = 4; // IPv4
pub const ARP_OP_REQUEST: u16 = 1;
pub const ARP_OP_REPLY: u16 = 2;
pub const ARPHRD_ETHER: u16 = 1;
pub const ARPHRD_FDDI: u16 = 774;

// Packet Socket Constants (/usr/include/linux/if_packet.h)
pub const PACKET_HOST: u8 = 0;
pub const PACKET_BROADCAST: u8 = 1;
pub const PACKET_MULTICAST: u8 = 2;
pub const SLL_ADDR_OFFSET: usize = 12; // offset of sll_addr in sockaddr_ll

// Source address discovery
pub const PROBE_UDP_PORT: u16 = 1025;

// Receive buffer size
pub const RECV_BUF_SIZE: usize = 4096;
