//! packets handling module
//! This module includes the ARP packet format, its validation against the
//! outstanding probe and the per-reply report formatting.

// constants
use crate::constants::*;

// byteorder
use byteorder::{ByteOrder, NetworkEndian};

// itertools
use itertools::Itertools;

// std
use std::net::Ipv4Addr;
use std::time::Duration;

/// Link-layer packet class (sll_pkttype)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PacketClass {
    Host,
    Broadcast,
    Multicast,
    Other(u8),
}

impl From<u8> for PacketClass {
    fn from(pkttype: u8) -> Self {
        match pkttype {
            PACKET_HOST => PacketClass::Host,
            PACKET_BROADCAST => PacketClass::Broadcast,
            PACKET_MULTICAST => PacketClass::Multicast,
            other => PacketClass::Other(other),
        }
    }
}

/// Link-layer information of a received frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkInfo {
    pub class: PacketClass,
    pub hatype: u16,
}

/// Outstanding query
///
/// `target` is the probed address, `source` the address we speak for
/// (unspecified in plain DAD mode).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Query {
    pub target: Ipv4Addr,
    pub source: Ipv4Addr,
    pub dad: bool,
}

/// Reasons a received frame is ignored
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reject {
    PacketClass,
    Truncated,
    Operation,
    HardwareType,
    ProtocolType,
    ProtocolLength,
    HardwareLength,
    SenderAddress,
    TargetAddress,
    TargetHardware,
    OwnHardware,
}

/// ARP Frame Structure
/// (without the link-layer header, built by the kernel on a SOCK_DGRAM packet socket)
#[derive(Debug, Clone, PartialEq)]
pub struct ArpFrame {
    hardware_type: u16,      // network link type
    protocol_type: u16,      // upper-layer protocol for resolution
    operation: u16,          // request or reply
    sender_hw_addr: Vec<u8>, // sender hardware address
    sender_proto_addr: Ipv4Addr,
    target_hw_addr: Vec<u8>, // hardware address of target
    target_proto_addr: Ipv4Addr,
}

// normalize_hatype() function
/// FDDI links speak Ethernet ARP
pub fn normalize_hatype(hatype: u16) -> u16 {
    if hatype == ARPHRD_FDDI {
        ARPHRD_ETHER
    } else {
        hatype
    }
}

// min_frame_len() function
/// smallest valid ARP payload for the given hardware address length
pub fn min_frame_len(hw_len: usize) -> usize {
    ARP_HDR_LEN + 2 * (ARP_PROTO_ADDR_LEN as usize + hw_len)
}

// ArpFrame methods
impl ArpFrame {
    // probe() method
    /// Build the outgoing probe: a request, or a reply in advertise mode.
    pub fn probe(
        hatype: u16,
        me: &[u8],
        he: &[u8],
        advert: bool,
        src: Ipv4Addr,
        dst: Ipv4Addr,
    ) -> ArpFrame {
        // advertisements target our own hardware address
        let (operation, target_hw_addr) = if advert {
            (ARP_OP_REPLY, me.to_vec())
        } else {
            (ARP_OP_REQUEST, he.to_vec())
        };
        ArpFrame {
            hardware_type: normalize_hatype(hatype),
            protocol_type: ETHER_P_IP,
            operation,
            sender_hw_addr: me.to_vec(),
            sender_proto_addr: src,
            target_hw_addr,
            target_proto_addr: dst,
        }
    }

    // getters
    pub fn hardware_type(&self) -> u16 {
        self.hardware_type
    }
    pub fn operation(&self) -> u16 {
        self.operation
    }
    pub fn is_request(&self) -> bool {
        self.operation == ARP_OP_REQUEST
    }
    pub fn sender_hw_addr(&self) -> &[u8] {
        &self.sender_hw_addr
    }
    pub fn sender_proto_addr(&self) -> Ipv4Addr {
        self.sender_proto_addr
    }
    pub fn target_hw_addr(&self) -> &[u8] {
        &self.target_hw_addr
    }
    pub fn target_proto_addr(&self) -> Ipv4Addr {
        self.target_proto_addr
    }

    // to_bytes() method
    /// serialize the frame into its wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        let hw_len = self.sender_hw_addr.len();
        let mut buf = vec![0u8; min_frame_len(hw_len)];

        NetworkEndian::write_u16(&mut buf[0..2], self.hardware_type);
        NetworkEndian::write_u16(&mut buf[2..4], self.protocol_type);
        buf[4] = hw_len as u8;
        buf[5] = ARP_PROTO_ADDR_LEN;
        NetworkEndian::write_u16(&mut buf[6..8], self.operation);

        let mut pos = ARP_HDR_LEN;
        buf[pos..pos + hw_len].copy_from_slice(&self.sender_hw_addr);
        pos += hw_len;
        buf[pos..pos + 4].copy_from_slice(&self.sender_proto_addr.octets());
        pos += 4;
        buf[pos..pos + hw_len].copy_from_slice(&self.target_hw_addr[..hw_len]);
        pos += hw_len;
        buf[pos..pos + 4].copy_from_slice(&self.target_proto_addr.octets());

        buf
    }

    // parse() function
    /// Decode and validate a received frame against the outstanding query.
    ///
    /// `me` is our own hardware address, its length is the only accepted
    /// hardware address length.
    pub fn parse(packet: &[u8], link: LinkInfo, me: &[u8], query: &Query) -> Result<ArpFrame, Reject> {
        // filter out wild packets
        match link.class {
            PacketClass::Host | PacketClass::Broadcast | PacketClass::Multicast => {}
            PacketClass::Other(_) => return Err(Reject::PacketClass),
        }
        if packet.len() < ARP_HDR_LEN {
            return Err(Reject::Truncated);
        }

        let hardware_type = NetworkEndian::read_u16(&packet[0..2]);
        let protocol_type = NetworkEndian::read_u16(&packet[2..4]);
        let hw_len = packet[4] as usize;
        let proto_len = packet[5];
        let operation = NetworkEndian::read_u16(&packet[6..8]);

        // only requests and replies are recognised
        if operation != ARP_OP_REQUEST && operation != ARP_OP_REPLY {
            return Err(Reject::Operation);
        }
        if hardware_type != link.hatype
            && (link.hatype != ARPHRD_FDDI || hardware_type != ARPHRD_ETHER)
        {
            return Err(Reject::HardwareType);
        }
        if protocol_type != ETHER_P_IP {
            return Err(Reject::ProtocolType);
        }
        if proto_len != ARP_PROTO_ADDR_LEN {
            return Err(Reject::ProtocolLength);
        }
        if hw_len != me.len() {
            return Err(Reject::HardwareLength);
        }
        if packet.len() < min_frame_len(hw_len) {
            return Err(Reject::Truncated);
        }

        let mut pos = ARP_HDR_LEN;
        let sender_hw_addr = packet[pos..pos + hw_len].to_vec();
        pos += hw_len;
        let sender_proto_addr = read_ipv4(&packet[pos..pos + 4]);
        pos += 4;
        let target_hw_addr = packet[pos..pos + hw_len].to_vec();
        pos += hw_len;
        let target_proto_addr = read_ipv4(&packet[pos..pos + 4]);

        if !query.dad {
            if sender_proto_addr != query.target {
                return Err(Reject::SenderAddress);
            }
            if target_proto_addr != query.source {
                return Err(Reject::TargetAddress);
            }
            if target_hw_addr[..] != me[..] {
                return Err(Reject::TargetHardware);
            }
        } else {
            // a conflict is the tested address answered from another station,
            // the target only matters when we probed from a real source
            if sender_proto_addr != query.target {
                return Err(Reject::SenderAddress);
            }
            if sender_hw_addr[..] == me[..] {
                return Err(Reject::OwnHardware);
            }
            if !query.source.is_unspecified() && target_proto_addr != query.source {
                return Err(Reject::TargetAddress);
            }
        }

        Ok(ArpFrame {
            hardware_type,
            protocol_type,
            operation,
            sender_hw_addr,
            sender_proto_addr,
            target_hw_addr,
            target_proto_addr,
        })
    }

    // report() method
    /// Format the report line of an accepted frame.
    ///
    /// `elapsed` is the time since the last transmitted probe, if any.
    pub fn report(
        &self,
        class: PacketClass,
        query: &Query,
        me: &[u8],
        elapsed: Option<Duration>,
    ) -> String {
        let mut line = String::new();
        line.push_str(match class {
            PacketClass::Host => "Unicast ",
            _ => "Broadcast ",
        });
        line.push_str(if self.is_request() {
            "request from "
        } else {
            "reply from "
        });
        line.push_str(&format!(
            "{} [{}] ",
            self.sender_proto_addr,
            hex_addr(&self.sender_hw_addr)
        ));

        let mut target_printed = false;
        if self.target_proto_addr != query.source {
            line.push_str(&format!("for {} ", self.target_proto_addr));
            target_printed = true;
        }
        if self.target_hw_addr[..] != me[..] {
            if !target_printed {
                line.push_str("for ");
            }
            line.push_str(&format!("[{}]", hex_addr(&self.target_hw_addr)));
        }

        match elapsed {
            Some(d) => {
                let usecs = d.as_micros();
                line.push_str(&format!(" {}.{:03}ms", usecs / 1000, usecs % 1000));
            }
            None => line.push_str(" UNSOLICITED?"),
        }
        line
    }
}

// read_ipv4() function
fn read_ipv4(b: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(b[0], b[1], b[2], b[3])
}

// hex_addr() function
/// colon separated upper case hexadecimal hardware address
pub fn hex_addr(addr: &[u8]) -> String {
    addr.iter().map(|b| format!("{:02X}", b)).join(":")
}

// Tests
#[cfg(test)]
mod test {
    use super::*;

    const ME: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
    const PEER: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
    const BCAST: [u8; 6] = [0xff; 6];

    fn host() -> LinkInfo {
        LinkInfo {
            class: PacketClass::Host,
            hatype: ARPHRD_ETHER,
        }
    }

    fn query() -> Query {
        Query {
            target: Ipv4Addr::new(192, 0, 2, 5),
            source: Ipv4Addr::new(192, 0, 2, 1),
            dad: false,
        }
    }

    // reply from the probed host to our request
    fn reply_from_peer(sender_hw: &[u8]) -> Vec<u8> {
        let mut frame = ArpFrame::probe(
            ARPHRD_ETHER,
            sender_hw,
            &ME,
            false,
            Ipv4Addr::new(192, 0, 2, 5),
            Ipv4Addr::new(192, 0, 2, 1),
        );
        frame.operation = ARP_OP_REPLY;
        frame.to_bytes()
    }

    #[test]
    fn request_wire_format() {
        let frame = ArpFrame::probe(
            ARPHRD_ETHER,
            &ME,
            &BCAST,
            false,
            Ipv4Addr::new(192, 0, 2, 1),
            Ipv4Addr::new(192, 0, 2, 5),
        );
        let bytes = frame.to_bytes();
        assert_eq!(bytes.len(), 28);
        assert_eq!(&bytes[0..8], &[0x00, 0x01, 0x08, 0x00, 6, 4, 0x00, 0x01]);
        assert_eq!(&bytes[8..14], &ME);
        assert_eq!(&bytes[14..18], &[192, 0, 2, 1]);
        assert_eq!(&bytes[18..24], &BCAST);
        assert_eq!(&bytes[24..28], &[192, 0, 2, 5]);
    }

    #[test]
    fn advertisement_targets_self() {
        let frame = ArpFrame::probe(
            ARPHRD_FDDI,
            &ME,
            &BCAST,
            true,
            Ipv4Addr::new(192, 0, 2, 1),
            Ipv4Addr::new(192, 0, 2, 1),
        );
        assert_eq!(frame.operation(), ARP_OP_REPLY);
        assert_eq!(frame.target_hw_addr(), &ME);
        // FDDI is sent as Ethernet
        assert_eq!(frame.hardware_type(), ARPHRD_ETHER);
    }

    #[test]
    fn mirrored_request_validates() {
        // peer's request for our source, seen from the peer's configuration
        let ours = ArpFrame::probe(
            ARPHRD_ETHER,
            &ME,
            &PEER,
            false,
            Ipv4Addr::new(192, 0, 2, 1),
            Ipv4Addr::new(192, 0, 2, 5),
        )
        .to_bytes();
        // our request carries the peer as target hardware address when unicasting
        let mirrored = Query {
            target: Ipv4Addr::new(192, 0, 2, 1),
            source: Ipv4Addr::new(192, 0, 2, 5),
            dad: false,
        };
        let frame = ArpFrame::parse(&ours, host(), &PEER, &mirrored).unwrap();
        assert!(frame.is_request());
        assert_eq!(frame.sender_hw_addr(), &ME);
        assert_eq!(frame.target_proto_addr(), Ipv4Addr::new(192, 0, 2, 5));
    }

    #[test]
    fn accepts_matching_reply() {
        let frame = ArpFrame::parse(&reply_from_peer(&PEER), host(), &ME, &query()).unwrap();
        assert_eq!(frame.sender_proto_addr(), Ipv4Addr::new(192, 0, 2, 5));
        assert_eq!(frame.sender_hw_addr(), &PEER);
        assert!(!frame.is_request());
    }

    #[test]
    fn rejects_structural_mismatches() {
        let good = reply_from_peer(&PEER);

        let other = LinkInfo {
            class: PacketClass::Other(4),
            hatype: ARPHRD_ETHER,
        };
        assert_eq!(
            ArpFrame::parse(&good, other, &ME, &query()),
            Err(Reject::PacketClass)
        );

        let mut bad = good.clone();
        bad[7] = 3; // RARP request
        assert_eq!(ArpFrame::parse(&bad, host(), &ME, &query()), Err(Reject::Operation));

        let mut bad = good.clone();
        bad[1] = 6; // IEEE 802
        assert_eq!(
            ArpFrame::parse(&bad, host(), &ME, &query()),
            Err(Reject::HardwareType)
        );

        let mut bad = good.clone();
        bad[2] = 0x86;
        bad[3] = 0xdd;
        assert_eq!(
            ArpFrame::parse(&bad, host(), &ME, &query()),
            Err(Reject::ProtocolType)
        );

        let mut bad = good.clone();
        bad[5] = 16;
        assert_eq!(
            ArpFrame::parse(&bad, host(), &ME, &query()),
            Err(Reject::ProtocolLength)
        );

        assert_eq!(
            ArpFrame::parse(&good[..27], host(), &ME, &query()),
            Err(Reject::Truncated)
        );
        assert_eq!(
            ArpFrame::parse(&good[..4], host(), &ME, &query()),
            Err(Reject::Truncated)
        );
    }

    #[test]
    fn rejects_foreign_hardware_length() {
        let short_me = [0x02, 0x00, 0x00, 0x01];
        assert_eq!(
            ArpFrame::parse(&reply_from_peer(&PEER), host(), &short_me, &query()),
            Err(Reject::HardwareLength)
        );
    }

    #[test]
    fn fddi_links_accept_ethernet_type() {
        let link = LinkInfo {
            class: PacketClass::Broadcast,
            hatype: ARPHRD_FDDI,
        };
        assert!(ArpFrame::parse(&reply_from_peer(&PEER), link, &ME, &query()).is_ok());
    }

    #[test]
    fn normal_mode_semantics() {
        let mut q = query();
        q.target = Ipv4Addr::new(192, 0, 2, 6);
        assert_eq!(
            ArpFrame::parse(&reply_from_peer(&PEER), host(), &ME, &q),
            Err(Reject::SenderAddress)
        );

        let mut q = query();
        q.source = Ipv4Addr::new(192, 0, 2, 2);
        assert_eq!(
            ArpFrame::parse(&reply_from_peer(&PEER), host(), &ME, &q),
            Err(Reject::TargetAddress)
        );

        let other_me = [0x02, 0x00, 0x00, 0x00, 0x00, 0x02];
        assert_eq!(
            ArpFrame::parse(&reply_from_peer(&PEER), host(), &other_me, &query()),
            Err(Reject::TargetHardware)
        );
    }

    #[test]
    fn dad_conflict_detection() {
        let dad = Query {
            target: Ipv4Addr::new(192, 0, 2, 5),
            source: Ipv4Addr::UNSPECIFIED,
            dad: true,
        };
        // another station defends the tested address
        let conflict = ArpFrame::probe(
            ARPHRD_ETHER,
            &PEER,
            &BCAST,
            false,
            Ipv4Addr::new(192, 0, 2, 5),
            Ipv4Addr::new(198, 51, 100, 7),
        )
        .to_bytes();
        assert!(ArpFrame::parse(&conflict, host(), &ME, &dad).is_ok());

        // our own probe looped back is never a conflict
        let echo = ArpFrame::probe(
            ARPHRD_ETHER,
            &ME,
            &BCAST,
            false,
            Ipv4Addr::new(192, 0, 2, 5),
            Ipv4Addr::new(198, 51, 100, 7),
        )
        .to_bytes();
        assert_eq!(
            ArpFrame::parse(&echo, host(), &ME, &dad),
            Err(Reject::OwnHardware)
        );

        // with a configured source, the target must be our source
        let sourced = Query {
            source: Ipv4Addr::new(192, 0, 2, 1),
            ..dad
        };
        assert_eq!(
            ArpFrame::parse(&conflict, host(), &ME, &sourced),
            Err(Reject::TargetAddress)
        );
    }

    #[test]
    fn report_line_formats() {
        let frame = ArpFrame::parse(&reply_from_peer(&PEER), host(), &ME, &query()).unwrap();
        assert_eq!(
            frame.report(
                PacketClass::Host,
                &query(),
                &ME,
                Some(Duration::from_micros(1734))
            ),
            "Unicast reply from 192.0.2.5 [00:11:22:33:44:55]  1.734ms"
        );
        assert_eq!(
            frame.report(PacketClass::Broadcast, &query(), &ME, None),
            "Broadcast reply from 192.0.2.5 [00:11:22:33:44:55]  UNSOLICITED?"
        );
    }

    #[test]
    fn report_line_foreign_target() {
        let dad = Query {
            target: Ipv4Addr::new(192, 0, 2, 5),
            source: Ipv4Addr::UNSPECIFIED,
            dad: true,
        };
        let conflict = ArpFrame::probe(
            ARPHRD_ETHER,
            &PEER,
            &BCAST,
            false,
            Ipv4Addr::new(192, 0, 2, 5),
            Ipv4Addr::new(198, 51, 100, 7),
        )
        .to_bytes();
        let frame = ArpFrame::parse(&conflict, host(), &ME, &dad).unwrap();
        assert_eq!(
            frame.report(
                PacketClass::Broadcast,
                &dad,
                &ME,
                Some(Duration::from_micros(250))
            ),
            "Broadcast request from 192.0.2.5 [00:11:22:33:44:55] for 198.51.100.7 [FF:FF:FF:FF:FF:FF] 0.250ms"
        );
    }
}
