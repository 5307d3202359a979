//! finite-state machine module
//! This module holds the probe session: its counters, the broadcast to
//! unicast destination transition and the termination decisions.
use crate::packets::{ArpFrame, PacketClass};
use crate::Modes;

// std
use std::io::{self, Write};
use std::time::{Duration, Instant};

/// Link Endpoint Structure
///
/// Our own binding ("me") and the current destination ("he") link-layer
/// addresses on the resolved interface.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkEndpoint {
    hatype: u16,
    me: Vec<u8>,
    he: Vec<u8>,
}

impl LinkEndpoint {
    // new() method
    /// `broadcast` seeds the destination, it must be as long as `me`
    pub fn new(hatype: u16, me: Vec<u8>, broadcast: Vec<u8>) -> LinkEndpoint {
        debug_assert_eq!(me.len(), broadcast.len());
        LinkEndpoint {
            hatype,
            me,
            he: broadcast,
        }
    }
    // hatype() getter
    pub fn hatype(&self) -> u16 {
        self.hatype
    }
    // me() getter
    pub fn me(&self) -> &[u8] {
        &self.me
    }
    // he() getter
    pub fn he(&self) -> &[u8] {
        &self.he
    }
}

/// Session Counters Structure
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Counters {
    pub sent: u32,
    pub broadcast_sent: u32,
    pub received: u32,
    pub broadcast_received: u32,
    pub request_received: u32,
}

/// Decision returned to the event loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Continue,
    Final,
}

/// Probe Session Structure
#[derive(Debug)]
pub struct ProbeSession {
    modes: Modes,
    count: i32,
    timeout: i32,
    endpoint: LinkEndpoint,
    counters: Counters,
    last_send: Option<Instant>,
    unicasting: bool,
    total_expires: u64,
}

impl ProbeSession {
    // new() method
    pub fn new(modes: Modes, count: i32, timeout: i32, endpoint: LinkEndpoint) -> ProbeSession {
        ProbeSession {
            modes,
            count,
            timeout,
            endpoint,
            counters: Counters::default(),
            last_send: None,
            unicasting: false,
            // the first probe goes out before the timer is armed
            total_expires: 1,
        }
    }
    // endpoint() getter
    pub fn endpoint(&self) -> &LinkEndpoint {
        &self.endpoint
    }
    // counters() getter
    pub fn counters(&self) -> &Counters {
        &self.counters
    }
    // modes() getter
    pub fn modes(&self) -> &Modes {
        &self.modes
    }
    // unicasting() getter
    pub fn unicasting(&self) -> bool {
        self.unicasting
    }

    // elapsed() method
    /// time since the last probe went out, None before the first one
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.last_send
            .map(|last| now.saturating_duration_since(last))
    }

    // record_send() method
    /// account for a probe fully written to the socket at `at`
    pub fn record_send(&mut self, at: Instant) {
        self.last_send = Some(at);
        self.counters.sent += 1;
        if !self.unicasting {
            self.counters.broadcast_sent += 1;
        }
    }

    // expire() method
    /// Account for timer expirations, Final once the probe budget is spent.
    pub fn expire(&mut self, expirations: u64) -> Verdict {
        self.total_expires += expirations;
        if self.count > 0 && (self.count as u64) < self.total_expires {
            Verdict::Final
        } else {
            Verdict::Continue
        }
    }

    // accept() method
    /// Account for a validated frame and decide whether to stop.
    pub fn accept(&mut self, frame: &ArpFrame, class: PacketClass) -> Verdict {
        self.counters.received += 1;
        if class != PacketClass::Host {
            self.counters.broadcast_received += 1;
        }
        if frame.is_request() {
            self.counters.request_received += 1;
        }

        // one-way switch from the broadcast address to the responder
        if !self.modes.broadcast_only && !self.unicasting {
            self.endpoint.he = frame.sender_hw_addr().to_vec();
            self.unicasting = true;
        }

        let received = self.counters.received as i64;
        if self.timeout != 0 && received == self.count as i64 {
            return Verdict::Final;
        }
        if self.modes.quit_on_reply {
            return Verdict::Final;
        }
        if self.count <= 0 && self.counters.received == self.counters.sent {
            return Verdict::Final;
        }
        Verdict::Continue
    }

    // finish() method
    /// Print the summary (unless quiet) and return the mode-specific status.
    pub fn finish<W: Write>(&self, out: &mut W) -> io::Result<i32> {
        if !self.modes.quiet {
            let c = &self.counters;
            writeln!(out, "Sent {} probes ({} broadcast(s))", c.sent, c.broadcast_sent)?;
            write!(out, "Received {} response(s)", c.received)?;
            if c.broadcast_received > 0 || c.request_received > 0 {
                write!(out, " (")?;
                if c.request_received > 0 {
                    write!(out, "{} request(s)", c.request_received)?;
                }
                if c.broadcast_received > 0 {
                    write!(
                        out,
                        "{}{} broadcast(s)",
                        if c.request_received > 0 { ", " } else { "" },
                        c.broadcast_received
                    )?;
                }
                write!(out, ")")?;
            }
            writeln!(out)?;
            out.flush()?;
        }
        Ok(self.base_status())
    }

    // base_status() method
    fn base_status(&self) -> i32 {
        if self.modes.dad {
            // any answer means the tested address is in use
            return (self.counters.received > 0) as i32;
        }
        if self.modes.unsolicited {
            return 0;
        }
        (self.counters.received == 0) as i32
    }

    // exit_status() method
    /// Combine the finisher's status with the loop observations.
    pub fn exit_status(&self, base: i32, net_down: bool) -> i32 {
        let mut rc = base;
        if net_down {
            rc |= 2;
        }
        if self.counters.broadcast_sent == self.counters.received {
            rc |= 1;
        }
        rc
    }
}

impl std::fmt::Display for Counters {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "sent {} (broadcast {}), received {} (broadcast {}, request {})",
            self.sent,
            self.broadcast_sent,
            self.received,
            self.broadcast_received,
            self.request_received
        )
    }
}

// Tests
#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::*;
    use crate::packets::{LinkInfo, Query};
    use std::net::Ipv4Addr;

    const ME: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
    const PEER: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];

    fn endpoint() -> LinkEndpoint {
        LinkEndpoint::new(ARPHRD_ETHER, ME.to_vec(), vec![0xff; 6])
    }

    fn reply() -> ArpFrame {
        let query = Query {
            target: Ipv4Addr::new(192, 0, 2, 5),
            source: Ipv4Addr::new(192, 0, 2, 1),
            dad: false,
        };
        let mut bytes = ArpFrame::probe(
            ARPHRD_ETHER,
            &PEER,
            &ME,
            false,
            query.target,
            query.source,
        )
        .to_bytes();
        bytes[7] = ARP_OP_REPLY as u8;
        let link = LinkInfo {
            class: PacketClass::Host,
            hatype: ARPHRD_ETHER,
        };
        ArpFrame::parse(&bytes, link, &ME, &query).unwrap()
    }

    #[test]
    fn first_reply_switches_to_unicast() {
        let mut s = ProbeSession::new(Modes::default(), 5, 0, endpoint());
        s.record_send(Instant::now());
        assert_eq!(s.counters().broadcast_sent, 1);

        assert_eq!(s.accept(&reply(), PacketClass::Host), Verdict::Continue);
        assert_eq!(s.counters().received, 1);
        assert!(s.unicasting());
        assert_eq!(s.endpoint().he(), &PEER);

        // unicast probes are not broadcasts
        s.record_send(Instant::now());
        assert_eq!(s.counters().sent, 2);
        assert_eq!(s.counters().broadcast_sent, 1);
    }

    #[test]
    fn broadcast_only_keeps_destination() {
        let modes = Modes {
            broadcast_only: true,
            ..Modes::default()
        };
        let mut s = ProbeSession::new(modes, 5, 0, endpoint());
        s.record_send(Instant::now());
        s.accept(&reply(), PacketClass::Broadcast);
        assert!(!s.unicasting());
        assert_eq!(s.endpoint().he(), &[0xff; 6]);
        assert_eq!(s.counters().broadcast_received, 1);
    }

    #[test]
    fn unlimited_count_stops_when_all_answered() {
        let mut s = ProbeSession::new(Modes::default(), -1, 0, endpoint());
        s.record_send(Instant::now());
        assert_eq!(s.accept(&reply(), PacketClass::Host), Verdict::Final);

        // zero count is unlimited as well
        let mut s = ProbeSession::new(Modes::default(), 0, 0, endpoint());
        s.record_send(Instant::now());
        s.record_send(Instant::now());
        assert_eq!(s.accept(&reply(), PacketClass::Host), Verdict::Continue);
        assert_eq!(s.accept(&reply(), PacketClass::Host), Verdict::Final);
    }

    #[test]
    fn timeout_budget_stops_at_count() {
        let mut s = ProbeSession::new(Modes::default(), 2, 10, endpoint());
        s.record_send(Instant::now());
        assert_eq!(s.accept(&reply(), PacketClass::Host), Verdict::Continue);
        s.record_send(Instant::now());
        assert_eq!(s.accept(&reply(), PacketClass::Host), Verdict::Final);
    }

    #[test]
    fn quiet_quit_on_first_reply() {
        let modes = Modes {
            quiet: true,
            quit_on_reply: true,
            ..Modes::default()
        };
        let mut s = ProbeSession::new(modes, 3, 0, endpoint());
        s.record_send(Instant::now());
        assert_eq!(s.accept(&reply(), PacketClass::Host), Verdict::Final);
        assert_eq!(s.counters().sent, 1);

        let mut out = Vec::new();
        assert_eq!(s.finish(&mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn timer_budget() {
        let mut s = ProbeSession::new(Modes::default(), 3, 0, endpoint());
        assert_eq!(s.expire(1), Verdict::Continue);
        assert_eq!(s.expire(1), Verdict::Continue);
        assert_eq!(s.expire(1), Verdict::Final);

        // missed expirations count against the budget
        let mut s = ProbeSession::new(Modes::default(), 3, 0, endpoint());
        assert_eq!(s.expire(3), Verdict::Final);

        let mut s = ProbeSession::new(Modes::default(), -1, 0, endpoint());
        assert_eq!(s.expire(1000), Verdict::Continue);
    }

    #[test]
    fn dad_exit_codes() {
        let modes = Modes {
            dad: true,
            quit_on_reply: true,
            quiet: true,
            ..Modes::default()
        };
        let mut free = ProbeSession::new(modes, 3, 0, endpoint());
        free.record_send(Instant::now());
        let mut out = Vec::new();
        assert_eq!(free.finish(&mut out).unwrap(), 0);

        let mut taken = ProbeSession::new(modes, 3, 0, endpoint());
        taken.record_send(Instant::now());
        taken.accept(&reply(), PacketClass::Broadcast);
        assert_ne!(taken.finish(&mut out).unwrap(), 0);
    }

    #[test]
    fn unsolicited_always_succeeds() {
        let modes = Modes {
            unsolicited: true,
            quiet: true,
            ..Modes::default()
        };
        let s = ProbeSession::new(modes, 1, 0, endpoint());
        let mut out = Vec::new();
        assert_eq!(s.finish(&mut out).unwrap(), 0);
    }

    #[test]
    fn summary_lines() {
        let mut s = ProbeSession::new(Modes::default(), 5, 0, endpoint());
        s.record_send(Instant::now());
        s.record_send(Instant::now());
        let mut request = reply();
        // turn the reply into a request for the breakdown
        let mut bytes = request.to_bytes();
        bytes[7] = ARP_OP_REQUEST as u8;
        let query = Query {
            target: Ipv4Addr::new(192, 0, 2, 5),
            source: Ipv4Addr::new(192, 0, 2, 1),
            dad: false,
        };
        let link = LinkInfo {
            class: PacketClass::Broadcast,
            hatype: ARPHRD_ETHER,
        };
        request = ArpFrame::parse(&bytes, link, &ME, &query).unwrap();
        s.accept(&request, PacketClass::Broadcast);

        let mut out = Vec::new();
        assert_eq!(s.finish(&mut out).unwrap(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Sent 2 probes (2 broadcast(s))\nReceived 1 response(s) (1 request(s), 1 broadcast(s))\n"
        );
    }

    #[test]
    fn exit_status_combination() {
        let mut s = ProbeSession::new(Modes::default(), 1, 0, endpoint());
        // nothing sent, nothing heard: broadcasts equal responses
        assert_eq!(s.exit_status(1, false), 1);
        assert_eq!(s.exit_status(0, true), 3);

        s.record_send(Instant::now());
        s.record_send(Instant::now());
        s.accept(&reply(), PacketClass::Host);
        assert_eq!(s.exit_status(0, false), 0);
    }
}
