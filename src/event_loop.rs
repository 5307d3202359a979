//! event loop module
//! Multiplexes the signal channel, the interval timer and the packet socket,
//! and drives the probe session to completion.
use crate::constants::*;
use crate::debug::{print_debug, Verbose};
use crate::error::Error;
use crate::fsm::{ProbeSession, Verdict};
use crate::os::linux::arp::Link;
use crate::os::linux::signal::{is_termination, SignalChannel, TERMINATION_SIGNALS};
use crate::packets::{ArpFrame, Query};
use crate::timers::IntervalTimer;

// std
use std::io::{self, Write};
use std::os::unix::io::AsRawFd;
use std::time::{Duration, Instant};

// libc
use libc::{pollfd, POLLERR, POLLHUP, POLLIN};

// poll descriptors order
const POLLFD_SIGNAL: usize = 0;
const POLLFD_TIMER: usize = 1;
const POLLFD_SOCKET: usize = 2;

/// Prober Structure
///
/// Event handlers of the loop, bound to one link and one session. Reports go
/// to `out`, runtime failures to `err`.
pub struct Prober<'a, L: Link, W: Write, E: Write> {
    link: &'a L,
    session: ProbeSession,
    query: Query,
    out: W,
    err: E,
    debug: &'a Verbose,
    net_down: bool,
}

impl<'a, L: Link, W: Write, E: Write> Prober<'a, L, W, E> {
    // new() method
    pub fn new(
        link: &'a L,
        session: ProbeSession,
        query: Query,
        out: W,
        err: E,
        debug: &'a Verbose,
    ) -> Self {
        Prober {
            link,
            session,
            query,
            out,
            err,
            debug,
            net_down: false,
        }
    }

    // session() getter
    pub fn session(&self) -> &ProbeSession {
        &self.session
    }

    // diagnostic() method
    /// Report a runtime failure on the error stream, whatever the verbosity.
    pub fn diagnostic(&mut self, src: &str, msg: String) {
        if let Err(e) = writeln!(self.err, "{}: {}", RARPING_PROG, msg) {
            print_debug(
                self.debug,
                DEBUG_LEVEL_LOW,
                src,
                format!("cannot write diagnostic: {}", e),
            );
        }
    }

    // send_probe() method
    /// Encode and transmit one probe, only complete writes are accounted.
    pub fn send_probe(&mut self) {
        let endpoint = self.session.endpoint();
        let frame = ArpFrame::probe(
            endpoint.hatype(),
            endpoint.me(),
            endpoint.he(),
            self.session.modes().advert,
            self.query.source,
            self.query.target,
        );
        let bytes = frame.to_bytes();
        let now = Instant::now();
        match self.link.send(&bytes, endpoint.he()) {
            Ok(n) if n == bytes.len() => {
                self.session.record_send(now);
                print_debug(
                    self.debug,
                    DEBUG_LEVEL_EXTENSIVE,
                    DEBUG_SRC_PACKET,
                    format!("sent {} bytes probe for {}", n, self.query.target),
                );
            }
            Ok(n) => print_debug(
                self.debug,
                DEBUG_LEVEL_LOW,
                DEBUG_SRC_SOCKET,
                format!("short write: {} of {} bytes", n, bytes.len()),
            ),
            Err(e) => self.diagnostic(DEBUG_SRC_SOCKET, format!("sendto: {}", e)),
        }
    }

    // on_readable() method
    /// Receive, validate and report one frame.
    pub fn on_readable(&mut self) -> Verdict {
        let mut buf = [0u8; RECV_BUF_SIZE];
        let (len, link) = match self.link.recv(&mut buf) {
            Ok(r) => r,
            Err(e) => {
                self.diagnostic(DEBUG_SRC_SOCKET, format!("recvfrom: {}", e));
                if e.raw_os_error() == Some(libc::ENETDOWN) {
                    self.net_down = true;
                }
                return Verdict::Continue;
            }
        };
        let now = Instant::now();
        let me = self.session.endpoint().me().to_vec();
        let frame = match ArpFrame::parse(&buf[..len], link, &me, &self.query) {
            Ok(f) => f,
            Err(reject) => {
                print_debug(
                    self.debug,
                    DEBUG_LEVEL_EXTENSIVE,
                    DEBUG_SRC_PACKET,
                    format!("ignored {} bytes frame: {:?}", len, reject),
                );
                return Verdict::Continue;
            }
        };

        if !self.session.modes().quiet {
            let line = frame.report(link.class, &self.query, &me, self.session.elapsed(now));
            if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
                print_debug(
                    self.debug,
                    DEBUG_LEVEL_LOW,
                    DEBUG_SRC_SESSION,
                    format!("cannot write report: {}", e),
                );
            }
        }

        let verdict = self.session.accept(&frame, link.class);
        print_debug(
            self.debug,
            DEBUG_LEVEL_HIGH,
            DEBUG_SRC_SESSION,
            format!("{}", self.session.counters()),
        );
        verdict
    }

    // on_timer() method
    pub fn on_timer(&mut self, expirations: u64) -> Verdict {
        if self.session.expire(expirations) == Verdict::Final {
            return Verdict::Final;
        }
        self.send_probe();
        Verdict::Continue
    }

    // on_signal() method
    pub fn on_signal(&mut self, signo: u32) -> Verdict {
        if is_termination(signo) {
            print_debug(
                self.debug,
                DEBUG_LEVEL_MEDIUM,
                DEBUG_SRC_SIGNAL,
                format!("received signal {}", signo),
            );
            return Verdict::Final;
        }
        if let Err(e) = writeln!(self.out, "{}: unexpected signal: {}", RARPING_PROG, signo) {
            print_debug(
                self.debug,
                DEBUG_LEVEL_LOW,
                DEBUG_SRC_SIGNAL,
                format!("cannot write report: {}", e),
            );
        }
        Verdict::Continue
    }

    // finish() method
    /// Print the summary and compute the process exit status.
    pub fn finish(mut self) -> io::Result<i32> {
        let base = self.session.finish(&mut self.out)?;
        Ok(self.session.exit_status(base, self.net_down))
    }
}

// run() function
/// Send the first probe, then loop until the session is over or a
/// termination signal arrives.
pub fn run<L: Link, W: Write, E: Write>(
    mut prober: Prober<L, W, E>,
    interval: Duration,
) -> Result<i32, Error> {
    let debug = prober.debug;
    let signals =
        SignalChannel::open(&TERMINATION_SIGNALS).map_err(|e| Error::EventLoop("signalfd", e))?;
    let timer = IntervalTimer::start(interval, debug).map_err(|e| Error::EventLoop("timerfd", e))?;

    let events = POLLIN | POLLERR | POLLHUP;
    let mut pfds = [
        pollfd {
            fd: signals.as_raw_fd(),
            events,
            revents: 0,
        },
        pollfd {
            fd: timer.as_raw_fd(),
            events,
            revents: 0,
        },
        pollfd {
            fd: prober.link.as_raw_fd(),
            events,
            revents: 0,
        },
    ];

    prober.send_probe();

    'event_loop: loop {
        let ret = unsafe { libc::poll(pfds.as_mut_ptr(), pfds.len() as libc::nfds_t, -1) };
        if ret < 0 {
            let e = io::Error::last_os_error();
            match e.raw_os_error() {
                Some(libc::EINTR) | Some(libc::EAGAIN) => continue,
                _ => {
                    prober.diagnostic(DEBUG_SRC_MAIN, format!("poll failed: {}", e));
                    break 'event_loop;
                }
            }
        }

        for i in 0..pfds.len() {
            if pfds[i].revents == 0 {
                continue;
            }
            let verdict = match i {
                POLLFD_SIGNAL => match signals.read() {
                    Ok(signo) => prober.on_signal(signo),
                    Err(e) => {
                        prober.diagnostic(DEBUG_SRC_SIGNAL, format!("could not read signalfd: {}", e));
                        Verdict::Continue
                    }
                },
                POLLFD_TIMER => match timer.read() {
                    Ok(exp) => prober.on_timer(exp),
                    Err(e) => {
                        prober.diagnostic(DEBUG_SRC_TIMER, format!("could not read timerfd: {}", e));
                        Verdict::Continue
                    }
                },
                POLLFD_SOCKET => prober.on_readable(),
                _ => Verdict::Continue,
            };
            if verdict == Verdict::Final {
                break 'event_loop;
            }
        }
    }

    drop(signals);
    drop(timer);
    prober.finish().map_err(|e| Error::EventLoop("write", e))
}

// Tests
#[cfg(test)]
mod test {
    use super::*;
    use crate::fsm::LinkEndpoint;
    use crate::packets::{LinkInfo, PacketClass};
    use crate::Modes;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::net::Ipv4Addr;
    use std::os::unix::io::RawFd;

    const ME: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];
    const PEER: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
    const BCAST: [u8; 6] = [0xff; 6];

    #[derive(Default)]
    struct FakeLink {
        sent: RefCell<Vec<(Vec<u8>, Vec<u8>)>>,
        short_write: bool,
        send_error: Option<i32>,
        inbox: RefCell<VecDeque<io::Result<(Vec<u8>, LinkInfo)>>>,
    }

    impl AsRawFd for FakeLink {
        fn as_raw_fd(&self) -> RawFd {
            -1
        }
    }

    impl Link for FakeLink {
        fn send(&self, frame: &[u8], dest: &[u8]) -> io::Result<usize> {
            if let Some(errno) = self.send_error {
                return Err(io::Error::from_raw_os_error(errno));
            }
            self.sent.borrow_mut().push((frame.to_vec(), dest.to_vec()));
            Ok(if self.short_write { frame.len() - 1 } else { frame.len() })
        }
        fn recv(&self, buf: &mut [u8]) -> io::Result<(usize, LinkInfo)> {
            match self.inbox.borrow_mut().pop_front() {
                Some(Ok((frame, info))) => {
                    buf[..frame.len()].copy_from_slice(&frame);
                    Ok((frame.len(), info))
                }
                Some(Err(e)) => Err(e),
                None => Err(io::Error::from_raw_os_error(libc::EAGAIN)),
            }
        }
    }

    fn query() -> Query {
        Query {
            target: Ipv4Addr::new(192, 0, 2, 5),
            source: Ipv4Addr::new(192, 0, 2, 1),
            dad: false,
        }
    }

    fn session(modes: Modes, count: i32) -> ProbeSession {
        let endpoint = LinkEndpoint::new(ARPHRD_ETHER, ME.to_vec(), BCAST.to_vec());
        ProbeSession::new(modes, count, 0, endpoint)
    }

    // the peer's answer to our probe
    fn reply(peer: &[u8], me: &[u8]) -> (Vec<u8>, LinkInfo) {
        let q = query();
        let mut bytes = ArpFrame::probe(ARPHRD_ETHER, peer, me, false, q.target, q.source).to_bytes();
        bytes[7] = ARP_OP_REPLY as u8;
        (
            bytes,
            LinkInfo {
                class: PacketClass::Host,
                hatype: ARPHRD_ETHER,
            },
        )
    }

    #[test]
    fn probes_switch_to_unicast_after_reply() {
        let link = FakeLink::default();
        link.inbox.borrow_mut().push_back(Ok(reply(&PEER, &ME)));
        let debug = Verbose::quiet();
        let mut out = Vec::new();
        let mut prober = Prober::new(&link, session(Modes::default(), 3), query(), &mut out, io::sink(), &debug);

        prober.send_probe();
        assert_eq!(prober.on_readable(), Verdict::Continue);
        prober.send_probe();
        assert_eq!(prober.session().counters().sent, 2);
        assert_eq!(prober.session().counters().broadcast_sent, 1);
        // answered, but as many responses as broadcasts
        assert_eq!(prober.finish().unwrap(), 1);

        let sent = link.sent.borrow();
        assert_eq!(sent[0].1, BCAST.to_vec());
        assert_eq!(sent[1].1, PEER.to_vec());
        // the second request asks the responder directly
        assert_eq!(&sent[1].0[18..24], &PEER);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Unicast reply from 192.0.2.5 [00:11:22:33:44:55]  "));
        assert!(text.contains("Sent 2 probes (1 broadcast(s))\n"));
        assert!(text.ends_with("Received 1 response(s)\n"));
    }

    #[test]
    fn short_writes_are_not_counted() {
        let link = FakeLink {
            short_write: true,
            ..FakeLink::default()
        };
        let debug = Verbose::quiet();
        let mut prober = Prober::new(&link, session(Modes::default(), 3), query(), Vec::new(), io::sink(), &debug);
        prober.send_probe();
        assert_eq!(prober.session().counters().sent, 0);
        assert_eq!(link.sent.borrow().len(), 1);
    }

    #[test]
    fn foreign_hardware_length_leaves_counters() {
        let link = FakeLink::default();
        link.inbox.borrow_mut().push_back(Ok(reply(&[0x11; 8], &[0x02; 8])));
        let debug = Verbose::quiet();
        let mut prober = Prober::new(&link, session(Modes::default(), 3), query(), Vec::new(), io::sink(), &debug);
        prober.send_probe();
        let before = *prober.session().counters();
        assert_eq!(prober.on_readable(), Verdict::Continue);
        assert_eq!(*prober.session().counters(), before);
        assert!(!prober.session().unicasting());
    }

    #[test]
    fn network_down_is_reported() {
        let link = FakeLink::default();
        link.inbox
            .borrow_mut()
            .push_back(Err(io::Error::from_raw_os_error(libc::ENETDOWN)));
        let debug = Verbose::quiet();
        let modes = Modes {
            quiet: true,
            ..Modes::default()
        };
        let mut err = Vec::new();
        let mut prober = Prober::new(&link, session(modes, 1), query(), Vec::new(), &mut err, &debug);
        prober.send_probe();
        assert_eq!(prober.on_readable(), Verdict::Continue);
        // no answer (1), network down (2)
        assert_eq!(prober.finish().unwrap(), 3);
        // reported even at the default verbosity
        let text = String::from_utf8(err).unwrap();
        assert_eq!(text, format!("rarping: recvfrom: {}\n", io::Error::from_raw_os_error(libc::ENETDOWN)));
    }

    #[test]
    fn send_failures_are_reported() {
        let link = FakeLink {
            send_error: Some(libc::ENETDOWN),
            ..FakeLink::default()
        };
        let debug = Verbose::quiet();
        let mut err = Vec::new();
        let mut prober = Prober::new(&link, session(Modes::default(), 3), query(), Vec::new(), &mut err, &debug);
        prober.send_probe();
        assert_eq!(prober.session().counters().sent, 0);
        drop(prober);
        let text = String::from_utf8(err).unwrap();
        assert!(text.starts_with("rarping: sendto: "));
    }

    #[test]
    fn timer_sends_until_count() {
        let link = FakeLink::default();
        let debug = Verbose::quiet();
        let mut prober = Prober::new(&link, session(Modes::default(), 2), query(), Vec::new(), io::sink(), &debug);
        prober.send_probe();
        assert_eq!(prober.on_timer(1), Verdict::Continue);
        assert_eq!(prober.on_timer(1), Verdict::Final);
        assert_eq!(link.sent.borrow().len(), 2);
    }

    #[test]
    fn signals() {
        let link = FakeLink::default();
        let debug = Verbose::quiet();
        let mut out = Vec::new();
        let mut prober = Prober::new(&link, session(Modes::default(), 2), query(), &mut out, io::sink(), &debug);
        assert_eq!(prober.on_signal(libc::SIGUSR1 as u32), Verdict::Continue);
        assert_eq!(prober.on_signal(libc::SIGTERM as u32), Verdict::Final);
        drop(prober);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("unexpected signal: {}", libc::SIGUSR1)));
    }

    #[test]
    fn quiet_quit_on_first_reply() {
        let link = FakeLink::default();
        link.inbox.borrow_mut().push_back(Ok(reply(&PEER, &ME)));
        let debug = Verbose::quiet();
        let modes = Modes {
            quiet: true,
            quit_on_reply: true,
            ..Modes::default()
        };
        let mut out = Vec::new();
        let mut prober = Prober::new(&link, session(modes, 3), query(), &mut out, io::sink(), &debug);
        prober.send_probe();
        assert_eq!(prober.on_readable(), Verdict::Final);
        assert_eq!(prober.session().counters().sent, 1);
        prober.finish().unwrap();
        assert!(out.is_empty());
    }
}
