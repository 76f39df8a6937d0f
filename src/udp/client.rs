use log;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::error::is_timeout;
use crate::proto::{
    self, PeerDescriptor, DESCRIPTOR_LEN, MARKER_ACK, MARKER_OPEN, MAX_DATAGRAM,
};
use crate::{Error, Result};

/// Receive window of a single punch attempt.
///
/// Short on purpose: both clients leave the rendezvous at the same moment,
/// so a missing reply means the candidate address has no usable mapping,
/// not that the peer is slow.
const PUNCH_TIMEOUT: Duration = Duration::from_millis(1);

/// Receive window once a path to the peer exists.
const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of a timeout-bounded receive.
enum Probe {
    Byte(u8),
    TimedOut,
}

/// Udp hole punching client.
///
/// Binds a fixed local port, registers with the rendezvous server, then
/// punches toward the peer's global address with a fallback to its local
/// one. The fixed port matters: registration and punching must leave the
/// same NAT mapping behind.
///
/// # example
/// ```no_run
/// use udppunch::udp::Client;
///
/// let mut c = Client::new("192.168.1.5:9999".parse().unwrap()).unwrap();
/// let id = c.connect("203.0.113.7:8888").unwrap();
///
/// let mut buf = [0u8; 100];
/// if id == 1 {
///     c.send(&buf).unwrap();
/// } else {
///     c.recv(&mut buf).unwrap();
/// }
/// ```
pub struct Client {
    socket: UdpSocket,
    local_addr: SocketAddrV4,
    punch_timeout: Duration,
    peer: Option<PeerDescriptor>,
    peer_addr: Option<SocketAddrV4>,
}

impl Client {
    /// Binds to `local_addr`. Port 0 lets the OS pick one.
    pub fn new(local_addr: SocketAddrV4) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&SocketAddr::V4(local_addr).into())?;
        let socket: UdpSocket = socket.into();

        let local_addr = match socket.local_addr()? {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => return Err(Error::Ipv4Only),
        };

        Ok(Self {
            socket,
            local_addr,
            punch_timeout: PUNCH_TIMEOUT,
            peer: None,
            peer_addr: None,
        })
    }

    /// Bound local address.
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.local_addr
    }

    /// Peer address the punch ended up using.
    pub fn peer_addr(&self) -> Option<SocketAddrV4> {
        self.peer_addr
    }

    /// Descriptor the rendezvous server handed us.
    pub fn peer(&self) -> Option<&PeerDescriptor> {
        self.peer.as_ref()
    }

    /// The underlying socket, connected to the peer after a successful
    /// [`connect`](Self::connect).
    pub fn as_socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Overrides the per-attempt receive window, 1ms by default.
    ///
    /// The default assumes both clients are released by the server at the
    /// same instant. Widen it when that does not hold, e.g. loopback tests
    /// at the mercy of the scheduler.
    pub fn set_punch_timeout(&mut self, timeout: Duration) {
        self.punch_timeout = timeout;
    }

    /// Registers with the rendezvous server and punches a path to the peer
    /// it pairs us with.
    ///
    /// Tries the peer's global address first; on timeout falls back to its
    /// local address, which only helps when both peers share a network.
    /// There is no third strategy.
    ///
    /// Returns the peer's pairing id. Convention for the payload phase:
    /// the side that sees id 1 transmits first.
    pub fn connect<A: ToSocketAddrs>(&mut self, server_addr: A) -> Result<u8> {
        let server_addr = server_addr
            .to_socket_addrs()?
            .find_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(v4),
                SocketAddr::V6(_) => None,
            })
            .ok_or(Error::Ipv4Only)?;

        self.register(server_addr)?;
        let peer = self.recv_descriptor()?;
        log::debug!(
            "peer {}: local {} global {}",
            peer.pairing_id,
            peer.local_addr,
            peer.global_addr
        );

        let addr = if self.punch_global(peer.global_addr)? {
            peer.global_addr
        } else if self.punch_local(peer.local_addr)? {
            peer.local_addr
        } else {
            return Err(Error::PeerUnreachable);
        };
        log::debug!("punched through to {}", addr);

        self.socket.set_read_timeout(Some(EXCHANGE_TIMEOUT))?;
        self.socket.connect(addr)?;
        self.peer = Some(peer);
        self.peer_addr = Some(addr);

        Ok(peer.pairing_id)
    }

    /// Ships one payload datagram to the punched peer.
    pub fn send(&self, buf: &[u8]) -> Result<()> {
        if buf.len() >= MAX_DATAGRAM {
            return Err(Error::OversizedMessage(buf.len()));
        }
        if self.peer_addr.is_none() {
            return Err(Error::NotConnected);
        }

        let n = self.socket.send(buf)?;
        if n != buf.len() {
            return Err(Error::BadLength {
                want: buf.len(),
                got: n,
            });
        }

        Ok(())
    }

    /// Receives one payload datagram; the peer must send exactly
    /// `buf.len()` bytes.
    pub fn recv(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() >= MAX_DATAGRAM {
            return Err(Error::OversizedMessage(buf.len()));
        }
        if self.peer_addr.is_none() {
            return Err(Error::NotConnected);
        }

        let n = self.socket.recv(buf)?;
        if n != buf.len() {
            return Err(Error::BadLength {
                want: buf.len(),
                got: n,
            });
        }

        Ok(())
    }

    fn register(&self, server_addr: SocketAddrV4) -> Result<()> {
        let buf = proto::encode_endpoint(&self.local_addr);
        let n = self.socket.send_to(&buf, server_addr)?;
        if n != buf.len() {
            return Err(Error::BadLength {
                want: buf.len(),
                got: n,
            });
        }

        Ok(())
    }

    /// Blocks until the server replies with the peer's descriptor. The
    /// server stays silent until the second client shows up, so no timeout
    /// here.
    fn recv_descriptor(&self) -> Result<PeerDescriptor> {
        self.socket.set_read_timeout(None)?;

        let mut buf = [0u8; 64];
        let n = self.socket.recv(&mut buf)?;
        if n != DESCRIPTOR_LEN {
            return Err(Error::BadLength {
                want: DESCRIPTOR_LEN,
                got: n,
            });
        }

        PeerDescriptor::decode(&buf[..n])
    }

    /// Three-way handshake against the peer's server-observed address.
    ///
    /// Both sides open simultaneously, so the first byte seen decides the
    /// rest. An opener means ours has not been seen yet: answer it and wait
    /// for the peer's ack. An ack means the peer already saw our opener and
    /// the path is known good in both directions; echo the ack and stop.
    /// Only one side waits for a final ack, the other's never comes.
    fn punch_global(&self, addr: SocketAddrV4) -> Result<bool> {
        self.send_marker(MARKER_OPEN, addr)?;

        match self.recv_marker(self.punch_timeout)? {
            Probe::TimedOut => Ok(false),
            Probe::Byte(MARKER_OPEN) => {
                self.send_marker(MARKER_ACK, addr)?;
                match self.recv_marker(EXCHANGE_TIMEOUT)? {
                    Probe::Byte(MARKER_ACK) => Ok(true),
                    Probe::Byte(other) => Err(Error::BadMarker(other)),
                    Probe::TimedOut => Err(Error::AckTimeout),
                }
            }
            Probe::Byte(MARKER_ACK) => {
                self.send_marker(MARKER_ACK, addr)?;
                Ok(true)
            }
            Probe::Byte(other) => Err(Error::BadMarker(other)),
        }
    }

    /// Single-exchange probe against the peer's self-reported address.
    ///
    /// On a shared network there is no mapping to open, so any reply at
    /// all proves the path and the full handshake is not worth its bytes.
    fn punch_local(&self, addr: SocketAddrV4) -> Result<bool> {
        self.send_marker(MARKER_OPEN, addr)?;

        match self.recv_marker(self.punch_timeout)? {
            Probe::TimedOut => Ok(false),
            Probe::Byte(_) => Ok(true),
        }
    }

    fn send_marker(&self, marker: u8, dst: SocketAddrV4) -> Result<()> {
        let n = self.socket.send_to(&[marker], dst)?;
        if n != 1 {
            return Err(Error::BadLength { want: 1, got: n });
        }

        Ok(())
    }

    /// Waits up to `timeout` for a one-byte marker.
    ///
    /// A timeout is data here, not a failure: it tells the punch state
    /// machine that this address candidate is not reachable yet.
    fn recv_marker(&self, timeout: Duration) -> Result<Probe> {
        self.socket.set_read_timeout(Some(timeout))?;

        let mut buf = [0u8; 1];
        match self.socket.recv(&mut buf) {
            Ok(1) => Ok(Probe::Byte(buf[0])),
            Ok(n) => Err(Error::BadLength { want: 1, got: n }),
            Err(e) if is_timeout(&e) => Ok(Probe::TimedOut),
            Err(e) => Err(e.into()),
        }
    }
}
