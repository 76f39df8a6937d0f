use log;
use std::net::{SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket};

use crate::proto::{self, PeerDescriptor, ENDPOINT_LEN};
use crate::{Error, Result};

/// One pairing of two clients, filled in arrival order.
#[derive(Default)]
struct Round {
    peers: [Option<PeerDescriptor>; 2],
}

impl Round {
    fn registered(&self) -> usize {
        self.peers.iter().filter(|p| p.is_some()).count()
    }

    fn register(
        &mut self,
        local_addr: SocketAddrV4,
        global_addr: SocketAddrV4,
    ) -> Result<PeerDescriptor> {
        let slot = self.registered();
        if slot == self.peers.len() {
            return Err(Error::RoundFull);
        }

        let desc = PeerDescriptor {
            local_addr,
            global_addr,
            pairing_id: slot as u8,
        };
        self.peers[slot] = Some(desc);
        Ok(desc)
    }

    fn pair(&self) -> Option<(PeerDescriptor, PeerDescriptor)> {
        match (self.peers[0], self.peers[1]) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }
}

/// Udp rendezvous server.
///
/// Collects registrations from exactly two clients, then tells each one the
/// other's observed and self-reported address together with a pairing id.
/// It never relays payload traffic; one round and it is done.
pub struct Server {
    socket: UdpSocket,
    round: Round,
}

impl Server {
    pub fn new<A: ToSocketAddrs>(listen_addr: A) -> Result<Self> {
        let socket = UdpSocket::bind(listen_addr)?;
        log::info!("listening on {}", socket.local_addr()?);

        Ok(Self {
            socket,
            round: Round::default(),
        })
    }

    /// Address the socket ended up bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocks for one registration datagram and records the sender.
    ///
    /// The payload carries the client's self-reported bound address; the
    /// global address is taken from the datagram's source, which the sender
    /// cannot forge the way a payload field could be.
    pub fn listen(&mut self) -> Result<()> {
        let mut buf = [0u8; 64];
        let (n, src) = self.socket.recv_from(&mut buf)?;
        if n != ENDPOINT_LEN {
            return Err(Error::BadLength {
                want: ENDPOINT_LEN,
                got: n,
            });
        }

        let local_addr = proto::decode_endpoint(&buf[..n])?;
        let global_addr = match src {
            SocketAddr::V4(addr) => addr,
            SocketAddr::V6(_) => return Err(Error::Ipv4Only),
        };

        let desc = self.round.register(local_addr, global_addr)?;
        log::debug!(
            "client {} registered, local {} global {}",
            desc.pairing_id,
            desc.local_addr,
            desc.global_addr
        );

        Ok(())
    }

    /// Sends each client the other's descriptor once both have registered.
    ///
    /// Returns `false` without touching the socket while the round is short
    /// of two clients. Descriptors go to the observed global addresses, the
    /// only ones guaranteed reachable from here.
    pub fn rendezvous(&self) -> Result<bool> {
        let (a, b) = match self.round.pair() {
            Some(pair) => pair,
            None => return Ok(false),
        };

        self.send_descriptor(&b, a.global_addr)?;
        self.send_descriptor(&a, b.global_addr)?;
        log::debug!("paired {} <-> {}", a.global_addr, b.global_addr);

        Ok(true)
    }

    /// Runs a single round to completion.
    pub fn run(mut self) -> Result<()> {
        while !self.rendezvous()? {
            self.listen()?;
        }

        Ok(())
    }

    fn send_descriptor(&self, desc: &PeerDescriptor, dst: SocketAddrV4) -> Result<()> {
        let buf = desc.encode();
        let n = self.socket.send_to(&buf, dst)?;
        if n != buf.len() {
            return Err(Error::BadLength {
                want: buf.len(),
                got: n,
            });
        }

        Ok(())
    }
}
