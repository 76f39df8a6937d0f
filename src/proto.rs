//! Fixed-layout wire records.
//!
//! Everything on the wire is either a raw endpoint (registration), a peer
//! descriptor (the server's reply) or a one-byte punch marker. Integers are
//! network byte order, addresses are IPv4 only, no padding anywhere, so
//! both ends agree on the layout byte for byte.

use crate::{Error, Result};
use std::net::{Ipv4Addr, SocketAddrV4};

/// Registration record: 4-byte IPv4 address followed by a 2-byte port.
pub const ENDPOINT_LEN: usize = 6;

/// Descriptor record: local endpoint, global endpoint, pairing id byte.
pub const DESCRIPTOR_LEN: usize = 2 * ENDPOINT_LEN + 1;

/// Largest payload datagram the exchange phase accepts.
pub const MAX_DATAGRAM: usize = 508;

/// Opens a punch attempt.
pub const MARKER_OPEN: u8 = b'1';

/// Acknowledges that the peer's opener arrived.
pub const MARKER_ACK: u8 = b'2';

pub fn encode_endpoint(addr: &SocketAddrV4) -> [u8; ENDPOINT_LEN] {
    let mut buf = [0u8; ENDPOINT_LEN];
    buf[..4].copy_from_slice(&addr.ip().octets());
    buf[4..].copy_from_slice(&addr.port().to_be_bytes());
    buf
}

pub fn decode_endpoint(buf: &[u8]) -> Result<SocketAddrV4> {
    if buf.len() != ENDPOINT_LEN {
        return Err(Error::BadLength {
            want: ENDPOINT_LEN,
            got: buf.len(),
        });
    }

    let ip = Ipv4Addr::new(buf[0], buf[1], buf[2], buf[3]);
    let port = u16::from_be_bytes([buf[4], buf[5]]);
    Ok(SocketAddrV4::new(ip, port))
}

/// Everything one peer gets told about the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerDescriptor {
    /// Bound address the client reported about itself. Only routable when
    /// both peers share a network.
    pub local_addr: SocketAddrV4,
    /// Source address of the registration as the server observed it,
    /// i.e. after NAT translation.
    pub global_addr: SocketAddrV4,
    /// 0 for the first client of the round, 1 for the second.
    pub pairing_id: u8,
}

impl PeerDescriptor {
    pub fn encode(&self) -> [u8; DESCRIPTOR_LEN] {
        let mut buf = [0u8; DESCRIPTOR_LEN];
        buf[..ENDPOINT_LEN].copy_from_slice(&encode_endpoint(&self.local_addr));
        buf[ENDPOINT_LEN..2 * ENDPOINT_LEN].copy_from_slice(&encode_endpoint(&self.global_addr));
        buf[DESCRIPTOR_LEN - 1] = self.pairing_id;
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != DESCRIPTOR_LEN {
            return Err(Error::BadLength {
                want: DESCRIPTOR_LEN,
                got: buf.len(),
            });
        }

        Ok(Self {
            local_addr: decode_endpoint(&buf[..ENDPOINT_LEN])?,
            global_addr: decode_endpoint(&buf[ENDPOINT_LEN..2 * ENDPOINT_LEN])?,
            pairing_id: buf[DESCRIPTOR_LEN - 1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_roundtrip() {
        let addr: SocketAddrV4 = "192.168.7.21:3478".parse().unwrap();
        let buf = encode_endpoint(&addr);
        assert_eq!(buf, [192, 168, 7, 21, 0x0d, 0x96]);
        assert_eq!(decode_endpoint(&buf).unwrap(), addr);
    }

    #[test]
    fn descriptor_roundtrip() {
        let desc = PeerDescriptor {
            local_addr: "10.0.0.3:40000".parse().unwrap(),
            global_addr: "198.51.100.8:61234".parse().unwrap(),
            pairing_id: 1,
        };
        let buf = desc.encode();
        assert_eq!(buf.len(), DESCRIPTOR_LEN);
        assert_eq!(PeerDescriptor::decode(&buf).unwrap(), desc);
    }

    #[test]
    fn truncated_records_are_rejected() {
        assert!(matches!(
            decode_endpoint(&[1, 2, 3]),
            Err(Error::BadLength { want: ENDPOINT_LEN, got: 3 })
        ));
        assert!(matches!(
            PeerDescriptor::decode(&[0u8; DESCRIPTOR_LEN - 1]),
            Err(Error::BadLength { .. })
        ));
    }
}
