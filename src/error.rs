use std::io;
use std::io::ErrorKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal failures of the rendezvous and punch protocol.
///
/// A receive timeout during a punch attempt is deliberately absent: it is
/// the signal that drives the global-to-local fallback, not a failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("datagram of {got} bytes, expected {want}")]
    BadLength { want: usize, got: usize },

    #[error("unexpected punch marker {0:#04x}")]
    BadMarker(u8),

    #[error("message of {0} bytes exceeds the datagram limit")]
    OversizedMessage(usize),

    #[error("rendezvous round already has two clients")]
    RoundFull,

    #[error("only ipv4 endpoints are supported")]
    Ipv4Only,

    #[error("no peer connected yet")]
    NotConnected,

    #[error("peer unreachable on both its global and local address")]
    PeerUnreachable,

    #[error("peer never acknowledged the punch")]
    AckTimeout,

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// True for the error kinds a timed-out `recv` produces.
///
/// Unix reports an expired socket timeout as `WouldBlock`, Windows as
/// `TimedOut`.
pub(crate) fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
