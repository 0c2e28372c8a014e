//! src/link/error.rs

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Where a failure sits in the lifecycle of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connect, bind, listen or accept failed. `connect()` reports `false`.
    Setup,
    /// Fault on an established session. The session is torn down.
    Transient,
    /// Peer closed the stream. A normal end of session.
    PeerClosed,
}

/// Everything that can go wrong on a link.
#[derive(Debug, Error)]
pub enum LinkError {
    /* ───────────── Handshake ───────────── */
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Connection failed: {0}")]
    ConnectFailed(io::Error),

    #[error("Could not listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("No peer connected within {0:?}")]
    AcceptTimeout(Duration),

    #[error("Accepting peer failed: {0}")]
    Accept(io::Error),

    #[error("Handshake cancelled")]
    Cancelled,

    /* ───────────── Session ───────────── */
    #[error("Error on socket: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Link is not connected")]
    NotConnected,

    #[error("Timeout writing to socket")]
    WriteTimeout,

    /* ───────────── Configuration ───────────── */
    #[error("Invalid host address: {0}")]
    InvalidAddress(String),
}

impl LinkError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LinkError::ConnectTimeout(_)
            | LinkError::ConnectFailed(_)
            | LinkError::Bind { .. }
            | LinkError::AcceptTimeout(_)
            | LinkError::Accept(_)
            | LinkError::Cancelled
            | LinkError::InvalidAddress(_) => ErrorCategory::Setup,
            LinkError::ConnectionClosed => ErrorCategory::PeerClosed,
            LinkError::Io(e) if is_peer_close(e) => ErrorCategory::PeerClosed,
            LinkError::Io(_) | LinkError::NotConnected | LinkError::WriteTimeout => {
                ErrorCategory::Transient
            }
        }
    }
}

fn is_peer_close(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::UnexpectedEof)
}
