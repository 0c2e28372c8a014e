use std::io;
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::ReadBuf;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::link::error::LinkError;
use crate::link_log::trace_bytes;
use crate::{link_debug, link_warn};

const READ_CHUNK: usize = 16 * 1024;
/// Upper bound of one `read()` so a chatty peer cannot starve the worker loop.
const MAX_READ: usize = 256 * 1024;
pub const PEEK_WINDOW: usize = 64 * 1024;

/// The socket of one established session.
///
/// All operations take `&self` so the worker (reading) and the owner
/// (writing) can share one endpoint behind an `Arc`. The file descriptor is
/// released when the last handle is dropped; `close` only fences off further
/// I/O.
#[derive(Debug)]
pub struct ConnectionEndpoint {
    stream: TcpStream,
    peer: SocketAddr,
    closed: AtomicBool,
}

impl ConnectionEndpoint {
    /// Opens an outbound connection, giving up after `timeout`.
    pub async fn connect_client(
        addr: SocketAddr,
        timeout: Duration,
        no_delay: bool,
    ) -> Result<Self, LinkError> {
        link_debug!("Connecting to {addr} (timeout {timeout:?})");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(LinkError::ConnectFailed(e)),
            Err(_) => return Err(LinkError::ConnectTimeout(timeout)),
        };

        Ok(Self::from_stream(stream, addr, no_delay))
    }

    /// Listens on `bind` with a backlog of one and waits up to `timeout` for
    /// a single peer. The listener is closed once the peer is accepted.
    pub async fn listen_and_accept(
        bind: SocketAddr,
        timeout: Duration,
        no_delay: bool,
    ) -> Result<Self, LinkError> {
        let listener = Self::listen(bind)?;
        link_debug!("Listening on {bind}, waiting {timeout:?} for a peer");

        match tokio::time::timeout(timeout, listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                link_debug!("Accepted connection from {peer}");
                Ok(Self::from_stream(stream, peer, no_delay))
            }
            Ok(Err(e)) => Err(LinkError::Accept(e)),
            Err(_) => Err(LinkError::AcceptTimeout(timeout)),
        }
    }

    fn listen(bind: SocketAddr) -> Result<TcpListener, LinkError> {
        let bind_err = |source: io::Error| LinkError::Bind { addr: bind, source };

        let socket = if bind.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_err)?;

        socket.set_reuseaddr(true).map_err(bind_err)?;
        socket.bind(bind).map_err(bind_err)?;
        socket.listen(1).map_err(bind_err)
    }

    fn from_stream(stream: TcpStream, peer: SocketAddr, no_delay: bool) -> Self {
        if let Err(e) = stream.set_nodelay(no_delay) {
            link_warn!("Failed to set TCP_NODELAY on {peer}: {e:?}");
        }
        Self {
            stream,
            peer,
            closed: AtomicBool::new(false),
        }
    }

    #[inline] pub fn peer_addr(&self) -> SocketAddr { self.peer }
    #[inline] pub fn is_closed(&self) -> bool { self.closed.load(Ordering::Acquire) }

    /// Waits until the socket is readable, has hit EOF, or has a pending error.
    pub async fn readable(&self) -> Result<(), LinkError> {
        self.stream.readable().await.map_err(LinkError::Io)
    }

    /// Reads whatever is buffered right now without waiting for more.
    ///
    /// `Ok(Some(empty))` means nothing was buffered, `Ok(None)` means the peer
    /// closed the stream.
    pub fn read(&self) -> Result<Option<Bytes>, LinkError> {
        if self.is_closed() {
            return Err(LinkError::NotConnected);
        }

        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        loop {
            if buf.len() >= MAX_READ {
                break;
            }
            if buf.len() == buf.capacity() {
                buf.reserve(READ_CHUNK);
            }

            match self.stream.try_read_buf(&mut buf) {
                Ok(0) if buf.is_empty() => return Ok(None),
                // EOF after data: hand out the data, the next read reports EOF.
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if buf.is_empty() => return Err(LinkError::Io(e)),
                Err(e) => {
                    link_warn!("Read error on {} after {} bytes: {e:?}", self.peer, buf.len());
                    break;
                }
            }
        }

        trace_bytes("Received", &self.peer.to_string(), &buf);
        Ok(Some(buf.freeze()))
    }

    /// Number of bytes that could be read right now. Never waits.
    ///
    /// Counts at most `PEEK_WINDOW` (64 KiB); a larger backlog reports the cap.
    pub fn bytes_available(&self) -> usize {
        if self.is_closed() {
            return 0;
        }

        let mut scratch = [MaybeUninit::<u8>::uninit(); PEEK_WINDOW];
        let mut buf = ReadBuf::uninit(&mut scratch);
        let mut cx = Context::from_waker(futures::task::noop_waker_ref());
        match self.stream.poll_peek(&mut cx, &mut buf) {
            Poll::Ready(Ok(n)) => n,
            Poll::Ready(Err(_)) | Poll::Pending => 0,
        }
    }

    /// Writes `data`, returning how much of it went out.
    ///
    /// Fails only if nothing could be written. A fault or timeout after some
    /// bytes were sent ends the write early and reports the partial count.
    pub async fn write(&self, data: &[u8], timeout: Duration) -> Result<usize, LinkError> {
        if self.is_closed() {
            return Err(LinkError::NotConnected);
        }

        let mut written = 0;
        while written < data.len() {
            match tokio::time::timeout(timeout, self.write_some(&data[written..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => written += n,
                Ok(Err(e)) if written == 0 => return Err(e),
                Ok(Err(e)) => {
                    link_warn!("Partial write to {}: {written}/{} bytes ({e})", self.peer, data.len());
                    break;
                }
                Err(_) if written == 0 => return Err(LinkError::WriteTimeout),
                Err(_) => {
                    link_warn!("Write to {} timed out after {written}/{} bytes", self.peer, data.len());
                    break;
                }
            }
        }

        trace_bytes("Sent", &self.peer.to_string(), &data[..written]);
        Ok(written)
    }

    async fn write_some(&self, data: &[u8]) -> Result<usize, LinkError> {
        loop {
            self.stream.writable().await?;
            match self.stream.try_write(data) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) => return Err(LinkError::Io(e)),
            }
        }
    }

    /// Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            link_debug!("Closing connection to {}", self.peer);
        }
    }
}
