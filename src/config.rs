use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 5760;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_RATE_BUFFER_SIZE: usize = 20;

/// Construction parameters of a TCP link.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkConfig {
    pub host: IpAddr,
    pub port: u16,
    pub as_server: bool,
    pub connect_timeout_ms: u64,
    pub accept_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub no_delay: bool,
    pub rate_buffer_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            as_server: false,
            connect_timeout_ms: DEFAULT_TIMEOUT_MS,
            accept_timeout_ms: DEFAULT_TIMEOUT_MS,
            write_timeout_ms: DEFAULT_TIMEOUT_MS,
            no_delay: true,
            rate_buffer_size: DEFAULT_RATE_BUFFER_SIZE,
        }
    }
}

impl LinkConfig {
    pub fn new(host: IpAddr, port: u16, as_server: bool) -> Self {
        Self { host, port, as_server, ..Self::default() }
    }

    pub fn client(host: IpAddr, port: u16) -> Self {
        Self::new(host, port, false)
    }

    pub fn server(port: u16) -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port, true)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = millis(timeout);
        self
    }

    pub fn with_accept_timeout(mut self, timeout: Duration) -> Self {
        self.accept_timeout_ms = millis(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout_ms = millis(timeout);
        self
    }

    pub fn with_no_delay(mut self, no_delay: bool) -> Self {
        self.no_delay = no_delay;
        self
    }

    pub fn with_rate_buffer_size(mut self, size: usize) -> Self {
        self.rate_buffer_size = size;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Address a client connects to.
    pub fn remote_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Address a server listens on: any interface of the host's family.
    pub fn bind_addr(&self) -> SocketAddr {
        let any = match self.host {
            IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        SocketAddr::new(any, self.port)
    }

    /// Display name, e.g. `TCP Server (host:127.0.0.1 port:5760)`.
    pub fn display_name(&self) -> String {
        let mode = if self.as_server { "Server" } else { "Link" };
        format!("TCP {mode} (host:{} port:{})", self.host, self.port)
    }
}

/// Milliseconds of `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
