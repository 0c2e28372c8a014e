use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::sync::mpsc::Sender;

use crate::config::LinkConfig;
use crate::identity::{LinkId, LinkIdAllocator};
use crate::link::error::LinkError;
use crate::link::rate::RateSample;
use crate::link::worker::{LinkShared, LinkState, LinkWorker, WorkerContext};
use crate::message::{EventSink, LinkEvent};
use crate::{link_debug, link_info, link_warn};

/// Nominal speed reported for every TCP link: 54 Mbit/s.
pub const NOMINAL_CONNECTION_SPEED: u64 = 54_000_000;

/// A bidirectional TCP byte stream, either dialling out (client) or
/// accepting exactly one peer (server).
///
/// Network I/O runs on a background task per link; the owner learns about
/// connects, disconnects, received bytes and faults through the event channel
/// passed to [`TcpLink::new`].
pub struct TcpLink {
    id: LinkId,
    name: String,
    config: LinkConfig,
    shared: Arc<LinkShared>,
    events: EventSink,
    worker: Option<LinkWorker>,
}

impl TcpLink {
    pub fn new(config: LinkConfig, ids: &LinkIdAllocator, events: Sender<LinkEvent>) -> Self {
        let id = ids.next_id();
        let name = config.display_name();
        link_debug!("TCP link {id} created: {name}");

        Self {
            id,
            name,
            shared: Arc::new(LinkShared::new(config.rate_buffer_size)),
            config,
            events: EventSink::new(events),
            worker: None,
        }
    }

    #[inline] pub fn id(&self) -> LinkId             { self.id }
    #[inline] pub fn name(&self) -> &str             { &self.name }
    #[inline] pub fn config(&self) -> &LinkConfig    { &self.config }
    #[inline] pub fn host_address(&self) -> IpAddr   { self.config.host }
    #[inline] pub fn port(&self) -> u16              { self.config.port }
    #[inline] pub fn is_server(&self) -> bool        { self.config.as_server }
    #[inline] pub fn state(&self) -> LinkState       { self.shared.state() }

    /// Cached flag maintained by the worker; does not probe the socket.
    pub fn is_connected(&self) -> bool {
        self.shared.state() == LinkState::Connected
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared.endpoint().map(|e| e.peer_addr())
    }

    /// Connects (client) or waits for a peer (server).
    ///
    /// A running worker is stopped first, so a link never has two attempts in
    /// flight. Returns once the handshake has succeeded or failed; the read
    /// loop only starts on success.
    pub async fn connect(&mut self) -> bool {
        if let Some(worker) = self.worker.take() {
            if worker.is_running() {
                link_debug!("{}: restarting running worker", self.name);
            }
            worker.stop().await;
        }

        let (worker, reply) = LinkWorker::start(WorkerContext {
            link_id: self.id,
            name: self.name.clone(),
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
        });

        match reply.await {
            Ok(Ok(())) => {
                self.worker = Some(worker);
                true
            }
            Ok(Err(e)) => {
                link_debug!("{}: connect failed: {e}", self.name);
                worker.join().await;
                false
            }
            Err(_) => {
                link_warn!("{}: worker ended without reporting its handshake", self.name);
                worker.join().await;
                false
            }
        }
    }

    /// Stops the worker and releases the socket. Always succeeds and is safe
    /// to call when nothing is connected.
    pub async fn disconnect(&mut self) -> bool {
        if let Some(worker) = self.worker.take() {
            worker.stop().await;
        }
        self.shared.release_endpoint();
        true
    }

    /// Writes straight to the socket and logs an outbound rate sample.
    ///
    /// Returns the number of bytes sent, which can fall short of `data.len()`
    /// if the connection fails mid-write. A socket fault is also reported as
    /// [`LinkEvent::CommunicationError`].
    pub async fn write_bytes(&self, data: &[u8]) -> Result<usize, LinkError> {
        let endpoint = self.shared.endpoint().ok_or(LinkError::NotConnected)?;
        match endpoint.write(data, self.config.write_timeout()).await {
            Ok(written) => {
                self.shared.record_outbound(written);
                Ok(written)
            }
            Err(LinkError::NotConnected) => Err(LinkError::NotConnected),
            Err(e) => {
                link_warn!("{}: write failed: {e}", self.name);
                self.events.try_emit(LinkEvent::CommunicationError {
                    link_name: self.name.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    pub fn bytes_available(&self) -> usize {
        self.shared.endpoint().map_or(0, |e| e.bytes_available())
    }

    pub async fn set_host_address(&mut self, host: IpAddr) {
        self.reconfigure(|cfg| cfg.host = host).await;
    }

    pub async fn set_host_address_str(&mut self, host: &str) -> Result<(), LinkError> {
        let host: IpAddr = host
            .trim()
            .parse()
            .map_err(|_| LinkError::InvalidAddress(host.to_string()))?;
        self.set_host_address(host).await;
        Ok(())
    }

    pub async fn set_port(&mut self, port: u16) {
        self.reconfigure(|cfg| cfg.port = port).await;
    }

    pub async fn set_as_server(&mut self, as_server: bool) {
        if self.config.as_server == as_server {
            return;
        }
        self.reconfigure(|cfg| cfg.as_server = as_server).await;
    }

    /// Applies a configuration change, cycling the connection if it is up.
    async fn reconfigure(&mut self, apply: impl FnOnce(&mut LinkConfig)) {
        let reconnect = self.is_connected();
        if reconnect {
            self.disconnect().await;
        }

        apply(&mut self.config);
        self.reset_name();

        if reconnect && !self.connect().await {
            link_info!("{}: reconnect after reconfiguration failed", self.name);
        }
    }

    fn reset_name(&mut self) {
        self.name = self.config.display_name();
        // Never wait on our own owner's channel.
        self.events.try_emit(LinkEvent::NameChanged {
            link_id: self.id,
            name: self.name.clone(),
        });
    }

    pub fn connection_speed(&self) -> u64 {
        NOMINAL_CONNECTION_SPEED
    }

    // Live rates are not computed yet; the sample rings are kept for that.
    pub fn current_in_data_rate(&self) -> u64 {
        0
    }

    pub fn current_out_data_rate(&self) -> u64 {
        0
    }

    pub fn inbound_samples(&self) -> Vec<RateSample> {
        self.shared.rates().inbound()
    }

    pub fn outbound_samples(&self) -> Vec<RateSample> {
        self.shared.rates().outbound()
    }
}
