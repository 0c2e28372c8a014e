use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::config::LinkConfig;
use crate::identity::LinkId;
use crate::link::endpoint::ConnectionEndpoint;
use crate::link::error::{ErrorCategory, LinkError};
use crate::link::lock;
use crate::link::rate::RateTracker;
use crate::message::{EventSink, LinkEvent};
use crate::{link_debug, link_error, link_info, link_warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl LinkState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => LinkState::Connecting,
            2 => LinkState::Connected,
            _ => LinkState::Disconnected,
        }
    }
}

/// State a link shares with its worker task.
#[derive(Debug)]
pub(crate) struct LinkShared {
    /// Present exactly while the link is `Connected`.
    endpoint: Mutex<Option<Arc<ConnectionEndpoint>>>,
    state: AtomicU8,
    /// Written by `write_bytes` and by the read loop.
    rates: Mutex<RateTracker>,
}

impl LinkShared {
    pub fn new(rate_buffer_size: usize) -> Self {
        Self {
            endpoint: Mutex::new(None),
            state: AtomicU8::new(LinkState::Disconnected as u8),
            rates: Mutex::new(RateTracker::new(rate_buffer_size)),
        }
    }

    pub fn state(&self) -> LinkState {
        LinkState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LinkState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn endpoint(&self) -> Option<Arc<ConnectionEndpoint>> {
        lock(&self.endpoint).clone()
    }

    /// Drops the link's handle on the socket. Safe when there is none.
    pub fn release_endpoint(&self) {
        let taken = lock(&self.endpoint).take();
        if let Some(endpoint) = taken {
            endpoint.close();
        }
    }

    pub fn rates(&self) -> RateTracker {
        lock(&self.rates).clone()
    }

    pub fn record_inbound(&self, bytes: usize) {
        lock(&self.rates).record_inbound(bytes);
    }

    pub fn record_outbound(&self, bytes: usize) {
        lock(&self.rates).record_outbound(bytes);
    }
}

/// Everything the worker task needs, captured when it starts.
pub(crate) struct WorkerContext {
    pub link_id: LinkId,
    pub name: String,
    pub config: LinkConfig,
    pub shared: Arc<LinkShared>,
    pub events: EventSink,
}

enum Closing {
    Requested,
    PeerClosed,
    Fault(LinkError),
}

/// Handle on the background task that owns one connection attempt and, if
/// it succeeds, the session's read loop.
pub(crate) struct LinkWorker {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

pub(crate) type HandshakeReply = oneshot::Receiver<Result<(), LinkError>>;

impl LinkWorker {
    /// Spawns the worker. The returned receiver resolves once the handshake
    /// has succeeded or failed.
    pub fn start(ctx: WorkerContext) -> (Self, HandshakeReply) {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        ctx.shared.set_state(LinkState::Connecting);
        let handle = tokio::spawn(run(ctx, stop_rx, ready_tx));

        let worker = Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        };
        (worker, ready_rx)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Asks the task to finish and waits until it has.
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        self.join().await;
    }

    /// Waits for the task to finish on its own.
    pub async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                link_error!("Link worker terminated abnormally: {e}");
            }
        }
    }
}

impl Drop for LinkWorker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

async fn handshake(config: &LinkConfig) -> Result<ConnectionEndpoint, LinkError> {
    if config.as_server {
        ConnectionEndpoint::listen_and_accept(
            config.bind_addr(),
            config.accept_timeout(),
            config.no_delay,
        )
        .await
    } else {
        ConnectionEndpoint::connect_client(
            config.remote_addr(),
            config.connect_timeout(),
            config.no_delay,
        )
        .await
    }
}

/// Stop request from the owning link. Stays set once observed.
struct StopSignal {
    rx: oneshot::Receiver<()>,
    requested: bool,
}

impl StopSignal {
    /// Resolves once a stop was requested or the link handle was dropped.
    async fn requested(&mut self) {
        if !self.requested {
            let _ = (&mut self.rx).await;
            self.requested = true;
        }
    }
}

/// Waits for room in the owner's channel, but never past a stop request:
/// after that the event is only delivered if there is room right now.
async fn deliver(events: &EventSink, stop: &mut StopSignal, event: LinkEvent) {
    let permit = tokio::select! {
        biased;
        _ = stop.requested() => None,
        permit = events.reserve() => permit,
    };
    match permit {
        Some(permit) => permit.send(event),
        None => events.try_emit(event),
    }
}

async fn run(
    ctx: WorkerContext,
    stop_rx: oneshot::Receiver<()>,
    ready_tx: oneshot::Sender<Result<(), LinkError>>,
) {
    let WorkerContext { link_id, name, config, shared, events } = ctx;
    let mut stop = StopSignal { rx: stop_rx, requested: false };

    /* ---------------- Handshake ---------------------------------------- */
    let outcome = tokio::select! {
        res = handshake(&config) => res,
        _ = stop.requested() => Err(LinkError::Cancelled),
    };

    let endpoint = match outcome {
        Ok(endpoint) => Arc::new(endpoint),
        Err(e) => {
            link_warn!("{name}: handshake failed: {e}");
            // The owner is parked on the reply, not on its event channel.
            if !matches!(e, LinkError::Cancelled) {
                events.try_emit(LinkEvent::CommunicationError {
                    link_name: name.clone(),
                    reason: e.to_string(),
                });
            }
            shared.set_state(LinkState::Disconnected);
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    *lock(&shared.endpoint) = Some(Arc::clone(&endpoint));
    shared.set_state(LinkState::Connected);
    link_info!("{name}: connected to {}", endpoint.peer_addr());

    let _ = ready_tx.send(Ok(()));
    deliver(&events, &mut stop, LinkEvent::connected(link_id)).await;

    /* ---------------- Read loop ---------------------------------------- */
    let closing = loop {
        tokio::select! {
            biased;

            _ = stop.requested() => break Closing::Requested,

            ready = endpoint.readable() => {
                if let Err(e) = ready {
                    break Closing::Fault(e);
                }
                match endpoint.read() {
                    Ok(Some(data)) if data.is_empty() => continue,
                    Ok(Some(data)) => {
                        shared.record_inbound(data.len());
                        deliver(&events, &mut stop, LinkEvent::BytesReceived { link_id, data }).await;
                    }
                    Ok(None) => break Closing::PeerClosed,
                    Err(e) if e.category() == ErrorCategory::PeerClosed => break Closing::PeerClosed,
                    Err(e) => break Closing::Fault(e),
                }
            }
        }
    };

    /* ---------------- Teardown ----------------------------------------- */
    match closing {
        Closing::Requested => link_debug!("{name}: disconnect requested"),
        Closing::PeerClosed => link_info!("{name}: disconnected by peer"),
        Closing::Fault(e) => {
            link_warn!("{name}: {e}");
            let event = LinkEvent::CommunicationError {
                link_name: name.clone(),
                reason: e.to_string(),
            };
            deliver(&events, &mut stop, event).await;
        }
    }

    shared.set_state(LinkState::Disconnected);
    shared.release_endpoint();
    endpoint.close();
    drop(endpoint);

    deliver(&events, &mut stop, LinkEvent::disconnected(link_id)).await;
    link_debug!("{name}: worker finished");
}
