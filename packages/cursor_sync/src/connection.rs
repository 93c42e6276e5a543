//! Connection lifecycle and state reconciliation.
//!
//! One tokio task owns the WebSocket, the [`SessionStore`] and the connection
//! state; everything else talks to it through a [`CursorClient`] handle. All
//! inbound frames, local position samples and manual commands are arms of a
//! single select loop, so store mutations happen in transport-delivery order
//! with no locking.

use std::collections::HashMap;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::ClientError;
use crate::protocol::{self, PeerSession, WireMessage};
use crate::pulse::ActivityPulse;
use crate::store::SessionStore;
use crate::throttle::OutboundThrottle;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle state of the broker connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Read-only snapshot of everything a consumer (renderer, CLI) needs,
/// republished after every mutation.
#[derive(Debug, Clone)]
pub struct SyncView {
    /// Clone of the current peer map. Includes the local client's own echo
    /// if the broker reflects it; filtering that out is the consumer's job.
    pub peers: HashMap<String, PeerSession>,
    pub state: ConnState,
    /// A frame arrived within the pulse window.
    pub inbound_active: bool,
    /// A frame was sent within the pulse window.
    pub outbound_active: bool,
    /// Kind of the most recent inbound frame.
    pub last_inbound: Option<String>,
    /// Kind of the most recent outbound frame.
    pub last_outbound: Option<String>,
}

impl SyncView {
    fn initial() -> Self {
        Self {
            peers: HashMap::new(),
            state: ConnState::Connecting,
            inbound_active: false,
            outbound_active: false,
            last_inbound: None,
            last_outbound: None,
        }
    }
}

/// Commands delivered to the connection actor.
#[derive(Debug)]
enum ClientCommand {
    /// A local pointer sample; throttled before it becomes a `move` frame.
    Sample { x: f64, y: f64 },
    /// Free-form `message` frame, passed through uninterpreted.
    Chat { data: String },
    Close,
    Reconnect,
}

/// Handle to a running connection actor.
///
/// Cloneable; dropping every clone shuts the connection down.
#[derive(Clone)]
pub struct CursorClient {
    cmd_tx: mpsc::Sender<ClientCommand>,
    view_rx: watch::Receiver<SyncView>,
    state_tx: broadcast::Sender<ConnState>,
}

impl CursorClient {
    /// Spawn the connection actor and start connecting. Must be called from
    /// within a tokio runtime.
    pub fn spawn(config: SyncConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (view_tx, view_rx) = watch::channel(SyncView::initial());
        let (state_tx, _) = broadcast::channel(32);
        let actor = ConnectionActor::new(config, cmd_rx, view_tx, state_tx.clone());
        tokio::spawn(actor.run());
        Self {
            cmd_tx,
            view_rx,
            state_tx,
        }
    }

    /// Watch the live view. The receiver always holds the latest snapshot.
    pub fn view(&self) -> watch::Receiver<SyncView> {
        self.view_rx.clone()
    }

    /// The latest snapshot, cloned out.
    pub fn current_view(&self) -> SyncView {
        self.view_rx.borrow().clone()
    }

    /// Subscribe to lifecycle transitions. Unlike [`view`](Self::view) this
    /// buffers, so short-lived intermediate states are observable.
    pub fn state_events(&self) -> broadcast::Receiver<ConnState> {
        self.state_tx.subscribe()
    }

    /// Feed one local position sample. Subject to the outbound throttle;
    /// dropped silently while the connection is not open.
    pub async fn send_position(&self, x: f64, y: f64) -> Result<(), ClientError> {
        self.send_command(ClientCommand::Sample { x, y }).await
    }

    /// Send a free-form `message` frame. Dropped silently while not open.
    pub async fn send_chat(&self, data: impl Into<String>) -> Result<(), ClientError> {
        self.send_command(ClientCommand::Chat { data: data.into() })
            .await
    }

    /// Close the connection. The peer map is cleared on reaching `Closed`.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.send_command(ClientCommand::Close).await
    }

    /// Tear down any current connection and dial a fresh one. When the
    /// connection was open or connecting, a grace delay separates close from
    /// redial so the broker can finish tearing down the old session; when
    /// already closed, the redial is immediate.
    ///
    /// This is also the resilience primitive after an unexpected drop: the
    /// core never redials on its own, callers layer their own retry policy
    /// (with backoff) on top of this.
    pub async fn reconnect(&self) -> Result<(), ClientError> {
        self.send_command(ClientCommand::Reconnect).await
    }

    async fn send_command(&self, cmd: ClientCommand) -> Result<(), ClientError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| ClientError::ActorGone)
    }
}

struct ConnectionActor {
    config: SyncConfig,
    store: SessionStore,
    state: ConnState,
    throttle: OutboundThrottle,
    pulse_in: ActivityPulse,
    pulse_out: ActivityPulse,
    last_inbound: Option<String>,
    last_outbound: Option<String>,
    cmd_rx: mpsc::Receiver<ClientCommand>,
    view_tx: watch::Sender<SyncView>,
    state_tx: broadcast::Sender<ConnState>,
}

impl ConnectionActor {
    fn new(
        config: SyncConfig,
        cmd_rx: mpsc::Receiver<ClientCommand>,
        view_tx: watch::Sender<SyncView>,
        state_tx: broadcast::Sender<ConnState>,
    ) -> Self {
        let throttle = OutboundThrottle::new(config.send_interval());
        let pulse_in = ActivityPulse::new(config.pulse_duration());
        let pulse_out = ActivityPulse::new(config.pulse_duration());
        Self {
            config,
            store: SessionStore::new(),
            state: ConnState::Connecting,
            throttle,
            pulse_in,
            pulse_out,
            last_inbound: None,
            last_outbound: None,
            cmd_rx,
            view_tx,
            state_tx,
        }
    }

    async fn run(mut self) {
        let mut socket = self.open_connection().await;

        loop {
            let pulse_expiry = self.next_pulse_expiry();
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(ClientCommand::Sample { x, y }) => {
                        self.handle_sample(&mut socket, x, y).await;
                    }
                    Some(ClientCommand::Chat { data }) => {
                        self.handle_send(&mut socket, WireMessage::Message { data }).await;
                    }
                    Some(ClientCommand::Close) => {
                        self.close_connection(&mut socket).await;
                    }
                    Some(ClientCommand::Reconnect) => {
                        let grace = if self.state == ConnState::Closed {
                            Duration::ZERO
                        } else {
                            self.config.reconnect_grace()
                        };
                        self.close_connection(&mut socket).await;
                        if !grace.is_zero() {
                            tokio::time::sleep(grace).await;
                        }
                        socket = self.open_connection().await;
                    }
                    None => {
                        // every handle dropped
                        self.close_connection(&mut socket).await;
                        break;
                    }
                },

                frame = next_frame(&mut socket) => match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        self.handle_frame(text.as_str());
                    }
                    Some(Ok(tungstenite::Message::Close(_))) | None => {
                        info!("broker closed the connection");
                        socket = None;
                        self.enter_closed();
                    }
                    Some(Err(err)) => {
                        warn!("transport error: {err}");
                        socket = None;
                        self.enter_closed();
                    }
                    Some(Ok(_)) => {} // ping/pong/binary frames carry no protocol messages
                },

                _ = async {
                    match pulse_expiry {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending().await,
                    }
                } => {
                    // a pulse decayed; let watchers see the flag drop
                    self.publish();
                }
            }
        }

        debug!("connection actor exited");
    }

    /// Dial the broker. On success the state walks `Connecting` → `Open` and
    /// the client introduces itself with `get-cursors`: it has no prior
    /// state, so it must request a full snapshot rather than wait for
    /// incremental joins it already missed.
    async fn open_connection(&mut self) -> Option<WsStream> {
        self.set_state(ConnState::Connecting);
        self.publish();
        let url = self.config.ws_url();
        info!(%url, "connecting to cursor broker");
        match connect_async(&url).await {
            Ok((mut ws, _)) => {
                self.throttle = OutboundThrottle::new(self.config.send_interval());
                self.set_state(ConnState::Open);
                self.publish();
                self.send_frame(&mut ws, &WireMessage::GetCursors).await;
                Some(ws)
            }
            Err(err) => {
                warn!("connection attempt failed: {err}");
                self.enter_closed();
                None
            }
        }
    }

    /// Manual close: `Closing` while the close handshake runs, then
    /// `Closed`. Idempotent when already closed.
    async fn close_connection(&mut self, socket: &mut Option<WsStream>) {
        if let Some(mut ws) = socket.take() {
            self.set_state(ConnState::Closing);
            self.publish();
            if let Err(err) = ws.close(None).await {
                debug!("close handshake failed: {err}");
            }
        }
        if self.state != ConnState::Closed {
            self.enter_closed();
        }
    }

    /// Reached on manual close, unexpected close, transport error and failed
    /// dial alike. No peers are known while disconnected, and pending pulse
    /// timers die with the connection.
    fn enter_closed(&mut self) {
        self.set_state(ConnState::Closed);
        self.store.clear();
        self.pulse_in.reset();
        self.pulse_out.reset();
        self.publish();
    }

    /// Throttle gate and state check happen here in one actor turn: nothing
    /// can suspend between the check and the send starting.
    async fn handle_sample(&mut self, socket: &mut Option<WsStream>, x: f64, y: f64) {
        if self.state != ConnState::Open {
            return;
        }
        if !self.throttle.ready(Instant::now()) {
            return;
        }
        let msg = WireMessage::Move {
            id: self.config.client_id.clone(),
            x,
            y,
        };
        self.handle_send(socket, msg).await;
    }

    /// Send one frame if open; otherwise drop it silently. "Not open" is an
    /// expected transient condition, not an error.
    async fn handle_send(&mut self, socket: &mut Option<WsStream>, msg: WireMessage) {
        if self.state != ConnState::Open {
            debug!(kind = msg.kind(), "dropping send while not open");
            return;
        }
        let Some(ws) = socket.as_mut() else {
            return;
        };
        self.send_frame(ws, &msg).await;
    }

    async fn send_frame(&mut self, ws: &mut WsStream, msg: &WireMessage) {
        let text = match protocol::encode(msg) {
            Ok(text) => text,
            Err(err) => {
                warn!("failed to encode {}: {err}", msg.kind());
                return;
            }
        };
        debug!(kind = msg.kind(), "outbound frame");
        match ws.send(tungstenite::Message::Text(text.into())).await {
            Ok(()) => {
                self.pulse_out.mark(Instant::now());
                self.last_outbound = Some(msg.kind().to_string());
                self.publish();
            }
            Err(err) => {
                // the read side of the loop will observe the closure
                warn!("send failed: {err}");
            }
        }
    }

    /// Decode and apply one inbound frame. A malformed frame is logged and
    /// dropped before any store mutation; it never tears the connection down.
    fn handle_frame(&mut self, text: &str) {
        if self.state != ConnState::Open {
            return;
        }
        match protocol::decode(text) {
            Ok(msg) => {
                debug!(kind = msg.kind(), "inbound frame");
                self.pulse_in.mark(Instant::now());
                self.last_inbound = Some(msg.kind().to_string());
                self.store.apply(msg);
                self.publish();
            }
            Err(err) => {
                warn!("dropping malformed frame: {err}");
            }
        }
    }

    fn set_state(&mut self, state: ConnState) {
        if self.state != state {
            debug!(?state, "connection state");
            self.state = state;
            let _ = self.state_tx.send(state);
        }
    }

    fn next_pulse_expiry(&self) -> Option<Instant> {
        let now = Instant::now();
        match (self.pulse_in.expires_at(now), self.pulse_out.expires_at(now)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    fn publish(&self) {
        let now = Instant::now();
        let _ = self.view_tx.send(SyncView {
            peers: self.store.snapshot(),
            state: self.state,
            inbound_active: self.pulse_in.is_active(now),
            outbound_active: self.pulse_out.is_active(now),
            last_inbound: self.last_inbound.clone(),
            last_outbound: self.last_outbound.clone(),
        });
    }
}

async fn next_frame(
    socket: &mut Option<WsStream>,
) -> Option<Result<tungstenite::Message, tungstenite::Error>> {
    match socket {
        Some(ws) => ws.next().await,
        None => std::future::pending().await,
    }
}
