//! Self-healing event channel.
//!
//! Keeps one Socket.IO session to the POS server alive and republishes the
//! server's push events (`inventory-update`, `new-sale`, `low-stock-alert`)
//! on the [`NotificationBus`]. Drops and failed connects are retried with
//! exponential backoff (1s, 2s, 4s, 8s, 16s); after that the channel gives
//! up, publishes a single `connection-error` notification and waits for
//! [`EventChannel::network_online`].
//!
//! # Example
//!
//! ```rust,ignore
//! use poslink_api::{ChannelConfig, EventChannel, NotificationBus, NotificationKind};
//!
//! let bus = NotificationBus::new();
//! let mut sales = bus.subscribe([NotificationKind::NewSale]);
//!
//! let channel = EventChannel::new(ChannelConfig::new(origin), bus.clone())?;
//! channel.start();
//!
//! while let Some(sale) = sales.recv().await {
//!     println!("{}", sale.payload);
//! }
//! ```
//!
//! All transitions happen in one spawned task. The state is observable
//! through a [`watch`] receiver; the channel never returns errors to its
//! callers.

pub mod protocol;
pub mod state;
mod tls;
pub mod transport;

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

pub use self::state::{Action, ChannelState, Input, ReconnectMachine, ReconnectPolicy};
pub use self::transport::{Connector, Session, SessionEvent, WsConnector, WsSession};
use crate::bus::{Notification, NotificationBus, NotificationKind};
use crate::error::Error;
use crate::token::SessionToken;
use crate::transport::TlsMode;

// ── ChannelConfig ────────────────────────────────────────────────────

/// Settings for an [`EventChannel`] over WebSocket.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Server origin, e.g. `http://localhost:5000`.
    pub url: Url,
    pub reconnect: ReconnectPolicy,
    /// Certificate handling for `https` origins.
    pub tls: TlsMode,
    /// Read on every connect and sent in the Socket.IO connect packet.
    /// Share [`ApiClient::session_token`](crate::ApiClient::session_token)
    /// here to follow login and logout.
    pub auth: SessionToken,
}

impl ChannelConfig {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            reconnect: ReconnectPolicy::default(),
            tls: TlsMode::default(),
            auth: SessionToken::default(),
        }
    }
}

/// User-facing text of the `connection-error` notification.
pub fn gave_up_message(attempts: u32) -> String {
    format!(
        "Lost connection to the server after {attempts} reconnection attempts. \
         Please refresh to try again."
    )
}

// ── EventChannel ─────────────────────────────────────────────────────

#[derive(Debug)]
enum Command {
    Online,
}

/// Handle to the event channel. Dropping it shuts the channel down.
pub struct EventChannel<C: Connector = WsConnector> {
    state_rx: watch::Receiver<ChannelState>,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    /// Taken by the first `start()`.
    pending: Mutex<Option<Driver<C>>>,
}

impl EventChannel<WsConnector> {
    /// Channel over a real WebSocket.
    pub fn new(config: ChannelConfig, bus: NotificationBus) -> Result<Self, Error> {
        let connector = WsConnector::new(&config.url, &config.tls, config.auth)?;
        Ok(Self::with_connector(connector, config.reconnect, bus))
    }
}

impl<C: Connector> EventChannel<C> {
    /// Channel over any [`Connector`]. Nothing happens until [`start`](Self::start).
    pub fn with_connector(connector: C, policy: ReconnectPolicy, bus: NotificationBus) -> Self {
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let driver = Driver {
            connector: Arc::new(connector),
            machine: ReconnectMachine::new(policy),
            bus,
            state_tx,
            commands: command_rx,
            cancel: cancel.clone(),
            session: None,
        };

        Self {
            state_rx,
            commands,
            cancel,
            pending: Mutex::new(Some(driver)),
        }
    }

    /// Spawn the driver task and begin connecting. Later calls do nothing.
    ///
    /// Outside a tokio runtime nothing is spawned; the channel stays
    /// `Disconnected` and a later call from inside a runtime can start it.
    pub fn start(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("event channel started outside a tokio runtime, not connecting");
            return;
        };
        let driver = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match driver {
            Some(driver) => {
                runtime.spawn(driver.run());
            }
            None => debug!("event channel already started"),
        }
    }

    /// Watch the connection state.
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    /// Signal that the host is back online. Only acted on while
    /// reconnecting or after giving up: attempts reset and a connect starts
    /// immediately.
    pub fn network_online(&self) {
        if self.commands.send(Command::Online).is_err() {
            trace!("event channel stopped, online signal dropped");
        }
    }

    /// Close the channel. It does not reconnect afterwards.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl<C: Connector> Drop for EventChannel<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Driver task ──────────────────────────────────────────────────────

struct Driver<C: Connector> {
    connector: Arc<C>,
    machine: ReconnectMachine,
    bus: NotificationBus,
    state_tx: watch::Sender<ChannelState>,
    commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
    /// Session produced by the last successful connect, until listened on.
    session: Option<C::Session>,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self) {
        let mut next = self.apply(Input::Start);
        while let Some(action) = next {
            next = match action {
                Action::Connect => self.connect_phase().await,
                Action::Listen => self.listen_phase().await,
                Action::Backoff(delay) => self.backoff_phase(delay).await,
                Action::GiveUp => self.apply(Input::RetriesExhausted),
                Action::AwaitOnline => self.gave_up_phase().await,
                Action::Stop => None,
            };
        }
        debug!("event channel driver exiting");
    }

    /// Feed the machine and publish the resulting state.
    fn apply(&mut self, input: Input) -> Option<Action> {
        let before = self.machine.state();
        let action = self.machine.handle(input);
        match action {
            Some(_) => {
                let state = self.machine.state();
                if state != before {
                    debug!(from = %before, to = %state, ?input, "event channel transition");
                }
                self.state_tx.send_replace(state);
            }
            None => trace!(state = %before, ?input, "input ignored"),
        }
        action
    }

    fn on_command(&mut self, command: Command) -> Option<Action> {
        match command {
            Command::Online => self.apply(Input::Online),
        }
    }

    async fn connect_phase(&mut self) -> Option<Action> {
        let timeout = self.machine.policy().connect_timeout;
        let connector = Arc::clone(&self.connector);
        let connect = tokio::time::timeout(timeout, async move { connector.connect().await });
        tokio::pin!(connect);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return self.apply(Input::Close),
                Some(command) = self.commands.recv() => {
                    if let Some(action) = self.on_command(command) {
                        return Some(action);
                    }
                }
                result = &mut connect => {
                    return match result {
                        Ok(Ok(session)) => {
                            info!("event channel connected");
                            self.session = Some(session);
                            self.apply(Input::Connected)
                        }
                        Ok(Err(e)) => {
                            warn!(error = %e, attempts = self.machine.attempts(), "event channel connect failed");
                            self.apply(Input::ConnectError)
                        }
                        Err(_) => {
                            warn!(
                                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                                "event channel connect timed out"
                            );
                            self.apply(Input::ConnectError)
                        }
                    };
                }
            }
        }
    }

    async fn listen_phase(&mut self) -> Option<Action> {
        let Some(mut session) = self.session.take() else {
            return self.apply(Input::ConnectionLost);
        };

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    session.close().await;
                    info!("event channel closed");
                    return self.apply(Input::Close);
                }
                Some(command) = self.commands.recv() => {
                    // Always ignored while connected; drained so it cannot
                    // fire later.
                    if let Some(action) = self.on_command(command) {
                        return Some(action);
                    }
                }
                event = session.next_event() => match event {
                    SessionEvent::Event { name, payload } => self.republish(&name, payload),
                    SessionEvent::ServerDisconnect => {
                        info!("event channel disconnected by server");
                        return self.apply(Input::ServerDisconnect);
                    }
                    SessionEvent::Lost(reason) => {
                        warn!(%reason, "event channel connection lost");
                        return self.apply(Input::ConnectionLost);
                    }
                },
            }
        }
    }

    async fn backoff_phase(&mut self, delay: std::time::Duration) -> Option<Action> {
        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt = self.machine.attempts(),
            "waiting before reconnect"
        );
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return self.apply(Input::Close),
                Some(command) = self.commands.recv() => {
                    if let Some(action) = self.on_command(command) {
                        info!("network online, reconnecting now");
                        return Some(action);
                    }
                }
                () = &mut sleep => return self.apply(Input::BackoffElapsed),
            }
        }
    }

    async fn gave_up_phase(&mut self) -> Option<Action> {
        let max_attempts = self.machine.policy().max_attempts;
        warn!(max_attempts, "event channel gave up reconnecting");
        self.bus.publish(Notification::new(
            NotificationKind::ConnectionError,
            json!({ "message": gave_up_message(max_attempts) }),
        ));

        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return self.apply(Input::Close),
                Some(command) = self.commands.recv() => {
                    if let Some(action) = self.on_command(command) {
                        info!("network online, retrying event channel");
                        return Some(action);
                    }
                }
            }
        }
    }

    fn republish(&self, name: &str, payload: serde_json::Value) {
        match name.parse::<NotificationKind>() {
            Ok(kind) if kind.is_server_event() => {
                debug!(event = name, "server event");
                self.bus.publish(Notification::new(kind, payload));
            }
            _ => trace!(event = name, "ignoring unrecognized event"),
        }
    }
}
