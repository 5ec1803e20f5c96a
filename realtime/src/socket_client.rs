//! Resilient socket client
//!
//! One logical real-time connection, driven by a single actor task that owns
//! the transport handle, the lifecycle state machine and the message log.
//! Callers issue commands and observe state through a `watch` channel.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use shared::{ClientAction, FeedName, feed_debug, feed_error, feed_info, feed_warn};
use crate::config::ClientConfig;
use crate::core::backoff::ABNORMAL_CLOSURE;
use crate::core::connection::{CloseOutcome, ConnectionMachine};
use crate::core::endpoint::socket_url;
use crate::core::feed::{ChatProtocol, DashboardProtocol};
use crate::core::message_log::MessageLog;
use crate::error::{RealtimeError, RealtimeResult};
use crate::traits::{Connector, FeedProtocol, TokenProvider};
use crate::types::{ConnectionSnapshot, OutboundFrame, TransportEvent, TransportHandle};

enum Command {
    Connect,
    Disconnect,
    Send {
        action: ClientAction,
        reply: oneshot::Sender<RealtimeResult<()>>,
    },
}

/// Handle to one logical connection. Dropping it closes the command channel,
/// which shuts the connection down.
pub struct SocketClient {
    feed: FeedName,
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionSnapshot>,
}

impl SocketClient {
    /// Spawn the connection actor for a feed. Nothing connects until `connect()`.
    pub fn spawn<C, P>(config: ClientConfig, protocol: P, connector: Arc<C>, tokens: Arc<dyn TokenProvider>) -> Self
    where
        C: Connector + ?Sized + 'static,
        P: FeedProtocol,
    {
        let feed = protocol.feed().clone();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionSnapshot::default());

        let driver = Driver {
            machine: ConnectionMachine::new(config.reconnect.clone()),
            log: MessageLog::new(config.max_messages),
            config,
            protocol,
            connector,
            tokens,
            commands: command_rx,
            state: state_tx,
            transport: None,
            pending_open: None,
            reconnect_timer: None,
        };
        tokio::spawn(driver.run());

        Self { feed, commands, state }
    }

    /// Client for the listener chat feed, optionally scoped to a session
    pub fn chat<C>(config: ClientConfig, session: Option<String>, connector: Arc<C>, tokens: Arc<dyn TokenProvider>) -> Self
    where
        C: Connector + ?Sized + 'static,
    {
        Self::spawn(config, ChatProtocol::new(session), connector, tokens)
    }

    /// Client for the dashboard feed, global or for one station
    pub fn dashboard<C>(config: ClientConfig, station: Option<String>, connector: Arc<C>, tokens: Arc<dyn TokenProvider>) -> Self
    where
        C: Connector + ?Sized + 'static,
    {
        Self::spawn(config, DashboardProtocol::new(station), connector, tokens)
    }

    pub fn feed(&self) -> &FeedName {
        &self.feed
    }

    /// Open the connection. No-op while a transport is open or opening.
    pub fn connect(&self) {
        if self.commands.send(Command::Connect).is_err() {
            feed_warn!(self.feed, "connect() ignored: client task has stopped");
        }
    }

    /// Close the connection and stop reconnecting. Idempotent.
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Send a chat message. Empty input is rejected before anything else.
    pub async fn send_message(&self, content: &str) -> RealtimeResult<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(RealtimeError::invalid_input("message content is empty"));
        }
        self.send(ClientAction::SendMessage { content: content.to_string() }).await
    }

    pub async fn request_history(&self, limit: u32) -> RealtimeResult<()> {
        self.send(ClientAction::GetHistory { limit }).await
    }

    /// Transmit an action immediately. Fails with `NotConnected` when no
    /// transport is open; nothing is queued.
    pub async fn send(&self, action: ClientAction) -> RealtimeResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Send { action, reply })
            .map_err(|_| RealtimeError::ClientStopped)?;
        response.await.map_err(|_| RealtimeError::ClientStopped)?
    }

    /// Current observable state
    pub fn snapshot(&self) -> ConnectionSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionSnapshot> {
        self.state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().is_connected
    }
}

type OpenTask = JoinHandle<RealtimeResult<TransportHandle>>;

struct Driver<C: ?Sized, P> {
    config: ClientConfig,
    protocol: P,
    connector: Arc<C>,
    tokens: Arc<dyn TokenProvider>,
    machine: ConnectionMachine,
    log: MessageLog,
    commands: mpsc::UnboundedReceiver<Command>,
    state: watch::Sender<ConnectionSnapshot>,
    transport: Option<TransportHandle>,
    pending_open: Option<OpenTask>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
}

impl<C, P> Driver<C, P>
where
    C: Connector + ?Sized + 'static,
    P: FeedProtocol,
{
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        self.shutdown();
                        break;
                    }
                },
                opened = wait_open(&mut self.pending_open) => self.handle_open_result(opened),
                event = next_event(&mut self.transport) => self.handle_transport_event(event),
                _ = wait_timer(&mut self.reconnect_timer) => self.handle_reconnect_due(),
            }
            self.publish();
        }
    }

    fn feed(&self) -> &FeedName {
        self.protocol.feed()
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect => {
                if self.machine.begin_connect() {
                    self.start_open();
                } else {
                    feed_debug!(self.feed(), "connect() ignored in state {:?}", self.machine.status());
                }
            }
            Command::Disconnect => self.disconnect(),
            Command::Send { action, reply } => {
                let result = self.transmit(&action);
                // Callers may inspect the snapshot as soon as they get the reply
                self.publish();
                let _ = reply.send(result);
            }
        }
    }

    fn start_open(&mut self) {
        let token = self.tokens.token();
        let url = match socket_url(
            &self.config.api_base,
            self.protocol.feed(),
            self.protocol.sub_resource(),
            token.as_deref(),
        ) {
            Ok(url) => url,
            Err(e) => {
                shared::logging::log_error(self.protocol.feed(), "Building socket URL", &e);
                self.machine.record_error(e.to_string());
                self.machine.disconnect();
                return;
            }
        };

        feed_info!(self.feed(), "🔌 Connecting (attempt {})", self.machine.attempts() + 1);
        let connector = Arc::clone(&self.connector);
        self.pending_open = Some(tokio::spawn(async move { connector.open(&url).await }));
    }

    fn handle_open_result(&mut self, opened: RealtimeResult<TransportHandle>) {
        match opened {
            Ok(handle) => {
                self.machine.on_open();
                self.transport = Some(handle);
                feed_info!(self.feed(), "✅ Connected");
                if self.config.request_history_on_open {
                    let limit = self.config.history_limit;
                    if let Err(e) = self.transmit(&ClientAction::GetHistory { limit }) {
                        feed_warn!(self.feed(), "History request failed: {}", e);
                    }
                }
            }
            Err(e) => {
                feed_warn!(self.feed(), "Connection attempt failed: {}", e);
                let outcome = self.machine.on_open_failed(&e);
                self.apply_outcome(outcome);
            }
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Text(text) => match self.protocol.decode(&text) {
                Ok(event) => {
                    if let Some(error) = self.log.apply(event) {
                        feed_warn!(self.feed(), "Feed reported error: {}", error);
                        self.machine.record_error(error);
                    }
                }
                Err(e) => feed_warn!(self.feed(), "Dropping malformed frame: {}", e),
            },
            TransportEvent::Error(message) => {
                feed_warn!(self.feed(), "Transport error: {}", message);
                if let Some(outcome) = self.machine.on_transport_error(message) {
                    // Whatever the dead transport reports after this is ignored
                    if let Some(transport) = self.transport.take() {
                        let _ = transport.outbound.send(OutboundFrame::Close);
                    }
                    self.log.abort_streaming();
                    self.apply_outcome(outcome);
                }
            }
            TransportEvent::Closed { code, reason } => {
                self.transport = None;
                self.log.abort_streaming();
                feed_info!(self.feed(), "Connection closed (code {:?}) {}", code, reason);
                let outcome = self.machine.on_closed(code, &reason);
                self.apply_outcome(outcome);
            }
        }
    }

    fn handle_reconnect_due(&mut self) {
        if self.machine.reconnect_due() {
            self.start_open();
        }
    }

    fn apply_outcome(&mut self, outcome: CloseOutcome) {
        match outcome {
            CloseOutcome::Reconnect(delay) => {
                feed_info!(
                    self.feed(),
                    "🔄 Reconnecting in {:?} (attempt {})",
                    delay,
                    self.machine.attempts()
                );
                self.schedule_reconnect(delay);
            }
            CloseOutcome::Terminal => {
                feed_error!(
                    self.feed(),
                    "❌ Connection rejected, not reconnecting: {}",
                    self.machine.last_error().unwrap_or("authentication failed")
                );
                self.reconnect_timer = None;
            }
            CloseOutcome::Stopped => {
                self.reconnect_timer = None;
            }
        }
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.reconnect_timer = Some(Box::pin(tokio::time::sleep(delay)));
    }

    fn transmit(&mut self, action: &ClientAction) -> RealtimeResult<()> {
        let transport = match (&self.transport, self.machine.is_connected()) {
            (Some(transport), true) => transport,
            _ => {
                self.machine.record_error(RealtimeError::NotConnected.to_string());
                return Err(RealtimeError::NotConnected);
            }
        };
        let frame = action.to_json()?;
        if transport.outbound.send(OutboundFrame::Text(frame)).is_err() {
            self.machine.record_error(RealtimeError::TransportClosed.to_string());
            return Err(RealtimeError::TransportClosed);
        }
        Ok(())
    }

    fn disconnect(&mut self) {
        self.machine.disconnect();
        self.reconnect_timer = None;
        if let Some(open) = self.pending_open.take() {
            open.abort();
        }
        if let Some(transport) = self.transport.take() {
            let _ = transport.outbound.send(OutboundFrame::Close);
            feed_info!(self.feed(), "🔌 Disconnected");
        }
        self.log.abort_streaming();
    }

    fn shutdown(&mut self) {
        self.disconnect();
        shared::logging::log_shutdown(self.protocol.feed(), "client dropped");
    }

    fn publish(&self) {
        let snapshot = ConnectionSnapshot {
            status: self.machine.status(),
            is_connected: self.machine.is_connected(),
            should_reconnect: self.machine.should_reconnect(),
            attempts: self.machine.attempts(),
            auth_failed: self.machine.auth_failed(),
            last_error: self.machine.last_error().map(str::to_string),
            messages: self.log.messages().cloned().collect(),
            streaming: self.log.pending().cloned(),
            processing_status: self.log.processing_status().map(str::to_string),
        };
        self.state.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn wait_open(slot: &mut Option<OpenTask>) -> RealtimeResult<TransportHandle> {
    match slot.as_mut() {
        Some(task) => {
            let result = task.await;
            *slot = None;
            result.unwrap_or_else(|e| Err(RealtimeError::JoinError(e)))
        }
        None => pending().await,
    }
}

async fn next_event(slot: &mut Option<TransportHandle>) -> TransportEvent {
    match slot.as_mut() {
        Some(transport) => transport.inbound.recv().await.unwrap_or(TransportEvent::Closed {
            code: Some(ABNORMAL_CLOSURE),
            reason: "transport dropped".to_string(),
        }),
        None => pending().await,
    }
}

async fn wait_timer(slot: &mut Option<Pin<Box<Sleep>>>) {
    match slot.as_mut() {
        Some(timer) => {
            timer.as_mut().await;
            *slot = None;
        }
        None => pending().await,
    }
}
