//! WebSocket push channel with bounded auto-reconnect.
//!
//! One [`PushChannel`] per client instance owns a background connection loop.
//! Push delivery is not assumed reliable or ordered; the poller in
//! [`crate::sync`] is the correctness backstop, so this layer only has to be
//! low-latency, not perfect.
//!
//! Subscriptions do not survive a transport reconnect on the server side, so
//! the loop re-issues the remembered subscription on every connect. Inbound
//! text frames are decoded through `lobby-protocol`; anything that fails to
//! decode is logged and dropped without touching connection state.

#[cfg(test)]
#[path = "transport_test.rs"]
mod transport_test;

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use lobby_protocol::{ClientMessage, ServerMessage, decode_message};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::task::ScheduledTask;

/// Fixed delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Consecutive failed attempts tolerated before reconnection stops.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of the push connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none being attempted.
    #[default]
    Disconnected,
    /// First connection attempt in flight.
    Connecting,
    /// Socket open and processing messages.
    Connected,
    /// Reconnection attempt in flight after a lost connection.
    Reconnecting,
    /// Last connection attempt failed.
    Error,
}

/// Counts reconnect attempts against a fixed ceiling.
///
/// The counter resets on every successful connect, is exhausted by a manual
/// disconnect (suppressing further attempts), and is reset to zero by a
/// manual reconnect.
#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY)
    }
}

impl ReconnectPolicy {
    /// Policy allowing `max_attempts` reconnects spaced `delay` apart.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { attempts: 0, max_attempts, delay }
    }

    /// Claim the next reconnect slot, or `None` once the ceiling is reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.delay)
    }

    /// Reset the attempt counter (successful connect or manual reconnect).
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Spend all remaining attempts (manual disconnect).
    pub fn exhaust(&mut self) {
        self.attempts = self.max_attempts;
    }

    /// Attempts consumed since the last reset.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Settings for [`PushChannel::start`].
#[derive(Clone, Debug)]
pub struct PushChannelConfig {
    /// WebSocket endpoint, e.g. `ws://host/ws` (see [`crate::api::ws_url`]).
    pub url: String,
    /// Delay between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Reconnect attempt ceiling.
    pub max_reconnect_attempts: u32,
    /// Whether lost connections are retried at all.
    pub auto_reconnect: bool,
}

impl PushChannelConfig {
    /// Defaults: 3000 ms delay, 5 attempts, auto-reconnect on.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            auto_reconnect: true,
        }
    }
}

#[derive(Debug)]
enum Command {
    Subscribe(String),
    Unsubscribe,
    Reconnect,
    Disconnect,
}

/// How a connected session ended.
enum SessionEnd {
    /// Socket closed or errored unexpectedly.
    Lost,
    /// Manual disconnect; stay down until a manual reconnect.
    Manual,
    /// Manual reconnect; tear down and dial again immediately.
    Reconnect,
    /// Command channel closed; the owning handle is gone.
    Shutdown,
}

/// Handle to the push connection loop.
///
/// Dropping the handle aborts the loop and closes the socket.
#[derive(Debug)]
pub struct PushChannel {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    _task: ScheduledTask,
}

impl PushChannel {
    /// Start the connection loop and return the handle plus the inbound
    /// message feed.
    #[must_use]
    pub fn start(config: PushChannelConfig) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let mut task = ScheduledTask::idle();
        task.spawn(run(config, command_rx, event_tx, state_tx));

        (Self { commands: command_tx, state: state_rx, _task: task }, event_rx)
    }

    /// Request push updates for `lobby_id`; replaces any prior subscription.
    pub fn subscribe(&self, lobby_id: impl Into<String>) {
        let _ = self.commands.send(Command::Subscribe(lobby_id.into()));
    }

    /// Stop push updates for the current lobby.
    pub fn unsubscribe(&self) {
        let _ = self.commands.send(Command::Unsubscribe);
    }

    /// Manually reconnect, resetting the attempt counter to zero.
    pub fn reconnect(&self) {
        let _ = self.commands.send(Command::Reconnect);
    }

    /// Disconnect and suppress auto-reconnection until [`Self::reconnect`].
    pub fn disconnect(&self) {
        let _ = self.commands.send(Command::Disconnect);
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch receiver for connection state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }
}

async fn run(
    config: PushChannelConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ServerMessage>,
    state: watch::Sender<ConnectionState>,
) {
    let mut policy = ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_delay);
    let mut subscription: Option<String> = None;
    let mut online = true;

    loop {
        // Offline: only commands can wake us back up.
        while !online {
            let Some(command) = commands.recv().await else {
                return;
            };
            match command {
                Command::Reconnect => {
                    policy.reset();
                    online = true;
                }
                Command::Subscribe(lobby_id) => subscription = Some(lobby_id),
                Command::Unsubscribe => subscription = None,
                Command::Disconnect => {}
            }
        }

        let _ = state.send(if policy.attempts() == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        let socket = match connect_async(config.url.as_str()).await {
            Ok((socket, _)) => socket,
            Err(error) => {
                tracing::warn!(error = %error, url = %config.url, "push connect failed");
                let _ = state.send(ConnectionState::Error);
                if config.auto_reconnect {
                    if let Some(delay) = policy.next_delay() {
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    tracing::warn!("reconnect ceiling reached; waiting for manual reconnect");
                }
                online = false;
                continue;
            }
        };

        policy.reset();
        let _ = state.send(ConnectionState::Connected);

        match run_session(socket, &mut commands, &events, &mut subscription).await {
            SessionEnd::Lost => {
                let _ = state.send(ConnectionState::Disconnected);
                if config.auto_reconnect {
                    if let Some(delay) = policy.next_delay() {
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    tracing::warn!("reconnect ceiling reached; waiting for manual reconnect");
                }
                online = false;
            }
            SessionEnd::Reconnect => policy.reset(),
            SessionEnd::Manual => {
                policy.exhaust();
                let _ = state.send(ConnectionState::Disconnected);
                online = false;
            }
            SessionEnd::Shutdown => return,
        }
    }
}

/// Process one connected session until it ends.
async fn run_session(
    socket: WsStream,
    commands: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<ServerMessage>,
    subscription: &mut Option<String>,
) -> SessionEnd {
    let (mut sink, mut stream) = socket.split();

    // Server-side subscriptions do not survive a reconnect.
    if let Some(lobby_id) = subscription.clone() {
        let message = ClientMessage::SubscribeLobby { lobby_id };
        if !send_message(&mut sink, &message).await {
            return SessionEnd::Lost;
        }
    }

    loop {
        tokio::select! {
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => match decode_message(text.as_str()) {
                    Ok(message) => {
                        let _ = events.send(message);
                    }
                    Err(error) => {
                        tracing::warn!(error = %error, "dropping push message");
                    }
                },
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Lost,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::warn!(error = %error, "push socket error");
                    return SessionEnd::Lost;
                }
            },
            command = commands.recv() => match command {
                Some(Command::Subscribe(lobby_id)) => {
                    let message = ClientMessage::SubscribeLobby { lobby_id: lobby_id.clone() };
                    *subscription = Some(lobby_id);
                    if !send_message(&mut sink, &message).await {
                        return SessionEnd::Lost;
                    }
                }
                Some(Command::Unsubscribe) => {
                    *subscription = None;
                    if !send_message(&mut sink, &ClientMessage::UnsubscribeLobby).await {
                        return SessionEnd::Lost;
                    }
                }
                Some(Command::Reconnect) => return SessionEnd::Reconnect,
                Some(Command::Disconnect) => {
                    let _ = sink.close().await;
                    return SessionEnd::Manual;
                }
                None => {
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }
            },
        }
    }
}

async fn send_message(sink: &mut SplitSink<WsStream, Message>, message: &ClientMessage) -> bool {
    match sink.send(Message::Text(message.to_json().into())).await {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(error = %error, "push send failed");
            false
        }
    }
}
