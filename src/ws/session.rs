use crate::core::config::WsKind;
use crate::core::errors::BlofinError;
use crate::core::kernel::{timestamp_ms, HmacSigner, TungsteniteWs, WsTransport};
use crate::ws::codec::{BlofinCodec, ChannelArg, WsDataFrame, WsFrame};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, sleep_until, Instant};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Lifecycle of a WebSocket session, driven only by the session itself.
/// `Disconnected` is terminal only after an explicit close by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Reconnecting,
}

/// Callback invoked for each data push matching a subscription.
pub type MessageHandler = Box<dyn FnMut(&WsDataFrame) + Send>;

/// Callback for session-level events: state changes, errors and frames that
/// match no subscription.
pub type EventHandler = Box<dyn FnMut(SessionEvent) + Send>;

#[derive(Debug)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    Error(BlofinError),
    Unmatched(WsFrame),
}

/// Tuning knobs of a session. The heartbeat interval must stay below the
/// exchange's 30 second idle-disconnect timeout.
#[derive(Debug, Clone)]
pub struct WsSessionConfig {
    pub heartbeat_interval: Duration,
    /// How long after a ping the session waits for any inbound frame before
    /// treating the connection as dead.
    pub pong_grace: Duration,
    pub auth_timeout: Duration,
    /// Initial reconnect backoff; doubles per attempt up to the cap.
    pub reconnect_delay: Duration,
    pub reconnect_max_delay: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for WsSessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            pong_grace: Duration::from_secs(10),
            auth_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_millis(500),
            reconnect_max_delay: Duration::from_secs(60),
            max_reconnect_attempts: 5,
        }
    }
}

type SubKey = (String, BTreeMap<String, String>);

struct Subscription {
    channel: String,
    params: BTreeMap<String, String>,
    handler: MessageHandler,
}

impl Subscription {
    fn arg(&self) -> ChannelArg {
        ChannelArg {
            channel: self.channel.clone(),
            params: self.params.clone(),
        }
    }

    fn matches(&self, arg: &ChannelArg) -> bool {
        self.channel == arg.channel
            && self
                .params
                .iter()
                .all(|(key, value)| arg.params.get(key) == Some(value))
    }
}

enum Command {
    Connect {
        ack: oneshot::Sender<Result<(), BlofinError>>,
    },
    Subscribe {
        channel: String,
        params: BTreeMap<String, String>,
        handler: MessageHandler,
    },
    Unsubscribe {
        channel: String,
        params: BTreeMap<String, String>,
    },
    SetEventHandler(EventHandler),
    Close {
        ack: oneshot::Sender<()>,
    },
}

/// Caller-side handle to a running session.
///
/// The handle only enqueues requests; the session's event loop is the sole
/// owner of the connection and the subscription set, so replay during
/// reconnect can never race with callers.
#[derive(Clone)]
pub struct WsHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl WsHandle {
    /// Open the connection, authenticating first on private endpoints.
    ///
    /// Resolves once the session is `Ready` (buffered subscriptions flushed),
    /// or with the connect/login error.
    pub async fn connect(&self) -> Result<(), BlofinError> {
        let (ack, response) = oneshot::channel();
        self.cmd_tx
            .send(Command::Connect { ack })
            .map_err(|_| BlofinError::Connection("session terminated".to_string()))?;
        response
            .await
            .map_err(|_| BlofinError::Connection("session terminated".to_string()))?
    }

    /// Register a subscription for (channel, params).
    ///
    /// Re-subscribing to the same identity replaces the handler in place.
    /// Requests made before the session is `Ready` are buffered and flushed
    /// in registration order once it is.
    pub fn subscribe<H>(
        &self,
        channel: &str,
        params: &[(&str, &str)],
        handler: H,
    ) -> Result<(), BlofinError>
    where
        H: FnMut(&WsDataFrame) + Send + 'static,
    {
        self.cmd_tx
            .send(Command::Subscribe {
                channel: channel.to_string(),
                params: to_param_map(params),
                handler: Box::new(handler),
            })
            .map_err(|_| BlofinError::Connection("session terminated".to_string()))
    }

    pub fn unsubscribe(&self, channel: &str, params: &[(&str, &str)]) -> Result<(), BlofinError> {
        self.cmd_tx
            .send(Command::Unsubscribe {
                channel: channel.to_string(),
                params: to_param_map(params),
            })
            .map_err(|_| BlofinError::Connection("session terminated".to_string()))
    }

    /// Install the session-level handler for errors, state changes and
    /// frames that match no subscription.
    pub fn on_event<H>(&self, handler: H) -> Result<(), BlofinError>
    where
        H: FnMut(SessionEvent) + Send + 'static,
    {
        self.cmd_tx
            .send(Command::SetEventHandler(Box::new(handler)))
            .map_err(|_| BlofinError::Connection("session terminated".to_string()))
    }

    /// Close the session. Cancels pending waits, stops the heartbeat and the
    /// reconnect loop; the session ends in `Disconnected` for good.
    pub async fn close(&self) {
        let (ack, done) = oneshot::channel();
        if self.cmd_tx.send(Command::Close { ack }).is_ok() {
            let _ = done.await;
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch channel mirroring every state transition.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}

fn to_param_map(params: &[(&str, &str)]) -> BTreeMap<String, String> {
    params
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

enum LoopExit {
    Closed,
    Lost,
}

/// One WebSocket session: a single-threaded event loop owning the socket,
/// the subscription set and the heartbeat.
pub struct WsSession<T: WsTransport> {
    transport: T,
    codec: BlofinCodec,
    kind: WsKind,
    signer: Option<HmacSigner>,
    config: WsSessionConfig,
    state_tx: watch::Sender<ConnectionState>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    subscriptions: Vec<Subscription>,
    /// Keys registered but whose subscribe frame has not been sent yet.
    unsent: Vec<SubKey>,
    event_handler: Option<EventHandler>,
    ping_deadline: Option<Instant>,
    closing: bool,
}

impl WsSession<TungsteniteWs> {
    /// Spawn a session over a real WebSocket connection to `url`.
    pub fn spawn(
        url: String,
        kind: WsKind,
        signer: Option<HmacSigner>,
        config: WsSessionConfig,
    ) -> WsHandle {
        Self::spawn_with_transport(TungsteniteWs::new(url), kind, signer, config)
    }
}

impl<T: WsTransport + 'static> WsSession<T> {
    /// Spawn a session over an arbitrary transport (injected in tests).
    pub fn spawn_with_transport(
        transport: T,
        kind: WsKind,
        signer: Option<HmacSigner>,
        config: WsSessionConfig,
    ) -> WsHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let session = Self {
            transport,
            codec: BlofinCodec::new(),
            kind,
            signer,
            config,
            state_tx,
            cmd_rx,
            subscriptions: Vec::new(),
            unsent: Vec::new(),
            event_handler: None,
            ping_deadline: None,
            closing: false,
        };

        tokio::spawn(session.run());

        WsHandle { cmd_tx, state_rx }
    }

    async fn run(mut self) {
        while !self.closing {
            let Some(cmd) = self.cmd_rx.recv().await else {
                break;
            };

            match cmd {
                Command::Connect { ack } => {
                    let result = self.establish().await;
                    let connected = result.is_ok();
                    let _ = ack.send(result);
                    if connected {
                        if let LoopExit::Closed = self.drive().await {
                            break;
                        }
                    }
                }
                other => {
                    self.handle_passive_command(other);
                }
            }
        }

        let _ = self.transport.close().await;
        self.set_state(ConnectionState::Disconnected);
    }

    /// Connect, authenticate when required, then flush buffered
    /// subscriptions in registration order.
    async fn establish(&mut self) -> Result<(), BlofinError> {
        self.set_state(ConnectionState::Connecting);

        if let Err(e) = self.transport.connect().await {
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }

        if self.kind.requires_auth() {
            self.set_state(ConnectionState::Authenticating);
            if let Err(e) = self.login().await {
                let _ = self.transport.close().await;
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        }

        self.set_state(ConnectionState::Ready);

        if let Err(e) = self.flush_unsent().await {
            let _ = self.transport.close().await;
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }

        Ok(())
    }

    /// Send the login frame and wait for the login result.
    async fn login(&mut self) -> Result<(), BlofinError> {
        let signer = self.signer.as_ref().ok_or_else(|| {
            BlofinError::Configuration(
                "credentials are required for private WebSocket endpoints".to_string(),
            )
        })?;

        let args = signer.login_args(&timestamp_ms())?;
        let frame = self.codec.encode_login(&args)?;
        self.transport.send(frame).await?;

        let deadline = Instant::now() + self.config.auth_timeout;

        enum Step {
            Timeout,
            Cmd(Option<Command>),
            Msg(Option<Result<Message, BlofinError>>),
        }

        loop {
            let step = tokio::select! {
                () = sleep_until(deadline) => Step::Timeout,
                cmd = self.cmd_rx.recv() => Step::Cmd(cmd),
                msg = self.transport.next() => Step::Msg(msg),
            };

            match step {
                Step::Timeout => {
                    return Err(BlofinError::Authentication("login timed out".to_string()));
                }
                Step::Cmd(None) => {
                    self.closing = true;
                    return Err(BlofinError::Connection("session terminated".to_string()));
                }
                Step::Cmd(Some(cmd)) => {
                    if self.handle_passive_command(cmd) {
                        return Err(BlofinError::Connection("session closed".to_string()));
                    }
                }
                Step::Msg(Some(Ok(raw))) => match self.codec.decode(raw) {
                    Ok(Some(WsFrame::LoginOk)) => return Ok(()),
                    Ok(Some(WsFrame::LoginFailed { code, message })) => {
                        return Err(BlofinError::Authentication(format!(
                            "login failed: {code} {message}"
                        )));
                    }
                    Ok(Some(WsFrame::ErrorEvent { code, message })) => {
                        return Err(BlofinError::Authentication(format!(
                            "login rejected: {code} {message}"
                        )));
                    }
                    Ok(_) => {}
                    Err(e) => self.emit_error(e),
                },
                Step::Msg(Some(Err(e))) => return Err(e),
                Step::Msg(None) => {
                    return Err(BlofinError::Connection(
                        "connection closed during login".to_string(),
                    ));
                }
            }
        }
    }

    /// Main loop while connected: commands, inbound frames and heartbeat.
    async fn drive(&mut self) -> LoopExit {
        let mut heartbeat = tokio::time::interval_at(
            Instant::now() + self.config.heartbeat_interval,
            self.config.heartbeat_interval,
        );
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        enum Step {
            Cmd(Option<Command>),
            Msg(Option<Result<Message, BlofinError>>),
            Ping,
            PongTimeout,
        }

        loop {
            let ping_deadline = self.ping_deadline;
            let step = tokio::select! {
                cmd = self.cmd_rx.recv() => Step::Cmd(cmd),
                msg = self.transport.next() => Step::Msg(msg),
                _ = heartbeat.tick() => Step::Ping,
                () = async move {
                    match ping_deadline {
                        Some(deadline) => sleep_until(deadline).await,
                        None => std::future::pending().await,
                    }
                } => Step::PongTimeout,
            };

            match step {
                Step::Cmd(None) => {
                    self.closing = true;
                    return LoopExit::Closed;
                }
                Step::Cmd(Some(Command::Close { ack })) => {
                    let _ = self.transport.close().await;
                    self.set_state(ConnectionState::Disconnected);
                    self.closing = true;
                    let _ = ack.send(());
                    return LoopExit::Closed;
                }
                Step::Cmd(Some(Command::Connect { ack })) => {
                    // Already connected
                    let _ = ack.send(Ok(()));
                }
                Step::Cmd(Some(Command::Subscribe {
                    channel,
                    params,
                    handler,
                })) => {
                    if self.register(channel, params, handler) {
                        if let Err(e) = self.send_last_registered().await {
                            self.emit_error(e);
                            if !self.reconnect().await {
                                return LoopExit::Lost;
                            }
                            heartbeat.reset();
                        }
                    }
                }
                Step::Cmd(Some(Command::Unsubscribe { channel, params })) => {
                    if self.remove_subscription(&channel, &params) {
                        let arg = ChannelArg {
                            channel,
                            params,
                        };
                        let result = match self.codec.encode_unsubscribe(&arg) {
                            Ok(frame) => self.transport.send(frame).await,
                            Err(e) => Err(e),
                        };
                        if let Err(e) = result {
                            self.emit_error(e);
                            if !self.reconnect().await {
                                return LoopExit::Lost;
                            }
                            heartbeat.reset();
                        }
                    }
                }
                Step::Cmd(Some(Command::SetEventHandler(handler))) => {
                    self.event_handler = Some(handler);
                }
                Step::Msg(Some(Ok(raw))) => self.on_frame(raw),
                Step::Msg(Some(Err(e))) => {
                    self.emit_error(e);
                    if !self.reconnect().await {
                        return LoopExit::Lost;
                    }
                    heartbeat.reset();
                }
                Step::Msg(None) => {
                    info!("WebSocket connection closed unexpectedly");
                    if !self.reconnect().await {
                        return LoopExit::Lost;
                    }
                    heartbeat.reset();
                }
                Step::Ping => {
                    if let Err(e) = self.transport.send(self.codec.encode_ping()).await {
                        self.emit_error(e);
                        if !self.reconnect().await {
                            return LoopExit::Lost;
                        }
                        heartbeat.reset();
                    } else if self.ping_deadline.is_none() {
                        self.ping_deadline = Some(Instant::now() + self.config.pong_grace);
                    }
                }
                Step::PongTimeout => {
                    self.emit_error(BlofinError::Connection(
                        "heartbeat timed out waiting for pong".to_string(),
                    ));
                    if !self.reconnect().await {
                        return LoopExit::Lost;
                    }
                    heartbeat.reset();
                }
            }

            if self.closing {
                return LoopExit::Closed;
            }
        }
    }

    /// Handle a decoded inbound frame. Any frame counts as liveness.
    fn on_frame(&mut self, raw: Message) {
        self.ping_deadline = None;

        match self.codec.decode(raw) {
            Ok(Some(WsFrame::Pong)) => {}
            Ok(Some(WsFrame::Data(frame))) => self.dispatch(frame),
            Ok(Some(WsFrame::SubscribeAck(arg))) => {
                debug!(channel = %arg.channel, "subscription confirmed");
            }
            Ok(Some(WsFrame::UnsubscribeAck(arg))) => {
                debug!(channel = %arg.channel, "unsubscription confirmed");
            }
            Ok(Some(WsFrame::ErrorEvent { code, message })) => {
                // Server-side rejection of a request on this socket; surfaced
                // to the session handler, connection stays up.
                self.emit_error(BlofinError::Api { code, message });
            }
            Ok(Some(frame)) => self.emit_event(SessionEvent::Unmatched(frame)),
            Ok(None) => {}
            Err(e) => self.emit_error(e),
        }
    }

    /// Invoke the handler of every subscription matching the frame's
    /// (channel, params). Dispatch is sequential; exchange-guaranteed
    /// per-channel ordering is preserved.
    fn dispatch(&mut self, frame: WsDataFrame) {
        let mut matched = false;
        for subscription in &mut self.subscriptions {
            if subscription.matches(&frame.arg) {
                matched = true;
                (subscription.handler)(&frame);
            }
        }

        if !matched {
            self.emit_event(SessionEvent::Unmatched(WsFrame::Data(frame)));
        }
    }

    /// Upsert a subscription. Returns true when the identity is new and a
    /// subscribe frame still has to go out.
    fn register(
        &mut self,
        channel: String,
        params: BTreeMap<String, String>,
        handler: MessageHandler,
    ) -> bool {
        if let Some(existing) = self
            .subscriptions
            .iter_mut()
            .find(|s| s.channel == channel && s.params == params)
        {
            // Same (channel, params): replace the handler, keep the slot
            existing.handler = handler;
            return false;
        }

        self.unsent.push((channel.clone(), params.clone()));
        self.subscriptions.push(Subscription {
            channel,
            params,
            handler,
        });
        true
    }

    fn remove_subscription(
        &mut self,
        channel: &str,
        params: &BTreeMap<String, String>,
    ) -> bool {
        let existed = self
            .subscriptions
            .iter()
            .any(|s| s.channel == channel && s.params == *params);
        let was_unsent = self
            .unsent
            .iter()
            .any(|(c, p)| c == channel && p == params);

        self.subscriptions
            .retain(|s| !(s.channel == channel && s.params == *params));
        self.unsent.retain(|(c, p)| !(c == channel && p == params));

        // A frame is only due when the server saw the subscribe
        existed && !was_unsent
    }

    /// Send the subscribe frame for the most recently registered key.
    async fn send_last_registered(&mut self) -> Result<(), BlofinError> {
        let Some((channel, params)) = self.unsent.last().cloned() else {
            return Ok(());
        };
        let arg = ChannelArg {
            channel: channel.clone(),
            params: params.clone(),
        };
        let frame = self.codec.encode_subscribe(&arg)?;
        self.transport.send(frame).await?;
        self.unsent.retain(|(c, p)| !(*c == channel && *p == params));
        Ok(())
    }

    /// Flush buffered subscribe requests, in registration order, exactly once.
    async fn flush_unsent(&mut self) -> Result<(), BlofinError> {
        while let Some((channel, params)) = self.unsent.first().cloned() {
            let arg = ChannelArg {
                channel,
                params,
            };
            let frame = self.codec.encode_subscribe(&arg)?;
            self.transport.send(frame).await?;
            self.unsent.remove(0);
        }
        Ok(())
    }

    /// Reconnect with capped exponential backoff, re-authenticate when
    /// required and replay every subscription in registration order.
    /// Handlers live in the subscription set and survive untouched.
    async fn reconnect(&mut self) -> bool {
        self.set_state(ConnectionState::Reconnecting);
        self.ping_deadline = None;

        let mut delay = self.config.reconnect_delay;
        for attempt in 1..=self.config.max_reconnect_attempts {
            let _ = self.transport.close().await;
            sleep(delay).await;

            match self.reestablish().await {
                Ok(()) => {
                    info!(attempt, "WebSocket reconnected");
                    self.set_state(ConnectionState::Ready);
                    return true;
                }
                Err(e) => {
                    if self.closing {
                        self.set_state(ConnectionState::Disconnected);
                        return false;
                    }
                    warn!(attempt, "reconnection attempt failed: {e}");
                    delay = std::cmp::min(delay * 2, self.config.reconnect_max_delay);
                }
            }
        }

        self.set_state(ConnectionState::Disconnected);
        self.emit_error(BlofinError::Connection(format!(
            "failed to reconnect after {} attempts",
            self.config.max_reconnect_attempts
        )));
        false
    }

    async fn reestablish(&mut self) -> Result<(), BlofinError> {
        self.transport.connect().await?;

        if self.kind.requires_auth() {
            self.login().await?;
        }

        // Replay in original registration order before reporting ready
        for index in 0..self.subscriptions.len() {
            let frame = self.codec.encode_subscribe(&self.subscriptions[index].arg())?;
            self.transport.send(frame).await?;
        }
        self.unsent.clear();

        Ok(())
    }

    /// Commands legal in any state. Returns true when a close was requested.
    fn handle_passive_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Subscribe {
                channel,
                params,
                handler,
            } => {
                self.register(channel, params, handler);
            }
            Command::Unsubscribe { channel, params } => {
                self.remove_subscription(&channel, &params);
            }
            Command::SetEventHandler(handler) => {
                self.event_handler = Some(handler);
            }
            Command::Connect { ack } => {
                // Connection attempt already in flight
                let _ = ack.send(Ok(()));
            }
            Command::Close { ack } => {
                self.closing = true;
                let _ = ack.send(());
                return true;
            }
        }
        false
    }

    fn set_state(&mut self, state: ConnectionState) {
        if *self.state_tx.borrow() != state {
            debug!(?state, "session state changed");
            self.state_tx.send_replace(state);
            self.emit_event(SessionEvent::StateChanged(state));
        }
    }

    fn emit_error(&mut self, err: BlofinError) {
        error!("WebSocket session error: {err}");
        self.emit_event(SessionEvent::Error(err));
    }

    fn emit_event(&mut self, event: SessionEvent) {
        if let Some(handler) = &mut self.event_handler {
            handler(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Credentials;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    enum Inbound {
        Frame(Message),
        Disconnect,
    }

    struct MockTransport {
        rx: mpsc::UnboundedReceiver<Inbound>,
        sent: Arc<Mutex<Vec<String>>>,
        connects: Arc<AtomicU32>,
        connected: bool,
    }

    /// Test-side controls of a [`MockTransport`].
    struct MockRemote {
        tx: mpsc::UnboundedSender<Inbound>,
        sent: Arc<Mutex<Vec<String>>>,
        connects: Arc<AtomicU32>,
    }

    impl MockRemote {
        fn push(&self, text: &str) {
            self.tx
                .send(Inbound::Frame(Message::Text(text.to_string())))
                .unwrap();
        }

        fn drop_connection(&self) {
            self.tx.send(Inbound::Disconnect).unwrap();
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }

        fn clear_sent(&self) {
            self.sent.lock().unwrap().clear();
        }

        fn connects(&self) -> u32 {
            self.connects.load(Ordering::SeqCst)
        }
    }

    fn mock_transport() -> (MockTransport, MockRemote) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let connects = Arc::new(AtomicU32::new(0));
        (
            MockTransport {
                rx,
                sent: Arc::clone(&sent),
                connects: Arc::clone(&connects),
                connected: false,
            },
            MockRemote { tx, sent, connects },
        )
    }

    #[async_trait]
    impl WsTransport for MockTransport {
        async fn connect(&mut self) -> Result<(), BlofinError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            self.connected = true;
            Ok(())
        }

        async fn send(&mut self, msg: Message) -> Result<(), BlofinError> {
            if let Message::Text(text) = msg {
                self.sent.lock().unwrap().push(text);
            }
            Ok(())
        }

        async fn next(&mut self) -> Option<Result<Message, BlofinError>> {
            match self.rx.recv().await {
                Some(Inbound::Frame(msg)) => Some(Ok(msg)),
                Some(Inbound::Disconnect) => {
                    self.connected = false;
                    None
                }
                // Remote dropped by the test; hang instead of simulating a close
                None => futures::future::pending().await,
            }
        }

        async fn close(&mut self) -> Result<(), BlofinError> {
            self.connected = false;
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.connected
        }
    }

    fn spawn_public() -> (WsHandle, MockRemote) {
        let (transport, remote) = mock_transport();
        let handle = WsSession::spawn_with_transport(
            transport,
            WsKind::Public,
            None,
            WsSessionConfig::default(),
        );
        (handle, remote)
    }

    fn spawn_private() -> (WsHandle, MockRemote) {
        let (transport, remote) = mock_transport();
        let signer = HmacSigner::new(Credentials::new(
            "k".to_string(),
            "s".to_string(),
            "p".to_string(),
        ));
        let handle = WsSession::spawn_with_transport(
            transport,
            WsKind::Private,
            Some(signer),
            WsSessionConfig::default(),
        );
        (handle, remote)
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition not met in time");
    }

    const LOGIN_OK: &str = r#"{"event":"login","code":"0"}"#;

    #[tokio::test(start_paused = true)]
    async fn buffers_subscribes_until_ready_and_flushes_in_order() {
        let (handle, remote) = spawn_public();

        handle
            .subscribe("tickers", &[("instId", "BTC-USDT")], |_| {})
            .unwrap();
        handle
            .subscribe("trades", &[("instId", "ETH-USDT")], |_| {})
            .unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(remote.sent().is_empty(), "no frames before ready");

        handle.connect().await.unwrap();
        wait_until(|| remote.sent().len() == 2).await;

        let sent = remote.sent();
        assert!(sent[0].contains("subscribe") && sent[0].contains("tickers"));
        assert!(sent[1].contains("subscribe") && sent[1].contains("trades"));
        assert_eq!(handle.state(), ConnectionState::Ready);

        // Flushed exactly once
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(remote.sent().len(), 2);

        handle.close().await;
        assert_eq!(handle.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn private_session_logs_in_before_any_subscribe() {
        let (handle, remote) = spawn_private();
        remote.push(LOGIN_OK);

        handle.subscribe("orders", &[], |_| {}).unwrap();
        handle.connect().await.unwrap();

        wait_until(|| remote.sent().len() == 2).await;
        let sent = remote.sent();
        assert!(sent[0].contains(r#""op":"login""#));
        assert!(sent[0].contains(r#""apiKey":"k""#));
        assert!(sent[1].contains("orders"));
        assert_eq!(handle.state(), ConnectionState::Ready);

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn login_failure_surfaces_and_session_stays_disconnected() {
        let (handle, remote) = spawn_private();
        remote.push(r#"{"event":"login","code":"1","msg":"invalid sign"}"#);

        handle.subscribe("orders", &[], |_| {}).unwrap();
        let err = handle.connect().await.unwrap_err();

        assert!(matches!(err, BlofinError::Authentication(_)));
        assert_eq!(handle.state(), ConnectionState::Disconnected);
        // Only the login frame went out, never a subscribe
        assert_eq!(remote.sent().len(), 1);
        assert!(remote.sent()[0].contains("login"));

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribe_replaces_handler_without_duplicate() {
        let (handle, remote) = spawn_public();
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&first);
        handle
            .subscribe("tickers", &[("instId", "BTC-USDT")], move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        handle.connect().await.unwrap();
        wait_until(|| remote.sent().len() == 1).await;

        let counter = Arc::clone(&second);
        handle
            .subscribe("tickers", &[("instId", "BTC-USDT")], move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        remote.push(
            r#"{"arg":{"channel":"tickers","instId":"BTC-USDT"},"data":[{"last":"50000"}]}"#,
        );
        wait_until(|| second.load(Ordering::SeqCst) == 1).await;

        assert_eq!(first.load(Ordering::SeqCst), 0, "old handler replaced");
        // Replacement reuses the existing server-side subscription
        assert_eq!(remote.sent().len(), 1);

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_replays_subscriptions_in_registration_order() {
        let (handle, remote) = spawn_private();
        let orders_seen = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&orders_seen);
        handle
            .subscribe("orders", &[], move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        handle.subscribe("positions", &[], |_| {}).unwrap();
        handle.subscribe("account", &[], |_| {}).unwrap();

        remote.push(LOGIN_OK);
        handle.connect().await.unwrap();
        wait_until(|| remote.sent().len() == 4).await;
        assert_eq!(remote.connects(), 1);

        remote.clear_sent();
        remote.drop_connection();
        remote.push(LOGIN_OK);

        wait_until(|| remote.connects() == 2 && remote.sent().len() == 4).await;
        let sent = remote.sent();
        assert!(sent[0].contains("login"));
        assert!(sent[1].contains("orders"));
        assert!(sent[2].contains("positions"));
        assert!(sent[3].contains("account"));
        wait_until(|| handle.state() == ConnectionState::Ready).await;

        // Handlers survive the reconnect and fire once per frame
        remote.push(r#"{"arg":{"channel":"orders"},"data":[{"orderId":"1"}]}"#);
        wait_until(|| orders_seen.load(Ordering::SeqCst) == 1).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(orders_seen.load(Ordering::SeqCst), 1);

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_timeout_triggers_exactly_one_reconnect() {
        let (handle, remote) = spawn_public();
        handle.connect().await.unwrap();
        assert_eq!(remote.connects(), 1);

        tokio::time::advance(Duration::from_secs(15)).await;
        wait_until(|| remote.sent().iter().any(|f| f == "ping")).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        wait_until(|| remote.connects() == 2).await;
        wait_until(|| handle.state() == ConnectionState::Ready).await;
        assert_eq!(remote.connects(), 2);

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn pong_within_grace_keeps_the_connection() {
        let (handle, remote) = spawn_public();
        handle.connect().await.unwrap();

        tokio::time::advance(Duration::from_secs(15)).await;
        wait_until(|| remote.sent().iter().any(|f| f == "ping")).await;

        remote.push("pong");
        tokio::time::sleep(Duration::from_millis(5)).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(remote.connects(), 1);
        assert_eq!(handle.state(), ConnectionState::Ready);

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn unmatched_and_error_frames_go_to_event_handler() {
        let (handle, remote) = spawn_public();
        let events = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&events);
        handle
            .on_event(move |event| {
                sink.lock().unwrap().push(format!("{event:?}"));
            })
            .unwrap();
        handle.connect().await.unwrap();

        remote.push(r#"{"arg":{"channel":"nobody-home"},"data":[]}"#);
        remote.push(r#"{"event":"error","code":"60012","msg":"Invalid request"}"#);

        wait_until(|| {
            let seen = events.lock().unwrap();
            seen.iter().any(|e| e.contains("Unmatched"))
                && seen.iter().any(|e| e.contains("60012"))
        })
        .await;

        // Error frames never tear the connection down
        assert_eq!(remote.connects(), 1);
        assert_eq!(handle.state(), ConnectionState::Ready);

        handle.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_while_ready_sends_immediately() {
        let (handle, remote) = spawn_public();
        handle.connect().await.unwrap();

        handle
            .subscribe("funding-rate", &[("instId", "BTC-USDT")], |_| {})
            .unwrap();
        wait_until(|| remote.sent().len() == 1).await;
        assert!(remote.sent()[0].contains("funding-rate"));

        handle.unsubscribe("funding-rate", &[("instId", "BTC-USDT")]).unwrap();
        wait_until(|| remote.sent().len() == 2).await;
        assert!(remote.sent()[1].contains("unsubscribe"));

        handle.close().await;
    }
}
