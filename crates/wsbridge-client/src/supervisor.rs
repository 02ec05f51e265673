//! Connection supervisor.
//!
//! The supervisor owns the single WebSocket connection, the subscription
//! table and the current config. It runs as one task that processes host
//! commands, socket events and timer firings strictly one at a time:
//! - Configure: validate the URL, close the old socket, open a new one
//! - Socket open/message/ping/close/error handling
//! - Reconnect (5s, single outstanding timer) and heartbeat supervision
//! - Variable projection and message routing into the [`Host`]

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use wsbridge_core::{
    ConfigError, ConnectionStatus, EndpointConfig, Host, Subscription, SubscriptionId, SubscriptionTable,
    VariableProjector,
};
use wsbridge_protocol::{decode_frame, format_command, MessageRouter};

use crate::connection::{Connection, SocketEvent, NORMAL_CLOSURE};
use crate::error::{ClientError, SendError};
use crate::timer::{TimerId, TimerSlot};

/// Delay before a reconnect attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Options for the supervisor itself (not part of the host config).
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Delay before a reconnect attempt.
    pub reconnect_delay: Duration,
    /// Capacity of the command channel.
    pub command_buffer: usize,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
            command_buffer: 1024,
        }
    }
}

/// Commands sent from handles to the supervisor.
#[derive(Debug)]
enum Command {
    Configure(EndpointConfig),
    Subscribe {
        id: SubscriptionId,
        subscription: Subscription,
    },
    Unsubscribe(SubscriptionId),
    Send {
        text: String,
        reply: oneshot::Sender<Result<(), SendError>>,
    },
    Status(oneshot::Sender<ConnectionStatus>),
    Destroy(oneshot::Sender<()>),
}

/// Events produced by connection tasks and timers.
#[derive(Debug)]
pub(crate) enum Event {
    Socket { generation: u64, event: SocketEvent },
    ReconnectDue(TimerId),
    HeartbeatExpired(TimerId),
}

/// Cloneable handle for driving a running supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorHandle {
    commands: mpsc::Sender<Command>,
}

impl SupervisorHandle {
    /// Apply a new config (host init or config update).
    ///
    /// The first call after construction or [`destroy`](Self::destroy)
    /// initializes the instance and always connects. Later calls reconnect
    /// only when the URL changed.
    pub async fn configure(&self, config: EndpointConfig) -> Result<(), ClientError> {
        self.command(Command::Configure(config)).await
    }

    /// Bind subscription `id` to `variable`, selecting `subpath`.
    pub async fn subscribe(
        &self,
        id: impl Into<SubscriptionId>,
        variable: &str,
        subpath: &str,
    ) -> Result<(), ClientError> {
        self.command(Command::Subscribe {
            id: id.into(),
            subscription: Subscription::new(variable, subpath),
        })
        .await
    }

    /// Remove subscription `id`.
    pub async fn unsubscribe(&self, id: impl Into<SubscriptionId>) -> Result<(), ClientError> {
        self.command(Command::Unsubscribe(id.into())).await
    }

    /// Send a command with the configured termination appended.
    ///
    /// Resolves once the frame is written, or with the reason it was not.
    pub async fn send_command(&self, text: &str) -> Result<(), SendError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Send {
                text: text.to_string(),
                reply,
            })
            .await
            .map_err(|_| SendError::Stopped)?;
        rx.await.map_err(|_| SendError::Stopped)?
    }

    /// Current connection status.
    pub async fn status(&self) -> Result<ConnectionStatus, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Status(reply)).await?;
        rx.await.map_err(|_| ClientError::Stopped)
    }

    /// Tear down: cancel timers and close the socket. Idempotent.
    pub async fn destroy(&self) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.command(Command::Destroy(reply)).await?;
        rx.await.map_err(|_| ClientError::Stopped)
    }

    async fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::Stopped)
    }
}

/// Owns the connection lifecycle for one bridge instance.
pub struct ConnectionSupervisor<H: Host> {
    host: H,
    options: SupervisorOptions,
    config: Option<EndpointConfig>,
    subscriptions: SubscriptionTable,
    status: ConnectionStatus,
    initialized: bool,
    connection: Option<Connection>,
    generation: u64,
    reconnect_timer: TimerSlot,
    heartbeat_timer: TimerSlot,
    commands_tx: Option<mpsc::Sender<Command>>,
    commands_rx: mpsc::Receiver<Command>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
}

impl<H: Host> ConnectionSupervisor<H> {
    /// Create a supervisor writing through `host`.
    pub fn new(host: H, options: SupervisorOptions) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(options.command_buffer.max(1));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            host,
            options,
            config: None,
            subscriptions: SubscriptionTable::new(),
            status: ConnectionStatus::Unknown,
            initialized: false,
            connection: None,
            generation: 0,
            reconnect_timer: TimerSlot::new(),
            heartbeat_timer: TimerSlot::new(),
            commands_tx: Some(commands_tx),
            commands_rx,
            events_tx,
            events_rx,
        }
    }

    /// Get a handle for driving the supervisor.
    ///
    /// Handles must be taken before [`run`](Self::run).
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            commands: self
                .commands_tx
                .clone()
                .unwrap_or_else(|| mpsc::channel(1).0),
        }
    }

    /// Process commands and events until every handle is dropped.
    pub async fn run(mut self) {
        self.commands_tx = None;

        loop {
            tokio::select! {
                command = self.commands_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
        }

        self.destroy();
        debug!("Supervisor stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> (SupervisorHandle, JoinHandle<()>) {
        let handle = self.handle();
        (handle, tokio::spawn(self.run()))
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Configure(config) => self.configure(config),
            Command::Subscribe { id, subscription } => self.subscribe(id, subscription),
            Command::Unsubscribe(id) => self.unsubscribe(&id),
            Command::Send { text, reply } => self.send(&text, reply),
            Command::Status(reply) => {
                let _ = reply.send(self.status);
            }
            Command::Destroy(reply) => {
                self.destroy();
                let _ = reply.send(());
            }
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Socket { generation, event } => {
                if self.connection.as_ref().map(Connection::generation) != Some(generation) {
                    trace!("Ignoring {:?} from replaced socket {}", event, generation);
                    return;
                }
                self.handle_socket_event(event);
            }
            Event::ReconnectDue(id) => {
                if self.reconnect_timer.fire(id) {
                    self.init_websocket();
                }
            }
            Event::HeartbeatExpired(id) => {
                if self.heartbeat_timer.fire(id) {
                    debug!("Connection timed out");
                    if let Some(connection) = &self.connection {
                        connection.terminate();
                    }
                }
            }
        }
    }

    fn handle_socket_event(&mut self, event: SocketEvent) {
        match event {
            SocketEvent::Opened => {
                self.set_status(ConnectionStatus::Ok, None);
                debug!("Connection opened");
                if self.config().is_some_and(|c| c.reset_variables) {
                    self.project_variables(None, true);
                }
            }
            SocketEvent::Frame(frame) => {
                let Some(config) = &self.config else {
                    return;
                };
                if config.debug_messages {
                    debug!("Message received: {}", frame);
                }
                let payload = decode_frame(&frame);
                let values = MessageRouter::new(&self.subscriptions, &config.fbprefix, &config.fbsuffix)
                    .route(&payload, chrono::Utc::now().timestamp_millis());
                self.host.set_variable_values(&values);
            }
            SocketEvent::Ping => self.heartbeat(),
            SocketEvent::Error(message) => error!("WebSocket error: {}", message),
            SocketEvent::Closed { code } => {
                self.heartbeat_timer.cancel();
                self.connection = None;
                debug!("Connection closed with code {}", code);
                let message = format!("Connection closed with code {}", code);
                self.set_status(ConnectionStatus::Disconnected, Some(&message));
                self.maybe_reconnect();
            }
        }
    }

    fn configure(&mut self, mut config: EndpointConfig) {
        if let Err(e) = config.validate() {
            warn!("{}", e);
        }
        if config.timeout.is_empty() {
            config.timeout = EndpointConfig::default().timeout;
        }

        let url_changed = self.config.as_ref().map_or(true, |old| old.url != config.url);
        self.config = Some(config);

        if !self.initialized {
            self.init_websocket();
            self.initialized = true;
            self.project_variables(None, true);
        } else if url_changed {
            self.init_websocket();
        }
    }

    /// (Re)establish the connection from the current config.
    fn init_websocket(&mut self) {
        self.reconnect_timer.cancel();

        let endpoint = self
            .config()
            .map(|c| c.endpoint().map(str::to_string))
            .unwrap_or(Err(ConfigError::MissingUrl));
        let url = match endpoint {
            Ok(url) => url,
            Err(e) => {
                warn!("{}", e);
                self.close_connection();
                self.set_status(
                    ConnectionStatus::BadConfig,
                    Some("WS URL is not defined or invalid"),
                );
                return;
            }
        };

        self.set_status(ConnectionStatus::Connecting, None);
        self.close_connection();

        self.generation += 1;
        info!("Connecting to {}", url);
        self.connection = Some(Connection::open(&url, self.generation, self.events_tx.clone()));
    }

    /// Drop the current socket, then close it gracefully.
    fn close_connection(&mut self) {
        self.heartbeat_timer.cancel();
        if let Some(connection) = self.connection.take() {
            connection.close(NORMAL_CLOSURE);
        }
    }

    fn maybe_reconnect(&mut self) {
        if self.initialized && self.config().is_some_and(|c| c.reconnect) {
            debug!("Reconnecting in {:?}", self.options.reconnect_delay);
            self.reconnect_timer
                .schedule(self.options.reconnect_delay, &self.events_tx, Event::ReconnectDue);
        }
    }

    fn heartbeat(&mut self) {
        let Some(config) = self.config.as_ref() else {
            return;
        };
        if !(self.initialized && config.heartbeat) {
            return;
        }
        if config.debug_messages {
            debug!("Heartbeat received");
        }
        let timeout = config.heartbeat_timeout();
        self.heartbeat_timer
            .schedule(timeout, &self.events_tx, Event::HeartbeatExpired);
    }

    fn subscribe(&mut self, id: SubscriptionId, subscription: Subscription) {
        self.subscriptions.subscribe(id.clone(), subscription);
        if self.initialized {
            self.project_variables(Some(&id), true);
        }
    }

    fn unsubscribe(&mut self, id: &SubscriptionId) {
        if self.subscriptions.unsubscribe(id).is_some() && self.initialized {
            self.project_variables(None, false);
        }
    }

    /// Push variable definitions, and reset defaults when `reset` is
    /// requested and enabled in the config.
    fn project_variables(&mut self, caller: Option<&SubscriptionId>, reset: bool) {
        let reset = reset && self.config().is_some_and(|c| c.reset_variables);
        let projection = VariableProjector::new(reset).project(&self.subscriptions, caller);

        self.host.set_variable_definitions(&projection.definitions);
        if !projection.defaults.is_empty() {
            self.host.set_variable_values(&projection.defaults);
        }
    }

    fn send(&mut self, text: &str, reply: oneshot::Sender<Result<(), SendError>>) {
        let (termination, debug) = self
            .config()
            .map(|c| (c.append_new_line, c.debug_messages))
            .unwrap_or_default();

        if debug {
            debug!("Sending message: {}", text);
        }

        let framed = format_command(text, termination);
        match &self.connection {
            Some(connection) => connection.send(framed, debug, reply),
            None => {
                if debug {
                    error!("Sending message failed.");
                }
                let _ = reply.send(Err(SendError::NotConnected));
            }
        }
    }

    fn destroy(&mut self) {
        self.initialized = false;
        self.reconnect_timer.cancel();
        self.close_connection();
    }

    fn set_status(&mut self, status: ConnectionStatus, message: Option<&str>) {
        self.status = status;
        self.host.update_status(status, message);
    }

    fn config(&self) -> Option<&EndpointConfig> {
        self.config.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use wsbridge_core::{VariableDefinition, VariableValue, VariableValues};

    #[derive(Debug, Default)]
    struct Recorded {
        statuses: Vec<(ConnectionStatus, Option<String>)>,
        definitions: Vec<Vec<String>>,
        values: Vec<VariableValues>,
    }

    #[derive(Clone, Default)]
    struct RecordingHost(Arc<Mutex<Recorded>>);

    impl Host for RecordingHost {
        fn update_status(&mut self, status: ConnectionStatus, message: Option<&str>) {
            self.0
                .lock()
                .unwrap()
                .statuses
                .push((status, message.map(str::to_string)));
        }

        fn set_variable_definitions(&mut self, definitions: &[VariableDefinition]) {
            let names = definitions.iter().map(|d| d.variable_id.clone()).collect();
            self.0.lock().unwrap().definitions.push(names);
        }

        fn set_variable_values(&mut self, values: &VariableValues) {
            self.0.lock().unwrap().values.push(values.clone());
        }
    }

    fn start() -> (SupervisorHandle, RecordingHost) {
        let host = RecordingHost::default();
        let (handle, _) = ConnectionSupervisor::new(host.clone(), SupervisorOptions::default()).spawn();
        (handle, host)
    }

    #[tokio::test]
    async fn test_invalid_url_reports_bad_config() {
        let (handle, host) = start();

        handle
            .configure(EndpointConfig::with_url("http://localhost"))
            .await
            .unwrap();
        assert_eq!(handle.status().await.unwrap(), ConnectionStatus::BadConfig);

        let recorded = host.0.lock().unwrap();
        assert_eq!(
            recorded.statuses,
            vec![(
                ConnectionStatus::BadConfig,
                Some("WS URL is not defined or invalid".to_string())
            )]
        );
    }

    #[tokio::test]
    async fn test_send_without_connection_fails() {
        let (handle, _) = start();

        assert_eq!(handle.send_command("ping").await, Err(SendError::NotConnected));

        handle.configure(EndpointConfig::default()).await.unwrap();
        assert_eq!(handle.send_command("ping").await, Err(SendError::NotConnected));
    }

    #[tokio::test]
    async fn test_subscriptions_project_definitions() {
        let (handle, host) = start();

        handle.subscribe("fb1", "temp", "a.b").await.unwrap();
        // nothing is pushed before init
        assert!(host.0.lock().unwrap().definitions.is_empty());

        handle.configure(EndpointConfig::default()).await.unwrap();
        handle.subscribe("fb2", "raw", "").await.unwrap();
        handle.subscribe("fb3", "bad name", "x").await.unwrap();
        handle.unsubscribe("fb1").await.unwrap();
        handle.status().await.unwrap();

        let recorded = host.0.lock().unwrap();
        assert_eq!(
            recorded.definitions,
            vec![
                vec!["lastDataReceived".to_string(), "temp".to_string()],
                vec!["lastDataReceived".to_string(), "temp".to_string(), "raw".to_string()],
                vec!["lastDataReceived".to_string(), "temp".to_string(), "raw".to_string()],
                vec!["lastDataReceived".to_string(), "raw".to_string()],
            ]
        );

        // init resets every variable, a new subscription only its own
        assert_eq!(recorded.values.len(), 2);
        assert_eq!(recorded.values[0].get("temp"), Some(&VariableValue::empty()));
        assert_eq!(recorded.values[1].get("raw"), Some(&VariableValue::empty()));
        assert_eq!(recorded.values[1].len(), 1);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let (handle, _) = start();

        handle.configure(EndpointConfig::default()).await.unwrap();
        handle.destroy().await.unwrap();
        handle.destroy().await.unwrap();
        assert_eq!(handle.send_command("x").await, Err(SendError::NotConnected));
    }
}
