//! The HealthMonitor: one connection, one state machine, many observers.

use std::fmt;
use std::future::pending;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use healthwatch_types::StatusSnapshot;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::config::MonitorConfig;
use crate::detector::has_changed;
use crate::error::{ConfigError, TransportError};
use crate::registry::{SubscriptionId, SubscriptionRegistry};
use crate::retry::RetryTimer;
use crate::transport::{Connector, Session, WebSocketConnector};

/// Phase of the monitor's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Never started, or shut down.
    Idle,
    /// A connection attempt is in flight.
    Connecting,
    /// The session is open and streaming.
    Connected,
    /// The last attempt or session failed; a retry is scheduled.
    Failed,
}

impl ConnectionState {
    /// Whether a connection is being opened or is open.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }

    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// State visible to both the public handle and the driver task.
struct Shared {
    state: Mutex<ConnectionState>,
    settled: AtomicBool,
    registry: SubscriptionRegistry,
}

impl Shared {
    /// Move to `Connecting` unless a connection is already in flight or open.
    fn try_begin_connecting(&self) -> bool {
        let mut state = self.state.lock();
        if state.is_active() {
            return false;
        }
        *state = ConnectionState::Connecting;
        true
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.lock(), next);
        if previous != next {
            debug!(from = %previous, to = %next, "connection state changed");
        }
    }
}

enum Command {
    Connect,
    Shutdown,
}

/// Shared by every strong handle; the last one to go stops the driver.
struct HandleGuard {
    commands: mpsc::UnboundedSender<Command>,
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// Client for the recorder health feed.
///
/// A `HealthMonitor` owns a single connection to the health endpoint and
/// reconnects on its own whenever that connection fails. Status updates are
/// deduplicated and delivered to every subscriber; connection failures
/// arrive through the same channel as synthetic `error` snapshots.
///
/// Handles are cheap to clone and all clones share one connection. The
/// connection closes when [`shutdown`](HealthMonitor::shutdown) is called or
/// the last handle is dropped. Callbacks that need the monitor should
/// capture a [`WeakMonitor`] from [`downgrade`](HealthMonitor::downgrade);
/// a strong handle captured by a callback keeps the connection open for as
/// long as the subscription exists.
///
/// # Example
///
/// ```rust,no_run
/// use healthwatch_client::HealthMonitor;
///
/// #[tokio::main]
/// async fn main() {
///     let monitor = HealthMonitor::builder()
///         .endpoint("ws://127.0.0.1:3030/ws/health")
///         .build()
///         .expect("valid configuration");
///
///     monitor.subscribe(|status| match status {
///         Some(status) => println!("{}: {}", status.status, status.message),
///         None => println!("waiting for first status"),
///     });
///
///     monitor.ensure_started();
///
///     tokio::signal::ctrl_c().await.ok();
///     monitor.shutdown().await;
/// }
/// ```
#[derive(Clone)]
pub struct HealthMonitor {
    shared: Arc<Shared>,
    handle: Arc<HandleGuard>,
    driver: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl HealthMonitor {
    /// Create a builder for configuring the monitor.
    pub fn builder() -> HealthMonitorBuilder {
        HealthMonitorBuilder::new()
    }

    /// Create a monitor for the given configuration using the WebSocket
    /// transport.
    ///
    /// Must be called from within a tokio runtime. The monitor stays idle
    /// until [`ensure_started`](HealthMonitor::ensure_started) is called.
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        Self::builder().config(config).build()
    }

    pub(crate) fn spawn(config: &MonitorConfig, connector: Arc<dyn Connector>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(ConnectionState::Idle),
            settled: AtomicBool::new(false),
            registry: SubscriptionRegistry::new(),
        });
        let (commands, command_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            shared: shared.clone(),
            connector,
            commands: command_rx,
            session: None,
            retry: RetryTimer::new(config.retry_interval),
            connect_timeout: config.connect_timeout,
        };
        let handle = tokio::spawn(driver.run());

        Self {
            shared,
            handle: Arc::new(HandleGuard { commands }),
            driver: Arc::new(Mutex::new(Some(handle))),
        }
    }

    /// Make sure a connection attempt is in flight or a connection is open.
    ///
    /// Idempotent and safe to call from any thread: while the monitor is
    /// connecting or connected this does nothing, so concurrent callers never
    /// open a second connection. Calling it while `Failed` reconnects right
    /// away without waiting for the retry timer.
    pub fn ensure_started(&self) {
        let mut state = self.shared.state.lock();
        if state.is_active() {
            return;
        }

        let previous = *state;
        *state = ConnectionState::Connecting;
        if self.handle.commands.send(Command::Connect).is_err() {
            *state = previous;
            warn!("health monitor is shut down; ignoring start request");
        }
    }

    /// The last accepted snapshot, or `None` if nothing has arrived yet.
    pub fn current_status(&self) -> Option<StatusSnapshot> {
        self.shared.registry.latest()
    }

    /// Whether the connection is in the `Failed` state.
    pub fn is_down(&self) -> bool {
        *self.shared.state.lock() == ConnectionState::Failed
    }

    /// Whether no connection outcome (success or failure) has been seen yet.
    pub fn is_loading(&self) -> bool {
        !self.shared.settled.load(Ordering::Acquire)
    }

    /// Current connection phase.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Register an observer.
    ///
    /// The callback is invoked once before this returns, with the current
    /// status (`None` if nothing has been received), and then once per
    /// accepted snapshot, in order. Callbacks run on the monitor's driver
    /// task and must not block.
    ///
    /// Only snapshots are delivered. A successful reconnect is not itself a
    /// delivery: after a failure the current status stays the synthetic
    /// error until the recorder sends its next snapshot, while
    /// [`is_down`](HealthMonitor::is_down) turns `false` as soon as the
    /// connection is open. To read connection state from a callback, capture
    /// a [`WeakMonitor`]:
    ///
    /// ```rust,no_run
    /// # async fn example(monitor: healthwatch_client::HealthMonitor) {
    /// let observer = monitor.downgrade();
    /// monitor.subscribe(move |status| {
    ///     if let Some(monitor) = observer.upgrade() {
    ///         println!("down={} status={:?}", monitor.is_down(), status);
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&StatusSnapshot>) + Send + Sync + 'static,
    {
        self.shared.registry.subscribe(callback)
    }

    /// Remove an observer. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.registry.unsubscribe(id)
    }

    /// Number of registered observers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Close the connection, cancel any pending retry, and stop the driver.
    ///
    /// Afterwards the monitor is `Idle` and `ensure_started` has no effect.
    pub async fn shutdown(&self) {
        let _ = self.handle.commands.send(Command::Shutdown);
        let handle = self.driver.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Whether two handles refer to the same monitor.
    pub fn ptr_eq(&self, other: &HealthMonitor) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Create a handle that does not keep the connection alive.
    pub fn downgrade(&self) -> WeakMonitor {
        WeakMonitor {
            shared: Arc::downgrade(&self.shared),
            handle: Arc::downgrade(&self.handle),
            driver: Arc::downgrade(&self.driver),
        }
    }
}

/// Non-owning reference to a [`HealthMonitor`].
///
/// Safe to capture in subscriber callbacks: it does not count towards the
/// handles that keep the connection open.
#[derive(Clone)]
pub struct WeakMonitor {
    shared: Weak<Shared>,
    handle: Weak<HandleGuard>,
    driver: Weak<Mutex<Option<JoinHandle<()>>>>,
}

impl WeakMonitor {
    /// The monitor, if any strong handle is still alive.
    pub fn upgrade(&self) -> Option<HealthMonitor> {
        Some(HealthMonitor {
            handle: self.handle.upgrade()?,
            shared: self.shared.upgrade()?,
            driver: self.driver.upgrade()?,
        })
    }
}

impl fmt::Debug for WeakMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakMonitor")
            .field("alive", &(self.handle.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthMonitor")
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Builder for configuring a HealthMonitor.
#[derive(Debug, Default)]
pub struct HealthMonitorBuilder {
    config: MonitorConfig,
    connector: Option<Arc<dyn Connector>>,
}

impl HealthMonitorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all settings at once.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the WebSocket URL of the health feed.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the delay before reconnecting after a failure.
    ///
    /// Defaults to 2 seconds if not specified.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.config.retry_interval = interval;
        self
    }

    /// Set the upper bound on a single connection attempt.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Use a custom transport instead of the WebSocket connector.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Build the monitor and spawn its driver task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> Result<HealthMonitor, ConfigError> {
        self.config.validate()?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(WebSocketConnector::new(self.config.endpoint.clone())));
        Ok(HealthMonitor::spawn(&self.config, connector))
    }
}

/// Background task that owns the session and the retry timer.
///
/// Commands, payloads and timer expiry are handled one at a time, so the
/// state machine never sees two transport events concurrently.
struct Driver {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    commands: mpsc::UnboundedReceiver<Command>,
    session: Option<Box<dyn Session>>,
    retry: RetryTimer,
    connect_timeout: Duration,
}

impl Driver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Connect) => self.connect().await,
                    Some(Command::Shutdown) | None => break,
                },
                () = self.retry.fired() => self.on_retry().await,
                payload = next_payload(&mut self.session) => self.on_payload(payload).await,
            }
        }

        // Late start requests must fail to send rather than strand the state
        // in Connecting.
        self.commands.close();
        self.stop().await;
    }

    async fn connect(&mut self) {
        let endpoint = self.connector.description();
        info!(endpoint, "connecting to health endpoint");

        let attempt = tokio::time::timeout(self.connect_timeout, self.connector.connect()).await;
        match attempt {
            Ok(Ok(session)) => {
                self.session = Some(session);
                if self.retry.cancel() {
                    debug!("pending reconnect cancelled");
                }
                self.shared.set_state(ConnectionState::Connected);
                self.shared.settled.store(true, Ordering::Release);
                info!(endpoint, "connected to health endpoint");
            }
            Ok(Err(e)) => self.fail(e),
            Err(_) => self.fail(TransportError::Timeout(self.connect_timeout)),
        }
    }

    async fn on_retry(&mut self) {
        if self.shared.try_begin_connecting() {
            debug!("retry timer fired");
            self.connect().await;
        } else {
            debug!("retry timer fired while a connection is in flight");
        }
    }

    async fn on_payload(&mut self, payload: Option<Result<String, TransportError>>) {
        match payload {
            Some(Ok(text)) => match serde_json::from_str::<StatusSnapshot>(&text) {
                Ok(snapshot) => self.accept(snapshot),
                Err(e) => self.drop_session(e.into()).await,
            },
            Some(Err(e)) => self.drop_session(e).await,
            None => self.drop_session(TransportError::Closed).await,
        }
    }

    fn accept(&self, snapshot: StatusSnapshot) {
        let registry = &self.shared.registry;
        if has_changed(registry.latest().as_ref(), &snapshot) {
            debug!(status = %snapshot.status, code = snapshot.status_code, "status changed");
            registry.broadcast(snapshot);
        } else {
            trace!("duplicate status suppressed");
        }
    }

    async fn drop_session(&mut self, error: TransportError) {
        if let Some(mut session) = self.session.take() {
            // The peer is still there after a bad payload; say goodbye.
            if matches!(error, TransportError::Malformed(_)) {
                session.close().await;
            }
        }
        self.fail(error);
    }

    fn fail(&mut self, error: TransportError) {
        let endpoint = self.connector.description();
        if error.is_establishment() {
            info!(endpoint, error = %error, "health endpoint unreachable");
        } else {
            warn!(endpoint, error = %error, "health connection lost");
        }

        self.shared.set_state(ConnectionState::Failed);
        self.shared.settled.store(true, Ordering::Release);
        self.shared
            .registry
            .broadcast(StatusSnapshot::transport_error(error.to_string()));

        if self.retry.arm() {
            debug!(retry_in = ?self.retry.interval(), "reconnect scheduled");
        }
    }

    async fn stop(&mut self) {
        self.retry.cancel();
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        self.shared.set_state(ConnectionState::Idle);
        info!("health monitor stopped");
    }
}

async fn next_payload(
    session: &mut Option<Box<dyn Session>>,
) -> Option<Result<String, TransportError>> {
    match session.as_mut() {
        Some(session) => session.next_payload().await,
        None => pending().await,
    }
}
