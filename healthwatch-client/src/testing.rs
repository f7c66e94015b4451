//! Scripted transport for driving the monitor in tests.

use std::collections::VecDeque;
use std::future::pending;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::error::TransportError;
use crate::monitor::{ConnectionState, HealthMonitor};
use crate::transport::{Connector, Session};

pub(crate) type Feed = UnboundedSender<Result<String, TransportError>>;

#[derive(Debug)]
enum Outcome {
    Accept {
        payloads: UnboundedReceiver<Result<String, TransportError>>,
        closed: Arc<AtomicBool>,
    },
    Refuse(String),
    Hang,
}

/// Test side of a scripted session. Dropping it closes the session from the
/// peer's end.
pub(crate) struct SessionHandle {
    pub feed: Feed,
    closed: Arc<AtomicBool>,
}

impl SessionHandle {
    /// Whether the monitor closed the session.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Connector that replays queued outcomes, refusing once the queue is empty.
#[derive(Debug, Default)]
pub(crate) struct ScriptedConnector {
    script: Mutex<VecDeque<Outcome>>,
    attempts: AtomicUsize,
}

impl ScriptedConnector {
    pub fn accept(&self) -> SessionHandle {
        let (feed, payloads) = unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        self.script.lock().push_back(Outcome::Accept {
            payloads,
            closed: closed.clone(),
        });
        SessionHandle { feed, closed }
    }

    pub fn refuse(&self, reason: &str) {
        self.script
            .lock()
            .push_back(Outcome::Refuse(reason.to_string()));
    }

    pub fn hang(&self) {
        self.script.lock().push_back(Outcome::Hang);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<Box<dyn Session>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let outcome = self.script.lock().pop_front();
        match outcome {
            Some(Outcome::Accept { payloads, closed }) => {
                Ok(Box::new(ScriptedSession { payloads, closed }))
            }
            Some(Outcome::Refuse(reason)) => Err(TransportError::Connect(reason)),
            Some(Outcome::Hang) => pending().await,
            None => Err(TransportError::Connect("connection refused".into())),
        }
    }

    fn description(&self) -> &str {
        "scripted"
    }
}

struct ScriptedSession {
    payloads: UnboundedReceiver<Result<String, TransportError>>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn next_payload(&mut self) -> Option<Result<String, TransportError>> {
        self.payloads.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.payloads.close();
    }
}

/// Poll until the monitor reaches `state`.
pub(crate) async fn wait_for_state(monitor: &HealthMonitor, state: ConnectionState) {
    while monitor.state() != state {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
