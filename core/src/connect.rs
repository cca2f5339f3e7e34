//! Connection establishment with bounded retry.
//!
//! # Design
//! Connectivity is an event source: the link reports `Up`/`Down`
//! asynchronously and `connect` blocks on those events through a channel
//! subscribed for the duration of the call only. By the time `connect`
//! returns, the subscription is gone, so a later reconnect storm cannot
//! reach a stale caller. The retry loop re-issues attempts immediately, no
//! backoff; a failed attempt at the bound ends the call with exactly one
//! `RetriesExceeded`.

use std::collections::HashMap;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::ConnectError;

/// Credentials handed to the link when asking it to come up.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub network: String,
    pub secret: String,
}

/// Connectivity state change reported by a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Up,
    Down,
}

pub type SubscriptionId = u64;

/// The external connectivity boundary: an event source plus a way to ask
/// for a connection attempt. Attempts complete asynchronously through the
/// subscribed channels.
pub trait NetworkLink {
    fn subscribe(&mut self, events: Sender<LinkEvent>) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
    fn request_connect(&mut self, credentials: &Credentials);
}

/// Where a connection attempt currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Idle,
    Connecting,
    Retrying,
    Connected,
    Failed,
}

/// The retry state machine, separated from the event plumbing so it can be
/// driven directly in tests.
pub struct ConnectionManager {
    state: ConnectState,
    attempts: u32,
    max_retries: u32,
}

impl ConnectionManager {
    pub fn new(max_retries: u32) -> Self {
        Self {
            state: ConnectState::Idle,
            attempts: 0,
            max_retries,
        }
    }

    pub fn begin(&mut self) {
        self.state = ConnectState::Connecting;
    }

    /// Apply one link event and return the resulting state. Attempts grow
    /// monotonically until a success resets them.
    pub fn on_event(&mut self, event: LinkEvent) -> ConnectState {
        self.state = match event {
            LinkEvent::Up => {
                self.attempts = 0;
                ConnectState::Connected
            }
            LinkEvent::Down if self.attempts < self.max_retries => {
                self.attempts += 1;
                ConnectState::Retrying
            }
            LinkEvent::Down => ConnectState::Failed,
        };
        self.state
    }

    pub fn state(&self) -> ConnectState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Bring the link up, retrying failed attempts up to `max_retries` times.
///
/// Blocks with no timeout until the link reports an outcome. The caller
/// must not issue requests after an error.
pub fn connect<L: NetworkLink>(
    link: &mut L,
    credentials: &Credentials,
    max_retries: u32,
) -> Result<(), ConnectError> {
    let (tx, rx) = mpsc::channel();
    let subscription = link.subscribe(tx);
    let outcome = drive(link, &rx, credentials, max_retries);
    link.unsubscribe(subscription);
    outcome
}

fn drive<L: NetworkLink>(
    link: &mut L,
    events: &Receiver<LinkEvent>,
    credentials: &Credentials,
    max_retries: u32,
) -> Result<(), ConnectError> {
    let mut manager = ConnectionManager::new(max_retries);
    manager.begin();
    info!(network = %credentials.network, "connecting");
    link.request_connect(credentials);

    loop {
        let event = events.recv().map_err(|_| ConnectError::LinkClosed)?;
        match manager.on_event(event) {
            ConnectState::Connected => {
                info!("link is up");
                return Ok(());
            }
            ConnectState::Retrying => {
                info!(attempt = manager.attempts(), max_retries, "retrying connect");
                link.request_connect(credentials);
            }
            ConnectState::Failed => {
                error!(attempts = manager.attempts(), "connection failed");
                return Err(ConnectError::RetriesExceeded {
                    attempts: manager.attempts(),
                });
            }
            ConnectState::Idle | ConnectState::Connecting => {}
        }
    }
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

type Subscribers = Arc<Mutex<HashMap<SubscriptionId, Sender<LinkEvent>>>>;

/// Reachability probe standing in for a real network join: each connect
/// request dials the record store's TCP port from a background thread and
/// reports `Up` or `Down` to the current subscribers.
pub struct TcpProbeLink {
    host: String,
    port: u16,
    subscribers: Subscribers,
    next_id: SubscriptionId,
}

impl TcpProbeLink {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: 0,
        }
    }
}

impl NetworkLink for TcpProbeLink {
    fn subscribe(&mut self, events: Sender<LinkEvent>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, events);
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    fn request_connect(&mut self, credentials: &Credentials) {
        let addr = format!("{}:{}", self.host, self.port);
        debug!(network = %credentials.network, addr = %addr, "probing");
        let subscribers = Arc::clone(&self.subscribers);
        thread::spawn(move || {
            let reachable = addr
                .to_socket_addrs()
                .ok()
                .and_then(|mut addrs| addrs.next())
                .map(|sock| TcpStream::connect_timeout(&sock, PROBE_TIMEOUT).is_ok())
                .unwrap_or(false);
            let event = if reachable { LinkEvent::Up } else { LinkEvent::Down };
            let subscribers = subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            for events in subscribers.values() {
                let _ = events.send(event);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Link that fails its first `fail_first` attempts, then succeeds.
    /// Events are delivered synchronously from `request_connect`.
    struct FlakyLink {
        fail_first: u32,
        issued: u32,
        subscribers: Vec<(SubscriptionId, Sender<LinkEvent>)>,
        next_id: SubscriptionId,
    }

    impl FlakyLink {
        fn failing(fail_first: u32) -> Self {
            Self {
                fail_first,
                issued: 0,
                subscribers: Vec::new(),
                next_id: 0,
            }
        }
    }

    impl NetworkLink for FlakyLink {
        fn subscribe(&mut self, events: Sender<LinkEvent>) -> SubscriptionId {
            let id = self.next_id;
            self.next_id += 1;
            self.subscribers.push((id, events));
            id
        }

        fn unsubscribe(&mut self, id: SubscriptionId) {
            self.subscribers.retain(|(sub, _)| *sub != id);
        }

        fn request_connect(&mut self, _credentials: &Credentials) {
            self.issued += 1;
            let event = if self.issued <= self.fail_first {
                LinkEvent::Down
            } else {
                LinkEvent::Up
            };
            for (_, events) in &self.subscribers {
                let _ = events.send(event);
            }
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            network: "testnet".to_string(),
            secret: "hunter2".to_string(),
        }
    }

    #[test]
    fn connects_on_first_attempt() {
        let mut link = FlakyLink::failing(0);
        connect(&mut link, &credentials(), 3).unwrap();
        assert_eq!(link.issued, 1);
    }

    #[test]
    fn retries_within_the_bound_then_succeeds() {
        let mut link = FlakyLink::failing(2);
        connect(&mut link, &credentials(), 3).unwrap();
        assert_eq!(link.issued, 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut link = FlakyLink::failing(u32::MAX);
        let err = connect(&mut link, &credentials(), 3).unwrap_err();
        assert!(matches!(err, ConnectError::RetriesExceeded { attempts: 3 }));
        // One initial attempt plus three retries, never more.
        assert_eq!(link.issued, 4);
    }

    #[test]
    fn zero_retries_fails_on_the_first_drop() {
        let mut link = FlakyLink::failing(u32::MAX);
        let err = connect(&mut link, &credentials(), 0).unwrap_err();
        assert!(matches!(err, ConnectError::RetriesExceeded { attempts: 0 }));
        assert_eq!(link.issued, 1);
    }

    #[test]
    fn no_subscription_outlives_the_call() {
        let mut link = FlakyLink::failing(1);
        connect(&mut link, &credentials(), 3).unwrap();
        assert!(link.subscribers.is_empty());

        let mut link = FlakyLink::failing(u32::MAX);
        let _ = connect(&mut link, &credentials(), 1);
        assert!(link.subscribers.is_empty());
    }

    #[test]
    fn state_machine_transitions() {
        let mut manager = ConnectionManager::new(2);
        assert_eq!(manager.state(), ConnectState::Idle);
        manager.begin();
        assert_eq!(manager.state(), ConnectState::Connecting);

        assert_eq!(manager.on_event(LinkEvent::Down), ConnectState::Retrying);
        assert_eq!(manager.attempts(), 1);
        assert_eq!(manager.on_event(LinkEvent::Down), ConnectState::Retrying);
        assert_eq!(manager.on_event(LinkEvent::Down), ConnectState::Failed);
        assert_eq!(manager.attempts(), 2);
    }

    #[test]
    fn success_resets_the_attempt_counter() {
        let mut manager = ConnectionManager::new(5);
        manager.begin();
        manager.on_event(LinkEvent::Down);
        manager.on_event(LinkEvent::Down);
        assert_eq!(manager.attempts(), 2);
        assert_eq!(manager.on_event(LinkEvent::Up), ConnectState::Connected);
        assert_eq!(manager.attempts(), 0);
    }

    #[test]
    fn probe_link_reports_down_for_an_unreachable_port() {
        // Port 9 on localhost is the discard port; nothing listens there in
        // the test environment, so the probe reports Down and connect gives
        // up after the single allowed attempt.
        let mut link = TcpProbeLink::new("127.0.0.1", 9);
        let err = connect(&mut link, &credentials(), 0).unwrap_err();
        assert!(matches!(err, ConnectError::RetriesExceeded { .. }));
    }

    #[test]
    fn probe_link_reports_up_for_a_listening_socket() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut link = TcpProbeLink::new("127.0.0.1", port);
        connect(&mut link, &credentials(), 0).unwrap();
    }
}
