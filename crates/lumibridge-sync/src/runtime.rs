//! Broker event loop and poll timer.

use std::sync::Arc;
use std::time::Duration;

use lumibridge_devices::DeviceAdapter;
use rumqttc::{Event, EventLoop, Packet};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::broker::BrokerPublisher;
use crate::engine::SyncEngine;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Broker link as seen by the poll timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Connected, announcements in flight
    DiscoveryPending,
    /// Announced and subscribed, no tick run yet
    Subscribed,
    Polling,
}

impl LinkState {
    pub fn on_connack(self) -> Self {
        LinkState::DiscoveryPending
    }

    pub fn on_announced(self) -> Self {
        match self {
            LinkState::DiscoveryPending => LinkState::Subscribed,
            other => other,
        }
    }

    pub fn on_tick(self) -> Self {
        match self {
            LinkState::Subscribed => LinkState::Polling,
            other => other,
        }
    }

    pub fn on_link_error(self) -> Self {
        LinkState::Disconnected
    }

    /// Whether a poll tick may run in this state.
    pub fn accepts_ticks(self) -> bool {
        matches!(self, LinkState::Subscribed | LinkState::Polling)
    }
}

fn transition(state: &watch::Sender<LinkState>, f: impl FnOnce(LinkState) -> LinkState) -> LinkState {
    state.send_if_modified(|current| {
        let next = f(*current);
        if next != *current {
            debug!(category = "mqtt", from = ?current, to = ?next, "Link state changed");
            *current = next;
            true
        } else {
            false
        }
    });
    *state.borrow()
}

/// Drive the bridge until the future is dropped.
///
/// Every `ConnAck` replays discovery and subscriptions; inbound publishes and
/// poll ticks each run in their own task. Connection errors are logged and
/// the event loop is polled again after a short delay, which lets `rumqttc`
/// reconnect.
pub async fn run<A, P>(engine: Arc<SyncEngine<A, P>>, mut eventloop: EventLoop, poll_interval: Duration)
where
    A: DeviceAdapter + 'static,
    P: BrokerPublisher + 'static,
{
    let (state, _) = watch::channel(LinkState::Disconnected);
    let state = Arc::new(state);

    let poller = tokio::spawn(poll_loop(engine.clone(), state.clone(), poll_interval));
    let _poller = AbortOnDrop(poller);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(category = "mqtt", "Connected to broker");
                transition(&state, LinkState::on_connack);

                let engine = engine.clone();
                let state = state.clone();
                tokio::spawn(async move {
                    let announced = engine.announce_all().await;
                    debug!(category = "mqtt", announced, "Discovery replay finished");
                    transition(&state, LinkState::on_announced);
                });
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let engine = engine.clone();
                tokio::spawn(async move {
                    engine.handle_message(&publish.topic, &publish.payload).await;
                });
            }
            Ok(_) => {}
            Err(e) => {
                warn!(category = "mqtt", "Broker connection error: {}", e);
                transition(&state, LinkState::on_link_error);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

async fn poll_loop<A, P>(
    engine: Arc<SyncEngine<A, P>>,
    state: Arc<watch::Sender<LinkState>>,
    poll_interval: Duration,
) where
    A: DeviceAdapter + 'static,
    P: BrokerPublisher + 'static,
{
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let current = transition(&state, LinkState::on_tick);
        if !current.accepts_ticks() {
            debug!(category = "poll", state = ?current, "Skipping poll tick");
            continue;
        }

        let engine = engine.clone();
        tokio::spawn(async move { engine.poll_tick().await });
    }
}

struct AbortOnDrop(tokio::task::JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
