//! Startup barrier that waits for peer connections before business logic
//! runs.

use crate::endpoint::{ConnectionEvent, MonitorEvent};
use crate::shutdown::Trigger;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Errors that can occur while assembling the readiness gate.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Required builder attribute was not provided.
    #[error("Missing required attribute: {}.", _0)]
    MissingRequiredAttribute(String),
}

/// Aggregates connection events from every monitored endpoint.
///
/// The gate releases once all monitored endpoints have reported a peer
/// connection, then keeps draining events for the life of the process so
/// later disconnects reach the shutdown control channel.
pub struct Gate {
    /// Merged connection-event stream from every endpoint monitor.
    events: UnboundedReceiver<MonitorEvent>,
    /// Number of distinct connection signals required before release.
    expected: usize,
    /// Shutdown control channel disconnects are forwarded to.
    control: UnboundedSender<Trigger>,
}

impl Gate {
    /// Consumes connection events until every monitor has gone away.
    ///
    /// `released` fires exactly once when `expected` connection signals
    /// have been counted; spurious signals arriving afterwards are
    /// ignored. Every disconnect signal, before or after release, is
    /// translated into a shutdown trigger.
    pub async fn run(mut self, released: oneshot::Sender<()>) {
        let mut connected = 0usize;
        let mut released = Some(released);

        while let Some(observed) = self.events.recv().await {
            match observed.event {
                ConnectionEvent::Connected => {
                    connected += 1;
                    debug!(
                        "{} reported a peer connection ({}/{})",
                        observed.endpoint, connected, self.expected
                    );
                    if connected >= self.expected {
                        if let Some(release) = released.take() {
                            let _ = release.send(());
                        }
                    }
                }
                ConnectionEvent::Disconnected => {
                    warn!("{} peer disconnected, interrupting execution", observed.endpoint);
                    let _ = self
                        .control
                        .send(Trigger::PeerDisconnected(observed.endpoint));
                }
            }
        }
    }
}

/// Builder for assembling the readiness gate.
#[derive(Default)]
pub struct GateBuilder {
    events: Option<UnboundedReceiver<MonitorEvent>>,
    expected: usize,
    control: Option<UnboundedSender<Trigger>>,
}

impl GateBuilder {
    pub fn new() -> GateBuilder {
        GateBuilder {
            ..Default::default()
        }
    }

    pub fn events(mut self, events: UnboundedReceiver<MonitorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn expected(mut self, expected: usize) -> Self {
        self.expected = expected;
        self
    }

    pub fn control(mut self, control: UnboundedSender<Trigger>) -> Self {
        self.control = Some(control);
        self
    }

    pub fn build(self) -> Result<Gate, Error> {
        Ok(Gate {
            events: self
                .events
                .ok_or_else(|| Error::MissingRequiredAttribute("events".to_string()))?,
            expected: self.expected,
            control: self
                .control
                .ok_or_else(|| Error::MissingRequiredAttribute("control".to_string()))?,
        })
    }
}
