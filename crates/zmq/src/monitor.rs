//! Per-endpoint connection monitoring.
//!
//! ZeroMQ reports socket lifecycle events on an inproc PAIR stream. Each
//! monitored endpoint gets a dedicated OS thread draining that stream and
//! translating the raw events into tagged `ConnectionEvent`s on the shared
//! readiness channel.

use fluxsink_core::endpoint::{ConnectionEvent, MonitorEvent};
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

/// Errors that can occur while installing a connection monitor.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Monitor registration or pair-socket setup failed.
    #[error(transparent)]
    Socket(#[from] zmq::Error),
}

/// Registers a socket monitor and spawns its listener thread.
///
/// Must run before the socket binds or connects so the first peer
/// connection is observed.
pub(crate) fn spawn(
    context: &zmq::Context,
    socket: &zmq::Socket,
    endpoint: String,
    events: UnboundedSender<MonitorEvent>,
) -> Result<(), Error> {
    let monitor_address = format!("inproc://monitor/{endpoint}");
    socket.monitor(&monitor_address, zmq::SocketEvent::ALL.to_raw() as i32)?;

    let pair = context.socket(zmq::PAIR)?;
    pair.connect(&monitor_address)?;

    std::thread::spawn(move || listen(pair, endpoint, events));
    Ok(())
}

/// Drains monitor events until the monitored socket goes away or the
/// receiving side of the channel is dropped.
fn listen(pair: zmq::Socket, endpoint: String, events: UnboundedSender<MonitorEvent>) {
    loop {
        let frames = match pair.recv_multipart(0) {
            Ok(frames) => frames,
            Err(_) => return,
        };

        let Some(raw) = frames.first().filter(|frame| frame.len() >= 2) else {
            continue;
        };
        let raw_event = u16::from_le_bytes([raw[0], raw[1]]);

        let Some(event) = translate(raw_event) else {
            if is_terminal(raw_event) {
                return;
            }
            trace!("{endpoint} monitor event {raw_event:#06x} ignored");
            continue;
        };

        if events
            .send(MonitorEvent {
                endpoint: endpoint.clone(),
                event,
            })
            .is_err()
        {
            return;
        }
    }
}

/// Maps a raw monitor event to a connection-state change, if it is one.
///
/// A locally closed socket is not a peer disconnect: closing the options
/// endpoint after the configuration handshake must not look like a lost
/// peer.
fn translate(raw: u16) -> Option<ConnectionEvent> {
    match zmq::SocketEvent::from_raw(raw) {
        zmq::SocketEvent::ACCEPTED | zmq::SocketEvent::CONNECTED => {
            Some(ConnectionEvent::Connected)
        }
        zmq::SocketEvent::DISCONNECTED => Some(ConnectionEvent::Disconnected),
        _ => None,
    }
}

/// Whether a raw monitor event means the monitored socket is gone and the
/// listener thread should stop.
fn is_terminal(raw: u16) -> bool {
    matches!(
        zmq::SocketEvent::from_raw(raw),
        zmq::SocketEvent::CLOSED | zmq::SocketEvent::MONITOR_STOPPED
    )
}
