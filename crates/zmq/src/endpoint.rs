//! ZeroMQ binding of the endpoint abstraction.
//!
//! Input endpoints bind a PULL socket at their address; output endpoints
//! connect a PUSH socket. Blocking receives hop through `spawn_blocking`
//! so the rest of the component stays on the async runtime, and sends are
//! always issued with `DONTWAIT` so a stalled peer can never block the
//! event loop.

use fluxsink_core::client::Client;
use fluxsink_core::endpoint::{Endpoint, MonitorEvent};
use tokio::sync::mpsc::UnboundedSender;

/// Errors that can occur during ZeroMQ endpoint operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Underlying socket operation failed.
    #[error(transparent)]
    Socket(#[from] zmq::Error),
    /// Connection-monitor setup failed.
    #[error(transparent)]
    Monitor(#[from] crate::monitor::Error),
    /// Blocking receive task was cancelled or panicked.
    #[error(transparent)]
    TaskJoin(#[from] tokio::task::JoinError),
    /// The endpoint was closed and cannot be used anymore.
    #[error("Endpoint {0} is closed")]
    Closed(String),
    /// Required builder attribute was not provided.
    #[error("Missing required attribute: {}.", _0)]
    MissingRequiredAttribute(String),
}

/// Role an endpoint is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Receives packets; binds a PULL socket.
    Input,
    /// Emits packets; connects a PUSH socket.
    Output,
}

/// A ZeroMQ-backed endpoint.
///
/// The socket lives in an `Option` so a blocking receive can temporarily
/// move it onto a blocking thread; `close` drops it, which also stops the
/// attached connection monitor.
pub struct ZmqEndpoint {
    /// Name the endpoint was declared under.
    name: String,
    /// Transport address the socket binds or connects to.
    address: String,
    /// Direction the endpoint is opened in.
    role: Role,
    /// Socket context, shared with the monitor pair socket.
    context: zmq::Context,
    /// The open socket; `None` before `connect` and after `close`.
    socket: Option<zmq::Socket>,
    /// Where the connection monitor reports state changes, if monitoring
    /// was requested.
    events: Option<UnboundedSender<MonitorEvent>>,
}

impl Client for ZmqEndpoint {
    type Error = Error;

    /// Opens the socket for the configured role and installs the
    /// connection monitor before binding or connecting, so no early peer
    /// connection can be missed.
    async fn connect(mut self) -> Result<Self, Error> {
        let socket = match self.role {
            Role::Input => self.context.socket(zmq::PULL)?,
            Role::Output => self.context.socket(zmq::PUSH)?,
        };

        if let Some(events) = &self.events {
            crate::monitor::spawn(&self.context, &socket, self.name.clone(), events.clone())?;
        }

        match self.role {
            Role::Input => socket.bind(&self.address)?,
            Role::Output => socket.connect(&self.address)?,
        }

        self.socket = Some(socket);
        Ok(self)
    }
}

impl Endpoint for ZmqEndpoint {
    type Error = Error;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    async fn recv(&mut self) -> Result<Vec<Vec<u8>>, Error> {
        let socket = self
            .socket
            .take()
            .ok_or_else(|| Error::Closed(self.name.clone()))?;

        // The socket moves onto a blocking thread for the duration of the
        // receive and is handed back afterwards.
        let (socket, received) = tokio::task::spawn_blocking(move || {
            let received = socket.recv_multipart(0);
            (socket, received)
        })
        .await?;

        self.socket = Some(socket);
        Ok(received?)
    }

    fn try_send(&mut self, frames: Vec<Vec<u8>>) -> Result<bool, Error> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::Closed(self.name.clone()))?;

        match socket.send_multipart(frames, zmq::DONTWAIT) {
            Ok(()) => Ok(true),
            Err(zmq::Error::EAGAIN) => Ok(false),
            Err(err) => Err(Error::Socket(err)),
        }
    }

    fn close(&mut self) {
        self.socket.take();
    }
}

/// Builder for configuring and opening ZeroMQ endpoints.
#[derive(Default)]
pub struct EndpointBuilder {
    /// Endpoint name, used for logging and monitor tagging.
    name: Option<String>,
    /// Transport address to bind or connect to.
    address: Option<String>,
    /// Direction the endpoint is opened in.
    role: Option<Role>,
    /// Optional channel the connection monitor reports into.
    events: Option<UnboundedSender<MonitorEvent>>,
}

impl EndpointBuilder {
    pub fn new() -> EndpointBuilder {
        EndpointBuilder {
            ..Default::default()
        }
    }

    pub fn name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }

    pub fn address(mut self, address: String) -> Self {
        self.address = Some(address);
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn events(mut self, events: UnboundedSender<MonitorEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Assembles an unopened endpoint; `connect` opens the socket.
    pub fn build(self) -> Result<ZmqEndpoint, Error> {
        Ok(ZmqEndpoint {
            name: self
                .name
                .ok_or_else(|| Error::MissingRequiredAttribute("name".to_string()))?,
            address: self
                .address
                .ok_or_else(|| Error::MissingRequiredAttribute("address".to_string()))?,
            role: self
                .role
                .ok_or_else(|| Error::MissingRequiredAttribute("role".to_string()))?,
            context: zmq::Context::new(),
            socket: None,
            events: self.events,
        })
    }
}
