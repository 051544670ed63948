//! Transport-agnostic endpoint abstraction.
//!
//! The readiness gate, the configuration handshake and the event loop only
//! ever see this trait, so the same component logic runs over any message
//! transport that can provide multipart receive, non-blocking send and
//! connection-state notifications.

/// Connection-state change observed on an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A peer established a connection.
    Connected,
    /// A peer went away.
    Disconnected,
}

/// A connection event tagged with the endpoint that observed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
    /// Name of the endpoint the event was observed on.
    pub endpoint: String,
    /// The observed connection-state change.
    pub event: ConnectionEvent,
}

/// A named, addressable message channel used for inter-component
/// communication.
pub trait Endpoint {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Name the endpoint was declared under.
    fn name(&self) -> &str;

    /// Whether the endpoint is still usable. Receive errors on a closed
    /// endpoint are terminal rather than transient.
    fn is_open(&self) -> bool;

    /// Receives the next multipart message, waiting indefinitely until one
    /// arrives or the endpoint fails.
    fn recv(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Vec<Vec<u8>>, Self::Error>> + Send;

    /// Attempts to send a multipart message without blocking. Returns
    /// `Ok(false)` when the send cannot proceed immediately and the message
    /// was dropped.
    fn try_send(&mut self, frames: Vec<Vec<u8>>) -> Result<bool, Self::Error>;

    /// Closes the endpoint. Further operations fail with a terminal error.
    fn close(&mut self);
}
