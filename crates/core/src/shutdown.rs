/// Reason the component is being terminated.
///
/// Peer disconnects are injected into the same control channel the signal
/// listener drains, so whichever trigger fires first wins exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// An interrupt or termination signal was delivered by the OS.
    Signal,
    /// The named endpoint lost its peer.
    PeerDisconnected(String),
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Signal => write!(f, "termination signal"),
            Trigger::PeerDisconnected(endpoint) => {
                write!(f, "peer disconnect on {endpoint}")
            }
        }
    }
}
