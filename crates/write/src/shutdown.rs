//! Shutdown controller.
//!
//! OS termination signals and peer-disconnect triggers injected by the
//! readiness gate drain through one controller, so whichever fires first
//! terminates the process exactly once.

use fluxsink_core::shutdown::Trigger;
use std::time::Duration;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time;
use tracing::info;

/// Grace period allowed for in-flight outbound sends to flush.
const GRACE_PERIOD: Duration = Duration::from_secs(1);

/// Errors that can occur while installing the shutdown controller.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// OS signal handler registration failed.
    #[error("Failed to install signal handler: {source}")]
    Signal {
        #[source]
        source: std::io::Error,
    },
}

/// Waits for the first termination trigger and ends the process.
pub struct Controller {
    /// SIGINT stream.
    interrupt: Signal,
    /// SIGTERM stream.
    terminate: Signal,
    /// Channel carrying triggers injected by other tasks.
    control: UnboundedReceiver<Trigger>,
}

impl Controller {
    /// Registers the OS signal handlers. Failing here is a
    /// monitoring-setup failure and fatal to startup.
    pub fn install(control: UnboundedReceiver<Trigger>) -> Result<Controller, Error> {
        let interrupt =
            signal(SignalKind::interrupt()).map_err(|source| Error::Signal { source })?;
        let terminate =
            signal(SignalKind::terminate()).map_err(|source| Error::Signal { source })?;
        Ok(Controller {
            interrupt,
            terminate,
            control,
        })
    }

    /// Resolves with the first trigger from any source.
    pub async fn wait(mut self) -> Trigger {
        tokio::select! {
            _ = self.interrupt.recv() => Trigger::Signal,
            _ = self.terminate.recv() => Trigger::Signal,
            trigger = self.control.recv() => trigger.unwrap_or(Trigger::Signal),
        }
    }

    /// Runs the controller to completion: waits for a trigger, lets
    /// in-flight sends flush, then terminates with a successful status.
    pub async fn run(self) {
        let trigger = self.wait().await;
        info!("Received {trigger}, terminating");
        time::sleep(GRACE_PERIOD).await;
        info!("Stopped");
        std::process::exit(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_injected_trigger_resolves_wait() {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let controller = Controller::install(control_rx).unwrap();

        control_tx
            .send(Trigger::PeerDisconnected("in".to_string()))
            .unwrap();

        let trigger = timeout(Duration::from_secs(1), controller.wait())
            .await
            .expect("trigger should resolve wait");
        assert_eq!(trigger, Trigger::PeerDisconnected("in".to_string()));
    }

    #[tokio::test]
    async fn test_closed_control_channel_reads_as_signal() {
        let (control_tx, control_rx) = mpsc::unbounded_channel::<Trigger>();
        let controller = Controller::install(control_rx).unwrap();

        drop(control_tx);

        let trigger = timeout(Duration::from_secs(1), controller.wait())
            .await
            .expect("closed channel should resolve wait");
        assert_eq!(trigger, Trigger::Signal);
    }
}
