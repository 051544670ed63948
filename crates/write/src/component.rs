//! Component lifecycle and message-processing engine.
//!
//! Stages run in a fixed order: endpoints open with monitors attached,
//! the readiness gate waits for peers, the configuration handshake reads
//! exactly one options packet, then the event loop runs until the
//! shutdown controller ends the process.

use fluxsink_core::client::Client;
use fluxsink_core::endpoint::Endpoint;
use fluxsink_core::packet;
use fluxsink_core::readiness::GateBuilder;
use fluxsink_core::record::Series;
use fluxsink_core::runner::Runner;
use fluxsink_core::sink::Sink;
use fluxsink_influxdb::client::ClientBuilder;
use fluxsink_influxdb::config::Settings;
use fluxsink_zmq::endpoint::{EndpointBuilder, Role};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time;
use tracing::{debug, error, info};

/// How long the component waits for all peers to connect before giving up.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during component execution.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Endpoint setup or operation failed.
    #[error(transparent)]
    Endpoint(#[from] fluxsink_zmq::endpoint::Error),
    /// Readiness gate assembly failed.
    #[error(transparent)]
    Readiness(#[from] fluxsink_core::readiness::Error),
    /// Shutdown controller installation failed.
    #[error(transparent)]
    Shutdown(#[from] crate::shutdown::Error),
    /// Sink client construction failed.
    #[error(transparent)]
    Sink(#[from] fluxsink_influxdb::client::Error),
    /// Not every endpoint reported a peer connection in time.
    #[error("Timeout: port connections were not established within {0:?}")]
    ReadyTimeout(Duration),
    /// Connection monitoring stopped before the ports connected.
    #[error("Connection monitoring stopped before ports connected")]
    MonitoringStopped,
    /// The options endpoint died before a configuration packet arrived.
    #[error("OPTIONS endpoint closed before options arrived")]
    OptionsClosed,
    /// Required builder attribute was not provided.
    #[error("Missing required attribute: {}.", _0)]
    MissingRequiredAttribute(String),
}

/// The component context: endpoint addresses it was started with.
#[derive(Debug)]
pub struct Component {
    /// Address of the IN endpoint carrying event records.
    input_address: String,
    /// Address of the OPTIONS endpoint carrying connection settings.
    options_address: String,
    /// Address of the optional ERR endpoint for failure notifications.
    error_address: Option<String>,
}

impl Runner for Component {
    type Error = Error;

    async fn run(self) -> Result<(), Error> {
        let (monitor_tx, monitor_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        // Signals and peer disconnects share one termination path.
        let controller = crate::shutdown::Controller::install(control_rx)?;
        tokio::spawn(controller.run());

        let mut input = EndpointBuilder::new()
            .name("in".to_string())
            .address(self.input_address)
            .role(Role::Input)
            .events(monitor_tx.clone())
            .build()?
            .connect()
            .await?;

        let mut options = EndpointBuilder::new()
            .name("options".to_string())
            .address(self.options_address)
            .role(Role::Input)
            .events(monitor_tx.clone())
            .build()?
            .connect()
            .await?;

        let mut error_out = match self.error_address {
            Some(address) => Some(
                EndpointBuilder::new()
                    .name("err".to_string())
                    .address(address)
                    .role(Role::Output)
                    .events(monitor_tx.clone())
                    .build()?
                    .connect()
                    .await?,
            ),
            None => None,
        };
        drop(monitor_tx);

        let monitored = 2 + usize::from(error_out.is_some());
        let (released_tx, released_rx) = oneshot::channel();
        let gate = GateBuilder::new()
            .events(monitor_rx)
            .expected(monitored)
            .control(control_tx.clone())
            .build()?;
        tokio::spawn(gate.run(released_tx));

        info!("Waiting for port connections to establish...");
        match time::timeout(READY_TIMEOUT, released_rx).await {
            Ok(Ok(())) => info!("Ports connected"),
            Ok(Err(_)) => return Err(Error::MonitoringStopped),
            Err(_) => return Err(Error::ReadyTimeout(READY_TIMEOUT)),
        }

        info!("Waiting for options to arrive...");
        let settings = read_settings(&mut options).await?;
        options.close();
        debug!(
            "Using connection settings host={} db={}",
            settings.host, settings.database
        );

        let sink = ClientBuilder::new().settings(settings).build()?;

        info!("Started...");
        run_loop(&mut input, error_out.as_mut(), &sink).await
    }
}

/// Consumes exactly one well-formed configuration packet.
///
/// Structurally invalid messages are skipped and the endpoint is read
/// again; the first valid packet is parsed leniently and ends the
/// handshake, so the endpoint is never read twice for configuration.
async fn read_settings<E: Endpoint>(options: &mut E) -> Result<Settings, Error> {
    loop {
        let frames = match options.recv().await {
            Ok(frames) => frames,
            Err(err) => {
                if !options.is_open() {
                    return Err(Error::OptionsClosed);
                }
                error!("Error receiving options packet: {err}");
                continue;
            }
        };

        if !packet::is_valid(&frames) || !packet::is_data(&frames) {
            continue;
        }

        let payload = String::from_utf8_lossy(&frames[1]);
        return Ok(Settings::parse(&payload));
    }
}

/// The steady-state receive-decode-write loop.
///
/// One record at a time, in receive order. A bad message never ends the
/// loop: structural rejects are silent, decode failures are logged, and
/// write failures are logged and reported best-effort on the error
/// endpoint. Only a closed input endpoint ends the loop; process
/// termination is the shutdown controller's job.
async fn run_loop<I, O, S>(
    input: &mut I,
    mut error_out: Option<&mut O>,
    sink: &S,
) -> Result<(), Error>
where
    I: Endpoint,
    O: Endpoint,
    S: Sink,
{
    loop {
        let frames = match input.recv().await {
            Ok(frames) => frames,
            Err(err) => {
                if !input.is_open() {
                    return Ok(());
                }
                error!("Error receiving message: {err}");
                continue;
            }
        };

        if !packet::is_valid(&frames) {
            continue;
        }

        let series: Series = match serde_json::from_slice(&frames[1]) {
            Ok(series) => series,
            Err(err) => {
                error!("Failed to decode incoming series: {err}");
                continue;
            }
        };

        if let Err(err) = sink.write(&series).await {
            error!("Error writing series: {err}");
            if let Some(error_out) = error_out.as_deref_mut() {
                match error_out.try_send(packet::new(err.to_string().as_bytes())) {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!("ERR endpoint not ready, dropping failure notification")
                    }
                    Err(send_err) => {
                        error!("Failed to send failure notification: {send_err}")
                    }
                }
            }
        }
    }
}

/// Builder for assembling the component from its endpoint addresses.
#[derive(Default)]
pub struct ComponentBuilder {
    input_address: Option<String>,
    options_address: Option<String>,
    error_address: Option<String>,
}

impl ComponentBuilder {
    pub fn new() -> ComponentBuilder {
        ComponentBuilder {
            ..Default::default()
        }
    }

    pub fn input_address(mut self, address: String) -> Self {
        self.input_address = Some(address);
        self
    }

    pub fn options_address(mut self, address: String) -> Self {
        self.options_address = Some(address);
        self
    }

    pub fn error_address(mut self, address: Option<String>) -> Self {
        self.error_address = address;
        self
    }

    pub fn build(self) -> Result<Component, Error> {
        Ok(Component {
            input_address: self
                .input_address
                .ok_or_else(|| Error::MissingRequiredAttribute("input_address".to_string()))?,
            options_address: self
                .options_address
                .ok_or_else(|| Error::MissingRequiredAttribute("options_address".to_string()))?,
            error_address: self.error_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(thiserror::Error, Debug)]
    enum MockError {
        #[error("endpoint closed")]
        Closed,
    }

    /// In-memory endpoint scripted with a fixed sequence of incoming
    /// messages; closes itself once the script is exhausted.
    struct MockEndpoint {
        name: String,
        incoming: VecDeque<Vec<Vec<u8>>>,
        open: bool,
        send_ready: bool,
        sent: Vec<Vec<Vec<u8>>>,
    }

    impl MockEndpoint {
        fn new(name: &str, incoming: Vec<Vec<Vec<u8>>>) -> MockEndpoint {
            MockEndpoint {
                name: name.to_string(),
                incoming: incoming.into(),
                open: true,
                send_ready: true,
                sent: Vec::new(),
            }
        }
    }

    impl Endpoint for MockEndpoint {
        type Error = MockError;

        fn name(&self) -> &str {
            &self.name
        }

        fn is_open(&self) -> bool {
            self.open
        }

        async fn recv(&mut self) -> Result<Vec<Vec<u8>>, MockError> {
            if !self.open {
                return Err(MockError::Closed);
            }
            match self.incoming.pop_front() {
                Some(frames) => Ok(frames),
                None => {
                    self.open = false;
                    Err(MockError::Closed)
                }
            }
        }

        fn try_send(&mut self, frames: Vec<Vec<u8>>) -> Result<bool, MockError> {
            if !self.open {
                return Err(MockError::Closed);
            }
            if !self.send_ready {
                return Ok(false);
            }
            self.sent.push(frames);
            Ok(true)
        }

        fn close(&mut self) {
            self.open = false;
        }
    }

    #[derive(thiserror::Error, Debug)]
    #[error("{0}")]
    struct MockSinkError(String);

    /// In-memory sink recording every write; optionally fails them all.
    struct MockSink {
        fail_with: Option<String>,
        writes: Mutex<Vec<Series>>,
    }

    impl MockSink {
        fn succeeding() -> MockSink {
            MockSink {
                fail_with: None,
                writes: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> MockSink {
            MockSink {
                fail_with: Some(message.to_string()),
                writes: Mutex::new(Vec::new()),
            }
        }

        fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    impl Sink for MockSink {
        type Error = MockSinkError;

        async fn write(&self, series: &Series) -> Result<(), MockSinkError> {
            self.writes.lock().unwrap().push(series.clone());
            match &self.fail_with {
                Some(message) => Err(MockSinkError(message.clone())),
                None => Ok(()),
            }
        }
    }

    fn data_packet(payload: &[u8]) -> Vec<Vec<u8>> {
        vec![b"g".to_vec(), payload.to_vec()]
    }

    #[test]
    fn test_component_builder_missing_input_address() {
        let result = ComponentBuilder::new()
            .options_address("tcp://127.0.0.1:5001".to_string())
            .build();
        assert!(result.is_err());
        assert!(
            matches!(result.unwrap_err(), Error::MissingRequiredAttribute(attr) if attr == "input_address")
        );
    }

    #[test]
    fn test_component_builder_missing_options_address() {
        let result = ComponentBuilder::new()
            .input_address("tcp://127.0.0.1:5000".to_string())
            .build();
        assert!(result.is_err());
        assert!(
            matches!(result.unwrap_err(), Error::MissingRequiredAttribute(attr) if attr == "options_address")
        );
    }

    #[test]
    fn test_component_builder_error_address_is_optional() {
        let component = ComponentBuilder::new()
            .input_address("tcp://127.0.0.1:5000".to_string())
            .options_address("tcp://127.0.0.1:5001".to_string())
            .error_address(None)
            .build()
            .unwrap();
        assert!(component.error_address.is_none());
    }

    #[tokio::test]
    async fn test_read_settings_consumes_exactly_one_valid_packet() {
        let mut options = MockEndpoint::new(
            "options",
            vec![
                vec![b"lonely-frame".to_vec()],
                vec![b"[".to_vec(), b"bracket".to_vec()],
                data_packet(b"host=localhost,user=admin,pass=secret,db=metrics"),
                data_packet(b"host=other,db=ignored"),
            ],
        );

        let settings = read_settings(&mut options).await.unwrap();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.username, "admin");
        assert_eq!(settings.password, "secret");
        assert_eq!(settings.database, "metrics");

        // The second configuration packet is never consumed.
        assert_eq!(options.incoming.len(), 1);
        assert!(options.is_open());
    }

    #[tokio::test]
    async fn test_read_settings_partial_keys_default_empty() {
        let mut options =
            MockEndpoint::new("options", vec![data_packet(b"host=localhost,db=metrics")]);

        let settings = read_settings(&mut options).await.unwrap();
        assert_eq!(settings.host, "localhost");
        assert_eq!(settings.username, "");
        assert_eq!(settings.password, "");
        assert_eq!(settings.database, "metrics");
    }

    #[tokio::test]
    async fn test_read_settings_fails_when_endpoint_dies() {
        let mut options = MockEndpoint::new("options", vec![vec![b"junk".to_vec()]]);

        let result = read_settings(&mut options).await;
        assert!(matches!(result.unwrap_err(), Error::OptionsClosed));
    }

    #[tokio::test]
    async fn test_run_loop_successful_write_produces_no_error_output() {
        let mut input = MockEndpoint::new(
            "in",
            vec![data_packet(br#"{"name":"cpu","points":[[1,99.5]]}"#)],
        );
        let mut err = MockEndpoint::new("err", vec![]);
        let sink = MockSink::succeeding();

        run_loop(&mut input, Some(&mut err), &sink).await.unwrap();

        assert_eq!(sink.write_count(), 1);
        assert!(err.sent.is_empty());
    }

    #[tokio::test]
    async fn test_run_loop_write_failure_sends_one_notification_per_failure() {
        let mut input = MockEndpoint::new(
            "in",
            vec![
                data_packet(br#"{"name":"cpu","points":[[1,99.5]]}"#),
                data_packet(br#"{"name":"mem","points":[[2,12.0]]}"#),
            ],
        );
        let mut err = MockEndpoint::new("err", vec![]);
        let sink = MockSink::failing("connection refused");

        run_loop(&mut input, Some(&mut err), &sink).await.unwrap();

        // Both records were attempted and each failure was reported once,
        // in order.
        assert_eq!(sink.write_count(), 2);
        assert_eq!(err.sent.len(), 2);
        for notification in &err.sent {
            assert!(packet::is_valid(notification));
            assert_eq!(notification[1], b"connection refused".to_vec());
        }
    }

    #[tokio::test]
    async fn test_run_loop_decode_failure_is_not_reported() {
        let mut input = MockEndpoint::new("in", vec![data_packet(b"not json")]);
        let mut err = MockEndpoint::new("err", vec![]);
        let sink = MockSink::succeeding();

        run_loop(&mut input, Some(&mut err), &sink).await.unwrap();

        assert_eq!(sink.write_count(), 0);
        assert!(err.sent.is_empty());
    }

    #[tokio::test]
    async fn test_run_loop_discards_malformed_packets() {
        let mut input = MockEndpoint::new(
            "in",
            vec![
                vec![b"single-frame".to_vec()],
                vec![b"".to_vec(), b"unaddressed".to_vec()],
                data_packet(br#"{"name":"cpu","points":[[1,99.5]]}"#),
            ],
        );
        let mut err = MockEndpoint::new("err", vec![]);
        let sink = MockSink::succeeding();

        run_loop(&mut input, Some(&mut err), &sink).await.unwrap();

        assert_eq!(sink.write_count(), 1);
    }

    #[tokio::test]
    async fn test_run_loop_without_error_endpoint_continues() {
        let mut input = MockEndpoint::new(
            "in",
            vec![
                data_packet(br#"{"name":"cpu","points":[[1,99.5]]}"#),
                data_packet(br#"{"name":"mem","points":[[2,12.0]]}"#),
            ],
        );
        let sink = MockSink::failing("connection refused");

        run_loop(&mut input, None::<&mut MockEndpoint>, &sink)
            .await
            .unwrap();

        assert_eq!(sink.write_count(), 2);
    }

    #[tokio::test]
    async fn test_run_loop_drops_notification_when_send_not_ready() {
        let mut input = MockEndpoint::new(
            "in",
            vec![
                data_packet(br#"{"name":"cpu","points":[[1,99.5]]}"#),
                data_packet(br#"{"name":"mem","points":[[2,12.0]]}"#),
            ],
        );
        let mut err = MockEndpoint::new("err", vec![]);
        err.send_ready = false;
        let sink = MockSink::failing("connection refused");

        run_loop(&mut input, Some(&mut err), &sink).await.unwrap();

        // The unready endpoint never blocks the loop; notifications are
        // dropped and processing continues.
        assert_eq!(sink.write_count(), 2);
        assert!(err.sent.is_empty());
    }
}
