//! HTTP client for the InfluxDB series-write API.

use fluxsink_core::record::Series;
use fluxsink_core::sink::Sink;

/// Errors that can occur during InfluxDB client operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Store address could not be parsed into a URL.
    #[error("Invalid store address: {source}")]
    ParseUrl {
        #[source]
        source: url::ParseError,
    },
    /// HTTP client assembly failed.
    #[error("Failed to build HTTP client: {source}")]
    BuildHttp {
        #[source]
        source: reqwest::Error,
    },
    /// Write request could not be delivered.
    #[error("Write request failed: {source}")]
    Request {
        #[source]
        source: reqwest::Error,
    },
    /// Store answered the write with a non-success status.
    #[error("Write rejected with status {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
    /// Required builder attribute was not provided.
    #[error("Missing required attribute: {}.", _0)]
    MissingRequiredAttribute(String),
}

/// InfluxDB sink client.
///
/// Writes one series per call to the store's HTTP write API, with the
/// account credentials passed as query parameters the way the series API
/// expects them.
#[derive(Debug, Clone)]
pub struct Client {
    /// Base URL of the store.
    url: url::Url,
    /// Account the writes are issued under.
    username: String,
    /// Password for the account.
    password: String,
    /// Database the series are written into.
    database: String,
    /// Shared HTTP connection pool.
    http: reqwest::Client,
}

impl Sink for Client {
    type Error = Error;

    async fn write(&self, series: &Series) -> Result<(), Error> {
        let mut url = self.url.clone();
        url.set_path(&format!("/db/{}/series", self.database));

        let response = self
            .http
            .post(url)
            .query(&[("u", self.username.as_str()), ("p", self.password.as_str())])
            .json(&[series])
            .send()
            .await
            .map_err(|source| Error::Request { source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rejected { status, body });
        }
        Ok(())
    }
}

/// Builder for assembling the InfluxDB sink client from connection
/// settings.
#[derive(Default)]
pub struct ClientBuilder {
    settings: Option<super::config::Settings>,
}

impl ClientBuilder {
    pub fn new() -> ClientBuilder {
        ClientBuilder {
            ..Default::default()
        }
    }

    pub fn settings(mut self, settings: super::config::Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Assembles the client, failing when the configured host does not
    /// form a usable URL. There is no fallback store, so callers treat
    /// this as fatal.
    pub fn build(self) -> Result<Client, Error> {
        let settings = self
            .settings
            .ok_or_else(|| Error::MissingRequiredAttribute("settings".to_string()))?;

        let address = if settings.host.contains("://") {
            settings.host.clone()
        } else {
            format!("http://{}", settings.host)
        };
        let url = url::Url::parse(&address).map_err(|source| Error::ParseUrl { source })?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|source| Error::BuildHttp { source })?;

        Ok(Client {
            url,
            username: settings.username,
            password: settings.password,
            database: settings.database,
            http,
        })
    }
}
