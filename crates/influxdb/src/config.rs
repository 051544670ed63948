//! InfluxDB connection settings.

use serde::{Deserialize, Serialize};

/// Connection settings delivered once on the OPTIONS endpoint.
///
/// Immutable after construction; consumed by the sink-client builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Store address, `host:port`.
    pub host: String,
    /// Account the writes are issued under.
    pub username: String,
    /// Password for the account.
    pub password: String,
    /// Database the series are written into.
    pub database: String,
}

impl Settings {
    /// Parses a comma-separated `key=value` options payload.
    ///
    /// Recognized keys are `host`, `user`, `pass` and `db`. Unrecognized
    /// keys and entries without exactly one `=` are ignored; keys that
    /// never appear leave their field at the empty-string default. The
    /// parser never fails — validation happens downstream when the sink
    /// client is constructed.
    pub fn parse(payload: &str) -> Settings {
        let mut settings = Settings::default();
        for pair in payload.split(',') {
            let kv: Vec<&str> = pair.split('=').collect();
            if kv.len() != 2 {
                continue;
            }
            match kv[0] {
                "host" => settings.host = kv[1].to_string(),
                "user" => settings.username = kv[1].to_string(),
                "pass" => settings.password = kv[1].to_string(),
                "db" => settings.database = kv[1].to_string(),
                _ => {}
            }
        }
        settings
    }
}
