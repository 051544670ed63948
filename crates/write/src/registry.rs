//! Component self-description for the network registry.

use serde::Serialize;

/// Registry entry describing the component and its ports.
#[derive(Debug, Serialize)]
pub struct Entry {
    pub description: &'static str,
    pub inports: Vec<EntryPort>,
    pub outports: Vec<EntryPort>,
}

/// One declared port in a registry entry.
#[derive(Debug, Serialize)]
pub struct EntryPort {
    pub name: &'static str,
    pub r#type: &'static str,
    pub description: &'static str,
    pub required: bool,
}

/// The entry for this component: events in, options in, errors out.
pub fn entry() -> Entry {
    Entry {
        description: "Writes incoming event records into InfluxDB",
        inports: vec![
            EntryPort {
                name: "IN",
                r#type: "json",
                description: "Event record in JSON",
                required: true,
            },
            EntryPort {
                name: "OPTIONS",
                r#type: "string",
                description: "InfluxDB connection options",
                required: true,
            },
        ],
        outports: vec![EntryPort {
            name: "ERR",
            r#type: "string",
            description: "Error port for write-failure reporting",
            required: false,
        }],
    }
}
