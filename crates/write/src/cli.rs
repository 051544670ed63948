use clap::Parser;

/// Writes incoming event records into InfluxDB.
#[derive(Parser, Debug)]
#[command(name = "fluxsink-write")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input endpoint address for event records
    #[arg(long = "port-in")]
    pub port_in: Option<String>,

    /// Input endpoint address for the one-shot connection options
    #[arg(long = "port-options")]
    pub port_options: Option<String>,

    /// Output endpoint address for write-failure notifications
    #[arg(long = "port-err")]
    pub port_err: Option<String>,

    /// Print the component registry entry as JSON and exit
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}
