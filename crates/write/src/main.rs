use clap::{CommandFactory, Parser};
use fluxsink_core::runner::Runner;
use std::process;
use tracing::error;

mod cli;
mod component;
mod registry;
mod shutdown;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    if args.json {
        match serde_json::to_string(&registry::entry()) {
            Ok(doc) => println!("{doc}"),
            Err(err) => eprintln!("Failed to render registry entry: {err}"),
        }
        return;
    }

    // Install global log collector. Outside debug mode only fatal
    // conditions surface.
    let max_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::ERROR
    };
    tracing_subscriber::fmt().with_max_level(max_level).init();

    let (Some(port_in), Some(port_options)) = (args.port_in, args.port_options) else {
        let _ = cli::Args::command().print_help();
        process::exit(1);
    };

    component::ComponentBuilder::new()
        .input_address(port_in)
        .options_address(port_options)
        .error_address(args.port_err)
        .build()
        .unwrap_or_else(|err| {
            error!("{err:?}");
            process::exit(1);
        })
        .run()
        .await
        .unwrap_or_else(|err| {
            error!("{err:?}");
            process::exit(1);
        });
}
