//! Bill Payment Gateway CLI
//!
//! Runs bill payment requests against the simulated gateway.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- requests.json
//! cargo run -- --pretty requests.json
//! ```
//!
//! The input file holds either a single request object or an array of them.
//! Each request is processed in order against one gateway instance over the
//! seeded biller catalog; the combined response list is printed to stdout.
//! Logs go to stderr, controlled by `RUST_LOG`.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, unparsable input, etc.)

use std::process;

use serde_json::Value;

use biller_gateway::cli;
use biller_gateway::{Gateway, GatewayConfig, ServiceRequest};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    if let Err(e) = run(&args).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(args: &cli::CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    let body = std::fs::read_to_string(&args.input_file)?;
    let requests: Vec<ServiceRequest> = match serde_json::from_str::<Value>(&body)? {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?,
        single => vec![serde_json::from_value(single)?],
    };

    let gateway = Gateway::new(GatewayConfig::default());
    let mut responses = Vec::new();
    for request in &requests {
        responses.extend(gateway.process(request).await);
    }

    let encoded = if args.pretty {
        serde_json::to_string_pretty(&responses)?
    } else {
        serde_json::to_string(&responses)?
    };
    println!("{encoded}");
    Ok(())
}
