//! Interactive demo binary: connect, then walk the six-step CRUD script,
//! one Enter keypress per step.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use customers_core::{
    connect, watch_triggers, Credentials, Endpoint, Gate, Orchestrator, RestClient, TcpProbeLink,
    UreqTransport, TRIGGER_BYTE,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = env_or("SERVER_HOST", "127.0.0.1");
    let port: u16 = match env_or("SERVER_PORT", "3000").parse() {
        Ok(port) => port,
        Err(_) => {
            error!("SERVER_PORT must be a port number");
            return ExitCode::FAILURE;
        }
    };
    let base_path = env_or("BASE_PATH", "");
    let max_retries: u32 = match env_or("MAX_RETRIES", "5").parse() {
        Ok(n) => n,
        Err(_) => {
            error!("MAX_RETRIES must be a number");
            return ExitCode::FAILURE;
        }
    };
    let credentials = Credentials {
        network: env_or("NETWORK_NAME", "demo"),
        secret: env_or("NETWORK_SECRET", ""),
    };

    // Without connectivity the script cannot run at all.
    let mut link = TcpProbeLink::new(&host, port);
    if let Err(err) = connect(&mut link, &credentials, max_retries) {
        error!(error = %err, "could not reach the record store");
        return ExitCode::FAILURE;
    }

    let endpoint = Endpoint::new(&host, port, &base_path);
    let client = RestClient::new(endpoint, UreqTransport::new());
    let gate = Arc::new(Gate::new());

    let watcher_gate = Arc::clone(&gate);
    thread::spawn(move || watch_triggers(io::stdin(), &watcher_gate, TRIGGER_BYTE));

    // The main thread is the worker.
    let mut orchestrator = Orchestrator::new(client, gate);
    orchestrator.run();
    ExitCode::SUCCESS
}
