//! `beacon-client` binary.
//!
//! Run against a local server:
//!   cargo run -p beacon-client -- "hello there"
//!   cargo run -p beacon-client -- --codec text --port 9000

use beacon_client::{Cli, Client, EXIT_FAILURE, exit_code, resolve_payload};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("failed to initialise logging: {e:#}");
        return ExitCode::from(EXIT_FAILURE);
    }

    let code = match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            EXIT_FAILURE
        }
    };
    ExitCode::from(code)
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("beacon_client=info".parse()?)
                .add_directive("beacon_core=info".parse()?),
        )
        .init();
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = cli.resolve()?;
    let payload = resolve_payload(cli.payload);
    let policy = config.on_error_message;

    let reason = Client::new(config).start(payload).closed().await;
    let code = exit_code(&reason, policy);
    tracing::info!(%reason, exit_code = code, "session finished");
    Ok(code)
}
