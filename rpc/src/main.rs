use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use rpc::commands;
use rpc::engine::MeiEngineClient;
use rpc::host::SystemHostInfo;
use rpc::netif::SystemNetworkEnumerator;
use rpc::prompt::TerminalPrompt;
use rpc::{Cli, Commands, ReturnCode, Services};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            e.print().ok();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ReturnCode::IncorrectCommandLineParameters.into(),
            };
        }
    };

    // RUST_LOG wins over --log-level, e.g. RUST_LOG=rpc=debug
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("rpc={}", cli.log_level)))
        .unwrap_or_else(|_| EnvFilter::new("rpc=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let engine = MeiEngineClient::new();
    let network = SystemNetworkEnumerator::default();
    let host = SystemHostInfo::new();
    let prompt = TerminalPrompt;
    let services = Services {
        engine: &engine,
        network: &network,
        host: &host,
        prompt: &prompt,
    };

    let rc = match cli.command {
        Commands::Maintenance(args) => commands::maintenance::run(args, services),
    };
    tracing::debug!(code = %rc, "Finished");
    rc.into()
}
