use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod ops;
mod output;

use commands::{Commands, GlobalFlags};

#[derive(Parser)]
#[command(
    name = "prototool",
    version,
    about = "Work with Protobuf: compile, lint, format, check for breaking changes, generate stubs, and call gRPC endpoints"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalFlags,
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.global.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.run(&cli.global).await {
        Ok(failures) if failures.is_empty() => ExitCode::SUCCESS,
        Ok(mut failures) => {
            prototool_core::failure::sort_failures(&mut failures);
            let format = cli.global.failure_format();
            for failure in &failures {
                println!("{}", failure.render(format));
            }
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("{}", error::format_error(&err));
            ExitCode::from(2)
        }
    }
}
