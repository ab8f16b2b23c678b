//! attrib: editor change provenance attribution runtime binary.
//! Single-process binary embedding the engine, the state-file signal
//! source, and the JSONL record sink.

use clap::Parser;

mod cli;
mod cmd_diff;
mod event_loop;
mod state_source;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    let command = args
        .command
        .unwrap_or_else(|| cli::Command::Run(cli::RunOpts::default()));

    match command {
        cli::Command::Run(opts) => {
            let filter = std::env::var("ATTRIB_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .with_writer(std::io::stderr)
                .init();

            event_loop::run_session(opts).await?;
        }
        cli::Command::Diff(opts) => {
            cmd_diff::cmd_diff(&opts.old, &opts.new)?;
        }
    }

    Ok(())
}
