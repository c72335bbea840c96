use std::process::ExitCode;

use json_model::cli::CommandLineInterface;

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let command_line_interface = CommandLineInterface::load();
    command_line_interface.run()
}
