use clap::Parser;
use pretrade::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
