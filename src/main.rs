use clap::Parser;
use stratlang::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
