use std::process::ExitCode;

use clap::Parser;
use plates_config::CliArgs;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match plates_app::run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Logging may not be installed yet.
            eprintln!("plates: {err}");
            ExitCode::FAILURE
        }
    }
}
