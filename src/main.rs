use clap::Parser;

use pixelboard::cli::{self, CliArgs};
use pixelboard::{BoardSettings, logger};

fn main() -> std::process::ExitCode {
    // Initialize session log (overwrites previous session log)
    logger::init();

    let settings = BoardSettings::load();
    let args = CliArgs::parse();
    cli::run(args, &settings)
}
