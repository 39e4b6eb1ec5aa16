// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use clap::Parser;

use poseek_annotate::cli::args::Cli;
use poseek_annotate::cli::{commands, logging};
use poseek_annotate::error;

fn main() {
    let cli = Cli::parse();
    logging::set_level(logging::Level::from_flags(cli.quiet, cli.verbose));

    match commands::run(&cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}
