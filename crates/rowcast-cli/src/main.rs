//! Rowcast CLI - apply declarative rule sets to record files.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use logging::LogConfig;

fn main() {
    let cli = Cli::parse();

    logging::init_logging(&LogConfig::from_verbosity(cli.verbose).with_format(cli.log_format));

    let result = match cli.command {
        Commands::Apply {
            input,
            rules,
            output,
            format,
            input_format,
            all_fields,
            paginate,
            chunk_size,
            delimiter,
            no_header,
        } => commands::apply::run(commands::apply::ApplyOptions {
            input,
            rules,
            output,
            format,
            input_format,
            all_fields,
            paginate,
            chunk_size,
            delimiter,
            no_header,
        }),

        Commands::Check { rules, json } => commands::check::run(rules, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
