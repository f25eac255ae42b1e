// storyloom CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use storyloom_studio::logging;

mod commands;
mod output;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "storyloom", about = "Long-form writing with highlighted entities and reorderable tiles")]
struct Cli {
    /// Stories root directory (overrides `stories_root` in config).
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Force JSON output.
    #[arg(long, global = true)]
    json: bool,

    /// Debug logging to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let format = OutputFormat::detect(cli.json);
    let ctx = commands::Context { root: cli.root, format };
    match commands::run(cli.command, &ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            output::print_anyhow_error(format, &error);
            ExitCode::FAILURE
        }
    }
}
