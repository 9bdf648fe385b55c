use clap::Parser;
use gridslice::cli::{Cli, Commands};
use gridslice::output::{Printer, Verbosity};
use miette::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let printer = Printer::with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose));

    match cli.command {
        Commands::Inspect(args) => gridslice::cli::inspect::run(args, &printer)?,
        Commands::Locate(args) => gridslice::cli::locate::run(args, &printer)?,
        Commands::Export(args) => gridslice::cli::export::run(args, &printer)?,
        Commands::Validate(args) => gridslice::cli::validate::run(args, &printer)?,
        Commands::Completions(args) => gridslice::cli::completions::run(args)?,
    }

    Ok(())
}
