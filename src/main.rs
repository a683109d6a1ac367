use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn try_main() -> anyhow::Result<()> {
    courtfetch::logging::init().context("init logging")?;

    let cli = courtfetch::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        courtfetch::cli::Command::Case(args) => {
            courtfetch::case::run(args).context("case")?;
        }
        courtfetch::cli::Command::Causelist(args) => {
            courtfetch::causelist::run(args).context("causelist")?;
        }
        courtfetch::cli::Command::Parse(args) => {
            courtfetch::causelist::parse_file(args).context("parse")?;
        }
    }

    Ok(())
}
