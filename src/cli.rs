use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the status of a single case by its CNR number.
    Case(CaseArgs),
    /// Download a court's cause list for a date.
    Causelist(CauselistArgs),
    /// Parse a previously saved cause-list HTML file into JSON.
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
pub struct CaseArgs {
    /// CNR number of the case (e.g. MHPU050000272025).
    #[arg(long)]
    pub cnr: String,

    /// Output directory for the JSON record, text report, and PDFs.
    #[arg(long, default_value = "outputs/cnr")]
    pub out: String,

    /// Captcha value to submit for every attempt instead of prompting on
    /// stdin (stub portals and tests).
    #[arg(long)]
    pub captcha: Option<String>,

    /// YAML config overriding portal URLs and retry behavior.
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Debug, Args)]
pub struct CauselistArgs {
    /// State name, substring, or numeric code.
    #[arg(long)]
    pub state: String,

    /// District name, substring, or numeric code.
    #[arg(long)]
    pub district: String,

    /// Court complex name, substring, or code.
    #[arg(long)]
    pub complex: String,

    /// Court name, substring, or code.
    #[arg(long)]
    pub court: String,

    /// Cause-list date, day first (default: today).
    #[arg(long)]
    pub date: Option<String>,

    /// Which list to fetch.
    #[arg(long, value_enum, default_value_t = Side::Both)]
    pub side: Side,

    /// Output directory for PDFs, HTML, parsed JSON, and the index.
    #[arg(long, default_value = "outputs/causelists")]
    pub out: String,

    /// Captcha value to submit for every attempt instead of prompting on
    /// stdin (stub portals and tests).
    #[arg(long)]
    pub captcha: Option<String>,

    /// YAML config overriding portal URLs and retry behavior.
    #[arg(long)]
    pub config: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Side {
    Both,
    Civil,
    Criminal,
}

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Saved cause-list HTML file.
    #[arg(long)]
    pub input: String,

    /// Output path for the parsed JSON document.
    #[arg(long)]
    pub out: String,
}
