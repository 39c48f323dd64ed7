use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use clap::error::ErrorKind;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "sz", version)]
#[command(
    about = "Report how much each namespace, type and member contributes to a managed module",
    long_about = None
)]
pub struct Cli {
    /// Write an HTML treemap instead of the flat per-type report.
    #[arg(long)]
    pub html: bool,

    /// Print the hierarchical size tree as JSON to stdout.
    #[arg(long, conflicts_with = "html")]
    pub json: bool,

    /// HTML template containing a {{{data}}} placeholder (defaults to the built-in one).
    #[arg(long, value_name = "PATH", requires = "html")]
    pub template: Option<PathBuf>,

    /// Where to write the HTML treemap.
    #[arg(long, value_name = "PATH", requires = "html")]
    pub output: Option<PathBuf>,

    /// Log progress to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Managed module (.dll or .exe) to measure.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// How to leave when the command line does not yield a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliExit {
    pub code: i32,
    pub message: String,
    pub to_stderr: bool,
}

pub fn parse_cli<I, T>(argv: I) -> Result<Cli, CliExit>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(argv).map_err(|err| match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => CliExit {
            code: 0,
            message: err.to_string(),
            to_stderr: false,
        },
        _ => CliExit {
            code: 1,
            message: usage_error(&err.to_string()),
            to_stderr: true,
        },
    })
}

fn usage_error(rendered: &str) -> String {
    let first_line = rendered.lines().next().unwrap_or_default();
    let message = first_line.strip_prefix("error: ").unwrap_or(first_line);
    format!("sz: {message}\nTry `sz --help' for more information.\n")
}
