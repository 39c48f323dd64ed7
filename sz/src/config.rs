use std::path::PathBuf;

use crate::args::Cli;
use crate::render::TemplateSource;

pub const DEFAULT_OUTPUT: &str = "output.html";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Flat,
    Html,
    Json,
}

/// Everything a run needs, resolved once from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub input: PathBuf,
    pub mode: OutputMode,
    pub template: TemplateSource,
    pub output: PathBuf,
    pub verbose: bool,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        let mode = if cli.html {
            OutputMode::Html
        } else if cli.json {
            OutputMode::Json
        } else {
            OutputMode::Flat
        };
        RunConfig {
            input: cli.path,
            mode,
            template: cli
                .template
                .map(TemplateSource::File)
                .unwrap_or(TemplateSource::Embedded),
            output: cli.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            verbose: cli.verbose,
        }
    }
}
