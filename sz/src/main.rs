use std::io::Write;
use std::process::ExitCode;

use anyhow::Context;
use sz::args::parse_cli;
use sz::config::RunConfig;
use sz::logging::init_logging;

fn main() -> ExitCode {
    let cli = match parse_cli(std::env::args_os()) {
        Ok(cli) => cli,
        Err(exit) => {
            if exit.to_stderr {
                eprint!("{}", exit.message);
            } else {
                print!("{}", exit.message);
            }
            return ExitCode::from(exit.code as u8);
        }
    };

    let config = RunConfig::from(cli);
    init_logging(config.verbose);

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sz: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(config: &RunConfig) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut stdout = std::io::BufWriter::new(stdout.lock());
    sz::run::run(config, &mut stdout)
        .with_context(|| format!("failed to measure {}", config.input.display()))?;
    stdout.flush().context("failed to flush stdout")?;
    Ok(())
}
