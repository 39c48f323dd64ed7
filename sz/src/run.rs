use std::io::Write;
use std::path::{Path, PathBuf};

use sz_metadata::ModuleFile;

use crate::build::build_module_tree;
use crate::config::{OutputMode, RunConfig};
use crate::error::{Result, SzError};
use crate::flat::aggregate;
use crate::model::ModuleNode;
use crate::render::{render_flat_report, treemap_json, write_html};
use crate::treemap::module_to_treemap;

/// Opens `path`, measures it and releases the file before returning.
pub fn load_module_tree(path: &Path) -> Result<ModuleNode> {
    let file = ModuleFile::open(path)?;
    let reader = file.reader()?;
    tracing::debug!(
        path = %path.display(),
        runtime = reader.runtime_version(),
        "opened managed module"
    );
    Ok(build_module_tree(&reader)?)
}

pub fn run(config: &RunConfig, stdout: &mut impl Write) -> Result<()> {
    let module = load_module_tree(&config.input)?;
    match config.mode {
        OutputMode::Flat => {
            render_flat_report(&aggregate(&module), stdout).map_err(stdout_error)?;
        }
        OutputMode::Json => {
            let json = treemap_json(&module_to_treemap(&module))?;
            writeln!(stdout, "{json}").map_err(stdout_error)?;
        }
        OutputMode::Html => {
            write_html(
                &module_to_treemap(&module),
                &config.template,
                &config.output,
            )?;
        }
    }
    stdout.flush().map_err(stdout_error)
}

fn stdout_error(source: std::io::Error) -> SzError {
    SzError::Io {
        path: PathBuf::from("<stdout>"),
        source,
    }
}
