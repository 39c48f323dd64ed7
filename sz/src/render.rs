use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, SzError};
use crate::flat::FlatReport;
use crate::treemap::TreemapNode;

pub const DATA_PLACEHOLDER: &str = "{{{data}}}";

pub const DEFAULT_TEMPLATE: &str = include_str!("../assets/treemap.html");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Embedded,
    File(PathBuf),
}

impl TemplateSource {
    pub fn label(&self) -> String {
        match self {
            TemplateSource::Embedded => "<embedded>".to_string(),
            TemplateSource::File(path) => path.display().to_string(),
        }
    }

    pub fn load(&self) -> Result<Cow<'static, str>> {
        match self {
            TemplateSource::Embedded => Ok(Cow::Borrowed(DEFAULT_TEMPLATE)),
            TemplateSource::File(path) => {
                std::fs::read_to_string(path)
                    .map(Cow::Owned)
                    .map_err(|source| SzError::Io {
                        path: path.clone(),
                        source,
                    })
            }
        }
    }
}

pub fn render_flat_report(report: &FlatReport, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{}", report.module_name)?;
    for row in &report.type_sizes {
        writeln!(out, "{}\t{}", row.qualified_name, row.total)?;
    }
    writeln!(out)?;
    writeln!(out, "Total size: {}", report.grand_total)?;
    Ok(())
}

pub fn treemap_json(tree: &TreemapNode) -> Result<String> {
    Ok(serde_json::to_string(tree)?)
}

/// Substitutes the serialized tree for the first placeholder in `template`.
///
/// `</` is written as `<\/` so a name containing `</script>` cannot end the
/// surrounding script element; both spell the same JSON string.
pub fn render_html(template: &str, template_label: &str, tree: &TreemapNode) -> Result<String> {
    let Some(at) = template.find(DATA_PLACEHOLDER) else {
        return Err(SzError::TemplatePlaceholderMissing {
            path: template_label.to_string(),
        });
    };
    let data = treemap_json(tree)?.replace("</", "<\\/");

    let mut html = String::with_capacity(template.len() + data.len());
    html.push_str(&template[..at]);
    html.push_str(&data);
    html.push_str(&template[at + DATA_PLACEHOLDER.len()..]);
    Ok(html)
}

pub fn write_html(tree: &TreemapNode, template: &TemplateSource, output: &Path) -> Result<()> {
    let contents = template.load()?;
    let html = render_html(&contents, &template.label(), tree)?;
    std::fs::write(output, html).map_err(|source| SzError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    tracing::info!(output = %output.display(), template = %template.label(), "wrote treemap");
    Ok(())
}
