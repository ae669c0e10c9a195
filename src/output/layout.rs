use crate::HarvestError;
use std::fs;
use std::path::{Path, PathBuf};

/// How readable copies of stored files are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// `rsync` into `_readable_filenames/<output_dir>/<page>/`
    #[default]
    Copy,

    /// `ln -s` into `<output_dir>/_readable_symlinks/<page>/`
    Symlink,
}

/// Builds shell commands that lay stored files out under readable names
///
/// Every CSV ledger in `output_dir` is read in file-name order. For each
/// row the stored file `<page>/<uuid>.pdf` gets the readable name
/// `<filename without .pdf>_<uuid>.pdf`. One command is returned per row.
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::output::{generate_layout_script, LayoutMode};
/// use std::path::Path;
///
/// for command in generate_layout_script(Path::new("./harvest"), LayoutMode::Symlink).unwrap() {
///     println!("{}", command);
/// }
/// ```
pub fn generate_layout_script(
    output_dir: &Path,
    mode: LayoutMode,
) -> Result<Vec<String>, HarvestError> {
    let root = output_dir.to_string_lossy().trim_end_matches('/').to_string();
    let mut commands = Vec::new();

    for csv_path in ledger_files(output_dir)? {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&csv_path)?;

        for record in reader.records() {
            let record = record?;
            let (Some(filename), Some(local_name)) = (record.get(0), record.get(1)) else {
                continue;
            };
            if filename == "filename" && local_name == "local_name" {
                continue;
            }

            let Some((domain_dir, uuid_name)) = last_two_components(local_name) else {
                tracing::debug!("Skipping row with unusable local name: {}", local_name);
                continue;
            };
            let readable = format!(
                "{}_{}",
                filename.strip_suffix(".pdf").unwrap_or(filename),
                uuid_name
            );

            commands.push(match mode {
                LayoutMode::Copy => {
                    let dir = format!("_readable_filenames/{}/{}", root, domain_dir);
                    format!(
                        "mkdir -p \"{dir}\" && rsync -cav \\\n  \"{local_name}\" \\\n  \"{dir}/{readable}\""
                    )
                }
                LayoutMode::Symlink => {
                    let dir = format!("{}/_readable_symlinks/{}", root, domain_dir);
                    format!(
                        "mkdir -p \"{dir}\" && ln -s \\\n  \"../../../{local_name}\" \\\n  \"{dir}/{readable}\""
                    )
                }
            });
        }
    }

    Ok(commands)
}

/// CSV files directly inside `dir`, sorted by name
fn ledger_files(dir: &Path) -> Result<Vec<PathBuf>, HarvestError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn last_two_components(local_name: &str) -> Option<(String, String)> {
    let path = Path::new(local_name);
    let file = path.file_name()?.to_str()?;
    let parent = path.parent()?.file_name()?.to_str()?;
    Some((parent.to_string(), file.to_string()))
}
