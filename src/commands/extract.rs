use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use glob::Pattern;
use tracing::{error, info};

use super::list::matches_any;
use crate::bundle::Bundle;

/// Where an entry lands under `output_folder`. Entry names come from the bundle, so anything
/// that could escape the folder is refused.
fn output_path(output_folder: &Path, entry_path: &str) -> Result<PathBuf> {
    let mut out = output_folder.to_path_buf();
    let mut parts = 0;
    for component in Path::new(entry_path).components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                parts += 1;
            }
            Component::CurDir => {}
            _ => bail!("Entry path {entry_path:?} escapes the output folder"),
        }
    }
    if parts == 0 {
        bail!("Entry path {entry_path:?} names no file");
    }

    Ok(out)
}

/// Write every entry matching a glob pattern under `output_folder`. Returns how many were
/// written; entries that fail are logged and skipped.
pub fn extract_entries(bundle: &Bundle, patterns: &[Pattern], output_folder: &Path) -> Result<usize> {
    let extracted = bundle
        .entries()
        .iter()
        .filter(|entry| matches_any(patterns, &entry.path))
        // Attempt to read file contents
        .map(|entry| -> Result<&str> {
            let out_filename = output_path(output_folder, &entry.path)?;
            let contents = bundle
                .extract_one(&entry.path)
                .with_context(|| format!("Failed to read entry {:?}", entry.path))?;

            if let Some(parent) = out_filename.parent() {
                fs::create_dir_all(parent).context("Failed to create folder")?;
            }
            fs::write(&out_filename, &contents)
                .with_context(|| format!("Failed to write file {out_filename:?}"))?;

            Ok(entry.path.as_str())
        })
        // Report results
        .filter(|result| match result {
            Ok(path) => {
                info!("Extracted file: {path}");
                true
            }
            Err(e) => {
                error!("Failed to extract file: {e:?}");
                false
            }
        })
        .count();

    Ok(extracted)
}
