//! In-place `@name@` substitution for one case's working directory.
//!
//! Each parameter setting is applied as its own read, replace, and atomic
//! replace of the target file, in `parameter_settings` order. A token
//! introduced by an earlier replacement value is not substituted again by
//! that same setting.
use crate::error::SweepError;
use crate::model::Case;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

pub const TOKEN_DELIMITER: char = '@';

/// The search token for a variable: `@name@`.
pub fn token_for(variable_name: &str) -> String {
    format!("{TOKEN_DELIMITER}{variable_name}{TOKEN_DELIMITER}")
}

/// Rewrite every file referenced by `case` below `base_dir`.
///
/// Stops at the first failure; files rewritten before it stay rewritten.
pub fn fill_case(case: &Case, base_dir: &Path) -> Result<()> {
    for setting in &case.parameter_settings {
        let target = base_dir.join(&setting.path);
        let token = token_for(&setting.variable_name);
        let replaced = substitute_in_file(&target, &token, &setting.value)
            .with_context(|| format!("fill {token} for case {}", case.id))?;
        tracing::debug!(
            case_id = %case.id,
            file = %target.display(),
            variable = %setting.variable_name,
            replaced,
            "filled template token"
        );
    }
    Ok(())
}

/// Load a persisted case record and fill it below `base_dir`.
pub fn fill_from_config(config_path: &Path, base_dir: &Path) -> Result<Case> {
    let case = load_case(config_path)?;
    tracing::info!(
        case_id = %case.id,
        config = %config_path.display(),
        base_dir = %base_dir.display(),
        settings = case.parameter_settings.len(),
        "filling case"
    );
    fill_case(&case, base_dir)?;
    Ok(case)
}

/// Parse a case `config.json` from the local filesystem.
pub fn load_case(config_path: &Path) -> Result<Case> {
    let bytes = fs::read(config_path).map_err(|err| SweepError::io(config_path, err))?;
    let case: Case = serde_json::from_slice(&bytes).map_err(|err| {
        SweepError::Malformed(format!("case config {}: {err}", config_path.display()))
    })?;
    Ok(case)
}

/// Replace every occurrence of `token` in `path` with `value`.
///
/// The new content goes to a sibling temporary file that is renamed over
/// the original, so readers see either the old or the new content. Returns
/// the number of occurrences replaced.
pub fn substitute_in_file(path: &Path, token: &str, value: &str) -> Result<usize> {
    let bytes = fs::read(path).map_err(|err| SweepError::io(path, err))?;
    let text = String::from_utf8(bytes).map_err(|_| SweepError::Decode {
        path: path.to_path_buf(),
    })?;
    let count = text.matches(token).count();
    let replaced = text.replace(token, value);
    replace_atomically(path, replaced.as_bytes())?;
    Ok(count)
}

fn replace_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)
        .map_err(|err| SweepError::io(path, err))?
        .permissions();
    let mut tmp = NamedTempFile::new_in(parent).map_err(|err| SweepError::io(parent, err))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|err| SweepError::io(tmp.path(), err))?;
    fs::set_permissions(tmp.path(), permissions).map_err(|err| SweepError::io(tmp.path(), err))?;
    tmp.persist(path)
        .map_err(|err| SweepError::io(path, err.error))?;
    Ok(())
}

#[cfg(test)]
#[path = "fill_tests.rs"]
mod tests;
