//! Object-store seam.
//!
//! Keys are `/`-separated strings. A key ending in `/` is a folder marker
//! and carries no content. Listing is by plain string prefix, the way
//! bucket stores list blobs.
use crate::error::SweepError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

pub trait ObjectStore {
    /// Every content key starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    fn exists(&self, key: &str) -> Result<bool>;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Missing keys fail with [`SweepError::NotFound`].
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    fn delete(&self, key: &str) -> Result<()>;
}

/// Store `value` as pretty JSON.
pub fn put_json<S, T>(store: &S, key: &str, value: &T) -> Result<()>
where
    S: ObjectStore + ?Sized,
    T: Serialize,
{
    let bytes = serde_json::to_vec_pretty(value).with_context(|| format!("serialize {key}"))?;
    store.put(key, &bytes)
}

/// Load and parse a JSON record; parse failures are [`SweepError::Malformed`].
pub fn get_json<S, T>(store: &S, key: &str) -> Result<T>
where
    S: ObjectStore + ?Sized,
    T: DeserializeOwned,
{
    let bytes = store.get(key)?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|err| SweepError::Malformed(format!("{key}: {err}")))?;
    Ok(value)
}

/// Distinct first path segments of every key below `prefix`.
pub fn child_names<S>(store: &S, prefix: &str) -> Result<Vec<String>>
where
    S: ObjectStore + ?Sized,
{
    let names: BTreeSet<String> = store
        .list(prefix)?
        .iter()
        .filter_map(|key| key.strip_prefix(prefix))
        .map(|rest| rest.trim_start_matches('/'))
        .filter_map(|rest| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    Ok(names.into_iter().collect())
}

/// Upload every file below `source` to `target_prefix/<relative path>`.
pub fn upload_dir<S>(store: &S, source: &Path, target_prefix: &str) -> Result<Vec<String>>
where
    S: ObjectStore + ?Sized,
{
    let mut uploaded = Vec::new();
    for file in collect_files_recursive(source)? {
        let rel = file
            .strip_prefix(source)
            .context("strip upload source prefix")?;
        let rel_key = rel
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let key = crate::layout::join_key(&[target_prefix, &rel_key]);
        let bytes = fs::read(&file).map_err(|err| SweepError::io(&file, err))?;
        tracing::debug!(file = %file.display(), key = %key, "uploading file");
        store.put(&key, &bytes)?;
        uploaded.push(key);
    }
    Ok(uploaded)
}

/// Regular files below `root`, sorted; an absent root yields nothing.
pub fn collect_files_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(root).with_context(|| format!("read {}", root.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_files_recursive(&path)?);
        } else if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
