//! Bucket rooted at a local directory.
//!
//! The same tree is what a batch container sees through the bucket volume
//! mount, so keys map one-to-one onto relative file paths.
use super::{collect_files_recursive, ObjectStore};
use crate::error::SweepError;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open a store, creating the root directory when missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).with_context(|| format!("create bucket root {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key.trim_end_matches('/'));
        let valid = rel
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(anyhow!(SweepError::Malformed(format!(
                "object key must be relative without '..' (got {key:?})"
            ))));
        }
        Ok(self.root.join(rel))
    }

    fn key_for(&self, path: &Path) -> Result<String> {
        let rel = path
            .strip_prefix(&self.root)
            .with_context(|| format!("{} is outside the bucket root", path.display()))?;
        Ok(rel
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"))
    }
}

impl ObjectStore for LocalStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // Walk only the deepest directory the prefix names in full.
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if dir_part.is_empty() {
            self.root.clone()
        } else {
            self.resolve(dir_part)?
        };
        let mut keys = Vec::new();
        for file in collect_files_recursive(&start)? {
            let key = self.key_for(&file)?;
            if key.starts_with(prefix) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        if key.ends_with('/') {
            return Ok(path.is_dir());
        }
        Ok(path.is_file())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if key.ends_with('/') {
            fs::create_dir_all(&path).map_err(|err| SweepError::io(&path, err))?;
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| SweepError::io(parent, err))?;
        }
        fs::write(&path, bytes).map_err(|err| SweepError::io(&path, err))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        if !path.is_file() {
            return Err(anyhow!(SweepError::NotFound(format!("object {key}"))));
        }
        fs::read(&path).map_err(|err| anyhow!(SweepError::io(&path, err)))
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        if path.is_file() {
            fs::remove_file(&path).map_err(|err| SweepError::io(&path, err))?;
        }
        Ok(())
    }
}
