//! Site bundle: every file of a static export, hashed
//!
//! The manifest maps each path to its content hash. Identical content
//! under different paths shares a hash, and Pages stores it once, so the
//! bundle also keeps a hash → file index used when uploading.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// One regular file of the export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// POSIX style path under the export root, always starting with `/`
    pub relative_path: String,
    pub content: Vec<u8>,
    /// Lower-case hex SHA-256 of `content`
    pub content_hash: String,
}

impl FileEntry {
    pub fn new(relative_path: impl Into<String>, content: Vec<u8>) -> Self {
        let content_hash = content_hash(&content);
        Self {
            relative_path: relative_path.into(),
            content,
            content_hash,
        }
    }
}

/// Hex SHA-256 digest of raw bytes
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Turn a path relative to the export root into `/a/b/c` form
pub fn normalize_relative_path(relative: &Path) -> String {
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .flat_map(|part| {
            // separators from another platform still end up as `/`
            part.split('\\')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect();
    format!("/{}", parts.join("/"))
}

/// Hashes the service asked for, split by whether a local file has them
#[derive(Debug, Default)]
pub struct MissingContent<'a> {
    pub found: Vec<&'a FileEntry>,
    pub unknown: Vec<String>,
}

/// All files under an export root
#[derive(Debug, Clone)]
pub struct SiteBundle {
    root: PathBuf,
    files: Vec<FileEntry>,
    by_hash: HashMap<String, usize>,
}

impl SiteBundle {
    /// Walk `root` recursively and read every regular file
    ///
    /// Symlinks are not followed. Entries come back sorted by path so the
    /// manifest is stable between runs.
    pub fn load(root: &Path) -> io::Result<Self> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let content = std::fs::read(entry.path())?;
            files.push(FileEntry::new(normalize_relative_path(relative), content));
        }

        tracing::debug!("Loaded {} files from {}", files.len(), root.display());
        Ok(Self::from_entries(root, files))
    }

    pub fn from_entries(root: impl Into<PathBuf>, files: Vec<FileEntry>) -> Self {
        let mut by_hash = HashMap::new();
        for (index, file) in files.iter().enumerate() {
            by_hash.entry(file.content_hash.clone()).or_insert(index);
        }

        Self {
            root: root.into(),
            files,
            by_hash,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path → hash mapping covering every file, duplicates included
    pub fn manifest(&self) -> BTreeMap<String, String> {
        self.files
            .iter()
            .map(|f| (f.relative_path.clone(), f.content_hash.clone()))
            .collect()
    }

    /// First file carrying `hash`
    pub fn entry_for_hash(&self, hash: &str) -> Option<&FileEntry> {
        self.by_hash.get(hash).map(|&index| &self.files[index])
    }

    /// Match the service's missing hashes against local files
    ///
    /// Repeated hashes are only returned once.
    pub fn resolve_missing(&self, hashes: &[String]) -> MissingContent<'_> {
        let mut seen = HashSet::new();
        let mut missing = MissingContent::default();

        for hash in hashes {
            if !seen.insert(hash.as_str()) {
                continue;
            }
            match self.entry_for_hash(hash) {
                Some(entry) => missing.found.push(entry),
                None => missing.unknown.push(hash.clone()),
            }
        }

        missing
    }
}
