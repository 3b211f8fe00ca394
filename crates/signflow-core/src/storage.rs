//! Stored documents and where their bytes live on disk

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Signed,
    Completed,
    Pending,
    Expired,
}

/// A stored document. Only `status` and `updated_at` change here; the file
/// bytes behind `file_path` are rewritten in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: u64,
    pub file_name: String,
    /// Absolute, or relative to the upload root.
    pub file_path: PathBuf,
    pub status: DocumentStatus,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: u64, file_name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            file_name: file_name.into(),
            file_path: file_path.into(),
            status: DocumentStatus::Draft,
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn mark(&mut self, status: DocumentStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// File name without its extension, for naming exports.
    pub fn base_name(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(idx) if idx > 0 => &self.file_name[..idx],
            _ => &self.file_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    upload_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.upload_dir.clone())
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Absolute paths pass through; relative ones are joined onto the upload
    /// root. `.` and `..` are folded without touching the filesystem.
    pub fn resolve(&self, stored: &Path) -> PathBuf {
        if stored.is_absolute() {
            return normalize(stored);
        }
        normalize(&self.upload_dir.join(stored))
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
