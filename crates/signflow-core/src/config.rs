//! Runtime configuration read from the environment

use std::env;
use std::path::PathBuf;

pub const SOFFICE_PATH_VAR: &str = "SIGNFLOW_SOFFICE_PATH";
pub const UPLOAD_DIR_VAR: &str = "SIGNFLOW_UPLOAD_DIR";

/// Bare command name used when no configured converter exists on disk.
pub const SOFFICE_COMMAND: &str = "soffice";

pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

#[cfg(target_os = "windows")]
pub const DEFAULT_SOFFICE_PATH: &str = r"C:\Program Files\LibreOffice\program\soffice.exe";
#[cfg(target_os = "macos")]
pub const DEFAULT_SOFFICE_PATH: &str = "/Applications/LibreOffice.app/Contents/MacOS/soffice";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const DEFAULT_SOFFICE_PATH: &str = "/usr/bin/soffice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub soffice_path: PathBuf,
    pub upload_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            soffice_path: PathBuf::from(DEFAULT_SOFFICE_PATH),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
        }
    }
}

impl Config {
    /// Build from `SIGNFLOW_SOFFICE_PATH` and `SIGNFLOW_UPLOAD_DIR`, falling
    /// back to defaults for unset or blank variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from);

        Self {
            soffice_path: value(SOFFICE_PATH_VAR).unwrap_or(defaults.soffice_path),
            upload_dir: value(UPLOAD_DIR_VAR).unwrap_or(defaults.upload_dir),
        }
    }
}
