//! # Profile Discovery
//!
//! Finds the embedded browser's profile folders and the history database in
//! each of them.

use std::path::{Path, PathBuf};

use globset::Glob;
use tracing::{debug, warn};

use crate::error::ExportError;

/// A discovered browser profile folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSource {
    /// Folder name, used to tag every record read from this profile.
    pub id: String,
    pub dir: PathBuf,
    /// Absolute path of the history database, when the profile has one.
    pub history: Option<PathBuf>,
}

impl ProfileSource {
    pub fn locate(id: &str, dir: PathBuf, history_file: &str) -> Self {
        let candidate = dir.join(history_file);
        let history = candidate
            .is_file()
            .then(|| std::path::absolute(&candidate).unwrap_or(candidate));
        Self {
            id: id.to_string(),
            dir,
            history,
        }
    }
}

/// List profile folders under `base_dir` whose names match `pattern`,
/// sorted by name.
pub fn discover_profiles(
    base_dir: &Path,
    pattern: &str,
    history_file: &str,
) -> Result<Vec<ProfileSource>, ExportError> {
    let matcher = Glob::new(pattern)?.compile_matcher();
    let not_found = || ExportError::NotFound {
        base_dir: base_dir.to_path_buf(),
    };

    let entries = match std::fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("cannot list profiles in {}: {err}", base_dir.display());
            return Err(not_found());
        }
    };

    let mut profiles = Vec::new();
    for entry in entries {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            debug!("ignoring non-UTF-8 entry {:?}", file_name);
            continue;
        };
        if !matcher.is_match(name) {
            continue;
        }
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        profiles.push(ProfileSource::locate(name, dir, history_file));
    }

    if profiles.is_empty() {
        warn!("no profile folders found in {}", base_dir.display());
        return Err(not_found());
    }
    profiles.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(profiles)
}
