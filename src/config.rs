use std::path::{Path, PathBuf};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::timestamp::TimeZoneMode;

/// Localized header label for each exported column.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ColumnLabels {
    pub url: String,
    pub title: String,
    pub last_visit_time: String,
    pub visit_count: String,
    pub visit_time: String,
    pub from_visit: String,
    pub transition: String,
    pub transition_label: String,
    pub profile_id: String,
    pub source_path: String,
}

impl Default for ColumnLabels {
    fn default() -> Self {
        Self {
            url: "网址".to_string(),
            title: "标题".to_string(),
            last_visit_time: "最后访问时间".to_string(),
            visit_count: "访问次数".to_string(),
            visit_time: "访问时间".to_string(),
            from_visit: "来源访问".to_string(),
            transition: "跳转类型".to_string(),
            transition_label: "跳转类型说明".to_string(),
            profile_id: "配置ID".to_string(),
            source_path: "源文件路径".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub profiles_subdir: String,
    pub profile_pattern: String,
    pub history_file: String,
    pub output_dir: String,
    pub temp_dir: String,
    pub file_prefix: String,
    pub max_column_width: usize,
    pub column_padding: usize,
    pub timezone: TimeZoneMode,
    pub transition_labels: bool,
    pub columns: ColumnLabels,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profiles_subdir: "AppData/Roaming/Tencent/WeChat/radium/web/profiles".to_string(),
            profile_pattern: "multitab_*".to_string(),
            history_file: "history".to_string(),
            output_dir: String::new(),
            temp_dir: String::new(),
            file_prefix: "wechat_history".to_string(),
            max_column_width: 50,
            column_padding: 2,
            timezone: TimeZoneMode::Utc,
            transition_labels: false,
            columns: ColumnLabels::default(),
        }
    }
}

impl Config {
    /// Profiles directory under the given user profile root.
    pub fn profiles_dir_under(&self, user_profile: &Path) -> PathBuf {
        self.profiles_subdir
            .split(['/', '\\'])
            .filter(|part| !part.is_empty())
            .fold(user_profile.to_path_buf(), |acc, part| acc.join(part))
    }

    /// Profiles directory for the current user.
    pub fn default_profiles_dir(&self) -> Result<PathBuf, ConfigError> {
        let root = std::env::var_os("USERPROFILE")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(dirs::home_dir)
            .ok_or(ConfigError::NoUserProfile)?;
        Ok(self.profiles_dir_under(&root))
    }

    pub fn output_dir_path(&self) -> PathBuf {
        if !self.output_dir.trim().is_empty() {
            return PathBuf::from(&self.output_dir);
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("output")
    }

    pub fn temp_dir_path(&self, output_dir: &Path) -> PathBuf {
        if self.temp_dir.trim().is_empty() {
            output_dir.to_path_buf()
        } else {
            PathBuf::from(&self.temp_dir)
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub config_hash: String,
}

pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let bytes: Vec<u8> = if let Some(p) = path {
        std::fs::read(p).map_err(|source| ConfigError::Read {
            path: p.to_path_buf(),
            source,
        })?
    } else {
        include_bytes!("../config/default.yml").to_vec()
    };

    let config: Config = serde_yaml::from_slice(&bytes)?;
    let config_hash = hash_bytes(&bytes);

    Ok(LoadedConfig {
        config,
        config_hash,
    })
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    hex::encode(digest)
}
