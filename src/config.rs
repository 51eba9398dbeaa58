//! Per-project configuration: `.codexray/config.json`.
//!
//! Unknown fields are round-tripped untouched so older engines can open
//! configs written by newer ones — except when `version` itself is newer,
//! which is a hard error rather than a silent migration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::db::STORE_DIR;
use crate::languages::supported_languages;

/// Schema version this engine writes and understands.
pub const CONFIG_VERSION: u32 = 1;

/// Default per-file size cap in bytes (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: u32,
    pub project_name: String,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub frameworks: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub git_hooks_enabled: bool,
    /// Fields this engine version does not know about are preserved as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: CONFIG_VERSION,
            project_name: project_name.into(),
            languages: supported_languages().iter().map(|s| s.to_string()).collect(),
            exclude: Vec::new(),
            frameworks: Vec::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            git_hooks_enabled: false,
            extra: serde_json::Map::new(),
        }
    }

    pub fn path(root: &Path) -> PathBuf {
        root.join(STORE_DIR).join(CONFIG_FILE)
    }

    /// Load the project config, falling back to defaults when the file does
    /// not exist yet. A `version` newer than this engine's is refused.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path(root);
        if !path.exists() {
            return Ok(Self::new(project_name_from(root)));
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: Config = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config at {}", path.display()))?;
        if config.version > CONFIG_VERSION {
            anyhow::bail!(
                "config version {} is newer than this engine supports ({CONFIG_VERSION}); \
                 upgrade codexray",
                config.version
            );
        }
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = Self::path(root);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }
}

fn project_name_from(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

/// Create the storage directory and config file, and make sure the
/// repository ignores it. Idempotent.
pub fn init_project(root: &Path) -> Result<Config> {
    fs::create_dir_all(root.join(STORE_DIR))
        .with_context(|| format!("cannot create {}/", STORE_DIR))?;

    let config = if Config::path(root).exists() {
        Config::load(root)?
    } else {
        let config = Config::new(project_name_from(root));
        config.save(root)?;
        config
    };

    append_gitignore(root)?;
    Ok(config)
}

/// Append `.codexray/` to the project's `.gitignore` when missing.
fn append_gitignore(root: &Path) -> Result<()> {
    let line = format!("{STORE_DIR}/");
    let path = root.join(".gitignore");
    let existing = fs::read_to_string(&path).unwrap_or_default();
    if existing.lines().any(|l| l.trim() == line) {
        return Ok(());
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(&line);
    updated.push('\n');
    fs::write(&path, updated).context("cannot update .gitignore")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("demo");
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert!(config.languages.contains(&"typescript".to_string()));
        assert!(!config.git_hooks_enabled);
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = r#"{
            "version": 1,
            "projectName": "demo",
            "languages": ["rust"],
            "exclude": ["generated/"],
            "frameworks": [],
            "maxFileSize": 2048,
            "gitHooksEnabled": true,
            "futureKnob": {"nested": [1, 2, 3]}
        }"#;
        fs::create_dir_all(tmp.path().join(STORE_DIR)).unwrap();
        fs::write(Config::path(tmp.path()), raw).unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.project_name, "demo");
        assert_eq!(config.max_file_size, 2048);
        assert!(config.git_hooks_enabled);
        assert!(config.extra.contains_key("futureKnob"));

        config.save(tmp.path()).unwrap();
        let reloaded = Config::load(tmp.path()).unwrap();
        assert!(reloaded.extra.contains_key("futureKnob"));
        assert_eq!(reloaded.exclude, vec!["generated/".to_string()]);
    }

    #[test]
    fn test_newer_version_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(STORE_DIR)).unwrap();
        fs::write(
            Config::path(tmp.path()),
            r#"{"version": 99, "projectName": "demo"}"#,
        )
        .unwrap();

        let err = Config::load(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("newer"));
    }

    #[test]
    fn test_missing_config_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
    }

    #[test]
    fn test_init_project_is_idempotent_and_ignores_store() {
        let tmp = tempfile::tempdir().unwrap();
        init_project(tmp.path()).unwrap();
        init_project(tmp.path()).unwrap();

        assert!(Config::path(tmp.path()).exists());
        let gitignore = fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
        let hits = gitignore
            .lines()
            .filter(|l| l.trim() == format!("{STORE_DIR}/"))
            .count();
        assert_eq!(hits, 1, "ignore line must be appended exactly once");
    }

    #[test]
    fn test_gitignore_preserves_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(".gitignore"), "node_modules/\n").unwrap();
        init_project(tmp.path()).unwrap();

        let gitignore = fs::read_to_string(tmp.path().join(".gitignore")).unwrap();
        assert!(gitignore.starts_with("node_modules/\n"));
        assert!(gitignore.contains(".codexray/"));
    }
}
