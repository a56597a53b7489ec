use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;
use crate::model::Drive;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub thread: ThreadConfig,
}

/// The signed-in user's drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_user_url")]
    pub drive_url: String,
    #[serde(default = "default_user_title")]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// JSON file backing the local store.
    /// Defaults to `~/.local/share/threadview/store.json`.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Populate an empty thread with sample comments on first run.
    #[serde(default = "default_seed_sample")]
    pub seed_sample: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadConfig {
    /// Resource the thread is attached to.
    #[serde(default = "default_href")]
    pub href: String,
    /// Placeholder for the top-level composer; `None` shows "Add a comment".
    #[serde(default)]
    pub composer_placeholder: Option<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            drive_url: default_user_url(),
            title: default_user_title(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            seed_sample: default_seed_sample(),
        }
    }
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            href: default_href(),
            composer_placeholder: None,
        }
    }
}

impl UserConfig {
    pub fn drive(&self) -> Drive {
        Drive::new(self.drive_url.clone(), self.title.clone())
    }
}

fn default_user_url() -> String {
    "hyper://me.local".to_string()
}

fn default_user_title() -> String {
    std::env::var("USER").unwrap_or_else(|_| "me".to_string())
}

fn default_store_path() -> PathBuf {
    platform::data_dir().join("store.json")
}

fn default_seed_sample() -> bool {
    true
}

fn default_href() -> String {
    "hyper://me.local/posts/welcome.md".to_string()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load from `path`, writing a default file there first if none exists.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.user.drive_url.starts_with("hyper://"));
        assert!(config.store.path.ends_with("threadview/store.json"));
        assert!(config.store.seed_sample);
        assert!(config.thread.composer_placeholder.is_none());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [user]
            drive_url = "hyper://alice"

            [thread]
            composer_placeholder = "Say something"
            "#,
        )
        .unwrap();
        assert_eq!(config.user.drive_url, "hyper://alice");
        assert_eq!(config.user.title, default_user_title());
        assert_eq!(config.thread.href, default_href());
        assert_eq!(config.thread.composer_placeholder.as_deref(), Some("Say something"));
    }

    #[test]
    fn test_load_from_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        let again = Config::load_from(&path).unwrap();
        assert_eq!(again.user.drive_url, config.user.drive_url);
        assert_eq!(again.thread.href, config.thread.href);
    }
}
