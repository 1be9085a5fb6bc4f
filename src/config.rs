use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed storage key; also the state file's stem.
pub const STORAGE_KEY: &str = "threads-planner-v1";

const CONFIG_FILE: &str = "config.yml";
const LOG_FILE: &str = "threadplan.log";
const FALLBACK_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Overrides the state file location.
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_post_time")]
    pub default_post_time: String,
    #[serde(default = "default_idea_post_time")]
    pub idea_post_time: String,
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_api_key_env() -> String {
    "API_KEY".to_string()
}

fn default_post_time() -> String {
    "09:00".to_string()
}

fn default_idea_post_time() -> String {
    "12:00".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_file: None,
            log_file: None,
            model: default_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            default_post_time: default_post_time(),
            idea_post_time: default_idea_post_time(),
        }
    }
}

impl Config {
    /// Loads the config file at `path`, or the per-user default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match project_dirs() {
                Ok(dirs) => dirs.config_dir().join(CONFIG_FILE),
                Err(_) => return Ok(Config::default()),
            },
        };
        if !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&path).with_context(|| format!("reading {:?}", path))?;
        let config: Config = serde_yaml::from_str(&data)
            .with_context(|| format!("parsing config file {:?}", path))?;
        config.validated()
    }

    fn validated(mut self) -> Result<Config> {
        self.default_post_time = crate::model::parse_time(&self.default_post_time)
            .context("default_post_time")?;
        self.idea_post_time =
            crate::model::parse_time(&self.idea_post_time).context("idea_post_time")?;
        Ok(self)
    }

    pub fn data_file(&self) -> Result<PathBuf> {
        match &self.data_file {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?
                .data_dir()
                .join(format!("{}.json", STORAGE_KEY))),
        }
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        match &self.log_file {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join(LOG_FILE)),
        }
    }

    /// The configured key variable wins; `GEMINI_API_KEY` is the fallback.
    pub fn api_key(&self) -> Option<String> {
        [self.api_key_env.as_str(), FALLBACK_KEY_ENV]
            .iter()
            .filter_map(|name| env::var(name).ok())
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "threadplan").context("locating data directory")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.yml"))).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.default_post_time, "09:00");
        assert_eq!(config.idea_post_time, "12:00");
        assert_eq!(config.api_key_env, "API_KEY");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "model: gemini-2.0-pro\ndefault_post_time: \"8:30\"\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.model, "gemini-2.0-pro");
        assert_eq!(config.default_post_time, "08:30");
        assert_eq!(config.idea_post_time, "12:00");
    }

    #[test]
    fn invalid_time_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "idea_post_time: noon\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn explicit_data_file_is_used() {
        let config = Config {
            data_file: Some(PathBuf::from("/tmp/plan.json")),
            ..Config::default()
        };
        assert_eq!(config.data_file().unwrap(), PathBuf::from("/tmp/plan.json"));
    }
}
