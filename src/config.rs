use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::app_dirs::AppDirs;
use crate::error::{ParlanceError, Result};
use crate::runtime::LineReader;
use crate::scheduler::ExhaustionPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://formulaic.app/api";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub user_lang: String,
    pub target_lang: String,
    /// Milliseconds between sessions; kept for compatibility, nothing schedules on it
    pub schedule: u64,
    pub api_key: String,
    pub formula_id: String,
    /// Revision of the phrase formula behind `formula_id`; 0 for ids created elsewhere
    #[serde(default)]
    pub formula_version: u32,
    pub data_file: PathBuf,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    /// `None` plays without lives
    #[serde(default)]
    pub lives: Option<u32>,
    #[serde(default)]
    pub on_exhausted: ExhaustionPolicy,
    #[serde(default = "default_skip_token")]
    pub skip_token: String,
    #[serde(default = "default_max_generation_attempts")]
    pub max_generation_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_difficulty() -> String {
    "medium".to_string()
}

fn default_skip_token() -> String {
    "skip".to_string()
}

fn default_max_generation_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_lang: "en".to_string(),
            target_lang: "es".to_string(),
            schedule: 21_600_000,
            api_key: String::new(),
            formula_id: String::new(),
            formula_version: 0,
            data_file: AppDirs::data_path(),
            api_base_url: default_api_base_url(),
            difficulty: default_difficulty(),
            lives: None,
            on_exhausted: ExhaustionPolicy::default(),
            skip_token: default_skip_token(),
            max_generation_attempts: default_max_generation_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Result<Config>;
    fn save(&self, cfg: &Config) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path(),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// A missing file yields (and writes) the defaults; an unreadable one is an error
    fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            warn!(path = %self.path.display(), "config file not found, creating with default values");
            let cfg = Config::default();
            self.save(&cfg)?;
            return Ok(cfg);
        }

        let bytes = fs::read(&self.path)?;
        let cfg = serde_json::from_slice::<Config>(&bytes)?;
        debug!(path = %self.path.display(), "config loaded");
        Ok(cfg)
    }

    fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

/// Prompt for the API key when the config has none and persist the answer
pub fn ensure_api_key(
    store: &dyn ConfigStore,
    cfg: &mut Config,
    reader: &mut dyn LineReader,
) -> Result<()> {
    if !cfg.api_key.trim().is_empty() {
        return Ok(());
    }

    warn!("API key not found in config, prompting for one");
    let answer = reader
        .read_line("Enter your Formulaic API key: ")?
        .map(|line| line.trim().to_string())
        .unwrap_or_default();
    if answer.is_empty() {
        return Err(ParlanceError::MissingApiKey);
    }

    cfg.api_key = answer;
    store.save(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ScriptedReader;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            user_lang: "de".into(),
            target_lang: "it".into(),
            api_key: "key-123".into(),
            formula_id: "formula-9".into(),
            data_file: dir.path().join("learned.json"),
            lives: Some(3),
            on_exhausted: ExhaustionPolicy::Review,
            ..Config::default()
        };
        store.save(&cfg).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = FileConfigStore::with_path(&path);

        let cfg = store.load().unwrap();

        assert_eq!(cfg.user_lang, "en");
        assert_eq!(cfg.target_lang, "es");
        assert_eq!(cfg.schedule, 21_600_000);
        assert!(path.exists());
    }

    #[test]
    fn original_config_fields_load_with_supplementary_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
              "userLang": "en",
              "targetLang": "fr",
              "schedule": 21600000,
              "apiKey": "abc",
              "formulaId": "",
              "dataFile": "/tmp/learned.json"
            }"#,
        )
        .unwrap();

        let cfg = FileConfigStore::with_path(&path).load().unwrap();

        assert_eq!(cfg.target_lang, "fr");
        assert_eq!(cfg.data_file, PathBuf::from("/tmp/learned.json"));
        assert_eq!(cfg.lives, None);
        assert_eq!(cfg.on_exhausted, ExhaustionPolicy::Stop);
        assert_eq!(cfg.skip_token, "skip");
        assert_eq!(cfg.max_generation_attempts, 3);
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(cfg.formula_version, 0);
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[]").unwrap();

        assert_matches!(
            FileConfigStore::with_path(&path).load(),
            Err(ParlanceError::Json(_))
        );
    }

    #[test]
    fn ensure_api_key_prompts_and_persists() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let mut cfg = Config::default();
        let mut reader = ScriptedReader::new(["  secret-key  "]);

        ensure_api_key(&store, &mut cfg, &mut reader).unwrap();

        assert_eq!(cfg.api_key, "secret-key");
        assert_eq!(store.load().unwrap().api_key, "secret-key");
        assert_eq!(reader.prompts, vec!["Enter your Formulaic API key: ".to_string()]);
    }

    #[test]
    fn ensure_api_key_keeps_existing_key() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let mut cfg = Config {
            api_key: "present".into(),
            ..Config::default()
        };
        let mut reader = ScriptedReader::new(["ignored"]);

        ensure_api_key(&store, &mut cfg, &mut reader).unwrap();

        assert_eq!(cfg.api_key, "present");
        assert!(reader.prompts.is_empty());
    }

    #[test]
    fn ensure_api_key_rejects_empty_answer_and_eof() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));

        let mut cfg = Config::default();
        let mut blank = ScriptedReader::new([""]);
        assert_matches!(
            ensure_api_key(&store, &mut cfg, &mut blank),
            Err(ParlanceError::MissingApiKey)
        );

        let mut eof = ScriptedReader::new(Vec::<String>::new());
        assert_matches!(
            ensure_api_key(&store, &mut cfg, &mut eof),
            Err(ParlanceError::MissingApiKey)
        );
    }
}
