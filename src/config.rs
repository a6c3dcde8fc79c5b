//! Configuration loading and validation.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ConfigFile {
    /// Directory of lyrics source files to index at startup.
    corpus_dir: String,
    /// Directory for state files (logs, pid file, index). Defaults to current directory.
    data_dir: Option<String>,
    /// Word that wakes the bot up; messages without it are ignored.
    #[serde(default = "default_wake_word")]
    wake_word: String,
    /// Phrase that marks a lyrics-search request, as in "<trigger>, <query>".
    #[serde(default = "default_lyrics_trigger")]
    lyrics_trigger: String,
    /// Single character marking command-style messages.
    #[serde(default = "default_command_prefix")]
    command_prefix: String,
    /// Worker identity for index namespacing. Falls back to the process id.
    worker_id: Option<u32>,
}

fn default_wake_word() -> String {
    "lyra".to_string()
}

fn default_lyrics_trigger() -> String {
    "lyra song".to_string()
}

fn default_command_prefix() -> String {
    "/".to_string()
}

pub struct Config {
    /// Directory of lyrics source files.
    pub corpus_dir: PathBuf,
    /// Directory for state files (logs, pid file, index).
    pub data_dir: PathBuf,
    /// Wake word, lower-cased (the dispatcher normalizes inbound text).
    pub wake_word: String,
    /// Lyrics trigger phrase, lower-cased.
    pub lyrics_trigger: String,
    /// Command prefix character.
    pub command_prefix: char,
    /// Worker identity override for index namespacing.
    pub worker_id: Option<u32>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config_path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::ReadFile { path: config_path.clone(), source: e })?;
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: config_path.clone(), source: e })?;

        if file.corpus_dir.is_empty() {
            return Err(ConfigError::Validation("corpus_dir is required".into()));
        }
        if file.wake_word.trim().is_empty() {
            return Err(ConfigError::Validation("wake_word must not be blank".into()));
        }
        if file.lyrics_trigger.trim().is_empty() {
            return Err(ConfigError::Validation("lyrics_trigger must not be blank".into()));
        }

        let mut prefix_chars = file.command_prefix.chars();
        let command_prefix = match (prefix_chars.next(), prefix_chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(ConfigError::Validation(
                    "command_prefix must be exactly one character".into(),
                ));
            }
        };

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            corpus_dir: PathBuf::from(file.corpus_dir),
            data_dir,
            wake_word: file.wake_word.to_lowercase(),
            lyrics_trigger: file.lyrics_trigger.to_lowercase(),
            command_prefix,
            worker_id: file.worker_id,
        })
    }
}
