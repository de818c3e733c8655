//! Configuration management for Lumina.
//!
//! Loads configuration from ${LUMINA_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::typing::TypingConfig;
use crate::prompts::LUMINA_PERSONA_PROMPT;
use crate::providers::models::DEFAULT_MODEL;
use crate::render::MarkdownOptions;

/// Which chat backend answers requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Groq Chat Completions API, called directly
    #[default]
    Groq,
    /// A server implementing the `{message, model, messages}` contract
    Relay,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GroqProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RelayProviderConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProvidersConfig {
    pub groq: GroqProviderConfig,
    pub relay: RelayProviderConfig,
}

/// Read-aloud command configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpeechConfig {
    /// Text-to-speech program; `None` disables speech output.
    pub command: Option<String>,
    /// Arguments placed before the text.
    pub args: Vec<String>,
}

/// Default file template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template, so new comments and
/// sections show up while the user's values are kept.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for Lumina configuration and data directories.
    //!
    //! LUMINA_HOME resolution order:
    //! 1. LUMINA_HOME environment variable (if set)
    //! 2. ~/.config/lumina (default)
    //! 3. ./.lumina when no home directory can be determined

    use std::path::PathBuf;

    pub fn lumina_home() -> PathBuf {
        if let Ok(home) = std::env::var("LUMINA_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".lumina"),
            |h| h.join(".config").join("lumina"),
        )
    }

    pub fn config_path() -> PathBuf {
        lumina_home().join("config.toml")
    }

    pub fn logs_dir() -> PathBuf {
        lumina_home().join("logs")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model id from the built-in registry
    pub model: String,

    pub backend: BackendKind,

    /// Optional inline system prompt replacing the persona
    pub system_prompt: Option<String>,

    /// Optional path to a file containing the system prompt
    pub system_prompt_file: Option<String>,

    /// Speak finished responses
    pub read_aloud: bool,

    /// Default log filter when LUMINA_LOG is unset
    pub log_level: String,

    pub typing: TypingConfig,

    pub markdown: MarkdownOptions,

    pub providers: ProvidersConfig,

    pub speech: SpeechConfig,
}

impl Config {
    const DEFAULT_LOG_LEVEL: &str = "info";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Saves only the model field, preserving comments and other values.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_model(model: &str) -> Result<()> {
        Self::save_model_to(&paths::config_path(), model)
    }

    /// Saves only the model field to a specific config file path.
    ///
    /// Creates the file from the template if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or written.
    pub fn save_model_to(path: &Path, model: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        doc["model"] = value(model);

        Self::write_config(path, &doc.to_string())
    }

    /// Returns the system prompt: file, then inline, then the Lumina persona.
    ///
    /// # Errors
    /// Returns an error if `system_prompt_file` is set but unreadable.
    pub fn effective_system_prompt(&self) -> Result<String> {
        if let Some(path_str) = &self.system_prompt_file {
            let content = fs::read_to_string(path_str)
                .with_context(|| format!("Failed to read system prompt file: {path_str}"))?;
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }

        match self.system_prompt.as_deref().map(str::trim) {
            Some(prompt) if !prompt.is_empty() => Ok(prompt.to_string()),
            _ => Ok(LUMINA_PERSONA_PROMPT.trim().to_string()),
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            backend: BackendKind::default(),
            system_prompt: None,
            system_prompt_file: None,
            read_aloud: false,
            log_level: Self::DEFAULT_LOG_LEVEL.to_string(),
            typing: TypingConfig::default(),
            markdown: MarkdownOptions::default(),
            providers: ProvidersConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::render::ItalicPolicy;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config.model, "gpt-oss-20b");
        assert_eq!(config.backend, BackendKind::Groq);
        assert_eq!(config.typing, TypingConfig::default());
        assert!(!config.read_aloud);
    }

    #[test]
    fn test_default_template_parses_to_defaults() {
        let config: Config = toml::from_str(default_config_template()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.model, defaults.model);
        assert_eq!(config.log_level, defaults.log_level);
        assert_eq!(config.typing, defaults.typing);
        assert_eq!(config.markdown, defaults.markdown);
        assert!(config.speech.command.is_none());
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "backend = \"relay\"\n[typing]\nword_delay_ms = 5\n[markdown]\nitalic = \"loose\"\n[providers.relay]\nurl = \"http://localhost:3000/api/chat\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend, BackendKind::Relay);
        assert_eq!(config.typing.word_delay_ms, 5);
        assert_eq!(config.typing.punctuation_delay_ms, 150);
        assert_eq!(config.markdown.italic, ItalicPolicy::Loose);
        assert_eq!(config.providers.relay.url.as_deref(), Some("http://localhost:3000/api/chat"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "backend = \"carrier-pigeon\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_init_creates_config_with_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subdir").join("config.toml");

        Config::init(&path).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("model = \"gpt-oss-20b\""));
        assert!(contents.contains("# system_prompt ="));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "").unwrap();
        assert!(Config::init(&path).is_err());
    }

    #[test]
    fn test_save_model_preserves_user_values_and_comments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "read_aloud = true\n").unwrap();

        Config::save_model_to(&path, "gemma2-9b-it").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("# Model id used for new conversations"));
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model, "gemma2-9b-it");
        assert!(config.read_aloud);
    }

    #[test]
    fn test_system_prompt_resolution() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("prompt.md");
        fs::write(&file, "  from file \n").unwrap();

        let mut config = Config {
            system_prompt: Some("inline".to_string()),
            ..Config::default()
        };
        assert_eq!(config.effective_system_prompt().unwrap(), "inline");

        config.system_prompt_file = Some(file.display().to_string());
        assert_eq!(config.effective_system_prompt().unwrap(), "from file");

        let persona = Config::default().effective_system_prompt().unwrap();
        assert!(persona.starts_with("Eres Lumina"));
    }

    #[test]
    fn test_missing_prompt_file_is_an_error() {
        let config = Config {
            system_prompt_file: Some("/nonexistent/prompt.md".to_string()),
            ..Config::default()
        };
        assert!(config.effective_system_prompt().is_err());
    }
}
