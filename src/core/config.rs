//! # Configuration
//!
//! Centralizes all widget options with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.murmur/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//! Hosts embedding the widget can skip the file entirely and build
//! [`ChatOptions`] directly.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::adapter::DataTransferMode;

// ============================================================================
// Shared option types
// ============================================================================

/// What happens when the adapter fails a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Segment discarded, composer restored, error reported; the chat stays usable.
    #[default]
    NonFatal,
    /// As non-fatal, then the host run-loop stops.
    Fatal,
}

/// Key combination that submits the composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitShortcut {
    /// Enter submits, Shift+Enter inserts a newline.
    #[default]
    Enter,
    /// Ctrl/Cmd+Enter submits, Enter inserts a newline.
    CommandEnter,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ConversationStarter {
    pub prompt: String,
    /// Shown instead of the prompt when set.
    pub label: Option<String>,
}

impl ConversationStarter {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            label: None,
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.prompt)
    }
}

/// Sizing of the widget root. Values are CSS lengths; bare numbers are pixels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct LayoutOptions {
    pub width: Option<String>,
    pub height: Option<String>,
    pub max_width: Option<String>,
    pub max_height: Option<String>,
}

impl LayoutOptions {
    /// Inline `style` value, or `None` when no dimension is set.
    pub fn inline_style(&self) -> Option<String> {
        let rules: Vec<String> = [
            ("width", &self.width),
            ("height", &self.height),
            ("max-width", &self.max_width),
            ("max-height", &self.max_height),
        ]
        .into_iter()
        .filter_map(|(property, value)| {
            value
                .as_deref()
                .map(|v| format!("{property}: {}", css_length(v)))
        })
        .collect();
        (!rules.is_empty()).then(|| rules.join("; "))
    }
}

fn css_length(value: &str) -> String {
    let value = value.trim();
    if value.parse::<f64>().is_ok() {
        format!("{value}px")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AssistantPersona {
    pub name: String,
    pub picture: Option<String>,
    pub tagline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UserPersona {
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct PersonaOptions {
    pub assistant: Option<AssistantPersona>,
    pub user: Option<UserPersona>,
}

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub layout: LayoutOptions,
    #[serde(default)]
    pub composer: ComposerConfig,
    #[serde(default)]
    pub personas: PersonaOptions,
    #[serde(default)]
    pub conversation_starters: Vec<ConversationStarter>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub data_transfer_mode: Option<String>,
    pub theme_id: Option<String>,
    pub error_policy: Option<ErrorPolicy>,
    pub class_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ComposerConfig {
    pub placeholder: Option<String>,
    pub auto_focus: Option<bool>,
    pub submit_shortcut: Option<SubmitShortcut>,
    pub disable_submit_button: Option<bool>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_THEME_ID: &str = "luna";
pub const DEFAULT_ASSISTANT_NAME: &str = "AI";
pub const DEFAULT_USER_NAME: &str = "User";

// ============================================================================
// Resolved Options (concrete values)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ComposerOptions {
    pub placeholder: Option<String>,
    pub auto_focus: bool,
    pub submit_shortcut: SubmitShortcut,
    pub disable_submit_button: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub data_transfer_mode: DataTransferMode,
    pub theme_id: String,
    pub class_name: Option<String>,
    pub error_policy: ErrorPolicy,
    pub layout: LayoutOptions,
    pub composer: ComposerOptions,
    pub personas: PersonaOptions,
    pub conversation_starters: Vec<ConversationStarter>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            data_transfer_mode: DataTransferMode::default(),
            theme_id: DEFAULT_THEME_ID.to_string(),
            class_name: None,
            error_policy: ErrorPolicy::default(),
            layout: LayoutOptions::default(),
            composer: ComposerOptions::default(),
            personas: PersonaOptions::default(),
            conversation_starters: Vec::new(),
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.murmur/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".murmur").join("config.toml"))
}

/// Load config from `~/.murmur/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `WidgetConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<WidgetConfig, ConfigError> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            warn!("Could not determine home directory, using default config");
            return Ok(WidgetConfig::default());
        }
    };

    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(&path);
        return Ok(WidgetConfig::default());
    }

    load_config_from(&path)
}

/// Load config from an explicit path. A missing file is an error here.
pub fn load_config_from(path: &Path) -> Result<WidgetConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: WidgetConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Murmur Configuration
# All settings are optional. Defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# data_transfer_mode = "stream"      # "stream" or "batch" (or MURMUR_DATA_TRANSFER_MODE)
# theme_id = "luna"                  # Or MURMUR_THEME
# error_policy = "non_fatal"         # "non_fatal" or "fatal"
# class_name = "my-chat"

# [layout]
# width = "420"                      # Bare numbers are pixels
# height = "600px"
# max_width = "100%"
# max_height = "80vh"

# [composer]
# placeholder = "Ask me anything"
# auto_focus = true
# submit_shortcut = "enter"          # "enter" or "command_enter"
# disable_submit_button = false

# [personas.assistant]
# name = "Harper"
# picture = "https://example.com/harper.png"
# tagline = "Your friendly assistant"

# [personas.user]
# name = "Alex"

# [[conversation_starters]]
# prompt = "What can you do?"

# [[conversation_starters]]
# prompt = "Write a haiku about the sea"
# label = "Haiku"
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

fn parse_mode(value: &str, source: &str) -> Option<DataTransferMode> {
    let mode = DataTransferMode::parse(value);
    if mode.is_none() {
        warn!("Ignoring unknown data transfer mode {:?} from {}", value, source);
    }
    mode
}

/// Resolve the final options by collapsing: defaults → config file → env vars → CLI.
///
/// `cli_mode` and `cli_theme` are from CLI flags (None = not specified).
pub fn resolve(
    config: &WidgetConfig,
    cli_mode: Option<DataTransferMode>,
    cli_theme: Option<&str>,
) -> ChatOptions {
    // Mode: CLI → env → config → default
    let data_transfer_mode = cli_mode
        .or_else(|| {
            std::env::var("MURMUR_DATA_TRANSFER_MODE")
                .ok()
                .and_then(|v| parse_mode(&v, "MURMUR_DATA_TRANSFER_MODE"))
        })
        .or_else(|| {
            config
                .general
                .data_transfer_mode
                .as_deref()
                .and_then(|v| parse_mode(v, "config file"))
        })
        .unwrap_or_default();

    // Theme: CLI → env → config → default
    let theme_id = cli_theme
        .map(|s| s.to_string())
        .or_else(|| std::env::var("MURMUR_THEME").ok())
        .or_else(|| config.general.theme_id.clone())
        .unwrap_or_else(|| DEFAULT_THEME_ID.to_string());

    ChatOptions {
        data_transfer_mode,
        theme_id,
        class_name: config.general.class_name.clone(),
        error_policy: config.general.error_policy.unwrap_or_default(),
        layout: config.layout.clone(),
        composer: ComposerOptions {
            placeholder: config.composer.placeholder.clone(),
            auto_focus: config.composer.auto_focus.unwrap_or(false),
            submit_shortcut: config.composer.submit_shortcut.unwrap_or_default(),
            disable_submit_button: config.composer.disable_submit_button.unwrap_or(false),
        },
        personas: config.personas.clone(),
        conversation_starters: config.conversation_starters.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_parses() {
        let config = WidgetConfig::default();
        assert!(config.conversation_starters.is_empty());
        assert!(config.general.theme_id.is_none());
    }

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve(&WidgetConfig::default(), None, None);
        assert_eq!(resolved.theme_id, DEFAULT_THEME_ID);
        assert_eq!(resolved.error_policy, ErrorPolicy::NonFatal);
        assert_eq!(resolved.composer.submit_shortcut, SubmitShortcut::Enter);
        assert!(!resolved.composer.disable_submit_button);
        assert!(resolved.personas.assistant.is_none());
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = WidgetConfig {
            general: GeneralConfig {
                data_transfer_mode: Some("batch".to_string()),
                error_policy: Some(ErrorPolicy::Fatal),
                class_name: Some("mine".to_string()),
                ..Default::default()
            },
            composer: ComposerConfig {
                placeholder: Some("Type here".to_string()),
                auto_focus: Some(true),
                submit_shortcut: Some(SubmitShortcut::CommandEnter),
                disable_submit_button: None,
            },
            ..Default::default()
        };
        let resolved = resolve(&config, None, None);
        assert_eq!(resolved.error_policy, ErrorPolicy::Fatal);
        assert_eq!(resolved.class_name.as_deref(), Some("mine"));
        assert_eq!(resolved.composer.placeholder.as_deref(), Some("Type here"));
        assert!(resolved.composer.auto_focus);
        assert_eq!(resolved.composer.submit_shortcut, SubmitShortcut::CommandEnter);
    }

    #[test]
    fn test_resolve_cli_wins() {
        let config = WidgetConfig {
            general: GeneralConfig {
                data_transfer_mode: Some("stream".to_string()),
                theme_id: Some("dawn".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve(&config, Some(DataTransferMode::Batch), Some("nova"));
        assert_eq!(resolved.data_transfer_mode, DataTransferMode::Batch);
        assert_eq!(resolved.theme_id, "nova");
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[general]
data_transfer_mode = "batch"
theme_id = "nova"
error_policy = "fatal"

[layout]
width = "420"
max_height = "80vh"

[composer]
placeholder = "Ask"
submit_shortcut = "command_enter"

[personas.assistant]
name = "Harper"
tagline = "Helpful"

[personas.user]
name = "Alex"
picture = "alex.png"

[[conversation_starters]]
prompt = "What can you do?"

[[conversation_starters]]
prompt = "Write a haiku"
label = "Haiku"
"#;
        let config: WidgetConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.data_transfer_mode.as_deref(), Some("batch"));
        assert_eq!(config.general.error_policy, Some(ErrorPolicy::Fatal));
        assert_eq!(config.layout.width.as_deref(), Some("420"));
        assert_eq!(config.composer.submit_shortcut, Some(SubmitShortcut::CommandEnter));
        let assistant = config.personas.assistant.as_ref().unwrap();
        assert_eq!(assistant.name, "Harper");
        assert_eq!(assistant.tagline.as_deref(), Some("Helpful"));
        assert_eq!(config.personas.user.as_ref().unwrap().picture.as_deref(), Some("alex.png"));
        assert_eq!(config.conversation_starters.len(), 2);
        assert_eq!(config.conversation_starters[1].display_label(), "Haiku");
        assert_eq!(config.conversation_starters[0].display_label(), "What can you do?");
    }

    #[test]
    fn test_sparse_toml_parses() {
        // Only override one thing; everything else stays default
        let toml_str = r#"
[general]
theme_id = "dawn"
"#;
        let config: WidgetConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.theme_id.as_deref(), Some("dawn"));
        assert!(config.general.data_transfer_mode.is_none());
        assert!(config.personas.assistant.is_none());
        assert!(config.conversation_starters.is_empty());
    }

    #[test]
    fn test_unknown_mode_in_config_falls_back() {
        let config = WidgetConfig {
            general: GeneralConfig {
                data_transfer_mode: Some("carrier-pigeon".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            resolve(&config, Some(DataTransferMode::Stream), None).data_transfer_mode,
            DataTransferMode::Stream
        );
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general]\ntheme_id = \"file-theme\"").unwrap();
        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.general.theme_id.as_deref(), Some("file-theme"));
    }

    #[test]
    fn test_load_config_from_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general\ntheme_id = ").unwrap();
        assert!(matches!(load_config_from(file.path()), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(load_config_from(&missing), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_generated_default_is_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        generate_default_config(&path);
        let config = load_config_from(&path).unwrap();
        assert!(config.general.theme_id.is_none());
    }

    #[test]
    fn test_layout_inline_style() {
        assert_eq!(LayoutOptions::default().inline_style(), None);
        let layout = LayoutOptions {
            width: Some("420".to_string()),
            height: Some("600px".to_string()),
            ..Default::default()
        };
        assert_eq!(
            layout.inline_style().as_deref(),
            Some("width: 420px; height: 600px")
        );
    }
}
