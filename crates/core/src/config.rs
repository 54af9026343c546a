//! Configuration management for multihop.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.multihop/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: collections, prompt overrides and
//! the config file all live under `.multihop/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the factory knows how to build.
pub const KNOWN_PROVIDERS: &[&str] = &["ollama", "openai"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .multihop/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Provider tried first on every generation call
    pub primary: ProviderSettings,

    /// Provider tried once when the primary fails
    pub secondary: ProviderSettings,

    /// Multi-hop retrieval tuning
    pub retrieval: RetrievalConfig,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,
}

/// Settings for one generation provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Provider identifier ("ollama", "openai")
    pub provider: String,

    /// Model identifier passed to the provider
    pub model: String,

    /// Custom endpoint (base URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Transport timeout for one call, in seconds
    #[serde(rename = "timeoutSecs", default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl ProviderSettings {
    /// Default request timeout when none is configured.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Create settings for a provider/model pair.
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            endpoint: None,
            api_key_env: None,
            timeout_secs: None,
        }
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the API key environment variable.
    pub fn with_api_key_env(mut self, env: impl Into<String>) -> Self {
        self.api_key_env = Some(env.into());
        self
    }

    /// Effective timeout.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs.unwrap_or(Self::DEFAULT_TIMEOUT_SECS))
    }

    /// Apply a `provider` or `provider:model` override.
    ///
    /// Switching to a different provider drops the endpoint and key settings,
    /// which belong to the old provider.
    pub fn apply_override(&mut self, selector: &str) {
        let (provider, model) = match selector.split_once(':') {
            Some((provider, model)) => (provider.trim(), Some(model.trim())),
            None => (selector.trim(), None),
        };

        if !provider.eq_ignore_ascii_case(&self.provider) {
            *self = default_settings_for(provider);
        }

        if let Some(model) = model.filter(|m| !m.is_empty()) {
            self.model = model.to_string();
        }
    }

    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env
            .as_ref()
            .and_then(|env| std::env::var(env).ok())
            .filter(|key| !key.is_empty())
    }

    /// Whether this provider is a hosted API that needs a key.
    pub fn requires_api_key(&self) -> bool {
        self.provider.eq_ignore_ascii_case("openai")
    }
}

/// Default settings for a provider name.
fn default_settings_for(provider: &str) -> ProviderSettings {
    match provider.to_lowercase().as_str() {
        "openai" => {
            ProviderSettings::new("openai", "gpt-4o-mini").with_api_key_env("OPENAI_API_KEY")
        }
        "ollama" => {
            ProviderSettings::new("ollama", "llama3.2").with_endpoint("http://localhost:11434")
        }
        other => ProviderSettings::new(other, ""),
    }
}

/// Character ceiling applied to evidence before it reaches a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBudget {
    /// Per-passage character cap (before the truncation marker)
    #[serde(rename = "maxCharsPerPassage")]
    pub max_chars_per_passage: usize,

    /// Ceiling on the summed passage length
    #[serde(rename = "maxTotalChars")]
    pub max_total_chars: usize,
}

impl EvidenceBudget {
    pub const fn new(max_chars_per_passage: usize, max_total_chars: usize) -> Self {
        Self {
            max_chars_per_passage,
            max_total_chars,
        }
    }
}

/// Tuning knobs of the two-round retrieval protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Passages requested for the original question
    #[serde(rename = "initialK")]
    pub initial_k: usize,

    /// Passages requested per follow-up question
    #[serde(rename = "followupK")]
    pub followup_k: usize,

    /// Upper bound on synthesized follow-up questions
    #[serde(rename = "maxFollowups")]
    pub max_followups: usize,

    /// Upper bound on concurrent follow-up retrievals
    #[serde(rename = "maxConcurrency")]
    pub max_concurrency: usize,

    /// Fusion weight of the documents collection
    #[serde(rename = "documentsWeight")]
    pub documents_weight: f64,

    /// Fusion weight of the transcripts collection
    #[serde(rename = "transcriptsWeight")]
    pub transcripts_weight: f64,

    /// Budget for the follow-up synthesis prompt
    #[serde(rename = "followupBudget")]
    pub followup_budget: EvidenceBudget,

    /// Budget for the final answer prompt
    #[serde(rename = "answerBudget")]
    pub answer_budget: EvidenceBudget,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            initial_k: 15,
            followup_k: 8,
            max_followups: 8,
            max_concurrency: 8,
            documents_weight: 0.6,
            transcripts_weight: 0.4,
            followup_budget: EvidenceBudget::new(1500, 6000),
            answer_budget: EvidenceBudget::new(2000, 10000),
        }
    }
}

impl RetrievalConfig {
    /// Validate tuning values.
    pub fn validate(&self) -> AppResult<()> {
        if self.initial_k == 0 || self.followup_k == 0 {
            return Err(AppError::Config(
                "initialK and followupK must be greater than zero".to_string(),
            ));
        }

        if self.max_concurrency == 0 {
            return Err(AppError::Config(
                "maxConcurrency must be greater than zero".to_string(),
            ));
        }

        let weights = [self.documents_weight, self.transcripts_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AppError::Config(
                "Fusion weights must be non-negative numbers".to_string(),
            ));
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(AppError::Config(format!(
                "Fusion weights must sum to 1.0 (got {})",
                sum
            )));
        }

        for (name, budget) in [
            ("followupBudget", self.followup_budget),
            ("answerBudget", self.answer_budget),
        ] {
            if budget.max_chars_per_passage == 0 || budget.max_total_chars == 0 {
                return Err(AppError::Config(format!(
                    "{} limits must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    workspace: Option<WorkspaceSection>,
    retrieval: Option<RetrievalConfig>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    primary: Option<ProviderSettings>,
    secondary: Option<ProviderSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            primary: default_settings_for("ollama"),
            secondary: default_settings_for("openai"),
            retrieval: RetrievalConfig::default(),
            log_level: None,
            verbose: false,
            no_color: false,
            log_json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `MULTIHOP_WORKSPACE`: Override workspace path
    /// - `MULTIHOP_CONFIG`: Path to config file
    /// - `MULTIHOP_PRIMARY_PROVIDER` / `MULTIHOP_PRIMARY_MODEL`
    /// - `MULTIHOP_SECONDARY_PROVIDER` / `MULTIHOP_SECONDARY_MODEL`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use multihop_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with(None, None)
    }

    /// Load configuration, letting explicit paths win over the environment.
    pub fn load_with(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace = workspace
            .or_else(|| std::env::var("MULTIHOP_WORKSPACE").ok().map(PathBuf::from));
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var("MULTIHOP_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.multihop_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("MULTIHOP_PRIMARY_PROVIDER") {
            config.primary.apply_override(&provider);
        }
        if let Ok(model) = std::env::var("MULTIHOP_PRIMARY_MODEL") {
            config.primary.model = model;
        }
        if let Ok(provider) = std::env::var("MULTIHOP_SECONDARY_PROVIDER") {
            config.secondary.apply_override(&provider);
        }
        if let Ok(model) = std::env::var("MULTIHOP_SECONDARY_MODEL") {
            config.secondary.model = model;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge(config_file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            self.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(json) = logging.json {
                self.log_json = json;
            }
        }

        if let Some(llm) = file.llm {
            if let Some(primary) = llm.primary {
                self.primary = primary;
            }
            if let Some(secondary) = llm.secondary {
                self.secondary = secondary;
            }
        }

        if let Some(retrieval) = file.retrieval {
            self.retrieval = retrieval;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the file.
    pub fn with_overrides(
        mut self,
        primary: Option<String>,
        secondary: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(primary) = primary {
            self.primary.apply_override(&primary);
        }

        if let Some(secondary) = secondary {
            self.secondary.apply_override(&secondary);
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .multihop directory.
    pub fn multihop_dir(&self) -> PathBuf {
        self.workspace.join(".multihop")
    }

    /// Directory holding one sub-directory of JSONL passages per collection.
    pub fn collections_dir(&self) -> PathBuf {
        self.multihop_dir().join("collections")
    }

    /// Directory holding prompt template overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.multihop_dir().join("prompts")
    }

    /// Ensure the .multihop directory exists.
    pub fn ensure_multihop_dir(&self) -> AppResult<()> {
        let dir = self.multihop_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .multihop directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate both provider slots and the retrieval tuning.
    pub fn validate(&self) -> AppResult<()> {
        for (slot, settings) in [("primary", &self.primary), ("secondary", &self.secondary)] {
            let provider = settings.provider.to_lowercase();
            if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
                return Err(AppError::Config(format!(
                    "Unknown {} provider: {}. Supported: {}",
                    slot,
                    settings.provider,
                    KNOWN_PROVIDERS.join(", ")
                )));
            }

            if settings.model.trim().is_empty() {
                return Err(AppError::Config(format!("No model set for {} provider", slot)));
            }

            if settings.requires_api_key() && settings.resolve_api_key().is_none() {
                return Err(AppError::Config(format!(
                    "API key for {} provider not found in environment variable: {}",
                    slot,
                    settings.api_key_env.as_deref().unwrap_or("<unset>")
                )));
            }
        }

        self.retrieval.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn local_pair() -> AppConfig {
        let mut config = AppConfig::default();
        config.secondary = ProviderSettings::new("ollama", "qwen2.5");
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.primary.provider, "ollama");
        assert_eq!(config.secondary.provider, "openai");
        assert_eq!(config.retrieval.initial_k, 15);
        assert_eq!(config.retrieval.followup_k, 8);
        assert_eq!(config.retrieval.max_followups, 8);
        assert_eq!(config.retrieval.followup_budget, EvidenceBudget::new(1500, 6000));
        assert_eq!(config.retrieval.answer_budget, EvidenceBudget::new(2000, 10000));
        assert!(!config.verbose);
    }

    #[test]
    fn test_multihop_dirs() {
        let config = AppConfig::default();
        assert!(config.multihop_dir().ends_with(".multihop"));
        assert!(config.collections_dir().ends_with(".multihop/collections"));
        assert!(config.prompts_dir().ends_with(".multihop/prompts"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            Some("openai:gpt-4o".to_string()),
            Some("ollama".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.primary.provider, "openai");
        assert_eq!(config.primary.model, "gpt-4o");
        assert_eq!(config.primary.api_key_env.as_deref(), Some("OPENAI_API_KEY"));
        assert_eq!(config.secondary.provider, "ollama");
        assert_eq!(config.secondary.model, "llama3.2");
        assert!(config.verbose);
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_override_same_provider_keeps_endpoint() {
        let mut settings =
            ProviderSettings::new("ollama", "llama3.2").with_endpoint("http://gpu:11434");
        settings.apply_override("ollama:mistral");
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.endpoint.as_deref(), Some("http://gpu:11434"));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = local_pair();
        config.primary.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_local_pair() {
        assert!(local_pair().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_api_key() {
        let mut config = local_pair();
        config.secondary = ProviderSettings::new("openai", "gpt-4o-mini")
            .with_api_key_env("MULTIHOP_TEST_KEY_THAT_IS_NEVER_SET");
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MULTIHOP_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn test_validate_weights_must_sum_to_one() {
        let mut config = local_pair();
        config.retrieval.documents_weight = 0.7;
        assert!(config.validate().is_err());

        config.retrieval.transcripts_weight = 0.3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_k() {
        let mut config = local_pair();
        config.retrieval.followup_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_yaml_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  primary:
    provider: openai
    model: gpt-4o
    apiKeyEnv: MY_KEY
    timeoutSecs: 20
  secondary:
    provider: ollama
    model: llama3.2
    endpoint: http://localhost:11434
retrieval:
  initialK: 10
  answerBudget:
    maxCharsPerPassage: 1000
    maxTotalChars: 4000
logging:
  level: debug
  color: false
"#,
        )
        .unwrap();

        let config = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(config.primary.provider, "openai");
        assert_eq!(config.primary.api_key_env.as_deref(), Some("MY_KEY"));
        assert_eq!(config.primary.timeout(), std::time::Duration::from_secs(20));
        assert_eq!(config.secondary.endpoint.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.retrieval.initial_k, 10);
        // Unspecified retrieval keys keep their defaults
        assert_eq!(config.retrieval.followup_k, 8);
        assert_eq!(config.retrieval.answer_budget, EvidenceBudget::new(1000, 4000));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert!(config.no_color);
    }

    #[test]
    fn test_load_with_missing_explicit_config_file() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_with(
            Some(temp.path().to_path_buf()),
            Some(temp.path().join("nope.yaml")),
        );
        assert!(result.is_err());
    }
}
