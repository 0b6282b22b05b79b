//! Configuration loading, validation, and management for IntelliCore.
//!
//! Loads configuration from `~/.intellicore/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.intellicore/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the OpenAI-compatible endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chat model used by every stage
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Embedding model used by the knowledge base
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Per-request timeout for model calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Where checkpoints and the knowledge base live (default: the config dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub research: ResearchConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub knowledge_base: KnowledgeBaseConfig,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "deepseek-ai/DeepSeek-R1-Distill-Qwen-7B".into()
}
fn default_embedding_model() -> String {
    "Qwen/Qwen3-Embedding-4B".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("data_dir", &self.data_dir)
            .field("research", &self.research)
            .field("workflow", &self.workflow)
            .field("checkpoint", &self.checkpoint)
            .field("search", &self.search)
            .field("knowledge_base", &self.knowledge_base)
            .finish()
    }
}

/// What the research stage does when its reasoning loop fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchFailureMode {
    /// Write descriptive placeholder findings and let the report be written
    #[default]
    Placeholder,
    /// Fail the research stage, halting the run
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    #[serde(default)]
    pub on_failure: ResearchFailureMode,

    /// Also offer the calculator tool to the research agent
    #[serde(default)]
    pub calculator: bool,
}

fn default_max_iterations() -> usize {
    8
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            on_failure: ResearchFailureMode::default(),
            calculator: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Upper bound on stages running at once within one session
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointBackend {
    Memory,
    File,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,

    /// Database file (sqlite) or directory (file). Defaults under `data_dir`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_cse_id: Option<String>,

    /// Number of results requested per query
    #[serde(default = "default_search_results")]
    pub results: u32,

    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

fn default_search_results() -> u32 {
    5
}
fn default_search_endpoint() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}

impl SearchConfig {
    /// Both credentials are present.
    pub fn is_configured(&self) -> bool {
        self.google_api_key.is_some() && self.google_cse_id.is_some()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_cse_id: None,
            results: default_search_results(),
            endpoint: default_search_endpoint(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("google_cse_id", &self.google_cse_id)
            .field("results", &self.results)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Chunks returned per retrieval query
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_collection() -> String {
    "intelli-core-kb".into()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    3
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.intellicore/config.toml).
    ///
    /// Environment variables override file values:
    /// - `INTELLICORE_API_KEY`, then `OPENAI_API_KEY`
    /// - `OPENAI_BASE_URL`
    /// - `INTELLICORE_MODEL`
    /// - `GOOGLE_API_KEY`, `GOOGLE_CSE_ID`
    /// - `INTELLICORE_DATA_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("INTELLICORE_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = lookup("INTELLICORE_MODEL") {
            self.default_model = model;
        }
        if let Some(key) = lookup("GOOGLE_API_KEY") {
            self.search.google_api_key = Some(key);
        }
        if let Some(id) = lookup("GOOGLE_CSE_ID") {
            self.search.google_cse_id = Some(id);
        }
        if let Some(dir) = lookup("INTELLICORE_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".intellicore")
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Self::config_dir)
    }

    /// Resolved checkpoint location for the configured backend.
    pub fn checkpoint_path(&self) -> PathBuf {
        if let Some(path) = &self.checkpoint.path {
            return path.clone();
        }
        match self.checkpoint.backend {
            CheckpointBackend::Sqlite => self.data_dir().join("checkpoints.db"),
            CheckpointBackend::File | CheckpointBackend::Memory => {
                self.data_dir().join("checkpoints")
            }
        }
    }

    /// JSONL file backing the knowledge-base collection.
    pub fn knowledge_base_path(&self) -> PathBuf {
        self.data_dir()
            .join("knowledge")
            .join(format!("{}.jsonl", self.knowledge_base.collection))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.research.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "research.max_iterations must be > 0".into(),
            ));
        }

        if self.workflow.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "workflow.max_concurrency must be > 0".into(),
            ));
        }

        let kb = &self.knowledge_base;
        if kb.chunk_size == 0 || kb.chunk_overlap >= kb.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "knowledge_base.chunk_overlap ({}) must be smaller than chunk_size ({})",
                kb.chunk_overlap, kb.chunk_size
            )));
        }

        if kb.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "knowledge_base.top_k must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            default_model: default_model(),
            embedding_model: default_embedding_model(),
            temperature: 0.0,
            max_tokens: None,
            request_timeout_secs: default_request_timeout_secs(),
            data_dir: None,
            research: ResearchConfig::default(),
            workflow: WorkflowConfig::default(),
            checkpoint: CheckpointConfig::default(),
            search: SearchConfig::default(),
            knowledge_base: KnowledgeBaseConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
