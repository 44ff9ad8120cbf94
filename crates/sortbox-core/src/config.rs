use config::{Config, ConfigError, Environment, File as ConfigFile, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::scanner::source::DEFAULT_SAMPLE_LIMIT;
use crate::scanner::ScanOptions;

pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlannerKind {
    Heuristic,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_planner_kind")]
    pub kind: PlannerKind,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            kind: default_planner_kind(),
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source_root: Option<String>,
    #[serde(default)]
    pub library_root: Option<String>,
    #[serde(default)]
    pub workspace_dir: Option<String>,
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    #[serde(default)]
    pub parallel_moves: bool,
    #[serde(default)]
    pub planner: PlannerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source_root: None,
            library_root: None,
            workspace_dir: None,
            ignore_patterns: default_ignore_patterns(),
            sample_limit: default_sample_limit(),
            parallel_moves: false,
            planner: PlannerConfig::default(),
        }
    }
}

fn default_planner_kind() -> PlannerKind {
    PlannerKind::Heuristic
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_ignore_patterns() -> Vec<String> {
    vec![
        ".DS_Store".to_string(),
        "Thumbs.db".to_string(),
        "desktop.ini".to_string(),
    ]
}

fn default_sample_limit() -> usize {
    DEFAULT_SAMPLE_LIMIT
}

/// `Sortbox.toml` in the working directory (optional), then `SORTBOX_*`
/// environment variables (`SORTBOX_PLANNER__KIND=remote`).
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Sortbox").required(false))
        .add_source(Environment::with_prefix("SORTBOX").separator("__"))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

pub fn load_configuration_from_str(toml: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(ConfigFile::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize::<AppConfig>()
}

impl AppConfig {
    /// Directory holding all pair-keyed workspaces.
    pub fn workspace_base(&self) -> PathBuf {
        match &self.workspace_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .map(|d| d.join("sortbox"))
                .unwrap_or_else(|| PathBuf::from(".sortbox")),
        }
    }

    /// Scan options for SOURCE. The library and workspace are excluded so
    /// they are never offered for placement when nested inside SOURCE.
    pub fn scan_options(&self, library_root: &Path) -> ScanOptions {
        ScanOptions {
            sample_limit: self.sample_limit,
            ignore_patterns: self.ignore_patterns.clone(),
            excluded_paths: vec![library_root.to_path_buf(), self.workspace_base()],
        }
    }
}
