//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.lms-receipt.toml` files.

use crate::cli::{AnalyticsKind, OutputFormat};
use crate::receipt::page::is_valid_container_id;
use crate::receipt::DEFAULT_CONTAINER_ID;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".lms-receipt.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// LMS API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Template settings.
    #[serde(default)]
    pub templates: TemplatesConfig,

    /// Analytics settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: OutputFormat::default(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "receipt.html".to_string()
}

/// LMS API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the LMS, without a trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Extra attempts on transport failures and 5xx responses.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Raw `Cookie` header value, e.g. `sessionid=...`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,

    /// Bearer token for OAuth-protected deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            session_cookie: None,
            bearer_token: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

/// Template settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Directory holding `receipt.html`, `provider.html` and optionally `page.html`.
    /// Builtin templates are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Id of the element the receipt is mounted into.
    #[serde(default = "default_container_id")]
    pub container_id: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            container_id: default_container_id(),
        }
    }
}

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

/// Analytics settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Where "Completed Order" events go.
    #[serde(default)]
    pub sink: AnalyticsKind,

    /// File path for `jsonl`, collector URL for `http`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref base_url) = args.base_url {
            self.api.base_url = base_url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(retries) = args.retries {
            self.api.retries = retries;
        }

        if let Some(ref dir) = args.templates {
            self.templates.dir = Some(dir.clone());
        }
        if let Some(ref container) = args.container {
            self.templates.container_id = container.clone();
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        if let Some(sink) = args.analytics {
            self.analytics.sink = sink;
        }
        if let Some(ref target) = args.analytics_target {
            self.analytics.target = Some(target.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check merged settings that the command line cannot vouch for.
    pub fn validate(&self) -> Result<()> {
        let url = &self.api.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("api.base_url must start with 'http://' or 'https://': {}", url);
        }
        if self.api.timeout_seconds == 0 {
            bail!("api.timeout_seconds must be at least 1");
        }
        if !is_valid_container_id(&self.templates.container_id) {
            bail!(
                "templates.container_id may only contain letters, digits, '-', '_', ':' and '.': {:?}",
                self.templates.container_id
            );
        }
        Ok(())
    }

    /// Log level from the merged settings. `--quiet` wins over `verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
