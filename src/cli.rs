//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::receipt::page::is_valid_container_id;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// lms-receipt - render an LMS order receipt
///
/// Fetches the order, its course and its credit provider from the LMS REST
/// API, renders the receipt page and emits a "Completed Order" event.
///
/// Examples:
///   lms-receipt --order EDX-123456 --base-url https://courses.example.org
///   lms-receipt --order EDX-123456 --format json --output receipt.json
///   lms-receipt --order EDX-123456 --analytics jsonl --analytics-target events.jsonl
///   lms-receipt --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Order number to render
    #[arg(short = 'n', long, value_name = "NUMBER", required_unless_present = "init_config")]
    pub order: Option<String>,

    /// Base URL of the LMS
    ///
    /// Can also be set via LMS_RECEIPT_BASE_URL or .lms-receipt.toml.
    #[arg(short, long, value_name = "URL", env = "LMS_RECEIPT_BASE_URL")]
    pub base_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .lms-receipt.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory with receipt.html, provider.html and optionally page.html
    #[arg(short, long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Id of the page element the receipt is mounted into
    #[arg(long, value_name = "ID")]
    pub container: Option<String>,

    /// Output file path
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Extra attempts on transport failures and 5xx responses
    #[arg(long, value_name = "NUM")]
    pub retries: Option<u32>,

    /// Where to send the "Completed Order" event
    #[arg(long, value_name = "SINK")]
    pub analytics: Option<AnalyticsKind>,

    /// File path (jsonl) or collector URL (http) for analytics
    #[arg(long, value_name = "PATH|URL")]
    pub analytics_target: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .lms-receipt.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the receipt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Full HTML page with the receipt mounted (default)
    #[default]
    Html,
    /// The merged view model as JSON
    Json,
}

/// Analytics sink selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsKind {
    /// Log the event (default)
    #[default]
    Log,
    /// Append the event to a JSON-lines file
    Jsonl,
    /// POST the event to a collector
    Http,
    /// Drop the event
    Off,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the order number (should be validated first).
    pub fn order_number(&self) -> &str {
        self.order.as_deref().unwrap_or("")
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.order_number().trim().is_empty() {
            return Err("Order number must not be empty".to_string());
        }

        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref dir) = self.templates {
            if !dir.is_dir() {
                return Err(format!(
                    "Template directory does not exist: {}",
                    dir.display()
                ));
            }
        }

        if let Some(ref container) = self.container {
            if !is_valid_container_id(container) {
                return Err(format!("Invalid container id: {:?}", container));
            }
        }

        Ok(())
    }
}
