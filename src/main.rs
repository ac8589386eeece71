//! lms-receipt - LMS order receipt renderer
//!
//! Fetches an order, its course and its credit provider from the LMS REST
//! API, renders the receipt page and emits a "Completed Order" event.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (config, network, template, analytics)

mod analytics;
mod api;
mod cli;
mod config;
mod error;
mod models;
mod receipt;

use analytics::{AnalyticsSink, HttpSink, JsonLinesSink, LogSink, NullSink};
use anyhow::{bail, Context, Result};
use api::{HttpTransport, RetryPolicy, TransportConfig};
use cli::{AnalyticsKind, Args, OutputFormat};
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use receipt::{ReceiptView, TemplateSet};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config decides the log level, so it is loaded before logging starts
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.log_level(args.quiet));

    info!("lms-receipt v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Config: {:?}", config);

    if let Err(e) = run(args, config).await {
        error!("Receipt failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .lms-receipt.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", config::CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to set the LMS base URL, templates and analytics sink.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the level from the settings.
fn init_logging(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber was already installed");
    }
}

/// Fetch, render, notify and write the receipt.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let order_number = args.order_number().to_string();
    let view = build_view(&config)?;

    let spinner = spinner(args.quiet);
    spinner.set_message(format!("Fetching receipt for order {}", order_number));

    let result = view.render(&order_number).await;
    spinner.finish_and_clear();
    let rendered = match result {
        Ok(rendered) => rendered,
        Err(e) => {
            if e.is_network() {
                warn!("Check the LMS URL and credentials: {}", config.api.base_url);
            }
            return Err(e).with_context(|| format!("Failed to render order {}", order_number));
        }
    };
    debug!("Rendered {} bytes of receipt markup", rendered.markup.len());

    let output = match config.general.format {
        OutputFormat::Html => view.document(),
        OutputFormat::Json => serde_json::to_string_pretty(&rendered.model)
            .context("Failed to encode view model")?,
    };

    let output_path = Path::new(&config.general.output);
    std::fs::write(output_path, &output)
        .with_context(|| format!("Failed to write receipt to {}", output_path.display()))?;

    let order = &rendered.model.order;
    if !args.quiet {
        println!("🧾 Order {} ({})", order.number, order.status);
        if let Some(ref course) = rendered.model.course {
            println!("   Course: {}", course.name);
        }
        if let Some(provider) = rendered.model.displayed_provider() {
            println!("   Credit provider: {}", provider.display_name);
        }
        println!("   Total: {} {}", order.total_excl_tax, order.currency);
    }

    // The receipt is already on disk; a failed event still fails the run
    rendered
        .notification
        .context("Failed to send the Completed Order event")?;

    if !args.quiet {
        println!(
            "\n✅ Receipt saved to {} in {:.1}s",
            output_path.display(),
            start_time.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

/// Wire the transport, templates and analytics sink from configuration.
fn build_view(config: &Config) -> Result<ReceiptView> {
    let timeout = Duration::from_secs(config.api.timeout_seconds);

    let transport = HttpTransport::new(TransportConfig {
        base_url: config.api.base_url.clone(),
        timeout,
        retry: RetryPolicy::with_retries(config.api.retries),
        session_cookie: config.api.session_cookie.clone(),
        bearer_token: config.api.bearer_token.clone(),
    })
    .context("Failed to create HTTP client")?;
    info!("LMS: {}", config.api.base_url);

    let templates = match config.templates.dir {
        Some(ref dir) => TemplateSet::from_dir(dir)
            .with_context(|| format!("Failed to load templates from {}", dir.display()))?,
        None => TemplateSet::builtin(),
    };

    let sink = build_sink(config, timeout)?;

    Ok(ReceiptView::new(
        Arc::new(transport),
        templates,
        sink,
        config.templates.container_id.clone(),
    ))
}

fn build_sink(config: &Config, timeout: Duration) -> Result<Arc<dyn AnalyticsSink>> {
    let target = config.analytics.target.as_deref();

    let sink: Arc<dyn AnalyticsSink> = match (config.analytics.sink, target) {
        (AnalyticsKind::Log, _) => Arc::new(LogSink),
        (AnalyticsKind::Off, _) => Arc::new(NullSink),
        (AnalyticsKind::Jsonl, Some(path)) => Arc::new(JsonLinesSink::new(path)),
        (AnalyticsKind::Http, Some(url)) => Arc::new(
            HttpSink::new(url, timeout).context("Failed to create analytics HTTP client")?,
        ),
        (kind, None) => bail!("Analytics sink {:?} needs --analytics-target", kind),
    };

    Ok(sink)
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    match ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        Ok(style) => pb.set_style(style),
        Err(e) => warn!("Invalid spinner template: {}", e),
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load configuration from file or defaults, merged with the arguments.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        Some(ref config_path) => Config::load(config_path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };

    config.merge_with_args(args);
    config.validate()?;
    Ok(config)
}
