use anyhow::{anyhow, Result};
use clap::Parser;
use std::time::Duration;

/// feedx - live KOL feed monitor
///
/// Polls the feed backend for the latest posts and highlights the ones that
/// pass your follower/identity rules.
/// Configuration priority: CLI args > Environment variables > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "feedx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live social feed monitor", long_about = None)]
pub struct CliArgs {
    /// Base URL of the feed backend
    #[arg(long, env = "FEED_API_URL")]
    pub api_url: Option<String>,

    /// Number of posts requested per snapshot (1-500)
    #[arg(long, env = "FEED_LIMIT")]
    pub feed_limit: Option<u32>,

    /// Seconds between automatic refreshes (1-3600)
    #[arg(long, env = "REFRESH_INTERVAL_SECS")]
    pub refresh_interval_secs: Option<u64>,

    /// Countdown tick in milliseconds (50-1000)
    #[arg(long, env = "TICK_MS")]
    pub tick_ms: Option<u64>,

    /// HTTP request timeout in milliseconds (1000-60000)
    #[arg(long, env = "HTTP_TIMEOUT_MS")]
    pub http_timeout_ms: Option<u64>,

    /// Target UI rendering FPS (1-120)
    #[arg(long, env = "RENDER_FPS")]
    pub render_fps: Option<u32>,

    /// Path to the SQLite database holding preferences and the block-list
    #[arg(long, env = "PREFS_DB_PATH")]
    pub prefs_db_path: Option<String>,

    /// Start with auto-refresh enabled (true/false)
    #[arg(long, env = "AUTO_UPDATE")]
    pub auto_update: Option<bool>,

    /// Log file (the terminal is owned by the UI)
    #[arg(long, env = "FEEDX_LOG_FILE")]
    pub log_file: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub feed_limit: u32,
    pub refresh_interval_secs: u64,
    pub tick_ms: u64,
    pub http_timeout_ms: u64,
    pub render_fps: u32,
    pub prefs_db_path: String,
    pub auto_update: bool,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".to_string(),
            feed_limit: 50,
            refresh_interval_secs: 10,
            tick_ms: 200,
            http_timeout_ms: 8000,
            render_fps: 30,
            prefs_db_path: "./feedx_prefs.db".to_string(),
            auto_update: true,
            log_file: "./feedx.log".to_string(),
        }
    }
}

/// Validate that a value is within a given range (inclusive)
fn validate_in_range<T>(val: T, min: T, max: T, name: &str) -> Result<T>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    if val < min || val > max {
        Err(anyhow!("{name} must be in range [{min}, {max}], got {val}"))
    } else {
        Ok(val)
    }
}

fn validate_url(url: &str, name: &str) -> Result<()> {
    if url.is_empty() {
        return Err(anyhow!("{name} cannot be empty"));
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!("{name} must start with http:// or https://"))
    }
}

fn non_empty(value: String, name: &str) -> Result<String> {
    if value.trim().is_empty() {
        Err(anyhow!("{name} cannot be empty"))
    } else {
        Ok(value)
    }
}

impl Config {
    /// Resolve parsed arguments (clap has already merged env vars) against
    /// defaults and validate every value.
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let d = Config::default();

        let api_url = args.api_url.unwrap_or(d.api_url);
        let api_url = api_url.trim_end_matches('/').to_string();
        validate_url(&api_url, "FEED_API_URL")?;

        let feed_limit = validate_in_range(args.feed_limit.unwrap_or(d.feed_limit), 1, 500, "FEED_LIMIT")?;
        let refresh_interval_secs = validate_in_range(
            args.refresh_interval_secs.unwrap_or(d.refresh_interval_secs),
            1,
            3600,
            "REFRESH_INTERVAL_SECS",
        )?;
        let tick_ms = validate_in_range(args.tick_ms.unwrap_or(d.tick_ms), 50, 1000, "TICK_MS")?;
        let http_timeout_ms = validate_in_range(
            args.http_timeout_ms.unwrap_or(d.http_timeout_ms),
            1000,
            60000,
            "HTTP_TIMEOUT_MS",
        )?;
        let render_fps = validate_in_range(args.render_fps.unwrap_or(d.render_fps), 1, 120, "RENDER_FPS")?;

        Ok(Config {
            api_url,
            feed_limit,
            refresh_interval_secs,
            tick_ms,
            http_timeout_ms,
            render_fps,
            prefs_db_path: non_empty(args.prefs_db_path.unwrap_or(d.prefs_db_path), "PREFS_DB_PATH")?,
            auto_update: args.auto_update.unwrap_or(d.auto_update),
            log_file: non_empty(args.log_file.unwrap_or(d.log_file), "FEEDX_LOG_FILE")?,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn log_summary(&self) {
        log::info!("feedx configuration:");
        log::info!("  API URL: {}", self.api_url);
        log::info!("  Feed limit: {}", self.feed_limit);
        log::info!("  Refresh interval: {}s (tick {}ms)", self.refresh_interval_secs, self.tick_ms);
        log::info!("  HTTP timeout: {}ms", self.http_timeout_ms);
        log::info!("  Render FPS: {}", self.render_fps);
        log::info!("  Preferences DB: {}", self.prefs_db_path);
        log::info!("  Auto-update: {}", self.auto_update);
    }
}

/// Load configuration from CLI args and environment variables
/// Priority: CLI args > Environment variables > Defaults
pub fn load() -> Result<Config> {
    Config::from_args(CliArgs::parse())
}
