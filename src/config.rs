use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::DEFAULT_SERVER_URL;
use crate::comments::{UndeletePolicy, UndeleteStrategy};
use crate::router::INITIAL_PATH;
use crate::slider::TRANSITION_MS;

/// Lobster - marketplace client
///
/// Talks to the lobster API: session refresh, comments and replies.
/// Configuration priority: CLI args > Environment variables > TOML file > Defaults
#[derive(Parser, Debug, Default)]
#[command(name = "lobster")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lobster marketplace client", long_about = None)]
pub struct CliArgs {
    /// TOML file with defaults for any option below
    #[arg(short, long, env = "LOBSTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// API base URL
    #[arg(long, env = "LOBSTER_SERVER_URL")]
    pub server_url: Option<String>,

    /// HTTP request timeout in milliseconds (1000-60000)
    #[arg(long, env = "LOBSTER_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,

    /// Access-token refresh interval in seconds (60-86400)
    #[arg(long, env = "LOBSTER_REFRESH_SECS")]
    pub refresh_interval_secs: Option<u64>,

    /// Page transition length in milliseconds (1-5000)
    #[arg(long, env = "LOBSTER_TRANSITION_MS")]
    pub transition_ms: Option<u64>,

    /// Path the router starts on
    #[arg(long, env = "LOBSTER_INITIAL_PATH")]
    pub initial_path: Option<String>,

    /// Refresh token from an earlier login
    #[arg(long, env = "LOBSTER_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// How deleted comments come back: recreate or endpoint
    #[arg(long, env = "LOBSTER_COMMENT_UNDELETE")]
    pub comment_undelete: Option<UndeleteStrategy>,

    /// How deleted replies come back: recreate or endpoint
    #[arg(long, env = "LOBSTER_REPLY_UNDELETE")]
    pub reply_undelete: Option<UndeleteStrategy>,

    /// Debug categories, comma-separated (router,slider,sync,auth,api,notify or all)
    #[arg(long, env = "LOBSTER_DEBUG")]
    pub debug: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in and print the refresh token
    Login {
        email: String,
        #[arg(long, env = "LOBSTER_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List a post's comments
    Comments { post: String },
    /// Comment on a post
    Comment { post: String, text: String },
    /// Reply to a comment
    Reply {
        post: String,
        parent: String,
        text: String,
    },
    /// Change a comment's text
    Edit {
        post: String,
        uuid: String,
        text: String,
    },
    /// Delete a comment
    Delete { post: String, uuid: String },
    /// Bring a deleted comment back
    Undelete { post: String, uuid: String },
    /// Re-list a post's comments periodically, refreshing the session, until Ctrl-C
    Watch {
        post: String,
        #[arg(long, default_value_t = 30)]
        every_secs: u64,
    },
    /// Replay navigation (`/path[:direction]` or `back`) and print each state
    Routes { steps: Vec<String> },
}

/// Optional `lobster.toml`; every key mirrors a CLI flag.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server_url: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub refresh_interval_secs: Option<u64>,
    pub transition_ms: Option<u64>,
    pub initial_path: Option<String>,
    pub refresh_token: Option<String>,
    pub comment_undelete: Option<UndeleteStrategy>,
    pub reply_undelete: Option<UndeleteStrategy>,
    pub debug: Option<String>,
}

impl FileConfig {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub server_url: String,
    pub request_timeout_ms: u64,
    pub refresh_interval_secs: u64,
    pub transition_ms: u64,
    pub initial_path: String,
    pub refresh_token: Option<String>,
    pub undelete: UndeletePolicy,
    pub debug: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_ms: 10_000,
            refresh_interval_secs: 15 * 60,
            transition_ms: TRANSITION_MS,
            initial_path: INITIAL_PATH.to_string(),
            refresh_token: None,
            undelete: UndeletePolicy::default(),
            debug: None,
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

/// Validate URL format (basic check)
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

/// Parse the process arguments and merge them with the config file.
pub fn load() -> Result<(Config, Option<Command>)> {
    let args = CliArgs::parse();
    let file = match &args.config {
        Some(path) => FileConfig::read(path)?,
        None => {
            let default = Path::new("lobster.toml");
            if default.exists() {
                FileConfig::read(default)?
            } else {
                FileConfig::default()
            }
        }
    };
    let command = args.command.clone();
    Ok((resolve(args, file)?, command))
}

/// Merge CLI/env values over file values over defaults, then validate.
pub fn resolve(args: CliArgs, file: FileConfig) -> Result<Config> {
    let d = Config::default();

    let server_url = args.server_url.or(file.server_url).unwrap_or(d.server_url);
    validate_url(&server_url, "LOBSTER_SERVER_URL")?;

    let request_timeout_ms = validate_in_range(
        args.request_timeout_ms
            .or(file.request_timeout_ms)
            .unwrap_or(d.request_timeout_ms),
        1000,
        60000,
        "LOBSTER_TIMEOUT_MS",
    )?;

    let refresh_interval_secs = validate_in_range(
        args.refresh_interval_secs
            .or(file.refresh_interval_secs)
            .unwrap_or(d.refresh_interval_secs),
        60,
        86400,
        "LOBSTER_REFRESH_SECS",
    )?;

    let transition_ms = validate_in_range(
        args.transition_ms.or(file.transition_ms).unwrap_or(d.transition_ms),
        1,
        5000,
        "LOBSTER_TRANSITION_MS",
    )?;

    let initial_path = args.initial_path.or(file.initial_path).unwrap_or(d.initial_path);
    if !initial_path.starts_with('/') {
        return Err(anyhow!("LOBSTER_INITIAL_PATH must start with '/', got {initial_path}"));
    }

    let undelete = UndeletePolicy {
        comment: args
            .comment_undelete
            .or(file.comment_undelete)
            .unwrap_or(d.undelete.comment),
        reply: args.reply_undelete.or(file.reply_undelete).unwrap_or(d.undelete.reply),
    };

    Ok(Config {
        server_url,
        request_timeout_ms,
        refresh_interval_secs,
        transition_ms,
        initial_path,
        refresh_token: args
            .refresh_token
            .or(file.refresh_token)
            .filter(|t| !t.is_empty()),
        undelete,
        debug: args.debug.or(file.debug),
    })
}

impl Config {
    pub fn print_summary(&self) {
        eprintln!("Lobster Configuration:");
        eprintln!("  Server: {}", self.server_url);
        eprintln!("  Timeout: {}ms", self.request_timeout_ms);
        eprintln!("  Token refresh: every {}s", self.refresh_interval_secs);
        eprintln!("  Transition: {}ms", self.transition_ms);
        eprintln!("  Initial path: {}", self.initial_path);
        eprintln!(
            "  Undelete: comments={:?} replies={:?}",
            self.undelete.comment, self.undelete.reply
        );
        if self.refresh_token.is_some() {
            eprintln!("  Refresh token: Configured");
        }
    }
}
