//! Logging setup for provider binaries.
//!
//! Logs always go to **stderr**; stdout belongs to the plugin handshake.
//! The filter comes from the first non-empty, parseable environment variable
//! in [`LogOptions::env_vars`] (`TF_LOG_PROVIDER`, then `RUST_LOG`) and falls
//! back to [`LogOptions::default_level`].
//!
//! # Quick Start
//!
//! ```ignore
//! use tfplugin_schema::logging::{init_logging_with, LogOptions};
//!
//! fn main() {
//!     init_logging_with(LogOptions::new().with_default_level("debug"));
//!     tracing::info!("provider starting");
//! }
//! ```
//!
//! ```bash
//! # Debug logs for the engine only
//! TF_LOG_PROVIDER=tfplugin_schema=debug ./my-provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable read before `RUST_LOG`.
pub const PROVIDER_LOG_ENV: &str = "TF_LOG_PROVIDER";

/// Options for [`init_logging_with`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Filter used when no environment variable provides one.
    pub default_level: String,
    /// Environment variables consulted in order.
    pub env_vars: Vec<String>,
    /// Print the event target (module path).
    pub with_target: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            env_vars: vec![PROVIDER_LOG_ENV.to_string(), "RUST_LOG".to_string()],
            with_target: true,
        }
    }
}

impl LogOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fallback filter.
    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    /// Replace the environment variables consulted.
    pub fn with_env_vars<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_vars = vars.into_iter().map(Into::into).collect();
        self
    }

    /// Show or hide event targets.
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }

    fn filter(&self) -> EnvFilter {
        let directive = resolve_directive(self, |name| std::env::var(name).ok());
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn resolve_directive<F>(options: &LogOptions, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    options
        .env_vars
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty() && EnvFilter::try_new(value).is_ok())
        .unwrap_or_else(|| options.default_level.clone())
}

/// Initialize logging with default options.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with(LogOptions::default());
}

/// Initialize logging with the given options.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with(options: LogOptions) {
    tracing_subscriber::registry()
        .with(options.filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(options.with_target)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}

/// Like [`init_logging_with`], but returns `false` instead of panicking when
/// a subscriber is already set.
pub fn try_init_logging_with(options: LogOptions) -> bool {
    tracing_subscriber::registry()
        .with(options.filter())
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(options.with_target)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .try_init()
        .is_ok()
}
