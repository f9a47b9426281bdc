//! Logging plugin.
//!
//! [`TracingPlugin`] installs a `tracing` subscriber in `ready()` and publishes
//! the effective [`TracingConfig`] as a global during `build()`, so the format
//! and level can still be adjusted by earlier plugins before anything is
//! installed.
//!
//! # Example
//!
//! ```
//! use outrigger_core_plugins::{TracingFormat, TracingPlugin};
//! use outrigger_system::server::Server;
//! use tracing::Level;
//!
//! let mut server = Server::new();
//! server.add_plugins(
//!     TracingPlugin::default()
//!         .with_level(Level::DEBUG)
//!         .with_format(TracingFormat::Compact)
//!         .with_env_filter("outrigger_resources=debug,outrigger_scope=info"),
//! );
//! server.finish();
//! ```

use outrigger_system::plugin::Plugin;
use outrigger_system::resource::GlobalResource;
use outrigger_system::server::Server;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding a filter directive, read by [`TracingPlugin::from_env`].
pub const LOG_ENV: &str = "OUTRIGGER_LOG";

/// Environment variable selecting the output format, read by [`TracingPlugin::from_env`].
pub const LOG_FORMAT_ENV: &str = "OUTRIGGER_LOG_FORMAT";

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

impl core::str::FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown tracing format '{other}'")),
        }
    }
}

/// The configuration the subscriber was installed with.
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

impl GlobalResource for TracingConfig {}

/// Tracing and logging plugin.
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    level: Level,
    format: TracingFormat,
    /// Target directives, e.g. `"outrigger_resources=debug"`.
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingPlugin {
    /// Creates a new `TracingPlugin` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads [`LOG_ENV`] and [`LOG_FORMAT_ENV`], keeping defaults for anything
    /// unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let mut plugin = Self::default();
        if let Ok(filter) = std::env::var(LOG_ENV) {
            plugin = plugin.with_env_filter(filter);
        }
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            match format.parse() {
                Ok(format) => plugin = plugin.with_format(format),
                Err(err) => tracing::warn!(error = %err, "ignoring {LOG_FORMAT_ENV}"),
            }
        }
        plugin
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets target-specific directives, `target=level,target=level,...`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        }
    }

    /// Installs the global subscriber. A subscriber installed earlier (by a
    /// test harness or the host) wins and this becomes a no-op.
    fn install(&self) -> bool {
        let registry = tracing_subscriber::registry().with(self.filter());
        let layer = tracing_subscriber::fmt::layer().with_span_events(self.span_events());
        let result = match self.format {
            TracingFormat::Pretty => registry.with(layer.pretty()).try_init(),
            TracingFormat::Compact => registry.with(layer.compact()).try_init(),
            TracingFormat::Json => registry.with(layer.json()).try_init(),
        };
        result.is_ok()
    }
}

impl Plugin for TracingPlugin {
    fn build(&self, server: &mut Server) {
        server.insert_global(TracingConfig {
            level: self.level,
            format: self.format,
        });
    }

    fn ready(&self, _server: &mut Server) {
        let installed = self.install();
        tracing::info!(
            level = %self.level,
            format = ?self.format,
            installed,
            "tracing initialized"
        );
    }

    fn cleanup(&self, _server: &mut Server) {
        tracing::info!("tracing shutting down");
    }
}
