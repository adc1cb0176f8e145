//! Logging setup for hosts driving a [`Scheduler`](crate::Scheduler).
//!
//! The hook crates only emit `tracing` events; nothing is printed until a
//! subscriber is installed. [`TracingConfig`] installs one.
//!
//! | Target | Level | Events |
//! |--------|-------|--------|
//! | `cadence_hooks` | `debug` | Cell creation and eviction |
//! | `cadence_hooks` | `trace` | Context finish, `hook_context` span |
//! | `cadence_std` | `warn` | Event sources that could not be disconnected |
//! | `cadence_scheduler` | `debug` / `warn` | System registration, system failures |
//!
//! # Example
//!
//! ```
//! use cadence_scheduler::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! TracingConfig::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("cadence_hooks=trace,cadence_std=warn")
//!     .init();
//! ```

use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the global `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    level: Level,
    format: TracingFormat,
    /// Directive string such as `"cadence_hooks=debug,cadence_std=warn"`.
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
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

    /// Sets target-specific levels, `target=level,target=level,...`.
    ///
    /// An unparsable filter falls back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Logs a line when each span closes, including `hook_context`.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// The configured maximum level.
    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    /// The configured output format.
    #[must_use]
    pub fn format(&self) -> TracingFormat {
        self.format
    }

    /// The filter `init` installs: the directives when they parse, the
    /// configured level otherwise.
    fn filter(&self) -> EnvFilter {
        let fallback = || EnvFilter::new(self.level.as_str());
        self.env_filter
            .as_deref()
            .map_or_else(fallback, |directives| {
                EnvFilter::try_new(directives).unwrap_or_else(|_| fallback())
            })
    }

    /// Installs the global subscriber.
    ///
    /// With span events on, every closed `hook_context` span reports how long
    /// the invocation and its eviction pass took. Does nothing if a global
    /// subscriber is already set.
    pub fn init(&self) {
        let span_events = if self.span_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let fmt = tracing_subscriber::fmt::layer().with_span_events(span_events);
        let output: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            TracingFormat::Pretty => fmt.pretty().boxed(),
            TracingFormat::Compact => fmt.compact().boxed(),
            TracingFormat::Json => fmt.json().boxed(),
        };

        let installed = tracing_subscriber::registry()
            .with(output)
            .with(self.filter())
            .try_init()
            .is_ok();

        if installed {
            tracing::info!(level = %self.level, format = ?self.format, "tracing initialized");
        }
    }
}
