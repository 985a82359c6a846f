//! Log output for the clickstream server.
//!
//! Console output is compact text. Collectors that ship logs elsewhere set
//! `LOG_JSON` to get one JSON object per line with file, line and thread ids.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt as _,
    EnvFilter,
};

/// Filter used when `RUST_LOG` is unset or unparsable.
///
/// Keeps the workspace crates at `info` and quiets per-connection chatter
/// from the HTTP and database clients.
pub const DEFAULT_LOG_FILTER: &str = "info,hyper=warn,clickhouse=warn,tower_http=info";

/// Line format for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Read a `LOG_JSON` value. `1`, `true`, `yes` select JSON.
    pub fn from_flag(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if matches!(v.as_str(), "1" | "true" | "yes") => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Logging settings for one process.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// `EnvFilter` directives, e.g. `analytics=debug,store=debug`
    pub filter: String,
    pub format: LogFormat,
    /// Emit span open/close lines. Useful when timing view computation.
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Text,
            span_events: false,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_span_events(mut self, span_events: bool) -> Self {
        self.span_events = span_events;
        self
    }

    /// Settings from `RUST_LOG` and `LOG_JSON`.
    pub fn from_env() -> Self {
        let filter = std::env::var("RUST_LOG")
            .ok()
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        let format = LogFormat::from_flag(std::env::var("LOG_JSON").ok().as_deref());
        Self::new().with_filter(filter).with_format(format)
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Install the global subscriber.
///
/// Returns `false` if one was already installed, which happens when several
/// tests in one binary start a server.
pub fn init_tracing(config: TracingConfig) -> bool {
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let installed = match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(span_events)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
            .is_ok(),
        LogFormat::Text => registry
            .with(fmt::layer().compact().with_span_events(span_events).with_target(true))
            .try_init()
            .is_ok(),
    };

    if installed {
        tracing::info!(filter = %config.filter, format = ?config.format, "Logging ready");
    }
    installed
}

/// Install the global subscriber from `RUST_LOG` and `LOG_JSON`.
pub fn init_tracing_from_env() -> bool {
    init_tracing(TracingConfig::from_env())
}
