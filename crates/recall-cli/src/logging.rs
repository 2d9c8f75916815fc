//! Logging configuration and initialization.
//!
//! Presets map CLI flags onto per-target filter directives; `RUST_LOG`
//! always wins when set. JSON output is available for log aggregation.

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Production: important events only.
    #[default]
    Production,
    /// Verbose: operational detail from every store component.
    Verbose,
    /// Debug: per-operation detail, including cache and fan-out decisions.
    Debug,
    /// Quiet: warnings and errors only.
    Quiet,
}

impl LogPreset {
    /// Determine the preset from CLI flags. Quiet wins, then the noisier
    /// flags in descending order.
    pub fn from_flags(verbose: bool, debug: bool, quiet: bool) -> Self {
        if quiet {
            LogPreset::Quiet
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        }
    }

    fn filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        let directives = match self {
            LogPreset::Production => "recall::store=info,recall::write=warn,recall::read=warn,recall::cache=warn,recall::directory=info,recall::identity=warn,recall::session=warn",
            LogPreset::Verbose => "recall=info",
            LogPreset::Debug => "recall=debug",
            LogPreset::Quiet => "recall=warn",
        };
        EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize the tracing subscriber.
pub fn init(preset: LogPreset, format: LogFormat) {
    let filter = preset.filter();
    match format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}
