//! Logging initialization.
//!
//! `LoggerManager` validates the `[logger]` configuration and installs the
//! global `tracing` subscriber with a console layer, a systemd journald
//! layer, or both. Each layer gets its own `EnvFilter`, taken from
//! `RUST_LOG` when set and from the configured level otherwise.

use std::{fmt as std_fmt, io};

use thiserror::Error;
use time::{
    format_description::{well_known::Rfc3339, OwnedFormatItem},
    OffsetDateTime,
};
use tracing_subscriber::{
    fmt::{
        self,
        format::{FmtSpan, Writer},
        time::{FormatTime, UtcTime},
    },
    prelude::*,
    EnvFilter, Layer,
};
use validator::{Validate, ValidationErrors};

use crate::{
    config::logger::{ConsoleConfig, JournaldConfig, LogFormat, LoggerConfig, TimestampFormat},
    print_info, print_warn,
};

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

/// Errors that can occur during logger configuration or initialization.
#[derive(Error, Debug)]
pub enum LoggerError {
    /// General initialization failure with a descriptive message.
    #[error("Logger initialization error: {0}")]
    InitializationError(String),

    /// Validation errors from the logger configuration struct.
    #[error("Logger configuration validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    /// IO error, typically while connecting to the journald socket.
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    /// Every output is disabled.
    #[error("No logging layers were configured or successfully initialized")]
    NoLayersConfigured,

    /// Journald could not be reached and the console is also enabled, so the
    /// configuration is asking for something this host cannot give.
    #[error(
        "Failed to initialize journald logger, and console logger is enabled. Please check your configuration."
    )]
    JournaldFailedWithConsoleEnabled,
}

/// Timestamp rendering for console events.
enum LogTimer {
    Rfc3339(UtcTime<Rfc3339>),
    Unix,
    Custom(UtcTime<OwnedFormatItem>),
}

impl LogTimer {
    fn from_config(format: &TimestampFormat) -> Result<Self, LoggerError> {
        Ok(match format {
            TimestampFormat::Rfc3339 => LogTimer::Rfc3339(UtcTime::rfc_3339()),
            TimestampFormat::Unix => LogTimer::Unix,
            TimestampFormat::Custom(description) => {
                let items = time::format_description::parse_owned::<2>(description).map_err(
                    |e| LoggerError::InitializationError(format!("Bad timestamp format: {e}")),
                )?;
                LogTimer::Custom(UtcTime::new(items))
            }
        })
    }
}

impl FormatTime for LogTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std_fmt::Result {
        match self {
            LogTimer::Rfc3339(timer) => timer.format_time(w),
            LogTimer::Unix => write!(w, "{}", OffsetDateTime::now_utc().unix_timestamp()),
            LogTimer::Custom(timer) => timer.format_time(w),
        }
    }
}

/// Manages logging configuration and global subscriber initialization.
pub struct LoggerManager {
    config: LoggerConfig,
}

impl LoggerManager {
    /// Creates a new `LoggerManager` and validates the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns `LoggerError::ValidationError` if configuration validation fails.
    pub fn new(config: LoggerConfig) -> Result<Self, LoggerError> {
        config.validate()?;

        Ok(LoggerManager { config })
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.config.level))
    }

    /// Builds the enabled layers without installing them.
    fn layers(&self) -> Result<Vec<BoxedLayer>, LoggerError> {
        let mut layers = Vec::new();

        if let Some(console_config) = self.config.console.as_ref().filter(|c| c.enabled) {
            layers.push(self.console_layer(console_config)?);
        }

        if let Some(journald_config) = self.config.journald.as_ref().filter(|j| j.enabled) {
            match self.journald_layer(journald_config) {
                Ok(layer) => {
                    layers.push(layer);
                    print_info!(
                        "Systemd journald logger initialized with identifier: {}",
                        journald_config.identifier
                    );
                }
                Err(e) => {
                    print_warn!("Failed to initialize systemd journald logger: {}", e);
                    if self.config.console.as_ref().is_some_and(|c| c.enabled) {
                        return Err(LoggerError::JournaldFailedWithConsoleEnabled);
                    }
                }
            }
        }

        if layers.is_empty() {
            print_warn!("No logging layers were initialized. Please check your configuration.");
            return Err(LoggerError::NoLayersConfigured);
        }

        Ok(layers)
    }

    /// Installs the global `tracing` subscriber. Call once, before the first
    /// event is emitted.
    ///
    /// # Errors
    ///
    /// Returns an error if no layer can be created, if journald fails while
    /// the console is also requested, or if a subscriber is already set.
    pub fn init(&mut self) -> Result<(), LoggerError> {
        let layers = self.layers()?;
        tracing_subscriber::registry()
            .with(layers)
            .try_init()
            .map_err(|e| LoggerError::InitializationError(e.to_string()))
    }

    fn console_layer(&self, config: &ConsoleConfig) -> Result<BoxedLayer, LoggerError> {
        let timer = LogTimer::from_config(&self.config.timestamp_format)?;
        let spans = if config.show_spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let base = fmt::layer()
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_span_events(spans)
            .with_ansi(config.ansi_colors)
            .with_timer(timer)
            .with_writer(io::stdout);

        let layer = match config.format {
            LogFormat::Json => base.json().with_filter(self.filter()).boxed(),
            LogFormat::Pretty => base.pretty().with_filter(self.filter()).boxed(),
            LogFormat::Compact => base.compact().with_filter(self.filter()).boxed(),
        };

        Ok(layer)
    }

    fn journald_layer(&self, config: &JournaldConfig) -> Result<BoxedLayer, LoggerError> {
        let layer = tracing_journald::layer()?.with_syslog_identifier(config.identifier.clone());
        Ok(layer.with_filter(self.filter()).boxed())
    }
}
