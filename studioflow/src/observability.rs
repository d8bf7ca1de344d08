//! Logging setup.

use crate::errors::StudioError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(StudioError::Config(format!("unknown log format '{other}'"))),
        }
    }
}

/// Installs a global `tracing` subscriber.
///
/// Uses `RUST_LOG` if set, otherwise `default_directive` (e.g. `info` or
/// `studioflow=debug`). Returns an error if a subscriber is already set.
pub fn init_tracing(format: LogFormat, default_directive: &str) -> Result<(), StudioError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| StudioError::Config(format!("invalid log filter: {e}")))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| StudioError::Config(format!("tracing already initialized: {e}")))
}
