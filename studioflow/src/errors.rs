//! Error types for studioflow.
//!
//! Gate violations, provider failures and export problems each get their
//! own enum; [`StudioError`] wraps them for operations that can hit several.

use crate::core::{ArtifactStatus, StageId};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for studioflow operations.
#[derive(Debug, Error)]
pub enum StudioError {
    /// An approval gate rejected the operation.
    #[error("{0}")]
    Gate(#[from] GateError),

    /// A generation provider call failed.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// A runner received or produced an artifact of the wrong shape.
    #[error("Invalid artifact for stage '{stage}': {message}")]
    InvalidArtifact {
        /// The stage being processed.
        stage: StageId,
        /// What was wrong.
        message: String,
    },

    /// The export bundle could not be assembled.
    #[error("Export error: {0}")]
    Export(String),

    /// A run was cancelled.
    #[error("Run cancelled: {0}")]
    Cancelled(String),

    /// Configuration was missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The persistence backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StudioError {
    /// Creates an invalid artifact error.
    #[must_use]
    pub fn invalid_artifact(stage: StageId, message: impl Into<String>) -> Self {
        Self::InvalidArtifact {
            stage,
            message: message.into(),
        }
    }

    /// Short machine-readable kind, used in event payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Gate(_) => "gate",
            Self::Provider(_) => "provider",
            Self::InvalidArtifact { .. } => "invalid_artifact",
            Self::Export(_) => "export",
            Self::Cancelled(_) => "cancelled",
            Self::Config(_) => "config",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = match self {
            Self::Gate(e) => e.to_dict(),
            Self::Provider(e) => e.to_dict(),
            _ => HashMap::new(),
        };
        map.insert("kind".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));
        map
    }
}

/// Errors raised by the approval gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    /// One or more upstream stages have not been approved.
    #[error("Stage '{stage}' is blocked: upstream not approved ({})", join_stages(.missing))]
    UpstreamNotApproved {
        /// The blocked stage.
        stage: StageId,
        /// Upstream stages still waiting for approval.
        missing: Vec<StageId>,
    },

    /// The stage has no completed artifact to approve.
    #[error("Stage '{stage}' has no completed artifact (status: {status})")]
    ArtifactNotReady {
        /// The stage.
        stage: StageId,
        /// Its current status.
        status: ArtifactStatus,
    },

    /// The stage is already generating.
    #[error("Stage '{stage}' is already generating")]
    AlreadyGenerating {
        /// The stage.
        stage: StageId,
    },
}

fn join_stages(stages: &[StageId]) -> String {
    stages
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl GateError {
    /// The stage the error refers to.
    #[must_use]
    pub fn stage(&self) -> StageId {
        match self {
            Self::UpstreamNotApproved { stage, .. }
            | Self::ArtifactNotReady { stage, .. }
            | Self::AlreadyGenerating { stage } => *stage,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("stage".to_string(), serde_json::json!(self.stage()));
        match self {
            Self::UpstreamNotApproved { missing, .. } => {
                map.insert("type".to_string(), serde_json::json!("UpstreamNotApproved"));
                map.insert("missing".to_string(), serde_json::json!(missing));
            }
            Self::ArtifactNotReady { status, .. } => {
                map.insert("type".to_string(), serde_json::json!("ArtifactNotReady"));
                map.insert("status".to_string(), serde_json::json!(status));
            }
            Self::AlreadyGenerating { .. } => {
                map.insert("type".to_string(), serde_json::json!("AlreadyGenerating"));
            }
        }
        map
    }
}

/// Errors from external generation providers.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success HTTP status.
    #[error("{provider} API error ({status}): {body}")]
    Http {
        /// Provider name.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The request never got a response.
    #[error("{provider} transport error: {message}")]
    Transport {
        /// Provider name.
        provider: String,
        /// Underlying error message.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("{provider} returned an invalid response: {message}")]
    InvalidResponse {
        /// Provider name.
        provider: String,
        /// What was missing or malformed.
        message: String,
    },

    /// No API key is configured for the provider.
    #[error("Missing credential for {provider}")]
    MissingCredential {
        /// Provider name.
        provider: String,
    },

    /// The provider did not finish within the configured time.
    #[error("{provider} timed out after {seconds}s")]
    Timeout {
        /// Provider name.
        provider: String,
        /// Elapsed seconds.
        seconds: u64,
    },
}

impl ProviderError {
    /// Creates an HTTP status error.
    #[must_use]
    pub fn http(provider: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            provider: provider.into(),
            status,
            body: body.into(),
        }
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a missing credential error.
    #[must_use]
    pub fn missing_credential(provider: impl Into<String>) -> Self {
        Self::MissingCredential {
            provider: provider.into(),
        }
    }

    /// Returns true for failures worth retrying: rate limits, 5xx, transport
    /// errors and timeouts.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::InvalidResponse { .. } | Self::MissingCredential { .. } => false,
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        match self {
            Self::Http { provider, status, .. } => {
                map.insert("type".to_string(), serde_json::json!("ProviderHttp"));
                map.insert("provider".to_string(), serde_json::json!(provider));
                map.insert("status".to_string(), serde_json::json!(status));
            }
            Self::Transport { provider, .. } => {
                map.insert("type".to_string(), serde_json::json!("ProviderTransport"));
                map.insert("provider".to_string(), serde_json::json!(provider));
            }
            Self::InvalidResponse { provider, .. } => {
                map.insert("type".to_string(), serde_json::json!("ProviderInvalidResponse"));
                map.insert("provider".to_string(), serde_json::json!(provider));
            }
            Self::MissingCredential { provider } => {
                map.insert("type".to_string(), serde_json::json!("ProviderMissingCredential"));
                map.insert("provider".to_string(), serde_json::json!(provider));
            }
            Self::Timeout { provider, seconds } => {
                map.insert("type".to_string(), serde_json::json!("ProviderTimeout"));
                map.insert("provider".to_string(), serde_json::json!(provider));
                map.insert("seconds".to_string(), serde_json::json!(seconds));
            }
        }
        map.insert("transient".to_string(), serde_json::json!(self.is_transient()));
        map
    }
}
