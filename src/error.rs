// advisory-report-service/src/error.rs

use thiserror::Error;
use uuid::Uuid;

use crate::models::OutputFormat;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("scenario {0} not found")]
    ScenarioNotFound(Uuid),

    #[error("client {0} not found")]
    ClientNotFound(Uuid),

    #[error("projection failed: {0}")]
    Projection(String),

    #[error("chart synthesis failed: {0}")]
    Chart(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("{} encoding failed: {message}", .format.as_str())]
    Encode {
        format: OutputFormat,
        message: String,
    },

    #[error("object store error: {0}")]
    Storage(String),

    #[error("metadata store error: {0}")]
    Metadata(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl ReportError {
    /// Whether the orchestrator's retry loop should attempt again.
    /// Missing input records are a caller error and never recover on retry.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ReportError::ScenarioNotFound(_) | ReportError::ClientNotFound(_)
        )
    }

    /// Stable kind string for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::ScenarioNotFound(_) => "scenario_not_found",
            ReportError::ClientNotFound(_) => "client_not_found",
            ReportError::Projection(_) => "projection_error",
            ReportError::Chart(_) => "chart_error",
            ReportError::Template(_) => "template_error",
            ReportError::Encode { .. } => "encode_error",
            ReportError::Storage(_) => "storage_error",
            ReportError::Metadata(_) => "metadata_error",
            ReportError::Serialization(_) => "serialization_error",
            ReportError::RetriesExhausted { .. } => "retries_exhausted",
        }
    }
}
