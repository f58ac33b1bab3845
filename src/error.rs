use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type AppResult<T> = Result<T, AppError>;

/// HTTP-level failures raised by handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Report unavailable: {0}")]
    Report(#[from] AnalyticsError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Report(err) => (err.status_code(), err.code(), err.to_string()),
            AppError::Internal(err) => {
                error!(error = %err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": { "code": code, "message": message } }))).into_response()
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// Failures of the analytics pipeline. Each one is scoped to a single report
/// when surfaced through the dashboard.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyticsError {
    /// Contract-violating input such as negative stock. Never retried.
    #[error("invalid input for part {part_id}: {reason}")]
    InvalidInput { part_id: String, reason: String },

    /// The upstream data source could not be read.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("{report} exceeded its {budget_ms} ms computation budget")]
    ComputationTimeout { report: String, budget_ms: u64 },

    /// The report task panicked or was cancelled.
    #[error("computation failed: {0}")]
    ComputationFailed(String),
}

impl AnalyticsError {
    pub fn invalid_input(part_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            part_id: part_id.into(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::DataUnavailable(_) => "data_unavailable",
            Self::ComputationTimeout { .. } => "computation_timeout",
            Self::ComputationFailed(_) => "computation_failed",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DataUnavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ComputationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::ComputationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn marker(&self) -> ErrorMarker {
        let part_id = match self {
            Self::InvalidInput { part_id, .. } => Some(part_id.clone()),
            _ => None,
        };
        ErrorMarker {
            code: self.code().to_string(),
            message: self.to_string(),
            part_id,
        }
    }
}

impl From<sqlx::Error> for AnalyticsError {
    fn from(err: sqlx::Error) -> Self {
        Self::DataUnavailable(err.to_string())
    }
}

/// Serialized in place of a report that could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMarker {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_data_unavailable_is_retryable() {
        assert!(AnalyticsError::DataUnavailable("down".into()).is_retryable());
        assert!(!AnalyticsError::invalid_input("P001", "negative").is_retryable());
        assert!(!AnalyticsError::ComputationTimeout {
            report: "cost_analysis".into(),
            budget_ms: 10
        }
        .is_retryable());
    }

    #[test]
    fn invalid_input_marker_names_the_part() {
        let marker = AnalyticsError::invalid_input("P009", "quantity is negative").marker();
        assert_eq!(marker.code, "invalid_input");
        assert_eq!(marker.part_id.as_deref(), Some("P009"));
        assert!(marker.message.contains("P009"));
    }

    #[test]
    fn status_codes_per_error_kind() {
        assert_eq!(
            AnalyticsError::invalid_input("P1", "x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AnalyticsError::DataUnavailable("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AnalyticsError::ComputationTimeout {
                report: "r".into(),
                budget_ms: 1
            }
            .status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
