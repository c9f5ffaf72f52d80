use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Service Unavailable")]
    ServiceUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        AppError::NotFound(anyhow::anyhow!("{} not found: {}", entity, id))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) | AppError::DatabaseError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Flatten validator output into `"field: message"` lines, sorted for stable output.
pub fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let detail = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, detail)
            })
        })
        .collect();
    messages.sort();
    messages
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl From<mongodb::bson::ser::Error> for AppError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<Value>,
        }

        let status = self.status_code();

        let (error_message, details) = match self {
            AppError::ValidationError(err) => (
                "Validation error".to_string(),
                Some(Value::from(validation_messages(&err))),
            ),
            AppError::BadRequest(err) => (err.to_string(), None),
            AppError::NotFound(err) => (err.to_string(), None),
            AppError::Conflict(err) => (err.to_string(), None),
            AppError::InternalError(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    "Internal server error".to_string(),
                    Some(Value::from(format!("{:#}", err))),
                )
            }
            AppError::ServiceUnavailable => ("Service unavailable".to_string(), None),
            AppError::DatabaseError(err) => {
                tracing::error!(error = %err, "Database error");
                (
                    "Database error".to_string(),
                    Some(Value::from(err.to_string())),
                )
            }
            AppError::ConfigError(err) => (
                "Configuration error".to_string(),
                Some(Value::from(err.to_string())),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
        #[validate(range(min = 0.0))]
        amount: f64,
    }

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err = Sample {
            name: String::new(),
            amount: 10.0,
        }
        .validate()
        .unwrap_err();
        let app_err = AppError::from(err);
        assert_eq!(app_err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_messages_name_each_field() {
        let err = Sample {
            name: String::new(),
            amount: -1.0,
        }
        .validate()
        .unwrap_err();

        let messages = validation_messages(&err);
        assert_eq!(messages.len(), 2);
        assert!(messages.contains(&"name: Name is required".to_string()));
        assert!(messages.contains(&"amount: range".to_string()));
    }

    #[test]
    fn status_codes_follow_error_category() {
        assert_eq!(
            AppError::not_found("Bike", "b-1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict(anyhow::anyhow!("taken")).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::DatabaseError(anyhow::anyhow!("down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn service_unavailable_renders_503() {
        let response = AppError::ServiceUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn not_found_message_names_entity() {
        let err = AppError::not_found("Payment", "p-42");
        assert_eq!(err.to_string(), "Not found: Payment not found: p-42");
    }
}
