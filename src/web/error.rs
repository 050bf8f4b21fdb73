//! JSON error responses.

use crate::catalog::CatalogError;
use crate::permission::Denial;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde_json::json;
use std::collections::BTreeMap;

/// Field name → messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Key used for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("authentication credentials were not provided or are invalid")]
    Unauthorized,
    #[error("you do not have permission to perform this action")]
    Forbidden,
    #[error("{0}")]
    NotFound(String),
    #[error("conflict: {0:?}")]
    Conflict(FieldErrors),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    /// A single message against a single field.
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_owned(), vec![message.to_owned()]);
        ApiError::Validation(errors)
    }

    /// A duplicate that is not tied to one field.
    pub fn conflict(message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(NON_FIELD_ERRORS.to_owned(), vec![message.to_owned()]);
        ApiError::Conflict(errors)
    }

    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("{} not found.", what))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Conflict(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(errors) | ApiError::Conflict(errors) => json!(errors),
            ApiError::Unauthorized => json!({
                "detail": "Authentication credentials were not provided or are invalid."
            }),
            ApiError::Forbidden => json!({
                "detail": "You do not have permission to perform this action."
            }),
            ApiError::NotFound(msg) => json!({ "detail": msg }),
            ApiError::Database(e) => {
                log::error!("Database error: {}", e);
                json!({ "detail": "Internal server error." })
            }
            ApiError::Internal => json!({ "detail": "Internal server error." }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => ApiError::Unauthorized,
            Denial::Forbidden => ApiError::Forbidden,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value ({}).", e.code),
                })
                .collect();
            fields.insert(field.to_string(), messages);
        }
        ApiError::Validation(fields)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownCategory(slug) => {
                ApiError::NotFound(format!("Category `{}` not found.", slug))
            }
            CatalogError::UnknownGenre(slug) => {
                ApiError::NotFound(format!("Genre `{}` not found.", slug))
            }
            CatalogError::InvalidYear(_) => ApiError::field("year", "A valid integer is required."),
            CatalogError::Database(e) => ApiError::Database(e),
        }
    }
}

/// Maps malformed JSON bodies to the same error shape as everything else.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    log::debug!("Rejected JSON payload: {}", err);
    ApiError::field(NON_FIELD_ERRORS, &err.to_string()).into()
}

/// Maps malformed query strings to the same error shape as everything else.
pub fn query_error_handler(
    err: actix_web::error::QueryPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    ApiError::field(NON_FIELD_ERRORS, &err.to_string()).into()
}
