use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Only {remaining} ticket(s) left for ticket type {ticket_type_id}, requested {requested}")]
    OutOfStock {
        ticket_type_id: Uuid,
        requested: u32,
        remaining: u32,
    },

    #[error("Ticket type {0} is not on sale")]
    SalesClosed(Uuid),

    #[error("Reservation {0} expired before it was confirmed")]
    TokenExpired(Uuid),

    #[error("Reservation {0} does not exist or is no longer pending")]
    TokenNotFound(Uuid),

    #[error("Ticket code does not match any issued ticket")]
    InvalidCode,

    #[error("Ticket {0} has already been used")]
    AlreadyUsed(Uuid),

    #[error("Ticket {0} has been cancelled")]
    Cancelled(Uuid),

    #[error("Staff member {0} is not authorized for this event")]
    NotAuthorized(Uuid),

    #[error("Ticket belongs to event {ticket_event}, staff is scoped to {staff_event}")]
    EventMismatch { ticket_event: Uuid, staff_event: Uuid },

    #[error("Store error")]
    Store(#[from] StoreError),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotAuthorized(_) | AppError::EventMismatch { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::TokenNotFound(_) | AppError::InvalidCode => {
                StatusCode::NOT_FOUND
            }
            AppError::Conflict(_)
            | AppError::OutOfStock { .. }
            | AppError::SalesClosed(_)
            | AppError::AlreadyUsed(_)
            | AppError::Cancelled(_) => StatusCode::CONFLICT,
            AppError::TokenExpired(_) => StatusCode::GONE,
            AppError::Store(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::OutOfStock { .. } => "OUT_OF_STOCK",
            AppError::SalesClosed(_) => "SALES_CLOSED",
            AppError::TokenExpired(_) => "TOKEN_EXPIRED",
            AppError::TokenNotFound(_) => "TOKEN_NOT_FOUND",
            AppError::InvalidCode => "INVALID_TICKET",
            AppError::AlreadyUsed(_) => "ALREADY_USED",
            AppError::Cancelled(_) => "TICKET_CANCELLED",
            AppError::NotAuthorized(_) => "NOT_AUTHORIZED",
            AppError::EventMismatch { .. } => "EVENT_MISMATCH",
            AppError::Store(_) => "STORE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::OutOfStock {
                requested,
                remaining,
                ..
            } => Some(json!({ "requested": requested, "remaining": remaining })),
            _ => None,
        }
    }

    fn log(&self) {
        match self {
            AppError::Store(e) => {
                error!(error = ?e, "Store error");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            _ => {
                warn!(code = self.code(), message = %self, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::Store(_) => "A storage error occurred".to_string(),
            AppError::InternalServerError(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        error_response(code, public_message, self.details(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_in_rejections_map_to_documented_statuses() {
        let id = Uuid::new_v4();
        assert_eq!(AppError::AlreadyUsed(id).status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidCode.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NotAuthorized(id).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::EventMismatch {
                ticket_event: id,
                staff_event: Uuid::new_v4()
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::Cancelled(id).code(), "TICKET_CANCELLED");
    }

    #[test]
    fn test_reservation_rejections_map_to_documented_statuses() {
        let id = Uuid::new_v4();
        let out = AppError::OutOfStock {
            ticket_type_id: id,
            requested: 3,
            remaining: 1,
        };
        assert_eq!(out.status_code(), StatusCode::CONFLICT);
        assert_eq!(out.code(), "OUT_OF_STOCK");
        assert_eq!(AppError::TokenExpired(id).status_code(), StatusCode::GONE);
        assert_eq!(AppError::TokenNotFound(id).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_store_errors_hide_internals() {
        let err = AppError::from(StoreError::Unexpected(anyhow::anyhow!("pool timed out")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "STORE_ERROR");
    }
}
