use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::BookingStatus;

/// Business-invariant violations. The message of each variant is what the
/// end user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Conflict {
    #[error("customer already has an active booking")]
    ActiveBookingExists,

    #[error("slot full")]
    SlotFull,

    #[error("slot expired")]
    SlotExpired,

    #[error("vehicle not offered in this slot")]
    VehicleNotOffered,

    #[error("vehicle already booked in this slot")]
    VehicleAlreadyBooked,

    #[error("cannot delete: has bookings")]
    SlotHasBookings,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(Conflict),

    #[error("invalid status transition: {} -> {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,
}

impl From<Conflict> for AppError {
    fn from(c: Conflict) -> Self {
        AppError::Conflict(c)
    }
}

impl AppError {
    /// The invariant that failed, if this is a conflict.
    pub fn conflict(&self) -> Option<Conflict> {
        match self {
            AppError::Conflict(c) => Some(*c),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
