use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    PaymentRequired(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        let message = e.to_string();
        match e {
            DomainError::NotFound(_) => AppError::NotFound(message),
            DomainError::Unauthenticated => AppError::Unauthenticated(message),
            DomainError::Unauthorized => AppError::Forbidden(message),
            DomainError::EmptyCart | DomainError::InvalidInput(_) => AppError::BadRequest(message),
            DomainError::InvalidTransition { .. } | DomainError::InsufficientStock { .. } => {
                AppError::Conflict(message)
            }
            DomainError::PaymentDeclined { .. } => AppError::PaymentRequired(message),
            DomainError::Gateway(_) => AppError::BadGateway(message),
            DomainError::Persistence(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Internal(detail) => {
                log::error!("Request failed: {}", detail);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "Internal server error"
                }))
            }
            _ => HttpResponse::build(self.status_code()).json(serde_json::json!({
                "error": self.to_string()
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use uuid::Uuid;

    fn status_of(e: DomainError) -> StatusCode {
        AppError::from(e).error_response().status()
    }

    #[test]
    fn domain_errors_map_to_http_statuses() {
        assert_eq!(status_of(DomainError::NotFound("Order")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(DomainError::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(status_of(DomainError::EmptyCart), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(DomainError::InvalidInput("qty".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DomainError::invalid_transition("shipped", "pending")),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::InsufficientStock {
                product_id: Uuid::nil(),
                requested: 3,
                available: 1,
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DomainError::PaymentDeclined {
                order_id: Uuid::nil()
            }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(DomainError::Gateway("timeout".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(DomainError::Persistence("pool".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_display_names_the_entity() {
        let app_err: AppError = DomainError::NotFound("Order").into();
        assert_eq!(app_err.to_string(), "Order not found");
    }

    #[test]
    fn internal_error_display() {
        assert_eq!(
            AppError::Internal("msg".to_string()).to_string(),
            "Internal error: msg"
        );
    }

    #[test]
    fn persistence_maps_to_internal() {
        let app_err: AppError = DomainError::Persistence("secret dsn".to_string()).into();
        assert!(matches!(app_err, AppError::Internal(ref d) if d == "secret dsn"));
    }
}
