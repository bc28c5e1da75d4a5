use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, RuntimeErr};
use thiserror::Error;

use crate::entities::PackageRequestStatus;
use crate::models::{ApiError, ApiResponse};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Package request {request_id} already processed (status: {status})")]
    AlreadyProcessed {
        request_id: i64,
        status: PackageRequestStatus,
    },

    #[error("Concurrency timeout: {0}")]
    ConcurrencyTimeout(String),

    #[error("Storage failure: {0}")]
    StorageFailure(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// 可以整体重试的瞬时错误（锁等待超时 / 死锁 / 序列化冲突）
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::ConcurrencyTimeout(_))
    }
}

// Postgres SQLSTATE: lock_not_available / serialization_failure / deadlock_detected / query_canceled
const TRANSIENT_SQLSTATES: [&str; 4] = ["55P03", "40001", "40P01", "57014"];

fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Conn(e) | DbErr::Exec(e) | DbErr::Query(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(e) => e
            .as_database_error()
            .and_then(|d| d.code())
            .map(|c| c.into_owned()),
        _ => None,
    }
}

fn classify(err: &DbErr, code: Option<&str>) -> AppError {
    match code {
        Some(code) if TRANSIENT_SQLSTATES.contains(&code) => {
            AppError::ConcurrencyTimeout(format!("{err} (sqlstate {code})"))
        }
        _ => AppError::StorageFailure(err.to_string()),
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        classify(&err, sqlstate(&err).as_deref())
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::AlreadyProcessed { .. } => {
                log::info!("{self}");
                (
                    actix_web::http::StatusCode::CONFLICT,
                    "ALREADY_PROCESSED",
                    self.to_string(),
                )
            }
            AppError::ConcurrencyTimeout(msg) => {
                log::warn!("Concurrency timeout: {msg}");
                (
                    actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                    "CONCURRENCY_TIMEOUT",
                    "Request is busy, retry later".to_string(),
                )
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    msg.clone(),
                )
            }
            AppError::JwtError(err) => {
                log::warn!("JWT error: {err}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    "Invalid access token".to_string(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                (
                    actix_web::http::StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "Forbidden".to_string(),
                )
            }
            AppError::StorageFailure(err) => {
                log::error!("Storage failure: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_FAILURE",
                    "Storage failure".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(ApiResponse::failure(ApiError {
            code: error_code.to_string(),
            message,
            retryable: self.is_transient(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_db_error_is_storage_failure() {
        let err: AppError = DbErr::Custom("boom".into()).into();
        assert!(matches!(err, AppError::StorageFailure(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_lock_and_serialization_sqlstates_are_transient() {
        let err = DbErr::Custom("canceling statement due to lock timeout".into());
        for code in ["55P03", "40001", "40P01", "57014"] {
            let mapped = classify(&err, Some(code));
            assert!(mapped.is_transient(), "{code} should be retried");
            assert!(mapped.to_string().contains(code));
        }
        // 唯一约束冲突不是瞬时错误
        assert!(matches!(
            classify(&err, Some("23505")),
            AppError::StorageFailure(_)
        ));
        assert!(!classify(&err, None).is_transient());
    }

    #[test]
    fn test_already_processed_status_code() {
        let err = AppError::AlreadyProcessed {
            request_id: 7,
            status: PackageRequestStatus::Approved,
        };
        assert_eq!(
            err.error_response().status(),
            actix_web::http::StatusCode::CONFLICT
        );
        assert!(err.to_string().contains("approved"));
    }

    #[test]
    fn test_concurrency_timeout_is_transient() {
        let err = AppError::ConcurrencyTimeout("lock wait".into());
        assert!(err.is_transient());
        assert_eq!(
            err.error_response().status(),
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
