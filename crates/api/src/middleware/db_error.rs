//! Database error responses and the database health probe endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde_json::{json, Value};

use shiftgap_core::db::check_health;
use shiftgap_core::error::DbError;

use crate::AppState;

/// Map a classified database error to an HTTP response.
///
/// The match is exhaustive over the closed [`DbError`] taxonomy; new
/// variants force a decision here. The report endpoint never reaches this
/// mapping — it degrades to 200 instead — so this is the response surface
/// for handlers that propagate database errors directly.
pub fn db_error_response(err: &DbError) -> (StatusCode, Json<Value>) {
    let (status, error, message) = match err {
        DbError::ConnectionLost => (
            StatusCode::SERVICE_UNAVAILABLE,
            "database connection lost",
            "retry the operation in a few moments",
        ),
        DbError::TooManyConnections => (
            StatusCode::SERVICE_UNAVAILABLE,
            "too many database connections",
            "the server is busy, retry in a few moments",
        ),
        DbError::ConnectionRefused => (
            StatusCode::SERVICE_UNAVAILABLE,
            "cannot connect to the database",
            "service temporarily unavailable",
        ),
        DbError::QueryTimeout | DbError::DeadlineExceeded(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            "database query timed out",
            "the operation took too long",
        ),
        DbError::AuthFailed => (
            StatusCode::SERVICE_UNAVAILABLE,
            "database authentication error",
            "invalid database credentials",
        ),
        DbError::Unknown(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal database error",
            "an unexpected error occurred",
        ),
    };

    tracing::error!(error = %err, code = err.error_code(), "database error");

    (
        status,
        Json(json!({
            "error": error,
            "message": message,
            "code": err.error_code(),
        })),
    )
}

/// Database liveness probe
/// GET /api/health/database
pub async fn database_health(State(state): State<Arc<AppState>>) -> Response {
    // The probe itself never fails; the join handle catches a panicked
    // probe task so even that surfaces as a well-formed response.
    match tokio::spawn(check_health(state.pool.clone())).await {
        Ok(health) if health.healthy => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected",
                "timestamp": Utc::now().to_rfc3339(),
                "message": health.message,
            })),
        )
            .into_response(),
        Ok(health) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "database": "disconnected",
                "timestamp": Utc::now().to_rfc3339(),
                "message": health.message,
            })),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "health probe task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "database": "unknown",
                    "timestamp": Utc::now().to_rfc3339(),
                    "message": err.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn transient_errors_map_to_503_with_distinct_codes() {
        let (status, Json(body)) = db_error_response(&DbError::ConnectionLost);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "DB_CONNECTION_LOST");

        let (status, Json(body)) = db_error_response(&DbError::TooManyConnections);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "DB_TOO_MANY_CONNECTIONS");

        let (status, Json(body)) = db_error_response(&DbError::ConnectionRefused);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "DB_CONNECTION_REFUSED");
    }

    #[test]
    fn timeouts_map_to_504() {
        let (status, Json(body)) = db_error_response(&DbError::QueryTimeout);
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["code"], "DB_TIMEOUT");

        let (status, Json(body)) =
            db_error_response(&DbError::DeadlineExceeded(Duration::from_secs(15)));
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["code"], "DB_TIMEOUT");
    }

    #[test]
    fn auth_failure_maps_to_503() {
        let (status, Json(body)) = db_error_response(&DbError::AuthFailed);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["code"], "DB_AUTH_ERROR");
    }

    #[test]
    fn unknown_errors_map_to_500_generic() {
        let (status, Json(body)) = db_error_response(&DbError::Unknown("boom".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "DB_GENERIC_ERROR");
        assert_eq!(body["error"], "internal database error");
    }
}
