//! Missing-hours report endpoint.
//!
//! Three-tier degrade path: the full ranking under a 15 s deadline, then
//! the rapid ranking under an 8 s deadline, then a degraded empty 200.
//! Dashboard reads prefer a degraded-but-available response over an error;
//! only a failure outside the guarded tiers surfaces as 500.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::Utc;
use serde_json::{json, Value};

use shiftgap_core::error::DbError;
use shiftgap_core::reports::{self, MissingHoursRow};
use shiftgap_core::timeout::with_timeout;

use crate::AppState;

const PRIMARY_TIMEOUT: Duration = Duration::from_millis(15_000);
const FALLBACK_TIMEOUT: Duration = Duration::from_millis(8_000);

/// Get the ranking of workers with missing hours (with fallback)
/// GET /api/dashboard/missing-hours
pub async fn get_missing_hours(State(state): State<Arc<AppState>>) -> Response {
    finalize_report(report_response(state).await)
}

/// Outermost boundary: anything that escaped the guarded tiers becomes a
/// generic 500.
fn finalize_report(result: Result<Response, serde_json::Error>) -> Response {
    match result {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(error = %err, "unexpected failure building missing-hours report");
            internal_error_response()
        }
    }
}

/// Response for a failure outside the guarded tiers. The only non-200 the
/// endpoint can produce.
fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal server error",
            "message": "could not produce the missing-hours report",
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

/// Which tier produced the rows.
#[derive(Debug)]
pub(crate) enum ReportOutcome {
    Primary(Vec<MissingHoursRow>),
    Fallback(Vec<MissingHoursRow>),
    Degraded,
}

/// Run the tiered report selection over injected queries.
///
/// Tier 2 only ever starts after tier 1 has definitively failed or timed
/// out; the tiers never run concurrently.
pub(crate) async fn select_report_rows<P, S>(
    primary: P,
    fallback: S,
    primary_timeout: Duration,
    fallback_timeout: Duration,
) -> ReportOutcome
where
    P: Future<Output = Result<Vec<MissingHoursRow>, DbError>> + Send + 'static,
    S: Future<Output = Vec<MissingHoursRow>> + Send + 'static,
{
    let primary_error = match with_timeout(primary, primary_timeout).await {
        Ok(Ok(rows)) => {
            tracing::info!(count = rows.len(), "primary missing-hours query succeeded");
            return ReportOutcome::Primary(rows);
        }
        Ok(Err(err)) => err,
        Err(err) => err,
    };

    tracing::warn!(
        error = %primary_error,
        "primary missing-hours query failed, trying rapid fallback"
    );

    match with_timeout(fallback, fallback_timeout).await {
        Ok(rows) => {
            tracing::info!(count = rows.len(), "rapid missing-hours query succeeded");
            ReportOutcome::Fallback(rows)
        }
        Err(fallback_error) => {
            tracing::error!(
                primary = %primary_error,
                fallback = %fallback_error,
                "both missing-hours queries failed"
            );
            ReportOutcome::Degraded
        }
    }
}

async fn report_response(state: Arc<AppState>) -> Result<Response, serde_json::Error> {
    let outcome = select_report_rows(
        reports::missing_hours_ranking(state.pool.clone()),
        reports::missing_hours_ranking_rapid(state.pool.clone()),
        PRIMARY_TIMEOUT,
        FALLBACK_TIMEOUT,
    )
    .await;

    match outcome {
        ReportOutcome::Primary(rows) => report_body(&rows, false),
        ReportOutcome::Fallback(rows) => report_body(&rows, true),
        ReportOutcome::Degraded => Ok(degraded_response()),
    }
}

fn report_body(rows: &[MissingHoursRow], fallback: bool) -> Result<Response, serde_json::Error> {
    let data = match serde_json::to_value(rows)? {
        Value::Array(items) => items,
        other => {
            tracing::warn!(got = %value_kind(&other), "report rows were not an array, coercing to empty");
            Vec::new()
        }
    };

    let body = json!({
        "data": data,
        "count": data.len(),
        "timestamp": Utc::now().to_rfc3339(),
    });

    let mut response = Json(body).into_response();
    if fallback {
        response
            .headers_mut()
            .insert("x-fallback-used", HeaderValue::from_static("true"));
    }
    Ok(response)
}

fn degraded_response() -> Response {
    Json(json!({
        "data": [],
        "message": "Service temporarily unavailable. The data is being processed.",
        "fallback": true,
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
