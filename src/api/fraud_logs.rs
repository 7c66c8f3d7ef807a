//! Admin access to the price-change audit trail.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::db::{FraudLog, FraudLogQuery, User};
use crate::AppState;

use super::error::ApiError;

/// List audit entries, newest first. Admin only.
pub async fn list_fraud_logs(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<FraudLogQuery>,
) -> Result<Json<Vec<FraudLog>>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin role required"));
    }

    let skip = query.skip.unwrap_or(0).max(0);
    let limit = query.limit.unwrap_or(100).clamp(1, 100);

    let sql = if query.suspicious_only {
        "SELECT * FROM fraud_logs WHERE is_suspicious = 1 \
         ORDER BY created_at DESC LIMIT ? OFFSET ?"
    } else {
        "SELECT * FROM fraud_logs ORDER BY created_at DESC LIMIT ? OFFSET ?"
    };
    let logs: Vec<FraudLog> = sqlx::query_as(sql)
        .bind(limit)
        .bind(skip)
        .fetch_all(&state.db)
        .await?;

    Ok(Json(logs))
}

/// Mark an audit entry as resolved. The only mutation the table allows.
pub async fn resolve_fraud_log(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(log_id): Path<String>,
) -> Result<Json<FraudLog>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin role required"));
    }

    let log: Option<FraudLog> = sqlx::query_as("SELECT * FROM fraud_logs WHERE id = ?")
        .bind(&log_id)
        .fetch_optional(&state.db)
        .await?;
    let mut log = log.ok_or_else(|| ApiError::not_found("Fraud log not found"))?;

    sqlx::query("UPDATE fraud_logs SET resolved = 1 WHERE id = ?")
        .bind(&log.id)
        .execute(&state.db)
        .await?;
    log.resolved = true;

    tracing::info!(log_id = %log.id, admin_id = %user.id, "Resolved fraud log");
    Ok(Json(log))
}
