//! Current-user profile endpoints.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::{UpdateUserRequest, User, UserResponse};
use crate::AppState;

use super::auth::hash_password;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_password};

/// Get the current user's profile
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Partial profile update; a provided password is re-hashed before storage.
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Some(ref email) = request.email {
        if let Err(e) = validate_email(email) {
            errors.add("email", e);
        }
    }
    if let Some(ref password) = request.password {
        if let Err(e) = validate_password(password) {
            errors.add("password", e);
        }
    }
    errors.finish()?;

    let mut updated = user;
    if let Some(email) = request.email {
        let taken: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = ? AND id != ?")
                .bind(&email)
                .bind(&updated.id)
                .fetch_optional(&state.db)
                .await?;
        if taken.is_some() {
            return Err(ApiError::bad_request(
                "A user with this email already exists",
            ));
        }
        updated.email = email;
    }
    if let Some(full_name) = request.full_name {
        updated.full_name = Some(full_name);
    }
    if let Some(password) = request.password {
        updated.password_hash = hash_password(&password)
            .map_err(|e| ApiError::internal(format!("Failed to hash password: {e}")))?;
    }
    updated.updated_at = chrono::Utc::now().to_rfc3339();

    sqlx::query(
        "UPDATE users SET email = ?, full_name = ?, password_hash = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&updated.email)
    .bind(&updated.full_name)
    .bind(&updated.password_hash)
    .bind(&updated.updated_at)
    .bind(&updated.id)
    .execute(&state.db)
    .await?;

    Ok(Json(UserResponse::from(updated)))
}
