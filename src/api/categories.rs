//! Category taxonomy endpoints: public read, admin write.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::db::{Category, CreateCategoryRequest, User};
use crate::AppState;

use super::error::ApiError;
use super::validation::validate_category_name;

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let categories: Vec<Category> = sqlx::query_as("SELECT * FROM categories ORDER BY name ASC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateCategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin role required"));
    }
    validate_category_name(&request.name)
        .map_err(|e| ApiError::validation_field("name", e))?;

    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM categories WHERE name = ?")
        .bind(&request.name)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request(
            "Category with this name already exists",
        ));
    }

    let category = Category {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name,
        description: request.description,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    sqlx::query("INSERT INTO categories (id, name, description, created_at) VALUES (?, ?, ?, ?)")
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.created_at)
        .execute(&state.db)
        .await?;

    tracing::info!(category_id = %category.id, name = %category.name, "Created category");
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(category_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin role required"));
    }

    let existing: Option<Category> = sqlx::query_as("SELECT * FROM categories WHERE id = ?")
        .bind(&category_id)
        .fetch_optional(&state.db)
        .await?;
    let category = existing.ok_or_else(|| ApiError::not_found("Category not found"))?;

    // Articles referencing it fall back to uncategorized via ON DELETE SET NULL
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(&category.id)
        .execute(&state.db)
        .await?;

    Ok(Json(serde_json::json!({ "detail": "Category deleted" })))
}
