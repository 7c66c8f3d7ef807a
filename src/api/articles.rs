//! Listing endpoints.
//!
//! Browsing is public and limited to approved listings; everything else is
//! gated by role or ownership. Price changes never reach the row directly:
//! both update paths divert through the fraud evaluator first.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{
    Article, ArticleQuery, CreateArticleRequest, UpdateArticleRequest, UpdatePriceRequest, User,
};
use crate::fraud;
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_price, validate_shipping_cost, validate_title};

#[derive(Debug, Deserialize, Default)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

fn page_bounds(skip: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    (skip.unwrap_or(0).max(0), limit.unwrap_or(100).clamp(1, 100))
}

/// Browse the catalog. Public; only approved listings are visible.
pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticleQuery>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let (skip, limit) = page_bounds(query.skip, query.limit);

    let mut conditions = vec!["is_approved = 1".to_string()];
    let mut bindings: Vec<String> = Vec::new();

    if let Some(category_id) = &query.category_id {
        conditions.push("category_id = ?".to_string());
        bindings.push(category_id.clone());
    }
    if let Some(search) = &query.search {
        if !search.is_empty() {
            conditions.push("(title LIKE ? OR description LIKE ?)".to_string());
            let pattern = format!("%{search}%");
            bindings.push(pattern.clone());
            bindings.push(pattern);
        }
    }

    let sql = format!(
        "SELECT * FROM articles WHERE {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        conditions.join(" AND ")
    );
    let mut query_builder = sqlx::query_as::<_, Article>(&sql);
    for binding in &bindings {
        query_builder = query_builder.bind(binding);
    }
    let articles = query_builder.bind(limit).bind(skip).fetch_all(&state.db).await?;

    Ok(Json(articles))
}

/// List every listing, approved or not. Admin only.
pub async fn list_all_articles(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Article>>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin role required"));
    }
    let (skip, limit) = page_bounds(page.skip, page.limit);
    let articles: Vec<Article> =
        sqlx::query_as("SELECT * FROM articles ORDER BY created_at DESC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(skip)
            .fetch_all(&state.db)
            .await?;
    Ok(Json(articles))
}

/// List the caller's own listings, including unapproved ones.
pub async fn list_my_articles(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Article>>, ApiError> {
    let (skip, limit) = page_bounds(page.skip, page.limit);
    let articles: Vec<Article> = sqlx::query_as(
        "SELECT * FROM articles WHERE seller_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(&user.id)
    .bind(limit)
    .bind(skip)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(articles))
}

/// Listing detail. Public.
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    let article = Article::find(&state.db, &article_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    Ok(Json(article))
}

/// Create a listing. Seller or admin; starts unapproved.
pub async fn create_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(request): Json<CreateArticleRequest>,
) -> Result<Json<Article>, ApiError> {
    if !user.can_sell() {
        return Err(ApiError::forbidden("Seller role required"));
    }

    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_title(&request.title) {
        errors.add("title", e);
    }
    if let Err(e) = validate_price(request.price) {
        errors.add("price", e);
    }
    if let Err(e) = validate_shipping_cost(&request.shipping_cost) {
        errors.add("shipping_cost", e);
    }
    errors.finish()?;

    let now = chrono::Utc::now().to_rfc3339();
    let article = Article {
        id: uuid::Uuid::new_v4().to_string(),
        title: request.title,
        description: request.description,
        price: request.price,
        shipping_cost: request.shipping_cost,
        image_url: request.image_url,
        is_approved: false,
        category_id: request.category_id,
        seller_id: user.id.clone(),
        created_at: now.clone(),
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO articles \
         (id, title, description, price, shipping_cost, image_url, is_approved, category_id, seller_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&article.id)
    .bind(&article.title)
    .bind(&article.description)
    .bind(article.price)
    .bind(article.shipping_cost)
    .bind(&article.image_url)
    .bind(article.is_approved)
    .bind(&article.category_id)
    .bind(&article.seller_id)
    .bind(&article.created_at)
    .bind(&article.updated_at)
    .execute(&state.db)
    .await?;

    tracing::info!(article_id = %article.id, seller_id = %user.id, "Created listing");
    Ok(Json(article))
}

fn check_ownership(article: &Article, user: &User) -> Result<(), ApiError> {
    if article.seller_id != user.id && !user.is_admin() {
        return Err(ApiError::forbidden("Not allowed to modify this article"));
    }
    Ok(())
}

/// Partial update. Only provided fields are applied; a provided price is
/// evaluated by the fraud service and rejected when suspicious.
pub async fn update_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(article_id): Path<String>,
    Json(request): Json<UpdateArticleRequest>,
) -> Result<Json<Article>, ApiError> {
    let mut article = Article::find(&state.db, &article_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    check_ownership(&article, &user)?;

    let mut errors = ValidationErrorBuilder::new();
    if let Some(ref title) = request.title {
        if let Err(e) = validate_title(title) {
            errors.add("title", e);
        }
    }
    if let Some(price) = request.price {
        if let Err(e) = validate_price(price) {
            errors.add("price", e);
        }
    }
    if let Err(e) = validate_shipping_cost(&request.shipping_cost) {
        errors.add("shipping_cost", e);
    }
    errors.finish()?;

    if let Some(new_price) = request.price {
        if new_price != article.price {
            let check = fraud::check_price_change(
                &state.db,
                &article.id,
                article.price,
                new_price,
                &user.id,
            )
            .await?;
            if check.is_suspicious {
                return Err(ApiError::bad_request(format!(
                    "Price change flagged as suspicious: {}. Contact support.",
                    check.reason
                )));
            }
            article.price = new_price;
        }
    }
    if let Some(title) = request.title {
        article.title = title;
    }
    if let Some(description) = request.description {
        article.description = Some(description);
    }
    if let Some(shipping_cost) = request.shipping_cost {
        article.shipping_cost = Some(shipping_cost);
    }
    if let Some(image_url) = request.image_url {
        article.image_url = Some(image_url);
    }
    if let Some(category_id) = request.category_id {
        article.category_id = Some(category_id);
    }
    article.updated_at = chrono::Utc::now().to_rfc3339();

    persist_article(&state, &article).await?;
    Ok(Json(article))
}

/// Price-only update through the fraud evaluator.
pub async fn update_article_price(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(article_id): Path<String>,
    Json(request): Json<UpdatePriceRequest>,
) -> Result<Json<Article>, ApiError> {
    let mut article = Article::find(&state.db, &article_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    check_ownership(&article, &user)?;

    validate_price(request.price).map_err(|e| ApiError::validation_field("price", e))?;

    let check = fraud::check_price_change(
        &state.db,
        &article.id,
        article.price,
        request.price,
        &user.id,
    )
    .await?;
    if check.is_suspicious {
        return Err(ApiError::bad_request(format!(
            "Price change flagged as suspicious: {}. Contact support.",
            check.reason
        )));
    }

    article.price = request.price;
    article.updated_at = chrono::Utc::now().to_rfc3339();
    persist_article(&state, &article).await?;
    Ok(Json(article))
}

/// Flip the approval flag. Admin only.
pub async fn approve_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(article_id): Path<String>,
) -> Result<Json<Article>, ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Admin role required"));
    }

    let mut article = Article::find(&state.db, &article_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    article.is_approved = true;
    article.updated_at = chrono::Utc::now().to_rfc3339();
    persist_article(&state, &article).await?;

    tracing::info!(article_id = %article.id, "Approved listing");
    Ok(Json(article))
}

/// Remove a listing. Owner or admin.
pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(article_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let article = Article::find(&state.db, &article_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Article not found"))?;
    check_ownership(&article, &user)?;

    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(&article.id)
        .execute(&state.db)
        .await?;

    tracing::info!(article_id = %article.id, user_id = %user.id, "Deleted listing");
    Ok(Json(serde_json::json!({ "detail": "Article deleted" })))
}

async fn persist_article(state: &AppState, article: &Article) -> Result<(), ApiError> {
    sqlx::query(
        "UPDATE articles SET title = ?, description = ?, price = ?, shipping_cost = ?, \
         image_url = ?, is_approved = ?, category_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&article.title)
    .bind(&article.description)
    .bind(article.price)
    .bind(article.shipping_cost)
    .bind(&article.image_url)
    .bind(article.is_approved)
    .bind(&article.category_id)
    .bind(&article.updated_at)
    .bind(&article.id)
    .execute(&state.db)
    .await?;
    Ok(())
}
