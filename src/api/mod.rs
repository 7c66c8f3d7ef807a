mod articles;
pub mod auth;
mod categories;
mod chat;
pub mod error;
mod fraud_logs;
pub mod metrics;
mod users;
mod validation;
mod ws;

pub use ws::ws_payload;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login/access-token", post(auth::login_access_token));

    let article_routes = Router::new()
        .route("/", get(articles::list_articles).post(articles::create_article))
        .route("/admin/all", get(articles::list_all_articles))
        .route("/mine", get(articles::list_my_articles))
        .route(
            "/:id",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::delete_article),
        )
        .route("/:id/price", put(articles::update_article_price))
        .route("/:id/approve", put(articles::approve_article));

    let category_routes = Router::new()
        .route(
            "/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route("/:id", delete(categories::delete_category));

    let conversation_routes = Router::new()
        .route(
            "/",
            post(chat::create_or_get_conversation).get(chat::list_conversations),
        )
        .route("/:id", get(chat::get_conversation))
        .route("/:id/messages", post(chat::create_message))
        .route("/:id/checkout", post(chat::checkout_conversation))
        // Auth handled in the handler via query param
        .route("/:id/ws", get(ws::conversation_ws));

    let fraud_routes = Router::new()
        .route("/", get(fraud_logs::list_fraud_logs))
        .route("/:id/resolve", put(fraud_logs::resolve_fraud_log));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .nest("/auth", auth_routes)
        .route("/users/me", get(users::me).put(users::update_me))
        .nest("/articles", article_routes)
        .nest("/categories", category_routes)
        .nest("/conversations", conversation_routes)
        .nest("/fraud-logs", fraud_routes)
        .layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
