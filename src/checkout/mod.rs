//! Mock purchase flow for a conversation's article.
//!
//! Stands in for an external payment capture: no gateway call, no webhook,
//! success is unconditional once the preconditions pass. The sale
//! announcement and the article delete commit as a single transaction, and
//! fan-out happens only after that commit. Subscribers may miss the
//! broadcast, but a reconnecting reader always sees the persisted message.

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::chat::ConnectionRegistry;
use crate::db::{Article, Conversation, Message, User};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Only the conversation's buyer can checkout")]
    NotBuyer,
    /// Distinct from a generic failure: a racing checkout may have already
    /// removed the article.
    #[error("Article not found or already sold")]
    ArticleGone,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub amount: f64,
    pub success: bool,
    pub transaction_id: String,
}

fn generate_transaction_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("pi_mock_{}", &hex[..12])
}

/// Run the mock checkout for a conversation on behalf of `buyer`.
pub async fn process_checkout(
    pool: &SqlitePool,
    registry: &ConnectionRegistry,
    conversation: &Conversation,
    buyer: &User,
) -> Result<CheckoutReceipt, CheckoutError> {
    if conversation.buyer_id != buyer.id {
        return Err(CheckoutError::NotBuyer);
    }

    let article = Article::find(pool, &conversation.article_id)
        .await?
        .ok_or(CheckoutError::ArticleGone)?;

    let amount = article.total_price();

    // System messages are authored under the seller's id rather than a
    // synthetic system account.
    let announcement = Message {
        id: uuid::Uuid::new_v4().to_string(),
        conversation_id: conversation.id.clone(),
        sender_id: conversation.seller_id.clone(),
        content: format!(
            "AUTOMATED MESSAGE: Buyer just purchased this item for ${amount}"
        ),
        file_url: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    // The announcement and the delete stand or fall together.
    let mut tx = pool.begin().await?;
    sqlx::query(
        "INSERT INTO messages (id, conversation_id, sender_id, content, file_url, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&announcement.id)
    .bind(&announcement.conversation_id)
    .bind(&announcement.sender_id)
    .bind(&announcement.content)
    .bind(&announcement.file_url)
    .bind(&announcement.created_at)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM articles WHERE id = ?")
        .bind(&article.id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    // Fan-out after commit. Delivery failures are the one swallowed error
    // class: durability never depends on them.
    match serde_json::to_string(&crate::api::ws_payload(&announcement)) {
        Ok(payload) => {
            registry.broadcast(&conversation.id, &payload);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize checkout announcement");
        }
    }

    let receipt = CheckoutReceipt {
        amount,
        success: true,
        transaction_id: generate_transaction_id(),
    };

    tracing::info!(
        conversation_id = %conversation.id,
        article_id = %article.id,
        buyer_id = %buyer.id,
        amount = amount,
        transaction_id = %receipt.transaction_id,
        "Checkout completed"
    );
    metrics::counter!(crate::api::metrics::CHECKOUTS_TOTAL).increment(1);

    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::roles;
    use sqlx::sqlite::SqlitePoolOptions;
    use tokio::sync::mpsc;

    async fn setup() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, id: &str, role: &str) -> User {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, role, is_active, created_at, updated_at) \
             VALUES (?, ?, 'x', ?, 1, ?, ?)",
        )
        .bind(id)
        .bind(format!("{id}@example.com"))
        .bind(role)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn seed_article(
        pool: &SqlitePool,
        id: &str,
        seller_id: &str,
        price: f64,
        shipping: Option<f64>,
    ) -> Article {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO articles (id, title, price, shipping_cost, is_approved, seller_id, created_at, updated_at) \
             VALUES (?, 'Bike', ?, ?, 1, ?, ?, ?)",
        )
        .bind(id)
        .bind(price)
        .bind(shipping)
        .bind(seller_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        Article::find(pool, id).await.unwrap().unwrap()
    }

    async fn seed_conversation(pool: &SqlitePool, article: &Article, buyer_id: &str) -> Conversation {
        Conversation::create_or_get(pool, article, buyer_id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_charges_price_plus_shipping() {
        let pool = setup().await;
        let registry = ConnectionRegistry::new();
        seed_user(&pool, "seller", roles::SELLER).await;
        let buyer = seed_user(&pool, "buyer", roles::BUYER).await;
        let article = seed_article(&pool, "art", "seller", 120.0, Some(15.0)).await;
        let conversation = seed_conversation(&pool, &article, "buyer").await;

        let receipt = process_checkout(&pool, &registry, &conversation, &buyer)
            .await
            .unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.amount, 135.0);
        assert!(receipt.transaction_id.starts_with("pi_mock_"));

        // Article gone, announcement persisted
        assert!(Article::find(&pool, "art").await.unwrap().is_none());
        let messages = Message::list_for_conversation(&pool, &conversation.id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].content.contains("135"));
        assert_eq!(messages[0].sender_id, "seller");
    }

    #[tokio::test]
    async fn test_missing_shipping_defaults_to_zero() {
        let pool = setup().await;
        let registry = ConnectionRegistry::new();
        seed_user(&pool, "seller", roles::SELLER).await;
        let buyer = seed_user(&pool, "buyer", roles::BUYER).await;
        let article = seed_article(&pool, "art", "seller", 80.0, None).await;
        let conversation = seed_conversation(&pool, &article, "buyer").await;

        let receipt = process_checkout(&pool, &registry, &conversation, &buyer)
            .await
            .unwrap();
        assert_eq!(receipt.amount, 80.0);
    }

    #[tokio::test]
    async fn test_only_the_buyer_can_checkout() {
        let pool = setup().await;
        let registry = ConnectionRegistry::new();
        let seller = seed_user(&pool, "seller", roles::SELLER).await;
        seed_user(&pool, "buyer", roles::BUYER).await;
        let article = seed_article(&pool, "art", "seller", 50.0, None).await;
        let conversation = seed_conversation(&pool, &article, "buyer").await;

        let err = process_checkout(&pool, &registry, &conversation, &seller)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NotBuyer));
        assert!(Article::find(&pool, "art").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_racing_checkout_surfaces_as_article_gone() {
        let pool = setup().await;
        let registry = ConnectionRegistry::new();
        seed_user(&pool, "seller", roles::SELLER).await;
        let buyer = seed_user(&pool, "buyer", roles::BUYER).await;
        let article = seed_article(&pool, "art", "seller", 50.0, None).await;
        let conversation = seed_conversation(&pool, &article, "buyer").await;

        process_checkout(&pool, &registry, &conversation, &buyer)
            .await
            .unwrap();
        let err = process_checkout(&pool, &registry, &conversation, &buyer)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ArticleGone));

        // The conversation and its prior messages survive
        assert!(Conversation::find(&pool, &conversation.id)
            .await
            .unwrap()
            .is_some());
        let messages = Message::list_for_conversation(&pool, &conversation.id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn test_announcement_is_fanned_out_to_subscribers() {
        let pool = setup().await;
        let registry = ConnectionRegistry::new();
        seed_user(&pool, "seller", roles::SELLER).await;
        let buyer = seed_user(&pool, "buyer", roles::BUYER).await;
        let article = seed_article(&pool, "art", "seller", 60.0, Some(5.0)).await;
        let conversation = seed_conversation(&pool, &article, "buyer").await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.join(&conversation.id, tx);

        process_checkout(&pool, &registry, &conversation, &buyer)
            .await
            .unwrap();

        let payload = rx.try_recv().unwrap();
        assert!(payload.contains("AUTOMATED MESSAGE"));
        assert!(payload.contains("65"));
    }
}
