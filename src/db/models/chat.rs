//! Conversation and message models.
//!
//! A conversation ties one buyer, one seller, and one article; there is at
//! most one conversation per (article, buyer) pair, enforced by a unique
//! constraint so concurrent create-or-get calls converge on a single row.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::article::Article;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    pub id: String,
    pub article_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub created_at: String,
}

impl Conversation {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }

    pub async fn find(pool: &SqlitePool, id: &str) -> Result<Option<Conversation>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM conversations WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_for_buyer(
        pool: &SqlitePool,
        article_id: &str,
        buyer_id: &str,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM conversations WHERE article_id = ? AND buyer_id = ?")
            .bind(article_id)
            .bind(buyer_id)
            .fetch_optional(pool)
            .await
    }

    /// Create-or-get for the (article, buyer) pair. The lookup is a fast
    /// path only; the unique constraint is what actually guarantees a single
    /// conversation, so an insert conflict means another request won the
    /// race and we fetch its row.
    pub async fn create_or_get(
        pool: &SqlitePool,
        article: &Article,
        buyer_id: &str,
    ) -> Result<Conversation, sqlx::Error> {
        if let Some(existing) = Self::find_for_buyer(pool, &article.id, buyer_id).await? {
            return Ok(existing);
        }

        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            article_id: article.id.clone(),
            buyer_id: buyer_id.to_string(),
            seller_id: article.seller_id.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let inserted = sqlx::query(
            "INSERT INTO conversations (id, article_id, buyer_id, seller_id, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.article_id)
        .bind(&conversation.buyer_id)
        .bind(&conversation.seller_id)
        .bind(&conversation.created_at)
        .execute(pool)
        .await;

        match inserted {
            Ok(_) => Ok(conversation),
            Err(sqlx::Error::Database(e)) if e.message().contains("UNIQUE constraint failed") => {
                Self::find_for_buyer(pool, &article.id, buyer_id)
                    .await?
                    .ok_or(sqlx::Error::RowNotFound)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_for_user(
        pool: &SqlitePool,
        user_id: &str,
    ) -> Result<Vec<Conversation>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM conversations WHERE buyer_id = ? OR seller_id = ? \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub file_url: Option<String>,
    pub created_at: String,
}

impl Message {
    pub async fn list_for_conversation(
        pool: &SqlitePool,
        conversation_id: &str,
    ) -> Result<Vec<Message>, sqlx::Error> {
        sqlx::query_as(
            "SELECT * FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await
    }

    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, content, file_url, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.conversation_id)
        .bind(&self.sender_id)
        .bind(&self.content)
        .bind(&self.file_url)
        .bind(&self.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub article_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub content: String,
    pub file_url: Option<String>,
}

/// Conversation plus its full ordered message history.
#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn seed_user(pool: &SqlitePool, id: &str, role: &str) {
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
    }

    async fn seed_article(pool: &SqlitePool, id: &str, seller_id: &str) -> Article {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO articles (id, title, price, shipping_cost, is_approved, seller_id, created_at, updated_at) \
             VALUES (?, 'Camera', 250.0, 10.0, 1, ?, ?, ?)",
        )
        .bind(id)
        .bind(seller_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        Article::find(pool, id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_create_or_get_is_idempotent() {
        let pool = setup().await;
        seed_user(&pool, "seller", "seller").await;
        seed_user(&pool, "buyer", "buyer").await;
        let article = seed_article(&pool, "art", "seller").await;

        let first = Conversation::create_or_get(&pool, &article, "buyer")
            .await
            .unwrap();
        let second = Conversation::create_or_get(&pool, &article, "buyer")
            .await
            .unwrap();
        assert_eq!(first.id, second.id);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_unique_constraint_conflict_resolves_to_existing_row() {
        let pool = setup().await;
        seed_user(&pool, "seller", "seller").await;
        seed_user(&pool, "buyer", "buyer").await;
        let article = seed_article(&pool, "art", "seller").await;

        // Simulate losing the check-then-create race: the row appears after
        // the lookup would have missed it.
        let existing = Conversation::create_or_get(&pool, &article, "buyer")
            .await
            .unwrap();

        let raced = sqlx::query(
            "INSERT INTO conversations (id, article_id, buyer_id, seller_id, created_at) \
             VALUES ('dup', ?, 'buyer', 'seller', '2026-01-01T00:00:00Z')",
        )
        .bind(&article.id)
        .execute(&pool)
        .await;
        assert!(raced.is_err());

        let resolved = Conversation::create_or_get(&pool, &article, "buyer")
            .await
            .unwrap();
        assert_eq!(resolved.id, existing.id);
    }

    #[tokio::test]
    async fn test_distinct_buyers_get_distinct_conversations() {
        let pool = setup().await;
        seed_user(&pool, "seller", "seller").await;
        seed_user(&pool, "alice", "buyer").await;
        seed_user(&pool, "bob", "buyer").await;
        let article = seed_article(&pool, "art", "seller").await;

        let a = Conversation::create_or_get(&pool, &article, "alice")
            .await
            .unwrap();
        let b = Conversation::create_or_get(&pool, &article, "bob")
            .await
            .unwrap();
        assert_ne!(a.id, b.id);
    }
}
