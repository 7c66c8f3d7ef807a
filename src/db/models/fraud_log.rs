//! Price-change audit records.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FraudLog {
    pub id: String,
    pub article_id: String,
    pub seller_id: String,
    pub old_price: f64,
    pub new_price: f64,
    pub change_pct: f64,
    pub reason: String,
    pub is_suspicious: bool,
    pub resolved: bool,
    pub created_at: String,
}

impl FraudLog {
    pub async fn insert(&self, pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO fraud_logs \
             (id, article_id, seller_id, old_price, new_price, change_pct, reason, is_suspicious, resolved, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&self.id)
        .bind(&self.article_id)
        .bind(&self.seller_id)
        .bind(self.old_price)
        .bind(self.new_price)
        .bind(self.change_pct)
        .bind(&self.reason)
        .bind(self.is_suspicious)
        .bind(self.resolved)
        .bind(&self.created_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}

/// Query parameters for the admin audit listing.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FraudLogQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub suspicious_only: bool,
}
