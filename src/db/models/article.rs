//! Listing model and request DTOs.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub shipping_cost: Option<f64>,
    pub image_url: Option<String>,
    pub is_approved: bool,
    pub category_id: Option<String>,
    pub seller_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Article {
    pub async fn find(pool: &SqlitePool, id: &str) -> Result<Option<Article>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Sale total as charged at checkout.
    pub fn total_price(&self) -> f64 {
        self.price + self.shipping_cost.unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateArticleRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub shipping_cost: Option<f64>,
    pub image_url: Option<String>,
    pub category_id: Option<String>,
}

/// Partial update: only provided fields are applied. A provided price is
/// diverted through the fraud evaluator before assignment.
#[derive(Debug, Deserialize, Default)]
pub struct UpdateArticleRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub shipping_cost: Option<f64>,
    pub image_url: Option<String>,
    pub category_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePriceRequest {
    pub price: f64,
}

/// Query parameters for the public catalog listing.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ArticleQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub category_id: Option<String>,
    /// Case-insensitive substring match over title and description.
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_price_defaults_missing_shipping_to_zero() {
        let mut article = Article {
            id: "a1".to_string(),
            title: "Laptop".to_string(),
            description: None,
            price: 1200.0,
            shipping_cost: Some(20.0),
            image_url: None,
            is_approved: true,
            category_id: None,
            seller_id: "s1".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert_eq!(article.total_price(), 1220.0);

        article.shipping_cost = None;
        assert_eq!(article.total_price(), 1200.0);
    }
}
