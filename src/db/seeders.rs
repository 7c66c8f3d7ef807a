//! Startup seeding for the default category taxonomy.

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    (
        "Electronics",
        "Smartphones, laptops, tablets, cameras, and other electronic devices",
    ),
    (
        "Clothing & Accessories",
        "Apparel, shoes, bags, watches, and fashion accessories",
    ),
    (
        "Home & Garden",
        "Furniture, decor, kitchen appliances, and gardening tools",
    ),
    (
        "Sports & Outdoors",
        "Sports equipment, outdoor gear, camping, and fitness accessories",
    ),
    (
        "Books & Media",
        "Books, vinyl records, DVDs, video games, and digital media",
    ),
    (
        "Collectibles & Art",
        "Antiques, coins, stamps, paintings, and rare collectibles",
    ),
    (
        "Toys & Hobbies",
        "Toys, board games, model kits, and hobby supplies",
    ),
    (
        "Automotive",
        "Car parts, motorcycle accessories, tools, and vehicle electronics",
    ),
    (
        "Health & Beauty",
        "Skincare, cosmetics, supplements, and personal care products",
    ),
    (
        "Music & Instruments",
        "Musical instruments, audio equipment, and studio gear",
    ),
];

/// Seed the built-in categories. Skipped entirely once any category exists,
/// so admin edits to the taxonomy are never overwritten.
pub async fn seed_categories(pool: &SqlitePool) -> Result<()> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;
    if count.0 > 0 {
        return Ok(());
    }

    let now = chrono::Utc::now().to_rfc3339();
    for (name, description) in DEFAULT_CATEGORIES {
        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(name)
        .bind(description)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    info!("Seeded {} default categories", DEFAULT_CATEGORIES.len());
    Ok(())
}
