//! Price-change fraud evaluation.
//!
//! Every evaluation appends one fraud_logs row, suspicious or not: the
//! table is an audit trail of seller pricing behaviour, not just a gate.
//! Callers reject the price change when the result is suspicious and apply
//! it otherwise.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::FraudLog;

/// A change is suspicious when its magnitude exceeds this percentage
/// strictly; exactly 50% is clean.
pub const SUSPICIOUS_CHANGE_PCT: f64 = 50.0;

/// Outcome of a single evaluation, returned to the caller that must decide
/// whether to apply the price.
#[derive(Debug, Clone, Serialize)]
pub struct PriceCheck {
    pub article_id: String,
    pub seller_id: String,
    pub old_price: f64,
    pub new_price: f64,
    pub is_suspicious: bool,
    pub reason: String,
}

/// Evaluate a price change and persist the audit record.
///
/// A zero old price yields a 0% change and is never flagged: there is no
/// base to compute a percentage against.
pub async fn check_price_change(
    pool: &SqlitePool,
    article_id: &str,
    old_price: f64,
    new_price: f64,
    seller_id: &str,
) -> Result<PriceCheck, sqlx::Error> {
    let mut change_pct = 0.0;
    let mut is_suspicious = false;
    let mut reason = String::new();

    if old_price > 0.0 {
        change_pct = (new_price - old_price).abs() / old_price * 100.0;
        if change_pct > SUSPICIOUS_CHANGE_PCT {
            is_suspicious = true;
            reason = format!(
                "Price changed by {:.1}% (from {} to {})",
                change_pct, old_price, new_price
            );
        }
    }

    if reason.is_empty() {
        reason = "OK".to_string();
    }

    let log = FraudLog {
        id: uuid::Uuid::new_v4().to_string(),
        article_id: article_id.to_string(),
        seller_id: seller_id.to_string(),
        old_price,
        new_price,
        change_pct: (change_pct * 100.0).round() / 100.0,
        reason: reason.clone(),
        is_suspicious,
        resolved: false,
        created_at: chrono::Utc::now().to_rfc3339(),
    };
    log.insert(pool).await?;

    let result = PriceCheck {
        article_id: article_id.to_string(),
        seller_id: seller_id.to_string(),
        old_price,
        new_price,
        is_suspicious,
        reason,
    };

    if is_suspicious {
        metrics::counter!(crate::api::metrics::FRAUD_CHECKS_TOTAL, "outcome" => "suspicious")
            .increment(1);
        tracing::warn!(
            article_id = %article_id,
            seller_id = %seller_id,
            old_price = old_price,
            new_price = new_price,
            reason = %result.reason,
            "Suspicious price change"
        );
    } else {
        metrics::counter!(crate::api::metrics::FRAUD_CHECKS_TOTAL, "outcome" => "ok").increment(1);
        tracing::info!(
            article_id = %article_id,
            old_price = old_price,
            new_price = new_price,
            "Price change OK"
        );
    }

    Ok(result)
}
