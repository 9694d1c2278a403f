use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::types::{Order, OrderStatus};

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub stripe_session_id: String,
    pub status: OrderStatus,
    pub amount_total: i64,
    pub currency: String,
    pub customer_email: Option<String>,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    stripe_session_id: String,
    status: OrderStatus,
    amount_total: i64,
    currency: String,
    customer_email: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            stripe_session_id: row.stripe_session_id,
            status: row.status,
            amount_total: row.amount_total,
            currency: row.currency,
            customer_email: row.customer_email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str =
    "id, stripe_session_id, status, amount_total, currency, customer_email, created_at, updated_at";

/// Insert unless an order for the same checkout session exists.
/// Returns `None` when the session was already recorded.
pub async fn insert_order_if_absent(
    pool: &SqlitePool,
    order: NewOrder,
) -> Result<Option<Order>, sqlx::Error> {
    let now = Utc::now();
    let created = Order {
        id: Uuid::new_v4().to_string(),
        stripe_session_id: order.stripe_session_id,
        status: order.status,
        amount_total: order.amount_total,
        currency: order.currency.to_uppercase(),
        customer_email: order.customer_email.map(|e| e.trim().to_lowercase()),
        created_at: now,
        updated_at: now,
    };

    let result = sqlx::query(&format!(
        "INSERT OR IGNORE INTO orders ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&created.id)
    .bind(&created.stripe_session_id)
    .bind(created.status)
    .bind(created.amount_total)
    .bind(&created.currency)
    .bind(&created.customer_email)
    .bind(created.created_at)
    .bind(created.updated_at)
    .execute(pool)
    .await?;

    Ok((result.rows_affected() == 1).then_some(created))
}

/// Returns whether an order for `session_id` existed.
pub async fn update_order_status(
    pool: &SqlitePool,
    session_id: &str,
    status: OrderStatus,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE stripe_session_id = ?")
            .bind(status)
            .bind(Utc::now())
            .bind(session_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn find_order_by_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Option<Order>, sqlx::Error> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM orders WHERE stripe_session_id = ?"
    ))
    .bind(session_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(Order::from))
}

pub async fn list_orders(
    pool: &SqlitePool,
    limit: u32,
    offset: u32,
) -> Result<Vec<Order>, sqlx::Error> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ? OFFSET ?"
    ))
    .bind(i64::from(limit))
    .bind(i64::from(offset))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Order::from).collect())
}

pub async fn count_orders(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlx::db_connection;

    fn completed(session: &str) -> NewOrder {
        NewOrder {
            stripe_session_id: session.to_string(),
            status: OrderStatus::Paid,
            amount_total: 15_000,
            currency: "mxn".to_string(),
            customer_email: Some(" Buyer@Example.com ".to_string()),
        }
    }

    #[tokio::test]
    async fn duplicate_sessions_are_ignored() {
        let pool = db_connection("sqlite::memory:").await.unwrap();

        let first = insert_order_if_absent(&pool, completed("cs_test_1")).await.unwrap();
        let second = insert_order_if_absent(&pool, completed("cs_test_1")).await.unwrap();

        let order = first.unwrap();
        assert_eq!(order.currency, "MXN");
        assert_eq!(order.customer_email.as_deref(), Some("buyer@example.com"));
        assert!(second.is_none());
        assert_eq!(count_orders(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn status_updates_only_touch_known_sessions() {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        insert_order_if_absent(&pool, completed("cs_test_2")).await.unwrap();

        assert!(update_order_status(&pool, "cs_test_2", OrderStatus::Failed).await.unwrap());
        assert!(!update_order_status(&pool, "cs_unknown", OrderStatus::Failed).await.unwrap());

        let order = find_order_by_session(&pool, "cs_test_2").await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }
}
