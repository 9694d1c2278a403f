use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::domain::types::{PaymentStatus, Purchase, PurchaseStats, ShippingAddress};

/// A purchase as entered by staff, already validated and normalized.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub customer_company: Option<String>,
    pub product_name: String,
    pub product_description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub subtotal: f64,
    pub stripe_session_id: String,
    pub total_amount: f64,
    pub currency: String,
    pub shipping_address: Option<ShippingAddress>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

/// Fields staff may change after creation. `None` keeps the stored value.
#[derive(Debug, Default, Clone)]
pub struct PurchaseChanges {
    pub payment_status: Option<PaymentStatus>,
    pub stripe_payment_intent_id: Option<String>,
    pub payment_method: Option<String>,
    pub stripe_fee: Option<f64>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl PurchaseChanges {
    pub fn apply(self, purchase: &mut Purchase) {
        if let Some(status) = self.payment_status {
            purchase.payment_status = status;
        }
        if let Some(intent) = self.stripe_payment_intent_id {
            purchase.stripe_payment_intent_id = Some(intent);
        }
        if let Some(method) = self.payment_method {
            purchase.payment_method = Some(method);
        }
        if let Some(fee) = self.stripe_fee {
            purchase.stripe_fee = Some(fee);
        }
        if let Some(notes) = self.notes {
            purchase.notes = Some(notes);
        }
        if let Some(tags) = self.tags {
            purchase.tags = tags;
        }
        purchase.refresh_net_amount();
    }
}

#[derive(Debug, Default, Clone)]
pub struct PurchaseFilter {
    pub status: Option<PaymentStatus>,
    pub customer_email: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: String,
    customer_name: String,
    customer_email: String,
    customer_phone: Option<String>,
    customer_company: Option<String>,
    product_name: String,
    product_description: String,
    quantity: i64,
    unit_price: f64,
    subtotal: f64,
    stripe_session_id: String,
    stripe_payment_intent_id: Option<String>,
    payment_status: PaymentStatus,
    payment_method: Option<String>,
    total_amount: f64,
    currency: String,
    stripe_fee: Option<f64>,
    net_amount: Option<f64>,
    shipping_street: Option<String>,
    shipping_city: Option<String>,
    shipping_state: Option<String>,
    shipping_postal_code: Option<String>,
    shipping_country: Option<String>,
    notes: Option<String>,
    tags: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PurchaseRow> for Purchase {
    fn from(row: PurchaseRow) -> Self {
        let address = ShippingAddress {
            street: row.shipping_street,
            city: row.shipping_city,
            state: row.shipping_state,
            postal_code: row.shipping_postal_code,
            country: row.shipping_country,
        };

        Self {
            id: row.id,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            customer_phone: row.customer_phone,
            customer_company: row.customer_company,
            product_name: row.product_name,
            product_description: row.product_description,
            quantity: row.quantity,
            unit_price: row.unit_price,
            subtotal: row.subtotal,
            stripe_session_id: row.stripe_session_id,
            stripe_payment_intent_id: row.stripe_payment_intent_id,
            payment_status: row.payment_status,
            payment_method: row.payment_method,
            total_amount: row.total_amount,
            currency: row.currency,
            stripe_fee: row.stripe_fee,
            net_amount: row.net_amount,
            shipping_address: (!address.is_empty()).then_some(address),
            notes: row.notes,
            tags: serde_json::from_str(&row.tags).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, customer_name, customer_email, customer_phone, customer_company, \
    product_name, product_description, quantity, unit_price, subtotal, stripe_session_id, \
    stripe_payment_intent_id, payment_status, payment_method, total_amount, currency, \
    stripe_fee, net_amount, shipping_street, shipping_city, shipping_state, \
    shipping_postal_code, shipping_country, notes, tags, created_at, updated_at";

fn encode_tags(tags: &[String]) -> Result<String, sqlx::Error> {
    serde_json::to_string(tags).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

/// Insert unless a purchase for the same checkout session exists.
/// Returns `None` on a duplicate session id.
pub async fn insert_purchase_if_absent(
    pool: &SqlitePool,
    purchase: NewPurchase,
) -> Result<Option<Purchase>, sqlx::Error> {
    let now = Utc::now();
    let created = Purchase {
        id: Uuid::new_v4().to_string(),
        customer_name: purchase.customer_name,
        customer_email: purchase.customer_email,
        customer_phone: purchase.customer_phone,
        customer_company: purchase.customer_company,
        product_name: purchase.product_name,
        product_description: purchase.product_description,
        quantity: i64::from(purchase.quantity),
        unit_price: purchase.unit_price,
        subtotal: purchase.subtotal,
        stripe_session_id: purchase.stripe_session_id,
        stripe_payment_intent_id: None,
        payment_status: PaymentStatus::Pending,
        payment_method: None,
        total_amount: purchase.total_amount,
        currency: purchase.currency.to_uppercase(),
        stripe_fee: None,
        net_amount: None,
        shipping_address: purchase.shipping_address.filter(|a| !a.is_empty()),
        notes: purchase.notes,
        tags: purchase.tags,
        created_at: now,
        updated_at: now,
    };
    let address = created.shipping_address.clone().unwrap_or_default();

    let result = sqlx::query(&format!(
        "INSERT OR IGNORE INTO purchases ({COLUMNS}) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&created.id)
    .bind(&created.customer_name)
    .bind(&created.customer_email)
    .bind(&created.customer_phone)
    .bind(&created.customer_company)
    .bind(&created.product_name)
    .bind(&created.product_description)
    .bind(created.quantity)
    .bind(created.unit_price)
    .bind(created.subtotal)
    .bind(&created.stripe_session_id)
    .bind(&created.stripe_payment_intent_id)
    .bind(created.payment_status)
    .bind(&created.payment_method)
    .bind(created.total_amount)
    .bind(&created.currency)
    .bind(created.stripe_fee)
    .bind(created.net_amount)
    .bind(&address.street)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.postal_code)
    .bind(&address.country)
    .bind(&created.notes)
    .bind(encode_tags(&created.tags)?)
    .bind(created.created_at)
    .bind(created.updated_at)
    .execute(pool)
    .await?;

    Ok((result.rows_affected() == 1).then_some(created))
}

pub async fn find_purchase(pool: &SqlitePool, id: &str) -> Result<Option<Purchase>, sqlx::Error> {
    let row: Option<PurchaseRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM purchases WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(Purchase::from))
}

/// Apply `changes` to the stored purchase. Last writer wins.
pub async fn save_purchase_changes(
    pool: &SqlitePool,
    id: &str,
    changes: PurchaseChanges,
) -> Result<Option<Purchase>, sqlx::Error> {
    let Some(mut purchase) = find_purchase(pool, id).await? else {
        return Ok(None);
    };
    changes.apply(&mut purchase);
    purchase.updated_at = Utc::now();

    sqlx::query(
        r#"
        UPDATE purchases
        SET payment_status = ?, stripe_payment_intent_id = ?, payment_method = ?,
            stripe_fee = ?, net_amount = ?, notes = ?, tags = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(purchase.payment_status)
    .bind(&purchase.stripe_payment_intent_id)
    .bind(&purchase.payment_method)
    .bind(purchase.stripe_fee)
    .bind(purchase.net_amount)
    .bind(&purchase.notes)
    .bind(encode_tags(&purchase.tags)?)
    .bind(purchase.updated_at)
    .bind(&purchase.id)
    .execute(pool)
    .await?;

    Ok(Some(purchase))
}

/// Returns whether a purchase with `id` existed.
pub async fn remove_purchase(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM purchases WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Settle the purchase opened for a completed checkout session.
/// Returns whether one was found.
pub async fn mark_session_paid(
    pool: &SqlitePool,
    session_id: &str,
    payment_intent_id: Option<&str>,
    payment_method: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE purchases
        SET payment_status = ?,
            stripe_payment_intent_id = COALESCE(?, stripe_payment_intent_id),
            payment_method = ?,
            updated_at = ?
        WHERE stripe_session_id = ?
        "#,
    )
    .bind(PaymentStatus::Paid)
    .bind(payment_intent_id)
    .bind(payment_method)
    .bind(Utc::now())
    .bind(session_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns whether a purchase referenced `payment_intent_id`.
pub async fn set_status_by_payment_intent(
    pool: &SqlitePool,
    payment_intent_id: &str,
    status: PaymentStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE purchases SET payment_status = ?, updated_at = ? WHERE stripe_payment_intent_id = ?",
    )
    .bind(status)
    .bind(Utc::now())
    .bind(payment_intent_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &PurchaseFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        builder.push(" AND payment_status = ").push_bind(status);
    }
    if let Some(email) = &filter.customer_email {
        builder.push(" AND customer_email = ").push_bind(email.clone());
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(min) = filter.min_amount {
        builder.push(" AND total_amount >= ").push_bind(min);
    }
    if let Some(max) = filter.max_amount {
        builder.push(" AND total_amount <= ").push_bind(max);
    }
}

/// One page of purchases, newest first.
pub async fn list_purchases(
    pool: &SqlitePool,
    filter: &PurchaseFilter,
    limit: u32,
    offset: u32,
) -> Result<Vec<Purchase>, sqlx::Error> {
    let mut builder = QueryBuilder::new(format!("SELECT {COLUMNS} FROM purchases"));
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(i64::from(limit))
        .push(" OFFSET ")
        .push_bind(i64::from(offset));

    let rows: Vec<PurchaseRow> = builder.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(Purchase::from).collect())
}

/// Totals over every purchase matching `filter`; `total_purchases` doubles as the count.
pub async fn purchase_stats(
    pool: &SqlitePool,
    filter: &PurchaseFilter,
) -> Result<PurchaseStats, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        r#"
        SELECT
            CAST(COALESCE(SUM(total_amount), 0) AS REAL) AS total_revenue,
            COUNT(*) AS total_purchases,
            CAST(COALESCE(AVG(total_amount), 0) AS REAL) AS average_order_value,
            COALESCE(SUM(CASE WHEN payment_status = 'paid' THEN 1 ELSE 0 END), 0) AS paid_purchases,
            COALESCE(SUM(CASE WHEN payment_status = 'pending' THEN 1 ELSE 0 END), 0) AS pending_purchases,
            COALESCE(SUM(CASE WHEN payment_status = 'failed' THEN 1 ELSE 0 END), 0) AS failed_purchases
        FROM purchases
        "#,
    );
    push_filter(&mut builder, filter);
    builder.build_query_as().fetch_one(pool).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlx::db_connection;

    fn purchase(session: &str, total: f64) -> NewPurchase {
        NewPurchase {
            customer_name: "Obras del Norte".to_string(),
            customer_email: "compras@obras.mx".to_string(),
            customer_phone: None,
            customer_company: Some("Obras del Norte SA".to_string()),
            product_name: "Cemento Portland Gris CPC30".to_string(),
            product_description: "Bulto de 50 kg".to_string(),
            quantity: 10,
            unit_price: total / 10.0,
            subtotal: total,
            stripe_session_id: session.to_string(),
            total_amount: total,
            currency: "mxn".to_string(),
            shipping_address: Some(ShippingAddress {
                city: Some("Monterrey".to_string()),
                ..Default::default()
            }),
            notes: None,
            tags: vec!["mayoreo".to_string()],
        }
    }

    #[tokio::test]
    async fn insert_round_trips_and_rejects_duplicate_sessions() {
        let pool = db_connection("sqlite::memory:").await.unwrap();

        let created = insert_purchase_if_absent(&pool, purchase("cs_p1", 1500.0))
            .await
            .unwrap()
            .unwrap();
        let duplicate = insert_purchase_if_absent(&pool, purchase("cs_p1", 900.0))
            .await
            .unwrap();
        let stored = find_purchase(&pool, &created.id).await.unwrap().unwrap();

        assert!(duplicate.is_none());
        assert_eq!(stored.id, created.id);
        assert_eq!(stored.total_amount, 1500.0);
        assert_eq!(stored.customer_company.as_deref(), Some("Obras del Norte SA"));
        assert_eq!(stored.currency, "MXN");
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert_eq!(stored.tags, vec!["mayoreo".to_string()]);
        assert_eq!(
            stored.shipping_address.and_then(|a| a.city).as_deref(),
            Some("Monterrey")
        );
    }

    #[tokio::test]
    async fn changes_keep_untouched_fields_and_recompute_net() {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        let created = insert_purchase_if_absent(&pool, purchase("cs_p2", 1000.0))
            .await
            .unwrap()
            .unwrap();

        let changes = PurchaseChanges {
            payment_status: Some(PaymentStatus::Refunded),
            stripe_fee: Some(40.0),
            ..Default::default()
        };
        let updated = save_purchase_changes(&pool, &created.id, changes)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.payment_status, PaymentStatus::Refunded);
        assert_eq!(updated.net_amount, Some(960.0));
        assert_eq!(updated.tags, created.tags);
        let stored = find_purchase(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Refunded);
        assert_eq!(stored.stripe_fee, Some(40.0));
        assert_eq!(stored.net_amount, Some(960.0));

        let missing = save_purchase_changes(&pool, "missing", PurchaseChanges::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn payment_events_move_status() {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        let created = insert_purchase_if_absent(&pool, purchase("cs_p3", 1000.0))
            .await
            .unwrap()
            .unwrap();

        assert!(mark_session_paid(&pool, "cs_p3", Some("pi_3"), "card").await.unwrap());
        assert!(!mark_session_paid(&pool, "cs_other", None, "card").await.unwrap());
        let paid = find_purchase(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.stripe_payment_intent_id.as_deref(), Some("pi_3"));
        assert_eq!(paid.payment_method.as_deref(), Some("card"));

        assert!(set_status_by_payment_intent(&pool, "pi_3", PaymentStatus::Failed)
            .await
            .unwrap());
        let failed = find_purchase(&pool, &created.id).await.unwrap().unwrap();
        assert_eq!(failed.payment_status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn filters_apply_to_listing_and_stats() {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        for (session, total) in [("cs_a", 500.0), ("cs_b", 1500.0), ("cs_c", 2500.0)] {
            insert_purchase_if_absent(&pool, purchase(session, total))
                .await
                .unwrap();
        }
        mark_session_paid(&pool, "cs_c", None, "card").await.unwrap();

        let all = purchase_stats(&pool, &PurchaseFilter::default()).await.unwrap();
        assert_eq!(all.total_purchases, 3);
        assert_eq!(all.total_revenue, 4500.0);
        assert_eq!(all.average_order_value, 1500.0);
        assert_eq!(all.paid_purchases, 1);
        assert_eq!(all.pending_purchases, 2);
        assert_eq!(all.failed_purchases, 0);

        let large = PurchaseFilter {
            min_amount: Some(1000.0),
            ..Default::default()
        };
        let page = list_purchases(&pool, &large, 10, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert!(page.iter().all(|p| p.total_amount >= 1000.0));

        let paid = PurchaseFilter {
            status: Some(PaymentStatus::Paid),
            ..Default::default()
        };
        let listed = list_purchases(&pool, &paid, 10, 0).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].stripe_session_id, "cs_c");

        let nobody = PurchaseFilter {
            customer_email: Some("otro@obras.mx".to_string()),
            ..Default::default()
        };
        assert_eq!(purchase_stats(&pool, &nobody).await.unwrap(), PurchaseStats::default());
    }

    #[tokio::test]
    async fn remove_reports_whether_it_deleted() {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        let created = insert_purchase_if_absent(&pool, purchase("cs_p4", 100.0))
            .await
            .unwrap()
            .unwrap();

        assert!(remove_purchase(&pool, &created.id).await.unwrap());
        assert!(!remove_purchase(&pool, &created.id).await.unwrap());
        assert!(find_purchase(&pool, &created.id).await.unwrap().is_none());
    }
}
