use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

const SCHEMA: [&str; 8] = [
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        tarifa_por_km REAL NOT NULL,
        flete_minimo REAL NOT NULL,
        origen_lat REAL NOT NULL,
        origen_lng REAL NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS pedidos (
        id TEXT PRIMARY KEY,
        nombre TEXT NOT NULL,
        correo TEXT NOT NULL,
        telefono TEXT,
        compania TEXT,
        bolsas INTEGER NOT NULL CHECK (bolsas >= 1),
        precio_unitario REAL NOT NULL CHECK (precio_unitario >= 0),
        subtotal REAL NOT NULL,
        flete REAL NOT NULL CHECK (flete >= 0),
        total_final REAL NOT NULL,
        address TEXT,
        location_lat REAL,
        location_lng REAL,
        distance_km REAL NOT NULL DEFAULT 0,
        notas TEXT,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        nombre TEXT NOT NULL,
        correo TEXT NOT NULL,
        telefono TEXT,
        compania TEXT,
        mensaje TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        stripe_session_id TEXT NOT NULL UNIQUE,
        status TEXT NOT NULL,
        amount_total INTEGER NOT NULL CHECK (amount_total >= 0),
        currency TEXT NOT NULL,
        customer_email TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS purchases (
        id TEXT PRIMARY KEY,
        customer_name TEXT NOT NULL,
        customer_email TEXT NOT NULL,
        customer_phone TEXT,
        customer_company TEXT,
        product_name TEXT NOT NULL,
        product_description TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity BETWEEN 1 AND 1000),
        unit_price REAL NOT NULL CHECK (unit_price >= 0),
        subtotal REAL NOT NULL CHECK (subtotal >= 0),
        stripe_session_id TEXT NOT NULL UNIQUE,
        stripe_payment_intent_id TEXT,
        payment_status TEXT NOT NULL DEFAULT 'pending',
        payment_method TEXT,
        total_amount REAL NOT NULL CHECK (total_amount >= 0),
        currency TEXT NOT NULL,
        stripe_fee REAL CHECK (stripe_fee >= 0),
        net_amount REAL,
        shipping_street TEXT,
        shipping_city TEXT,
        shipping_state TEXT,
        shipping_postal_code TEXT,
        shipping_country TEXT,
        notes TEXT,
        tags TEXT NOT NULL DEFAULT '[]',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS pedidos_created_at ON pedidos (created_at DESC)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS purchases_created_at ON purchases (created_at DESC)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS purchases_payment_intent ON purchases (stripe_payment_intent_id)
    "#,
];

/// Open the SQLite pool and make sure every table exists.
pub async fn db_connection(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // Every connection to `:memory:` is its own database, so keep just one.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    info!("Connected to SQLite database at {database_url}");

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok(pool)
}
