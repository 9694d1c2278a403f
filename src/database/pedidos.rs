use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::domain::types::{Location, Pedido, Quote};

/// Customer fields of a new pedido, already validated.
#[derive(Debug, Clone)]
pub struct NewPedido {
    pub nombre: String,
    pub correo: String,
    pub telefono: Option<String>,
    pub compania: Option<String>,
    pub bolsas: u32,
    pub precio_unitario: f64,
    pub address: Option<String>,
    pub location: Option<Location>,
    pub notas: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct PedidoFilter {
    pub id: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub min_total: Option<f64>,
    pub max_total: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct PedidoRow {
    id: String,
    nombre: String,
    correo: String,
    telefono: Option<String>,
    compania: Option<String>,
    bolsas: i64,
    precio_unitario: f64,
    subtotal: f64,
    flete: f64,
    total_final: f64,
    address: Option<String>,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
    distance_km: f64,
    notas: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PedidoRow> for Pedido {
    fn from(row: PedidoRow) -> Self {
        let location = match (row.location_lat, row.location_lng) {
            (Some(lat), Some(lng)) => Some(Location::new(lat, lng)),
            _ => None,
        };

        Self {
            id: row.id,
            nombre: row.nombre,
            correo: row.correo,
            telefono: row.telefono,
            compania: row.compania,
            bolsas: row.bolsas,
            precio_unitario: row.precio_unitario,
            subtotal: row.subtotal,
            flete: row.flete,
            total_final: row.total_final,
            address: row.address,
            location,
            distance_km: row.distance_km,
            notas: row.notas,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "id, nombre, correo, telefono, compania, bolsas, precio_unitario, subtotal, \
     flete, total_final, address, location_lat, location_lng, distance_km, notas, created_at";

/// Persist a pedido with the amounts of `quote`. Pedidos are never updated afterwards.
pub async fn insert_pedido(
    pool: &SqlitePool,
    pedido: NewPedido,
    quote: &Quote,
) -> Result<Pedido, sqlx::Error> {
    let created = Pedido {
        id: Uuid::new_v4().to_string(),
        nombre: pedido.nombre,
        correo: pedido.correo,
        telefono: pedido.telefono,
        compania: pedido.compania,
        bolsas: i64::from(pedido.bolsas),
        precio_unitario: pedido.precio_unitario,
        subtotal: quote.subtotal,
        flete: quote.flete,
        total_final: quote.total_final,
        address: pedido.address,
        location: pedido.location,
        distance_km: quote.distance_km,
        notas: pedido.notas,
        created_at: Utc::now(),
    };

    sqlx::query(&format!(
        "INSERT INTO pedidos ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
    ))
    .bind(&created.id)
    .bind(&created.nombre)
    .bind(&created.correo)
    .bind(&created.telefono)
    .bind(&created.compania)
    .bind(created.bolsas)
    .bind(created.precio_unitario)
    .bind(created.subtotal)
    .bind(created.flete)
    .bind(created.total_final)
    .bind(&created.address)
    .bind(created.location.map(|l| l.lat))
    .bind(created.location.map(|l| l.lng))
    .bind(created.distance_km)
    .bind(&created.notas)
    .bind(created.created_at)
    .execute(pool)
    .await?;

    Ok(created)
}

pub async fn find_pedido(pool: &SqlitePool, id: &str) -> Result<Option<Pedido>, sqlx::Error> {
    let row: Option<PedidoRow> =
        sqlx::query_as(&format!("SELECT {COLUMNS} FROM pedidos WHERE id = ?"))
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(Pedido::from))
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a PedidoFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(id) = &filter.id {
        builder.push(" AND id = ").push_bind(id);
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
    if let Some(min) = filter.min_total {
        builder.push(" AND total_final >= ").push_bind(min);
    }
    if let Some(max) = filter.max_total {
        builder.push(" AND total_final <= ").push_bind(max);
    }
}

/// One page of pedidos, newest first.
pub async fn list_pedidos(
    pool: &SqlitePool,
    filter: &PedidoFilter,
    limit: u32,
    offset: u32,
) -> Result<Vec<Pedido>, sqlx::Error> {
    let mut builder = QueryBuilder::new(format!("SELECT {COLUMNS} FROM pedidos"));
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(i64::from(limit))
        .push(" OFFSET ")
        .push_bind(i64::from(offset));

    let rows: Vec<PedidoRow> = builder.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(Pedido::from).collect())
}

pub async fn count_pedidos(pool: &SqlitePool, filter: &PedidoFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM pedidos");
    push_filter(&mut builder, filter);
    let (count,): (i64,) = builder.build_query_as().fetch_one(pool).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlx::db_connection;

    fn new_pedido(nombre: &str, bolsas: u32) -> NewPedido {
        NewPedido {
            nombre: nombre.to_string(),
            correo: "cliente@example.com".to_string(),
            telefono: None,
            compania: Some("Constructora Norte".to_string()),
            bolsas,
            precio_unitario: 150.0,
            address: None,
            location: Some(Location::new(25.7, -100.3)),
            notas: None,
        }
    }

    fn quote_for(bolsas: u32, flete: f64) -> Quote {
        let subtotal = f64::from(bolsas) * 150.0;
        Quote {
            subtotal,
            flete,
            total_final: subtotal + flete,
            distance_km: 12.0,
        }
    }

    #[tokio::test]
    async fn inserted_pedido_round_trips() {
        let pool = db_connection("sqlite::memory:").await.unwrap();

        let created = insert_pedido(&pool, new_pedido("Ana", 10), &quote_for(10, 300.0))
            .await
            .unwrap();
        let found = find_pedido(&pool, &created.id).await.unwrap().unwrap();

        assert_eq!(found.id, created.id);
        assert_eq!(found.total_final, 1800.0);
        assert_eq!(found.location, Some(Location::new(25.7, -100.3)));
        assert_eq!(found.compania.as_deref(), Some("Constructora Norte"));
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        assert!(find_pedido(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn total_range_filters_and_counts_agree() {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        for (name, bolsas) in [("a", 1), ("b", 10), ("c", 100)] {
            insert_pedido(&pool, new_pedido(name, bolsas), &quote_for(bolsas, 100.0))
                .await
                .unwrap();
        }

        let filter = PedidoFilter {
            min_total: Some(1000.0),
            max_total: Some(5000.0),
            ..Default::default()
        };
        let page = list_pedidos(&pool, &filter, 10, 0).await.unwrap();
        let total = count_pedidos(&pool, &filter).await.unwrap();

        assert_eq!(total, 1);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].nombre, "b");
    }
}
