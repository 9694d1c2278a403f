use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::domain::types::Message;

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub nombre: String,
    pub correo: String,
    pub telefono: Option<String>,
    pub compania: Option<String>,
    pub mensaje: String,
}

#[derive(Debug, Default, Clone)]
pub struct MessageFilter {
    /// Case-insensitive substring over nombre, correo, compania and mensaje.
    pub query: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    nombre: String,
    correo: String,
    telefono: Option<String>,
    compania: Option<String>,
    mensaje: String,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            nombre: row.nombre,
            correo: row.correo,
            telefono: row.telefono,
            compania: row.compania,
            mensaje: row.mensaje,
            created_at: row.created_at,
        }
    }
}

pub async fn insert_message(pool: &SqlitePool, message: NewMessage) -> Result<Message, sqlx::Error> {
    let created = Message {
        id: Uuid::new_v4().to_string(),
        nombre: message.nombre,
        correo: message.correo,
        telefono: message.telefono,
        compania: message.compania,
        mensaje: message.mensaje,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO messages (id, nombre, correo, telefono, compania, mensaje, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&created.id)
    .bind(&created.nombre)
    .bind(&created.correo)
    .bind(&created.telefono)
    .bind(&created.compania)
    .bind(&created.mensaje)
    .bind(created.created_at)
    .execute(pool)
    .await?;

    Ok(created)
}

fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filter(builder: &mut QueryBuilder<'_, Sqlite>, filter: &MessageFilter) {
    builder.push(" WHERE 1 = 1");
    if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
        let pattern = like_pattern(query.trim());
        builder.push(" AND (");
        for (i, column) in ["nombre", "correo", "compania", "mensaje"].iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push(format!("{column} LIKE "))
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        builder.push(")");
    }
    if let Some(from) = filter.date_from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
}

pub async fn list_messages(
    pool: &SqlitePool,
    filter: &MessageFilter,
    limit: u32,
    offset: u32,
) -> Result<Vec<Message>, sqlx::Error> {
    let mut builder = QueryBuilder::new(
        "SELECT id, nombre, correo, telefono, compania, mensaje, created_at FROM messages",
    );
    push_filter(&mut builder, filter);
    builder
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(i64::from(limit))
        .push(" OFFSET ")
        .push_bind(i64::from(offset));

    let rows: Vec<MessageRow> = builder.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().map(Message::from).collect())
}

pub async fn count_messages(pool: &SqlitePool, filter: &MessageFilter) -> Result<i64, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM messages");
    push_filter(&mut builder, filter);
    let (count,): (i64,) = builder.build_query_as().fetch_one(pool).await?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlx::db_connection;

    fn message(nombre: &str, mensaje: &str) -> NewMessage {
        NewMessage {
            nombre: nombre.to_string(),
            correo: format!("{}@example.com", nombre.to_lowercase()),
            telefono: None,
            compania: None,
            mensaje: mensaje.to_string(),
        }
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_across_columns() {
        let pool = db_connection("sqlite::memory:").await.unwrap();
        insert_message(&pool, message("Luis", "Necesito cotizar 200 bolsas"))
            .await
            .unwrap();
        insert_message(&pool, message("Marta", "Horario de entrega en sabado"))
            .await
            .unwrap();

        let filter = MessageFilter {
            query: Some("BOLSAS".to_string()),
            ..Default::default()
        };
        let found = list_messages(&pool, &filter, 10, 0).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nombre, "Luis");

        let by_mail = MessageFilter {
            query: Some("marta@".to_string()),
            ..Default::default()
        };
        assert_eq!(count_messages(&pool, &by_mail).await.unwrap(), 1);
        assert_eq!(count_messages(&pool, &MessageFilter::default()).await.unwrap(), 2);
    }
}
