use crate::brain::record::EnrichmentRecord;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::types::Json;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        partition_key TEXT NOT NULL,
        id TEXT NOT NULL,
        document TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (partition_key, id)
    );
"#;

/// Opens (creating if needed) the SQLite document store at `db_path` and applies the schema.
pub async fn init_db(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let db_url = format!("sqlite://{}", db_path.to_string_lossy());

    info!("Initializing database at: {}", db_url);

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;
    info!("Database initialized and schema applied.");

    Ok(pool)
}

/// In-memory database on a single connection.
#[cfg(test)]
pub async fn init_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}

// --- Documents ---

/// Inserts every record in one transaction. An existing key aborts the whole batch.
pub async fn insert_documents(
    pool: &SqlitePool,
    partition_key: &str,
    documents: &HashMap<String, EnrichmentRecord>,
) -> Result<(), sqlx::Error> {
    let created_at = Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    for (id, record) in documents {
        sqlx::query(
            r#"
            INSERT INTO documents (partition_key, id, document, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(partition_key)
        .bind(id)
        .bind(Json(record))
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

pub async fn get_document(
    pool: &SqlitePool,
    partition_key: &str,
    id: &str,
) -> Result<Option<EnrichmentRecord>, sqlx::Error> {
    let row: Option<(Json<EnrichmentRecord>,)> = sqlx::query_as(
        r#"
        SELECT document
        FROM documents
        WHERE partition_key = ? AND id = ?
        "#,
    )
    .bind(partition_key)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(Json(record),)| record))
}

#[cfg(test)]
pub async fn list_documents(
    pool: &SqlitePool,
    partition_key: &str,
) -> Result<Vec<EnrichmentRecord>, sqlx::Error> {
    let rows: Vec<(Json<EnrichmentRecord>,)> = sqlx::query_as(
        r#"
        SELECT document
        FROM documents
        WHERE partition_key = ?
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(partition_key)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(Json(record),)| record).collect())
}

pub async fn count_documents(pool: &SqlitePool, partition_key: &str) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM documents WHERE partition_key = ?")
            .bind(partition_key)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
