//! SQLite implementation of the publish sink.

use crate::domain::Decimal;
use crate::publish::{
    Cell, ColumnKind, Destination, PublishError, PublishMode, PublishReceipt, Publisher,
    TableFrame,
};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::{debug, info};

/// Publishes frames into the tables created by `schema.sql`.
#[derive(Debug, Clone)]
pub struct SqlitePublisher {
    pool: SqlitePool,
}

impl SqlitePublisher {
    pub fn new(pool: SqlitePool) -> Self {
        SqlitePublisher { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Publisher for SqlitePublisher {
    async fn publish(
        &self,
        frame: &TableFrame,
        mode: PublishMode,
    ) -> Result<PublishReceipt, PublishError> {
        frame.validate()?;
        let destination = frame.destination();
        let table = destination.table();
        let columns = destination.columns();

        let mut tx = self.pool.begin().await?;

        let rows_removed = match mode {
            PublishMode::Replace => {
                let delete_sql = format!("DELETE FROM {}", table);
                sqlx::query(&delete_sql)
                    .execute(&mut *tx)
                    .await?
                    .rows_affected()
            }
            PublishMode::Append => {
                let delete_sql = format!("DELETE FROM {} WHERE epoch = ?", table);
                let mut removed = 0;
                for epoch in frame.epochs() {
                    removed += sqlx::query(&delete_sql)
                        .bind(epoch)
                        .execute(&mut *tx)
                        .await?
                        .rows_affected();
                }
                removed
            }
        };

        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        for row in frame.rows() {
            let mut query = sqlx::query(&insert_sql);
            for cell in row {
                query = match cell {
                    Cell::Int(value) => query.bind(*value),
                    Cell::Text(value) => query.bind(value.as_str()),
                    Cell::Number(value) => query.bind(value.to_canonical_string()),
                };
            }
            query.execute(&mut *tx).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO publish_log (destination, mode, rows_written, rows_removed, published_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(table)
        .bind(mode.as_str())
        .bind(frame.len() as i64)
        .bind(rows_removed as i64)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            destination = %destination,
            mode = %mode,
            rows_written = frame.len(),
            rows_removed,
            "Published"
        );
        Ok(PublishReceipt {
            destination,
            mode,
            rows_written: frame.len(),
            rows_removed,
        })
    }

    async fn read(&self, destination: Destination) -> Result<Vec<Vec<Cell>>, PublishError> {
        let columns = destination.columns();
        let select_sql = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            columns.join(", "),
            destination.table()
        );
        let stored = sqlx::query(&select_sql).fetch_all(&self.pool).await?;

        let mut rows = Vec::with_capacity(stored.len());
        for record in &stored {
            let mut cells = Vec::with_capacity(columns.len());
            for (idx, column) in columns.iter().copied().enumerate() {
                let cell = match Destination::kind_of(column) {
                    ColumnKind::Int => Cell::Int(record.try_get::<i64, _>(idx)?),
                    ColumnKind::Text => Cell::Text(record.try_get::<String, _>(idx)?),
                    ColumnKind::Number => {
                        let raw: String = record.try_get(idx)?;
                        let value = Decimal::from_str_canonical(&raw).map_err(|_| {
                            PublishError::InvalidStored {
                                destination,
                                column,
                                value: raw.clone(),
                            }
                        })?;
                        Cell::Number(value)
                    }
                };
                cells.push(cell);
            }
            rows.push(cells);
        }

        debug!(destination = %destination, rows = rows.len(), "Read stored rows");
        Ok(rows)
    }
}
