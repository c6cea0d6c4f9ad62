//! In-memory publisher with the same replace/append semantics as the SQLite sink.

use super::{Cell, Destination, PublishError, PublishMode, PublishReceipt, Publisher, TableFrame};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryPublisher {
    tables: Mutex<HashMap<Destination, Vec<Vec<Cell>>>>,
    log: Mutex<Vec<(Destination, PublishMode)>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current contents of `destination`.
    pub async fn rows(&self, destination: Destination) -> Vec<Vec<Cell>> {
        self.tables
            .lock()
            .await
            .get(&destination)
            .cloned()
            .unwrap_or_default()
    }

    /// Every publish so far, in call order.
    pub async fn publishes(&self) -> Vec<(Destination, PublishMode)> {
        self.log.lock().await.clone()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(
        &self,
        frame: &TableFrame,
        mode: PublishMode,
    ) -> Result<PublishReceipt, PublishError> {
        frame.validate()?;
        let destination = frame.destination();
        let mut tables = self.tables.lock().await;
        let table = tables.entry(destination).or_default();

        let before = table.len();
        match mode {
            PublishMode::Replace => table.clear(),
            PublishMode::Append => {
                let epochs = frame.epochs();
                table.retain(|row| {
                    row.first()
                        .and_then(Cell::as_int)
                        .map_or(true, |epoch| !epochs.contains(&epoch))
                });
            }
        }
        let rows_removed = (before - table.len()) as u64;
        table.extend(frame.rows().iter().cloned());

        self.log.lock().await.push((destination, mode));
        Ok(PublishReceipt {
            destination,
            mode,
            rows_written: frame.len(),
            rows_removed,
        })
    }

    async fn read(&self, destination: Destination) -> Result<Vec<Vec<Cell>>, PublishError> {
        Ok(self.rows(destination).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Decimal;

    fn emission_row(epoch: i64, pool: &str) -> Vec<Cell> {
        vec![
            Cell::Int(epoch),
            Cell::Text(pool.to_string()),
            Cell::Number(Decimal::from(1)),
            Cell::Number(Decimal::from(1)),
            Cell::Number(Decimal::from(1)),
        ]
    }

    #[tokio::test]
    async fn test_append_is_idempotent_per_epoch() {
        let sink = MemoryPublisher::new();
        let mut first = TableFrame::new(Destination::Emissions);
        first.push(emission_row(1, "A"));
        first.push(emission_row(2, "A"));
        sink.publish(&first, PublishMode::Append).await.unwrap();

        let mut rerun = TableFrame::new(Destination::Emissions);
        rerun.push(emission_row(2, "A"));
        rerun.push(emission_row(2, "B"));
        let receipt = sink.publish(&rerun, PublishMode::Append).await.unwrap();
        assert_eq!(receipt.rows_removed, 1);
        assert_eq!(sink.rows(Destination::Emissions).await.len(), 3);

        sink.publish(&rerun, PublishMode::Append).await.unwrap();
        assert_eq!(sink.rows(Destination::Emissions).await.len(), 3);
    }

    #[tokio::test]
    async fn test_replace_drops_everything() {
        let sink = MemoryPublisher::new();
        let mut frame = TableFrame::new(Destination::Emissions);
        frame.push(emission_row(1, "A"));
        frame.push(emission_row(2, "A"));
        sink.publish(&frame, PublishMode::Append).await.unwrap();

        let mut replacement = TableFrame::new(Destination::Emissions);
        replacement.push(emission_row(7, "Z"));
        sink.publish(&replacement, PublishMode::Replace).await.unwrap();

        let rows = sink.rows(Destination::Emissions).await;
        assert_eq!(rows, replacement.rows().to_vec());
        assert_eq!(sink.publishes().await.len(), 2);
    }
}
