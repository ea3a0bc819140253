//! Dining table management

use std::sync::Arc;

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{DiningTable, DiningTableCreate, DiningTableUpdate, TableStatus};

use super::InputValidator;
use crate::db::{NewTable, RepoError, Store, TableChanges};

fn table_write_error(err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate(_) => AppError::new(ErrorCode::TableNameExists),
        RepoError::Conflict(_) => AppError::new(ErrorCode::TableHasReservations),
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct TableManager {
    store: Arc<dyn Store>,
    validator: InputValidator,
}

impl TableManager {
    pub fn new(store: Arc<dyn Store>, validator: InputValidator) -> Self {
        Self { store, validator }
    }

    pub async fn create_table(&self, req: DiningTableCreate) -> AppResult<DiningTable> {
        self.validator.check(&req)?;
        self.validator.check_capacity(req.capacity)?;
        let status = match req.status.as_deref() {
            Some(raw) => self.validator.parse_status(raw)?,
            None => TableStatus::default(),
        };

        let table = self
            .store
            .insert_table(NewTable {
                name: req.name.trim().to_string(),
                capacity: req.capacity,
                status,
            })
            .await
            .map_err(table_write_error)?;

        tracing::info!(table_id = table.id, name = %table.name, "Table created");
        Ok(table)
    }

    pub async fn update_table(&self, id: i64, req: DiningTableUpdate) -> AppResult<DiningTable> {
        if req.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyUpdate));
        }
        self.validator.check(&req)?;
        if let Some(capacity) = req.capacity {
            self.validator.check_capacity(capacity)?;
        }
        let status = req
            .status
            .as_deref()
            .map(|raw| self.validator.parse_status(raw))
            .transpose()?;

        let table = self
            .store
            .update_table(
                id,
                TableChanges {
                    name: req.name.map(|n| n.trim().to_string()),
                    capacity: req.capacity,
                    status,
                },
            )
            .await
            .map_err(table_write_error)?;

        tracing::info!(table_id = id, "Table updated");
        Ok(table)
    }

    /// Refused while any reservation references the table
    pub async fn delete_table(&self, id: i64) -> AppResult<()> {
        self.store.delete_table(id).await.map_err(table_write_error)?;
        tracing::info!(table_id = id, "Table deleted");
        Ok(())
    }

    pub async fn get_table(&self, id: i64) -> AppResult<DiningTable> {
        self.store
            .find_table(id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::TableNotFound))
    }

    pub async fn list_tables(&self) -> AppResult<Vec<DiningTable>> {
        Ok(self.store.list_tables(None).await?)
    }

    pub async fn list_by_status(&self, status: &str) -> AppResult<Vec<DiningTable>> {
        let status = self.validator.parse_status(status)?;
        Ok(self.store.list_tables(Some(status)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn manager() -> TableManager {
        TableManager::new(Arc::new(MemoryStore::new()), InputValidator::default())
    }

    fn create(name: &str) -> DiningTableCreate {
        DiningTableCreate {
            name: name.into(),
            capacity: 4,
            status: None,
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_available() {
        let tables = manager();
        let table = tables.create_table(create("T-01")).await.unwrap();
        assert_eq!(table.status, TableStatus::Available);
        assert_eq!(tables.get_table(table.id).await.unwrap(), table);
    }

    #[tokio::test]
    async fn test_short_names_are_accepted() {
        let tables = manager();
        let req: DiningTableCreate =
            serde_json::from_str(r#"{"name":"T1","capacity":4,"status":"available"}"#).unwrap();
        let table = tables.create_table(req).await.unwrap();
        assert_eq!(table.name, "T1");
        assert_eq!(table.status, TableStatus::Available);

        let err = tables.create_table(create("")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_conflict() {
        let tables = manager();
        tables.create_table(create("T-01")).await.unwrap();
        let err = tables.create_table(create("T-01")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TableNameExists);

        let other = tables.create_table(create("T-02")).await.unwrap();
        let rename = DiningTableUpdate {
            name: Some("T-01".into()),
            ..Default::default()
        };
        let err = tables.update_table(other.id, rename).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TableNameExists);
    }

    #[tokio::test]
    async fn test_invalid_input() {
        let tables = manager();
        let mut req = create("T-01");
        req.status = Some("broken".into());
        assert_eq!(
            tables.create_table(req).await.unwrap_err().code,
            ErrorCode::InvalidTableStatus
        );

        let mut req = create("T-01");
        req.capacity = 0;
        assert_eq!(
            tables.create_table(req).await.unwrap_err().code,
            ErrorCode::ValidationFailed
        );

        let table = tables.create_table(create("T-01")).await.unwrap();
        let err = tables
            .update_table(table.id, DiningTableUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EmptyUpdate);
    }

    #[tokio::test]
    async fn test_list_by_status() {
        let tables = manager();
        tables.create_table(create("T-01")).await.unwrap();
        let mut busy = create("T-02");
        busy.status = Some("occupied".into());
        tables.create_table(busy).await.unwrap();

        let occupied = tables.list_by_status("occupied").await.unwrap();
        assert_eq!(occupied.len(), 1);
        assert_eq!(occupied[0].name, "T-02");
        assert_eq!(tables.list_tables().await.unwrap().len(), 2);
        assert!(tables.list_by_status("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_missing_table() {
        let tables = manager();
        assert_eq!(
            tables.get_table(42).await.unwrap_err().code,
            ErrorCode::TableNotFound
        );
        assert_eq!(
            tables.delete_table(42).await.unwrap_err().code,
            ErrorCode::TableNotFound
        );
    }
}
