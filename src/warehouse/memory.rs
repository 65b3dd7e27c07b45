use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    error::{InsertErrors, RowInsertError, WarehouseError},
    info,
    types::{AudioFeatureRecord, FeatureColumn, SchemaField},
};

use super::{ClusteringModel, DatasetRef, TableRef, Warehouse, clustering_statement};

pub const LOCAL_PROJECT: &str = "local";

#[derive(Debug, Default)]
struct MemoryTable {
    schema: Vec<SchemaField>,
    rows: Vec<AudioFeatureRecord>,
}

#[derive(Debug, Default)]
struct MemoryState {
    datasets: BTreeSet<String>,
    tables: BTreeMap<TableRef, MemoryTable>,
    statements: Vec<String>,
    dataset_creations: usize,
    table_creations: usize,
    insert_calls: usize,
}

/// [`Warehouse`] keeping every table in process memory.
///
/// Insert validation mirrors the REQUIRED columns of the schema: a row with a
/// non-finite number is rejected and, as with the remote sink, one bad row
/// rejects the whole batch. Clustering statements are recorded, not executed.
#[derive(Debug)]
pub struct MemoryWarehouse {
    project_id: String,
    state: Mutex<MemoryState>,
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new(LOCAL_PROJECT)
    }
}

impl MemoryWarehouse {
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Rows of `table` in insertion order; empty if the table does not exist.
    pub fn rows(&self, table: &TableRef) -> Vec<AudioFeatureRecord> {
        self.state()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn schema(&self, table: &TableRef) -> Option<Vec<SchemaField>> {
        self.state().tables.get(table).map(|t| t.schema.clone())
    }

    /// Every clustering statement issued so far, oldest first.
    pub fn statements(&self) -> Vec<String> {
        self.state().statements.clone()
    }

    pub fn dataset_creations(&self) -> usize {
        self.state().dataset_creations
    }

    pub fn table_creations(&self) -> usize {
        self.state().table_creations
    }

    pub fn insert_calls(&self) -> usize {
        self.state().insert_calls
    }
}

fn validate(index: usize, record: &AudioFeatureRecord) -> Vec<RowInsertError> {
    let empty_strings = [
        ("user_id", record.user_id.as_str()),
        ("track_name", record.track_name.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(name, _)| name.to_string());

    let bad_floats = FeatureColumn::ALL
        .iter()
        .filter(|&&column| !record.get(column).is_finite())
        .map(|column| column.to_string());

    empty_strings
        .chain(bad_floats)
        .map(|field| RowInsertError {
            index,
            reason: "invalid".to_string(),
            message: format!("Missing required field: {}.", field),
        })
        .collect()
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn ensure_dataset(&self, name: &str) -> Result<DatasetRef, WarehouseError> {
        let mut state = self.state();
        if state.datasets.insert(name.to_string()) {
            state.dataset_creations += 1;
            info!("Created in-memory dataset {}.", name);
        }

        Ok(DatasetRef {
            project_id: self.project_id.clone(),
            dataset_id: name.to_string(),
        })
    }

    async fn ensure_table(
        &self,
        dataset: &DatasetRef,
        name: &str,
        schema: &[SchemaField],
    ) -> Result<TableRef, WarehouseError> {
        let mut state = self.state();
        if !state.datasets.contains(&dataset.dataset_id) {
            return Err(WarehouseError::NotFound(dataset.to_string()));
        }

        let table = dataset.table(name);
        if !state.tables.contains_key(&table) {
            state.tables.insert(
                table.clone(),
                MemoryTable {
                    schema: schema.to_vec(),
                    rows: Vec::new(),
                },
            );
            state.table_creations += 1;
            info!("Created in-memory table {}.", table);
        }

        Ok(table)
    }

    async fn user_already_ingested(
        &self,
        table: &TableRef,
        user_id: &str,
    ) -> Result<bool, WarehouseError> {
        let state = self.state();
        let stored = state
            .tables
            .get(table)
            .ok_or_else(|| WarehouseError::NotFound(table.to_string()))?;

        Ok(stored.rows.iter().any(|r| r.user_id == user_id))
    }

    async fn insert_batch(
        &self,
        table: &TableRef,
        rows: &[AudioFeatureRecord],
    ) -> Result<(), WarehouseError> {
        let mut state = self.state();
        state.insert_calls += 1;

        let stored = state
            .tables
            .get_mut(table)
            .ok_or_else(|| WarehouseError::NotFound(table.to_string()))?;

        let errors = rows
            .iter()
            .enumerate()
            .flat_map(|(index, record)| validate(index, record))
            .collect::<Vec<_>>();
        if !errors.is_empty() {
            return Err(InsertErrors(errors).into());
        }

        stored.rows.extend_from_slice(rows);
        Ok(())
    }

    async fn trigger_clustering_model(
        &self,
        dataset: &DatasetRef,
        table: &TableRef,
        model: &ClusteringModel,
    ) -> Result<(), WarehouseError> {
        let mut state = self.state();
        if !state.tables.contains_key(table) {
            return Err(WarehouseError::NotFound(table.to_string()));
        }

        state
            .statements
            .push(clustering_statement(dataset, table, model));
        Ok(())
    }
}
