//! # Warehouse Sink
//!
//! Persists standardized batches into a schema-fixed, append-only table and
//! (re)trains the clustering model over it.
//!
//! The sink is the [`Warehouse`] trait. Two implementations ship with the crate:
//!
//! - [`BigQueryWarehouse`] - BigQuery REST API, authenticated with a service
//!   account key
//! - [`MemoryWarehouse`] - in-process tables for local runs and tests
//!
//! Deduplication happens per user, not per track: once any row of a user is
//! stored, later runs for that user add nothing even if their tracks changed.
//! Model training is re-run over the full table on every ingestion.

mod bigquery;
mod memory;
mod service_account;

use std::fmt;

use async_trait::async_trait;

use crate::{
    error::WarehouseError,
    types::{AudioFeatureRecord, FeatureColumn, SchemaField},
};

pub use bigquery::BigQueryWarehouse;
pub use memory::{LOCAL_PROJECT, MemoryWarehouse};
pub use service_account::ServiceAccountAuth;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetRef {
    pub project_id: String,
    pub dataset_id: String,
}

impl DatasetRef {
    pub fn table(&self, table_id: &str) -> TableRef {
        TableRef {
            project_id: self.project_id.clone(),
            dataset_id: self.dataset_id.clone(),
            table_id: table_id.to_string(),
        }
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project_id, self.dataset_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableRef {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
}

impl TableRef {
    pub fn dataset(&self) -> DatasetRef {
        DatasetRef {
            project_id: self.project_id.clone(),
            dataset_id: self.dataset_id.clone(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// K-means model trained over the feature columns of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusteringModel {
    pub name: String,
    pub num_clusters: u32,
}

/// The model-training statement issued after every ingestion.
///
/// `CREATE OR REPLACE` keeps the unconditional re-run from failing once the
/// model exists.
pub fn clustering_statement(
    dataset: &DatasetRef,
    table: &TableRef,
    model: &ClusteringModel,
) -> String {
    let columns = FeatureColumn::ALL
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE OR REPLACE MODEL `{dataset}.{model}`\n\
         OPTIONS (\n    MODEL_TYPE='KMEANS',\n    NUM_CLUSTERS={k}\n)\n\
         AS\n\
         SELECT\n    {columns}\n\
         FROM `{table}`",
        dataset = dataset,
        model = model.name,
        k = model.num_clusters,
        columns = columns,
        table = table,
    )
}

/// Query used to decide whether a user was already ingested.
pub fn distinct_user_query(table: &TableRef) -> String {
    format!("SELECT DISTINCT user_id FROM `{table}` WHERE user_id = @user_id")
}

/// Destination of the standardized audio-feature rows.
///
/// Implemented by [`BigQueryWarehouse`] for the real sink and by
/// [`MemoryWarehouse`] for `--in-memory` runs and tests. The pipeline only
/// talks to this trait, so both sinks behave the same from its side:
///
/// 1. [`ensure_dataset`](Warehouse::ensure_dataset) and
///    [`ensure_table`](Warehouse::ensure_table) may run on every request
/// 2. [`user_already_ingested`](Warehouse::user_already_ingested) gates the fetch
/// 3. [`insert_batch`](Warehouse::insert_batch) commits a whole batch or nothing
/// 4. [`trigger_clustering_model`](Warehouse::trigger_clustering_model) submits
///    the retraining statement without waiting for it
///
/// # Errors
///
/// Every method returns [`WarehouseError`]. Transport and authentication
/// failures surface as-is; row-level rejections of an insert are collected
/// into [`WarehouseError::Insert`].
///
/// # Example
///
/// ```no_run
/// use tastecluster::{
///     types::audio_features_schema,
///     warehouse::{MemoryWarehouse, Warehouse},
/// };
///
/// #[tokio::main]
/// async fn main() {
///     let warehouse = MemoryWarehouse::default();
///     let dataset = warehouse.ensure_dataset("spotify").await.unwrap();
///     let table = warehouse
///         .ensure_table(&dataset, "audio_features", &audio_features_schema())
///         .await
///         .unwrap();
///     assert!(!warehouse.user_already_ingested(&table, "someone").await.unwrap());
/// }
/// ```
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Returns the dataset, creating it if absent. Idempotent.
    async fn ensure_dataset(&self, name: &str) -> Result<DatasetRef, WarehouseError>;

    /// Returns the table, creating it with `schema` if absent. Idempotent.
    async fn ensure_table(
        &self,
        dataset: &DatasetRef,
        name: &str,
        schema: &[SchemaField],
    ) -> Result<TableRef, WarehouseError>;

    /// Whether the table already holds any row of `user_id`.
    async fn user_already_ingested(
        &self,
        table: &TableRef,
        user_id: &str,
    ) -> Result<bool, WarehouseError>;

    /// Appends `rows` to `table` in one bulk call.
    ///
    /// The batch is all-or-nothing: when any row violates the REQUIRED
    /// schema (an empty string or a non-finite float) nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::Insert`] carrying every row-level error, each
    /// with the index of its row, or the transport error of the call.
    async fn insert_batch(
        &self,
        table: &TableRef,
        rows: &[AudioFeatureRecord],
    ) -> Result<(), WarehouseError>;

    /// Issues the model-training statement over the full table.
    async fn trigger_clustering_model(
        &self,
        dataset: &DatasetRef,
        table: &TableRef,
        model: &ClusteringModel,
    ) -> Result<(), WarehouseError>;
}
