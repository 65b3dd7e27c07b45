//! # Ingestion Pipeline
//!
//! One single-pass run per authenticated request:
//!
//! ```text
//! profile → ensure dataset → ensure table → already ingested?
//!     no:  top + saved tracks → audio features → standardize → insert
//!     yes: skip straight to training
//! → (re)train clustering model
//! ```
//!
//! Every step is awaited in order and the first failure aborts the run.

mod normalize;
mod rate_limit;

pub use normalize::{ColumnStats, column_stats, standardize};
pub use rate_limit::{FixedInterval, NoDelay, RateLimiter};

use crate::{
    config::{PipelineConfig, WarehouseConfig},
    error::PipelineError,
    info,
    management::SessionContext,
    spotify::SpotifyClient,
    success,
    types::audio_features_schema,
    warehouse::{ClusteringModel, Warehouse},
    warning,
};

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOutcome {
    pub user_id: String,
    pub rows_inserted: usize,
    /// The user already had rows stored, so nothing was fetched or inserted.
    pub skipped: bool,
}

pub struct IngestionPipeline<'a> {
    spotify: &'a SpotifyClient,
    warehouse: &'a dyn Warehouse,
    warehouse_config: &'a WarehouseConfig,
    pipeline_config: &'a PipelineConfig,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(
        spotify: &'a SpotifyClient,
        warehouse: &'a dyn Warehouse,
        warehouse_config: &'a WarehouseConfig,
        pipeline_config: &'a PipelineConfig,
    ) -> Self {
        Self {
            spotify,
            warehouse,
            warehouse_config,
            pipeline_config,
        }
    }

    fn model(&self) -> ClusteringModel {
        ClusteringModel {
            name: self.warehouse_config.model.clone(),
            num_clusters: self.warehouse_config.num_clusters,
        }
    }

    /// Runs one ingestion for the user behind `session`.
    ///
    /// Steps run strictly in order: profile, dataset, table, the
    /// already-ingested check, then (for a new user) candidate tracks,
    /// enrichment paced by `limiter`, standardization and the insert. The
    /// clustering model is retrained at the end of every successful run,
    /// including for returning users.
    ///
    /// # Arguments
    ///
    /// * `session` - Tokens of the authenticated user
    /// * `limiter` - Pacing between audio-feature requests
    ///
    /// # Returns
    ///
    /// The user id, how many rows were inserted and whether ingestion was
    /// skipped because the user already had rows.
    ///
    /// # Errors
    ///
    /// The first failing step aborts the run. An upstream Spotify failure on
    /// any page or track leaves the warehouse without new rows and keeps the
    /// upstream status in [`PipelineError::status`].
    pub async fn run(
        &self,
        session: &SessionContext,
        limiter: &mut dyn RateLimiter,
    ) -> Result<IngestionOutcome, PipelineError> {
        let access_token = session.access_token();

        let profile = self.spotify.get_profile(access_token).await?;
        let user_id = profile.id;
        info!(
            "Ingesting listening data of {}",
            profile.display_name.as_deref().unwrap_or(&user_id)
        );

        let dataset = self
            .warehouse
            .ensure_dataset(&self.warehouse_config.dataset)
            .await?;
        let table = self
            .warehouse
            .ensure_table(&dataset, &self.warehouse_config.table, &audio_features_schema())
            .await?;

        let skipped = self.warehouse.user_already_ingested(&table, &user_id).await?;
        let mut rows_inserted = 0;

        if skipped {
            info!("User {} is already in {}, skipping ingestion.", user_id, table);
        } else {
            let tracks = self
                .spotify
                .get_candidate_tracks(access_token, self.pipeline_config)
                .await?;
            info!("Collected {} tracks for {}.", tracks.len(), user_id);

            let batch = self
                .spotify
                .enrich_all(&tracks, access_token, &user_id, limiter)
                .await?;
            let batch = standardize(batch);

            if batch.is_empty() {
                warning!("No tracks found for {}, nothing to insert.", user_id);
            } else {
                self.warehouse.insert_batch(&table, &batch).await?;
                rows_inserted = batch.len();
                success!("New rows have been added to {}.", table);
            }
        }

        self.warehouse
            .trigger_clustering_model(&dataset, &table, &self.model())
            .await?;

        Ok(IngestionOutcome {
            user_id,
            rows_inserted,
            skipped,
        })
    }
}
