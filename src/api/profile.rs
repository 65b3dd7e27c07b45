use axum::{Extension, response::Html};

use crate::{
    error::PipelineError,
    pipeline::{FixedInterval, IngestionPipeline},
    server::AppState,
    utils,
};

/// Runs one ingestion for the signed-in user and renders the completion page.
///
/// The session lock is released before the run starts; the pipeline only sees
/// a snapshot of the tokens.
pub async fn profile(Extension(app): Extension<AppState>) -> Result<Html<String>, PipelineError> {
    let context = app
        .session
        .lock()
        .await
        .context()
        .ok_or(PipelineError::NoSession)?;

    let config = &app.config;
    let mut limiter = FixedInterval::new(config.pipeline.request_interval);
    let pipeline = IngestionPipeline::new(
        &app.spotify,
        app.warehouse.as_ref(),
        &config.warehouse,
        &config.pipeline,
    );

    let outcome = pipeline.run(&context, &mut limiter).await?;

    let summary = if outcome.skipped {
        "Your tracks were already stored.".to_string()
    } else {
        format!("Stored {} tracks.", outcome.rows_inserted)
    };

    Ok(Html(format!(
        "<h2>Profile info saved.</h2><p>{}</p><p>Clustering model {} is being retrained.</p>",
        utils::escape_html(&summary),
        utils::escape_html(&config.warehouse.model),
    )))
}
