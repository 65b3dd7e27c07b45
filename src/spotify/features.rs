use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    error::HttpError,
    pipeline::RateLimiter,
    spotify::SpotifyClient,
    types::{AudioFeatureRecord, AudioFeatures, Batch, TrackRef},
    warning,
};

impl SpotifyClient {
    /// Fetches the audio features of one track (`GET /audio-features/{id}`).
    ///
    /// Identifier, URL, key, mode, time-signature and type fields of the
    /// response are discarded while decoding.
    pub async fn get_audio_features(
        &self,
        access_token: &str,
        track_id: &str,
    ) -> Result<AudioFeatures, HttpError> {
        let path = format!("/audio-features/{}", urlencoding::encode(track_id));
        self.get_json::<AudioFeatures>(&path, &[], access_token).await
    }

    /// Turns one track into a warehouse record tagged with user and track name.
    pub async fn enrich(
        &self,
        track: &TrackRef,
        access_token: &str,
        user_id: &str,
    ) -> Result<AudioFeatureRecord, HttpError> {
        let features = self.get_audio_features(access_token, &track.id).await?;
        Ok(AudioFeatureRecord::new(user_id, &track.name, features))
    }

    /// Enriches every track in order, waiting on `limiter` before each request.
    ///
    /// Output order matches input order one to one. The first failing track
    /// aborts the whole batch; nothing is skipped and nothing is retried.
    pub async fn enrich_all(
        &self,
        tracks: &[TrackRef],
        access_token: &str,
        user_id: &str,
        limiter: &mut dyn RateLimiter,
    ) -> Result<Batch, HttpError> {
        let pb = ProgressBar::new(tracks.len() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.blue} [{bar:30.blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Fetching audio features...");

        let mut batch = Batch::with_capacity(tracks.len());
        for (position, track) in tracks.iter().enumerate() {
            limiter.wait().await;

            match self.enrich(track, access_token, user_id).await {
                Ok(record) => {
                    batch.push(record);
                    pb.inc(1);
                }
                Err(e) => {
                    pb.finish_and_clear();
                    warning!(
                        "Failed to get audio features for track {} of {} ({}): {}",
                        position + 1,
                        tracks.len(),
                        track.id,
                        e
                    );
                    return Err(e);
                }
            }
        }

        pb.finish_and_clear();
        Ok(batch)
    }
}
