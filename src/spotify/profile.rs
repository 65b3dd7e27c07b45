use crate::{
    config::PipelineConfig,
    error::HttpError,
    spotify::SpotifyClient,
    types::{SavedTracksResponse, TopTracksResponse, TrackRef, UserProfile},
    warning,
};

impl SpotifyClient {
    /// Retrieves the authenticated user's profile (`GET /me`).
    pub async fn get_profile(&self, access_token: &str) -> Result<UserProfile, HttpError> {
        self.get_json::<UserProfile>("/me", &[], access_token)
            .await
            .inspect_err(|e| warning!("Failed to get profile info: {}", e))
    }

    /// Retrieves a single page of the user's top tracks (`GET /me/top/tracks`).
    pub async fn get_top_tracks(
        &self,
        access_token: &str,
        limit: u32,
    ) -> Result<Vec<TrackRef>, HttpError> {
        let res = self
            .get_json::<TopTracksResponse>(
                "/me/top/tracks",
                &[("limit", limit.to_string())],
                access_token,
            )
            .await
            .inspect_err(|e| warning!("Failed to get top tracks info: {}", e))?;

        Ok(res.items)
    }

    /// Retrieves the user's saved tracks (`GET /me/tracks`) through offset pagination.
    ///
    /// Always requests `pages` pages of `page_size` items at offsets
    /// `0, page_size, 2 * page_size, ...` and concatenates them in request
    /// order. A failure on any page aborts the whole fetch; no partial result
    /// is returned.
    pub async fn get_saved_tracks(
        &self,
        access_token: &str,
        pages: u32,
        page_size: u32,
    ) -> Result<Vec<TrackRef>, HttpError> {
        let mut tracks = Vec::with_capacity((pages * page_size) as usize);

        for page in 0..pages {
            let offset = page * page_size;
            let res = self
                .get_json::<SavedTracksResponse>(
                    "/me/tracks",
                    &[
                        ("limit", page_size.to_string()),
                        ("offset", offset.to_string()),
                    ],
                    access_token,
                )
                .await
                .inspect_err(|e| {
                    warning!("Failed to get saved tracks info at offset {}: {}", offset, e)
                })?;

            tracks.extend(res.items.into_iter().map(|item| item.track));
        }

        Ok(tracks)
    }

    /// Top tracks followed by saved tracks, the order in which they are enriched.
    pub async fn get_candidate_tracks(
        &self,
        access_token: &str,
        pipeline: &PipelineConfig,
    ) -> Result<Vec<TrackRef>, HttpError> {
        let mut tracks = self
            .get_top_tracks(access_token, pipeline.top_tracks_limit)
            .await?;
        let saved = self
            .get_saved_tracks(
                access_token,
                pipeline.saved_tracks_pages,
                pipeline.saved_tracks_page_size,
            )
            .await?;
        tracks.extend(saved);
        Ok(tracks)
    }
}
