use serde::{Deserialize, Serialize};

/// Access/refresh token pair held by the active session.
///
/// The access token is replaced in place on refresh; the refresh token stays
/// the same for the whole session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Stores a refreshed access token, leaving the refresh token untouched.
    pub fn apply_refresh(&mut self, access_token: String) {
        self.access_token = access_token;
    }
}

/// Raw answer of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
}

/// Error body of the token endpoint (`{"error": "...", "error_description": "..."}`).
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

/// Error body of the Web API (`{"error": {"status": 401, "message": "..."}}`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    pub status: Option<u16>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

/// Track identity taken from a listening-history response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopTracksResponse {
    pub items: Vec<TrackRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedTracksResponse {
    pub items: Vec<SavedTrackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedTrackItem {
    pub track: TrackRef,
}

/// The numeric part of an audio-features response.
///
/// Unknown fields (`id`, `uri`, `track_href`, `analysis_url`, `type`, `key`,
/// `mode`, `time_signature`) are dropped during deserialization. Every field
/// below must be present and non-null.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioFeatures {
    pub acousticness: f64,
    pub danceability: f64,
    pub duration_ms: f64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub tempo: f64,
    pub valence: f64,
}

/// One warehouse row: a track's feature vector tagged with user and track.
///
/// Field order is the warehouse schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatureRecord {
    pub user_id: String,
    pub track_name: String,
    pub acousticness: f64,
    pub danceability: f64,
    pub duration_ms: f64,
    pub energy: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub loudness: f64,
    pub speechiness: f64,
    pub tempo: f64,
    pub valence: f64,
}

impl AudioFeatureRecord {
    pub fn new(user_id: &str, track_name: &str, features: AudioFeatures) -> Self {
        Self {
            user_id: user_id.to_string(),
            track_name: track_name.to_string(),
            acousticness: features.acousticness,
            danceability: features.danceability,
            duration_ms: features.duration_ms,
            energy: features.energy,
            instrumentalness: features.instrumentalness,
            liveness: features.liveness,
            loudness: features.loudness,
            speechiness: features.speechiness,
            tempo: features.tempo,
            valence: features.valence,
        }
    }

    pub fn get(&self, column: FeatureColumn) -> f64 {
        match column {
            FeatureColumn::Acousticness => self.acousticness,
            FeatureColumn::Danceability => self.danceability,
            FeatureColumn::DurationMs => self.duration_ms,
            FeatureColumn::Energy => self.energy,
            FeatureColumn::Instrumentalness => self.instrumentalness,
            FeatureColumn::Liveness => self.liveness,
            FeatureColumn::Loudness => self.loudness,
            FeatureColumn::Speechiness => self.speechiness,
            FeatureColumn::Tempo => self.tempo,
            FeatureColumn::Valence => self.valence,
        }
    }

    pub fn set(&mut self, column: FeatureColumn, value: f64) {
        let slot = match column {
            FeatureColumn::Acousticness => &mut self.acousticness,
            FeatureColumn::Danceability => &mut self.danceability,
            FeatureColumn::DurationMs => &mut self.duration_ms,
            FeatureColumn::Energy => &mut self.energy,
            FeatureColumn::Instrumentalness => &mut self.instrumentalness,
            FeatureColumn::Liveness => &mut self.liveness,
            FeatureColumn::Loudness => &mut self.loudness,
            FeatureColumn::Speechiness => &mut self.speechiness,
            FeatureColumn::Tempo => &mut self.tempo,
            FeatureColumn::Valence => &mut self.valence,
        };
        *slot = value;
    }
}

/// Rows of one user's ingestion run, top tracks first, then saved tracks.
pub type Batch = Vec<AudioFeatureRecord>;

/// The ten numeric feature columns, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureColumn {
    Acousticness,
    Danceability,
    DurationMs,
    Energy,
    Instrumentalness,
    Liveness,
    Loudness,
    Speechiness,
    Tempo,
    Valence,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 10] = [
        FeatureColumn::Acousticness,
        FeatureColumn::Danceability,
        FeatureColumn::DurationMs,
        FeatureColumn::Energy,
        FeatureColumn::Instrumentalness,
        FeatureColumn::Liveness,
        FeatureColumn::Loudness,
        FeatureColumn::Speechiness,
        FeatureColumn::Tempo,
        FeatureColumn::Valence,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureColumn::Acousticness => "acousticness",
            FeatureColumn::Danceability => "danceability",
            FeatureColumn::DurationMs => "duration_ms",
            FeatureColumn::Energy => "energy",
            FeatureColumn::Instrumentalness => "instrumentalness",
            FeatureColumn::Liveness => "liveness",
            FeatureColumn::Loudness => "loudness",
            FeatureColumn::Speechiness => "speechiness",
            FeatureColumn::Tempo => "tempo",
            FeatureColumn::Valence => "valence",
        }
    }
}

impl std::fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    String,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    Required,
    Nullable,
}

/// One column of a warehouse table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub mode: FieldMode,
}

impl SchemaField {
    pub fn required(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            mode: FieldMode::Required,
        }
    }
}

/// The fixed 12-column layout of the audio features table, all REQUIRED.
pub fn audio_features_schema() -> Vec<SchemaField> {
    let mut schema = vec![
        SchemaField::required("user_id", FieldType::String),
        SchemaField::required("track_name", FieldType::String),
    ];
    schema.extend(
        FeatureColumn::ALL
            .iter()
            .map(|column| SchemaField::required(column.name(), FieldType::Float)),
    );
    schema
}
