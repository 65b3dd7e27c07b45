mod common;

use std::time::{Duration, Instant};

use common::*;
use tastecluster::{
    error::HttpError,
    pipeline::{FixedInterval, NoDelay, RateLimiter},
    spotify::NO_ERROR_MESSAGE,
    types::{TrackRef, audio_features_schema},
};

fn track(id: &str) -> TrackRef {
    TrackRef {
        id: id.to_string(),
        name: format!("Track {id}"),
    }
}

#[tokio::test]
async fn test_get_profile_sends_bearer_token() {
    let provider = MockProvider::spawn(MockData::default()).await;
    let client = provider.spotify_client();

    let profile = client.get_profile(FIRST_ACCESS_TOKEN).await.unwrap();

    assert_eq!(profile.id, USER_ID);
    assert_eq!(profile.display_name.as_deref(), Some("Test Listener"));
    assert_eq!(
        provider.hits.authorization.lock().unwrap()[0],
        format!("Bearer {FIRST_ACCESS_TOKEN}")
    );
}

#[tokio::test]
async fn test_get_profile_surfaces_upstream_status_and_message() {
    let data = MockData {
        profile_failure: Some((401, Some("The access token expired".to_string()))),
        ..MockData::default()
    };
    let provider = MockProvider::spawn(data).await;

    let err = provider
        .spotify_client()
        .get_profile("expired")
        .await
        .unwrap_err();

    match err {
        HttpError::Status { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "The access token expired");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_error_without_message_uses_fallback() {
    let data = MockData {
        profile_failure: Some((503, None)),
        ..MockData::default()
    };
    let provider = MockProvider::spawn(data).await;

    let err = provider
        .spotify_client()
        .get_profile(FIRST_ACCESS_TOKEN)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        HttpError::Status { status: 503, ref message } if message == NO_ERROR_MESSAGE
    ));
    assert_eq!(err.status().as_u16(), 503);
}

#[tokio::test]
async fn test_top_tracks_single_page_with_limit() {
    let provider = MockProvider::spawn(MockData::with_tracks(&["t1", "t2", "t3"], &[])).await;

    let tracks = provider
        .spotify_client()
        .get_top_tracks(FIRST_ACCESS_TOKEN, 50)
        .await
        .unwrap();

    assert_eq!(tracks, vec![track("t1"), track("t2"), track("t3")]);
    assert_eq!(Hits::count(&provider.hits.top), 1);
    assert_eq!(provider.hits.top_queries.lock().unwrap()[0]["limit"], "50");
}

#[tokio::test]
async fn test_saved_tracks_walks_fixed_offsets() {
    let saved = (0..120).map(|i| format!("s{i}")).collect::<Vec<_>>();
    let saved_refs = saved.iter().map(String::as_str).collect::<Vec<_>>();
    let provider = MockProvider::spawn(MockData::with_tracks(&[], &saved_refs)).await;

    let tracks = provider
        .spotify_client()
        .get_saved_tracks(FIRST_ACCESS_TOKEN, 5, 50)
        .await
        .unwrap();

    // All five pages are requested even though the last two are empty.
    assert_eq!(
        *provider.hits.saved_offsets.lock().unwrap(),
        vec![0, 50, 100, 150, 200]
    );
    assert_eq!(tracks.len(), 120);
    assert_eq!(tracks[0], track("s0"));
    assert_eq!(tracks[119], track("s119"));
}

#[tokio::test]
async fn test_saved_tracks_abort_on_failing_page() {
    let saved = (0..250).map(|i| format!("s{i}")).collect::<Vec<_>>();
    let saved_refs = saved.iter().map(String::as_str).collect::<Vec<_>>();
    let mut data = MockData::with_tracks(&[], &saved_refs);
    data.saved_failure = Some((100, 500, "Server error".to_string()));
    let provider = MockProvider::spawn(data).await;

    let err = provider
        .spotify_client()
        .get_saved_tracks(FIRST_ACCESS_TOKEN, 5, 50)
        .await
        .unwrap_err();

    match err {
        HttpError::Status { status, ref message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Server error");
        }
        ref other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status().as_u16(), 500);
    // Later offsets are never requested.
    assert_eq!(
        *provider.hits.saved_offsets.lock().unwrap(),
        vec![0, 50, 100]
    );
}

#[tokio::test]
async fn test_top_tracks_failure_skips_saved_tracks() {
    let mut data = MockData::with_tracks(&["t1"], &["s1"]);
    data.top_failure = Some((429, "API rate limit exceeded".to_string()));
    let provider = MockProvider::spawn(data).await;

    let err = provider
        .spotify_client()
        .get_candidate_tracks(FIRST_ACCESS_TOKEN, &test_pipeline_config())
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Status { status: 429, .. }));
    assert_eq!(Hits::count(&provider.hits.top), 1);
    assert_eq!(Hits::count(&provider.hits.saved), 0);
}

#[tokio::test]
async fn test_candidate_tracks_are_top_then_saved() {
    let provider = MockProvider::spawn(MockData::with_tracks(&["t1", "t2"], &["s1"])).await;

    let tracks = provider
        .spotify_client()
        .get_candidate_tracks(FIRST_ACCESS_TOKEN, &test_pipeline_config())
        .await
        .unwrap();

    assert_eq!(tracks, vec![track("t1"), track("t2"), track("s1")]);
}

#[tokio::test]
async fn test_enrich_all_preserves_order_and_tags_rows() {
    let provider = MockProvider::spawn(MockData::with_tracks(&["a", "b", "c"], &[])).await;
    let tracks = vec![track("c"), track("a"), track("b")];

    let batch = provider
        .spotify_client()
        .enrich_all(&tracks, FIRST_ACCESS_TOKEN, USER_ID, &mut NoDelay)
        .await
        .unwrap();

    assert_eq!(batch.len(), 3);
    let names = batch.iter().map(|r| r.track_name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Track c", "Track a", "Track b"]);
    assert!(batch.iter().all(|r| r.user_id == USER_ID));
    // "c" is the third track of the fixture, so its base multiplier is 3.
    assert_eq!(batch[0].tempo, 130.0);
    assert_eq!(batch[0].duration_ms, 183_000.0);
}

#[tokio::test]
async fn test_enriched_record_has_only_schema_fields() {
    let provider = MockProvider::spawn(MockData::with_tracks(&["a"], &[])).await;

    let record = provider
        .spotify_client()
        .enrich(&track("a"), FIRST_ACCESS_TOKEN, USER_ID)
        .await
        .unwrap();

    let json = serde_json::to_value(&record).unwrap();
    let mut keys = json.as_object().unwrap().keys().cloned().collect::<Vec<_>>();
    let mut expected = audio_features_schema()
        .into_iter()
        .map(|field| field.name)
        .collect::<Vec<_>>();
    keys.sort();
    expected.sort();
    assert_eq!(keys, expected);
    for dropped in ["id", "uri", "track_href", "analysis_url", "type", "key", "mode", "time_signature"] {
        assert!(json.get(dropped).is_none(), "{dropped} should be dropped");
    }
}

#[tokio::test]
async fn test_enrich_all_aborts_on_first_failure() {
    let ids = ["f1", "f2", "f3", "f4", "f5"];
    let mut data = MockData::with_tracks(&ids, &[]);
    data.feature_failure = Some(("f3".to_string(), 429, "API rate limit exceeded".to_string()));
    let provider = MockProvider::spawn(data).await;

    let tracks = ids.iter().map(|id| track(id)).collect::<Vec<_>>();
    let err = provider
        .spotify_client()
        .enrich_all(&tracks, FIRST_ACCESS_TOKEN, USER_ID, &mut NoDelay)
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Status { status: 429, .. }));
    // Tracks after the failing one are never requested.
    assert_eq!(
        *provider.hits.feature_ids.lock().unwrap(),
        vec!["f1", "f2", "f3"]
    );
}

#[tokio::test]
async fn test_fixed_interval_skips_first_wait() {
    let mut limiter = FixedInterval::new(Duration::from_millis(40));

    let start = Instant::now();
    limiter.wait().await;
    assert!(start.elapsed() < Duration::from_millis(40));

    limiter.wait().await;
    limiter.wait().await;
    assert!(start.elapsed() >= Duration::from_millis(80));
}
