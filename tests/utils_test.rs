use tastecluster::utils::*;

#[test]
fn test_generate_state() {
    let state = generate_state();

    assert_eq!(state.len(), STATE_LENGTH);
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated states should be different
    let state2 = generate_state();
    assert_ne!(state, state2);
}

#[test]
fn test_row_insert_id_is_stable_hex() {
    let id = row_insert_id("user-1", 0, "Song");

    assert_eq!(id.len(), 64);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(id, row_insert_id("user-1", 0, "Song"));
}

#[test]
fn test_row_insert_id_distinguishes_rows() {
    let base = row_insert_id("user-1", 0, "Song");

    assert_ne!(base, row_insert_id("user-1", 1, "Song"));
    assert_ne!(base, row_insert_id("user-2", 0, "Song"));
    assert_ne!(base, row_insert_id("user-1", 0, "Other Song"));
    // Field boundaries are kept apart.
    assert_ne!(
        row_insert_id("ab", 0, "c"),
        row_insert_id("a", 0, "bc")
    );
}

#[test]
fn test_escape_html() {
    assert_eq!(escape_html("plain text"), "plain text");
    assert_eq!(
        escape_html("<b>\"Tom & Jerry's\"</b>"),
        "&lt;b&gt;&quot;Tom &amp; Jerry&#39;s&quot;&lt;/b&gt;"
    );
}
