use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

pub const STATE_LENGTH: usize = 16;

/// Random value for the OAuth `state` parameter.
pub fn generate_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// Stable per-row id the warehouse uses to drop duplicate inserts of a retried request.
pub fn row_insert_id(user_id: &str, index: usize, track_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(index.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(track_name.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
