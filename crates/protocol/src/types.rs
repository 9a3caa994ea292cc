//! Transfer metadata and filename hygiene.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fallback name for files that arrive with an unusable one.
pub const FALLBACK_FILENAME: &str = "received.bin";

/// The JSON body of a `META:` frame.
///
/// `id` keys the receiver's accumulation state; senders that omit it get a
/// fresh one assigned on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferMeta {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub size: u64,
}

/// Strips path separators and control characters from a declared filename.
///
/// Empty names and the placeholder `-` fall back to [`FALLBACK_FILENAME`].
pub fn sanitize_filename(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return FALLBACK_FILENAME.to_string();
    }
    trimmed
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if (c as u32) < 0x20 => '_',
            c => c,
        })
        .collect()
}
