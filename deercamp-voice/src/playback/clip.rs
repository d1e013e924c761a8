//! Clip references supplied by the host's data layer

use serde::{Deserialize, Serialize};

/// A playable voice note
///
/// `id` only needs to be unique within the listing the manager serves
/// (an entry id, or a list index).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipRef {
    pub id: String,
    /// Remote URL or local file path
    pub source_uri: String,
    /// Advisory duration shown before the real one is known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_hint_ms: Option<u64>,
}

impl ClipRef {
    pub fn new(id: impl Into<String>, source_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_uri: source_uri.into(),
            duration_hint_ms: None,
        }
    }

    pub fn with_duration_hint(mut self, duration_ms: u64) -> Self {
        self.duration_hint_ms = Some(duration_ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_is_optional_in_json() {
        let clip: ClipRef =
            serde_json::from_str(r#"{"id":"e2","source_uri":"https://x/y.m4a"}"#).unwrap();
        assert_eq!(clip, ClipRef::new("e2", "https://x/y.m4a"));

        let json = serde_json::to_string(&ClipRef::new("e1", "file://a.m4a").with_duration_hint(4200))
            .unwrap();
        assert!(json.contains("\"duration_hint_ms\":4200"));
    }
}
