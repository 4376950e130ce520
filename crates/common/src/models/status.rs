use super::Account;
use serde::{Deserialize, Serialize};

/// A hashtag attached to a status. Federation payloads carry more fields
/// (`url`, `history`); only the name participates in features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub name: String,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// The subset of a status the feature extractors read.
///
/// Decoded from local SQL joins or from a remote `/api/v1/statuses/{id}`
/// payload. `embedding` is either empty (not yet computed, or the fetch
/// failed) or exactly `EMBEDDING_DIM` long; the embedding cache maintains
/// that invariant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub favourites_count: i64,
    #[serde(default)]
    pub reblogs_count: i64,
    #[serde(default)]
    pub replies_count: i64,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub account: Account,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl Status {
    /// The `username@domain` key of the status author, matching the
    /// candidate's author key format. Authors local to the store have no
    /// domain and key as `username@`.
    pub fn author_key(&self) -> String {
        format!(
            "{}@{}",
            self.account.username,
            self.account.domain.as_deref().unwrap_or_default()
        )
    }

    /// Whether this status carries a computed embedding
    pub fn has_embedding(&self) -> bool {
        !self.embedding.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_federation_payload_decodes() {
        let json = r#"{
            "id": "9",
            "content": "<p>hello fediverse</p>",
            "favourites_count": 3,
            "reblogs_count": 1,
            "replies_count": 0,
            "tags": [{"name": "rust", "url": "https://s.net/tags/rust"}],
            "account": {"id": "7", "username": "alice", "followers_count": 42}
        }"#;
        let status: Status = serde_json::from_str(json).unwrap();
        assert_eq!(status.favourites_count, 3);
        assert_eq!(status.tags, vec![Tag::new("rust")]);
        assert_eq!(status.account.username, "alice");
        assert!(!status.has_embedding());
    }

    #[test]
    fn test_author_key_local_and_remote() {
        let mut status = Status {
            account: Account {
                username: "bob".into(),
                domain: Some("b.net".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(status.author_key(), "bob@b.net");

        status.account.domain = None;
        assert_eq!(status.author_key(), "bob@");
    }
}
