use serde::{Deserialize, Serialize};

/// The request unit: one status considered for one viewer's feed.
///
/// Equality is structural and candidates are used as map keys, so every
/// field participates in `Eq` and `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// Local id of the status
    pub status_id: String,
    /// Id of the status on its origin server
    pub status_external_id: String,
    /// Origin host of the status
    pub status_domain: String,
    /// Local id of the viewing account
    pub account_id: String,
    /// URL of the viewing account
    pub account_url: String,
    /// Username of the status author
    pub author_username: String,
    /// Home domain of the status author
    pub author_domain: String,
}

impl Candidate {
    /// The `username@domain` key identifying the author across sources
    /// and in the down-ranker.
    pub fn author_key(&self) -> String {
        format!("{}@{}", self.author_username, self.author_domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_key() {
        let candidate = Candidate {
            status_id: "1".into(),
            status_external_id: "9".into(),
            status_domain: "s.net".into(),
            account_id: "100".into(),
            account_url: "https://local/users/viewer".into(),
            author_username: "alice".into(),
            author_domain: "a.net".into(),
        };
        assert_eq!(candidate.author_key(), "alice@a.net");
    }

    #[test]
    fn test_wire_field_names() {
        let json = r#"{
            "status_id": "1",
            "status_external_id": "9",
            "status_domain": "s.net",
            "account_id": "100",
            "account_url": "https://local/users/viewer",
            "author_username": "alice",
            "author_domain": "a.net"
        }"#;
        let candidate: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.status_domain, "s.net");
        assert_eq!(candidate.account_id, "100");
    }
}
