use serde::{Deserialize, Serialize};

/// The subset of an account the feature extractors read.
///
/// Decoded either from a local SQL row (the viewer) or from a remote
/// `/api/v1/accounts/lookup` payload (the author). Every field defaults so
/// a partial federation payload still decodes; `Default` doubles as the
/// zero payload a failed fetch degrades to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    /// Id on the server that returned the account (remote id for authors)
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub username: String,
    /// None for accounts local to the store they were read from
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub discoverable: bool,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub statuses_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_payload_decodes() {
        // A lookup response carries more fields than we model and may
        // omit some we do; both directions must decode.
        let json = r#"{
            "id": "109277609058809814",
            "username": "alice",
            "acct": "alice",
            "followers_count": 42,
            "bot": false
        }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.followers_count, 42);
        assert_eq!(account.username, "alice");
        assert_eq!(account.statuses_count, 0);
    }

    #[test]
    fn test_zero_payload() {
        let account = Account::default();
        assert_eq!(account.followers_count, 0);
        assert!(account.username.is_empty());
    }
}
