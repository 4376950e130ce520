//! HTTP client for federation fetches
//!
//! Reads author accounts, author timelines, and candidate statuses from
//! the Mastodon-compatible API of the instance named by the candidate.
//! The candidate status is always read from its origin server so counts
//! are live rather than the local replica's.

use fedirank_common::errors::Result;
use fedirank_common::models::{Account, Status};
use std::time::Duration;

/// Client for the `/api/v1` surface of remote instances
#[derive(Clone)]
pub struct FederationClient {
    client: reqwest::Client,
}

impl FederationClient {
    /// Create a client with the given per-request deadline
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// `GET https://{domain}/api/v1/accounts/lookup?acct={username}`
    pub async fn lookup_account(&self, domain: &str, username: &str) -> Result<Account> {
        let url = format!("https://{}/api/v1/accounts/lookup", domain);
        let account = self
            .client
            .get(&url)
            .query(&[("acct", username)])
            .send()
            .await?
            .error_for_status()?
            .json::<Account>()
            .await?;
        Ok(account)
    }

    /// `GET https://{domain}/api/v1/accounts/{id}/statuses?exclude_replies=true`
    pub async fn account_statuses(&self, domain: &str, account_id: &str) -> Result<Vec<Status>> {
        let url = format!("https://{}/api/v1/accounts/{}/statuses", domain, account_id);
        let statuses = self
            .client
            .get(&url)
            .query(&[("exclude_replies", "true")])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Status>>()
            .await?;
        Ok(statuses)
    }

    /// `GET https://{domain}/api/v1/statuses/{id}`
    pub async fn status(&self, domain: &str, status_id: &str) -> Result<Status> {
        let url = format!("https://{}/api/v1/statuses/{}", domain, status_id);
        let status = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<Status>()
            .await?;
        Ok(status)
    }
}
