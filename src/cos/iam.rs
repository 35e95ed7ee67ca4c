use crate::error::TierError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;
use url::Url;

const APIKEY_GRANT: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Exchanges an API key for bearer tokens and caches the current one.
pub struct IamTokenSource {
    http: reqwest::Client,
    token_url: Url,
    api_key: String,
    cached: Mutex<Option<CachedToken>>,
}

impl IamTokenSource {
    pub fn new(http: reqwest::Client, token_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            http,
            token_url,
            api_key: api_key.into(),
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, fetching a new one when missing or close to expiry.
    pub async fn token(&self) -> Result<String, TierError> {
        let mut cached = self.cached.lock().await;
        if let Some(current) = cached.as_ref()
            && Instant::now() < current.refresh_at
        {
            return Ok(current.token.clone());
        }

        let fresh = self.request_token().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_MARGIN);
        let token = fresh.access_token;
        *cached = Some(CachedToken {
            token: token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token)
    }

    async fn request_token(&self) -> Result<IamTokenResponse, TierError> {
        let resp = self
            .http
            .post(self.token_url.clone())
            .header("Accept", "application/json")
            .form(&[("grant_type", APIKEY_GRANT), ("apikey", self.api_key.as_str())])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TierError::IamToken(resp.status()));
        }
        let body: IamTokenResponse = resp.json().await?;
        info!(expires_in = body.expires_in, "IAM access token obtained");
        Ok(body)
    }
}
