use crate::config::CosConfig;
use crate::cos::iam::IamTokenSource;
use crate::cos::store::ObjectStore;
use crate::error::TierError;
use crate::service::connection::Connector;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const INSTANCE_HEADER: &str = "ibm-service-instance-id";

/// Object access over the S3-compatible REST API with IAM bearer auth.
pub struct CosClient {
    http: reqwest::Client,
    endpoint: Url,
    bucket: String,
    instance_crn: Option<String>,
    tokens: IamTokenSource,
}

impl CosClient {
    pub fn new(
        http: reqwest::Client,
        endpoint: Url,
        bucket: impl Into<String>,
        instance_crn: Option<String>,
        tokens: IamTokenSource,
    ) -> Self {
        Self {
            http,
            endpoint,
            bucket: bucket.into(),
            instance_crn,
            tokens,
        }
    }

    fn object_url(&self, key: &str) -> Result<Url, TierError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TierError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(&self.bucket)
            .push(key);
        Ok(url)
    }

    async fn request(
        &self,
        method: reqwest::Method,
        key: &str,
    ) -> Result<reqwest::RequestBuilder, TierError> {
        let token = self.tokens.token().await?;
        let mut req = self
            .http
            .request(method, self.object_url(key)?)
            .bearer_auth(token);
        if let Some(crn) = self.instance_crn.as_deref() {
            req = req.header(INSTANCE_HEADER, crn);
        }
        Ok(req)
    }

    /// Fails unless the bucket is reachable with the current credentials.
    pub async fn check_bucket(&self) -> Result<(), TierError> {
        let token = self.tokens.token().await?;
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| TierError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(&self.bucket);
        let resp = self.http.head(url).bearer_auth(token).send().await?;
        if !resp.status().is_success() {
            return Err(TierError::ObjectStore {
                status: resp.status(),
                key: self.bucket.clone(),
            });
        }
        debug!(bucket = %self.bucket, "bucket reachable");
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for CosClient {
    async fn exists(&self, key: &str) -> Result<bool, TierError> {
        let resp = self.request(reqwest::Method::HEAD, key).await?.send().await?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(TierError::ObjectStore {
                status,
                key: key.to_string(),
            }),
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, TierError> {
        let resp = self.request(reqwest::Method::GET, key).await?.send().await?;
        if !resp.status().is_success() {
            return Err(TierError::ObjectStore {
                status: resp.status(),
                key: key.to_string(),
            });
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<(), TierError> {
        let resp = self
            .request(reqwest::Method::PUT, key)
            .await?
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(TierError::ObjectStore {
                status: resp.status(),
                key: key.to_string(),
            });
        }
        debug!(key, "object written");
        Ok(())
    }
}

/// Builds a [`CosClient`] and verifies the bucket on first use.
pub struct CosConnector {
    cfg: CosConfig,
    api_key: String,
    bucket: String,
}

impl CosConnector {
    /// `None` when the API key or bucket is not configured.
    pub fn from_config(cfg: &CosConfig) -> Option<Self> {
        let api_key = cfg.api_key.clone().filter(|k| !k.is_empty())?;
        let bucket = cfg.bucket.clone().filter(|b| !b.is_empty())?;
        Some(Self {
            cfg: cfg.clone(),
            api_key,
            bucket,
        })
    }
}

#[async_trait]
impl Connector for CosConnector {
    type Handle = Arc<dyn ObjectStore>;

    fn backend(&self) -> &'static str {
        "cos"
    }

    async fn connect(&self) -> Result<Self::Handle, TierError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vpc3tier/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(self.cfg.timeout())
            .build()?;
        let tokens = IamTokenSource::new(http.clone(), self.cfg.iam_url.clone(), &self.api_key);
        let client = CosClient::new(
            http,
            self.cfg.endpoint.clone(),
            &self.bucket,
            self.cfg.instance_crn.clone(),
            tokens,
        );
        client.check_bucket().await?;
        Ok(Arc::new(client))
    }
}
