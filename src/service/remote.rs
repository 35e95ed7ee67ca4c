use serde_json::{Value, json};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Forward a GET to the peer tier and embed whatever comes back.
///
/// Never fails: a non-JSON body becomes `{"notjson": ...}` and a transport
/// error becomes `{"error": ...}`.
pub async fn remote_get(http: &reqwest::Client, base: &Url, path: &str, timeout: Duration) -> Value {
    let url = format!("{}/{}", base.as_str().trim_end_matches('/'), path);
    let body = async {
        http.get(&url)
            .timeout(timeout)
            .send()
            .await?
            .text()
            .await
    };
    match body.await {
        Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(error = %e, body = %text, "remote response is not json");
            json!({ "notjson": text })
        }),
        Err(e) => {
            warn!(url = %url, error = %e, "remote request failed");
            json!({ "error": format!("error accessing {url}") })
        }
    }
}
