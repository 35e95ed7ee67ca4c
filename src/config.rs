use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::TierError;

/// Environment variables read under their bare names, as provisioned by the deployment.
const RAW_ENV_KEYS: [&str; 3] = ["port", "front_back", "remote_url"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub identity: IdentityConfig,
    pub postgresql: PostgresConfig,
    pub cos: CosConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub port: u16,
    pub loglevel: String,
    /// `front` or `back`; anything else runs both roles.
    pub front_back: Option<String>,
    /// Peer tier to forward to; an empty value means none.
    #[serde(deserialize_with = "de_optional_url")]
    pub remote_url: Option<Url>,
    /// Directory holding the credential files and the certificate.
    pub app_dir: PathBuf,
    pub cpu_load_max: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub external_ip_url: Url,
    pub probe_addr: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub enabled: bool,
    pub database: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CosConfig {
    pub enabled: bool,
    pub endpoint: Url,
    pub iam_url: Url,
    pub api_key: Option<String>,
    pub instance_crn: Option<String>,
    pub bucket: Option<String>,
    pub object_key: String,
    pub wait_interval_ms: u64,
    pub wait_attempts: usize,
    pub timeout_ms: u64,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 8000,
            loglevel: "info".to_string(),
            front_back: None,
            remote_url: None,
            app_dir: PathBuf::from("."),
            cpu_load_max: 8,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            external_ip_url: Url::parse("https://ident.me").expect("static url"),
            probe_addr: "8.8.8.8:80".to_string(),
            timeout_ms: 1000,
        }
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database: "ibmclouddb".to_string(),
            max_connections: 1,
        }
    }
}

impl Default for CosConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: Url::parse("https://s3.us-south.cloud-object-storage.appdomain.cloud")
                .expect("static url"),
            iam_url: Url::parse("https://iam.cloud.ibm.com/identity/token").expect("static url"),
            api_key: None,
            instance_crn: None,
            bucket: None,
            object_key: "data".to_string(),
            wait_interval_ms: 5000,
            wait_attempts: 20,
            timeout_ms: 10_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            basic: BasicConfig::default(),
            identity: IdentityConfig::default(),
            postgresql: PostgresConfig::default(),
            cos: CosConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `PORT`/`FRONT_BACK`/`REMOTE_URL`,
    /// then `VPC3TIER_SECTION__KEY` overrides.
    pub fn load() -> Result<Self, TierError> {
        Self::figment().extract().map_err(TierError::from)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file("config.toml"))
            .merge(
                Env::raw()
                    .only(&RAW_ENV_KEYS)
                    .map(|key| format!("basic.{}", key.as_str().to_ascii_lowercase()).into()),
            )
            .merge(Env::prefixed("VPC3TIER_").split("__"))
    }

    pub fn is_front(&self) -> bool {
        self.basic.front_back.as_deref() == Some("front")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.basic.listen_addr, self.basic.port)
    }
}

fn de_optional_url<'de, D>(deserializer: D) -> Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => Url::parse(raw.trim())
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CosConfig {
    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_overrides_nest_by_section() {
        let cfg: Config = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                [basic]
                port = 9000
                front_back = "front"

                [cos]
                bucket = "vpc3tier-000-data"
                "#,
            ))
            .extract()
            .unwrap();
        assert_eq!(cfg.basic.port, 9000);
        assert!(cfg.is_front());
        assert_eq!(cfg.cos.bucket.as_deref(), Some("vpc3tier-000-data"));
        assert_eq!(cfg.cos.object_key, "data");
        assert_eq!(cfg.postgresql.database, "ibmclouddb");
    }

    #[test]
    fn empty_remote_url_means_no_peer() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("REMOTE_URL", "");
            let cfg: Config = Config::figment().extract()?;
            assert!(cfg.basic.remote_url.is_none());

            jail.set_env("REMOTE_URL", "http://10.0.1.4:8000");
            let cfg: Config = Config::figment().extract()?;
            assert_eq!(
                cfg.basic.remote_url.as_ref().map(Url::as_str),
                Some("http://10.0.1.4:8000/")
            );
            Ok(())
        });
    }
}
