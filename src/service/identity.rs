use crate::config::IdentityConfig;
use serde::Serialize;
use tokio::net::UdpSocket;
use tracing::{info, warn};

const UNKNOWN: &str = "unknown";

/// Who is answering: host name, public address, private address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub uname: String,
    pub floating_ip: String,
    pub private_ip: String,
}

impl Identity {
    /// Look everything up once. Lookups that fail report `unknown`.
    pub async fn discover(http: &reqwest::Client, cfg: &IdentityConfig) -> Self {
        let identity = Self {
            uname: host_name().await,
            floating_ip: external_ip(http, cfg).await,
            private_ip: private_ip(&cfg.probe_addr).await,
        };
        info!(
            uname = %identity.uname,
            floating_ip = %identity.floating_ip,
            private_ip = %identity.private_ip,
            "identity resolved"
        );
        identity
    }

    pub fn unknown() -> Self {
        Self {
            uname: UNKNOWN.to_string(),
            floating_ip: UNKNOWN.to_string(),
            private_ip: UNKNOWN.to_string(),
        }
    }
}

async fn host_name() -> String {
    match tokio::fs::read_to_string("/proc/sys/kernel/hostname").await {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => std::env::var("HOSTNAME").unwrap_or_else(|_| {
            warn!("host name not available");
            UNKNOWN.to_string()
        }),
    }
}

async fn external_ip(http: &reqwest::Client, cfg: &IdentityConfig) -> String {
    let lookup = async {
        http.get(cfg.external_ip_url.clone())
            .timeout(cfg.timeout())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    };
    match lookup.await {
        Ok(ip) => ip.trim().to_string(),
        Err(e) => {
            warn!(error = %e, "external ip lookup failed");
            UNKNOWN.to_string()
        }
    }
}

/// Address of the interface that routes to `probe_addr`; no packet is sent.
async fn private_ip(probe_addr: &str) -> String {
    let probe = async {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(probe_addr).await?;
        socket.local_addr()
    };
    match probe.await {
        Ok(addr) => addr.ip().to_string(),
        Err(e) => {
            warn!(error = %e, "private ip lookup failed");
            UNKNOWN.to_string()
        }
    }
}
