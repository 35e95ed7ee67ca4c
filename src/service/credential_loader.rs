//! PostgreSQL credential discovery.
//!
//! Two on-disk formats are accepted, searched in order inside the application
//! directory:
//! - `service_credentials.json`: the service-credentials document as exported
//!   from the cloud console (nested JSON).
//! - `terraform_service_credentials.json`: written by the provisioning step,
//!   a flat object keyed by dotted paths, or the bare placeholder token when
//!   provisioning did not substitute it.

use crate::error::TierError;
use crate::service::certificate;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SERVICE_CREDENTIALS_FILE: &str = "service_credentials.json";
pub const TEMPLATE_CREDENTIALS_FILE: &str = "terraform_service_credentials.json";
pub const TEMPLATE_PLACEHOLDER: &str = "__POSTGRESQL_CREDENTIALS__";

/// Which file the credentials were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Service,
    Template,
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct PostgresCredentials {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub certificate_base64: Option<String>,
}

impl fmt::Debug for PostgresCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<hidden>"))
            .field(
                "certificate_base64",
                &self.certificate_base64.as_ref().map(|_| "<present>"),
            )
            .finish()
    }
}

/// Credentials plus the on-disk certificate they reference.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub source: CredentialSource,
    pub credentials: PostgresCredentials,
    pub certificate_path: Option<PathBuf>,
}

/// Locate and parse the PostgreSQL credentials in `dir`.
///
/// `Ok(None)` means no credentials are provisioned: neither file exists, or
/// the template file still holds the placeholder token.
pub fn resolve(dir: &Path) -> Result<Option<ResolvedCredentials>, TierError> {
    let service_path = dir.join(SERVICE_CREDENTIALS_FILE);
    let template_path = dir.join(TEMPLATE_CREDENTIALS_FILE);

    info!(path = %service_path.display(), "looking for postgresql service credentials");
    let (source, credentials) = if service_path.exists() {
        info!("using the service credentials file exported from the console");
        let contents = std::fs::read_to_string(&service_path)?;
        let document: Value = serde_json::from_str(&contents)?;
        (CredentialSource::Service, SERVICE_PATHS.extract(&document))
    } else {
        info!(path = %template_path.display(), "looking for provisioned postgresql credentials");
        if !template_path.exists() {
            info!("no postgresql credentials file found");
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&template_path)?;
        if contents.trim() == TEMPLATE_PLACEHOLDER {
            info!(path = %template_path.display(), "postgresql credentials not provisioned");
            return Ok(None);
        }
        let document: Value = serde_json::from_str(&contents)?;
        (CredentialSource::Template, TEMPLATE_PATHS.extract(&document))
    };

    log_fields(source, &credentials);

    let certificate_path =
        certificate::ensure_certificate(dir, credentials.certificate_base64.as_deref())?;

    Ok(Some(ResolvedCredentials {
        source,
        credentials,
        certificate_path,
    }))
}

fn log_fields(source: CredentialSource, creds: &PostgresCredentials) {
    let file = match source {
        CredentialSource::Service => SERVICE_CREDENTIALS_FILE,
        CredentialSource::Template => TEMPLATE_CREDENTIALS_FILE,
    };
    let fields: [(&str, Option<String>); 5] = [
        ("host", creds.host.clone()),
        ("port", creds.port.map(|p| p.to_string())),
        ("username", creds.username.clone()),
        ("password", creds.password.as_ref().map(|_| "hidden".to_string())),
        (
            "certificate_base64",
            creds.certificate_base64.as_ref().map(|_| "present".to_string()),
        ),
    ];
    for (name, value) in fields {
        match value {
            Some(value) => info!(file, field = name, %value, "credential field found"),
            None => warn!(file, field = name, "credential field missing"),
        }
    }
}

// --- field lookup --------------------------------------------------------

/// JSON pointers for each field in the console export (nested objects).
const SERVICE_PATHS: FieldPaths = FieldPaths {
    host: "/connection/postgres/hosts/0/hostname",
    port: "/connection/postgres/hosts/0/port",
    username: "/connection/postgres/authentication/username",
    password: "/connection/cli/environment/PGPASSWORD",
    certificate_base64: "/connection/postgres/certificate/certificate_base64",
};

/// The provisioned file flattens the same paths into dotted top-level keys.
const TEMPLATE_PATHS: FieldPaths = FieldPaths {
    host: "/connection.postgres.hosts.0.hostname",
    port: "/connection.postgres.hosts.0.port",
    username: "/connection.postgres.authentication.username",
    password: "/connection.cli.environment.PGPASSWORD",
    certificate_base64: "/connection.postgres.certificate.certificate_base64",
};

struct FieldPaths {
    host: &'static str,
    port: &'static str,
    username: &'static str,
    password: &'static str,
    certificate_base64: &'static str,
}

impl FieldPaths {
    /// Each field is looked up on its own; a missing or odd-shaped value only
    /// drops that field.
    fn extract(&self, document: &Value) -> PostgresCredentials {
        if !document.is_object() {
            warn!("credentials document is not a json object; no fields available");
        }
        PostgresCredentials {
            host: string_field(document, self.host),
            port: port_field(document, self.port),
            username: string_field(document, self.username),
            password: string_field(document, self.password),
            certificate_base64: string_field(document, self.certificate_base64),
        }
    }
}

fn string_field(document: &Value, pointer: &str) -> Option<String> {
    match document.pointer(pointer)? {
        Value::String(s) => Some(s.clone()),
        other => {
            warn!(path = pointer, found = value_kind(other), "expected a string; ignoring field");
            None
        }
    }
}

/// Ports show up as numbers in console exports and as strings in provisioned files.
fn port_field(document: &Value, pointer: &str) -> Option<u16> {
    let port = match document.pointer(pointer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    };
    if port.is_none() {
        warn!(path = pointer, "port is not a valid port number; ignoring field");
    }
    port
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
