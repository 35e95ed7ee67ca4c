use crate::error::TierError;
use base64::Engine;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CERTIFICATE_FILE: &str = "cert";

/// Make sure the CA certificate exists next to the credentials.
///
/// An existing file is reused as-is and never rewritten, even when the blob
/// in the credentials has changed since it was written.
pub fn ensure_certificate(
    dir: &Path,
    certificate_base64: Option<&str>,
) -> Result<Option<PathBuf>, TierError> {
    let path = std::path::absolute(dir.join(CERTIFICATE_FILE))?;

    if path.exists() {
        info!(path = %path.display(), "using the existing postgresql certificate file");
        return Ok(Some(path));
    }

    let Some(encoded) = certificate_base64 else {
        warn!(path = %path.display(), "no certificate in credentials; connecting without a root certificate");
        return Ok(None);
    };

    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
    std::fs::write(&path, bytes)?;
    info!(path = %path.display(), "created the postgresql certificate file");
    Ok(Some(path))
}
