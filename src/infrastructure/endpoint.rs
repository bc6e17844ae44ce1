use crate::types::{DEFAULT_ENDPOINT, RealtimeError, Result};
use url::Url;

/// Derives the socket URL from the configured API base address.
///
/// `https` maps to `wss`, `http` to `ws`; socket schemes pass through; a bare
/// host gets `ws://` prefixed. An absent or blank base address falls back to
/// [`DEFAULT_ENDPOINT`].
pub fn socket_endpoint(base_url: Option<&str>) -> Result<Url> {
    let base = match base_url.map(str::trim) {
        Some(base) if !base.is_empty() => base,
        _ => return Ok(Url::parse(DEFAULT_ENDPOINT)?),
    };

    let address = match base.split_once("://") {
        Some((scheme, rest)) => {
            let socket_scheme = match scheme.to_ascii_lowercase().as_str() {
                "https" | "wss" => "wss",
                "http" | "ws" => "ws",
                other => {
                    return Err(RealtimeError::InvalidEndpoint(format!(
                        "unsupported scheme '{}' in '{}'",
                        other, base
                    )));
                }
            };
            format!("{}://{}", socket_scheme, rest)
        }
        None => format!("ws://{}", base),
    };

    let url = Url::parse(&address)?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(RealtimeError::InvalidEndpoint(format!(
            "no host in '{}'",
            base
        )));
    }
    Ok(url)
}
