//! Base URL resolution from the environment.
//!
//! A backend is located by three variables:
//!
//! ```text
//! SERVICE_<NAME>_<IFACE>_PROTO   (optional, defaults to http)
//! SERVICE_<NAME>_<IFACE>_HOST
//! SERVICE_<NAME>_<IFACE>_PORT
//! ```
//!
//! `<NAME>` and `<IFACE>` are upper-cased with `-` replaced by `_`, so
//! `discover("library-service", "default")` reads
//! `SERVICE_LIBRARY_SERVICE_DEFAULT_HOST`.

use thiserror::Error;
use url::Url;

/// Scheme used when no `_PROTO` variable is set.
pub const DEFAULT_PROTO: &str = "http";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    #[error("environment variable {0} is not set")]
    MissingVariable(String),

    #[error("environment variable {name} is not a valid port: {value:?}")]
    InvalidPort { name: String, value: String },

    #[error("discovered address {address} is not a valid url: {reason}")]
    InvalidUrl { address: String, reason: String },
}

/// Resolves a backend's base URL from the process environment.
pub fn discover(service: &str, iface: &str) -> Result<Url, DiscoveryError> {
    discover_with(service, iface, |key| std::env::var(key).ok())
}

/// Resolves a backend's base URL using `lookup` in place of the environment.
pub fn discover_with<F>(service: &str, iface: &str, lookup: F) -> Result<Url, DiscoveryError>
where
    F: Fn(&str) -> Option<String>,
{
    let proto = lookup(&variable(service, iface, "PROTO"))
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_PROTO.to_string());
    let host = required(&lookup, &variable(service, iface, "HOST"))?;
    let port_name = variable(service, iface, "PORT");
    let port = required(&lookup, &port_name)?;
    let port: u16 = port.parse().map_err(|_| DiscoveryError::InvalidPort {
        name: port_name,
        value: port.clone(),
    })?;

    let address = format!("{proto}://{host}:{port}");
    let url = Url::parse(&address).map_err(|e| DiscoveryError::InvalidUrl {
        address: address.clone(),
        reason: e.to_string(),
    })?;
    tracing::debug!(service, iface, url = %url, "discovered backend");
    Ok(url)
}

fn required<F>(lookup: &F, name: &str) -> Result<String, DiscoveryError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| DiscoveryError::MissingVariable(name.to_string()))
}

fn variable(service: &str, iface: &str, suffix: &str) -> String {
    format!("SERVICE_{}_{}_{}", normalize(service), normalize(iface), suffix)
}

fn normalize(part: &str) -> String {
    part.to_ascii_uppercase().replace('-', "_")
}
