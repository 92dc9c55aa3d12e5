//! Service specification validation
//!
//! Runs before any remote call. Structural rules are checked in a fixed
//! order, then every annotation is checked on its own, in key order, and the
//! first offending one is reported.

use crate::annotations::{self, Annotations};
use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::service::{ServiceSpec, SessionAffinity, TransportProtocol};
use brightbox_client::{BalancingPolicy, HealthcheckType, ListenerProtocol, ProxyProtocol};
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use url::Url;

const CLOUD_IP_PATTERN: &str = r"^cip-[0-9a-z]{5,}$";

#[allow(clippy::expect_used, reason = "literal pattern")]
static CLOUD_IP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(CLOUD_IP_PATTERN).expect("Cloud IP pattern compiles"));

/// Check a service can be turned into a Brightbox load balancer
pub fn validate_service_spec(spec: &ServiceSpec, config: &EngineConfig) -> Result<(), ValidationError> {
    if spec.session_affinity != SessionAffinity::None {
        return Err(ValidationError::UnsupportedAffinity(
            spec.session_affinity.to_string(),
        ));
    }
    if spec.ports.is_empty() {
        return Err(ValidationError::NoPorts);
    }

    let annotations = spec.annotations();
    let protocol = annotations.listener_protocol(config.default_listener_protocol);
    let mut tls_port_found = false;
    for port in &spec.ports {
        if port.protocol != TransportProtocol::Tcp {
            return Err(ValidationError::UnsupportedProtocol(port.protocol.to_string()));
        }
        tls_port_found |= port.port == config.standard_tls_port;
    }
    if !tls_port_found
        && protocol.is_plain_http()
        && (annotations.contains(annotations::SSL_PORTS) || annotations.contains(annotations::SSL_DOMAINS))
    {
        return Err(ValidationError::TlsPortMissing(config.standard_tls_port));
    }

    if spec.load_balancer_ip.is_some() && annotations.contains(annotations::CLOUDIP_ALLOCATIONS) {
        return Err(ValidationError::ConflictingAddressSpec);
    }

    validate_annotations(annotations)
}

/// Check each annotation value against its type
pub fn validate_annotations(annotations: Annotations<'_>) -> Result<(), ValidationError> {
    for (key, value) in annotations.iter() {
        match key {
            annotations::POLICY => {
                parse_enum::<BalancingPolicy>(key, value)?;
            }
            annotations::LISTENER_PROTOCOL => {
                let protocol = parse_enum::<ListenerProtocol>(key, value)?;
                if protocol == ListenerProtocol::Tcp {
                    for tls_key in [annotations::SSL_PORTS, annotations::SSL_DOMAINS] {
                        if annotations.contains(tls_key) {
                            return Err(ValidationError::TlsNotSupportedWithProtocol {
                                annotation: tls_key.to_string(),
                                protocol,
                            });
                        }
                    }
                }
            }
            annotations::LISTENER_PROXY_PROTOCOL => {
                parse_enum::<ProxyProtocol>(key, value)?;
            }
            annotations::SSL_PORTS => {
                if !annotations.contains(annotations::SSL_DOMAINS) {
                    return Err(ValidationError::MissingDomains(
                        annotations::SSL_DOMAINS.to_string(),
                    ));
                }
            }
            annotations::HC_PROTOCOL => {
                parse_enum::<HealthcheckType>(key, value)?;
            }
            annotations::HC_REQUEST => {
                if !is_request_path(value) {
                    return Err(invalid(key, value, "needs to be a valid Url request path"));
                }
            }
            annotations::CLOUDIP_ALLOCATIONS => {
                if !CLOUD_IP_REGEX.is_match(value) {
                    return Err(invalid(
                        key,
                        value,
                        &format!("needs to match the pattern {:?}", CLOUD_IP_PATTERN),
                    ));
                }
            }
            key if annotations::NUMERIC.contains(&key) => {
                annotations::parse_u32(value).map_err(|e| {
                    invalid(key, value, &format!("needs to be a positive number ({})", e))
                })?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn parse_enum<T>(key: &str, value: &str) -> Result<T, ValidationError>
where
    T: FromStr<Err = brightbox_client::ParseEnumError>,
{
    value.parse().map_err(|e: brightbox_client::ParseEnumError| invalid(key, value, &e.to_string()))
}

fn invalid(key: &str, value: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidAnnotation {
        annotation: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// A request path survives being appended to a URL unchanged.
///
/// The parsed path is normalised and percent-encoded, so the raw value is
/// checked instead: it must be the whole path with nothing left to decode.
fn is_request_path(value: &str) -> bool {
    let Ok(url) = Url::parse(&format!("http://example.com:6443{}", value)) else {
        return false;
    };
    url.query().is_none()
        && url.fragment().is_none()
        && (value.is_empty() || value.starts_with('/'))
        && !value.contains('%')
        && !value.chars().any(char::is_control)
}
