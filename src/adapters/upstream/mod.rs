//! HTTP integrations with the HR system and the downstream delivery targets
//!
//! - [`UpstreamClient`] pulls the user and department snapshots
//! - [`DeliveryTransport`] pushes pending subjects to a downstream target

pub mod client;
pub mod delivery;

pub use client::UpstreamClient;
pub use delivery::{DeliveryTransport, HttpDeliveryTransport, TransportResponse};

use base64::{engine::general_purpose, Engine as _};
use secrecy::ExposeSecret;

use crate::config::SecretString;

/// `Authorization` header value for optional basic credentials
pub(crate) fn basic_auth_header(
    username: &Option<String>,
    password: &Option<SecretString>,
) -> Option<String> {
    let (Some(username), Some(password)) = (username, password) else {
        return None;
    };
    let credentials = format!("{}:{}", username, password.expose_secret().as_ref());
    let encoded = general_purpose::STANDARD.encode(credentials.as_bytes());
    Some(format!("Basic {encoded}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    #[test]
    fn test_basic_auth_header() {
        let header = basic_auth_header(
            &Some("svc".to_string()),
            &Some(secret_string("pw".to_string())),
        );
        assert_eq!(header.as_deref(), Some("Basic c3ZjOnB3"));
    }

    #[test]
    fn test_basic_auth_requires_both_parts() {
        assert!(basic_auth_header(&Some("svc".to_string()), &None).is_none());
        assert!(basic_auth_header(&None, &Some(secret_string("pw".to_string()))).is_none());
    }
}
