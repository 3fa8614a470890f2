//! Configuration for discovery and the signaling session

use std::time::Duration;

/// Transport configuration owned by a session
///
/// The original vendor SDK keeps an implicit process-wide TLS context; here
/// every policy knob is an explicit field so two sessions can disagree.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Discovery hosts tried first, in order. A bare host gets an
    /// `https://` scheme; an explicit `http://` prefix is honored as-is
    /// (local gateways, tests).
    pub primary_hosts: Vec<String>,

    /// Discovery hosts tried only after every primary host failed
    pub backup_hosts: Vec<String>,

    /// Domain suffix for gateway/TURN hostnames built from a dashed edge IP
    pub relay_domain: String,

    /// Per-host timeout for a discovery request (default: 10s)
    pub request_timeout: Duration,

    /// Deadline for a single read inside the join loop; expiry degrades the
    /// session rather than failing it (default: 30s)
    pub negotiation_timeout: Duration,

    /// Preferred area code sent in the discovery detail map
    pub area_code: String,

    /// SDK version string advertised in the join message
    pub sdk_version: String,

    /// Browser identification string advertised in the join message
    pub browser: String,

    /// Accept edge certificates that do not match the dashed hostname
    /// (the relay's gateway certs rarely do)
    pub accept_invalid_certs: bool,

    /// Treat a malformed discovery body as fatal instead of moving on to
    /// the next host (default: false, matching the vendor SDK)
    pub fail_fast_on_malformed: bool,

    /// Force the DTLS setup role in the synthesized answer instead of
    /// deriving it from the relay's advertised role
    pub setup_role_override: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            primary_hosts: vec![
                "webrtc2-ap-web-1.agora.io".to_string(),
                "webrtc2-ap-web-2.agora.io".to_string(),
                "webrtc2-ap-web-3.agora.io".to_string(),
                "webrtc2-ap-web-4.agora.io".to_string(),
            ],
            backup_hosts: vec![
                "webrtc2-ap-web-5.agora.io".to_string(),
                "webrtc2-ap-web-6.agora.io".to_string(),
            ],
            relay_domain: "edge.agora.io".to_string(),
            request_timeout: Duration::from_secs(10),
            negotiation_timeout: Duration::from_secs(30),
            area_code: "CN,GLOBAL".to_string(),
            sdk_version: "4.23.4".to_string(),
            browser: "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:137.0) Gecko/20100101 Firefox/137.0"
                .to_string(),
            accept_invalid_certs: true,
            fail_fast_on_malformed: false,
            setup_role_override: None,
        }
    }
}

impl TransportConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `primary_hosts` is empty
    /// - `relay_domain` is empty
    /// - any timeout is zero
    pub fn validate(&self) -> crate::Result<()> {
        use crate::Error;

        if self.primary_hosts.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one primary discovery host is required".to_string(),
            ));
        }

        if self.relay_domain.is_empty() {
            return Err(Error::InvalidConfig(
                "relay_domain cannot be empty".to_string(),
            ));
        }

        if self.request_timeout.is_zero() || self.negotiation_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "timeouts must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TransportConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_host_order() {
        let config = TransportConfig::default();
        assert_eq!(config.primary_hosts.len(), 4);
        assert_eq!(config.backup_hosts.len(), 2);
        assert!(config.primary_hosts[0].starts_with("webrtc2-ap-web-1"));
    }

    #[test]
    fn test_empty_primary_hosts_fails() {
        let mut config = TransportConfig::default();
        config.primary_hosts.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_fails() {
        let mut config = TransportConfig::default();
        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
