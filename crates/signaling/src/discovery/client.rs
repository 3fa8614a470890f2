//! HTTP client for the discovery endpoint

use reqwest::multipart;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::credentials::RelayCredentials;
use crate::error::{Error, Result};

use super::request::{random_sid, DiscoveryRequest, SERVICE_GATEWAY, SERVICE_TURN_FALLBACK};
use super::response::{EdgeAddress, ServiceResponse};

const ENDPOINT_PATH: &str = "/api/v2/transpond/webrtc?v=2";

/// Client for the edge discovery endpoint with ordered host failover.
pub struct EdgeServiceClient {
    config: TransportConfig,
    http: reqwest::Client,
}

impl EdgeServiceClient {
    /// Build a client from the transport configuration.
    pub fn new(config: TransportConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    /// Select gateway and TURN edges for a channel (URI 22).
    ///
    /// Requests the gateway and TURN fallback services by default.
    pub async fn choose_server(
        &self,
        credentials: &RelayCredentials,
        role: u32,
        service_flags: Option<&[u32]>,
        sid: Option<&str>,
    ) -> Result<ServiceResponse> {
        let flags = service_flags.unwrap_or(&[SERVICE_GATEWAY, SERVICE_TURN_FALLBACK]);
        let sid = sid.map(str::to_string).unwrap_or_else(random_sid);
        let request = DiscoveryRequest::choose_server(
            credentials,
            role,
            &self.config.area_code,
            flags,
            &sid,
        );
        self.request_with_failover(&request).await
    }

    /// Refresh the access ticket for known edges (URI 28).
    pub async fn update_ticket(
        &self,
        credentials: &RelayCredentials,
        edges: &[EdgeAddress],
        service_flags: Option<&[u32]>,
        sid: Option<&str>,
    ) -> Result<ServiceResponse> {
        let flags = service_flags.unwrap_or(&[SERVICE_GATEWAY]);
        let sid = sid.map(str::to_string).unwrap_or_else(random_sid);
        let request = DiscoveryRequest::update_ticket(
            credentials,
            &self.config.area_code,
            flags,
            &sid,
            edges,
        );
        self.request_with_failover(&request).await
    }

    /// Try every primary host in order, then the backups. A host
    /// counts as failed on connect error, timeout, non-200 status,
    /// unparseable body (unless configured to escalate) or a nonzero
    /// service code. Only exhaustion of the whole list is fatal.
    async fn request_with_failover(&self, request: &DiscoveryRequest) -> Result<ServiceResponse> {
        let payload = serde_json::to_string(request)?;

        let hosts = self
            .config
            .primary_hosts
            .iter()
            .chain(self.config.backup_hosts.iter());
        for host in hosts {
            debug!(host = host.as_str(), "trying discovery host");
            match self.call_endpoint(host, &payload).await {
                Ok(response) => {
                    info!(
                        host = host.as_str(),
                        flag = response.flag,
                        edges = response.addresses.len(),
                        "discovery succeeded"
                    );
                    return Ok(response);
                }
                Err(Error::MalformedResponse(msg)) if self.config.fail_fast_on_malformed => {
                    return Err(Error::MalformedResponse(msg));
                }
                Err(e) => {
                    warn!(host = host.as_str(), error = %e, "discovery host failed");
                }
            }
        }
        Err(Error::DiscoveryUnavailable)
    }

    async fn call_endpoint(&self, host: &str, payload: &str) -> Result<ServiceResponse> {
        let url = endpoint_url(host);

        let part = multipart::Part::text(payload.to_string())
            .mime_str("application/json")
            .map_err(|e| Error::Transport(format!("invalid request part: {}", e)))?;
        let form = multipart::Form::new().part("request", part);

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("request to {} failed: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Transport(format!(
                "discovery host returned HTTP {}",
                status
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(format!("invalid response body: {}", e)))?;
        ServiceResponse::from_value(&body)
    }
}

/// Hosts may carry an explicit scheme; bare hosts get https.
fn endpoint_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        format!("{}{}", host.trim_end_matches('/'), ENDPOINT_PATH)
    } else {
        format!("https://{}{}", host, ENDPOINT_PATH)
    }
}
