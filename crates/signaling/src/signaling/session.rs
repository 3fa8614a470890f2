//! Signaling session state machine
//!
//! Owns one WebSocket to a gateway edge. Once the join is on the wire
//! the session always yields an answer SDP: transport trouble inside
//! the read loop degrades to a locally generated fallback answer
//! instead of failing the stream. Failures before that point — an
//! unusable offer, discovery exhaustion, a failed gateway handshake or
//! join send, an explicit gateway error — abort.

use std::collections::HashMap;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, Connector};
use tracing::{debug, error, info, warn};

use crate::answer;
use crate::config::TransportConfig;
use crate::credentials::RelayCredentials;
use crate::discovery::{EdgeServiceClient, ServiceResponse};
use crate::error::{Error, Result};
use crate::negotiate;
use crate::sdp;

use super::messages::{Inbound, InboundMessage, JoinRequest};

/// Where the session currently is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Connected,
    AwaitingResponse,
    Joined,
    Answered,
    Degraded,
    Failed,
    Closed,
}

/// The outcome of a join negotiation
#[derive(Debug, Clone)]
pub enum SdpAnswer {
    /// Answer derived from the gateway's negotiated parameters
    Negotiated(String),
    /// Locally generated fallback answer
    Degraded(String),
}

impl SdpAnswer {
    /// The answer SDP text, whichever way it was produced
    pub fn sdp(&self) -> &str {
        match self {
            Self::Negotiated(sdp) | Self::Degraded(sdp) => sdp,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Cancels a running negotiation from another task.
#[derive(Clone)]
pub struct CancelHandle(Arc<Notify>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.notify_one();
    }
}

/// One join negotiation against one gateway.
pub struct SignalingSession {
    config: TransportConfig,
    state: SessionState,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>,
    cancel: Arc<Notify>,
}

impl SignalingSession {
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            state: SessionState::Idle,
            pending: Arc::new(Mutex::new(HashMap::new())),
            cancel: Arc::new(Notify::new()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle for cancelling the negotiation from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle(self.cancel.clone())
    }

    /// Explicit close from any state. An in-flight negotiation is
    /// cancelled (its loop releases the socket and returns a degraded
    /// answer); a finished session just ends up Closed.
    pub fn disconnect(&mut self) {
        self.cancel.notify_one();
        self.state = SessionState::Closed;
    }

    /// Full flow: discover a gateway edge, then join over WebSocket.
    pub async fn connect_and_join(
        &mut self,
        credentials: &RelayCredentials,
        offer_sdp: &str,
    ) -> Result<SdpAnswer> {
        self.state = SessionState::Connecting;
        let client = EdgeServiceClient::new(self.config.clone())?;
        let discovery = client.choose_server(credentials, 1, None, None).await?;

        let gateway = discovery
            .gateway_addresses()
            .first()
            .cloned()
            .ok_or(Error::DiscoveryUnavailable)?;
        let url = gateway.websocket_url(&self.config.relay_domain);
        info!(url = url.as_str(), "selected gateway edge");

        self.connect_and_join_at(&url, credentials, &discovery, offer_sdp)
            .await
    }

    /// Join against a known gateway URL. Split out from
    /// [`connect_and_join`] so the discovery step can be skipped when
    /// an edge is already known.
    pub async fn connect_and_join_at(
        &mut self,
        gateway_url: &str,
        credentials: &RelayCredentials,
        discovery: &ServiceResponse,
        offer_sdp: &str,
    ) -> Result<SdpAnswer> {
        // an unusable offer is the one thing we cannot degrade around
        let offer = sdp::parse(offer_sdp)?;
        let negotiated = negotiate::offer_to_ortc(&offer)?;

        self.state = SessionState::Connecting;
        let connector = self.tls_connector(gateway_url)?;
        let stream = match connect_async_tls_with_config(gateway_url, None, false, connector).await
        {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!(url = gateway_url, error = %e, "gateway connect failed");
                self.state = SessionState::Failed;
                return Err(Error::Transport(format!(
                    "gateway connect to {} failed: {}",
                    gateway_url, e
                )));
            }
        };
        self.state = SessionState::Connected;
        debug!(url = gateway_url, "gateway socket open");

        let (mut sink, mut source) = stream.split();

        let join = JoinRequest::new(credentials, discovery, &negotiated, &self.config)?;
        let join_rx = self.register(&join.id).await;
        let payload = serde_json::to_string(&join)?;
        if let Err(e) = sink.send(Message::Text(payload)).await {
            error!(error = %e, "join send failed");
            self.state = SessionState::Failed;
            return Err(Error::Transport(format!("join send failed: {}", e)));
        }
        self.state = SessionState::AwaitingResponse;

        let mut join_rx = Some(join_rx);
        loop {
            // a correlated reply to the join lands here via the pending table
            if let Some(rx) = join_rx.as_mut() {
                if let Ok(value) = rx.try_recv() {
                    join_rx = None;
                    if let Some(result) = self.dispatch_value(&value, &negotiated, &offer)? {
                        return Ok(result);
                    }
                }
            }

            let frame = tokio::select! {
                _ = self.cancel.notified() => {
                    info!("negotiation cancelled");
                    self.state = SessionState::Closed;
                    return Ok(SdpAnswer::Degraded(answer::fallback_answer()));
                }
                frame = timeout(self.config.negotiation_timeout, source.next()) => frame,
            };

            let message = match frame {
                Err(_) => {
                    warn!("gateway silent past negotiation timeout, degrading");
                    return Ok(self.degrade());
                }
                Ok(None) => {
                    warn!("gateway closed the socket without an answer, degrading");
                    return Ok(self.degrade());
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "gateway read failed, degrading");
                    return Ok(self.degrade());
                }
                Ok(Some(Ok(message))) => message,
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => {
                    warn!("gateway sent close without an answer, degrading");
                    return Ok(self.degrade());
                }
                _ => continue,
            };

            let inbound = match Inbound::parse(&text) {
                Ok(inbound) => inbound,
                Err(e) => {
                    warn!(error = %e, "unparseable gateway frame, skipping");
                    continue;
                }
            };

            // resolve correlated replies first
            if let Some(id) = &inbound.id {
                let sender = self.pending.lock().await.remove(id);
                if let Some(sender) = sender {
                    debug!(id = id.as_str(), "resolved correlated reply");
                    let _ = sender.send(serde_json::from_str(&text)?);
                    continue;
                }
            }

            if let Some(result) = self.dispatch(inbound, &negotiated, &offer)? {
                return Ok(result);
            }
        }
    }

    fn dispatch_value(
        &mut self,
        value: &Value,
        negotiated: &crate::ortc::OrtcParameters,
        offer: &sdp::SdpDocument,
    ) -> Result<Option<SdpAnswer>> {
        let inbound = Inbound::parse(&value.to_string())?;
        self.dispatch(inbound, negotiated, offer)
    }

    /// Handle one classified message. `Some` ends the negotiation.
    fn dispatch(
        &mut self,
        inbound: Inbound,
        negotiated: &crate::ortc::OrtcParameters,
        offer: &sdp::SdpDocument,
    ) -> Result<Option<SdpAnswer>> {
        match inbound.kind {
            InboundMessage::Answer { sdp: Some(sdp) } => {
                info!("gateway sent a direct answer");
                self.state = SessionState::Answered;
                Ok(Some(SdpAnswer::Negotiated(sdp)))
            }
            InboundMessage::Answer { sdp: None } => {
                warn!("answer message without sdp, ignoring");
                Ok(None)
            }
            InboundMessage::JoinSuccess { ortc: Some(ortc) } => {
                self.state = SessionState::Joined;
                // the gateway omits ICE/DTLS sections it considers implied;
                // fall back to what we sent it
                let mut ortc = ortc;
                if ortc.ice_parameters.ice_ufrag.is_empty() {
                    ortc.ice_parameters = negotiated.ice_parameters.clone();
                }
                let sdp = answer::synthesize_answer(
                    &ortc,
                    offer,
                    self.config.setup_role_override.as_deref(),
                );
                self.state = SessionState::Answered;
                info!("synthesized answer from join success");
                Ok(Some(SdpAnswer::Negotiated(sdp)))
            }
            InboundMessage::JoinSuccess { ortc: None } => {
                warn!("join success without ortc parameters, degrading");
                Ok(Some(self.degrade()))
            }
            InboundMessage::PeerLost { code, reason } => {
                warn!(code = ?code, reason = reason.as_str(), "peer link lost");
                Ok(None)
            }
            InboundMessage::ErrorNotice { detail } => {
                error!(detail = detail.as_str(), "gateway rejected the join");
                self.state = SessionState::Failed;
                Err(Error::Protocol(format!("gateway error: {}", detail)))
            }
            InboundMessage::Unknown { kind } => {
                debug!(kind = kind.as_str(), "ignoring unknown message type");
                Ok(None)
            }
        }
    }

    fn degrade(&mut self) -> SdpAnswer {
        self.state = SessionState::Degraded;
        SdpAnswer::Degraded(answer::fallback_answer())
    }

    async fn register(&self, id: &str) -> oneshot::Receiver<Value> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.to_string(), tx);
        rx
    }

    fn tls_connector(&self, url: &str) -> Result<Option<Connector>> {
        let parsed = url::Url::parse(url)
            .map_err(|e| Error::Transport(format!("invalid gateway url {}: {}", url, e)))?;
        if parsed.scheme() != "wss" {
            return Ok(None);
        }
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(self.config.accept_invalid_certs)
            .danger_accept_invalid_hostnames(self.config.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build TLS connector: {}", e)))?;
        Ok(Some(Connector::NativeTls(tls)))
    }
}
