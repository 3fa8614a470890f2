//! Discovery E2E against local HTTP stub listeners

use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use agora_signaling::{
    EdgeServiceClient, Error, RelayCredentials, TransportConfig,
};

type HitLog = Arc<Mutex<Vec<(&'static str, String)>>>;

fn credentials() -> RelayCredentials {
    RelayCredentials {
        app_id: "test-app".to_string(),
        token: "test-token".to_string(),
        channel_name: "test-channel".to_string(),
        uid: 12345,
        string_uid: None,
    }
}

fn config(primary: Vec<String>, backup: Vec<String>) -> TransportConfig {
    TransportConfig {
        primary_hosts: primary,
        backup_hosts: backup,
        request_timeout: std::time::Duration::from_secs(2),
        ..TransportConfig::default()
    }
}

fn good_body() -> String {
    json!({
        "response_body": [
            {
                "buffer": {
                    "code": 0, "flag": 4096, "cert": "CERT", "uid": 12345,
                    "cid": 9, "cname": "test-channel", "detail": {},
                    "edges_services": [{"ip": "10.0.0.1", "port": 4700}]
                }
            },
            {
                "buffer": {
                    "code": 0, "flag": 4194310, "cert": "CERT", "uid": 12345,
                    "cid": 9, "cname": "test-channel", "detail": {},
                    "edges_services": [{"ip": "20.0.0.1", "port": 3478}]
                }
            }
        ],
        "enter_ts": 1700000000000u64,
        "opid": 5
    })
    .to_string()
}

/// Minimal one-shot-per-connection HTTP listener. Records the label and
/// the raw request for every hit, then answers with a fixed response.
async fn spawn_stub(label: &'static str, status: u16, body: String, hits: HitLog) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let body = body.clone();
            let hits = hits.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                // read until the headers are complete, then drain the
                // announced body length
                let body_len = loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    request.extend_from_slice(&buf[..n]);
                    if let Some(pos) = find_header_end(&request) {
                        let head = String::from_utf8_lossy(&request[..pos]);
                        let want: usize = head
                            .lines()
                            .find_map(|l| {
                                l.to_ascii_lowercase()
                                    .strip_prefix("content-length:")
                                    .map(|v| v.trim().parse().unwrap_or(0))
                            })
                            .unwrap_or(0);
                        break (pos + 4 + want).saturating_sub(request.len());
                    }
                };
                let mut remaining = body_len;
                while remaining > 0 {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    request.extend_from_slice(&buf[..n]);
                    remaining = remaining.saturating_sub(n);
                }

                hits.lock()
                    .await
                    .push((label, String::from_utf8_lossy(&request).to_string()));

                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

fn find_header_end(bytes: &[u8]) -> Option<usize> {
    bytes.windows(4).position(|w| w == b"\r\n\r\n")
}

#[tokio::test]
async fn test_failover_walks_primaries_then_backups_in_order() -> anyhow::Result<()> {
    let hits: HitLog = Arc::new(Mutex::new(Vec::new()));
    let bad_body = json!({"response_body": [{"buffer": {"code": 110}}]}).to_string();

    let p1 = spawn_stub("p1", 500, "server error".to_string(), hits.clone()).await;
    let p2 = spawn_stub("p2", 502, "bad gateway".to_string(), hits.clone()).await;
    let p3 = spawn_stub("p3", 200, bad_body, hits.clone()).await;
    let p4 = spawn_stub("p4", 503, "unavailable".to_string(), hits.clone()).await;
    let backup = spawn_stub("backup", 200, good_body(), hits.clone()).await;

    let client = EdgeServiceClient::new(config(vec![p1, p2, p3, p4], vec![backup]))?;
    let response = client.choose_server(&credentials(), 1, None, None).await?;

    assert_eq!(response.gateway_addresses()[0].ip, "10.0.0.1");
    assert_eq!(response.turn_addresses()[0].ip, "20.0.0.1");
    assert_eq!(response.ticket, "CERT");

    // exactly five attempts, primaries before the backup, in list order
    let order: Vec<&str> = hits.lock().await.iter().map(|(l, _)| *l).collect();
    assert_eq!(order, vec!["p1", "p2", "p3", "p4", "backup"]);
    Ok(())
}

#[tokio::test]
async fn test_exhausted_hosts_yield_discovery_unavailable() {
    let hits: HitLog = Arc::new(Mutex::new(Vec::new()));
    let broken = spawn_stub("broken", 503, "unavailable".to_string(), hits.clone()).await;

    let client = EdgeServiceClient::new(config(vec![broken], vec![])).unwrap();
    let err = client
        .choose_server(&credentials(), 1, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DiscoveryUnavailable));
}

#[tokio::test]
async fn test_malformed_body_soft_fails_by_default() {
    let hits: HitLog = Arc::new(Mutex::new(Vec::new()));
    let garbled = spawn_stub("garbled", 200, "not json at all".to_string(), hits.clone()).await;
    let working = spawn_stub("working", 200, good_body(), hits.clone()).await;

    let client = EdgeServiceClient::new(config(vec![garbled, working], vec![])).unwrap();
    let response = client
        .choose_server(&credentials(), 1, None, None)
        .await
        .unwrap();
    assert_eq!(response.gateway_addresses().len(), 1);
}

#[tokio::test]
async fn test_malformed_body_escalates_when_configured() {
    let hits: HitLog = Arc::new(Mutex::new(Vec::new()));
    let garbled = spawn_stub("garbled", 200, "not json at all".to_string(), hits.clone()).await;
    let working = spawn_stub("working", 200, good_body(), hits.clone()).await;

    let mut cfg = config(vec![garbled, working], vec![]);
    cfg.fail_fast_on_malformed = true;
    let client = EdgeServiceClient::new(cfg).unwrap();
    let err = client
        .choose_server(&credentials(), 1, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));

    // the working host was never consulted
    let order: Vec<&str> = hits.lock().await.iter().map(|(l, _)| *l).collect();
    assert_eq!(order, vec!["garbled"]);
}

#[tokio::test]
async fn test_choose_server_posts_multipart_selection_request() {
    let hits: HitLog = Arc::new(Mutex::new(Vec::new()));
    let working = spawn_stub("working", 200, good_body(), hits.clone()).await;

    let client = EdgeServiceClient::new(config(vec![working], vec![])).unwrap();
    client
        .choose_server(&credentials(), 1, None, None)
        .await
        .unwrap();

    let log = hits.lock().await;
    let (_, request) = &log[0];
    assert!(request.contains("POST /api/v2/transpond/webrtc?v=2"));
    assert!(request.contains("multipart/form-data"));
    assert!(request.contains("name=\"request\""));
    assert!(request.contains("\"uri\":22"));
    assert!(request.contains("\"cname\":\"test-channel\""));
    assert!(request.contains("\"key\":\"test-token\""));
    assert!(request.contains("\"service_ids\":[11,26]"));
}

#[tokio::test]
async fn test_update_ticket_echoes_previous_edges() {
    let hits: HitLog = Arc::new(Mutex::new(Vec::new()));
    let working = spawn_stub("working", 200, good_body(), hits.clone()).await;

    let client = EdgeServiceClient::new(config(vec![working], vec![])).unwrap();
    let first = client
        .choose_server(&credentials(), 1, None, None)
        .await
        .unwrap();
    let refreshed = client
        .update_ticket(
            &credentials(),
            first.gateway_addresses(),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(refreshed.ticket, "CERT");

    let log = hits.lock().await;
    let (_, request) = &log[1];
    assert!(request.contains("\"uri\":28"));
    assert!(request.contains("\"edges_services\""));
    assert!(request.contains("\"ip\":\"10.0.0.1\""));
}
