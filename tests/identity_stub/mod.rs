use std::io::Read as _;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const API_KEY: &str = "test-api-key";
/// Answered with HTTP 400 `INVALID_ID_TOKEN`.
pub const EXPIRED_TOKEN: &str = "expired";
/// Answered with HTTP 200 and no users.
pub const ORPHAN_TOKEN: &str = "orphan";
/// Answered with HTTP 503.
pub const OUTAGE_TOKEN: &str = "outage";
/// Answered only after `STALL`.
pub const STALLED_TOKEN: &str = "stall";
pub const STALL: Duration = Duration::from_secs(2);

/// Identity Toolkit `accounts:lookup` stand-in. `good-<uid>` tokens resolve to `<uid>`.
pub struct IdentityStub {
    pub base_url: String,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl IdentityStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start identity stub server");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}/v1");

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let mut raw = String::new();
                let _ = request.as_reader().read_to_string(&mut raw);
                let token = serde_json::from_str::<Value>(&raw)
                    .ok()
                    .and_then(|v| v.get("idToken")?.as_str().map(str::to_owned))
                    .unwrap_or_default();

                if token == STALLED_TOKEN {
                    thread::sleep(STALL);
                }

                let (status, body) = respond(request.method(), request.url(), &token);
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(body.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }
}

impl Drop for IdentityStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn respond(method: &tiny_http::Method, raw_url: &str, token: &str) -> (u16, Value) {
    let Ok(url) = url::Url::parse(&format!("http://stub{raw_url}")) else {
        return (400, json!({ "error": { "code": 400, "message": "bad url" } }));
    };
    if *method != tiny_http::Method::Post || url.path() != "/v1/accounts:lookup" {
        return (404, json!({ "error": { "code": 404, "message": "not found" } }));
    }
    let key_ok = url.query_pairs().any(|(k, v)| k == "key" && v == API_KEY);
    if !key_ok {
        return (
            403,
            json!({ "error": { "code": 403, "message": "API key not valid" } }),
        );
    }

    match token {
        EXPIRED_TOKEN => (
            400,
            json!({ "error": { "code": 400, "message": "INVALID_ID_TOKEN" } }),
        ),
        ORPHAN_TOKEN => (200, json!({ "kind": "identitytoolkit#GetAccountInfoResponse" })),
        OUTAGE_TOKEN => (
            503,
            json!({ "error": { "code": 503, "message": "backend unavailable" } }),
        ),
        STALLED_TOKEN => (200, json!({ "users": [{ "localId": "slow" }] })),
        other => match other.strip_prefix("good-") {
            Some(uid) => (
                200,
                json!({
                    "users": [{
                        "localId": uid,
                        "email": format!("{uid}@example.com"),
                        "emailVerified": true,
                    }]
                }),
            ),
            None => (
                400,
                json!({ "error": { "code": 400, "message": "INVALID_ID_TOKEN" } }),
            ),
        },
    }
}
