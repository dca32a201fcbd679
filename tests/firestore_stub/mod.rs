use std::collections::BTreeMap;
use std::io::Read as _;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};

pub const PROJECT_ID: &str = "demo-dish";
/// Owner whose collection answers HTTP 500.
pub const BROKEN_OWNER: &str = "broken";

const READ_TIME: &str = "2025-06-01T00:00:00.000000Z";

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// In-memory Firestore emulator stand-in for `users/{uid}/saved_recipes/{meal_id}`.
pub struct FirestoreStub {
    /// `host:port`, as `FIRESTORE_EMULATOR_HOST` would carry it.
    pub host: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FirestoreStub {
    pub fn spawn() -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start firestore stub server");
        let host = server.server_addr().to_string();

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&recorded);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            // "<uid>/<meal_id>" -> document fields
            let mut documents: BTreeMap<String, Value> = BTreeMap::new();
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
                let body = serde_json::from_str(&raw).unwrap_or(Value::Null);
                let authorized = request.headers().iter().any(|h| {
                    h.field.equiv("Authorization") && h.value.as_str() == "Bearer owner"
                });
                let entry = Recorded {
                    method: request.method().to_string().to_uppercase(),
                    path: request.url().to_owned(),
                    body,
                };
                log.lock().expect("lock recorded").push(entry.clone());

                let (status, reply) = if authorized {
                    respond(&mut documents, &entry)
                } else {
                    (401, error(401, "missing owner token"))
                };
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                        .expect("build header");
                let response = tiny_http::Response::from_string(reply.to_string())
                    .with_status_code(status)
                    .with_header(header);
                let _ = request.respond(response);
            }
        });

        Self {
            host,
            recorded,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().expect("lock recorded").clone()
    }
}

impl Drop for FirestoreStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn error(code: u16, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}

fn document_name(owner: &str, meal_id: &str) -> String {
    format!("projects/{PROJECT_ID}/databases/(default)/documents/users/{owner}/saved_recipes/{meal_id}")
}

fn respond(documents: &mut BTreeMap<String, Value>, req: &Recorded) -> (u16, Value) {
    let prefix = format!("/v1/projects/{PROJECT_ID}/databases/(default)/documents/users/");
    let Some(rest) = req.path.strip_prefix(&prefix) else {
        return (404, error(404, "unknown path"));
    };

    if let Some(owner) = rest.strip_suffix(":runQuery") {
        if req.method != "POST" {
            return (405, error(405, "runQuery needs POST"));
        }
        if owner == BROKEN_OWNER {
            return (500, error(500, "backend exploded"));
        }
        let query = &req.body["structuredQuery"];
        if query["from"][0]["collectionId"] != "saved_recipes"
            || query["orderBy"][0]["field"]["fieldPath"] != "saved_at"
            || query["orderBy"][0]["direction"] != "DESCENDING"
        {
            return (400, error(400, "unexpected structured query"));
        }

        let mut rows: Vec<(String, Value)> = documents
            .iter()
            .filter_map(|(key, fields)| {
                let (doc_owner, meal_id) = key.split_once('/')?;
                (doc_owner == owner).then(|| {
                    let saved_at = fields["saved_at"]["timestampValue"]
                        .as_str()
                        .unwrap_or_default()
                        .to_owned();
                    let row = json!({
                        "document": { "name": document_name(owner, meal_id), "fields": fields },
                        "readTime": READ_TIME,
                    });
                    (saved_at, row)
                })
            })
            .collect();
        rows.sort_by(|a, b| b.0.cmp(&a.0));
        if rows.is_empty() {
            // Firestore answers an empty query with a single read-time row.
            return (200, json!([{ "readTime": READ_TIME }]));
        }
        return (200, Value::Array(rows.into_iter().map(|(_, row)| row).collect()));
    }

    let Some((owner, meal_id)) = rest
        .split_once('/')
        .and_then(|(owner, tail)| Some((owner, tail.strip_prefix("saved_recipes/")?)))
    else {
        return (404, error(404, "unknown document"));
    };
    if owner == BROKEN_OWNER {
        return (500, error(500, "backend exploded"));
    }
    let key = format!("{owner}/{meal_id}");

    match req.method.as_str() {
        "PATCH" => {
            let fields = req.body["fields"].clone();
            documents.insert(key, fields.clone());
            (200, json!({ "name": document_name(owner, meal_id), "fields": fields }))
        }
        // Deleting a missing document succeeds.
        "DELETE" => {
            documents.remove(&key);
            (200, json!({}))
        }
        _ => (405, error(405, "unsupported method")),
    }
}
