#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use archive_timeline::Config;

pub const TOKEN: &str = "patTestToken";
pub const BASE_ID: &str = "appTestBase";
pub const TABLE_ID: &str = "tblTestTable";

/// Serve `app` on an ephemeral local port.
pub async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    addr
}

pub async fn send_raw(addr: SocketAddr, path: &str, headers: &[(&str, &str)]) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    req.push_str("\r\n");
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head.to_string(), body.to_string())
}

pub fn record(id: &str, fields: Value) -> Value {
    json!({"id": id, "createdTime": "2023-10-09T08:00:00.000Z", "fields": fields})
}

/// How the fake table answers the next request.
#[derive(Debug, Clone)]
pub enum Reply {
    Page(Value),
    Status(u16),
    Raw(&'static str),
}

/// An Airtable-like list endpoint with pages keyed by offset.
#[derive(Debug, Default)]
pub struct FakeAirtable {
    pages: Mutex<HashMap<String, Reply>>,
    requests: Mutex<Vec<SeenRequest>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeenRequest {
    pub authorization: Option<String>,
    pub offset: Option<String>,
}

/// Key of the page served without an offset.
pub const FIRST: &str = "";

impl FakeAirtable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, offset: &str, reply: Reply) {
        self.pages
            .lock()
            .expect("pages lock")
            .insert(offset.to_string(), reply);
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route(&format!("/v0/{BASE_ID}/{TABLE_ID}"), get(list_records))
            .with_state(Arc::clone(self))
    }
}

async fn list_records(
    State(table): State<Arc<FakeAirtable>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let offset = query.get("offset").cloned();
    table.requests.lock().expect("requests lock").push(SeenRequest {
        authorization: authorization.clone(),
        offset: offset.clone(),
    });

    let expected = format!("Bearer {TOKEN}");
    if authorization.as_deref() != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"type": "AUTHENTICATION_REQUIRED"}})),
        )
            .into_response();
    }

    let key = offset.unwrap_or_default();
    let reply = table.pages.lock().expect("pages lock").get(&key).cloned();
    match reply {
        Some(Reply::Page(body)) => Json(body).into_response(),
        Some(Reply::Status(code)) => StatusCode::from_u16(code)
            .expect("status code")
            .into_response(),
        Some(Reply::Raw(text)) => text.into_response(),
        None => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": {"type": "LIST_RECORDS_ITERATOR_NOT_AVAILABLE"}})),
        )
            .into_response(),
    }
}

/// Configuration pointing the gateway at a fake table on `upstream`.
pub fn config_for(upstream: SocketAddr) -> Config {
    let mut config = Config::default();
    config.upstream.api_url = format!("http://{upstream}/v0");
    config.upstream.base_id = BASE_ID.to_string();
    config.upstream.table_id = TABLE_ID.to_string();
    config.upstream.access_token = TOKEN.to_string();
    config.upstream.timeout_secs = 5;
    config.server.static_dir = None;
    config.client.timeout_secs = 5;
    config
}
