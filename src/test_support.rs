// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared test fixtures: local stand-ins for the Solana RPC node, the
//! ElevenLabs API and the Auth0 JWKS endpoint, plus a fully wired
//! [`AppState`] on a temporary database.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use solana_message::Message;
use solana_pubkey::Pubkey;
use solana_transaction::Transaction;
use tower::ServiceExt;

use crate::blockchain::{build_commitment_transaction, Cluster, CommitmentPayload, SolanaClient};
use crate::config::VoiceSettings;
use crate::providers::ElevenLabsClient;
use crate::state::{AppState, AuthConfig};
use crate::storage::{EchoDatabase, UserProfile, UserRepository};

/// Wallet used throughout the tests.
pub const TEST_WALLET: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";
/// A second valid address.
pub const OTHER_WALLET: &str = "CktRuQ2mttgRGkXJtyksdKHjUdc2C4TgDzyB98oEzy8";
pub const TEST_BLOCKHASH: &str = "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N";
/// Landed, successful, paid by `TEST_WALLET`.
pub const TEST_SIGNATURE: &str =
    "99eUso3aSbE9tqGSTXzo3TLfKb9RkMTURrHKQ1K7Zh3BbeqPevr5E1iCbpTjqHuTFLtfxTTD5ekfVuZFzQyEQf8";
/// Landed but failed.
pub const FAILED_SIGNATURE: &str =
    "AKAh9LUoWFG2sxAMotzmLNpKwPTCiG6Q4YTwAinZMnkvYKPAKVPwYSfoQDp8XLKWzpbCNx66XB1BrcD1ZUPqU39";
/// Landed, paid by `OTHER_WALLET`.
pub const FOREIGN_SIGNATURE: &str =
    "BUguQsv2ZuHus54HAFzjdJHzZBkygAjKhEeYwSG19tUfUyvvz3worsdQCdAXDNjakJHioSiyxhFiDJrm8XpSXRA";
/// Landed, paid by `TEST_WALLET`, a bare transfer without a memo.
pub const NO_MEMO_SIGNATURE: &str =
    "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnbJLgp8uirBgmQpjKhoR4tjF3ZpRzrFmBV6UjKdiSEkQUW";

pub const TEST_AUDIO: &[u8] = b"ID3\x04\x00\x00fake-mpeg-frames";
pub const TEST_VOICE_ID: &str = "voice_test_123";
pub const TEST_API_KEY: &str = "test-key";

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

// =============================================================================
// Solana JSON-RPC
// =============================================================================

pub enum RpcReply {
    Result(Value),
    Error(i64, &'static str),
}

type RpcHandler = dyn Fn(&str, &Value) -> RpcReply + Send + Sync;

struct RpcInner {
    handler: Box<RpcHandler>,
    calls: Mutex<Vec<String>>,
}

pub struct MockRpc {
    addr: SocketAddr,
    inner: Arc<RpcInner>,
}

impl MockRpc {
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> RpcReply + Send + Sync + 'static,
    {
        let inner = Arc::new(RpcInner {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/", post(rpc_endpoint))
            .with_state(inner.clone());
        Self {
            addr: serve(app).await,
            inner,
        }
    }

    /// A node that knows the four test signatures.
    pub async fn standard() -> Self {
        Self::spawn(standard_rpc).await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().unwrap().clone()
    }
}

async fn rpc_endpoint(State(inner): State<Arc<RpcInner>>, Json(request): Json<Value>) -> Json<Value> {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let id = request["id"].clone();

    // Version checks are answered for every node and left out of the call log.
    let reply = if method == "getVersion" {
        RpcReply::Result(json!({"solana-core": "2.2.0", "feature-set": 1}))
    } else {
        inner.calls.lock().unwrap().push(method.clone());
        (inner.handler)(&method, &request["params"])
    };
    Json(match reply {
        RpcReply::Result(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        RpcReply::Error(code, message) => {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
        }
    })
}

/// A landed transaction as `getTransaction` reports it with base64 encoding.
fn landed_transaction(transaction: &Transaction, err: Value) -> Value {
    let wire = bincode::serialize(transaction).unwrap();
    let status = if err.is_null() {
        json!({"Ok": null})
    } else {
        json!({"Err": err.clone()})
    };
    json!({
        "slot": 312_000_001u64,
        "blockTime": 1_760_000_000i64,
        "meta": {
            "err": err,
            "status": status,
            "fee": 5000,
            "preBalances": [],
            "postBalances": []
        },
        "transaction": [STANDARD.encode(wire), "base64"]
    })
}

/// A commitment transaction paid for by `payer`.
fn commitment_transaction(payer: &str) -> Transaction {
    let payer: Pubkey = payer.parse().unwrap();
    let payload = CommitmentPayload::new("u", "u@example.com", "p", "d", None, 1);
    build_commitment_transaction(&payer, &payload, &TEST_BLOCKHASH.parse().unwrap())
}

fn plain_transfer(payer: &str) -> Transaction {
    let payer: Pubkey = payer.parse().unwrap();
    let transfer = solana_system_interface::instruction::transfer(&payer, &payer, 1000);
    Transaction::new_unsigned(Message::new_with_blockhash(
        &[transfer],
        Some(&payer),
        &TEST_BLOCKHASH.parse().unwrap(),
    ))
}

fn standard_rpc(method: &str, params: &Value) -> RpcReply {
    match method {
        "getLatestBlockhash" => RpcReply::Result(json!({
            "context": {"slot": 312_000_000u64},
            "value": {"blockhash": TEST_BLOCKHASH, "lastValidBlockHeight": 250_000_150u64}
        })),
        "getFeeForMessage" => RpcReply::Result(json!({"context": {"slot": 1}, "value": 10_000})),
        "getBalance" => RpcReply::Result(json!({"context": {"slot": 1}, "value": 2_500_000_000u64})),
        "getTransaction" => RpcReply::Result(match params[0].as_str() {
            Some(TEST_SIGNATURE) => {
                landed_transaction(&commitment_transaction(TEST_WALLET), Value::Null)
            }
            Some(FAILED_SIGNATURE) => landed_transaction(
                &commitment_transaction(TEST_WALLET),
                json!({"InstructionError": [1, {"Custom": 1}]}),
            ),
            Some(FOREIGN_SIGNATURE) => {
                landed_transaction(&commitment_transaction(OTHER_WALLET), Value::Null)
            }
            Some(NO_MEMO_SIGNATURE) => {
                landed_transaction(&plain_transfer(TEST_WALLET), Value::Null)
            }
            _ => Value::Null,
        }),
        _ => RpcReply::Error(-32601, "Method not found"),
    }
}

// =============================================================================
// ElevenLabs
// =============================================================================

#[derive(Default)]
struct VoiceApiLog {
    requests: usize,
    api_key: Option<String>,
    clone_name: Option<String>,
    sample_content_type: Option<String>,
    tts_voice: Option<String>,
    tts_text: Option<String>,
}

#[derive(Clone)]
struct VoiceApiState {
    log: Arc<Mutex<VoiceApiLog>>,
    failure: Option<(u16, &'static str)>,
}

pub struct MockVoiceApi {
    addr: SocketAddr,
    log: Arc<Mutex<VoiceApiLog>>,
}

impl MockVoiceApi {
    pub async fn spawn() -> Self {
        Self::start(None).await
    }

    /// Every call answers `status` with `message` as body.
    pub async fn failing(status: u16, message: &'static str) -> Self {
        Self::start(Some((status, message))).await
    }

    async fn start(failure: Option<(u16, &'static str)>) -> Self {
        let log = Arc::new(Mutex::new(VoiceApiLog::default()));
        let app = Router::new()
            .route("/voices/add", post(voices_add))
            .route("/text-to-speech/{voice_id}", post(text_to_speech))
            .with_state(VoiceApiState {
                log: log.clone(),
                failure,
            });
        Self {
            addr: serve(app).await,
            log,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn request_count(&self) -> usize {
        self.log.lock().unwrap().requests
    }

    pub fn last_api_key(&self) -> Option<String> {
        self.log.lock().unwrap().api_key.clone()
    }

    pub fn last_clone_name(&self) -> Option<String> {
        self.log.lock().unwrap().clone_name.clone()
    }

    pub fn last_sample_content_type(&self) -> Option<String> {
        self.log.lock().unwrap().sample_content_type.clone()
    }

    pub fn last_tts_voice(&self) -> Option<String> {
        self.log.lock().unwrap().tts_voice.clone()
    }

    pub fn last_tts_text(&self) -> Option<String> {
        self.log.lock().unwrap().tts_text.clone()
    }
}

fn record_call(state: &VoiceApiState, headers: &HeaderMap) -> Option<Response> {
    let mut log = state.log.lock().unwrap();
    log.requests += 1;
    log.api_key = headers
        .get("xi-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.failure.map(|(status, message)| {
        (StatusCode::from_u16(status).unwrap(), message).into_response()
    })
}

async fn voices_add(
    State(state): State<VoiceApiState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Some(failure) = record_call(&state, &headers) {
        return failure;
    }

    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name() {
            Some("name") => {
                let name = field.text().await.unwrap();
                state.log.lock().unwrap().clone_name = Some(name);
            }
            Some("files") => {
                let content_type = field.content_type().map(str::to_string);
                field.bytes().await.unwrap();
                state.log.lock().unwrap().sample_content_type = content_type;
            }
            _ => {}
        }
    }

    Json(json!({"voice_id": TEST_VOICE_ID, "requires_verification": false})).into_response()
}

async fn text_to_speech(
    State(state): State<VoiceApiState>,
    Path(voice_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = record_call(&state, &headers) {
        return failure;
    }

    {
        let mut log = state.log.lock().unwrap();
        log.tts_voice = Some(voice_id);
        log.tts_text = body["text"].as_str().map(str::to_string);
    }
    ([(header::CONTENT_TYPE, "audio/mpeg")], TEST_AUDIO).into_response()
}

// =============================================================================
// Auth0 JWKS
// =============================================================================

pub struct MockJwks {
    addr: SocketAddr,
    requests: Arc<Mutex<usize>>,
}

impl MockJwks {
    pub const KEY_ID: &'static str = "echo-test-key";

    pub async fn spawn() -> Self {
        let requests = Arc::new(Mutex::new(0usize));
        let counter = requests.clone();
        let app = Router::new().route(
            "/.well-known/jwks.json",
            get(move || {
                let counter = counter.clone();
                async move {
                    *counter.lock().unwrap() += 1;
                    Json(json!({
                        "keys": [{
                            "kty": "RSA",
                            "use": "sig",
                            "alg": "RS256",
                            "kid": MockJwks::KEY_ID,
                            "n": "w22TblPdlkeWhc2Nan9CMcs6TATxPgxGC65Ue4W8uvzN9y2aku-SWm0o8XJZGtiL4pSNzsvpsRPKcZVb3PNNNbNWmwrXU2uoJMFUkRESVDiNqlCDYmyC_WJs8K1yJUkj27gS7KKAd2q8ICJc2jqvH5aScJx9-FOj2QYVAXU8l-w",
                            "e": "AQAB"
                        }]
                    }))
                }
            }),
        );
        Self {
            addr: serve(app).await,
            requests,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/.well-known/jwks.json", self.addr)
    }

    pub fn request_count(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

// =============================================================================
// Tokens
// =============================================================================

fn unsigned_jwt(claims: Value) -> String {
    let header = r#"{"alg":"RS256","typ":"JWT"}"#;
    let header_b64 = URL_SAFE_NO_PAD.encode(header.as_bytes());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
    // Only accepted because test states allow unverified tokens.
    format!("{header_b64}.{claims_b64}.fake_signature")
}

/// Unsigned token for `sub` with email `{sub}@example.com`.
pub fn create_test_jwt(sub: &str) -> String {
    unsigned_jwt(json!({
        "sub": sub,
        "iat": 1609459200,
        "exp": 9999999999i64,
        "iss": "test",
        "sid": "sess_123",
        "email": format!("{sub}@example.com"),
        "name": "Test User",
    }))
}

pub fn create_expired_jwt(sub: &str) -> String {
    unsigned_jwt(json!({
        "sub": sub,
        "iat": 1609459200,
        "exp": 1609462800,
        "iss": "test",
    }))
}

pub fn bearer(sub: &str) -> String {
    format!("Bearer {}", create_test_jwt(sub))
}

// =============================================================================
// Multipart
// =============================================================================

const BOUNDARY: &str = "echo-test-boundary-7MA4YWxkTrZu0gW";

#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    pub fn into_body(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

// =============================================================================
// Wired application
// =============================================================================

pub struct TestApp {
    pub state: AppState,
    pub rpc: MockRpc,
    pub voice_api: MockVoiceApi,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_mocks(MockRpc::standard().await, MockVoiceApi::spawn().await).await
    }

    pub async fn with_mocks(rpc: MockRpc, voice_api: MockVoiceApi) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = EchoDatabase::open(&dir.path().join("echo.redb")).unwrap();
        let ledger = SolanaClient::new(Cluster::Devnet, rpc.url()).unwrap();
        let voice = ElevenLabsClient::new(&VoiceSettings {
            api_key: Some(TEST_API_KEY.to_string()),
            base_url: voice_api.url(),
            ..VoiceSettings::default()
        })
        .unwrap();

        let state = AppState::new(db, ledger, voice).with_auth_config(AuthConfig {
            jwks: None,
            issuer: None,
            audience: None,
            allow_unverified_tokens: true,
            demo_sessions: true,
        });

        Self {
            state,
            rpc,
            voice_api,
            _dir: dir,
        }
    }

    /// Create (or fetch) the profile a `bearer(sub)` caller maps to.
    pub fn seed_profile(&self, sub: &str) -> UserProfile {
        let email = format!("{sub}@example.com");
        UserRepository::new(&self.state.db)
            .ensure(&crate::storage::NewUserProfile {
                auth0_id: sub,
                email: &email,
                name: Some("Test User"),
                picture: None,
            })
            .unwrap()
    }

    pub fn profile(&self, sub: &str) -> Option<UserProfile> {
        UserRepository::new(&self.state.db)
            .find_by_auth_id(sub)
            .unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        crate::api::router(self.state.clone())
            .oneshot(request)
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str, sub: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(sub) = sub {
            builder = builder.header(header::AUTHORIZATION, bearer(sub));
        }
        let response = self.send(builder.body(Body::empty()).unwrap()).await;
        split_json(response).await
    }

    pub async fn post_json(&self, uri: &str, sub: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(sub) = sub {
            builder = builder.header(header::AUTHORIZATION, bearer(sub));
        }
        let response = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        split_json(response).await
    }

    pub async fn post_empty(&self, uri: &str, sub: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("POST").uri(uri);
        if let Some(sub) = sub {
            builder = builder.header(header::AUTHORIZATION, bearer(sub));
        }
        let response = self.send(builder.body(Body::empty()).unwrap()).await;
        split_json(response).await
    }

    pub async fn post_multipart(&self, uri: &str, sub: Option<&str>, form: MultipartForm) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, form.content_type());
        if let Some(sub) = sub {
            builder = builder.header(header::AUTHORIZATION, bearer(sub));
        }
        self.send(builder.body(Body::from(form.into_body())).unwrap())
            .await
    }
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn split_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
