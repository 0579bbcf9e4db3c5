// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`AppConfig`] loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the embedded database | `/data` |
//! | `ECHO_DATABASE_PATH` | Database file | `$DATA_DIR/echo.redb` |
//! | `AUTH0_ISSUER_BASE_URL` | Auth0 tenant URL, enables JWKS verification | Required for production |
//! | `AUTH0_JWKS_URL` | JWKS endpoint override | `<issuer>/.well-known/jwks.json` |
//! | `AUTH0_AUDIENCE` | Expected JWT audience claim | Optional |
//! | `AUTH_ALLOW_UNVERIFIED_TOKENS` | Accept unsigned tokens when no issuer is set | `false` |
//! | `ECHO_DEMO_SESSIONS` | Allow session-id identities on personality save | `true` |
//! | `SOLANA_CLUSTER` | `mainnet-beta`, `testnet` or `devnet` | `devnet` |
//! | `SOLANA_RPC_URL` | JSON-RPC endpoint override | cluster default |
//! | `ELEVENLABS_API_KEY` | Voice API credential | Required for voice endpoints |
//! | `ELEVENLABS_BASE_URL` | Voice API base URL | `https://api.elevenlabs.io/v1` |
//! | `ELEVENLABS_MODEL_ID` | Speech synthesis model | `eleven_multilingual_v2` |
//! | `VOICE_MAX_UPLOAD_BYTES` | Voice sample upload cap | `10485760` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files, enables HTTPS | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{
    net::SocketAddr,
    path::PathBuf,
    str::FromStr,
};

use crate::blockchain::Cluster;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DATABASE_PATH_ENV: &str = "ECHO_DATABASE_PATH";

pub const AUTH0_ISSUER_ENV: &str = "AUTH0_ISSUER_BASE_URL";
pub const AUTH0_JWKS_URL_ENV: &str = "AUTH0_JWKS_URL";
pub const AUTH0_AUDIENCE_ENV: &str = "AUTH0_AUDIENCE";

/// Accept tokens without signature verification when no issuer is configured.
///
/// Local development only. Without an issuer and without this flag every
/// authenticated request is rejected.
pub const ALLOW_UNVERIFIED_TOKENS_ENV: &str = "AUTH_ALLOW_UNVERIFIED_TOKENS";
pub const DEMO_SESSIONS_ENV: &str = "ECHO_DEMO_SESSIONS";

pub const SOLANA_CLUSTER_ENV: &str = "SOLANA_CLUSTER";
pub const SOLANA_RPC_URL_ENV: &str = "SOLANA_RPC_URL";

pub const ELEVENLABS_API_KEY_ENV: &str = "ELEVENLABS_API_KEY";
pub const ELEVENLABS_BASE_URL_ENV: &str = "ELEVENLABS_BASE_URL";
pub const ELEVENLABS_MODEL_ID_ENV: &str = "ELEVENLABS_MODEL_ID";
pub const VOICE_MAX_UPLOAD_BYTES_ENV: &str = "VOICE_MAX_UPLOAD_BYTES";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DATABASE_FILE_NAME: &str = "echo.redb";
pub const DEFAULT_ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io/v1";
pub const DEFAULT_ELEVENLABS_MODEL_ID: &str = "eleven_multilingual_v2";
pub const DEFAULT_VOICE_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{present} is set but {missing} is not")]
    Incomplete {
        present: &'static str,
        missing: &'static str,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Identity provider settings.
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    pub issuer: Option<String>,
    pub jwks_url: Option<String>,
    pub audience: Option<String>,
    pub allow_unverified_tokens: bool,
    pub demo_sessions: bool,
}

/// Voice API settings.
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_id: String,
    pub max_upload_bytes: usize,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_ELEVENLABS_BASE_URL.to_string(),
            model_id: DEFAULT_ELEVENLABS_MODEL_ID.to_string(),
            max_upload_bytes: DEFAULT_VOICE_MAX_UPLOAD_BYTES,
        }
    }
}

/// PEM certificate chain and private key for HTTPS.
#[derive(Debug, Clone)]
pub struct TlsSettings {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Full runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub log_format: LogFormat,
    pub auth: AuthSettings,
    pub cluster: Cluster,
    pub solana_rpc_url: String,
    pub voice: VoiceSettings,
    pub tls: Option<TlsSettings>,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => parse_value::<u16>(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                reason: e.to_string(),
            })?;

        let data_dir = get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let database_path = get(DATABASE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(data_dir).join(DATABASE_FILE_NAME));

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let issuer = get(AUTH0_ISSUER_ENV).map(|v| normalize_issuer(&v));
        let jwks_url = get(AUTH0_JWKS_URL_ENV).or_else(|| {
            issuer
                .as_ref()
                .map(|iss| format!("{}/.well-known/jwks.json", iss.trim_end_matches('/')))
        });
        let auth = AuthSettings {
            issuer,
            jwks_url,
            audience: get(AUTH0_AUDIENCE_ENV),
            allow_unverified_tokens: parse_flag(
                ALLOW_UNVERIFIED_TOKENS_ENV,
                get(ALLOW_UNVERIFIED_TOKENS_ENV),
                false,
            )?,
            demo_sessions: parse_flag(DEMO_SESSIONS_ENV, get(DEMO_SESSIONS_ENV), true)?,
        };

        let cluster = match get(SOLANA_CLUSTER_ENV) {
            Some(raw) => Cluster::from_str(&raw).map_err(|reason| ConfigError::Invalid {
                name: SOLANA_CLUSTER_ENV,
                reason,
            })?,
            None => Cluster::Devnet,
        };
        let solana_rpc_url = get(SOLANA_RPC_URL_ENV).unwrap_or_else(|| cluster.rpc_url().to_string());
        url::Url::parse(&solana_rpc_url).map_err(|e| ConfigError::Invalid {
            name: SOLANA_RPC_URL_ENV,
            reason: e.to_string(),
        })?;

        let voice = VoiceSettings {
            api_key: get(ELEVENLABS_API_KEY_ENV),
            base_url: get(ELEVENLABS_BASE_URL_ENV)
                .unwrap_or_else(|| DEFAULT_ELEVENLABS_BASE_URL.to_string()),
            model_id: get(ELEVENLABS_MODEL_ID_ENV)
                .unwrap_or_else(|| DEFAULT_ELEVENLABS_MODEL_ID.to_string()),
            max_upload_bytes: match get(VOICE_MAX_UPLOAD_BYTES_ENV) {
                Some(raw) => parse_value::<usize>(VOICE_MAX_UPLOAD_BYTES_ENV, &raw)?,
                None => DEFAULT_VOICE_MAX_UPLOAD_BYTES,
            },
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsSettings {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: TLS_CERT_PATH_ENV,
                    missing: TLS_KEY_PATH_ENV,
                })
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: TLS_KEY_PATH_ENV,
                    missing: TLS_CERT_PATH_ENV,
                })
            }
            (None, None) => None,
        };

        Ok(Self {
            bind_addr,
            database_path,
            log_format,
            auth,
            cluster,
            solana_rpc_url,
            voice,
            tls,
        })
    }
}

/// Auth0 issuers are compared with a trailing slash.
fn normalize_issuer(raw: &str) -> String {
    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    format!("{}/", with_scheme.trim_end_matches('/'))
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        reason: e.to_string(),
    })
}

fn parse_flag(name: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got `{other}`"),
        }),
    }
}
