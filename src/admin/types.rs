//! Admin API Data Types
//!
//! Wire formats for requests and responses, plus the JSON body extractor
//! used by every POST handler.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::admin::error::AdminError;
use crate::netplan::ProposedNetworkConfig;

/// Prefix length used when a request omits `cidr`
const DEFAULT_CIDR: &str = "24";

/// `POST /api/auth`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub token: String,
}

/// `POST /api/network`
///
/// Every field is optional on the wire; absent or null values take the
/// defaults of an empty proposal.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkUpdateRequest {
    pub dhcp: bool,
    pub ip: Option<String>,
    /// Accepted as a JSON string or number
    #[serde(deserialize_with = "string_or_number")]
    pub cidr: Option<String>,
    pub gateway: Option<String>,
    pub dns1: Option<String>,
    pub dns2: Option<String>,
    pub hostname: Option<String>,
    pub interface: Option<String>,
}

impl From<NetworkUpdateRequest> for ProposedNetworkConfig {
    fn from(req: NetworkUpdateRequest) -> Self {
        Self {
            dhcp: req.dhcp,
            ip: req.ip.unwrap_or_default(),
            cidr: req.cidr.unwrap_or_else(|| DEFAULT_CIDR.to_string()),
            gateway: req.gateway.unwrap_or_default(),
            dns1: req.dns1.unwrap_or_default(),
            dns2: req.dns2.unwrap_or_default(),
            hostname: req.hostname.unwrap_or_default(),
            interface: req.interface,
        }
    }
}

/// `POST /api/hostname`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostnameRequest {
    #[serde(default)]
    pub hostname: String,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Reply to a successful network update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkUpdateResponse {
    pub ok: bool,
    /// New static address, or `dhcp`
    pub new_ip: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostnameResponse {
    pub ok: bool,
    pub hostname: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}

/// JSON body extractor with the API's own rejections
///
/// Malformed JSON becomes `400 {"error": "Invalid request"}` and an
/// oversized body `413`, instead of axum's plain-text rejections. The
/// `Content-Type` header is not required.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AdminError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AdminError::PayloadTooLarge
            } else {
                AdminError::BadRequest("Invalid request".to_string())
            }
        })?;

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|_| AdminError::BadRequest("Invalid request".to_string()))
    }
}
