//! JSON-RPC 2.0 envelopes as spoken by the Zabbix API.
//!
//! ```text
//! Request:  {"jsonrpc":"2.0","method":"host.get","params":{...},"auth":"...","id":1}
//! Response: {"jsonrpc":"2.0","result":...,"error":{"code":..,"message":..,"data":..},"id":1}
//! ```
//!
//! `auth` is left out of the request entirely when the session has no token;
//! `user.login` is rejected by some server versions when an empty `auth` is present.

use crate::error::RpcError;
use crate::ids::CallId;
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol method used by `authenticate`.
pub const METHOD_LOGIN: &str = "user.login";
/// Protocol method used by `deauthenticate`.
pub const METHOD_LOGOUT: &str = "user.logout";
/// Protocol method returning the API version; callable without a token.
pub const METHOD_VERSION: &str = "apiinfo.version";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed envelope: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("unsupported jsonrpc version {0:?}")]
    UnsupportedVersion(String),
    #[error("response id {found} does not match request id {expected}")]
    IdMismatch { expected: CallId, found: CallId },
    #[error("response carries neither a result nor an error")]
    MissingResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    pub id: CallId,
}

impl Request {
    /// Builds a request envelope. An empty `auth` is dropped.
    pub fn new(method: impl Into<String>, params: Value, auth: Option<&str>, id: CallId) -> Self {
        Request {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            auth: auth.filter(|token| !token.is_empty()).map(str::to_string),
            id,
        }
    }
}

/// A response envelope. `result` is `None` only when the member is absent;
/// an explicit `"result": null` decodes to `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(
        default,
        deserialize_with = "present_member",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default)]
    pub id: Option<CallId>,
}

fn present_member<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl Response {
    pub fn success(id: CallId, result: Value) -> Self {
        Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            error: None,
            result: Some(result),
            id: Some(id),
        }
    }

    pub fn failure(id: Option<CallId>, error: RpcError) -> Self {
        Response {
            jsonrpc: JSONRPC_VERSION.to_string(),
            error: Some(error),
            result: None,
            id,
        }
    }

    /// The error object, if it carries a non-zero code.
    pub fn error(&self) -> Option<&RpcError> {
        self.error.as_ref().filter(|err| err.is_present())
    }

    /// Checks the echoed id against the one that was sent. A missing or null
    /// id is accepted.
    pub fn check_id(&self, expected: CallId) -> Result<(), CodecError> {
        match self.id {
            Some(found) if found != expected => Err(CodecError::IdMismatch { expected, found }),
            _ => Ok(()),
        }
    }

    /// The success payload. Fails when the envelope has no `result` member.
    pub fn into_result(self) -> Result<Value, CodecError> {
        self.result.ok_or(CodecError::MissingResult)
    }
}

pub fn encode_request(request: &Request) -> Result<Bytes, CodecError> {
    let json = serde_json::to_vec(request).map_err(CodecError::Encode)?;
    Ok(Bytes::from(json))
}

pub fn decode_request(data: &[u8]) -> Result<Request, CodecError> {
    let request: Request = serde_json::from_slice(data).map_err(CodecError::Decode)?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(CodecError::UnsupportedVersion(request.jsonrpc));
    }
    Ok(request)
}

pub fn encode_response(response: &Response) -> Result<Bytes, CodecError> {
    let json = serde_json::to_vec(response).map_err(CodecError::Encode)?;
    Ok(Bytes::from(json))
}

/// Decodes a response envelope. Bodies that are not a JSON object of the
/// envelope's shape fail instead of producing an empty response: `jsonrpc`
/// is required, and so is `result` unless a non-zero error is present.
pub fn decode_response(data: &[u8]) -> Result<Response, CodecError> {
    let response: Response = serde_json::from_slice(data).map_err(CodecError::Decode)?;
    if response.jsonrpc != JSONRPC_VERSION {
        return Err(CodecError::UnsupportedVersion(response.jsonrpc));
    }
    if response.result.is_none() && response.error().is_none() {
        return Err(CodecError::MissingResult);
    }
    Ok(response)
}
