use zabbix_rpc_core::{CodecError, RegistryError, RpcError, Shape, ShapeError};
use zabbix_rpc_transport::TransportError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Every way a session operation can fail.
///
/// Transport, envelope, protocol, unknown-group and result-shape failures
/// are kept apart so callers can react to each.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("envelope error: {0}")]
    Envelope(#[from] CodecError),

    #[error("API error {}: {}", .0.code, .0)]
    Protocol(RpcError),

    #[error("unknown entity group: {0}")]
    UnknownGroup(String),

    #[error("result of {method} does not match the {shape} shape: {source}")]
    ResultShape {
        method: String,
        shape: Shape,
        #[source]
        source: ShapeError,
    },

    #[error("unexpected result for {method}: {source}")]
    UnexpectedResult {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected {expected} entities, decoded {found}")]
    ShapeMismatch { expected: Shape, found: Shape },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<RegistryError> for ClientError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownGroup(group) => ClientError::UnknownGroup(group),
        }
    }
}

impl ClientError {
    /// The server's error object, for protocol failures.
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            ClientError::Protocol(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
