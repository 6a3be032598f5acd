pub mod transport;
pub mod http;

pub use transport::{RpcTransport, TransportError};
pub use http::{HttpTransport, HttpTransportConfig, CONTENT_TYPE_JSON_RPC};
