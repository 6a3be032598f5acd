pub mod ids;
pub mod envelope;
pub mod error;
pub mod entity;
pub mod registry;
#[cfg(feature = "validation")]
pub mod validate;

pub use ids::{CallId, CallIdAllocator};
pub use envelope::{
    decode_request, decode_response, encode_request, encode_response, CodecError, Request,
    Response, JSONRPC_VERSION, METHOD_LOGIN, METHOD_LOGOUT, METHOD_VERSION,
};
pub use error::RpcError;
pub use entity::{
    Entity, EntityCollection, FieldBag, Graph, HistoryItem, Host, HostGroup, HostInterface,
    Record, Shape, ShapeError, User,
};
pub use registry::{EntityTypeRegistry, RegistryError, BUILTIN_GROUPS};
