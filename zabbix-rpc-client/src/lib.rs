pub mod accessors;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;

pub use client::Client;
pub use config::{ClientConfig, LoginField};
pub use error::{ClientError, Result};
pub use tokio_util::sync::CancellationToken;

pub use zabbix_rpc_core::{
    CallId, Entity, EntityCollection, EntityTypeRegistry, FieldBag, Graph, HistoryItem, Host,
    HostGroup, HostInterface, Record, RpcError, Shape,
};
