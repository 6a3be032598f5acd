//! Typed wrappers over [`Client::call`], one per built-in entity group.

use crate::client::Client;
use crate::error::{ClientError, Result};
use serde_json::Value;
use zabbix_rpc_core::{Entity, Graph, HistoryItem, Host, HostGroup, HostInterface, User};

impl Client {
    /// Call `<E::GROUP>.<action>` and narrow the result to `Vec<E>`.
    ///
    /// Fails with [`ClientError::ShapeMismatch`] when the registry maps the
    /// group to a different shape than `E`.
    pub async fn entities<E: Entity + Send>(&self, action: &str, params: Value) -> Result<Vec<E>> {
        let collection = self.call(E::GROUP, action, params).await?;
        E::from_collection(collection).map_err(|found| ClientError::ShapeMismatch {
            expected: E::SHAPE,
            found: found.shape(),
        })
    }

    /// `host.<action>`
    pub async fn hosts(&self, action: &str, params: Value) -> Result<Vec<Host>> {
        self.entities(action, params).await
    }

    /// `hostgroup.<action>`
    pub async fn host_groups(&self, action: &str, params: Value) -> Result<Vec<HostGroup>> {
        self.entities(action, params).await
    }

    /// `hostinterface.<action>`
    pub async fn host_interfaces(&self, action: &str, params: Value) -> Result<Vec<HostInterface>> {
        self.entities(action, params).await
    }

    /// `graph.<action>`
    pub async fn graphs(&self, action: &str, params: Value) -> Result<Vec<Graph>> {
        self.entities(action, params).await
    }

    /// `history.<action>`
    pub async fn history(&self, action: &str, params: Value) -> Result<Vec<HistoryItem>> {
        self.entities(action, params).await
    }

    /// `user.<action>`
    pub async fn users(&self, action: &str, params: Value) -> Result<Vec<User>> {
        self.entities(action, params).await
    }
}
