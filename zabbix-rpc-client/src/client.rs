// Zabbix API session
// Owns the auth token and call identifier for one endpoint and turns
// "<group>.<action>" calls into typed entity collections:
// - authenticate / deauthenticate / version
// - raw protocol calls (execute)
// - group dispatch through the entity type registry (call)

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use zabbix_rpc_core::{
    decode_response, encode_request, CallId, CallIdAllocator, EntityCollection,
    EntityTypeRegistry, Request, METHOD_LOGIN, METHOD_LOGOUT, METHOD_VERSION,
};
use zabbix_rpc_transport::{HttpTransport, HttpTransportConfig, RpcTransport, TransportError};

/// Whether a request carries the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMode {
    Session,
    Omit,
}

#[derive(Debug, Default)]
struct SessionState {
    auth: String,
}

/// A session against one Zabbix API endpoint.
///
/// Calls on one client are serialized: the session lock is held from id
/// allocation until the response has been decoded, so identifiers reach the
/// server in allocation order and token updates never race. Share a client
/// across tasks with `Arc<Client>`.
pub struct Client {
    config: ClientConfig,
    transport: Arc<dyn RpcTransport>,
    registry: Arc<EntityTypeRegistry>,
    ids: CallIdAllocator,
    state: Mutex<SessionState>,
}

impl Client {
    /// Create a client that talks HTTP to `config.url`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(HttpTransportConfig {
            timeout: config.timeout(),
        })?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over any transport, with the built-in registry
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            config,
            transport,
            registry: Arc::new(EntityTypeRegistry::builtin()),
            ids: CallIdAllocator::new(),
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Replace the entity type registry, e.g. with one that knows extra groups
    pub fn with_registry(mut self, registry: Arc<EntityTypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    pub fn registry(&self) -> &EntityTypeRegistry {
        &self.registry
    }

    /// The identifier the next outgoing call will use
    pub fn next_call_id(&self) -> CallId {
        self.ids.peek_next()
    }

    pub async fn auth_token(&self) -> Option<String> {
        let state = self.state.lock().await;
        if state.auth.is_empty() {
            None
        } else {
            Some(state.auth.clone())
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        !self.state.lock().await.auth.is_empty()
    }

    /// Log in with the configured credentials and keep the returned token.
    ///
    /// `user.login` is sent without `auth`; the user name goes under
    /// `config.login_field`. On failure the previous token, if any, is left
    /// in place.
    pub async fn authenticate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut params = serde_json::Map::new();
        params.insert(
            self.config.login_field.as_str().to_string(),
            Value::String(self.config.user.clone()),
        );
        params.insert(
            "password".to_string(),
            Value::String(self.config.password.clone()),
        );
        let params = Value::Object(params);

        let result = self
            .round_trip(&state, METHOD_LOGIN, params, AuthMode::Omit, None)
            .await?;
        let token: String =
            serde_json::from_value(result).map_err(|source| ClientError::UnexpectedResult {
                method: METHOD_LOGIN.to_string(),
                source,
            })?;

        state.auth = token;
        info!("Authenticated as {} against {}", self.config.user, self.config.url);
        Ok(())
    }

    /// Log out and clear the token. Not checked client-side for a prior login.
    pub async fn deauthenticate(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.round_trip(&state, METHOD_LOGOUT, json!({}), AuthMode::Session, None)
            .await?;

        state.auth.clear();
        info!("Logged out of {}", self.config.url);
        Ok(())
    }

    /// The API version string. Needs no login; carries the token like any
    /// other call when the session holds one.
    pub async fn version(&self) -> Result<String> {
        let state = self.state.lock().await;
        let result = self
            .round_trip(&state, METHOD_VERSION, json!({}), AuthMode::Session, None)
            .await?;
        serde_json::from_value(result).map_err(|source| ClientError::UnexpectedResult {
            method: METHOD_VERSION.to_string(),
            source,
        })
    }

    /// Call any method with the session token and return the untyped result
    pub async fn execute(&self, method: &str, params: Value) -> Result<Value> {
        let state = self.state.lock().await;
        self.round_trip(&state, method, params, AuthMode::Session, None)
            .await
    }

    /// Like [`Client::execute`], giving up when `cancel` fires
    pub async fn execute_cancellable(
        &self,
        method: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let state = self.lock_state(Some(cancel)).await?;
        self.round_trip(&state, method, params, AuthMode::Session, Some(cancel))
            .await
    }

    /// Call `<group>.<action>` and decode the result into the shape the
    /// registry holds for `group`.
    ///
    /// An unregistered group fails before anything is sent and without
    /// consuming an identifier.
    pub async fn call(&self, group: &str, action: &str, params: Value) -> Result<EntityCollection> {
        self.dispatch(group, action, params, None).await
    }

    /// Like [`Client::call`], giving up when `cancel` fires. The server may
    /// still process a request that was already sent.
    pub async fn call_cancellable(
        &self,
        group: &str,
        action: &str,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<EntityCollection> {
        self.dispatch(group, action, params, Some(cancel)).await
    }

    async fn dispatch(
        &self,
        group: &str,
        action: &str,
        params: Value,
        cancel: Option<&CancellationToken>,
    ) -> Result<EntityCollection> {
        let shape = self.registry.resolve(group)?;
        let method = format!("{}.{}", group, action);

        let result = {
            let state = self.lock_state(cancel).await?;
            self.round_trip(&state, &method, params, AuthMode::Session, cancel)
                .await?
        };

        let collection = shape
            .decode(result)
            .map_err(|source| ClientError::ResultShape {
                method: method.clone(),
                shape,
                source,
            })?;
        debug!("{} returned {} {} entities", method, collection.len(), shape);
        Ok(collection)
    }

    /// Waits for the session lock. A cancelled wait returns before any
    /// identifier is allocated.
    async fn lock_state(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<MutexGuard<'_, SessionState>> {
        match cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TransportError::Cancelled.into()),
                state = self.state.lock() => Ok(state),
            },
            None => Ok(self.state.lock().await),
        }
    }

    /// One request/response exchange. The caller holds the session lock.
    async fn round_trip(
        &self,
        state: &SessionState,
        method: &str,
        params: Value,
        auth: AuthMode,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value> {
        let id = self.ids.allocate();
        let token = match auth {
            AuthMode::Session => Some(state.auth.as_str()),
            AuthMode::Omit => None,
        };
        let request = Request::new(method, params, token, id);
        let body = encode_request(&request)?;

        debug!("Calling {} (id {})", method, id.as_u64());
        if method != METHOD_LOGIN {
            trace!("Request body: {}", String::from_utf8_lossy(&body));
        }

        let send = self.transport.send(&self.config.url, body);
        let raw = match cancel {
            Some(cancel) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(TransportError::Cancelled),
                    response = send => response,
                }
            }
            None => send.await,
        }?;
        trace!("Response body: {}", String::from_utf8_lossy(&raw));

        let response = decode_response(&raw)?;
        if let Some(error) = response.error() {
            warn!(
                "{} (id {}) failed with code {}: {}",
                method,
                id.as_u64(),
                error.code,
                error
            );
            return Err(ClientError::Protocol(error.clone()));
        }
        response.check_id(id)?;

        Ok(response.into_result()?)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("next_call_id", &self.ids.peek_next())
            .finish_non_exhaustive()
    }
}
