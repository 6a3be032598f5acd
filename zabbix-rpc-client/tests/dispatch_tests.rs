// Session bookkeeping tests over an in-memory transport:
// identifier sequencing, auth field handling, concurrency, cancellation and
// the separation of fault classes.

use async_trait::async_trait;
use bytes::Bytes;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zabbix_rpc_client::{
    CallId, CancellationToken, Client, ClientConfig, ClientError, EntityCollection,
    EntityTypeRegistry, Shape,
};
use zabbix_rpc_core::CodecError;
use zabbix_rpc_transport::{RpcTransport, TransportError};

type Responder = dyn Fn(&Value) -> Result<Value, TransportError> + Send + Sync;

/// Records every request body and answers from a closure.
struct RecordingTransport {
    requests: Mutex<Vec<Value>>,
    respond: Box<Responder>,
}

impl RecordingTransport {
    fn new(
        respond: impl Fn(&Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    fn ids(&self) -> Vec<u64> {
        self.requests()
            .iter()
            .map(|r| r["id"].as_u64().unwrap())
            .collect()
    }
}

#[async_trait]
impl RpcTransport for RecordingTransport {
    async fn send(&self, _url: &str, body: Bytes) -> Result<Bytes, TransportError> {
        let request: Value = serde_json::from_slice(&body).unwrap();
        self.requests.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;
        let response = (self.respond)(&request)?;
        Ok(Bytes::from(serde_json::to_vec(&response).unwrap()))
    }
}

/// Never answers.
struct HangingTransport;

#[async_trait]
impl RpcTransport for HangingTransport {
    async fn send(&self, _url: &str, _body: Bytes) -> Result<Bytes, TransportError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(TransportError::Cancelled)
    }
}

fn ok(request: &Value, result: Value) -> Result<Value, TransportError> {
    Ok(json!({"jsonrpc": "2.0", "result": result, "id": request["id"]}))
}

fn api_error(request: &Value, code: i64) -> Result<Value, TransportError> {
    Ok(json!({
        "jsonrpc": "2.0",
        "error": {"code": code, "message": "Invalid params.", "data": "No permissions."},
        "id": request["id"]
    }))
}

/// Login hands out "abc123"; everything else succeeds with an empty list.
fn zabbix(request: &Value) -> Result<Value, TransportError> {
    match request["method"].as_str() {
        Some("user.login") => ok(request, json!("abc123")),
        Some("user.logout") => ok(request, json!(true)),
        Some("apiinfo.version") => ok(request, json!("7.0.0")),
        _ => ok(request, json!([])),
    }
}

fn client(transport: Arc<dyn RpcTransport>) -> Client {
    Client::with_transport(
        ClientConfig::new("http://zabbix.test/api_jsonrpc.php", "Admin", "zabbix"),
        transport,
    )
}

#[tokio::test]
async fn test_login_omits_auth_and_later_calls_carry_it() {
    let transport = RecordingTransport::new(zabbix);
    let client = client(transport.clone());

    client.call("host", "get", json!({})).await.unwrap();
    client.authenticate().await.unwrap();
    client.call("graph", "get", json!({})).await.unwrap();
    let version = client.version().await.unwrap();
    client.deauthenticate().await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 5);

    // Unauthenticated call: no auth member at all
    assert!(requests[0].get("auth").is_none());
    assert_eq!(requests[1]["method"], "user.login");
    assert!(requests[1].get("auth").is_none());
    assert_eq!(requests[1]["params"], json!({"user": "Admin", "password": "zabbix"}));
    assert_eq!(requests[2]["method"], "graph.get");
    assert_eq!(requests[2]["auth"], "abc123");
    assert_eq!(version, "7.0.0");
    assert_eq!(requests[3]["method"], "apiinfo.version");
    assert_eq!(requests[3]["auth"], "abc123");
    assert_eq!(requests[4]["method"], "user.logout");
    assert_eq!(requests[4]["auth"], "abc123");
    assert_eq!(requests[4]["params"], json!({}));

    assert_eq!(client.auth_token().await, None);
}

#[tokio::test]
async fn test_ids_have_no_gaps_across_failures() {
    let transport = RecordingTransport::new(|request| match request["method"].as_str() {
        Some("graph.get") => Err(TransportError::Status {
            status: 502,
            body: "Bad Gateway".into(),
        }),
        Some("history.get") => api_error(request, -32602),
        Some("user.get") => ok(request, json!("not a list")),
        _ => zabbix(request),
    });
    let client = client(transport.clone());

    assert!(client.authenticate().await.is_ok());
    assert!(client.call("graph", "get", json!({})).await.unwrap_err().is_transport());
    assert!(matches!(
        client.call("history", "get", json!({})).await,
        Err(ClientError::Protocol(_))
    ));
    assert!(matches!(
        client.call("user", "get", json!({})).await,
        Err(ClientError::ResultShape { .. })
    ));
    assert!(client.call("hostgroup", "get", json!({})).await.is_ok());
    assert!(matches!(
        client.call("trigger", "get", json!({})).await,
        Err(ClientError::UnknownGroup(_))
    ));
    assert!(client.call("hostinterface", "get", json!({})).await.is_ok());

    assert_eq!(transport.ids(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(client.next_call_id(), CallId::new(6));
}

#[tokio::test]
async fn test_unknown_group_sends_nothing() {
    let transport = RecordingTransport::new(zabbix);
    let client = client(transport.clone());

    let err = client.call("nonexistent", "get", json!({})).await.unwrap_err();
    assert!(matches!(err, ClientError::UnknownGroup(ref g) if g == "nonexistent"));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_echoed_id_mismatch_is_envelope_error() {
    let transport =
        RecordingTransport::new(|_| Ok(json!({"jsonrpc": "2.0", "result": [], "id": 99})));
    let client = client(transport);

    let err = client.call("host", "get", json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Envelope(CodecError::IdMismatch { expected, found })
            if expected == CallId::new(0) && found == CallId::new(99)
    ));
}

#[tokio::test]
async fn test_non_string_login_result_keeps_session_unauthenticated() {
    let transport = RecordingTransport::new(|request| ok(request, json!({"sessionid": "x"})));
    let client = client(transport);

    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::UnexpectedResult { ref method, .. } if method == "user.login"
    ));
    assert!(!client.is_authenticated().await);
}

#[tokio::test]
async fn test_concurrent_calls_are_serialized() {
    let transport = RecordingTransport::new(zabbix);
    let client = Arc::new(client(transport.clone()));
    client.authenticate().await.unwrap();

    let calls = (0..16).map(|i| {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            let group = if i % 2 == 0 { "host" } else { "user" };
            client.call(group, "get", json!({"limit": i})).await
        })
    });
    for result in futures::future::join_all(calls).await {
        assert!(result.unwrap().is_ok());
    }

    // Sent in allocation order, each id exactly once
    let ids = transport.ids();
    assert_eq!(ids, (0..17).collect::<Vec<u64>>());
    assert!(transport.requests()[1..].iter().all(|r| r["auth"] == "abc123"));
}

#[tokio::test]
async fn test_cancellation_stops_waiting() {
    let client = Arc::new(client(Arc::new(HangingTransport)));
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        client.call_cancellable("host", "get", json!({}), &cancel),
    )
    .await
    .expect("cancelled call should return promptly");

    assert!(matches!(result, Err(ClientError::Transport(TransportError::Cancelled))));
    assert_eq!(client.next_call_id(), CallId::new(1));
}

#[tokio::test]
async fn test_cancelled_call_does_not_wait_for_session_lock() {
    let client = Arc::new(client(Arc::new(HangingTransport)));
    let in_flight = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.call("host", "get", json!({})).await })
    };
    // The first call holds the session lock once it has taken an id
    while client.next_call_id() == CallId::new(0) {
        tokio::task::yield_now().await;
    }

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        client.call_cancellable("graph", "get", json!({}), &cancel),
    )
    .await
    .expect("queued call should give up when cancelled");
    assert!(matches!(result, Err(ClientError::Transport(TransportError::Cancelled))));

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        client.execute_cancellable("graph.get", json!({}), &cancel),
    )
    .await
    .expect("queued call should give up when cancelled");
    assert!(matches!(result, Err(ClientError::Transport(TransportError::Cancelled))));

    // Neither queued call took an identifier
    assert_eq!(client.next_call_id(), CallId::new(1));
    in_flight.abort();
}

#[tokio::test]
async fn test_bodies_without_envelope_members_are_envelope_errors() {
    let transport = RecordingTransport::new(|request| match request["method"].as_str() {
        Some("user.login") => ok(request, json!("abc123")),
        Some("user.get") => Ok(json!({"jsonrpc": "2.0", "id": request["id"]})),
        Some("graph.get") => Ok(json!({"status": "ok"})),
        _ => Ok(json!({})),
    });
    let client = client(transport);
    client.authenticate().await.unwrap();

    let err = client.deauthenticate().await.unwrap_err();
    assert!(matches!(err, ClientError::Envelope(CodecError::Decode(_))));
    assert_eq!(client.auth_token().await.as_deref(), Some("abc123"));

    assert!(matches!(
        client.execute("host.get", json!({})).await,
        Err(ClientError::Envelope(CodecError::Decode(_)))
    ));
    assert!(matches!(
        client.execute("graph.get", json!({})).await,
        Err(ClientError::Envelope(CodecError::Decode(_)))
    ));
    assert!(matches!(
        client.call("host", "get", json!({})).await,
        Err(ClientError::Envelope(CodecError::Decode(_)))
    ));
    assert!(matches!(
        client.call("user", "get", json!({})).await,
        Err(ClientError::Envelope(CodecError::MissingResult))
    ));
}

#[tokio::test]
async fn test_execute_returns_raw_result() {
    let transport = RecordingTransport::new(|request| ok(request, json!({"hostids": ["10106"]})));
    let client = client(transport.clone());

    let result = client
        .execute("host.create", json!({"host": "web02", "groups": [{"groupid": "2"}]}))
        .await
        .unwrap();
    assert_eq!(result, json!({"hostids": ["10106"]}));
    assert_eq!(transport.requests()[0]["method"], "host.create");

    let cancel = CancellationToken::new();
    let result = client
        .execute_cancellable("host.delete", json!(["10106"]), &cancel)
        .await
        .unwrap();
    assert_eq!(result, json!({"hostids": ["10106"]}));
}

#[tokio::test]
async fn test_extended_registry() {
    let transport = RecordingTransport::new(|request| {
        ok(request, json!([{"itemid": "23296", "name": "CPU load", "value_type": "0"}]))
    });
    let registry = Arc::new(EntityTypeRegistry::builtin());
    registry.register("item", Shape::Record);
    let client = client(transport).with_registry(registry);

    match client.call("item", "get", json!({})).await.unwrap() {
        EntityCollection::Records(items) => assert_eq!(items[0].get_str("name"), Some("CPU load")),
        other => panic!("expected records, got {:?}", other),
    }
}

#[tokio::test]
async fn test_accessor_fails_fast_on_shape_mismatch() {
    let transport = RecordingTransport::new(zabbix);
    let registry = Arc::new(EntityTypeRegistry::builtin());
    registry.register("host", Shape::Record);
    let client = client(transport).with_registry(registry);

    let err = client.hosts("get", json!({})).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::ShapeMismatch {
            expected: Shape::Host,
            found: Shape::Record
        }
    ));
}

#[tokio::test]
async fn test_typed_accessors() {
    let transport = RecordingTransport::new(|request| match request["method"].as_str() {
        Some("history.get") => ok(
            request,
            json!([{"clock": "100", "value": "5.0", "itemid": "1001"}]),
        ),
        _ => ok(request, json!([{"id": "1"}])),
    });
    let client = client(transport.clone());

    assert_eq!(client.hosts("get", json!({})).await.unwrap().len(), 1);
    assert_eq!(client.host_groups("get", json!({})).await.unwrap().len(), 1);
    assert_eq!(client.host_interfaces("get", json!({})).await.unwrap().len(), 1);
    assert_eq!(client.graphs("get", json!({})).await.unwrap().len(), 1);
    assert_eq!(client.users("get", json!({})).await.unwrap().len(), 1);
    assert_eq!(client.history("get", json!({})).await.unwrap()[0].itemid, "1001");

    let methods: Vec<String> = transport
        .requests()
        .iter()
        .map(|r| r["method"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        methods,
        vec![
            "host.get",
            "hostgroup.get",
            "hostinterface.get",
            "graph.get",
            "user.get",
            "history.get"
        ]
    );
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Success,
    HttpFailure,
    ApiError,
}

proptest! {
    #[test]
    fn ids_strictly_increase_for_any_outcome_sequence(
        outcomes in prop::collection::vec(
            prop_oneof![
                Just(Outcome::Success),
                Just(Outcome::HttpFailure),
                Just(Outcome::ApiError)
            ],
            1..40,
        )
    ) {
        let script = Arc::new(outcomes.clone());
        let transport = RecordingTransport::new(move |request| {
            let index = request["id"].as_u64().unwrap() as usize;
            match script[index] {
                Outcome::Success => ok(request, json!([])),
                Outcome::HttpFailure => Err(TransportError::Status {
                    status: 503,
                    body: String::new(),
                }),
                Outcome::ApiError => api_error(request, 17),
            }
        });
        let client = client(transport.clone());

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            for _ in &outcomes {
                let _ = client.call("host", "get", json!({})).await;
            }
        });

        let expected: Vec<u64> = (0..outcomes.len() as u64).collect();
        prop_assert_eq!(transport.ids(), expected);
        prop_assert_eq!(client.next_call_id().as_u64(), outcomes.len() as u64);
    }
}
