use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header as http_header, Method, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::json;
use tokio::time::timeout;

use super::*;

type RecordedRequests = Arc<StdMutex<Vec<(String, String, Value)>>>;

#[derive(Clone)]
struct MockState {
    requests: RecordedRequests,
    stream_body: Arc<String>,
}

async fn handle(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> axum::response::Response {
    if method == Method::GET {
        return (
            [(http_header::CONTENT_TYPE, "text/event-stream")],
            state.stream_body.as_str().to_string(),
        )
            .into_response();
    }

    let value: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    state
        .requests
        .lock()
        .expect("mock lock")
        .push((method.to_string(), uri.to_string(), value));

    if method == Method::POST {
        return Json(json!({ "name": "gen-123" })).into_response();
    }
    Json(Value::Null).into_response()
}

async fn mock_store(stream_body: &str) -> (String, RecordedRequests) {
    let requests: RecordedRequests = Arc::default();
    let state = MockState {
        requests: Arc::clone(&requests),
        stream_body: Arc::new(stream_body.to_string()),
    };
    let app = Router::new().fallback(handle).with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    (format!("http://{addr}"), requests)
}

#[tokio::test]
async fn put_targets_the_path_endpoint_with_auth() {
    let (base, requests) = mock_store("").await;
    let store = HostedStore::new(&base, Some("secret".into())).expect("store");

    store.put("votingAllowed", json!(true)).await.expect("put");

    let recorded = requests.lock().expect("mock lock");
    assert_eq!(
        *recorded,
        vec![(
            "PUT".to_string(),
            "/votingAllowed.json?auth=secret".to_string(),
            json!(true),
        )]
    );
}

#[tokio::test]
async fn update_patches_the_root_with_absolute_paths() {
    let (base, requests) = mock_store("").await;
    let store = HostedStore::new(&base, None).expect("store");

    let changes = BTreeMap::from([
        ("participants/p1/votes".to_string(), json!(0)),
        ("participants/p2/votes".to_string(), json!(0)),
    ]);
    store.update(changes).await.expect("update");

    let recorded = requests.lock().expect("mock lock");
    assert_eq!(recorded.len(), 1);
    let (method, uri, body) = &recorded[0];
    assert_eq!(method, "PATCH");
    assert_eq!(uri, "/.json");
    assert_eq!(
        *body,
        json!({ "participants/p1/votes": 0, "participants/p2/votes": 0 })
    );
}

#[tokio::test]
async fn push_returns_the_store_assigned_key() {
    let (base, requests) = mock_store("").await;
    let store = HostedStore::new(&base, None).expect("store");

    let key = store
        .push("participants", json!({ "name": "Ada" }))
        .await
        .expect("push");

    assert_eq!(key, "gen-123");
    let recorded = requests.lock().expect("mock lock");
    assert_eq!(recorded[0].0, "POST");
    assert_eq!(recorded[0].1, "/participants.json");
}

#[tokio::test]
async fn subscribe_applies_put_and_patch_events() {
    let stream = concat!(
        "event: put\n",
        "data: {\"path\":\"/\",\"data\":{\"p1\":{\"id\":\"p1\",\"votes\":3}}}\n",
        "\n",
        "event: keep-alive\n",
        "data: null\n",
        "\n",
        "event: patch\n",
        "data: {\"path\":\"/\",\"data\":{\"p2\":{\"id\":\"p2\",\"votes\":5}}}\n",
        "\n",
        "event: put\n",
        "data: {\"path\":\"/p1/votes\",\"data\":4}\n",
        "\n",
    );
    let (base, _requests) = mock_store(stream).await;
    let store = HostedStore::new(&base, None).expect("store");

    let mut rx = store.subscribe("participants").await.expect("subscribe");
    let deadline = timeout(Duration::from_secs(5), async {
        loop {
            if let Some(snapshot) = rx.borrow_and_update().clone() {
                if snapshot["p1"]["votes"] == json!(4) && snapshot["p2"]["votes"] == json!(5) {
                    return snapshot;
                }
            }
            rx.changed().await.expect("stream task alive");
        }
    })
    .await;
    let snapshot = deadline.expect("snapshot should converge");
    assert_eq!(snapshot["p1"]["id"], json!("p1"));
}

#[test]
fn event_parser_handles_split_chunks() {
    let mut parser = EventParser::default();
    assert!(parser.feed(b"event: put\ndata: {\"pa").is_empty());
    let events = parser.feed(b"th\":\"/\",\"data\":null}\n\nevent: keep-alive\ndata: null\n\n");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name, "put");
    assert_eq!(events[0].data, "{\"path\":\"/\",\"data\":null}");
    assert_eq!(events[1].name, "keep-alive");
}

#[test]
fn event_parser_keeps_multibyte_characters_split_across_chunks() {
    let mut parser = EventParser::default();
    let payload = "event: put\ndata: {\"path\":\"/p1/name\",\"data\":\"Médiathèque\"}\n\n";
    let bytes = payload.as_bytes();
    // Cut inside the two-byte 'é'.
    let split = payload.find('é').expect("accented char") + 1;

    assert!(parser.feed(&bytes[..split]).is_empty());
    let events = parser.feed(&bytes[split..]);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].data,
        "{\"path\":\"/p1/name\",\"data\":\"Médiathèque\"}"
    );
}

#[test]
fn event_parser_frames_crlf_delimited_streams() {
    let mut parser = EventParser::default();
    let events = parser.feed(
        b"event: put\r\ndata: {\"path\":\"/\",\"data\":1}\r\n\r\nevent: keep-alive\r\ndata: null\r\n\r\n",
    );
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].name, "put");
    assert_eq!(events[0].data, "{\"path\":\"/\",\"data\":1}");
    assert_eq!(events[1].name, "keep-alive");
}

#[test]
fn put_event_at_root_replaces_the_cache() {
    let mut cache = json!({ "stale": true });
    let event = StreamEvent {
        name: "put".into(),
        data: "{\"path\":\"/\",\"data\":{\"fresh\":1}}".into(),
    };
    assert!(apply_event(&mut cache, &event).expect("apply"));
    assert_eq!(cache, json!({ "fresh": 1 }));

    let clear = StreamEvent {
        name: "put".into(),
        data: "{\"path\":\"/\",\"data\":null}".into(),
    };
    assert!(apply_event(&mut cache, &clear).expect("apply"));
    assert!(cache.is_null());
}
