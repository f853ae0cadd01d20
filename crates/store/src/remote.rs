//! Client for a hosted realtime store speaking the Firebase RTDB REST
//! dialect: plain REST verbs for writes, one streaming
//! `text/event-stream` GET per subscription.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, RequestBuilder, Response};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, warn};
use url::Url;

use crate::{tree, RealtimeStore, Snapshot, StoreError};

pub struct HostedStore {
    http: Client,
    base: Url,
    auth: Option<String>,
}

impl HostedStore {
    pub fn new(base_url: &str, auth: Option<String>) -> Result<Self, StoreError> {
        let mut base = Url::parse(base_url)
            .map_err(|error| StoreError::Payload(format!("invalid store url '{base_url}': {error}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
            auth,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        let trimmed = path.trim_matches('/');
        let mut url = self
            .base
            .join(&format!("{trimmed}.json"))
            .map_err(|error| StoreError::Payload(format!("invalid store path '{path}': {error}")))?;
        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|error| StoreError::Transport(error.to_string()))?;
        if !response.status().is_success() {
            return Err(StoreError::Rejected(response.status().as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl RealtimeStore for HostedStore {
    async fn subscribe(&self, path: &str) -> Result<watch::Receiver<Snapshot>, StoreError> {
        let url = self.endpoint(path)?;
        let (tx, rx) = watch::channel(None);
        let http = self.http.clone();
        tokio::spawn(async move {
            match stream_subtree(http, url.clone(), tx).await {
                Ok(()) => debug!(%url, "hosted store stream closed"),
                Err(error) => warn!(%url, %error, "hosted store stream failed"),
            }
        });
        Ok(rx)
    }

    async fn put(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let url = self.endpoint(path)?;
        self.send(self.http.put(url).json(&value)).await?;
        Ok(())
    }

    async fn update(&self, changes: BTreeMap<String, Value>) -> Result<(), StoreError> {
        let url = self.endpoint("")?;
        let body: serde_json::Map<String, Value> = changes.into_iter().collect();
        self.send(self.http.patch(url).json(&Value::Object(body)))
            .await?;
        Ok(())
    }

    async fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let url = self.endpoint(path)?;
        let response = self.send(self.http.post(url).json(&value)).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|error| StoreError::Payload(error.to_string()))?;
        body.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Payload("push response missing generated key".into()))
    }
}

async fn stream_subtree(
    http: Client,
    url: Url,
    tx: watch::Sender<Snapshot>,
) -> Result<(), StoreError> {
    let response = http
        .get(url)
        .header(header::ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|error| StoreError::Transport(error.to_string()))?;
    if !response.status().is_success() {
        return Err(StoreError::Rejected(response.status().as_u16()));
    }

    let mut body = response.bytes_stream();
    let mut parser = EventParser::default();
    let mut cache = Value::Null;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|error| StoreError::Transport(error.to_string()))?;
        for event in parser.feed(&chunk) {
            if apply_event(&mut cache, &event)? {
                let next = if cache.is_null() {
                    None
                } else {
                    Some(cache.clone())
                };
                tx.send_if_modified(|current| {
                    if *current == next {
                        false
                    } else {
                        *current = next;
                        true
                    }
                });
            }
        }
        if tx.is_closed() {
            return Ok(());
        }
    }
    Ok(())
}

struct StreamEvent {
    name: String,
    data: String,
}

/// Frames in raw bytes and decodes only complete event blocks, so a
/// multi-byte character split across network chunks arrives intact.
#[derive(Default)]
struct EventParser {
    buffer: Vec<u8>,
}

impl EventParser {
    fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some((end, width)) = blank_line(&self.buffer) {
            let block = String::from_utf8_lossy(&self.buffer[..end]).into_owned();
            self.buffer.drain(..end + width);
            if let Some(event) = parse_block(block.trim_end()) {
                events.push(event);
            }
        }
        events
    }
}

/// Offset and width of the first blank line terminating an event block.
/// Accepts both LF and CRLF line endings.
fn blank_line(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buffer.len() {
        if buffer[i] == b'\n' {
            if buffer[i + 1] == b'\n' {
                return Some((i, 2));
            }
            if buffer[i + 1] == b'\r' && buffer.get(i + 2) == Some(&b'\n') {
                return Some((i, 3));
            }
        }
        i += 1;
    }
    None
}

fn parse_block(block: &str) -> Option<StreamEvent> {
    let mut name = None;
    let mut data = Vec::new();
    for line in block.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix("event:") {
            name = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.trim_start().to_string());
        }
    }
    Some(StreamEvent {
        name: name?,
        data: data.join("\n"),
    })
}

/// Applies one stream event to the per-subscription cache. Returns whether
/// the cache changed and a snapshot should be published.
fn apply_event(cache: &mut Value, event: &StreamEvent) -> Result<bool, StoreError> {
    match event.name.as_str() {
        "put" | "patch" => {}
        "keep-alive" => return Ok(false),
        "cancel" => {
            return Err(StoreError::Transport("stream cancelled by the store".into()));
        }
        "auth_revoked" => return Err(StoreError::Rejected(401)),
        other => {
            debug!(event = other, "ignoring unknown stream event");
            return Ok(false);
        }
    }

    let payload: Value = serde_json::from_str(&event.data)
        .map_err(|error| StoreError::Payload(format!("bad stream payload: {error}")))?;
    let path = payload
        .get("path")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Payload("stream payload missing path".into()))?
        .trim_matches('/')
        .to_string();
    let data = payload.get("data").cloned().unwrap_or(Value::Null);

    if event.name == "put" {
        tree::write(cache, &path, data);
    } else {
        match data {
            Value::Object(entries) => {
                for (child, value) in entries {
                    let child_path = if path.is_empty() {
                        child
                    } else {
                        format!("{path}/{child}")
                    };
                    tree::write(cache, &child_path, value);
                }
            }
            Value::Null => {}
            _ => {
                return Err(StoreError::Payload("patch payload must be an object".into()));
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
