//! Push channel sources delivering newly created notifications.
//!
//! The server publishes each notification as a server-sent event whose
//! `data` field is the notification JSON. [`ChannelPushSource`] feeds the
//! same stream from inside the process.

use crate::client::{check_status, transport, ApiClient};
use async_trait::async_trait;
use crm_core::types::Notification;
use crm_core::{CrmError, CrmResult};
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::Method;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Stream of pushed notifications. Items are errors for undecodable frames
/// or transport hiccups; the stream ends when the channel closes.
pub type PushStream = BoxStream<'static, CrmResult<Notification>>;

#[async_trait]
pub trait PushSource: Send + Sync {
    /// Open a subscription. Dropping the returned stream releases it.
    async fn subscribe(&self) -> CrmResult<PushStream>;
}

// ─── Server-sent events ────────────────────────────────────────────────────

/// One decoded SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental `text/event-stream` decoder. Feed it arbitrary chunks; it
/// returns every event completed by the chunk.
///
/// Bytes are buffered until a full line arrives, so a multi-byte character
/// split across chunks is decoded whole.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = match String::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    debug!(error = %e, "Skipping SSE line with invalid UTF-8");
                    continue;
                }
            };

            if line.is_empty() {
                if !self.data.is_empty() {
                    events.push(SseEvent {
                        event: self.event.take(),
                        data: self.data.join("\n"),
                    });
                    self.data.clear();
                } else {
                    self.event = None;
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
                None => (line.as_str(), ""),
            };
            match field {
                "data" => self.data.push(value.to_string()),
                "event" => self.event = Some(value.to_string()),
                _ => {}
            }
        }
        events
    }
}

fn is_notification_event(event: &SseEvent) -> bool {
    matches!(
        event.event.as_deref(),
        None | Some("message") | Some("notification")
    )
}

/// Subscribes to `GET {stream_path}` as `text/event-stream`.
pub struct SsePushSource {
    client: ApiClient,
    stream_path: String,
}

impl SsePushSource {
    pub fn new(client: ApiClient, stream_path: impl Into<String>) -> Self {
        Self {
            client,
            stream_path: stream_path.into(),
        }
    }
}

#[async_trait]
impl PushSource for SsePushSource {
    async fn subscribe(&self) -> CrmResult<PushStream> {
        let resp = self
            .client
            .request(Method::GET, &self.stream_path)
            .header(ACCEPT, "text/event-stream")
            // The subscription is long-lived; the client's request timeout
            // does not apply to it.
            .timeout(std::time::Duration::from_secs(60 * 60 * 24 * 365))
            .send()
            .await
            .map_err(transport)?;
        let resp = check_status(resp).await?;
        info!(path = %self.stream_path, "Push channel subscribed");

        let mut decoder = SseDecoder::new();
        let stream = resp
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => decoder
                    .feed(&bytes)
                    .into_iter()
                    .filter(is_notification_event)
                    .map(|event| {
                        serde_json::from_str::<Notification>(&event.data)
                            .map_err(|e| CrmError::Decode(format!("push frame: {e}")))
                    })
                    .collect::<Vec<_>>(),
                Err(e) => vec![Err(CrmError::Push(e.to_string()))],
            })
            .flat_map(stream::iter)
            .boxed();
        Ok(stream)
    }
}

// ─── In-process ────────────────────────────────────────────────────────────

/// Broadcast-backed push source. Every subscriber sees every notification
/// published after it subscribed.
#[derive(Clone)]
pub struct ChannelPushSource {
    sender: broadcast::Sender<Notification>,
}

impl ChannelPushSource {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a notification; returns the number of live subscribers.
    pub fn publish(&self, notification: Notification) -> usize {
        self.sender.send(notification).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl PushSource for ChannelPushSource {
    async fn subscribe(&self) -> CrmResult<PushStream> {
        let receiver = self.sender.subscribe();
        let stream = stream::unfold(receiver, |mut rx| async move {
            match rx.recv().await {
                Ok(n) => Some((Ok(n), rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Push subscriber lagged");
                    Some((
                        Err(CrmError::Push(format!("subscriber lagged, {skipped} dropped"))),
                        rx,
                    ))
                }
                Err(broadcast::error::RecvError::Closed) => None,
            }
        })
        .boxed();
        Ok(stream)
    }
}
