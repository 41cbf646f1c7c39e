//! Completion awaiters for submitted generations.
//!
//! The preferred path is push: read typed WebSocket messages until the
//! prompt reports success or failure. WebSocket connections to a busy
//! generation server drop regularly, so the push awaiter degrades to
//! polling the history endpoint rather than failing the generation.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::api::ComfyApi;
use crate::error::ComfyError;
use crate::messages::{parse_message, WsMessage};

/// Consecutive history-poll failures tolerated before giving up.
const MAX_CONSECUTIVE_POLL_ERRORS: u32 = 10;

/// Waits until a submitted prompt finishes, one way or another.
#[async_trait]
pub trait ResultAwaiter: Send {
    /// Block until the prompt completes. `Ok(())` means outputs are
    /// ready in history; `Err(Remote)` carries the server's error text.
    async fn await_completion(&mut self, prompt_id: &str) -> Result<(), ComfyError>;
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Polls `GET /history/{prompt_id}` until the entry reports an outcome.
pub struct PollAwaiter {
    api: ComfyApi,
    interval: Duration,
}

impl PollAwaiter {
    pub fn new(api: ComfyApi, interval: Duration) -> Self {
        Self { api, interval }
    }
}

#[async_trait]
impl ResultAwaiter for PollAwaiter {
    async fn await_completion(&mut self, prompt_id: &str) -> Result<(), ComfyError> {
        let mut consecutive_errors = 0u32;
        loop {
            tokio::time::sleep(self.interval).await;
            match self.api.get_history(prompt_id).await {
                Ok(history) => {
                    consecutive_errors = 0;
                    if let Some(outcome) = history_outcome(&history, prompt_id) {
                        return outcome;
                    }
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        prompt_id = %prompt_id,
                        consecutive_errors,
                        error = %e,
                        "History poll failed",
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_POLL_ERRORS {
                        return Err(e);
                    }
                }
            }
        }
    }
}

/// Interpret a history response for one prompt.
///
/// `None` means the prompt is still queued or running.
pub fn history_outcome(
    history: &serde_json::Value,
    prompt_id: &str,
) -> Option<Result<(), ComfyError>> {
    let entry = history.get(prompt_id)?;
    let status = entry.get("status")?;

    if status.get("status_str").and_then(|v| v.as_str()) == Some("error") {
        let message = execution_error_text(status)
            .unwrap_or_else(|| "execution failed with no error detail".to_string());
        return Some(Err(ComfyError::Remote(message)));
    }
    if status.get("completed").and_then(|v| v.as_bool()) == Some(true) {
        return Some(Ok(()));
    }
    None
}

/// Pull the exception message out of the status messages array.
fn execution_error_text(status: &serde_json::Value) -> Option<String> {
    let messages = status.get("messages")?.as_array()?;
    for message in messages {
        let pair = message.as_array()?;
        if pair.first()?.as_str()? == "execution_error" {
            return pair
                .get(1)?
                .get("exception_message")?
                .as_str()
                .map(str::to_string);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Push over WebSocket
// ---------------------------------------------------------------------------

/// Reads push messages from a live WebSocket connection, falling back
/// to [`PollAwaiter`] if the socket drops mid-generation.
pub struct PushAwaiter {
    ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    client_id: String,
    fallback: PollAwaiter,
}

impl PushAwaiter {
    /// Connect to the server's WebSocket endpoint with a fresh client
    /// ID, so the submission can be correlated to push messages.
    pub async fn connect(
        ws_url: &str,
        api: ComfyApi,
        poll_interval: Duration,
    ) -> Result<Self, ComfyError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{ws_url}/ws?clientId={client_id}");

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ComfyError::Connection(format!("failed to connect to {ws_url}: {e}"))
        })?;

        tracing::debug!(client_id = %client_id, "Connected to generation WebSocket");

        Ok(Self {
            ws_stream,
            client_id,
            fallback: PollAwaiter::new(api, poll_interval),
        })
    }

    /// Client ID to pass along with the workflow submission.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Read frames until the prompt resolves or the socket drops.
    ///
    /// `None` means the socket closed without an outcome.
    async fn read_until_outcome(&mut self, prompt_id: &str) -> Option<Result<(), ComfyError>> {
        while let Some(frame) = self.ws_stream.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(_)) => {
                    // Preview image frames; not needed for completion.
                    continue;
                }
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => continue,
                Ok(Message::Close(frame)) => {
                    tracing::info!(prompt_id = %prompt_id, ?frame, "Generation WebSocket closed");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(prompt_id = %prompt_id, error = %e, "WebSocket receive error");
                    return None;
                }
            };

            // Unknown message kinds (extension nodes broadcast their
            // own) parse as errors and are skipped.
            let Ok(message) = parse_message(&text) else {
                continue;
            };
            match message {
                WsMessage::Executing(data)
                    if data.prompt_id == prompt_id && data.node.is_none() =>
                {
                    return Some(Ok(()));
                }
                WsMessage::ExecutionSuccess(data) if data.prompt_id == prompt_id => {
                    return Some(Ok(()));
                }
                WsMessage::ExecutionError(data) if data.prompt_id == prompt_id => {
                    return Some(Err(ComfyError::Remote(data.exception_message)));
                }
                WsMessage::Progress(data) => {
                    tracing::debug!(
                        prompt_id = %prompt_id,
                        value = data.value,
                        max = data.max,
                        "Generation progress",
                    );
                }
                WsMessage::Status(data) => {
                    tracing::trace!(
                        queue_remaining = data.status.exec_info.queue_remaining,
                        "Queue status",
                    );
                }
                _ => {}
            }
        }
        None
    }
}

#[async_trait]
impl ResultAwaiter for PushAwaiter {
    async fn await_completion(&mut self, prompt_id: &str) -> Result<(), ComfyError> {
        if let Some(outcome) = self.read_until_outcome(prompt_id).await {
            return outcome;
        }
        tracing::warn!(
            prompt_id = %prompt_id,
            "WebSocket dropped before completion, falling back to polling",
        );
        self.fallback.await_completion(prompt_id).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
