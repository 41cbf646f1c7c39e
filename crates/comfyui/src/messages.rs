//! Typed ComfyUI WebSocket messages.
//!
//! The server pushes JSON frames shaped `{"type": "<kind>", "data":
//! {...}}`. Only the message kinds the completion awaiter cares about
//! are modeled; unknown kinds fail to parse and are skipped by the
//! reader loop.

use serde::Deserialize;

/// WebSocket message kinds relevant to awaiting a generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// Server status broadcast (queue depth).
    #[serde(rename = "status")]
    Status(StatusData),

    /// A prompt has started executing.
    #[serde(rename = "execution_start")]
    ExecutionStart(PromptRef),

    /// Some nodes were skipped because their outputs are cached.
    #[serde(rename = "execution_cached")]
    ExecutionCached(CachedData),

    /// A node is executing; `node == None` means the prompt finished.
    #[serde(rename = "executing")]
    Executing(ExecutingData),

    /// A node finished and produced output.
    #[serde(rename = "executed")]
    Executed(ExecutedData),

    /// Step-level progress from a long-running node.
    #[serde(rename = "progress")]
    Progress(ProgressData),

    /// The whole prompt completed successfully.
    #[serde(rename = "execution_success")]
    ExecutionSuccess(PromptRef),

    /// Execution failed with an error.
    #[serde(rename = "execution_error")]
    ExecutionError(ErrorData),
}

/// Payload carrying only a prompt identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptRef {
    pub prompt_id: String,
}

/// Queue status information.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    pub status: QueueStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatus {
    pub exec_info: ExecInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecInfo {
    pub queue_remaining: i32,
}

/// Payload for `execution_cached` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct CachedData {
    pub prompt_id: String,
    /// Node IDs served from cache.
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// Payload for `executing` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingData {
    pub node: Option<String>,
    pub prompt_id: String,
}

/// Payload for `executed` messages (per-node output).
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutedData {
    pub node: String,
    /// Raw output value (file listings and the like).
    pub output: serde_json::Value,
    pub prompt_id: String,
}

/// Payload for `progress` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    /// Current step number.
    pub value: i32,
    /// Total number of steps.
    pub max: i32,
}

/// Payload for `execution_error` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorData {
    pub prompt_id: String,
    #[serde(default)]
    pub node_id: String,
    pub exception_message: String,
    #[serde(default)]
    pub exception_type: String,
}

/// Parse a WebSocket text frame into a typed message.
///
/// Returns `Err` for malformed JSON or unknown `type` values; the
/// reader loop logs and skips those.
pub fn parse_message(text: &str) -> Result<WsMessage, serde_json::Error> {
    serde_json::from_str(text)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_executing_completion_frame() {
        let json = r#"{"type":"executing","data":{"node":null,"prompt_id":"p1"}}"#;
        let msg = parse_message(json).unwrap();
        assert_matches!(msg, WsMessage::Executing(data) => {
            assert!(data.node.is_none());
            assert_eq!(data.prompt_id, "p1");
        });
    }

    #[test]
    fn parses_executing_node_frame() {
        let json = r#"{"type":"executing","data":{"node":"12","prompt_id":"p1"}}"#;
        assert_matches!(
            parse_message(json).unwrap(),
            WsMessage::Executing(data) => assert_eq!(data.node.as_deref(), Some("12"))
        );
    }

    #[test]
    fn parses_execution_success() {
        let json = r#"{"type":"execution_success","data":{"prompt_id":"p2"}}"#;
        assert_matches!(
            parse_message(json).unwrap(),
            WsMessage::ExecutionSuccess(data) => assert_eq!(data.prompt_id, "p2")
        );
    }

    #[test]
    fn parses_execution_error_without_optional_fields() {
        let json =
            r#"{"type":"execution_error","data":{"prompt_id":"p3","exception_message":"CUDA out of memory"}}"#;
        assert_matches!(
            parse_message(json).unwrap(),
            WsMessage::ExecutionError(data) => {
                assert_eq!(data.exception_message, "CUDA out of memory");
                assert!(data.node_id.is_empty());
            }
        );
    }

    #[test]
    fn parses_progress_and_status() {
        let progress = r#"{"type":"progress","data":{"value":5,"max":20}}"#;
        assert_matches!(
            parse_message(progress).unwrap(),
            WsMessage::Progress(data) => assert_eq!((data.value, data.max), (5, 20))
        );

        let status = r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":2}}}}"#;
        assert_matches!(
            parse_message(status).unwrap(),
            WsMessage::Status(data) => assert_eq!(data.status.exec_info.queue_remaining, 2)
        );
    }

    #[test]
    fn parses_cached_and_executed_frames() {
        let cached = r#"{"type":"execution_cached","data":{"prompt_id":"p4","nodes":["1","2"]}}"#;
        assert_matches!(
            parse_message(cached).unwrap(),
            WsMessage::ExecutionCached(data) => assert_eq!(data.nodes, vec!["1", "2"])
        );

        let executed = r#"{"type":"executed","data":{"node":"9","output":{"gifs":[{"filename":"a.mp4"}]},"prompt_id":"p4"}}"#;
        assert_matches!(
            parse_message(executed).unwrap(),
            WsMessage::Executed(data) => {
                assert_eq!(data.node, "9");
                assert!(data.output.is_object());
            }
        );
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert!(parse_message(r#"{"type":"crystools.monitor","data":{}}"#).is_err());
        assert!(parse_message("not json").is_err());
    }
}
