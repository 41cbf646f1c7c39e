//! Error taxonomy for the pipeline.
//!
//! Failures are classified into a small set of kinds that decide the
//! recovery strategy: fatal errors abort the item, retryable remote
//! errors go through the retry/degradation machinery, and resource
//! exhaustion triggers a forced VRAM clear before the next attempt.

use thiserror::Error;

/// Errors produced by core domain logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed a validation rule.
    #[error("validation error: {0}")]
    Validation(String),

    /// An invalid post status transition was requested.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Status the post is currently in.
        from: String,
        /// Status the caller tried to move to.
        to: String,
    },
}

/// How a failure should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Text-generation failure before any narration exists. No retry;
    /// the item goes straight to `Failed`.
    Fatal,
    /// Speech synthesis, clip generation, or encode failure. Retried
    /// with backoff, then degraded where a ladder exists.
    RetryableRemote,
    /// Accelerator memory pressure. Triggers a forced clear plus retry
    /// rather than a user-visible failure.
    ResourceExhaustion,
    /// A bounded wait expired. Handled like a retryable remote failure
    /// (one tier burned, not the whole item).
    Timeout,
}

/// Best-effort classifier for out-of-memory conditions in remote error
/// text.
///
/// The generation service reports failures as free-form strings, so
/// this is string matching by necessity. Keep it behind this single
/// predicate so it can be swapped for a structured error code if the
/// service ever grows one.
pub fn looks_like_resource_exhaustion(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    ["out of memory", "cuda", "vram", "allocation failed", "oom"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Classify a remote error message into a [`FailureKind`].
///
/// Order matters: resource exhaustion is checked before the generic
/// timeout/network buckets because OOM reports often mention timeouts
/// too.
pub fn classify_failure(message: &str) -> FailureKind {
    let lower = message.to_ascii_lowercase();
    if looks_like_resource_exhaustion(&lower) {
        FailureKind::ResourceExhaustion
    } else if lower.contains("timeout") || lower.contains("timed out") {
        FailureKind::Timeout
    } else {
        FailureKind::RetryableRemote
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oom_detected_in_mixed_case_text() {
        assert!(looks_like_resource_exhaustion(
            "RuntimeError: CUDA Out Of Memory. Tried to allocate 2.5 GiB"
        ));
    }

    #[test]
    fn vram_keyword_detected() {
        assert!(looks_like_resource_exhaustion("not enough VRAM on device 0"));
    }

    #[test]
    fn plain_network_error_is_not_exhaustion() {
        assert!(!looks_like_resource_exhaustion("connection refused"));
    }

    #[test]
    fn classify_prefers_exhaustion_over_timeout() {
        assert_eq!(
            classify_failure("cuda allocation failed after timeout"),
            FailureKind::ResourceExhaustion
        );
    }

    #[test]
    fn classify_timeout() {
        assert_eq!(
            classify_failure("generation timed out after 300s"),
            FailureKind::Timeout
        );
    }

    #[test]
    fn classify_defaults_to_retryable() {
        assert_eq!(
            classify_failure("502 bad gateway"),
            FailureKind::RetryableRemote
        );
    }
}
