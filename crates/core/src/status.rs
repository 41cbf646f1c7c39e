//! Post lifecycle status and allowed transitions.
//!
//! A post moves `Collected -> Editing -> Approved -> Processing ->
//! PreviewRendered -> Rendered -> Uploaded`, with `Declined` and
//! `Failed` as terminal side branches. `Failed` posts can be manually
//! requeued to `Approved` to rerun the whole pipeline from scratch;
//! there is no partial resume.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle state of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostStatus {
    /// Freshly ingested, awaiting review.
    Collected,
    /// Accepted in the inbox, being edited before final approval.
    Editing,
    /// Approved for generation; eligible to be claimed by a worker.
    Approved,
    /// Claimed by a worker; pipeline in flight.
    Processing,
    /// Low-resolution preview produced; awaiting the full-quality pass.
    PreviewRendered,
    /// Final video produced; eligible for upload.
    Rendered,
    /// Published. Terminal.
    Uploaded,
    /// Rejected during review. Terminal.
    Declined,
    /// Pipeline failed irrecoverably. Inert until manually requeued.
    Failed,
}

impl PostStatus {
    /// Stable string form used in the database and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collected => "COLLECTED",
            Self::Editing => "EDITING",
            Self::Approved => "APPROVED",
            Self::Processing => "PROCESSING",
            Self::PreviewRendered => "PREVIEW_RENDERED",
            Self::Rendered => "RENDERED",
            Self::Uploaded => "UPLOADED",
            Self::Declined => "DECLINED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether a transition from `self` to `to` is allowed.
    pub fn can_transition_to(&self, to: PostStatus) -> bool {
        use PostStatus::*;
        matches!(
            (self, to),
            (Collected, Editing)
                | (Collected, Declined)
                | (Editing, Approved)
                | (Editing, Declined)
                | (Approved, Processing)
                | (Processing, PreviewRendered)
                | (Processing, Rendered)
                | (Processing, Failed)
                | (PreviewRendered, Rendered)
                | (Rendered, Uploaded)
                | (Failed, Approved)
        )
    }

    /// Validate and perform a transition.
    pub fn transition_to(&self, to: PostStatus) -> Result<PostStatus, CoreError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(CoreError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

impl std::str::FromStr for PostStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COLLECTED" => Ok(Self::Collected),
            "EDITING" => Ok(Self::Editing),
            "APPROVED" => Ok(Self::Approved),
            "PROCESSING" => Ok(Self::Processing),
            "PREVIEW_RENDERED" => Ok(Self::PreviewRendered),
            "RENDERED" => Ok(Self::Rendered),
            "UPLOADED" => Ok(Self::Uploaded),
            "DECLINED" => Ok(Self::Declined),
            "FAILED" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "unknown post status '{other}'"
            ))),
        }
    }
}

impl std::fmt::Display for PostStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
