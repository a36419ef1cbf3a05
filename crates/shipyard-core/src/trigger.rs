//! What started a release run.
//!
//! CI describes the triggering event through `GITHUB_EVENT_NAME` and
//! `GITHUB_REF`. Locally the same information comes from `--event`, `--ref`
//! and `--tag`, falling back to a manual dispatch on the current branch.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Prefix that marks a ref as a version tag.
pub const VERSION_TAG_PREFIX: &str = "refs/tags/v";

const TAG_PREFIX: &str = "refs/tags/";
const BRANCH_PREFIX: &str = "refs/heads/";
const REF_NAMESPACE: &str = "refs/";

/// Errors from resolving the trigger.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TriggerError {
    /// The event name is not one the workflow listens to.
    #[error("unsupported event `{0}` (expected `push` or `workflow_dispatch`)")]
    UnsupportedEvent(String),

    /// No ref was given and none could be detected.
    #[error("cannot determine the triggering ref; pass --ref or --tag")]
    NoRef,

    /// A ref given without its `refs/` namespace.
    #[error("`{0}` is not a full ref; pass `--tag {0}` or `--ref refs/heads/{0}`")]
    UnqualifiedRef(String),

    /// A push of a ref the workflow does not listen to.
    #[error("push of `{0}` is not a workflow trigger (only `v*` tags are)")]
    NotAWorkflowTrigger(String),
}

/// Result alias for trigger resolution.
pub type TriggerResult<T> = Result<T, TriggerError>;

/// The CI event kinds the release workflow reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// A ref was pushed.
    Push,
    /// Someone started the workflow by hand.
    #[value(name = "workflow_dispatch", alias = "workflow-dispatch")]
    WorkflowDispatch,
}

impl TriggerEvent {
    /// The event name as CI reports it.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::WorkflowDispatch => "workflow_dispatch",
        }
    }

    /// Parse a `GITHUB_EVENT_NAME` value.
    pub fn from_event_name(name: &str) -> TriggerResult<Self> {
        match name.trim() {
            "push" => Ok(Self::Push),
            "workflow_dispatch" => Ok(Self::WorkflowDispatch),
            other => Err(TriggerError::UnsupportedEvent(other.to_string())),
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully qualified git ref such as `refs/tags/v1.2.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GitRef(String);

impl GitRef {
    /// Wrap a ref string as given.
    pub fn new(full: impl Into<String>) -> Self {
        Self(full.into())
    }

    /// `refs/tags/<name>`.
    pub fn tag(name: &str) -> Self {
        Self(format!("{TAG_PREFIX}{name}"))
    }

    /// `refs/heads/<name>`.
    pub fn branch(name: &str) -> Self {
        Self(format!("{BRANCH_PREFIX}{name}"))
    }

    /// The full ref string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tag name, if this is a tag ref.
    pub fn tag_name(&self) -> Option<&str> {
        self.0.strip_prefix(TAG_PREFIX)
    }

    /// The ref without its `refs/heads/` or `refs/tags/` prefix.
    pub fn short_name(&self) -> &str {
        self.0
            .strip_prefix(TAG_PREFIX)
            .or_else(|| self.0.strip_prefix(BRANCH_PREFIX))
            .unwrap_or(&self.0)
    }

    /// Whether the ref matches `refs/tags/v*`.
    pub fn is_version_tag(&self) -> bool {
        self.0.starts_with(VERSION_TAG_PREFIX)
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated workflow trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trigger {
    /// What happened.
    pub event: TriggerEvent,
    /// The ref it happened on.
    #[serde(rename = "ref")]
    pub git_ref: GitRef,
}

impl Trigger {
    /// Accept the trigger if the workflow listens to it.
    ///
    /// Pushes must be `v*` tags; manual dispatch is accepted on any ref.
    pub fn validate(event: TriggerEvent, git_ref: GitRef) -> TriggerResult<Self> {
        if event == TriggerEvent::Push && !git_ref.is_version_tag() {
            return Err(TriggerError::NotAWorkflowTrigger(git_ref.0));
        }
        Ok(Self { event, git_ref })
    }

    /// Whether the run is for a version tag.
    pub fn is_version_tag(&self) -> bool {
        self.git_ref.is_version_tag()
    }
}

/// Explicit trigger values from the command line.
#[derive(Debug, Clone, Default)]
pub struct TriggerOverrides {
    /// `--event`.
    pub event: Option<TriggerEvent>,
    /// `--ref`.
    pub git_ref: Option<String>,
    /// `--tag` (shorthand for `refs/tags/<tag>`).
    pub tag: Option<String>,
}

/// Work out the trigger from overrides, then CI variables, then the checkout.
///
/// `lookup` reads an environment variable; `current_branch` is consulted only
/// when neither an override nor `GITHUB_REF` names a ref. Without an event
/// from either source the run is treated as a manual dispatch.
pub fn resolve_trigger(
    overrides: &TriggerOverrides,
    lookup: impl Fn(&str) -> Option<String>,
    current_branch: impl FnOnce() -> Option<String>,
) -> TriggerResult<Trigger> {
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let event = match overrides.event {
        Some(event) => event,
        None => match non_empty("GITHUB_EVENT_NAME") {
            Some(name) => TriggerEvent::from_event_name(&name)?,
            None => TriggerEvent::WorkflowDispatch,
        },
    };

    let git_ref = if let Some(ref tag) = overrides.tag {
        GitRef::tag(tag)
    } else if let Some(ref full) = overrides.git_ref {
        qualified(full.trim())?
    } else if let Some(full) = non_empty("GITHUB_REF") {
        qualified(full.trim())?
    } else {
        current_branch()
            .map(|branch| GitRef::branch(&branch))
            .ok_or(TriggerError::NoRef)?
    };

    debug!(%event, %git_ref, "resolved trigger");
    Trigger::validate(event, git_ref)
}

/// A short name like `v1.2.3` would silently select a nightly release.
fn qualified(full: &str) -> TriggerResult<GitRef> {
    if full.starts_with(REF_NAMESPACE) {
        Ok(GitRef::new(full))
    } else {
        Err(TriggerError::UnqualifiedRef(full.to_string()))
    }
}
