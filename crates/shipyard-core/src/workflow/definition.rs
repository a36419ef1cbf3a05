//! The CI workflow file that wires tag pushes and manual dispatch to
//! `shipyard release` and `shipyard publish`.
//!
//! The definition is a plain serde tree; the CLI renders it to YAML and
//! [`decorate`] adds the comments YAML serializers cannot express.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default location of the generated workflow, relative to the repository root.
pub const DEFAULT_WORKFLOW_PATH: &str = ".github/workflows/release.yml";

/// Condition gating the publish job on a version tag.
pub const PUBLISH_GATE: &str = "startsWith(github.ref, 'refs/tags/v')";

/// Serialization of overlapping runs, shipped disabled.
///
/// Uncomment to cancel an in-flight run when a newer one starts for the same
/// ref. `release.serialize_runs` is the local equivalent.
pub const CONCURRENCY_BLOCK: &str = "\
# concurrency:
#   group: ${{ github.workflow }}-${{ github.ref }}
#   cancel-in-progress: true
";

const HEADER: &str = "\
# Generated by `shipyard emit-workflow`. Regenerate with `--force`.
";

/// Knobs for the generated workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOptions {
    /// Workflow display name.
    pub name: String,
    /// Runner label for both jobs.
    pub runs_on: String,
    /// Shell command that installs shipyard on the runner.
    pub install_command: String,
    /// Tag pattern that triggers a release.
    pub tag_pattern: String,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            name: "release".to_string(),
            runs_on: "ubuntu-latest".to_string(),
            install_command: "cargo install --locked shipyard".to_string(),
            tag_pattern: "v*".to_string(),
        }
    }
}

/// Top-level workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Display name.
    pub name: String,
    /// Events that start the workflow.
    #[serde(rename = "on")]
    pub triggers: Triggers,
    /// Token permissions for every job.
    pub permissions: BTreeMap<String, String>,
    /// Environment shared by every job.
    pub env: BTreeMap<String, String>,
    /// The two jobs.
    pub jobs: Jobs,
}

/// `on:` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    /// Ref pushes.
    pub push: PushTrigger,
    /// Manual dispatch (no inputs).
    #[serde(default)]
    pub workflow_dispatch: BTreeMap<String, String>,
}

/// `on.push:` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTrigger {
    /// Tag patterns.
    pub tags: Vec<String>,
}

/// `jobs:` section, in execution-listing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jobs {
    /// Changelog and hosted release.
    pub release: Job,
    /// Build and upload, gated on version tags.
    pub publish: Job,
}

/// One job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Gate expression.
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Runner label.
    #[serde(rename = "runs-on")]
    pub runs_on: String,
    /// Steps.
    pub steps: Vec<WorkflowStep>,
}

/// One step of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Display name.
    pub name: String,
    /// Action reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,
    /// Action inputs.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub with: BTreeMap<String, serde_json::Value>,
    /// Shell command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,
    /// Step environment.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl WorkflowStep {
    fn action(name: &str, uses: &str) -> Self {
        Self {
            name: name.to_string(),
            uses: Some(uses.to_string()),
            with: BTreeMap::new(),
            run: None,
            env: BTreeMap::new(),
        }
    }

    fn command(name: &str, run: &str) -> Self {
        Self {
            name: name.to_string(),
            uses: None,
            with: BTreeMap::new(),
            run: Some(run.to_string()),
            env: BTreeMap::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.with.insert(key.to_string(), value.into());
        self
    }

    fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }
}

fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl WorkflowDefinition {
    /// Build the release workflow.
    pub fn new(options: &WorkflowOptions) -> Self {
        let checkout = "actions/checkout@v4";
        let install = WorkflowStep::command("Install shipyard", &options.install_command);

        let release = Job {
            condition: None,
            runs_on: options.runs_on.clone(),
            steps: vec![
                // Full history so git-cliff sees every earlier tag.
                WorkflowStep::action("Checkout", checkout).with("fetch-depth", 0),
                WorkflowStep::action("Install git-cliff", "taiki-e/install-action@v2")
                    .with("tool", "git-cliff"),
                install.clone(),
                WorkflowStep::command("Create release", "shipyard release")
                    .env("GH_TOKEN", "${{ github.token }}"),
            ],
        };

        let publish = Job {
            condition: Some(PUBLISH_GATE.to_string()),
            runs_on: options.runs_on.clone(),
            steps: vec![
                WorkflowStep::action("Checkout", checkout),
                WorkflowStep::action("Install uv", "astral-sh/setup-uv@v6")
                    .with("enable-cache", true)
                    .with("cache-dependency-glob", "uv.lock"),
                install,
                WorkflowStep::command("Build and publish", "shipyard publish"),
            ],
        };

        Self {
            name: options.name.clone(),
            triggers: Triggers {
                push: PushTrigger {
                    tags: vec![options.tag_pattern.clone()],
                },
                workflow_dispatch: BTreeMap::new(),
            },
            permissions: string_map(&[("contents", "write"), ("id-token", "write")]),
            env: string_map(&[("GITHUB_REPO", "${{ github.repository }}")]),
            jobs: Jobs { release, publish },
        }
    }
}

/// Add the generated-file header and the disabled concurrency block to
/// rendered YAML. The block goes right before `jobs:`.
pub fn decorate(yaml: &str) -> String {
    let mut out = String::with_capacity(HEADER.len() + yaml.len() + CONCURRENCY_BLOCK.len() + 2);
    out.push_str(HEADER);
    match yaml.find("\njobs:") {
        Some(idx) => {
            out.push_str(&yaml[..=idx]);
            out.push_str(CONCURRENCY_BLOCK);
            out.push_str(&yaml[idx + 1..]);
        }
        None => {
            out.push_str(yaml);
            if !yaml.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(CONCURRENCY_BLOCK);
        }
    }
    out
}
