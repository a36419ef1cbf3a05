//! Trigger flags shared by `release`, `publish` and `workflow`.

use anyhow::Context;
use camino::Utf8Path;
use clap::Args;

use shipyard_core::git;
use shipyard_core::trigger::{Trigger, TriggerEvent, TriggerOverrides, resolve_trigger};

use super::env_var;

/// Arguments that pin down what started the run.
///
/// Without them the trigger comes from `GITHUB_EVENT_NAME` and `GITHUB_REF`,
/// and outside CI it is a manual dispatch on the current branch.
#[derive(Args, Debug, Default)]
pub struct TriggerArgs {
    /// Trigger event (overrides GITHUB_EVENT_NAME)
    #[arg(long, value_enum)]
    pub event: Option<TriggerEvent>,

    /// Fully qualified ref (overrides GITHUB_REF)
    #[arg(long = "ref", value_name = "REF", conflicts_with = "tag")]
    pub git_ref: Option<String>,

    /// Tag name, shorthand for --ref refs/tags/NAME
    #[arg(long, value_name = "NAME")]
    pub tag: Option<String>,

    /// Print the resolved steps without running anything
    #[arg(long)]
    pub dry_run: bool,
}

impl TriggerArgs {
    /// Resolve the trigger from flags, CI variables and the checkout.
    pub fn resolve(&self, root: &Utf8Path) -> anyhow::Result<Trigger> {
        let overrides = TriggerOverrides {
            event: self.event,
            git_ref: self.git_ref.clone(),
            tag: self.tag.clone(),
        };
        resolve_trigger(&overrides, env_var, || {
            git::current_branch(root).ok().flatten()
        })
        .context("failed to resolve the workflow trigger")
    }
}
