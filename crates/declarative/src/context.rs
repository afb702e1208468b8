//! Action and provider traits
//!
//! These traits allow the engine to be used without depending on specific
//! providers. Model actions translate model diffs into resources; resource
//! actions perform the provider calls for resource diffs.

use crate::diff::Diff;
use crate::resource::Resource;
use crate::types::NodeKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Common part of every action
pub trait Action: Send + Sync {
    /// Name used in errors, logs and provenance records
    fn name(&self) -> &str;

    /// Check if this action handles `diff`
    fn filter(&self, diff: &Diff) -> bool;
}

/// One resolved input handed to a model action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "value")]
pub enum ActionInput {
    /// A module input or other plain value
    Value(Value),
    /// A resource already produced in this transaction or persisted before it
    Resource(Resource),
}

impl ActionInput {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Resource(_) => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Self::Resource(r) => Some(r),
            Self::Value(_) => None,
        }
    }
}

/// Inputs keyed by the names the action asked for
pub type ActionInputs = BTreeMap<String, ActionInput>;

/// Resources produced by a model action, keyed by output name
pub type ActionOutputs = BTreeMap<String, Resource>;

/// Translates model diffs into resources
///
/// Keys returned by `collect_input` are resolved before `handle` runs:
/// `resource.<id>` resolves to the resource with that id, anything else to
/// the transaction's input map.
pub trait ModelAction: Action {
    /// Input keys needed to handle `diff`
    fn collect_input(&self, _diff: &Diff) -> Vec<String> {
        Vec::new()
    }

    /// Output keys `handle` is expected to produce for `diff`
    fn collect_output(&self, _diff: &Diff) -> Vec<String> {
        Vec::new()
    }

    /// Produce the resources that realize `diff`
    fn handle(&self, diff: &Diff, inputs: &ActionInputs) -> Result<ActionOutputs>;

    /// Produce the resources that undo a previous `handle`
    ///
    /// `inputs` and `outputs` are the ones recorded when `diff` was handled.
    fn revert(&self, diff: &Diff, inputs: &ActionInputs, outputs: &ActionOutputs)
    -> Result<ActionOutputs>;
}

/// Performs the provider calls for a resource diff
pub trait ResourceAction: Action {
    fn handle(&self, diff: &Diff, ctx: &mut ApplyContext<'_>) -> Result<()>;
}

/// Context passed to resource actions
pub struct ApplyContext<'a> {
    /// Working copy of the resource the diff targets; provider output goes
    /// into its response
    pub resource: &'a mut Resource,
    /// Parents of the resource, as currently planned
    pub parents: &'a [&'a Resource],
}

impl<'a> ApplyContext<'a> {
    pub fn new(resource: &'a mut Resource, parents: &'a [&'a Resource]) -> Self {
        Self { resource, parents }
    }

    /// First parent with this node name
    pub fn parent(&self, node_name: &str) -> Option<&Resource> {
        use crate::node::Node;

        self.parents
            .iter()
            .copied()
            .find(|p| p.node_name() == node_name)
    }
}

/// Progress callback for transaction execution
///
/// Implement this trait to receive progress updates while levels run.
pub trait ProgressCallback: Send {
    /// Called when a level starts
    fn on_level_start(&mut self, kind: NodeKind, level: usize, count: usize);

    /// Called when starting to apply a single diff
    fn on_diff_start(&mut self, diff: &Diff);

    /// Called when a diff has been applied or has failed
    fn on_diff_complete(&mut self, diff: &Diff, success: bool);

    /// Called when a level completes
    fn on_level_complete(&mut self, kind: NodeKind, level: usize);
}

impl<P: ProgressCallback + ?Sized> ProgressCallback for &mut P {
    fn on_level_start(&mut self, kind: NodeKind, level: usize, count: usize) {
        (**self).on_level_start(kind, level, count);
    }

    fn on_diff_start(&mut self, diff: &Diff) {
        (**self).on_diff_start(diff);
    }

    fn on_diff_complete(&mut self, diff: &Diff, success: bool) {
        (**self).on_diff_complete(diff, success);
    }

    fn on_level_complete(&mut self, kind: NodeKind, level: usize) {
        (**self).on_level_complete(kind, level);
    }
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_level_start(&mut self, _kind: NodeKind, _level: usize, _count: usize) {}
    fn on_diff_start(&mut self, _diff: &Diff) {}
    fn on_diff_complete(&mut self, _diff: &Diff, _success: bool) {}
    fn on_level_complete(&mut self, _kind: NodeKind, _level: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_context_parent_lookup() {
        let vpc = Resource::new("vpc", "vpc-1").unwrap();
        let role = Resource::new("iam-role", "role-1").unwrap();
        let mut subnet = Resource::new("subnet", "subnet-1").unwrap();
        let parents = [&vpc, &role];

        let ctx = ApplyContext::new(&mut subnet, &parents);
        assert_eq!(ctx.parent("iam-role").map(Resource::resource_id), Some("role-1"));
        assert!(ctx.parent("s3").is_none());
    }

    #[test]
    fn test_action_input_accessors() {
        let value = ActionInput::Value(serde_json::json!("qa"));
        assert!(value.as_resource().is_none());
        assert_eq!(value.as_value(), Some(&serde_json::json!("qa")));

        let resource = ActionInput::Resource(Resource::new("vpc", "vpc-1").unwrap());
        assert_eq!(
            resource.as_resource().map(Resource::resource_id),
            Some("vpc-1")
        );
    }
}
