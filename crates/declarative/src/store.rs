//! Resource state across transactions
//!
//! Three resource graphs are tracked:
//!
//! - `old`: the desired state as of the last commit
//! - `new`: the desired state being built by the current transaction
//! - `actual`: what resource actions have confirmed so far
//!
//! When a resource action fails, `actual` lags behind `old` after the caller
//! commits. The difference between the two is the dirty state the next
//! transaction has to reconcile first.

use crate::diff::Diff;
use crate::error::Result;
use crate::node::{Node, NodeContext};
use crate::resource::{Resource, ResourceGraph, diff_resources};
use crate::types::DiffAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceStore {
    pub actual: ResourceGraph,
    pub old: ResourceGraph,
    pub new: ResourceGraph,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building the next desired state from the committed one
    pub fn begin(&mut self) {
        self.new = self.old.clone();
    }

    /// Diffs that would bring `actual` up to `old`
    pub fn dirty_diffs(&self) -> Vec<Diff> {
        diff_resources(&self.old, &self.actual)
    }

    /// Diffs that would bring `old` up to `new`
    pub fn resource_diffs(&self) -> Vec<Diff> {
        diff_resources(&self.new, &self.old)
    }

    /// Check if some committed change was never confirmed
    pub fn is_dirty(&self) -> bool {
        !self.dirty_diffs().is_empty()
    }

    /// Contexts of the resources with unconfirmed changes
    pub fn dirty_resources(&self) -> BTreeSet<NodeContext> {
        self.dirty_diffs().into_iter().map(|d| d.node).collect()
    }

    /// Record a diff confirmed by its resource actions
    ///
    /// `working` is the resource the actions ran against.
    pub fn record_applied(&mut self, diff: &Diff, working: &Resource) -> Result<()> {
        if diff.is_lifecycle() {
            match diff.action {
                DiffAction::Add => {
                    let mut created = working.clone();
                    self.drop_unconfirmed_parents(&mut created);
                    self.actual.put(created)?;
                }
                DiffAction::Delete => {
                    if let Some(id) = self.actual.get(&diff.node) {
                        self.actual.remove(id, true)?;
                    }
                }
                _ => {}
            }
            return Ok(());
        }

        let Some(mut current) = self.actual.resource(&diff.node).cloned() else {
            log::warn!("{} not confirmed yet, skipping {}", diff.node, diff);
            return Ok(());
        };
        current.apply_diff(diff)?;
        for (key, value) in working.response() {
            current.set_response(key.clone(), value.clone());
        }
        self.drop_unconfirmed_parents(&mut current);
        self.actual.put(current)?;
        Ok(())
    }

    fn drop_unconfirmed_parents(&self, resource: &mut Resource) {
        let missing: Vec<NodeContext> = resource
            .parents()
            .iter()
            .filter(|p| !self.actual.contains(p))
            .cloned()
            .collect();
        for parent in &missing {
            log::warn!(
                "parent {} of {} is not confirmed, leaving it out",
                parent,
                resource.context()
            );
            resource.remove_parent(parent);
        }
    }

    /// Promote `new` to `old`
    ///
    /// Resources marked deleted whose deletion has been confirmed are purged
    /// from both desired graphs.
    pub fn commit(&mut self) -> Result<()> {
        self.old = self.new.clone();

        let purged: Vec<NodeContext> = self
            .old
            .nodes()
            .filter(|(_, r)| r.is_marked_deleted() && !self.actual.contains(r.context()))
            .map(|(_, r)| r.context().clone())
            .collect();

        for context in &purged {
            for graph in [&mut self.old, &mut self.new] {
                if let Some(id) = graph.get(context) {
                    graph.remove(id, true)?;
                }
            }
        }
        if !purged.is_empty() {
            log::debug!("purged {} deleted resources", purged.len());
        }
        Ok(())
    }
}
