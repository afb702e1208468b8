//! Apply-order planner
//!
//! Wraps diffs into [`DiffMetadata`] and ranks them with a memoized
//! topological walk over the dependency behaviors of the graph. Diffs with
//! the same rank (level) have no ordering constraint between them.

use crate::context::{Action, ActionInputs, ActionOutputs, ModelAction, ResourceAction};
use crate::dependency::Dependency;
use crate::diff::Diff;
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::{Node, NodeContext};
use crate::types::{DiffAction, FieldMatcher};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A diff plus the actions matched for it and its planned level
pub struct DiffMetadata<A: ?Sized + Action> {
    pub diff: Diff,
    pub actions: Vec<Arc<A>>,
    /// Level of the diff; -1 until assigned
    pub apply_order: i64,
    pub applied: bool,
    /// Inputs each action was handed, keyed by action name
    pub inputs: BTreeMap<String, ActionInputs>,
    /// Outputs each action produced, keyed by action name
    pub outputs: BTreeMap<String, ActionOutputs>,
}

/// Model diff with its model actions
pub type ModelDiffMetadata = DiffMetadata<dyn ModelAction>;

/// Resource diff with its resource actions
pub type ResourceDiffMetadata = DiffMetadata<dyn ResourceAction>;

impl<A: ?Sized + Action> DiffMetadata<A> {
    pub fn new(diff: Diff, actions: Vec<Arc<A>>) -> Self {
        Self {
            diff,
            actions,
            apply_order: -1,
            applied: false,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Wrap `diff` with every registered action whose filter accepts it
    pub fn matching(diff: Diff, registry: &[Arc<A>]) -> Self {
        let actions = registry
            .iter()
            .filter(|a| a.filter(&diff))
            .cloned()
            .collect();
        Self::new(diff, actions)
    }

    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    pub fn is_duplicate_of(&self, other: &Self) -> bool {
        self.diff.is_duplicate_of(&other.diff)
    }
}

impl<A: ?Sized + Action> Clone for DiffMetadata<A> {
    fn clone(&self) -> Self {
        Self {
            diff: self.diff.clone(),
            actions: self.actions.clone(),
            apply_order: self.apply_order,
            applied: self.applied,
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

impl<A: ?Sized + Action> fmt::Debug for DiffMetadata<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffMetadata")
            .field("diff", &self.diff)
            .field("actions", &self.action_names())
            .field("apply_order", &self.apply_order)
            .field("applied", &self.applied)
            .finish_non_exhaustive()
    }
}

/// Source of dependency edges for apply-order planning
pub trait DependencyLookup {
    /// Edges leaving `node`, each with the context of its target
    fn dependencies_of(&self, node: &NodeContext) -> Vec<(NodeContext, Dependency)>;
}

impl<N: Node> DependencyLookup for Graph<N> {
    fn dependencies_of(&self, node: &NodeContext) -> Vec<(NodeContext, Dependency)> {
        let Some(id) = self.get(node) else {
            return Vec::new();
        };
        self.dependencies(id)
            .filter_map(|(_, dep)| {
                self.context_of(dep.to())
                    .map(|target| (target.clone(), dep.clone()))
            })
            .collect()
    }
}

/// The graph after a change together with the graph before it
///
/// Lookups return the union of both graphs' edges, so a Delete is still
/// ordered by edges that only exist in the previous graph.
pub struct GraphPair<'a, N: Node> {
    pub new: &'a Graph<N>,
    pub old: &'a Graph<N>,
}

impl<N: Node> Clone for GraphPair<'_, N> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N: Node> Copy for GraphPair<'_, N> {}

impl<'a, N: Node> GraphPair<'a, N> {
    pub fn new(new: &'a Graph<N>, old: &'a Graph<N>) -> Self {
        Self { new, old }
    }
}

impl<N: Node> DependencyLookup for GraphPair<'_, N> {
    fn dependencies_of(&self, node: &NodeContext) -> Vec<(NodeContext, Dependency)> {
        let mut edges = self.new.dependencies_of(node);
        for (target, dep) in self.old.dependencies_of(node) {
            let known = edges.iter().any(|(t, d)| {
                *t == target
                    && d.relationship() == dep.relationship()
                    && d.behaviors() == dep.behaviors()
            });
            if !known {
                edges.push((target, dep));
            }
        }
        edges
    }
}

fn is_mutation(action: DiffAction) -> bool {
    matches!(
        action,
        DiffAction::Add | DiffAction::Update | DiffAction::Delete
    )
}

/// Reject Add/Delete/Update mixes on one node
///
/// Every mutation on the node counts, whatever its field: {Add, Update},
/// {Add, Delete} and {Delete, Update} conflict. Duplicates share one action
/// and never conflict with each other.
pub fn check_conflicts<A: ?Sized + Action>(
    diffs: &[DiffMetadata<A>],
    node: &NodeContext,
) -> Result<()> {
    let actions: BTreeSet<DiffAction> = diffs
        .iter()
        .map(|m| &m.diff)
        .filter(|d| d.node == *node && is_mutation(d.action))
        .map(|d| d.action)
        .collect();

    if actions.len() > 1 {
        return Err(Error::ConflictingActions {
            node: node.to_string(),
            actions: actions.into_iter().collect(),
        });
    }
    Ok(())
}

/// Assign the apply order of `diffs[index]`, and of everything it waits on
///
/// `seen` is the recursion stack; meeting a diff already on it means the
/// diff population is circular.
pub fn set_apply_order<A: ?Sized + Action>(
    index: usize,
    diffs: &mut [DiffMetadata<A>],
    lookup: &dyn DependencyLookup,
    seen: &mut Vec<usize>,
) -> Result<i64> {
    if let Some(pos) = seen.iter().position(|i| *i == index) {
        let mut path: Vec<String> = seen[pos..]
            .iter()
            .map(|i| diffs[*i].diff.to_string())
            .collect();
        path.push(diffs[index].diff.to_string());
        return Err(Error::CircularDependency { path });
    }

    let diff = diffs[index].diff.clone();
    check_conflicts(diffs, &diff.node)?;

    if diffs[index].apply_order >= 0 {
        return Ok(diffs[index].apply_order);
    }

    seen.push(index);
    let mut max_order: Option<i64> = None;
    let on_field = FieldMatcher::exact(diff.field.as_str());

    for (target, dep) in lookup.dependencies_of(&diff.node) {
        if !dep.has_matching_behavior(&on_field, Some(diff.action), &FieldMatcher::Any, None) {
            continue;
        }
        let waits_on: Vec<usize> = (0..diffs.len())
            .filter(|j| *j != index)
            .filter(|j| {
                let other = &diffs[*j].diff;
                other.node == target
                    && dep.requires(&diff.field, diff.action, &other.field, other.action)
            })
            .collect();

        for j in waits_on {
            let order = set_apply_order(j, diffs, lookup, seen)?;
            max_order = Some(max_order.map_or(order, |m| m.max(order)));
        }
    }
    seen.pop();

    let order = max_order.map_or(0, |m| m + 1);
    diffs[index].apply_order = order;
    Ok(order)
}

/// Assign the apply order of every diff
///
/// Conflicts are checked for every node before any order is assigned.
pub fn assign_apply_order<A: ?Sized + Action>(
    diffs: &mut [DiffMetadata<A>],
    lookup: &dyn DependencyLookup,
) -> Result<()> {
    let nodes: BTreeSet<NodeContext> = diffs.iter().map(|m| m.diff.node.clone()).collect();
    for node in &nodes {
        check_conflicts(diffs, node)?;
    }

    for index in 0..diffs.len() {
        set_apply_order(index, diffs, lookup, &mut Vec::new())?;
    }
    Ok(())
}

/// Split planned diffs into levels, lowest apply order first
pub fn group_by_level<A: ?Sized + Action>(
    diffs: Vec<DiffMetadata<A>>,
) -> Vec<Vec<DiffMetadata<A>>> {
    let mut levels: BTreeMap<i64, Vec<DiffMetadata<A>>> = BTreeMap::new();
    for metadata in diffs {
        levels
            .entry(metadata.apply_order)
            .or_default()
            .push(metadata);
    }
    levels.into_values().collect()
}

/// Partition a level into duplicate groups
///
/// Each group lists indices into `level`; the first index is the
/// representative that gets executed.
pub fn group_duplicates<A: ?Sized + Action>(level: &[DiffMetadata<A>]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, metadata) in level.iter().enumerate() {
        match groups
            .iter_mut()
            .find(|g| level[g[0]].is_duplicate_of(metadata))
        {
            Some(group) => group.push(index),
            None => groups.push(vec![index]),
        }
    }
    groups
}
