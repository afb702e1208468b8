//! Arena graph of nodes and dependency edges
//!
//! Nodes live in an arena addressed by [`NodeId`]. Every dependency is stored
//! once in an edge arena and indexed from both of its endpoints, so removing
//! an edge updates both participants at once.
//!
//! `add_child` still materializes two edges (child to parent, parent to
//! child) because each direction carries different behaviors.

use crate::dependency::{Behavior, Dependency};
use crate::error::{Error, Result};
use crate::node::{EdgeId, Node, NodeContext, NodeId};
use crate::types::{DiffAction, FieldMatcher};
use std::collections::{HashMap, HashSet, VecDeque};

/// Dependency graph over one node type
#[derive(Debug, Clone)]
pub struct Graph<N: Node> {
    nodes: Vec<Option<N>>,
    edges: Vec<Option<Dependency>>,
    outgoing: HashMap<NodeId, Vec<EdgeId>>,
    incoming: HashMap<NodeId, Vec<EdgeId>>,
    index: HashMap<NodeContext, NodeId>,
}

impl<N: Node> Default for Graph<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Node> Graph<N> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            index: HashMap::new(),
        }
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Add a node; its context must be unique in the graph
    pub fn add_node(&mut self, node: N) -> Result<NodeId> {
        let context = node.context().clone();
        if self.index.contains_key(&context) {
            return Err(Error::DuplicateNode(context.to_string()));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(node));
        self.index.insert(context, id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&N> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access to a node
    ///
    /// The node's context must not change; the context index is not updated.
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut N> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Find a node by its exact context
    pub fn get(&self, context: &NodeContext) -> Option<NodeId> {
        self.index.get(context).copied()
    }

    /// Find a node by its exact context, or fail
    pub fn require(&self, context: &NodeContext) -> Result<NodeId> {
        self.get(context)
            .ok_or_else(|| Error::NodeNotFound(context.to_string()))
    }

    pub fn contains(&self, context: &NodeContext) -> bool {
        self.index.contains_key(context)
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId(i), n)))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn context_of(&self, id: NodeId) -> Option<&NodeContext> {
        self.node(id).map(Node::context)
    }

    fn context_string(&self, id: NodeId) -> String {
        self.context_of(id)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    // ========================================================================
    // Edges
    // ========================================================================

    pub fn edge(&self, id: EdgeId) -> Option<&Dependency> {
        self.edges.get(id.0).and_then(Option::as_ref)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Dependency> {
        self.edges.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Dependency)> {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (EdgeId(i), e)))
    }

    /// Edges leaving `id`
    pub fn dependencies(&self, id: NodeId) -> impl Iterator<Item = (EdgeId, &Dependency)> {
        self.outgoing
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|e| self.edge(*e).map(|d| (*e, d)))
    }

    /// Edges arriving at `id`
    pub fn dependents(&self, id: NodeId) -> impl Iterator<Item = (EdgeId, &Dependency)> {
        self.incoming
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|e| self.edge(*e).map(|d| (*e, d)))
    }

    /// Add a bare edge without behaviors
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId> {
        for endpoint in [from, to] {
            if self.node(endpoint).is_none() {
                return Err(Error::NodeNotFound(format!("#{}", endpoint.0)));
            }
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(Some(Dependency::new(from, to)));
        self.outgoing.entry(from).or_default().push(id);
        self.incoming.entry(to).or_default().push(id);
        Ok(id)
    }

    /// Remove one edge from both of its endpoints
    pub fn remove_dependency(&mut self, id: EdgeId) -> Option<Dependency> {
        let dependency = self.edges.get_mut(id.0).and_then(Option::take)?;
        if let Some(out) = self.outgoing.get_mut(&dependency.from()) {
            out.retain(|e| *e != id);
        }
        if let Some(inc) = self.incoming.get_mut(&dependency.to()) {
            inc.retain(|e| *e != id);
        }
        Some(dependency)
    }

    /// Remove every edge between `a` and `b`, in both directions
    pub fn remove_relationship(&mut self, a: NodeId, b: NodeId) -> Vec<Dependency> {
        let between: Vec<EdgeId> = self
            .dependencies(a)
            .filter(|(_, d)| d.to() == b)
            .chain(self.dependencies(b).filter(|(_, d)| d.to() == a))
            .map(|(e, _)| e)
            .collect();
        between
            .into_iter()
            .filter_map(|e| self.remove_dependency(e))
            .collect()
    }

    fn has_relationship_between(&self, a: NodeId, b: NodeId) -> bool {
        self.dependencies(a)
            .filter(|(_, d)| d.to() == b)
            .chain(self.dependencies(b).filter(|(_, d)| d.to() == a))
            .any(|(_, d)| d.relationship().is_some())
    }

    /// Make `child` a child of `parent`
    ///
    /// Creates child -> parent with Add-after-Add and Add-after-Update
    /// behaviors plus the child marker, and parent -> child with
    /// Delete-after-Delete plus the parent marker.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        on_field: &str,
        child: NodeId,
        to_field: &str,
    ) -> Result<(EdgeId, EdgeId)> {
        if self.has_relationship_between(parent, child) {
            return Err(Error::DuplicateRelationship {
                from: self.context_string(parent),
                to: self.context_string(child),
            });
        }

        let child_to_parent = self.add_dependency(child, parent)?;
        let parent_to_child = self.add_dependency(parent, child)?;

        if let Some(dep) = self.edge_mut(child_to_parent) {
            dep.add_behavior(to_field, DiffAction::Add, on_field, DiffAction::Add);
            dep.add_behavior(to_field, DiffAction::Add, on_field, DiffAction::Update);
            dep.add_child_relationship(to_field, on_field);
        }
        if let Some(dep) = self.edge_mut(parent_to_child) {
            dep.add_behavior(on_field, DiffAction::Delete, to_field, DiffAction::Delete);
            dep.add_parent_relationship(on_field, to_field);
        }

        Ok((child_to_parent, parent_to_child))
    }

    /// Attach intra-node ordering behaviors to the self edge of `id`
    ///
    /// Behaviors already present are skipped.
    pub fn add_field_dependency(&mut self, id: NodeId, behaviors: &[Behavior]) -> Result<EdgeId> {
        let existing = self
            .dependencies(id)
            .find(|(_, d)| d.to() == id)
            .map(|(e, _)| e);
        let edge = match existing {
            Some(e) => e,
            None => self.add_dependency(id, id)?,
        };

        if let Some(dep) = self.edge_mut(edge) {
            for behavior in behaviors {
                let known = dep.has_matching_behavior(
                    &behavior.on_field,
                    Some(behavior.on_action),
                    &behavior.to_field,
                    Some(behavior.to_action),
                );
                if !known {
                    dep.push_behavior(behavior.clone());
                }
            }
        }
        Ok(edge)
    }

    /// Link two nodes without ownership
    ///
    /// Returns `(from -> to, to -> from)`; callers attach behaviors as needed.
    pub fn add_relationship(&mut self, from: NodeId, to: NodeId) -> Result<(EdgeId, EdgeId)> {
        let forward = self.add_dependency(from, to)?;
        let backward = self.add_dependency(to, from)?;
        Ok((forward, backward))
    }

    // ========================================================================
    // Relationship views
    // ========================================================================

    fn name_matches(&self, id: NodeId, name: Option<&str>) -> bool {
        match (name, self.node(id)) {
            (None, Some(_)) => true,
            (Some(n), Some(node)) => node.node_name() == n,
            (_, None) => false,
        }
    }

    /// Nodes `id` is the parent of
    pub fn get_children(&self, id: NodeId, name: Option<&str>) -> Vec<NodeId> {
        self.dependencies(id)
            .filter(|(_, d)| d.is_parent_relationship())
            .map(|(_, d)| d.to())
            .filter(|n| self.name_matches(*n, name))
            .collect()
    }

    /// Nodes `id` is a child of
    pub fn get_parents(&self, id: NodeId, name: Option<&str>) -> Vec<NodeId> {
        self.dependencies(id)
            .filter(|(_, d)| d.is_child_relationship())
            .map(|(_, d)| d.to())
            .filter(|n| self.name_matches(*n, name))
            .collect()
    }

    /// Nodes linked to `id` without ownership
    pub fn get_siblings(&self, id: NodeId, name: Option<&str>) -> Vec<NodeId> {
        let mut siblings: Vec<NodeId> = Vec::new();
        for (_, dep) in self.dependencies(id) {
            let to = dep.to();
            if to == id || dep.relationship().is_some() || siblings.contains(&to) {
                continue;
            }
            if self.name_matches(to, name) {
                siblings.push(to);
            }
        }
        siblings
    }

    /// Single child named `name` whose context carries every `(key, value)` filter
    ///
    /// Fails when more than one child matches.
    pub fn get_child(
        &self,
        id: NodeId,
        name: &str,
        filters: &[(&str, &str)],
    ) -> Result<Option<NodeId>> {
        let matches: Vec<NodeId> = self
            .get_children(id, Some(name))
            .into_iter()
            .filter(|child| {
                self.context_of(*child).is_some_and(|ctx| {
                    filters.iter().all(|(k, v)| ctx.get(k) == Some(*v))
                })
            })
            .collect();

        match matches.as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(Error::AmbiguousChild {
                name: name.to_string(),
                count: many.len(),
            }),
        }
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Nodes `id` needs to exist: outgoing non-parent edges with an Add-after-Add behavior
    fn requirements(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
        self.dependencies(id)
            .filter(move |(_, d)| d.to() != id && !d.is_parent_relationship())
            .filter(|(_, d)| {
                d.has_matching_behavior(
                    &FieldMatcher::Any,
                    Some(DiffAction::Add),
                    &FieldMatcher::Any,
                    Some(DiffAction::Add),
                )
            })
            .map(|(_, d)| d.to())
    }

    /// `id` followed by every node it transitively requires
    pub fn get_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut processed = HashSet::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            if !processed.insert(current) {
                continue;
            }
            ancestors.push(current);
            for required in self.requirements(current) {
                if !processed.contains(&required) {
                    stack.push(required);
                }
            }
        }
        ancestors
    }

    /// Check if some ancestor's context contains every part of `wanted`
    pub fn has_ancestor(&self, id: NodeId, wanted: &NodeContext) -> bool {
        self.get_ancestors(id)
            .into_iter()
            .filter_map(|a| self.context_of(a))
            .any(|ctx| wanted.is_subset_of(ctx))
    }

    /// Connected deployment boundary of `id`
    ///
    /// Expands through ancestors, children and sibling dependents. Fails
    /// with [`Error::CircularDependency`] if the requirement edges seen
    /// while expanding form a cycle.
    pub fn get_boundary_members(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut members = Vec::new();
        let mut is_member = HashSet::new();
        let mut extended = HashSet::new();
        let mut parent_of: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut extenders = VecDeque::from([id]);

        while let Some(extender) = extenders.pop_front() {
            if !extended.insert(extender) {
                continue;
            }

            for ancestor in self.get_ancestors(extender) {
                for required in self.requirements(ancestor) {
                    let entry = parent_of.entry(ancestor).or_default();
                    if !entry.contains(&required) {
                        entry.push(required);
                        self.check_acyclic(ancestor, &parent_of)?;
                    }
                }

                if is_member.insert(ancestor) {
                    members.push(ancestor);
                }

                for (_, dep) in self.dependents(ancestor) {
                    let from = dep.from();
                    if from != ancestor
                        && !dep.is_parent_relationship()
                        && !extended.contains(&from)
                    {
                        extenders.push_back(from);
                    }
                }
            }
        }

        Ok(members)
    }

    fn check_acyclic(&self, start: NodeId, parent_of: &HashMap<NodeId, Vec<NodeId>>) -> Result<()> {
        fn visit(
            node: NodeId,
            parent_of: &HashMap<NodeId, Vec<NodeId>>,
            path: &mut Vec<NodeId>,
            done: &mut HashSet<NodeId>,
        ) -> std::result::Result<(), Vec<NodeId>> {
            if let Some(pos) = path.iter().position(|n| *n == node) {
                let mut cycle = path[pos..].to_vec();
                cycle.push(node);
                return Err(cycle);
            }
            if done.contains(&node) {
                return Ok(());
            }
            path.push(node);
            for next in parent_of.get(&node).into_iter().flatten() {
                visit(*next, parent_of, path, done)?;
            }
            path.pop();
            done.insert(node);
            Ok(())
        }

        visit(start, parent_of, &mut Vec::new(), &mut HashSet::new()).map_err(|cycle| {
            Error::CircularDependency {
                path: cycle.into_iter().map(|n| self.context_string(n)).collect(),
            }
        })
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Check if another node still depends on `id`
    ///
    /// Parents pointing at `id` through their parent edge do not count.
    pub fn has_dependents(&self, id: NodeId) -> bool {
        self.dependents(id)
            .any(|(_, d)| d.from() != id && !d.is_parent_relationship())
    }

    /// Remove a node and all its edges
    ///
    /// Fails while other nodes depend on it, unless `force` is set.
    pub fn remove(&mut self, id: NodeId, force: bool) -> Result<N> {
        let context = self
            .context_of(id)
            .cloned()
            .ok_or_else(|| Error::NodeNotFound(format!("#{}", id.0)))?;

        if !force && self.has_dependents(id) {
            return Err(Error::DependentsExist {
                kind: N::KIND,
                node: context.to_string(),
            });
        }

        let touching: Vec<EdgeId> = self
            .dependencies(id)
            .chain(self.dependents(id))
            .map(|(e, _)| e)
            .collect();
        for edge in touching {
            self.remove_dependency(edge);
        }
        self.outgoing.remove(&id);
        self.incoming.remove(&id);
        self.index.remove(&context);

        self.nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or_else(|| Error::NodeNotFound(context.to_string()))
    }
}
