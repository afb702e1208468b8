//! Physical resources and the resource graph
//!
//! A resource represents one cloud primitive (vpc, subnet, ecs service, ...).
//! Model actions produce resources; the engine compares the resources they
//! produced against the last persisted ones with [`diff_resources`] and hands
//! the resulting diffs to resource actions.
//!
//! Unlike models, resources keep their parents as a plain list. The graph
//! turns that list into parent/child edges on [`Graph::upsert`].

use crate::diff::{
    Diff, PARENT_FIELD, TAGS_FIELD, TagChanges, diff_parents, diff_properties, diff_tags,
};
use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::node::{Node, NodeContext, NodeId};
use crate::types::{DiffAction, FieldMatcher, NodeKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Id field of every resource; lifecycle diffs are raised on it
pub const RESOURCE_ID_FIELD: &str = "resourceId";

static RESOURCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("resource id pattern is valid"));

/// Check a resource id against `^[\w-]+$`
pub fn validate_resource_id(resource_id: &str) -> Result<()> {
    if RESOURCE_ID.is_match(resource_id) {
        Ok(())
    } else {
        Err(Error::InvalidResourceId(resource_id.to_string()))
    }
}

/// Physical cloud primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    node_name: String,
    resource_id: String,
    context: NodeContext,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    response: Map<String, Value>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    parents: Vec<NodeContext>,
    #[serde(default)]
    shared: bool,
    #[serde(default)]
    delete_marker: bool,
}

impl Resource {
    /// Create a resource whose context is `node_name=resource_id`
    pub fn new(node_name: impl Into<String>, resource_id: impl Into<String>) -> Result<Self> {
        let node_name = node_name.into();
        let resource_id = resource_id.into();
        validate_resource_id(&resource_id)?;

        Ok(Self {
            context: NodeContext::new(node_name.clone(), resource_id.clone()),
            node_name,
            resource_id,
            properties: Map::new(),
            response: Map::new(),
            tags: BTreeMap::new(),
            parents: Vec::new(),
            shared: false,
            delete_marker: false,
        })
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: &Resource) -> Self {
        self.add_parent(parent.context.clone());
        self
    }

    /// Mark as shared: producing it again merges instead of replacing
    pub fn shared(mut self) -> Self {
        self.shared = true;
        self
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    pub fn response(&self) -> &Map<String, Value> {
        &self.response
    }

    /// Record provider output, e.g. an ARN returned on creation
    pub fn set_response(&mut self, key: impl Into<String>, value: Value) {
        self.response.insert(key.into(), value);
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn parents(&self) -> &[NodeContext] {
        &self.parents
    }

    pub fn add_parent(&mut self, parent: NodeContext) {
        if !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }

    pub fn remove_parent(&mut self, parent: &NodeContext) {
        self.parents.retain(|p| p != parent);
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn is_marked_deleted(&self) -> bool {
        self.delete_marker
    }

    /// Exclude this resource from future planning; it is deleted on the next
    /// resource phase
    pub fn mark_deleted(&mut self) {
        self.delete_marker = true;
    }

    /// Overwrite this resource's data with `other`'s, keeping identity
    pub fn clone_from_resource(&mut self, other: &Resource) {
        self.properties = other.properties.clone();
        self.response = other.response.clone();
        self.tags = other.tags.clone();
        self.parents = other.parents.clone();
        self.shared = other.shared;
        self.delete_marker = other.delete_marker;
    }

    /// Shared-resource merge
    ///
    /// Properties from `other` overlay ours, parents and tags are unioned,
    /// our response is kept. The merged resource stays marked deleted only
    /// if both sides are.
    pub fn merge(&mut self, other: &Resource) {
        for (key, value) in &other.properties {
            self.properties.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.tags {
            self.tags.insert(key.clone(), value.clone());
        }
        for parent in &other.parents {
            self.add_parent(parent.clone());
        }
        if self.response.is_empty() {
            self.response = other.response.clone();
        }
        self.delete_marker = self.delete_marker && other.delete_marker;
    }

    /// Property and tag diffs against the previous snapshot
    ///
    /// Parent diffs need the surrounding graphs; see [`diff_resources`].
    pub fn diff(&self, previous: &Resource) -> Vec<Diff> {
        let mut diffs = diff_properties(&self.context, &self.properties, &previous.properties);
        diffs.extend(diff_tags(&self.context, &self.tags, &previous.tags));
        diffs
    }

    /// The diff that undoes `diff`, with `self` as the state before it
    pub fn diff_inverse(&self, diff: &Diff) -> Diff {
        let mut inverse = diff.clone();

        if diff.is_lifecycle() {
            inverse.action = match diff.action {
                DiffAction::Add => DiffAction::Delete,
                DiffAction::Delete => DiffAction::Add,
                other => other,
            };
            return inverse;
        }

        match (diff.field.as_str(), diff.action) {
            (TAGS_FIELD, DiffAction::Update) => {
                if let Some(changes) = TagChanges::from_value(&diff.value) {
                    let undone = TagChanges {
                        add: pick_tags(&self.tags, changes.delete.iter()),
                        delete: changes.add.keys().cloned().collect(),
                        update: pick_tags(&self.tags, changes.update.keys()),
                    };
                    inverse.value = json!(undone);
                }
            }
            (_, DiffAction::Add) => inverse.action = DiffAction::Delete,
            (_, DiffAction::Delete) => inverse.action = DiffAction::Add,
            (PARENT_FIELD, _) => {}
            (field, DiffAction::Update) => {
                inverse.value = self.properties.get(field).cloned().unwrap_or(Value::Null);
            }
            _ => {}
        }
        inverse
    }

    /// Apply a field diff to this resource's data
    ///
    /// Lifecycle diffs other than Delete leave the data untouched; a
    /// lifecycle Delete sets the delete marker.
    pub fn apply_diff(&mut self, diff: &Diff) -> Result<()> {
        if diff.is_lifecycle() {
            if diff.action == DiffAction::Delete {
                self.delete_marker = true;
            }
            return Ok(());
        }

        match diff.field.as_str() {
            TAGS_FIELD => {
                if let Some(changes) = TagChanges::from_value(&diff.value) {
                    for key in &changes.delete {
                        self.tags.remove(key);
                    }
                    self.tags.extend(changes.add);
                    self.tags.extend(changes.update);
                }
            }
            PARENT_FIELD => {
                let raw = diff.value.as_str().ok_or_else(|| Error::ContextParse {
                    input: diff.value.to_string(),
                    reason: "parent diff value must be a context string".into(),
                })?;
                let parent = NodeContext::parse(raw)?;
                match diff.action {
                    DiffAction::Add => self.add_parent(parent),
                    DiffAction::Delete => self.remove_parent(&parent),
                    _ => {}
                }
            }
            field => match diff.action {
                DiffAction::Add | DiffAction::Update | DiffAction::Replace => {
                    self.properties.insert(field.to_string(), diff.value.clone());
                }
                DiffAction::Delete => {
                    self.properties.remove(field);
                }
                DiffAction::Validate => {}
            },
        }
        Ok(())
    }
}

impl Node for Resource {
    const KIND: NodeKind = NodeKind::Resource;

    fn context(&self) -> &NodeContext {
        &self.context
    }

    fn node_name(&self) -> &str {
        &self.node_name
    }

    fn un_synth(value: Value) -> Result<Self> {
        let resource: Self = serde_json::from_value(value)?;
        validate_resource_id(&resource.resource_id)?;
        Ok(resource)
    }
}

/// Graph of physical resources
pub type ResourceGraph = Graph<Resource>;

impl Graph<Resource> {
    /// Insert or update a resource and reconcile its parent edges
    ///
    /// Every listed parent must already be in the graph. When both the
    /// stored and the incoming resource are shared they are merged,
    /// otherwise the incoming one replaces the stored one.
    pub fn upsert(&mut self, resource: Resource) -> Result<NodeId> {
        self.insert_resource(resource, true)
    }

    /// Insert or replace a resource without shared merging
    pub fn put(&mut self, resource: Resource) -> Result<NodeId> {
        self.insert_resource(resource, false)
    }

    /// Upsert a batch, parents before children
    pub fn upsert_all(
        &mut self,
        resources: impl IntoIterator<Item = Resource>,
    ) -> Result<Vec<NodeId>> {
        let mut pending: Vec<Resource> = resources.into_iter().collect();
        let mut ids = Vec::with_capacity(pending.len());

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for resource in pending {
                if resource.parents.iter().all(|p| self.contains(p)) {
                    ids.push(self.upsert(resource)?);
                } else {
                    deferred.push(resource);
                }
            }
            if deferred.len() == before {
                let missing = deferred
                    .iter()
                    .flat_map(|r| r.parents.iter())
                    .find(|p| !self.contains(p))
                    .map(ToString::to_string)
                    .unwrap_or_default();
                return Err(Error::NodeNotFound(missing));
            }
            pending = deferred;
        }
        Ok(ids)
    }

    /// First resource with this resource id, whatever its node name
    pub fn find_by_resource_id(&self, resource_id: &str) -> Option<NodeId> {
        self.nodes()
            .find(|(_, r)| r.resource_id == resource_id)
            .map(|(id, _)| id)
    }

    pub fn resource(&self, context: &NodeContext) -> Option<&Resource> {
        self.get(context).and_then(|id| self.node(id))
    }

    fn insert_resource(&mut self, resource: Resource, merge_shared: bool) -> Result<NodeId> {
        if resource.parents.contains(&resource.context) {
            return Err(Error::CircularDependency {
                path: vec![resource.context.to_string(); 2],
            });
        }
        if let Some(missing) = resource.parents.iter().find(|p| !self.contains(p)) {
            return Err(Error::NodeNotFound(missing.to_string()));
        }

        let id = match self.get(&resource.context) {
            Some(id) => {
                let existing = self
                    .node_mut(id)
                    .ok_or_else(|| Error::NodeNotFound(resource.context.to_string()))?;
                if merge_shared && existing.shared && resource.shared {
                    existing.merge(&resource);
                } else {
                    existing.clone_from_resource(&resource);
                }
                id
            }
            None => self.add_node(resource)?,
        };

        self.reconcile_parents(id)?;
        Ok(id)
    }

    fn reconcile_parents(&mut self, id: NodeId) -> Result<()> {
        let wanted: Vec<NodeId> = self
            .node(id)
            .map(|r| r.parents.iter().filter_map(|p| self.get(p)).collect())
            .unwrap_or_default();
        let current = self.get_parents(id, None);

        for stale in current.iter().filter(|p| !wanted.contains(p)) {
            self.remove_relationship(id, *stale);
        }
        for parent in wanted {
            if !current.contains(&parent) {
                self.link_parent(parent, id)?;
            }
        }
        Ok(())
    }

    fn link_parent(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let (child_to_parent, parent_to_child) =
            self.add_child(parent, RESOURCE_ID_FIELD, child, RESOURCE_ID_FIELD)?;

        use DiffAction::{Add, Delete, Update};
        use FieldMatcher::Any;

        if let Some(dep) = self.edge_mut(child_to_parent) {
            dep.add_behavior(Any, Add, RESOURCE_ID_FIELD, Add);
            dep.add_behavior(Any, Update, RESOURCE_ID_FIELD, Add);
            dep.add_behavior(PARENT_FIELD, Update, Any, Update);
            dep.add_behavior(RESOURCE_ID_FIELD, Add, Any, Update);
        }
        if let Some(dep) = self.edge_mut(parent_to_child) {
            dep.add_behavior(RESOURCE_ID_FIELD, Delete, PARENT_FIELD, Delete);
        }
        Ok(())
    }
}

fn pick_tags<'k>(
    tags: &BTreeMap<String, String>,
    keys: impl Iterator<Item = &'k String>,
) -> BTreeMap<String, String> {
    keys.filter_map(|k| tags.get(k).map(|v| (k.clone(), v.clone())))
        .collect()
}

fn parent_representations(
    graph: &ResourceGraph,
    resource: &Resource,
) -> BTreeMap<NodeContext, Value> {
    resource
        .parents
        .iter()
        .map(|p| {
            let repr = graph
                .resource(p)
                .map_or(Value::Null, |parent| json!(parent.properties));
            (p.clone(), repr)
        })
        .collect()
}

fn lifecycle(resource: &Resource, action: DiffAction) -> Diff {
    Diff::lifecycle(
        resource.context.clone(),
        action,
        RESOURCE_ID_FIELD,
        json!(resource.resource_id),
    )
}

/// Compare two resource graphs
///
/// - in `new` only: lifecycle Add, unless already marked deleted
/// - marked deleted in `new` but live in `old`: lifecycle Delete
/// - live in `old` only: lifecycle Delete
/// - live on both sides: property, tag and parent diffs
pub fn diff_resources(new: &ResourceGraph, old: &ResourceGraph) -> Vec<Diff> {
    let mut diffs = Vec::new();

    for (_, resource) in new.nodes() {
        let previous = old.resource(&resource.context);
        match (previous, resource.delete_marker) {
            (None, false) => diffs.push(lifecycle(resource, DiffAction::Add)),
            (None, true) => {}
            (Some(prev), true) => {
                if !prev.delete_marker {
                    diffs.push(lifecycle(resource, DiffAction::Delete));
                }
            }
            (Some(prev), false) if prev.delete_marker => {
                diffs.push(lifecycle(resource, DiffAction::Add));
            }
            (Some(prev), false) => {
                diffs.extend(resource.diff(prev));
                diffs.extend(diff_parents(
                    &resource.context,
                    &parent_representations(new, resource),
                    &parent_representations(old, prev),
                ));
            }
        }
    }

    for (_, resource) in old.nodes() {
        if !resource.delete_marker && !new.contains(&resource.context) {
            diffs.push(lifecycle(resource, DiffAction::Delete));
        }
    }

    diffs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc() -> Resource {
        Resource::new("vpc", "vpc-1")
            .unwrap()
            .with_property("CidrBlock", json!("10.0.0.0/16"))
    }

    fn subnet(parent: &Resource) -> Resource {
        Resource::new("subnet", "subnet-1")
            .unwrap()
            .with_property("CidrBlock", json!("10.0.0.0/24"))
            .with_parent(parent)
    }

    fn graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        let vpc = vpc();
        let subnet = subnet(&vpc);
        graph.upsert_all([subnet, vpc]).unwrap();
        graph
    }

    #[test]
    fn test_resource_id_validation() {
        assert!(Resource::new("vpc", "vpc-1_a").is_ok());
        assert!(matches!(
            Resource::new("vpc", "vpc 1"),
            Err(Error::InvalidResourceId(_))
        ));
        assert!(Resource::new("vpc", "").is_err());

        let mut snapshot = vpc().synth().unwrap();
        snapshot["resourceId"] = json!("bad/id");
        assert!(Resource::un_synth(snapshot).is_err());
    }

    #[test]
    fn test_upsert_links_parents() {
        let graph = graph();
        let vpc = graph.get(&NodeContext::new("vpc", "vpc-1")).unwrap();
        let subnet = graph.get(&NodeContext::new("subnet", "subnet-1")).unwrap();

        assert_eq!(graph.get_parents(subnet, None), vec![vpc]);
        assert_eq!(graph.get_children(vpc, Some("subnet")), vec![subnet]);

        let edge = graph
            .dependencies(subnet)
            .find(|(_, d)| d.to() == vpc)
            .map(|(_, d)| d)
            .unwrap();
        assert!(edge.requires("CidrBlock", DiffAction::Update, RESOURCE_ID_FIELD, DiffAction::Add));
        assert!(edge.requires(PARENT_FIELD, DiffAction::Add, RESOURCE_ID_FIELD, DiffAction::Add));
        assert!(edge.requires(PARENT_FIELD, DiffAction::Update, "CidrBlock", DiffAction::Update));
    }

    #[test]
    fn test_upsert_rejects_unknown_parent() {
        let mut graph = ResourceGraph::new();
        let err = graph.upsert(subnet(&vpc())).unwrap_err();
        assert!(matches!(err, Error::NodeNotFound(_)));
    }

    #[test]
    fn test_upsert_drops_stale_parent_edges() {
        let mut graph = graph();
        let mut orphan = graph
            .resource(&NodeContext::new("subnet", "subnet-1"))
            .cloned()
            .unwrap();
        orphan.remove_parent(&NodeContext::new("vpc", "vpc-1"));
        let id = graph.upsert(orphan).unwrap();
        assert!(graph.get_parents(id, None).is_empty());

        let vpc = graph.get(&NodeContext::new("vpc", "vpc-1")).unwrap();
        assert!(graph.remove(vpc, false).is_ok());
    }

    #[test]
    fn test_remove_with_dependents() {
        let mut graph = graph();
        let vpc = graph.get(&NodeContext::new("vpc", "vpc-1")).unwrap();
        let err = graph.remove(vpc, false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot remove resource until dependent nodes exist!"
        );
        assert!(graph.remove(vpc, true).is_ok());
    }

    #[test]
    fn test_shared_resources_merge() {
        let mut graph = ResourceGraph::new();
        let role = Resource::new("iam-role", "role-1")
            .unwrap()
            .with_property("a", json!(1))
            .with_tag("team", "one")
            .shared();
        graph.upsert(role).unwrap();

        let mut other = Resource::new("iam-role", "role-1")
            .unwrap()
            .with_property("b", json!(2))
            .with_tag("env", "qa")
            .shared();
        other.mark_deleted();
        graph.upsert(other).unwrap();

        let merged = graph.resource(&NodeContext::new("iam-role", "role-1")).unwrap();
        assert_eq!(merged.property("a"), Some(&json!(1)));
        assert_eq!(merged.property("b"), Some(&json!(2)));
        assert_eq!(merged.tags().len(), 2);
        assert!(!merged.is_marked_deleted());

        // Non-shared resources are replaced
        graph.upsert(vpc()).unwrap();
        graph.upsert(Resource::new("vpc", "vpc-1").unwrap()).unwrap();
        let replaced = graph.resource(&NodeContext::new("vpc", "vpc-1")).unwrap();
        assert!(replaced.properties().is_empty());
    }

    #[test]
    fn test_clone_from_resource_keeps_identity() {
        let mut target = vpc();
        target.set_response("VpcId", json!("vpc-0abc"));

        let mut source = Resource::new("vpc", "vpc-2")
            .unwrap()
            .with_property("CidrBlock", json!("10.1.0.0/16"))
            .with_tag("env", "qa")
            .shared();
        source.add_parent(NodeContext::new("account", "main"));
        source.mark_deleted();

        target.clone_from_resource(&source);
        assert_eq!(target.resource_id(), "vpc-1");
        assert_eq!(target.context(), &NodeContext::new("vpc", "vpc-1"));
        assert_eq!(target.properties(), source.properties());
        assert_eq!(target.tags(), source.tags());
        assert_eq!(target.parents(), &[NodeContext::new("account", "main")]);
        assert!(target.response().is_empty());
        assert!(target.is_shared());
        assert!(target.is_marked_deleted());
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut graph = graph();
        let vpc_id = graph.get(&NodeContext::new("vpc", "vpc-1")).unwrap();
        let subnet_id = graph.get(&NodeContext::new("subnet", "subnet-1")).unwrap();

        let resized = vpc().with_property("CidrBlock", json!("10.9.0.0/16"));
        assert_eq!(graph.upsert(resized).unwrap(), vpc_id);
        assert_eq!(graph.len(), 2);
        assert_eq!(
            graph.node(vpc_id).unwrap().property("CidrBlock"),
            Some(&json!("10.9.0.0/16"))
        );
        assert_eq!(graph.get_parents(subnet_id, None), vec![vpc_id]);
    }

    #[test]
    fn test_diff_against_self_is_empty() {
        let graph = graph();
        assert!(diff_resources(&graph, &graph.clone()).is_empty());
        let vpc = vpc().with_tag("env", "qa");
        assert!(vpc.diff(&vpc).is_empty());
    }

    #[test]
    fn test_diff_resources_lifecycle() {
        let old = graph();
        let mut new = old.clone();
        let mut marked = new.resource(&NodeContext::new("subnet", "subnet-1")).cloned().unwrap();
        marked.mark_deleted();
        new.upsert(marked).unwrap();
        new.upsert(Resource::new("s3", "bucket-1").unwrap()).unwrap();

        let diffs = diff_resources(&new, &old);
        assert_eq!(diffs.len(), 2);
        assert!(diffs.iter().any(|d| d.is_lifecycle()
            && d.action == DiffAction::Add
            && d.value == json!("bucket-1")));
        assert!(diffs.iter().any(|d| d.is_lifecycle()
            && d.action == DiffAction::Delete
            && d.node == NodeContext::new("subnet", "subnet-1")));

        // Marked on both sides: nothing left to do
        assert!(diff_resources(&new, &new.clone()).is_empty());
        // Vanished resources are deleted
        let diffs = diff_resources(&ResourceGraph::new(), &old);
        assert_eq!(diffs.len(), 2);
        assert!(diffs.iter().all(|d| d.action == DiffAction::Delete));
    }

    #[test]
    fn test_parent_update_follows_parent_properties() {
        let old = graph();
        let mut new = old.clone();
        new.upsert(vpc().with_property("CidrBlock", json!("10.1.0.0/16")))
            .unwrap();

        let diffs = diff_resources(&new, &old);
        assert!(diffs.iter().any(|d| d.node == NodeContext::new("vpc", "vpc-1")
            && d.action == DiffAction::Update
            && d.field == "CidrBlock"));
        assert!(diffs.iter().any(|d| d.node == NodeContext::new("subnet", "subnet-1")
            && d.action == DiffAction::Update
            && d.field == PARENT_FIELD));
    }

    #[test]
    fn test_apply_and_inverse() {
        let before = vpc().with_tag("env", "qa").with_tag("team", "a");
        let after = vpc()
            .with_property("CidrBlock", json!("10.1.0.0/16"))
            .with_property("EnableDns", json!(true))
            .with_tag("team", "b")
            .with_tag("owner", "x");

        let mut applied = before.clone();
        for diff in after.diff(&before) {
            applied.apply_diff(&diff).unwrap();
        }
        assert_eq!(applied, after);

        let mut restored = applied.clone();
        for diff in after.diff(&before) {
            restored.apply_diff(&before.diff_inverse(&diff)).unwrap();
        }
        assert_eq!(restored, before);

        let add = lifecycle(&before, DiffAction::Add);
        assert_eq!(before.diff_inverse(&add).action, DiffAction::Delete);
    }

    #[test]
    fn test_apply_parent_diff() {
        let vpc = vpc();
        let mut subnet = Resource::new("subnet", "subnet-1").unwrap();
        let add = Diff::new(
            subnet.context().clone(),
            DiffAction::Add,
            PARENT_FIELD,
            json!(vpc.context().to_string()),
        );
        subnet.apply_diff(&add).unwrap();
        assert_eq!(subnet.parents(), &[vpc.context().clone()]);

        subnet.apply_diff(&subnet.diff_inverse(&add)).unwrap();
        assert!(subnet.parents().is_empty());

        let bad = Diff::new(
            subnet.context().clone(),
            DiffAction::Add,
            PARENT_FIELD,
            json!(1),
        );
        assert!(subnet.apply_diff(&bad).is_err());
    }
}
