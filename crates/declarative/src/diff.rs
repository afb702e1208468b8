//! Diff records and the structural comparisons that produce them

use crate::node::NodeContext;
use crate::types::DiffAction;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Field used by parent-set diffs
pub const PARENT_FIELD: &str = "parent";

/// Field used by tag diffs
pub const TAGS_FIELD: &str = "tags";

/// Whether a diff describes a whole node or one of its fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffScope {
    /// The node itself is added or deleted
    Node,
    /// One field of an existing node changes
    Field,
}

/// An atomic declared change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub node: NodeContext,
    pub action: DiffAction,
    pub field: String,
    pub value: Value,
    pub scope: DiffScope,
}

impl Diff {
    /// Create a field-level diff
    pub fn new(
        node: NodeContext,
        action: DiffAction,
        field: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            node,
            action,
            field: field.into(),
            value,
            scope: DiffScope::Field,
        }
    }

    /// Create a diff that adds or deletes the whole node
    ///
    /// `field` is the node's id field, `value` its id.
    pub fn lifecycle(
        node: NodeContext,
        action: DiffAction,
        field: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            scope: DiffScope::Node,
            ..Self::new(node, action, field, value)
        }
    }

    pub fn is_lifecycle(&self) -> bool {
        self.scope == DiffScope::Node
    }

    /// Two diffs are duplicates when node, field and action agree
    pub fn is_duplicate_of(&self, other: &Diff) -> bool {
        self.node == other.node && self.field == other.field && self.action == other.action
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.action, self.node, self.field)
    }
}

/// Compare first-level property keys
///
/// Emits Delete for removed keys (carrying the previous value), Add for new
/// keys and Update for keys whose value changed. Nested values are compared
/// as a whole; a change anywhere below a key replaces that key.
pub fn diff_properties(
    node: &NodeContext,
    current: &Map<String, Value>,
    previous: &Map<String, Value>,
) -> Vec<Diff> {
    let mut diffs = Vec::new();

    for (key, value) in previous {
        if !current.contains_key(key) {
            diffs.push(Diff::new(
                node.clone(),
                DiffAction::Delete,
                key.clone(),
                value.clone(),
            ));
        }
    }

    for (key, value) in current {
        match previous.get(key) {
            None => diffs.push(Diff::new(
                node.clone(),
                DiffAction::Add,
                key.clone(),
                value.clone(),
            )),
            Some(before) if before != value => diffs.push(Diff::new(
                node.clone(),
                DiffAction::Update,
                key.clone(),
                value.clone(),
            )),
            Some(_) => {}
        }
    }

    diffs
}

/// Tag-set change bundled into one diff value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagChanges {
    pub add: BTreeMap<String, String>,
    pub delete: Vec<String>,
    pub update: BTreeMap<String, String>,
}

impl TagChanges {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.delete.is_empty() && self.update.is_empty()
    }

    /// Read tag changes back out of a diff value
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Compare tag maps; returns a single Update diff or nothing
pub fn diff_tags(
    node: &NodeContext,
    current: &BTreeMap<String, String>,
    previous: &BTreeMap<String, String>,
) -> Option<Diff> {
    let mut changes = TagChanges::default();

    for (key, value) in current {
        match previous.get(key) {
            None => {
                changes.add.insert(key.clone(), value.clone());
            }
            Some(before) if before != value => {
                changes.update.insert(key.clone(), value.clone());
            }
            Some(_) => {}
        }
    }
    for key in previous.keys() {
        if !current.contains_key(key) {
            changes.delete.push(key.clone());
        }
    }

    if changes.is_empty() {
        return None;
    }
    Some(Diff::new(
        node.clone(),
        DiffAction::Update,
        TAGS_FIELD,
        json!(changes),
    ))
}

/// Compare parent sets keyed by parent context
///
/// Each map value is the parent's comparable representation; a parent that
/// stays but whose representation changed produces an Update.
pub fn diff_parents(
    node: &NodeContext,
    current: &BTreeMap<NodeContext, Value>,
    previous: &BTreeMap<NodeContext, Value>,
) -> Vec<Diff> {
    let mut diffs = Vec::new();

    for (parent, before) in previous {
        match current.get(parent) {
            None => diffs.push(Diff::new(
                node.clone(),
                DiffAction::Delete,
                PARENT_FIELD,
                json!(parent.to_string()),
            )),
            Some(after) if after != before => diffs.push(Diff::new(
                node.clone(),
                DiffAction::Update,
                PARENT_FIELD,
                json!(parent.to_string()),
            )),
            Some(_) => {}
        }
    }
    for parent in current.keys() {
        if !previous.contains_key(parent) {
            diffs.push(Diff::new(
                node.clone(),
                DiffAction::Add,
                PARENT_FIELD,
                json!(parent.to_string()),
            ));
        }
    }

    diffs
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Nodes to add
    pub additions: usize,
    /// Nodes to remove
    pub removals: usize,
    /// Field changes on existing nodes
    pub modifications: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[Diff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match (diff.scope, diff.action) {
                (DiffScope::Node, DiffAction::Add) => summary.additions += 1,
                (DiffScope::Node, DiffAction::Delete) => summary.removals += 1,
                _ => summary.modifications += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by the node they touch
pub fn group_by_node(diffs: &[Diff]) -> BTreeMap<&NodeContext, Vec<&Diff>> {
    let mut groups: BTreeMap<&NodeContext, Vec<&Diff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(&diff.node).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn node() -> NodeContext {
        NodeContext::new("vpc", "vpc-1")
    }

    #[test]
    fn test_diff_against_self_is_empty() {
        let p = props(json!({"CidrBlock": "10.0.0.0/16", "nested": {"a": 1}}));
        assert!(diff_properties(&node(), &p, &p).is_empty());
    }

    #[test]
    fn test_property_diff_completeness() {
        let previous = props(json!({"keep": 1, "change": 1, "remove": 1}));
        let current = props(json!({"keep": 1, "change": 2, "add": 1}));
        let diffs = diff_properties(&node(), &current, &previous);

        let found: Vec<(DiffAction, &str)> =
            diffs.iter().map(|d| (d.action, d.field.as_str())).collect();
        assert_eq!(diffs.len(), 3);
        assert!(found.contains(&(DiffAction::Delete, "remove")));
        assert!(found.contains(&(DiffAction::Add, "add")));
        assert!(found.contains(&(DiffAction::Update, "change")));
        assert!(diffs.iter().all(|d| !d.is_lifecycle()));
    }

    #[test]
    fn test_nested_change_replaces_first_level_key() {
        let previous = props(json!({"config": {"a": 1, "b": 1}}));
        let current = props(json!({"config": {"a": 1, "b": 2}}));
        let diffs = diff_properties(&node(), &current, &previous);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "config");
        assert_eq!(diffs[0].value, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_diff_tags() {
        let previous: BTreeMap<String, String> = [("env", "qa"), ("team", "a"), ("old", "x")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut current = previous.clone();
        current.insert("team".into(), "b".into());
        current.insert("new".into(), "y".into());
        current.remove("old");

        let diff = diff_tags(&node(), &current, &previous).unwrap();
        assert_eq!(diff.action, DiffAction::Update);
        let changes = TagChanges::from_value(&diff.value).unwrap();
        assert_eq!(changes.add.get("new").map(String::as_str), Some("y"));
        assert_eq!(changes.update.get("team").map(String::as_str), Some("b"));
        assert_eq!(changes.delete, vec!["old".to_string()]);

        assert!(diff_tags(&node(), &previous, &previous).is_none());
    }

    #[test]
    fn test_diff_parents() {
        let sg = NodeContext::new("security-group", "sg-1");
        let subnet = NodeContext::new("subnet", "subnet-1");
        let role = NodeContext::new("iam-role", "role-1");

        let previous = BTreeMap::from([
            (subnet.clone(), json!({"cidr": "10.0.0.0/24"})),
            (role.clone(), json!({})),
        ]);
        let current = BTreeMap::from([
            (subnet.clone(), json!({"cidr": "10.0.1.0/24"})),
            (sg.clone(), json!({})),
        ]);

        let diffs = diff_parents(&node(), &current, &previous);
        let found: Vec<(DiffAction, Value)> =
            diffs.iter().map(|d| (d.action, d.value.clone())).collect();
        assert_eq!(diffs.len(), 3);
        assert!(found.contains(&(DiffAction::Update, json!(subnet.to_string()))));
        assert!(found.contains(&(DiffAction::Delete, json!(role.to_string()))));
        assert!(found.contains(&(DiffAction::Add, json!(sg.to_string()))));
    }

    #[test]
    fn test_summary_and_grouping() {
        let a = NodeContext::new("app", "a");
        let diffs = vec![
            Diff::lifecycle(a.clone(), DiffAction::Add, "appId", json!("a")),
            Diff::lifecycle(node(), DiffAction::Delete, "resourceId", json!("vpc-1")),
            Diff::new(a.clone(), DiffAction::Update, "name", json!("x")),
        ];
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(
            (summary.additions, summary.removals, summary.modifications),
            (1, 1, 1)
        );
        assert!(summary.has_changes());
        assert_eq!(group_by_node(&diffs).get(&a).map(Vec::len), Some(2));
    }
}
