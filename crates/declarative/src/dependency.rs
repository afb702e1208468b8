//! Dependency edges and their behaviors

use crate::node::NodeId;
use crate::types::{DiffAction, FieldMatcher};
use serde::{Deserialize, Serialize};

/// One ordering rule attached to a dependency `from -> to`
///
/// A diff on `from` with `(on_field, on_action)` is applied after a diff on
/// `to` with `(to_field, to_action)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behavior {
    pub on_field: FieldMatcher,
    pub on_action: DiffAction,
    pub to_field: FieldMatcher,
    pub to_action: DiffAction,
}

impl Behavior {
    pub fn new(
        on_field: impl Into<FieldMatcher>,
        on_action: DiffAction,
        to_field: impl Into<FieldMatcher>,
        to_action: DiffAction,
    ) -> Self {
        Self {
            on_field: on_field.into(),
            on_action,
            to_field: to_field.into(),
            to_action,
        }
    }

    fn matches(
        &self,
        on_field: &FieldMatcher,
        on_action: Option<DiffAction>,
        to_field: &FieldMatcher,
        to_action: Option<DiffAction>,
    ) -> bool {
        self.on_field.overlaps(on_field)
            && on_action.is_none_or(|a| a == self.on_action)
            && self.to_field.overlaps(to_field)
            && to_action.is_none_or(|a| a == self.to_action)
    }
}

/// Ownership marker of a dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    /// `from` is the parent of `to`
    Parent,
    /// `from` is a child of `to`
    Child,
}

/// Relationship marker with the fields that link the two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub kind: RelationshipKind,
    pub on_field: String,
    pub to_field: String,
}

/// Directed edge between two nodes of the same graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    from: NodeId,
    to: NodeId,
    behaviors: Vec<Behavior>,
    relationship: Option<Relationship>,
}

impl Dependency {
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self {
            from,
            to,
            behaviors: Vec::new(),
            relationship: None,
        }
    }

    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn to(&self) -> NodeId {
        self.to
    }

    pub fn behaviors(&self) -> &[Behavior] {
        &self.behaviors
    }

    pub fn relationship(&self) -> Option<&Relationship> {
        self.relationship.as_ref()
    }

    /// Append a behavior
    ///
    /// Does not deduplicate; check [`Dependency::has_matching_behavior`] first
    /// when duplicates matter.
    pub fn add_behavior(
        &mut self,
        on_field: impl Into<FieldMatcher>,
        on_action: DiffAction,
        to_field: impl Into<FieldMatcher>,
        to_action: DiffAction,
    ) {
        self.behaviors
            .push(Behavior::new(on_field, on_action, to_field, to_action));
    }

    pub(crate) fn push_behavior(&mut self, behavior: Behavior) {
        self.behaviors.push(behavior);
    }

    /// Mark `from` as the parent of `to`
    pub fn add_parent_relationship(&mut self, on_field: &str, to_field: &str) {
        self.relationship = Some(Relationship {
            kind: RelationshipKind::Parent,
            on_field: on_field.to_string(),
            to_field: to_field.to_string(),
        });
    }

    /// Mark `from` as a child of `to`
    pub fn add_child_relationship(&mut self, on_field: &str, to_field: &str) {
        self.relationship = Some(Relationship {
            kind: RelationshipKind::Child,
            on_field: on_field.to_string(),
            to_field: to_field.to_string(),
        });
    }

    pub(crate) fn set_relationship(&mut self, relationship: Option<Relationship>) {
        self.relationship = relationship;
    }

    pub fn is_parent_relationship(&self) -> bool {
        matches!(
            self.relationship,
            Some(Relationship {
                kind: RelationshipKind::Parent,
                ..
            })
        )
    }

    pub fn is_child_relationship(&self) -> bool {
        matches!(
            self.relationship,
            Some(Relationship {
                kind: RelationshipKind::Child,
                ..
            })
        )
    }

    /// Check if any behavior matches the query
    ///
    /// `FieldMatcher::Any` and `None` act as wildcards.
    pub fn has_matching_behavior(
        &self,
        on_field: &FieldMatcher,
        on_action: Option<DiffAction>,
        to_field: &FieldMatcher,
        to_action: Option<DiffAction>,
    ) -> bool {
        self.behaviors
            .iter()
            .any(|b| b.matches(on_field, on_action, to_field, to_action))
    }

    /// Check if a dependency with `(on_field, on_action)` on `from` waits on
    /// `(to_field, to_action)` on `to`
    pub fn requires(
        &self,
        on_field: &str,
        on_action: DiffAction,
        to_field: &str,
        to_action: DiffAction,
    ) -> bool {
        self.has_matching_behavior(
            &FieldMatcher::exact(on_field),
            Some(on_action),
            &FieldMatcher::exact(to_field),
            Some(to_action),
        )
    }

    /// Structural equality: same endpoints, same relationship, same behavior set
    pub fn is_equal(&self, other: &Dependency) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.relationship == other.relationship
            && self.behaviors.len() == other.behaviors.len()
            && self.behaviors.iter().all(|b| other.behaviors.contains(b))
    }
}
