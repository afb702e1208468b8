//! Core types for the transaction engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of change a diff declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAction {
    Add,
    Update,
    Delete,
    Validate,
    Replace,
}

impl DiffAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Validate => "validate",
            Self::Replace => "replace",
        }
    }
}

impl fmt::Display for DiffAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field selector used by dependency behaviors and behavior queries
///
/// `Any` matches every field. Serialized as an optional string, where
/// `null` stands for `Any`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum FieldMatcher {
    Any,
    Exact(String),
}

impl FieldMatcher {
    pub fn exact(field: impl Into<String>) -> Self {
        Self::Exact(field.into())
    }

    /// Check if this matcher selects `field`
    pub fn matches(&self, field: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(f) => f == field,
        }
    }

    /// Check if two matchers can select a common field
    pub fn overlaps(&self, other: &FieldMatcher) -> bool {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => true,
            (Self::Exact(a), Self::Exact(b)) => a == b,
        }
    }
}

impl From<&str> for FieldMatcher {
    fn from(field: &str) -> Self {
        Self::Exact(field.to_string())
    }
}

impl From<String> for FieldMatcher {
    fn from(field: String) -> Self {
        Self::Exact(field)
    }
}

impl From<Option<String>> for FieldMatcher {
    fn from(field: Option<String>) -> Self {
        field.map_or(Self::Any, Self::Exact)
    }
}

impl From<FieldMatcher> for Option<String> {
    fn from(matcher: FieldMatcher) -> Self {
        match matcher {
            FieldMatcher::Any => None,
            FieldMatcher::Exact(f) => Some(f),
        }
    }
}

impl fmt::Display for FieldMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Exact(field) => f.write_str(field),
        }
    }
}

/// Which side of the engine a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Logical infrastructure state
    Model,
    /// Physical cloud primitive
    Resource,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model => f.write_str("model"),
            Self::Resource => f.write_str("resource"),
        }
    }
}

/// Options for a transaction
///
/// The `yield_*` flags select which intermediate snapshots the transaction
/// surfaces while it runs. The final `Complete` snapshot is always produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Number of parallel jobs for same-level resource actions
    pub jobs: usize,
    /// Surface model diffs once their apply order is assigned
    pub yield_model_diffs: bool,
    /// Surface the model transaction once the model phase is done
    pub yield_model_transaction: bool,
    /// Surface the new resource graph produced by model actions
    pub yield_new_resources: bool,
    /// Surface the transaction that reconciled dirty resources
    pub yield_dirty_resource_transaction: bool,
    /// Surface the resource diffs before they are applied
    pub yield_resource_diffs: bool,
    /// Surface the resource transaction once the resource phase is done
    pub yield_resource_transaction: bool,
    /// Surface every applied level as soon as it completes
    pub yield_levels: bool,
}

impl TransactionOptions {
    /// Options that surface every snapshot kind
    pub fn yield_all() -> Self {
        Self {
            jobs: 4,
            yield_model_diffs: true,
            yield_model_transaction: true,
            yield_new_resources: true,
            yield_dirty_resource_transaction: true,
            yield_resource_diffs: true,
            yield_resource_transaction: true,
            yield_levels: true,
        }
    }
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            yield_model_diffs: false,
            yield_model_transaction: false,
            yield_new_resources: false,
            yield_dirty_resource_transaction: false,
            yield_resource_diffs: false,
            yield_resource_transaction: false,
            yield_levels: false,
        }
    }
}

/// Summary of an applied transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    pub other: usize,
    pub levels: usize,
}

impl TransactionSummary {
    /// Total number of diffs applied
    pub fn total(&self) -> usize {
        self.added + self.updated + self.deleted + self.other
    }

    /// Check if anything was applied
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &TransactionSummary) {
        self.added += other.added;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.other += other.other;
        self.levels += other.levels;
    }

    /// Count one applied diff action
    pub fn add_action(&mut self, action: DiffAction) {
        match action {
            DiffAction::Add => self.added += 1,
            DiffAction::Update => self.updated += 1,
            DiffAction::Delete => self.deleted += 1,
            DiffAction::Validate | DiffAction::Replace => self.other += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_matcher_overlaps() {
        let any = FieldMatcher::Any;
        let name = FieldMatcher::exact("name");
        assert!(any.overlaps(&name));
        assert!(name.overlaps(&any));
        assert!(name.overlaps(&FieldMatcher::exact("name")));
        assert!(!name.overlaps(&FieldMatcher::exact("other")));
        assert!(any.matches("anything"));
        assert!(!name.matches("other"));
    }

    #[test]
    fn test_field_matcher_serde() {
        let json = serde_json::to_string(&FieldMatcher::Any).unwrap();
        assert_eq!(json, "null");
        let parsed: FieldMatcher = serde_json::from_str("\"regionId\"").unwrap();
        assert_eq!(parsed, FieldMatcher::exact("regionId"));
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = TransactionSummary::default();
        summary.add_action(DiffAction::Add);
        summary.add_action(DiffAction::Delete);
        summary.add_action(DiffAction::Validate);
        assert_eq!(summary.total(), 3);
        assert!(summary.has_changes());

        let mut other = TransactionSummary::default();
        other.add_action(DiffAction::Update);
        other.levels = 2;
        summary.merge(&other);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.levels, 2);
    }
}
