//! Error types for the transaction engine
//!
//! Structural graph errors and diff-level conflicts are raised before any
//! action runs. Action failures carry the action name and the diff that was
//! being applied so callers can decide what to commit.

use crate::types::{DiffAction, NodeKind};
use thiserror::Error;

/// Errors that can occur while building graphs or running transactions
#[derive(Error, Debug)]
pub enum Error {
    /// A parent/child relationship already links the two nodes
    #[error("Dependency relationship already exists!")]
    DuplicateRelationship { from: String, to: String },

    /// A node with the same context is already in the graph
    #[error("node already exists: {0}")]
    DuplicateNode(String),

    /// The graph or the diff population contains a cycle
    #[error("Found circular dependencies!")]
    CircularDependency { path: Vec<String> },

    /// One node is added and deleted/updated in the same transaction
    #[error("Found conflicting actions in same transaction!")]
    ConflictingActions {
        node: String,
        actions: Vec<DiffAction>,
    },

    /// A singular child lookup matched more than one node
    #[error("Found multiple matching children!")]
    AmbiguousChild { name: String, count: usize },

    /// A diff targets a resource whose last operation is unconfirmed
    #[error("Cannot operate diff on dirty resources!")]
    DirtyResource { resource: String },

    /// Other nodes still depend on the node being removed
    #[error("Cannot remove {kind} until dependent nodes exist!")]
    DependentsExist { kind: NodeKind, node: String },

    /// Resource id does not match `^[\w-]+$`
    #[error("invalid resource id: {0:?}")]
    InvalidResourceId(String),

    /// No node with this context exists
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// A context string could not be parsed
    #[error("invalid context {input:?}: {reason}")]
    ContextParse { input: String, reason: String },

    /// An action asked for an input nobody provided
    #[error("input not found: {0}")]
    InputNotFound(String),

    /// Two actions in the same level wrote one resource outside the shared path
    #[error("resource {0} is written by more than one action in the same level")]
    OverlappingResourceWrite(String),

    /// A model or resource action failed
    #[error("action {action} failed on {diff}: {source}")]
    Action {
        action: String,
        diff: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Worker pool for same-level resource actions could not be created
    #[error("failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Snapshot (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a collaborator failure with the action and diff it happened on
    pub fn action(action: &str, diff: impl ToString, source: anyhow::Error) -> Self {
        Self::Action {
            action: action.to_string(),
            diff: diff.to_string(),
            source: source.into(),
        }
    }

    /// Whether the diff set was rejected as a whole
    ///
    /// Conflicting, circular and dirty-dependent diff sets are rejected while
    /// levels are planned, before any resource action of the transaction runs.
    pub fn is_planning_error(&self) -> bool {
        matches!(
            self,
            Self::ConflictingActions { .. }
                | Self::CircularDependency { .. }
                | Self::DirtyResource { .. }
        )
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;
