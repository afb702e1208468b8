//! # Declarative
//!
//! A transaction engine for declarative infrastructure.
//!
//! Desired infrastructure is described as a graph of logical models. Changes
//! to that graph are diffed, ordered by the dependency behaviors of the graph,
//! and applied level by level: model actions translate model diffs into cloud
//! resources, then resource actions converge those resources.
//!
//! ## Core Concepts
//!
//! - **Graph**: Arena of nodes plus dependency edges carrying ordering behaviors
//! - **Diff**: One change to a node, either whole-node (lifecycle) or per field
//! - **DiffMetadata**: A diff with its matched actions and assigned apply order
//! - **ResourceStore**: The `old`/`new`/`actual` resource graphs used for
//!   dirty-state tracking
//! - **Transaction**: A resumable state machine yielding snapshots per level
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{
//!     GraphPair, ModelGraph, ResourceStore, TransactionOptions, TransactionService,
//!     diff_models,
//! };
//!
//! let service = TransactionService::new()
//!     .with_model_action(AddRegionModelAction)
//!     .with_resource_action(AddVpcResourceAction);
//!
//! let diffs = diff_models(&new_models, &old_models);
//! let mut store = ResourceStore::new();
//!
//! let outcome = service
//!     .begin_transaction(
//!         diffs,
//!         GraphPair::new(&new_models, &old_models),
//!         &mut store,
//!         TransactionOptions::default(),
//!     )
//!     .finish();
//!
//! // Committing after a failure keeps the unconfirmed part dirty
//! store.commit()?;
//! outcome?;
//! ```
//!
//! ## Provider Traits
//!
//! The engine never talks to a cloud provider itself:
//!
//! - [`ModelAction`]: Turns model diffs into resources
//! - [`ResourceAction`]: Performs the provider calls for resource diffs
//! - [`ProgressCallback`]: Receives progress updates
//!
//! Actions are registered on the [`TransactionService`] by the caller.

pub mod context;
pub mod dependency;
pub mod diff;
pub mod error;
pub mod executor;
pub mod graph;
pub mod model;
pub mod node;
pub mod planner;
pub mod resource;
pub mod serialize;
pub mod store;
pub mod types;

// Re-export main types at crate root
pub use context::{
    Action, ActionInput, ActionInputs, ActionOutputs, ApplyContext, ModelAction, NoProgress,
    ProgressCallback, ResourceAction,
};
pub use dependency::{Behavior, Dependency, Relationship, RelationshipKind};
pub use diff::{Diff, DiffScope, DiffSummary, TagChanges, diff_properties, group_by_node};
pub use error::{Error, Result};
pub use executor::{
    DirtyState, ModelTransaction, ResourceTransaction, Transaction, TransactionOutcome,
    TransactionPhase, TransactionService, TransactionSnapshot, TransactionState,
};
pub use graph::Graph;
pub use model::{Model, ModelGraph, ModelSchema, diff_models};
pub use node::{EdgeId, Node, NodeContext, NodeId};
pub use planner::{
    DependencyLookup, DiffMetadata, GraphPair, ModelDiffMetadata, ResourceDiffMetadata,
    assign_apply_order, group_by_level,
};
pub use resource::{Resource, ResourceGraph, diff_resources};
pub use serialize::{SerializedGraph, deserialize_graph, serialize_graph};
pub use store::ResourceStore;
pub use types::{DiffAction, FieldMatcher, NodeKind, TransactionOptions, TransactionSummary};
