//! Transaction engine - applies model then resource diffs level by level
//!
//! A [`Transaction`] is a state machine driven through [`Iterator`]: every
//! call to `next` performs at most one unit of work (planning, one level,
//! one phase transition) and yields the snapshots the caller opted into.
//! Dropping the transaction between two items abandons it; levels already
//! applied stay applied and nothing of a later level has started.

use crate::context::{
    Action, ActionInput, ActionInputs, ApplyContext, ModelAction, NoProgress, ProgressCallback,
    ResourceAction,
};
use crate::diff::Diff;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::node::{Node, NodeContext};
use crate::planner::{
    DiffMetadata, GraphPair, ModelDiffMetadata, ResourceDiffMetadata, assign_apply_order,
    group_by_level, group_duplicates,
};
use crate::resource::{Resource, ResourceGraph};
use crate::store::ResourceStore;
use crate::types::{NodeKind, TransactionOptions, TransactionSummary};
use rayon::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

/// Input key prefix that resolves to a resource by id
pub const RESOURCE_INPUT_PREFIX: &str = "resource.";

/// Applied model diffs, one vector per level
pub type ModelTransaction = Vec<Vec<ModelDiffMetadata>>;

/// Applied resource diffs, one vector per level
pub type ResourceTransaction = Vec<Vec<ResourceDiffMetadata>>;

/// Stage a transaction failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Planning,
    Model,
    ResourcePlanning,
    DirtyResource,
    Resource,
}

/// What is known about a failed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirtyState {
    pub phase: TransactionPhase,
    /// Levels of the failing phase whose diffs all applied
    pub completed_levels: usize,
    /// Whether some resource action ran, so `actual` may lag behind
    pub resources_touched: bool,
}

/// Transaction progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionState {
    NotStarted,
    ModelPhase,
    ModelPhaseDone,
    DirtyResourcePhase,
    ResourceDiffReady,
    ResourcePhase,
    Committed,
    Failed(DirtyState),
}

/// Intermediate state surfaced by a running transaction
#[derive(Debug, Clone)]
pub enum TransactionSnapshot {
    /// Model diffs with their apply order assigned
    ModelDiffs(Vec<ModelDiffMetadata>),
    /// One applied model level
    ModelLevel {
        level: usize,
        diffs: Vec<ModelDiffMetadata>,
    },
    ModelTransaction(ModelTransaction),
    /// Resource graph the model actions produced
    NewResources(ResourceGraph),
    DirtyResourceTransaction(ResourceTransaction),
    /// Planned resource diffs, before any resource action runs
    ResourceDiffs(Vec<ResourceDiffMetadata>),
    /// One applied resource level; `dirty` for levels reconciling dirty state
    ResourceLevel {
        level: usize,
        dirty: bool,
        diffs: Vec<ResourceDiffMetadata>,
    },
    ResourceTransaction(ResourceTransaction),
    /// Always the last item of a successful transaction
    Complete(ModelTransaction),
}

impl TransactionSnapshot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModelDiffs(_) => "modelDiffs",
            Self::ModelLevel { .. } => "modelLevel",
            Self::ModelTransaction(_) => "modelTransaction",
            Self::NewResources(_) => "newResources",
            Self::DirtyResourceTransaction(_) => "dirtyResourceTransaction",
            Self::ResourceDiffs(_) => "resourceDiffs",
            Self::ResourceLevel { .. } => "resourceLevel",
            Self::ResourceTransaction(_) => "resourceTransaction",
            Self::Complete(_) => "complete",
        }
    }
}

/// Everything a finished transaction applied
#[derive(Debug, Clone, Default)]
pub struct TransactionOutcome {
    pub model_transaction: ModelTransaction,
    pub dirty_resource_transaction: ResourceTransaction,
    pub resource_transaction: ResourceTransaction,
    pub summary: TransactionSummary,
}

/// Entry point of the engine
///
/// Holds the registered actions and the resolved module inputs. Actions
/// and inputs are injected by the caller; nothing is looked up globally.
#[derive(Default)]
pub struct TransactionService {
    model_actions: Vec<Arc<dyn ModelAction>>,
    resource_actions: Vec<Arc<dyn ResourceAction>>,
    inputs: BTreeMap<String, Value>,
}

impl TransactionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model_action(mut self, action: impl ModelAction + 'static) -> Self {
        self.model_actions.push(Arc::new(action));
        self
    }

    pub fn with_resource_action(mut self, action: impl ResourceAction + 'static) -> Self {
        self.resource_actions.push(Arc::new(action));
        self
    }

    pub fn register_model_action(&mut self, action: Arc<dyn ModelAction>) {
        self.model_actions.push(action);
    }

    pub fn register_resource_action(&mut self, action: Arc<dyn ResourceAction>) {
        self.resource_actions.push(action);
    }

    /// Inputs handed to model actions, keyed like `module.input.key`
    pub fn with_inputs(mut self, inputs: BTreeMap<String, Value>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn inputs(&self) -> &BTreeMap<String, Value> {
        &self.inputs
    }

    pub fn model_diff_metadata(&self, diffs: Vec<Diff>) -> Vec<ModelDiffMetadata> {
        diffs
            .into_iter()
            .map(|d| ModelDiffMetadata::matching(d, &self.model_actions))
            .collect()
    }

    pub fn resource_diff_metadata(&self, diffs: Vec<Diff>) -> Vec<ResourceDiffMetadata> {
        diffs
            .into_iter()
            .map(|d| ResourceDiffMetadata::matching(d, &self.resource_actions))
            .collect()
    }

    /// Start a transaction applying `diffs` on the model graph `models.new`
    ///
    /// `models.old` is the model graph before the change; it orders diffs
    /// whose edges no longer exist in the new graph.
    pub fn begin_transaction<'a>(
        &'a self,
        diffs: Vec<Diff>,
        models: GraphPair<'a, Model>,
        store: &'a mut ResourceStore,
        options: TransactionOptions,
    ) -> Transaction<'a> {
        Transaction::new(self, Mode::Forward { diffs, models }, store, options)
    }

    /// Start a transaction undoing a previously applied model transaction
    ///
    /// Levels are reverted in reverse order with the inputs and outputs
    /// recorded when they were applied; the resulting resources are then
    /// diffed and applied like any other transaction.
    pub fn rollback_transaction<'a>(
        &'a self,
        model_transaction: ModelTransaction,
        store: &'a mut ResourceStore,
        options: TransactionOptions,
    ) -> Transaction<'a> {
        Transaction::new(
            self,
            Mode::Rollback {
                levels: model_transaction,
            },
            store,
            options,
        )
    }
}

enum Mode<'a> {
    Forward {
        diffs: Vec<Diff>,
        models: GraphPair<'a, Model>,
    },
    Rollback {
        levels: ModelTransaction,
    },
}

/// A running transaction
pub struct Transaction<'a> {
    service: &'a TransactionService,
    store: &'a mut ResourceStore,
    options: TransactionOptions,
    mode: Mode<'a>,
    progress: Box<dyn ProgressCallback + 'a>,
    state: TransactionState,
    pending: VecDeque<TransactionSnapshot>,

    model_levels: VecDeque<Vec<ModelDiffMetadata>>,
    dirty_levels: VecDeque<Vec<ResourceDiffMetadata>>,
    resource_levels: VecDeque<Vec<ResourceDiffMetadata>>,
    planned_resource_diffs: Vec<ResourceDiffMetadata>,

    outcome: TransactionOutcome,
    resources_touched: bool,
}

impl<'a> Transaction<'a> {
    fn new(
        service: &'a TransactionService,
        mode: Mode<'a>,
        store: &'a mut ResourceStore,
        options: TransactionOptions,
    ) -> Self {
        Self {
            service,
            store,
            options,
            mode,
            progress: Box::new(NoProgress),
            state: TransactionState::NotStarted,
            pending: VecDeque::new(),
            model_levels: VecDeque::new(),
            dirty_levels: VecDeque::new(),
            resource_levels: VecDeque::new(),
            planned_resource_diffs: Vec::new(),
            outcome: TransactionOutcome::default(),
            resources_touched: false,
        }
    }

    /// Report level and diff progress to `progress`
    pub fn with_progress(mut self, progress: impl ProgressCallback + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    /// What has been applied so far
    pub fn outcome(&self) -> &TransactionOutcome {
        &self.outcome
    }

    /// Run to completion, discarding intermediate snapshots
    pub fn finish(mut self) -> Result<TransactionOutcome> {
        for item in self.by_ref() {
            item?;
        }
        Ok(self.outcome)
    }

    fn is_rollback(&self) -> bool {
        matches!(self.mode, Mode::Rollback { .. })
    }

    fn phase(&self) -> TransactionPhase {
        match self.state {
            TransactionState::NotStarted => TransactionPhase::Planning,
            TransactionState::ModelPhase => TransactionPhase::Model,
            TransactionState::ModelPhaseDone => TransactionPhase::ResourcePlanning,
            TransactionState::DirtyResourcePhase => TransactionPhase::DirtyResource,
            _ => TransactionPhase::Resource,
        }
    }

    fn completed_levels(&self) -> usize {
        match self.phase() {
            TransactionPhase::Model => fully_applied(&self.outcome.model_transaction),
            TransactionPhase::DirtyResource => {
                fully_applied(&self.outcome.dirty_resource_transaction)
            }
            TransactionPhase::Resource => fully_applied(&self.outcome.resource_transaction),
            TransactionPhase::Planning | TransactionPhase::ResourcePlanning => 0,
        }
    }

    /// Perform one unit of work
    fn advance(&mut self) -> Result<()> {
        match self.state {
            TransactionState::NotStarted => self.plan_models(),
            TransactionState::ModelPhase => {
                match self.model_levels.pop_front() {
                    Some(level) => self.run_model_level(level)?,
                    None => {
                        if self.options.yield_model_transaction {
                            self.pending.push_back(TransactionSnapshot::ModelTransaction(
                                self.outcome.model_transaction.clone(),
                            ));
                        }
                        self.state = TransactionState::ModelPhaseDone;
                    }
                }
                Ok(())
            }
            TransactionState::ModelPhaseDone => self.plan_resources(),
            TransactionState::DirtyResourcePhase => {
                match self.dirty_levels.pop_front() {
                    Some(level) => self.run_resource_level(level, true)?,
                    None => {
                        if self.options.yield_dirty_resource_transaction {
                            self.pending
                                .push_back(TransactionSnapshot::DirtyResourceTransaction(
                                    self.outcome.dirty_resource_transaction.clone(),
                                ));
                        }
                        self.state = TransactionState::ResourceDiffReady;
                    }
                }
                Ok(())
            }
            TransactionState::ResourceDiffReady => {
                if self.options.yield_resource_diffs {
                    self.pending.push_back(TransactionSnapshot::ResourceDiffs(
                        std::mem::take(&mut self.planned_resource_diffs),
                    ));
                }
                self.state = TransactionState::ResourcePhase;
                Ok(())
            }
            TransactionState::ResourcePhase => {
                match self.resource_levels.pop_front() {
                    Some(level) => self.run_resource_level(level, false)?,
                    None => {
                        if self.options.yield_resource_transaction {
                            self.pending.push_back(TransactionSnapshot::ResourceTransaction(
                                self.outcome.resource_transaction.clone(),
                            ));
                        }
                        self.pending.push_back(TransactionSnapshot::Complete(
                            self.outcome.model_transaction.clone(),
                        ));
                        log::info!(
                            "transaction complete: {} diffs applied",
                            self.outcome.summary.total()
                        );
                        self.state = TransactionState::Committed;
                    }
                }
                Ok(())
            }
            TransactionState::Committed | TransactionState::Failed(_) => Ok(()),
        }
    }

    // ========================================================================
    // Model phase
    // ========================================================================

    fn plan_models(&mut self) -> Result<()> {
        self.store.begin();

        let levels = match &mut self.mode {
            Mode::Forward { diffs, models } => {
                let mut metadata = self.service.model_diff_metadata(std::mem::take(diffs));
                assign_apply_order(&mut metadata, &*models)?;
                if self.options.yield_model_diffs {
                    self.pending
                        .push_back(TransactionSnapshot::ModelDiffs(metadata.clone()));
                }
                group_by_level(metadata)
            }
            Mode::Rollback { levels } => {
                let mut reverted = std::mem::take(levels);
                reverted.reverse();
                reverted
            }
        };

        log::info!(
            "{} model phase: {} levels",
            if self.is_rollback() { "rollback" } else { "apply" },
            levels.len()
        );
        self.model_levels = levels.into();
        self.state = TransactionState::ModelPhase;
        Ok(())
    }

    fn resolve_inputs(&self, keys: &[String]) -> Result<ActionInputs> {
        let mut inputs = ActionInputs::new();
        for key in keys {
            let input = match key.strip_prefix(RESOURCE_INPUT_PREFIX) {
                Some(resource_id) => self
                    .store
                    .new
                    .find_by_resource_id(resource_id)
                    .and_then(|id| self.store.new.node(id))
                    .cloned()
                    .map(ActionInput::Resource),
                None => self.service.inputs.get(key).cloned().map(ActionInput::Value),
            };
            let input = input.ok_or_else(|| Error::InputNotFound(key.clone()))?;
            inputs.insert(key.clone(), input);
        }
        Ok(inputs)
    }

    fn run_model_level(&mut self, mut level: Vec<ModelDiffMetadata>) -> Result<()> {
        let index = self.outcome.model_transaction.len();
        let rollback = self.is_rollback();
        log::debug!("model level {index}: {} diffs", level.len());
        self.progress
            .on_level_start(NodeKind::Model, index, level.len());

        // resource id -> node whose diff wrote it in this level
        let mut written: HashMap<String, NodeContext> = HashMap::new();

        for group in group_duplicates(&level) {
            let representative = group[0];
            let diff = level[representative].diff.clone();
            let actions = level[representative].actions.clone();
            self.progress.on_diff_start(&diff);

            for action in &actions {
                let name = action.name().to_string();
                let (inputs, outputs) = if rollback {
                    let inputs = level[representative]
                        .inputs
                        .get(&name)
                        .cloned()
                        .unwrap_or_default();
                    let previous = level[representative]
                        .outputs
                        .get(&name)
                        .cloned()
                        .unwrap_or_default();
                    let outputs = action
                        .revert(&diff, &inputs, &previous)
                        .map_err(|e| Error::action(&name, &diff, e))?;
                    (inputs, outputs)
                } else {
                    let inputs = self.resolve_inputs(&action.collect_input(&diff))?;
                    let outputs = action
                        .handle(&diff, &inputs)
                        .map_err(|e| Error::action(&name, &diff, e))?;
                    for key in action.collect_output(&diff) {
                        if !outputs.contains_key(&key) {
                            log::warn!("{name} did not produce declared output {key} for {diff}");
                        }
                    }
                    (inputs, outputs)
                };

                for resource in outputs.values() {
                    if resource.is_shared() {
                        continue;
                    }
                    let id = resource.resource_id().to_string();
                    if let Some(previous) = written.insert(id, diff.node.clone())
                        && previous != diff.node
                    {
                        return Err(Error::OverlappingResourceWrite(
                            resource.resource_id().to_string(),
                        ));
                    }
                }
                self.store.new.upsert_all(outputs.values().cloned())?;

                let metadata = &mut level[representative];
                metadata.inputs.insert(name.clone(), inputs);
                metadata.outputs.insert(name, outputs);
            }

            let applied = level[representative].clone();
            for index in &group {
                let metadata = &mut level[*index];
                metadata.inputs = applied.inputs.clone();
                metadata.outputs = applied.outputs.clone();
                metadata.applied = true;
                self.outcome.summary.add_action(metadata.diff.action);
            }
            self.progress.on_diff_complete(&diff, true);
        }

        self.progress.on_level_complete(NodeKind::Model, index);
        self.outcome.summary.levels += 1;
        if self.options.yield_levels {
            self.pending.push_back(TransactionSnapshot::ModelLevel {
                level: index,
                diffs: level.clone(),
            });
        }
        self.outcome.model_transaction.push(level);
        Ok(())
    }

    // ========================================================================
    // Resource phase
    // ========================================================================

    fn plan_resources(&mut self) -> Result<()> {
        if self.options.yield_new_resources {
            self.pending
                .push_back(TransactionSnapshot::NewResources(self.store.new.clone()));
        }

        let dirty = self.store.dirty_diffs();
        let fresh = self.store.resource_diffs();

        if !dirty.is_empty() {
            let dirty_nodes: BTreeSet<&NodeContext> = dirty.iter().map(|d| &d.node).collect();
            log::warn!("{} resources have unconfirmed changes", dirty_nodes.len());
            for diff in &fresh {
                let parents_dirty = self
                    .store
                    .new
                    .resource(&diff.node)
                    .is_some_and(|r| r.parents().iter().any(|p| dirty_nodes.contains(p)));
                if dirty_nodes.contains(&diff.node) || parents_dirty {
                    return Err(Error::DirtyResource {
                        resource: diff.node.to_string(),
                    });
                }
            }
        }

        let mut dirty_metadata = self.service.resource_diff_metadata(dirty);
        assign_apply_order(
            &mut dirty_metadata,
            &GraphPair::new(&self.store.old, &self.store.actual),
        )?;
        let mut fresh_metadata = self.service.resource_diff_metadata(fresh);
        assign_apply_order(
            &mut fresh_metadata,
            &GraphPair::new(&self.store.new, &self.store.old),
        )?;

        log::info!(
            "resource phase: {} dirty diffs, {} diffs",
            dirty_metadata.len(),
            fresh_metadata.len()
        );
        self.planned_resource_diffs = fresh_metadata.clone();
        self.dirty_levels = group_by_level(dirty_metadata).into();
        self.resource_levels = group_by_level(fresh_metadata).into();
        self.state = TransactionState::DirtyResourcePhase;
        Ok(())
    }

    fn run_resource_level(
        &mut self,
        mut level: Vec<ResourceDiffMetadata>,
        dirty: bool,
    ) -> Result<()> {
        let index = if dirty {
            self.outcome.dirty_resource_transaction.len()
        } else {
            self.outcome.resource_transaction.len()
        };
        log::debug!(
            "{}resource level {index}: {} diffs",
            if dirty { "dirty " } else { "" },
            level.len()
        );
        self.progress
            .on_level_start(NodeKind::Resource, index, level.len());

        let duplicates = group_duplicates(&level);
        let mut by_resource: BTreeMap<NodeContext, Vec<usize>> = BTreeMap::new();
        for group in &duplicates {
            by_resource
                .entry(level[group[0]].diff.node.clone())
                .or_default()
                .push(group[0]);
        }

        let mut owners: HashMap<&str, &NodeContext> = HashMap::new();
        for context in by_resource.keys() {
            if let Some(other) = owners.insert(context.id(), context)
                && other != context
            {
                return Err(Error::OverlappingResourceWrite(context.id().to_string()));
            }
        }

        for diff in &level {
            self.progress.on_diff_start(&diff.diff);
        }

        let results = {
            let (primary, fallback) = if dirty {
                (&self.store.old, &self.store.actual)
            } else {
                (&self.store.new, &self.store.old)
            };
            let jobs = by_resource
                .into_iter()
                .map(|(context, indices)| {
                    ResourceJob::prepare(context, indices, &level, primary, fallback)
                })
                .collect::<Result<Vec<_>>>()?;
            self.resources_touched = true;
            execute_jobs(jobs, self.options.jobs)?
        };

        let mut first_error = None;
        for result in results {
            for (index, outcome) in result.outcomes {
                let diff = level[index].diff.clone();
                match outcome {
                    Ok(()) => {
                        self.store.record_applied(&diff, &result.working)?;
                        self.outcome.summary.add_action(diff.action);
                        self.progress.on_diff_complete(&diff, true);
                        let group = duplicates.iter().find(|g| g[0] == index);
                        for duplicate in group.into_iter().flatten() {
                            level[*duplicate].applied = true;
                        }
                    }
                    Err(error) => {
                        self.progress.on_diff_complete(&diff, false);
                        log::warn!("{error}");
                        first_error.get_or_insert(error);
                    }
                }
            }
            write_back_response(
                if dirty { &mut self.store.old } else { &mut self.store.new },
                &result.working,
            );
        }

        self.progress.on_level_complete(NodeKind::Resource, index);
        self.outcome.summary.levels += 1;
        if self.options.yield_levels {
            self.pending.push_back(TransactionSnapshot::ResourceLevel {
                level: index,
                dirty,
                diffs: level.clone(),
            });
        }
        if dirty {
            self.outcome.dirty_resource_transaction.push(level);
        } else {
            self.outcome.resource_transaction.push(level);
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Iterator for Transaction<'_> {
    type Item = Result<TransactionSnapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(snapshot) = self.pending.pop_front() {
                return Some(Ok(snapshot));
            }
            if matches!(
                self.state,
                TransactionState::Committed | TransactionState::Failed(_)
            ) {
                return None;
            }
            if let Err(error) = self.advance() {
                let dirty = DirtyState {
                    phase: self.phase(),
                    completed_levels: self.completed_levels(),
                    resources_touched: self.resources_touched,
                };
                log::warn!("transaction failed during {:?}: {error}", dirty.phase);
                self.state = TransactionState::Failed(dirty);
                return Some(Err(error));
            }
        }
    }
}

/// All diffs of one resource within a level
struct ResourceJob<'g> {
    working: Resource,
    parents: Vec<&'g Resource>,
    diffs: Vec<(usize, Diff, Vec<Arc<dyn ResourceAction>>)>,
}

struct JobResult {
    working: Resource,
    outcomes: Vec<(usize, Result<()>)>,
}

impl<'g> ResourceJob<'g> {
    fn prepare(
        context: NodeContext,
        indices: Vec<usize>,
        level: &[ResourceDiffMetadata],
        primary: &'g ResourceGraph,
        fallback: &'g ResourceGraph,
    ) -> Result<Self> {
        let lookup = |ctx: &NodeContext| primary.resource(ctx).or_else(|| fallback.resource(ctx));
        let working = lookup(&context)
            .cloned()
            .ok_or_else(|| Error::NodeNotFound(context.to_string()))?;
        let parents = working.parents().iter().filter_map(lookup).collect();
        let diffs = indices
            .into_iter()
            .map(|i| (i, level[i].diff.clone(), level[i].actions.clone()))
            .collect();
        Ok(Self {
            working,
            parents,
            diffs,
        })
    }

    /// Run the diffs in order; the first failure stops the job
    fn run(mut self) -> JobResult {
        let mut outcomes = Vec::with_capacity(self.diffs.len());
        for (index, diff, actions) in &self.diffs {
            let mut outcome = Ok(());
            for action in actions {
                let mut ctx = ApplyContext::new(&mut self.working, &self.parents);
                if let Err(e) = action.handle(diff, &mut ctx) {
                    outcome = Err(Error::action(action.name(), diff, e));
                    break;
                }
            }
            let failed = outcome.is_err();
            outcomes.push((*index, outcome));
            if failed {
                break;
            }
        }
        JobResult {
            working: self.working,
            outcomes,
        }
    }
}

/// Execute jobs, in parallel on a rayon pool when there is more than one
fn execute_jobs(jobs: Vec<ResourceJob<'_>>, threads: usize) -> Result<Vec<JobResult>> {
    if threads <= 1 || jobs.len() <= 1 {
        return Ok(jobs.into_iter().map(ResourceJob::run).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()?;
    Ok(pool.install(|| jobs.into_par_iter().map(ResourceJob::run).collect()))
}

fn fully_applied<A: ?Sized + Action>(levels: &[Vec<DiffMetadata<A>>]) -> usize {
    levels
        .iter()
        .filter(|level| level.iter().all(|m| m.applied))
        .count()
}

fn write_back_response(graph: &mut ResourceGraph, working: &Resource) {
    let Some(id) = graph.get(working.context()) else {
        return;
    };
    if let Some(resource) = graph.node_mut(id) {
        for (key, value) in working.response() {
            resource.set_response(key.clone(), value.clone());
        }
    }
}
