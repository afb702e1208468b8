//! End-to-end transaction scenarios over an app -> ... -> execution model tree

use declarative::{
    Action, ActionInputs, ActionOutputs, ApplyContext, Diff, DiffAction, Error, GraphPair, Model,
    ModelAction, ModelGraph, ModelSchema, Node, NodeContext, Resource, ResourceAction,
    ResourceStore, TransactionOptions, TransactionService, TransactionSnapshot, diff_models,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const CHAIN: [(&str, &str); 7] = [
    ("app", "test-app"),
    ("region", "region-1"),
    ("subnet", "subnet-1"),
    ("environment", "qa"),
    ("server", "backend"),
    ("deployment", "deploy-1"),
    ("execution", "exec-1"),
];

fn model(name: &str, id: &str) -> Model {
    Model::new(ModelSchema::new(name, "@octo/aws", format!("{name}Id")), id)
}

/// Each entry of `CHAIN` is the parent of the next one
fn models(security_group_rules: Option<serde_json::Value>) -> ModelGraph {
    let mut graph = ModelGraph::new();
    let mut previous = None;
    for (name, id) in CHAIN {
        let mut node = model(name, id);
        if name == "server"
            && let Some(rules) = &security_group_rules
        {
            node.set_property("securityGroupRules", rules.clone());
        }
        let current = graph.add_node(node).unwrap();
        if let Some((parent, parent_name)) = previous {
            graph
                .add_child(parent, &format!("{parent_name}Id"), current, &format!("{name}Id"))
                .unwrap();
        }
        previous = Some((current, name));
    }
    graph
}

// ============================================================================
// Model actions
// ============================================================================

struct AddExecutionModelAction;

impl Action for AddExecutionModelAction {
    fn name(&self) -> &str {
        "AddExecutionModelAction"
    }

    fn filter(&self, diff: &Diff) -> bool {
        diff.is_lifecycle()
            && diff.action == DiffAction::Add
            && diff.node.node_name() == "execution"
    }
}

impl ModelAction for AddExecutionModelAction {
    fn handle(&self, diff: &Diff, _inputs: &ActionInputs) -> anyhow::Result<ActionOutputs> {
        let service = Resource::new("ecs-service", format!("ecs-service-{}", diff.node.id()))?
            .with_property("desiredCount", json!(1));
        Ok(ActionOutputs::from([("ecsService".to_string(), service)]))
    }

    fn revert(
        &self,
        _diff: &Diff,
        _inputs: &ActionInputs,
        outputs: &ActionOutputs,
    ) -> anyhow::Result<ActionOutputs> {
        let mut undone = outputs.clone();
        for resource in undone.values_mut() {
            resource.mark_deleted();
        }
        Ok(undone)
    }
}

struct AddSecurityGroupRulesModelAction;

impl Action for AddSecurityGroupRulesModelAction {
    fn name(&self) -> &str {
        "AddSecurityGroupRulesModelAction"
    }

    fn filter(&self, diff: &Diff) -> bool {
        diff.node.node_name() == "server"
            && diff.field == "securityGroupRules"
            && diff.action == DiffAction::Add
    }
}

impl ModelAction for AddSecurityGroupRulesModelAction {
    fn collect_input(&self, _diff: &Diff) -> Vec<String> {
        vec!["resource.ecs-service-exec-1".to_string()]
    }

    fn collect_output(&self, _diff: &Diff) -> Vec<String> {
        vec!["securityGroup".to_string(), "ecsService".to_string()]
    }

    fn handle(&self, diff: &Diff, inputs: &ActionInputs) -> anyhow::Result<ActionOutputs> {
        let security_group = Resource::new("security-group", format!("sec-grp-{}", diff.node.id()))?
            .with_property("rules", diff.value.clone());
        let service = inputs
            .get("resource.ecs-service-exec-1")
            .and_then(|i| i.as_resource())
            .ok_or_else(|| anyhow::anyhow!("ecs service not found"))?
            .clone()
            .with_parent(&security_group);

        Ok(ActionOutputs::from([
            ("securityGroup".to_string(), security_group),
            ("ecsService".to_string(), service),
        ]))
    }

    fn revert(
        &self,
        _diff: &Diff,
        _inputs: &ActionInputs,
        outputs: &ActionOutputs,
    ) -> anyhow::Result<ActionOutputs> {
        let mut undone = outputs.clone();
        let security_group = undone
            .get_mut("securityGroup")
            .ok_or_else(|| anyhow::anyhow!("no security group recorded"))?;
        security_group.mark_deleted();
        let context = security_group.context().clone();
        if let Some(service) = undone.get_mut("ecsService") {
            service.remove_parent(&context);
        }
        Ok(undone)
    }
}

// ============================================================================
// Resource actions
// ============================================================================

/// Records every diff it handles and fails while `fail` is set
#[derive(Default)]
struct Provider {
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl Provider {
    fn call(&self, action: &str, diff: &Diff) -> anyhow::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("{action}: provider unavailable");
        }
        self.calls.lock().unwrap().push(format!("{action} {diff}"));
        Ok(())
    }
}

struct LifecycleResourceAction(Arc<Provider>);

impl Action for LifecycleResourceAction {
    fn name(&self) -> &str {
        "LifecycleResourceAction"
    }

    fn filter(&self, diff: &Diff) -> bool {
        diff.is_lifecycle()
    }
}

impl ResourceAction for LifecycleResourceAction {
    fn handle(&self, diff: &Diff, ctx: &mut ApplyContext<'_>) -> anyhow::Result<()> {
        self.0.call(self.name(), diff)?;
        if diff.action == DiffAction::Add {
            ctx.resource
                .set_response("arn", json!(format!("arn:aws:{}", diff.node.id())));
        }
        Ok(())
    }
}

struct UpdateEcsServiceResourceAction(Arc<Provider>);

impl Action for UpdateEcsServiceResourceAction {
    fn name(&self) -> &str {
        "UpdateEcsServiceResourceAction"
    }

    fn filter(&self, diff: &Diff) -> bool {
        diff.node.node_name() == "ecs-service" && !diff.is_lifecycle()
    }
}

impl ResourceAction for UpdateEcsServiceResourceAction {
    fn handle(&self, diff: &Diff, ctx: &mut ApplyContext<'_>) -> anyhow::Result<()> {
        if diff.field == "parent" && diff.action == DiffAction::Add {
            let group = ctx
                .parent("security-group")
                .ok_or_else(|| anyhow::anyhow!("security group missing"))?;
            anyhow::ensure!(group.response().contains_key("arn"), "security group not created");
        }
        self.0.call(self.name(), diff)
    }
}

fn service(provider: &Arc<Provider>) -> TransactionService {
    TransactionService::new()
        .with_model_action(AddExecutionModelAction)
        .with_model_action(AddSecurityGroupRulesModelAction)
        .with_resource_action(LifecycleResourceAction(Arc::clone(provider)))
        .with_resource_action(UpdateEcsServiceResourceAction(Arc::clone(provider)))
}

fn level_summary(level: &[declarative::ResourceDiffMetadata]) -> Vec<String> {
    level
        .iter()
        .map(|m| format!("{} [{}]", m.diff, m.action_names().join(", ")))
        .collect()
}

/// Apply the initial model tree and commit it
fn bootstrap(service: &TransactionService, store: &mut ResourceStore) -> ModelGraph {
    let new = models(None);
    let old = ModelGraph::new();
    let outcome = service
        .begin_transaction(
            diff_models(&new, &old),
            GraphPair::new(&new, &old),
            store,
            TransactionOptions::default(),
        )
        .finish()
        .unwrap();
    assert_eq!(outcome.model_transaction.len(), CHAIN.len());
    store.commit().unwrap();
    new
}

#[test]
fn test_security_group_rules_order_resources() {
    let provider = Arc::new(Provider::default());
    let service = service(&provider);
    let mut store = ResourceStore::new();
    let old = bootstrap(&service, &mut store);

    let new = models(Some(json!([{ "CidrIp": "0.0.0.0/0", "FromPort": 80 }])));
    let diffs = diff_models(&new, &old);
    assert_eq!(diffs.len(), 1);

    let outcome = service
        .begin_transaction(
            diffs,
            GraphPair::new(&new, &old),
            &mut store,
            TransactionOptions::default(),
        )
        .finish()
        .unwrap();

    let levels: Vec<Vec<String>> = outcome
        .resource_transaction
        .iter()
        .map(|l| level_summary(l))
        .collect();
    assert_eq!(
        levels,
        vec![
            vec![
                "add security-group=sec-grp-backend resourceId [LifecycleResourceAction]"
                    .to_string()
            ],
            vec![
                "add ecs-service=ecs-service-exec-1 parent [UpdateEcsServiceResourceAction]"
                    .to_string()
            ],
        ]
    );
    assert!(outcome.dirty_resource_transaction.is_empty());

    store.commit().unwrap();
    assert!(!store.is_dirty());
    let ecs = store
        .actual
        .resource(&NodeContext::new("ecs-service", "ecs-service-exec-1"))
        .unwrap();
    assert_eq!(
        ecs.parents(),
        &[NodeContext::new("security-group", "sec-grp-backend")]
    );
}

#[test]
fn test_dirty_resources_are_reconciled_first() {
    let provider = Arc::new(Provider::default());
    let service = service(&provider);
    let mut store = ResourceStore::new();

    let new = models(None);
    let old = ModelGraph::new();
    provider.fail.store(true, Ordering::SeqCst);
    let err = service
        .begin_transaction(
            diff_models(&new, &old),
            GraphPair::new(&new, &old),
            &mut store,
            TransactionOptions::default(),
        )
        .finish()
        .unwrap_err();
    assert!(matches!(err, Error::Action { .. }));

    // Keep what the models produced; the ecs service is now dirty
    store.commit().unwrap();
    assert!(store.is_dirty());

    provider.fail.store(false, Ordering::SeqCst);
    let mut snapshots = Vec::new();
    let txn = service.begin_transaction(
        diff_models(&new, &new),
        GraphPair::new(&new, &new),
        &mut store,
        TransactionOptions::yield_all(),
    );
    for snapshot in txn {
        snapshots.push(snapshot.unwrap());
    }

    let dirty = snapshots.iter().find_map(|s| match s {
        TransactionSnapshot::DirtyResourceTransaction(t) => Some(t.clone()),
        _ => None,
    });
    let dirty: Vec<Vec<String>> = dirty.unwrap().iter().map(|l| level_summary(l)).collect();
    assert_eq!(
        dirty,
        vec![vec![
            "add ecs-service=ecs-service-exec-1 resourceId [LifecycleResourceAction]".to_string()
        ]]
    );
    let fresh = snapshots.iter().find_map(|s| match s {
        TransactionSnapshot::ResourceTransaction(t) => Some(t.len()),
        _ => None,
    });
    assert_eq!(fresh, Some(0));
    assert!(matches!(
        snapshots.last(),
        Some(TransactionSnapshot::Complete(_))
    ));

    store.commit().unwrap();
    assert!(!store.is_dirty());
}

#[test]
fn test_changes_on_dirty_resources_are_rejected() {
    let provider = Arc::new(Provider::default());
    let service = service(&provider);
    let mut store = ResourceStore::new();
    let old = bootstrap(&service, &mut store);

    // The security group fails to create; the ecs service never gets its parent
    let new = models(Some(json!([{ "FromPort": 443 }])));
    provider.fail.store(true, Ordering::SeqCst);
    let outcome = service
        .begin_transaction(
            diff_models(&new, &old),
            GraphPair::new(&new, &old),
            &mut store,
            TransactionOptions::default(),
        )
        .finish();
    assert!(outcome.is_err());
    store.commit().unwrap();
    assert!(
        store
            .dirty_resources()
            .contains(&NodeContext::new("security-group", "sec-grp-backend"))
    );

    // Re-applying the rules from scratch touches the dirty security group
    provider.fail.store(false, Ordering::SeqCst);
    let newer = models(Some(json!([{ "FromPort": 8443 }])));
    let err = service
        .begin_transaction(
            diff_models(&newer, &old),
            GraphPair::new(&newer, &old),
            &mut store,
            TransactionOptions::default(),
        )
        .finish()
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot operate diff on dirty resources!");
    assert!(provider.calls.lock().unwrap().iter().all(|c| !c.contains("sec-grp")));
}

#[test]
fn test_rollback_deletes_security_group_after_detaching() {
    let provider = Arc::new(Provider::default());
    let service = service(&provider);
    let mut store = ResourceStore::new();
    let old = bootstrap(&service, &mut store);

    let new = models(Some(json!([{ "FromPort": 80 }])));
    let outcome = service
        .begin_transaction(
            diff_models(&new, &old),
            GraphPair::new(&new, &old),
            &mut store,
            TransactionOptions::default(),
        )
        .finish()
        .unwrap();
    store.commit().unwrap();

    let rollback = service
        .rollback_transaction(
            outcome.model_transaction,
            &mut store,
            TransactionOptions::default(),
        )
        .finish()
        .unwrap();

    let levels: Vec<Vec<String>> = rollback
        .resource_transaction
        .iter()
        .map(|l| level_summary(l))
        .collect();
    assert_eq!(
        levels,
        vec![
            vec![
                "delete ecs-service=ecs-service-exec-1 parent [UpdateEcsServiceResourceAction]"
                    .to_string()
            ],
            vec![
                "delete security-group=sec-grp-backend resourceId [LifecycleResourceAction]"
                    .to_string()
            ],
        ]
    );

    store.commit().unwrap();
    assert!(!store.is_dirty());
    assert!(
        !store
            .old
            .contains(&NodeContext::new("security-group", "sec-grp-backend"))
    );
    let ecs = store
        .actual
        .resource(&NodeContext::new("ecs-service", "ecs-service-exec-1"))
        .unwrap();
    assert!(ecs.parents().is_empty());
}
