//! Logical infrastructure models
//!
//! A model is a node of the logical graph (app, region, subnet, server, ...).
//! Callers mutate models directly and compare the graph against a previous
//! snapshot with [`diff_models`] to get the model-level diffs.

use crate::diff::{Diff, diff_parents, diff_properties};
use crate::graph::Graph;
use crate::node::{Node, NodeContext};
use crate::types::{DiffAction, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Static metadata of a model type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSchema {
    /// Node name, e.g. "region"
    pub name: String,
    /// Package the model type belongs to
    pub package: String,
    /// Field holding the model id, e.g. "regionId"
    pub id_field: String,
}

impl ModelSchema {
    pub fn new(
        name: impl Into<String>,
        package: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            id_field: id_field.into(),
        }
    }

    /// Fully qualified type name, `package/name`
    pub fn node_type(&self) -> String {
        format!("{}/{}", self.package, self.name)
    }
}

/// Logical infrastructure node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    schema: ModelSchema,
    id: String,
    context: NodeContext,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl Model {
    /// Create a model whose context is `name=id`
    pub fn new(schema: ModelSchema, id: impl Into<String>) -> Self {
        let id = id.into();
        let context = NodeContext::new(schema.name.clone(), id.clone());
        Self {
            schema,
            id,
            context,
            properties: Map::new(),
        }
    }

    /// Extend the context with an extra `key=value` part
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context = self.context.with(key, value);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
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

    pub fn remove_property(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    /// Field diffs of this model against its previous snapshot
    pub fn diff(&self, previous: &Model) -> Vec<Diff> {
        diff_properties(&self.context, &self.properties, &previous.properties)
    }
}

impl Node for Model {
    const KIND: NodeKind = NodeKind::Model;

    fn context(&self) -> &NodeContext {
        &self.context
    }

    fn node_name(&self) -> &str {
        &self.schema.name
    }
}

/// Graph of logical models
pub type ModelGraph = Graph<Model>;

fn parent_set(graph: &ModelGraph, model: &Model) -> BTreeMap<NodeContext, Value> {
    graph
        .get(model.context())
        .map(|id| {
            graph
                .get_parents(id, None)
                .into_iter()
                .filter_map(|p| graph.context_of(p))
                .map(|ctx| (ctx.clone(), Value::Null))
                .collect()
        })
        .unwrap_or_default()
}

/// Compare two model graphs
///
/// New models produce one lifecycle Add on their id field, vanished models
/// one lifecycle Delete. Models present in both produce property diffs and
/// parent Add/Delete diffs.
pub fn diff_models(new: &ModelGraph, old: &ModelGraph) -> Vec<Diff> {
    let mut diffs = Vec::new();

    for (_, model) in new.nodes() {
        let ctx = model.context();
        match old.get(ctx).and_then(|id| old.node(id)) {
            None => diffs.push(Diff::lifecycle(
                ctx.clone(),
                DiffAction::Add,
                model.schema.id_field.clone(),
                json!(model.id),
            )),
            Some(previous) => {
                diffs.extend(model.diff(previous));
                diffs.extend(diff_parents(
                    ctx,
                    &parent_set(new, model),
                    &parent_set(old, previous),
                ));
            }
        }
    }

    for (_, model) in old.nodes() {
        if !new.contains(model.context()) {
            diffs.push(Diff::lifecycle(
                model.context().clone(),
                DiffAction::Delete,
                model.schema.id_field.clone(),
                json!(model.id),
            ));
        }
    }

    log::debug!("model diff produced {} diffs", diffs.len());
    diffs
}
