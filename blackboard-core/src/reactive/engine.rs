//! Engine
//!
//! The engine owns everything a Blackboard program needs at runtime: the
//! node graph, both pending sets, the constant table, the cast registry and
//! the observers. There is no global state; two engines never share nodes.
//!
//! # Passes
//!
//! External writes ([`Engine::set_input_value`], [`Engine::provoke_trigger`])
//! only stage a change and pend the node. Nothing is evaluated until
//! [`Engine::run_pass`], which runs three stages:
//!
//! 1. **Update**: settle depths after structural edits.
//! 2. **Eval**: recompute pending nodes, lowest depth first, each at most
//!    once. A node that changes (or a trigger that fires) pends its children.
//! 3. **Finalize**: reset every trigger that fired and run observer
//!    callbacks, in the order the Eval stage queued them. Edits queued by
//!    observers are applied last and wait for the next pass.
//!
//! Any number of writes between two passes coalesce into one pass. So do
//! writes made inside [`Engine::group`].

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tracing::{debug, instrument, trace, warn};

use super::finalize::{Edit, EditQueue, Finalizer, Notification, ObserverId, Task, Watch};
use super::node_spec::NodeSpec;
use super::report::{PassLogger, PassReport, Phase};
use super::rule::Arg;
use crate::builtins;
use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::graph::{DependencyGraph, Node, NodeId, NodeKind, PendingSet, Staged};
use crate::types::{CastRegistry, CastRule, DataType, FunctionDef, FunctionGroup, Value};

/// Outcome of recomputing one node.
enum Recompute {
    Value(Value),
    Fire,
    Unchanged,
    /// Not evaluated at all: a container, or a formula with an unset parent.
    Skip,
}

type Logger<'a, 'b> = &'a mut Option<&'b mut dyn PassLogger>;

/// Holds one level of [`Engine::group`] open until dropped.
struct GroupGuard<'a> {
    engine: &'a mut Engine,
}

impl<'a> GroupGuard<'a> {
    fn enter(engine: &'a mut Engine) -> Self {
        engine.group_depth += 1;
        Self { engine }
    }
}

impl Deref for GroupGuard<'_> {
    type Target = Engine;

    fn deref(&self) -> &Engine {
        self.engine
    }
}

impl DerefMut for GroupGuard<'_> {
    fn deref_mut(&mut self) -> &mut Engine {
        self.engine
    }
}

impl Drop for GroupGuard<'_> {
    fn drop(&mut self) {
        self.engine.group_depth -= 1;
    }
}

/// A reactive dataflow graph and its scheduler.
#[derive(Debug)]
pub struct Engine {
    graph: DependencyGraph,
    eval: PendingSet,
    casts: CastRegistry,
    constants: HashMap<Value, NodeId>,
    finalizer: Finalizer,
    config: EngineConfig,
    root: NodeId,
    pass: u64,
    group_depth: usize,
    report: PassReport,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An empty engine with the standard cast graph and no functions.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut graph = DependencyGraph::new();
        let root = graph.new_namespace();
        Self {
            graph,
            eval: PendingSet::new(),
            casts: CastRegistry::standard(),
            constants: HashMap::new(),
            finalizer: Finalizer::default(),
            config,
            root,
            pass: 0,
            group_depth: 0,
            report: PassReport::default(),
        }
    }

    /// An engine with the standard library installed in the root namespace.
    pub fn with_standard_library() -> Result<Self> {
        let mut engine = Self::new();
        builtins::install(&mut engine)?;
        Ok(engine)
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Create a node with the given ordered parents.
    ///
    /// Formulas get their first value right away if every value parent
    /// already has one.
    pub fn create_node(&mut self, spec: NodeSpec, parents: &[NodeId]) -> Result<NodeId> {
        let (kind, initial) = spec.into_parts();
        let declared = match &kind {
            NodeKind::Input { data_type } | NodeKind::Formula { data_type, .. } => Some(*data_type),
            _ => None,
        };
        if let (Some(to), Some(value)) = (declared, initial.as_ref()) {
            if value.data_type() != to {
                return Err(GraphError::NoCastPath {
                    from: value.data_type(),
                    to,
                });
            }
        }
        let initial = if kind.is_trigger() || !kind.is_data() {
            None
        } else {
            initial
        };
        let is_formula = matches!(kind, NodeKind::Formula { .. });

        let id = self.graph.add_node(Node::new(kind, parents, initial))?;
        if is_formula {
            if let Ok(Recompute::Value(value)) = self.recompute(id, 0) {
                self.graph.node_mut(id)?.set_value(value, 0);
            }
        }
        Ok(id)
    }

    /// Create a node and name it in `scope`. Nothing is created if the name
    /// is rejected.
    pub fn create_named(
        &mut self,
        scope: NodeId,
        name: &str,
        spec: NodeSpec,
        parents: &[NodeId],
    ) -> Result<NodeId> {
        self.graph.check_scope(None, scope, name)?;
        let id = self.create_node(spec, parents)?;
        if let Err(err) = self.graph.set_scope(id, scope, name) {
            self.graph.remove_node(id)?;
            return Err(err);
        }
        Ok(id)
    }

    /// An unset input of the given type.
    pub fn input(&mut self, data_type: DataType) -> Result<NodeId> {
        self.create_node(NodeSpec::input(data_type), &[])
    }

    /// An input seeded with a value; its type is the value's type.
    pub fn input_with(&mut self, value: impl Into<Value>) -> Result<NodeId> {
        self.create_node(NodeSpec::input_with(value.into()), &[])
    }

    /// A trigger the host provokes from outside.
    pub fn trigger_input(&mut self) -> Result<NodeId> {
        self.create_node(NodeSpec::trigger_input(), &[])
    }

    /// A constant holding `value`, shared with any equal constant already
    /// registered when deduplication is on.
    pub fn constant(&mut self, value: impl Into<Value>) -> Result<NodeId> {
        let value = value.into();
        if self.config.dedup_constants {
            if let Some(&existing) = self.constants.get(&value) {
                if self.graph.contains(existing) {
                    return Ok(existing);
                }
            }
        }
        let id = self.create_node(NodeSpec::constant(value.clone()), &[])?;
        if self.config.dedup_constants {
            self.constants.insert(value, id);
        }
        Ok(id)
    }

    /// Merge a separately created constant into the dedup table.
    ///
    /// Returns the registered equal constant, removing `id`, if `id` has no
    /// children and no name. Otherwise `id` stays as it is; live children are
    /// never rewired.
    pub fn intern(&mut self, id: NodeId) -> Result<NodeId> {
        let node = self.graph.node(id)?;
        if !matches!(node.kind(), NodeKind::Constant) {
            return Err(GraphError::WrongKind {
                node: id,
                expected: "a constant",
            });
        }
        let Some(value) = node.value().cloned() else {
            return Ok(id);
        };
        let detached = node.children().is_empty() && node.name().is_none();

        match self.constants.get(&value).copied() {
            Some(existing) if existing == id => Ok(id),
            Some(existing) if self.graph.contains(existing) => {
                if detached {
                    self.remove_node(id)?;
                    Ok(existing)
                } else {
                    Ok(id)
                }
            }
            _ => {
                self.constants.insert(value, id);
                Ok(id)
            }
        }
    }

    /// Fold a new value into a constant. Its children see the change in
    /// the next pass. The constant leaves the dedup table.
    pub fn set_constant(&mut self, id: NodeId, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        let node = self.graph.node_mut(id)?;
        if !matches!(node.kind(), NodeKind::Constant) {
            return Err(GraphError::WrongKind {
                node: id,
                expected: "a constant",
            });
        }
        let old = node.value().cloned();
        if let Some(old) = &old {
            if old.data_type() != value.data_type() {
                return Err(GraphError::TypeMismatch {
                    node: id,
                    expected: old.data_type(),
                    found: value.data_type(),
                });
            }
        }
        let staged_same = matches!(&node.staged, Some(Staged::Value(v)) if *v == value);
        if staged_same || (node.staged.is_none() && old.as_ref() == Some(&value)) {
            return Ok(false);
        }
        node.staged = Some(Staged::Value(value));
        let depth = node.depth();
        self.eval.insert(id, depth);

        if let Some(old) = old {
            if self.constants.get(&old) == Some(&id) {
                self.constants.remove(&old);
            }
        }
        Ok(true)
    }

    /// Remove a node that nothing depends on.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(GraphError::WrongKind {
                node: id,
                expected: "a removable node",
            });
        }
        let node = self.graph.remove_node(id)?;
        self.eval.remove(id);
        if let (NodeKind::Constant, Some(value)) = (node.kind(), node.value()) {
            if self.constants.get(value) == Some(&id) {
                self.constants.remove(value);
            }
        }
        self.finalizer.forget_node(id);
        debug!(node = %id, kind = node.kind().label(), "node removed");
        Ok(())
    }

    /// Make `child` read from `parent` as its last argument.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        let added = self.graph.add_child(parent, child)?;
        if added {
            self.pend_eval(child);
        }
        Ok(added)
    }

    /// Unlink `child` from `parent`. Returns false if they were not linked.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool> {
        let removed = self.graph.remove_child(parent, child)?;
        if removed {
            self.pend_eval(child);
        }
        Ok(removed)
    }

    /// Replace the ordered parents of `id` in one step.
    pub fn set_parents(&mut self, id: NodeId, parents: &[NodeId]) -> Result<()> {
        self.graph.set_parents(id, parents)?;
        self.pend_eval(id);
        Ok(())
    }

    fn pend_eval(&mut self, id: NodeId) {
        if let Ok(node) = self.graph.node(id) {
            self.eval.insert(id, node.depth());
        }
    }

    // ------------------------------------------------------------------
    // External input
    // ------------------------------------------------------------------

    /// Stage a new value for an input. Returns whether anything changed.
    pub fn set_input_value(&mut self, id: NodeId, value: impl Into<Value>) -> Result<bool> {
        let value = value.into();
        let node = self.graph.node_mut(id)?;
        let expected = match node.kind() {
            NodeKind::Input { data_type } => *data_type,
            _ => {
                return Err(GraphError::WrongKind {
                    node: id,
                    expected: "an input",
                })
            }
        };
        if value.data_type() != expected {
            return Err(GraphError::TypeMismatch {
                node: id,
                expected,
                found: value.data_type(),
            });
        }

        if node.value() == Some(&value) {
            // Back to the settled value: withdraw any staged edit.
            let withdrawn = node.staged.take().is_some();
            if withdrawn {
                self.eval.remove(id);
            }
            return Ok(withdrawn);
        }
        if matches!(&node.staged, Some(Staged::Value(v)) if *v == value) {
            return Ok(false);
        }
        node.staged = Some(Staged::Value(value));
        let depth = node.depth();
        self.eval.insert(id, depth);
        Ok(true)
    }

    /// Provoke a trigger input in the next pass.
    pub fn provoke_trigger(&mut self, id: NodeId) -> Result<bool> {
        let node = self.graph.node_mut(id)?;
        if !matches!(node.kind(), NodeKind::TriggerInput) {
            return Err(GraphError::WrongKind {
                node: id,
                expected: "a trigger input",
            });
        }
        if node.staged.is_some() {
            return Ok(false);
        }
        node.staged = Some(Staged::Provoke);
        let depth = node.depth();
        self.eval.insert(id, depth);
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    /// Run Update, Eval and Finalize.
    ///
    /// Inside [`Engine::group`] this is deferred to the end of the group and
    /// returns an empty report.
    #[instrument(level = "debug", skip_all)]
    pub fn run_pass(&mut self, logger: Option<&mut dyn PassLogger>) -> PassReport {
        if self.group_depth > 0 {
            debug!("pass deferred to end of group");
            return PassReport::default();
        }
        let mut logger = logger;
        self.update_stage(&mut logger);
        self.eval_stage(&mut logger);
        let report = self.finalize_stage(&mut logger);
        debug!(
            pass = report.pass,
            depth_updates = report.depth_updates,
            evaluated = report.evaluated,
            changed = report.changed.len(),
            fired = report.fired.len(),
            "pass complete"
        );
        report
    }

    /// Settle depths. Returns how many changed.
    pub fn drain_update(&mut self, logger: Option<&mut dyn PassLogger>) -> usize {
        let mut logger = logger;
        self.update_stage(&mut logger)
    }

    /// Recompute pending nodes. Returns the triggers that fired, which stay
    /// provoked until [`Engine::finalize`].
    pub fn drain_eval(&mut self, logger: Option<&mut dyn PassLogger>) -> Vec<NodeId> {
        let mut logger = logger;
        self.eval_stage(&mut logger)
    }

    /// Reset fired triggers, notify observers and apply their edits.
    pub fn finalize(&mut self) -> PassReport {
        self.finalize_stage(&mut None)
    }

    /// Apply a batch of edits, then run one pass.
    ///
    /// Nested groups only run the pass when the outermost one ends; inner
    /// groups return an empty report.
    /// A panic inside `edits` still closes the group, so later passes run.
    pub fn group<T>(&mut self, edits: impl FnOnce(&mut Engine) -> T) -> (T, PassReport) {
        let out = {
            let mut group = GroupGuard::enter(self);
            edits(&mut *group)
        };
        let report = if self.group_depth == 0 {
            self.run_pass(None)
        } else {
            PassReport::default()
        };
        (out, report)
    }

    fn update_stage(&mut self, logger: Logger<'_, '_>) -> usize {
        if self.graph.pending_update().is_empty() {
            return 0;
        }
        let mut touched = Vec::new();
        let changed = self.graph.drain_update(|id, depth| touched.push((id, depth)));
        for (id, depth) in touched {
            self.touched(logger, Phase::Update, depth, id);
        }
        if changed > 0 {
            let graph = &self.graph;
            self.eval.rekey(|id| graph.node(id).ok().map(|n| n.depth()));
        }
        self.report.depth_updates += changed;
        debug!(changed, "update stage drained");
        changed
    }

    fn eval_stage(&mut self, logger: Logger<'_, '_>) -> Vec<NodeId> {
        self.update_stage(logger);
        if self.eval.is_empty() {
            return Vec::new();
        }
        self.pass += 1;
        let pass = self.pass;
        self.report.pass = pass;

        let mut fired = Vec::new();
        while let Some((depth, id)) = self.eval.pop_lowest() {
            let outcome = match self.recompute(id, pass) {
                Ok(outcome) => outcome,
                Err(_) => continue,
            };
            let Ok(node) = self.graph.node_mut(id) else {
                continue;
            };
            node.staged = None;

            match outcome {
                Recompute::Skip => continue,
                Recompute::Unchanged => {}
                Recompute::Value(value) => {
                    node.set_value(value.clone(), pass);
                    self.report.changed.push(id);
                    self.finalizer.queue_notify(id, Watch::Value, || {
                        Notification::ValueChanged { node: id, value }
                    });
                    self.pend_children(id);
                }
                Recompute::Fire => {
                    node.provoke(pass);
                    fired.push(id);
                    self.report.fired.push(id);
                    self.finalizer.queue_reset(id);
                    self.finalizer
                        .queue_notify(id, Watch::Provoke, || Notification::Provoked { node: id });
                    self.pend_children(id);
                }
            }
            self.report.evaluated += 1;
            self.touched(logger, Phase::Eval, depth, id);
        }
        debug!(pass, evaluated = self.report.evaluated, "eval stage drained");
        fired
    }

    fn finalize_stage(&mut self, logger: Logger<'_, '_>) -> PassReport {
        let mut edits = EditQueue::default();
        for task in self.finalizer.take_tasks() {
            match task {
                Task::Reset(id) => {
                    let Ok(node) = self.graph.node_mut(id) else {
                        continue;
                    };
                    node.reset();
                    let depth = node.depth();
                    self.touched(logger, Phase::Finalize, depth, id);
                }
                Task::Notify(observer, notification) => {
                    if self.finalizer.notify(observer, &notification, &mut edits) {
                        self.report.notifications += 1;
                    }
                }
            }
        }

        let mut report = std::mem::take(&mut self.report);
        report.queued_edits = edits.len();
        for edit in edits.drain() {
            let (node, result) = match edit {
                Edit::SetValue { node, value } => (node, self.set_input_value(node, value)),
                Edit::Provoke { node } => (node, self.provoke_trigger(node)),
            };
            if let Err(err) = result {
                warn!(node = %node, error = %err, "observer edit rejected");
                report.rejected_edits += 1;
            }
        }
        report
    }

    /// Compute what `id` would become in `pass` without touching it.
    fn recompute(&self, id: NodeId, pass: u64) -> Result<Recompute> {
        let node = self.graph.node(id)?;
        let mut args = Vec::with_capacity(node.parents().len());
        for &parent in node.parents() {
            let parent = self.graph.node(parent)?;
            let is_trigger = parent.kind().is_trigger();
            args.push(Arg {
                value: if is_trigger { None } else { parent.value() },
                fired: parent.fired_in(pass),
                is_trigger,
            });
        }

        let outcome = match node.kind() {
            NodeKind::Formula { rule, .. } => {
                if args.iter().any(Arg::is_missing) {
                    Recompute::Skip
                } else {
                    match rule.compute(&args, node.value()) {
                        Some(value) if Some(&value) != node.value() => Recompute::Value(value),
                        _ => Recompute::Unchanged,
                    }
                }
            }
            NodeKind::Trigger { rule } => {
                if rule.fires(&args) {
                    Recompute::Fire
                } else {
                    Recompute::Unchanged
                }
            }
            NodeKind::Input { .. } | NodeKind::Constant => match &node.staged {
                Some(Staged::Value(value)) if Some(value) != node.value() => {
                    Recompute::Value(value.clone())
                }
                _ => Recompute::Unchanged,
            },
            NodeKind::TriggerInput => match node.staged {
                Some(Staged::Provoke) => Recompute::Fire,
                _ => Recompute::Unchanged,
            },
            NodeKind::Namespace { .. } | NodeKind::FunctionGroup(_) => Recompute::Skip,
        };
        Ok(outcome)
    }

    fn pend_children(&mut self, id: NodeId) {
        let Ok(node) = self.graph.node(id) else {
            return;
        };
        for &child in node.children() {
            if let Ok(child_node) = self.graph.node(child) {
                self.eval.insert(child, child_node.depth());
            }
        }
    }

    fn touched(&self, logger: Logger<'_, '_>, phase: Phase, depth: u32, id: NodeId) {
        if logger.is_none() && !self.config.trace_nodes {
            return;
        }
        let description = self.describe(id);
        if self.config.trace_nodes {
            trace!(%phase, depth, node = %id, %description, "node touched");
        }
        if let Some(logger) = logger.as_mut() {
            logger.node_touched(phase, depth, id, &description);
        }
    }

    // ------------------------------------------------------------------
    // Namespaces and functions
    // ------------------------------------------------------------------

    /// The unnamed namespace every path starts from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Resolve a dotted path from the root namespace.
    pub fn lookup(&self, path: &str) -> Result<NodeId> {
        self.graph.lookup_from(self.root, path)
    }

    /// Resolve a dotted path relative to `scope`.
    pub fn lookup_in(&self, scope: NodeId, path: &str) -> Result<NodeId> {
        self.graph.lookup_from(scope, path)
    }

    /// Create an empty namespace named `name` inside `scope`.
    pub fn create_namespace(&mut self, scope: NodeId, name: &str) -> Result<NodeId> {
        self.graph.check_scope(None, scope, name)?;
        let id = self.graph.new_namespace();
        if let Err(err) = self.graph.set_scope(id, scope, name) {
            self.graph.remove_node(id)?;
            return Err(err);
        }
        Ok(id)
    }

    /// Name `node` inside `scope`, moving it out of its previous scope.
    pub fn set_scope(&mut self, node: NodeId, scope: NodeId, name: &str) -> Result<()> {
        self.graph.set_scope(node, scope, name)
    }

    pub fn path_of(&self, node: NodeId) -> Result<Option<String>> {
        self.graph.path_of(node)
    }

    /// Members of a namespace, sorted by name.
    pub fn members(&self, namespace: NodeId) -> Result<Vec<(String, NodeId)>> {
        let members = self
            .graph
            .node(namespace)?
            .members()
            .ok_or(GraphError::WrongKind {
                node: namespace,
                expected: "a namespace",
            })?;
        Ok(members.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    /// Store a function group in `scope` under the group's name.
    pub fn define_function(&mut self, scope: NodeId, group: FunctionGroup) -> Result<NodeId> {
        let name = group.name().to_string();
        self.graph.check_scope(None, scope, &name)?;
        let id = self.graph.add_node(Node::new(
            NodeKind::FunctionGroup(Arc::new(group)),
            &[],
            None,
        ))?;
        if let Err(err) = self.graph.set_scope(id, scope, &name) {
            self.graph.remove_node(id)?;
            return Err(err);
        }
        Ok(id)
    }

    pub fn function_group(&self, id: NodeId) -> Result<Arc<FunctionGroup>> {
        match self.graph.node(id)?.kind() {
            NodeKind::FunctionGroup(group) => Ok(Arc::clone(group)),
            _ => Err(GraphError::WrongKind {
                node: id,
                expected: "a function group",
            }),
        }
    }

    /// Pick the overload of a function group node for `args`.
    pub fn resolve_overload(&self, group: NodeId, args: &[DataType]) -> Result<FunctionDef> {
        let group = self.function_group(group)?;
        let resolution = group.resolve(&self.casts, args)?;
        Ok(resolution.def.clone())
    }

    /// Build a call to a function group node.
    ///
    /// Arguments that need a conversion get an implicit cast node in front
    /// of them. If anything fails, every node created for the call is
    /// removed again.
    pub fn call(&mut self, group: NodeId, args: &[NodeId]) -> Result<NodeId> {
        let group = self.function_group(group)?;
        let types = args
            .iter()
            .map(|&arg| self.value_type(arg))
            .collect::<Result<Vec<_>>>()?;
        let resolution = group.resolve(&self.casts, &types)?;
        if resolution.passthrough {
            return Ok(args[0]);
        }
        let params: Vec<DataType> = (0..args.len())
            .filter_map(|i| resolution.def.param_type(i))
            .collect();
        let spec = resolution.def.node_spec();
        debug!(
            function = group.name(),
            overload = resolution.index,
            distance = resolution.distance,
            "call resolved"
        );

        let mut created = Vec::new();
        let outcome = self
            .wire_args(args, &params, &mut created)
            .and_then(|wired| self.create_node(spec, &wired));
        match outcome {
            Ok(id) => Ok(id),
            Err(err) => {
                for id in created.into_iter().rev() {
                    if let Err(rollback) = self.remove_node(id) {
                        warn!(node = %id, error = %rollback, "cast rollback failed");
                    }
                }
                Err(err)
            }
        }
    }

    fn wire_args(
        &mut self,
        args: &[NodeId],
        params: &[DataType],
        created: &mut Vec<NodeId>,
    ) -> Result<Vec<NodeId>> {
        let mut wired = Vec::with_capacity(args.len());
        for (&arg, &param) in args.iter().zip(params) {
            let cast = self.implicit_cast(arg, param)?;
            if cast != arg {
                created.push(cast);
            }
            wired.push(cast);
        }
        Ok(wired)
    }

    /// Convert `node` to `to` if an implicit rule allows it.
    pub fn implicit_cast(&mut self, node: NodeId, to: DataType) -> Result<NodeId> {
        let from = self.value_type(node)?;
        if from == to {
            return Ok(node);
        }
        let rule = self
            .casts
            .rule(from, to)
            .filter(|rule| rule.implicit_weight.is_some())
            .copied()
            .ok_or(GraphError::NoCastPath { from, to })?;
        self.build_cast(node, from, to, rule)
    }

    /// Convert `node` to `to` with any registered rule.
    pub fn explicit_cast(&mut self, node: NodeId, to: DataType) -> Result<NodeId> {
        let from = self.value_type(node)?;
        if from == to {
            return Ok(node);
        }
        let rule = self
            .casts
            .rule(from, to)
            .copied()
            .ok_or(GraphError::NoCastPath { from, to })?;
        self.build_cast(node, from, to, rule)
    }

    fn build_cast(&mut self, node: NodeId, from: DataType, to: DataType, rule: CastRule) -> Result<NodeId> {
        if from.is_trigger() {
            return Err(GraphError::CastRejected { node, to });
        }
        let id = self.create_node(rule.node_spec(to), &[node])?;
        trace!(from = %from, to = %to, source = %node, cast = %id, "cast inserted");
        Ok(id)
    }

    fn value_type(&self, id: NodeId) -> Result<DataType> {
        self.graph
            .node(id)?
            .data_type()
            .ok_or(GraphError::WrongKind {
                node: id,
                expected: "a data node",
            })
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Call `callback` during finalization of every pass in which the value
    /// of `node` changed.
    pub fn on_value_changed(
        &mut self,
        node: NodeId,
        callback: impl FnMut(&Notification, &mut EditQueue) + Send + 'static,
    ) -> Result<ObserverId> {
        let kind = self.graph.node(node)?.kind();
        if kind.is_trigger() || !kind.is_data() {
            return Err(GraphError::WrongKind {
                node,
                expected: "a value node",
            });
        }
        Ok(self.finalizer.register(node, Watch::Value, Box::new(callback)))
    }

    /// Call `callback` during finalization of every pass in which the
    /// trigger `node` fired.
    pub fn on_provoked(
        &mut self,
        node: NodeId,
        callback: impl FnMut(&Notification, &mut EditQueue) + Send + 'static,
    ) -> Result<ObserverId> {
        if !self.graph.node(node)?.kind().is_trigger() {
            return Err(GraphError::WrongKind {
                node,
                expected: "a trigger",
            });
        }
        Ok(self.finalizer.register(node, Watch::Provoke, Box::new(callback)))
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.finalizer.unregister(id)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.graph.node(id)
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Settled value of a value node. Staged input is not visible until the
    /// next pass.
    pub fn value(&self, id: NodeId) -> Result<Option<&Value>> {
        Ok(self.graph.node(id)?.value())
    }

    pub fn is_provoked(&self, id: NodeId) -> Result<bool> {
        Ok(self.graph.node(id)?.is_provoked())
    }

    pub fn depth(&self, id: NodeId) -> Result<u32> {
        self.graph.depth(id)
    }

    pub fn parents(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.graph.node(id)?.parents())
    }

    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.graph.node(id)?.children().iter().copied().collect())
    }

    pub fn data_type(&self, id: NodeId) -> Result<Option<DataType>> {
        Ok(self.graph.node(id)?.data_type())
    }

    /// One-line description used in logs: path (or id), kind and value.
    pub fn describe(&self, id: NodeId) -> String {
        let Ok(node) = self.graph.node(id) else {
            return format!("{id} <removed>");
        };
        let name = self
            .graph
            .path_of(id)
            .ok()
            .flatten()
            .unwrap_or_else(|| id.to_string());
        let label = node.kind().label();
        match node.value() {
            Some(value) => format!("{name} {label} = {value}"),
            None if node.is_provoked() => format!("{name} {label} (provoked)"),
            None => format!("{name} {label}"),
        }
    }

    /// Live nodes, including the root namespace.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Nodes waiting for the Eval stage.
    pub fn pending_eval(&self) -> &PendingSet {
        &self.eval
    }

    /// Number of the last pass that evaluated anything.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    pub fn casts(&self) -> &CastRegistry {
        &self.casts
    }

    pub fn casts_mut(&mut self) -> &mut CastRegistry {
        &mut self.casts
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
