//! Pass Reports
//!
//! What a propagation pass did, for callers and for tests. The optional
//! [`PassLogger`] sees every node a pass touches as it happens; the
//! [`PassReport`] summarizes the pass once it is over.

use std::fmt;

use serde::Serialize;

use crate::graph::NodeId;

/// The stage of a pass a node was touched in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Update,
    Eval,
    Finalize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Update => f.write_str("update"),
            Phase::Eval => f.write_str("eval"),
            Phase::Finalize => f.write_str("finalize"),
        }
    }
}

/// Receives one event per node touched during a pass.
pub trait PassLogger {
    fn node_touched(&mut self, phase: Phase, depth: u32, node: NodeId, description: &str);
}

/// One recorded [`PassLogger`] event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassEvent {
    pub phase: Phase,
    pub depth: u32,
    pub node: NodeId,
    pub description: String,
}

/// A logger that keeps every event.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    pub events: Vec<PassEvent>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// How often `node` was touched in `phase`.
    pub fn count_for(&self, node: NodeId, phase: Phase) -> usize {
        self.events
            .iter()
            .filter(|e| e.node == node && e.phase == phase)
            .count()
    }

    /// Nodes touched in `phase`, in order.
    pub fn nodes_in(&self, phase: Phase) -> Vec<NodeId> {
        self.events
            .iter()
            .filter(|e| e.phase == phase)
            .map(|e| e.node)
            .collect()
    }
}

impl PassLogger for RecordingLogger {
    fn node_touched(&mut self, phase: Phase, depth: u32, node: NodeId, description: &str) {
        self.events.push(PassEvent {
            phase,
            depth,
            node,
            description: description.to_string(),
        });
    }
}

/// Summary of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// Pass number. 0 when no evaluation ran.
    pub pass: u64,
    /// Nodes whose depth changed in the Update pass.
    pub depth_updates: usize,
    /// Nodes recomputed in the Eval pass.
    pub evaluated: usize,
    /// Value nodes whose value changed, in evaluation order.
    pub changed: Vec<NodeId>,
    /// Triggers that fired, in evaluation order.
    pub fired: Vec<NodeId>,
    /// Observer callbacks run during finalization.
    pub notifications: usize,
    /// Edits queued by observers, pending for the next pass.
    pub queued_edits: usize,
    /// Queued edits that could not be applied.
    pub rejected_edits: usize,
}

impl PassReport {
    /// Whether the pass did nothing at all.
    pub fn is_empty(&self) -> bool {
        self.depth_updates == 0
            && self.evaluated == 0
            && self.changed.is_empty()
            && self.fired.is_empty()
            && self.notifications == 0
            && self.queued_edits == 0
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
