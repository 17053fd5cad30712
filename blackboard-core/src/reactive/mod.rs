//! Reactive Runtime
//!
//! This module drives propagation over the dependency graph: the [`Engine`]
//! that owns a graph and runs passes, the rule traits derived nodes compute
//! with, and the finalization machinery that notifies observers.
//!
//! # Concepts
//!
//! ## Value nodes
//!
//! An input, constant or formula holding an optional [`crate::Value`]. A
//! formula recomputes from its parents through a [`ValueRule`] and only
//! counts as changed when the new value differs from the old one.
//!
//! ## Triggers
//!
//! A node with a transient "provoked" flag. It fires during the Eval stage
//! of a pass and is reset during finalization, so every reader sees the same
//! state for the whole pass. Whether a derived trigger fires is decided by
//! its [`TriggerRule`].
//!
//! ## Passes
//!
//! External writes are staged and coalesced until [`Engine::run_pass`],
//! which settles depths, evaluates pending nodes lowest depth first and then
//! finalizes. Each node is evaluated at most once per pass, after all of its
//! parents, so no node ever sees a mix of stale and fresh inputs.

mod engine;
mod finalize;
mod node_spec;
mod report;
mod rule;
mod shared;

pub use engine::Engine;
pub use finalize::{Callback, Edit, EditQueue, Notification, ObserverId};
pub use node_spec::NodeSpec;
pub use report::{PassEvent, PassLogger, PassReport, Phase, RecordingLogger};
pub use rule::{Arg, TriggerRule, ValueRule};
pub use shared::SharedEngine;
