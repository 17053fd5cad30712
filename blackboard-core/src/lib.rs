//! Blackboard Core
//!
//! This crate provides the runtime core of Blackboard, a reactive dataflow
//! language. Expressions compile into a directed acyclic graph of nodes;
//! changing an input re-evaluates exactly the affected part of the graph,
//! in dependency order, once per batch of changes and without glitches.
//!
//! It implements:
//!
//! - The dependency graph, with cycle-safe mutation and depth bookkeeping
//! - Two-stage propagation (depth update, then evaluation) over
//!   depth-ordered pending sets
//! - Triggers and end-of-pass finalization with deferred observers
//! - A type registry with implicit and explicit casts
//! - Function overload resolution
//!
//! The textual front end is not part of this crate; it drives the
//! [`Engine`] through the same API shown below.
//!
//! # Architecture
//!
//! - `graph`: node arena, parent/child links, depths, namespaces
//! - `reactive`: the engine, rule traits, passes and finalization
//! - `types`: values, data types, casts and function overloads
//! - `builtins`: a small standard library of leaf behaviors
//!
//! # Example
//!
//! ```
//! use blackboard_core::{DataType, Engine, Value};
//!
//! let mut engine = Engine::with_standard_library()?;
//! let add = engine.lookup("add")?;
//!
//! let x = engine.input_with(0i64)?;
//! let one = engine.constant(1i64)?;
//! let y = engine.call(add, &[x, one])?;
//! assert_eq!(engine.data_type(y)?, Some(DataType::Int));
//!
//! engine.set_input_value(x, 5i64)?;
//! let report = engine.run_pass(None);
//!
//! assert_eq!(engine.value(y)?, Some(&Value::Int(6)));
//! assert!(report.changed.contains(&y));
//! # Ok::<(), blackboard_core::GraphError>(())
//! ```

pub mod builtins;
pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod types;

pub use config::EngineConfig;
pub use error::{GraphError, Result};
pub use graph::{NodeId, NodeKind};
pub use reactive::{
    Arg, EditQueue, Engine, Notification, NodeSpec, ObserverId, PassLogger, PassReport, Phase,
    RecordingLogger, SharedEngine, TriggerRule, ValueRule,
};
pub use types::{CastRegistry, DataType, FunctionDef, FunctionGroup, Value};
