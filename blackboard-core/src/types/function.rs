//! Function Overloads
//!
//! A [`FunctionDef`] is one callable signature; a [`FunctionGroup`] is the
//! set of overloads that share a name. Resolution scores every definition
//! against the argument types and picks the cheapest.
//!
//! # Scoring
//!
//! 1. A `passthrough_one` definition called with a single argument (when it
//!    normally needs two or more) scores the distance of that argument to the
//!    first parameter, and the call returns the argument itself.
//! 2. Otherwise the argument count must lie within `min_args..=max_args`.
//! 3. Each argument must convert implicitly to its parameter type. Past the
//!    end of `params` the last parameter type repeats.
//! 4. A `needs_one_no_cast` definition rejects calls where every argument
//!    needs a conversion.
//! 5. The score is the sum of the conversion distances.
//!
//! Ties go to the definition declared first.

use std::sync::Arc;

use super::{CastRegistry, DataType};
use crate::error::{GraphError, Result};
use crate::reactive::{NodeSpec, TriggerRule, ValueRule};

/// What a definition builds when called.
#[derive(Debug, Clone)]
pub enum Behavior {
    Value(Arc<dyn ValueRule>),
    Trigger(Arc<dyn TriggerRule>),
}

/// One overload.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    name: String,
    min_args: usize,
    max_args: usize,
    params: Vec<DataType>,
    result: DataType,
    passthrough_one: bool,
    needs_one_no_cast: bool,
    behavior: Behavior,
}

impl FunctionDef {
    /// A fixed-arity definition producing a value.
    pub fn value(
        name: impl Into<String>,
        params: &[DataType],
        result: DataType,
        rule: Arc<dyn ValueRule>,
    ) -> Self {
        Self::new(name.into(), params, result, Behavior::Value(rule))
    }

    /// A fixed-arity definition producing a trigger.
    pub fn trigger(name: impl Into<String>, params: &[DataType], rule: Arc<dyn TriggerRule>) -> Self {
        Self::new(name.into(), params, DataType::Trigger, Behavior::Trigger(rule))
    }

    fn new(name: String, params: &[DataType], result: DataType, behavior: Behavior) -> Self {
        Self {
            name,
            min_args: params.len(),
            max_args: params.len(),
            params: params.to_vec(),
            result,
            passthrough_one: false,
            needs_one_no_cast: false,
            behavior,
        }
    }

    /// Accept up to `max_args` arguments; extra ones take the last
    /// parameter type.
    pub fn variadic(mut self, max_args: usize) -> Self {
        self.max_args = max_args.max(self.min_args);
        self
    }

    /// Lower the minimum argument count.
    pub fn min_args(mut self, min_args: usize) -> Self {
        self.min_args = min_args.min(self.max_args);
        self
    }

    /// A single argument is returned unchanged instead of building a node.
    pub fn passthrough_one(mut self) -> Self {
        self.passthrough_one = true;
        self
    }

    /// At least one argument must match its parameter exactly.
    pub fn needs_one_no_cast(mut self) -> Self {
        self.needs_one_no_cast = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> (usize, usize) {
        (self.min_args, self.max_args)
    }

    pub fn params(&self) -> &[DataType] {
        &self.params
    }

    pub fn result(&self) -> DataType {
        self.result
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Expected type of argument `i`. The last parameter repeats.
    pub fn param_type(&self, i: usize) -> Option<DataType> {
        self.params
            .get(i)
            .or_else(|| self.params.last())
            .copied()
    }

    fn is_passthrough(&self, arg_count: usize) -> bool {
        self.passthrough_one && arg_count == 1 && self.min_args >= 2
    }

    /// Score this definition against the argument types.
    ///
    /// Returns `None` when it does not match.
    pub fn score(&self, casts: &CastRegistry, args: &[DataType]) -> Option<u32> {
        if self.is_passthrough(args.len()) {
            return casts.match_implicit(args[0], self.param_type(0)?);
        }
        if args.len() < self.min_args || args.len() > self.max_args {
            return None;
        }

        let mut total: u32 = 0;
        let mut exact = false;
        for (i, &arg) in args.iter().enumerate() {
            let distance = casts.match_implicit(arg, self.param_type(i)?)?;
            exact |= distance == 0;
            total = total.saturating_add(distance);
        }
        if self.needs_one_no_cast && !exact && !args.is_empty() {
            return None;
        }
        Some(total)
    }

    /// Describe the node a call to this definition builds.
    pub fn node_spec(&self) -> NodeSpec {
        match &self.behavior {
            Behavior::Value(rule) => NodeSpec::formula(self.result, Arc::clone(rule)),
            Behavior::Trigger(rule) => NodeSpec::trigger(Arc::clone(rule)),
        }
    }
}

/// The outcome of overload resolution.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub def: &'a FunctionDef,
    /// Declaration index within the group.
    pub index: usize,
    /// Total conversion distance.
    pub distance: u32,
    /// The call should return its single argument unchanged.
    pub passthrough: bool,
}

/// A named set of overloads.
#[derive(Debug, Clone)]
pub struct FunctionGroup {
    name: String,
    defs: Vec<FunctionDef>,
}

impl FunctionGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            defs: Vec::new(),
        }
    }

    /// Append an overload. Declaration order breaks ties.
    pub fn with(mut self, def: FunctionDef) -> Self {
        self.defs.push(def);
        self
    }

    pub fn push(&mut self, def: FunctionDef) {
        self.defs.push(def);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defs(&self) -> &[FunctionDef] {
        &self.defs
    }

    /// Pick the best definition for the argument types.
    pub fn resolve(&self, casts: &CastRegistry, args: &[DataType]) -> Result<Resolution<'_>> {
        let mut best: Option<Resolution<'_>> = None;
        for (index, def) in self.defs.iter().enumerate() {
            let Some(distance) = def.score(casts, args) else {
                continue;
            };
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Resolution {
                    def,
                    index,
                    distance,
                    passthrough: def.is_passthrough(args.len()),
                });
            }
        }
        best.ok_or_else(|| GraphError::NoOverloadMatch {
            name: self.name.clone(),
            args: args.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{Arithmetic, ArithmeticOp};
    use DataType::*;

    fn sum(params: &[DataType], result: DataType) -> FunctionDef {
        FunctionDef::value("sum", params, result, Arc::new(Arithmetic(ArithmeticOp::Add)))
    }

    fn sum_group() -> FunctionGroup {
        FunctionGroup::new("sum")
            .with(sum(&[Int, Int], Int))
            .with(sum(&[Double, Double], Double))
    }

    #[test]
    fn exact_overload_wins() {
        let casts = CastRegistry::standard();
        let group = sum_group();
        let res = group.resolve(&casts, &[Int, Int]).unwrap();
        assert_eq!(res.index, 0);
        assert_eq!(res.distance, 0);
        assert_eq!(res.def.result(), Int);
    }

    #[test]
    fn cast_overload_when_needed() {
        let casts = CastRegistry::standard();
        let group = sum_group();
        let res = group.resolve(&casts, &[Int, Double]).unwrap();
        assert_eq!(res.index, 1);
        assert_eq!(res.distance, 1);
    }

    #[test]
    fn arity_is_enforced() {
        let casts = CastRegistry::standard();
        let err = sum_group().resolve(&casts, &[Int, Int, Int]).unwrap_err();
        assert_eq!(
            err,
            GraphError::NoOverloadMatch {
                name: "sum".into(),
                args: vec![Int, Int, Int]
            }
        );
    }

    #[test]
    fn variadic_repeats_last_param() {
        let casts = CastRegistry::standard();
        let def = sum(&[Int, Int], Int).variadic(4);
        assert_eq!(def.param_type(3), Some(Int));
        assert_eq!(def.score(&casts, &[Int, Int, Bool, Int]), Some(1));
        assert_eq!(def.score(&casts, &[Int; 5]), None);
    }

    #[test]
    fn needs_one_no_cast_rejects_all_cast_calls() {
        let casts = CastRegistry::standard();
        let strict = sum(&[Double, Double], Double).needs_one_no_cast();
        assert_eq!(strict.score(&casts, &[Int, Int]), None);
        assert_eq!(strict.score(&casts, &[Int, Double]), Some(1));

        let loose = sum(&[Double, Double], Double);
        assert_eq!(loose.score(&casts, &[Int, Int]), Some(2));
    }

    #[test]
    fn passthrough_of_one() {
        let casts = CastRegistry::standard();
        let group = FunctionGroup::new("sum").with(sum(&[Int, Int], Int).variadic(8).passthrough_one());

        let res = group.resolve(&casts, &[Int]).unwrap();
        assert!(res.passthrough);
        assert_eq!(res.distance, 0);

        let res = group.resolve(&casts, &[Bool]).unwrap();
        assert!(res.passthrough);
        assert_eq!(res.distance, 1);

        assert!(group.resolve(&casts, &[Text]).is_err());
    }

    #[test]
    fn ties_go_to_declaration_order() {
        let casts = CastRegistry::standard();
        let group = FunctionGroup::new("pick")
            .with(sum(&[Double], Double))
            .with(sum(&[Double], Double));
        for _ in 0..10 {
            assert_eq!(group.resolve(&casts, &[Int]).unwrap().index, 0);
        }
    }

    #[test]
    fn trigger_definitions_produce_triggers() {
        let def = FunctionDef::trigger("both", &[Trigger, Trigger], Arc::new(crate::builtins::AllFired));
        assert_eq!(def.result(), Trigger);
        assert!(matches!(def.behavior(), Behavior::Trigger(_)));
    }
}
