//! Standard Library
//!
//! Leaf behaviors for the common operators, packaged as function groups.
//! [`install`] defines them in the root namespace of an engine.
//!
//! | name | overloads |
//! |------|-----------|
//! | `add` | Int, Double, Text (concatenation); variadic |
//! | `sub`, `div` | Int, Double |
//! | `mul` | Int, Double; variadic |
//! | `eq`, `lt` | any matching pair, giving Bool |
//! | `not`, `and`, `or` | Bool |
//! | `both`, `either` | triggers; variadic |
//! | `changed` | trigger firing when a value changes |
//! | `count` | Int counting how often a trigger fired |
//! | `sample` | latches a value whenever a trigger fires |
//!
//! Numeric edge cases resolve to a value instead of failing: division by
//! zero gives zero and integer overflow wraps.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::Result;
use crate::reactive::{Arg, Engine, TriggerRule, ValueRule};
use crate::types::{
    Additive, Bitwise, Comparable, DataType, FunctionDef, FunctionGroup, Multiplicative, Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Left fold of an arithmetic operator over Int or Double arguments.
#[derive(Debug, Clone, Copy)]
pub struct Arithmetic(pub ArithmeticOp);

impl Arithmetic {
    fn apply(&self, lhs: &Value, rhs: &Value) -> Option<Value> {
        match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Some(Value::Int(self.fold(a, b))),
            (Value::Double(a), Value::Double(b)) => Some(Value::Double(self.fold(a, b))),
            _ => None,
        }
    }

    fn fold<T: Additive + Multiplicative>(&self, a: &T, b: &T) -> T {
        match self.0 {
            ArithmeticOp::Add => a.plus(b),
            ArithmeticOp::Sub => a.minus(b),
            ArithmeticOp::Mul => a.times(b),
            ArithmeticOp::Div => a.divide(b),
        }
    }
}

impl ValueRule for Arithmetic {
    fn name(&self) -> &str {
        match self.0 {
            ArithmeticOp::Add => "add",
            ArithmeticOp::Sub => "sub",
            ArithmeticOp::Mul => "mul",
            ArithmeticOp::Div => "div",
        }
    }

    fn compute(&self, args: &[Arg<'_>], _current: Option<&Value>) -> Option<Value> {
        let mut values = args.iter().filter_map(|arg| arg.value);
        let first = values.next()?.clone();
        values.try_fold(first, |acc, value| self.apply(&acc, value))
    }
}

/// Text concatenation.
#[derive(Debug, Clone, Copy)]
pub struct Concat;

impl ValueRule for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn compute(&self, args: &[Arg<'_>], _current: Option<&Value>) -> Option<Value> {
        let mut out = String::new();
        for arg in args {
            out.push_str(arg.value?.as_text()?);
        }
        Some(Value::Text(out))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
}

/// Binary comparison producing Bool.
#[derive(Debug, Clone, Copy)]
pub struct Compare(pub CompareOp);

impl ValueRule for Compare {
    fn name(&self) -> &str {
        match self.0 {
            CompareOp::Eq => "eq",
            CompareOp::Lt => "lt",
        }
    }

    fn compute(&self, args: &[Arg<'_>], _current: Option<&Value>) -> Option<Value> {
        let lhs = args.first()?.value?;
        let rhs = args.get(1)?.value?;
        let result = match self.0 {
            CompareOp::Eq => lhs == rhs,
            CompareOp::Lt => lhs.compare(rhs) == Ordering::Less,
        };
        Some(Value::Bool(result))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    Not,
    And,
    Or,
}

#[derive(Debug, Clone, Copy)]
pub struct Logic(pub LogicOp);

impl ValueRule for Logic {
    fn name(&self) -> &str {
        match self.0 {
            LogicOp::Not => "not",
            LogicOp::And => "and",
            LogicOp::Or => "or",
        }
    }

    fn compute(&self, args: &[Arg<'_>], _current: Option<&Value>) -> Option<Value> {
        let mut bools = args.iter().map(|arg| arg.value.and_then(Value::as_bool));
        let first = bools.next()??;
        let result = match self.0 {
            LogicOp::Not => !first,
            LogicOp::And => bools.try_fold(first, |acc, b| Some(acc.bit_and(&b?)))?,
            LogicOp::Or => bools.try_fold(first, |acc, b| Some(acc.bit_or(&b?)))?,
        };
        Some(Value::Bool(result))
    }
}

/// Fires when its first parent changed or fired in this pass.
#[derive(Debug, Clone, Copy)]
pub struct Changed;

impl TriggerRule for Changed {
    fn name(&self) -> &str {
        "changed"
    }

    fn fires(&self, args: &[Arg<'_>]) -> bool {
        args.first().is_some_and(|arg| arg.fired)
    }
}

/// Fires when every parent fired in this pass.
#[derive(Debug, Clone, Copy)]
pub struct AllFired;

impl TriggerRule for AllFired {
    fn name(&self) -> &str {
        "both"
    }

    fn fires(&self, args: &[Arg<'_>]) -> bool {
        !args.is_empty() && args.iter().all(|arg| arg.fired)
    }
}

/// Fires when any parent fired in this pass.
#[derive(Debug, Clone, Copy)]
pub struct AnyFired;

impl TriggerRule for AnyFired {
    fn name(&self) -> &str {
        "either"
    }

    fn fires(&self, args: &[Arg<'_>]) -> bool {
        args.iter().any(|arg| arg.fired)
    }
}

/// Counts how many passes any parent fired in. Starts at 0.
#[derive(Debug, Clone, Copy)]
pub struct Counter;

impl ValueRule for Counter {
    fn name(&self) -> &str {
        "count"
    }

    fn compute(&self, args: &[Arg<'_>], current: Option<&Value>) -> Option<Value> {
        let count = current.and_then(Value::as_int).unwrap_or(0);
        if args.iter().any(|arg| arg.fired) {
            Some(Value::Int(count.wrapping_add(1)))
        } else {
            Some(Value::Int(count))
        }
    }
}

/// Takes the value of its first parent whenever its second parent fires.
/// Unset until the first firing.
#[derive(Debug, Clone, Copy)]
pub struct Sample;

impl ValueRule for Sample {
    fn name(&self) -> &str {
        "sample"
    }

    fn compute(&self, args: &[Arg<'_>], _current: Option<&Value>) -> Option<Value> {
        let source = args.first()?;
        let clock = args.get(1)?;
        if clock.fired {
            source.value.cloned()
        } else {
            None
        }
    }
}

/// The standard function groups. `max_args` bounds the variadic ones.
pub fn standard_groups(max_args: usize) -> Vec<FunctionGroup> {
    use DataType::*;

    let arith = |op: ArithmeticOp| -> Arc<dyn ValueRule> { Arc::new(Arithmetic(op)) };
    let numeric = |name: &str, op: ArithmeticOp| {
        FunctionGroup::new(name)
            .with(FunctionDef::value(name, &[Int, Int], Int, arith(op)))
            .with(FunctionDef::value(name, &[Double, Double], Double, arith(op)))
    };
    let variadic = |name: &str, op: ArithmeticOp| {
        FunctionGroup::new(name)
            .with(
                FunctionDef::value(name, &[Int, Int], Int, arith(op))
                    .variadic(max_args)
                    .passthrough_one()
                    .needs_one_no_cast(),
            )
            .with(
                FunctionDef::value(name, &[Double, Double], Double, arith(op))
                    .variadic(max_args)
                    .passthrough_one()
                    .needs_one_no_cast(),
            )
    };
    let comparison = |name: &str, op: CompareOp| {
        [Bool, Int, Double, Text]
            .into_iter()
            .fold(FunctionGroup::new(name), |group, ty| {
                group.with(FunctionDef::value(name, &[ty, ty], Bool, Arc::new(Compare(op))))
            })
    };
    let logic = |name: &str, op: LogicOp| {
        FunctionGroup::new(name).with(
            FunctionDef::value(name, &[Bool, Bool], Bool, Arc::new(Logic(op)))
                .variadic(max_args)
                .passthrough_one()
                .needs_one_no_cast(),
        )
    };
    let triggers = |name: &str, rule: Arc<dyn TriggerRule>| {
        FunctionGroup::new(name).with(
            FunctionDef::trigger(name, &[Trigger, Trigger], rule)
                .variadic(max_args)
                .passthrough_one(),
        )
    };
    vec![
        variadic("add", ArithmeticOp::Add).with(
            FunctionDef::value("add", &[Text, Text], Text, Arc::new(Concat))
                .variadic(max_args)
                .passthrough_one()
                .needs_one_no_cast(),
        ),
        numeric("sub", ArithmeticOp::Sub),
        variadic("mul", ArithmeticOp::Mul),
        numeric("div", ArithmeticOp::Div),
        comparison("eq", CompareOp::Eq),
        comparison("lt", CompareOp::Lt),
        FunctionGroup::new("not").with(FunctionDef::value(
            "not",
            &[Bool],
            Bool,
            Arc::new(Logic(LogicOp::Not)),
        )),
        logic("and", LogicOp::And),
        logic("or", LogicOp::Or),
        triggers("both", Arc::new(AllFired)),
        triggers("either", Arc::new(AnyFired)),
        per_value_type("changed", |ty| {
            FunctionDef::trigger("changed", &[ty], Arc::new(Changed))
        }),
        FunctionGroup::new("count").with(FunctionDef::value(
            "count",
            &[Trigger],
            Int,
            Arc::new(Counter),
        )),
        per_value_type("sample", |ty| {
            FunctionDef::value("sample", &[ty, Trigger], ty, Arc::new(Sample))
        }),
    ]
}

/// One overload per value type.
fn per_value_type(name: &str, def: impl Fn(DataType) -> FunctionDef) -> FunctionGroup {
    [DataType::Bool, DataType::Int, DataType::Double, DataType::Text]
        .into_iter()
        .fold(FunctionGroup::new(name), |group, ty| group.with(def(ty)))
}

/// Define the standard library in the root namespace of `engine`.
pub fn install(engine: &mut Engine) -> Result<()> {
    let root = engine.root();
    for group in standard_groups(engine.config().max_variadic_args) {
        engine.define_function(root, group)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn val(value: &Value) -> Arg<'_> {
        Arg {
            value: Some(value),
            fired: false,
            is_trigger: false,
        }
    }

    fn trig(fired: bool) -> Arg<'static> {
        Arg {
            value: None,
            fired,
            is_trigger: true,
        }
    }

    #[test]
    fn arithmetic_folds_left() {
        let (a, b, c) = (Value::Int(10), Value::Int(3), Value::Int(2));
        let sub = Arithmetic(ArithmeticOp::Sub);
        assert_eq!(sub.compute(&[val(&a), val(&b), val(&c)], None), Some(Value::Int(5)));

        let div = Arithmetic(ArithmeticOp::Div);
        let zero = Value::Int(0);
        assert_eq!(div.compute(&[val(&a), val(&zero)], None), Some(Value::Int(0)));

        let (x, y) = (Value::Double(1.0), Value::Double(0.0));
        assert_eq!(div.compute(&[val(&x), val(&y)], None), Some(Value::Double(0.0)));
    }

    #[test]
    fn arithmetic_rejects_mixed_kinds() {
        let (a, b) = (Value::Int(1), Value::Double(1.0));
        let add = Arithmetic(ArithmeticOp::Add);
        assert_eq!(add.compute(&[val(&a), val(&b)], None), None);
    }

    #[test]
    fn concat_and_compare() {
        let (a, b) = (Value::Text("ab".into()), Value::Text("cd".into()));
        assert_eq!(Concat.compute(&[val(&a), val(&b)], None), Some(Value::Text("abcd".into())));
        assert_eq!(
            Compare(CompareOp::Lt).compute(&[val(&a), val(&b)], None),
            Some(Value::Bool(true))
        );
        assert_eq!(
            Compare(CompareOp::Eq).compute(&[val(&a), val(&b)], None),
            Some(Value::Bool(false))
        );
    }

    #[test]
    fn logic_ops() {
        let (t, f) = (Value::Bool(true), Value::Bool(false));
        assert_eq!(Logic(LogicOp::Not).compute(&[val(&t)], None), Some(Value::Bool(false)));
        assert_eq!(
            Logic(LogicOp::And).compute(&[val(&t), val(&f)], None),
            Some(Value::Bool(false))
        );
        assert_eq!(
            Logic(LogicOp::Or).compute(&[val(&t), val(&f), val(&f)], None),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn trigger_rules() {
        assert!(AllFired.fires(&[trig(true), trig(true)]));
        assert!(!AllFired.fires(&[trig(true), trig(false)]));
        assert!(!AllFired.fires(&[]));
        assert!(AnyFired.fires(&[trig(false), trig(true)]));
        assert!(!Changed.fires(&[trig(false)]));
    }

    #[test]
    fn counter_and_sample() {
        assert_eq!(Counter.compute(&[trig(false)], None), Some(Value::Int(0)));
        let three = Value::Int(3);
        assert_eq!(Counter.compute(&[trig(true)], Some(&three)), Some(Value::Int(4)));

        let v = Value::Text("x".into());
        assert_eq!(Sample.compute(&[val(&v), trig(false)], None), None);
        assert_eq!(Sample.compute(&[val(&v), trig(true)], None), Some(v.clone()));
    }

    #[test]
    fn install_defines_every_group() {
        let engine = Engine::with_standard_library().unwrap();
        for name in ["add", "sub", "mul", "div", "eq", "lt", "not", "and", "or"] {
            assert!(engine.lookup(name).is_ok(), "{name}");
        }
        for name in ["both", "either", "changed", "count", "sample"] {
            assert!(engine.lookup(name).is_ok(), "{name}");
        }
        assert!(install(&mut Engine::with_standard_library().unwrap()).is_err());
    }
}
