//! Tree-walking evaluator.

use crate::dispatch::run_member;
use crate::reflect::Value;
use crate::registry::ResolvedTarget;

use super::ExpressionError;
use super::parser::{BinaryOp, Expr};

pub(super) struct Evaluator<'a> {
    target: &'a ResolvedTarget,
}

impl<'a> Evaluator<'a> {
    pub(super) const fn new(target: &'a ResolvedTarget) -> Self {
        Self { target }
    }

    pub(super) fn evaluate(&self, expr: &Expr) -> Result<Value, ExpressionError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Root => Err(ExpressionError::evaluation(
                "#root has no value form; read a property such as #root.name",
            )),
            Expr::Property(name) => self.property(name),
            Expr::Call { name, args } => self.call(name, args),
            Expr::Field { target, name } => match target.as_ref() {
                Expr::Root => self.property(name),
                other => field(self.evaluate(other)?, name),
            },
            Expr::Index { target, index } => {
                let key = self.evaluate(index)?;
                match (target.as_ref(), key) {
                    (Expr::Root, Value::Str(name)) => self.property(&name),
                    (Expr::Root, other) => Err(ExpressionError::evaluation(format!(
                        "#root can only be indexed by property name, not by a {}",
                        other.kind_name()
                    ))),
                    (container, key) => index_into(self.evaluate(container)?, key),
                }
            }
            Expr::Negate(operand) => negate(self.evaluate(operand)?),
            Expr::Binary { op, lhs, rhs } => {
                arithmetic(*op, self.evaluate(lhs)?, self.evaluate(rhs)?)
            }
        }
    }

    fn property(&self, name: &str) -> Result<Value, ExpressionError> {
        self.target
            .descriptor()
            .read_property(self.target.instance(), name)
            .ok_or_else(|| {
                ExpressionError::evaluation(format!(
                    "unknown property '{name}' on {}",
                    self.target.type_name()
                ))
            })
    }

    fn call(&self, name: &str, args: &[Expr]) -> Result<Value, ExpressionError> {
        let values = args
            .iter()
            .map(|arg| self.evaluate(arg))
            .collect::<Result<Vec<_>, _>>()?;
        let member = self
            .target
            .descriptor()
            .member(name, values.len())
            .ok_or_else(|| {
                ExpressionError::evaluation(format!(
                    "no member '{name}' taking {} argument(s) on {}",
                    values.len(),
                    self.target.type_name()
                ))
            })?;
        let coerced = values
            .into_iter()
            .zip(member.params())
            .enumerate()
            .map(|(index, (value, kind))| {
                kind.coerce_value(value).map_err(|error| {
                    ExpressionError::evaluation(format!("argument {index} of {name}: {error}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        run_member(member, self.target, &coerced)
            .map_err(|message| ExpressionError::evaluation(format!("{name} failed: {message}")))
    }
}

fn field(value: Value, name: &str) -> Result<Value, ExpressionError> {
    match value {
        Value::Map(mut entries) => entries
            .remove(name)
            .ok_or_else(|| ExpressionError::evaluation(format!("no field '{name}' in map"))),
        other => Err(ExpressionError::evaluation(format!(
            "cannot read field '{name}' of a {}",
            other.kind_name()
        ))),
    }
}

fn index_into(container: Value, key: Value) -> Result<Value, ExpressionError> {
    match (container, key) {
        (Value::List(mut items), Value::Int(position)) => {
            let length = items.len();
            usize::try_from(position)
                .ok()
                .filter(|&slot| slot < length)
                .map(|slot| items.swap_remove(slot))
                .ok_or_else(|| {
                    ExpressionError::evaluation(format!(
                        "index {position} out of bounds for list of length {length}"
                    ))
                })
        }
        (Value::Map(mut entries), Value::Str(name)) => entries
            .remove(&name)
            .ok_or_else(|| ExpressionError::evaluation(format!("no key '{name}' in map"))),
        (container, key) => Err(ExpressionError::evaluation(format!(
            "cannot index a {} with a {}",
            container.kind_name(),
            key.kind_name()
        ))),
    }
}

fn negate(value: Value) -> Result<Value, ExpressionError> {
    match value {
        Value::Int(number) => number
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| ExpressionError::evaluation("integer overflow")),
        Value::Float(number) => Ok(Value::Float(-number)),
        other => Err(ExpressionError::evaluation(format!(
            "cannot negate a {}",
            other.kind_name()
        ))),
    }
}

fn arithmetic(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, ExpressionError> {
    if op == BinaryOp::Add && (matches!(lhs, Value::Str(_)) || matches!(rhs, Value::Str(_))) {
        return Ok(Value::Str(format!("{lhs}{rhs}")));
    }
    match (&lhs, &rhs) {
        (Value::Int(left), Value::Int(right)) => integer_arithmetic(op, *left, *right),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(left), Some(right)) => float_arithmetic(op, left, right),
            _ => Err(ExpressionError::evaluation(format!(
                "cannot apply '{}' to a {} and a {}",
                op.symbol(),
                lhs.kind_name(),
                rhs.kind_name()
            ))),
        },
    }
}

fn integer_arithmetic(op: BinaryOp, left: i64, right: i64) -> Result<Value, ExpressionError> {
    if matches!(op, BinaryOp::Divide | BinaryOp::Remainder) && right == 0 {
        return Err(ExpressionError::evaluation("division by zero"));
    }
    let result = match op {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Subtract => left.checked_sub(right),
        BinaryOp::Multiply => left.checked_mul(right),
        BinaryOp::Divide => left.checked_div(right),
        BinaryOp::Remainder => left.checked_rem(right),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| ExpressionError::evaluation("integer overflow"))
}

fn float_arithmetic(op: BinaryOp, left: f64, right: f64) -> Result<Value, ExpressionError> {
    if matches!(op, BinaryOp::Divide | BinaryOp::Remainder) && right == 0.0 {
        return Err(ExpressionError::evaluation("division by zero"));
    }
    let result = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Subtract => left - right,
        BinaryOp::Multiply => left * right,
        BinaryOp::Divide => left / right,
        BinaryOp::Remainder => left % right,
    };
    Ok(Value::Float(result))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::int_add(BinaryOp::Add, Value::Int(2), Value::Int(3), Value::Int(5))]
    #[case::int_div_truncates(BinaryOp::Divide, Value::Int(7), Value::Int(2), Value::Int(3))]
    #[case::float_div(BinaryOp::Divide, Value::Int(7), Value::Float(2.0), Value::Float(3.5))]
    #[case::string_left(BinaryOp::Add, Value::from("n="), Value::Null, Value::from("n=null"))]
    #[case::string_right(BinaryOp::Add, Value::Bool(true), Value::from("!"), Value::from("true!"))]
    fn applies_operators(
        #[case] op: BinaryOp,
        #[case] lhs: Value,
        #[case] rhs: Value,
        #[case] expected: Value,
    ) {
        assert_eq!(arithmetic(op, lhs, rhs).expect("arithmetic"), expected);
    }

    #[rstest]
    #[case::int_zero(BinaryOp::Remainder, Value::Int(1), Value::Int(0), "division by zero")]
    #[case::float_zero(BinaryOp::Divide, Value::Float(1.0), Value::Int(0), "division by zero")]
    #[case::overflow(BinaryOp::Multiply, Value::Int(i64::MAX), Value::Int(2), "integer overflow")]
    #[case::min_div(BinaryOp::Divide, Value::Int(i64::MIN), Value::Int(-1), "integer overflow")]
    #[case::string_minus(
        BinaryOp::Subtract,
        Value::from("a"),
        Value::Int(1),
        "cannot apply '-' to a string and a int"
    )]
    fn rejects_invalid_arithmetic(
        #[case] op: BinaryOp,
        #[case] lhs: Value,
        #[case] rhs: Value,
        #[case] message: &str,
    ) {
        assert_eq!(
            arithmetic(op, lhs, rhs).expect_err("arithmetic fails"),
            ExpressionError::evaluation(message)
        );
    }

    #[test]
    fn negation_overflow_is_reported() {
        assert_eq!(
            negate(Value::Int(i64::MIN)).expect_err("overflow"),
            ExpressionError::evaluation("integer overflow")
        );
    }

    #[test]
    fn negative_list_index_is_out_of_bounds() {
        let list = Value::from(vec![1_i64, 2]);
        assert_eq!(
            index_into(list, Value::Int(-1)).expect_err("negative index"),
            ExpressionError::evaluation("index -1 out of bounds for list of length 2")
        );
    }
}
