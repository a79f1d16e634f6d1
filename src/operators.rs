// Binary operator implementations
// Arithmetic coerces numeric strings; a non-numeric operand yields a
// recoverable failure whose recovered value treats that operand as zero.

use crate::ast::BinaryOp;
use crate::evaluator::EvalError;
use crate::utils;
use crate::value::Value;

/// Evaluate an arithmetic or comparison operator on two evaluated operands.
///
/// `And`/`Or` short-circuit and are handled by the evaluator before either
/// side is evaluated twice; they only reach this function with both sides
/// present.
pub fn evaluate_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add
        | BinaryOp::Subtract
        | BinaryOp::Multiply
        | BinaryOp::Divide
        | BinaryOp::Modulo => arithmetic(op, lhs, rhs),
        BinaryOp::Equal => Ok(Value::from(lhs == rhs)),
        BinaryOp::NotEqual => Ok(Value::from(lhs != rhs)),
        BinaryOp::LessThan
        | BinaryOp::LessThanOrEqual
        | BinaryOp::GreaterThan
        | BinaryOp::GreaterThanOrEqual => compare(op, lhs, rhs),
        BinaryOp::And | BinaryOp::Or => logical(op, lhs, rhs),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (utils::coerce_number(lhs), utils::coerce_number(rhs)) {
        (Some(a), Some(b)) => apply_arith(op, a, b),
        (a, b) => {
            let bad = if a.is_none() { lhs } else { rhs };
            let cause = EvalError::Expected {
                expected: "number",
                found: bad.kind(),
            };
            match apply_arith(op, a.unwrap_or(0.0), b.unwrap_or(0.0)) {
                Ok(recovered) => Err(EvalError::Recoverable {
                    recovered: Box::new(recovered),
                    cause: Box::new(cause),
                }),
                Err(_) => Err(cause),
            }
        }
    }
}

fn apply_arith(op: BinaryOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let n = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide | BinaryOp::Modulo if b == 0.0 => return Err(EvalError::DivideByZero),
        BinaryOp::Divide => a / b,
        BinaryOp::Modulo => a % b,
        _ => return Err(invalid(op, "number", "number")),
    };
    Ok(Value::Number(n))
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let ordering = match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => match (utils::coerce_number(lhs), utils::coerce_number(rhs)) {
            (Some(a), Some(b)) => a
                .partial_cmp(&b)
                .ok_or_else(|| invalid(op, lhs.kind(), rhs.kind()))?,
            _ => return Err(invalid(op, lhs.kind(), rhs.kind())),
        },
    };
    let result = match op {
        BinaryOp::LessThan => ordering.is_lt(),
        BinaryOp::LessThanOrEqual => ordering.is_le(),
        BinaryOp::GreaterThan => ordering.is_gt(),
        BinaryOp::GreaterThanOrEqual => ordering.is_ge(),
        _ => return Err(invalid(op, lhs.kind(), rhs.kind())),
    };
    Ok(Value::from(result))
}

fn logical(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
            BinaryOp::And => *a && *b,
            _ => *a || *b,
        })),
        _ => Err(invalid(op, lhs.kind(), rhs.kind())),
    }
}

pub(crate) fn invalid(op: BinaryOp, lhs: &str, rhs: &str) -> EvalError {
    EvalError::Operator(format!(
        "cannot apply '{}' to {} and {}",
        op.symbol(),
        lhs,
        rhs
    ))
}
