//! Operator and access semantics shared by both evaluators.
//!
//! Keeping these in one place is what makes instrumentation semantics-
//! preserving: the decomposed steps and the direct tree walk call the exact
//! same functions for every operation.

use xray_model::{BinaryOp, ErrorKind, UnaryOp, Value};

pub(crate) type OpError = (ErrorKind, String);

/// Non-short-circuit binary operators. `&&`/`||` are evaluated lazily by the
/// callers and never reach this function.
pub(crate) fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    match op {
        BinaryOp::Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{a}{b}"))),
            (Value::List(a), Value::List(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::List(out))
            }
            _ => Err(type_mismatch("add", left, right)),
        },
        BinaryOp::Sub => numeric(op, left, right, |a, b| Ok(a - b)),
        BinaryOp::Mul => numeric(op, left, right, |a, b| Ok(a * b)),
        BinaryOp::Div => numeric(op, left, right, |a, b| {
            if b == 0.0 {
                Err((ErrorKind::DivisionByZero, "division by zero".to_string()))
            } else {
                Ok(a / b)
            }
        }),
        BinaryOp::Mod => numeric(op, left, right, |a, b| {
            if b == 0.0 {
                Err((ErrorKind::DivisionByZero, "modulo by zero".to_string()))
            } else {
                Ok(a % b)
            }
        }),
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering_holds = match (left, right) {
                (Value::Number(a), Value::Number(b)) => compare(op, a.partial_cmp(b)),
                (Value::Text(a), Value::Text(b)) => compare(op, Some(a.cmp(b))),
                _ => {
                    return Err(type_mismatch("compare", left, right));
                }
            };
            Ok(Value::Bool(ordering_holds))
        }
        BinaryOp::And | BinaryOp::Or => {
            unreachable!("short-circuit operators are evaluated lazily")
        }
    }
}

pub(crate) fn apply_unary(op: UnaryOp, value: &Value) -> Result<Value, OpError> {
    match op {
        UnaryOp::Neg => match value {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err((
                ErrorKind::TypeMismatch,
                format!("cannot negate {}", other.type_name()),
            )),
        },
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
    }
}

pub(crate) fn field_access(base: &Value, field: &str) -> Result<Value, OpError> {
    match base {
        Value::Record(fields) => fields.get(field).cloned().ok_or_else(|| {
            (
                ErrorKind::UnknownField,
                format!("record has no field `{field}`"),
            )
        }),
        other => Err((
            ErrorKind::TypeMismatch,
            format!("cannot access field `{field}` on {}", other.type_name()),
        )),
    }
}

pub(crate) fn index_access(base: &Value, index: &Value) -> Result<Value, OpError> {
    match (base, index) {
        (Value::List(items), Value::Number(n)) => {
            let idx = integer_index(*n, items.len())?;
            Ok(items[idx].clone())
        }
        (Value::Text(s), Value::Number(n)) => {
            let chars: Vec<char> = s.chars().collect();
            let idx = integer_index(*n, chars.len())?;
            Ok(Value::Text(chars[idx].to_string()))
        }
        (Value::Record(fields), Value::Text(key)) => fields.get(key).cloned().ok_or_else(|| {
            (
                ErrorKind::UnknownField,
                format!("record has no field `{key}`"),
            )
        }),
        (base, index) => Err((
            ErrorKind::TypeMismatch,
            format!(
                "cannot index {} with {}",
                base.type_name(),
                index.type_name()
            ),
        )),
    }
}

fn integer_index(n: f64, len: usize) -> Result<usize, OpError> {
    if n.fract() != 0.0 || !n.is_finite() {
        return Err((
            ErrorKind::TypeMismatch,
            format!("index must be an integer, got {n}"),
        ));
    }
    if n < 0.0 || n >= len as f64 {
        return Err((
            ErrorKind::IndexOutOfBounds,
            format!("index {n} out of bounds for length {len}"),
        ));
    }
    Ok(n as usize)
}

fn numeric(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    f: impl FnOnce(f64, f64) -> Result<f64, OpError>,
) -> Result<Value, OpError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => f(*a, *b).map(Value::Number),
        _ => Err((
            ErrorKind::TypeMismatch,
            format!(
                "operator `{}` expects numbers, got {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

fn compare(op: BinaryOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering;
    match ordering {
        // NaN comparisons are false for every ordering operator.
        None => false,
        Some(ord) => match op {
            BinaryOp::Lt => ord == Ordering::Less,
            BinaryOp::Le => ord != Ordering::Greater,
            BinaryOp::Gt => ord == Ordering::Greater,
            BinaryOp::Ge => ord != Ordering::Less,
            _ => false,
        },
    }
}

fn type_mismatch(verb: &str, left: &Value, right: &Value) -> OpError {
    (
        ErrorKind::TypeMismatch,
        format!(
            "cannot {verb} {} and {}",
            left.type_name(),
            right.type_name()
        ),
    )
}
