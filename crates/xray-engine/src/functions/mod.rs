//! Built-in functions callable from scripts.
//!
//! Builtins run outside instrumented code, so a failing builtin surfaces as
//! an error at the call expression's binding in the calling frame.

use xray_model::{ErrorKind, Value};

/// Error payload for a failed builtin; the evaluator attaches the span of
/// the call expression.
pub type BuiltinError = (ErrorKind, String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Abs,
    Min,
    Max,
    Str,
    Fail,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        Some(match name {
            "len" => Builtin::Len,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "str" => Builtin::Str,
            "fail" => Builtin::Fail,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Abs => "abs",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Str => "str",
            Builtin::Fail => "fail",
        }
    }

    pub fn call(self, args: &[Value]) -> Result<Value, BuiltinError> {
        match self {
            Builtin::Len => {
                let [arg] = expect_arity::<1>(self, args)?;
                match arg {
                    Value::Text(s) => Ok(Value::Number(s.chars().count() as f64)),
                    Value::List(items) => Ok(Value::Number(items.len() as f64)),
                    Value::Record(fields) => Ok(Value::Number(fields.len() as f64)),
                    other => Err((
                        ErrorKind::TypeMismatch,
                        format!("len expects text, list, or record, got {}", other.type_name()),
                    )),
                }
            }
            Builtin::Abs => {
                let [arg] = expect_arity::<1>(self, args)?;
                let n = expect_number(self, arg)?;
                Ok(Value::Number(n.abs()))
            }
            Builtin::Min | Builtin::Max => {
                if args.is_empty() {
                    return Err((
                        ErrorKind::ArityMismatch,
                        format!("{} expects at least 1 argument, got 0", self.name()),
                    ));
                }
                let mut best = expect_number(self, &args[0])?;
                for arg in &args[1..] {
                    let n = expect_number(self, arg)?;
                    best = if self == Builtin::Min {
                        best.min(n)
                    } else {
                        best.max(n)
                    };
                }
                Ok(Value::Number(best))
            }
            Builtin::Str => {
                let [arg] = expect_arity::<1>(self, args)?;
                match arg {
                    // Text passes through unquoted; everything else renders
                    // in literal form.
                    Value::Text(s) => Ok(Value::Text(s.clone())),
                    other => Ok(Value::Text(other.to_string())),
                }
            }
            Builtin::Fail => {
                let [arg] = expect_arity::<1>(self, args)?;
                let message = match arg {
                    Value::Text(s) => s.clone(),
                    other => other.to_string(),
                };
                Err((ErrorKind::Explicit, message))
            }
        }
    }
}

fn expect_arity<const N: usize>(builtin: Builtin, args: &[Value]) -> Result<&[Value; N], BuiltinError> {
    args.try_into().map_err(|_| {
        (
            ErrorKind::ArityMismatch,
            format!(
                "{} expects {} argument{}, got {}",
                builtin.name(),
                N,
                if N == 1 { "" } else { "s" },
                args.len()
            ),
        )
    })
}

fn expect_number(builtin: Builtin, value: &Value) -> Result<f64, BuiltinError> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err((
            ErrorKind::TypeMismatch,
            format!("{} expects a number, got {}", builtin.name(), other.type_name()),
        )),
    }
}
