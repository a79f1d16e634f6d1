// Method library
// Methods receive their target and arguments unevaluated so that they can
// choose the context each one is evaluated under.

use tracing::{debug, trace};

use crate::compiler::Expr;
use crate::context::EvalContext;
use crate::evaluator::{EvalError, Evaluator};
use crate::signature::{ParamType, Parameter, Signature};
use crate::utils;
use crate::value::Value;

/// Methods recognised by the compiler.
///
/// The set is closed: names are resolved to a variant once at build time and
/// [`Method::call`] dispatches on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Or,
    Catch,
    From,
    FromAll,
    ForEach,
    Map,
    Sum,
    Apply,
    Number,
    String,
    NotNull,
    Length,
    Type,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Method> {
        let method = match name {
            "or" => Method::Or,
            "catch" => Method::Catch,
            "from" => Method::From,
            "from_all" => Method::FromAll,
            "for_each" => Method::ForEach,
            "map" => Method::Map,
            "sum" => Method::Sum,
            "apply" => Method::Apply,
            "number" => Method::Number,
            "string" => Method::String,
            "not_null" => Method::NotNull,
            "length" => Method::Length,
            "type" => Method::Type,
            _ => return None,
        };
        Some(method)
    }

    pub fn name(self) -> &'static str {
        match self {
            Method::Or => "or",
            Method::Catch => "catch",
            Method::From => "from",
            Method::FromAll => "from_all",
            Method::ForEach => "for_each",
            Method::Map => "map",
            Method::Sum => "sum",
            Method::Apply => "apply",
            Method::Number => "number",
            Method::String => "string",
            Method::NotNull => "not_null",
            Method::Length => "length",
            Method::Type => "type",
        }
    }

    pub fn signature(self) -> Signature {
        match self {
            Method::Or | Method::Catch | Method::ForEach | Method::Map => {
                Signature::new(vec![Parameter::required(ParamType::Any)])
            }
            Method::From => Signature::new(vec![Parameter::required(ParamType::IndexLiteral)]),
            Method::Apply => Signature::new(vec![Parameter::required(ParamType::String)]),
            Method::FromAll
            | Method::Sum
            | Method::Number
            | Method::String
            | Method::NotNull
            | Method::Length
            | Method::Type => Signature::empty(),
        }
    }

    pub fn call(
        self,
        ev: &Evaluator,
        target: &Expr,
        args: &[Expr],
        ctx: EvalContext<'_>,
    ) -> Result<Value, EvalError> {
        trace!(method = self.name(), index = ctx.index(), "dispatching method");
        // trees built by hand can skip signature validation
        let arg = || args.first().ok_or(EvalError::MissingArgument(self.name()));
        match self {
            Method::Or => or(ev, target, arg()?, ctx),
            Method::Catch => catch(ev, target, arg()?, ctx),
            Method::From => from(ev, target, arg()?, ctx),
            Method::FromAll => from_all(ev, target, ctx),
            Method::ForEach => for_each(ev, target, arg()?, ctx),
            Method::Map => map(ev, target, arg()?, ctx),
            Method::Sum => sum(&ev.eval_operand(target, ctx)?),
            Method::Apply => apply(ev, target, arg()?, ctx),
            Method::Number => number(&ev.eval_operand(target, ctx)?),
            Method::String => Ok(string(&ev.eval_operand(target, ctx)?)),
            Method::NotNull => not_null(ev.eval_operand(target, ctx)?),
            Method::Length => length(&ev.eval_operand(target, ctx)?),
            Method::Type => Ok(Value::string(ev.eval_operand(target, ctx)?.kind())),
        }
    }
}

// ── Recovery ─────────────────────────────────────────────────────────────────

/// or(fallback): failures and every kind of absence take the fallback.
pub fn or(
    ev: &Evaluator,
    target: &Expr,
    fallback: &Expr,
    ctx: EvalContext<'_>,
) -> Result<Value, EvalError> {
    match ev.eval(target, ctx) {
        Ok(v) if !v.is_absent() => Ok(v),
        Ok(v) => {
            trace!(kind = v.kind(), "or: target absent, using fallback");
            ev.eval(fallback, ctx)
        }
        Err(err) => {
            trace!(error = %err, "or: target failed, using fallback");
            ev.eval(fallback, ctx)
        }
    }
}

/// catch(fallback): only failures take the fallback. `Null` is a value.
pub fn catch(
    ev: &Evaluator,
    target: &Expr,
    fallback: &Expr,
    ctx: EvalContext<'_>,
) -> Result<Value, EvalError> {
    match ev.eval(target, ctx) {
        Ok(v) => Ok(v),
        Err(err) => {
            trace!(error = %err, "catch: target failed, using fallback");
            ev.eval(fallback, ctx)
        }
    }
}

// ── Batch ────────────────────────────────────────────────────────────────────

/// from(i): evaluate the target against another part of the batch
pub fn from(
    ev: &Evaluator,
    target: &Expr,
    index: &Expr,
    ctx: EvalContext<'_>,
) -> Result<Value, EvalError> {
    let index = match index.as_index() {
        Some(i) if i < ctx.batch().len() => i,
        _ => return Ok(Value::Nothing),
    };
    ev.eval(target, ctx.with_index(index))
}

/// from_all(): evaluate the target against every part, in index order.
///
/// Each index is isolated. A failure contributes its recovered value when it
/// has one and `null` otherwise.
pub fn from_all(ev: &Evaluator, target: &Expr, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
    let len = ctx.batch().len();
    trace!(parts = len, "from_all: fanning out");

    let eval_at = |i: usize| match ev.eval(target, ctx.with_index(i)) {
        Ok(v) => v,
        Err(EvalError::Recoverable { recovered, .. }) => *recovered,
        Err(err) => {
            trace!(index = i, error = %err, "from_all: part failed");
            Value::Null
        }
    };

    #[cfg(feature = "parallel")]
    let values: Vec<Value> = {
        use rayon::prelude::*;
        (0..len).into_par_iter().map(eval_at).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let values: Vec<Value> = (0..len).map(eval_at).collect();

    Ok(Value::array(values))
}

// ── Arrays ───────────────────────────────────────────────────────────────────

/// for_each(mapping): map every element with `this` bound to it, dropping
/// elements that map to `Deleted`.
pub fn for_each(
    ev: &Evaluator,
    target: &Expr,
    mapping: &Expr,
    ctx: EvalContext<'_>,
) -> Result<Value, EvalError> {
    let items = match ev.eval(target, ctx) {
        Ok(Value::Array(items)) => items,
        Ok(_) | Err(_) => return Err(EvalError::NotAnArray),
    };

    let mut mapped = Vec::with_capacity(items.len());
    for item in items.iter() {
        let value = match ev.eval(mapping, ctx.with_scope(item)) {
            Ok(v) => v,
            Err(EvalError::Recoverable { recovered, .. }) => *recovered,
            Err(err) => return Err(err),
        };
        if !value.is_deleted() {
            mapped.push(value);
        }
    }
    Ok(Value::array(mapped))
}

/// map(projection): evaluate the projection with `this` bound to the target
pub fn map(
    ev: &Evaluator,
    target: &Expr,
    projection: &Expr,
    ctx: EvalContext<'_>,
) -> Result<Value, EvalError> {
    let base = ev.eval_operand(target, ctx)?;
    if !base.is_object() {
        return Err(EvalError::Expected {
            expected: "object",
            found: base.kind(),
        });
    }
    ev.eval(projection, ctx.with_scope(&base))
}

/// sum(): numbers and numeric strings are added, anything else is skipped
pub fn sum(target: &Value) -> Result<Value, EvalError> {
    let items = target.as_array().ok_or(EvalError::NotAnArray)?;
    let total = items
        .iter()
        .filter_map(utils::coerce_number)
        .sum::<f64>();
    Ok(Value::Number(total))
}

// ── Named maps ───────────────────────────────────────────────────────────────

/// apply(name): evaluate a registered map with `this` bound to the target
pub fn apply(
    ev: &Evaluator,
    target: &Expr,
    name: &Expr,
    ctx: EvalContext<'_>,
) -> Result<Value, EvalError> {
    let base = ev.eval_operand(target, ctx)?;
    let name = match ev.eval_operand(name, ctx)? {
        Value::String(s) => s,
        other => return Err(EvalError::InvalidMapName(other.kind())),
    };

    let maps = ctx
        .maps()
        .filter(|maps| !maps.is_empty())
        .ok_or(EvalError::NoMaps)?;
    let map = maps
        .get(&*name)
        .ok_or_else(|| EvalError::MapNotFound(name.to_string()))?;

    debug!(map = %name, index = ctx.index(), "applying named map");
    ev.eval(map, ctx.with_scope(&base))
}

// ── Coercion ─────────────────────────────────────────────────────────────────

/// number(): parse a string, pass a number through
pub fn number(target: &Value) -> Result<Value, EvalError> {
    match target {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::String(s) => utils::parse_number(s)
            .map(Value::Number)
            .map_err(|e| EvalError::Coercion(format!("parsing {:?}: {}", &**s, e))),
        other => Err(EvalError::Coercion(format!(
            "expected string or number value, found {}",
            other.kind()
        ))),
    }
}

/// string(): canonical textual rendering
pub fn string(target: &Value) -> Value {
    match target {
        Value::String(_) => target.clone(),
        other => Value::from(other.to_string()),
    }
}

pub fn not_null(target: Value) -> Result<Value, EvalError> {
    match target {
        Value::Null | Value::Nothing => Err(EvalError::NullValue),
        other => Ok(other),
    }
}

pub fn length(target: &Value) -> Result<Value, EvalError> {
    let len = match target {
        Value::String(s) => s.chars().count(),
        Value::Bytes(b) => b.len(),
        Value::Array(arr) => arr.len(),
        Value::Object(map) => map.len(),
        other => {
            return Err(EvalError::Expected {
                expected: "string, bytes, array or object",
                found: other.kind(),
            })
        }
    };
    Ok(Value::from(len))
}
