// Built-in function implementations
// Leaf functions that read from the message batch

use tracing::trace;

use crate::context::EvalContext;
use crate::evaluator::EvalError;
use crate::signature::{ParamType, Parameter, Signature};
use crate::utils;
use crate::value::Value;

/// Function names recognised by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Json,
    Meta,
    Content,
    BatchIndex,
    BatchSize,
    Deleted,
    Nothing,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        let builtin = match name {
            "json" => Builtin::Json,
            "meta" => Builtin::Meta,
            "content" => Builtin::Content,
            "batch_index" => Builtin::BatchIndex,
            "batch_size" => Builtin::BatchSize,
            "deleted" => Builtin::Deleted,
            "nothing" => Builtin::Nothing,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn signature(self) -> Signature {
        match self {
            Builtin::Json | Builtin::Meta => {
                Signature::new(vec![Parameter::optional(ParamType::StringLiteral)])
            }
            Builtin::Content
            | Builtin::BatchIndex
            | Builtin::BatchSize
            | Builtin::Deleted
            | Builtin::Nothing => Signature::empty(),
        }
    }
}

/// Leaf functions that survive compilation as nodes of their own. `meta`,
/// `deleted` and `nothing` lower to other node kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// json(path): field of the current part's document, ignoring scope
    Json(Vec<String>),
    /// content(): raw bytes of the current part
    Content,
    /// batch_index(): the current index
    BatchIndex,
    /// batch_size(): number of parts in the batch
    BatchSize,
}

impl Function {
    pub fn call(&self, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        match self {
            Function::Json(path) => json(path, ctx),
            Function::Content => Ok(content(ctx)),
            Function::BatchIndex => Ok(Value::from(ctx.index())),
            Function::BatchSize => Ok(Value::from(ctx.batch().len())),
        }
    }
}

/// json(path)
pub fn json(path: &[String], ctx: EvalContext<'_>) -> Result<Value, EvalError> {
    let doc = ctx.document()?;
    Ok(utils::lookup(&doc, path))
}

/// content()
pub fn content(ctx: EvalContext<'_>) -> Value {
    match ctx.part() {
        Some(part) => Value::bytes(part.content()),
        None => Value::Nothing,
    }
}

/// meta(key). Without a key every metadata pair is returned as an object.
pub fn meta(key: Option<&str>, ctx: EvalContext<'_>) -> Value {
    let Some(part) = ctx.part() else {
        return Value::Nothing;
    };
    match key {
        Some(key) => match part.metadata(key) {
            Some(v) => Value::string(v),
            None => {
                trace!(key, index = ctx.index(), "metadata key not found");
                Value::Nothing
            }
        },
        None => Value::object(
            part.metadata_pairs()
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::string(v)))
                .collect(),
        ),
    }
}
