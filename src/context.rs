// Evaluation context
// One per evaluation call; rebinding produces a new context by value

use std::collections::HashMap;

use crate::compiler::Expr;
use crate::evaluator::EvalError;
use crate::message::{Batch, Part};
use crate::value::Value;

/// Named maps available to `apply`, keyed by name
pub type Maps = HashMap<String, Expr>;

/// Per-call evaluation environment.
///
/// Holds the batch, the index of the part being processed, an optional scope
/// value (what `this` refers to) and the named-map registry. The context is
/// `Copy`; combinators that need a different index or scope derive a new one
/// with [`with_index`](Self::with_index) or [`with_scope`](Self::with_scope)
/// and pass it down, leaving their own copy untouched.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    batch: &'a dyn Batch,
    index: usize,
    scope: Option<&'a Value>,
    maps: Option<&'a Maps>,
    pub(crate) depth: usize,
}

impl<'a> EvalContext<'a> {
    pub fn new(batch: &'a dyn Batch) -> Self {
        EvalContext {
            batch,
            index: 0,
            scope: None,
            maps: None,
            depth: 0,
        }
    }

    pub fn with_index(self, index: usize) -> Self {
        EvalContext { index, ..self }
    }

    pub fn with_maps(self, maps: &'a Maps) -> Self {
        EvalContext {
            maps: Some(maps),
            ..self
        }
    }

    /// Rebind `this`. The returned context may only live as long as `scope`.
    pub fn with_scope<'b>(self, scope: &'b Value) -> EvalContext<'b>
    where
        'a: 'b,
    {
        EvalContext {
            batch: self.batch,
            index: self.index,
            scope: Some(scope),
            maps: self.maps,
            depth: self.depth,
        }
    }

    pub fn batch(&self) -> &'a dyn Batch {
        self.batch
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn scope(&self) -> Option<&'a Value> {
        self.scope
    }

    pub fn maps(&self) -> Option<&'a Maps> {
        self.maps
    }

    /// The part at the current index, if the index is within the batch
    pub fn part(&self) -> Option<&'a dyn Part> {
        self.batch.get(self.index)
    }

    /// Structured document of the current part. A missing part is `Nothing`.
    pub fn document(&self) -> Result<Value, EvalError> {
        match self.part() {
            Some(part) => part.document().map_err(EvalError::Parse),
            None => Ok(Value::Nothing),
        }
    }

    /// What `this` refers to: the scope when bound, otherwise the current
    /// part's document.
    pub fn this(&self) -> Result<Value, EvalError> {
        match self.scope {
            Some(scope) => Ok(scope.clone()),
            None => self.document(),
        }
    }
}
