// Expression evaluator
// Walks a compiled expression tree against an evaluation context

use thiserror::Error;
use tracing::trace;

use crate::ast::BinaryOp;
use crate::compiler::{Arm, Expr};
use crate::context::EvalContext;
use crate::functions;
use crate::operators;
use crate::utils;
use crate::value::Value;

/// Evaluator errors
///
/// The messages of `NotAnArray`, `NoMaps` and `MapNotFound` are part of the
/// language's observable behaviour: the render entry points substitute them
/// for the output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The current part's content could not be parsed as a structured document
    #[error("{0}")]
    Parse(String),

    #[error("not an array")]
    NotAnArray,

    #[error("expected {expected} value, found {found}")]
    Expected {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Coercion(String),

    #[error("value is null")]
    NullValue,

    #[error("no maps were found")]
    NoMaps,

    #[error("map {0} was not found")]
    MapNotFound(String),

    #[error("expected string map name, found {0}")]
    InvalidMapName(&'static str),

    #[error("{0}")]
    Operator(String),

    #[error("attempted to divide by zero")]
    DivideByZero,

    /// A failure that still produced a usable value. Recovery operators treat
    /// it as any other failure; `for_each`, `from_all` and the render entry
    /// points use the recovered value. Anything else that consumes the
    /// result sees only the cause.
    #[error("{cause}")]
    Recoverable {
        recovered: Box<Value>,
        cause: Box<EvalError>,
    },

    #[error("maximum evaluation depth ({0}) exceeded")]
    DepthExceeded(usize),

    #[error("{0}: missing argument")]
    MissingArgument(&'static str),
}

impl EvalError {
    /// Drop the recovered value of a `Recoverable` failure, keeping its cause.
    pub fn into_cause(self) -> EvalError {
        match self {
            EvalError::Recoverable { cause, .. } => *cause,
            other => other,
        }
    }
}

/// Evaluator configuration
#[derive(Debug, Clone, Copy)]
pub struct EvalConfig {
    /// Maximum nesting of recursive evaluation calls
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig { max_depth: 302 }
    }
}

/// Evaluator for compiled expressions.
///
/// Holds no per-call state, so one evaluator can serve any number of
/// concurrent evaluations; everything that varies between calls lives in the
/// [`EvalContext`].
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Evaluator { config }
    }

    /// Evaluate an expression.
    ///
    /// Sentinels are ordinary results here; only genuine failures come back
    /// as `Err`.
    pub fn eval(&self, expr: &Expr, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        let mut ctx = ctx;
        ctx.depth += 1;
        if ctx.depth > self.config.max_depth {
            return Err(EvalError::DepthExceeded(self.config.max_depth));
        }
        self.eval_impl(expr, ctx)
    }

    /// Evaluate a sub-expression whose value is consumed by the caller. A
    /// recovered value stands only for the expression that produced it, so
    /// it is reduced to its cause here.
    pub(crate) fn eval_operand(
        &self,
        expr: &Expr,
        ctx: EvalContext<'_>,
    ) -> Result<Value, EvalError> {
        self.eval(expr, ctx).map_err(EvalError::into_cause)
    }

    fn eval_impl(&self, expr: &Expr, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),

            Expr::Field(path) => match ctx.scope() {
                Some(scope) => Ok(utils::lookup(scope, path)),
                None => functions::json(path, ctx),
            },

            Expr::Get { target, path } => {
                let base = self.eval_operand(target, ctx)?;
                Ok(utils::lookup(&base, path))
            }

            Expr::Meta(key) => Ok(functions::meta(key.as_deref(), ctx)),

            Expr::Function(function) => function.call(ctx),

            Expr::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    let v = self.eval_operand(item, ctx)?;
                    if !v.is_deleted() {
                        values.push(v);
                    }
                }
                Ok(Value::array(values))
            }

            Expr::Method {
                target,
                method,
                args,
            } => method.call(self, target, args, ctx),

            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, ctx),

            Expr::Not(inner) => {
                let v = self.eval_operand(inner, ctx)?;
                v.as_bool().map(|b| Value::Bool(!b)).ok_or(EvalError::Expected {
                    expected: "bool",
                    found: v.kind(),
                })
            }

            Expr::Match { subject, arms } => {
                let subject = match subject {
                    Some(subject) => self.eval_operand(subject, ctx)?,
                    None => ctx.this()?,
                };
                self.eval_match(&subject, arms, ctx)
            }
        }
    }

    fn eval_binary(
        &self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        ctx: EvalContext<'_>,
    ) -> Result<Value, EvalError> {
        let left = self.eval_operand(lhs, ctx)?;
        match (op, &left) {
            (BinaryOp::And, Value::Bool(false)) => return Ok(Value::Bool(false)),
            (BinaryOp::Or, Value::Bool(true)) => return Ok(Value::Bool(true)),
            _ => {}
        }
        let right = self.eval_operand(rhs, ctx)?;
        operators::evaluate_binary(op, &left, &right)
    }

    /// Inside the arms `this` is the subject. The first arm wins whose
    /// pattern is a wildcard, a literal equal to the subject, or a computed
    /// value that is `true` or equal to the subject.
    fn eval_match(
        &self,
        subject: &Value,
        arms: &[Arm],
        ctx: EvalContext<'_>,
    ) -> Result<Value, EvalError> {
        let inner = ctx.with_scope(subject);
        for arm in arms {
            let matched = match &arm.pattern {
                None => true,
                Some(Expr::Literal(literal)) => literal == subject,
                Some(pattern) => match self.eval_operand(pattern, inner)? {
                    Value::Bool(b) => b,
                    other => &other == subject,
                },
            };
            if matched {
                return self.eval(&arm.result, inner);
            }
        }
        trace!(kind = subject.kind(), "match: no arm matched");
        Ok(Value::Nothing)
    }

    /// Evaluate and render as text. A failure renders as its message, or as
    /// its recovered value when it has one.
    pub fn to_string(&self, expr: &Expr, ctx: EvalContext<'_>) -> String {
        match self.eval(expr, ctx) {
            Ok(v) => v.to_string(),
            Err(EvalError::Recoverable { recovered, .. }) => recovered.to_string(),
            Err(err) => err.to_string(),
        }
    }

    /// Evaluate and render as bytes, with the same failure handling as
    /// [`to_string`](Self::to_string). Byte values are returned unchanged.
    pub fn to_bytes(&self, expr: &Expr, ctx: EvalContext<'_>) -> Vec<u8> {
        match self.eval(expr, ctx) {
            Ok(Value::Bytes(b)) => b.to_vec(),
            Ok(v) => v.to_string().into_bytes(),
            Err(EvalError::Recoverable { recovered, .. }) => recovered.to_string().into_bytes(),
            Err(err) => err.to_string().into_bytes(),
        }
    }
}

impl Expr {
    /// Evaluate with a default evaluator
    pub fn exec(&self, ctx: EvalContext<'_>) -> Result<Value, EvalError> {
        Evaluator::new().eval(self, ctx)
    }

    /// Render with a default evaluator, degrading failures to text
    pub fn to_string(&self, ctx: EvalContext<'_>) -> String {
        Evaluator::new().to_string(self, ctx)
    }

    /// Render with a default evaluator, degrading failures to text
    pub fn to_bytes(&self, ctx: EvalContext<'_>) -> Vec<u8> {
        Evaluator::new().to_bytes(self, ctx)
    }
}
