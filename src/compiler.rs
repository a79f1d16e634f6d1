//! Expression compiler: lowers an `AstNode` description into an `Expr` tree.
//!
//! Function and method names are resolved to closed enums and every call is
//! checked against its declared signature here, so arity and literal-kind
//! mistakes surface once at build time rather than on every evaluation. The
//! resulting tree is immutable and can be shared between threads.

use thiserror::Error;
use tracing::debug;

use crate::ast::{AstNode, BinaryOp, Pattern};
use crate::functions::{Builtin, Function};
use crate::methods::Method;
use crate::signature::SignatureError;
use crate::utils::split_path;
use crate::value::Value;

/// Build-time errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("unrecognised function '{0}'")]
    UnknownFunction(String),

    #[error("unrecognised method '{0}'")]
    UnknownMethod(String),

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("expression exceeds maximum nesting depth ({0})")]
    DepthExceeded(usize),
}

/// Compiler configuration
#[derive(Debug, Clone, Copy)]
pub struct CompileConfig {
    /// Maximum nesting of the node description
    pub max_depth: usize,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig { max_depth: 302 }
    }
}

/// A validated, evaluation-ready expression
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),

    /// Path relative to the scope, or to the current part's document when no
    /// scope is bound. An empty path is `this`.
    Field(Vec<String>),

    /// Path relative to a computed value
    Get { target: Box<Expr>, path: Vec<String> },

    /// Metadata lookup on the current part; `None` reads every pair
    Meta(Option<String>),

    Function(Function),

    Array(Vec<Expr>),

    Method {
        target: Box<Expr>,
        method: Method,
        args: Vec<Expr>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },

    Not(Box<Expr>),

    Match {
        subject: Option<Box<Expr>>,
        arms: Vec<Arm>,
    },
}

/// Compiled match arm; a `None` pattern is the wildcard
#[derive(Debug, Clone)]
pub struct Arm {
    pub pattern: Option<Expr>,
    pub result: Expr,
}

impl Expr {
    /// The value of a non-negative integer literal, as accepted by `from`
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Expr::Literal(v) => v.as_i64().and_then(|i| usize::try_from(i).ok()),
            _ => None,
        }
    }
}

/// Compile a node description with the default configuration
pub fn compile(node: &AstNode) -> Result<Expr, BuildError> {
    Compiler::new(CompileConfig::default()).compile(node)
}

pub struct Compiler {
    config: CompileConfig,
    depth: usize,
}

impl Compiler {
    pub fn new(config: CompileConfig) -> Self {
        Compiler { config, depth: 0 }
    }

    pub fn compile(&mut self, node: &AstNode) -> Result<Expr, BuildError> {
        let expr = self.compile_expr(node)?;
        debug!(root = expr_kind(&expr), "compiled expression");
        Ok(expr)
    }

    fn compile_expr(&mut self, node: &AstNode) -> Result<Expr, BuildError> {
        self.depth += 1;
        if self.depth > self.config.max_depth {
            self.depth -= 1;
            return Err(BuildError::DepthExceeded(self.config.max_depth));
        }

        let result = self.compile_expr_impl(node);

        self.depth -= 1;
        result
    }

    fn compile_boxed(&mut self, node: &AstNode) -> Result<Box<Expr>, BuildError> {
        self.compile_expr(node).map(Box::new)
    }

    fn compile_all(&mut self, nodes: &[AstNode]) -> Result<Vec<Expr>, BuildError> {
        nodes.iter().map(|n| self.compile_expr(n)).collect()
    }

    fn compile_expr_impl(&mut self, node: &AstNode) -> Result<Expr, BuildError> {
        match node {
            // ── Leaves ────────────────────────────────────────────────
            AstNode::String(s) => Ok(Expr::Literal(Value::string(s.as_str()))),
            AstNode::Number(n) => Ok(Expr::Literal(Value::Number(*n))),
            AstNode::Boolean(b) => Ok(Expr::Literal(Value::Bool(*b))),
            AstNode::Null => Ok(Expr::Literal(Value::Null)),
            AstNode::Path(path) => Ok(Expr::Field(split_path(path))),

            AstNode::Get { target, path } => Ok(Expr::Get {
                target: self.compile_boxed(target)?,
                path: split_path(path),
            }),

            AstNode::Array(items) => Ok(Expr::Array(self.compile_all(items)?)),

            // ── Calls ─────────────────────────────────────────────────
            AstNode::Function { name, args } => self.compile_function(name, args),

            AstNode::Method { target, name, args } => {
                let method =
                    Method::from_name(name).ok_or_else(|| BuildError::UnknownMethod(name.clone()))?;
                method.signature().validate(name, args)?;
                Ok(Expr::Method {
                    target: self.compile_boxed(target)?,
                    method,
                    args: self.compile_all(args)?,
                })
            }

            AstNode::Fallback { lhs, rhs } => Ok(Expr::Method {
                target: self.compile_boxed(lhs)?,
                method: Method::Or,
                args: vec![self.compile_expr(rhs)?],
            }),

            // ── Operators ─────────────────────────────────────────────
            AstNode::Binary { op, lhs, rhs } => Ok(Expr::Binary {
                op: *op,
                lhs: self.compile_boxed(lhs)?,
                rhs: self.compile_boxed(rhs)?,
            }),

            AstNode::Not(inner) => Ok(Expr::Not(self.compile_boxed(inner)?)),

            AstNode::Match { subject, arms } => {
                let subject = match subject {
                    Some(s) => Some(self.compile_boxed(s)?),
                    None => None,
                };
                let arms = arms
                    .iter()
                    .map(|arm| -> Result<Arm, BuildError> {
                        let pattern = match &arm.pattern {
                            Pattern::Wildcard => None,
                            Pattern::Expr(p) => Some(self.compile_expr(p)?),
                        };
                        Ok(Arm {
                            pattern,
                            result: self.compile_expr(&arm.result)?,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Expr::Match { subject, arms })
            }
        }
    }

    fn compile_function(&mut self, name: &str, args: &[AstNode]) -> Result<Expr, BuildError> {
        let builtin =
            Builtin::from_name(name).ok_or_else(|| BuildError::UnknownFunction(name.to_string()))?;
        builtin.signature().validate(name, args)?;

        let literal = args.first().and_then(|arg| match arg {
            AstNode::String(s) => Some(s.as_str()),
            _ => None,
        });

        let expr = match builtin {
            Builtin::Json => Expr::Function(Function::Json(split_path(literal.unwrap_or("")))),
            Builtin::Meta => Expr::Meta(literal.map(str::to_string)),
            Builtin::Content => Expr::Function(Function::Content),
            Builtin::BatchIndex => Expr::Function(Function::BatchIndex),
            Builtin::BatchSize => Expr::Function(Function::BatchSize),
            Builtin::Deleted => Expr::Literal(Value::Deleted),
            Builtin::Nothing => Expr::Literal(Value::Nothing),
        };
        Ok(expr)
    }
}

fn expr_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Literal(_) => "literal",
        Expr::Field(_) => "field",
        Expr::Get { .. } => "get",
        Expr::Meta(_) => "meta",
        Expr::Function(_) => "function",
        Expr::Array(_) => "array",
        Expr::Method { method, .. } => method.name(),
        Expr::Binary { op, .. } => op.symbol(),
        Expr::Not(_) => "not",
        Expr::Match { .. } => "match",
    }
}
