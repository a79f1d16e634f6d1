// Abstract Syntax Tree definitions
// Unvalidated node descriptions handed to the compiler

use serde::{Deserialize, Serialize};

/// AST Node types
///
/// This is the *description* of an expression as produced by a parser or
/// written by hand (it round-trips through serde, so descriptions can be
/// stored as JSON). Names of functions and methods are plain strings here;
/// they are resolved and validated by [`crate::compiler::compile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AstNode {
    /// String literal (e.g., "hello")
    String(String),

    /// Number literal
    Number(f64),

    /// Boolean literal
    Boolean(bool),

    /// Null literal
    Null,

    /// Field path relative to `this` (e.g., foo.bar). The empty path and
    /// `this` both refer to the current scope.
    Path(String),

    /// Field path applied to a computed value (e.g., json().foo)
    Get { target: Box<AstNode>, path: String },

    /// Array constructor
    Array(Vec<AstNode>),

    /// Function call by name (e.g., json("foo"), meta("key"), deleted())
    Function { name: String, args: Vec<AstNode> },

    /// Method call on a target (e.g., json("foo").or("fallback"))
    Method {
        target: Box<AstNode>,
        name: String,
        args: Vec<AstNode>,
    },

    /// Binary operation
    Binary {
        op: BinaryOp,
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
    },

    /// Logical NOT
    Not(Box<AstNode>),

    /// Match expression. Without a subject the arms match against `this`.
    Match {
        subject: Option<Box<AstNode>>,
        arms: Vec<MatchArm>,
    },

    /// Inline fallback `lhs | rhs`, sugar for `lhs.or(rhs)`
    Fallback { lhs: Box<AstNode>, rhs: Box<AstNode> },
}

/// One `pattern => result` arm of a match expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub result: AstNode,
}

/// Match arm patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// `_`, matches anything
    Wildcard,
    /// A boolean condition, or a value compared against the subject
    Expr(AstNode),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,

    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl MatchArm {
    /// Arm with a condition or comparison pattern
    pub fn new(pattern: AstNode, result: AstNode) -> Self {
        MatchArm {
            pattern: Pattern::Expr(pattern),
            result,
        }
    }

    /// `_ => result`
    pub fn wildcard(result: AstNode) -> Self {
        MatchArm {
            pattern: Pattern::Wildcard,
            result,
        }
    }
}

impl AstNode {
    /// Create a string literal node
    pub fn string(s: impl Into<String>) -> Self {
        AstNode::String(s.into())
    }

    /// Create a number literal node
    pub fn number(n: f64) -> Self {
        AstNode::Number(n)
    }

    /// Create a boolean literal node
    pub fn boolean(b: bool) -> Self {
        AstNode::Boolean(b)
    }

    /// Create a null literal node
    pub fn null() -> Self {
        AstNode::Null
    }

    /// `this`
    pub fn this() -> Self {
        AstNode::Path(String::new())
    }

    /// Create a relative field path node
    pub fn path(p: impl Into<String>) -> Self {
        AstNode::Path(p.into())
    }

    /// Create a function call node
    pub fn function(name: impl Into<String>, args: Vec<AstNode>) -> Self {
        AstNode::Function {
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
        AstNode::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `match this { arms }`
    pub fn match_this(arms: Vec<MatchArm>) -> Self {
        AstNode::Match {
            subject: None,
            arms,
        }
    }

    /// Chain a method call onto this node
    pub fn method(self, name: impl Into<String>, args: Vec<AstNode>) -> Self {
        AstNode::Method {
            target: Box::new(self),
            name: name.into(),
            args,
        }
    }

    /// Chain a field path onto this node
    pub fn get(self, path: impl Into<String>) -> Self {
        AstNode::Get {
            target: Box::new(self),
            path: path.into(),
        }
    }

    /// `self | fallback`
    pub fn pipe(self, fallback: AstNode) -> Self {
        AstNode::Fallback {
            lhs: Box::new(self),
            rhs: Box::new(fallback),
        }
    }

    /// True for nodes that evaluate to a constant without consulting the context
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            AstNode::String(_) | AstNode::Number(_) | AstNode::Boolean(_) | AstNode::Null
        )
    }
}
