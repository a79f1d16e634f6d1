// Function and method signature validation
// Checked once when an expression is compiled, never during evaluation

use std::fmt;

use thiserror::Error;

use crate::ast::AstNode;

/// Signature validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignatureError {
    #[error("{name}: expected {expected} arguments, got {actual}")]
    ArgumentCountMismatch {
        name: String,
        expected: Arity,
        actual: usize,
    },

    #[error("{name}: argument {position} must be {expected}")]
    TypeMismatch {
        name: String,
        position: usize,
        expected: ParamType,
    },
}

/// Parameter type
///
/// Only literal arguments can be checked at build time; a dynamic argument
/// satisfies `Any` and `String` and is checked when evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Any,
    String,
    /// Must be written as a string literal
    StringLiteral,
    /// Must be written as a non-negative integer literal
    IndexLiteral,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Any => "any expression",
            ParamType::String => "a string",
            ParamType::StringLiteral => "a string literal",
            ParamType::IndexLiteral => "a non-negative integer literal",
        };
        f.write_str(s)
    }
}

/// Accepted argument count range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

/// Function parameter definition
#[derive(Debug, Clone)]
pub struct Parameter {
    pub param_type: ParamType,
    pub optional: bool,
}

impl Parameter {
    pub const fn required(param_type: ParamType) -> Self {
        Parameter {
            param_type,
            optional: false,
        }
    }

    pub const fn optional(param_type: ParamType) -> Self {
        Parameter {
            param_type,
            optional: true,
        }
    }
}

/// Function or method signature
#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<Parameter>,
}

impl Signature {
    /// Create a new signature
    pub fn new(params: Vec<Parameter>) -> Self {
        Signature { params }
    }

    /// Signature of something that takes no arguments
    pub fn empty() -> Self {
        Signature { params: Vec::new() }
    }

    pub fn arity(&self) -> Arity {
        Arity {
            min: self.params.iter().filter(|p| !p.optional).count(),
            max: self.params.len(),
        }
    }

    /// Validate argument count
    pub fn validate_arg_count(&self, name: &str, actual: usize) -> Result<(), SignatureError> {
        let arity = self.arity();
        if actual < arity.min || actual > arity.max {
            return Err(SignatureError::ArgumentCountMismatch {
                name: name.to_string(),
                expected: arity,
                actual,
            });
        }
        Ok(())
    }

    /// Validate argument count and the kind of every literal argument
    pub fn validate(&self, name: &str, args: &[AstNode]) -> Result<(), SignatureError> {
        self.validate_arg_count(name, args.len())?;

        for (position, (param, arg)) in self.params.iter().zip(args).enumerate() {
            if !accepts(param.param_type, arg) {
                return Err(SignatureError::TypeMismatch {
                    name: name.to_string(),
                    position,
                    expected: param.param_type,
                });
            }
        }
        Ok(())
    }
}

fn accepts(param_type: ParamType, arg: &AstNode) -> bool {
    match param_type {
        ParamType::Any => true,
        ParamType::String => !arg.is_literal() || matches!(arg, AstNode::String(_)),
        ParamType::StringLiteral => matches!(arg, AstNode::String(_)),
        ParamType::IndexLiteral => {
            matches!(arg, AstNode::Number(n) if *n >= 0.0 && n.fract() == 0.0 && n.is_finite())
        }
    }
}
