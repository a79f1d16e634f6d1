// chainquery - evaluation core of a chainable per-message query language
// Copyright (c) 2026 chainquery contributors
// Licensed under the MIT License

//! # chainquery
//!
//! Evaluation core for a method-chain language that extracts, reshapes,
//! validates and aggregates the content and metadata of messages flowing
//! through a processing pipeline, including across a whole batch.
//!
//! An expression such as `json("foo").or("fallback").from_all()` arrives as an
//! [`AstNode`] description, is compiled once into an immutable [`Expr`] and is
//! then evaluated any number of times, each time against a fresh
//! [`EvalContext`] bound to a batch and an index.
//!
//! ## Absence and failure
//!
//! Evaluation distinguishes four outcomes that look alike but are not:
//!
//! - a failure (`Err(EvalError)`), e.g. content that is not valid JSON;
//! - `Value::Null`, a value that was found and is empty;
//! - `Value::Nothing`, no value could be located;
//! - `Value::Deleted`, the element should be removed from its container.
//!
//! `catch` recovers failures only, `or` (and the `|` fallback) recovers
//! failures and all three sentinels, and `for_each` drops `Deleted` elements.
//!
//! ## Architecture
//!
//! - `value` - Value model and canonical rendering
//! - `ast` - Unvalidated node descriptions and chain builders
//! - `signature` - Function/method signatures checked at build time
//! - `compiler` - Lowers descriptions into validated expression trees
//! - `message` - Batch and part collaborators
//! - `context` - Per-call evaluation context
//! - `evaluator` - Recursive evaluation and render entry points
//! - `operators` - Arithmetic, comparison and logical operators
//! - `functions` - Leaf functions (`json`, `meta`, `content`, ...)
//! - `methods` - Method library (`or`, `catch`, `from_all`, `for_each`, ...)
//!
//! ## Example
//!
//! ```
//! use chainquery::{compile, AstNode, EvalContext, Message, MessagePart};
//!
//! let msg: Message = vec![
//!     MessagePart::new(r#"{"foo":"a"}"#),
//!     MessagePart::new("not even json"),
//! ]
//! .into();
//!
//! let expr = compile(
//!     &AstNode::function("json", vec![AstNode::string("foo")])
//!         .method("or", vec![AstNode::string("fallback")])
//!         .method("from_all", vec![]),
//! )
//! .unwrap();
//!
//! assert_eq!(expr.to_string(EvalContext::new(&msg)), r#"["a","fallback"]"#);
//! ```

pub mod ast;
pub mod compiler;
pub mod context;
pub mod evaluator;
pub mod functions;
pub mod message;
pub mod methods;
pub mod operators;
pub mod signature;
pub mod utils;
pub mod value;

pub use ast::{AstNode, BinaryOp, MatchArm, Pattern};
pub use compiler::{compile, BuildError, CompileConfig, Compiler, Expr};
pub use context::{EvalContext, Maps};
pub use evaluator::{EvalConfig, EvalError, Evaluator};
pub use message::{Batch, Message, MessagePart, Part};
pub use methods::Method;
pub use value::Value;
