// Integration tests for Compiler + Evaluator
//
// These tests build expressions from node descriptions, compile them and
// render them against small batches, checking both the text and the byte
// rendering of each result.

use std::collections::HashMap;
use std::sync::Once;

use chainquery::{
    compile, AstNode, BinaryOp, EvalContext, EvalError, Expr, Maps, MatchArm, Message,
    MessagePart, Value,
};
use pretty_assertions::assert_eq;

// ── Helpers ──────────────────────────────────────────────────────────────────

static TRACING_INIT: Once = Once::new();

/// Route evaluator logs to the test output. Enable with
/// `RUST_LOG=chainquery=trace cargo test`.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        }
    });
}

fn contents(parts: &[&str]) -> Message {
    parts.iter().map(|c| MessagePart::new(*c)).collect()
}

fn metas(parts: &[&[(&str, &str)]]) -> Message {
    parts
        .iter()
        .map(|pairs| {
            pairs
                .iter()
                .fold(MessagePart::new(""), |part, (k, v)| part.with_metadata(*k, *v))
        })
        .collect()
}

fn empty() -> Message {
    contents(&[""])
}

fn json(path: &str) -> AstNode {
    AstNode::function("json", vec![AstNode::string(path)])
}

fn json_root() -> AstNode {
    AstNode::function("json", vec![])
}

fn meta(key: &str) -> AstNode {
    AstNode::function("meta", vec![AstNode::string(key)])
}

fn plus(lhs: AstNode, rhs: f64) -> AstNode {
    AstNode::binary(BinaryOp::Add, lhs, AstNode::number(rhs))
}

fn build(node: AstNode) -> Expr {
    init_tracing();
    compile(&node).unwrap()
}

/// Render at index 0 and check the text and byte forms agree with `expected`.
fn assert_renders(node: AstNode, msg: &Message, expected: &str) {
    let expr = build(node);
    let ctx = EvalContext::new(msg);
    assert_eq!(expr.to_string(ctx), expected);
    assert_eq!(String::from_utf8(expr.to_bytes(ctx)).unwrap(), expected);
}

// ── Batch methods ────────────────────────────────────────────────────────────

#[test]
fn test_literal_from() {
    let node = AstNode::number(5.0).method("from", vec![AstNode::number(0.0)]);
    assert_renders(node, &empty(), "5");
}

#[test]
fn test_from_rebinds_nested_lookups() {
    let msg = contents(&[r#"{"foo":"a"}"#, r#"{"foo":"b"}"#, r#"{"foo":"c"}"#]);
    assert_renders(
        json("foo").method("from", vec![AstNode::number(1.0)]),
        &msg,
        "b",
    );

    // the override reaches through the whole target chain
    let node = json("missing")
        .method("or", vec![json("foo")])
        .method("from", vec![AstNode::number(2.0)]);
    assert_renders(node, &msg, "c");
}

#[test]
fn test_from_out_of_range_is_nothing() {
    let msg = contents(&[r#"{"foo":"a"}"#, r#"{"foo":"b"}"#]);
    let expr = build(json("foo").method("from", vec![AstNode::number(7.0)]));
    assert_eq!(expr.exec(EvalContext::new(&msg)), Ok(Value::Nothing));

    let fallback = build(
        json("foo")
            .method("from", vec![AstNode::number(7.0)])
            .method("or", vec![AstNode::string("none")]),
    );
    assert_eq!(fallback.to_string(EvalContext::new(&msg)), "none");
}

#[test]
fn test_json_from_all() {
    let msg = contents(&[r#"{"foo":"a"}"#, r#"{"foo":"b"}"#, r#"{"foo":"c"}"#]);
    assert_renders(json("foo").method("from_all", vec![]), &msg, r#"["a","b","c"]"#);
}

#[test]
fn test_json_from_all_with_gaps() {
    let msg = contents(&[r#"{"foo":"a"}"#, "{}", r#"{"foo":"c"}"#, "not even json"]);
    assert_renders(
        json("foo").method("from_all", vec![]),
        &msg,
        r#"["a",null,"c",null]"#,
    );
}

#[test]
fn test_json_from_all_with_fallbacks() {
    let msg = contents(&[r#"{"foo":"a"}"#, "{}", r#"{"foo":"c"}"#, "not even json"]);
    let expected = r#"["a","fallback","c","fallback"]"#;

    // json("foo").or("fallback").from_all()
    assert_renders(
        json("foo")
            .method("or", vec![AstNode::string("fallback")])
            .method("from_all", vec![]),
        &msg,
        expected,
    );

    // (json().foo | "fallback").from_all()
    assert_renders(
        json_root()
            .get("foo")
            .pipe(AstNode::string("fallback"))
            .method("from_all", vec![]),
        &msg,
        expected,
    );

    // json().foo.or("fallback").from_all()
    assert_renders(
        json_root()
            .get("foo")
            .method("or", vec![AstNode::string("fallback")])
            .method("from_all", vec![]),
        &msg,
        expected,
    );
}

#[test]
fn test_from_all_does_not_rebind_index_for_caller() {
    let msg = contents(&[r#"{"foo":1}"#, r#"{"foo":2}"#, r#"{"foo":3}"#]);
    let node = AstNode::Array(vec![
        json("foo").method("from_all", vec![]),
        AstNode::function("batch_index", vec![]),
        json("foo"),
    ]);
    let expr = build(node);
    let ctx = EvalContext::new(&msg).with_index(1);
    assert_eq!(expr.to_string(ctx), "[[1,2,3],1,2]");
}

#[test]
fn test_meta_from_all() {
    let msg = metas(&[&[("foo", "bar")], &[], &[("foo", "baz")]]);
    assert_renders(
        meta("foo").method("from_all", vec![]),
        &msg,
        r#"["bar",null,"baz"]"#,
    );
}

#[test]
fn test_from_all_length_matches_batch() {
    let msg = contents(&["a", "b", "c", "d", "e"]);
    let expr = build(json("foo").method("from_all", vec![]).method("length", vec![]));
    assert_eq!(expr.exec(EvalContext::new(&msg)), Ok(Value::from(5)));
}

// ── Recovery ─────────────────────────────────────────────────────────────────

#[test]
fn test_sentinels_take_or_fallback() {
    for name in ["deleted", "nothing"] {
        assert_renders(
            AstNode::function(name, vec![]).method("or", vec![AstNode::string("fallback")]),
            &empty(),
            "fallback",
        );
    }
}

#[test]
fn test_catch() {
    let node = || json_root().method("catch", vec![AstNode::string("nope")]);
    assert_renders(node(), &contents(&["this %$#% isnt json"]), "nope");
    assert_renders(node(), &contents(&["null"]), "null");

    let node = || json("foo").method("catch", vec![AstNode::string("nope")]);
    assert_renders(node(), &contents(&[r#"{"foo":null}"#]), "null");
    assert_renders(node(), &contents(&[r#"{"foo":"yep"}"#]), "yep");
}

#[test]
fn test_catch_passes_sentinels_through() {
    for (name, sentinel) in [("deleted", Value::Deleted), ("nothing", Value::Nothing)] {
        let expr = build(
            AstNode::function(name, vec![]).method("catch", vec![AstNode::string("nope")]),
        );
        assert_eq!(expr.exec(EvalContext::new(&empty())), Ok(sentinel));
    }

    let expr = build(json("missing").method("catch", vec![AstNode::string("nope")]));
    let msg = contents(&["{}"]);
    assert_eq!(expr.exec(EvalContext::new(&msg)), Ok(Value::Nothing));
}

#[test]
fn test_catch_recovers_coercion_failure() {
    assert_renders(
        AstNode::string("not a number")
            .method("number", vec![])
            .method("catch", vec![AstNode::number(0.0)]),
        &empty(),
        "0",
    );
    assert_renders(
        json("foo")
            .method("number", vec![])
            .method("catch", vec![AstNode::string("nope")]),
        &contents(&[r#"{"foo":"12.5"}"#]),
        "12.5",
    );
}

#[test]
fn test_or() {
    let node = || json("foo").method("or", vec![AstNode::string("backup")]);
    assert_renders(node(), &contents(&[r#"{"foo":null}"#]), "backup");
    assert_renders(node(), &contents(&[r#"{"bar":"nope"}"#]), "backup");

    assert_renders(
        json("foo").method("or", vec![json("bar")]),
        &contents(&[r#"{"bar":"yep"}"#]),
        "yep",
    );
}

#[test]
fn test_or_boolean_from_all() {
    let msg = contents(&[
        r#"{"foo":"from foo"}"#,
        r#"{"bar":"yep"}"#,
        r#"{"bar":"nope"}"#,
        r#"{"foo":"from foo 2","bar":"yep"}"#,
    ]);
    let node = json("foo")
        .method(
            "or",
            vec![AstNode::binary(
                BinaryOp::Equal,
                json("bar"),
                AstNode::string("yep"),
            )],
        )
        .method("from_all", vec![]);
    assert_renders(node, &msg, r#"["from foo",true,false,"from foo 2"]"#);
}

#[test]
fn test_or_boolean_from_metadata() {
    let msg = metas(&[
        &[("foo", "from foo")],
        &[("bar", "yep")],
        &[("bar", "nope")],
        &[("foo", "from foo 2"), ("bar", "yep")],
    ]);
    let node = meta("foo")
        .method(
            "or",
            vec![AstNode::binary(
                BinaryOp::Equal,
                meta("bar"),
                AstNode::string("yep"),
            )],
        )
        .method("from_all", vec![]);
    assert_renders(node, &msg, r#"["from foo",true,false,"from foo 2"]"#);
}

// ── Array methods ────────────────────────────────────────────────────────────

#[test]
fn test_for_each() {
    assert_renders(
        json("foo").method("for_each", vec![plus(AstNode::this(), 10.0)]),
        &contents(&[r#"{"foo":[1,2,2]}"#]),
        "[11,12,12]",
    );
}

#[test]
fn test_for_each_inner_fallback() {
    let mapping = plus(AstNode::path("this.bar"), 10.0).pipe(AstNode::string("woops"));
    assert_renders(
        json("foo").method("for_each", vec![mapping]),
        &contents(&[r#"{"foo":[{"bar":1},2,{"bar":2}]}"#]),
        r#"[11,"woops",12]"#,
    );
}

#[test]
fn test_for_each_some_errors() {
    let msg = contents(&[r#"{"foo":[1,2,"nope",2]}"#]);

    let caught = plus(AstNode::this(), 10.0).pipe(AstNode::string("failed"));
    assert_renders(
        json("foo").method("for_each", vec![caught]),
        &msg,
        r#"[11,12,"failed",12]"#,
    );

    // uncaught: the recovered value treats the bad element as zero
    assert_renders(
        json("foo").method("for_each", vec![plus(AstNode::this(), 10.0)]),
        &msg,
        "[11,12,10,12]",
    );
}

#[test]
fn test_for_each_recovered_value_stops_at_its_expression() {
    let msg = contents(&[r#"{"foo":[1,"nope"]}"#]);

    // string() consumes the failed sum, so the failure is no longer recoverable
    let mapping = plus(AstNode::this(), 10.0).method("string", vec![]);
    let expr = build(json("foo").method("for_each", vec![mapping]));
    assert_eq!(
        expr.exec(EvalContext::new(&msg)),
        Err(EvalError::Expected {
            expected: "number",
            found: "string",
        })
    );
    assert_eq!(
        expr.to_string(EvalContext::new(&msg)),
        "expected number value, found string"
    );

    let caught = plus(AstNode::this(), 10.0)
        .method("string", vec![])
        .pipe(AstNode::string("failed"));
    assert_renders(
        json("foo").method("for_each", vec![caught]),
        &msg,
        r#"["11","failed"]"#,
    );
}

#[test]
fn test_for_each_delete_some_elements() {
    let mapping = AstNode::match_this(vec![
        MatchArm::new(
            AstNode::binary(BinaryOp::LessThan, AstNode::this(), AstNode::number(10.0)),
            AstNode::function("deleted", vec![]),
        ),
        MatchArm::wildcard(AstNode::binary(
            BinaryOp::Subtract,
            AstNode::this(),
            AstNode::number(10.0),
        )),
    ]);
    assert_renders(
        json("foo").method("for_each", vec![mapping]),
        &contents(&[r#"{"foo":[11,12,7,13]}"#]),
        "[1,2,3]",
    );
}

#[test]
fn test_for_each_delete_all_elements() {
    assert_renders(
        json("foo").method("for_each", vec![AstNode::function("deleted", vec![])]),
        &contents(&[r#"{"foo":[11,12,7,13]}"#]),
        "[]",
    );
}

#[test]
fn test_for_each_not_an_array() {
    let node = || json("foo").method("for_each", vec![plus(AstNode::this(), 10.0)]);
    assert_renders(node(), &contents(&[r#"{"foo":"not an array"}"#]), "not an array");

    let expr = build(node());
    let msg = contents(&[r#"{"foo":"not an array"}"#]);
    assert_eq!(expr.exec(EvalContext::new(&msg)), Err(EvalError::NotAnArray));
}

#[test]
fn test_sum() {
    let node = || json("foo").method("sum", vec![]);
    assert_renders(node(), &contents(&[r#"{"foo":[1,2,2]}"#]), "5");
    assert_renders(node(), &contents(&[r#"{"foo":[1,2,2,"nah",3]}"#]), "8");
    assert_renders(node(), &contents(&[r#"{"foo":[1,2,2,"4",3]}"#]), "12");
}

#[test]
fn test_sum_from_all() {
    let node = || json("foo").method("from_all", vec![]).method("sum", vec![]);
    assert_renders(
        node(),
        &contents(&[r#"{"foo":1}"#, r#"{"foo":3}"#, r#"{"foo":4}"#, r#"{"foo":8}"#]),
        "16",
    );
    assert_renders(
        node(),
        &contents(&[
            r#"{"foo":1}"#,
            r#"{"foo":"3"}"#,
            r#"{"foo":"nope"}"#,
            r#"{"foo":4}"#,
            r#"{"foo":8}"#,
        ]),
        "16",
    );
}

// ── Object methods ───────────────────────────────────────────────────────────

#[test]
fn test_map() {
    assert_renders(
        json("foo").method("map", vec![AstNode::path("bar")]),
        &contents(&[r#"{"foo":{"bar":"yep"}}"#]),
        "yep",
    );
    assert_renders(
        json("foo").method("map", vec![plus(AstNode::path("bar"), 10.0)]),
        &contents(&[r#"{"foo":{"bar":"3"}}"#]),
        "13",
    );
    assert_renders(
        json("foo").method("map", vec![AstNode::string("static")]),
        &contents(&[r#"{"foo":{"bar":"3"}}"#]),
        "static",
    );
}

// ── Coercion ─────────────────────────────────────────────────────────────────

#[test]
fn test_string_and_number_methods() {
    assert_renders(
        AstNode::binary(
            BinaryOp::Equal,
            AstNode::number(5.0).method("string", vec![]),
            AstNode::string("5"),
        ),
        &empty(),
        "true",
    );
    assert_renders(
        AstNode::binary(
            BinaryOp::Equal,
            AstNode::string("5").method("number", vec![]),
            AstNode::number(5.0),
        ),
        &empty(),
        "true",
    );
}

#[test]
fn test_number_method_error() {
    let expr = build(AstNode::string("not a number").method("number", vec![]));
    let err = expr.exec(EvalContext::new(&empty())).unwrap_err();
    assert_eq!(
        err.to_string(),
        r#"parsing "not a number": invalid float literal"#
    );
}

// ── Named maps ───────────────────────────────────────────────────────────────

fn registry(entries: &[(&str, AstNode)]) -> Maps {
    entries
        .iter()
        .map(|(name, node)| (name.to_string(), build(node.clone())))
        .collect()
}

#[test]
fn test_apply_without_maps() {
    let expr = build(AstNode::string("foo").method("apply", vec![AstNode::string("nope")]));
    let msg = empty();

    let err = expr.exec(EvalContext::new(&msg)).unwrap_err();
    assert_eq!(err.to_string(), "no maps were found");

    let maps: Maps = HashMap::new();
    let err = expr
        .exec(EvalContext::new(&msg).with_maps(&maps))
        .unwrap_err();
    assert_eq!(err.to_string(), "no maps were found");
}

#[test]
fn test_apply_map_not_found() {
    let expr = build(AstNode::string("foo").method("apply", vec![AstNode::string("nope")]));
    let msg = empty();
    let maps = registry(&[("foo", AstNode::string("hello world"))]);

    let err = expr
        .exec(EvalContext::new(&msg).with_maps(&maps))
        .unwrap_err();
    assert_eq!(err, EvalError::MapNotFound("nope".to_string()));
    assert_eq!(err.to_string(), "map nope was not found");
}

#[test]
fn test_apply_static_map() {
    let expr = build(AstNode::string("foo").method("apply", vec![AstNode::string("foo")]));
    let msg = empty();
    let maps = registry(&[("foo", AstNode::string("hello world"))]);

    assert_eq!(
        expr.exec(EvalContext::new(&msg).with_maps(&maps)),
        Ok(Value::from("hello world"))
    );
}

#[test]
fn test_apply_binds_this_to_target() {
    let expr = build(json_root().method("apply", vec![AstNode::string("foo")]));
    let msg = contents(&[r#"{"foo":"this value"}"#]);
    let maps = registry(&[("foo", AstNode::path("foo"))]);

    assert_eq!(
        expr.exec(EvalContext::new(&msg).with_maps(&maps)),
        Ok(Value::from("this value"))
    );
}

#[test]
fn test_apply_dynamic_name() {
    let expr = build(json_root().method("apply", vec![meta("dyn_map")]));
    let maps = registry(&[("foo", AstNode::path("foo")), ("bar", AstNode::path("bar"))]);
    let content = r#"{"foo":"this value","bar":"and this value"}"#;

    for (dyn_map, expected) in [("foo", "this value"), ("bar", "and this value")] {
        let msg: Message = vec![MessagePart::new(content).with_metadata("dyn_map", dyn_map)].into();
        assert_eq!(
            expr.exec(EvalContext::new(&msg).with_maps(&maps)),
            Ok(Value::from(expected))
        );
    }
}

// ── Descriptions ─────────────────────────────────────────────────────────────

#[test]
fn test_compile_serialized_description() {
    let description = r#"{
        "Method": {
            "target": {
                "Method": {
                    "target": {"Function": {"name": "json", "args": [{"String": "foo"}]}},
                    "name": "or",
                    "args": [{"String": "fallback"}]
                }
            },
            "name": "from_all",
            "args": []
        }
    }"#;
    let node: AstNode = serde_json::from_str(description).unwrap();
    let msg = contents(&[r#"{"foo":"a"}"#, "{}"]);
    assert_renders(node, &msg, r#"["a","fallback"]"#);
}

#[test]
fn test_compiled_expression_is_reusable() {
    let expr = build(json("foo").method("or", vec![AstNode::string("none")]));
    let first = contents(&[r#"{"foo":"one"}"#]);
    let second = contents(&["{}"]);

    assert_eq!(expr.to_string(EvalContext::new(&first)), "one");
    assert_eq!(expr.to_string(EvalContext::new(&second)), "none");
    assert_eq!(expr.to_string(EvalContext::new(&first)), "one");
}
