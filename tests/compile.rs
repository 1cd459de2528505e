use rstest::rstest;
use xpathlite::tree::{doc, elem, text};
use xpathlite::{Error, XPathContext, compile};

#[rstest]
fn retains_source_text() {
    let expr = compile("//b[1]").unwrap();
    assert_eq!(expr.source(), "//b[1]");
    assert_eq!(expr.to_string(), "//b[1]");
}

#[rstest]
fn compiling_twice_yields_independent_expressions() {
    let document = doc().child(elem("a").child(elem("b").child(text("x")))).build();
    let ctx = XPathContext::with_context_node(document);

    let first = compile("//b").unwrap();
    let second = compile("//b").unwrap();
    drop(first);

    // The surviving expression still evaluates after its twin is released.
    let nodes = ctx.find_nodes_expr(&second).unwrap();
    assert_eq!(nodes.len(), 1);
}

#[rstest]
fn compiled_expression_is_reusable_across_contexts() {
    let expr = compile("count(//b)").unwrap();

    let one = doc().child(elem("a").child(elem("b"))).build();
    let two = doc()
        .child(elem("a").child(elem("b")).child(elem("b")))
        .build();

    let r1 = XPathContext::with_context_node(one).evaluate(&expr).unwrap();
    let r2 = XPathContext::with_context_node(two).evaluate(&expr).unwrap();
    assert_eq!(r1.as_float(), 1.0);
    assert_eq!(r2.as_float(), 2.0);
}

#[rstest]
#[case("")]
#[case("   ")]
#[case("\t\n")]
fn empty_expression_is_rejected(#[case] text: &str) {
    assert!(matches!(compile(text), Err(Error::EmptyExpression)));
}

#[rstest]
#[case("1 +")]
#[case("//b[")]
#[case("foo(")]
#[case("a/!")]
#[case("unknown-axis::b")]
#[case("///")]
fn syntax_errors_carry_the_offending_text(#[case] text: &str) {
    match compile(text) {
        Err(Error::Compile { expr, .. }) => assert_eq!(expr, text),
        other => panic!("expected compile error, got {other:?}"),
    }
}

#[rstest]
fn variables_are_rejected() {
    let err = compile("$x + 1").unwrap_err();
    match err {
        Error::Compile { reason, .. } => assert!(reason.contains("variable")),
        other => panic!("expected compile error, got {other:?}"),
    }
}
