use rstest::rstest;
use xpathlite::tree::{attr, doc, elem, elem_ns, text};
use xpathlite::{DomNode, ObjectKind, TreeNode, XPathContext, compile};

fn ctx() -> XPathContext<TreeNode> {
    let document = doc()
        .child(
            elem("library")
                .child(elem("book").attr(attr("id", "1")).child(text("Dune")))
                .child(elem("book").attr(attr("id", "2")).child(text("Emma"))),
        )
        .build();
    XPathContext::with_context_node(document)
}

fn eval_number(ctx: &XPathContext<TreeNode>, text: &str) -> f64 {
    ctx.evaluate(&compile(text).unwrap()).unwrap().as_float()
}

fn eval_bool(ctx: &XPathContext<TreeNode>, text: &str) -> bool {
    ctx.evaluate(&compile(text).unwrap()).unwrap().as_bool()
}

fn eval_string(ctx: &XPathContext<TreeNode>, text: &str) -> String {
    ctx.evaluate(&compile(text).unwrap()).unwrap().as_string()
}

#[rstest]
fn literal_arithmetic() {
    let c = ctx();
    let result = c.evaluate(&compile("1 + 2").unwrap()).unwrap();
    assert_eq!(result.kind(), ObjectKind::Number);
    assert_eq!(result.as_float(), 3.0);
}

#[rstest]
#[case("2 * 3 + 4", 10.0)]
#[case("2 + 3 * 4", 14.0)]
#[case("(2 + 3) * 4", 20.0)]
#[case("7 div 2", 3.5)]
#[case("7 mod 2", 1.0)]
#[case("-3 + 1", -2.0)]
#[case("--2", 2.0)]
#[case("5 mod -2", 1.0)]
fn arithmetic_follows_xpath_rules(#[case] expr: &str, #[case] expected: f64) {
    assert_eq!(eval_number(&ctx(), expr), expected, "{expr}");
}

#[rstest]
fn division_by_zero_is_not_an_error() {
    let c = ctx();
    assert_eq!(eval_number(&c, "1 div 0"), f64::INFINITY);
    assert_eq!(eval_number(&c, "-1 div 0"), f64::NEG_INFINITY);
    assert!(eval_number(&c, "0 div 0").is_nan());
}

#[rstest]
fn boolean_literals_and_logic() {
    let c = ctx();
    let result = c.evaluate(&compile("true()").unwrap()).unwrap();
    assert_eq!(result.kind(), ObjectKind::Boolean);
    assert!(result.as_bool());

    assert!(!eval_bool(&c, "false()"));
    assert!(eval_bool(&c, "true() or false()"));
    assert!(!eval_bool(&c, "true() and false()"));
    assert!(eval_bool(&c, "not(false())"));
}

#[rstest]
#[case("1 = 1", true)]
#[case("1 != 2", true)]
#[case("1 = '1'", true)]
// Relational operands convert to number, so '10' < '9' compares 10 < 9.
#[case("'10' < '9'", false)]
#[case("2 <= 2", true)]
#[case("3 > 2", true)]
#[case("true() = 1", true)]
#[case("false() = 0", true)]
fn scalar_comparisons(#[case] expr: &str, #[case] expected: bool) {
    assert_eq!(eval_bool(&ctx(), expr), expected, "{expr}");
}

#[rstest]
fn node_set_comparisons_are_existential() {
    let c = ctx();
    // True when any node's string-value satisfies the comparison.
    assert!(eval_bool(&c, "//book = 'Dune'"));
    assert!(!eval_bool(&c, "//book = 'Moby'"));
    assert!(eval_bool(&c, "//book/@id = 2"));
    assert!(eval_bool(&c, "//book/@id < 2"));
    // Both sides node-sets: any pair may match.
    assert!(eval_bool(&c, "//book != //book"));
    // Empty node-sets never satisfy any comparison.
    assert!(!eval_bool(&c, "//missing = //book"));
    assert!(!eval_bool(&c, "//missing != //book"));
}

#[rstest]
#[case("concat('foo', 'bar')", "foobar")]
#[case("concat('a', 'b', 'c')", "abc")]
#[case("substring('12345', 2, 3)", "234")]
#[case("substring('12345', 2)", "2345")]
#[case("substring('12345', 1.5, 2.6)", "234")]
#[case("substring('12345', 0)", "12345")]
#[case("substring-before('1999/04/01', '/')", "1999")]
#[case("substring-after('1999/04/01', '/')", "04/01")]
#[case("substring-before('abc', 'x')", "")]
#[case("normalize-space('  a   b  ')", "a b")]
#[case("translate('bar', 'abc', 'ABC')", "BAr")]
#[case("translate('--aaa--', 'abc-', 'ABC')", "AAA")]
#[case("string(12)", "12")]
#[case("string(true())", "true")]
fn string_functions(#[case] expr: &str, #[case] expected: &str) {
    assert_eq!(eval_string(&ctx(), expr), expected, "{expr}");
}

#[rstest]
#[case("starts-with('abc', 'ab')", true)]
#[case("starts-with('abc', 'bc')", false)]
#[case("contains('abcd', 'bc')", true)]
#[case("contains('abcd', 'x')", false)]
fn string_predicates(#[case] expr: &str, #[case] expected: bool) {
    assert_eq!(eval_bool(&ctx(), expr), expected, "{expr}");
}

#[rstest]
#[case("string-length('abc')", 3.0)]
#[case("string-length('')", 0.0)]
#[case("number('12')", 12.0)]
#[case("number('  -3.5  ')", -3.5)]
#[case("number(true())", 1.0)]
#[case("floor(2.6)", 2.0)]
#[case("floor(-1.5)", -2.0)]
#[case("ceiling(2.1)", 3.0)]
#[case("round(2.5)", 3.0)]
#[case("round(-2.5)", -2.0)]
#[case("round(2.4)", 2.0)]
fn numeric_functions(#[case] expr: &str, #[case] expected: f64) {
    assert_eq!(eval_number(&ctx(), expr), expected, "{expr}");
}

#[rstest]
#[case("number('abc')")]
#[case("number('')")]
#[case("number('1 2')")]
fn malformed_numbers_yield_nan(#[case] expr: &str) {
    assert!(eval_number(&ctx(), expr).is_nan(), "{expr}");
}

#[rstest]
#[case("boolean('')", false)]
#[case("boolean('x')", true)]
#[case("boolean(0)", false)]
#[case("boolean(0.0)", false)]
#[case("boolean(-1)", true)]
#[case("boolean(//book)", true)]
#[case("boolean(//missing)", false)]
fn boolean_conversion(#[case] expr: &str, #[case] expected: bool) {
    assert_eq!(eval_bool(&ctx(), expr), expected, "{expr}");
}

#[rstest]
fn count_and_sum_over_node_sets() {
    let c = ctx();
    assert_eq!(eval_number(&c, "count(//book)"), 2.0);
    assert_eq!(eval_number(&c, "count(//missing)"), 0.0);
    assert_eq!(eval_number(&c, "sum(//book/@id)"), 3.0);
    assert_eq!(eval_number(&c, "sum(//missing)"), 0.0);
}

#[rstest]
fn name_functions() {
    let c = ctx();
    assert_eq!(eval_string(&c, "name(//book[1])"), "book");
    assert_eq!(eval_string(&c, "local-name(//book[1])"), "book");
    assert_eq!(eval_string(&c, "namespace-uri(//book[1])"), "");
    // Empty argument node-set yields the empty string.
    assert_eq!(eval_string(&c, "name(//missing)"), "");
}

#[rstest]
fn name_functions_on_qualified_nodes() {
    let document = doc()
        .child(elem("root").child(elem_ns("p", "urn:test", "item")))
        .build();
    let mut c = XPathContext::with_context_node(document);
    c.register_namespace("p", "urn:test").unwrap();

    assert_eq!(eval_string(&c, "name(//p:item)"), "p:item");
    assert_eq!(eval_string(&c, "local-name(//p:item)"), "item");
    assert_eq!(eval_string(&c, "namespace-uri(//p:item)"), "urn:test");
}

#[rstest]
fn zero_argument_name_functions_use_the_context_node() {
    let c = ctx();
    let book = c.find_nodes("//book[1]").unwrap()[0].clone();
    let from_book = XPathContext::with_context_node(book);
    assert_eq!(eval_string(&from_book, "name()"), "book");
    assert_eq!(eval_string(&from_book, "local-name()"), "book");
}

#[rstest]
fn string_of_a_node_set_takes_the_first_node() {
    let c = ctx();
    assert_eq!(eval_string(&c, "string(//book)"), "Dune");
    assert_eq!(eval_string(&c, "string(//missing)"), "");
}

#[rstest]
fn filter_expressions_with_trailing_steps() {
    let c = ctx();
    let nodes = c.find_nodes("(//book)[2]").unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].string_value(), "Emma");

    let ids = c.find_nodes("(//book)[1]/@id").unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].string_value(), "1");
}

#[rstest]
fn unknown_function_fails_evaluation() {
    let c = ctx();
    assert!(c.evaluate(&compile("no-such-fn(1)").unwrap()).is_err());
}
