use rstest::rstest;
use xpathlite::tree::{attr, comment, doc, elem, elem_ns, ns, pi, text};
use xpathlite::{DomNode, Error, NodeKind, ObjectKind, TreeNode, XPathContext};

/// <library>
///   <book id="1"><title>Dune</title><author>Herbert</author></book>
///   <book id="2"><title>Emma</title><author>Austen</author></book>
///   <!--catalog--><?gen v1?>
/// </library>
fn library() -> TreeNode {
    doc()
        .child(
            elem("library")
                .child(
                    elem("book")
                        .attr(attr("id", "1"))
                        .child(elem("title").child(text("Dune")))
                        .child(elem("author").child(text("Herbert"))),
                )
                .child(
                    elem("book")
                        .attr(attr("id", "2"))
                        .child(elem("title").child(text("Emma")))
                        .child(elem("author").child(text("Austen"))),
                )
                .child(comment("catalog"))
                .child(pi("gen", "v1")),
        )
        .build()
}

fn ctx() -> XPathContext<TreeNode> {
    XPathContext::with_context_node(library())
}

#[rstest]
fn descendant_search_in_document_order() {
    let nodes = ctx().find_nodes("//title").unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].string_value(), "Dune");
    assert_eq!(nodes[1].string_value(), "Emma");
}

#[rstest]
fn root_selects_the_document_node() {
    let document = library();
    let ctx = XPathContext::with_context_node(document.clone());
    let nodes = ctx.find_nodes("/").unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0], document);
}

#[rstest]
fn match_nothing_normalizes_to_an_empty_node_set() {
    let result = ctx().evaluate(&xpathlite::compile("/nonexistent").unwrap()).unwrap();
    assert_eq!(result.kind(), ObjectKind::NodeSet);
    assert!(result.as_node_sequence().is_empty());
    assert!(!ctx().exists("/nonexistent"));
}

#[rstest]
#[case("//book[1]/title", "Dune")]
#[case("//book[2]/title", "Emma")]
#[case("//book[position() = 2]/title", "Emma")]
#[case("//book[last()]/title", "Emma")]
#[case("//book[@id = '2']/title", "Emma")]
#[case("//book[author = 'Herbert']/title", "Dune")]
fn predicates_select_by_position_and_value(#[case] path: &str, #[case] expected: &str) {
    let nodes = ctx().find_nodes(path).unwrap();
    assert_eq!(nodes.len(), 1, "{path}");
    assert_eq!(nodes[0].string_value(), expected, "{path}");
}

#[rstest]
fn attribute_axis() {
    let nodes = ctx().find_nodes("//book/@id").unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().all(|n| n.kind() == NodeKind::Attribute));
    assert_eq!(nodes[0].string_value(), "1");
    assert_eq!(nodes[1].string_value(), "2");
}

#[rstest]
fn parent_and_ancestor_axes() {
    let c = ctx();
    let parents = c.find_nodes("//title/..").unwrap();
    assert_eq!(parents.len(), 2);
    assert!(parents.iter().all(|n| n.name().unwrap().local == "book"));

    let libs = c.find_nodes("//title/ancestor::library").unwrap();
    assert_eq!(libs.len(), 1);
}

#[rstest]
fn sibling_axes() {
    let c = ctx();
    let after = c.find_nodes("//book[1]/following-sibling::book").unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].string_value(), "EmmaAusten");

    let before = c.find_nodes("//book[2]/preceding-sibling::*[1]").unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].string_value(), "DuneHerbert");
}

#[rstest]
fn preceding_axis_excludes_ancestors() {
    let titles = ctx().find_nodes("//book[2]/preceding::title").unwrap();
    assert_eq!(titles.len(), 1);
    assert_eq!(titles[0].string_value(), "Dune");
}

#[rstest]
fn following_axis_excludes_descendants() {
    let nodes = ctx().find_nodes("//book[1]/following::*").unwrap();
    // book2 and its two children; the comment and PI are not elements.
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].name().unwrap().local, "book");
}

#[rstest]
fn reverse_axis_positions_count_from_the_context_node() {
    let c = ctx();
    let title = c.find_nodes("//title").unwrap()[0].clone();
    let from_title = XPathContext::with_context_node(title.clone());

    let nearest = from_title.find_nodes("ancestor::*[1]").unwrap();
    assert_eq!(nearest.len(), 1);
    assert_eq!(nearest[0].name().unwrap().local, "book");

    let this = from_title.find_nodes("ancestor-or-self::*[1]").unwrap();
    assert_eq!(this[0], title);
}

#[rstest]
fn union_merges_in_document_order() {
    let nodes = ctx().find_nodes("//author | //title").unwrap();
    assert_eq!(nodes.len(), 4);
    let names: Vec<String> = nodes
        .iter()
        .map(|n| n.name().unwrap().local.to_string())
        .collect();
    assert_eq!(names, ["title", "author", "title", "author"]);
}

#[rstest]
fn union_deduplicates() {
    let nodes = ctx().find_nodes("//title | //book/title").unwrap();
    assert_eq!(nodes.len(), 2);
}

#[rstest]
fn kind_tests() {
    let c = ctx();
    assert_eq!(c.find_nodes("//text()").unwrap().len(), 4);
    assert_eq!(c.find_nodes("//comment()").unwrap().len(), 1);
    assert_eq!(c.find_nodes("//processing-instruction()").unwrap().len(), 1);
    assert_eq!(
        c.find_nodes("//processing-instruction('gen')").unwrap().len(),
        1
    );
    assert!(c.find_nodes("//processing-instruction('other')").unwrap().is_empty());
}

#[rstest]
fn self_and_dot_abbreviations() {
    let c = ctx();
    let document = library();
    assert_eq!(c.find_nodes(".").unwrap().len(), 1);
    let selfed = XPathContext::with_context_node(document)
        .find_nodes("self::node()")
        .unwrap();
    assert_eq!(selfed.len(), 1);
}

#[rstest]
fn numeric_predicate_applies_per_context_node() {
    // //author[1] selects the first author of each book, not the first
    // author overall.
    let nodes = ctx().find_nodes("//author[1]").unwrap();
    assert_eq!(nodes.len(), 2);
}

#[rstest]
fn namespace_qualified_name_tests_resolve_through_the_registry() {
    let document = doc()
        .child(
            elem("root")
                .child(elem_ns("x", "urn:test", "item").child(text("ns")))
                .child(elem("item").child(text("plain"))),
        )
        .build();
    let mut ctx = XPathContext::with_context_node(document);
    ctx.register_namespace("p", "urn:test").unwrap();

    let qualified = ctx.find_nodes("//p:item").unwrap();
    assert_eq!(qualified.len(), 1);
    assert_eq!(qualified[0].string_value(), "ns");

    let wildcard = ctx.find_nodes("//p:*").unwrap();
    assert_eq!(wildcard.len(), 1);

    // An unprefixed name test selects the null namespace only.
    let plain = ctx.find_nodes("//item").unwrap();
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].string_value(), "plain");
}

#[rstest]
fn unbound_prefix_in_expression_fails_evaluation() {
    let err = ctx().find_nodes("//undef:item").unwrap_err();
    assert!(matches!(err, Error::Evaluation(_)));
}

#[rstest]
fn namespace_axis() {
    let document = doc()
        .child(elem("root").namespace(ns("p", "urn:one")))
        .build();
    let ctx = XPathContext::with_context_node(document);
    let nodes = ctx.find_nodes("//namespace::*").unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind(), NodeKind::Namespace);
    assert_eq!(nodes[0].string_value(), "urn:one");
}

#[rstest]
fn find_nodes_on_non_node_set_results_is_empty() {
    let nodes = ctx().find_nodes("count(//book)").unwrap();
    assert!(nodes.is_empty());
}
