use core::cmp::Ordering;

use compact_str::CompactString;

use crate::error::Error;

/// Node classification used by node tests and stringification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

/// Qualified name of an element, attribute, namespace or processing
/// instruction (the PI target is stored in `local`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<CompactString>,
    pub local: CompactString,
    pub ns_uri: Option<CompactString>,
}

impl QName {
    pub fn local(local: impl Into<CompactString>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            ns_uri: None,
        }
    }

    /// The lexical `prefix:local` form, or just `local` without a prefix.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.local),
            None => self.local.to_string(),
        }
    }
}

/// Capability set a document tree implementation provides to the engine.
///
/// The engine never parses or mutates nodes; it only navigates them, reads
/// their identity and asks for their owning document. [`empty_document`] is
/// the one constructive capability: the evaluation context synthesizes a
/// throwaway document from it when neither a context node nor a document is
/// bound, so evaluation never fails merely for lack of a document.
///
/// Node handles are expected to be cheap to clone (the bundled
/// [`TreeNode`](crate::tree::TreeNode) is an `Arc`), and equality must be
/// node identity, not structural equality.
///
/// [`empty_document`]: DomNode::empty_document
pub trait DomNode: Clone + Eq + core::fmt::Debug {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    /// The XPath string-value: text content for text/attribute/comment/PI
    /// nodes, concatenated descendant text for elements and documents.
    fn string_value(&self) -> String;

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;
    fn namespaces(&self) -> Vec<Self> {
        Vec::new()
    }

    /// The document node owning this node, if it is attached to one.
    /// Detached fragments return `None`.
    fn owner_document(&self) -> Option<Self>;

    /// Construct a minimal empty document.
    fn empty_document() -> Self;

    /// Document order comparison. The default uses ancestry and stable
    /// sibling order; implementations with a global order index may
    /// override it.
    fn compare_document_order(&self, other: &Self) -> Result<Ordering, Error> {
        compare_by_ancestry(self, other)
    }
}

/// Compare two nodes by ancestry and stable sibling order.
///
/// - An ancestor precedes its descendants.
/// - Among siblings, attributes come first, then namespace nodes, then
///   children; within each group the order the tree reports is preserved.
/// - Nodes from different roots have no defined order and yield an
///   evaluation error; the union and path operators only ever compare nodes
///   from the effective document of a single evaluation.
pub fn compare_by_ancestry<N: DomNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    if a == b {
        return Ok(Ordering::Equal);
    }

    fn path_from_root<N: DomNode>(mut n: N) -> Vec<N> {
        let mut path = vec![n.clone()];
        while let Some(parent) = n.parent() {
            path.push(parent.clone());
            n = parent;
        }
        path.reverse();
        path
    }

    let pa = path_from_root(a.clone());
    let pb = path_from_root(b.clone());
    let shared = core::cmp::min(pa.len(), pb.len());
    let mut i = 0usize;
    while i < shared && pa[i] == pb[i] {
        i += 1;
    }
    if i == shared {
        // One path is a prefix of the other: the shorter one is the ancestor.
        return Ok(if pa.len() < pb.len() {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }
    if i == 0 {
        return Err(Error::evaluation(
            "document order is undefined for nodes from different trees",
        ));
    }

    // Diverged below a common parent: order the two diverging siblings.
    let parent = &pa[i - 1];
    let mut siblings: Vec<N> = Vec::new();
    siblings.extend(parent.attributes());
    siblings.extend(parent.namespaces());
    siblings.extend(parent.children());
    let pos_a = siblings.iter().position(|n| n == &pa[i]);
    let pos_b = siblings.iter().position(|n| n == &pb[i]);
    Ok(match (pos_a, pos_b) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => Ordering::Equal,
    })
}
