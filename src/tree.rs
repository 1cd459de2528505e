//! In-memory document tree implementing [`DomNode`].
//!
//! This is the bundled Document Tree Provider: an `Arc`-backed node with an
//! ergonomic builder, used by the test suite and available to embedders that
//! do not bring their own tree. There is no markup parsing here; trees are
//! constructed programmatically:
//!
//! ```
//! use xpathlite::tree::{attr, doc, elem, text};
//! use xpathlite::DomNode;
//!
//! // <root id="r"><child>hello</child></root>
//! let document = doc()
//!     .child(elem("root").attr(attr("id", "r")).child(elem("child").child(text("hello"))))
//!     .build();
//! assert_eq!(document.string_value(), "hello");
//! ```

use std::fmt;
use std::sync::{Arc, RwLock, Weak};

use crate::model::{DomNode, NodeKind, QName};

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>,
    parent: RwLock<Option<Weak<NodeData>>>,
    attributes: RwLock<Vec<TreeNode>>,
    namespaces: RwLock<Vec<TreeNode>>,
    children: RwLock<Vec<TreeNode>>,
}

/// A node handle into the in-memory tree. Cloning is an `Arc` clone and
/// equality is node identity.
#[derive(Clone)]
pub struct TreeNode(Arc<NodeData>);

impl PartialEq for TreeNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for TreeNode {}

impl std::hash::Hash for TreeNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value)
            .finish()
    }
}

impl TreeNode {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        TreeNode(Arc::new(NodeData {
            kind,
            name,
            value,
            parent: RwLock::new(None),
            attributes: RwLock::new(Vec::new()),
            namespaces: RwLock::new(Vec::new()),
            children: RwLock::new(Vec::new()),
        }))
    }

    pub fn document() -> TreeBuilder {
        TreeBuilder::new(NodeKind::Document, None, None)
    }

    pub fn element(name: &str) -> TreeBuilder {
        TreeBuilder::new(NodeKind::Element, Some(QName::local(name)), None)
    }

    /// Element with a namespace-qualified name.
    pub fn element_ns(prefix: &str, uri: &str, local: &str) -> TreeBuilder {
        let name = QName {
            prefix: Some(prefix.into()),
            local: local.into(),
            ns_uri: Some(uri.into()),
        };
        TreeBuilder::new(NodeKind::Element, Some(name), None)
    }

    pub fn attribute(name: &str, value: &str) -> TreeNode {
        TreeNode::new(
            NodeKind::Attribute,
            Some(QName::local(name)),
            Some(value.to_string()),
        )
    }

    pub fn text(value: &str) -> TreeNode {
        TreeNode::new(NodeKind::Text, None, Some(value.to_string()))
    }

    pub fn comment(value: &str) -> TreeNode {
        TreeNode::new(NodeKind::Comment, None, Some(value.to_string()))
    }

    pub fn pi(target: &str, data: &str) -> TreeNode {
        TreeNode::new(
            NodeKind::ProcessingInstruction,
            Some(QName::local(target)),
            Some(data.to_string()),
        )
    }

    pub fn namespace_node(prefix: &str, uri: &str) -> TreeNode {
        let name = QName {
            prefix: Some(prefix.into()),
            local: prefix.into(),
            ns_uri: Some(uri.into()),
        };
        TreeNode::new(NodeKind::Namespace, Some(name), Some(uri.to_string()))
    }
}

/// Builder finalizing parent links when [`build`](TreeBuilder::build) runs.
pub struct TreeBuilder {
    node: TreeNode,
    pending_children: Vec<TreeNode>,
    pending_attrs: Vec<TreeNode>,
    pending_ns: Vec<TreeNode>,
}

impl TreeBuilder {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        Self {
            node: TreeNode::new(kind, name, value),
            pending_children: Vec::new(),
            pending_attrs: Vec::new(),
            pending_ns: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<NodeOrBuilder>) -> Self {
        self.pending_children.push(child.into().into_node());
        self
    }

    pub fn attr(mut self, attr: TreeNode) -> Self {
        debug_assert!(attr.kind() == NodeKind::Attribute);
        self.pending_attrs.push(attr);
        self
    }

    pub fn namespace(mut self, ns: TreeNode) -> Self {
        debug_assert!(ns.kind() == NodeKind::Namespace);
        self.pending_ns.push(ns);
        self
    }

    pub fn build(self) -> TreeNode {
        let link = |nodes: &[TreeNode]| {
            for n in nodes {
                *n.0.parent.write().expect("tree lock poisoned") =
                    Some(Arc::downgrade(&self.node.0));
            }
        };
        link(&self.pending_attrs);
        link(&self.pending_ns);
        link(&self.pending_children);
        self.node
            .0
            .attributes
            .write()
            .expect("tree lock poisoned")
            .extend(self.pending_attrs);
        self.node
            .0
            .namespaces
            .write()
            .expect("tree lock poisoned")
            .extend(self.pending_ns);
        self.node
            .0
            .children
            .write()
            .expect("tree lock poisoned")
            .extend(self.pending_children);
        self.node
    }
}

/// Accepted by [`TreeBuilder::child`]: a finished node or a nested builder.
pub enum NodeOrBuilder {
    Built(TreeNode),
    Builder(TreeBuilder),
}

impl NodeOrBuilder {
    fn into_node(self) -> TreeNode {
        match self {
            NodeOrBuilder::Built(n) => n,
            NodeOrBuilder::Builder(b) => b.build(),
        }
    }
}

impl From<TreeNode> for NodeOrBuilder {
    fn from(n: TreeNode) -> Self {
        NodeOrBuilder::Built(n)
    }
}

impl From<TreeBuilder> for NodeOrBuilder {
    fn from(b: TreeBuilder) -> Self {
        NodeOrBuilder::Builder(b)
    }
}

// Short helpers for concise construction in tests and examples.
pub fn doc() -> TreeBuilder {
    TreeNode::document()
}
pub fn elem(name: &str) -> TreeBuilder {
    TreeNode::element(name)
}
pub fn elem_ns(prefix: &str, uri: &str, local: &str) -> TreeBuilder {
    TreeNode::element_ns(prefix, uri, local)
}
pub fn text(value: &str) -> TreeNode {
    TreeNode::text(value)
}
pub fn attr(name: &str, value: &str) -> TreeNode {
    TreeNode::attribute(name, value)
}
pub fn comment(value: &str) -> TreeNode {
    TreeNode::comment(value)
}
pub fn pi(target: &str, data: &str) -> TreeNode {
    TreeNode::pi(target, data)
}
pub fn ns(prefix: &str, uri: &str) -> TreeNode {
    TreeNode::namespace_node(prefix, uri)
}

impl DomNode for TreeNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }

    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }

    fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Text
            | NodeKind::Attribute
            | NodeKind::Comment
            | NodeKind::ProcessingInstruction
            | NodeKind::Namespace => self.0.value.clone().unwrap_or_default(),
            NodeKind::Element | NodeKind::Document => {
                fn collect(n: &TreeNode, out: &mut String) {
                    if n.kind() == NodeKind::Text {
                        if let Some(v) = &n.0.value {
                            out.push_str(v);
                        }
                    }
                    for c in n.children() {
                        collect(&c, out);
                    }
                }
                let mut out = String::new();
                collect(self, &mut out);
                out
            }
        }
    }

    fn parent(&self) -> Option<Self> {
        self.0
            .parent
            .read()
            .ok()?
            .as_ref()
            .and_then(Weak::upgrade)
            .map(TreeNode)
    }

    fn children(&self) -> Vec<Self> {
        self.0
            .children
            .read()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    fn attributes(&self) -> Vec<Self> {
        self.0
            .attributes
            .read()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    fn namespaces(&self) -> Vec<Self> {
        self.0
            .namespaces
            .read()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    fn owner_document(&self) -> Option<Self> {
        let mut current = self.clone();
        loop {
            if current.kind() == NodeKind::Document {
                return Some(current);
            }
            match current.parent() {
                Some(p) => current = p,
                None => return None,
            }
        }
    }

    fn empty_document() -> Self {
        TreeNode::document().build()
    }
}
