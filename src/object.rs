//! Typed result objects produced by evaluation.

use core::fmt;

use smallvec::SmallVec;

use crate::evaluator;
use crate::model::{DomNode, NodeKind};

/// Ordered sequence of node handles in document order. Extracted sequences
/// own their handles, so they stay valid after the producing
/// [`XPathObject`] is dropped.
pub type NodeSequence<N> = SmallVec<[N; 4]>;

/// Result kind tag. The kind of an object never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Undefined,
    NodeSet,
    Boolean,
    Number,
    String,
    Point,
    Range,
    LocationSet,
    External,
    AuxTree,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ObjectKind::Undefined => "undefined",
            ObjectKind::NodeSet => "node-set",
            ObjectKind::Boolean => "boolean",
            ObjectKind::Number => "number",
            ObjectKind::String => "string",
            ObjectKind::Point => "point",
            ObjectKind::Range => "range",
            ObjectKind::LocationSet => "location-set",
            ObjectKind::External => "external",
            ObjectKind::AuxTree => "aux-tree",
        };
        f.write_str(s)
    }
}

/// Tagged payload of a result object, one variant per [`ObjectKind`].
///
/// The built-in evaluator only produces the first four data-carrying kinds;
/// the remaining variants exist so foreign evaluators can round-trip their
/// result kinds through this object model with safe disposal.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectValue<N> {
    Undefined,
    NodeSet(NodeSequence<N>),
    Boolean(bool),
    Number(f64),
    String(String),
    Point,
    Range,
    LocationSet,
    External,
    AuxTree,
}

/// The result of evaluating a compiled expression.
///
/// `force_literal` selects the stringification policy for node-set results
/// only (see [`as_string`](XPathObject::as_string)); it never changes the
/// stored data. Disposal is `Drop`.
#[derive(Debug, Clone)]
pub struct XPathObject<N> {
    value: ObjectValue<N>,
    force_literal: bool,
}

impl<N: DomNode> XPathObject<N> {
    pub fn new(value: ObjectValue<N>, force_literal: bool) -> Self {
        Self {
            value,
            force_literal,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match &self.value {
            ObjectValue::Undefined => ObjectKind::Undefined,
            ObjectValue::NodeSet(_) => ObjectKind::NodeSet,
            ObjectValue::Boolean(_) => ObjectKind::Boolean,
            ObjectValue::Number(_) => ObjectKind::Number,
            ObjectValue::String(_) => ObjectKind::String,
            ObjectValue::Point => ObjectKind::Point,
            ObjectValue::Range => ObjectKind::Range,
            ObjectValue::LocationSet => ObjectKind::LocationSet,
            ObjectValue::External => ObjectKind::External,
            ObjectValue::AuxTree => ObjectKind::AuxTree,
        }
    }

    /// The tagged payload, for exhaustive matching.
    pub fn value(&self) -> &ObjectValue<N> {
        &self.value
    }

    /// Whether node-set stringification uses literal (text-content)
    /// semantics.
    pub fn force_literal(&self) -> bool {
        self.force_literal
    }

    /// The numeric value. Defined for `Number` results; any other kind
    /// yields `f64::NAN`.
    pub fn as_float(&self) -> f64 {
        match &self.value {
            ObjectValue::Number(n) => *n,
            _ => f64::NAN,
        }
    }

    /// The boolean value. Defined for `Boolean` results; any other kind
    /// yields `false`.
    pub fn as_bool(&self) -> bool {
        match &self.value {
            ObjectValue::Boolean(b) => *b,
            _ => false,
        }
    }

    /// The node sequence of a `NodeSet` result. Any other kind, and a
    /// node-set with zero members, both yield the empty sequence; there is
    /// no null-vs-empty distinction. Handles are cloned out of the object.
    pub fn as_node_sequence(&self) -> NodeSequence<N> {
        match &self.value {
            ObjectValue::NodeSet(nodes) => nodes.clone(),
            _ => NodeSequence::new(),
        }
    }

    /// Kind-aware stringification.
    ///
    /// - `NodeSet` with `force_literal`: concatenated text content
    ///   (string-value) of every node, in document order, no separator.
    /// - `NodeSet` without `force_literal`: a structural description of the
    ///   matched nodes (`<name>`, `@name`, `text()`, ...) answering "what
    ///   matched" rather than "the matched text".
    /// - Scalars: canonical conversions (XPath number formatting, `true` /
    ///   `false`, the string itself). Undefined and the opaque kinds yield
    ///   the empty string.
    pub fn as_string(&self) -> String {
        match &self.value {
            ObjectValue::NodeSet(nodes) => {
                if self.force_literal {
                    nodes.iter().map(DomNode::string_value).collect()
                } else {
                    nodes.iter().map(describe_node).collect()
                }
            }
            ObjectValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            ObjectValue::Number(n) => evaluator::format_number(*n),
            ObjectValue::String(s) => s.clone(),
            _ => String::new(),
        }
    }
}

/// Structural one-token description of a node, used by the non-literal
/// node-set stringification policy.
fn describe_node<N: DomNode>(node: &N) -> String {
    match node.kind() {
        NodeKind::Document => "/".to_string(),
        NodeKind::Element => {
            let name = node.name().map(|q| q.qualified()).unwrap_or_default();
            format!("<{name}>")
        }
        NodeKind::Attribute => {
            let name = node.name().map(|q| q.qualified()).unwrap_or_default();
            format!("@{name}")
        }
        NodeKind::Text => "text()".to_string(),
        NodeKind::Comment => "comment()".to_string(),
        NodeKind::ProcessingInstruction => {
            let target = node.name().map(|q| q.local.to_string()).unwrap_or_default();
            format!("processing-instruction({target})")
        }
        NodeKind::Namespace => {
            let prefix = node
                .name()
                .and_then(|q| q.prefix.map(|p| p.to_string()))
                .unwrap_or_default();
            format!("namespace::{prefix}")
        }
    }
}
