//! Evaluation contexts and namespace registration.

use std::collections::HashMap;

use compact_str::CompactString;
use tracing::{debug, trace};

use crate::compiler::{CompiledExpression, compile};
use crate::error::Error;
use crate::evaluator;
use crate::model::DomNode;
use crate::object::{NodeSequence, ObjectValue, XPathObject};

/// Canonical URI bound to the reserved `xml` prefix.
pub const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix → URI bindings consulted by the evaluator when an expression uses
/// qualified names.
///
/// Only `xml` is pre-registered. Re-registering a prefix overwrites its URI;
/// the most recent registration wins. Nothing is silently defaulted: an
/// unknown prefix fails lookup, and an expression using one fails
/// evaluation.
#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    by_prefix: HashMap<CompactString, CompactString>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        let mut by_prefix = HashMap::new();
        by_prefix.insert(CompactString::from("xml"), CompactString::from(XML_NS_URI));
        Self { by_prefix }
    }
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix` to `uri`, overwriting an existing binding.
    ///
    /// # Errors
    ///
    /// [`Error::Registration`] for an empty prefix, an empty URI, or an
    /// attempt to rebind the reserved `xml` prefix to a different URI.
    pub fn register(&mut self, prefix: &str, uri: &str) -> Result<(), Error> {
        if prefix.is_empty() {
            return Err(Error::registration(prefix, "prefix must not be empty"));
        }
        if uri.is_empty() {
            return Err(Error::registration(prefix, "URI must not be empty"));
        }
        if prefix == "xml" && uri != XML_NS_URI {
            return Err(Error::registration(
                prefix,
                "the `xml` prefix is reserved and cannot be rebound",
            ));
        }
        trace!(prefix, uri, "registered namespace");
        self.by_prefix
            .insert(CompactString::from(prefix), CompactString::from(uri));
        Ok(())
    }

    /// Look up the URI bound to `prefix`.
    ///
    /// # Errors
    ///
    /// [`Error::PrefixNotFound`] when the prefix was never registered.
    pub fn lookup(&self, prefix: &str) -> Result<&str, Error> {
        self.by_prefix
            .get(prefix)
            .map(CompactString::as_str)
            .ok_or_else(|| Error::PrefixNotFound {
                prefix: prefix.to_string(),
            })
    }
}

/// Binds an optional context node and/or document, owns a
/// [`NamespaceRegistry`], and runs compiled expressions.
///
/// Contexts are single-threaded values: all operations are synchronous and
/// run to completion, and callers sharing a context across threads must
/// serialize access themselves. Disposal is `Drop`.
#[derive(Debug, Clone)]
pub struct XPathContext<N: DomNode> {
    context_node: Option<N>,
    document: Option<N>,
    namespaces: NamespaceRegistry,
}

impl<N: DomNode> Default for XPathContext<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: DomNode> XPathContext<N> {
    /// A context with no bound node and no bound document. Evaluation still
    /// succeeds: a throwaway empty document is synthesized per call.
    pub fn new() -> Self {
        Self {
            context_node: None,
            document: None,
            namespaces: NamespaceRegistry::default(),
        }
    }

    /// A context bound to `node`, which also binds the node's owning
    /// document.
    pub fn with_context_node(node: N) -> Self {
        let mut ctx = Self::new();
        ctx.set_context_node(Some(node));
        ctx
    }

    /// Rebind the context node. `None` is an explicit no-op; `Some(n)`
    /// rebinds the node and, when the node belongs to a document, the bound
    /// document as well.
    pub fn set_context_node(&mut self, node: Option<N>) {
        let Some(node) = node else { return };
        if let Some(doc) = node.owner_document() {
            self.document = Some(doc);
        }
        self.context_node = Some(node);
    }

    pub fn context_node(&self) -> Option<&N> {
        self.context_node.as_ref()
    }

    pub fn document(&self) -> Option<&N> {
        self.document.as_ref()
    }

    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    /// See [`NamespaceRegistry::register`].
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), Error> {
        self.namespaces.register(prefix, uri)
    }

    /// See [`NamespaceRegistry::lookup`].
    pub fn lookup_namespace(&self, prefix: &str) -> Result<&str, Error> {
        self.namespaces.lookup(prefix)
    }

    /// Evaluate a compiled expression against this context.
    ///
    /// The effective document is resolved in order: the context node's
    /// owning document, then the bound document, then a synthesized empty
    /// document scoped to this single call. A path matching nothing is a
    /// success with an empty node-set, never an error.
    pub fn evaluate(&self, expr: &CompiledExpression) -> Result<XPathObject<N>, Error> {
        self.eval_inner(expr, false)
    }

    /// Like [`evaluate`](Self::evaluate), but the returned object
    /// stringifies node-sets with literal (text-content) semantics.
    pub fn evaluate_for_value(&self, expr: &CompiledExpression) -> Result<XPathObject<N>, Error> {
        self.eval_inner(expr, true)
    }

    fn eval_inner(
        &self,
        expr: &CompiledExpression,
        force_literal: bool,
    ) -> Result<XPathObject<N>, Error> {
        // The fallback document lives exactly as long as this call.
        let document = self
            .context_node
            .as_ref()
            .and_then(DomNode::owner_document)
            .or_else(|| self.document.clone())
            .unwrap_or_else(N::empty_document);
        debug!(expr = expr.source(), "evaluating xpath expression");
        let value = evaluator::evaluate(
            expr.program(),
            self.context_node.as_ref(),
            &document,
            &self.namespaces,
        )?;
        Ok(XPathObject::new(value, force_literal))
    }

    /// Compile `text` and return the matched nodes. The intermediate
    /// compiled expression and result object are dropped on every path.
    pub fn find_nodes(&self, text: &str) -> Result<NodeSequence<N>, Error> {
        let expr = compile(text)?;
        self.find_nodes_expr(&expr)
    }

    /// Evaluate `expr` and return the matched nodes. A non-node-set result
    /// yields the empty sequence.
    pub fn find_nodes_expr(&self, expr: &CompiledExpression) -> Result<NodeSequence<N>, Error> {
        let object = self.evaluate(expr)?;
        Ok(object.as_node_sequence())
    }

    /// Whether `text` matches a non-empty node-set.
    ///
    /// Compile and evaluation failures collapse to `false`; existence
    /// checks do not propagate errors.
    ///
    /// # Panics
    ///
    /// When the expression produces a non-node-set result. This operation
    /// is defined only for node-set-producing expressions, and calling it
    /// with anything else is caller misuse, not a data condition.
    pub fn exists(&self, text: &str) -> bool {
        let Ok(expr) = compile(text) else {
            return false;
        };
        let Ok(object) = self.evaluate_for_value(&expr) else {
            return false;
        };
        match object.value() {
            ObjectValue::NodeSet(nodes) => !nodes.is_empty(),
            _ => panic!("exists: {}", Error::UnsupportedKind(object.kind())),
        }
    }
}
