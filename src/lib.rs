//! XPath 1.0 evaluation engine.
//!
//! The crate is organized around four values:
//!
//! - [`CompiledExpression`]: an immutable, reusable compiled form of an XPath
//!   string, produced by [`compile`].
//! - [`XPathContext`]: binds an optional context node and/or document plus a
//!   [`NamespaceRegistry`], and runs compiled expressions against them.
//! - [`XPathObject`]: the tagged result of an evaluation (node-set, boolean,
//!   number, string, ...) with typed accessors and kind-aware stringification.
//! - [`model::DomNode`]: the capability trait a document tree implementation
//!   provides. The bundled [`tree`] module ships an `Arc`-backed in-memory
//!   implementation with builder helpers.
//!
//! ```
//! use xpathlite::tree::{doc, elem, text};
//! use xpathlite::{XPathContext, compile};
//!
//! let document = doc().child(elem("a").child(elem("b").child(text("hello")))).build();
//! let ctx = XPathContext::with_context_node(document);
//! let expr = compile("//b").unwrap();
//! let result = ctx.evaluate_for_value(&expr).unwrap();
//! assert_eq!(result.as_string(), "hello");
//! ```

pub mod compiler;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod object;
pub mod parser;
pub mod tree;

pub use compiler::{CompiledExpression, compile};
pub use context::{NamespaceRegistry, XML_NS_URI, XPathContext};
pub use error::Error;
pub use model::{DomNode, NodeKind, QName};
pub use object::{NodeSequence, ObjectKind, ObjectValue, XPathObject};
pub use tree::TreeNode;
