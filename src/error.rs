use crate::object::ObjectKind;

/// Errors produced by compilation, evaluation and namespace handling.
///
/// Compilation and evaluation failures propagate to the immediate caller;
/// the only place they are swallowed is [`XPathContext::exists`], which is
/// specified to collapse them into `false`.
///
/// [`XPathContext::exists`]: crate::context::XPathContext::exists
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The expression text was rejected by the grammar.
    #[error("failed to compile `{expr}`: {reason}")]
    Compile { expr: String, reason: String },
    /// An empty or whitespace-only expression was given to [`compile`].
    ///
    /// [`compile`]: crate::compiler::compile
    #[error("empty XPath expression")]
    EmptyExpression,
    /// The evaluator could not produce a result.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    /// A namespace registration was rejected.
    #[error("cannot register namespace prefix `{prefix}`: {reason}")]
    Registration { prefix: String, reason: String },
    /// A namespace prefix was looked up but never registered.
    #[error("namespace prefix `{prefix}` is not registered")]
    PrefixNotFound { prefix: String },
    /// An operation defined only for a specific result kind was invoked on a
    /// result of a different kind.
    #[error("operation not defined for {0} results")]
    UnsupportedKind(ObjectKind),
}

impl Error {
    pub(crate) fn compile(expr: &str, reason: impl Into<String>) -> Self {
        Error::Compile {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn evaluation(reason: impl Into<String>) -> Self {
        Error::Evaluation(reason.into())
    }

    pub(crate) fn registration(prefix: &str, reason: impl Into<String>) -> Self {
        Error::Registration {
            prefix: prefix.to_string(),
            reason: reason.into(),
        }
    }
}
