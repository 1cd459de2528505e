use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::Error;
use crate::parser::{self, Expr};

/// A compiled, reusable XPath expression.
///
/// Compilation is a pure function of the expression text; no document or
/// context is involved until evaluation. The value is immutable after
/// creation: the original text is retained for diagnostics and the program
/// is shared, so cloning is cheap and clones evaluate independently.
///
/// Disposal is `Drop`. Evaluating a dropped expression is unrepresentable;
/// ownership makes use-after-release a compile-time error.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    source: String,
    program: Arc<Expr>,
}

impl CompiledExpression {
    /// The expression text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn program(&self) -> &Expr {
        &self.program
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Compile an XPath expression string.
///
/// # Errors
///
/// [`Error::EmptyExpression`] for empty or whitespace-only input,
/// [`Error::Compile`] (carrying the offending text) when the grammar
/// rejects it.
pub fn compile(text: &str) -> Result<CompiledExpression, Error> {
    if text.trim().is_empty() {
        return Err(Error::EmptyExpression);
    }
    let program = parser::parse(text).map_err(|e| Error::compile(text, e.to_string()))?;
    debug!(expr = text, "compiled xpath expression");
    Ok(CompiledExpression {
        source: text.to_string(),
        program: Arc::new(program),
    })
}
