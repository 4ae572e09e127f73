use thiserror::Error;

/// Boxed error surfaced by an external [`ExpressionEvaluator`](crate::ExpressionEvaluator).
pub type BoxedEvalError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for `ivformula` operations.
#[derive(Debug, Error)]
pub enum IvError {
    /// Raised when a formula does not contain one or two `~` separators.
    #[error(
        "formula must contain a single `~`, or two with a bracketed endogenous \
         block, but {found} separators were found"
    )]
    SeparatorCount {
        /// Number of `~` separators present in the formula.
        found: usize,
    },

    /// Raised when a two-separator formula lacks the `[`/`]` block delimiters.
    #[error(
        "formula not understood: endogenous variables and instruments must be \
         segregated in a block that starts with [ and ends with ]; the formula \
         was: {formula}"
    )]
    UnsegregatedBlock {
        /// The offending formula, echoed verbatim.
        formula: String,
    },

    /// Raised when an endogenous or instrument block starts or ends with `+`.
    #[error("{block} block must not start or end with +; this block was: {content}")]
    DanglingPlus {
        /// Which bracketed block violated the rule.
        block: &'static str,
        /// The offending block content, echoed verbatim.
        content: String,
    },

    /// Raised when the external evaluator rejects a sub-expression. Echoes all
    /// four raw blocks so the failing mini-language text is visible.
    #[error(
        "conversion of the {block} formula block to a design matrix failed; \
         the blocks used for conversion were:\n\
         \x20 dependent: {dependent}\n\
         \x20 exog: {exog}\n\
         \x20 endog: {endog}\n\
         \x20 instruments: {instruments}"
    )]
    Evaluation {
        /// Name of the block whose evaluation failed.
        block: &'static str,
        /// Raw dependent sub-expression.
        dependent: String,
        /// Raw exogenous sub-expression.
        exog: String,
        /// Raw endogenous sub-expression.
        endog: String,
        /// Raw instrument sub-expression.
        instruments: String,
        /// The evaluator's own error.
        #[source]
        source: BoxedEvalError,
    },

    /// Raised when provided matrices have incompatible dimensions.
    #[error("dimension mismatch in {context}: expected {expected} but found {found}")]
    DimensionMismatch {
        /// Human-readable context describing the operation.
        context: &'static str,
        /// The required dimension.
        expected: usize,
        /// The dimension that was actually supplied.
        found: usize,
    },

    /// Raised when a linear-algebra routine reports failure.
    #[error("numerical failure during {context}")]
    Numerical { context: &'static str },
}

impl IvError {
    /// Helper to format a [`DimensionMismatch`](IvError::DimensionMismatch) error.
    pub fn dimension_mismatch(context: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            found,
        }
    }

    /// Helper for the leading/trailing `+` violation in a bracketed block.
    pub fn dangling_plus(block: &'static str, content: &str) -> Self {
        Self::DanglingPlus {
            block,
            content: content.to_string(),
        }
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, IvError>;
