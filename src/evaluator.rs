//! Narrow interface to the external term-algebra evaluator.
//!
//! The parser only emits sub-expression strings; turning a string plus a
//! tabular data source into numbers is the job of a separate expression
//! engine (factor encoding, interactions, and the rest of the mini-language
//! live there). This module pins down the contract that engine must satisfy
//! so [`FormulaParser::data`](crate::FormulaParser::data) can stay agnostic
//! about where the numbers come from.

use nalgebra::DMatrix;

use crate::error::{BoxedEvalError, IvError, Result};

/// Missing-value policy forwarded to the evaluator.
///
/// This crate always requests [`MissingAction::Raise`]: rows with missing
/// values must fail evaluation. No automatic imputation or row dropping is
/// offered here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum MissingAction {
    /// Fail evaluation on any missing value in a referenced column.
    Raise,
}

/// Column-labeled numeric matrix produced by an evaluator.
#[derive(Clone, Debug, PartialEq)]
pub struct DesignMatrix {
    labels: Vec<String>,
    values: DMatrix<f64>,
}

impl DesignMatrix {
    /// Builds a design matrix, checking that every column carries a label.
    pub fn new(labels: Vec<String>, values: DMatrix<f64>) -> Result<Self> {
        if labels.len() != values.ncols() {
            return Err(IvError::dimension_mismatch(
                "design matrix labels",
                values.ncols(),
                labels.len(),
            ));
        }
        Ok(Self { labels, values })
    }

    /// Number of observations (rows).
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns produced by term expansion.
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Column labels, in column order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Read-only view of the numeric values.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    /// Consumes the design matrix, yielding the bare numeric values.
    pub fn into_values(self) -> DMatrix<f64> {
        self.values
    }
}

/// Contract an expression engine must satisfy to back formula evaluation.
///
/// `depth` identifies the lexical scope the engine should consult when a
/// sub-expression references names that are not columns of `data`. Engines
/// that resolve everything from the data source alone may ignore it.
pub trait ExpressionEvaluator {
    /// Tabular data source the engine reads columns from.
    type Source: ?Sized;

    /// Translates one validated sub-expression into a design matrix.
    ///
    /// A sub-expression that expands to no terms (for example the literal
    /// `"0"`) must yield a zero-column matrix rather than an error; the
    /// caller is responsible for mapping that to "no matrix".
    fn evaluate(
        &self,
        expression: &str,
        depth: usize,
        data: &Self::Source,
        missing: MissingAction,
    ) -> std::result::Result<DesignMatrix, BoxedEvalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn design_matrix_requires_label_per_column() {
        let values = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let result = DesignMatrix::new(vec!["x1".to_string()], values);
        assert!(matches!(result, Err(IvError::DimensionMismatch { .. })));
    }

    #[test]
    fn design_matrix_exposes_shape_and_labels() {
        let values = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        let matrix = DesignMatrix::new(vec!["x1".to_string()], values).unwrap();
        assert_eq!(matrix.nrows(), 3);
        assert_eq!(matrix.ncols(), 1);
        assert_eq!(matrix.labels(), ["x1".to_string()]);
    }
}
