//! Formula parsing and projection primitives for instrumental-variable (IV)
//! regression models.
//!
//! This crate mirrors the formula interface of the Python
//! [linearmodels](https://github.com/bashtage/linearmodels) package while
//! embracing idiomatic Rust. It offers tools to
//!
//! - split an IV model formula of the shape `dep ~ exog + [endog ~ instr]`
//!   into four validated sub-expression strings (`formula` module),
//! - hand those sub-expressions to an external term-algebra engine through a
//!   narrow trait (`evaluator` module), and
//! - project and annihilate matrices against a design matrix's column space
//!   during model fitting (`projection` module).
//!
//! Term expansion itself (factor encoding, interactions, transformations) is
//! deliberately out of scope: the parser emits strings in the engine's own
//! mini-language and validates only separator and bracket structure.
//!
//! # Quick start
//!
//! ```
//! use ivformula::{annihilate, project, FormulaParser};
//! use nalgebra::DMatrix;
//!
//! let parser = FormulaParser::new("y ~ x1 + [x2 ~ z1 + z2]").expect("well-formed formula");
//! assert_eq!(parser.components().endog(), "x2");
//! assert_eq!(parser.components().instruments(), "z1 + z2");
//!
//! // Residualize a column against a design matrix during estimation.
//! let y = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 4.0]);
//! let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 3.0]);
//! let residual = annihilate(&y, &x).expect("conformable shapes");
//! let fitted = project(&y, &x).expect("conformable shapes");
//! assert_eq!(&fitted + &residual, y);
//! ```
//!
//! Evaluating the four blocks against a tabular data source requires an
//! [`ExpressionEvaluator`] implementation; see that trait's documentation for
//! the contract.

pub mod error;
pub mod evaluator;
pub mod formula;
pub mod projection;

pub use error::{BoxedEvalError, IvError, Result};
pub use evaluator::{DesignMatrix, ExpressionEvaluator, MissingAction};
pub use formula::{EvaluatedFormula, FormulaComponents, FormulaParser, ZERO_TERMS};
pub use projection::{annihilate, project};
