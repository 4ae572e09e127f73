//! Splitting and validation of IV model formula strings.
//!
//! The general structure of a formula is `dep ~ exog + [endog ~ instr]`,
//! mirroring the formula interface of the Python `linearmodels` package.
//! Parsing only establishes the four sub-expression strings and their
//! structural legality; each string is still written in the term-algebra
//! mini-language that an [`ExpressionEvaluator`] expands later.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{IvError, Result};
use crate::evaluator::{DesignMatrix, ExpressionEvaluator, MissingAction};

/// The zero-term sentinel: "intercept suppressed, no further terms" in the
/// evaluator's mini-language.
pub const ZERO_TERMS: &str = "0";

/// Default lexical-scope depth forwarded to evaluators: two frames up from
/// the caller of the accessor that triggers evaluation.
const DEFAULT_EVAL_ENV: usize = 2;

/// The four sub-expression strings extracted from an IV formula.
///
/// Immutable once parsed. `dependent` always carries the `0 +` prefix that
/// suppresses the implicit constant term; `exog` carries it whenever an
/// endogenous block was present; `endog` and `instruments` are stored raw
/// and prefixed at evaluation time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaComponents {
    dependent: String,
    exog: String,
    endog: String,
    instruments: String,
}

impl FormulaComponents {
    /// Dependent (left-hand-side) sub-expression.
    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    /// Exogenous regressor sub-expression.
    pub fn exog(&self) -> &str {
        &self.exog
    }

    /// Endogenous regressor sub-expression.
    pub fn endog(&self) -> &str {
        &self.endog
    }

    /// Instrument sub-expression.
    pub fn instruments(&self) -> &str {
        &self.instruments
    }

    /// Looks up a sub-expression by its canonical block name.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "dependent" => Some(&self.dependent),
            "exog" => Some(&self.exog),
            "endog" => Some(&self.endog),
            "instruments" => Some(&self.instruments),
            _ => None,
        }
    }

    /// Iterates over `(block name, sub-expression)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("dependent", self.dependent.as_str()),
            ("exog", self.exog.as_str()),
            ("endog", self.endog.as_str()),
            ("instruments", self.instruments.as_str()),
        ]
        .into_iter()
    }
}

/// Parses formulas for OLS and IV model specifications.
///
/// Construction performs the full split-and-validate pass; an invalid
/// formula never yields a parser object. The recognized shapes are
/// `dep ~ exog` and `dep ~ exog [endog ~ instr] exog_rest`, where the
/// fragments before `[` and after `]` are merged into a single exogenous
/// expression.
#[derive(Clone, Debug)]
pub struct FormulaParser {
    formula: String,
    components: FormulaComponents,
    eval_env: usize,
}

impl FormulaParser {
    /// Parses `formula` with the default evaluation depth.
    pub fn new(formula: &str) -> Result<Self> {
        Self::with_eval_env(formula, DEFAULT_EVAL_ENV)
    }

    /// Parses `formula`, forwarding `eval_env` to the evaluator untouched.
    ///
    /// The depth is a pass-through configuration value for engines that
    /// resolve names against a stack of lexical scopes; the parser itself
    /// never interprets it.
    pub fn with_eval_env(formula: &str, eval_env: usize) -> Result<Self> {
        let components = parse(formula)?;
        debug!(
            "parsed formula `{}` into blocks: dependent=`{}` exog=`{}` endog=`{}` instruments=`{}`",
            formula,
            components.dependent,
            components.exog,
            components.endog,
            components.instruments,
        );
        Ok(Self {
            formula: formula.to_string(),
            components,
            eval_env,
        })
    }

    /// The original formula string.
    pub fn formula(&self) -> &str {
        &self.formula
    }

    /// Current evaluation depth.
    pub fn eval_env(&self) -> usize {
        self.eval_env
    }

    /// Overrides the evaluation depth.
    pub fn set_eval_env(&mut self, eval_env: usize) {
        self.eval_env = eval_env;
    }

    /// The raw (unevaluated) sub-expression strings.
    pub fn components(&self) -> &FormulaComponents {
        &self.components
    }

    /// Evaluates the dependent block. Always yields a matrix; a formula
    /// whose left-hand side expands to nothing is not a meaningful model
    /// and is left to the evaluator to reject.
    pub fn dependent<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
    ) -> Result<DesignMatrix> {
        self.dependent_at(evaluator, data, self.eval_env)
    }

    /// Evaluates the exogenous block, or `None` if it expands to no columns.
    pub fn exog<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
    ) -> Result<Option<DesignMatrix>> {
        self.exog_at(evaluator, data, self.eval_env)
    }

    /// Evaluates the endogenous block, or `None` if it expands to no columns.
    pub fn endog<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
    ) -> Result<Option<DesignMatrix>> {
        self.endog_at(evaluator, data, self.eval_env)
    }

    /// Evaluates the instrument block, or `None` if it expands to no columns.
    pub fn instruments<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
    ) -> Result<Option<DesignMatrix>> {
        self.instruments_at(evaluator, data, self.eval_env)
    }

    /// Evaluates all four blocks against `data`, all-or-nothing.
    ///
    /// The batched path hands the evaluator `eval_env + 1`: engines that
    /// count lexical frames relative to their call site see one extra frame
    /// here compared to the single-block accessors, and the bump keeps both
    /// paths resolving names in the same scope. Engines that ignore the
    /// depth are unaffected.
    pub fn data<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
    ) -> Result<EvaluatedFormula> {
        let depth = self.eval_env + 1;
        Ok(EvaluatedFormula {
            dependent: self.dependent_at(evaluator, data, depth)?,
            exog: self.exog_at(evaluator, data, depth)?,
            endog: self.endog_at(evaluator, data, depth)?,
            instruments: self.instruments_at(evaluator, data, depth)?,
        })
    }

    fn dependent_at<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
        depth: usize,
    ) -> Result<DesignMatrix> {
        self.evaluate_block(evaluator, data, "dependent", self.components.dependent(), depth)
    }

    fn exog_at<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
        depth: usize,
    ) -> Result<Option<DesignMatrix>> {
        self.evaluate_block(evaluator, data, "exog", self.components.exog(), depth)
            .map(empty_check)
    }

    fn endog_at<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
        depth: usize,
    ) -> Result<Option<DesignMatrix>> {
        let expression = format!("{ZERO_TERMS} + {}", self.components.endog());
        self.evaluate_block(evaluator, data, "endog", &expression, depth)
            .map(empty_check)
    }

    fn instruments_at<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
        depth: usize,
    ) -> Result<Option<DesignMatrix>> {
        let expression = format!("{ZERO_TERMS} + {}", self.components.instruments());
        self.evaluate_block(evaluator, data, "instruments", &expression, depth)
            .map(empty_check)
    }

    fn evaluate_block<E: ExpressionEvaluator>(
        &self,
        evaluator: &E,
        data: &E::Source,
        block: &'static str,
        expression: &str,
        depth: usize,
    ) -> Result<DesignMatrix> {
        evaluator
            .evaluate(expression, depth, data, MissingAction::Raise)
            .map_err(|source| IvError::Evaluation {
                block,
                dependent: self.components.dependent.clone(),
                exog: self.components.exog.clone(),
                endog: self.components.endog.clone(),
                instruments: self.components.instruments.clone(),
                source,
            })
    }
}

/// The four evaluated blocks of a formula.
#[derive(Clone, Debug)]
pub struct EvaluatedFormula {
    /// Dependent variable matrix.
    pub dependent: DesignMatrix,
    /// Exogenous regressors, absent when the block expands to no columns.
    pub exog: Option<DesignMatrix>,
    /// Endogenous regressors, absent when the block expands to no columns.
    pub endog: Option<DesignMatrix>,
    /// Instruments, absent when the block expands to no columns.
    pub instruments: Option<DesignMatrix>,
}

/// Maps a zero-column expansion to "no matrix".
fn empty_check(matrix: DesignMatrix) -> Option<DesignMatrix> {
    if matrix.ncols() == 0 {
        None
    } else {
        Some(matrix)
    }
}

fn parse(formula: &str) -> Result<FormulaComponents> {
    let blocks: Vec<&str> = formula.trim().split('~').collect();
    match blocks.as_slice() {
        [dep, exog] => Ok(FormulaComponents {
            dependent: format!("{ZERO_TERMS} + {}", dep.trim()),
            exog: exog.trim().to_string(),
            endog: ZERO_TERMS.to_string(),
            instruments: ZERO_TERMS.to_string(),
        }),
        [dep, middle, last] => parse_iv(formula, dep.trim(), middle.trim(), last.trim()),
        _ => Err(IvError::SeparatorCount {
            found: blocks.len().saturating_sub(1),
        }),
    }
}

/// Handles the `dep ~ exog [endog ~ instr] exog_rest` shape.
fn parse_iv(formula: &str, dep: &str, middle: &str, last: &str) -> Result<FormulaComponents> {
    let (Some((exog_prefix, endog)), Some((instruments, exog_suffix))) =
        (middle.split_once('['), last.split_once(']'))
    else {
        return Err(IvError::UnsegregatedBlock {
            formula: formula.trim().to_string(),
        });
    };

    let endog = endog.trim();
    let instruments = instruments.trim();
    ensure_no_dangling_plus("endogenous", endog)?;
    ensure_no_dangling_plus("instrument", instruments)?;

    // The fragment after `]` is expected to start with `+` (or be empty), so
    // it is appended without inserting a separator.
    let mut exog = exog_prefix.trim().to_string();
    let exog_suffix = exog_suffix.trim();
    if !exog_suffix.is_empty() {
        exog.push_str(exog_suffix);
    }
    // A fragment ending in `+` carried the connective that joined it to the
    // bracketed block; strip exactly that one character.
    if let Some(stripped) = exog.strip_suffix('+') {
        exog = stripped.trim_end().to_string();
    }
    let exog = if exog.is_empty() {
        ZERO_TERMS.to_string()
    } else {
        format!("{ZERO_TERMS} + {exog}")
    };

    Ok(FormulaComponents {
        dependent: format!("{ZERO_TERMS} + {dep}"),
        exog,
        endog: endog.to_string(),
        instruments: instruments.to_string(),
    })
}

fn ensure_no_dangling_plus(block: &'static str, content: &str) -> Result<()> {
    if content.starts_with('+') || content.ends_with('+') {
        return Err(IvError::dangling_plus(block, content));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_piece_formula_fills_sentinels() {
        let parser = FormulaParser::new("a ~ b").unwrap();
        let components = parser.components();
        assert_eq!(components.dependent(), "0 + a");
        assert_eq!(components.exog(), "b");
        assert_eq!(components.endog(), ZERO_TERMS);
        assert_eq!(components.instruments(), ZERO_TERMS);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let parser = FormulaParser::new("  y ~ x1 + x2  ").unwrap();
        assert_eq!(parser.components().dependent(), "0 + y");
        assert_eq!(parser.components().exog(), "x1 + x2");
    }

    #[test]
    fn iv_formula_extracts_all_four_blocks() {
        let parser = FormulaParser::new("y ~ x1 + [x2 ~ z1 + z2] + x3").unwrap();
        let components = parser.components();
        assert_eq!(components.dependent(), "0 + y");
        assert_eq!(components.endog(), "x2");
        assert_eq!(components.instruments(), "z1 + z2");
        assert!(components.exog().contains("x1"));
        assert!(components.exog().contains("x3"));
        assert!(components.exog().starts_with("0 + "));
        assert!(!components.exog().ends_with('+'));
    }

    #[test]
    fn trailing_connective_before_block_is_stripped_once() {
        let parser = FormulaParser::new("y ~ x1 + [x2 ~ z1 + z2]").unwrap();
        assert_eq!(parser.components().exog(), "0 + x1");
    }

    #[test]
    fn block_only_formula_yields_zero_term_exog() {
        let parser = FormulaParser::new("y ~ [x2 ~ z1 + z2]").unwrap();
        assert_eq!(parser.components().exog(), ZERO_TERMS);
        assert_eq!(parser.components().endog(), "x2");
    }

    #[test]
    fn empty_prefix_keeps_suffix_connective() {
        // The fragment after `]` keeps its leading `+`; evaluators in the
        // mini-language treat it as a unary plus.
        let parser = FormulaParser::new("y ~ [x2 ~ z1] + x3").unwrap();
        assert_eq!(parser.components().exog(), "0 + + x3");
    }

    #[test]
    fn exogenous_fragments_merge_without_inserted_separator() {
        let parser = FormulaParser::new("y ~ x1 + [x2 ~ z1 + z2] + x3").unwrap();
        assert_eq!(parser.components().exog(), "0 + x1 ++ x3");
    }

    #[test]
    fn endogenous_block_must_not_lead_with_plus() {
        let err = FormulaParser::new("y ~ x [+x2 ~ z]").unwrap_err();
        match err {
            IvError::DanglingPlus { block, content } => {
                assert_eq!(block, "endogenous");
                assert_eq!(content, "+x2");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn instrument_block_must_not_trail_with_plus() {
        let err = FormulaParser::new("y ~ x [x2 ~ z +]").unwrap_err();
        match err {
            IvError::DanglingPlus { block, content } => {
                assert_eq!(block, "instrument");
                assert_eq!(content, "z +");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_brackets_are_rejected() {
        let err = FormulaParser::new("y ~ x ~ z").unwrap_err();
        assert!(matches!(err, IvError::UnsegregatedBlock { .. }));
        let message = err.to_string();
        assert!(message.contains("starts with ["));
        assert!(message.contains("y ~ x ~ z"));
    }

    #[test]
    fn separator_count_is_checked() {
        let err = FormulaParser::new("y + x").unwrap_err();
        assert!(matches!(err, IvError::SeparatorCount { found: 0 }));

        let err = FormulaParser::new("y ~ a ~ b ~ c").unwrap_err();
        assert!(matches!(err, IvError::SeparatorCount { found: 3 }));
    }

    #[test]
    fn eval_env_defaults_and_overrides() {
        let mut parser = FormulaParser::new("y ~ x").unwrap();
        assert_eq!(parser.eval_env(), 2);
        parser.set_eval_env(5);
        assert_eq!(parser.eval_env(), 5);

        let parser = FormulaParser::with_eval_env("y ~ x", 0).unwrap();
        assert_eq!(parser.eval_env(), 0);
    }

    #[test]
    fn components_support_map_style_access() {
        let parser = FormulaParser::new("y ~ x1 + [x2 ~ z1]").unwrap();
        let components = parser.components();
        assert_eq!(components.get("endog"), Some("x2"));
        assert_eq!(components.get("shares"), None);
        let names: Vec<&str> = components.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["dependent", "exog", "endog", "instruments"]);
    }

    #[test]
    fn components_round_trip_through_serde() {
        let parser = FormulaParser::new("y ~ x1 + [x2 ~ z1 + z2]").unwrap();
        let json = serde_json::to_string(parser.components()).unwrap();
        let restored: FormulaComponents = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, parser.components());
    }
}
