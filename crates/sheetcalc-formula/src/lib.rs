//! # sheetcalc-formula
//!
//! Formula evaluation for sheetcalc.
//!
//! This crate provides:
//! - Formula classification and argument splitting
//! - Argument and reference resolution
//! - Arithmetic expression evaluation
//! - The built-in function library
//! - Dependency extraction and the dependency graph
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{FormulaValue, Worksheet};
//! use sheetcalc_formula::{evaluate_formula, EvaluationContext};
//!
//! let mut sheet = Worksheet::new(10, 5);
//! sheet.set_cell("A1", "4").unwrap();
//! sheet.set_cell("A2", "6").unwrap();
//!
//! let ctx = EvaluationContext::new(&sheet, 2, 0);
//! assert_eq!(evaluate_formula("=SUM(A1:A2)", &ctx), FormulaValue::Number(10.0));
//! assert_eq!(evaluate_formula("=A1*A2-4", &ctx), FormulaValue::Number(20.0));
//! ```

pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod expression;
pub mod functions;
pub mod parser;
pub mod resolve;

pub use dependency::{extract_references, CellKey, DependencyGraph, ExtractOptions};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{
    evaluate_call, evaluate_formula, EvaluationContext, ValueCache, DEFAULT_MAX_RANGE_CELLS,
};
pub use expression::evaluate_expression;
pub use functions::{Category, Function};
pub use parser::{classify, parentheses_balanced, split_arguments, split_call, Classified};
pub use resolve::resolve_arguments;
