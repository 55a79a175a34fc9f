//! # sheetcalc
//!
//! A spreadsheet formula engine.
//!
//! sheetcalc evaluates the formulas of a rectangular grid of text cells. A cell
//! whose text starts with `=` holds a formula; every other cell is a literal.
//!
//! ## Features
//!
//! - A1 references with `$` anchors, ranges and named ranges
//! - Arithmetic and comparison expressions
//! - Over a hundred built-in functions (math, statistics, text, dates, finance)
//! - Dependency tracking with incremental recalculation
//! - Circular reference detection
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut sheet = Worksheet::new(100, 26);
//! sheet.set_cell("A1", "10").unwrap();
//! sheet.set_cell("A2", "32").unwrap();
//! sheet.set_cell("A3", "=SUM(A1:A2)").unwrap();
//!
//! let mut calc = Calculator::new(sheet);
//! calc.recalculate_all();
//! assert_eq!(calc.sheet().display_text(2, 0), "42");
//!
//! // Edit a cell and recalculate what depends on it
//! calc.sheet_mut().set_cell("A1", "20").unwrap();
//! calc.cell_changed(0, 0);
//! assert_eq!(calc.sheet().display_text(2, 0), "52");
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{CalculationOptions, CalculationStats, Calculator};

// Re-export core types
pub use sheetcalc_core::{
    coerce_number, column_letters_to_index, index_to_column_letters, parse_address,
    parse_anchored_reference, resolve_range, AddressingMode, CellAddress, CellRange, Error,
    ErrorCode, FormulaValue, NamedRange, NamedRangeCollection, Result, Sheet, Worksheet,
    MAX_COLS, MAX_ROWS,
};

// Re-export formula types
pub use sheetcalc_formula::{
    evaluate_formula, extract_references, Category, CellKey, DependencyGraph,
    EvaluationContext, ExtractOptions, FormulaError, Function, ValueCache,
};
