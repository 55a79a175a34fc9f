//! Formula evaluation entry points and the evaluation context

use ahash::AHashMap;
use chrono::NaiveDateTime;
use sheetcalc_core::{FormulaValue, NamedRange, NamedRangeCollection, Sheet};

use crate::dependency::CellKey;
use crate::error::FormulaError;
use crate::expression::evaluate_expression;
use crate::functions::Function;
use crate::parser::{classify, split_arguments, Classified};
use crate::resolve::resolve_arguments;

/// Cached display values of formula cells, keyed by coordinate
pub type ValueCache = AHashMap<CellKey, FormulaValue>;

/// Default upper bound on cells expanded from a single range
pub const DEFAULT_MAX_RANGE_CELLS: u64 = 1_000_000;

/// Everything a formula can observe while it is evaluated
///
/// The sheet and the value cache are passed in explicitly, so one engine can
/// evaluate against any number of independent sheets.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Sheet to read cell text from
    pub sheet: Option<&'a dyn Sheet>,
    /// Display values of formula cells evaluated so far
    pub cache: Option<&'a ValueCache>,
    /// Defined names
    pub names: Option<&'a NamedRangeCollection>,
    /// Current cell row (anchor for relative references)
    pub current_row: u32,
    /// Current cell column (anchor for relative references)
    pub current_col: u16,
    /// Unresolved argument text of the call being evaluated
    pub raw_args: &'a [String],
    /// The moment date functions treat as "now"
    pub now: NaiveDateTime,
    /// Largest range that may be expanded into values
    pub max_range_cells: u64,
}

impl<'a> EvaluationContext<'a> {
    /// Create a context evaluating the cell at (row, col) of `sheet`
    pub fn new(sheet: &'a dyn Sheet, row: u32, col: u16) -> Self {
        Self {
            sheet: Some(sheet),
            current_row: row,
            current_col: col,
            ..Self::simple()
        }
    }

    /// Create a simple context without a sheet (for testing)
    pub fn simple() -> Self {
        Self {
            sheet: None,
            cache: None,
            names: None,
            current_row: 0,
            current_col: 0,
            raw_args: &[],
            now: chrono::Local::now().naive_local(),
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
        }
    }

    /// Use the given value cache for formula-cell lookups
    pub fn with_cache(mut self, cache: &'a ValueCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use the given defined names
    pub fn with_names(mut self, names: &'a NamedRangeCollection) -> Self {
        self.names = Some(names);
        self
    }

    /// Pin the clock used by date functions
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    /// Set the range expansion limit
    pub fn with_max_range_cells(mut self, max_range_cells: u64) -> Self {
        self.max_range_cells = max_range_cells;
        self
    }

    /// Same context, describing a call with different raw arguments
    pub fn with_raw_args<'b>(&self, raw_args: &'b [String]) -> EvaluationContext<'b>
    where
        'a: 'b,
    {
        EvaluationContext {
            sheet: self.sheet,
            cache: self.cache,
            names: self.names,
            current_row: self.current_row,
            current_col: self.current_col,
            raw_args,
            now: self.now,
            max_range_cells: self.max_range_cells,
        }
    }

    /// Check if a coordinate lies inside the sheet
    pub fn contains(&self, row: u32, col: u16) -> bool {
        self.sheet.map_or(false, |s| s.contains(row, col))
    }

    /// Raw text of a cell; empty without a sheet
    pub fn cell_text(&self, row: u32, col: u16) -> String {
        match self.sheet {
            Some(sheet) if sheet.contains(row, col) => sheet.cell_text(row, col),
            _ => String::new(),
        }
    }

    /// Cached value of a formula cell, if it has been evaluated
    pub fn cached_value(&self, row: u32, col: u16) -> Option<&'a FormulaValue> {
        self.cache?.get(&CellKey::new(row, col))
    }

    /// Look up a defined name
    pub fn named_range(&self, name: &str) -> Option<&'a NamedRange> {
        self.names?.get(name)
    }
}

/// Evaluate cell text.
///
/// Text not starting with `=` is returned unchanged as [`FormulaValue::Text`].
/// Failures never escape: they come back as [`FormulaValue::Error`].
///
/// # Example
/// ```rust
/// use sheetcalc_formula::{evaluate_formula, EvaluationContext};
/// use sheetcalc_core::FormulaValue;
///
/// let ctx = EvaluationContext::simple();
/// assert_eq!(evaluate_formula("=1+2*3", &ctx), FormulaValue::Number(7.0));
/// assert_eq!(evaluate_formula("=SUM(1,2)", &ctx), FormulaValue::Number(3.0));
/// assert_eq!(evaluate_formula("plain", &ctx), FormulaValue::text("plain"));
/// ```
pub fn evaluate_formula(formula: &str, ctx: &EvaluationContext) -> FormulaValue {
    if !formula.starts_with('=') {
        return FormulaValue::Text(formula.to_string());
    }

    match classify(formula) {
        Classified::FunctionCall { name, raw_args } => evaluate_call(name, raw_args, ctx),
        Classified::Expression { body } => {
            evaluate_expression(body, ctx).unwrap_or_else(FormulaValue::from)
        }
    }
}

/// Evaluate `name(raw_args)`: split, resolve and dispatch
pub fn evaluate_call(name: &str, raw_args: &str, ctx: &EvaluationContext) -> FormulaValue {
    let Some(function) = Function::from_name(name) else {
        return FormulaError::UnknownFunction(name.to_string()).into();
    };

    let args = split_arguments(raw_args);
    let values = match resolve_arguments(&args, ctx) {
        Ok(values) => values,
        Err(e) => return e.into(),
    };

    function.call(&values, &ctx.with_raw_args(&args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{ErrorCode, Worksheet};

    fn sheet_with(cells: &[(&str, &str)]) -> Worksheet {
        let mut sheet = Worksheet::new(20, 10);
        for (addr, text) in cells {
            sheet.set_cell(addr, *text).unwrap();
        }
        sheet
    }

    #[test]
    fn test_non_formula_passthrough() {
        let ctx = EvaluationContext::simple();
        assert_eq!(evaluate_formula("42", &ctx), FormulaValue::text("42"));
        assert_eq!(evaluate_formula("", &ctx), FormulaValue::text(""));
    }

    #[test]
    fn test_unknown_function() {
        let ctx = EvaluationContext::simple();
        let value = evaluate_formula("=FOO(1)", &ctx);
        assert!(value.to_string().contains("Unknown function FOO"));
    }

    #[test]
    fn test_sum_over_blank_and_text() {
        let sheet = sheet_with(&[("A2", "abc"), ("A3", "5")]);
        let ctx = EvaluationContext::new(&sheet, 5, 5);
        assert_eq!(
            evaluate_formula("=SUM(A1:A3)", &ctx),
            FormulaValue::Number(5.0)
        );
        assert_eq!(
            evaluate_formula("=COUNT(A1:A3)", &ctx),
            FormulaValue::Number(3.0)
        );
    }

    #[test]
    fn test_if_arity_and_text_branches() {
        let ctx = EvaluationContext::simple();
        let expected = FormulaValue::Error(ErrorCode::message("IF requires 3 arguments"));
        assert_eq!(evaluate_formula("=IF(1)", &ctx), expected);
        assert_eq!(evaluate_formula("=IF(1,2)", &ctx), expected);
        assert_eq!(
            evaluate_formula(r#"=IF(0,"Y","N")"#, &ctx),
            FormulaValue::text("N")
        );
    }

    #[test]
    fn test_nested_calls_and_comparisons_in_arguments() {
        let sheet = sheet_with(&[("A1", "7"), ("B1", "1"), ("B2", "2")]);
        let ctx = EvaluationContext::new(&sheet, 5, 5);
        assert_eq!(
            evaluate_formula(r#"=IF(A1>5,"big","small")"#, &ctx),
            FormulaValue::text("big")
        );
        assert_eq!(
            evaluate_formula("=MAX(SUM(B1:B2),A1*2)", &ctx),
            FormulaValue::Number(14.0)
        );
        assert_eq!(
            evaluate_formula("=ISERROR(SQRT(-1))", &ctx),
            FormulaValue::Boolean(true)
        );
    }

    #[test]
    fn test_formula_cells_read_cache() {
        let sheet = sheet_with(&[("A1", "=1+1"), ("A2", "3")]);
        let mut cache = ValueCache::new();

        // Uncached formula cells are skipped in ranges and read as 0 in expressions
        let ctx = EvaluationContext::new(&sheet, 5, 5);
        assert_eq!(
            evaluate_formula("=SUM(A1:A2)", &ctx),
            FormulaValue::Number(3.0)
        );
        assert_eq!(evaluate_formula("=A1+A2", &ctx), FormulaValue::Number(3.0));

        cache.insert(CellKey::new(0, 0), FormulaValue::Number(2.0));
        let ctx = EvaluationContext::new(&sheet, 5, 5).with_cache(&cache);
        assert_eq!(
            evaluate_formula("=SUM(A1:A2)", &ctx),
            FormulaValue::Number(5.0)
        );
        assert_eq!(evaluate_formula("=A1+A2", &ctx), FormulaValue::Number(5.0));
    }

    #[test]
    fn test_named_ranges() {
        let sheet = sheet_with(&[("B1", "2"), ("B2", "3"), ("C1", "10")]);
        let mut names = NamedRangeCollection::new();
        names
            .define(NamedRange::new("Sales", "B1:B2").unwrap())
            .unwrap();
        names
            .define(NamedRange::new("Base", "C1").unwrap())
            .unwrap();

        let ctx = EvaluationContext::new(&sheet, 5, 5).with_names(&names);
        assert_eq!(
            evaluate_formula("=SUM(Sales)", &ctx),
            FormulaValue::Number(5.0)
        );
        assert_eq!(evaluate_formula("=base*2", &ctx), FormulaValue::Number(20.0));
    }

    #[test]
    fn test_range_too_large() {
        let sheet = Worksheet::new(100, 10);
        let ctx = EvaluationContext::new(&sheet, 0, 0).with_max_range_cells(10);
        assert_eq!(
            evaluate_formula("=SUM(A1:B10)", &ctx),
            FormulaValue::Error(ErrorCode::message("Range too large"))
        );
        assert_eq!(
            evaluate_formula("=SUM(A1:B5)", &ctx),
            FormulaValue::Number(0.0)
        );
    }

    #[test]
    fn test_invalid_range_format() {
        let ctx = EvaluationContext::simple();
        assert_eq!(
            evaluate_formula("=SUM(A1:B2:C3)", &ctx),
            FormulaValue::Error(ErrorCode::message("Invalid range format: A1:B2:C3"))
        );
    }
}
