//! Sheet calculation engine
//!
//! Evaluates every formula cell of a [`Sheet`] so that each cell is computed after
//! the cells it references, whatever order the cells were entered in. Cells on a
//! reference cycle get `#CIRCULAR_REFERENCE` instead of a value.
//!
//! # Example
//!
//! ```rust
//! use sheetcalc::prelude::*;
//!
//! let mut sheet = Worksheet::new(10, 5);
//! sheet.set_cell("C1", "=B1+1").unwrap();
//! sheet.set_cell("B1", "=A1*2").unwrap();
//! sheet.set_cell("A1", "5").unwrap();
//!
//! let mut calc = Calculator::new(sheet);
//! let stats = calc.recalculate_all();
//! assert_eq!(stats.cells_calculated, 2);
//! assert_eq!(calc.sheet().display_text(0, 2), "11");
//! ```

use std::collections::BTreeMap;

use ahash::AHashSet;
use chrono::{Local, NaiveDateTime};
use lazy_regex::regex;
use sheetcalc_core::{ErrorCode, FormulaValue, NamedRange, NamedRangeCollection, Result, Sheet};
use sheetcalc_formula::{
    evaluate_formula, parentheses_balanced, CellKey, DependencyGraph, EvaluationContext,
    ExtractOptions, Function, ValueCache, DEFAULT_MAX_RANGE_CELLS,
};

/// Options for sheet calculation
#[derive(Debug, Clone)]
pub struct CalculationOptions {
    /// Largest range a formula may read, in cells (default: 1,000,000)
    pub max_range_cells: u64,
    /// Record a dependency on every cell of a range rather than only its two endpoints,
    /// as long as the range is no larger than `max_range_cells`
    pub expand_range_dependencies: bool,
    /// Recalculate cells calling NOW, TODAY, RAND or RANDBETWEEN on every change
    pub calculate_volatile: bool,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            max_range_cells: DEFAULT_MAX_RANGE_CELLS,
            expand_range_dependencies: true,
            calculate_volatile: true,
        }
    }
}

impl CalculationOptions {
    fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            expand_ranges: self.expand_range_dependencies,
            max_range_cells: self.max_range_cells,
        }
    }
}

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells on the sheet
    pub formula_count: usize,
    /// Number of cells calculated
    pub cells_calculated: usize,
    /// Number of cells evaluated as part of a reference cycle
    pub circular_references: usize,
    /// Number of formula cells calling a volatile function
    pub volatile_cells: usize,
    /// Number of cells whose result is an error value
    pub errors: usize,
    /// Whether the run stopped early on request
    pub cancelled: bool,
}

/// A cell on the explicit DFS stack and the precedents still to visit
struct Frame {
    cell: CellKey,
    precedents: Vec<CellKey>,
    next: usize,
}

/// Owns a sheet and keeps its formula cells' display values up to date.
///
/// Evaluated values are kept in a cache keyed by cell, which formulas read
/// instead of re-evaluating the cells they reference.
pub struct Calculator<S: Sheet> {
    sheet: S,
    options: CalculationOptions,
    names: NamedRangeCollection,
    graph: DependencyGraph,
    cache: ValueCache,
    fixed_now: Option<NaiveDateTime>,
}

impl<S: Sheet> Calculator<S> {
    /// Create a calculator with default options
    pub fn new(sheet: S) -> Self {
        Self::with_options(sheet, CalculationOptions::default())
    }

    /// Create a calculator with custom options
    pub fn with_options(sheet: S, options: CalculationOptions) -> Self {
        Self {
            sheet,
            options,
            names: NamedRangeCollection::new(),
            graph: DependencyGraph::new(),
            cache: ValueCache::new(),
            fixed_now: None,
        }
    }

    /// Pin the clock seen by NOW, TODAY and the date functions
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.fixed_now = Some(now);
        self
    }

    pub fn options(&self) -> &CalculationOptions {
        &self.options
    }

    pub fn sheet(&self) -> &S {
        &self.sheet
    }

    /// Mutable access to the sheet.
    ///
    /// Call [`cell_changed`](Self::cell_changed) after editing a cell.
    pub fn sheet_mut(&mut self) -> &mut S {
        &mut self.sheet
    }

    /// Swap in another sheet, returning the previous one.
    ///
    /// The dependency graph and cached values belong to the old sheet and are
    /// discarded; named ranges are kept.
    pub fn set_sheet(&mut self, sheet: S) -> S {
        self.graph.clear();
        self.cache.clear();
        std::mem::replace(&mut self.sheet, sheet)
    }

    pub fn into_sheet(self) -> S {
        self.sheet
    }

    pub fn names(&self) -> &NamedRangeCollection {
        &self.names
    }

    /// Define a name, or point an existing name at a new reference
    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<()> {
        let named = NamedRange::new(name, refers_to)?;
        self.names.define_or_update(named);
        Ok(())
    }

    pub fn remove_name(&mut self, name: &str) -> Option<NamedRange> {
        self.names.remove(name)
    }

    /// The last computed value of a formula cell
    pub fn display_value(&self, row: u32, col: u16) -> Option<&FormulaValue> {
        self.cache.get(&CellKey::new(row, col))
    }

    /// Every formula cell on the sheet, in row-major order
    pub fn formula_cells(&self) -> Vec<CellKey> {
        self.sheet
            .formula_cells()
            .into_iter()
            .map(|(row, col)| CellKey::new(row, col))
            .collect()
    }

    /// Evaluate a formula as if it were written in the given cell, without
    /// storing the result
    pub fn evaluate(&self, formula: &str, row: u32, col: u16) -> FormulaValue {
        let ctx = self.context(row, col, self.now());
        evaluate_formula(formula, &ctx)
    }

    /// Check that a formula is well formed: its parentheses balance and every
    /// function it calls exists. Text that is not a formula is always valid.
    pub fn validate(&self, formula: &str) -> bool {
        let Some(body) = formula.strip_prefix('=') else {
            return true;
        };
        if !parentheses_balanced(body) {
            return false;
        }
        regex!(r"([A-Z][A-Z0-9.]*)\(")
            .captures_iter(body)
            .all(|caps| Function::from_name(&caps[1]).is_some())
    }

    /// Cells whose formulas reference the given cell
    pub fn dependents_of(&self, row: u32, col: u16) -> Vec<CellKey> {
        self.graph.get_dependents(CellKey::new(row, col)).collect()
    }

    /// Cells the given cell's formula references
    pub fn precedents_of(&self, row: u32, col: u16) -> Vec<CellKey> {
        self.graph.get_precedents(CellKey::new(row, col)).collect()
    }

    /// Recalculate every formula cell on the sheet
    pub fn recalculate_all(&mut self) -> CalculationStats {
        self.recalculate_all_cancellable(|| false)
    }

    /// Recalculate every formula cell, checking `is_cancelled` before each cell.
    ///
    /// Cells calculated before cancellation keep their new values.
    pub fn recalculate_all_cancellable<F>(&mut self, mut is_cancelled: F) -> CalculationStats
    where
        F: FnMut() -> bool,
    {
        let formulas = self.collect_formulas();
        self.rebuild_graph(&formulas);
        self.cache.clear();

        let mut stats = CalculationStats {
            formula_count: formulas.len(),
            volatile_cells: volatile_cells(&formulas).len(),
            ..Default::default()
        };
        log::debug!("recalculating {} formula cells", formulas.len());

        let roots: Vec<CellKey> = formulas.keys().copied().collect();
        self.run(&formulas, &roots, None, &mut is_cancelled, &mut stats);

        log::debug!(
            "calculated {} cells ({} errors, {} circular)",
            stats.cells_calculated,
            stats.errors,
            stats.circular_references
        );
        stats
    }

    /// Recalculate the cells affected by a change to one cell: the cell itself if
    /// it holds a formula, everything depending on it, and the volatile cells
    pub fn cell_changed(&mut self, row: u32, col: u16) -> CalculationStats {
        let changed = CellKey::new(row, col);
        let formulas = self.collect_formulas();
        self.rebuild_graph(&formulas);

        let mut affected: AHashSet<CellKey> =
            self.graph.get_recalc_order(&[changed]).into_iter().collect();
        affected.insert(changed);

        let volatile = volatile_cells(&formulas);
        if self.options.calculate_volatile && !volatile.is_empty() {
            affected.extend(self.graph.get_recalc_order(&volatile));
        }
        for cell in &affected {
            self.cache.remove(cell);
        }

        let mut stats = CalculationStats {
            formula_count: formulas.len(),
            volatile_cells: volatile.len(),
            ..Default::default()
        };
        log::debug!(
            "cell {changed} changed, {} cells affected",
            affected.len()
        );

        let roots: Vec<CellKey> = formulas
            .keys()
            .filter(|cell| affected.contains(cell))
            .copied()
            .collect();
        self.run(&formulas, &roots, Some(&affected), &mut || false, &mut stats);
        stats
    }

    /// Formula text of every formula cell, in row-major order
    fn collect_formulas(&self) -> BTreeMap<CellKey, String> {
        self.sheet
            .formula_cells()
            .into_iter()
            .map(|(row, col)| (CellKey::new(row, col), self.sheet.cell_text(row, col)))
            .collect()
    }

    fn rebuild_graph(&mut self, formulas: &BTreeMap<CellKey, String>) {
        self.graph = DependencyGraph::build(
            formulas.iter().map(|(cell, text)| (*cell, text.as_str())),
            Some(&self.names),
            self.options.extract_options(),
        );
    }

    fn now(&self) -> NaiveDateTime {
        self.fixed_now
            .unwrap_or_else(|| Local::now().naive_local())
    }

    fn context(&self, row: u32, col: u16, now: NaiveDateTime) -> EvaluationContext<'_> {
        EvaluationContext::new(&self.sheet, row, col)
            .with_cache(&self.cache)
            .with_names(&self.names)
            .with_now(now)
            .with_max_range_cells(self.options.max_range_cells)
    }

    /// Whether a precedent must be evaluated before the cell that references it
    fn needs_eval(
        &self,
        cell: CellKey,
        formulas: &BTreeMap<CellKey, String>,
        scope: Option<&AHashSet<CellKey>>,
    ) -> bool {
        formulas.contains_key(&cell)
            && (scope.map_or(true, |scope| scope.contains(&cell))
                || !self.cache.contains_key(&cell))
    }

    /// Evaluate `roots` and whatever they need, precedents first.
    ///
    /// Cells on a reference cycle are found up front from the graph's strongly
    /// connected components, so the verdict does not depend on visit order.
    fn run(
        &mut self,
        formulas: &BTreeMap<CellKey, String>,
        roots: &[CellKey],
        scope: Option<&AHashSet<CellKey>>,
        is_cancelled: &mut dyn FnMut() -> bool,
        stats: &mut CalculationStats,
    ) {
        let now = self.now();
        let circular = self.graph.circular_cells();
        let mut visited: AHashSet<CellKey> = AHashSet::new();

        for &root in roots {
            if visited.contains(&root) || !formulas.contains_key(&root) {
                continue;
            }

            visited.insert(root);
            let mut stack = vec![self.frame(root)];

            while let Some(top) = stack.last_mut() {
                if let Some(&precedent) = top.precedents.get(top.next) {
                    top.next += 1;
                    // A visited precedent is either finished or on the stack,
                    // and the latter only happens on a cycle
                    if !visited.contains(&precedent)
                        && self.needs_eval(precedent, formulas, scope)
                    {
                        visited.insert(precedent);
                        stack.push(self.frame(precedent));
                    }
                    continue;
                }

                let Some(done) = stack.pop() else { break };

                if is_cancelled() {
                    log::debug!("calculation cancelled");
                    stats.cancelled = true;
                    return;
                }

                let Some(formula) = formulas.get(&done.cell) else {
                    continue;
                };
                let on_cycle = circular.contains(&done.cell);
                if on_cycle {
                    stats.circular_references += 1;
                }
                self.evaluate_cell(done.cell, formula, on_cycle, now, stats);
            }
        }
    }

    fn frame(&self, cell: CellKey) -> Frame {
        Frame {
            cell,
            precedents: self.graph.get_precedents(cell).collect(),
            next: 0,
        }
    }

    fn evaluate_cell(
        &mut self,
        cell: CellKey,
        formula: &str,
        on_cycle: bool,
        now: NaiveDateTime,
        stats: &mut CalculationStats,
    ) {
        let value = if on_cycle {
            log::warn!("circular reference at {cell}");
            FormulaValue::Error(ErrorCode::CircularReference)
        } else {
            let ctx = self.context(cell.row, cell.col, now);
            evaluate_formula(formula, &ctx)
        };

        if value.is_error() {
            log::trace!("{cell} evaluated to {value}");
            stats.errors += 1;
        }
        stats.cells_calculated += 1;

        self.sheet
            .set_display_value(cell.row, cell.col, value.clone());
        self.cache.insert(cell, value);
    }
}

/// Formula cells calling NOW, TODAY, RAND or RANDBETWEEN
fn volatile_cells(formulas: &BTreeMap<CellKey, String>) -> Vec<CellKey> {
    formulas
        .iter()
        .filter(|(_, formula)| contains_volatile_function(formula))
        .map(|(cell, _)| *cell)
        .collect()
}

fn contains_volatile_function(formula: &str) -> bool {
    regex!(r"([A-Z][A-Z0-9.]*)\(")
        .captures_iter(formula)
        .any(|caps| Function::from_name(&caps[1]).is_some_and(Function::is_volatile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Worksheet;

    fn calculator(cells: &[(&str, &str)]) -> Calculator<Worksheet> {
        let mut sheet = Worksheet::new(20, 10);
        for (addr, text) in cells {
            sheet.set_cell(addr, *text).unwrap();
        }
        Calculator::new(sheet)
    }

    #[test]
    fn test_simple_calculation() {
        let mut calc = calculator(&[("A1", "10"), ("A2", "20"), ("A3", "=A1+A2")]);
        let stats = calc.recalculate_all();

        assert_eq!(stats.formula_count, 1);
        assert_eq!(stats.cells_calculated, 1);
        assert_eq!(calc.display_value(2, 0), Some(&FormulaValue::Number(30.0)));
        assert_eq!(calc.sheet().display_text(2, 0), "30");
    }

    #[test]
    fn test_chain_calculation() {
        // Entered bottom-up so row order alone would read stale values
        let mut calc = calculator(&[
            ("A1", "=A2+1"),
            ("A2", "=A3*2"),
            ("A3", "=A4-1"),
            ("A4", "6"),
        ]);
        let stats = calc.recalculate_all();

        assert_eq!(stats.cells_calculated, 3);
        assert_eq!(calc.display_value(2, 0), Some(&FormulaValue::Number(5.0)));
        assert_eq!(calc.display_value(1, 0), Some(&FormulaValue::Number(10.0)));
        assert_eq!(calc.display_value(0, 0), Some(&FormulaValue::Number(11.0)));
    }

    #[test]
    fn test_sum_range() {
        let mut calc = calculator(&[
            ("A1", "=B1*2"),
            ("B1", "3"),
            ("A2", "4"),
            ("A4", "=SUM(A1:A3)"),
        ]);
        calc.recalculate_all();
        assert_eq!(calc.display_value(3, 0), Some(&FormulaValue::Number(10.0)));
    }

    #[test]
    fn test_circular_reference_detection() {
        let mut calc = calculator(&[("A1", "=B1+1"), ("B1", "=A1+1"), ("C1", "=5")]);
        let stats = calc.recalculate_all();

        assert_eq!(stats.circular_references, 2);
        let circular = FormulaValue::Error(ErrorCode::CircularReference);
        assert_eq!(calc.display_value(0, 0), Some(&circular));
        assert_eq!(calc.display_value(0, 1), Some(&circular));
        assert_eq!(calc.display_value(0, 2), Some(&FormulaValue::Number(5.0)));
        assert_eq!(calc.sheet().display_text(0, 0), "#CIRCULAR_REFERENCE");
    }

    #[test]
    fn test_self_reference() {
        let mut calc = calculator(&[("A1", "=A1+1")]);
        let stats = calc.recalculate_all();
        assert_eq!(stats.circular_references, 1);
        assert_eq!(
            calc.display_value(0, 0),
            Some(&FormulaValue::Error(ErrorCode::CircularReference))
        );
    }

    #[test]
    fn test_volatile_function_detection() {
        assert!(contains_volatile_function("=NOW()"));
        assert!(contains_volatile_function("=A1+RAND()"));
        assert!(contains_volatile_function("=IF(A1,TODAY(),0)"));
        assert!(!contains_volatile_function("=SUM(A1:A3)"));
        assert!(!contains_volatile_function("=NOWHERE"));

        let mut calc = calculator(&[("A1", "=RAND()"), ("A2", "=A1*2"), ("A3", "=1")]);
        let stats = calc.recalculate_all();
        assert_eq!(stats.volatile_cells, 1);
        assert_eq!(
            calc.formula_cells(),
            vec![CellKey::new(0, 0), CellKey::new(1, 0), CellKey::new(2, 0)]
        );
    }

    #[test]
    fn test_fixed_now() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut calc = calculator(&[("A1", "=YEAR(TODAY())"), ("A2", "=HOUR(NOW())")]).with_now(now);
        calc.recalculate_all();
        assert_eq!(calc.display_value(0, 0), Some(&FormulaValue::Number(2024.0)));
        assert_eq!(calc.display_value(1, 0), Some(&FormulaValue::Number(9.0)));
    }

    #[test]
    fn test_validate() {
        let calc = calculator(&[]);
        assert!(calc.validate("plain text"));
        assert!(calc.validate("=SUM(A1:A3)*2"));
        assert!(calc.validate("=IF(A1>1,MAX(B1,B2),0)"));
        assert!(calc.validate("=LOG10(100)"));
        assert!(!calc.validate("=SUM(A1:A3"));
        assert!(!calc.validate("=FOO(1)"));
        assert!(!calc.validate("=1+BAR(2)"));
    }

    #[test]
    fn test_evaluate_does_not_store() {
        let calc = calculator(&[("A1", "4")]);
        assert_eq!(calc.evaluate("=A1*A1", 5, 5), FormulaValue::Number(16.0));
        assert_eq!(calc.evaluate("=ROW()", 5, 5), FormulaValue::Number(6.0));
        assert_eq!(calc.display_value(5, 5), None);
    }

    #[test]
    fn test_dependency_queries() {
        let mut calc = calculator(&[("A1", "1"), ("B1", "=A1*2"), ("C1", "=A1+B1")]);
        calc.recalculate_all();

        assert_eq!(
            calc.dependents_of(0, 0),
            vec![CellKey::new(0, 1), CellKey::new(0, 2)]
        );
        assert_eq!(
            calc.precedents_of(0, 2),
            vec![CellKey::new(0, 0), CellKey::new(0, 1)]
        );
    }
}
