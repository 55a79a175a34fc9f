//! The grid capability consumed by the formula engine

use crate::cell::FormulaValue;

/// A passive grid of cell text.
///
/// The engine reads raw text (formula or literal) through this trait and writes
/// computed results back with [`Sheet::set_display_value`]. The stored text is never
/// modified by the engine.
pub trait Sheet {
    /// Number of rows in the grid
    fn row_count(&self) -> u32;

    /// Number of columns in the grid
    fn column_count(&self) -> u16;

    /// Raw stored text of a cell; empty string if blank or out of bounds
    fn cell_text(&self, row: u32, col: u16) -> String;

    /// Record the post-evaluation value shown for a cell
    fn set_display_value(&mut self, row: u32, col: u16, value: FormulaValue);

    /// Check if a coordinate lies inside the grid
    fn contains(&self, row: u32, col: u16) -> bool {
        row < self.row_count() && col < self.column_count()
    }

    /// Check if the cell holds a formula (text starting with `=`)
    fn is_formula(&self, row: u32, col: u16) -> bool {
        self.cell_text(row, col).starts_with('=')
    }

    /// Coordinates of every formula cell, row by row.
    ///
    /// The default scans the whole grid; sparse implementations should override it.
    fn formula_cells(&self) -> Vec<(u32, u16)> {
        let mut cells = Vec::new();
        for row in 0..self.row_count() {
            for col in 0..self.column_count() {
                if self.is_formula(row, col) {
                    cells.push((row, col));
                }
            }
        }
        cells
    }
}

impl<S: Sheet + ?Sized> Sheet for &mut S {
    fn row_count(&self) -> u32 {
        (**self).row_count()
    }

    fn column_count(&self) -> u16 {
        (**self).column_count()
    }

    fn cell_text(&self, row: u32, col: u16) -> String {
        (**self).cell_text(row, col)
    }

    fn set_display_value(&mut self, row: u32, col: u16, value: FormulaValue) {
        (**self).set_display_value(row, col, value)
    }

    fn formula_cells(&self) -> Vec<(u32, u16)> {
        (**self).formula_cells()
    }
}

impl<S: Sheet + ?Sized> Sheet for Box<S> {
    fn row_count(&self) -> u32 {
        (**self).row_count()
    }

    fn column_count(&self) -> u16 {
        (**self).column_count()
    }

    fn cell_text(&self, row: u32, col: u16) -> String {
        (**self).cell_text(row, col)
    }

    fn set_display_value(&mut self, row: u32, col: u16, value: FormulaValue) {
        (**self).set_display_value(row, col, value)
    }

    fn formula_cells(&self) -> Vec<(u32, u16)> {
        (**self).formula_cells()
    }
}
