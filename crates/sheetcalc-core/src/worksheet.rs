//! In-memory worksheet

use ahash::AHashMap;

use crate::cell::{CellAddress, CellRange, FormulaValue};
use crate::error::{Error, Result};
use crate::sheet::Sheet;
use crate::{MAX_COLS, MAX_ROWS};

/// A fixed-size grid of cell text with a separate layer of display values
///
/// This is the reference implementation of [`Sheet`]; applications embedding the
/// engine in their own grid implement the trait directly.
#[derive(Debug, Clone)]
pub struct Worksheet {
    rows: u32,
    cols: u16,
    /// Raw text keyed by (row, col); blank cells are absent
    cells: AHashMap<(u32, u16), String>,
    /// Values written back by the engine
    display: AHashMap<(u32, u16), FormulaValue>,
}

impl Worksheet {
    /// Create an empty worksheet with the given dimensions
    ///
    /// Dimensions are clamped to the sheet limits.
    pub fn new(rows: u32, cols: u16) -> Self {
        Self {
            rows: rows.min(MAX_ROWS),
            cols: cols.min(MAX_COLS),
            cells: AHashMap::new(),
            display: AHashMap::new(),
        }
    }

    // === Cell Access ===

    /// Set the raw text of a cell by address string (e.g., "A1")
    pub fn set_cell(&mut self, address: &str, text: impl Into<String>) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_text(addr.row, addr.col, text)
    }

    /// Set the raw text of a cell by row and column indices
    ///
    /// Any previous display value is discarded. Empty text clears the cell.
    pub fn set_cell_text(&mut self, row: u32, col: u16, text: impl Into<String>) -> Result<()> {
        self.check_bounds(row, col)?;

        let text = text.into();
        self.display.remove(&(row, col));
        if text.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), text);
        }
        Ok(())
    }

    /// Get the raw text of a cell by address string
    pub fn get(&self, address: &str) -> Result<String> {
        let addr = CellAddress::parse(address)?;
        Ok(self.cell_text(addr.row, addr.col))
    }

    /// Clear a cell by address string
    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.clear_cell_at(addr.row, addr.col);
        Ok(())
    }

    /// Clear a cell by indices
    pub fn clear_cell_at(&mut self, row: u32, col: u16) {
        self.cells.remove(&(row, col));
        self.display.remove(&(row, col));
    }

    /// The display value written by the engine, if any
    pub fn display_value(&self, row: u32, col: u16) -> Option<&FormulaValue> {
        self.display.get(&(row, col))
    }

    /// What a grid would show: the display value if present, the raw text otherwise
    pub fn display_text(&self, row: u32, col: u16) -> String {
        match self.display.get(&(row, col)) {
            Some(value) => value.as_text(),
            None => self.cell_text(row, col),
        }
    }

    /// Get the used range (bounding box of non-blank cells)
    pub fn used_range(&self) -> Option<CellRange> {
        let mut keys = self.cells.keys();
        let &(first_row, first_col) = keys.next()?;

        let (mut min_row, mut min_col, mut max_row, mut max_col) =
            (first_row, first_col, first_row, first_col);
        for &(row, col) in keys {
            min_row = min_row.min(row);
            min_col = min_col.min(col);
            max_row = max_row.max(row);
            max_col = max_col.max(col);
        }

        Some(CellRange::from_indices(min_row, min_col, max_row, max_col))
    }

    /// Number of non-blank cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn check_bounds(&self, row: u32, col: u16) -> Result<()> {
        if row >= self.rows {
            return Err(Error::RowOutOfBounds(row, self.rows.saturating_sub(1)));
        }
        if col >= self.cols {
            return Err(Error::ColumnOutOfBounds(col as u32, self.cols.saturating_sub(1)));
        }
        Ok(())
    }
}

impl Default for Worksheet {
    /// A 100 x 26 (A1:Z100) sheet
    fn default() -> Self {
        Self::new(100, 26)
    }
}

impl Sheet for Worksheet {
    fn row_count(&self) -> u32 {
        self.rows
    }

    fn column_count(&self) -> u16 {
        self.cols
    }

    fn cell_text(&self, row: u32, col: u16) -> String {
        self.cells.get(&(row, col)).cloned().unwrap_or_default()
    }

    fn set_display_value(&mut self, row: u32, col: u16, value: FormulaValue) {
        self.display.insert((row, col), value);
    }

    fn formula_cells(&self) -> Vec<(u32, u16)> {
        let mut cells: Vec<_> = self
            .cells
            .iter()
            .filter(|(_, text)| text.starts_with('='))
            .map(|(&key, _)| key)
            .collect();
        cells.sort_unstable();
        cells
    }
}
