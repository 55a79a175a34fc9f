//! # sheetcalc-core
//!
//! Core data structures for the sheetcalc formula engine.
//!
//! This crate provides the fundamental types used throughout sheetcalc:
//! - [`CellAddress`] and [`CellRange`] - Cell addressing, ranges and reference resolution
//! - [`FormulaValue`] and [`ErrorCode`] - What a formula evaluates to
//! - [`Sheet`] - The grid capability the engine reads from and writes back to
//! - [`Worksheet`] - An in-memory [`Sheet`]
//! - [`NamedRange`] - Names standing for cells or ranges
//!
//! ## Example
//!
//! ```rust
//! use sheetcalc_core::{Sheet, Worksheet, FormulaValue};
//!
//! let mut sheet = Worksheet::new(100, 26);
//!
//! // Using string addresses
//! sheet.set_cell("A1", "Hello").unwrap();
//! sheet.set_cell("B1", "=1+1").unwrap();
//!
//! // Or using row/column indices (0-based)
//! sheet.set_cell_text(1, 1, "42").unwrap();
//!
//! assert_eq!(sheet.cell_text(0, 1), "=1+1");
//! sheet.set_display_value(0, 1, FormulaValue::Number(2.0));
//! assert_eq!(sheet.display_text(0, 1), "2");
//! ```

pub mod cell;
pub mod error;
pub mod named_range;
pub mod sheet;
pub mod worksheet;

// Re-exports for convenience
pub use cell::{
    coerce_number, column_letters_to_index, index_to_column_letters, parse_address,
    parse_anchored_reference, resolve_range, AddressingMode, CellAddress, CellRange, ErrorCode,
    FormulaValue,
};
pub use error::{Error, Result};
pub use named_range::{NamedRange, NamedRangeCollection};
pub use sheet::Sheet;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
