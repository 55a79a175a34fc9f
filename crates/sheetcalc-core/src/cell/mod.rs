//! Cell-related types and utilities
//!
//! This module contains:
//! - [`FormulaValue`] - The value a formula evaluates to
//! - [`CellAddress`] - A cell's location (e.g., "A1")
//! - [`CellRange`] - A range of cells (e.g., "A1:B10")

mod address;
mod value;

pub use address::{
    column_letters_to_index, index_to_column_letters, parse_address, parse_anchored_reference,
    resolve_range, AddressingMode, CellAddress, CellRange, CellRangeIterator,
};
pub use value::{coerce_number, format_number, ErrorCode, FormulaValue};
