//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    CalculationStats,
    Calculator,

    // Addressing
    CellAddress,
    CellKey,
    CellRange,
    NamedRange,

    // Values
    ErrorCode,
    FormulaValue,

    // Error types
    Error,
    Result,

    // Sheets
    Sheet,
    Worksheet,
};
