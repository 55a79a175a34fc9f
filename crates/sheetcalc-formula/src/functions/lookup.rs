//! Lookup and reference functions
//!
//! VLOOKUP, HLOOKUP, INDEX, MATCH and OFFSET check their arity and then report
//! `#FEATURE_NOT_IMPLEMENTED`: a flat list of resolved values carries no shape to
//! look up in. The reference functions work from the raw argument text instead.

use sheetcalc_core::{
    coerce_number, index_to_column_letters, parse_address, parse_anchored_reference,
    resolve_range, CellRange, ErrorCode, FormulaValue, MAX_COLS, MAX_ROWS,
};

use super::{int, text};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

fn not_implemented(
    name: &str,
    args: &[FormulaValue],
    min_args: usize,
) -> FormulaResult<FormulaValue> {
    if args.len() < min_args {
        let plural = if min_args == 1 { "" } else { "s" };
        return Err(FormulaError::argument(format!(
            "{name} requires at least {min_args} argument{plural}"
        )));
    }
    Ok(FormulaValue::Error(ErrorCode::NotImplemented))
}

/// VLOOKUP(value, range, column, [exact])
pub fn fn_vlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    not_implemented("VLOOKUP", args, 3)
}

/// HLOOKUP(value, range, row, [exact])
pub fn fn_hlookup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    not_implemented("HLOOKUP", args, 3)
}

/// INDEX(range, row, column)
pub fn fn_index(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    not_implemented("INDEX", args, 3)
}

/// MATCH(value, range, [type])
pub fn fn_match(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    not_implemented("MATCH", args, 2)
}

/// OFFSET(reference, rows, columns, [height], [width])
pub fn fn_offset(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    not_implemented("OFFSET", args, 3)
}

/// ADDRESS(row, column, [abs_mode]): A1 text for 1-based coordinates.
///
/// Mode 1 is `$A$1`, 2 is `A$1`, 3 is `$A1` and 4 is `A1`.
pub fn fn_address(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let row = int(args, 0)?;
    let col = int(args, 1)?;
    let mode = if args.len() >= 3 { int(args, 2)? } else { 1 };

    if row < 1 || row > MAX_ROWS as i64 || col < 1 || col > MAX_COLS as i64 {
        return Err(FormulaError::Invalid);
    }
    let (abs_row, abs_col) = match mode {
        1 => (true, true),
        2 => (true, false),
        3 => (false, true),
        4 => (false, false),
        _ => return Err(FormulaError::Invalid),
    };

    let letters = index_to_column_letters((col - 1) as u16);
    Ok(FormulaValue::Text(format!(
        "{}{}{}{}",
        if abs_col { "$" } else { "" },
        letters,
        if abs_row { "$" } else { "" },
        row
    )))
}

/// INDIRECT(text): the value of the cell named by the text.
///
/// The reference is resolved relative to the evaluating cell: non-`$` parts are
/// offsets from it, so `"A1"` is the cell itself and `"$A$1"` the top-left cell.
pub fn fn_indirect(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if args.is_empty() {
        return Err(FormulaError::argument(
            "INDIRECT requires a reference as text",
        ));
    }
    let reference = text(args, 0)?;
    if reference.contains(':') {
        return Err(FormulaError::argument(
            "INDIRECT requires a single cell reference",
        ));
    }

    let (row, col) = parse_anchored_reference(reference.trim(), ctx.current_row, ctx.current_col)
        .ok_or_else(|| FormulaError::InvalidReference(reference.clone()))?;
    if !ctx.contains(row, col) {
        return Err(FormulaError::argument("Cell reference out of bounds"));
    }

    let cell = ctx.cell_text(row, col);
    if cell.starts_with('=') {
        return Ok(ctx
            .cached_value(row, col)
            .cloned()
            .unwrap_or(FormulaValue::Number(0.0)));
    }
    Ok(coerce_number(&cell).map_or(FormulaValue::Text(cell), FormulaValue::Number))
}

/// The reference written as the first argument, if it is one
fn reference_arg(ctx: &EvaluationContext) -> Option<CellRange> {
    let raw = ctx.raw_args.first()?;
    let raw = ctx
        .named_range(raw)
        .map_or(raw.as_str(), |named| named.refers_to.as_str());
    if raw.contains(':') {
        resolve_range(raw)
    } else {
        parse_address(raw).map(CellRange::single)
    }
}

/// ROW([reference]): 1-based row of the reference, or of the evaluating cell
pub fn fn_row(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if ctx.raw_args.is_empty() {
        return Ok(FormulaValue::Number((ctx.current_row + 1) as f64));
    }
    let range = reference_arg(ctx).ok_or(FormulaError::Invalid)?;
    Ok(FormulaValue::Number((range.start.row + 1) as f64))
}

/// COLUMN([reference]): 1-based column of the reference, or of the evaluating cell
pub fn fn_column(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if ctx.raw_args.is_empty() {
        return Ok(FormulaValue::Number((ctx.current_col + 1) as f64));
    }
    let range = reference_arg(ctx).ok_or(FormulaError::Invalid)?;
    Ok(FormulaValue::Number((range.start.col + 1) as f64))
}

/// ROWS(reference)
pub fn fn_rows(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let range = reference_arg(ctx).ok_or(FormulaError::Invalid)?;
    Ok(FormulaValue::Number(range.row_count() as f64))
}

/// COLUMNS(reference)
pub fn fn_columns(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let range = reference_arg(ctx).ok_or(FormulaError::Invalid)?;
    Ok(FormulaValue::Number(range.col_count() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Worksheet;

    use crate::evaluator::evaluate_formula;

    fn eval(formula: &str) -> FormulaValue {
        evaluate_formula(formula, &EvaluationContext::simple())
    }

    #[test]
    fn test_unimplemented_lookups() {
        assert_eq!(
            eval("=VLOOKUP(1,2)"),
            FormulaValue::error_message("VLOOKUP requires at least 3 arguments")
        );
        assert_eq!(
            eval("=MATCH(1)"),
            FormulaValue::error_message("MATCH requires at least 2 arguments")
        );
        for formula in [
            "=VLOOKUP(1,2,3)",
            "=HLOOKUP(1,2,3)",
            "=INDEX(1,2,3)",
            "=MATCH(1,2)",
            "=OFFSET(1,2,3)",
        ] {
            assert_eq!(
                eval(formula),
                FormulaValue::Error(ErrorCode::NotImplemented),
                "{formula}"
            );
        }
    }

    #[test]
    fn test_address() {
        assert_eq!(eval("=ADDRESS(1,1)"), FormulaValue::text("$A$1"));
        assert_eq!(eval("=ADDRESS(5,28,2)"), FormulaValue::text("AB$5"));
        assert_eq!(eval("=ADDRESS(5,28,3)"), FormulaValue::text("$AB5"));
        assert_eq!(eval("=ADDRESS(5,28,4)"), FormulaValue::text("AB5"));
        assert!(eval("=ADDRESS(0,1)").is_error());
        assert!(eval("=ADDRESS(1,1,5)").is_error());
    }

    #[test]
    fn test_row_and_column() {
        let sheet = Worksheet::new(10, 10);
        let ctx = EvaluationContext::new(&sheet, 3, 2);
        assert_eq!(evaluate_formula("=ROW()", &ctx), FormulaValue::Number(4.0));
        assert_eq!(evaluate_formula("=COLUMN()", &ctx), FormulaValue::Number(3.0));
        assert_eq!(evaluate_formula("=ROW(B7:C9)", &ctx), FormulaValue::Number(7.0));
        assert_eq!(evaluate_formula("=COLUMN(C9)", &ctx), FormulaValue::Number(3.0));
        assert_eq!(evaluate_formula("=ROWS(B7:C9)", &ctx), FormulaValue::Number(3.0));
        assert_eq!(evaluate_formula("=COLUMNS(B7:C9)", &ctx), FormulaValue::Number(2.0));
        assert_eq!(evaluate_formula("=COLUMNS(A1)", &ctx), FormulaValue::Number(1.0));
        assert!(evaluate_formula("=ROWS()", &ctx).is_error());
    }

    #[test]
    fn test_indirect_is_relative_to_current_cell() {
        let mut sheet = Worksheet::new(10, 10);
        sheet.set_cell("A1", "top").unwrap();
        sheet.set_cell("C3", "7").unwrap();
        sheet.set_cell("D4", "=1").unwrap();

        // Evaluating in B2: "B2" is one row and one column further
        let ctx = EvaluationContext::new(&sheet, 1, 1);
        assert_eq!(
            evaluate_formula(r#"=INDIRECT("B2")"#, &ctx),
            FormulaValue::Number(7.0)
        );
        assert_eq!(
            evaluate_formula(r#"=INDIRECT("$A$1")"#, &ctx),
            FormulaValue::text("top")
        );
        assert_eq!(
            evaluate_formula(r#"=INDIRECT("C3")"#, &ctx),
            FormulaValue::Number(0.0)
        );
        assert_eq!(
            evaluate_formula(r#"=INDIRECT("A1:B2")"#, &ctx),
            FormulaValue::error_message("INDIRECT requires a single cell reference")
        );
        assert!(evaluate_formula(r#"=INDIRECT("J10")"#, &ctx).is_error());
    }
}
