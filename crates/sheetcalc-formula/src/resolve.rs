//! Argument resolution
//!
//! Turns the raw argument strings of a function call into a flat list of values.
//! Ranges and references use absolute addressing: `B2` is always row 1, column 1
//! regardless of the evaluating cell.

use std::borrow::Cow;

use sheetcalc_core::{coerce_number, parse_address, resolve_range, FormulaValue, NamedRangeCollection};

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{evaluate_call, EvaluationContext};
use crate::expression::evaluate_expression;
use crate::parser::split_call;

/// Resolve every argument, in order, into one flat value list.
///
/// - `"text"` gives [`FormulaValue::Text`] (`""` escapes a quote)
/// - `TRUE` / `FALSE` give [`FormulaValue::Boolean`]
/// - numeric literals give [`FormulaValue::Number`]
/// - a defined name resolves as the reference it stands for
/// - a nested call (`SUM(A1:A3)`) gives its result
/// - `A1:B5` expands to one number per cell inside the sheet: blank and
///   non-numeric cells give `0`, formula cells give their cached value and are
///   skipped when not yet evaluated
/// - a single reference gives the cell's number, or nothing if it has none
/// - anything else is evaluated as an expression and dropped if that fails
pub fn resolve_arguments(args: &[String], ctx: &EvaluationContext) -> FormulaResult<Vec<FormulaValue>> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        resolve_argument(arg, ctx, &mut values)?;
    }
    Ok(values)
}

fn resolve_argument(
    arg: &str,
    ctx: &EvaluationContext,
    values: &mut Vec<FormulaValue>,
) -> FormulaResult<()> {
    if arg.is_empty() {
        return Ok(());
    }

    if let Some(text) = parse_text_literal(arg) {
        values.push(FormulaValue::Text(text));
        return Ok(());
    }

    if arg.eq_ignore_ascii_case("TRUE") {
        values.push(FormulaValue::Boolean(true));
        return Ok(());
    }
    if arg.eq_ignore_ascii_case("FALSE") {
        values.push(FormulaValue::Boolean(false));
        return Ok(());
    }

    if let Some(n) = coerce_number(arg) {
        values.push(FormulaValue::Number(n));
        return Ok(());
    }

    let reference = match ctx.named_range(arg) {
        Some(named) => named.refers_to.as_str(),
        None => arg,
    };

    if let Some((name, raw_args)) = split_call(reference) {
        values.push(evaluate_call(name, raw_args, ctx));
        return Ok(());
    }

    if reference.contains(':') {
        values.extend(range_values(reference, ctx)?);
        return Ok(());
    }

    if let Some(addr) = parse_address(reference) {
        if let Some(n) = single_cell_number(addr.row, addr.col, ctx) {
            values.push(FormulaValue::Number(n));
        }
        return Ok(());
    }

    match evaluate_expression(reference, ctx) {
        Ok(value) => values.push(value),
        Err(e) => log::trace!("dropping argument '{}': {}", arg, e),
    }
    Ok(())
}

/// Expand `start:end` into one value per cell, row by row.
///
/// Cells outside the sheet are skipped.
pub fn range_values(text: &str, ctx: &EvaluationContext) -> FormulaResult<Vec<FormulaValue>> {
    if text.split(':').count() != 2 {
        return Err(FormulaError::InvalidRange(text.to_string()));
    }

    let Some(range) = resolve_range(text) else {
        return Ok(Vec::new());
    };
    if range.cell_count() > ctx.max_range_cells {
        return Err(FormulaError::RangeTooLarge);
    }

    let Some(sheet) = ctx.sheet else {
        return Ok(Vec::new());
    };
    let (rows, cols) = (sheet.row_count(), sheet.column_count());
    if rows == 0 || cols == 0 || range.start.row >= rows || range.start.col >= cols {
        return Ok(Vec::new());
    }
    let end_row = range.end.row.min(rows - 1);
    let end_col = range.end.col.min(cols - 1);

    let mut values = Vec::new();
    for row in range.start.row..=end_row {
        for col in range.start.col..=end_col {
            let text = sheet.cell_text(row, col);
            if text.is_empty() {
                values.push(FormulaValue::Number(0.0));
            } else if text.starts_with('=') {
                if let Some(cached) = ctx.cached_value(row, col) {
                    values.push(FormulaValue::Number(cached.as_number().unwrap_or(0.0)));
                }
            } else {
                values.push(FormulaValue::Number(coerce_number(&text).unwrap_or(0.0)));
            }
        }
    }

    Ok(values)
}

/// Numeric content of a single referenced cell.
///
/// Blank cells, text and unevaluated formula cells have none.
pub fn single_cell_number(row: u32, col: u16, ctx: &EvaluationContext) -> Option<f64> {
    if !ctx.contains(row, col) {
        return None;
    }
    let text = ctx.cell_text(row, col);
    if text.starts_with('=') {
        ctx.cached_value(row, col)?.as_number()
    } else {
        coerce_number(&text)
    }
}

/// Numeric content of a cell inside an arithmetic expression: anything without a
/// number reads as `0`.
pub fn expression_cell_number(row: u32, col: u16, ctx: &EvaluationContext) -> f64 {
    single_cell_number(row, col, ctx).unwrap_or(0.0)
}

/// Parse a double-quoted literal, unescaping `""`
pub fn parse_text_literal(arg: &str) -> Option<String> {
    let inner = arg.strip_prefix('"')?.strip_suffix('"')?;
    if inner.replace("\"\"", "").contains('"') {
        return None;
    }
    Some(inner.replace("\"\"", "\""))
}

/// Replace whole-word occurrences of defined names by the reference they stand for.
///
/// Quoted text and identifiers directly followed by `(` (function names) are
/// left alone.
pub fn substitute_names<'t>(text: &'t str, names: Option<&NamedRangeCollection>) -> Cow<'t, str> {
    let Some(names) = names.filter(|n| !n.is_empty()) else {
        return Cow::Borrowed(text);
    };

    let mut out = String::with_capacity(text.len());
    let mut changed = false;
    let mut in_quotes = false;
    let mut chars = text.char_indices().peekable();
    let mut prev: Option<char> = None;

    while let Some((start, c)) = chars.next() {
        if c == '"' {
            in_quotes = !in_quotes;
        }

        let starts_word = !in_quotes
            && (c.is_ascii_alphabetic() || c == '_')
            && !prev.map_or(false, is_word_char);
        if !starts_word {
            out.push(c);
            prev = Some(c);
            continue;
        }

        let mut end = start + c.len_utf8();
        let mut last = c;
        while let Some(&(i, next)) = chars.peek() {
            if !is_word_char(next) {
                break;
            }
            end = i + next.len_utf8();
            last = next;
            chars.next();
        }

        let word = &text[start..end];
        let is_call = text[end..].starts_with('(');
        match names.get(word) {
            Some(named) if !is_call => {
                out.push_str(&named.refers_to);
                changed = true;
            }
            _ => out.push_str(word),
        }
        prev = Some(last);
    }

    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(text)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::{NamedRange, Worksheet};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_literals() {
        let ctx = EvaluationContext::simple();
        let values = resolve_arguments(
            &args(&["1.5", r#""say ""hi""""#, "true", "FALSE", " 2 "]),
            &ctx,
        )
        .unwrap();
        assert_eq!(
            values,
            vec![
                FormulaValue::Number(1.5),
                FormulaValue::text(r#"say "hi""#),
                FormulaValue::Boolean(true),
                FormulaValue::Boolean(false),
                FormulaValue::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_single_references() {
        let mut sheet = Worksheet::new(5, 5);
        sheet.set_cell("A1", "4").unwrap();
        sheet.set_cell("A2", "text").unwrap();
        sheet.set_cell("A3", "=A1").unwrap();

        let ctx = EvaluationContext::new(&sheet, 0, 0);
        // Text, blank, uncached formula and out-of-sheet cells are dropped
        let values =
            resolve_arguments(&args(&["A1", "A2", "A3", "A4", "Z99", "nonsense"]), &ctx).unwrap();
        assert_eq!(values, vec![FormulaValue::Number(4.0)]);
    }

    #[test]
    fn test_range_order_and_bounds() {
        let mut sheet = Worksheet::new(3, 2);
        sheet.set_cell("A1", "1").unwrap();
        sheet.set_cell("B1", "2").unwrap();
        sheet.set_cell("A2", "3").unwrap();
        sheet.set_cell("B2", "x").unwrap();

        let ctx = EvaluationContext::new(&sheet, 0, 0);
        let numbers = |text: &str| -> Vec<f64> {
            range_values(text, &ctx)
                .unwrap()
                .iter()
                .filter_map(|v| v.as_number())
                .collect()
        };

        assert_eq!(numbers("A1:B2"), vec![1.0, 2.0, 3.0, 0.0]);
        assert_eq!(numbers("B2:A1"), numbers("A1:B2"));
        // Rows and columns beyond the sheet are skipped
        assert_eq!(numbers("A2:D9"), vec![3.0, 0.0, 0.0, 0.0]);
        assert_eq!(numbers("C1:D2"), Vec::<f64>::new());
    }

    #[test]
    fn test_text_literal_parsing() {
        assert_eq!(parse_text_literal(r#""abc""#), Some("abc".to_string()));
        assert_eq!(parse_text_literal(r#""""#), Some(String::new()));
        assert_eq!(parse_text_literal(r#""a" & "b""#), None);
        assert_eq!(parse_text_literal("abc"), None);
        assert_eq!(parse_text_literal("\""), None);
    }

    #[test]
    fn test_substitute_names() {
        let mut names = NamedRangeCollection::new();
        names
            .define(NamedRange::new("Rate", "B1").unwrap())
            .unwrap();
        names
            .define(NamedRange::new("Sales", "A1:A4").unwrap())
            .unwrap();
        let names = Some(&names);

        assert_eq!(substitute_names("Rate*2", names), "B1*2");
        assert_eq!(substitute_names("SUM(Sales)+rate", names), "SUM(A1:A4)+B1");
        assert_eq!(substitute_names("Rates+SalesTax", names), "Rates+SalesTax");
        assert_eq!(substitute_names(r#""Rate"&Rate"#, names), r#""Rate"&B1"#);
        assert_eq!(substitute_names("Rate(1)", names), "Rate(1)");
        assert_eq!(substitute_names("Rate*2", None), "Rate*2");
    }
}
