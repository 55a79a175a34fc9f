//! Information functions

use sheetcalc_core::{parse_address, ErrorCode, FormulaValue};

use super::int;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

/// ISBLANK function
///
/// A cell reference is blank when the cell holds no text; any other argument
/// is blank when it is missing or falsy.
pub fn fn_isblank(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if let Some(addr) = ctx.raw_args.first().and_then(|raw| parse_address(raw)) {
        return Ok(FormulaValue::Boolean(
            ctx.cell_text(addr.row, addr.col).is_empty(),
        ));
    }
    Ok(FormulaValue::Boolean(
        args.first().map_or(true, |v| !v.is_truthy()),
    ))
}

/// Error value, or text spelled like one
fn error_text(value: &FormulaValue) -> Option<String> {
    match value {
        FormulaValue::Error(e) => Some(e.to_string()),
        FormulaValue::Text(s) if s.starts_with('#') => Some(s.clone()),
        _ => None,
    }
}

fn first(args: &[FormulaValue]) -> FormulaResult<&FormulaValue> {
    args.first().ok_or(FormulaError::Invalid)
}

/// ISERROR function
pub fn fn_iserror(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(error_text(first(args)?).is_some()))
}

/// ISLOGICAL function
pub fn fn_islogical(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(
        first(args)?,
        FormulaValue::Boolean(_)
    )))
}

/// ISNA function
pub fn fn_isna(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let is_na = error_text(first(args)?).map_or(false, |text| text == "#N/A");
    Ok(FormulaValue::Boolean(is_na))
}

/// ISTEXT function
pub fn fn_istext(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = first(args)?;
    Ok(FormulaValue::Boolean(
        matches!(value, FormulaValue::Text(_)) && error_text(value).is_none(),
    ))
}

/// ISNUMBER function
pub fn fn_isnumber(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(
        first(args)?,
        FormulaValue::Number(_)
    )))
}

/// ISEVEN function (the value is truncated first)
pub fn fn_iseven(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(int(args, 0)?.rem_euclid(2) == 0))
}

/// ISODD function (the value is truncated first)
pub fn fn_isodd(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(int(args, 0)?.rem_euclid(2) == 1))
}

/// NA function
pub fn fn_na(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Error(ErrorCode::Na))
}

/// ERROR.TYPE: the number of a classic error code, `#N/A` for anything else
pub fn fn_error_type(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let code = match first(args)?.as_text().as_str() {
        "#NULL!" => 1.0,
        "#DIV/0!" => 2.0,
        "#VALUE!" => 3.0,
        "#REF!" => 4.0,
        "#NAME?" => 5.0,
        "#NUM!" => 6.0,
        "#N/A" => 7.0,
        _ => return Ok(FormulaValue::Error(ErrorCode::Na)),
    };
    Ok(FormulaValue::Number(code))
}

/// INFO(type): information about the running environment
pub fn fn_info(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let Some(kind) = args.first() else {
        return Err(FormulaError::argument("INFO requires 1 argument"));
    };

    let info = match kind.as_text().to_uppercase().as_str() {
        "DIRECTORY" => std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .map_err(|e| FormulaError::argument(e.to_string()))?,
        "NUMFILE" => "1".to_string(),
        "OSVERSION" => format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        "RECALC" => "Automatic".to_string(),
        "RELEASE" => format!("sheetcalc {}", env!("CARGO_PKG_VERSION")),
        _ => return Err(FormulaError::argument("Unknown INFO type")),
    };
    Ok(FormulaValue::Text(info))
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
    fn test_type_checks() {
        assert_eq!(eval("=ISNUMBER(5)"), FormulaValue::Boolean(true));
        assert_eq!(eval(r#"=ISNUMBER("x")"#), FormulaValue::Boolean(false));
        assert_eq!(eval(r#"=ISTEXT("x")"#), FormulaValue::Boolean(true));
        assert_eq!(eval(r##"=ISTEXT("#N/A")"##), FormulaValue::Boolean(false));
        assert_eq!(eval("=ISLOGICAL(TRUE)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISLOGICAL(1)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=ISERROR(SQRT(-1))"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISERROR(1)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=ISNA(NA())"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISNA(SQRT(-1))"), FormulaValue::Boolean(false));
        assert_eq!(eval("=ISERROR()"), FormulaValue::Error(ErrorCode::Error));
    }

    #[test]
    fn test_isblank() {
        let mut sheet = Worksheet::new(5, 5);
        sheet.set_cell("A1", "x").unwrap();
        let ctx = EvaluationContext::new(&sheet, 4, 4);

        assert_eq!(
            evaluate_formula("=ISBLANK(A1)", &ctx),
            FormulaValue::Boolean(false)
        );
        assert_eq!(
            evaluate_formula("=ISBLANK(B2)", &ctx),
            FormulaValue::Boolean(true)
        );
        assert_eq!(eval("=ISBLANK()"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISBLANK(1)"), FormulaValue::Boolean(false));
    }

    #[test]
    fn test_parity() {
        assert_eq!(eval("=ISEVEN(4)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISEVEN(-3)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=ISODD(-3)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=ISODD(2.9)"), FormulaValue::Boolean(false));
    }

    #[test]
    fn test_error_type() {
        assert_eq!(eval(r##"=ERROR.TYPE("#DIV/0!")"##), FormulaValue::Number(2.0));
        assert_eq!(eval("=ERROR.TYPE(NA())"), FormulaValue::Number(7.0));
        assert_eq!(eval("=ERROR.TYPE(1)"), FormulaValue::Error(ErrorCode::Na));
    }

    #[test]
    fn test_info() {
        assert_eq!(eval(r#"=INFO("numfile")"#), FormulaValue::text("1"));
        assert_eq!(eval(r#"=INFO("RECALC")"#), FormulaValue::text("Automatic"));
        assert!(eval(r#"=INFO("RELEASE")"#)
            .as_text()
            .starts_with("sheetcalc "));
        assert_eq!(
            eval(r#"=INFO("bogus")"#),
            FormulaValue::error_message("Unknown INFO type")
        );
        assert_eq!(
            eval("=INFO()"),
            FormulaValue::error_message("INFO requires 1 argument")
        );
    }
}
