//! Web functions

use sheetcalc_core::{ErrorCode, FormulaValue};

use super::text;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

/// ENCODEURL(text): percent-encode everything except unreserved characters and `/`
pub fn fn_encodeurl(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let raw = text(args, 0)?;
    let encoded = urlencoding::encode(&raw).replace("%2F", "/");
    Ok(FormulaValue::Text(encoded))
}

/// HYPERLINK(url, [label]): rendered as `label (url)`
pub fn fn_hyperlink(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let Some(url) = args.first().map(FormulaValue::as_text) else {
        return Err(FormulaError::argument(
            "HYPERLINK requires at least 1 argument",
        ));
    };
    let label = args.get(1).map_or_else(|| url.clone(), FormulaValue::as_text);
    Ok(FormulaValue::Text(format!("{label} ({url})")))
}

/// Functions that need network access or images
pub fn fn_not_implemented(
    _args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Error(ErrorCode::NotImplemented))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::evaluator::evaluate_formula;

    fn eval(formula: &str) -> FormulaValue {
        evaluate_formula(formula, &EvaluationContext::simple())
    }

    #[test]
    fn test_encodeurl() {
        assert_eq!(
            eval(r#"=ENCODEURL("a b/c?d=é")"#),
            FormulaValue::text("a%20b/c%3Fd%3D%C3%A9")
        );
        assert!(eval("=ENCODEURL()").is_error());
    }

    #[test]
    fn test_hyperlink() {
        assert_eq!(
            eval(r#"=HYPERLINK("https://example.com","Example")"#),
            FormulaValue::text("Example (https://example.com)")
        );
        assert_eq!(
            eval(r#"=HYPERLINK("https://example.com")"#),
            FormulaValue::text("https://example.com (https://example.com)")
        );
        assert_eq!(
            eval("=HYPERLINK()"),
            FormulaValue::error_message("HYPERLINK requires at least 1 argument")
        );
    }

    #[test]
    fn test_external_data_not_implemented() {
        for formula in [
            r#"=GOOGLEFINANCE("GOOG")"#,
            r#"=IMPORTDATA("https://example.com/data.csv")"#,
            r#"=IMPORTRANGE("key","A1:B2")"#,
            r#"=IMAGE("https://example.com/logo.png")"#,
        ] {
            assert_eq!(
                eval(formula),
                FormulaValue::Error(ErrorCode::NotImplemented),
                "{formula}"
            );
        }
    }
}
