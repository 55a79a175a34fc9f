//! Logical functions

use sheetcalc_core::FormulaValue;

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

/// IF(condition, value_if_true, value_if_false)
///
/// Exactly three values are required; the chosen branch is returned as is.
pub fn fn_if(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    match args {
        [condition, if_true, if_false] => Ok(if condition.is_truthy() {
            if_true.clone()
        } else {
            if_false.clone()
        }),
        _ => Err(FormulaError::argument("IF requires 3 arguments")),
    }
}

/// AND function; TRUE over no values
pub fn fn_and(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(args.iter().all(FormulaValue::is_truthy)))
}

/// OR function; FALSE over no values
pub fn fn_or(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(args.iter().any(FormulaValue::is_truthy)))
}

/// NOT function
pub fn fn_not(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = args.first().ok_or(FormulaError::Invalid)?;
    Ok(FormulaValue::Boolean(!value.is_truthy()))
}

/// XOR: TRUE when an odd number of values are truthy
pub fn fn_xor(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if args.is_empty() {
        return Err(FormulaError::Invalid);
    }
    let truthy = args.iter().filter(|v| v.is_truthy()).count();
    Ok(FormulaValue::Boolean(truthy % 2 == 1))
}

/// TRUE function
pub fn fn_true(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE function
pub fn fn_false(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}
