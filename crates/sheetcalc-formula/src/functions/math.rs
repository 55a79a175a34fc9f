//! Math and array functions

use rand::Rng;
use sheetcalc_core::{ErrorCode, FormulaValue};

use super::{int, num, num_or, numbers, require};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

/// SUM function
pub fn fn_sum(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(numbers(args)?.iter().sum()))
}

/// AVERAGE function; `0` over no values
pub fn fn_average(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = numbers(args)?;
    if values.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(
        values.iter().sum::<f64>() / values.len() as f64,
    ))
}

/// COUNT function: numeric values only
pub fn fn_count(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let count = args
        .iter()
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// MIN function; `0` over no values
pub fn fn_min(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let min = numbers(args)?.into_iter().reduce(f64::min);
    Ok(FormulaValue::Number(min.unwrap_or(0.0)))
}

/// MAX function; `0` over no values
pub fn fn_max(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let max = numbers(args)?.into_iter().reduce(f64::max);
    Ok(FormulaValue::Number(max.unwrap_or(0.0)))
}

/// PRODUCT function; `0` over no values
pub fn fn_product(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let product = numbers(args)?.into_iter().reduce(|a, b| a * b);
    Ok(FormulaValue::Number(product.unwrap_or(0.0)))
}

/// ROUND(number, [digits]); halves round away from zero
pub fn fn_round(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = num(args, 0)?;
    let digits = if args.len() >= 2 { int(args, 1)? } else { 0 };
    Ok(FormulaValue::Number(round_with(value, digits as f64, f64::round)))
}

/// ROUNDUP(number, [digits]): toward positive infinity
pub fn fn_roundup(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = num(args, 0)?;
    let digits = num_or(args, 1, 0.0)?;
    Ok(FormulaValue::Number(round_with(value, digits, f64::ceil)))
}

/// ROUNDDOWN(number, [digits]): toward negative infinity
pub fn fn_rounddown(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let value = num(args, 0)?;
    let digits = num_or(args, 1, 0.0)?;
    Ok(FormulaValue::Number(round_with(value, digits, f64::floor)))
}

fn round_with(value: f64, digits: f64, op: fn(f64) -> f64) -> f64 {
    let scale = 10f64.powf(digits);
    op(value * scale) / scale
}

/// ABS function; `0` over no values
pub fn fn_abs(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    if args.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(num(args, 0)?.abs()))
}

/// SQRT function
pub fn fn_sqrt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let value = num(args, 0)?;
    if value < 0.0 {
        return Err(FormulaError::Invalid);
    }
    Ok(FormulaValue::Number(value.sqrt()))
}

/// POWER function
pub fn fn_power(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    Ok(FormulaValue::Number(num(args, 0)?.powf(num(args, 1)?)))
}

/// MOD function; the result takes the sign of the divisor
pub fn fn_mod(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let (n, d) = (num(args, 0)?, num(args, 1)?);
    if d == 0.0 {
        return Err(FormulaError::argument("Modulo by zero"));
    }
    Ok(FormulaValue::Number(n - d * (n / d).floor()))
}

/// GCD function over integer-truncated values
pub fn fn_gcd(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = integers(args)?;
    let gcd = values.into_iter().fold(0, gcd);
    Ok(FormulaValue::Number(gcd as f64))
}

/// LCM function over integer-truncated values; an error when the result
/// does not fit in 64 bits
pub fn fn_lcm(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = integers(args)?;
    let lcm = values.into_iter().try_fold(1u64, |acc, n| {
        if acc == 0 || n == 0 {
            Some(0)
        } else {
            (acc / gcd(acc, n)).checked_mul(n.unsigned_abs())
        }
    });
    lcm.map(|lcm| FormulaValue::Number(lcm as f64))
        .ok_or(FormulaError::Invalid)
}

fn integers(args: &[FormulaValue]) -> FormulaResult<Vec<i64>> {
    let values = numbers(args)?;
    if values.is_empty() || values.iter().any(|n| !n.is_finite()) {
        return Err(FormulaError::Invalid);
    }
    Ok(values.into_iter().map(|n| n.trunc() as i64).collect())
}

fn gcd(a: u64, b: i64) -> u64 {
    let (mut a, mut b) = (a, b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Largest n whose factorial is finite as an f64
const MAX_FINITE_FACTORIAL: i64 = 170;

/// FACT function; infinite past 170!
pub fn fn_fact(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let n = int(args, 0)?;
    if n < 0 {
        return Err(FormulaError::Invalid);
    }
    if n > MAX_FINITE_FACTORIAL {
        return Ok(FormulaValue::Number(f64::INFINITY));
    }
    Ok(FormulaValue::Number((1..=n).map(|i| i as f64).product()))
}

/// RAND function (volatile)
pub fn fn_rand(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(rand::thread_rng().gen::<f64>()))
}

/// RANDBETWEEN(low, high), both bounds inclusive (volatile)
pub fn fn_randbetween(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let (low, high) = (int(args, 0)?, int(args, 1)?);
    if low > high {
        return Err(FormulaError::Invalid);
    }
    Ok(FormulaValue::Number(
        rand::thread_rng().gen_range(low..=high) as f64,
    ))
}

/// PI function
pub fn fn_pi(_args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(std::f64::consts::PI))
}

/// SIN function
pub fn fn_sin(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(num(args, 0)?.sin()))
}

/// COS function
pub fn fn_cos(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(num(args, 0)?.cos()))
}

/// TAN function
pub fn fn_tan(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(num(args, 0)?.tan()))
}

/// LN function
pub fn fn_ln(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(positive(args, 0)?.ln()))
}

/// LOG10 function
pub fn fn_log10(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(positive(args, 0)?.log10()))
}

/// LOG(number, base)
pub fn fn_log(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let (value, base) = (positive(args, 0)?, positive(args, 1)?);
    if base == 1.0 {
        return Err(FormulaError::Invalid);
    }
    Ok(FormulaValue::Number(value.ln() / base.ln()))
}

fn positive(args: &[FormulaValue], i: usize) -> FormulaResult<f64> {
    let value = num(args, i)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(FormulaError::Invalid)
    }
}

/// EXP function
pub fn fn_exp(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(num(args, 0)?.exp()))
}

/// SUMPRODUCT: the values split into two equal halves, multiplied pairwise
pub fn fn_sumproduct(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let values = numbers(args)?;
    if values.len() < 2 || values.len() % 2 != 0 {
        return Err(FormulaError::Invalid);
    }
    let (left, right) = values.split_at(values.len() / 2);
    Ok(FormulaValue::Number(
        left.iter().zip(right).map(|(a, b)| a * b).sum(),
    ))
}

/// TRANSPOSE: arrays are not supported by flat argument lists
pub fn fn_transpose(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    require(args, 1)?;
    Ok(FormulaValue::Error(ErrorCode::NotImplemented))
}

/// MMULT: arrays are not supported by flat argument lists
pub fn fn_mmult(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 4)?;
    Ok(FormulaValue::Error(ErrorCode::NotImplemented))
}
