//! Financial functions
//!
//! Sign convention: money paid out is negative, money received is positive.
//! A zero rate is handled separately wherever the general formula divides by it.

use sheetcalc_core::{ErrorCode, FormulaValue};

use super::{int, num, num_or, numbers, require};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

const IRR_GUESS: f64 = 0.1;
const IRR_MAX_ITERATIONS: usize = 100;
const IRR_TOLERANCE: f64 = 1e-10;

/// PMT(rate, nper, pv, [fv], [type])
pub fn fn_pmt(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let (rate, nper, pv) = (num(args, 0)?, num(args, 1)?, num(args, 2)?);
    let (fv, kind) = (num_or(args, 3, 0.0)?, num_or(args, 4, 0.0)?);

    if rate == 0.0 {
        return Ok(FormulaValue::Number(-(pv + fv) / nper));
    }

    let pvif = (1.0 + rate).powf(nper);
    let mut pmt = rate / (pvif - 1.0) * -(pv * pvif + fv);
    if kind == 1.0 {
        pmt /= 1.0 + rate;
    }
    Ok(FormulaValue::Number(pmt))
}

/// FV(rate, nper, pmt, [pv], [type])
pub fn fn_fv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let (rate, nper, pmt) = (num(args, 0)?, num(args, 1)?, num(args, 2)?);
    let (pv, kind) = (num_or(args, 3, 0.0)?, num_or(args, 4, 0.0)?);

    if rate == 0.0 {
        return Ok(FormulaValue::Number(-(pv + pmt * nper)));
    }

    let pvif = (1.0 + rate).powf(nper);
    let fv = -(pv * pvif + pmt * (1.0 + rate * kind) * (pvif - 1.0) / rate);
    Ok(FormulaValue::Number(fv))
}

/// PV(rate, nper, pmt, [fv], [type])
pub fn fn_pv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let (rate, nper, pmt) = (num(args, 0)?, num(args, 1)?, num(args, 2)?);
    let (fv, kind) = (num_or(args, 3, 0.0)?, num_or(args, 4, 0.0)?);

    if rate == 0.0 {
        return Ok(FormulaValue::Number(-(fv + pmt * nper)));
    }

    let pvif = (1.0 + rate).powf(nper);
    let pv = -(fv + pmt * (1.0 + rate * kind) * (pvif - 1.0) / rate) / pvif;
    Ok(FormulaValue::Number(pv))
}

/// NPV(rate, values...): the first cash flow is discounted one period
pub fn fn_npv(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let rate = num(args, 0)?;
    let flows = numbers(&args[1..])?;
    Ok(FormulaValue::Number(npv(rate, &flows, 1)))
}

/// Discounted sum, the first flow falling at period `first_period`
fn npv(rate: f64, flows: &[f64], first_period: i32) -> f64 {
    flows
        .iter()
        .enumerate()
        .map(|(i, flow)| flow / (1.0 + rate).powi(i as i32 + first_period))
        .sum()
}

/// IRR(values...): the rate at which the flows' net present value is zero
pub fn fn_irr(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let flows = numbers(args)?;
    irr(&flows)
        .map(FormulaValue::Number)
        .ok_or_else(|| FormulaError::argument("Invalid cash flow sequence"))
}

/// Newton's method on the NPV with the first flow at period 0
fn irr(flows: &[f64]) -> Option<f64> {
    let has_inflow = flows.iter().any(|f| *f > 0.0);
    let has_outflow = flows.iter().any(|f| *f < 0.0);
    if !has_inflow || !has_outflow {
        return None;
    }

    let mut rate = IRR_GUESS;
    for _ in 0..IRR_MAX_ITERATIONS {
        let value = npv(rate, flows, 0);
        let derivative: f64 = flows
            .iter()
            .enumerate()
            .map(|(i, flow)| -(i as f64) * flow / (1.0 + rate).powi(i as i32 + 1))
            .sum();
        if derivative == 0.0 || !derivative.is_finite() {
            return None;
        }

        let next = rate - value / derivative;
        if !next.is_finite() || next <= -1.0 {
            return None;
        }
        if (next - rate).abs() < IRR_TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

/// RATE(nper, pmt, pv, [fv], [type], [guess])
pub fn fn_rate(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    Ok(FormulaValue::Error(ErrorCode::NotImplemented))
}

/// NPER(rate, pmt, pv, [fv], [type])
///
/// Infinite when there are no payments.
pub fn fn_nper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let (rate, pmt, pv) = (num(args, 0)?, num(args, 1)?, num(args, 2)?);
    let (fv, kind) = (num_or(args, 3, 0.0)?, num_or(args, 4, 0.0)?);

    if rate == 0.0 {
        return Ok(FormulaValue::Number(-(fv + pv) / pmt));
    }
    if pmt == 0.0 {
        return Ok(FormulaValue::Number(f64::INFINITY));
    }

    let adjusted = pmt * (1.0 + rate * kind);
    let nper = ((adjusted - fv * rate) / (adjusted + pv * rate)).ln() / (1.0 + rate).ln();
    Ok(FormulaValue::Number(nper))
}

/// SLN(cost, salvage, life): straight-line depreciation per period
pub fn fn_sln(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let (cost, salvage, life) = (num(args, 0)?, num(args, 1)?, num(args, 2)?);
    if life == 0.0 {
        return Err(FormulaError::Invalid);
    }
    Ok(FormulaValue::Number((cost - salvage) / life))
}

/// SYD(cost, salvage, life, period): sum-of-years' digits depreciation
pub fn fn_syd(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 4)?;
    let (cost, salvage) = (num(args, 0)?, num(args, 1)?);
    let (life, period) = (int(args, 2)?, int(args, 3)?);

    if life <= 0 || period <= 0 || period > life {
        return Err(FormulaError::argument("Invalid life or period"));
    }

    let (life, period) = (life as f64, period as f64);
    let sum_of_years = life * (life + 1.0) / 2.0;
    let depreciation = (life - period + 1.0) / sum_of_years * (cost - salvage);
    Ok(FormulaValue::Number(depreciation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::functions::Function;

    fn eval(f: Function, values: &[f64]) -> FormulaValue {
        let args: Vec<_> = values.iter().map(|n| FormulaValue::Number(*n)).collect();
        f.call(&args, &EvaluationContext::simple())
    }

    fn approx(value: FormulaValue, expected: f64) {
        match value {
            FormulaValue::Number(n) => assert!(
                (n - expected).abs() < 1e-6,
                "expected {expected}, got {n}"
            ),
            other => panic!("expected {expected}, got {other:?}"),
        }
    }

    #[test]
    fn test_time_value_of_money() {
        // 10,000 borrowed over 12 months at 1% a month
        approx(eval(Function::Pmt, &[0.01, 12.0, 10_000.0]), -888.487887);
        approx(eval(Function::Pmt, &[0.01, 12.0, 10_000.0, 0.0, 1.0]), -879.690977);
        approx(eval(Function::Fv, &[0.05, 10.0, -100.0]), 1257.789254);
        approx(eval(Function::Pv, &[0.05, 10.0, -100.0]), 772.173493);
        approx(eval(Function::Nper, &[0.01, -888.487887, 10_000.0]), 12.0);
    }

    #[test]
    fn test_zero_rate() {
        approx(eval(Function::Pmt, &[0.0, 10.0, 1000.0]), -100.0);
        approx(eval(Function::Fv, &[0.0, 10.0, -100.0]), 1000.0);
        approx(eval(Function::Pv, &[0.0, 10.0, -100.0]), 1000.0);
        approx(eval(Function::Nper, &[0.0, -100.0, 1000.0]), 10.0);
        assert_eq!(
            eval(Function::Nper, &[0.05, 0.0, 1000.0]),
            FormulaValue::Number(f64::INFINITY)
        );
    }

    #[test]
    fn test_npv_and_irr() {
        approx(eval(Function::Npv, &[0.1, 100.0, 100.0]), 173.553719);
        approx(eval(Function::Irr, &[-100.0, 60.0, 60.0]), 0.130662);
        assert_eq!(
            eval(Function::Irr, &[100.0, 50.0]),
            FormulaValue::error_message("Invalid cash flow sequence")
        );
    }

    #[test]
    fn test_depreciation() {
        approx(eval(Function::Sln, &[10_000.0, 1000.0, 5.0]), 1800.0);
        assert_eq!(
            eval(Function::Sln, &[10_000.0, 1000.0, 0.0]),
            FormulaValue::Error(ErrorCode::Error)
        );
        approx(eval(Function::Syd, &[10_000.0, 1000.0, 5.0, 1.0]), 3000.0);
        approx(eval(Function::Syd, &[10_000.0, 1000.0, 5.0, 5.0]), 600.0);
        approx(eval(Function::Syd, &[1000.0, 100.0, 1e18, 1.0]), 1.8e-15);
        assert_eq!(
            eval(Function::Syd, &[10_000.0, 1000.0, 5.0, 6.0]),
            FormulaValue::error_message("Invalid life or period")
        );
    }

    #[test]
    fn test_arity() {
        let error = FormulaValue::Error(ErrorCode::Error);
        assert_eq!(eval(Function::Pmt, &[0.1, 1.0]), error);
        assert_eq!(eval(Function::Rate, &[1.0, 2.0]), error);
        assert_eq!(
            eval(Function::Rate, &[12.0, -100.0, 1000.0]),
            FormulaValue::Error(ErrorCode::NotImplemented)
        );
    }
}
