//! Statistical functions

use ahash::AHashMap;
use sheetcalc_core::FormulaValue;

use super::numbers;
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

/// STDEV: sample standard deviation, needs two values
pub fn fn_stdev(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&numbers(args)?, 1)?.sqrt()))
}

/// STDEVP: population standard deviation
pub fn fn_stdevp(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&numbers(args)?, 0)?.sqrt()))
}

/// VAR: sample variance, needs two values
pub fn fn_var(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&numbers(args)?, 1)?))
}

/// VARP: population variance
pub fn fn_varp(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&numbers(args)?, 0)?))
}

/// Variance with `ddof` delta degrees of freedom
fn variance(values: &[f64], ddof: usize) -> FormulaResult<f64> {
    if values.len() <= ddof {
        return Err(FormulaError::Invalid);
    }
    let mean = mean(values);
    let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Ok(squares / (values.len() - ddof) as f64)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// MEDIAN function
pub fn fn_median(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let mut values = numbers(args)?;
    if values.is_empty() {
        return Err(FormulaError::Invalid);
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let mid = values.len() / 2;
    let median = if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    };
    Ok(FormulaValue::Number(median))
}

/// MODE: most frequent value; ties go to the value seen first
pub fn fn_mode(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = numbers(args)?;

    // bits of the value -> (count, index of first occurrence); `+ 0.0` folds -0 into 0
    let mut counts: AHashMap<u64, (usize, usize)> = AHashMap::new();
    for (i, value) in values.iter().enumerate() {
        counts.entry((value + 0.0).to_bits()).or_insert((0, i)).0 += 1;
    }

    counts
        .into_values()
        .max_by(|(a_count, a_first), (b_count, b_first)| {
            a_count.cmp(b_count).then(b_first.cmp(a_first))
        })
        .map(|(_, first)| FormulaValue::Number(values[first]))
        .ok_or(FormulaError::Invalid)
}

/// PERCENTILE(values..., k): the last value is `k` in `[0, 1]`
pub fn fn_percentile(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let (data, k) = split_last(args)?;
    Ok(FormulaValue::Number(interpolate(data, k * 100.0)?))
}

/// QUARTILE(values..., quart): the last value is the quartile `0..=4`
pub fn fn_quartile(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    let (data, quart) = split_last(args)?;
    Ok(FormulaValue::Number(interpolate(data, quart * 25.0)?))
}

fn split_last(args: &[FormulaValue]) -> FormulaResult<(Vec<f64>, f64)> {
    let mut values = numbers(args)?;
    if values.len() < 2 {
        return Err(FormulaError::Invalid);
    }
    let last = values.pop().ok_or(FormulaError::Invalid)?;
    Ok((values, last))
}

/// Percentile `p` (0 to 100) by linear interpolation between closest ranks
fn interpolate(mut data: Vec<f64>, p: f64) -> FormulaResult<f64> {
    if data.is_empty() || !(0.0..=100.0).contains(&p) {
        return Err(FormulaError::argument("Percentiles must be in the range [0, 100]"));
    }
    data.sort_by(|a, b| a.total_cmp(b));

    let rank = p / 100.0 * (data.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Ok(data[lower] + (data[upper] - data[lower]) * fraction)
}

/// CORREL: the values split into two equal halves, correlated pairwise
pub fn fn_correl(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let values = numbers(args)?;
    if values.len() < 2 || values.len() % 2 != 0 {
        return Err(FormulaError::Invalid);
    }
    let (xs, ys) = values.split_at(values.len() / 2);
    let (mx, my) = (mean(xs), mean(ys));

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }

    // Constant input gives NaN, reported as #ERROR by the caller
    Ok(FormulaValue::Number(cov / (vx * vy).sqrt()))
}
