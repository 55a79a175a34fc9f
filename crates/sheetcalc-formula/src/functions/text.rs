//! Text functions
//!
//! Character positions are 1-based. Start and length arguments follow slice
//! semantics: out-of-range bounds are clamped and negative bounds count back
//! from the end of the text.

use sheetcalc_core::FormulaValue;

use super::{int, require, text};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

/// Longest text REPT will build
const MAX_TEXT_LEN: usize = 32_767;

/// Most decimal places TEXT and DOLLAR will format
const MAX_DECIMALS: usize = 127;

/// CONCATENATE function
pub fn fn_concatenate(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(
        args.iter().map(FormulaValue::as_text).collect(),
    ))
}

/// LEFT(text, count)
pub fn fn_left(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let (s, n) = (text(args, 0)?, int(args, 1)?);
    Ok(FormulaValue::Text(slice(&s, None, Some(n))))
}

/// RIGHT(text, count)
pub fn fn_right(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let (s, n) = (text(args, 0)?, int(args, 1)?);
    if n == 0 {
        return Ok(FormulaValue::Text(String::new()));
    }
    Ok(FormulaValue::Text(slice(&s, Some(n.saturating_neg()), None)))
}

/// MID(text, start, count)
pub fn fn_mid(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let s = text(args, 0)?;
    let (start, count) = (int(args, 1)?, int(args, 2)?);
    Ok(FormulaValue::Text(slice(
        &s,
        Some(start.saturating_sub(1)),
        Some(start.saturating_add(count).saturating_sub(1)),
    )))
}

/// LEN function; `0` without an argument
pub fn fn_len(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let len = args.first().map_or(0, |v| v.as_text().chars().count());
    Ok(FormulaValue::Number(len as f64))
}

/// LOWER function
pub fn fn_lower(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(map_text(args, |s| s.to_lowercase()))
}

/// UPPER function
pub fn fn_upper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(map_text(args, |s| s.to_uppercase()))
}

/// PROPER: capitalize the first letter of every word, lowercase the rest
pub fn fn_proper(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(map_text(args, |s| {
        let mut out = String::with_capacity(s.len());
        let mut after_letter = false;
        for c in s.chars() {
            if after_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            after_letter = c.is_alphabetic();
        }
        out
    }))
}

/// TRIM: strip leading and trailing whitespace
pub fn fn_trim(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(map_text(args, |s| s.trim().to_string()))
}

/// Apply `f` to the text of the first argument; empty text without one
fn map_text(args: &[FormulaValue], f: impl Fn(&str) -> String) -> FormulaValue {
    FormulaValue::Text(args.first().map_or_else(String::new, |v| f(&v.as_text())))
}

/// REPLACE(text, start, count, new_text)
pub fn fn_replace(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 4)?;
    let s = text(args, 0)?;
    let (start, count) = (int(args, 1)?, int(args, 2)?);
    let new_text = text(args, 3)?;

    let mut out = slice(&s, None, Some(start.saturating_sub(1)));
    out.push_str(&new_text);
    out.push_str(&slice(
        &s,
        Some(start.saturating_add(count).saturating_sub(1)),
        None,
    ));
    Ok(FormulaValue::Text(out))
}

/// SUBSTITUTE(text, old, new, [count]): replace the first `count` occurrences,
/// all of them when `count` is absent or negative
pub fn fn_substitute(
    args: &[FormulaValue],
    _ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let (s, old, new) = (text(args, 0)?, text(args, 1)?, text(args, 2)?);
    let count = if args.len() >= 4 { int(args, 3)? } else { -1 };

    let result = if count < 0 {
        s.replace(&old, &new)
    } else {
        s.replacen(&old, &new, count as usize)
    };
    Ok(FormulaValue::Text(result))
}

/// REPT(text, times)
pub fn fn_rept(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let s = text(args, 0)?;
    let times = int(args, 1)?.max(0) as usize;
    if s.chars().count().saturating_mul(times) > MAX_TEXT_LEN {
        return Err(FormulaError::argument("Text result too long"));
    }
    Ok(FormulaValue::Text(s.repeat(times)))
}

/// FIND(text, substring, [start]): 1-based position, `0` when absent
pub fn fn_find(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    find_with(args, |s| s.to_string())
}

/// SEARCH(text, substring, [start]): case-insensitive FIND
pub fn fn_search(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    find_with(args, str::to_lowercase)
}

fn find_with(args: &[FormulaValue], normalize: fn(&str) -> String) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let haystack = normalize(&text(args, 0)?);
    let needle = normalize(&text(args, 1)?);
    let start = if args.len() >= 3 {
        int(args, 2)?.saturating_sub(1)
    } else {
        0
    };

    let position = find_from(&haystack, &needle, start).map_or(0, |i| i + 1);
    Ok(FormulaValue::Number(position as f64))
}

/// Character index of `needle` in `haystack`, searching from character `start`
fn find_from(haystack: &str, needle: &str, start: i64) -> Option<usize> {
    let len = haystack.chars().count() as i64;
    let start = if start < 0 { (start + len).max(0) } else { start };
    if start > len {
        return None;
    }

    let start = start as usize;
    let byte_start = haystack
        .char_indices()
        .nth(start)
        .map_or(haystack.len(), |(b, _)| b);
    let rest = &haystack[byte_start..];
    rest.find(needle)
        .map(|b| start + rest[..b].chars().count())
}

/// CHAR(code)
pub fn fn_char(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let code = u32::try_from(int(args, 0)?).map_err(|_| FormulaError::Invalid)?;
    let c = char::from_u32(code).ok_or(FormulaError::Invalid)?;
    Ok(FormulaValue::Text(c.to_string()))
}

/// CODE(text): code point of the first character
pub fn fn_code(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let c = text(args, 0)?.chars().next().ok_or(FormulaError::Invalid)?;
    Ok(FormulaValue::Number(c as u32 as f64))
}

/// EXACT(a, b): case-sensitive comparison
pub fn fn_exact(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    Ok(FormulaValue::Boolean(text(args, 0)? == text(args, 1)?))
}

/// TEXT(value, format)
///
/// Supports `0.00%`, `0.00`, `#,##0`, `#,##0.00` and currency formats starting
/// with `$`, whose decimals are the zeros after the `.`. Any other format
/// returns the value unchanged.
pub fn fn_text(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let value = &args[0];
    let format = text(args, 1)?;

    let number = || {
        value
            .as_number()
            .ok_or_else(|| FormulaError::argument("Invalid formatting"))
    };

    let formatted = match format.as_str() {
        "0.00%" => format!("{:.2}%", number()? * 100.0),
        "0.00" => format!("{:.2}", number()?),
        "#,##0" => group_thousands(number()?.trunc(), 0),
        "#,##0.00" => group_thousands(number()?, 2),
        f if f.starts_with('$') => {
            let decimals = f
                .split_once('.')
                .map_or(0, |(_, frac)| frac.matches('0').count());
            format!("${}", group_thousands(number()?, decimals))
        }
        _ => value.as_text(),
    };
    Ok(FormulaValue::Text(formatted))
}

/// DOLLAR(value, [decimals]): currency text such as `$1,234.57`
pub fn fn_dollar(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let invalid = || FormulaError::argument("Invalid value for currency formatting");

    let value = args.first().ok_or(FormulaError::Invalid)?;
    let value = value.as_number().ok_or_else(invalid)?;
    let decimals = if args.len() >= 2 { int(args, 1)? } else { 2 };
    let decimals = usize::try_from(decimals)
        .ok()
        .filter(|d| *d <= MAX_DECIMALS)
        .ok_or_else(invalid)?;

    Ok(FormulaValue::Text(format!(
        "${}",
        group_thousands(value, decimals)
    )))
}

/// Fixed-point text with `,` between groups of three integer digits.
///
/// At most `MAX_DECIMALS` decimal places are written.
pub(crate) fn group_thousands(value: f64, decimals: usize) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut out = String::with_capacity(formatted.len() + int_part.len() / 3);
    if value < 0.0 {
        out.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Characters `start..end` of `s`, with negative bounds counting from the end
fn slice(s: &str, start: Option<i64>, end: Option<i64>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len() as i64;
    let clamp = |i: i64| if i < 0 { (i + len).max(0) } else { i.min(len) };

    let start = start.map_or(0, clamp);
    let end = end.map_or(len, clamp);
    if start >= end {
        return String::new();
    }
    chars[start as usize..end as usize].iter().collect()
}
