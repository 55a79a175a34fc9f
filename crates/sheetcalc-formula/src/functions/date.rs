//! Date and time functions
//!
//! Dates are exchanged as text (`2024-01-31`, `2024-01-31 09:30:00`). Text that
//! matches none of the accepted date formats is read as the evaluation clock's
//! "now" rather than failing.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use sheetcalc_core::FormulaValue;

use super::{int, require, text};
use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%d/%m/%Y"];
const DATE_OUTPUT: &str = "%Y-%m-%d";

/// Parse date text, falling back to the context clock
pub fn parse_date(value: &FormulaValue, ctx: &EvaluationContext) -> NaiveDate {
    let text = value.as_text();
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .unwrap_or_else(|| ctx.now.date())
}

/// Parse time text (`HH:MM:SS`, `HH:MM` or a full timestamp), falling back to
/// the context clock
pub fn parse_time(value: &FormulaValue, ctx: &EvaluationContext) -> NaiveTime {
    let text = value.as_text();
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|dt| dt.time()))
        .unwrap_or_else(|_| ctx.now.time())
}

fn date_arg(args: &[FormulaValue], i: usize, ctx: &EvaluationContext) -> FormulaResult<NaiveDate> {
    args.get(i)
        .map(|value| parse_date(value, ctx))
        .ok_or(FormulaError::Invalid)
}

fn time_arg(args: &[FormulaValue], i: usize, ctx: &EvaluationContext) -> FormulaResult<NaiveTime> {
    args.get(i)
        .map(|value| parse_time(value, ctx))
        .ok_or(FormulaError::Invalid)
}

fn date_text(date: NaiveDate) -> FormulaValue {
    FormulaValue::Text(date.format(DATE_OUTPUT).to_string())
}

/// NOW function (volatile)
pub fn fn_now(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Text(
        ctx.now.format("%Y-%m-%d %H:%M:%S").to_string(),
    ))
}

/// TODAY function (volatile)
pub fn fn_today(_args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(date_text(ctx.now.date()))
}

/// DATE(year, month, day)
pub fn fn_date(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let (year, month, day) = (int(args, 0)?, int(args, 1)?, int(args, 2)?);
    let date = i32::try_from(year).ok().and_then(|y| {
        NaiveDate::from_ymd_opt(y, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
    });
    date.map(date_text)
        .ok_or_else(|| FormulaError::argument("Invalid date"))
}

/// TIME(hour, minute, second)
pub fn fn_time(args: &[FormulaValue], _ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let parts = [int(args, 0)?, int(args, 1)?, int(args, 2)?];
    let time = match parts.map(u32::try_from) {
        [Ok(h), Ok(m), Ok(s)] => NaiveTime::from_hms_opt(h, m, s),
        _ => None,
    };
    time.map(|t| FormulaValue::Text(t.format("%H:%M:%S").to_string()))
        .ok_or_else(|| FormulaError::argument("Invalid time"))
}

/// DAY function
pub fn fn_day(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(date_arg(args, 0, ctx)?.day() as f64))
}

/// MONTH function
pub fn fn_month(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(date_arg(args, 0, ctx)?.month() as f64))
}

/// YEAR function
pub fn fn_year(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(date_arg(args, 0, ctx)?.year() as f64))
}

/// WEEKDAY(date, [type]): Monday is 1 for type 1 (the default), 0 otherwise
pub fn fn_weekday(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let date = date_arg(args, 0, ctx)?;
    let offset = if args.len() < 2 || int(args, 1)? == 1 { 1 } else { 0 };
    Ok(FormulaValue::Number(
        (date.weekday().num_days_from_monday() + offset) as f64,
    ))
}

/// HOUR function
pub fn fn_hour(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(time_arg(args, 0, ctx)?.hour() as f64))
}

/// MINUTE function
pub fn fn_minute(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(time_arg(args, 0, ctx)?.minute() as f64))
}

/// SECOND function
pub fn fn_second(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    Ok(FormulaValue::Number(time_arg(args, 0, ctx)?.second() as f64))
}

/// Shift a date by whole months, clamping the day to the target month's length
fn add_months(date: NaiveDate, months: i64) -> FormulaResult<NaiveDate> {
    let shift = Months::new(u32::try_from(months.unsigned_abs()).map_err(|_| FormulaError::Invalid)?);
    let shifted = if months >= 0 {
        date.checked_add_months(shift)
    } else {
        date.checked_sub_months(shift)
    };
    shifted.ok_or(FormulaError::Invalid)
}

/// EDATE(start, months)
pub fn fn_edate(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let date = add_months(date_arg(args, 0, ctx)?, int(args, 1)?)?;
    Ok(date_text(date))
}

/// EOMONTH(start, months): last day of the shifted month
pub fn fn_eomonth(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let shifted = add_months(date_arg(args, 0, ctx)?, int(args, 1)?)?;
    let first = shifted.with_day(1).ok_or(FormulaError::Invalid)?;
    let last = add_months(first, 1)?.pred_opt().ok_or(FormulaError::Invalid)?;
    Ok(date_text(last))
}

/// NETWORKDAYS(start, end): weekdays between the dates, both included.
///
/// A reversed range gives a negative count.
pub fn fn_networkdays(
    args: &[FormulaValue],
    ctx: &EvaluationContext,
) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let (start, end) = (date_arg(args, 0, ctx)?, date_arg(args, 1, ctx)?);

    let days = (end - start).num_days() + 1;
    let mut weekend_days = days.div_euclid(7) * 2;
    let first_weekday = start.weekday().num_days_from_monday() as i64;
    for i in 0..days.rem_euclid(7) {
        if (first_weekday + i) % 7 >= 5 {
            weekend_days += 1;
        }
    }

    Ok(FormulaValue::Number((days - weekend_days) as f64))
}

/// WORKDAY(start, days): the date `days` weekdays after start.
///
/// Only forward moves are supported; zero or negative days return the start date.
pub fn fn_workday(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 2)?;
    let mut date = date_arg(args, 0, ctx)?;
    let mut remaining = int(args, 1)?;

    // Any seven consecutive days hold exactly five weekdays
    if remaining > 5 {
        let weeks = (remaining - 1) / 5;
        let days = u64::try_from(weeks)
            .ok()
            .and_then(|w| w.checked_mul(7))
            .ok_or(FormulaError::Invalid)?;
        date = date
            .checked_add_days(Days::new(days))
            .ok_or(FormulaError::Invalid)?;
        remaining -= weeks * 5;
    }

    while remaining > 0 {
        date = date.succ_opt().ok_or(FormulaError::Invalid)?;
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            remaining -= 1;
        }
    }

    Ok(date_text(date))
}

/// DATEDIF(start, end, unit) with unit `Y`, `M` or `D`
pub fn fn_datedif(args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    require(args, 3)?;
    let (start, end) = (date_arg(args, 0, ctx)?, date_arg(args, 1, ctx)?);

    let diff = match text(args, 2)?.to_uppercase().as_str() {
        "Y" => (end.year() - start.year()) as i64,
        "M" => {
            (end.year() - start.year()) as i64 * 12 + end.month() as i64 - start.month() as i64
        }
        "D" => (end - start).num_days(),
        _ => return Err(FormulaError::argument("Invalid unit")),
    };
    Ok(FormulaValue::Number(diff as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::evaluator::evaluate_formula;

    fn fixed_now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap()
    }

    fn eval(formula: &str) -> FormulaValue {
        let ctx = EvaluationContext::simple().with_now(fixed_now());
        evaluate_formula(formula, &ctx)
    }

    #[test]
    fn test_clock_functions() {
        assert_eq!(eval("=NOW()"), FormulaValue::text("2024-03-15 14:30:05"));
        assert_eq!(eval("=TODAY()"), FormulaValue::text("2024-03-15"));
    }

    #[test]
    fn test_date_and_time_construction() {
        assert_eq!(eval("=DATE(2024,2,29)"), FormulaValue::text("2024-02-29"));
        assert_eq!(
            eval("=DATE(2023,2,29)"),
            FormulaValue::error_message("Invalid date")
        );
        assert_eq!(eval("=TIME(9,5,0)"), FormulaValue::text("09:05:00"));
        assert_eq!(
            eval("=TIME(25,0,0)"),
            FormulaValue::error_message("Invalid time")
        );
        assert!(eval("=DATE(2024,1)").is_error());
    }

    #[test]
    fn test_date_parts_accept_several_formats() {
        assert_eq!(eval(r#"=DAY("2024-01-31")"#), FormulaValue::Number(31.0));
        assert_eq!(eval(r#"=MONTH("12/25/2023")"#), FormulaValue::Number(12.0));
        assert_eq!(eval(r#"=YEAR("25-12-2022")"#), FormulaValue::Number(2022.0));
        assert_eq!(eval(r#"=DAY("31/01/2021")"#), FormulaValue::Number(31.0));
    }

    #[test]
    fn test_unparseable_dates_read_as_now() {
        assert_eq!(eval(r#"=YEAR("not a date")"#), FormulaValue::Number(2024.0));
        assert_eq!(eval(r#"=HOUR("nonsense")"#), FormulaValue::Number(14.0));
    }

    #[test]
    fn test_time_parts() {
        assert_eq!(eval(r#"=HOUR("09:45:30")"#), FormulaValue::Number(9.0));
        assert_eq!(eval(r#"=MINUTE("09:45")"#), FormulaValue::Number(45.0));
        assert_eq!(
            eval(r#"=SECOND("2024-01-01 10:20:30")"#),
            FormulaValue::Number(30.0)
        );
    }

    #[test]
    fn test_weekday() {
        // 2024-03-11 is a Monday
        assert_eq!(eval(r#"=WEEKDAY("2024-03-11")"#), FormulaValue::Number(1.0));
        assert_eq!(eval(r#"=WEEKDAY("2024-03-17")"#), FormulaValue::Number(7.0));
        assert_eq!(eval(r#"=WEEKDAY("2024-03-11",2)"#), FormulaValue::Number(0.0));
    }

    #[test]
    fn test_month_arithmetic() {
        assert_eq!(eval(r#"=EDATE("2024-01-31",1)"#), FormulaValue::text("2024-02-29"));
        assert_eq!(eval(r#"=EDATE("2024-03-15",-3)"#), FormulaValue::text("2023-12-15"));
        assert_eq!(eval(r#"=EOMONTH("2024-01-10",1)"#), FormulaValue::text("2024-02-29"));
        assert_eq!(eval(r#"=EOMONTH("2024-12-05",0)"#), FormulaValue::text("2024-12-31"));
    }

    #[test]
    fn test_workdays() {
        // Monday to Friday of one week, then two full weeks
        assert_eq!(
            eval(r#"=NETWORKDAYS("2024-03-11","2024-03-15")"#),
            FormulaValue::Number(5.0)
        );
        assert_eq!(
            eval(r#"=NETWORKDAYS("2024-03-11","2024-03-24")"#),
            FormulaValue::Number(10.0)
        );
        assert_eq!(
            eval(r#"=NETWORKDAYS("2024-03-16","2024-03-17")"#),
            FormulaValue::Number(0.0)
        );
        // Friday plus one workday is Monday
        assert_eq!(
            eval(r#"=WORKDAY("2024-03-15",1)"#),
            FormulaValue::text("2024-03-18")
        );
        assert_eq!(
            eval(r#"=WORKDAY("2024-03-15",0)"#),
            FormulaValue::text("2024-03-15")
        );
        assert_eq!(
            eval(r#"=WORKDAY("2024-03-15",10)"#),
            FormulaValue::text("2024-03-29")
        );
        assert_eq!(
            eval(r#"=WORKDAY("2024-03-16",6)"#),
            FormulaValue::text("2024-03-25")
        );
        assert!(eval(r#"=WORKDAY("2024-03-15",1E15)"#).is_error());
    }

    #[test]
    fn test_datedif() {
        assert_eq!(
            eval(r#"=DATEDIF("2020-06-01","2024-03-15","Y")"#),
            FormulaValue::Number(4.0)
        );
        assert_eq!(
            eval(r#"=DATEDIF("2023-11-20","2024-03-15","m")"#),
            FormulaValue::Number(4.0)
        );
        assert_eq!(
            eval(r#"=DATEDIF("2024-03-01","2024-03-15","D")"#),
            FormulaValue::Number(14.0)
        );
        assert_eq!(
            eval(r#"=DATEDIF("2024-03-01","2024-03-15","W")"#),
            FormulaValue::error_message("Invalid unit")
        );
    }
}
