//! Built-in functions
//!
//! Every function receives the flat list of resolved argument values and returns
//! exactly one [`FormulaValue`]. The set of functions is closed: [`Function`] is
//! generated from the table below, so adding one means adding a line here.

pub mod date;
pub mod financial;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;
pub mod web;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use sheetcalc_core::{ErrorCode, FormulaValue};

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::EvaluationContext;

/// Function implementation signature
///
/// Functions can consult the evaluation context (current cell, sheet, clock,
/// raw argument text) when the resolved values alone are not enough.
pub type FunctionImpl = fn(&[FormulaValue], &EvaluationContext) -> FormulaResult<FormulaValue>;

/// Function category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Math,
    Statistical,
    Logical,
    Information,
    Text,
    DateTime,
    Lookup,
    Financial,
    Array,
    Web,
}

macro_rules! define_functions {
    ($($variant:ident => $name:literal, $category:ident, $implementation:path;)+) => {
        /// A built-in function
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Function {
            $($variant,)+
        }

        impl Function {
            /// Every built-in function, in table order
            pub const ALL: &'static [Function] = &[$(Function::$variant,)+];

            /// Name as written in formulas
            pub fn name(self) -> &'static str {
                match self {
                    $(Function::$variant => $name,)+
                }
            }

            /// Category the function belongs to
            pub fn category(self) -> Category {
                match self {
                    $(Function::$variant => Category::$category,)+
                }
            }

            fn implementation(self) -> FunctionImpl {
                match self {
                    $(Function::$variant => $implementation,)+
                }
            }
        }
    };
}

define_functions! {
    // Math
    Sum => "SUM", Math, math::fn_sum;
    Average => "AVERAGE", Math, math::fn_average;
    Count => "COUNT", Math, math::fn_count;
    Min => "MIN", Math, math::fn_min;
    Max => "MAX", Math, math::fn_max;
    Product => "PRODUCT", Math, math::fn_product;
    Round => "ROUND", Math, math::fn_round;
    RoundUp => "ROUNDUP", Math, math::fn_roundup;
    RoundDown => "ROUNDDOWN", Math, math::fn_rounddown;
    Abs => "ABS", Math, math::fn_abs;
    Sqrt => "SQRT", Math, math::fn_sqrt;
    Power => "POWER", Math, math::fn_power;
    Mod => "MOD", Math, math::fn_mod;
    Gcd => "GCD", Math, math::fn_gcd;
    Lcm => "LCM", Math, math::fn_lcm;
    Fact => "FACT", Math, math::fn_fact;
    Rand => "RAND", Math, math::fn_rand;
    RandBetween => "RANDBETWEEN", Math, math::fn_randbetween;
    Pi => "PI", Math, math::fn_pi;
    Sin => "SIN", Math, math::fn_sin;
    Cos => "COS", Math, math::fn_cos;
    Tan => "TAN", Math, math::fn_tan;
    Ln => "LN", Math, math::fn_ln;
    Log10 => "LOG10", Math, math::fn_log10;
    Log => "LOG", Math, math::fn_log;
    Exp => "EXP", Math, math::fn_exp;

    // Statistical
    Stdev => "STDEV", Statistical, statistical::fn_stdev;
    StdevP => "STDEVP", Statistical, statistical::fn_stdevp;
    Var => "VAR", Statistical, statistical::fn_var;
    VarP => "VARP", Statistical, statistical::fn_varp;
    Median => "MEDIAN", Statistical, statistical::fn_median;
    Mode => "MODE", Statistical, statistical::fn_mode;
    Percentile => "PERCENTILE", Statistical, statistical::fn_percentile;
    Quartile => "QUARTILE", Statistical, statistical::fn_quartile;
    Correl => "CORREL", Statistical, statistical::fn_correl;

    // Logical
    If => "IF", Logical, logical::fn_if;
    And => "AND", Logical, logical::fn_and;
    Or => "OR", Logical, logical::fn_or;
    Not => "NOT", Logical, logical::fn_not;
    Xor => "XOR", Logical, logical::fn_xor;
    True => "TRUE", Logical, logical::fn_true;
    False => "FALSE", Logical, logical::fn_false;

    // Information
    IsBlank => "ISBLANK", Information, info::fn_isblank;
    IsError => "ISERROR", Information, info::fn_iserror;
    IsLogical => "ISLOGICAL", Information, info::fn_islogical;
    IsNa => "ISNA", Information, info::fn_isna;
    IsText => "ISTEXT", Information, info::fn_istext;
    IsNumber => "ISNUMBER", Information, info::fn_isnumber;
    IsEven => "ISEVEN", Information, info::fn_iseven;
    IsOdd => "ISODD", Information, info::fn_isodd;
    Na => "NA", Information, info::fn_na;
    ErrorType => "ERROR.TYPE", Information, info::fn_error_type;
    Info => "INFO", Information, info::fn_info;

    // Text
    Concatenate => "CONCATENATE", Text, text::fn_concatenate;
    Left => "LEFT", Text, text::fn_left;
    Right => "RIGHT", Text, text::fn_right;
    Mid => "MID", Text, text::fn_mid;
    Len => "LEN", Text, text::fn_len;
    Lower => "LOWER", Text, text::fn_lower;
    Upper => "UPPER", Text, text::fn_upper;
    Proper => "PROPER", Text, text::fn_proper;
    Trim => "TRIM", Text, text::fn_trim;
    Replace => "REPLACE", Text, text::fn_replace;
    Substitute => "SUBSTITUTE", Text, text::fn_substitute;
    Rept => "REPT", Text, text::fn_rept;
    Find => "FIND", Text, text::fn_find;
    Search => "SEARCH", Text, text::fn_search;
    Char => "CHAR", Text, text::fn_char;
    Code => "CODE", Text, text::fn_code;
    Exact => "EXACT", Text, text::fn_exact;
    Text => "TEXT", Text, text::fn_text;
    Dollar => "DOLLAR", Text, text::fn_dollar;

    // Date and time
    Now => "NOW", DateTime, date::fn_now;
    Today => "TODAY", DateTime, date::fn_today;
    Date => "DATE", DateTime, date::fn_date;
    Time => "TIME", DateTime, date::fn_time;
    Day => "DAY", DateTime, date::fn_day;
    Month => "MONTH", DateTime, date::fn_month;
    Year => "YEAR", DateTime, date::fn_year;
    Weekday => "WEEKDAY", DateTime, date::fn_weekday;
    Hour => "HOUR", DateTime, date::fn_hour;
    Minute => "MINUTE", DateTime, date::fn_minute;
    Second => "SECOND", DateTime, date::fn_second;
    EDate => "EDATE", DateTime, date::fn_edate;
    EoMonth => "EOMONTH", DateTime, date::fn_eomonth;
    NetworkDays => "NETWORKDAYS", DateTime, date::fn_networkdays;
    Workday => "WORKDAY", DateTime, date::fn_workday;
    DateDif => "DATEDIF", DateTime, date::fn_datedif;

    // Lookup and reference
    VLookup => "VLOOKUP", Lookup, lookup::fn_vlookup;
    HLookup => "HLOOKUP", Lookup, lookup::fn_hlookup;
    Index => "INDEX", Lookup, lookup::fn_index;
    Match => "MATCH", Lookup, lookup::fn_match;
    Offset => "OFFSET", Lookup, lookup::fn_offset;
    Address => "ADDRESS", Lookup, lookup::fn_address;
    Indirect => "INDIRECT", Lookup, lookup::fn_indirect;
    Row => "ROW", Lookup, lookup::fn_row;
    Column => "COLUMN", Lookup, lookup::fn_column;
    Rows => "ROWS", Lookup, lookup::fn_rows;
    Columns => "COLUMNS", Lookup, lookup::fn_columns;

    // Financial
    Pmt => "PMT", Financial, financial::fn_pmt;
    Fv => "FV", Financial, financial::fn_fv;
    Pv => "PV", Financial, financial::fn_pv;
    Npv => "NPV", Financial, financial::fn_npv;
    Irr => "IRR", Financial, financial::fn_irr;
    Rate => "RATE", Financial, financial::fn_rate;
    Nper => "NPER", Financial, financial::fn_nper;
    Sln => "SLN", Financial, financial::fn_sln;
    Syd => "SYD", Financial, financial::fn_syd;

    // Array
    SumProduct => "SUMPRODUCT", Array, math::fn_sumproduct;
    Transpose => "TRANSPOSE", Array, math::fn_transpose;
    MMult => "MMULT", Array, math::fn_mmult;

    // Web
    EncodeUrl => "ENCODEURL", Web, web::fn_encodeurl;
    Hyperlink => "HYPERLINK", Web, web::fn_hyperlink;
    GoogleFinance => "GOOGLEFINANCE", Web, web::fn_not_implemented;
    ImportData => "IMPORTDATA", Web, web::fn_not_implemented;
    ImportRange => "IMPORTRANGE", Web, web::fn_not_implemented;
    Image => "IMAGE", Web, web::fn_not_implemented;
}

static BY_NAME: Lazy<AHashMap<&'static str, Function>> =
    Lazy::new(|| Function::ALL.iter().map(|f| (f.name(), *f)).collect());

impl Function {
    /// Look up a function by name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Function> {
        BY_NAME.get(name.to_ascii_uppercase().as_str()).copied()
    }

    /// Volatile functions give a different result on every evaluation
    pub fn is_volatile(self) -> bool {
        matches!(
            self,
            Function::Now | Function::Today | Function::Rand | Function::RandBetween
        )
    }

    /// Apply the function to resolved argument values.
    ///
    /// Never fails: internal errors become [`FormulaValue::Error`], and a
    /// numeric result that is not a number becomes `#ERROR`.
    pub fn call(self, args: &[FormulaValue], ctx: &EvaluationContext) -> FormulaValue {
        match (self.implementation())(args, ctx) {
            Ok(FormulaValue::Number(n)) if n.is_nan() => FormulaValue::Error(ErrorCode::Error),
            Ok(value) => value,
            Err(e) => {
                log::trace!("{} failed: {}", self.name(), e);
                e.into()
            }
        }
    }
}

/// Fail with `#ERROR` unless at least `n` values are present
pub(crate) fn require(args: &[FormulaValue], n: usize) -> FormulaResult<()> {
    if args.len() < n {
        Err(FormulaError::Invalid)
    } else {
        Ok(())
    }
}

/// Numeric view of argument `i`
pub(crate) fn num(args: &[FormulaValue], i: usize) -> FormulaResult<f64> {
    match args.get(i) {
        None => Err(FormulaError::Invalid),
        Some(FormulaValue::Error(e)) => Err(FormulaError::Value(e.clone())),
        Some(value) => value
            .as_number()
            .ok_or_else(|| FormulaError::NotNumeric(value.as_text())),
    }
}

/// Numeric view of argument `i`, or `default` when it is absent
pub(crate) fn num_or(args: &[FormulaValue], i: usize, default: f64) -> FormulaResult<f64> {
    if i < args.len() {
        num(args, i)
    } else {
        Ok(default)
    }
}

/// Argument `i` truncated toward zero
pub(crate) fn int(args: &[FormulaValue], i: usize) -> FormulaResult<i64> {
    let n = num(args, i)?;
    if n.is_finite() {
        Ok(n.trunc() as i64)
    } else {
        Err(FormulaError::Invalid)
    }
}

/// Text of argument `i`
pub(crate) fn text(args: &[FormulaValue], i: usize) -> FormulaResult<String> {
    match args.get(i) {
        None => Err(FormulaError::Invalid),
        Some(value) => Ok(value.as_text()),
    }
}

/// Every numeric argument: booleans count as 1/0, non-numeric text is skipped,
/// and the first error value is passed on.
pub(crate) fn numbers(args: &[FormulaValue]) -> FormulaResult<Vec<f64>> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            FormulaValue::Error(e) => return Err(FormulaError::Value(e.clone())),
            other => out.extend(other.as_number()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_names_are_unique_and_resolvable() {
        for f in Function::ALL {
            assert_eq!(Function::from_name(f.name()), Some(*f));
        }
        assert_eq!(BY_NAME.len(), Function::ALL.len());
        assert_eq!(Function::from_name("error.type"), Some(Function::ErrorType));
        assert_eq!(Function::from_name("FOO"), None);
    }

    #[test]
    fn test_volatile() {
        assert!(Function::Now.is_volatile());
        assert!(Function::RandBetween.is_volatile());
        assert!(!Function::Sum.is_volatile());
    }

    #[test]
    fn test_call_converts_failures() {
        let ctx = EvaluationContext::simple();
        assert_eq!(
            Function::Sqrt.call(&[FormulaValue::Number(-1.0)], &ctx),
            FormulaValue::Error(ErrorCode::Error)
        );
        assert_eq!(
            Function::Sum.call(&[FormulaValue::Error(ErrorCode::Na)], &ctx),
            FormulaValue::Error(ErrorCode::Na)
        );
        assert_eq!(
            Function::Abs.call(&[FormulaValue::text("abc")], &ctx),
            FormulaValue::error_message("Expected a number, got 'abc'")
        );
    }

    #[test]
    fn test_numbers_helper() {
        let values = vec![
            FormulaValue::Number(1.0),
            FormulaValue::text("x"),
            FormulaValue::text("2"),
            FormulaValue::Boolean(true),
        ];
        assert_eq!(numbers(&values).unwrap(), vec![1.0, 2.0, 1.0]);
    }
}
