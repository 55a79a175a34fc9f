//! Formula classification and argument splitting
//!
//! A formula body is either a single function call spanning the whole body
//! (`SUM(A1:B5,C1)`) or an arithmetic expression (`A1*2+B1`). Function calls are
//! dispatched to the function library with their raw argument text; everything else
//! goes to the expression evaluator.

use lazy_regex::regex_captures;

/// The shape of a formula body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified<'a> {
    /// `NAME(raw_args)` with the outer parentheses balanced
    FunctionCall { name: &'a str, raw_args: &'a str },
    /// Anything else
    Expression { body: &'a str },
}

/// Classify a formula, stripping the leading `=` and surrounding whitespace
///
/// # Example
/// ```rust
/// use sheetcalc_formula::parser::{classify, Classified};
///
/// assert_eq!(
///     classify("=SUM(A1:A3)"),
///     Classified::FunctionCall { name: "SUM", raw_args: "A1:A3" }
/// );
/// assert_eq!(classify("=A1*2"), Classified::Expression { body: "A1*2" });
/// ```
pub fn classify(formula: &str) -> Classified<'_> {
    let body = formula.trim();
    let body = body.strip_prefix('=').unwrap_or(body).trim();

    match split_call(body) {
        Some((name, raw_args)) => Classified::FunctionCall { name, raw_args },
        None => Classified::Expression { body },
    }
}

/// Split `NAME(args)` into its name and raw argument text.
///
/// The name is an uppercase letter followed by uppercase letters, digits or dots
/// (`LOG10`, `ERROR.TYPE`). Returns `None` unless the parenthesis opened after the
/// name is the one closing the text, so `SUM(A1)+SUM(B1)` is not a call.
pub fn split_call(text: &str) -> Option<(&str, &str)> {
    let (_, name) = regex_captures!(r"^([A-Z][A-Z0-9.]*)\(", text)?;
    let open = name.len();
    let close = matching_paren(text, open)?;
    if close + 1 != text.len() {
        return None;
    }
    Some((name, &text[open + 1..close]))
}

/// Byte index of the `)` matching the `(` at byte index `open`.
///
/// Parentheses inside double-quoted text are ignored.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quotes = false;

    for (i, c) in text.get(open..)?.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Split raw argument text on top-level commas.
///
/// Range arguments keep their `:` intact (`A1:B5,C1` gives `["A1:B5", "C1"]`),
/// commas inside quotes or nested calls do not split, and every argument is
/// whitespace-trimmed. A trailing comma does not produce an empty argument.
pub fn split_arguments(raw_args: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quotes = false;

    for c in raw_args.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            '(' if !in_quotes => {
                depth += 1;
                current.push(c);
            }
            ')' if !in_quotes => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if !in_quotes && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        args.push(current.trim().to_string());
    }

    args
}

/// Check that parentheses outside quoted text balance
pub fn parentheses_balanced(text: &str) -> bool {
    let mut depth = 0i64;
    let mut in_quotes = false;

    for c in text.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '(' if !in_quotes => depth += 1,
            ')' if !in_quotes => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }

    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_function_call() {
        assert_eq!(
            classify("=SUM(A1:B5,C1)"),
            Classified::FunctionCall {
                name: "SUM",
                raw_args: "A1:B5,C1"
            }
        );
        assert_eq!(
            classify("= LOG10(100) "),
            Classified::FunctionCall {
                name: "LOG10",
                raw_args: "100"
            }
        );
        assert_eq!(
            classify("=ERROR.TYPE(A1)"),
            Classified::FunctionCall {
                name: "ERROR.TYPE",
                raw_args: "A1"
            }
        );
        assert_eq!(
            classify("=NOW()"),
            Classified::FunctionCall {
                name: "NOW",
                raw_args: ""
            }
        );
    }

    #[test]
    fn test_classify_expression() {
        assert_eq!(classify("=A1+B1"), Classified::Expression { body: "A1+B1" });
        assert_eq!(
            classify("=SUM(A1)+SUM(B1)"),
            Classified::Expression {
                body: "SUM(A1)+SUM(B1)"
            }
        );
        assert_eq!(classify("=sum(1)"), Classified::Expression { body: "sum(1)" });
        assert_eq!(classify("=(1+2)"), Classified::Expression { body: "(1+2)" });
    }

    #[test]
    fn test_nested_call_is_single_call() {
        assert_eq!(
            classify("=IF(A1>0,SUM(B1:B3),0)"),
            Classified::FunctionCall {
                name: "IF",
                raw_args: "A1>0,SUM(B1:B3),0"
            }
        );
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(split_arguments("A1:B5,C1"), vec!["A1:B5", "C1"]);
        assert_eq!(split_arguments(" 1 , 2 ,3"), vec!["1", "2", "3"]);
        assert_eq!(split_arguments("1,"), vec!["1"]);
        assert_eq!(split_arguments(""), Vec::<String>::new());
        assert_eq!(split_arguments("1,,2"), vec!["1", "", "2"]);
    }

    #[test]
    fn test_split_arguments_respects_quotes_and_calls() {
        assert_eq!(
            split_arguments(r#""a,b",MAX(1,2),C1:C2"#),
            vec![r#""a,b""#, "MAX(1,2)", "C1:C2"]
        );
    }

    #[test]
    fn test_parentheses_balanced() {
        assert!(parentheses_balanced("SUM(A1:(B2))"));
        assert!(parentheses_balanced(r#"LEN(")")"#));
        assert!(!parentheses_balanced("SUM(A1"));
        assert!(!parentheses_balanced(")("));
    }
}
