//! Arithmetic expression evaluator
//!
//! Evaluates non-call formula bodies such as `A1*2+B1^2`. Cell references read the
//! cell's number (blank or non-numeric cells read as `0`). Supported syntax:
//!
//! - numeric literals, `TRUE`/`FALSE`, double-quoted text
//! - `+ - * / % ^` with the usual precedence; `^` binds tighter than unary minus and
//!   is right associative
//! - comparisons `= <> < <= > >=`, yielding a boolean
//! - nested function calls (`SUM(A1:A3)*2`)
//!
//! `x / 0` is `+inf` for every `x`. `%` is a floored modulo (the result takes the
//! divisor's sign) and fails on a zero divisor.

use sheetcalc_core::{parse_address, ErrorCode, FormulaValue};

use crate::error::{FormulaError, FormulaResult};
use crate::evaluator::{evaluate_call, EvaluationContext};
use crate::parser::matching_paren;
use crate::resolve::{expression_cell_number, substitute_names};

/// Evaluate an expression body (without the leading `=`)
pub fn evaluate_expression(body: &str, ctx: &EvaluationContext) -> FormulaResult<FormulaValue> {
    let text = substitute_names(body, ctx.names);
    let invalid = || FormulaError::InvalidExpression(text.to_string());

    let mut parser = ExpressionParser::new(&text, ctx);
    let result = parser.parse_expression().and_then(|value| {
        if parser.is_at_end() {
            Ok(value)
        } else {
            Err(Failure::Invalid)
        }
    });

    match result {
        Ok(FormulaValue::Number(n)) if n.is_nan() => Err(invalid()),
        Ok(value) => Ok(value),
        Err(Failure::Invalid) => Err(invalid()),
        Err(Failure::ModuloByZero) => Err(FormulaError::argument("Modulo by zero")),
        Err(Failure::Value(code)) => Ok(FormulaValue::Error(code)),
    }
}

/// Why evaluation stopped
#[derive(Debug)]
enum Failure {
    /// Malformed input or an operand of the wrong type
    Invalid,
    /// `x % 0`
    ModuloByZero,
    /// A nested call produced an error value, which becomes the result
    Value(ErrorCode),
}

type Eval<T> = Result<T, Failure>;

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(f64),
    Text(String),
    Boolean(bool),

    // References and calls (value already resolved)
    Value(FormulaValue),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,

    // End of input
    Eof,
}

/// Recursive descent parser that evaluates as it goes
struct ExpressionParser<'s, 'c> {
    input: &'s str,
    pos: usize,
    ctx: &'s EvaluationContext<'c>,
    current: Token,
}

impl<'s, 'c> ExpressionParser<'s, 'c> {
    fn new(input: &'s str, ctx: &'s EvaluationContext<'c>) -> Self {
        Self {
            input,
            pos: 0,
            ctx,
            current: Token::Eof,
        }
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> Eval<()> {
        self.current = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> Eval<Token> {
        self.skip_whitespace();

        let Some(c) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '=' => Some(Token::Equal),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            return Ok(match self.peek_char() {
                Some('=') => {
                    self.advance();
                    Token::LessEqual
                }
                Some('>') => {
                    self.advance();
                    Token::NotEqual
                }
                _ => Token::LessThan,
            });
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Ok(Token::GreaterEqual);
            }
            return Ok(Token::GreaterThan);
        }

        if c == '"' {
            return self.scan_string();
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())) {
            return self.scan_number();
        }

        if c.is_ascii_alphabetic() || c == '$' {
            return self.scan_identifier_or_ref();
        }

        Err(Failure::Invalid)
    }

    fn scan_string(&mut self) -> Eval<Token> {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::Text(s));
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                // Unterminated
                None => return Err(Failure::Invalid),
            }
        }
    }

    fn scan_number(&mut self) -> Eval<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_char_at(1), Some('+' | '-')) {
                lookahead = 2;
            }
            if self.peek_char_at(lookahead).map_or(false, |c| c.is_ascii_digit()) {
                for _ in 0..lookahead {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        self.input[start..self.pos]
            .parse()
            .map(Token::Number)
            .map_err(|_| Failure::Invalid)
    }

    fn scan_identifier_or_ref(&mut self) -> Eval<Token> {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.')
        {
            self.advance();
        }
        let text = &self.input[start..self.pos];

        // Function call: NAME(...)
        if self.peek_char() == Some('(') {
            let is_name = text.starts_with(|c: char| c.is_ascii_uppercase())
                && text
                    .chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.');
            if !is_name {
                return Err(Failure::Invalid);
            }
            let open = self.pos;
            let close = matching_paren(self.input, open).ok_or(Failure::Invalid)?;
            let raw_args = &self.input[open + 1..close];
            self.pos = close + 1;

            return match evaluate_call(text, raw_args, self.ctx) {
                FormulaValue::Error(code) => Err(Failure::Value(code)),
                value => Ok(Token::Value(value)),
            };
        }

        if text.eq_ignore_ascii_case("TRUE") {
            return Ok(Token::Boolean(true));
        }
        if text.eq_ignore_ascii_case("FALSE") {
            return Ok(Token::Boolean(false));
        }

        let addr = parse_address(text).ok_or(Failure::Invalid)?;
        let n = expression_cell_number(addr.row, addr.col, self.ctx);
        Ok(Token::Value(FormulaValue::Number(n)))
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.current == Token::Eof
    }

    fn consume(&mut self) -> Eval<Token> {
        let token = std::mem::replace(&mut self.current, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Addition/Subtraction: +, -
    // 3. Multiplication/Division/Modulo: *, /, %
    // 4. Unary: +, -
    // 5. Exponentiation: ^
    // 6. Primary: literals, references, calls, parentheses

    fn parse_expression(&mut self) -> Eval<FormulaValue> {
        self.advance_token()?;
        if self.current == Token::Eof {
            return Err(Failure::Invalid);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Eval<FormulaValue> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current {
                Token::Equal
                | Token::NotEqual
                | Token::LessThan
                | Token::LessEqual
                | Token::GreaterThan
                | Token::GreaterEqual => self.consume()?,
                _ => break,
            };

            let right = self.parse_additive()?;
            let ordering = compare(&left, &right)?;
            let result = match op {
                Token::Equal => ordering.is_eq(),
                Token::NotEqual => ordering.is_ne(),
                Token::LessThan => ordering.is_lt(),
                Token::LessEqual => ordering.is_le(),
                Token::GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            };
            left = FormulaValue::Boolean(result);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Eval<FormulaValue> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current {
                Token::Plus | Token::Minus => self.consume()?,
                _ => break,
            };

            let right = number(&self.parse_multiplicative()?)?;
            let l = number(&left)?;
            left = FormulaValue::Number(if op == Token::Plus { l + right } else { l - right });
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Eval<FormulaValue> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current {
                Token::Star | Token::Slash | Token::Percent => self.consume()?,
                _ => break,
            };

            let right = number(&self.parse_unary()?)?;
            let l = number(&left)?;
            let value = match op {
                Token::Star => l * right,
                Token::Slash => divide(l, right),
                _ => modulo(l, right)?,
            };
            left = FormulaValue::Number(value);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Eval<FormulaValue> {
        match self.current {
            Token::Minus => {
                self.consume()?;
                let value = number(&self.parse_unary()?)?;
                Ok(FormulaValue::Number(-value))
            }
            Token::Plus => {
                self.consume()?;
                let value = number(&self.parse_unary()?)?;
                Ok(FormulaValue::Number(value))
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Eval<FormulaValue> {
        let base = self.parse_primary()?;

        if self.current == Token::Caret {
            self.consume()?;
            // Right associative; the exponent may carry its own sign
            let exponent = number(&self.parse_unary()?)?;
            return Ok(FormulaValue::Number(number(&base)?.powf(exponent)));
        }

        Ok(base)
    }

    fn parse_primary(&mut self) -> Eval<FormulaValue> {
        match self.consume()? {
            Token::Number(n) => Ok(FormulaValue::Number(n)),
            Token::Text(s) => Ok(FormulaValue::Text(s)),
            Token::Boolean(b) => Ok(FormulaValue::Boolean(b)),
            Token::Value(v) => Ok(v),
            Token::LeftParen => {
                let value = self.parse_comparison()?;
                if self.current != Token::RightParen {
                    return Err(Failure::Invalid);
                }
                self.consume()?;
                Ok(value)
            }
            _ => Err(Failure::Invalid),
        }
    }
}

fn number(value: &FormulaValue) -> Eval<f64> {
    match value {
        FormulaValue::Error(code) => Err(Failure::Value(code.clone())),
        other => other.as_number().ok_or(Failure::Invalid),
    }
}

fn divide(l: f64, r: f64) -> f64 {
    if r == 0.0 {
        // Any numerator, 0 and negatives included, gives +inf rather than NaN
        f64::INFINITY
    } else {
        l / r
    }
}

fn modulo(l: f64, r: f64) -> Eval<f64> {
    if r == 0.0 {
        return Err(Failure::ModuloByZero);
    }
    let m = l % r;
    Ok(if m != 0.0 && (m < 0.0) != (r < 0.0) { m + r } else { m })
}

fn compare(left: &FormulaValue, right: &FormulaValue) -> Eval<std::cmp::Ordering> {
    if let (FormulaValue::Text(l), FormulaValue::Text(r)) = (left, right) {
        return Ok(l.to_lowercase().cmp(&r.to_lowercase()));
    }
    number(left)?
        .partial_cmp(&number(right)?)
        .ok_or(Failure::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetcalc_core::Worksheet;

    fn eval(body: &str) -> FormulaResult<FormulaValue> {
        evaluate_expression(body, &EvaluationContext::simple())
    }

    fn num(body: &str) -> f64 {
        match eval(body) {
            Ok(FormulaValue::Number(n)) => n,
            other => panic!("{} evaluated to {:?}", body, other),
        }
    }

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(num("1+2*3"), 7.0);
        assert_eq!(num("(1+2)*3"), 9.0);
        assert_eq!(num("2^3^2"), 512.0);
        assert_eq!(num("-2^2"), -4.0);
        assert_eq!(num("2^-1"), 0.5);
        assert_eq!(num("10-4-3"), 3.0);
        assert_eq!(num(" 1.5e2 / 3 "), 50.0);
        assert_eq!(num("--3"), 3.0);
    }

    #[test]
    fn test_division_by_zero_is_infinity() {
        assert_eq!(num("5/0"), f64::INFINITY);
        assert_eq!(num("-5/0"), f64::INFINITY);
        assert_eq!(num("0/0"), f64::INFINITY);
    }

    #[test]
    fn test_modulo_takes_divisor_sign() {
        assert_eq!(num("7%3"), 1.0);
        assert_eq!(num("-7%3"), 2.0);
        assert_eq!(num("7%-3"), -2.0);
        assert!(eval("7%0").is_err());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("1<2").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(eval("2<>2").unwrap(), FormulaValue::Boolean(false));
        assert_eq!(eval("1+1=2").unwrap(), FormulaValue::Boolean(true));
        assert_eq!(
            eval(r#""abc"="ABC""#).unwrap(),
            FormulaValue::Boolean(true)
        );
        assert_eq!(num("TRUE+1"), 2.0);
    }

    #[test]
    fn test_invalid_expressions() {
        for body in ["1+", "", "(1", "1)", "abc", "2 3", "1+*2", r#""x"+1"#] {
            match eval(body) {
                Err(FormulaError::InvalidExpression(text)) => assert_eq!(text, body),
                other => panic!("{:?} evaluated to {:?}", body, other),
            }
        }
    }

    #[test]
    fn test_cell_references() {
        let mut sheet = Worksheet::new(10, 5);
        sheet.set_cell("A1", "5").unwrap();
        sheet.set_cell("B1", "hello").unwrap();
        sheet.set_cell("C1", " 2.5 ").unwrap();
        let ctx = EvaluationContext::new(&sheet, 0, 0);

        let eval = |body: &str| evaluate_expression(body, &ctx).unwrap();
        assert_eq!(eval("A1*2"), FormulaValue::Number(10.0));
        assert_eq!(eval("A1+B1+D1"), FormulaValue::Number(5.0));
        assert_eq!(eval("$A$1+C1"), FormulaValue::Number(7.5));
        // Beyond the sheet reads as 0
        assert_eq!(eval("A1+E99"), FormulaValue::Number(5.0));
    }

    #[test]
    fn test_nested_calls() {
        assert_eq!(num("SUM(1,2)*2"), 6.0);
        assert_eq!(num("ABS(-3)+MAX(1,4)"), 7.0);
        assert_eq!(
            eval("SQRT(-1)+1").unwrap(),
            FormulaValue::Error(ErrorCode::Error)
        );
        assert!(matches!(eval("sum(1)"), Err(FormulaError::InvalidExpression(_))));
    }
}
