//! Arithmetic Expressions
//!
//! Evaluates the whitelisted arithmetic subset: integer and decimal
//! literals, `+ - * / % ^ **`, unary signs and parentheses.
//!
//! Semantics follow the usual scripting-calculator rules:
//!
//! - `/` always yields a float, the other operators keep integers integral
//! - `%` is floored (the result takes the divisor's sign)
//! - `^` and `**` are exponentiation, right-associative, binding tighter
//!   than a unary minus on their left (`-2 ** 2 == -4`)

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, ToolsError};

static ALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d+\-*/().\s^%]*$").unwrap());

const MAX_DEPTH: usize = 128;

/// Result of an evaluation
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// JSON number; `None` for NaN and infinities
    pub fn to_json(self) -> Option<Value> {
        match self {
            Self::Int(i) => Some(Value::from(i)),
            Self::Float(f) => serde_json::Number::from_f64(f).map(Value::Number),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{x:.1}")
            }
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

/// Check the character whitelist, then evaluate
pub fn evaluate(expression: &str) -> Result<Number> {
    if !ALLOWED.is_match(expression) {
        return Err(ToolsError::InvalidCharacters);
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };

    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(ToolsError::Syntax("invalid syntax".into()));
    }

    Ok(value)
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    LParen,
    RParen,
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_literal(&literal)?));
                continue;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                Token::Pow
            }
            '^' => Token::Pow,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            // Non-ASCII digits pass the whitelist but are not literals
            other => return Err(ToolsError::Syntax(format!("invalid character '{other}'"))),
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

fn parse_literal(literal: &str) -> Result<Number> {
    if literal.contains('.') {
        if literal == "." || literal.matches('.').count() > 1 {
            return Err(ToolsError::Syntax(format!("invalid number '{literal}'")));
        }
        literal
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| ToolsError::Syntax(format!("invalid number '{literal}'")))
    } else {
        literal
            .parse::<i64>()
            .map(Number::Int)
            .map_err(|_| ToolsError::Overflow("integer literal too large"))
    }
}

/// Recursive-descent parser that evaluates while it parses
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expression(&mut self) -> Result<Number> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = add(value, self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = sub(value, self.term()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Number> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value = mul(value, self.unary()?)?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    value = div(value, self.unary()?)?;
                }
                Some(Token::Percent) => {
                    self.pos += 1;
                    value = rem(value, self.unary()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<Number> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ToolsError::Syntax("expression nested too deeply".into()));
        }

        let value = match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            Some(Token::Minus) => {
                self.pos += 1;
                self.unary().and_then(neg)
            }
            _ => self.power(),
        };

        self.depth -= 1;
        value
    }

    fn power(&mut self) -> Result<Number> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Pow) {
            self.pos += 1;
            let exponent = self.unary()?;
            return pow(base, exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Number> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ToolsError::Syntax("'(' was never closed".into())),
                }
            }
            Some(_) => Err(ToolsError::Syntax("invalid syntax".into())),
            None => Err(ToolsError::Syntax("unexpected end of expression".into())),
        }
    }
}

fn finite(value: f64) -> Result<Number> {
    if value.is_finite() {
        Ok(Number::Float(value))
    } else {
        Err(ToolsError::Overflow("numerical result out of range"))
    }
}

fn int_op(value: Option<i64>) -> Result<Number> {
    value
        .map(Number::Int)
        .ok_or(ToolsError::Overflow("integer overflow"))
}

fn add(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x.checked_add(y)),
        _ => finite(a.as_f64() + b.as_f64()),
    }
}

fn sub(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x.checked_sub(y)),
        _ => finite(a.as_f64() - b.as_f64()),
    }
}

fn mul(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_op(x.checked_mul(y)),
        _ => finite(a.as_f64() * b.as_f64()),
    }
}

fn div(a: Number, b: Number) -> Result<Number> {
    let divisor = b.as_f64();
    if divisor == 0.0 {
        return Err(ToolsError::ZeroDivision("division by zero"));
    }
    finite(a.as_f64() / divisor)
}

fn rem(a: Number, b: Number) -> Result<Number> {
    match (a, b) {
        (Number::Int(_), Number::Int(0)) => Err(ToolsError::ZeroDivision("integer modulo by zero")),
        (Number::Int(x), Number::Int(y)) => {
            let r = x
                .checked_rem(y)
                .ok_or(ToolsError::Overflow("integer overflow"))?;
            Ok(Number::Int(if r != 0 && (r < 0) != (y < 0) { r + y } else { r }))
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            if y == 0.0 {
                return Err(ToolsError::ZeroDivision("float modulo"));
            }
            let r = x % y;
            finite(if r != 0.0 && (r < 0.0) != (y < 0.0) { r + y } else { r })
        }
    }
}

fn neg(a: Number) -> Result<Number> {
    match a {
        Number::Int(x) => int_op(x.checked_neg()),
        Number::Float(x) => Ok(Number::Float(-x)),
    }
}

fn pow(base: Number, exponent: Number) -> Result<Number> {
    if let (Number::Int(b), Number::Int(e)) = (base, exponent) {
        if let Ok(e) = u32::try_from(e) {
            return int_op(b.checked_pow(e));
        }
    }

    let (b, e) = (base.as_f64(), exponent.as_f64());
    if b == 0.0 && e < 0.0 {
        return Err(ToolsError::ZeroDivision(
            "0.0 cannot be raised to a negative power",
        ));
    }
    if b < 0.0 && e.fract() != 0.0 {
        return Err(ToolsError::Syntax(
            "negative number cannot be raised to a fractional power".into(),
        ));
    }
    finite(b.powf(e))
}
