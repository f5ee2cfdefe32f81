//! Expression lexer
//!
//! Tokenizes the small expression sublanguage that appears inside clause
//! entries: literals, aggregate calls like `SUM(total)`, comparison operators,
//! and bracketed lists. The surrounding block structure is handled by the
//! parser; this module owns the literal rules.

use crate::ast::{Aggregate, AggregateFunc, CompareOp, Condition};
use chrono::NaiveDate;
use logos::Logos;
use trellis_core::{Error, Result, Value};

/// Expression tokens
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Operators, two-character forms first
    #[token(">=")]
    Gte,

    #[token("<=")]
    Lte,

    #[token("!=")]
    Ne,

    #[token(">")]
    Gt,

    #[token("<")]
    Lt,

    #[token("=")]
    Eq,

    // Punctuation
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    // Literals
    #[token("true", ignore(ascii_case))]
    True,

    #[token("false", ignore(ascii_case))]
    False,

    #[regex(r"\d{4}-\d{2}-\d{2}", |lex| NaiveDate::parse_from_str(lex.slice(), "%Y-%m-%d").ok())]
    Date(NaiveDate),

    #[regex(r"-?\d+\.\d+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"-?\d+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    #[regex(r#""[^"]*""#, |lex| strip_one_quote(lex.slice()))]
    #[regex(r"'[^']*'", |lex| strip_one_quote(lex.slice()))]
    Quoted(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn strip_one_quote(slice: &str) -> String {
    slice[1..slice.len() - 1].to_string()
}

/// Parse a clause literal.
///
/// Rules, in priority order: boolean keywords, numerics, a *leading*
/// `YYYY-MM-DD` date pattern, bracketed lists, and finally a string with any
/// surrounding quotes stripped. Never fails; unrecognized input is a string.
pub fn parse_literal(text: &str) -> Value {
    let trimmed = text.trim();
    let mut lex = Token::lexer(trimmed);

    match lex.next() {
        // A leading date wins even with trailing content
        Some(Ok(Token::Date(date))) => return Value::Date(date),
        Some(Ok(Token::LBracket)) => {
            if let Some(list) = parse_list(trimmed) {
                return list;
            }
        }
        Some(Ok(token)) => {
            if lex.next().is_none() {
                match token {
                    Token::True => return Value::Bool(true),
                    Token::False => return Value::Bool(false),
                    Token::Integer(i) => return Value::Int(i),
                    Token::Float(f) => return Value::Float(f),
                    Token::Quoted(s) => return Value::Str(s),
                    _ => {}
                }
            }
        }
        _ => {}
    }

    Value::Str(strip_quotes(trimmed).to_string())
}

fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

/// Parse `[a, b, c]` into a list value; `None` if the shape doesn't hold
fn parse_list(text: &str) -> Option<Value> {
    let mut lex = Token::lexer(text);
    if !matches!(lex.next(), Some(Ok(Token::LBracket))) {
        return None;
    }

    let mut items = Vec::new();
    loop {
        match lex.next() {
            Some(Ok(Token::RBracket)) => break,
            Some(Ok(Token::Comma)) => continue,
            Some(Ok(Token::True)) => items.push(Value::Bool(true)),
            Some(Ok(Token::False)) => items.push(Value::Bool(false)),
            Some(Ok(Token::Integer(i))) => items.push(Value::Int(i)),
            Some(Ok(Token::Float(f))) => items.push(Value::Float(f)),
            Some(Ok(Token::Date(d))) => items.push(Value::Date(d)),
            Some(Ok(Token::Quoted(s))) => items.push(Value::Str(s)),
            Some(Ok(Token::Ident(s))) => items.push(Value::Str(s)),
            _ => return None,
        }
    }

    if lex.next().is_some() {
        return None;
    }
    Some(Value::List(items))
}

/// Parse a COMPUTE expression of shape `FUNC(field)`.
///
/// The field may be empty only for COUNT; anything not matching the
/// `name(args)` shape is a parse error.
pub fn parse_aggregate(text: &str) -> Result<Aggregate> {
    let mut lex = Token::lexer(text.trim());

    let func_name = match lex.next() {
        Some(Ok(Token::Ident(name))) => name,
        _ => {
            return Err(Error::Parse(format!(
                "compute expression '{}' is not of the form FUNC(field)",
                text.trim()
            )));
        }
    };

    if !matches!(lex.next(), Some(Ok(Token::LParen))) {
        return Err(Error::Parse(format!(
            "compute expression '{}' is missing '(' after {}",
            text.trim(),
            func_name
        )));
    }

    let field = match lex.next() {
        Some(Ok(Token::RParen)) => None,
        Some(Ok(Token::Ident(field))) => {
            if !matches!(lex.next(), Some(Ok(Token::RParen))) {
                return Err(Error::Parse(format!(
                    "compute expression '{}' is missing ')'",
                    text.trim()
                )));
            }
            Some(field)
        }
        _ => {
            return Err(Error::Parse(format!(
                "compute expression '{}' has a malformed argument",
                text.trim()
            )));
        }
    };

    if lex.next().is_some() {
        return Err(Error::Parse(format!(
            "unexpected trailing input in compute expression '{}'",
            text.trim()
        )));
    }

    let func = AggregateFunc::from_name(&func_name.to_uppercase()).ok_or_else(|| {
        Error::Parse(format!("unknown aggregate function '{func_name}'"))
    })?;

    if field.is_none() && func != AggregateFunc::Count {
        return Err(Error::Parse(format!(
            "{} requires a field argument",
            func.name()
        )));
    }

    Ok(Aggregate { func, field })
}

/// Comparison operators in match priority order; two-character operators must
/// come before their one-character prefixes.
const OPERATORS: [(&str, CompareOp); 6] = [
    (">=", CompareOp::Gte),
    ("<=", CompareOp::Lte),
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
    ("!=", CompareOp::Ne),
    ("=", CompareOp::Eq),
];

/// Parse the value side of a FILTER entry, e.g. `>= 100` or `active`.
///
/// No operator means bare equality.
pub fn parse_condition(text: &str) -> Condition {
    for (symbol, op) in OPERATORS {
        if let Some(idx) = text.find(symbol) {
            let rhs = &text[idx + symbol.len()..];
            return Condition {
                op,
                value: parse_literal(rhs),
            };
        }
    }
    Condition {
        op: CompareOp::Eq,
        value: parse_literal(text),
    }
}

/// Parse a whole FILTER entry: `field op literal` or `field: op literal`.
pub fn parse_condition_entry(entry: &str) -> Result<(String, Condition)> {
    for (symbol, op) in OPERATORS {
        if let Some(idx) = entry.find(symbol) {
            let mut field = entry[..idx].trim();
            if let Some(stripped) = field.strip_suffix(':') {
                field = stripped.trim_end();
            }
            if field.is_empty() {
                return Err(Error::Parse(format!(
                    "filter entry '{}' is missing a field name",
                    entry.trim()
                )));
            }
            let value = parse_literal(&entry[idx + symbol.len()..]);
            return Ok((field.to_string(), Condition { op, value }));
        }
    }

    // No operator: `field: literal` means equality
    if let Some((field, rest)) = entry.split_once(':') {
        let field = field.trim();
        if !field.is_empty() {
            return Ok((
                field.to_string(),
                Condition {
                    op: CompareOp::Eq,
                    value: parse_literal(rest),
                },
            ));
        }
    }

    Err(Error::Parse(format!(
        "filter entry '{}' has no comparison",
        entry.trim()
    )))
}
