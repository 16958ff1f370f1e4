//! Literal values found in metrics files
//!
//! ## Grammar
//!
//! ```text
//! value  := number | string | bool | list | dict
//! number := [+-]? (digits ['.' digits?] | '.' digits) ([eE] [+-]? digits)?
//!         | [+-]? (inf | nan | Infinity | NaN)
//! string := '...' | "..."          (escapes: \\ \' \" \n \r \t \/ \uXXXX)
//! bool   := True | False | true | false
//! list   := '[' (value (',' value)* ','?)? ']'     (one element kind)
//! dict   := '{' (string ':' value (',' string ':' value)* ','?)? '}'
//! ```
//!
//! Nothing outside this grammar is accepted: no names, calls, tuples, sets
//! or `None`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::{Error, Result};

/// A parsed literal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    /// Boolean
    Bool(bool),
    /// Integer without fraction or exponent
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    Str(String),
    /// List whose elements share one kind
    List(Vec<Literal>),
    /// Mapping with string keys
    Dict(BTreeMap<String, Literal>),
}

/// Element kind used for list homogeneity. Ints and floats are both numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Bool,
    Number,
    Str,
    List,
    Dict,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Str => "string",
            Self::List => "list",
            Self::Dict => "dict",
        };
        f.write_str(name)
    }
}

impl Literal {
    /// Parse a single literal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MetricsParse`] if the input is not a literal of the
    /// grammar above.
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_line(input, 1)
    }

    pub(crate) fn parse_line(input: &str, line: usize) -> Result<Self> {
        let mut parser = Parser::new(input);
        let value = parser
            .value()
            .and_then(|value| parser.finish().map(|()| value))
            .map_err(|reason| Error::metrics_parse(line, reason))?;
        Ok(value)
    }

    /// Numeric value, if this is an int or a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Mapping, if this is a dict.
    #[must_use]
    pub const fn as_dict(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Dict(map) => Some(map),
            _ => None,
        }
    }

    const fn kind(&self) -> Kind {
        match self {
            Self::Bool(_) => Kind::Bool,
            Self::Int(_) | Self::Float(_) => Kind::Number,
            Self::Str(_) => Kind::Str,
            Self::List(_) => Kind::List,
            Self::Dict(_) => Kind::Dict,
        }
    }
}

impl std::str::FromStr for Literal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

type ParseResult<T> = std::result::Result<T, String>;

/// Recursive descent parser over one line.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(format!(
                "expected '{expected}' at offset {}, found '{c}'",
                self.pos - c.len_utf8()
            )),
            None => Err(format!("expected '{expected}', found end of input")),
        }
    }

    fn finish(&mut self) -> ParseResult<()> {
        self.skip_ws();
        if self.pos == self.input.len() {
            Ok(())
        } else {
            Err(format!(
                "unexpected trailing input at offset {}: '{}'",
                self.pos,
                self.rest()
            ))
        }
    }

    fn value(&mut self) -> ParseResult<Literal> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.dict(),
            Some('[') => self.list(),
            Some(q @ ('\'' | '"')) => self.string(q).map(Literal::Str),
            Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => self.number(),
            Some(c) if c.is_alphabetic() => self.word(),
            Some(c) => Err(format!("unexpected '{c}' at offset {}", self.pos)),
            None => Err("expected a value, found end of input".to_string()),
        }
    }

    fn dict(&mut self) -> ParseResult<Literal> {
        self.expect('{')?;
        let mut map = BTreeMap::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(Literal::Dict(map));
                }
                Some(q @ ('\'' | '"')) => {
                    let key = self.string(q)?;
                    self.skip_ws();
                    self.expect(':')?;
                    let value = self.value()?;
                    map.insert(key, value);
                }
                Some(c) => {
                    return Err(format!(
                        "dict keys must be strings, found '{c}' at offset {}",
                        self.pos
                    ))
                }
                None => return Err("unterminated dict".to_string()),
            }
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(Literal::Dict(map)),
                Some(c) => return Err(format!("expected ',' or '}}' in dict, found '{c}'")),
                None => return Err("unterminated dict".to_string()),
            }
        }
    }

    fn list(&mut self) -> ParseResult<Literal> {
        self.expect('[')?;
        let mut items: Vec<Literal> = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(Literal::List(items));
            }
            let item = self.value()?;
            if let Some(first) = items.first() {
                if first.kind() != item.kind() {
                    return Err(format!(
                        "mixed list elements: {} and {}",
                        first.kind(),
                        item.kind()
                    ));
                }
            }
            items.push(item);
            self.skip_ws();
            match self.bump() {
                Some(',') => {}
                Some(']') => return Ok(Literal::List(items)),
                Some(c) => return Err(format!("expected ',' or ']' in list, found '{c}'")),
                None => return Err("unterminated list".to_string()),
            }
        }
    }

    fn string(&mut self, quote: char) -> ParseResult<String> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err("unterminated string".to_string()),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => out.push(self.escape()?),
                Some(c) => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> ParseResult<char> {
        match self.bump() {
            Some('\\') => Ok('\\'),
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('/') => Ok('/'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('u') => {
                let end = self.pos + 4;
                let hex = self
                    .input
                    .get(self.pos..end)
                    .ok_or_else(|| "truncated \\u escape".to_string())?;
                let code = u32::from_str_radix(hex, 16)
                    .map_err(|_| format!("invalid \\u escape '{hex}'"))?;
                self.pos = end;
                char::from_u32(code).ok_or_else(|| format!("invalid code point \\u{hex}"))
            }
            Some(c) => Err(format!("unsupported escape '\\{c}'")),
            None => Err("unterminated escape".to_string()),
        }
    }

    fn number(&mut self) -> ParseResult<Literal> {
        let start = self.pos;
        let negative = match self.peek() {
            Some('-') => {
                self.bump();
                true
            }
            Some('+') => {
                self.bump();
                false
            }
            _ => false,
        };

        if self.peek().is_some_and(char::is_alphabetic) {
            let word = self.identifier();
            let value = match word {
                "inf" | "Infinity" => f64::INFINITY,
                "nan" | "NaN" => f64::NAN,
                other => return Err(format!("invalid number '{other}'")),
            };
            return Ok(Literal::Float(if negative { -value } else { value }));
        }

        let mut is_float = false;
        let mut digits = 0usize;
        let mut prev = None;
        while let Some(c) = self.peek() {
            let accept = match c {
                '0'..='9' => {
                    digits += 1;
                    true
                }
                '.' | 'e' | 'E' => {
                    is_float = true;
                    true
                }
                '+' | '-' => matches!(prev, Some('e' | 'E')),
                _ => false,
            };
            if !accept {
                break;
            }
            prev = Some(c);
            self.bump();
        }

        let text = &self.input[start..self.pos];
        if digits == 0 {
            return Err(format!("invalid number '{text}'"));
        }
        if is_float {
            text.parse::<f64>()
                .map(Literal::Float)
                .map_err(|e| format!("invalid float '{text}': {e}"))
        } else {
            text.parse::<i64>()
                .map(Literal::Int)
                .map_err(|e| format!("invalid integer '{text}': {e}"))
        }
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn word(&mut self) -> ParseResult<Literal> {
        let start = self.pos;
        match self.identifier() {
            "True" | "true" => Ok(Literal::Bool(true)),
            "False" | "false" => Ok(Literal::Bool(false)),
            "inf" | "Infinity" => Ok(Literal::Float(f64::INFINITY)),
            "nan" | "NaN" => Ok(Literal::Float(f64::NAN)),
            other => Err(format!("'{other}' at offset {start} is not a literal")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(pairs: &[(&str, Literal)]) -> Literal {
        let entries = pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone()));
        Literal::Dict(entries.collect())
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(Literal::parse("42").unwrap(), Literal::Int(42));
        assert_eq!(Literal::parse("-7").unwrap(), Literal::Int(-7));
        assert_eq!(Literal::parse("0.5").unwrap(), Literal::Float(0.5));
        assert_eq!(Literal::parse("1e-05").unwrap(), Literal::Float(1e-5));
        assert_eq!(Literal::parse(".25").unwrap(), Literal::Float(0.25));
        assert_eq!(
            Literal::parse("-Infinity").unwrap(),
            Literal::Float(f64::NEG_INFINITY)
        );
        let nan = Literal::parse("NaN").unwrap();
        assert!(matches!(nan, Literal::Float(f) if f.is_nan()));
    }

    #[test]
    fn test_parse_strings_and_bools() {
        assert_eq!(
            Literal::parse("'abc'").unwrap(),
            Literal::Str("abc".into())
        );
        assert_eq!(
            Literal::parse(r#""a\"b\n""#).unwrap(),
            Literal::Str("a\"b\n".into())
        );
        assert_eq!(Literal::parse(r#""é""#).unwrap(), Literal::Str("é".into()));
        assert_eq!(Literal::parse("True").unwrap(), Literal::Bool(true));
        assert_eq!(Literal::parse("false").unwrap(), Literal::Bool(false));
    }

    #[test]
    fn test_parse_python_dict() {
        let parsed = Literal::parse("{'hits@1': 0.3, 'hits@10': 0.7}").unwrap();
        assert_eq!(
            parsed,
            dict(&[
                ("hits@1", Literal::Float(0.3)),
                ("hits@10", Literal::Float(0.7)),
            ])
        );
    }

    #[test]
    fn test_parse_json_dict_nested() {
        let text = r#"{"mrr": 0.5, "ranks": [1, 2.5, 3], "inner": {"ok": true},}"#;
        let parsed = Literal::parse(text).unwrap();
        let map = parsed.as_dict().unwrap();
        assert_eq!(map["mrr"].as_f64(), Some(0.5));
        assert_eq!(
            map["ranks"],
            Literal::List(vec![Literal::Int(1), Literal::Float(2.5), Literal::Int(3)])
        );
        assert_eq!(map["inner"], dict(&[("ok", Literal::Bool(true))]));
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(Literal::parse("[]").unwrap(), Literal::List(vec![]));
        assert_eq!(
            Literal::parse(" { } ").unwrap(),
            Literal::Dict(BTreeMap::new())
        );
    }

    #[test]
    fn test_rejects_outside_grammar() {
        for bad in [
            "",
            "None",
            "null",
            "__import__('os')",
            "(1, 2)",
            "{1: 2}",
            "[1, 'a']",
            "'unterminated",
            "{'a': 1",
            "1 2",
            "1.2.3",
            "-",
            "'\\x41'",
            "99999999999999999999",
        ] {
            let err = Literal::parse(bad).unwrap_err();
            assert!(
                matches!(err, Error::MetricsParse { line: 1, .. }),
                "{bad:?}: {err}"
            );
        }
    }
}
