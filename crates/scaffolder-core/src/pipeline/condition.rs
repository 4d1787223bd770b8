//! `when` expressions for prompts and file filters
//!
//! Conditions are parsed once when a template's options are loaded and then
//! evaluated against the metadata snapshot at the moment they are reached.
//! The grammar is deliberately small:
//!
//! ```text
//! expr    := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | primary
//! primary := "(" expr ")" | path ( ( "==" | "===" | "!=" | "!==" ) literal )?
//! literal := "string" | 'string' | number | true | false | null
//! ```
//!
//! A path is a dotted key (`features.router`). Paths that do not resolve are
//! falsy and compare equal only to `null`.

use crate::error::ConditionError;
use crate::metadata::{is_truthy, lookup, Metadata};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Literal on the right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

impl Literal {
    fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (Literal::Null, None | Some(Value::Null)) => true,
            (Literal::Bool(expected), Some(Value::Bool(actual))) => expected == actual,
            (Literal::Number(expected), Some(Value::Number(actual))) => {
                actual.as_f64() == Some(*expected)
            }
            (Literal::String(expected), Some(Value::String(actual))) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// Parsed condition expression
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "String")]
pub enum Condition {
    Truthy(Vec<String>),
    Not(Box<Condition>),
    Equals(Vec<String>, Literal),
    NotEquals(Vec<String>, Literal),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ConditionError::Empty);
        }

        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            source,
        };
        let condition = parser.expr()?;
        if parser.pos != tokens.len() {
            return Err(ConditionError::Trailing(source.to_string()));
        }
        Ok(condition)
    }

    /// Evaluate against the current metadata. Never fails: missing keys are
    /// simply falsy.
    pub fn evaluate(&self, metadata: &Metadata) -> bool {
        match self {
            Condition::Truthy(path) => lookup(metadata, path).is_some_and(is_truthy),
            Condition::Not(inner) => !inner.evaluate(metadata),
            Condition::Equals(path, literal) => literal.matches(lookup(metadata, path)),
            Condition::NotEquals(path, literal) => !literal.matches(lookup(metadata, path)),
            Condition::All(all) => all.iter().all(|c| c.evaluate(metadata)),
            Condition::Any(any) => any.iter().any(|c| c.evaluate(metadata)),
        }
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Condition {
    type Error = ConditionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, parts: &[Condition], op: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    write!(f, " {} ", op)?;
                }
                write!(f, "{}", part)?;
            }
            write!(f, ")")
        }

        match self {
            Condition::Truthy(path) => write!(f, "{}", path.join(".")),
            Condition::Not(inner) => write!(f, "!{}", inner),
            Condition::Equals(path, lit) => write!(f, "{} == {}", path.join("."), lit),
            Condition::NotEquals(path, lit) => write!(f, "{} != {}", path.join("."), lit),
            Condition::All(all) => join(f, all, "&&"),
            Condition::Any(any) => join(f, any, "||"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Bang,
    Eq,
    NotEq,
    And,
    Or,
    Open,
    Close,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |at: usize| chars.get(at).map(|(_, c)| *c);

    while let Some(&(offset, c)) = chars.get(i) {
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '!' => {
                if peek(i + 1) == Some('=') {
                    tokens.push(Token::NotEq);
                    i += if peek(i + 2) == Some('=') { 3 } else { 2 };
                } else {
                    tokens.push(Token::Bang);
                    i += 1;
                }
            }
            '=' if peek(i + 1) == Some('=') => {
                tokens.push(Token::Eq);
                i += if peek(i + 2) == Some('=') { 3 } else { 2 };
            }
            '&' if peek(i + 1) == Some('&') => {
                tokens.push(Token::And);
                i += 2;
            }
            '|' if peek(i + 1) == Some('|') => {
                tokens.push(Token::Or);
                i += 2;
            }
            '"' | '\'' => {
                let quote = c;
                let mut text = String::new();
                let mut j = i + 1;
                loop {
                    match peek(j) {
                        None => return Err(ConditionError::UnterminatedString(source.to_string())),
                        Some('\\') => {
                            if let Some(escaped) = peek(j + 1) {
                                text.push(escaped);
                            }
                            j += 2;
                        }
                        Some(ch) if ch == quote => break,
                        Some(ch) => {
                            text.push(ch);
                            j += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
                i = j + 1;
            }
            c if c.is_ascii_digit() || (c == '-' && peek(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let start = offset;
                let mut j = i + 1;
                while peek(j).is_some_and(|n| n.is_ascii_digit() || n == '.') {
                    j += 1;
                }
                let end = chars.get(j).map(|(o, _)| *o).unwrap_or(source.len());
                let number = source[start..end].parse::<f64>().map_err(|_| {
                    ConditionError::UnexpectedChar {
                        found: c,
                        offset,
                        source_text: source.to_string(),
                    }
                })?;
                tokens.push(Token::Num(number));
                i = j;
            }
            c if is_ident_char(c) => {
                let mut j = i + 1;
                while peek(j).is_some_and(|n| is_ident_char(n) || n == '.') {
                    j += 1;
                }
                let end = chars.get(j).map(|(o, _)| *o).unwrap_or(source.len());
                tokens.push(Token::Ident(source[offset..end].to_string()));
                i = j;
            }
            _ => {
                return Err(ConditionError::UnexpectedChar {
                    found: c,
                    offset,
                    source_text: source.to_string(),
                })
            }
        }
    }

    Ok(tokens)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '-'
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expected(&self, expected: &'static str) -> ConditionError {
        ConditionError::Expected {
            expected,
            source_text: self.source.to_string(),
        }
    }

    fn expr(&mut self) -> Result<Condition, ConditionError> {
        let mut any = vec![self.and()?];
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            any.push(self.and()?);
        }
        Ok(if any.len() == 1 {
            any.remove(0)
        } else {
            Condition::Any(any)
        })
    }

    fn and(&mut self) -> Result<Condition, ConditionError> {
        let mut all = vec![self.unary()?];
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            all.push(self.unary()?);
        }
        Ok(if all.len() == 1 {
            all.remove(0)
        } else {
            Condition::All(all)
        })
    }

    fn unary(&mut self) -> Result<Condition, ConditionError> {
        if self.peek() == Some(&Token::Bang) {
            self.pos += 1;
            return Ok(Condition::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Condition, ConditionError> {
        match self.next().cloned() {
            Some(Token::Open) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(self.expected("')'")),
                }
            }
            Some(Token::Ident(name)) => {
                let path: Vec<String> = name.split('.').map(str::to_string).collect();
                if path.iter().any(String::is_empty) {
                    return Err(self.expected("a key path"));
                }
                match self.peek() {
                    Some(Token::Eq) => {
                        self.pos += 1;
                        Ok(Condition::Equals(path, self.literal()?))
                    }
                    Some(Token::NotEq) => {
                        self.pos += 1;
                        Ok(Condition::NotEquals(path, self.literal()?))
                    }
                    _ => Ok(Condition::Truthy(path)),
                }
            }
            _ => Err(self.expected("a key or '('")),
        }
    }

    fn literal(&mut self) -> Result<Literal, ConditionError> {
        match self.next().cloned() {
            Some(Token::Str(s)) => Ok(Literal::String(s)),
            Some(Token::Num(n)) => Ok(Literal::Number(n)),
            Some(Token::Ident(word)) => match word.as_str() {
                "true" => Ok(Literal::Bool(true)),
                "false" => Ok(Literal::Bool(false)),
                "null" | "undefined" => Ok(Literal::Null),
                _ => Err(self.expected("a literal")),
            },
            _ => Err(self.expected("a literal")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    fn eval(expr: &str, value: Value) -> bool {
        Condition::parse(expr).unwrap().evaluate(&data(value))
    }

    #[test]
    fn test_bare_key_truthiness() {
        assert!(eval("useTests", json!({ "useTests": true })));
        assert!(!eval("useTests", json!({ "useTests": false })));
        assert!(!eval("useTests", json!({})));
        assert!(!eval("name", json!({ "name": "" })));
    }

    #[test]
    fn test_negation() {
        assert!(eval("!useTests", json!({ "useTests": false })));
        assert!(eval("!useTests", json!({})));
        assert!(!eval("!!useTests", json!({})));
    }

    #[test]
    fn test_equality_against_literals() {
        let meta = json!({ "runner": "jest", "port": 8080, "lint": true });
        assert!(eval("runner == 'jest'", meta.clone()));
        assert!(eval("runner === \"jest\"", meta.clone()));
        assert!(eval("runner != 'karma'", meta.clone()));
        assert!(!eval("runner !== 'jest'", meta.clone()));
        assert!(eval("port == 8080", meta.clone()));
        assert!(eval("lint == true", meta.clone()));
        assert!(!eval("port == '8080'", meta.clone()));
        assert!(eval("missing == null", meta.clone()));
        assert!(!eval("missing == 'x'", meta));
    }

    #[test]
    fn test_conjunction_disjunction_and_grouping() {
        let meta = json!({ "a": true, "b": false, "c": true });
        assert!(!eval("a && b", meta.clone()));
        assert!(eval("a && !b && c", meta.clone()));
        assert!(eval("b || c", meta.clone()));
        assert!(eval("(b || a) && c", meta.clone()));
        assert!(!eval("!(a && c)", meta));
    }

    #[test]
    fn test_nested_path_into_multi_select() {
        let meta = json!({ "features": { "router": true } });
        assert!(eval("features.router", meta.clone()));
        assert!(!eval("features.vuex", meta.clone()));
        assert!(!eval("nothing.here", meta));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Condition::parse("   "), Err(ConditionError::Empty));
        assert!(matches!(
            Condition::parse("a == 'open"),
            Err(ConditionError::UnterminatedString(_))
        ));
        assert!(matches!(
            Condition::parse("a b"),
            Err(ConditionError::Trailing(_))
        ));
        assert!(matches!(
            Condition::parse("(a && b"),
            Err(ConditionError::Expected { .. })
        ));
        assert!(matches!(
            Condition::parse("a == other"),
            Err(ConditionError::Expected { .. })
        ));
        assert!(matches!(
            Condition::parse("a # b"),
            Err(ConditionError::UnexpectedChar { found: '#', .. })
        ));
    }

    #[test]
    fn test_deserialize_from_string() {
        let condition: Condition = serde_json::from_str("\"lint && lintConfig == 'airbnb'\"").unwrap();
        assert_eq!(
            condition,
            Condition::All(vec![
                Condition::Truthy(vec!["lint".to_string()]),
                Condition::Equals(
                    vec!["lintConfig".to_string()],
                    Literal::String("airbnb".to_string())
                ),
            ])
        );
        assert_eq!(condition.to_string(), "(lint && lintConfig == \"airbnb\")");
    }
}
