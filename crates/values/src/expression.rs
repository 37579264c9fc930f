//! Restricted arithmetic/aggregate expression grammar for the `derived`
//! generator (spec.md §4.3, §9).
//!
//! Deliberately NOT a general expression evaluator: the grammar covers only
//! scalar field references, the four arithmetic operators, numeric
//! literals, and `sum(...)`/`product(...)` aggregates over
//! `item['field'] * item['field']`-style comprehensions across an array
//! field of the current object. Anything outside this grammar is a parse
//! error, which the spec requires callers to reject at validation time.

use serde_json::{Map, Value};

use crate::error::ValuesError;

/// Parsed expression, ready to evaluate against a partially-built payload.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Reference to a scalar field of the current object.
    Field(String),
    /// `lhs + rhs`.
    Add(Box<Expr>, Box<Expr>),
    /// `lhs - rhs`.
    Sub(Box<Expr>, Box<Expr>),
    /// `lhs * rhs`.
    Mul(Box<Expr>, Box<Expr>),
    /// `lhs / rhs`.
    Div(Box<Expr>, Box<Expr>),
    /// `sum(item_expr for item in array_field)`.
    Sum { item_expr: Box<ItemExpr>, array_field: String },
    /// `product(item_expr for item in array_field)`.
    Product { item_expr: Box<ItemExpr>, array_field: String },
}

/// An expression evaluated once per item inside an aggregate.
#[derive(Debug, Clone)]
pub enum ItemExpr {
    /// Numeric literal.
    Number(f64),
    /// `item['field']`.
    ItemField(String),
    /// `lhs * rhs`.
    Mul(Box<ItemExpr>, Box<ItemExpr>),
    /// `lhs / rhs`.
    Div(Box<ItemExpr>, Box<ItemExpr>),
}

impl Expr {
    /// Parse a `derived` expression string.
    pub fn parse(source: &str) -> Result<Expr, ValuesError> {
        let tokens = tokenize(source)
            .map_err(|e| ValuesError::InvalidExpression(source.to_string(), e))?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser
            .parse_expr()
            .map_err(|e| ValuesError::InvalidExpression(source.to_string(), e))?;
        if parser.pos != parser.tokens.len() {
            return Err(ValuesError::InvalidExpression(
                source.to_string(),
                "trailing tokens after expression".to_string(),
            ));
        }
        Ok(expr)
    }

    /// Evaluate against the partially-built payload object.
    pub fn eval(&self, partial: &Map<String, Value>) -> Result<f64, ValuesError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Field(name) => partial
                .get(name)
                .and_then(Value::as_f64)
                .ok_or_else(|| ValuesError::UnknownDerivedField(name.clone())),
            Expr::Add(a, b) => Ok(a.eval(partial)? + b.eval(partial)?),
            Expr::Sub(a, b) => Ok(a.eval(partial)? - b.eval(partial)?),
            Expr::Mul(a, b) => Ok(a.eval(partial)? * b.eval(partial)?),
            Expr::Div(a, b) => Ok(a.eval(partial)? / b.eval(partial)?),
            Expr::Sum { item_expr, array_field } => {
                let items = array_items(partial, array_field)?;
                let mut total = 0.0;
                for item in items {
                    total += item_expr.eval(item)?;
                }
                Ok(total)
            }
            Expr::Product { item_expr, array_field } => {
                let items = array_items(partial, array_field)?;
                let mut total = 1.0;
                for item in items {
                    total *= item_expr.eval(item)?;
                }
                Ok(total)
            }
        }
    }
}

impl ItemExpr {
    fn eval(&self, item: &Map<String, Value>) -> Result<f64, ValuesError> {
        match self {
            ItemExpr::Number(n) => Ok(*n),
            ItemExpr::ItemField(name) => item
                .get(name)
                .and_then(Value::as_f64)
                .ok_or_else(|| ValuesError::UnknownDerivedField(name.clone())),
            ItemExpr::Mul(a, b) => Ok(a.eval(item)? * b.eval(item)?),
            ItemExpr::Div(a, b) => Ok(a.eval(item)? / b.eval(item)?),
        }
    }
}

fn array_items<'a>(partial: &'a Map<String, Value>, array_field: &str) -> Result<Vec<&'a Map<String, Value>>, ValuesError> {
    let array = partial
        .get(array_field)
        .and_then(Value::as_array)
        .ok_or_else(|| ValuesError::UnknownDerivedField(array_field.to_string()))?;
    array
        .iter()
        .map(|v| v.as_object().ok_or_else(|| ValuesError::UnknownDerivedField(array_field.to_string())))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Str(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => i += 1,
            '+' => { tokens.push(Token::Plus); i += 1; }
            '-' => { tokens.push(Token::Minus); i += 1; }
            '*' => { tokens.push(Token::Star); i += 1; }
            '/' => { tokens.push(Token::Slash); i += 1; }
            '(' => { tokens.push(Token::LParen); i += 1; }
            ')' => { tokens.push(Token::RParen); i += 1; }
            '[' => { tokens.push(Token::LBracket); i += 1; }
            ']' => { tokens.push(Token::RBracket); i += 1; }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != quote {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err("unterminated string literal".to_string());
                }
                tokens.push(Token::Str(chars[start..j].iter().collect()));
                i = j + 1;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                    j += 1;
                }
                let text: String = chars[start..j].iter().collect();
                let value: f64 = text.parse().map_err(|_| format!("invalid number `{text}`"))?;
                tokens.push(Token::Number(value));
                i = j;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                let mut j = i;
                while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                tokens.push(Token::Ident(chars[start..j].iter().collect()));
                i = j;
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.next() {
            Some(ref t) if t == expected => Ok(()),
            other => Err(format!("expected {expected:?}, found {other:?}")),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => { self.pos += 1; lhs = Expr::Add(Box::new(lhs), Box::new(self.parse_term()?)); }
                Some(Token::Minus) => { self.pos += 1; lhs = Expr::Sub(Box::new(lhs), Box::new(self.parse_term()?)); }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => { self.pos += 1; lhs = Expr::Mul(Box::new(lhs), Box::new(self.parse_factor()?)); }
                Some(Token::Slash) => { self.pos += 1; lhs = Expr::Div(Box::new(lhs), Box::new(self.parse_factor()?)); }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_factor(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) if name == "sum" || name == "product" => {
                self.expect(&Token::LParen)?;
                let item_expr = self.parse_item_expr()?;
                self.expect_ident("for")?;
                self.expect_ident("item")?;
                self.expect_ident("in")?;
                let array_field = self.expect_any_ident()?;
                self.expect(&Token::RParen)?;
                if name == "sum" {
                    Ok(Expr::Sum { item_expr: Box::new(item_expr), array_field })
                } else {
                    Ok(Expr::Product { item_expr: Box::new(item_expr), array_field })
                }
            }
            Some(Token::Ident(name)) => Ok(Expr::Field(name)),
            other => Err(format!("unexpected token in expression: {other:?}")),
        }
    }

    fn parse_item_expr(&mut self) -> Result<ItemExpr, String> {
        let mut lhs = self.parse_item_factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => { self.pos += 1; lhs = ItemExpr::Mul(Box::new(lhs), Box::new(self.parse_item_factor()?)); }
                Some(Token::Slash) => { self.pos += 1; lhs = ItemExpr::Div(Box::new(lhs), Box::new(self.parse_item_factor()?)); }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_item_factor(&mut self) -> Result<ItemExpr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(ItemExpr::Number(n)),
            Some(Token::Ident(name)) if name == "item" => {
                self.expect(&Token::LBracket)?;
                let field = match self.next() {
                    Some(Token::Str(s)) => s,
                    other => return Err(format!("expected string field name, found {other:?}")),
                };
                self.expect(&Token::RBracket)?;
                Ok(ItemExpr::ItemField(field))
            }
            other => Err(format!("unexpected token in item expression: {other:?}")),
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(), String> {
        match self.next() {
            Some(Token::Ident(ref s)) if s == expected => Ok(()),
            other => Err(format!("expected keyword `{expected}`, found {other:?}")),
        }
    }

    fn expect_any_ident(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Ident(s)) => Ok(s),
            other => Err(format!("expected identifier, found {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_arithmetic() {
        let expr = Expr::parse("a + b * 2").unwrap();
        let mut partial = Map::new();
        partial.insert("a".to_string(), json!(3.0));
        partial.insert("b".to_string(), json!(4.0));
        assert_eq!(expr.eval(&partial).unwrap(), 11.0);
    }

    #[test]
    fn test_sum_aggregate_over_items() {
        let expr = Expr::parse("sum(item['quantity'] * item['unit_price'] for item in items)").unwrap();
        let mut partial = Map::new();
        partial.insert(
            "items".to_string(),
            json!([
                { "quantity": 2, "unit_price": 10.00 },
                { "quantity": 1, "unit_price": 5.50 },
            ]),
        );
        let total = expr.eval(&partial).unwrap();
        assert!((total - 25.50).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_field_errors() {
        let expr = Expr::parse("missing_field").unwrap();
        let partial = Map::new();
        assert!(expr.eval(&partial).is_err());
    }

    #[test]
    fn test_rejects_out_of_grammar_expression() {
        assert!(Expr::parse("import os").is_err());
        assert!(Expr::parse("a if b else c").is_err());
    }
}
