//! Recursive-descent parser for the semantic query language.
//!
//! ```text
//! Expression := AndTerm (OR AndTerm)*
//! AndTerm    := Factor  (AND Factor)*
//! Factor     := '(' Expression ')' | '!' Factor | Comparison
//! Comparison := IDENTIFIER Operator Value
//! Value      := NUMBER | STRING | IDENTIFIER
//! ```

use std::borrow::Cow;
use std::fmt;

use super::eval::Field;
use super::lexer::{Lexer, LogicOp, Token};
use super::wildcard::WildcardPattern;

/// Maximum depth of nested groups and negations.
pub const MAX_DEPTH: usize = 256;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=` or `:`, honours `*` wildcards
    Eq,
    /// `!=`, plain inequality
    NotEq,
    /// `>` greater than
    Gt,
    /// `<` less than
    Lt,
    /// `>=` greater or equal
    Gte,
    /// `<=` less or equal
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::NotEq => write!(f, "!="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Gte => write!(f, ">="),
            CompareOp::Lte => write!(f, "<="),
        }
    }
}

/// Field named on the left of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    Known(Field),
    /// Not in the dictionary; the comparison is always false.
    Unknown(String),
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Known(field) => f.write_str(field.canonical()),
            FieldRef::Unknown(name) => f.write_str(name),
        }
    }
}

/// Right-hand value of a comparison. Text is stored lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Number(i64),
    Text(String),
    /// Text containing `*` on the right of `=`.
    Pattern(WildcardPattern),
}

impl Literal {
    /// The literal as lowercase text.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Literal::Number(n) => Cow::Owned(n.to_string()),
            Literal::Text(t) => Cow::Borrowed(t),
            Literal::Pattern(p) => Cow::Borrowed(p.source()),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            _ => {
                let text = self.text();
                if text.contains('"') {
                    write!(f, "'{}'", text)
                } else {
                    write!(f, "\"{}\"", text)
                }
            }
        }
    }
}

/// Leaf `field op value` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub field: FieldRef,
    pub op: CompareOp,
    pub value: Literal,
}

impl Comparison {
    /// Build a comparison, resolving the (lowercased) field name and
    /// compiling `*` wildcards for `=`.
    pub fn new(field: &str, op: CompareOp, value: Literal) -> Self {
        let field = field.to_lowercase();
        let field = match Field::lookup(&field) {
            Some(known) => FieldRef::Known(known),
            None => FieldRef::Unknown(field),
        };
        let value = match value {
            Literal::Text(text) => {
                let text = text.to_lowercase();
                if op == CompareOp::Eq && WildcardPattern::is_pattern(&text) {
                    Literal::Pattern(WildcardPattern::new(&text))
                } else {
                    Literal::Text(text)
                }
            }
            other => other,
        };
        Self { field, op, value }
    }
}

/// Expression tree. Immutable once built and evaluable any number of times.
///
/// A run of the same connective is a single `And`/`Or` node holding two or
/// more terms, so tree depth is bounded by groups and negations alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Comparison(Comparison),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Comparison(c) => write!(f, "{}{}{}", c.field, c.op, c.value),
            Expr::And(terms) => write_terms(f, terms, " && ", |t| matches!(t, Expr::And(_) | Expr::Or(_))),
            Expr::Or(terms) => write_terms(f, terms, " || ", |t| matches!(t, Expr::Or(_))),
            Expr::Not(inner) => match **inner {
                Expr::And(_) | Expr::Or(_) => write!(f, "!({})", inner),
                _ => write!(f, "!{}", inner),
            },
        }
    }
}

/// Join `terms` with `sep`, parenthesizing the ones `grouped` picks out.
fn write_terms(
    f: &mut fmt::Formatter<'_>,
    terms: &[Expr],
    sep: &str,
    grouped: fn(&Expr) -> bool,
) -> fmt::Result {
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        if grouped(term) {
            write!(f, "({})", term)?;
        } else {
            write!(f, "{}", term)?;
        }
    }
    Ok(())
}

/// Why a query is not a valid semantic query.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected a field name, found {0}")]
    ExpectedField(Token),

    #[error("expected an operator after '{field}', found {found}")]
    ExpectedOperator { field: String, found: Token },

    #[error("expected a value after '{field}{op}', found {found}")]
    ExpectedValue {
        field: String,
        op: CompareOp,
        found: Token,
    },

    #[error("expected ')', found {0}")]
    UnclosedGroup(Token),

    #[error("unexpected {0} after expression")]
    TrailingInput(Token),

    #[error("expression nested deeper than {} levels", MAX_DEPTH)]
    TooDeep,
}

/// Parse a query string into an expression tree.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    Parser::new(input).parse()
}

/// Parser with one token of lookahead, pulling tokens from the lexer lazily.
struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<Expr, ParseError> {
        let expr = self.expression()?;
        match self.advance() {
            Token::Eof => Ok(expr),
            token => Err(ParseError::TrailingInput(token)),
        }
    }

    /// Consume the current token and return it.
    fn advance(&mut self) -> Token {
        let next = self.lexer.next_token();
        std::mem::replace(&mut self.current, next)
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        let first = self.and_term()?;
        if self.current != Token::Logic(LogicOp::Or) {
            return Ok(first);
        }
        let mut terms = vec![first];
        while self.current == Token::Logic(LogicOp::Or) {
            self.advance();
            terms.push(self.and_term()?);
        }
        Ok(Expr::Or(terms))
    }

    fn and_term(&mut self) -> Result<Expr, ParseError> {
        let first = self.factor()?;
        if self.current != Token::Logic(LogicOp::And) {
            return Ok(first);
        }
        let mut terms = vec![first];
        while self.current == Token::Logic(LogicOp::And) {
            self.advance();
            terms.push(self.factor()?);
        }
        Ok(Expr::And(terms))
    }

    fn factor(&mut self) -> Result<Expr, ParseError> {
        match self.current {
            Token::LParen => {
                self.descend()?;
                self.advance();
                let inner = self.expression()?;
                match self.advance() {
                    Token::RParen => {}
                    token => return Err(ParseError::UnclosedGroup(token)),
                }
                self.depth -= 1;
                Ok(inner)
            }
            Token::Not => {
                self.descend()?;
                self.advance();
                let inner = self.factor()?;
                self.depth -= 1;
                Ok(Expr::Not(Box::new(inner)))
            }
            _ => self.comparison(),
        }
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let field = match self.advance() {
            Token::Ident(name) => name,
            token => return Err(ParseError::ExpectedField(token)),
        };

        let op = match self.advance() {
            Token::Op(op) => op,
            found => return Err(ParseError::ExpectedOperator { field, found }),
        };

        let value = match self.advance() {
            Token::Number(n) => Literal::Number(n),
            Token::Str(text) | Token::Ident(text) => Literal::Text(text),
            found => return Err(ParseError::ExpectedValue { field, op, found }),
        };

        Ok(Expr::Comparison(Comparison::new(&field, op, value)))
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep);
        }
        Ok(())
    }
}
