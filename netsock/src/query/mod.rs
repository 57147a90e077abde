//! Semantic query language for filtering connections.
//!
//! # Syntax Overview
//!
//! A query is one or more `field operator value` comparisons joined with
//! logical connectives:
//!
//! ```text
//! process=chrome && lport>1000 || (state=LISTEN && !proto=udp6)
//! ```
//!
//! - **Operators**: `=` (or `:` or `==`), `!=`, `>`, `<`, `>=`, `<=`
//! - **Connectives**: `&&`/`AND`, `||`/`OR`, `!` (negation), parentheses
//! - **Values**: numbers, bare words, or `"quoted"`/`'quoted'` strings
//! - **Wildcards**: `*` in a `=` value matches any run of characters
//!
//! AND binds tighter than OR. Field names and text values are
//! case-insensitive. Unknown fields and missing values never match.
//! Queries nest at most [`MAX_DEPTH`] groups or negations deep; a flat
//! chain of `&&` or `||` may be any length.
//!
//! Anything that does not parse is "not a semantic query"; callers fall
//! back to plain text search (see [`crate::search`]).

mod eval;
mod lexer;
mod parser;
mod wildcard;

pub use eval::{Field, FieldValue};
pub use lexer::{Lexer, LogicOp, Token};
pub use parser::{parse, CompareOp, Comparison, Expr, FieldRef, Literal, ParseError, MAX_DEPTH};
pub use wildcard::WildcardPattern;

use crate::Connection;

/// A parsed query, reusable across any number of records and threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    expr: Expr,
}

impl Predicate {
    /// Whether `conn` satisfies the query.
    pub fn matches(&self, conn: &Connection) -> bool {
        self.expr.evaluate(conn)
    }

    /// The underlying expression tree.
    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl From<Expr> for Predicate {
    fn from(expr: Expr) -> Self {
        Self { expr }
    }
}

/// Parse a semantic query into a predicate.
///
/// Returns `None` for blank input and for anything that does not parse;
/// no diagnostic is surfaced.
pub fn parse_query(query: &str) -> Option<Predicate> {
    if query.trim().is_empty() {
        return None;
    }

    match parse(query) {
        Ok(expr) => Some(Predicate { expr }),
        Err(e) => {
            tracing::debug!(query, error = %e, "not a semantic query");
            None
        }
    }
}

/// Whether `query` is a valid semantic query.
pub fn is_valid_query(query: &str) -> bool {
    parse_query(query).is_some()
}
