//! Plain-text search, the fallback for input that is not a semantic query.
//!
//! - `N-M` matches connections whose local or remote port is in `N..=M`
//! - text containing `*` is matched as an anchored wildcard per column
//! - anything else is a case-insensitive substring match on any column

use crate::query::{parse_query, Predicate, WildcardPattern};
use crate::Connection;

/// Plain-text search over the displayed columns of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSearch {
    /// Blank input matches everything.
    Any,
    /// Inclusive port range.
    PortRange(u16, u16),
    Wildcard(WildcardPattern),
    Substring(String),
}

impl TextSearch {
    pub fn new(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return TextSearch::Any;
        }

        if let Some((low, high)) = parse_port_range(input) {
            return TextSearch::PortRange(low, high);
        }

        let lowered = input.to_lowercase();
        if WildcardPattern::is_pattern(&lowered) {
            TextSearch::Wildcard(WildcardPattern::new(&lowered))
        } else {
            TextSearch::Substring(lowered)
        }
    }

    pub fn matches(&self, conn: &Connection) -> bool {
        match self {
            TextSearch::Any => true,
            TextSearch::PortRange(low, high) => {
                let in_range = |port: u16| (*low..=*high).contains(&port);
                in_range(conn.local.port) || conn.remote.port.is_some_and(in_range)
            }
            TextSearch::Wildcard(pattern) => columns(conn).iter().any(|c| pattern.matches(c)),
            TextSearch::Substring(needle) => columns(conn).iter().any(|c| c.contains(needle.as_str())),
        }
    }
}

/// `low-high` with both ends parsing as ports. Reversed ends are swapped.
fn parse_port_range(input: &str) -> Option<(u16, u16)> {
    let (low, high) = input.split_once('-')?;
    let low: u16 = low.trim().parse().ok()?;
    let high: u16 = high.trim().parse().ok()?;
    Some((low.min(high), low.max(high)))
}

/// Searchable columns, lowercased.
fn columns(conn: &Connection) -> Vec<String> {
    let mut columns = vec![
        conn.protocol.to_lowercase(),
        conn.local_address().to_lowercase(),
        conn.local.port.to_string(),
        conn.remote_address().to_lowercase(),
        conn.state.to_lowercase(),
        conn.pid.to_string(),
        conn.process_name.to_lowercase(),
    ];
    if let Some(port) = conn.remote.port {
        columns.push(port.to_string());
    }
    columns
}

/// What the user typed, resolved to either a semantic query or a text search.
#[derive(Debug, Clone)]
pub enum Filter {
    All,
    Semantic(Predicate),
    Text(TextSearch),
}

impl Filter {
    /// Semantic query when `input` parses as one, otherwise text search.
    pub fn new(input: &str) -> Self {
        if input.trim().is_empty() {
            return Filter::All;
        }
        match parse_query(input) {
            Some(predicate) => Filter::Semantic(predicate),
            None => Filter::Text(TextSearch::new(input)),
        }
    }

    pub fn is_semantic(&self) -> bool {
        matches!(self, Filter::Semantic(_))
    }

    pub fn matches(&self, conn: &Connection) -> bool {
        match self {
            Filter::All => true,
            Filter::Semantic(predicate) => predicate.matches(conn),
            Filter::Text(search) => search.matches(conn),
        }
    }

    /// Keep only matching connections.
    pub fn apply(&self, connections: Vec<Connection>) -> Vec<Connection> {
        connections.into_iter().filter(|c| self.matches(c)).collect()
    }
}
