//! Field dictionary and expression evaluation.

use std::cmp::Ordering;

use crate::Connection;

use super::parser::{CompareOp, Comparison, Expr, FieldRef, Literal};

/// Queryable fields of a [`Connection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Pid,
    Protocol,
    State,
    Process,
    LocalPort,
    RemotePort,
    LocalAddress,
    RemoteAddress,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Pid,
        Field::Protocol,
        Field::State,
        Field::Process,
        Field::LocalPort,
        Field::RemotePort,
        Field::LocalAddress,
        Field::RemoteAddress,
    ];

    /// Resolve a lowercase field name or alias.
    pub fn lookup(name: &str) -> Option<Field> {
        let field = match name {
            "pid" => Field::Pid,
            "proto" | "protocol" => Field::Protocol,
            "state" => Field::State,
            "process" | "name" | "processname" => Field::Process,
            "lport" | "localport" => Field::LocalPort,
            "rport" | "remoteport" => Field::RemotePort,
            "laddr" | "local" | "localaddress" => Field::LocalAddress,
            "raddr" | "remote" | "remoteaddress" => Field::RemoteAddress,
            _ => return None,
        };
        Some(field)
    }

    pub fn canonical(self) -> &'static str {
        match self {
            Field::Pid => "pid",
            Field::Protocol => "proto",
            Field::State => "state",
            Field::Process => "process",
            Field::LocalPort => "lport",
            Field::RemotePort => "rport",
            Field::LocalAddress => "laddr",
            Field::RemoteAddress => "raddr",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::Pid | Field::State => &[],
            Field::Protocol => &["protocol"],
            Field::Process => &["name", "processname"],
            Field::LocalPort => &["localport"],
            Field::RemotePort => &["remoteport"],
            Field::LocalAddress => &["local", "localaddress"],
            Field::RemoteAddress => &["remote", "remoteaddress"],
        }
    }

    /// Numeric fields order numerically; the rest lexicographically.
    pub fn is_numeric(self) -> bool {
        matches!(self, Field::Pid | Field::LocalPort | Field::RemotePort)
    }

    /// Read this field from a record. `None` when the record has no value.
    pub fn extract(self, conn: &Connection) -> Option<FieldValue<'_>> {
        let value = match self {
            Field::Pid => FieldValue::Number(i64::from(conn.pid)),
            Field::Protocol => FieldValue::Text(&conn.protocol),
            Field::State => FieldValue::Text(&conn.state),
            Field::Process => FieldValue::Text(&conn.process_name),
            Field::LocalPort => FieldValue::Number(i64::from(conn.local.port)),
            Field::RemotePort => FieldValue::Number(i64::from(conn.remote.port?)),
            Field::LocalAddress => FieldValue::Text(conn.local_address()),
            Field::RemoteAddress => FieldValue::Text(conn.remote_address()),
        };
        Some(value)
    }
}

/// A field's value on one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Number(i64),
    Text(&'a str),
}

impl FieldValue<'_> {
    fn lowercase(&self) -> String {
        match self {
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.to_lowercase(),
        }
    }
}

impl Expr {
    /// Evaluate against one record.
    pub fn evaluate(&self, conn: &Connection) -> bool {
        match self {
            Expr::Comparison(c) => c.evaluate(conn),
            Expr::And(terms) => terms.iter().all(|t| t.evaluate(conn)),
            Expr::Or(terms) => terms.iter().any(|t| t.evaluate(conn)),
            Expr::Not(inner) => !inner.evaluate(conn),
        }
    }
}

impl Comparison {
    /// Unknown fields and absent values never match, whatever the operator.
    pub fn evaluate(&self, conn: &Connection) -> bool {
        let FieldRef::Known(field) = &self.field else {
            return false;
        };
        let Some(actual) = field.extract(conn) else {
            return false;
        };

        match self.op {
            CompareOp::Eq => equals(&actual, &self.value),
            CompareOp::NotEq => compare(&actual, &self.value) != Ordering::Equal,
            CompareOp::Gt => compare(&actual, &self.value) == Ordering::Greater,
            CompareOp::Lt => compare(&actual, &self.value) == Ordering::Less,
            CompareOp::Gte => compare(&actual, &self.value) != Ordering::Less,
            CompareOp::Lte => compare(&actual, &self.value) != Ordering::Greater,
        }
    }
}

fn equals(actual: &FieldValue<'_>, literal: &Literal) -> bool {
    match literal {
        Literal::Pattern(pattern) => pattern.matches(&actual.lowercase()),
        _ => compare(actual, literal) == Ordering::Equal,
    }
}

/// Order `actual` against `literal`.
///
/// Numbers compare numerically, including quoted digits against a numeric
/// field. Everything else compares as lowercase text.
fn compare(actual: &FieldValue<'_>, literal: &Literal) -> Ordering {
    match (actual, literal) {
        (FieldValue::Number(a), Literal::Number(b)) => a.cmp(b),
        (FieldValue::Number(a), _) => {
            let text = literal.text();
            match text.parse::<i64>() {
                Ok(b) => a.cmp(&b),
                Err(_) => a.to_string().as_str().cmp(&*text),
            }
        }
        (FieldValue::Text(_), _) => actual.lowercase().as_str().cmp(&*literal.text()),
    }
}
