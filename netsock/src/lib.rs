//! netsock: network socket records and the semantic query filter.
//!
//! Enumerates active connections and filters them with a small
//! `field operator value` expression language.

pub mod config;
pub mod connection;
pub mod error;
pub mod path_cache;
pub mod query;
pub mod search;
pub mod source;

pub use config::{Config, PathCacheConfig};
pub use connection::{Connection, LocalEndpoint, RemoteEndpoint, Snapshot};
pub use error::{Error, Result};
pub use path_cache::ProcessPathCache;
pub use query::{is_valid_query, parse_query, CompareOp, Expr, Field, ParseError, Predicate};
pub use search::{Filter, TextSearch};
pub use source::{default_source, ConnectionSource, JsonSource, ProcNetSource};
