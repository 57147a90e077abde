//! Connection records as produced by a [`ConnectionSource`](crate::ConnectionSource).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// IPv4 wildcard used when a socket has no concrete address.
pub const IPV4_WILDCARD: &str = "0.0.0.0";
/// IPv6 wildcard used when a socket has no concrete address.
pub const IPV6_WILDCARD: &str = "[::]";

/// Local side of a socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalEndpoint {
    /// Bound address (None for `0.0.0.0`, `::` or `*`).
    #[serde(default)]
    pub address: Option<String>,
    pub port: u16,
}

/// Remote side of a socket. Both parts are absent for listening sockets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEndpoint {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// One row of the connection table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Lowercase protocol: tcp, tcp6, udp, udp6.
    pub protocol: String,
    pub local: LocalEndpoint,
    #[serde(default)]
    pub remote: RemoteEndpoint,
    /// Socket state, empty for stateless sockets.
    #[serde(default)]
    pub state: String,
    pub pid: u32,
    #[serde(default)]
    pub process_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_descriptor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

impl Connection {
    /// Create a record with no remote endpoint and no platform-only fields.
    pub fn new(protocol: impl Into<String>, local_port: u16, pid: u32, process_name: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            local: LocalEndpoint {
                address: None,
                port: local_port,
            },
            remote: RemoteEndpoint::default(),
            state: String::new(),
            pid,
            process_name: process_name.into(),
            uid: None,
            file_descriptor: None,
            file_type: None,
        }
    }

    pub fn with_local_address(mut self, address: impl Into<String>) -> Self {
        self.local.address = Some(address.into());
        self
    }

    pub fn with_remote(mut self, address: impl Into<String>, port: u16) -> Self {
        self.remote = RemoteEndpoint {
            address: Some(address.into()),
            port: Some(port),
        };
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = state.into();
        self
    }

    /// Whether the protocol is an IPv6 variant (`tcp6`, `udp6`).
    pub fn is_ipv6(&self) -> bool {
        self.protocol.ends_with('6')
    }

    /// Wildcard address matching this record's address family.
    pub fn wildcard_address(&self) -> &'static str {
        if self.is_ipv6() {
            IPV6_WILDCARD
        } else {
            IPV4_WILDCARD
        }
    }

    /// Local address, with the family wildcard standing in for an unbound one.
    pub fn local_address(&self) -> &str {
        self.local.address.as_deref().unwrap_or_else(|| self.wildcard_address())
    }

    /// Remote address, with the family wildcard standing in for a missing one.
    pub fn remote_address(&self) -> &str {
        self.remote.address.as_deref().unwrap_or_else(|| self.wildcard_address())
    }

    /// `address:port` for the local side.
    pub fn local_display(&self) -> String {
        format!("{}:{}", self.local_address(), self.local.port)
    }

    /// `address:port` for the remote side, `*` for a missing port.
    pub fn remote_display(&self) -> String {
        match self.remote.port {
            Some(port) => format!("{}:{}", self.remote_address(), port),
            None => format!("{}:*", self.remote_address()),
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {} {} {} {}",
            self.protocol,
            self.local_display(),
            self.remote_display(),
            if self.state.is_empty() { "-" } else { self.state.as_str() },
            self.pid,
            self.process_name
        )
    }
}

/// A captured set of connections, as written by `psq snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Host the snapshot was taken on.
    pub host: String,
    /// When the snapshot was taken.
    pub captured_at: DateTime<Utc>,
    pub connections: Vec<Connection>,
}

impl Snapshot {
    /// Wrap connections captured on this host right now.
    pub fn capture(connections: Vec<Connection>) -> Self {
        Self {
            host: gethostname::gethostname().to_string_lossy().to_string(),
            captured_at: Utc::now(),
            connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_substitution() {
        let v4 = Connection::new("tcp", 80, 1, "nginx");
        assert_eq!(v4.local_address(), "0.0.0.0");
        assert_eq!(v4.remote_address(), "0.0.0.0");

        let v6 = Connection::new("udp6", 53, 1, "dnsmasq");
        assert_eq!(v6.local_address(), "[::]");
        assert_eq!(v6.local_display(), "[::]:53");
    }

    #[test]
    fn test_remote_display_without_port() {
        let conn = Connection::new("tcp", 22, 1, "sshd").with_state("LISTEN");
        assert_eq!(conn.remote_display(), "0.0.0.0:*");
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let conn = Connection::new("tcp", 443, 1234, "chrome")
            .with_local_address("10.0.0.2")
            .with_remote("142.250.80.46", 443)
            .with_state("ESTABLISHED");
        let json = serde_json::to_value(&conn).unwrap();
        assert_eq!(json["processName"], "chrome");
        assert_eq!(json["remote"]["port"], 443);
        assert!(json.get("uid").is_none());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let conn: Connection = serde_json::from_str(
            r#"{"protocol":"udp","local":{"address":null,"port":5353},"pid":7}"#,
        )
        .unwrap();
        assert_eq!(conn.remote, RemoteEndpoint::default());
        assert!(conn.state.is_empty());
        assert!(conn.process_name.is_empty());
    }
}
