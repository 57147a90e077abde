//! Linux socket tables under `/proc/net`.
//!
//! Each table line looks like
//!
//! ```text
//!   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
//!    0: 0100007F:0277 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 22443 ...
//! ```
//!
//! Addresses are hex in host byte order, ports are hex. Socket inodes are
//! matched against `/proc/<pid>/fd/*` links to find the owning process.

use std::collections::HashMap;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

use super::ConnectionSource;
use crate::connection::{LocalEndpoint, RemoteEndpoint};
use crate::{Connection, Result};

/// Tables read, with the protocol name each one reports.
pub const TABLES: [&str; 4] = ["tcp", "tcp6", "udp", "udp6"];

/// Enumerates sockets from a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcNetSource {
    root: PathBuf,
}

/// One decoded table line, before process lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketEntry {
    pub protocol: &'static str,
    pub local: (IpAddr, u16),
    pub remote: (IpAddr, u16),
    pub state: u8,
    pub uid: u32,
    pub inode: u64,
}

/// Owner of a socket inode.
#[derive(Debug, Clone)]
struct Owner {
    pid: u32,
    fd: String,
}

impl ProcNetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read every table that exists. Missing tables (no IPv6, say) are skipped.
    fn entries(&self) -> Vec<SocketEntry> {
        let mut entries = Vec::new();
        for protocol in TABLES {
            let path = self.root.join("net").join(protocol);
            match fs::read_to_string(&path) {
                Ok(contents) => entries.extend(parse_table(protocol, &contents)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "no socket table");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable socket table");
                }
            }
        }
        entries
    }

    /// Map socket inodes to the first process holding them.
    fn socket_owners(&self) -> Result<HashMap<u64, Owner>> {
        let mut owners = HashMap::new();
        for entry in fs::read_dir(&self.root)? {
            let Ok(entry) = entry else { continue };
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };

            // Other users' processes are unreadable without privileges
            let Ok(fds) = fs::read_dir(entry.path().join("fd")) else {
                continue;
            };
            for fd in fds.flatten() {
                let Ok(target) = fs::read_link(fd.path()) else { continue };
                if let Some(inode) = socket_inode(&target.to_string_lossy()) {
                    owners.entry(inode).or_insert_with(|| Owner {
                        pid,
                        fd: fd.file_name().to_string_lossy().to_string(),
                    });
                }
            }
        }
        Ok(owners)
    }

    fn process_name(&self, pid: u32) -> String {
        fs::read_to_string(self.root.join(pid.to_string()).join("comm"))
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default()
    }
}

impl ConnectionSource for ProcNetSource {
    fn name(&self) -> &str {
        "procfs"
    }

    fn connections(&self) -> Result<Vec<Connection>> {
        let entries = self.entries();
        let owners = self.socket_owners()?;
        let mut names: HashMap<u32, String> = HashMap::new();

        let connections = entries
            .into_iter()
            .map(|entry| {
                let owner = owners.get(&entry.inode);
                let pid = owner.map(|o| o.pid).unwrap_or(0);
                let process_name = match owner {
                    Some(_) => names
                        .entry(pid)
                        .or_insert_with(|| self.process_name(pid))
                        .clone(),
                    None => String::new(),
                };
                to_connection(entry, pid, process_name, owner.map(|o| o.fd.clone()))
            })
            .collect::<Vec<_>>();

        tracing::debug!(count = connections.len(), root = %self.root.display(), "enumerated sockets");
        Ok(connections)
    }
}

fn to_connection(entry: SocketEntry, pid: u32, process_name: String, fd: Option<String>) -> Connection {
    let is_tcp = entry.protocol.starts_with("tcp");
    let (remote_ip, remote_port) = entry.remote;

    let remote = if !is_tcp || (remote_ip.is_unspecified() && remote_port == 0) {
        RemoteEndpoint::default()
    } else {
        RemoteEndpoint {
            address: concrete_address(remote_ip),
            port: Some(remote_port),
        }
    };

    Connection {
        protocol: entry.protocol.to_string(),
        local: LocalEndpoint {
            address: concrete_address(entry.local.0),
            port: entry.local.1,
        },
        remote,
        state: if is_tcp {
            tcp_state_name(entry.state).to_string()
        } else {
            String::new()
        },
        pid,
        process_name,
        uid: Some(entry.uid),
        file_descriptor: fd,
        file_type: Some(if entry.local.0.is_ipv6() { "IPv6" } else { "IPv4" }.to_string()),
    }
}

/// Wildcard-bound addresses are reported as absent.
fn concrete_address(addr: IpAddr) -> Option<String> {
    if addr.is_unspecified() {
        None
    } else {
        Some(addr.to_string())
    }
}

/// Kernel TCP state code to display name.
pub fn tcp_state_name(code: u8) -> &'static str {
    match code {
        0x01 => "ESTABLISHED",
        0x02 => "SYN_SENT",
        0x03 => "SYN_RECEIVED",
        0x04 => "FIN_WAIT_1",
        0x05 => "FIN_WAIT_2",
        0x06 => "TIME_WAIT",
        0x07 => "CLOSED",
        0x08 => "CLOSE_WAIT",
        0x09 => "LAST_ACK",
        0x0A => "LISTEN",
        0x0B => "CLOSING",
        _ => "UNKNOWN",
    }
}

/// Parse the contents of one `/proc/net/{tcp,tcp6,udp,udp6}` table.
///
/// The header line and malformed lines are skipped.
pub fn parse_table(protocol: &'static str, contents: &str) -> Vec<SocketEntry> {
    contents
        .lines()
        .skip(1)
        .filter_map(|line| {
            let entry = parse_line(protocol, line);
            if entry.is_none() && !line.trim().is_empty() {
                tracing::debug!(protocol, line, "skipping malformed socket line");
            }
            entry
        })
        .collect()
}

fn parse_line(protocol: &'static str, line: &str) -> Option<SocketEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 10 {
        return None;
    }
    Some(SocketEntry {
        protocol,
        local: parse_endpoint(fields[1])?,
        remote: parse_endpoint(fields[2])?,
        state: u8::from_str_radix(fields[3], 16).ok()?,
        uid: fields[7].parse().ok()?,
        inode: fields[9].parse().ok()?,
    })
}

/// `0100007F:0277` → `127.0.0.1:631`.
fn parse_endpoint(field: &str) -> Option<(IpAddr, u16)> {
    let (addr, port) = field.split_once(':')?;
    let port = u16::from_str_radix(port, 16).ok()?;
    Some((parse_address(addr)?, port))
}

fn parse_address(hex: &str) -> Option<IpAddr> {
    // Each 32-bit word is printed in host byte order
    let word = |chunk: &str| u32::from_str_radix(chunk, 16).ok().map(u32::to_ne_bytes);
    match hex.len() {
        8 => Some(IpAddr::V4(Ipv4Addr::from(word(hex)?))),
        32 => {
            let mut octets = [0u8; 16];
            for (i, out) in octets.chunks_exact_mut(4).enumerate() {
                let chunk = hex.get(i * 8..i * 8 + 8)?;
                out.copy_from_slice(&word(chunk)?);
            }
            Some(IpAddr::V6(Ipv6Addr::from(octets)))
        }
        _ => None,
    }
}

/// `socket:[12345]` → 12345.
fn socket_inode(link: &str) -> Option<u64> {
    link.strip_prefix("socket:[")?.strip_suffix(']')?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TCP: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 5001 1 0000000000000000 100 0 0 10 0
   1: 0500000A:C738 22D8B85D:01BB 01 00000000:00000000 02:000A7E3A 00000000  1000        0 5002 2 0000000000000000 20 4 30 10 -1
   2: 0100007F:0277 0100007F:A000 06 00000000:00000000 03:00000D4E 00000000     0        0 0 3 0000000000000000
";

    const TCP6: &str = "  sl  local_address                         remote_address                        st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 00000000000000000000000000000000:0016 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 6001 1 0000000000000000 100 0 0 10 0
   1: 00000000000000000000000001000000:0277 00000000000000000000000000000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 6002 1 0000000000000000 100 0 0 10 0
";

    const UDP: &str = "   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode ref pointer drops
  100: 00000000:14E9 00000000:0000 07 00000000:00000000 00:00000000 00000000   109        0 7001 2 0000000000000000 0
  garbage line
";

    #[test]
    fn test_parse_ipv4_entries() {
        let entries = parse_table("tcp", TCP);
        assert_eq!(entries.len(), 3);

        let listen = &entries[0];
        assert_eq!(listen.local, (IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080));
        assert_eq!(listen.state, 0x0A);
        assert_eq!(listen.uid, 1000);
        assert_eq!(listen.inode, 5001);

        let established = &entries[1];
        assert_eq!(established.local, ("10.0.0.5".parse().unwrap(), 51000));
        assert_eq!(established.remote, ("93.184.216.34".parse().unwrap(), 443));
    }

    #[test]
    fn test_parse_ipv6_entries() {
        let entries = parse_table("tcp6", TCP6);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].local, (IpAddr::V6(Ipv6Addr::UNSPECIFIED), 22));
        assert_eq!(entries[1].local, (IpAddr::V6(Ipv6Addr::LOCALHOST), 631));
    }

    #[test]
    fn test_malformed_lines_skipped() {
        assert_eq!(parse_table("udp", UDP).len(), 1);
        assert!(parse_table("tcp", "header only\n").is_empty());
        assert!(parse_table("tcp", "").is_empty());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(tcp_state_name(0x01), "ESTABLISHED");
        assert_eq!(tcp_state_name(0x0A), "LISTEN");
        assert_eq!(tcp_state_name(0x06), "TIME_WAIT");
        assert_eq!(tcp_state_name(0xFF), "UNKNOWN");
    }

    #[test]
    fn test_socket_inode() {
        assert_eq!(socket_inode("socket:[5001]"), Some(5001));
        assert_eq!(socket_inode("pipe:[5001]"), None);
        assert_eq!(socket_inode("/dev/null"), None);
    }

    #[cfg(unix)]
    fn fake_proc() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let net = tmp.path().join("net");
        fs::create_dir_all(&net).unwrap();
        fs::write(net.join("tcp"), TCP).unwrap();
        fs::write(net.join("udp"), UDP).unwrap();
        // No tcp6/udp6 tables: IPv6 disabled

        let proc_dir = tmp.path().join("4242");
        fs::create_dir_all(proc_dir.join("fd")).unwrap();
        fs::write(proc_dir.join("comm"), "nginx\n").unwrap();
        std::os::unix::fs::symlink("socket:[5001]", proc_dir.join("fd/7")).unwrap();
        std::os::unix::fs::symlink("/dev/null", proc_dir.join("fd/0")).unwrap();

        let other = tmp.path().join("777");
        fs::create_dir_all(other.join("fd")).unwrap();
        fs::write(other.join("comm"), "firefox\n").unwrap();
        std::os::unix::fs::symlink("socket:[5002]", other.join("fd/31")).unwrap();
        std::os::unix::fs::symlink("socket:[7001]", other.join("fd/32")).unwrap();

        tmp
    }

    #[cfg(unix)]
    #[test]
    fn test_enumerate_fake_proc() {
        let tmp = fake_proc();
        let source = ProcNetSource::new(tmp.path());
        let connections = source.connections().unwrap();
        assert_eq!(connections.len(), 4);

        let nginx = &connections[0];
        assert_eq!(nginx.protocol, "tcp");
        assert_eq!(nginx.pid, 4242);
        assert_eq!(nginx.process_name, "nginx");
        assert_eq!(nginx.state, "LISTEN");
        assert_eq!(nginx.local.address, None);
        assert_eq!(nginx.remote, RemoteEndpoint::default());
        assert_eq!(nginx.file_descriptor.as_deref(), Some("7"));
        assert_eq!(nginx.uid, Some(1000));

        let firefox = &connections[1];
        assert_eq!(firefox.pid, 777);
        assert_eq!(firefox.process_name, "firefox");
        assert_eq!(firefox.remote.address.as_deref(), Some("93.184.216.34"));
        assert_eq!(firefox.remote.port, Some(443));

        // TIME_WAIT sockets have no owner
        let time_wait = &connections[2];
        assert_eq!(time_wait.pid, 0);
        assert!(time_wait.process_name.is_empty());
        assert_eq!(time_wait.state, "TIME_WAIT");

        let udp = &connections[3];
        assert_eq!(udp.protocol, "udp");
        assert!(udp.state.is_empty());
        assert_eq!(udp.remote, RemoteEndpoint::default());
        assert_eq!(udp.pid, 777);
        assert_eq!(udp.local.port, 5353);
    }

    #[cfg(unix)]
    #[test]
    fn test_enumerated_records_are_queryable() {
        let tmp = fake_proc();
        let connections = ProcNetSource::new(tmp.path()).connections().unwrap();
        let pred = crate::parse_query("process=firefox && rport=443").unwrap();
        let hits: Vec<_> = connections.iter().filter(|c| pred.matches(c)).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].local.port, 51000);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let source = ProcNetSource::new("/nonexistent/proc");
        assert!(source.connections().is_err());
    }
}
