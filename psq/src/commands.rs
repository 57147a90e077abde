//! CLI command implementations.

use std::collections::BTreeSet;

use netsock::path_cache::resolve_exe_path;
use netsock::query::parse;
use netsock::{
    default_source, Config, Connection, ConnectionSource, Error, Field, Filter, JsonSource,
    Snapshot,
};

/// Pick the snapshot file if one was given, otherwise the native source.
fn open_source(config: &Config, from: Option<&str>) -> netsock::Result<Box<dyn ConnectionSource>> {
    match from {
        Some(path) => Ok(Box::new(JsonSource::new(path))),
        None => default_source(config),
    }
}

/// List connections matching `query`.
///
/// `query` is tried as a semantic query first; anything that does not parse
/// is used as plain search text.
pub fn list(query: &str, format: Option<&str>, from: Option<&str>, paths: bool) -> netsock::Result<()> {
    let config = Config::load()?;
    let source = open_source(&config, from)?;
    tracing::info!(source = source.name(), "enumerating connections");

    let connections = source.connections()?;
    let total = connections.len();
    let filter = Filter::new(query);
    let matches = filter.apply(connections);

    let format = format.unwrap_or(config.default_format.as_str());
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&matches)?);
        }
        "pids" => {
            // Unique, sorted, skipping sockets with no owner
            let pids: BTreeSet<u32> = matches.iter().map(|c| c.pid).filter(|&p| p != 0).collect();
            for pid in pids {
                println!("{}", pid);
            }
        }
        "table" => print_table(&config, &matches, paths),
        other => {
            return Err(Error::Config(format!(
                "Unknown format '{}' (expected table, json or pids)",
                other
            )));
        }
    }

    let kind = match &filter {
        Filter::All => "all",
        Filter::Semantic(_) => "semantic query",
        Filter::Text(_) => "text search",
    };
    eprintln!("{} of {} connections ({})", matches.len(), total, kind);
    Ok(())
}

fn print_table(config: &Config, connections: &[Connection], paths: bool) {
    let mut cache = config.path_cache.build();

    println!(
        "{:<6} {:<28} {:<28} {:<12} {:>7} {:<16}{}",
        "PROTO",
        "LOCAL",
        "REMOTE",
        "STATE",
        "PID",
        "PROCESS",
        if paths { " PATH" } else { "" }
    );

    for conn in connections {
        let state = if conn.state.is_empty() { "-" } else { conn.state.as_str() };
        let path = if paths {
            let path = cache
                .get_or_resolve(conn.pid, |pid| resolve_exe_path(&config.proc_root, pid))
                .unwrap_or_else(|| "-".to_string());
            format!(" {}", path)
        } else {
            String::new()
        };
        println!(
            "{:<6} {:<28} {:<28} {:<12} {:>7} {:<16}{}",
            conn.protocol,
            truncate(&conn.local_display(), 28),
            truncate(&conn.remote_display(), 28),
            state,
            conn.pid,
            truncate(&conn.process_name, 16),
            path
        );
    }
}

/// Truncate to `max_len` characters, marking the cut with `…`.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{}…", kept)
    }
}

/// Report how `query` would be interpreted by `list`: `all`, `semantic`
/// or `text`.
pub fn check(query: &str, verbose: bool) -> netsock::Result<()> {
    if query.trim().is_empty() {
        println!("all");
        if verbose {
            println!("empty query matches every connection");
        }
        return Ok(());
    }

    match parse(query) {
        Ok(expr) => {
            println!("semantic");
            if verbose {
                println!("{}", expr);
            }
        }
        Err(e) => {
            println!("text");
            if verbose {
                println!("{}", e);
            }
        }
    }
    Ok(())
}

/// Print the field dictionary.
pub fn fields() -> netsock::Result<()> {
    println!("{:<10} {:<28} TYPE", "FIELD", "ALIASES");
    for field in Field::ALL {
        let aliases = if field.aliases().is_empty() {
            "-".to_string()
        } else {
            field.aliases().join(", ")
        };
        let kind = if field.is_numeric() { "number" } else { "text" };
        println!("{:<10} {:<28} {}", field.canonical(), aliases, kind);
    }
    Ok(())
}

/// Write the current connections to a JSON snapshot.
pub fn snapshot(output: Option<&str>, from: Option<&str>) -> netsock::Result<()> {
    let config = Config::load()?;
    let source = open_source(&config, from)?;
    let snapshot = Snapshot::capture(source.connections()?);
    let json = serde_json::to_string_pretty(&snapshot)?;

    match output {
        Some("-") => println!("{}", json),
        Some(path) => write_snapshot(std::path::Path::new(path), &json, snapshot.connections.len())?,
        None => {
            std::fs::create_dir_all(&config.root)?;
            write_snapshot(&config.snapshot_path(), &json, snapshot.connections.len())?;
        }
    }
    Ok(())
}

fn write_snapshot(path: &std::path::Path, json: &str, count: usize) -> netsock::Result<()> {
    std::fs::write(path, json)?;
    eprintln!("Saved {} connections to {}", count, path.display());
    Ok(())
}

pub fn config_show() -> netsock::Result<()> {
    let config = Config::load()?;
    let path = config.config_path();
    println!("root:                 {}", config.root.display());
    println!(
        "config file:          {}{}",
        path.display(),
        if path.exists() { "" } else { " (not created)" }
    );
    println!("proc_root:            {}", config.proc_root.display());
    println!("default_format:       {}", config.default_format);
    println!("path_cache.capacity:  {}", config.path_cache.capacity);
    println!("path_cache.ttl_secs:  {}", config.path_cache.ttl_secs);
    Ok(())
}

pub fn config_init(force: bool) -> netsock::Result<()> {
    let config = Config::with_root(Config::default_root()?);
    let path = config.config_path();
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    config.save()?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("nginx", 16), "nginx");
        assert_eq!(truncate("abcdefgh", 5), "abcd…");
        assert_eq!(truncate("ünïcödé", 4), "ünï…");
    }
}
