//! psq: Port/Socket Query - CLI for listing and filtering network connections.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "psq")]
#[command(about = "Port/Socket Query - list and filter active network connections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List connections, optionally filtered by a query
    #[command(visible_alias = "ls")]
    List {
        /// Semantic query (e.g. "process=chrome && lport>1000") or plain search text
        #[arg(default_value = "")]
        query: String,

        /// Output format: table, json, pids (default from config)
        #[arg(short = 'f', long = "format")]
        format: Option<String>,

        /// Read connections from a snapshot file instead of the system
        #[arg(long = "from")]
        from: Option<String>,

        /// Resolve and show each process's executable path
        #[arg(short = 'p', long = "paths")]
        paths: bool,
    },

    /// Report whether a query is a semantic query or plain search text
    Check {
        /// Query to check
        query: String,

        /// Show the parsed expression or the parse error
        #[arg(short = 'v', long = "verbose")]
        verbose: bool,
    },

    /// List queryable fields and their aliases
    Fields,

    /// Save the current connections to a JSON snapshot
    Snapshot {
        /// Output file (default: NETSOCK_ROOT/snapshot.json, "-" for stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<String>,

        /// Re-snapshot connections from another snapshot file
        #[arg(long = "from")]
        from: Option<String>,
    },

    /// Show or initialize configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("PSQ_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::List {
        query: String::new(),
        format: None,
        from: None,
        paths: false,
    });

    let result = match command {
        Commands::List { query, format, from, paths } => {
            commands::list(&query, format.as_deref(), from.as_deref(), paths)
        }
        Commands::Check { query, verbose } => commands::check(&query, verbose),
        Commands::Fields => commands::fields(),
        Commands::Snapshot { output, from } => commands::snapshot(output.as_deref(), from.as_deref()),
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_show(),
            ConfigAction::Init { force } => commands::config_init(force),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
