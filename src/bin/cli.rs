//! diskwire CLI Client
//!
//! Command-line interface for transferring files to and from a daemon.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use diskwire::storage::{format_size, list_files};
use diskwire::{Config, DiskwireError, TransferClient};
use tracing_subscriber::{fmt, EnvFilter};

/// diskwire CLI
#[derive(Parser, Debug)]
#[command(name = "diskwire-cli")]
#[command(about = "CLI for the diskwire storage daemon")]
#[command(version)]
struct Args {
    /// Daemon address
    #[arg(short, long, default_value = "127.0.0.1:65431")]
    server: String,

    /// Connect timeout in milliseconds (0 = OS default)
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    /// Per-call read/write deadline in milliseconds (0 = none)
    #[arg(long, default_value = "30000")]
    io_timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a local file
    Upload {
        /// The file to upload; stored under its file name
        path: PathBuf,
    },

    /// Fetch a file from the daemon
    Fetch {
        /// The name to fetch
        name: String,

        /// Destination directory (created if missing)
        #[arg(short, long, default_value = "./downloads")]
        dest: PathBuf,
    },

    /// Delete a file on the daemon
    Delete {
        /// The name to delete
        name: String,
    },

    /// Remove a file from a local directory
    Rm {
        /// The name to remove
        name: String,

        /// Directory holding the file
        #[arg(short, long, default_value = "./data")]
        dir: PathBuf,
    },

    /// List files in a local directory
    Ls {
        /// Directory to list
        #[arg(default_value = "./data")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let config = Config::builder()
        .daemon_addr(&args.server)
        .connect_timeout_ms(args.connect_timeout_ms)
        .io_timeout_ms(args.io_timeout_ms)
        .build();
    let client = TransferClient::new(config);

    let outcome = match args.command {
        Commands::Upload { path } => client
            .upload_path(&path)
            .map(|name| println!("Uploaded {}", name)),
        Commands::Fetch { name, dest } => std::fs::create_dir_all(&dest)
            .map_err(DiskwireError::from)
            .and_then(|()| client.fetch(&name, &dest))
            .map(|bytes| println!("Fetched {} ({})", name, format_size(bytes))),
        Commands::Delete { name } => client
            .delete_remote(&name)
            .map(|()| println!("Delete requested for {}", name)),
        Commands::Rm { name, dir } => client
            .remove(&dir, &name)
            .map(|()| println!("Removed {}", name)),
        Commands::Ls { dir } => list_files(&dir).map(|files| {
            for file in files {
                println!("{:<40} {:>12}", file.name, format_size(file.size));
            }
        }),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
