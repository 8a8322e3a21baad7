//! Manages the game's file store from the command line.
//!
//! ```bash
//! cargo run --example files -- --dir mud_files list
//! cargo run --example files -- put rooms.json ./rooms.json
//! cargo run --example files -- get rooms.json > rooms.json
//! cargo run --example files -- export
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use postoffice::store::FileStore;

#[derive(Parser)]
#[command(name = "files")]
#[command(about = "List, fetch, store and export game files", long_about = None)]
struct Cli {
    /// Store directory
    #[arg(short, long, default_value = "mud_files")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored files as JSON
    List,
    /// Write a stored file to stdout
    Get {
        /// File name
        name: String,
    },
    /// Store the contents of a local file
    Put {
        /// Name to store under
        name: String,
        /// Local file to read
        source: PathBuf,
    },
    /// Print every file, Base64 encoded, as JSON
    Export,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let store = FileStore::new(cli.dir);

    match cli.command {
        Commands::List => {
            println!("{}", serde_json::to_string(&store.list()?)?);
        }
        Commands::Get { name } => {
            let stdout = std::io::stdout();
            store.download(&name, &mut stdout.lock())?;
        }
        Commands::Put { name, source } => {
            let content = std::fs::read(source)?;
            println!("{}", serde_json::to_string(&store.upload(&name, &content)?)?);
        }
        Commands::Export => {
            println!("{}", serde_json::to_string(&store.export_all()?)?);
        }
    }

    Ok(())
}
