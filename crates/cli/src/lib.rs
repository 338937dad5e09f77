mod clear;
mod index;
mod query;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "uscope",
    version,
    about = "Incremental symbol engine for UnrealScript-style class trees",
    long_about = "uscope collects and parses every class file under a set of source roots, \
                  links them into an inheritance hierarchy and answers context-sensitive \
                  completion and go-to-definition queries against the result."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse all class files under a source root and cache the result
    #[command(
        long_about = "Walks the source root, parses every class file, links the inheritance \
                      hierarchy and writes a snapshot. By default snapshots are stored in \
                      ~/.uscope/indices/."
    )]
    Index {
        /// Source root to index
        #[arg(value_name = "SOURCE_ROOT")]
        path: PathBuf,
    },
    /// List completion candidates for the text left of the cursor
    Complete {
        /// Source root of the project
        #[arg(value_name = "SOURCE_ROOT")]
        root: PathBuf,
        /// Class file the cursor is in (names the current class)
        #[arg(long)]
        file: PathBuf,
        /// Text left of the cursor, e.g. "self.CurrentWeapon."
        #[arg(long)]
        chain: String,
        /// 1-based cursor line; enables local-variable scope scanning
        #[arg(long)]
        line: Option<usize>,
    },
    /// Resolve a chain to the file and line of its declaration
    Def {
        /// Source root of the project
        #[arg(value_name = "SOURCE_ROOT")]
        root: PathBuf,
        /// Class file the cursor is in (names the current class)
        #[arg(long)]
        file: PathBuf,
        /// Chain to resolve, e.g. "self.CurrentWeapon.Reload"
        #[arg(long)]
        chain: String,
        /// 1-based cursor line; enables local-variable scope scanning
        #[arg(long)]
        line: Option<usize>,
    },
    /// Clear cached snapshots
    #[command(
        long_about = "Removes cached snapshots. With a source root only that root's snapshot \
                      is removed, otherwise all snapshots are cleared."
    )]
    Clear {
        /// Source root whose snapshot should be removed (optional)
        #[arg(value_name = "SOURCE_ROOT")]
        path: Option<PathBuf>,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _guard = uscope_core::logging::init_logging("cli", true);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Index { path } => rt.block_on(index::run(path)),
        Commands::Complete {
            root,
            file,
            chain,
            line,
        } => rt.block_on(query::complete(root, file, chain, line)),
        Commands::Def {
            root,
            file,
            chain,
            line,
        } => rt.block_on(query::definition(root, file, chain, line)),
        Commands::Clear { path } => clear::run(path),
    }
}
