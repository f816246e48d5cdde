//! dstrk CLI - dataset tracker command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;
mod util;

/// dstrk - Track your datasets and files, what created them, when and from what
#[derive(Parser)]
#[command(name = "dstrk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Store location (default: ~/.dstrk)
    #[arg(long, global = true, env = "DSTRK_DBPATH")]
    dbpath: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new store
    Init,
    /// Create a dataset from a list of files
    Create {
        /// Files or glob patterns to include
        #[arg(required = true)]
        files: Vec<String>,
        /// Datasets this one is derived from (file or hash)
        #[arg(short, long, num_args = 1..)]
        parents: Vec<String>,
        /// Free-form tags
        #[arg(short, long, num_args = 1..)]
        tags: Vec<String>,
        /// Git checkouts to record as provenance
        #[arg(short = 'g', long = "git-repo", num_args = 1..)]
        git_repos: Vec<PathBuf>,
    },
    /// Show a dataset record
    Info {
        /// Member file or dataset hash
        target: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a dataset's lineage
    Tree {
        /// Member file or dataset hash
        target: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add files to an existing dataset (hash is kept)
    AddFiles {
        /// Files or glob patterns to add
        #[arg(required = true)]
        files: Vec<String>,
        /// Member file or dataset hash
        #[arg(long)]
        to: String,
    },
    /// Delete a dataset
    DeleteDataset {
        /// Member file or dataset hash
        target: String,
    },
    /// Stop tracking files, dropping them from every dataset
    DeleteFiles {
        /// Files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// List all datasets
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check the store for inconsistent records
    Verify,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load()?;
    util::init_logging(cli.verbose, &config.log.level);

    let root = config::store_root(cli.dbpath.as_deref(), &config)?;
    tracing::debug!(root = %root.display(), "using store");

    match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Create {
            files,
            parents,
            tags,
            git_repos,
        } => cmd::create::run(&root, files, parents, tags, git_repos),
        Commands::Info { target, json } => cmd::info::run(&root, &target, json),
        Commands::Tree { target, json } => cmd::tree::run(&root, &target, json),
        Commands::AddFiles { files, to } => cmd::add_files::run(&root, &files, &to),
        Commands::DeleteDataset { target } => cmd::delete_dataset::run(&root, &target),
        Commands::DeleteFiles { files } => cmd::delete_files::run(&root, &files),
        Commands::List { json } => cmd::list::run(&root, json),
        Commands::Verify => cmd::verify::run(&root),
    }
}
