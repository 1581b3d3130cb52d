//! malh command-line tool
//!
//! ```bash
//! # 3 attributes, 4 buckets, depth 2, default choice vector
//! malh create people --attrs 3 --pages 4 --depth 2
//!
//! # load tuples, one per line
//! malh insert people < people.txt
//!
//! # partial-match query
//! malh select people 'alice,?,?'
//!
//! malh stats people
//! malh repl people
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use malh::repl::run_repl;
use malh::stdin::insert_from_stdin;
use malh::{OpenMode, Query, Relation, RelationConfig};

#[derive(Parser)]
#[command(name = "malh")]
#[command(about = "Multi-attribute linear-hashed relations")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new relation
    Create {
        /// Relation name, used as the base of its three files
        name: PathBuf,

        /// Number of attributes per tuple
        #[arg(short, long)]
        attrs: u32,

        /// Initial number of buckets
        #[arg(short, long, default_value = "1")]
        pages: u32,

        /// Initial depth, 2^depth must not exceed the page count
        #[arg(short, long, default_value = "0")]
        depth: u32,

        /// Choice vector as attr.bit,... with 32 entries (round robin if omitted)
        #[arg(short, long)]
        chvec: Option<String>,

        /// Overwrite an existing relation
        #[arg(long)]
        force: bool,
    },

    /// Insert tuples read from stdin, one per line
    Insert { name: PathBuf },

    /// Print tuples matching a pattern such as 'a,?,x'
    Select { name: PathBuf, pattern: String },

    /// Print global and per-bucket information
    Stats { name: PathBuf },

    /// Interactive session on a relation
    Repl { name: PathBuf },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "malh=debug" } else { "malh=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open(name: &Path, mode: OpenMode) -> Result<Relation> {
    Relation::open(name, mode)
        .await
        .with_context(|| format!("cannot open relation {}", name.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Create {
            name,
            attrs,
            pages,
            depth,
            chvec,
            force,
        } => {
            if !force && Relation::exists(&name).await {
                bail!("relation {} already exists", name.display());
            }
            let config = RelationConfig::new(attrs, pages, depth, chvec.as_deref())
                .context("invalid relation parameters")?;
            let relation = Relation::create(&name, &config)
                .await
                .with_context(|| format!("cannot create relation {}", name.display()))?;
            relation.close().await?;
        }
        Commands::Insert { name } => {
            let mut relation = open(&name, OpenMode::ReadWrite).await?;
            let result = insert_from_stdin(&mut relation).await;
            relation.close().await?;
            let inserted = result.context("insert failed")?;
            eprintln!("inserted {} tuples", inserted);
        }
        Commands::Select { name, pattern } => {
            let mut relation = open(&name, OpenMode::Read).await?;
            let mut query = Query::start(&mut relation, &pattern)?;
            while let Some(tuple) = query.next_tuple().await? {
                println!("{}", tuple);
            }
            query.close();
            relation.close().await?;
        }
        Commands::Stats { name } => {
            let mut relation = open(&name, OpenMode::Read).await?;
            print!("{}", relation.stats().await?);
            relation.close().await?;
        }
        Commands::Repl { name } => {
            let mut relation = open(&name, OpenMode::ReadWrite).await?;
            let result = run_repl(&mut relation).await;
            relation.close().await?;
            result?;
        }
    }
    Ok(())
}
