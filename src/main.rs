//! Nanochain CLI
//!
//! A command-line interface for growing and inspecting a local chain.

use clap::{Parser, Subcommand};
use nanochain::core::{Block, ChainManager, StepCurvePolicy};
use nanochain::mining::Miner;
use nanochain::storage::{JsonBlockStore, StorageConfig};
use std::fs;
use std::path::{Path, PathBuf};

/// Result type for CLI operations
type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "nanochain")]
#[command(version)]
#[command(about = "A minimal proof-of-work ledger", long_about = None)]
struct Cli {
    /// Data directory for the persisted chain
    #[arg(short, long, default_value = ".nanochain_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new chain (seeds the genesis block)
    Init,

    /// Mine new blocks carrying the given payload
    Mine {
        /// Opaque payload to embed in each mined block
        #[arg(short = 'p', long)]
        data: String,

        /// Number of blocks to mine
        #[arg(short, long, default_value = "1")]
        count: u32,
    },

    /// Display chain information
    Chain {
        #[command(subcommand)]
        action: Option<ChainCommands>,
    },

    /// Validate the local chain
    Validate,

    /// Export the chain snapshot to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Adopt a longer chain from a file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum ChainCommands {
    /// Show detailed info
    Info,

    /// List recent blocks
    Blocks {
        /// Number of blocks to show
        #[arg(short, long, default_value = "10")]
        count: usize,
    },
}

fn main() -> CliResult<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => cmd_init(&cli.data_dir),
        Commands::Mine { data, count } => cmd_mine(&cli.data_dir, &data, count),
        Commands::Chain { action } => cmd_chain(&cli.data_dir, action),
        Commands::Validate => cmd_validate(&cli.data_dir),
        Commands::Export { output } => cmd_export(&cli.data_dir, &output),
        Commands::Import { input } => cmd_import(&cli.data_dir, &input),
    }
}

fn open_store(data_dir: &Path) -> CliResult<JsonBlockStore> {
    Ok(JsonBlockStore::new(StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    })?)
}

fn open_chain(data_dir: &Path) -> CliResult<ChainManager> {
    let store = open_store(data_dir)?;
    Ok(ChainManager::open(
        Box::new(store),
        Box::new(StepCurvePolicy::default()),
    )?)
}

fn cmd_init(data_dir: &Path) -> CliResult<()> {
    let store = open_store(data_dir)?;

    if store.exists() {
        println!("⚠️  Chain already exists at {:?}", data_dir);
        return Ok(());
    }

    let chain = ChainManager::open(Box::new(store), Box::new(StepCurvePolicy::default()))?;

    println!("✅ Chain initialized!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   🧱 Genesis block hash: {}", chain.last_block().hash);

    Ok(())
}

fn cmd_mine(data_dir: &Path, data: &str, count: u32) -> CliResult<()> {
    let mut chain = open_chain(data_dir)?;
    let miner = Miner::new();
    let runtime = tokio::runtime::Runtime::new()?;

    println!("⛏️  Mining {} block(s)...", count);

    for _ in 0..count {
        let job = runtime.block_on(async { miner.mine(&chain, data) });
        let mined = runtime.block_on(job.block())?;

        let block = chain.add_block(mined)?;
        println!("\n   Block {} mined!", block.index);
        println!("   ├─ Hash: {}", block.hash);
        println!("   ├─ Nonce: {}", block.nonce);
        println!("   └─ Score: {}", block.difficulty_score());
    }

    Ok(())
}

fn cmd_chain(data_dir: &Path, action: Option<ChainCommands>) -> CliResult<()> {
    let chain = open_chain(data_dir)?;

    match action.unwrap_or(ChainCommands::Info) {
        ChainCommands::Info => {
            let head = chain.last_block();
            println!("⛓️  Chain info");
            println!("   ├─ Blocks: {}", chain.len());
            println!("   ├─ Head index: {}", head.index);
            println!("   ├─ Head hash: {}", head.hash);
            println!(
                "   └─ Next target: {}",
                chain.required_difficulty(head.index + 1)
            );
        }
        ChainCommands::Blocks { count } => {
            for block in chain.all_blocks().iter().rev().take(count) {
                println!(
                    "   #{:<6} {}  nonce {:<12} data {:?}",
                    block.index, block.hash, block.nonce, block.data
                );
            }
        }
    }

    Ok(())
}

fn cmd_validate(data_dir: &Path) -> CliResult<()> {
    let chain = open_chain(data_dir)?;

    match chain.check_chain(chain.all_blocks()) {
        Ok(()) => {
            println!("✅ Chain is valid ({} blocks)", chain.len());
            Ok(())
        }
        Err(err) => {
            println!("❌ Chain is invalid: {}", err);
            Err(err.into())
        }
    }
}

fn cmd_export(data_dir: &Path, output: &Path) -> CliResult<()> {
    let chain = open_chain(data_dir)?;

    let file = fs::File::create(output)?;
    serde_json::to_writer_pretty(file, chain.all_blocks())?;

    println!("✅ Exported {} blocks to {:?}", chain.len(), output);
    Ok(())
}

fn cmd_import(data_dir: &Path, input: &Path) -> CliResult<()> {
    let mut chain = open_chain(data_dir)?;

    let file = fs::File::open(input)?;
    let candidate: Vec<Block> = serde_json::from_reader(file)?;

    let before = chain.len();
    chain.replace_chain(candidate)?;

    println!(
        "✅ Adopted {} new block(s); chain now has {}",
        chain.len() - before,
        chain.len()
    );
    Ok(())
}
