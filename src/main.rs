//! `mesh` - command line access to the mesh multisig program
//!
//! `derive` subcommands are offline; `next-index` and `show-multisig` read
//! account state over RPC and never submit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use solana_sdk::pubkey::Pubkey;
use squads_mesh::{
    address::{get_authority_pda, get_ix_authority_pda, get_ix_pda, get_ms_pda, get_tx_pda},
    config::MeshConfig,
    mesh::SquadsMesh,
    wallet::Wallet,
};
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Squads mesh multisig client", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "mesh.toml", env = "MESH_CONFIG")]
    config: String,

    /// Override the configured RPC endpoint
    #[arg(long, env = "MESH_RPC_URL")]
    rpc_url: Option<String>,

    /// Override the configured program id
    #[arg(long)]
    program_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive a program address (offline)
    #[command(subcommand)]
    Derive(DeriveCommand),

    /// Print the next transaction index of a multisig
    NextIndex {
        #[arg(long)]
        multisig: Pubkey,
    },

    /// Print a multisig account
    ShowMultisig {
        #[arg(long)]
        address: Pubkey,
    },
}

#[derive(Subcommand, Debug)]
enum DeriveCommand {
    Multisig {
        #[arg(long)]
        create_key: Pubkey,
    },
    Transaction {
        #[arg(long)]
        multisig: Pubkey,
        #[arg(long)]
        index: u64,
    },
    Instruction {
        #[arg(long)]
        transaction: Pubkey,
        #[arg(long)]
        index: u64,
    },
    Authority {
        #[arg(long)]
        multisig: Pubkey,
        #[arg(long)]
        index: u64,
    },
    IxAuthority {
        #[arg(long)]
        transaction: Pubkey,
        #[arg(long)]
        index: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let mut config = load_config(&args.config)?;
    if let Some(url) = args.rpc_url {
        config.rpc_url = Some(url);
    }
    if let Some(program_id) = args.program_id {
        config.program_id = Some(program_id);
    }
    config.validate().context("Invalid configuration")?;
    let program_id = config.program_id()?;

    match args.command {
        Command::Derive(derive) => {
            let (address, bump) = match derive {
                DeriveCommand::Multisig { create_key } => get_ms_pda(&create_key, &program_id),
                DeriveCommand::Transaction { multisig, index } => {
                    get_tx_pda(&multisig, index, &program_id)?
                }
                DeriveCommand::Instruction { transaction, index } => {
                    get_ix_pda(&transaction, index, &program_id)?
                }
                DeriveCommand::Authority { multisig, index } => {
                    get_authority_pda(&multisig, index, &program_id)?
                }
                DeriveCommand::IxAuthority { transaction, index } => {
                    get_ix_authority_pda(&transaction, index, &program_id)?
                }
            };
            println!("{} {}", address, bump);
        }
        Command::NextIndex { multisig } => {
            let mesh = connect(&config)?;
            let index = mesh
                .get_next_transaction_index(&multisig)
                .await
                .with_context(|| format!("Failed to read multisig {}", multisig))?;
            println!("{}", index);
        }
        Command::ShowMultisig { address } => {
            let mesh = connect(&config)?;
            let ms = mesh
                .get_multisig(&address)
                .await
                .with_context(|| format!("Failed to read multisig {}", address))?;
            println!("address:            {}", ms.address);
            println!("threshold:          {}", ms.state.threshold);
            println!("authority_index:    {}", ms.state.authority_index);
            println!("transaction_index:  {}", ms.state.transaction_index);
            println!("ms_change_index:    {}", ms.state.ms_change_index);
            println!("create_key:         {}", ms.state.create_key);
            println!("external_authority: {}", ms.state.external_authority);
            println!("external_execute:   {}", ms.state.allow_external_execute);
            println!("members:");
            for member in &ms.state.keys {
                println!("  {}", member);
            }
        }
    }

    Ok(())
}

/// Initialize logging infrastructure
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "squads_mesh=debug,mesh=debug,info"
    } else {
        "squads_mesh=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<MeshConfig> {
    if std::path::Path::new(path).exists() {
        MeshConfig::from_file(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        debug!("Config file '{}' not found, using defaults", path);
        Ok(MeshConfig::default())
    }
}

/// Read-only client; a configured wallet is used when present
fn connect(config: &MeshConfig) -> Result<SquadsMesh> {
    let wallet = match &config.keypair_path {
        Some(path) => Wallet::from_file(path)?,
        None => {
            warn!("No keypair_path configured, using an ephemeral keypair");
            Wallet::ephemeral()
        }
    };
    debug!(endpoint = %config.endpoint()?, payer = %wallet.pubkey(), "Connecting");
    Ok(SquadsMesh::from_config(config, wallet.keypair_arc())?)
}
