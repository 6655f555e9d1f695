//! Squads Mesh - client library for the mesh multisig program
//!
//! - **address**: PDA derivation for multisigs, transactions, inner
//!   instructions and authorities
//! - **tx_builder**: copy-on-write proposal builder producing the
//!   `[create_transaction, add_instruction...]` bundle
//! - **mesh**: `SquadsMesh` client for account reads and the proposal lifecycle
//! - **transport**: the network seam (`Transport` trait, RPC implementation)

pub mod address;
pub mod config;
pub mod constants;
pub mod instructions;
pub mod mesh;
pub mod test_utils;
pub mod transport;
pub mod tx_builder;
pub mod types;
pub mod wallet;

pub use address::{
    get_authority_pda, get_ix_authority_pda, get_ix_pda, get_ms_pda, get_tx_pda, AddressError,
    AddressRole,
};
pub use constants::DEFAULT_MULTISIG_PROGRAM_ID;
pub use mesh::{MeshError, MeshOptions, SquadsMesh};
pub use transport::{RpcTransport, Transport, TransportError};
pub use tx_builder::{FinalizedTransaction, TransactionBuilder, TransactionBuilderError};
pub use types::{AuthorityDescriptor, AuthorityKind, MultisigRef};

// Re-export commonly used types
pub use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Signature};
