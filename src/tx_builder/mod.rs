//! Proposal builder for the mesh multisig program
//!
//! ## Architecture
//!
//! - **errors**: builder error taxonomy (encoding, arity, authority, transport)
//! - **builder**: copy-on-write `TransactionBuilder` and `finalize`
//! - **instructions**: ordering sanity check for finalized bundles
//! - **output**: `FinalizedTransaction`, the bundle plus its transaction PDA
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use squads_mesh::tx_builder::TransactionBuilder;
//! use squads_mesh::types::{Ms, MultisigRef};
//! use squads_mesh::constants::DEFAULT_MULTISIG_PROGRAM_ID;
//! use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
//!
//! # fn example(transfer: Instruction) -> Result<(), squads_mesh::tx_builder::TransactionBuilderError> {
//! let multisig = MultisigRef::new(Pubkey::new_unique(), Ms::default());
//! let creator = Pubkey::new_unique();
//! let mut builder = TransactionBuilder::new(multisig, 1, DEFAULT_MULTISIG_PROGRAM_ID, creator)
//!     .with_instruction(transfer, None);
//!
//! let finalized = builder.finalize()?;
//! // finalized.instructions == [create_transaction, add_instruction]
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::TransactionBuilderError;

mod builder;
pub mod instructions;
mod output;

pub use builder::TransactionBuilder;
pub use instructions::sanity_check_proposal_order;
pub use output::FinalizedTransaction;
