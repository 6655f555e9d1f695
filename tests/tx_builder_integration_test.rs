//! End-to-end tests for proposal building and submission

#[cfg(test)]
mod tx_builder_tests {
    use borsh::BorshDeserialize;
    use solana_sdk::{
        instruction::{AccountMeta, Instruction},
        pubkey::Pubkey,
        system_instruction,
    };
    use squads_mesh::address::{get_ix_authority_pda, get_ix_pda, get_tx_pda};
    use squads_mesh::instructions::{discriminator, is_instruction, names};
    use squads_mesh::test_utils::MockTransport;
    use squads_mesh::transport::{Transport, TransportError};
    use squads_mesh::tx_builder::{TransactionBuilder, TransactionBuilderError};
    use squads_mesh::types::{
        AuthorityDescriptor, AuthorityKind, IncomingInstruction, Ms, MultisigRef,
    };
    use squads_mesh::DEFAULT_MULTISIG_PROGRAM_ID;

    #[derive(BorshDeserialize)]
    struct AddInstructionArgs {
        incoming_instruction: IncomingInstruction,
        authority_index: Option<u32>,
        authority_bump: Option<u8>,
        authority_type: AuthorityKind,
    }

    fn decode_add(ix: &Instruction) -> AddInstructionArgs {
        assert_eq!(&ix.data[..8], &discriminator(names::ADD_INSTRUCTION));
        AddInstructionArgs::try_from_slice(&ix.data[8..]).unwrap()
    }

    fn multisig(transaction_index: u32) -> MultisigRef {
        MultisigRef::new(
            Pubkey::new_unique(),
            Ms {
                threshold: 2,
                transaction_index,
                keys: vec![Pubkey::new_unique(), Pubkey::new_unique()],
                ..Default::default()
            },
        )
    }

    fn transfer(lamports: u64) -> Instruction {
        system_instruction::transfer(&Pubkey::new_unique(), &Pubkey::new_unique(), lamports)
    }

    #[test]
    fn test_four_instruction_proposal() {
        let ms = multisig(5);
        let creator = Pubkey::new_unique();
        let (expected_tx, _) = get_tx_pda(&ms.address, 6, &DEFAULT_MULTISIG_PROGRAM_ID).unwrap();
        let (custom_authority, custom_bump) =
            get_ix_authority_pda(&expected_tx, 2, &DEFAULT_MULTISIG_PROGRAM_ID).unwrap();

        let base = TransactionBuilder::new(ms.clone(), 1, DEFAULT_MULTISIG_PROGRAM_ID, creator);
        let mut builder = base
            .with_instruction(transfer(1), None)
            .with_instructions_uniform_authority(vec![transfer(2), transfer(3)], None)
            .with_instructions_per_authority(
                vec![Instruction::new_with_bytes(
                    Pubkey::new_unique(),
                    &[42],
                    vec![AccountMeta::new(custom_authority, true)],
                )],
                &[AuthorityDescriptor::custom(2, custom_bump)],
            )
            .unwrap();

        assert!(base.pending().is_empty());
        assert_eq!(builder.transaction_pda().unwrap(), expected_tx);

        let finalized = builder.finalize().unwrap();
        assert_eq!(finalized.transaction_pda, expected_tx);
        assert_eq!(finalized.instructions.len(), 5);

        let create = &finalized.instructions[0];
        assert!(is_instruction(create, &DEFAULT_MULTISIG_PROGRAM_ID, names::CREATE_TRANSACTION));
        assert_eq!(create.accounts[0].pubkey, ms.address);
        assert_eq!(create.accounts[1].pubkey, expected_tx);
        assert_eq!(create.accounts[2], AccountMeta::new(creator, true));
        assert_eq!(&create.data[8..], &1u32.to_le_bytes());

        for (position, ix) in finalized.instructions.iter().enumerate().skip(1) {
            let (ix_pda, _) =
                get_ix_pda(&expected_tx, position as u64, &DEFAULT_MULTISIG_PROGRAM_ID).unwrap();
            assert_eq!(ix.accounts[1].pubkey, expected_tx);
            assert_eq!(ix.accounts[2].pubkey, ix_pda);
        }

        let first = decode_add(&finalized.instructions[1]);
        assert_eq!(first.authority_index, None);
        assert_eq!(first.authority_bump, None);
        assert_eq!(first.authority_type, AuthorityKind::Default);
        assert_eq!(first.incoming_instruction.program_id, solana_sdk::system_program::id());

        let last = decode_add(&finalized.instructions[4]);
        assert_eq!(last.authority_index, Some(2));
        assert_eq!(last.authority_bump, Some(custom_bump));
        assert_eq!(last.authority_type, AuthorityKind::Custom);
        assert_eq!(last.incoming_instruction.data, vec![42]);
        assert!(last.incoming_instruction.keys[0].is_signer);

        assert!(builder.pending().is_empty());
    }

    #[test]
    fn test_same_snapshot_predicts_same_address() {
        let ms = multisig(9);
        let creator = Pubkey::new_unique();
        let a = TransactionBuilder::new(ms.clone(), 1, DEFAULT_MULTISIG_PROGRAM_ID, creator);
        let b = TransactionBuilder::new(ms, 2, DEFAULT_MULTISIG_PROGRAM_ID, creator)
            .with_instruction(transfer(1), None);
        assert_eq!(a.transaction_pda().unwrap(), b.transaction_pda().unwrap());
    }

    #[test]
    fn test_arity_error_leaves_builder_usable() {
        let builder = TransactionBuilder::new(
            multisig(0),
            1,
            DEFAULT_MULTISIG_PROGRAM_ID,
            Pubkey::new_unique(),
        );
        let err = builder
            .with_instructions_per_authority(vec![transfer(1), transfer(2)], &[])
            .unwrap_err();
        assert_eq!(err.category(), "arity");
        assert!(!err.is_retryable());

        let next = builder.with_instruction(transfer(3), None);
        assert_eq!(next.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_and_confirm_submits_one_transaction() {
        let transport = MockTransport::new();
        let mut builder = TransactionBuilder::new(
            multisig(0),
            1,
            DEFAULT_MULTISIG_PROGRAM_ID,
            transport.payer(),
        )
        .with_instructions_uniform_authority(vec![transfer(1), transfer(2)], None);

        let finalized = builder.execute_and_confirm(&transport).await.unwrap();
        assert_eq!(finalized.instructions.len(), 3);
        assert!(builder.pending().is_empty());

        let sent = transport.sent_transactions().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message.instructions.len(), 3);
        assert_eq!(sent[0].message.account_keys[0], transport.payer());
        assert!(sent[0].is_signed());
    }

    #[tokio::test]
    async fn test_execute_and_confirm_surfaces_rejection() {
        let transport = MockTransport::new();
        transport
            .fail_sends_with(TransportError::ProtocolRejection {
                code: Some(6000),
                message: "custom program error: 0x1770".into(),
            })
            .await;

        let mut builder = TransactionBuilder::new(
            multisig(0),
            1,
            DEFAULT_MULTISIG_PROGRAM_ID,
            transport.payer(),
        )
        .with_instruction(transfer(1), None);

        let err = builder.execute_and_confirm(&transport).await.unwrap_err();
        match err {
            TransactionBuilderError::Transport(inner) => {
                assert_eq!(inner.program_error_code(), Some(6000));
            }
            other => panic!("Expected transport error, got {:?}", other),
        }
        // finalize ran before submission
        assert!(builder.pending().is_empty());
        assert_eq!(transport.sent_count().await, 0);
    }
}
