// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memo-program transactions.

use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;

use meterline_core::MeterError;

/// SPL memo program (v2).
pub const MEMO_PROGRAM_ID: Pubkey =
    Pubkey::from_str_const("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

/// Largest serialized transaction a cluster accepts.
pub const PACKET_DATA_SIZE: usize = 1232;

const SIGNATURE_BYTES: usize = 64;

/// Build and sign a single-instruction memo transaction paid by `payer`.
///
/// The memo instruction references no accounts. Fails with `Submission`
/// when the signed transaction would not fit in one packet.
pub fn memo_transaction(
    payer: &Keypair,
    recent_blockhash: Hash,
    memo: &str,
) -> Result<Transaction, MeterError> {
    let instruction = Instruction::new_with_bytes(MEMO_PROGRAM_ID, memo.as_bytes(), vec![]);
    let tx = Transaction::new_signed_with_payer(
        &[instruction],
        Some(&payer.pubkey()),
        &[payer],
        recent_blockhash,
    );

    // One-byte signature count, the signatures, then the message.
    let size = 1 + tx.signatures.len() * SIGNATURE_BYTES + tx.message_data().len();
    if size > PACKET_DATA_SIZE {
        return Err(MeterError::Submission {
            message: format!(
                "memo transaction is {size} bytes, limit is {PACKET_DATA_SIZE} ({} memo bytes)",
                memo.len()
            ),
        });
    }
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_transaction_is_signed_by_payer() {
        let payer = Keypair::new();
        let memo = "meterline|v1|3|0123456789abcdef|10|20|k1";
        let tx = memo_transaction(&payer, Hash::new_from_array([7; 32]), memo).unwrap();

        assert_eq!(tx.signatures.len(), 1);
        assert_eq!(tx.message.account_keys[0], payer.pubkey());
        assert!(tx.message.account_keys.contains(&MEMO_PROGRAM_ID));
        assert_eq!(tx.message.instructions.len(), 1);
        assert_eq!(tx.message.instructions[0].data, memo.as_bytes());
        assert!(tx.message.instructions[0].accounts.is_empty());
        assert_eq!(tx.message.recent_blockhash, Hash::new_from_array([7; 32]));
        assert!(tx.is_signed());
    }

    #[test]
    fn oversized_memo_is_rejected() {
        let payer = Keypair::new();
        let memo = "x".repeat(PACKET_DATA_SIZE);
        match memo_transaction(&payer, Hash::default(), &memo) {
            Err(MeterError::Submission { message }) => assert!(message.contains("limit is 1232")),
            other => panic!("expected Submission error, got: {other:?}"),
        }
    }

    #[test]
    fn memo_program_id_round_trips() {
        assert_eq!(
            MEMO_PROGRAM_ID.to_string(),
            "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr"
        );
    }
}
