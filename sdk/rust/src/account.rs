//! Position record parser

use tracing::warn;

use crate::codec::*;
use crate::constants::layout::*;
use crate::constants::ACCOUNT_ID_SANITY_CEILING;
use crate::types::{Account, AccountKind};

/// Parses one account record.
///
/// `record` is the slot's bytes; it may be shorter than [`ACCOUNT_SIZE`] when
/// the slab is truncated, in which case the missing fields decode as zero.
/// Returns `None` when the stored account id is at or above the sanity
/// ceiling, which marks the slot as uninitialized or corrupt.
///
/// The returned `account_id` is always `slot_idx`: the bitmap position is what
/// every instruction addresses, not the id stored in the record.
pub fn parse_account(record: &[u8], slot_idx: usize) -> Option<Account> {
    let stored_id = read_u64(record, ACCT_ACCOUNT_ID);
    if stored_id >= ACCOUNT_ID_SANITY_CEILING {
        warn!(slot_idx, stored_id, "skipping account record above id ceiling");
        return None;
    }

    Some(Account {
        account_id: slot_idx as u64,
        capital: read_u128(record, ACCT_CAPITAL),
        kind: AccountKind::from(read_u8(record, ACCT_KIND)),
        pnl: read_i128(record, ACCT_PNL),
        reserved_pnl: read_u64(record, ACCT_RESERVED_PNL),
        warmup_started_at_slot: read_u64(record, ACCT_WARMUP_STARTED_AT_SLOT),
        warmup_slope_per_step: read_u128(record, ACCT_WARMUP_SLOPE_PER_STEP),
        position_size: read_i128(record, ACCT_POSITION_SIZE),
        entry_price: read_u64(record, ACCT_ENTRY_PRICE),
        funding_index: read_i128(record, ACCT_FUNDING_INDEX),
        matcher_program: read_address(record, ACCT_MATCHER_PROGRAM),
        matcher_context: read_address(record, ACCT_MATCHER_CONTEXT),
        owner: read_address(record, ACCT_OWNER),
        fee_credits: read_i128(record, ACCT_FEE_CREDITS),
        last_fee_slot: read_u64(record, ACCT_LAST_FEE_SLOT),
    })
}

/// Writes `account` into a record buffer at the documented offsets.
///
/// The stored id is written as given; callers building fixtures choose
/// whether it matches the slot.
pub fn write_account(record: &mut [u8], stored_id: u64, account: &Account) {
    write_u64(record, ACCT_ACCOUNT_ID, stored_id);
    write_u128(record, ACCT_CAPITAL, account.capital);
    write_bytes(record, ACCT_KIND, &[account.kind as u8]);
    write_i128(record, ACCT_PNL, account.pnl);
    write_u64(record, ACCT_RESERVED_PNL, account.reserved_pnl);
    write_u64(record, ACCT_WARMUP_STARTED_AT_SLOT, account.warmup_started_at_slot);
    write_u128(record, ACCT_WARMUP_SLOPE_PER_STEP, account.warmup_slope_per_step);
    write_i128(record, ACCT_POSITION_SIZE, account.position_size);
    write_u64(record, ACCT_ENTRY_PRICE, account.entry_price);
    write_i128(record, ACCT_FUNDING_INDEX, account.funding_index);
    write_address(record, ACCT_MATCHER_PROGRAM, &account.matcher_program);
    write_address(record, ACCT_MATCHER_CONTEXT, &account.matcher_context);
    write_address(record, ACCT_OWNER, &account.owner);
    write_i128(record, ACCT_FEE_CREDITS, account.fee_credits);
    write_u64(record, ACCT_LAST_FEE_SLOT, account.last_fee_slot);
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn sample() -> Account {
        Account {
            account_id: 0,
            capital: 5_000_000_000,
            kind: AccountKind::Lp,
            pnl: -12_345,
            reserved_pnl: 77,
            warmup_started_at_slot: 1_000,
            warmup_slope_per_step: 3,
            position_size: -2_500_000,
            entry_price: 142_000_000,
            funding_index: -9,
            matcher_program: Pubkey::new_unique(),
            matcher_context: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            fee_credits: 40,
            last_fee_slot: 1_234,
        }
    }

    #[test]
    fn test_parse_full_record() {
        let mut record = [0u8; ACCOUNT_SIZE];
        let expected = Account { account_id: 17, ..sample() };
        write_account(&mut record, 17, &expected);

        let parsed = parse_account(&record, 17).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.kind, AccountKind::Lp);
    }

    #[test]
    fn test_slot_index_overrides_stored_id() {
        let mut record = [0u8; ACCOUNT_SIZE];
        write_account(&mut record, 3, &sample());

        let parsed = parse_account(&record, 42).unwrap();
        assert_eq!(parsed.account_id, 42);
    }

    #[test]
    fn test_rejects_id_above_ceiling() {
        let mut record = [0u8; ACCOUNT_SIZE];
        write_account(&mut record, ACCOUNT_ID_SANITY_CEILING, &sample());
        assert!(parse_account(&record, 0).is_none());

        write_account(&mut record, ACCOUNT_ID_SANITY_CEILING - 1, &sample());
        assert!(parse_account(&record, 0).is_some());
    }

    #[test]
    fn test_truncated_record_zeroes_tail() {
        let mut record = [0u8; ACCOUNT_SIZE];
        let full = sample();
        write_account(&mut record, 5, &full);

        let parsed = parse_account(&record[..ACCT_ENTRY_PRICE], 5).unwrap();
        assert_eq!(parsed.capital, full.capital);
        assert_eq!(parsed.position_size, full.position_size);
        assert_eq!(parsed.entry_price, 0);
        assert_eq!(parsed.owner, Pubkey::default());
        assert_eq!(parsed.last_fee_slot, 0);
    }
}
