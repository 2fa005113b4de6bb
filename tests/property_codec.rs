//! Property-based tests for the byte codec and slab traversal
//!
//! Run with: cargo test --test property_codec -- --nocapture

use std::collections::BTreeSet;

use percolator_sdk::codec::{encode_i128, read_i128, read_u64};
use percolator_sdk::layout::*;
use percolator_sdk::testing::{sample_account, SlabBuilder};
use percolator_sdk::{parse_account, parse_slab, used_indices, MAX_ACCOUNTS};
use proptest::prelude::*;

// ============================================================================
// NUMERIC CODEC
// ============================================================================

proptest! {
    #[test]
    fn prop_i128_matches_native_le(value in any::<i128>()) {
        prop_assert_eq!(encode_i128(value), value.to_le_bytes());
    }

    #[test]
    fn prop_i128_read_back(value in any::<i128>(), pad in 0usize..32) {
        let mut buf = vec![0u8; pad];
        buf.extend_from_slice(&encode_i128(value));
        prop_assert_eq!(read_i128(&buf, pad), value);
    }

    #[test]
    fn prop_reads_past_end_are_zero(len in 0usize..16, offset in 0usize..64) {
        let buf = vec![0xFFu8; len];
        let expected = if offset + 8 <= len { u64::MAX } else { 0 };
        prop_assert_eq!(read_u64(&buf, offset), expected);
    }
}

#[test]
fn test_i128_edges() {
    for value in [0i128, 1, -1, i128::MAX, i128::MIN, i64::MIN as i128, u64::MAX as i128] {
        assert_eq!(encode_i128(value), value.to_le_bytes(), "value {value}");
        assert_eq!(read_i128(&encode_i128(value), 0), value);
    }
    assert_eq!(encode_i128(-1), [0xFF; 16]);
    assert_eq!(encode_i128(i128::MIN)[15], 0x80);
}

// ============================================================================
// BITMAP TRAVERSAL
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_set_bit_is_visited(slots in prop::collection::btree_set(0usize..MAX_ACCOUNTS, 0..48)) {
        let mut builder = SlabBuilder::new();
        for &idx in &slots {
            builder.account(idx, sample_account());
        }
        let data = builder.build();

        let expected: Vec<usize> = slots.iter().copied().collect();
        prop_assert_eq!(used_indices(&data), expected.clone());

        let state = parse_slab(&data).unwrap();
        let ids: Vec<usize> = state.accounts.iter().map(|a| a.account_id as usize).collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn prop_decoded_count_bounded_by_num_used(
        slots in prop::collection::btree_set(0usize..256, 1..32),
        num_used in 0u16..40,
    ) {
        let mut builder = SlabBuilder::new();
        for &idx in &slots {
            builder.account(idx, sample_account());
        }
        builder.num_used(num_used);

        let state = parse_slab(&builder.build()).unwrap();
        prop_assert_eq!(state.accounts.len(), slots.len().min(num_used as usize));

        let first: BTreeSet<usize> = slots.iter().copied().take(num_used as usize).collect();
        for account in &state.accounts {
            prop_assert!(first.contains(&(account.account_id as usize)));
        }
    }

    #[test]
    fn prop_truncation_never_panics(cut in 0usize..(ACCOUNTS_OFF + 8 * ACCOUNT_SIZE)) {
        let mut builder = SlabBuilder::new();
        builder.account(0, sample_account()).account(3, sample_account()).account(7, sample_account());
        let data = builder.build_truncated(cut);

        match parse_slab(&data) {
            Ok(state) => prop_assert!(state.accounts.len() <= 3),
            Err(_) => prop_assert!(cut < 8),
        }
    }

    #[test]
    fn prop_record_id_is_slot(record in prop::collection::vec(any::<u8>(), 0..ACCOUNT_SIZE), slot in 0usize..MAX_ACCOUNTS) {
        let stored = read_u64(&record, ACCT_ACCOUNT_ID);
        match parse_account(&record, slot) {
            Some(account) => {
                prop_assert!(stored < 1_000_000);
                prop_assert_eq!(account.account_id, slot as u64);
            }
            None => prop_assert!(stored >= 1_000_000),
        }
    }
}
