//! Synthetic slab fixtures and an in-memory chain.
//!
//! [`SlabBuilder`] writes header, config and engine fields at the layout
//! offsets and places account records in chosen slots, so decoder tests can
//! be written against exact byte positions. [`InMemoryChain`] stands in for
//! the RPC reader and counts every read it serves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use solana_sdk::{hash::Hash, pubkey::Pubkey};

use crate::account::write_account;
use crate::client::{ChainReader, RawAccount};
use crate::error::Result;
use crate::codec::*;
use crate::constants::layout::*;
use crate::constants::*;
use crate::types::{Account, AccountKind};

/// Account with distinct non-zero values in every field
pub fn sample_account() -> Account {
    Account {
        account_id: 0,
        capital: 10_000_000_000,
        kind: AccountKind::User,
        pnl: -1_500_000,
        reserved_pnl: 250,
        warmup_started_at_slot: 310_000_000,
        warmup_slope_per_step: 12,
        position_size: 3_000_000,
        entry_price: 145_250_000,
        funding_index: -42,
        matcher_program: Pubkey::new_unique(),
        matcher_context: Pubkey::new_unique(),
        owner: Pubkey::new_unique(),
        fee_credits: 900,
        last_fee_slot: 310_000_500,
    }
}

#[derive(Debug, Clone)]
pub struct SlabBuilder {
    data: Vec<u8>,
    num_used: Option<u16>,
    placed: u16,
}

impl Default for SlabBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SlabBuilder {
    /// Full-size slab with a valid magic and version
    pub fn new() -> Self {
        let mut data = vec![0u8; SLAB_LEN];
        write_u64(&mut data, MAGIC_OFF, MAGIC);
        write_u32(&mut data, VERSION_OFF, SLAB_VERSION);
        Self { data, num_used: None, placed: 0 }
    }

    pub fn magic(&mut self, magic: u64) -> &mut Self {
        write_u64(&mut self.data, MAGIC_OFF, magic);
        self
    }

    pub fn version(&mut self, version: u32) -> &mut Self {
        write_u32(&mut self.data, VERSION_OFF, version);
        self
    }

    pub fn admin(&mut self, admin: &Pubkey) -> &mut Self {
        write_address(&mut self.data, ADMIN_OFF, admin);
        self
    }

    pub fn nonce(&mut self, nonce: u64) -> &mut Self {
        write_u64(&mut self.data, NONCE_OFF, nonce);
        self
    }

    pub fn collateral_mint(&mut self, mint: &Pubkey) -> &mut Self {
        write_address(&mut self.data, CONFIG_OFF + CFG_COLLATERAL_MINT, mint);
        self
    }

    pub fn vault(&mut self, vault: &Pubkey) -> &mut Self {
        write_address(&mut self.data, CONFIG_OFF + CFG_VAULT_PUBKEY, vault);
        self
    }

    pub fn index_oracle(&mut self, oracle: &Pubkey) -> &mut Self {
        write_address(&mut self.data, CONFIG_OFF + CFG_INDEX_FEED_ID, oracle);
        self
    }

    pub fn unit_scale(&mut self, scale: u32) -> &mut Self {
        write_u32(&mut self.data, CONFIG_OFF + CFG_UNIT_SCALE, scale);
        self
    }

    pub fn oracle_price_e6(&mut self, price: u64) -> &mut Self {
        write_u64(&mut self.data, CONFIG_OFF + CFG_LAST_EFFECTIVE_PRICE_E6, price);
        self
    }

    pub fn vault_balance(&mut self, amount: u128) -> &mut Self {
        write_u128(&mut self.data, ENGINE_OFF + ENG_VAULT, amount);
        self
    }

    pub fn insurance_balance(&mut self, amount: u128) -> &mut Self {
        write_u128(&mut self.data, ENGINE_OFF + ENG_INSURANCE_BALANCE, amount);
        self
    }

    pub fn funding_index(&mut self, index: i128) -> &mut Self {
        write_i128(&mut self.data, ENGINE_OFF + ENG_FUNDING_INDEX, index);
        self
    }

    pub fn net_lp_pos(&mut self, pos: i128) -> &mut Self {
        write_i128(&mut self.data, ENGINE_OFF + ENG_NET_LP_POS, pos);
        self
    }

    pub fn next_account_id(&mut self, id: u64) -> &mut Self {
        write_u64(&mut self.data, ENGINE_OFF + ENG_NEXT_ACCOUNT_ID, id);
        self
    }

    /// Overrides the header's used-account count; by default it equals the
    /// number of records placed with [`account`](Self::account).
    pub fn num_used(&mut self, count: u16) -> &mut Self {
        self.num_used = Some(count);
        self
    }

    /// Sets slot `idx`'s bitmap bit without writing a record.
    pub fn set_bit(&mut self, idx: usize) -> &mut Self {
        let off = ENGINE_OFF + ENG_BITMAP + (idx / 64) * 8;
        let word = read_u64(&self.data, off) | (1u64 << (idx % 64));
        write_u64(&mut self.data, off, word);
        self
    }

    /// Places `account` in slot `idx` with a matching stored id.
    pub fn account(&mut self, idx: usize, account: Account) -> &mut Self {
        self.account_with_stored_id(idx, idx as u64, account)
    }

    pub fn account_with_stored_id(&mut self, idx: usize, stored_id: u64, account: Account) -> &mut Self {
        self.set_bit(idx);
        let start = account_offset(idx);
        write_account(&mut self.data[start..start + ACCOUNT_SIZE], stored_id, &account);
        self.placed += 1;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        let num_used = self.num_used.unwrap_or(self.placed);
        write_u16(&mut data, ENGINE_OFF + ENG_NUM_USED_ACCOUNTS, num_used);
        data
    }

    /// Built slab cut to `len` bytes
    pub fn build_truncated(&self, len: usize) -> Vec<u8> {
        let mut data = self.build();
        data.truncate(len);
        data
    }
}

// ============================================================================
// IN-MEMORY CHAIN
// ============================================================================

#[derive(Debug, Default)]
pub struct InMemoryChain {
    accounts: HashMap<Pubkey, Vec<u8>>,
    pub slot: u64,
    pub blockhash: Hash,
    account_reads: AtomicUsize,
    existence_checks: AtomicUsize,
    blockhash_reads: AtomicUsize,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self {
            slot: 1,
            blockhash: Hash::new_unique(),
            ..Default::default()
        }
    }

    pub fn insert(&mut self, address: Pubkey, data: Vec<u8>) -> &mut Self {
        self.accounts.insert(address, data);
        self
    }

    pub fn account_reads(&self) -> usize {
        self.account_reads.load(Ordering::SeqCst)
    }

    pub fn existence_checks(&self) -> usize {
        self.existence_checks.load(Ordering::SeqCst)
    }

    pub fn blockhash_reads(&self) -> usize {
        self.blockhash_reads.load(Ordering::SeqCst)
    }

    /// Reads of any kind served so far
    pub fn total_reads(&self) -> usize {
        self.account_reads() + self.existence_checks() + self.blockhash_reads()
    }
}

impl ChainReader for InMemoryChain {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>> {
        self.account_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .accounts
            .get(address)
            .map(|data| RawAccount { data: data.clone(), slot: self.slot }))
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        self.existence_checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.contains_key(address))
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.blockhash_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.blockhash)
    }
}
