//! Common test utilities for integration tests
//!
//! Builds markets as slab bytes plus an in-memory chain holding them, so the
//! client can be driven end to end without a validator.

#![allow(dead_code)]

use percolator_sdk::testing::{sample_account, InMemoryChain, SlabBuilder};
use percolator_sdk::{Account, AccountKind, MarketContext, PercolatorClient};
use solana_sdk::pubkey::Pubkey;

// ============================================================================
// MARKET FIXTURES
// ============================================================================

pub struct TestMarket {
    pub program_id: Pubkey,
    pub slab: Pubkey,
    pub collateral_mint: Pubkey,
    pub vault: Pubkey,
    pub oracle: Pubkey,
}

impl TestMarket {
    pub fn new(collateral_mint: Pubkey) -> Self {
        Self {
            program_id: Pubkey::new_unique(),
            slab: Pubkey::new_unique(),
            collateral_mint,
            vault: Pubkey::new_unique(),
            oracle: Pubkey::new_unique(),
        }
    }

    /// Market settled in a plain SPL token
    pub fn spl() -> Self {
        Self::new(Pubkey::new_unique())
    }

    /// Market settled in wrapped SOL
    pub fn native() -> Self {
        Self::new(spl_token::native_mint::ID)
    }

    pub fn context(&self) -> MarketContext {
        MarketContext {
            program_id: self.program_id,
            slab: self.slab,
            collateral_mint: self.collateral_mint,
            vault: Some(self.vault),
            oracle: Some(self.oracle),
        }
    }

    /// Slab builder with this market's config addresses filled in
    pub fn slab_builder(&self) -> SlabBuilder {
        let mut builder = SlabBuilder::new();
        builder
            .collateral_mint(&self.collateral_mint)
            .vault(&self.vault)
            .index_oracle(&self.oracle)
            .oracle_price_e6(150_000_000);
        builder
    }
}

pub fn lp_account(owner: Pubkey) -> Account {
    Account {
        kind: AccountKind::Lp,
        owner,
        position_size: 0,
        ..sample_account()
    }
}

pub fn user_account(owner: Pubkey) -> Account {
    Account {
        kind: AccountKind::User,
        owner,
        ..sample_account()
    }
}

/// Client over a chain that holds only `accounts`
pub fn client_with(accounts: Vec<(Pubkey, Vec<u8>)>) -> PercolatorClient<InMemoryChain> {
    let mut chain = InMemoryChain::new();
    for (address, data) in accounts {
        chain.insert(address, data);
    }
    PercolatorClient::with_reader(chain)
}
