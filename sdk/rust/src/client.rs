//! Percolator Protocol Client
//!
//! Async edge of the SDK: fetches slab bytes through a [`ChainReader`] and
//! assembles unsigned instruction sets. Every address and context check runs
//! before the first network read, so a failed build never touches the chain.

use std::future::Future;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    transaction::Transaction,
};
use tracing::{debug, info};

use crate::constants::*;
use crate::error::{PercolatorSdkError, Result};
use crate::instructions::*;
use crate::slab::parse_slab;
use crate::types::SlabState;

// ============================================================================
// CHAIN READER
// ============================================================================

/// Raw account bytes together with the slot they were read at
#[derive(Debug, Clone)]
pub struct RawAccount {
    pub data: Vec<u8>,
    pub slot: u64,
}

/// Read-only view of the chain
pub trait ChainReader: Send + Sync {
    fn get_account(&self, address: &Pubkey) -> impl Future<Output = Result<Option<RawAccount>>> + Send;

    fn account_exists(&self, address: &Pubkey) -> impl Future<Output = Result<bool>> + Send;

    fn latest_blockhash(&self) -> impl Future<Output = Result<Hash>> + Send;
}

impl ChainReader for RpcClient {
    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await
            .map_err(|e| PercolatorSdkError::RpcError(e.to_string()))?;
        let slot = response.context.slot;
        Ok(response.value.map(|account| RawAccount { data: account.data, slot }))
    }

    async fn account_exists(&self, address: &Pubkey) -> Result<bool> {
        let response = self
            .get_account_with_commitment(address, self.commitment())
            .await
            .map_err(|e| PercolatorSdkError::RpcError(e.to_string()))?;
        Ok(response.value.is_some())
    }

    async fn latest_blockhash(&self) -> Result<Hash> {
        self.get_latest_blockhash()
            .await
            .map_err(|e| PercolatorSdkError::RpcError(e.to_string()))
    }
}

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Decoded slab with the slot it was observed at
#[derive(Debug, Clone)]
pub struct SlabSnapshot {
    pub state: SlabState,
    pub slot: u64,
}

/// Ordered, unsigned instructions bound to a recent blockhash
#[derive(Debug, Clone)]
pub struct InstructionSet {
    pub instructions: Vec<Instruction>,
    pub recent_blockhash: Hash,
}

impl InstructionSet {
    /// Unsigned transaction paid for by `payer`
    pub fn to_transaction(&self, payer: &Pubkey) -> Transaction {
        let mut transaction = Transaction::new_with_payer(&self.instructions, Some(payer));
        transaction.message.recent_blockhash = self.recent_blockhash;
        transaction
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Percolator client configuration
#[derive(Debug, Clone)]
pub struct PercolatorClientConfig {
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Commitment level
    pub commitment: CommitmentConfig,
}

impl Default for PercolatorClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.devnet.solana.com".to_string(),
            commitment: CommitmentConfig::confirmed(),
        }
    }
}

/// Main client for reading slabs and building Percolator instructions
pub struct PercolatorClient<R = RpcClient> {
    reader: R,
}

impl PercolatorClient<RpcClient> {
    /// Create a new client with the given RPC URL
    pub fn new(rpc_url: &str) -> Self {
        Self::with_config(PercolatorClientConfig {
            rpc_url: rpc_url.to_string(),
            ..Default::default()
        })
    }

    /// Create a new client with full configuration
    pub fn with_config(config: PercolatorClientConfig) -> Self {
        let rpc = RpcClient::new_with_commitment(config.rpc_url, config.commitment);
        Self { reader: rpc }
    }
}

impl<R: ChainReader> PercolatorClient<R> {
    pub fn with_reader(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    // ==========================================================================
    // ACCOUNT FETCHING
    // ==========================================================================

    /// Fetch and decode a slab
    pub async fn fetch_slab(&self, slab: &Pubkey) -> Result<SlabSnapshot> {
        let raw = self
            .reader
            .get_account(slab)
            .await?
            .ok_or_else(|| PercolatorSdkError::AccountNotFound(slab.to_string()))?;
        debug!(%slab, len = raw.data.len(), slot = raw.slot, "fetched slab");

        let state = parse_slab(&raw.data)?;
        Ok(SlabSnapshot { state, slot: raw.slot })
    }

    /// Fetch a slab and derive the market context from its config
    pub async fn market_context(&self, program_id: &Pubkey, slab: &Pubkey) -> Result<(MarketContext, SlabSnapshot)> {
        let snapshot = self.fetch_slab(slab).await?;
        let ctx = MarketContext::from_slab(*program_id, *slab, &snapshot.state);
        Ok((ctx, snapshot))
    }

    // ==========================================================================
    // TRANSACTION BUILDERS
    // ==========================================================================

    async fn finalize(&self, instructions: Vec<Instruction>) -> Result<InstructionSet> {
        let recent_blockhash = self.reader.latest_blockhash().await?;
        Ok(InstructionSet { instructions, recent_blockhash })
    }

    /// Prepends wrapping instructions when the collateral is wrapped SOL.
    async fn with_native_wrap(
        &self,
        ctx: &MarketContext,
        user: &Pubkey,
        lamports: u64,
        instruction: Instruction,
    ) -> Result<Vec<Instruction>> {
        if !ctx.is_native_collateral() {
            return Ok(vec![instruction]);
        }
        let ata = ctx.user_collateral_account(user);
        let exists = self.reader.account_exists(&ata).await?;
        debug!(%ata, exists, lamports, "wrapping SOL collateral");

        let mut instructions = create_wrap_native_instructions(user, lamports, !exists)?;
        instructions.push(instruction);
        Ok(instructions)
    }

    /// Build init user instruction set
    pub async fn build_init_user(&self, ctx: &MarketContext, user: &Pubkey, fee_payment: u64) -> Result<InstructionSet> {
        let user_ata = ctx.user_collateral_account(user);
        let ix = create_init_user_instruction(ctx, user, &user_ata, fee_payment)?;

        let instructions = self.with_native_wrap(ctx, user, fee_payment, ix).await?;
        info!(slab = %ctx.slab, %user, fee_payment, "built init user");
        self.finalize(instructions).await
    }

    /// Build init LP instruction set
    pub async fn build_init_lp(
        &self,
        ctx: &MarketContext,
        user: &Pubkey,
        matcher_program: &Pubkey,
        matcher_context: &Pubkey,
        fee_payment: u64,
    ) -> Result<InstructionSet> {
        let user_ata = ctx.user_collateral_account(user);
        let ix = create_init_lp_instruction(ctx, user, &user_ata, matcher_program, matcher_context, fee_payment)?;

        let instructions = self.with_native_wrap(ctx, user, fee_payment, ix).await?;
        info!(slab = %ctx.slab, %user, %matcher_program, "built init LP");
        self.finalize(instructions).await
    }

    /// Build deposit instruction set
    pub async fn build_deposit(
        &self,
        ctx: &MarketContext,
        user: &Pubkey,
        user_idx: u16,
        amount: u64,
    ) -> Result<InstructionSet> {
        let user_ata = ctx.user_collateral_account(user);
        let ix = create_deposit_instruction(ctx, user, &user_ata, user_idx, amount)?;

        let instructions = self.with_native_wrap(ctx, user, amount, ix).await?;
        info!(slab = %ctx.slab, user_idx, amount, "built deposit");
        self.finalize(instructions).await
    }

    /// Build withdraw instruction set
    pub async fn build_withdraw(
        &self,
        ctx: &MarketContext,
        user: &Pubkey,
        user_idx: u16,
        amount: u64,
    ) -> Result<InstructionSet> {
        let user_ata = ctx.user_collateral_account(user);
        let mut instructions = vec![create_withdraw_instruction(ctx, user, &user_ata, user_idx, amount)?];
        if ctx.is_native_collateral() {
            instructions.push(create_unwrap_native_instruction(user)?);
        }

        info!(slab = %ctx.slab, user_idx, amount, "built withdraw");
        self.finalize(instructions).await
    }

    /// Build trade instruction set against an LP's matcher
    pub async fn build_trade_cpi(
        &self,
        ctx: &MarketContext,
        user: &Pubkey,
        lp: &LpContext,
        user_idx: u16,
        size: i128,
    ) -> Result<InstructionSet> {
        let ix = create_trade_cpi_instruction(ctx, user, lp, user_idx, size)?;

        info!(slab = %ctx.slab, lp_idx = lp.lp_idx, user_idx, size = %size, "built trade");
        self.finalize(vec![ix]).await
    }

    /// Build trade instruction set co-signed by the LP owner
    pub async fn build_trade_no_cpi(
        &self,
        ctx: &MarketContext,
        user: &Pubkey,
        lp_owner: &Pubkey,
        lp_idx: u16,
        user_idx: u16,
        size: i128,
    ) -> Result<InstructionSet> {
        let ix = create_trade_no_cpi_instruction(ctx, user, lp_owner, lp_idx, user_idx, size)?;

        info!(slab = %ctx.slab, lp_idx, user_idx, size = %size, "built direct trade");
        self.finalize(vec![ix]).await
    }
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

/// Convert a human-readable token amount to base units
pub fn to_base_units(amount: f64, decimals: u8) -> u64 {
    (amount * 10f64.powi(decimals as i32)).round() as u64
}

/// Convert base units to a human-readable token amount
pub fn from_base_units(raw_amount: u128, decimals: u8) -> f64 {
    raw_amount as f64 / 10f64.powi(decimals as i32)
}

/// Convert human-readable price to e6 format
pub fn price_to_e6(price: f64) -> u64 {
    (price * PRICE_SCALE as f64).round() as u64
}

/// Convert e6 price to human-readable format
pub fn price_from_e6(price_e6: u64) -> f64 {
    price_e6 as f64 / PRICE_SCALE as f64
}

/// Mark-to-oracle PnL of a signed position, in collateral units
pub fn unrealized_pnl(position_size: i128, entry_price_e6: u64, oracle_price_e6: u64) -> i128 {
    let price_diff = oracle_price_e6 as i128 - entry_price_e6 as i128;
    position_size.saturating_mul(price_diff) / PRICE_SCALE as i128
}
