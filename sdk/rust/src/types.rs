//! Decoded slab structures
//!
//! These are plain snapshots: a [`SlabState`] is built fresh by every decode
//! and never mutated afterwards.

use solana_sdk::pubkey::Pubkey;

use crate::constants::*;

// ============================================================================
// HEADER / CONFIG
// ============================================================================

/// Slab header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlabHeader {
    pub magic: u64,
    pub version: u32,
    pub bump: u8,
    /// First padding byte, reused by the program as a flags byte
    pub flags: u8,
    pub admin: Pubkey,
    pub nonce: u64,
    pub last_thr_update_slot: u64,
}

/// Market configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketConfig {
    pub collateral_mint: Pubkey,
    pub vault_pubkey: Pubkey,
    /// Index price feed identifier
    pub index_feed_id: [u8; 32],
    pub max_staleness_slots: u64,
    pub conf_filter_bps: u16,
    pub vault_authority_bump: u8,
    /// Non-zero when the oracle price is inverted
    pub invert: u8,
    /// Base units per engine unit (0 = no scaling)
    pub unit_scale: u32,
    pub funding_horizon_slots: u64,
    pub funding_k_bps: u64,
    pub funding_inv_scale_notional_e6: u128,
    pub funding_max_premium_bps: i64,
    pub funding_max_bps_per_slot: i64,
    pub thresh_floor: u128,
    pub thresh_risk_bps: u64,
    pub thresh_update_interval_slots: u64,
    pub thresh_step_bps: u64,
    pub thresh_alpha_bps: u64,
    pub thresh_min: u128,
    pub thresh_max: u128,
    pub thresh_min_step: u128,
    pub oracle_authority: Pubkey,
    pub authority_price_e6: u64,
    pub authority_timestamp: i64,
    pub oracle_price_cap_e2bps: u64,
    /// Last oracle price after circuit-breaker clamping (e6)
    pub last_effective_price_e6: u64,
}

impl MarketConfig {
    /// Index feed interpreted as the oracle account address
    pub fn index_oracle(&self) -> Pubkey {
        Pubkey::new_from_array(self.index_feed_id)
    }

    pub fn has_oracle_authority(&self) -> bool {
        self.oracle_authority != Pubkey::default()
    }
}

// ============================================================================
// ENGINE
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskParams {
    pub warmup_period_slots: u64,
    pub maintenance_margin_bps: u64,
    pub initial_margin_bps: u64,
    pub trading_fee_bps: u64,
    pub max_accounts: u64,
    pub new_account_fee: u128,
    pub risk_reduction_threshold: u128,
    pub maintenance_fee_per_slot: u128,
    pub max_crank_staleness_slots: u64,
    pub liquidation_fee_bps: u64,
    pub liquidation_fee_cap: u128,
    pub liquidation_buffer_bps: u64,
    pub min_liquidation_abs: u128,
}

/// Risk engine scalars and the occupancy bitmap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineState {
    pub vault: u128,
    pub insurance_balance: u128,
    pub insurance_fee_revenue: u128,
    pub params: RiskParams,
    pub current_slot: u64,
    pub funding_index_qpb_e6: i128,
    pub last_funding_slot: u64,
    pub funding_rate_bps_per_slot_last: i64,
    pub last_crank_slot: u64,
    pub max_crank_staleness_slots: u64,
    pub total_open_interest: u128,
    pub c_tot: u128,
    pub pnl_pos_tot: u128,
    pub liq_cursor: u16,
    pub gc_cursor: u16,
    pub last_full_sweep_start_slot: u64,
    pub last_full_sweep_completed_slot: u64,
    pub crank_cursor: u16,
    pub sweep_start_idx: u16,
    pub lifetime_liquidations: u64,
    pub lifetime_force_realize_closes: u64,
    pub net_lp_pos: i128,
    pub lp_sum_abs: u128,
    pub lp_max_abs: u128,
    pub lp_max_abs_sweep: u128,
    pub bitmap: [u64; BITMAP_WORDS],
    pub num_used_accounts: u16,
    pub next_account_id: u64,
    pub free_head: u16,
}

impl EngineState {
    pub fn is_used(&self, idx: usize) -> bool {
        idx < MAX_ACCOUNTS && (self.bitmap[idx / 64] >> (idx % 64)) & 1 == 1
    }

    /// Number of set bits, independent of `num_used_accounts`
    pub fn bitmap_population(&self) -> u32 {
        self.bitmap.iter().map(|w| w.count_ones()).sum()
    }
}

// ============================================================================
// ACCOUNTS
// ============================================================================

/// Account kind byte
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccountKind {
    #[default]
    User = 0,
    Lp = 1,
}

impl From<u8> for AccountKind {
    fn from(byte: u8) -> Self {
        if byte == AccountKind::Lp as u8 {
            AccountKind::Lp
        } else {
            AccountKind::User
        }
    }
}

/// Direction of a signed position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
    Flat,
}

/// One position record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Bitmap slot index; this is what instructions address
    pub account_id: u64,
    pub capital: u128,
    pub kind: AccountKind,
    pub pnl: i128,
    pub reserved_pnl: u64,
    pub warmup_started_at_slot: u64,
    pub warmup_slope_per_step: u128,
    /// Signed size, positive = long
    pub position_size: i128,
    pub entry_price: u64,
    pub funding_index: i128,
    pub matcher_program: Pubkey,
    pub matcher_context: Pubkey,
    pub owner: Pubkey,
    pub fee_credits: i128,
    pub last_fee_slot: u64,
}

impl Account {
    pub fn is_lp(&self) -> bool {
        self.kind == AccountKind::Lp
    }

    pub fn side(&self) -> PositionSide {
        match self.position_size.signum() {
            1 => PositionSide::Long,
            -1 => PositionSide::Short,
            _ => PositionSide::Flat,
        }
    }

    /// Slot index as the u16 the instruction encoder expects
    pub fn index(&self) -> u16 {
        self.account_id as u16
    }
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Full decoded slab
#[derive(Debug, Clone)]
pub struct SlabState {
    pub header: SlabHeader,
    pub config: MarketConfig,
    pub engine: EngineState,
    /// Live records in ascending slot order
    pub accounts: Vec<Account>,
}

/// Aggregates over the live accounts of one snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlabStats {
    pub total_accounts: usize,
    pub user_accounts: usize,
    pub lp_accounts: usize,
    pub long_open_size: u128,
    pub short_open_size: u128,
    pub total_capital: u128,
}

impl SlabState {
    pub fn total_accounts(&self) -> usize {
        self.accounts.len()
    }

    /// Record stored in slot `idx`, if it was decoded
    pub fn account(&self, idx: u16) -> Option<&Account> {
        self.accounts
            .binary_search_by_key(&(idx as u64), |a| a.account_id)
            .ok()
            .map(|pos| &self.accounts[pos])
    }

    pub fn accounts_by_owner<'a>(&'a self, owner: &'a Pubkey) -> impl Iterator<Item = &'a Account> + 'a {
        self.accounts.iter().filter(move |a| &a.owner == owner)
    }

    pub fn lp_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(|a| a.is_lp())
    }

    pub fn user_accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter().filter(|a| !a.is_lp())
    }

    /// Oracle price in e6 units
    pub fn oracle_price_e6(&self) -> u64 {
        self.config.last_effective_price_e6
    }

    pub fn stats(&self) -> SlabStats {
        self.accounts.iter().fold(SlabStats::default(), |mut s, a| {
            s.total_accounts += 1;
            if a.is_lp() {
                s.lp_accounts += 1;
            } else {
                s.user_accounts += 1;
            }
            match a.side() {
                PositionSide::Long => {
                    s.long_open_size = s.long_open_size.saturating_add(a.position_size.unsigned_abs())
                }
                PositionSide::Short => {
                    s.short_open_size = s.short_open_size.saturating_add(a.position_size.unsigned_abs())
                }
                PositionSide::Flat => {}
            }
            s.total_capital = s.total_capital.saturating_add(a.capital);
            s
        })
    }
}
