//! Protocol constants: slab layout offsets, PDA seeds and instruction tags

// ============================================================================
// SLAB IDENTIFICATION
// ============================================================================

/// Slab magic, "PERCOLAT" read as a little-endian u64
pub const MAGIC: u64 = 0x504552434F4C4154;

/// Layout version this decoder was written against
pub const SLAB_VERSION: u32 = 1;

/// Number of account slots in the engine
pub const MAX_ACCOUNTS: usize = 4096;

/// Number of u64 words in the occupancy bitmap
pub const BITMAP_WORDS: usize = (MAX_ACCOUNTS + 63) / 64;

/// Stored account ids at or above this are treated as uninitialized memory
pub const ACCOUNT_ID_SANITY_CEILING: u64 = 1_000_000;

// ============================================================================
// PDA SEEDS
// ============================================================================

/// Vault authority PDA seed
pub const VAULT_SEED: &[u8] = b"vault";

/// LP signer PDA seed
pub const LP_SEED: &[u8] = b"lp";

// ============================================================================
// SCALING FACTORS
// ============================================================================

/// Oracle price scale (1e6)
pub const PRICE_SCALE: u64 = 1_000_000;

/// Basis points scale (10000 = 100%)
pub const BPS_SCALE: u64 = 10_000;

// ============================================================================
// INSTRUCTION DISCRIMINATORS
// ============================================================================

/// Percolator instruction tags (first byte of instruction data)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercolatorInstruction {
    InitUser = 1,
    InitLp = 2,
    DepositCollateral = 3,
    WithdrawCollateral = 4,
    TradeNoCpi = 6,
    TradeCpi = 10,
}

// ============================================================================
// SLAB LAYOUT
// ============================================================================

/// Byte offsets of the slab account. Every offset is part of the on-chain
/// wire contract for [`MAGIC`] / [`SLAB_VERSION`]; none are derived from Rust
/// struct layout.
pub mod layout {
    // Header: 72 bytes at offset 0
    pub const HEADER_OFF: usize = 0;
    pub const HEADER_LEN: usize = 72;
    pub const MAGIC_OFF: usize = 0;
    pub const VERSION_OFF: usize = 8;
    pub const BUMP_OFF: usize = 12;
    pub const FLAGS_OFF: usize = 13;
    pub const ADMIN_OFF: usize = 16;
    pub const RESERVED_OFF: usize = 48;
    pub const NONCE_OFF: usize = RESERVED_OFF;
    pub const LAST_THR_UPDATE_SLOT_OFF: usize = RESERVED_OFF + 8;

    // Config: 320 bytes directly after the header, offsets relative to CONFIG_OFF
    pub const CONFIG_OFF: usize = HEADER_LEN;
    pub const CONFIG_LEN: usize = 320;
    pub const CFG_COLLATERAL_MINT: usize = 0;
    pub const CFG_VAULT_PUBKEY: usize = 32;
    pub const CFG_INDEX_FEED_ID: usize = 64;
    pub const CFG_MAX_STALENESS_SLOTS: usize = 96;
    pub const CFG_CONF_FILTER_BPS: usize = 104;
    pub const CFG_VAULT_AUTHORITY_BUMP: usize = 106;
    pub const CFG_INVERT: usize = 107;
    pub const CFG_UNIT_SCALE: usize = 108;
    pub const CFG_FUNDING_HORIZON_SLOTS: usize = 112;
    pub const CFG_FUNDING_K_BPS: usize = 120;
    pub const CFG_FUNDING_INV_SCALE_NOTIONAL_E6: usize = 128;
    pub const CFG_FUNDING_MAX_PREMIUM_BPS: usize = 144;
    pub const CFG_FUNDING_MAX_BPS_PER_SLOT: usize = 152;
    pub const CFG_THRESH_FLOOR: usize = 160;
    pub const CFG_THRESH_RISK_BPS: usize = 176;
    pub const CFG_THRESH_UPDATE_INTERVAL_SLOTS: usize = 184;
    pub const CFG_THRESH_STEP_BPS: usize = 192;
    pub const CFG_THRESH_ALPHA_BPS: usize = 200;
    pub const CFG_THRESH_MIN: usize = 208;
    pub const CFG_THRESH_MAX: usize = 224;
    pub const CFG_THRESH_MIN_STEP: usize = 240;
    pub const CFG_ORACLE_AUTHORITY: usize = 256;
    pub const CFG_AUTHORITY_PRICE_E6: usize = 288;
    pub const CFG_AUTHORITY_TIMESTAMP: usize = 296;
    pub const CFG_ORACLE_PRICE_CAP_E2BPS: usize = 304;
    pub const CFG_LAST_EFFECTIVE_PRICE_E6: usize = 312;

    // Engine, offsets relative to ENGINE_OFF
    pub const ENGINE_OFF: usize = CONFIG_OFF + CONFIG_LEN;
    pub const ENG_VAULT: usize = 0;
    pub const ENG_INSURANCE_BALANCE: usize = 16;
    pub const ENG_INSURANCE_FEE_REVENUE: usize = 32;
    pub const ENG_PARAMS: usize = 48;
    pub const ENG_CURRENT_SLOT: usize = 192;
    pub const ENG_FUNDING_INDEX: usize = 200;
    pub const ENG_LAST_FUNDING_SLOT: usize = 216;
    pub const ENG_FUNDING_RATE_BPS_PER_SLOT_LAST: usize = 224;
    pub const ENG_LAST_CRANK_SLOT: usize = 232;
    pub const ENG_MAX_CRANK_STALENESS_SLOTS: usize = 240;
    pub const ENG_TOTAL_OPEN_INTEREST: usize = 248;
    pub const ENG_C_TOT: usize = 264;
    pub const ENG_PNL_POS_TOT: usize = 280;
    pub const ENG_LIQ_CURSOR: usize = 296;
    pub const ENG_GC_CURSOR: usize = 298;
    pub const ENG_LAST_SWEEP_START_SLOT: usize = 304;
    pub const ENG_LAST_SWEEP_COMPLETE_SLOT: usize = 312;
    pub const ENG_CRANK_CURSOR: usize = 320;
    pub const ENG_SWEEP_START_IDX: usize = 322;
    pub const ENG_LIFETIME_LIQUIDATIONS: usize = 328;
    pub const ENG_LIFETIME_FORCE_CLOSES: usize = 336;
    pub const ENG_NET_LP_POS: usize = 344;
    pub const ENG_LP_SUM_ABS: usize = 360;
    pub const ENG_LP_MAX_ABS: usize = 376;
    pub const ENG_LP_MAX_ABS_SWEEP: usize = 392;
    pub const ENG_BITMAP: usize = 408;
    pub const ENG_NUM_USED_ACCOUNTS: usize = 920;
    pub const ENG_NEXT_ACCOUNT_ID: usize = 928;
    pub const ENG_FREE_HEAD: usize = 936;
    pub const ENG_NEXT_FREE: usize = 938;
    pub const ENG_ACCOUNTS: usize = 9136;

    // Risk params, offsets relative to ENGINE_OFF + ENG_PARAMS
    pub const RP_WARMUP_PERIOD_SLOTS: usize = 0;
    pub const RP_MAINTENANCE_MARGIN_BPS: usize = 8;
    pub const RP_INITIAL_MARGIN_BPS: usize = 16;
    pub const RP_TRADING_FEE_BPS: usize = 24;
    pub const RP_MAX_ACCOUNTS: usize = 32;
    pub const RP_NEW_ACCOUNT_FEE: usize = 40;
    pub const RP_RISK_REDUCTION_THRESHOLD: usize = 56;
    pub const RP_MAINTENANCE_FEE_PER_SLOT: usize = 72;
    pub const RP_MAX_CRANK_STALENESS_SLOTS: usize = 88;
    pub const RP_LIQUIDATION_FEE_BPS: usize = 96;
    pub const RP_LIQUIDATION_FEE_CAP: usize = 104;
    pub const RP_LIQUIDATION_BUFFER_BPS: usize = 120;
    pub const RP_MIN_LIQUIDATION_ABS: usize = 128;
    pub const RISK_PARAMS_LEN: usize = 144;

    // Account record, offsets relative to the record start
    pub const ACCOUNT_SIZE: usize = 240;
    pub const ACCOUNTS_OFF: usize = ENGINE_OFF + ENG_ACCOUNTS;
    pub const ACCT_ACCOUNT_ID: usize = 0;
    pub const ACCT_CAPITAL: usize = 8;
    pub const ACCT_KIND: usize = 24;
    pub const ACCT_PNL: usize = 32;
    pub const ACCT_RESERVED_PNL: usize = 48;
    pub const ACCT_WARMUP_STARTED_AT_SLOT: usize = 56;
    pub const ACCT_WARMUP_SLOPE_PER_STEP: usize = 64;
    pub const ACCT_POSITION_SIZE: usize = 80;
    pub const ACCT_ENTRY_PRICE: usize = 96;
    pub const ACCT_FUNDING_INDEX: usize = 104;
    pub const ACCT_MATCHER_PROGRAM: usize = 120;
    pub const ACCT_MATCHER_CONTEXT: usize = 152;
    pub const ACCT_OWNER: usize = 184;
    pub const ACCT_FEE_CREDITS: usize = 216;
    pub const ACCT_LAST_FEE_SLOT: usize = 232;

    /// Length of a slab that holds every account slot
    pub const SLAB_LEN: usize = ACCOUNTS_OFF + super::MAX_ACCOUNTS * ACCOUNT_SIZE;

    /// Absolute byte offset of the record stored in slot `idx`
    pub const fn account_offset(idx: usize) -> usize {
        ACCOUNTS_OFF + idx * ACCOUNT_SIZE
    }
}
