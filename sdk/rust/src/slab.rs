//! Slab decoder
//!
//! Turns the raw bytes of a slab account into a [`SlabState`]. Only the magic
//! check is fatal; every scalar read past the end of the buffer yields zero,
//! and unreadable or implausible account records are skipped.

use tracing::{debug, trace};

use crate::account::parse_account;
use crate::codec::*;
use crate::constants::layout::*;
use crate::constants::*;
use crate::error::{PercolatorSdkError, Result};
use crate::types::*;

/// Checks the 8-byte magic at offset 0.
pub fn check_magic(data: &[u8]) -> Result<()> {
    let found = read_u64(data, MAGIC_OFF);
    if found != MAGIC {
        return Err(PercolatorSdkError::MagicMismatch { expected: MAGIC, found });
    }
    Ok(())
}

pub fn parse_header(data: &[u8]) -> Result<SlabHeader> {
    check_magic(data)?;
    Ok(SlabHeader {
        magic: read_u64(data, MAGIC_OFF),
        version: read_u32(data, VERSION_OFF),
        bump: read_u8(data, BUMP_OFF),
        flags: read_u8(data, FLAGS_OFF),
        admin: read_address(data, ADMIN_OFF),
        nonce: read_u64(data, NONCE_OFF),
        last_thr_update_slot: read_u64(data, LAST_THR_UPDATE_SLOT_OFF),
    })
}

pub fn parse_config(data: &[u8]) -> MarketConfig {
    let at = |field: usize| CONFIG_OFF + field;
    MarketConfig {
        collateral_mint: read_address(data, at(CFG_COLLATERAL_MINT)),
        vault_pubkey: read_address(data, at(CFG_VAULT_PUBKEY)),
        index_feed_id: read_bytes32(data, at(CFG_INDEX_FEED_ID)),
        max_staleness_slots: read_u64(data, at(CFG_MAX_STALENESS_SLOTS)),
        conf_filter_bps: read_u16(data, at(CFG_CONF_FILTER_BPS)),
        vault_authority_bump: read_u8(data, at(CFG_VAULT_AUTHORITY_BUMP)),
        invert: read_u8(data, at(CFG_INVERT)),
        unit_scale: read_u32(data, at(CFG_UNIT_SCALE)),
        funding_horizon_slots: read_u64(data, at(CFG_FUNDING_HORIZON_SLOTS)),
        funding_k_bps: read_u64(data, at(CFG_FUNDING_K_BPS)),
        funding_inv_scale_notional_e6: read_u128(data, at(CFG_FUNDING_INV_SCALE_NOTIONAL_E6)),
        funding_max_premium_bps: read_i64(data, at(CFG_FUNDING_MAX_PREMIUM_BPS)),
        funding_max_bps_per_slot: read_i64(data, at(CFG_FUNDING_MAX_BPS_PER_SLOT)),
        thresh_floor: read_u128(data, at(CFG_THRESH_FLOOR)),
        thresh_risk_bps: read_u64(data, at(CFG_THRESH_RISK_BPS)),
        thresh_update_interval_slots: read_u64(data, at(CFG_THRESH_UPDATE_INTERVAL_SLOTS)),
        thresh_step_bps: read_u64(data, at(CFG_THRESH_STEP_BPS)),
        thresh_alpha_bps: read_u64(data, at(CFG_THRESH_ALPHA_BPS)),
        thresh_min: read_u128(data, at(CFG_THRESH_MIN)),
        thresh_max: read_u128(data, at(CFG_THRESH_MAX)),
        thresh_min_step: read_u128(data, at(CFG_THRESH_MIN_STEP)),
        oracle_authority: read_address(data, at(CFG_ORACLE_AUTHORITY)),
        authority_price_e6: read_u64(data, at(CFG_AUTHORITY_PRICE_E6)),
        authority_timestamp: read_i64(data, at(CFG_AUTHORITY_TIMESTAMP)),
        oracle_price_cap_e2bps: read_u64(data, at(CFG_ORACLE_PRICE_CAP_E2BPS)),
        last_effective_price_e6: read_u64(data, at(CFG_LAST_EFFECTIVE_PRICE_E6)),
    }
}

fn parse_risk_params(data: &[u8]) -> RiskParams {
    let at = |field: usize| ENGINE_OFF + ENG_PARAMS + field;
    RiskParams {
        warmup_period_slots: read_u64(data, at(RP_WARMUP_PERIOD_SLOTS)),
        maintenance_margin_bps: read_u64(data, at(RP_MAINTENANCE_MARGIN_BPS)),
        initial_margin_bps: read_u64(data, at(RP_INITIAL_MARGIN_BPS)),
        trading_fee_bps: read_u64(data, at(RP_TRADING_FEE_BPS)),
        max_accounts: read_u64(data, at(RP_MAX_ACCOUNTS)),
        new_account_fee: read_u128(data, at(RP_NEW_ACCOUNT_FEE)),
        risk_reduction_threshold: read_u128(data, at(RP_RISK_REDUCTION_THRESHOLD)),
        maintenance_fee_per_slot: read_u128(data, at(RP_MAINTENANCE_FEE_PER_SLOT)),
        max_crank_staleness_slots: read_u64(data, at(RP_MAX_CRANK_STALENESS_SLOTS)),
        liquidation_fee_bps: read_u64(data, at(RP_LIQUIDATION_FEE_BPS)),
        liquidation_fee_cap: read_u128(data, at(RP_LIQUIDATION_FEE_CAP)),
        liquidation_buffer_bps: read_u64(data, at(RP_LIQUIDATION_BUFFER_BPS)),
        min_liquidation_abs: read_u128(data, at(RP_MIN_LIQUIDATION_ABS)),
    }
}

fn parse_bitmap(data: &[u8]) -> [u64; BITMAP_WORDS] {
    let mut bitmap = [0u64; BITMAP_WORDS];
    for (word_idx, word) in bitmap.iter_mut().enumerate() {
        *word = read_u64(data, ENGINE_OFF + ENG_BITMAP + word_idx * 8);
    }
    bitmap
}

pub fn parse_engine(data: &[u8]) -> EngineState {
    let at = |field: usize| ENGINE_OFF + field;
    EngineState {
        vault: read_u128(data, at(ENG_VAULT)),
        insurance_balance: read_u128(data, at(ENG_INSURANCE_BALANCE)),
        insurance_fee_revenue: read_u128(data, at(ENG_INSURANCE_FEE_REVENUE)),
        params: parse_risk_params(data),
        current_slot: read_u64(data, at(ENG_CURRENT_SLOT)),
        funding_index_qpb_e6: read_i128(data, at(ENG_FUNDING_INDEX)),
        last_funding_slot: read_u64(data, at(ENG_LAST_FUNDING_SLOT)),
        funding_rate_bps_per_slot_last: read_i64(data, at(ENG_FUNDING_RATE_BPS_PER_SLOT_LAST)),
        last_crank_slot: read_u64(data, at(ENG_LAST_CRANK_SLOT)),
        max_crank_staleness_slots: read_u64(data, at(ENG_MAX_CRANK_STALENESS_SLOTS)),
        total_open_interest: read_u128(data, at(ENG_TOTAL_OPEN_INTEREST)),
        c_tot: read_u128(data, at(ENG_C_TOT)),
        pnl_pos_tot: read_u128(data, at(ENG_PNL_POS_TOT)),
        liq_cursor: read_u16(data, at(ENG_LIQ_CURSOR)),
        gc_cursor: read_u16(data, at(ENG_GC_CURSOR)),
        last_full_sweep_start_slot: read_u64(data, at(ENG_LAST_SWEEP_START_SLOT)),
        last_full_sweep_completed_slot: read_u64(data, at(ENG_LAST_SWEEP_COMPLETE_SLOT)),
        crank_cursor: read_u16(data, at(ENG_CRANK_CURSOR)),
        sweep_start_idx: read_u16(data, at(ENG_SWEEP_START_IDX)),
        lifetime_liquidations: read_u64(data, at(ENG_LIFETIME_LIQUIDATIONS)),
        lifetime_force_realize_closes: read_u64(data, at(ENG_LIFETIME_FORCE_CLOSES)),
        net_lp_pos: read_i128(data, at(ENG_NET_LP_POS)),
        lp_sum_abs: read_u128(data, at(ENG_LP_SUM_ABS)),
        lp_max_abs: read_u128(data, at(ENG_LP_MAX_ABS)),
        lp_max_abs_sweep: read_u128(data, at(ENG_LP_MAX_ABS_SWEEP)),
        bitmap: parse_bitmap(data),
        num_used_accounts: read_u16(data, at(ENG_NUM_USED_ACCOUNTS)),
        next_account_id: read_u64(data, at(ENG_NEXT_ACCOUNT_ID)),
        free_head: read_u16(data, at(ENG_FREE_HEAD)),
    }
}

/// Slot indices whose bitmap bit is set, in ascending order.
pub fn used_indices(data: &[u8]) -> Vec<usize> {
    set_bits(&parse_bitmap(data)).collect()
}

/// Word-major, bit-minor walk over the set bits of a bitmap.
fn set_bits(bitmap: &[u64; BITMAP_WORDS]) -> impl Iterator<Item = usize> + '_ {
    bitmap.iter().enumerate().flat_map(|(word_idx, &word)| {
        let mut remaining = word;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            let bit = remaining.trailing_zeros() as usize;
            remaining &= remaining - 1;
            Some(word_idx * 64 + bit)
        })
    })
}

pub fn is_account_used(data: &[u8], idx: usize) -> bool {
    if idx >= MAX_ACCOUNTS {
        return false;
    }
    let word = read_u64(data, ENGINE_OFF + ENG_BITMAP + (idx / 64) * 8);
    (word >> (idx % 64)) & 1 == 1
}

/// Bytes of slot `idx`, or `None` when the record starts past the end of `data`.
///
/// A record that starts inside the buffer but runs past its end is returned
/// short; the parser zero-fills the missing fields.
fn record_bytes(data: &[u8], idx: usize) -> Option<&[u8]> {
    let start = account_offset(idx);
    if start >= data.len() {
        return None;
    }
    let end = data.len().min(start + ACCOUNT_SIZE);
    Some(&data[start..end])
}

/// Reads the record in slot `idx` if its bitmap bit is set.
pub fn read_account(data: &[u8], idx: usize) -> Option<Account> {
    if !is_account_used(data, idx) {
        return None;
    }
    parse_account(record_bytes(data, idx)?, idx)
}

/// Decodes every live account, stopping once `num_used` records were parsed.
fn parse_accounts(data: &[u8], bitmap: &[u64; BITMAP_WORDS], num_used: usize) -> Vec<Account> {
    let mut accounts = Vec::with_capacity(num_used.min(MAX_ACCOUNTS));
    for idx in set_bits(bitmap) {
        if accounts.len() >= num_used {
            break;
        }
        let Some(record) = record_bytes(data, idx) else {
            debug!(idx, len = data.len(), "account slot past end of slab, skipping");
            continue;
        };
        if let Some(account) = parse_account(record, idx) {
            accounts.push(account);
        }
    }
    accounts
}

/// Decodes a full slab.
///
/// Fails only on a magic mismatch, in which case nothing is returned.
pub fn parse_slab(data: &[u8]) -> Result<SlabState> {
    let header = parse_header(data)?;
    let config = parse_config(data);
    let engine = parse_engine(data);
    let accounts = parse_accounts(data, &engine.bitmap, engine.num_used_accounts as usize);

    trace!(
        len = data.len(),
        version = header.version,
        num_used = engine.num_used_accounts,
        decoded = accounts.len(),
        "decoded slab"
    );

    Ok(SlabState { header, config, engine, accounts })
}
