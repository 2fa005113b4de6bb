//! Output formatting utilities

use console::style;
use serde_json::{json, Value};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tabled::{settings::Style, Table, Tabled};

use percolator_sdk::{
    from_base_units, price_from_e6, unrealized_pnl, Account, InstructionSet, PositionSide, SlabState,
    BPS_SCALE,
};

use crate::config::{Config, OutputFormat};

// ============================================================================
// SLAB OUTPUT
// ============================================================================

pub fn print_slab_status(slab: &Pubkey, state: &SlabState, slot: u64, format: OutputFormat) {
    if format == OutputFormat::Json {
        print_json(&slab_status_json(slab, state, slot));
        return;
    }

    let header = &state.header;
    let config = &state.config;
    let engine = &state.engine;
    let stats = state.stats();

    println!("\n{}", style("═══ Slab Status ═══").bold().cyan());
    println!();
    println!("{:<24} {}", "Slab:", slab);
    println!("{:<24} {}", "Observed at slot:", slot);
    println!("{:<24} {}", "Version:", header.version);
    println!("{:<24} {}", "Admin:", format_pubkey(&header.admin));
    println!();
    println!("{}", style("─── Market ───").dim());
    println!("{:<24} {}", "Collateral mint:", format_pubkey(&config.collateral_mint));
    println!("{:<24} {}", "Vault:", format_pubkey(&config.vault_pubkey));
    println!("{:<24} {}", "Index oracle:", format_pubkey(&config.index_oracle()));
    println!("{:<24} {:>15}", "Oracle price:", format_price(state.oracle_price_e6()));
    if config.has_oracle_authority() {
        println!("{:<24} {}", "Oracle authority:", format_pubkey(&config.oracle_authority));
        println!("{:<24} {:>15}", "Authority price:", format_price(config.authority_price_e6));
        println!("{:<24} {}", "Authority updated:", format_timestamp(config.authority_timestamp));
    }
    println!("{:<24} {:>15}", "Unit scale:", config.unit_scale);
    println!();
    println!("{}", style("─── Risk Engine ───").dim());
    println!("{:<24} {:>15}", "Vault balance:", engine.vault);
    println!("{:<24} {:>15}", "Insurance balance:", engine.insurance_balance);
    println!("{:<24} {:>15}", "Open interest:", engine.total_open_interest);
    println!("{:<24} {:>15}", "Net LP position:", engine.net_lp_pos);
    println!("{:<24} {:>15}", "Funding index:", engine.funding_index_qpb_e6);
    println!("{:<24} {:>15}", "Last crank slot:", engine.last_crank_slot);
    println!(
        "{:<24} {:>15}",
        "Margin (IM / MM):",
        format!(
            "{} / {}",
            format_bps(engine.params.initial_margin_bps),
            format_bps(engine.params.maintenance_margin_bps)
        )
    );
    println!("{:<24} {:>15}", "Trading fee:", format_bps(engine.params.trading_fee_bps));
    println!();
    println!("{}", style("─── Accounts ───").dim());
    println!("{:<24} {:>15}", "Used slots:", engine.num_used_accounts);
    println!("{:<24} {:>15}", "Bitmap population:", engine.bitmap_population());
    println!("{:<24} {:>15}", "Decoded:", stats.total_accounts);
    println!("{:<24} {:>15}", "Users / LPs:", format!("{} / {}", stats.user_accounts, stats.lp_accounts));
    println!("{:<24} {:>15}", "Long open size:", stats.long_open_size);
    println!("{:<24} {:>15}", "Short open size:", stats.short_open_size);
    println!("{:<24} {:>15}", "Total capital:", stats.total_capital);
    println!();
}

fn slab_status_json(slab: &Pubkey, state: &SlabState, slot: u64) -> Value {
    let stats = state.stats();
    json!({
        "slab": slab.to_string(),
        "slot": slot,
        "version": state.header.version,
        "admin": state.header.admin.to_string(),
        "collateral_mint": state.config.collateral_mint.to_string(),
        "vault": state.config.vault_pubkey.to_string(),
        "oracle": state.config.index_oracle().to_string(),
        "oracle_price_e6": state.oracle_price_e6(),
        "vault_balance": state.engine.vault.to_string(),
        "insurance_balance": state.engine.insurance_balance.to_string(),
        "total_open_interest": state.engine.total_open_interest.to_string(),
        "net_lp_pos": state.engine.net_lp_pos.to_string(),
        "num_used_accounts": state.engine.num_used_accounts,
        "accounts": {
            "decoded": stats.total_accounts,
            "users": stats.user_accounts,
            "lps": stats.lp_accounts,
            "long_open_size": stats.long_open_size.to_string(),
            "short_open_size": stats.short_open_size.to_string(),
            "total_capital": stats.total_capital.to_string(),
        },
    })
}

// ============================================================================
// ACCOUNT OUTPUT
// ============================================================================

#[derive(Tabled)]
struct AccountRow {
    #[tabled(rename = "Idx")]
    idx: u16,
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Owner")]
    owner: String,
    #[tabled(rename = "Capital")]
    capital: String,
    #[tabled(rename = "Side")]
    side: &'static str,
    #[tabled(rename = "Size")]
    size: i128,
    #[tabled(rename = "Entry")]
    entry: String,
    #[tabled(rename = "uPnL")]
    upnl: String,
}

fn side_label(side: PositionSide) -> &'static str {
    match side {
        PositionSide::Long => "long",
        PositionSide::Short => "short",
        PositionSide::Flat => "-",
    }
}

fn account_row(account: &Account, oracle_price_e6: u64, decimals: u8) -> AccountRow {
    AccountRow {
        idx: account.index(),
        kind: if account.is_lp() { "LP" } else { "user" },
        owner: format_pubkey(&account.owner),
        capital: format!("{:.4}", from_base_units(account.capital, decimals)),
        side: side_label(account.side()),
        size: account.position_size,
        entry: format_price(account.entry_price),
        upnl: unrealized_pnl(account.position_size, account.entry_price, oracle_price_e6).to_string(),
    }
}

fn account_json(account: &Account, oracle_price_e6: u64) -> Value {
    json!({
        "index": account.index(),
        "kind": if account.is_lp() { "lp" } else { "user" },
        "owner": account.owner.to_string(),
        "capital": account.capital.to_string(),
        "pnl": account.pnl.to_string(),
        "position_size": account.position_size.to_string(),
        "entry_price_e6": account.entry_price,
        "unrealized_pnl": unrealized_pnl(account.position_size, account.entry_price, oracle_price_e6).to_string(),
        "matcher_program": account.matcher_program.to_string(),
        "matcher_context": account.matcher_context.to_string(),
        "fee_credits": account.fee_credits.to_string(),
    })
}

pub fn print_accounts<'a>(
    accounts: impl IntoIterator<Item = &'a Account>,
    oracle_price_e6: u64,
    decimals: u8,
    format: OutputFormat,
) {
    let accounts: Vec<&Account> = accounts.into_iter().collect();

    if format == OutputFormat::Json {
        let values: Vec<Value> = accounts.iter().map(|a| account_json(a, oracle_price_e6)).collect();
        print_json(&Value::Array(values));
        return;
    }

    println!("\n{}", style("═══ Accounts ═══").bold().cyan());
    println!();
    if accounts.is_empty() {
        println!("{}", style("No matching accounts").dim());
        return;
    }

    let rows: Vec<AccountRow> = accounts
        .iter()
        .map(|a| account_row(a, oracle_price_e6, decimals))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    println!();
}

// ============================================================================
// TRANSACTION OUTPUT
// ============================================================================

pub fn print_instruction_summary(label: &str, set: &InstructionSet) {
    println!("\n{} {}", style("═══").bold().cyan(), style(label).bold());
    for (i, ix) in set.instructions.iter().enumerate() {
        println!(
            "  {} program {} ({} accounts, {} data bytes)",
            style(format!("#{}", i + 1)).dim(),
            format_pubkey(&ix.program_id),
            ix.accounts.len(),
            ix.data.len()
        );
    }
    println!("  {} {}", style("blockhash").dim(), set.recent_blockhash);
    println!();
}

pub fn print_signature(signature: &Signature, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&json!({ "signature": signature.to_string() })),
        OutputFormat::Text => println!("{}", style(format!("Transaction: {}", signature)).green()),
    }
}

// ============================================================================
// CONFIG OUTPUT
// ============================================================================

pub fn print_config(config: &Config, path: &std::path::Path, format: OutputFormat) {
    if format == OutputFormat::Json {
        match serde_json::to_value(config) {
            Ok(value) => print_json(&value),
            Err(e) => eprintln!("{} {}", style("Error:").red().bold(), e),
        }
        return;
    }

    println!("\n{}", style("═══ Configuration ═══").bold().cyan());
    println!();
    println!("{:<16} {}", "File:", path.display());
    println!("{:<16} {}", "RPC URL:", config.rpc_url);
    println!("{:<16} {}", "Keypair:", config.keypair_path.as_deref().unwrap_or("(not set)"));
    println!("{:<16} {:?}", "Output:", config.output_format);
    println!("{:<16} {}", "Program:", config.program_id.as_deref().unwrap_or("(not set)"));
    println!("{:<16} {}", "Slab:", config.slab.as_deref().unwrap_or("(not set)"));
    println!();
}

// ============================================================================
// FORMATTING HELPERS
// ============================================================================

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("{} {}", style("Error:").red().bold(), e),
    }
}

fn format_price(price_e6: u64) -> String {
    format!("{:.6}", price_from_e6(price_e6))
}

fn format_bps(bps: u64) -> String {
    format!("{:.2}%", bps as f64 * 100.0 / BPS_SCALE as f64)
}

fn format_pubkey(pubkey: &Pubkey) -> String {
    if *pubkey == Pubkey::default() {
        return "(none)".to_string();
    }
    let s = pubkey.to_string();
    if s.len() > 12 {
        format!("{}...{}", &s[..6], &s[s.len() - 4..])
    } else {
        s
    }
}

fn format_timestamp(ts: i64) -> String {
    use chrono::{DateTime, Utc};
    match DateTime::<Utc>::from_timestamp(ts, 0) {
        Some(dt) if ts > 0 => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        _ => "never".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pubkey() {
        assert_eq!(format_pubkey(&Pubkey::default()), "(none)");
        let formatted = format_pubkey(&Pubkey::new_unique());
        assert_eq!(formatted.len(), 13);
        assert!(formatted.contains("..."));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "never");
        assert_eq!(format_timestamp(1_700_000_000), "2023-11-14 22:13:20 UTC");
    }

    #[test]
    fn test_format_bps() {
        assert_eq!(format_bps(500), "5.00%");
        assert_eq!(format_bps(25), "0.25%");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1_234_567), "1.234567");
    }
}
