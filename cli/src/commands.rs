//! CLI Command Handlers

use anyhow::{anyhow, bail, Context, Result};
use console::style;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signature},
    signer::Signer,
    transaction::Transaction,
};
use std::time::Duration;
use tracing::info;

use percolator_sdk::{
    parse_address, InstructionSet, LpContext, MarketContext, PercolatorClient, PercolatorClientConfig,
    SlabSnapshot, SlabState,
};

use crate::config::{Config, OutputFormat, Settings};
use crate::output::*;
use crate::{AccountCommands, ConfigCommands, SlabCommands};

// ============================================================================
// HELPERS
// ============================================================================

fn load_keypair(path: &str) -> Result<Keypair> {
    read_keypair_file(path).map_err(|e| anyhow!("Failed to read keypair {}: {}", path, e))
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(template);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn client(settings: &Settings) -> PercolatorClient {
    PercolatorClient::with_config(PercolatorClientConfig {
        rpc_url: settings.rpc_url.clone(),
        ..Default::default()
    })
}

/// Program id and slab from the settings, both validated
fn market_addresses(settings: &Settings) -> Result<(Pubkey, Pubkey)> {
    let program_id = parse_address(settings.program_id()?)?;
    let slab = parse_address(settings.slab()?)?;
    Ok((program_id, slab))
}

async fn fetch_market(client: &PercolatorClient, settings: &Settings) -> Result<(MarketContext, SlabSnapshot)> {
    let (program_id, slab) = market_addresses(settings)?;
    let pb = spinner("Fetching slab...");
    let result = client.market_context(&program_id, &slab).await;
    pb.finish_and_clear();
    Ok(result?)
}

/// Resolves the user account to act on: the explicit index, or the single
/// non-LP account the wallet owns.
fn resolve_user_index(state: &SlabState, owner: &Pubkey, explicit: Option<u16>) -> Result<u16> {
    if let Some(idx) = explicit {
        let account = state
            .account(idx)
            .ok_or_else(|| anyhow!("No live account at index {}", idx))?;
        if account.owner != *owner {
            bail!("Account {} is owned by {}, not {}", idx, account.owner, owner);
        }
        return Ok(idx);
    }

    let owned: Vec<u16> = state
        .accounts_by_owner(owner)
        .filter(|a| !a.is_lp())
        .map(|a| a.index())
        .collect();
    match owned.as_slice() {
        [idx] => Ok(*idx),
        [] => Err(anyhow!("No user account for {}. Run 'percolator account init-user' first", owner)),
        _ => Err(anyhow!("{} owns accounts {:?}; choose one with --index", owner, owned)),
    }
}

fn resolve_lp(state: &SlabState, lp_index: u16) -> Result<LpContext> {
    let account = state
        .account(lp_index)
        .ok_or_else(|| anyhow!("No live account at index {}", lp_index))?;
    LpContext::from_account(account).with_context(|| format!("Account {} cannot act as LP", lp_index))
}

async fn send_transaction(rpc: &RpcClient, tx: &Transaction, label: &str) -> Result<Signature> {
    let pb = spinner(&format!("Sending {}...", label));
    let result = rpc.send_and_confirm_transaction(tx).await;
    pb.finish_and_clear();
    result.with_context(|| format!("Transaction failed ({} via {})", label, rpc.url()))
}

/// Shows the instruction set, asks for confirmation, then signs and sends it.
///
/// The first signer pays. Returns `None` when the user declines.
async fn submit(
    client: &PercolatorClient,
    settings: &Settings,
    label: &str,
    set: InstructionSet,
    signers: Vec<&Keypair>,
) -> Result<Option<Signature>> {
    let payer = signers
        .first()
        .map(|k| k.pubkey())
        .ok_or_else(|| anyhow!("No signer"))?;

    if settings.output == OutputFormat::Text {
        print_instruction_summary(label, &set);
    }
    if !settings.assume_yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Submit {}?", label))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("{}", style("Cancelled").yellow());
            return Ok(None);
        }
    }

    let mut tx = set.to_transaction(&payer);
    tx.try_sign(&signers, set.recent_blockhash)?;

    let signature = send_transaction(client.reader(), &tx, label).await?;
    info!(%signature, label, "transaction confirmed");
    print_signature(&signature, settings.output);
    Ok(Some(signature))
}

// ============================================================================
// SLAB COMMANDS
// ============================================================================

pub async fn handle_slab_command(settings: &Settings, command: SlabCommands) -> Result<()> {
    let client = client(settings);
    let slab = parse_address(settings.slab()?)?;

    let pb = spinner("Fetching slab...");
    let result = client.fetch_slab(&slab).await;
    pb.finish_and_clear();
    let snapshot = result?;
    let state = &snapshot.state;

    match command {
        SlabCommands::Status => {
            print_slab_status(&slab, state, snapshot.slot, settings.output);
        }

        SlabCommands::Accounts { owner, lps, users, decimals } => {
            let owner = owner.as_deref().map(parse_address).transpose()?;
            let selected = state.accounts.iter().filter(|a| {
                owner.map_or(true, |o| a.owner == o) && (!lps || a.is_lp()) && (!users || !a.is_lp())
            });
            print_accounts(selected, state.oracle_price_e6(), decimals, settings.output);
        }
    }

    Ok(())
}

// ============================================================================
// ACCOUNT COMMANDS
// ============================================================================

pub async fn handle_account_command(settings: &Settings, command: AccountCommands) -> Result<()> {
    let keypair = load_keypair(settings.keypair_path()?)?;
    let wallet = keypair.pubkey();
    let client = client(settings);
    let (ctx, snapshot) = fetch_market(&client, settings).await?;
    let state = &snapshot.state;

    match command {
        AccountCommands::InitUser { fee } => {
            let set = client.build_init_user(&ctx, &wallet, fee).await?;
            submit(&client, settings, "init user", set, vec![&keypair]).await?;
        }

        AccountCommands::InitLp { matcher_program, matcher_context, fee } => {
            let matcher_program = parse_address(&matcher_program)?;
            let matcher_context = parse_address(&matcher_context)?;
            let set = client
                .build_init_lp(&ctx, &wallet, &matcher_program, &matcher_context, fee)
                .await?;
            submit(&client, settings, "init LP", set, vec![&keypair]).await?;
        }

        AccountCommands::Deposit { amount, index } => {
            let user_idx = resolve_user_index(state, &wallet, index)?;
            let set = client.build_deposit(&ctx, &wallet, user_idx, amount).await?;
            submit(&client, settings, "deposit", set, vec![&keypair]).await?;
        }

        AccountCommands::Withdraw { amount, index } => {
            let user_idx = resolve_user_index(state, &wallet, index)?;
            let set = client.build_withdraw(&ctx, &wallet, user_idx, amount).await?;
            submit(&client, settings, "withdraw", set, vec![&keypair]).await?;
        }

        AccountCommands::Trade { lp_index, size, index, lp_keypair } => {
            if size == 0 {
                bail!("Trade size must be non-zero");
            }
            let user_idx = resolve_user_index(state, &wallet, index)?;
            let lp = resolve_lp(state, lp_index)?;

            match lp_keypair {
                Some(path) => {
                    let lp_signer = load_keypair(&path)?;
                    if lp_signer.pubkey() != lp.owner {
                        bail!("LP {} is owned by {}, not {}", lp_index, lp.owner, lp_signer.pubkey());
                    }
                    let set = client
                        .build_trade_no_cpi(&ctx, &wallet, &lp.owner, lp_index, user_idx, size)
                        .await?;
                    submit(&client, settings, "trade", set, vec![&keypair, &lp_signer]).await?;
                }
                None => {
                    let set = client.build_trade_cpi(&ctx, &wallet, &lp, user_idx, size).await?;
                    submit(&client, settings, "trade", set, vec![&keypair]).await?;
                }
            }
        }

        AccountCommands::Positions { decimals } => {
            print_accounts(state.accounts_by_owner(&wallet), state.oracle_price_e6(), decimals, settings.output);
        }
    }

    Ok(())
}

// ============================================================================
// CONFIG COMMANDS
// ============================================================================

pub fn handle_config_command(mut config: Config, output: OutputFormat, command: ConfigCommands) -> Result<()> {
    let path = Config::config_path();

    match command {
        ConfigCommands::Show => {
            print_config(&config, &path, output);
            return Ok(());
        }
        ConfigCommands::SetRpc { url } => {
            config.rpc_url = url;
        }
        ConfigCommands::SetKeypair { path } => {
            config.keypair_path = Some(path);
        }
        ConfigCommands::SetProgram { address } => {
            config.program_id = Some(parse_address(&address)?.to_string());
        }
        ConfigCommands::SetSlab { address } => {
            config.slab = Some(parse_address(&address)?.to_string());
        }
        ConfigCommands::Init => {
            if path.exists() {
                println!("{}", style(format!("Config already exists at {}", path.display())).yellow());
                return Ok(());
            }
            config = Config::default();
        }
    }

    config.save()?;
    println!("{}", style(format!("Saved {}", path.display())).green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use percolator_sdk::testing::{sample_account, SlabBuilder};
    use percolator_sdk::{parse_slab, Account, AccountKind};

    fn state_with(accounts: &[(usize, Account)]) -> SlabState {
        let mut builder = SlabBuilder::new();
        for (idx, account) in accounts {
            builder.account(*idx, account.clone());
        }
        parse_slab(&builder.build()).unwrap()
    }

    #[tokio::test]
    async fn test_client_targets_configured_rpc() {
        use crate::config::Overrides;

        let settings = Settings::resolve(
            Config::default(),
            Overrides {
                rpc_url: Some("http://127.0.0.1:8899".into()),
                ..Default::default()
            },
        );
        let client = client(&settings);
        let rpc: &RpcClient = client.reader();
        assert_eq!(rpc.url(), "http://127.0.0.1:8899");
    }

    #[test]
    fn test_resolve_single_user_account() {
        let owner = Pubkey::new_unique();
        let state = state_with(&[
            (2, Account { owner, kind: AccountKind::Lp, ..sample_account() }),
            (5, Account { owner, ..sample_account() }),
        ]);
        assert_eq!(resolve_user_index(&state, &owner, None).unwrap(), 5);
    }

    #[test]
    fn test_resolve_ambiguous_requires_index() {
        let owner = Pubkey::new_unique();
        let state = state_with(&[
            (1, Account { owner, ..sample_account() }),
            (3, Account { owner, ..sample_account() }),
        ]);
        assert!(resolve_user_index(&state, &owner, None).is_err());
        assert_eq!(resolve_user_index(&state, &owner, Some(3)).unwrap(), 3);
    }

    #[test]
    fn test_resolve_rejects_foreign_index() {
        let state = state_with(&[(0, sample_account())]);
        assert!(resolve_user_index(&state, &Pubkey::new_unique(), Some(0)).is_err());
        assert!(resolve_user_index(&state, &Pubkey::new_unique(), Some(9)).is_err());
    }

    #[test]
    fn test_resolve_lp_requires_lp_kind() {
        let state = state_with(&[
            (0, sample_account()),
            (1, Account { kind: AccountKind::Lp, ..sample_account() }),
        ]);
        assert!(resolve_lp(&state, 0).is_err());
        assert_eq!(resolve_lp(&state, 1).unwrap().lp_idx, 1);
    }
}
