//! Instruction builders
//!
//! Payload encoders produce the exact instruction data the program decodes:
//! a one-byte tag followed by little-endian fields with no separators. The
//! `create_*` builders attach account metadata in program order. Everything
//! here is pure; the network-facing assembly lives in [`crate::client`].

use std::str::FromStr;

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_instruction,
    sysvar,
};

use crate::codec::encode_i128;
use crate::constants::*;
use crate::error::{PercolatorSdkError, Result};
use crate::pda::*;
use crate::types::{Account, SlabState};

// ============================================================================
// ADDRESSES AND CONTEXT
// ============================================================================

/// Parses a base58 address, reporting the offending input on failure
pub fn parse_address(input: &str) -> Result<Pubkey> {
    Pubkey::from_str(input.trim()).map_err(|e| PercolatorSdkError::InvalidAddress {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

fn parse_optional(input: Option<&str>) -> Result<Option<Pubkey>> {
    input.map(parse_address).transpose()
}

fn known(address: Pubkey) -> Option<Pubkey> {
    (address != Pubkey::default()).then_some(address)
}

/// Addresses of one market that the builders need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketContext {
    pub program_id: Pubkey,
    pub slab: Pubkey,
    pub collateral_mint: Pubkey,
    pub vault: Option<Pubkey>,
    pub oracle: Option<Pubkey>,
}

impl MarketContext {
    /// Context from address strings, as found in configuration
    pub fn parse(
        program_id: &str,
        slab: &str,
        collateral_mint: &str,
        vault: Option<&str>,
        oracle: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            program_id: parse_address(program_id)?,
            slab: parse_address(slab)?,
            collateral_mint: parse_address(collateral_mint)?,
            vault: parse_optional(vault)?,
            oracle: parse_optional(oracle)?,
        })
    }

    /// Context from a decoded slab; zero addresses count as absent
    pub fn from_slab(program_id: Pubkey, slab: Pubkey, state: &SlabState) -> Self {
        Self {
            program_id,
            slab,
            collateral_mint: state.config.collateral_mint,
            vault: known(state.config.vault_pubkey),
            oracle: known(state.config.index_oracle()),
        }
    }

    pub fn vault(&self) -> Result<Pubkey> {
        self.vault.ok_or(PercolatorSdkError::MissingContext("collateral vault"))
    }

    pub fn oracle(&self) -> Result<Pubkey> {
        self.oracle.ok_or(PercolatorSdkError::MissingContext("index oracle"))
    }

    pub fn is_native_collateral(&self) -> bool {
        self.collateral_mint == spl_token::native_mint::ID
    }

    pub fn vault_authority(&self) -> Pubkey {
        derive_vault_authority_pda(&self.program_id, &self.slab).0
    }

    /// The user's associated token account for the collateral mint
    pub fn user_collateral_account(&self, user: &Pubkey) -> Pubkey {
        spl_associated_token_account::get_associated_token_address(user, &self.collateral_mint)
    }
}

/// Counterparty LP for a trade
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpContext {
    pub lp_idx: u16,
    pub owner: Pubkey,
    pub matcher_program: Pubkey,
    pub matcher_context: Pubkey,
}

impl LpContext {
    /// LP context from a decoded LP record; the slot index is the LP index
    pub fn from_account(account: &Account) -> Result<Self> {
        if !account.is_lp() {
            return Err(PercolatorSdkError::MissingContext("LP account"));
        }
        Ok(Self {
            lp_idx: account.index(),
            owner: account.owner,
            matcher_program: known(account.matcher_program)
                .ok_or(PercolatorSdkError::MissingContext("LP matcher program"))?,
            matcher_context: known(account.matcher_context)
                .ok_or(PercolatorSdkError::MissingContext("LP matcher context"))?,
        })
    }
}

// ============================================================================
// PAYLOAD ENCODERS
// ============================================================================

/// InitUser: tag 1, u64 fee
pub fn encode_init_user(fee_payment: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(9);
    data.push(PercolatorInstruction::InitUser as u8);
    data.extend_from_slice(&fee_payment.to_le_bytes());
    data
}

/// InitLP: tag 2, matcher program, matcher context, u64 fee
pub fn encode_init_lp(matcher_program: &Pubkey, matcher_context: &Pubkey, fee_payment: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(73);
    data.push(PercolatorInstruction::InitLp as u8);
    data.extend_from_slice(matcher_program.as_ref());
    data.extend_from_slice(matcher_context.as_ref());
    data.extend_from_slice(&fee_payment.to_le_bytes());
    data
}

fn encode_collateral(tag: PercolatorInstruction, user_idx: u16, amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(11);
    data.push(tag as u8);
    data.extend_from_slice(&user_idx.to_le_bytes());
    data.extend_from_slice(&amount.to_le_bytes());
    data
}

/// DepositCollateral: tag 3, u16 user index, u64 amount
pub fn encode_deposit(user_idx: u16, amount: u64) -> Vec<u8> {
    encode_collateral(PercolatorInstruction::DepositCollateral, user_idx, amount)
}

/// WithdrawCollateral: tag 4, u16 user index, u64 amount
pub fn encode_withdraw(user_idx: u16, amount: u64) -> Vec<u8> {
    encode_collateral(PercolatorInstruction::WithdrawCollateral, user_idx, amount)
}

fn encode_trade(tag: PercolatorInstruction, lp_idx: u16, user_idx: u16, size: i128) -> Vec<u8> {
    let mut data = Vec::with_capacity(21);
    data.push(tag as u8);
    data.extend_from_slice(&lp_idx.to_le_bytes());
    data.extend_from_slice(&user_idx.to_le_bytes());
    data.extend_from_slice(&encode_i128(size));
    data
}

/// TradeCpi: tag 10, u16 LP index, u16 user index, i128 size (positive = long)
pub fn encode_trade_cpi(lp_idx: u16, user_idx: u16, size: i128) -> Vec<u8> {
    encode_trade(PercolatorInstruction::TradeCpi, lp_idx, user_idx, size)
}

/// TradeNoCpi: tag 6, same payload as TradeCpi
pub fn encode_trade_no_cpi(lp_idx: u16, user_idx: u16, size: i128) -> Vec<u8> {
    encode_trade(PercolatorInstruction::TradeNoCpi, lp_idx, user_idx, size)
}

// ============================================================================
// PERCOLATOR INSTRUCTIONS
// ============================================================================

fn funding_accounts(ctx: &MarketContext, user: &Pubkey, user_ata: &Pubkey) -> Result<Vec<AccountMeta>> {
    Ok(vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(ctx.slab, false),
        AccountMeta::new(*user_ata, false),
        AccountMeta::new(ctx.vault()?, false),
        AccountMeta::new_readonly(spl_token::ID, false),
    ])
}

/// Create init user instruction
pub fn create_init_user_instruction(
    ctx: &MarketContext,
    user: &Pubkey,
    user_ata: &Pubkey,
    fee_payment: u64,
) -> Result<Instruction> {
    let accounts = funding_accounts(ctx, user, user_ata)?;
    Ok(Instruction::new_with_bytes(ctx.program_id, &encode_init_user(fee_payment), accounts))
}

/// Create init LP instruction
pub fn create_init_lp_instruction(
    ctx: &MarketContext,
    user: &Pubkey,
    user_ata: &Pubkey,
    matcher_program: &Pubkey,
    matcher_context: &Pubkey,
    fee_payment: u64,
) -> Result<Instruction> {
    let accounts = funding_accounts(ctx, user, user_ata)?;
    let data = encode_init_lp(matcher_program, matcher_context, fee_payment);
    Ok(Instruction::new_with_bytes(ctx.program_id, &data, accounts))
}

/// Create deposit collateral instruction
pub fn create_deposit_instruction(
    ctx: &MarketContext,
    user: &Pubkey,
    user_ata: &Pubkey,
    user_idx: u16,
    amount: u64,
) -> Result<Instruction> {
    let mut accounts = funding_accounts(ctx, user, user_ata)?;
    accounts.push(AccountMeta::new_readonly(sysvar::clock::ID, false));
    Ok(Instruction::new_with_bytes(ctx.program_id, &encode_deposit(user_idx, amount), accounts))
}

/// Create withdraw collateral instruction
pub fn create_withdraw_instruction(
    ctx: &MarketContext,
    user: &Pubkey,
    user_ata: &Pubkey,
    user_idx: u16,
    amount: u64,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(ctx.slab, false),
        AccountMeta::new(ctx.vault()?, false),
        AccountMeta::new(*user_ata, false),
        AccountMeta::new_readonly(ctx.vault_authority(), false),
        AccountMeta::new_readonly(spl_token::ID, false),
        AccountMeta::new_readonly(sysvar::clock::ID, false),
        AccountMeta::new_readonly(ctx.oracle()?, false),
    ];
    Ok(Instruction::new_with_bytes(ctx.program_id, &encode_withdraw(user_idx, amount), accounts))
}

/// Create trade instruction routed through the LP's matcher program
pub fn create_trade_cpi_instruction(
    ctx: &MarketContext,
    user: &Pubkey,
    lp: &LpContext,
    user_idx: u16,
    size: i128,
) -> Result<Instruction> {
    let (lp_pda, _) = derive_lp_pda(&ctx.program_id, &ctx.slab, lp.lp_idx);

    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new_readonly(lp.owner, false),
        AccountMeta::new(ctx.slab, false),
        AccountMeta::new_readonly(sysvar::clock::ID, false),
        AccountMeta::new_readonly(ctx.oracle()?, false),
        AccountMeta::new_readonly(lp.matcher_program, false),
        AccountMeta::new(lp.matcher_context, false),
        AccountMeta::new_readonly(lp_pda, false),
    ];

    let data = encode_trade_cpi(lp.lp_idx, user_idx, size);
    Ok(Instruction::new_with_bytes(ctx.program_id, &data, accounts))
}

/// Create trade instruction co-signed by the LP owner
pub fn create_trade_no_cpi_instruction(
    ctx: &MarketContext,
    user: &Pubkey,
    lp_owner: &Pubkey,
    lp_idx: u16,
    user_idx: u16,
    size: i128,
) -> Result<Instruction> {
    let accounts = vec![
        AccountMeta::new(*user, true),
        AccountMeta::new(*lp_owner, true),
        AccountMeta::new(ctx.slab, false),
        AccountMeta::new_readonly(sysvar::clock::ID, false),
        AccountMeta::new_readonly(ctx.oracle()?, false),
    ];

    let data = encode_trade_no_cpi(lp_idx, user_idx, size);
    Ok(Instruction::new_with_bytes(ctx.program_id, &data, accounts))
}

// ============================================================================
// WRAPPED SOL
// ============================================================================

/// Instructions that move `lamports` into the owner's wrapped-SOL account.
///
/// When `create_account` is set the idempotent ATA creation goes first; the
/// transfer is followed by `sync_native` so the token balance reflects it.
pub fn create_wrap_native_instructions(
    owner: &Pubkey,
    lamports: u64,
    create_account: bool,
) -> Result<Vec<Instruction>> {
    let ata = spl_associated_token_account::get_associated_token_address(owner, &spl_token::native_mint::ID);
    let mut instructions = Vec::with_capacity(3);

    if create_account {
        instructions.push(
            spl_associated_token_account::instruction::create_associated_token_account_idempotent(
                owner,
                owner,
                &spl_token::native_mint::ID,
                &spl_token::ID,
            ),
        );
    }
    instructions.push(system_instruction::transfer(owner, &ata, lamports));
    instructions.push(
        spl_token::instruction::sync_native(&spl_token::ID, &ata)
            .map_err(|e| PercolatorSdkError::InstructionBuild(e.to_string()))?,
    );

    Ok(instructions)
}

/// Closes the owner's wrapped-SOL account, returning its lamports to the owner
pub fn create_unwrap_native_instruction(owner: &Pubkey) -> Result<Instruction> {
    let ata = spl_associated_token_account::get_associated_token_address(owner, &spl_token::native_mint::ID);
    spl_token::instruction::close_account(&spl_token::ID, &ata, owner, owner, &[])
        .map_err(|e| PercolatorSdkError::InstructionBuild(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> MarketContext {
        MarketContext {
            program_id: Pubkey::new_unique(),
            slab: Pubkey::new_unique(),
            collateral_mint: Pubkey::new_unique(),
            vault: Some(Pubkey::new_unique()),
            oracle: Some(Pubkey::new_unique()),
        }
    }

    #[test]
    fn test_deposit_payload_layout() {
        let data = encode_deposit(0x0201, 0x0807060504030201);
        assert_eq!(data.len(), 11);
        assert_eq!(data[0], 3);
        assert_eq!(&data[1..3], &[0x01, 0x02]);
        assert_eq!(&data[3..], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_trade_payload_layout() {
        let data = encode_trade_cpi(1, 2, -1);
        assert_eq!(data.len(), 21);
        assert_eq!(data[0], 10);
        assert_eq!(&data[1..5], &[1, 0, 2, 0]);
        assert_eq!(&data[5..], &[0xFF; 16]);

        let data = encode_trade_no_cpi(1, 2, 5);
        assert_eq!(data[0], 6);
        assert_eq!(data[5], 5);
    }

    #[test]
    fn test_init_lp_payload_layout() {
        let program = Pubkey::new_unique();
        let context = Pubkey::new_unique();
        let data = encode_init_lp(&program, &context, 9);
        assert_eq!(data.len(), 73);
        assert_eq!(data[0], 2);
        assert_eq!(&data[1..33], program.as_ref());
        assert_eq!(&data[33..65], context.as_ref());
        assert_eq!(data[65], 9);
    }

    #[test]
    fn test_withdraw_instruction_accounts() {
        let ctx = context();
        let user = Pubkey::new_unique();
        let ata = Pubkey::new_unique();
        let ix = create_withdraw_instruction(&ctx, &user, &ata, 4, 100).unwrap();

        assert_eq!(ix.program_id, ctx.program_id);
        assert_eq!(ix.accounts.len(), 8);
        assert!(ix.accounts[0].is_signer && ix.accounts[0].is_writable);
        assert_eq!(ix.accounts[2].pubkey, ctx.vault.unwrap());
        assert_eq!(ix.accounts[3].pubkey, ata);
        assert_eq!(ix.accounts[4].pubkey, ctx.vault_authority());
        assert_eq!(ix.accounts[7].pubkey, ctx.oracle.unwrap());
        assert_eq!(ix.data, encode_withdraw(4, 100));
    }

    #[test]
    fn test_trade_cpi_uses_lp_pda() {
        let ctx = context();
        let lp = LpContext {
            lp_idx: 3,
            owner: Pubkey::new_unique(),
            matcher_program: Pubkey::new_unique(),
            matcher_context: Pubkey::new_unique(),
        };
        let ix = create_trade_cpi_instruction(&ctx, &Pubkey::new_unique(), &lp, 8, -50).unwrap();

        let (lp_pda, _) = derive_lp_pda(&ctx.program_id, &ctx.slab, 3);
        assert_eq!(ix.accounts[7].pubkey, lp_pda);
        assert!(!ix.accounts[1].is_signer);
        assert!(ix.accounts[6].is_writable);
        assert_eq!(ix.data, encode_trade_cpi(3, 8, -50));
    }

    #[test]
    fn test_missing_vault() {
        let ctx = MarketContext { vault: None, ..context() };
        let err = create_deposit_instruction(&ctx, &Pubkey::new_unique(), &Pubkey::new_unique(), 0, 1)
            .unwrap_err();
        assert!(matches!(err, PercolatorSdkError::MissingContext(_)));
    }

    #[test]
    fn test_parse_address_rejects_garbage() {
        let err = parse_address("not-a-pubkey").unwrap_err();
        assert!(matches!(err, PercolatorSdkError::InvalidAddress { .. }));

        let key = Pubkey::new_unique();
        assert_eq!(parse_address(&format!(" {} ", key)).unwrap(), key);
    }

    #[test]
    fn test_context_parse_optional_fields() {
        let key = Pubkey::new_unique().to_string();
        let ctx = MarketContext::parse(&key, &key, &key, None, Some(&key)).unwrap();
        assert!(ctx.vault.is_none());
        assert!(ctx.oracle.is_some());

        let err = MarketContext::parse(&key, &key, &key, Some("bad"), None).unwrap_err();
        assert!(matches!(err, PercolatorSdkError::InvalidAddress { .. }));
    }

    #[test]
    fn test_wrap_native_sequence() {
        let owner = Pubkey::new_unique();
        let ixs = create_wrap_native_instructions(&owner, 5_000, true).unwrap();
        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, spl_associated_token_account::ID);
        assert_eq!(ixs[1].program_id, solana_sdk::system_program::ID);
        assert_eq!(ixs[2].program_id, spl_token::ID);

        let ixs = create_wrap_native_instructions(&owner, 5_000, false).unwrap();
        assert_eq!(ixs.len(), 2);
    }
}
