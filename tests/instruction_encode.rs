//! Instruction assembly through the client against an in-memory chain
//!
//! Checks payload bytes, account order, wrapped-SOL framing and the number
//! of chain reads each builder performs.
//!
//! Run with: cargo test --test instruction_encode

mod common;

use common::{client_with, lp_account, user_account, TestMarket};
use percolator_sdk::{
    derive_lp_pda, encode_deposit, encode_trade_cpi, encode_trade_no_cpi, encode_withdraw, LpContext, MarketContext,
    PercolatorSdkError,
};
use solana_sdk::{pubkey::Pubkey, system_program, sysvar};

// ============================================================================
// SPL COLLATERAL
// ============================================================================

#[tokio::test]
async fn test_deposit_single_instruction() {
    let market = TestMarket::spl();
    let client = client_with(vec![]);
    let user = Pubkey::new_unique();

    let set = client.build_deposit(&market.context(), &user, 7, 1_000_000).await.unwrap();

    assert_eq!(set.instructions.len(), 1);
    let ix = &set.instructions[0];
    assert_eq!(ix.program_id, market.program_id);
    assert_eq!(ix.data.len(), 11);
    assert_eq!(ix.data[0], 3);
    assert_eq!(ix.data, encode_deposit(7, 1_000_000));

    let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
    assert_eq!(
        keys,
        vec![
            user,
            market.slab,
            market.context().user_collateral_account(&user),
            market.vault,
            spl_token::ID,
            sysvar::clock::ID,
        ]
    );
    assert!(ix.accounts[0].is_signer);
    assert!(ix.accounts[1].is_writable);

    assert_eq!(client.reader().existence_checks(), 0);
    assert_eq!(client.reader().blockhash_reads(), 1);
    assert_eq!(set.recent_blockhash, client.reader().blockhash);
}

#[tokio::test]
async fn test_withdraw_spl_has_no_unwrap() {
    let market = TestMarket::spl();
    let client = client_with(vec![]);
    let user = Pubkey::new_unique();

    let set = client.build_withdraw(&market.context(), &user, 2, 50).await.unwrap();

    assert_eq!(set.instructions.len(), 1);
    assert_eq!(set.instructions[0].data, encode_withdraw(2, 50));
    assert_eq!(set.instructions[0].accounts[7].pubkey, market.oracle);
    assert_eq!(client.reader().total_reads(), 1);
}

// ============================================================================
// WRAPPED SOL
// ============================================================================

#[tokio::test]
async fn test_native_deposit_creates_missing_ata() {
    let market = TestMarket::native();
    let client = client_with(vec![]);
    let user = Pubkey::new_unique();

    let set = client.build_deposit(&market.context(), &user, 0, 2_000_000_000).await.unwrap();

    let programs: Vec<Pubkey> = set.instructions.iter().map(|ix| ix.program_id).collect();
    assert_eq!(
        programs,
        vec![
            spl_associated_token_account::ID,
            system_program::ID,
            spl_token::ID,
            market.program_id,
        ]
    );
    assert_eq!(client.reader().existence_checks(), 1);
    assert_eq!(client.reader().blockhash_reads(), 1);
}

#[tokio::test]
async fn test_native_deposit_skips_existing_ata() {
    let market = TestMarket::native();
    let user = Pubkey::new_unique();
    let ata = market.context().user_collateral_account(&user);
    let client = client_with(vec![(ata, vec![0u8; 165])]);

    let set = client.build_deposit(&market.context(), &user, 0, 10).await.unwrap();

    let programs: Vec<Pubkey> = set.instructions.iter().map(|ix| ix.program_id).collect();
    assert_eq!(programs, vec![system_program::ID, spl_token::ID, market.program_id]);
    assert_eq!(set.instructions[2].data, encode_deposit(0, 10));
}

#[tokio::test]
async fn test_native_init_user_wraps_fee() {
    let market = TestMarket::native();
    let client = client_with(vec![]);
    let user = Pubkey::new_unique();

    let set = client.build_init_user(&market.context(), &user, 1_000).await.unwrap();

    assert_eq!(set.instructions.len(), 4);
    let last = set.instructions.last().unwrap();
    assert_eq!(last.data[0], 1);
    assert_eq!(&last.data[1..], &1_000u64.to_le_bytes());
}

#[tokio::test]
async fn test_native_withdraw_appends_close() {
    let market = TestMarket::native();
    let client = client_with(vec![]);
    let user = Pubkey::new_unique();

    let set = client.build_withdraw(&market.context(), &user, 4, 500).await.unwrap();

    assert_eq!(set.instructions.len(), 2);
    assert_eq!(set.instructions[0].program_id, market.program_id);
    assert_eq!(set.instructions[1].program_id, spl_token::ID);
    assert_eq!(client.reader().existence_checks(), 0);
    assert_eq!(client.reader().blockhash_reads(), 1);
}

// ============================================================================
// TRADING
// ============================================================================

#[tokio::test]
async fn test_trade_against_lp_from_slab() {
    let market = TestMarket::spl();
    let lp_owner = Pubkey::new_unique();
    let trader = Pubkey::new_unique();

    let mut builder = market.slab_builder();
    builder
        .account(1, user_account(trader))
        .account(3, lp_account(lp_owner));
    let client = client_with(vec![(market.slab, builder.build())]);

    let (ctx, snapshot) = client.market_context(&market.program_id, &market.slab).await.unwrap();
    assert_eq!(ctx, market.context());
    assert_eq!(client.reader().account_reads(), 1);

    let lp_record = snapshot.state.lp_accounts().next().unwrap();
    let lp = LpContext::from_account(lp_record).unwrap();
    assert_eq!(lp.lp_idx, 3);
    assert_eq!(lp.owner, lp_owner);

    let user_idx = snapshot.state.accounts_by_owner(&trader).next().unwrap().index();
    let set = client.build_trade_cpi(&ctx, &trader, &lp, user_idx, -250).await.unwrap();

    let ix = &set.instructions[0];
    assert_eq!(ix.data, encode_trade_cpi(3, 1, -250));
    assert_eq!(ix.data[0], 10);
    assert_eq!(&ix.data[5..], &(-250i128).to_le_bytes());

    let (lp_pda, _) = derive_lp_pda(&market.program_id, &market.slab, 3);
    assert_eq!(ix.accounts.len(), 8);
    assert_eq!(ix.accounts[0].pubkey, trader);
    assert_eq!(ix.accounts[1].pubkey, lp_owner);
    assert!(!ix.accounts[1].is_signer);
    assert_eq!(ix.accounts[4].pubkey, market.oracle);
    assert_eq!(ix.accounts[5].pubkey, lp.matcher_program);
    assert_eq!(ix.accounts[6].pubkey, lp.matcher_context);
    assert_eq!(ix.accounts[7].pubkey, lp_pda);

    assert_eq!(client.reader().blockhash_reads(), 1);
}

#[tokio::test]
async fn test_direct_trade_has_two_signers() {
    let market = TestMarket::spl();
    let client = client_with(vec![]);
    let trader = Pubkey::new_unique();
    let lp_owner = Pubkey::new_unique();

    let set = client
        .build_trade_no_cpi(&market.context(), &trader, &lp_owner, 0, 9, i128::MIN)
        .await
        .unwrap();

    let ix = &set.instructions[0];
    assert_eq!(ix.data, encode_trade_no_cpi(0, 9, i128::MIN));
    assert_eq!(ix.data[0], 6);
    assert_eq!(ix.data[20], 0x80);
    let signers: Vec<Pubkey> = ix.accounts.iter().filter(|m| m.is_signer).map(|m| m.pubkey).collect();
    assert_eq!(signers, vec![trader, lp_owner]);
    assert_eq!(ix.accounts[4].pubkey, market.oracle);

    let tx = set.to_transaction(&trader);
    assert_eq!(tx.message.header.num_required_signatures, 2);
}

#[test]
fn test_user_record_is_not_an_lp() {
    let err = LpContext::from_account(&user_account(Pubkey::new_unique())).unwrap_err();
    assert!(matches!(err, PercolatorSdkError::MissingContext(_)));
}

// ============================================================================
// FAILURES BEFORE ANY READ
// ============================================================================

#[tokio::test]
async fn test_missing_vault_reads_nothing() {
    let market = TestMarket::native();
    let client = client_with(vec![]);
    let ctx = MarketContext { vault: None, ..market.context() };

    let err = client.build_deposit(&ctx, &Pubkey::new_unique(), 0, 1).await.unwrap_err();
    assert!(matches!(err, PercolatorSdkError::MissingContext(_)));
    assert_eq!(client.reader().total_reads(), 0);
}

#[tokio::test]
async fn test_missing_oracle_reads_nothing() {
    let market = TestMarket::spl();
    let client = client_with(vec![]);
    let ctx = MarketContext { oracle: None, ..market.context() };
    let lp = LpContext {
        lp_idx: 0,
        owner: Pubkey::new_unique(),
        matcher_program: Pubkey::new_unique(),
        matcher_context: Pubkey::new_unique(),
    };

    let err = client.build_trade_cpi(&ctx, &Pubkey::new_unique(), &lp, 1, 5).await.unwrap_err();
    assert!(matches!(err, PercolatorSdkError::MissingContext(_)));

    let err = client.build_withdraw(&ctx, &Pubkey::new_unique(), 1, 5).await.unwrap_err();
    assert!(matches!(err, PercolatorSdkError::MissingContext(_)));
    assert_eq!(client.reader().total_reads(), 0);
}

#[test]
fn test_invalid_address_in_context() {
    let good = Pubkey::new_unique().to_string();
    let err = MarketContext::parse(&good, "0OIl", &good, None, None).unwrap_err();
    match err {
        PercolatorSdkError::InvalidAddress { input, .. } => assert_eq!(input, "0OIl"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_missing_slab_account() {
    let market = TestMarket::spl();
    let client = client_with(vec![]);

    let err = client.fetch_slab(&market.slab).await.unwrap_err();
    assert!(matches!(err, PercolatorSdkError::AccountNotFound(_)));
}

#[tokio::test]
async fn test_slab_without_magic_fails_fetch() {
    let market = TestMarket::spl();
    let client = client_with(vec![(market.slab, vec![0u8; 4096])]);

    let err = client.fetch_slab(&market.slab).await.unwrap_err();
    assert!(matches!(err, PercolatorSdkError::MagicMismatch { .. }));
}

// ============================================================================
// TRANSACTION ASSEMBLY
// ============================================================================

#[tokio::test]
async fn test_instruction_set_to_transaction() {
    let market = TestMarket::spl();
    let client = client_with(vec![]);
    let user = Pubkey::new_unique();

    let set = client.build_deposit(&market.context(), &user, 0, 1).await.unwrap();
    let tx = set.to_transaction(&user);

    assert_eq!(tx.message.recent_blockhash, client.reader().blockhash);
    assert_eq!(tx.message.account_keys[0], user);
    assert_eq!(tx.message.instructions.len(), 1);
}
