//! PDA derivation utilities

use solana_sdk::pubkey::Pubkey;
use crate::constants::*;

/// Derive the vault authority PDA that owns a slab's collateral vault
pub fn derive_vault_authority_pda(program_id: &Pubkey, slab: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[VAULT_SEED, slab.as_ref()], program_id)
}

/// Derive the LP signer PDA for the LP in slot `lp_idx`
pub fn derive_lp_pda(program_id: &Pubkey, slab: &Pubkey, lp_idx: u16) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[LP_SEED, slab.as_ref(), &lp_idx.to_le_bytes()],
        program_id,
    )
}
