use anchor_lang::prelude::*;

use crate::state::EscrowStatus;

/// Buyer's lamports entered custody
#[event]
pub struct EscrowInitialized {
    pub escrow: Pubkey,
    pub buyer: Pubkey,
    pub recipient: Pubkey,
    pub arbiter: Pubkey,
    pub amount: u64,
}

/// Arbiter settled the escrow and custody was paid out
#[event]
pub struct EscrowResolved {
    pub escrow: Pubkey,
    pub status: EscrowStatus,
    pub beneficiary: Pubkey,
    pub amount: u64,
}
