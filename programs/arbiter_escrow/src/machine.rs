//! Escrow transitions, independent of where records and lamports live.
//!
//! Every check runs before the first write. Callers run each function inside
//! one host transaction so that a failed transfer also discards the status
//! change.

use anchor_lang::prelude::*;

use crate::{
    custody::Custodian,
    errors::EscrowError,
    guard::{self, Role, Signers},
    state::{EscrowAccount, EscrowTerms, Resolution},
};

/// Open an escrow in `slot` and take the buyer's lamports into custody
pub fn initialize<C: Custodian>(
    slot: &mut EscrowAccount,
    custodian: &mut C,
    signers: Signers,
    terms: EscrowTerms,
) -> Result<()> {
    require!(!slot.is_initialized(), EscrowError::AlreadyInitialized);
    require_gt!(terms.amount, 0, EscrowError::InvalidAmount);

    let escrow = EscrowAccount::open(terms);
    guard::authorize(Role::Buyer, &escrow, signers)?;

    // Custody stays with the record; `resolve` reissues the token from it
    let held = custodian.debit(&escrow.buyer, escrow.amount)?;
    require_eq!(held.amount(), escrow.amount, EscrowError::CustodyShortfall);

    *slot = escrow;
    Ok(())
}

/// Settle a pending escrow and pay out the full custodied amount
pub fn resolve<C: Custodian>(
    escrow: &mut EscrowAccount,
    custodian: &mut C,
    signers: Signers,
    resolution: Resolution,
) -> Result<Pubkey> {
    guard::authorize(Role::Arbiter, escrow, signers)?;
    require!(escrow.is_pending(), EscrowError::NotPending);
    let token = custodian.release(escrow.amount)?;

    escrow.settle(resolution)?;
    let beneficiary = resolution.beneficiary(escrow);
    custodian.credit(token, &beneficiary)?;

    Ok(beneficiary)
}

pub fn approve<C: Custodian>(
    escrow: &mut EscrowAccount,
    custodian: &mut C,
    signers: Signers,
) -> Result<Pubkey> {
    resolve(escrow, custodian, signers, Resolution::Approve)
}

pub fn refund<C: Custodian>(
    escrow: &mut EscrowAccount,
    custodian: &mut C,
    signers: Signers,
) -> Result<Pubkey> {
    resolve(escrow, custodian, signers, Resolution::Refund)
}
